use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use lambda_repl::{Diagnostic, Limits, Session, TokenKind, tokenize};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

const HISTORY_FILE: &str = "lambda_history.txt";

// The main thread has an 8 MiB stack, enough for deeper reductions than the
// library default allows.
const REPL_MAX_DEPTH: usize = 2048;

const KEYWORDS: [&str; 2] = ["let", "in"];

struct LambdaCompleter {
    session: Rc<RefCell<Session>>,
}

impl LambdaCompleter {
    fn new(session: Rc<RefCell<Session>>) -> Self {
        LambdaCompleter { session }
    }
}

impl rustyline::completion::Completer for LambdaCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let prefix = match tokenize(&line[..pos]).map(|mut tokens| tokens.pop()) {
            // Only complete a name the cursor is still touching
            Ok(Some(token)) if token.span.end == pos => match token.kind {
                TokenKind::Identifier(prefix) => prefix,
                _ => return Ok((pos, vec![])),
            },
            _ => return Ok((pos, vec![])),
        };

        let mut names = self.session.borrow().environment().get_identifiers();
        names.extend(KEYWORDS.iter().map(|k| k.to_string()));
        Ok((
            pos,
            names
                .into_iter()
                .filter_map(|id| id.strip_prefix(prefix.as_str()).map(str::to_string))
                .filter(|rest| !rest.is_empty())
                .collect(),
        ))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: LambdaValidator,
    #[rustyline(Highlighter)]
    highlighter: LambdaHighlighter,
    #[rustyline(Completer)]
    completer: LambdaCompleter,
}

/// Keeps reading lines while parentheses are still open.
struct LambdaValidator;

impl Validator for LambdaValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth = 0usize;
        for (i, c) in ctx.input().char_indices() {
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => {
                    return Ok(ValidationResult::Invalid(Some(format!(
                        "  - Unmatched ')' at position {}",
                        i
                    ))));
                }
                ')' => depth -= 1,
                _ => {}
            }
        }

        if depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

struct LambdaHighlighter;

impl Highlighter for LambdaHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let cursor = pos.checked_sub(1);
        // (offset in line, offset in highlighted) of each open paren
        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut highlighted = String::with_capacity(line.len());

        for (i, c) in line.char_indices() {
            match c {
                '(' => {
                    stack.push((i, highlighted.len()));
                    highlighted.push(c);
                }
                ')' => match stack.pop() {
                    Some((open, at)) if cursor == Some(open) || cursor == Some(i) => {
                        highlighted.push_str("\x1b[1;34m)\x1b[0m"); // Blue for matching brackets
                        highlighted.replace_range(at..=at, "\x1b[1;34m(\x1b[0m");
                    }
                    Some(_) => highlighted.push(c),
                    None => highlighted.push_str("\x1b[31m)\x1b[0m"), // Red for unmatched closing brackets
                },
                'λ' | '𝞴' | '\\' => highlighted.push_str(&format!("\x1b[35m{}\x1b[0m", c)),
                _ => highlighted.push(c),
            }
        }

        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn main() -> rustyline::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("lambda-repl v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let session = Rc::new(RefCell::new(Session::with_limits(
        Limits::default().with_max_depth(REPL_MAX_DEPTH),
    )));
    let h = InputValidator {
        highlighter: LambdaHighlighter,
        validator: LambdaValidator,
        completer: LambdaCompleter::new(session.clone()),
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(rustyline::EditMode::Emacs)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(HISTORY_FILE).is_err() {
        log::info!("No previous history in {}", HISTORY_FILE);
    }

    loop {
        match rl.readline("λ> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }

                let result = session.borrow_mut().run_line(&line);
                match result {
                    Ok(outcome) => println!("{}", outcome),
                    Err(err) => {
                        if let Err(io_err) = err.pretty_print(&line) {
                            log::warn!("Could not render report: {}", io_err);
                            eprintln!("Error: {}", err);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(HISTORY_FILE)
}
