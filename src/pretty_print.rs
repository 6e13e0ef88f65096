use crate::parser::MAX_NESTING;
use crate::session::Error;
use crate::{EvalError, LexerError, ParseError};
use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use std::io::{self, Write};
use std::ops::Range;

const SOURCE_ID: &str = "REPL";

type ReportSpan = (&'static str, Range<usize>);

/// Errors that can be rendered as an annotated report over the input line.
pub trait Diagnostic {
    fn report(&self, input: &str, config: Config) -> Report<'static, ReportSpan>;

    /// Prints a colored report to stderr.
    fn pretty_print(&self, input: &str) -> io::Result<()> {
        self.report(input, byte_indexed(Config::default()))
            .eprint((SOURCE_ID, Source::from(input)))
    }

    /// Writes an uncolored report, e.g. into a buffer.
    fn write_report<W: Write>(&self, input: &str, out: W) -> io::Result<()> {
        self.report(input, byte_indexed(Config::default()).with_color(false))
            .write((SOURCE_ID, Source::from(input)), out)
    }
}

// Spans are byte offsets; ariadne counts chars unless told otherwise.
fn byte_indexed(config: Config) -> Config {
    config.with_index_type(IndexType::Byte)
}

fn at(range: Range<usize>) -> ReportSpan {
    (SOURCE_ID, range)
}

impl Diagnostic for LexerError {
    fn report(&self, _input: &str, config: Config) -> Report<'static, ReportSpan> {
        Report::build(ReportKind::Error, at(self.span.to_range()))
            .with_config(config)
            .with_message("Lexer Error")
            .with_label(Label::new(at(self.span.to_range())).with_message(self.error.to_string()))
            .finish()
    }
}

impl Diagnostic for ParseError {
    fn report(&self, input: &str, config: Config) -> Report<'static, ReportSpan> {
        match self {
            ParseError::UnexpectedToken { found, expected } => {
                Report::build(ReportKind::Error, at(found.span.to_range()))
                    .with_config(config)
                    .with_message(format!("Unexpected token: {}", found.kind))
                    .with_label(
                        Label::new(at(found.span.to_range()))
                            .with_message(format!("Expected {expected}")),
                    )
                    .finish()
            }
            ParseError::UnexpectedEof(expected) => {
                // Point at the last character of the line
                let end = input.trim_end().len();
                let start = input[..end]
                    .chars()
                    .next_back()
                    .map_or(end, |c| end - c.len_utf8());
                Report::build(ReportKind::Error, at(start..end))
                    .with_config(config)
                    .with_message("Unexpected end of input")
                    .with_label(
                        Label::new(at(start..end)).with_message(format!("Expected {expected} after this")),
                    )
                    .finish()
            }
            ParseError::UnclosedParen(span) => {
                Report::build(ReportKind::Error, at(span.to_range()))
                    .with_config(config)
                    .with_message("Unclosed parenthesis")
                    .with_label(
                        Label::new(at(span.to_range()))
                            .with_message("This '(' is never closed"),
                    )
                    .finish()
            }
            ParseError::TooDeep(span) => Report::build(ReportKind::Error, at(span.to_range()))
                .with_config(config)
                .with_message("Expression nested too deeply")
                .with_label(
                    Label::new(at(span.to_range()))
                        .with_message(format!("This goes past {MAX_NESTING} levels of nesting")),
                )
                .finish(),
            ParseError::LexerError(lex_err) => lex_err.report(input, config),
        }
    }
}

impl Diagnostic for EvalError {
    fn report(&self, input: &str, config: Config) -> Report<'static, ReportSpan> {
        // Evaluation has no finer position than the line itself
        let line = 0..input.len();
        match self {
            EvalError::RuntimeLimitExceeded { limit, bound } => {
                Report::build(ReportKind::Error, at(line.clone()))
                    .with_config(config)
                    .with_message("Runtime limit exceeded")
                    .with_label(
                        Label::new(at(line))
                            .with_message(format!("Evaluation went past a {limit} of {bound}")),
                    )
                    .with_note("The term may not have a normal form")
                    .finish()
            }
        }
    }
}

impl Diagnostic for Error {
    fn report(&self, input: &str, config: Config) -> Report<'static, ReportSpan> {
        match self {
            Error::Lexer(err) => err.report(input, config),
            Error::Parse(err) => err.report(input, config),
            Error::Eval(err) => err.report(input, config),
        }
    }
}
