use crate::environment::Environment;
use crate::evaluator::{EvalError, Limits, evaluate_with_limits};
use crate::lexer::{LexerError, tokenize};
use crate::parser::{ParseError, Parser};
use crate::types::Expr;
use log::{debug, trace};
use std::fmt;
use thiserror::Error;

/// Anything that can abandon a line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// What a successfully evaluated line produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A reduced expression to show the user.
    Value(Expr),
    /// A `' name = value` declaration, now part of the session.
    Bound { name: String, value: Expr },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(expr) => write!(f, "{}", expr),
            Outcome::Bound { name, value } => write!(f, "{} => {}", name, value),
        }
    }
}

/// Carries the persistent environment from one REPL line to the next.
#[derive(Debug, Default)]
pub struct Session {
    env: Environment,
    limits: Limits,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn with_limits(limits: Limits) -> Self {
        Session {
            env: Environment::new(),
            limits,
        }
    }

    /// The bindings declared so far.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Scans, parses and evaluates one line.
    ///
    /// A `' name = value` line extends the session's environment. A line that
    /// fails at any stage leaves the environment as it was.
    pub fn run_line(&mut self, line: &str) -> Result<Outcome, Error> {
        let tokens = tokenize(line)?;
        let expr = Parser::new(tokens).parse()?;
        debug!("parsed: {}", expr);

        let result = evaluate_with_limits(&expr, &self.env, self.limits)?;
        if let Expr::ReplBinding { name, value } = &result {
            trace!("binding {} in session", name);
            let value = Expr::clone(value);
            self.env = self.env.bind(name.as_str(), value.clone());
            return Ok(Outcome::Bound {
                name: name.clone(),
                value,
            });
        }
        debug!("result: {}", result);
        Ok(Outcome::Value(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Limit;
    use crate::lexer::LexerErrorKind;

    fn run(session: &mut Session, line: &str) -> String {
        match session.run_line(line) {
            Ok(outcome) => outcome.to_string(),
            Err(e) => panic!("Line '{}' failed: {}", line, e),
        }
    }

    #[test]
    fn test_value_lines() {
        let mut session = Session::new();
        assert_eq!(run(&mut session, "λx.x"), "(λx.x)");
        assert_eq!(run(&mut session, "(λx.x) y"), "y");
        assert!(session.environment().is_empty());
    }

    #[test]
    fn test_repl_binding_persists() {
        let mut session = Session::new();
        assert_eq!(run(&mut session, "' id = λx.x"), "id => (λx.x)");
        assert_eq!(run(&mut session, "id z"), "z");
        assert_eq!(
            run(&mut session, "' two = λf x.f (f x)"),
            "two => (λf.(λx.(f (f x))))"
        );
        assert_eq!(run(&mut session, "two id a"), "a");
        assert_eq!(session.environment().len(), 2);
    }

    #[test]
    fn test_later_binding_shadows_earlier() {
        let mut session = Session::new();
        run(&mut session, "' v = a");
        run(&mut session, "' v = b");
        assert_eq!(run(&mut session, "v"), "b");
    }

    #[test]
    fn test_binding_value_sees_earlier_bindings() {
        let mut session = Session::new();
        run(&mut session, "' k = λx y.x");
        assert_eq!(run(&mut session, "' ka = k a"), "ka => (λy.a)");
        assert_eq!(run(&mut session, "ka b"), "a");
    }

    #[test]
    fn test_let_does_not_persist() {
        let mut session = Session::new();
        assert_eq!(run(&mut session, "let x = a in x"), "a");
        assert_eq!(
            session.run_line("x").unwrap(),
            Outcome::Value(Expr::free_variable("x"))
        );
    }

    #[test]
    fn test_lexer_error_discards_line() {
        let mut session = Session::new();
        run(&mut session, "' id = λx.x");
        let err = session.run_line("' id2 = λx.x # y").unwrap_err();
        assert!(matches!(
            err,
            Error::Lexer(LexerError {
                error: LexerErrorKind::InvalidCharacter('#'),
                ..
            })
        ));
        // Nothing of the failed line reached the environment
        assert_eq!(session.environment().len(), 1);
        assert_eq!(session.environment().lookup("id2"), None);
        assert_eq!(run(&mut session, "id q"), "q");
    }

    #[test]
    fn test_parse_error_discards_line() {
        let mut session = Session::new();
        let err = session.run_line("' id = (λx.x").unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::UnclosedParen(_))));
        assert!(session.environment().is_empty());
    }

    #[test]
    fn test_runtime_limit_discards_line() {
        let mut session = Session::with_limits(Limits::default().with_max_depth(32));
        let err = session.run_line("' w = (λx.x x) (λx.x x)").unwrap_err();
        assert!(matches!(
            err,
            Error::Eval(EvalError::RuntimeLimitExceeded {
                limit: Limit::Depth,
                ..
            })
        ));
        assert!(session.environment().is_empty());
        assert_eq!(run(&mut session, "w"), "w");
    }

    #[test]
    fn test_long_line_keeps_session_alive() {
        let mut session = Session::new();
        run(&mut session, "' id = λx.x");
        let line = vec!["x"; 100_000].join(" ");
        let printed = run(&mut session, &line);
        assert_eq!(printed.len(), 4 * 100_000 - 3);
        assert_eq!(run(&mut session, "id q"), "q");
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let mut session = Session::new();
        run(&mut session, "' id = λx.x");
        let line = format!("{}x{}", "(".repeat(20_000), ")".repeat(20_000));
        let err = session.run_line(&line).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::TooDeep(_))));
        assert_eq!(session.environment().len(), 1);
        assert_eq!(run(&mut session, "id q"), "q");
    }

    #[test]
    fn test_error_display_is_transparent() {
        let mut session = Session::new();
        let err = session.run_line("x)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected token ')' at 1..2, expected end of input"
        );
    }
}
