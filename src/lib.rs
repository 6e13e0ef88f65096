pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod session;
pub mod source;
pub mod types;

pub use environment::Environment;
pub use evaluator::{EvalError, Limit, Limits, evaluate, evaluate_with_limits};
pub use lexer::{LexerError, Token, TokenKind, tokenize};
pub use parser::{MAX_NESTING, ParseError, Parser, parse_str};
pub use pretty_print::Diagnostic;
pub use session::{Outcome, Session};
pub use source::Span;
pub use types::Expr;
