use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

/// Canonical spelling of the lambda marker, whichever spelling was typed.
pub const LAMBDA: &str = "λ";

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexerErrorKind)]
pub enum TokenKind {
    #[token("λ")]
    #[token("𝞴")]
    #[token("\\")]
    Lambda,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    // A whole run collapses into one token: a single whitespace is what separates
    // the two sides of an application.
    #[regex(r"[ \t\r\n]+")]
    Whitespace,
    // Literal tokens outrank the identifier regex on a tie, and logos always takes
    // the longest match, so `letter` and `inner` stay identifiers.
    #[token("let")]
    Let,
    #[token("in")]
    In,
    #[token("=")]
    Equal,
    #[token("'")]
    Quote,
    #[regex(r"[a-zA-Z][a-zA-Z0-9+*/-]*", |lex| lex.slice().to_string())]
    Identifier(String),
}

impl TokenKind {
    /// The literal text of the token, with the lambda marker and whitespace normalized.
    pub fn lexeme(&self) -> &str {
        match self {
            TokenKind::Lambda => LAMBDA,
            TokenKind::Dot => ".",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Whitespace => " ",
            TokenKind::Let => "let",
            TokenKind::In => "in",
            TokenKind::Equal => "=",
            TokenKind::Quote => "'",
            TokenKind::Identifier(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Whitespace => write!(f, "whitespace"),
            other => write!(f, "{}", other.lexeme()),
        }
    }
}

#[derive(Error, Default, Debug, Clone, PartialEq)]
pub enum LexerErrorKind {
    #[error("'{0}' cannot begin a token")]
    InvalidCharacter(char),
    #[default]
    #[error("Invalid token")]
    InvalidToken,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error} at {span}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

// Result type alias for convenience
type LexerRangedResult<T> = Result<T, LexerError>;

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Splits `input` into tokens. Surrounding whitespace is trimmed first, but spans
/// keep pointing into the untrimmed input.
pub fn tokenize(input: &str) -> LexerRangedResult<Vec<Token>> {
    let start = input.len() - input.trim_start_matches(is_blank).len();
    let trimmed = input.trim_matches(is_blank);

    TokenKind::lexer(trimmed)
        .spanned()
        .map(|(result, range)| {
            let span = Span::from(range).offset(start);
            match result {
                Ok(kind) => Ok(Token { kind, span }),
                Err(LexerErrorKind::InvalidToken) => {
                    Err(invalid_character(trimmed, span.start - start, start))
                }
                Err(error) => Err(LexerError { error, span }),
            }
        })
        .collect()
}

// Logos reports unmatched input as the default error; name the character instead.
fn invalid_character(trimmed: &str, at: usize, offset: usize) -> LexerError {
    match trimmed[at..].chars().next() {
        Some(c) => LexerError {
            error: LexerErrorKind::InvalidCharacter(c),
            span: Span::new(at, at + c.len_utf8()).offset(offset),
        },
        None => LexerError {
            error: LexerErrorKind::InvalidToken,
            span: Span::new(at, at).offset(offset),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(name.to_string())
    }

    // Helper to simplify testing token sequences
    fn assert_tokens(input: &str, expected: Vec<TokenKind>) {
        match tokenize(input) {
            Ok(tokens) => {
                let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
                assert_eq!(kinds, expected, "Input: '{}'", input);
            }
            Err(e) => panic!("Lexing failed for input '{}': {}", input, e),
        }
    }

    fn assert_lexer_error(input: &str, expected: LexerErrorKind) {
        match tokenize(input) {
            Ok(tokens) => panic!(
                "Expected lexing to fail for input '{}', but got tokens: {:?}",
                input, tokens
            ),
            Err(e) => assert_eq!(e.error, expected, "Input: '{}'", input),
        }
    }

    #[test]
    fn test_empty_input() {
        assert_tokens("", vec![]);
        assert_tokens(" \t\n ", vec![]);
    }

    #[test]
    fn test_punctuation() {
        assert_tokens(
            "().='",
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Dot,
                TokenKind::Equal,
                TokenKind::Quote,
            ],
        );
    }

    #[test]
    fn test_lambda_spellings() {
        for input in ["λ", "𝞴", "\\"] {
            assert_tokens(input, vec![TokenKind::Lambda]);
            let tokens = tokenize(input).unwrap();
            assert_eq!(tokens[0].kind.lexeme(), "λ");
        }
        assert_tokens(
            r"\x.x",
            vec![TokenKind::Lambda, ident("x"), TokenKind::Dot, ident("x")],
        );
    }

    #[test]
    fn test_identifiers() {
        assert_tokens("foo", vec![ident("foo")]);
        assert_tokens("x1", vec![ident("x1")]);
        assert_tokens("a+b-c*d/e", vec![ident("a+b-c*d/e")]);
        assert_tokens("Succ", vec![ident("Succ")]);
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_tokens(
            "x  \t\n y",
            vec![ident("x"), TokenKind::Whitespace, ident("y")],
        );
        assert_tokens(
            "  x y  ",
            vec![ident("x"), TokenKind::Whitespace, ident("y")],
        );
    }

    #[test]
    fn test_keywords() {
        assert_tokens(
            "let x = y in x",
            vec![
                TokenKind::Let,
                TokenKind::Whitespace,
                ident("x"),
                TokenKind::Whitespace,
                TokenKind::Equal,
                TokenKind::Whitespace,
                ident("y"),
                TokenKind::Whitespace,
                TokenKind::In,
                TokenKind::Whitespace,
                ident("x"),
            ],
        );
    }

    #[test]
    fn test_keyword_prefixes_stay_identifiers() {
        assert_tokens("letter", vec![ident("letter")]);
        assert_tokens("inner", vec![ident("inner")]);
        assert_tokens("let2", vec![ident("let2")]);
        assert_tokens("in+", vec![ident("in+")]);
        assert_tokens("lets in", vec![ident("lets"), TokenKind::Whitespace, TokenKind::In]);
        // Keywords right against punctuation still split.
        assert_tokens("(let)", vec![TokenKind::LParen, TokenKind::Let, TokenKind::RParen]);
    }

    #[test]
    fn test_sequence() {
        assert_tokens(
            "(λx y.x) z",
            vec![
                TokenKind::LParen,
                TokenKind::Lambda,
                ident("x"),
                TokenKind::Whitespace,
                ident("y"),
                TokenKind::Dot,
                ident("x"),
                TokenKind::RParen,
                TokenKind::Whitespace,
                ident("z"),
            ],
        );
    }

    #[test]
    fn test_invalid_characters() {
        assert_lexer_error("x $ y", LexerErrorKind::InvalidCharacter('$'));
        assert_lexer_error("1x", LexerErrorKind::InvalidCharacter('1'));
        assert_lexer_error("+", LexerErrorKind::InvalidCharacter('+'));
        assert_lexer_error("λx.ü", LexerErrorKind::InvalidCharacter('ü'));
    }

    #[test]
    fn test_invalid_character_span() {
        let err = tokenize("  ab #").unwrap_err();
        assert_eq!(err.error, LexerErrorKind::InvalidCharacter('#'));
        assert_eq!(err.span, Span::new(5, 6));
        assert_eq!(err.to_string(), "'#' cannot begin a token at 5..6");
    }

    #[test]
    fn test_tokenize_spans() {
        // Spans are measured in the untrimmed input
        let tokens = tokenize("  λx.x").expect("Should tokenize successfully");

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].span, Span::new(2, 4)); // λ is two bytes
        assert_eq!(tokens[1].span, Span::new(4, 5));
        assert_eq!(tokens[2].span, Span::new(5, 6));
        assert_eq!(tokens[3].span, Span::new(6, 7));
    }
}
