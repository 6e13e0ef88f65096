use crate::Span;
use crate::lexer::{LexerError, Token, TokenKind};
use crate::types::Expr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token '{}' at {}, expected {expected}", .found.kind, .found.span)]
    UnexpectedToken { found: Token, expected: String },
    #[error("Unexpected end of input, expected {0}")]
    UnexpectedEof(String),
    /// The input ended before the parenthesis opened at this span was closed.
    #[error("Unclosed '(' at {0}")]
    UnclosedParen(Span),
    /// Parentheses, lambda parameters and `let`s nested past [`MAX_NESTING`].
    #[error("Expression nested deeper than {max} levels at {0}", max = MAX_NESTING)]
    TooDeep(Span),
    #[error("Lexer Error during parse: {0}")]
    LexerError(#[from] LexerError),
}

/// How deeply parentheses, lambda parameters and `let`s may nest in one line.
///
/// Each level costs native stack in the parser and evaluator. Juxtaposed atoms
/// (`x y z ...`) do not nest and are not limited.
pub const MAX_NESTING: usize = 256;

// Result type alias for convenience
type ParseResult<T> = Result<T, ParseError>;

/// Recursive descent over
///
/// ```text
/// expression  := replBinding | binding
/// replBinding := QUOTE var EQUAL abstraction
/// binding     := LET var EQUAL abstraction IN binding | abstraction
/// abstraction := LAMBDA var+ DOT expression | application
/// application := atom (WS atom)*
/// atom        := identifier | LPAREN expression RPAREN
/// ```
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // Consumes the next token if available.
    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_nth(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + n).map(|t| &t.kind)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.peek_nth(0)
    }

    // Enters one more level of nesting opened at `span`.
    fn descend(&mut self, span: Span) -> ParseResult<()> {
        if self.depth == MAX_NESTING {
            return Err(ParseError::TooDeep(span));
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn skip_whitespace(&mut self) {
        if self.peek() == Some(&TokenKind::Whitespace) {
            self.pos += 1;
        }
    }

    /// Consumes a token of the given kind or fails describing what was expected.
    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        match self.next_token() {
            Some(token) if token.kind == kind => Ok(token),
            Some(found) => Err(ParseError::UnexpectedToken {
                found,
                expected: expected.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof(expected.to_string())),
        }
    }

    /// Parses the whole token stream as one expression.
    pub fn parse(mut self) -> ParseResult<Expr> {
        let expr = self.parse_expression()?;
        self.skip_whitespace();

        // Anything left over means the input was not a single expression
        match self.next_token() {
            Some(found) => Err(ParseError::UnexpectedToken {
                found,
                expected: "end of input".to_string(),
            }),
            None => Ok(expr),
        }
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            Some(TokenKind::Quote) => self.parse_repl_binding(),
            _ => self.parse_binding(),
        }
    }

    /// `' name = value`
    fn parse_repl_binding(&mut self) -> ParseResult<Expr> {
        self.expect(TokenKind::Quote, "'''")?;
        self.skip_whitespace();
        let name = self.parse_variable()?;
        self.parse_equal()?;
        let value = self.parse_abstraction()?;
        Ok(Expr::repl_binding(name, value))
    }

    /// `let name = value in body`, or falls through to an abstraction.
    fn parse_binding(&mut self) -> ParseResult<Expr> {
        let let_token = match self.peek() {
            Some(TokenKind::Let) => self.expect(TokenKind::Let, "'let'")?,
            _ => return self.parse_abstraction(),
        };
        self.descend(let_token.span)?;
        self.skip_whitespace();
        let name = self.parse_variable()?;
        self.parse_equal()?;
        let value = self.parse_abstraction()?;
        self.skip_whitespace();
        self.expect(TokenKind::In, "'in'")?;
        self.skip_whitespace();
        let body = self.parse_binding()?;
        self.ascend(1);
        Ok(Expr::binding(name, value, body))
    }

    fn parse_equal(&mut self) -> ParseResult<()> {
        self.skip_whitespace();
        self.expect(TokenKind::Equal, "'='")?;
        self.skip_whitespace();
        Ok(())
    }

    /// `λx y z.body` desugars to `λx.(λy.(λz.body))`.
    fn parse_abstraction(&mut self) -> ParseResult<Expr> {
        let lambda = match self.peek() {
            Some(TokenKind::Lambda) => self.expect(TokenKind::Lambda, "'λ'")?,
            _ => return self.parse_application(),
        };
        self.skip_whitespace();

        // Every parameter becomes one more nested abstraction
        self.descend(lambda.span)?;
        let mut params = vec![self.parse_variable()?];
        while self.peek() == Some(&TokenKind::Whitespace)
            && matches!(self.peek_nth(1), Some(TokenKind::Identifier(_)))
        {
            self.next_token();
            self.descend(lambda.span)?;
            params.push(self.parse_variable()?);
        }

        self.skip_whitespace();
        self.expect(TokenKind::Dot, "'.' after the parameters")?;
        self.skip_whitespace();
        let body = self.parse_expression()?;
        self.ascend(params.len());

        Ok(params
            .into_iter()
            .rev()
            .fold(body, |body, param| Expr::abstraction(param, body)))
    }

    /// Juxtaposed atoms, grouped to the left.
    fn parse_application(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_atom()?;
        // Whitespace only continues the application when an atom follows it; in
        // front of `in`, `)` or the end it is left for the caller.
        while self.peek() == Some(&TokenKind::Whitespace) && self.starts_atom(1) {
            self.next_token();
            let right = self.parse_atom()?;
            expr = Expr::application(expr, right);
        }
        Ok(expr)
    }

    fn starts_atom(&self, n: usize) -> bool {
        matches!(
            self.peek_nth(n),
            Some(TokenKind::Identifier(_) | TokenKind::LParen)
        )
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::Identifier(name),
                ..
            }) => Ok(Expr::Variable(name)),
            Some(Token {
                kind: TokenKind::LParen,
                span,
            }) => {
                self.descend(span)?;
                self.skip_whitespace();
                let expr = self.parse_expression()?;
                self.skip_whitespace();
                match self.next_token() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => {
                        self.ascend(1);
                        Ok(expr)
                    }
                    Some(found) => Err(ParseError::UnexpectedToken {
                        found,
                        expected: "')'".to_string(),
                    }),
                    None => Err(ParseError::UnclosedParen(span)),
                }
            }
            Some(found) => Err(ParseError::UnexpectedToken {
                found,
                expected: "an identifier or '('".to_string(),
            }),
            None => Err(ParseError::UnexpectedEof(
                "an identifier or '('".to_string(),
            )),
        }
    }

    fn parse_variable(&mut self) -> ParseResult<String> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::Identifier(name),
                ..
            }) => Ok(name),
            Some(found) => Err(ParseError::UnexpectedToken {
                found,
                expected: "an identifier".to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("an identifier".to_string())),
        }
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Expr> {
    let tokens = crate::lexer::tokenize(input)?;
    Parser::new(tokens).parse()
}
