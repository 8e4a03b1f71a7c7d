use crate::error::CompileError;
use crate::plan::BinaryOp;
use std::iter::Peekable;
use std::str::Chars;

/// Syntax tree before function names are resolved against a registry.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprAst {
    Call { name: String, args: Vec<ExprAst> },
    Identifier(String),
    Number(f64),
    Neg(Box<ExprAst>),
    Binary {
        op: BinaryOp,
        lhs: Box<ExprAst>,
        rhs: Box<ExprAst>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Comma,
    LParen,
    RParen,
    Eof,
}

struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
        }
    }

    fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_ws();
        let Some(&ch) = self.chars.peek() else {
            return Ok(Token::Eof);
        };
        let single = match ch {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            _ => None,
        };
        if let Some(tok) = single {
            self.chars.next();
            return Ok(tok);
        }
        match ch {
            c if is_ident_start(c) => Ok(Token::Ident(self.read_ident())),
            c if c.is_ascii_digit() || c == '.' => {
                let raw = self.read_number();
                match raw.parse::<f64>() {
                    Ok(num) if num.is_finite() => Ok(Token::Number(num)),
                    _ => Err(self.error(format!("invalid number `{raw}`"))),
                }
            }
            other => Err(self.error(format!("unexpected character `{other}`"))),
        }
    }

    fn error(&self, reason: String) -> CompileError {
        CompileError::Syntax {
            expr: self.source.to_string(),
            reason,
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.chars.next();
        }
    }

    fn read_ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if is_ident_continue(c) {
                out.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        out
    }

    fn read_number(&mut self) -> String {
        let mut out = String::new();
        let mut seen_dot = false;
        let mut seen_exp = false;

        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                out.push(c);
                self.chars.next();
                continue;
            }
            if c == '.' && !seen_dot && !seen_exp {
                seen_dot = true;
                out.push(c);
                self.chars.next();
                continue;
            }
            if (c == 'e' || c == 'E') && !seen_exp {
                seen_exp = true;
                out.push(c);
                self.chars.next();
                if let Some(&sign) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        out.push(sign);
                        self.chars.next();
                    }
                }
                continue;
            }
            break;
        }
        out
    }
}

#[inline]
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Parses the closed factor grammar:
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := unary (('*' | '/') unary)*
/// unary   := ('+' | '-') unary | factor
/// factor  := number | identifier | identifier '(' arglist ')' | '(' expr ')'
/// arglist := expr (',' expr)*
/// ```
pub fn parse_expression(source: &str) -> Result<ExprAst, CompileError> {
    let mut parser = Parser::new(source);
    let expr = parser.parse_expr()?;
    match parser.next_token()? {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected trailing token: {other:?}"))),
    }
}

/// Deepest accepted nesting of parentheses, calls, signs and chained operators.
pub const MAX_NESTING: usize = 256;

struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    lookahead: Option<Token>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lexer: Lexer::new(source),
            lookahead: None,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error(format!(
                "expression nests deeper than {MAX_NESTING} levels"
            )));
        }
        Ok(())
    }

    fn error(&self, reason: String) -> CompileError {
        CompileError::Syntax {
            expr: self.source.to_string(),
            reason,
        }
    }

    fn next_token(&mut self) -> Result<Token, CompileError> {
        if let Some(tok) = self.lookahead.take() {
            return Ok(tok);
        }
        self.lexer.next_token()
    }

    fn peek_token(&mut self) -> Result<&Token, CompileError> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.lexer.next_token()?);
        }
        Ok(self.lookahead.get_or_insert(Token::Eof))
    }

    fn parse_expr(&mut self) -> Result<ExprAst, CompileError> {
        let mut lhs = self.parse_term()?;
        let mut chained = 0;
        loop {
            let op = match self.peek_token()? {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.next_token()?;
            self.descend()?;
            chained += 1;
            let rhs = self.parse_term()?;
            lhs = ExprAst::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth -= chained;
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<ExprAst, CompileError> {
        let mut lhs = self.parse_unary()?;
        let mut chained = 0;
        loop {
            let op = match self.peek_token()? {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            self.next_token()?;
            self.descend()?;
            chained += 1;
            let rhs = self.parse_unary()?;
            lhs = ExprAst::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth -= chained;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ExprAst, CompileError> {
        self.descend()?;
        let expr = match self.peek_token()? {
            Token::Plus => {
                self.next_token()?;
                self.parse_unary()
            }
            Token::Minus => {
                self.next_token()?;
                let expr = self.parse_unary()?;
                Ok(match expr {
                    ExprAst::Number(value) => ExprAst::Number(-value),
                    other => ExprAst::Neg(Box::new(other)),
                })
            }
            _ => self.parse_factor(),
        };
        self.depth -= 1;
        expr
    }

    fn parse_factor(&mut self) -> Result<ExprAst, CompileError> {
        match self.next_token()? {
            Token::Ident(name) => {
                if matches!(self.peek_token()?, Token::LParen) {
                    self.next_token()?; // consume '('
                    let args = self.parse_arg_list()?;
                    self.expect_token(Token::RParen)?;
                    Ok(ExprAst::Call { name, args })
                } else {
                    Ok(ExprAst::Identifier(name))
                }
            }
            Token::Number(value) => Ok(ExprAst::Number(value)),
            Token::LParen => {
                let expr = self.parse_expr()?;
                self.expect_token(Token::RParen)?;
                Ok(expr)
            }
            Token::Eof => Err(self.error("unexpected end of expression".to_string())),
            other => Err(self.error(format!("unexpected token: {other:?}"))),
        }
    }

    fn parse_arg_list(&mut self) -> Result<Vec<ExprAst>, CompileError> {
        let mut args = Vec::new();
        if matches!(self.peek_token()?, Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.peek_token()? {
                Token::Comma => {
                    self.next_token()?;
                }
                Token::RParen => break,
                Token::Eof => {
                    return Err(self.error("unexpected EOF in argument list".to_string()));
                }
                other => {
                    let reason = format!("invalid token in argument list: {other:?}");
                    return Err(self.error(reason));
                }
            }
        }
        Ok(args)
    }

    fn expect_token(&mut self, expected: Token) -> Result<(), CompileError> {
        let got = self.next_token()?;
        if got == expected {
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}, got {got:?}")))
        }
    }
}
