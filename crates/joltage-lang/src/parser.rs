use crate::ast::*;
use crate::lexer::{LexError, Lexer, Span, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of file")]
    UnexpectedEof,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error(transparent)]
    Lex(#[from] LexError),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = Lexer::tokenize(source)?;
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    /// Comments only; newlines end a machine and are significant.
    fn skip_comments(&mut self) {
        while self.peek_kind() == TokenKind::Comment {
            self.advance();
        }
    }

    fn skip_newlines_and_comments(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Comment) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(t) if t.kind != TokenKind::Eof => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: format!("{:?}", t.kind),
                span: t.span,
            },
            _ => ParseError::UnexpectedEof,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        self.skip_comments();
        match self.current().cloned() {
            Some(t) if t.kind == kind => {
                self.advance();
                Ok(t)
            }
            _ => Err(self.unexpected(&format!("{:?}", kind))),
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut machines = Vec::new();

        loop {
            self.skip_newlines_and_comments();
            if self.peek_kind() == TokenKind::Eof {
                break;
            }
            machines.push(self.parse_machine()?);

            self.skip_comments();
            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Eof => {}
                _ => return Err(self.unexpected("end of line")),
            }
        }

        Ok(Program { machines })
    }

    fn parse_machine(&mut self) -> Result<Machine, ParseError> {
        self.skip_comments();
        let start = self
            .current()
            .map(|t| t.span)
            .ok_or(ParseError::UnexpectedEof)?;

        let lights = if self.peek_kind() == TokenKind::LBracket {
            Some(self.parse_lights()?)
        } else {
            None
        };

        let mut buttons = Vec::new();
        loop {
            self.skip_comments();
            match self.peek_kind() {
                TokenKind::LParen => buttons.push(self.parse_button()?),
                TokenKind::LBrace => break,
                _ => return Err(self.unexpected("button or joltage block")),
            }
        }

        self.expect(TokenKind::LBrace)?;
        let joltages = self
            .parse_number_list(TokenKind::RBrace)?
            .into_iter()
            .map(|(n, _)| n as i64)
            .collect();
        let end = self.expect(TokenKind::RBrace)?.span;

        Ok(Machine {
            span: start.merge(end),
            lights,
            buttons,
            joltages,
        })
    }

    fn parse_lights(&mut self) -> Result<Vec<bool>, ParseError> {
        self.expect(TokenKind::LBracket)?;
        let mut lights = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Dot => lights.push(false),
                TokenKind::Hash => lights.push(true),
                TokenKind::RBracket => break,
                _ => return Err(self.unexpected("'.', '#' or ']'")),
            }
            self.advance();
        }
        self.expect(TokenKind::RBracket)?;
        Ok(lights)
    }

    fn parse_button(&mut self) -> Result<Button, ParseError> {
        let start = self.expect(TokenKind::LParen)?.span;
        let counters = self
            .parse_number_list(TokenKind::RParen)?
            .into_iter()
            .map(|(n, span)| usize::try_from(n).map_err(|_| ParseError::InvalidNumber(format!("{} at {:?}", n, span))))
            .collect::<Result<Vec<_>, _>>()?;
        let end = self.expect(TokenKind::RParen)?.span;
        Ok(Button {
            span: start.merge(end),
            counters,
        })
    }

    /// `n (, n)*` up to, but not including, `close`. May be empty.
    fn parse_number_list(&mut self, close: TokenKind) -> Result<Vec<(u64, Span)>, ParseError> {
        let mut numbers = Vec::new();
        self.skip_comments();
        if self.peek_kind() == close {
            return Ok(numbers);
        }
        loop {
            let token = self.expect(TokenKind::Number)?;
            let value = token
                .text
                .parse::<u64>()
                .ok()
                .filter(|&n| n <= i64::MAX as u64)
                .ok_or_else(|| ParseError::InvalidNumber(token.text.clone()))?;
            numbers.push((value, token.span));

            self.skip_comments();
            if self.peek_kind() == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok(numbers)
    }
}
