use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character {ch:?} at position {span:?}")]
    UnexpectedChar { ch: char, span: Span },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    /// `.` (light off)
    Dot,
    /// `#` (light on)
    Hash,
    Comma,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    /// Ends a machine
    Newline,
    Comment,
    Eof,
}

impl TokenKind {
    fn punctuation(c: char) -> Option<Self> {
        Some(match c {
            '.' => Self::Dot,
            '#' => Self::Hash,
            ',' => Self::Comma,
            '{' => Self::LBrace,
            '}' => Self::RBrace,
            '[' => Self::LBracket,
            ']' => Self::RBracket,
            '(' => Self::LParen,
            ')' => Self::RParen,
            '\n' => Self::Newline,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// Scanner over machine descriptions. Spans are byte offsets into the source.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    /// All tokens up to and including `Eof`.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.source.len(), |&(i, _)| i)
    }

    /// Consumes characters while `keep` holds; the span runs from `start`.
    fn take_while(&mut self, start: usize, keep: impl Fn(char) -> bool) -> Span {
        while self.chars.next_if(|&(_, c)| keep(c)).is_some() {}
        Span::new(start, self.offset())
    }

    fn token(&self, kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            span,
            text: self.source[span.start..span.end].to_string(),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        while self.chars.next_if(|&(_, c)| matches!(c, ' ' | '\t' | '\r')).is_some() {}

        let Some((start, c)) = self.chars.next() else {
            let end = self.source.len();
            return Ok(self.token(TokenKind::Eof, Span::new(end, end)));
        };

        if let Some(kind) = TokenKind::punctuation(c) {
            return Ok(self.token(kind, Span::new(start, start + 1)));
        }
        if c.is_ascii_digit() {
            let span = self.take_while(start, |c| c.is_ascii_digit());
            return Ok(self.token(TokenKind::Number, span));
        }
        if c == '/' && self.chars.next_if(|&(_, c)| c == '/').is_some() {
            let span = self.take_while(start, |c| c != '\n');
            return Ok(self.token(TokenKind::Comment, span));
        }

        Err(LexError::UnexpectedChar {
            ch: c,
            span: Span::new(start, start + c.len_utf8()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_machine_line() {
        use TokenKind::*;
        assert_eq!(
            kinds("[.#] (1) {3,5}"),
            vec![LBracket, Dot, Hash, RBracket, LParen, Number, RParen, LBrace, Number, Comma, Number, RBrace, Eof]
        );
    }

    #[test]
    fn test_numbers_and_spans() {
        let tokens = Lexer::tokenize("(12,3)\t100").unwrap();
        assert_eq!(tokens[1].text, "12");
        assert_eq!(tokens[1].span, Span::new(1, 3));
        assert_eq!(tokens[3].span, Span::new(4, 5));
        assert_eq!(tokens[5].text, "100");
        assert_eq!(tokens[6].span, Span::new(10, 10));
    }

    #[test]
    fn test_comments_stop_at_newline() {
        use TokenKind::*;
        assert_eq!(
            kinds("{1} // comment\r\n{2}"),
            vec![LBrace, Number, RBrace, Comment, Newline, LBrace, Number, RBrace, Eof]
        );
        let tokens = Lexer::tokenize("// note").unwrap();
        assert_eq!(tokens[0].text, "// note");
    }

    #[test]
    fn test_unknown_characters() {
        assert_eq!(
            Lexer::tokenize("{1} x"),
            Err(LexError::UnexpectedChar {
                ch: 'x',
                span: Span::new(4, 5),
            })
        );
        // A single slash is not a comment.
        assert!(matches!(
            Lexer::tokenize("(1) / (2)"),
            Err(LexError::UnexpectedChar { ch: '/', .. })
        ));
        assert!(matches!(
            Lexer::tokenize("{é}"),
            Err(LexError::UnexpectedChar { ch: 'é', span }) if span == Span::new(1, 3)
        ));
    }
}
