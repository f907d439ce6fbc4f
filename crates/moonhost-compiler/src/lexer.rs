use crate::token::{Span, SpannedToken, Token};
use std::fmt;

/// Lexer error.
#[derive(Clone, Debug, PartialEq)]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for LexError {}

/// Pull-based lexer for Lua 5.1 source.
pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    current: Option<Result<SpannedToken, LexError>>,
    /// Original text of the current token (used for "near" in error messages).
    pub token_text: String,
    /// Line number of the last consumed token.
    pub lastline: u32,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from source bytes.
    pub fn new(source: &'a [u8]) -> Self {
        let mut lexer = Lexer {
            source,
            pos: 0,
            line: 1,
            column: 1,
            current: None,
            token_text: String::new(),
            lastline: 1,
        };
        lexer.skip_shebang();
        // Prime the first token
        lexer.current = Some(lexer.scan_token());
        lexer
    }

    /// Peek at the current token without consuming.
    pub fn current(&self) -> Result<&SpannedToken, &LexError> {
        match &self.current {
            Some(Ok(tok)) => Ok(tok),
            Some(Err(e)) => Err(e),
            None => unreachable!("lexer should always have a current token"),
        }
    }

    /// Consume the current token and advance to the next one.
    pub fn advance(&mut self) -> Result<SpannedToken, LexError> {
        if let Some(Ok(ref tok)) = self.current {
            self.lastline = tok.span.line;
        }
        let prev = self
            .current
            .take()
            .unwrap_or_else(|| unreachable!("lexer should always have a current token"));
        self.current = Some(self.scan_token());
        prev
    }

    /// Get current line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    // ---- Internal scanning ----

    fn skip_shebang(&mut self) {
        if self.source.first() == Some(&b'#') {
            while let Some(ch) = self.peek() {
                if ch == b'\n' {
                    break;
                }
                self.advance_char();
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance_char(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' || ch == b'\r' {
            // \r\n and \n\r count as one newline
            if let Some(next) = self.peek() {
                if (next == b'\n' || next == b'\r') && next != ch {
                    self.pos += 1;
                }
            }
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            while let Some(ch) = self.peek() {
                if matches!(ch, b' ' | b'\t' | b'\n' | b'\r' | b'\x0B' | b'\x0C') {
                    self.advance_char();
                } else {
                    break;
                }
            }

            if self.peek() == Some(b'-') && self.peek_at(1) == Some(b'-') {
                let span = Span {
                    line: self.line,
                    column: self.column,
                };
                self.advance_char();
                self.advance_char();
                if let Some(level) = self.check_long_bracket() {
                    self.scan_long_string_content(level, span, "comment")?;
                    continue;
                }
                while let Some(ch) = self.peek() {
                    if ch == b'\n' || ch == b'\r' {
                        break;
                    }
                    self.advance_char();
                }
                continue;
            }

            return Ok(());
        }
    }

    /// Check if current position starts a long bracket `[=*[`. Returns the level if so.
    fn check_long_bracket(&self) -> Option<usize> {
        if self.peek() != Some(b'[') {
            return None;
        }
        let mut level = 0;
        let mut offset = 1;
        while self.peek_at(offset) == Some(b'=') {
            level += 1;
            offset += 1;
        }
        if self.peek_at(offset) == Some(b'[') {
            Some(level)
        } else {
            None
        }
    }

    fn scan_token(&mut self) -> Result<SpannedToken, LexError> {
        self.skip_whitespace_and_comments()?;

        let token_start = self.pos;
        let result = self.scan_token_inner();
        let token_end = self.pos.min(self.source.len());
        if token_start < token_end {
            self.token_text =
                String::from_utf8_lossy(&self.source[token_start..token_end]).into_owned();
        }
        result
    }

    fn single(&mut self, token: Token, span: Span) -> Result<SpannedToken, LexError> {
        self.advance_char();
        Ok(SpannedToken { token, span })
    }

    /// Consume `first`, then take `second` as the token if the next byte is `follow`.
    fn either(
        &mut self,
        follow: u8,
        second: Token,
        first: Token,
        span: Span,
    ) -> Result<SpannedToken, LexError> {
        self.advance_char();
        if self.peek() == Some(follow) {
            self.advance_char();
            Ok(SpannedToken {
                token: second,
                span,
            })
        } else {
            Ok(SpannedToken { token: first, span })
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> LexError {
        LexError {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    fn scan_token_inner(&mut self) -> Result<SpannedToken, LexError> {
        let span = Span {
            line: self.line,
            column: self.column,
        };

        let ch = match self.peek() {
            Some(ch) => ch,
            None => {
                self.token_text = "<eof>".to_string();
                return Ok(SpannedToken {
                    token: Token::Eof,
                    span,
                });
            }
        };

        match ch {
            b'+' => self.single(Token::Plus, span),
            b'-' => self.single(Token::Minus, span),
            b'*' => self.single(Token::Star, span),
            b'/' => self.single(Token::Slash, span),
            b'%' => self.single(Token::Percent, span),
            b'^' => self.single(Token::Caret, span),
            b'#' => self.single(Token::Hash, span),
            b'(' => self.single(Token::LParen, span),
            b')' => self.single(Token::RParen, span),
            b'{' => self.single(Token::LBrace, span),
            b'}' => self.single(Token::RBrace, span),
            b']' => self.single(Token::RBracket, span),
            b';' => self.single(Token::Semi, span),
            b':' => self.single(Token::Colon, span),
            b',' => self.single(Token::Comma, span),
            b'<' => self.either(b'=', Token::LessEq, Token::Less, span),
            b'>' => self.either(b'=', Token::GreaterEq, Token::Greater, span),
            b'=' => self.either(b'=', Token::Equal, Token::Assign, span),
            b'~' => {
                self.advance_char();
                if self.peek() == Some(b'=') {
                    self.advance_char();
                    Ok(SpannedToken {
                        token: Token::NotEqual,
                        span,
                    })
                } else {
                    Err(self.error("unexpected symbol near '~'", span))
                }
            }
            b'[' => match self.check_long_bracket() {
                Some(level) => {
                    let content = self.scan_long_string_content(level, span, "string")?;
                    Ok(SpannedToken {
                        token: Token::String(content),
                        span,
                    })
                }
                None => self.single(Token::LBracket, span),
            },
            b'.' => {
                if self.peek_at(1) == Some(b'.') {
                    self.advance_char();
                    self.advance_char();
                    if self.peek() == Some(b'.') {
                        self.advance_char();
                        return Ok(SpannedToken {
                            token: Token::DotDotDot,
                            span,
                        });
                    }
                    return Ok(SpannedToken {
                        token: Token::DotDot,
                        span,
                    });
                }
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    return self.scan_number(span);
                }
                self.single(Token::Dot, span)
            }
            b'"' | b'\'' => self.scan_short_string(span),
            b'0'..=b'9' => self.scan_number(span),
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == b'_' {
                        self.advance_char();
                    } else {
                        break;
                    }
                }
                let word = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
                let token = Token::keyword_from_str(&word).unwrap_or(Token::Name(word));
                Ok(SpannedToken { token, span })
            }
            other => {
                self.advance_char();
                Err(self.error(
                    format!("unexpected symbol near '{}'", char::from(other)),
                    span,
                ))
            }
        }
    }

    fn scan_number(&mut self, span: Span) -> Result<SpannedToken, LexError> {
        let start = self.pos;
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.advance_char();
            self.advance_char();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance_char();
            }
            let digits = std::str::from_utf8(&self.source[digits_start..self.pos]).unwrap_or("");
            self.reject_trailing_word(start, span)?;
            return match u64::from_str_radix(digits, 16) {
                Ok(v) => Ok(SpannedToken {
                    token: Token::Number(v as f64),
                    span,
                }),
                Err(_) => Err(self.malformed(start, span)),
            };
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == b'.') {
            self.advance_char();
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            self.advance_char();
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.advance_char();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance_char();
            }
        }
        self.reject_trailing_word(start, span)?;

        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("");
        match text.parse::<f64>() {
            Ok(n) => Ok(SpannedToken {
                token: Token::Number(n),
                span,
            }),
            Err(_) => Err(self.malformed(start, span)),
        }
    }

    /// A number directly followed by a letter or underscore is malformed.
    fn reject_trailing_word(&mut self, start: usize, span: Span) -> Result<(), LexError> {
        if self
            .peek()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == b'_')
        {
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.')
            {
                self.advance_char();
            }
            return Err(self.malformed(start, span));
        }
        Ok(())
    }

    fn malformed(&self, start: usize, span: Span) -> LexError {
        let text = String::from_utf8_lossy(&self.source[start..self.pos]);
        self.error(format!("malformed number near '{text}'"), span)
    }

    fn scan_short_string(&mut self, span: Span) -> Result<SpannedToken, LexError> {
        let quote = self.advance_char().unwrap_or(b'"');
        let mut buf = Vec::new();

        loop {
            match self.peek() {
                None => return Err(self.error("unfinished string near <eof>", span)),
                Some(b'\n') | Some(b'\r') => {
                    let text = String::from_utf8_lossy(&buf).into_owned();
                    return Err(self.error(
                        format!("unfinished string near '{}{}'", char::from(quote), text),
                        span,
                    ));
                }
                Some(ch) if ch == quote => {
                    self.advance_char();
                    break;
                }
                Some(b'\\') => {
                    self.advance_char();
                    self.scan_escape(&mut buf, span)?;
                }
                Some(ch) => {
                    self.advance_char();
                    buf.push(ch);
                }
            }
        }

        Ok(SpannedToken {
            token: Token::String(String::from_utf8_lossy(&buf).into_owned()),
            span,
        })
    }

    fn scan_escape(&mut self, buf: &mut Vec<u8>, span: Span) -> Result<(), LexError> {
        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Err(self.error("unfinished string near <eof>", span)),
        };
        let simple = match ch {
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0C),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'v' => Some(0x0B),
            b'\\' => Some(b'\\'),
            b'\'' => Some(b'\''),
            b'"' => Some(b'"'),
            b'\n' | b'\r' => Some(b'\n'),
            _ => None,
        };
        if let Some(byte) = simple {
            self.advance_char();
            buf.push(byte);
            return Ok(());
        }
        if ch.is_ascii_digit() {
            // \ddd: up to three decimal digits
            let mut value: u32 = 0;
            let mut count = 0;
            while count < 3 {
                match self.peek() {
                    Some(d) if d.is_ascii_digit() => {
                        self.advance_char();
                        value = value * 10 + u32::from(d - b'0');
                        count += 1;
                    }
                    _ => break,
                }
            }
            if value > 255 {
                return Err(self.error("escape sequence too large", span));
            }
            buf.push(value as u8);
            return Ok(());
        }
        Err(self.error(
            format!("invalid escape sequence near '\\{}'", char::from(ch)),
            span,
        ))
    }

    /// Scan the body of a long bracket, returning its content.
    fn scan_long_string_content(
        &mut self,
        level: usize,
        span: Span,
        what: &str,
    ) -> Result<String, LexError> {
        // Opening bracket: [ ={level} [
        for _ in 0..level + 2 {
            self.advance_char();
        }
        // A newline immediately following the opening bracket is skipped
        if matches!(self.peek(), Some(b'\n') | Some(b'\r')) {
            self.advance_char();
        }
        let mut buf = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(self.error(format!("unfinished long {what} near <eof>"), span));
                }
                Some(b']') => {
                    let mut offset = 1;
                    while self.peek_at(offset) == Some(b'=') {
                        offset += 1;
                    }
                    if offset - 1 == level && self.peek_at(offset) == Some(b']') {
                        for _ in 0..level + 2 {
                            self.advance_char();
                        }
                        return Ok(String::from_utf8_lossy(&buf).into_owned());
                    }
                    self.advance_char();
                    buf.push(b']');
                }
                Some(b'\n') | Some(b'\r') => {
                    self.advance_char();
                    buf.push(b'\n');
                }
                Some(ch) => {
                    self.advance_char();
                    buf.push(ch);
                }
            }
        }
    }
}
