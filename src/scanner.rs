use std::iter::FusedIterator;

use log::{debug, info};
use phf::phf_map;

use crate::error::LoxError;
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => TokenType::AND,
    "class" => TokenType::CLASS,
    "else" => TokenType::ELSE,
    "false" => TokenType::FALSE,
    "fun" => TokenType::FUN,
    "for" => TokenType::FOR,
    "if" => TokenType::IF,
    "nil" => TokenType::NIL,
    "or" => TokenType::OR,
    "print" => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super" => TokenType::SUPER,
    "this" => TokenType::THIS,
    "true" => TokenType::TRUE,
    "var" => TokenType::VAR,
    "while" => TokenType::WHILE,
};

/// Lexical scanner over a Lox source string.
///
/// The scanner is an infallible iterator: the token stream always terminates
/// with a single `EOF`. A lexical error yields one `ILLEGAL` token with an
/// empty lexeme and records the diagnostic, to be drained by the caller.
#[derive(Debug)]
pub struct Scanner {
    source: Vec<char>,
    start: usize,
    curr_ptr: usize,
    line: usize,
    had_error: bool,
    pending_token: Option<TokenType>,
    diagnostics: Vec<LoxError>,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        info!("Initializing Scanner with {} bytes of source", source.len());
        Self {
            source: source.chars().collect(),
            start: 0,
            curr_ptr: 0,
            line: 1,
            had_error: false,
            pending_token: None,
            diagnostics: Vec::new(),
        }
    }

    #[inline]
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Drains the lexical diagnostics recorded so far.
    pub fn take_diagnostics(&mut self) -> Vec<LoxError> {
        std::mem::take(&mut self.diagnostics)
    }

    fn scan_token(&mut self) -> Result<(), LoxError> {
        let ch: char = self.advance();
        debug!("Processing char {:?} at line {}", ch, self.line);

        match ch {
            '(' => self.add_token(TokenType::LEFT_PAREN),

            ')' => self.add_token(TokenType::RIGHT_PAREN),

            '{' => self.add_token(TokenType::LEFT_BRACE),

            '}' => self.add_token(TokenType::RIGHT_BRACE),

            ',' => self.add_token(TokenType::COMMA),

            '.' => self.add_token(TokenType::DOT),

            '-' => self.add_token(TokenType::MINUS),

            '+' => self.add_token(TokenType::PLUS),

            ';' => self.add_token(TokenType::SEMICOLON),

            '*' => self.add_token(TokenType::STAR),

            '!' => {
                let token_type: TokenType = if self.match_char('=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };
                self.add_token(token_type);
            }

            '=' => {
                let token_type: TokenType = if self.match_char('=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };
                self.add_token(token_type);
            }

            '<' => {
                let token_type: TokenType = if self.match_char('=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                };
                self.add_token(token_type);
            }

            '>' => {
                let token_type: TokenType = if self.match_char('=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };
                self.add_token(token_type);
            }

            '\n' => {
                self.line += 1;
            }

            '/' => {
                if self.match_char('/') {
                    debug!("Found comment, skipping until newline");
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::SLASH);
                }
            }

            '"' => {
                self.parse_string()?;
            }

            c if c.is_whitespace() => {
                debug!("Skipping whitespace");
            }

            c if c.is_numeric() => {
                self.parse_number()?;
            }

            c if c.is_alphabetic() => {
                self.parse_identifier();
            }

            _ => {
                debug!("Unexpected character {:?} at line {}", ch, self.line);

                self.had_error = true;

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", ch),
                ));
            }
        }

        Ok(())
    }

    fn parse_string(&mut self) -> Result<(), LoxError> {
        debug!("Parsing string literal at line {}", self.line);

        let mut literal: String = String::new();

        loop {
            if self.is_at_end() {
                self.had_error = true;
                return Err(LoxError::lex(self.line, "Unterminated string."));
            }

            let ch: char = self.advance();

            match ch {
                '"' => break,

                '\n' => {
                    self.line += 1;
                    literal.push(ch);
                }

                '\\' => {
                    if self.is_at_end() {
                        self.had_error = true;
                        return Err(LoxError::lex(self.line, "Lone '\\' in string."));
                    }

                    match self.advance() {
                        '"' => literal.push('"'),

                        'u' => {
                            let mut code: u32 = 0;
                            for _ in 0..4 {
                                if !self.peek().is_ascii_hexdigit() {
                                    self.had_error = true;
                                    return Err(LoxError::lex(
                                        self.line,
                                        "Malformed '\\u' escape.",
                                    ));
                                }
                                code = code * 16 + self.advance().to_digit(16).unwrap_or(0);
                            }
                            // Hex values that are not scalar values (surrogates)
                            // decode to U+FFFD.
                            literal
                                .push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                        }

                        // Unrecognized escapes drop both characters.
                        _ => {}
                    }
                }

                _ => literal.push(ch),
            }
        }

        info!("Parsed string literal: {}", literal);

        self.add_token(TokenType::STRING(literal));

        Ok(())
    }

    fn parse_number(&mut self) -> Result<(), LoxError> {
        debug!("Parsing number starting at position {}", self.start);

        while self.peek().is_numeric() {
            self.advance();
        }

        // A trailing '.' without fractional digits stays in the stream.
        if self.peek() == '.' && self.peek_next().is_numeric() {
            self.advance();

            while self.peek().is_numeric() {
                self.advance();
            }
        }

        if self.peek() == 'e' || self.peek() == 'E' {
            self.advance();

            if self.peek() == '+' || self.peek() == '-' {
                self.advance();
            }

            if !self.peek().is_ascii_digit() {
                self.had_error = true;
                return Err(LoxError::lex(self.line, "Exponent has no digits."));
            }

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.source[self.start..self.curr_ptr].iter().collect();
        let number: f64 = text.parse().unwrap_or(0.0);

        info!("Parsed number: {}", number);

        self.add_token(TokenType::NUMBER(number));

        Ok(())
    }

    fn parse_identifier(&mut self) {
        debug!("Parsing identifier starting at position {}", self.start);

        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text: String = self.source[self.start..self.curr_ptr].iter().collect();

        match KEYWORDS.get(text.as_str()) {
            Some(token_type) => {
                info!("Parsed keyword: {}", text);

                self.add_token(token_type.clone());
            }

            None => {
                info!("Parsed identifier: {}", text);

                self.add_token(TokenType::IDENTIFIER);
            }
        }
    }

    #[inline]
    fn add_token(&mut self, token_type: TokenType) {
        self.pending_token = Some(token_type);
    }

    #[inline]
    fn advance(&mut self) -> char {
        let ch: char = self.source[self.curr_ptr];

        self.curr_ptr += 1;

        ch
    }

    #[inline]
    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.curr_ptr] != expected {
            false
        } else {
            self.curr_ptr += 1;

            true
        }
    }

    #[inline]
    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.curr_ptr]
        }
    }

    #[inline]
    fn peek_next(&self) -> char {
        if self.curr_ptr + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.curr_ptr + 1]
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.curr_ptr >= self.source.len()
    }
}

impl Iterator for Scanner {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if self.is_at_end() {
                if self.curr_ptr == self.source.len() {
                    self.curr_ptr += 1;

                    info!("Reached EOF at line {}", self.line);

                    return Some(Token::new(TokenType::EOF, String::new(), self.line));
                }

                return None;
            }

            self.pending_token = None;

            self.start = self.curr_ptr;

            if let Err(err) = self.scan_token() {
                debug!("Scan error: {}", err);

                self.diagnostics.push(err);

                return Some(Token::new(TokenType::ILLEGAL, String::new(), self.line));
            }

            if let Some(token_type) = self.pending_token.take() {
                let lexeme: String = self.source[self.start..self.curr_ptr].iter().collect();

                info!(
                    "Emitting token: type={:?}, lexeme={}, line={}",
                    token_type, lexeme, self.line
                );

                return Some(Token::new(token_type, lexeme, self.line));
            }

            // Whitespace or a comment: keep scanning.
        }
    }
}

impl FusedIterator for Scanner {}
