//! Lexer (tokenizer) for the expression grammar.
//!
//! Converts source text directly into a token tree: parenthesized groups,
//! function arguments and conditional branches are scanned recursively.
//! The lexer never fails. Anything it cannot make sense of is repaired or
//! dropped and reported as a [`Diagnostic`](crate::errors::Diagnostic).

pub mod token;

use std::ops::Range;

use crate::config::Config;
use crate::errors::{Diagnostics, Stage};
use token::{Operator, Token};

/// Position within one region of the source
struct Cursor<'a> {
    source: &'a str,
    position: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str, region: Range<usize>) -> Self {
        Self {
            source,
            position: region.start,
            end: region.end,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position..self.end]
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.end
    }

    /// Peek at the current character without consuming
    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Peek at a character at offset from current position
    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    fn advance_bytes(&mut self, len: usize) {
        self.position = (self.position + len).min(self.end);
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let start = self.position;
        while self.peek_char().is_some_and(&predicate) {
            self.advance();
        }
        &self.source[start..self.position]
    }

    /// Skip spaces and tabs
    fn skip_blanks(&mut self) {
        self.take_while(|c| c == ' ' || c == '\t');
    }
}

/// Tracks whether scanning is inside a string literal
#[derive(Debug, Default)]
struct QuoteState {
    quote: Option<char>,
    escaping: bool,
}

impl QuoteState {
    /// Feed one character; true when it is outside any string literal
    fn feed(&mut self, ch: char) -> bool {
        match self.quote {
            None if ch == '\'' || ch == '"' => {
                self.quote = Some(ch);
                false
            }
            None => true,
            Some(_) if self.escaping => {
                self.escaping = false;
                false
            }
            Some(_) if ch == '\\' => {
                self.escaping = true;
                false
            }
            Some(quote) => {
                if ch == quote {
                    self.quote = None;
                }
                false
            }
        }
    }

    fn in_string(&self) -> bool {
        self.quote.is_some()
    }
}

/// Result of scanning one conditional branch
struct BranchScan {
    region: Range<usize>,
    terminated: bool,
    in_string: bool,
    depth: i32,
}

/// Lexer for expression source text
pub struct Lexer<'a> {
    /// Source code being lexed
    source: &'a str,
    config: Config,
    diagnostics: Diagnostics,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'a str) -> Self {
        Self::with_config(source, Config::default())
    }

    pub fn with_config(source: &'a str, config: Config) -> Self {
        Self {
            source,
            config,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Get the source code
    pub fn source(&self) -> &str {
        self.source
    }

    /// Diagnostics collected so far
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Take collected diagnostics (consumes them)
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Tokenize the whole source as an expression
    pub fn tokenize(&mut self) -> Vec<Token> {
        self.scan(0..self.source.len(), false, 0)
    }

    /// Tokenize the whole source as a function argument list (commas allowed)
    pub fn tokenize_arguments(&mut self) -> Vec<Token> {
        self.scan(0..self.source.len(), true, 0)
    }

    fn scan(&mut self, region: Range<usize>, in_arguments: bool, depth: usize) -> Vec<Token> {
        if depth > self.config.max_depth {
            self.diagnostics.warn_at(
                Stage::Parser,
                region,
                format!(
                    "nesting deeper than {} levels is ignored",
                    self.config.max_depth
                ),
            );
            return Vec::new();
        }

        let mut cursor = Cursor::new(self.source, region);
        let mut tokens = Vec::new();

        loop {
            cursor.skip_blanks();
            let Some(ch) = cursor.peek_char() else {
                break;
            };
            let start = cursor.position;

            let mut token = if ch.is_ascii_alphabetic() || ch == '_' {
                self.lex_word(&mut cursor)
            } else if ch.is_ascii_digit()
                || (ch == '.' && cursor.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()))
            {
                self.lex_number(&mut cursor)
            } else if ch == '\'' || ch == '"' {
                self.lex_string(&mut cursor)
            } else if let Some((op, len)) = Operator::match_symbol(cursor.rest()) {
                cursor.advance_bytes(len);
                if op == Operator::Comma && !in_arguments {
                    self.diagnostics.warn_at(
                        Stage::Parser,
                        start..cursor.position,
                        "comma operator is only allowed between function arguments, ignoring",
                    );
                    continue;
                }
                Token::Operator(op)
            } else {
                Token::Undefined
            };

            if cursor.peek_char() == Some('(')
                && matches!(token, Token::Variable(_) | Token::Undefined)
            {
                let interior = self.take_parenthesized(&mut cursor);
                token = match token {
                    Token::Variable(name) => Token::Function {
                        name,
                        args: self.scan(interior, true, depth + 1),
                    },
                    _ => Token::Group(self.scan(interior, false, depth + 1)),
                };
            }

            if token.is_undefined() && cursor.peek_char() == Some('?') {
                token = self.lex_conditional(&mut cursor, depth);
            }

            if token.is_undefined() {
                if in_arguments {
                    self.diagnostics.warn_at(
                        Stage::Parser,
                        start..cursor.end,
                        format!("unexpected character '{}' ends the argument list", ch),
                    );
                    break;
                }
                cursor.advance();
                self.diagnostics.warn_at(
                    Stage::Parser,
                    start..cursor.position,
                    format!("unexpected character '{}' ignored", ch),
                );
            }

            self.push_token(&mut tokens, token, start..cursor.position);
        }

        tokens
    }

    /// Append a token, applying the operator adjacency rules
    fn push_token(&mut self, tokens: &mut Vec<Token>, token: Token, span: Range<usize>) {
        let op = match token {
            Token::Operator(op) => op,
            _ => {
                tokens.push(token);
                return;
            }
        };
        let Some(previous) = tokens.last().and_then(Token::as_operator) else {
            tokens.push(token);
            return;
        };

        match (previous, op) {
            (Operator::Not, Operator::Not) => {
                if let Some(last) = tokens.last_mut() {
                    *last = Token::Operator(Operator::DoubleNot);
                }
            }
            (Operator::DoubleNot, Operator::Not) => self.diagnostics.error_at(
                Stage::Parser,
                span,
                "more than two NOT(!) operators in sequence, place them inside parentheses; ignoring",
            ),
            (Operator::Not, Operator::Sub) => self.diagnostics.error_at(
                Stage::Parser,
                span,
                "SUB(-) may not follow NOT(!), place the negative value inside parentheses; ignoring",
            ),
            (Operator::Sub, Operator::Not) => self.diagnostics.error_at(
                Stage::Parser,
                span,
                "NOT(!) may not follow SUB(-), place the NOT expression inside parentheses; ignoring",
            ),
            (Operator::Sub, Operator::Sub) => {
                // two signs cancel out
                tokens.pop();
            }
            (previous, op) if !op.is_sign() => self.diagnostics.warn_at(
                Stage::Parser,
                span,
                format!("operator {} cannot follow operator {}, ignoring", op, previous),
            ),
            _ => tokens.push(token),
        }
    }

    /// Lex an identifier, a namespaced name, or an alphabetic operator
    fn lex_word(&mut self, cursor: &mut Cursor<'a>) -> Token {
        let start = cursor.position;
        cursor.take_while(|c| c.is_ascii_alphanumeric() || c == '_');

        if cursor.rest().starts_with("::")
            && cursor
                .peek_char_at(2)
                .is_some_and(|c| c.is_ascii_alphabetic())
        {
            cursor.advance_bytes(2);
            cursor.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        }

        let word = &self.source[start..cursor.position];
        match Operator::from_word(word) {
            Some(op) => Token::Operator(op),
            None => Token::variable(word),
        }
    }

    /// Lex a number: digits with an optional fraction, or a leading `.`
    fn lex_number(&mut self, cursor: &mut Cursor<'a>) -> Token {
        let start = cursor.position;
        cursor.take_while(|c| c.is_ascii_digit());
        if cursor.peek_char() == Some('.') && cursor.peek_char_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            cursor.advance();
            cursor.take_while(|c| c.is_ascii_digit());
        }

        let text = &self.source[start..cursor.position];
        match text.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => {
                self.diagnostics.error_at(
                    Stage::Parser,
                    start..cursor.position,
                    format!("failed to convert '{}' to a number, using 0", text),
                );
                Token::Number(0.0)
            }
        }
    }

    /// Lex a single- or double-quoted string
    fn lex_string(&mut self, cursor: &mut Cursor<'a>) -> Token {
        let start = cursor.position;
        let quote = cursor.advance();
        let mut value = String::new();

        loop {
            match cursor.advance() {
                None => {
                    self.diagnostics.warn_at(
                        Stage::Parser,
                        start..cursor.position,
                        "unterminated string literal",
                    );
                    break;
                }
                Some(ch) if Some(ch) == quote => break,
                Some('\\') => self.lex_escape_sequence(cursor, &mut value),
                Some(ch) => value.push(ch),
            }
        }

        Token::Text(value)
    }

    /// Lex the escape sequence after a backslash into `value`
    fn lex_escape_sequence(&mut self, cursor: &mut Cursor<'a>, value: &mut String) {
        let start = cursor.position - 1;
        let Some(ch) = cursor.peek_char() else {
            self.diagnostics.warn_at(
                Stage::Parser,
                start..cursor.position,
                "lone backslash at end of string kept",
            );
            value.push('\\');
            return;
        };

        let simple = match ch {
            '\\' | '\'' | '"' => Some(ch),
            'a' => Some('\x07'),
            'b' => Some('\x08'),
            't' => Some('\t'),
            'n' => Some('\n'),
            'v' => Some('\x0b'),
            'f' => Some('\x0c'),
            'r' => Some('\r'),
            _ => None,
        };
        if let Some(decoded) = simple {
            cursor.advance();
            value.push(decoded);
            return;
        }

        if ch == 'x' {
            cursor.advance();
            let digits_start = cursor.position;
            while cursor.position - digits_start < 2
                && cursor.peek_char().is_some_and(|c| c.is_ascii_hexdigit())
            {
                cursor.advance();
            }
            let digits = &self.source[digits_start..cursor.position];
            match u8::from_str_radix(digits, 16) {
                Ok(code) => self.push_code(value, code, start..cursor.position),
                Err(_) => {
                    self.diagnostics.warn_at(
                        Stage::Parser,
                        start..cursor.position,
                        "illegal hex escape sequence, kept as written",
                    );
                    value.push_str("\\x");
                }
            }
            return;
        }

        let octal = cursor.rest().get(..3).filter(|digits| {
            let bytes = digits.as_bytes();
            (b'0'..=b'3').contains(&bytes[0])
                && bytes[1..].iter().all(|b| (b'0'..=b'7').contains(b))
        });
        if let Some(digits) = octal {
            cursor.advance_bytes(3);
            match u8::from_str_radix(digits, 8) {
                Ok(code) => self.push_code(value, code, start..cursor.position),
                Err(_) => value.push_str(digits),
            }
            return;
        }

        cursor.advance();
        self.diagnostics.warn_at(
            Stage::Parser,
            start..cursor.position,
            format!("unknown escape sequence '\\{}', using '{}'", ch, ch),
        );
        value.push(ch);
    }

    fn push_code(&mut self, value: &mut String, code: u8, span: Range<usize>) {
        if code == 0 {
            self.diagnostics
                .warn_at(Stage::Parser, span, "null character in string ignored");
        } else {
            value.push(char::from(code));
        }
    }

    /// Consume a balanced `( ... )`, returning the interior region
    fn take_parenthesized(&mut self, cursor: &mut Cursor<'a>) -> Range<usize> {
        let open = cursor.position;
        cursor.advance();
        let start = cursor.position;
        let mut quotes = QuoteState::default();
        let mut depth = 1usize;

        while let Some(ch) = cursor.peek_char() {
            if quotes.feed(ch) {
                match ch {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            let interior = start..cursor.position;
                            cursor.advance();
                            return interior;
                        }
                    }
                    _ => {}
                }
            }
            cursor.advance();
        }

        let problem = if quotes.in_string() {
            "unterminated string inside parentheses"
        } else {
            "unbalanced parentheses, missing ')'"
        };
        self.diagnostics
            .warn_at(Stage::Parser, open..cursor.position, problem);
        start..cursor.position
    }

    /// Scan up to an unquoted `stop` outside parentheses, consuming it
    fn scan_branch(cursor: &mut Cursor<'a>, stop: char) -> BranchScan {
        let start = cursor.position;
        let mut quotes = QuoteState::default();
        let mut depth = 0i32;

        while let Some(ch) = cursor.peek_char() {
            if quotes.feed(ch) {
                match ch {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ if ch == stop && depth == 0 => {
                        let region = start..cursor.position;
                        cursor.advance();
                        return BranchScan {
                            region,
                            terminated: true,
                            in_string: false,
                            depth,
                        };
                    }
                    _ => {}
                }
            }
            cursor.advance();
        }

        BranchScan {
            region: start..cursor.position,
            terminated: false,
            in_string: quotes.in_string(),
            depth,
        }
    }

    /// Lex `? when_true : when_false`; the false branch ends at the next space
    fn lex_conditional(&mut self, cursor: &mut Cursor<'a>, depth: usize) -> Token {
        let open = cursor.position;
        cursor.advance();
        cursor.skip_blanks();

        let when_true = Self::scan_branch(cursor, ':');
        if !when_true.terminated {
            let problem = if when_true.in_string {
                "uneven quotes inside conditional"
            } else if when_true.depth != 0 {
                "uneven parentheses inside conditional"
            } else {
                "conditional is missing ':'"
            };
            self.diagnostics
                .error_at(Stage::Parser, open..cursor.position, problem);
        }

        cursor.skip_blanks();
        let when_false = Self::scan_branch(cursor, ' ');
        if !when_false.terminated && (when_false.in_string || when_false.depth != 0) {
            let problem = if when_false.in_string {
                "uneven quotes inside conditional"
            } else {
                "uneven parentheses inside conditional"
            };
            self.diagnostics
                .error_at(Stage::Parser, open..cursor.position, problem);
        }

        Token::Conditional {
            when_true: self.branch_tokens(when_true.region, "true", depth),
            when_false: self.branch_tokens(when_false.region, "false", depth),
        }
    }

    fn branch_tokens(&mut self, region: Range<usize>, which: &str, depth: usize) -> Vec<Token> {
        if self.source[region.clone()].trim_matches([' ', '\t']).is_empty() {
            self.diagnostics.error_at(
                Stage::Parser,
                region,
                format!("conditional's {} result is empty, using 0", which),
            );
            return vec![Token::Number(0.0)];
        }
        self.scan(region, false, depth + 1)
    }
}

/// Tokenize `source` as an expression, discarding diagnostics
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
