use crate::source::SourceSpan;

/// Token kinds for the bytecode front end. Unlike the tree-walk scanner,
/// tokens carry no decoded payloads; the compiler slices the source through
/// the span when it needs the lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Identifier,
    String,
    Number,
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,
    Error(&'static str),
    Eof,
}

#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
    pub line: usize,
}

/// On-demand scanner: the single-pass compiler pulls one token at a time.
/// Malformed input becomes `Error` tokens rather than aborting the scan.
pub struct Scanner<'src> {
    source: &'src [u8],
    start: usize,
    current: usize,
    line: usize,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof);
        }

        let ch = self.advance();
        match ch {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b',' => self.make_token(TokenKind::Comma),
            b'.' => self.make_token(TokenKind::Dot),
            b'-' => self.make_token(TokenKind::Minus),
            b'+' => self.make_token(TokenKind::Plus),
            b';' => self.make_token(TokenKind::Semicolon),
            b'/' => self.make_token(TokenKind::Slash),
            b'*' => self.make_token(TokenKind::Star),
            b'!' => self.two_char_token(b'=', TokenKind::BangEqual, TokenKind::Bang),
            b'=' => self.two_char_token(b'=', TokenKind::EqualEqual, TokenKind::Equal),
            b'<' => self.two_char_token(b'=', TokenKind::LessEqual, TokenKind::Less),
            b'>' => self.two_char_token(b'=', TokenKind::GreaterEqual, TokenKind::Greater),
            b'"' => self.string(),
            ch if ch.is_ascii_digit() => self.number(),
            ch if ch.is_ascii_alphabetic() || ch == b'_' => self.identifier(),
            _ => self.make_token(TokenKind::Error("Unexpected character.")),
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.current];
        self.current += 1;
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source[self.current + 1]
        }
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn two_char_token(&mut self, expected: u8, if_match: TokenKind, otherwise: TokenKind) -> Token {
        let kind = if self.matches(expected) {
            if_match
        } else {
            otherwise
        };
        self.make_token(kind)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            span: (self.start..self.current).into(),
            line: self.line,
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' => {
                    self.advance();
                }
                b'\n' => {
                    self.line += 1;
                    self.advance();
                }
                b'/' if self.peek_next() == b'/' => {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> Token {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            return self.make_token(TokenKind::Error("Unterminated string."));
        }
        self.advance();
        self.make_token(TokenKind::String)
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        self.make_token(TokenKind::Number)
    }

    fn identifier(&mut self) -> Token {
        loop {
            let ch = self.peek();
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        self.make_token(self.identifier_kind())
    }

    fn identifier_kind(&self) -> TokenKind {
        match &self.source[self.start..self.current] {
            b"and" => TokenKind::And,
            b"class" => TokenKind::Class,
            b"else" => TokenKind::Else,
            b"false" => TokenKind::False,
            b"for" => TokenKind::For,
            b"fun" => TokenKind::Fun,
            b"if" => TokenKind::If,
            b"nil" => TokenKind::Nil,
            b"or" => TokenKind::Or,
            b"print" => TokenKind::Print,
            b"return" => TokenKind::Return,
            b"super" => TokenKind::Super,
            b"this" => TokenKind::This,
            b"true" => TokenKind::True,
            b"var" => TokenKind::Var,
            b"while" => TokenKind::While,
            _ => TokenKind::Identifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan_kinds(source: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::new(source);
        let mut kinds = Vec::new();
        loop {
            let token = scanner.scan_token();
            let done = token.kind == TokenKind::Eof;
            kinds.push(token.kind);
            if done {
                break;
            }
        }
        kinds
    }

    #[test]
    fn spans_cover_the_lexemes() {
        let source = "var answer = 42;";
        let mut scanner = Scanner::new(source);
        let var = scanner.scan_token();
        let name = scanner.scan_token();
        assert_eq!(var.kind, TokenKind::Var);
        assert_eq!(&source[var.span.start().byte_offset()..var.span.end().byte_offset()], "var");
        assert_eq!(name.kind, TokenKind::Identifier);
        assert_eq!(
            &source[name.span.start().byte_offset()..name.span.end().byte_offset()],
            "answer"
        );
    }

    #[test]
    fn keywords_and_operators() {
        use TokenKind::*;
        assert_eq!(
            scan_kinds("fun f() { return 1 <= 2; }"),
            vec![
                Fun, Identifier, LeftParen, RightParen, LeftBrace, Return, Number, LessEqual,
                Number, Semicolon, RightBrace, Eof
            ]
        );
    }

    #[test]
    fn comments_and_lines() {
        let mut scanner = Scanner::new("1 // ignored\n2");
        assert_eq!(scanner.scan_token().line, 1);
        let second = scanner.scan_token();
        assert_eq!(second.kind, TokenKind::Number);
        assert_eq!(second.line, 2);
    }

    #[test]
    fn error_tokens() {
        assert_eq!(
            scan_kinds("@"),
            vec![TokenKind::Error("Unexpected character."), TokenKind::Eof]
        );
        assert_eq!(
            scan_kinds("\"open"),
            vec![TokenKind::Error("Unterminated string."), TokenKind::Eof]
        );
    }
}
