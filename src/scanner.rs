use crate::{
    fixed_que::FixedQueue,
    source::{SourceOffset, SourceSpan},
};
use derive_new::new;
use miette::Diagnostic;
use std::str::CharIndices;
use strum::EnumDiscriminants;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, PartialEq)]
pub enum ScanError {
    #[error("Unexpected character '{}'.", readable_char(.character))]
    UnexpectedCharacter {
        character: char,
        line: usize,
        #[label("here")]
        at: SourceOffset,
    },
    #[error("Unterminated string.")]
    UnterminatedString {
        line: usize,
        #[label("string starts here")]
        at: SourceSpan,
    },
}

impl ScanError {
    pub fn line(&self) -> usize {
        match self {
            ScanError::UnexpectedCharacter { line, .. } => *line,
            ScanError::UnterminatedString { line, .. } => *line,
        }
    }
}

fn readable_char(ch: &char) -> String {
    match ch {
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, new)]
pub struct Token {
    pub span: SourceSpan,
    pub line: usize,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(TokenKindName))]
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
    Identifier(String),
    String(String),
    Number(f64),
    And,
    Class,
    Else,
    False,
    Fun,
    For,
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
    LineComment,
    Eof,
}

/// Streaming scanner for the tree-walk front end. Yields tokens and scan
/// errors in source order and always ends with exactly one `Eof` token.
pub struct Scanner<'a> {
    source: &'a str,
    chars: CharIndices<'a>,
    lookahead: FixedQueue<(usize, char), 4>,
    token_start: usize,
    next_offset: usize,
    line: usize,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            lookahead: FixedQueue::new(),
            token_start: 0,
            next_offset: 0,
            line: 1,
            finished: false,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let (offset, ch) = self.lookahead.pop_front().or_else(|| self.chars.next())?;
        self.next_offset = offset + ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn advance_while<F: Fn(char) -> bool>(&mut self, keep: F) {
        while matches!(self.peek(1), Some(ch) if keep(ch)) {
            self.advance();
        }
    }

    fn peek(&mut self, distance: usize) -> Option<char> {
        assert!(distance > 0);
        while self.lookahead.len() < distance {
            match self.chars.next() {
                Some(entry) => self.lookahead.push_back(entry),
                None => return None,
            }
        }
        self.lookahead.get(distance - 1).map(|(_, ch)| *ch)
    }

    fn token_span(&self) -> SourceSpan {
        (self.token_start..self.next_offset).into()
    }

    fn yield_token(&self, kind: TokenKind) -> Token {
        Token::new(self.token_span(), self.line, kind)
    }

    fn yield_either(&mut self, expected: char, if_match: TokenKind, otherwise: TokenKind) -> Token {
        let kind = match self.peek(1) {
            Some(ch) if ch == expected => {
                self.advance();
                if_match
            }
            _ => otherwise,
        };
        self.yield_token(kind)
    }

    fn scan_string(&mut self) -> Result<Token, ScanError> {
        loop {
            match self.advance() {
                Some('"') => {
                    let contents =
                        self.source[self.token_start + 1..self.next_offset - 1].to_string();
                    return Ok(self.yield_token(TokenKind::String(contents)));
                }
                Some(_) => {}
                None => {
                    return Err(ScanError::UnterminatedString {
                        line: self.line,
                        at: self.token_span(),
                    })
                }
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        self.advance_while(|ch| ch.is_ascii_digit());
        // a trailing '.' with no digit after it is not part of the number
        if self.peek(1) == Some('.') && self.peek(2).is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
            self.advance_while(|ch| ch.is_ascii_digit());
        }
        let number: f64 = self.source[self.token_start..self.next_offset]
            .parse()
            .unwrap();
        self.yield_token(TokenKind::Number(number))
    }

    fn scan_word(&mut self) -> Token {
        self.advance_while(|ch| matches!(ch, 'a'..='z' | 'A'..='Z' | '_' | '0'..='9'));
        let word = &self.source[self.token_start..self.next_offset];
        let kind = match word {
            "and" => TokenKind::And,
            "class" => TokenKind::Class,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "fun" => TokenKind::Fun,
            "if" => TokenKind::If,
            "nil" => TokenKind::Nil,
            "or" => TokenKind::Or,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            "super" => TokenKind::Super,
            "this" => TokenKind::This,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => TokenKind::Identifier(word.to_string()),
        };
        self.yield_token(kind)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.advance_while(|ch| matches!(ch, ' ' | '\r' | '\t' | '\n'));

        self.token_start = self.next_offset;
        let next = self.advance();
        Some(match next {
            None => {
                self.finished = true;
                Ok(self.yield_token(TokenKind::Eof))
            }
            Some('(') => Ok(self.yield_token(TokenKind::LeftParen)),
            Some(')') => Ok(self.yield_token(TokenKind::RightParen)),
            Some('{') => Ok(self.yield_token(TokenKind::LeftBrace)),
            Some('}') => Ok(self.yield_token(TokenKind::RightBrace)),
            Some(',') => Ok(self.yield_token(TokenKind::Comma)),
            Some('.') => Ok(self.yield_token(TokenKind::Dot)),
            Some('-') => Ok(self.yield_token(TokenKind::Minus)),
            Some('+') => Ok(self.yield_token(TokenKind::Plus)),
            Some(';') => Ok(self.yield_token(TokenKind::Semicolon)),
            Some('*') => Ok(self.yield_token(TokenKind::Star)),
            Some('!') => Ok(self.yield_either('=', TokenKind::BangEqual, TokenKind::Bang)),
            Some('=') => Ok(self.yield_either('=', TokenKind::EqualEqual, TokenKind::Equal)),
            Some('<') => Ok(self.yield_either('=', TokenKind::LessEqual, TokenKind::Less)),
            Some('>') => Ok(self.yield_either('=', TokenKind::GreaterEqual, TokenKind::Greater)),
            Some('/') => {
                if self.peek(1) == Some('/') {
                    self.advance_while(|ch| ch != '\n');
                    Ok(self.yield_token(TokenKind::LineComment))
                } else {
                    Ok(self.yield_token(TokenKind::Slash))
                }
            }
            Some('"') => self.scan_string(),
            Some(ch) if ch.is_ascii_digit() => Ok(self.scan_number()),
            Some('a'..='z' | 'A'..='Z' | '_') => Ok(self.scan_word()),
            Some(ch) => Err(ScanError::UnexpectedCharacter {
                character: ch,
                line: self.line,
                at: self.token_start.into(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .map(|result| result.expect("scan error").kind)
            .collect()
    }

    #[test]
    fn maximal_munch_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("! != = == < <= > >="),
            vec![
                Bang, BangEqual, Equal, EqualEqual, Less, LessEqual, Greater, GreaterEqual, Eof
            ]
        );
    }

    #[test]
    fn exactly_one_eof() {
        let mut scanner = Scanner::new("");
        assert_eq!(scanner.next().unwrap().unwrap().kind, TokenKind::Eof);
        assert_eq!(scanner.next(), None);
    }

    #[test]
    fn numbers_and_trailing_dot() {
        use TokenKind::*;
        assert_eq!(
            kinds("12 3.5 7."),
            vec![Number(12.0), Number(3.5), Number(7.0), Dot, Eof]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("var _x1 = nil;"),
            vec![
                Var,
                Identifier("_x1".to_string()),
                Equal,
                Nil,
                Semicolon,
                Eof
            ]
        );
        assert_eq!(
            kinds("class classes"),
            vec![Class, Identifier("classes".to_string()), Eof]
        );
    }

    #[test]
    fn strings_span_newlines_and_count_lines() {
        let tokens: Vec<_> = Scanner::new("\"a\nb\"\nprint")
            .map(|result| result.unwrap())
            .collect();
        assert_eq!(tokens[0].kind, TokenKind::String("a\nb".to_string()));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].kind, TokenKind::Print);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn unterminated_string_is_an_error_not_a_token() {
        let results: Vec<_> = Scanner::new("\"oops").collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0],
            Err(ScanError::UnterminatedString { line: 1, .. })
        ));
        assert_eq!(results[1].as_ref().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn line_comments_consume_to_end_of_line() {
        use TokenKind::*;
        assert_eq!(kinds("1 // two three\n4"), vec![Number(1.0), LineComment, Number(4.0), Eof]);
    }

    #[test]
    fn unexpected_character_reports_line() {
        let results: Vec<_> = Scanner::new("\n\n@").collect();
        assert!(matches!(
            results[0],
            Err(ScanError::UnexpectedCharacter {
                character: '@',
                line: 3,
                ..
            })
        ));
        assert_eq!(results[1].as_ref().unwrap().kind, TokenKind::Eof);
    }
}
