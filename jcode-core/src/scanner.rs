use std::rc::Rc;

use phf::{phf_map, Map};

use crate::error::Error;
use crate::position::{Position, Source, Span};
use crate::token::{Literal, Token, Type};

pub struct Scanner;

impl Scanner {
    const KEYWORDS: Map<&'static str, Type> = phf_map! {
        "and" => Type::And,
        "break" => Type::Break,
        "class" => Type::Class,
        "continue" => Type::Continue,
        "elif" => Type::Elif,
        "else" => Type::Else,
        "end" => Type::End,
        "extends" => Type::Extends,
        "for" => Type::For,
        "func" => Type::Func,
        "if" => Type::If,
        "new" => Type::New,
        "not" => Type::Not,
        "or" => Type::Or,
        "return" => Type::Return,
        "step" => Type::Step,
        "to" => Type::To,
        "var" => Type::Var,
        "while" => Type::While,
    };

    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Scanner
    }

    pub fn scan_tokens(&mut self, name: &str, src: &str) -> TokenStream {
        TokenStream::new(Source::new(name, src))
    }

    /// Scans the whole source, failing on the first illegal token. On success the last token is
    /// always `Type::Eof`.
    pub fn scan_all(&mut self, name: &str, src: &str) -> Result<Vec<Token>, Error> {
        let mut stream = self.scan_tokens(name, src);
        let tokens: Vec<Token> = stream.by_ref().collect();
        match stream.error() {
            Some(err) => Err(err.clone()),
            None => Ok(tokens),
        }
    }
}

pub struct TokenStream {
    chars: Vec<char>,

    // `start` and `cursor` points to the start and end of the token being scanned
    start: Position,
    cursor: Position,

    // This flag is set to `true` if the eof is reached and the eof token has been emitted.
    // This is required because the iterator needs to distinguish between when eof is reached but
    // the token is not emitted, and eof is reached and token has been emitted.
    eof: bool,
    error: Option<Error>,
}

impl TokenStream {
    pub fn new(source: Rc<Source>) -> Self {
        let chars = source.text.chars().collect();
        let start = Position::start(source);
        TokenStream {
            chars,
            cursor: start.clone(),
            start,
            eof: false,
            error: None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    fn scan_token(&mut self) -> Result<Option<Token>, Error> {
        let c = self.advance();

        let token = match c {
            '(' => Some(self.make_token(Type::LeftParen)),
            ')' => Some(self.make_token(Type::RightParen)),
            '[' => Some(self.make_token(Type::LeftSquare)),
            ']' => Some(self.make_token(Type::RightSquare)),
            '{' => Some(self.make_token(Type::LeftBrace)),
            '}' => Some(self.make_token(Type::RightBrace)),
            ',' => Some(self.make_token(Type::Comma)),
            '.' => Some(self.make_token(Type::Dot)),
            ':' => Some(self.make_token(Type::Colon)),
            '-' => Some(self.make_token(Type::Minus)),
            '+' => Some(self.make_token(Type::Plus)),
            '*' => Some(self.make_token(Type::Star)),
            '/' => Some(self.make_token(Type::Slash)),
            '%' => Some(self.make_token(Type::Percent)),
            '^' => Some(self.make_token(Type::Caret)),

            '!' => {
                if self.match_char('=') {
                    Some(self.make_token(Type::BangEqual))
                } else {
                    return Err(Error::ExpectedEqual { span: self.span() });
                }
            }

            '=' => {
                if self.match_char('=') {
                    Some(self.make_token(Type::EqualEqual))
                } else if self.match_char('>') {
                    Some(self.make_token(Type::Arrow))
                } else {
                    Some(self.make_token(Type::Equal))
                }
            }

            '<' => {
                if self.match_char('=') {
                    Some(self.make_token(Type::LessEqual))
                } else {
                    Some(self.make_token(Type::Less))
                }
            }

            '>' => {
                if self.match_char('=') {
                    Some(self.make_token(Type::GreaterEqual))
                } else {
                    Some(self.make_token(Type::Greater))
                }
            }

            '#' => {
                while self.peek() != '\n' && !self.is_at_end() {
                    self.advance();
                }
                None
            }

            '"' => Some(self.string()?),

            // Semicolons separate statements exactly like line breaks do
            '\n' | ';' => Some(self.make_token(Type::Newline)),

            ' ' | '\t' | '\r' => None,

            _ => {
                if c.is_ascii_digit() {
                    Some(self.number())
                } else if c.is_alphabetic() || c == '_' {
                    Some(self.identifier())
                } else {
                    return Err(Error::UnexpectedCharacter {
                        ch: c,
                        span: self.span(),
                    });
                }
            }
        };

        Ok(token)
    }

    fn string(&mut self) -> Result<Token, Error> {
        let mut value = String::new();

        while self.peek() != '"' && !self.is_at_end() {
            let c = self.advance();
            if c != '\\' {
                value.push(c);
                continue;
            }

            if self.is_at_end() {
                break;
            }

            let escaped = self.advance();
            match escaped {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                '\\' => value.push('\\'),
                '"' => value.push('"'),
                ch => {
                    return Err(Error::UnknownEscape {
                        ch,
                        span: self.span(),
                    })
                }
            }
        }

        if self.is_at_end() {
            return Err(Error::UnterminatedString { span: self.span() });
        }

        // consume the closing "
        self.advance();
        Ok(self.make_token_with_val(Type::String, Literal::from(value)))
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut ty = Type::Int;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            ty = Type::Float;
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Only ascii digits and a single dot were consumed, so the text is always a valid float
        let value = self.lexeme().parse::<f64>().unwrap_or_default();
        self.make_token_with_val(ty, Literal::Num(value))
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        match Scanner::KEYWORDS.get(self.lexeme().as_str()) {
            None => self.make_token(Type::Identifier),
            Some(keyword) => self.make_token(*keyword),
        }
    }

    fn peek(&self) -> char {
        self.chars.get(self.cursor.idx).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.cursor.idx + 1).copied().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let res = self.peek();
        self.cursor.advance(res);
        res
    }

    fn match_char(&mut self, c: char) -> bool {
        if self.is_at_end() || self.peek() != c {
            false
        } else {
            self.advance();
            true
        }
    }

    fn is_at_end(&self) -> bool {
        self.cursor.idx >= self.chars.len()
    }

    fn lexeme(&self) -> String {
        self.chars[self.start.idx..self.cursor.idx].iter().collect()
    }

    fn span(&self) -> Span {
        Span::new(self.start.clone(), self.cursor.clone())
    }

    fn make_token(&mut self, ty: Type) -> Token {
        self.make_token_with_val(ty, Literal::Nil)
    }

    fn make_token_with_val(&mut self, ty: Type, val: Literal) -> Token {
        let lexeme = match ty {
            Type::Eof => String::new(),
            _ => self.lexeme(),
        };

        Token::new(ty, lexeme, val, self.span())
    }
}

impl Iterator for TokenStream {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof || self.error.is_some() {
            return None;
        }

        while !self.is_at_end() {
            self.start = self.cursor.clone();

            let token = self.scan_token();
            match token {
                Ok(None) => continue,
                Ok(Some(token)) => return Some(token),
                Err(err) => {
                    self.error = Some(err);
                    return None;
                }
            }
        }

        self.eof = true;
        self.start = self.cursor.clone();
        Some(self.make_token(Type::Eof))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::scanner::Scanner;
    use crate::token::{Literal, Token, Type};

    fn scan(src: &str) -> Vec<Token> {
        Scanner::new().scan_all("<test>", src).unwrap()
    }

    fn types(src: &str) -> Vec<Type> {
        scan(src).into_iter().map(|token| token.ty).collect()
    }

    #[test]
    fn test_basic_scanning() {
        let tokens = scan("var foo : 12.5 \"hello\" class extends new # this is a comment");

        assert_eq!(
            tokens
                .iter()
                .map(|token| (token.ty, token.lexeme.as_str(), token.value.clone()))
                .collect::<Vec<_>>(),
            vec![
                (Type::Var, "var", Literal::Nil),
                (Type::Identifier, "foo", Literal::Nil),
                (Type::Colon, ":", Literal::Nil),
                (Type::Float, "12.5", Literal::Num(12.5)),
                (Type::String, "\"hello\"", Literal::from("hello")),
                (Type::Class, "class", Literal::Nil),
                (Type::Extends, "extends", Literal::Nil),
                (Type::New, "new", Literal::Nil),
                (Type::Eof, "", Literal::Nil),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            types("== != <= >= => = < > ^ % ;"),
            vec![
                Type::EqualEqual,
                Type::BangEqual,
                Type::LessEqual,
                Type::GreaterEqual,
                Type::Arrow,
                Type::Equal,
                Type::Less,
                Type::Greater,
                Type::Caret,
                Type::Percent,
                Type::Newline,
                Type::Eof,
            ]
        );
    }

    #[test]
    fn test_type_keywords_are_identifiers() {
        assert_eq!(
            types("int float string list function"),
            vec![Type::Identifier; 5]
                .into_iter()
                .chain([Type::Eof])
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_positions() {
        let tokens = scan("var x\n  x");
        let last = &tokens[3];

        assert_eq!(last.ty, Type::Identifier);
        assert_eq!((last.span.start.line, last.span.start.col), (1, 2));
        assert_eq!(last.span.end.idx, 9);
        assert_eq!(tokens[2].ty, Type::Newline);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = scan(r#""a\tb\"c""#);
        assert_eq!(tokens[0].value, Literal::from("a\tb\"c"));
    }

    #[test]
    fn test_int_and_float() {
        assert_eq!(types("1 2.5 3."), vec![Type::Int, Type::Float, Type::Int, Type::Dot, Type::Eof]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = Scanner::new().scan_all("<test>", "\"hello").unwrap_err();
        assert!(matches!(err, Error::UnterminatedString { .. }));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Scanner::new().scan_all("<test>", "var x : 1 $").unwrap_err();
        match err {
            Error::UnexpectedCharacter { ch, span } => {
                assert_eq!(ch, '$');
                assert_eq!(span.start.col, 10);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_lone_bang() {
        let err = Scanner::new().scan_all("<test>", "!x").unwrap_err();
        assert!(matches!(err, Error::ExpectedEqual { .. }));
    }
}
