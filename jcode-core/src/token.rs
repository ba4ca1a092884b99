use std::fmt::{Display, Formatter};

use crate::position::Span;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    LeftParen,
    RightParen,
    LeftSquare,
    RightSquare,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Colon,
    Minus,
    Plus,
    Slash,
    Star,
    Percent,
    Caret,

    BangEqual,
    Equal,
    EqualEqual,
    Arrow,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    Identifier,
    String,
    Int,
    Float,

    And,
    Break,
    Class,
    Continue,
    Elif,
    Else,
    End,
    Extends,
    For,
    Func,
    If,
    New,
    Not,
    Or,
    Return,
    Step,
    To,
    Var,
    While,

    Newline,
    Eof,
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Type::LeftParen => "(",
            Type::RightParen => ")",
            Type::LeftSquare => "[",
            Type::RightSquare => "]",
            Type::LeftBrace => "{",
            Type::RightBrace => "}",
            Type::Comma => ",",
            Type::Dot => ".",
            Type::Colon => ":",
            Type::Minus => "-",
            Type::Plus => "+",
            Type::Slash => "/",
            Type::Star => "*",
            Type::Percent => "%",
            Type::Caret => "^",
            Type::BangEqual => "!=",
            Type::Equal => "=",
            Type::EqualEqual => "==",
            Type::Arrow => "=>",
            Type::Greater => ">",
            Type::GreaterEqual => ">=",
            Type::Less => "<",
            Type::LessEqual => "<=",
            Type::Identifier => "identifier",
            Type::String => "string",
            Type::Int => "int",
            Type::Float => "float",
            Type::And => "and",
            Type::Break => "break",
            Type::Class => "class",
            Type::Continue => "continue",
            Type::Elif => "elif",
            Type::Else => "else",
            Type::End => "end",
            Type::Extends => "extends",
            Type::For => "for",
            Type::Func => "func",
            Type::If => "if",
            Type::New => "new",
            Type::Not => "not",
            Type::Or => "or",
            Type::Return => "return",
            Type::Step => "step",
            Type::To => "to",
            Type::Var => "var",
            Type::While => "while",
            Type::Newline => "newline",
            Type::Eof => "end of input",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Nil,
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(String::from(value))
    }
}

macro_rules! impl_from_num_for_literal {
    ( $( $t:ident )* ) => {
        $(
            impl From<$t> for Literal {
                fn from(n: $t) -> Literal {
                    Literal::Num(n as f64)
                }
            }
        )*
    }
}

impl_from_num_for_literal!(u8 i8 u16 i16 u32 i32 u64 i64 usize isize f32 f64);

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub ty: Type,
    pub lexeme: String,
    pub value: Literal,
    pub span: Span,
}

impl Token {
    pub fn new(ty: Type, lexeme: String, value: Literal, span: Span) -> Self {
        Token {
            ty,
            lexeme,
            value,
            span,
        }
    }

    pub fn is(&self, ty: Type) -> bool {
        self.ty == ty
    }

    /// Human readable form used in "unexpected token" diagnostics.
    pub fn describe(&self) -> String {
        match self.ty {
            Type::Newline | Type::Eof => self.ty.to_string(),
            Type::String => format!("\"{}\"", self.lexeme.trim_matches('"')),
            _ => self.lexeme.clone(),
        }
    }
}
