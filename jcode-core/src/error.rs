use thiserror::Error;

use crate::position::Span;

#[derive(Debug, Error, PartialEq, Clone)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("unterminated string")]
    UnterminatedString { span: Span },

    #[error("unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, span: Span },

    #[error("expected '=' after '!'")]
    ExpectedEqual { span: Span },

    #[error("unknown escape sequence '\\{ch}'")]
    UnknownEscape { ch: char, span: Span },
}

impl Error {
    pub fn span(&self) -> &Span {
        match self {
            Error::UnterminatedString { span } => span,
            Error::UnexpectedCharacter { span, .. } => span,
            Error::ExpectedEqual { span } => span,
            Error::UnknownEscape { span, .. } => span,
        }
    }
}
