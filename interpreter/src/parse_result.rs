use crate::error::Error;

pub(crate) type ParseResult<T> = Result<T, Error>;

/// A saved cursor position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Checkpoint(pub(crate) usize);

/// Outcome of a speculative rule.
///
/// A rule that fails before consuming any token is `Declined` and the caller may try something
/// else from the same position. A rule that fails after consuming tokens is never turned into an
/// `Attempt` at all; its error propagates.
#[derive(Debug)]
pub(crate) enum Attempt<T> {
    Matched(T),
    Declined,
}

impl<T> Attempt<T> {
    pub(crate) fn matched(self) -> Option<T> {
        match self {
            Attempt::Matched(value) => Some(value),
            Attempt::Declined => None,
        }
    }
}
