use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// A named piece of source text. Every position points back to the source it was taken from so
/// diagnostics can quote the offending line without the caller holding on to the text.
#[derive(Debug, PartialEq)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: &str, text: &str) -> Rc<Self> {
        Rc::new(Source {
            name: String::from(name),
            text: String::from(text),
        })
    }

    /// Returns the text of a zero-based line, without its line terminator.
    pub fn line(&self, line: usize) -> &str {
        self.text.lines().nth(line).unwrap_or("")
    }
}

// Positions are plain snapshots. The scanner keeps its own cursor and hands out clones, so a
// position recorded in a token or node never moves afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub idx: usize,
    pub line: usize,
    pub col: usize,
    pub source: Rc<Source>,
}

impl Position {
    pub fn start(source: Rc<Source>) -> Self {
        Position {
            idx: 0,
            line: 0,
            col: 0,
            source,
        }
    }

    pub fn advance(&mut self, ch: char) {
        self.idx += 1;
        self.col += 1;

        if ch == '\n' {
            self.line += 1;
            self.col = 0;
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.source.name, self.line + 1, self.col + 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start.idx <= end.idx, "span must not end before it starts");
        Span { start, end }
    }

    /// A zero-width span, used for diagnostics pinned to a single point.
    pub fn point(at: &Position) -> Self {
        Span {
            start: at.clone(),
            end: at.clone(),
        }
    }

    /// The span covering `first` through `last`.
    pub fn between(first: &Span, last: &Span) -> Self {
        Span::new(first.start.clone(), last.end.clone())
    }

    pub fn source(&self) -> &Source {
        &self.start.source
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.start)
    }
}
