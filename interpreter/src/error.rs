use std::fmt;
use std::fmt::{Display, Formatter};

use jcode_core::{Error as CoreError, Span};
use thiserror::Error;

use crate::limits::STACK_TRACE_LIMIT;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    IllegalToken,
    InvalidSyntax,
    ConstantReassignment,
    UndefinedVariable,
    TypeMismatch,
    DivisionByZero,
    ArityMismatch,
    ControlFlowOutsideLoop,
    UnknownAttribute,
    UnknownMethod,
    NotCallable,
    NotIndexable,
    IndexOutOfRange,
    StackOverflow,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::IllegalToken => "Illegal Token",
            ErrorKind::InvalidSyntax => "Invalid Syntax",
            ErrorKind::ConstantReassignment => "Constant Reassignment",
            ErrorKind::UndefinedVariable => "Undefined Variable",
            ErrorKind::TypeMismatch => "Type Mismatch",
            ErrorKind::DivisionByZero => "Division By Zero",
            ErrorKind::ArityMismatch => "Arity Mismatch",
            ErrorKind::ControlFlowOutsideLoop => "Control Flow Outside Loop",
            ErrorKind::UnknownAttribute => "Unknown Attribute",
            ErrorKind::UnknownMethod => "Unknown Method",
            ErrorKind::NotCallable => "Not Callable",
            ErrorKind::NotIndexable => "Not Indexable",
            ErrorKind::IndexOutOfRange => "Index Out Of Range",
            ErrorKind::StackOverflow => "Stack Overflow",
        };
        write!(f, "{}", name)
    }
}

/// Frames recorded while a runtime error unwinds, innermost call first.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct StackTrace(pub(crate) Vec<StackData>);

#[derive(Debug, PartialEq, Clone)]
pub struct StackData {
    pub span: Span,
    pub context: String,
}

impl StackTrace {
    pub fn frames(&self) -> &[StackData] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for StackData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File {}, line {}, in {}",
            self.span.source().name,
            self.span.start.line + 1,
            self.context
        )
    }
}

impl Display for StackTrace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Traceback (most recent call last):")?;
        for sd in self.0.iter().rev() {
            writeln!(f, "  {}", sd)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Clone)]
#[error("{kind}: {msg}")]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: String,
    pub span: Span,
    pub trace: StackTrace,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, span: &Span, msg: fmt::Arguments) -> Self {
        Error {
            kind,
            msg: format!("{}", msg),
            span: span.clone(),
            trace: StackTrace::default(),
        }
    }

    pub(crate) fn syntax(span: &Span, msg: &str) -> Self {
        Error::new(ErrorKind::InvalidSyntax, span, format_args!("{}", msg))
    }

    /// Records the call site of a frame the error is unwinding through.
    pub(crate) fn with_frame(mut self, span: &Span, context: String) -> Self {
        if self.trace.0.len() < STACK_TRACE_LIMIT {
            self.trace.0.push(StackData {
                span: span.clone(),
                context,
            });
        }
        self
    }

    /// Formats the error for people: the traceback (if any), the message, the location and the
    /// offending source line with carets under the span.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.trace.is_empty() {
            out.push_str(&self.trace.to_string());
        }

        let start = &self.span.start;
        let line = self.span.source().line(start.line);
        out.push_str(&format!(
            "{}\nFile {}, line {}\n{}\n",
            self,
            self.span.source().name,
            start.line + 1,
            line
        ));

        let width = line.chars().count();
        let end_col = if self.span.end.line == start.line {
            self.span.end.col
        } else {
            width
        };
        let carets = end_col.saturating_sub(start.col).max(1);
        out.push_str(&" ".repeat(start.col));
        out.push_str(&"^".repeat(carets));
        out
    }
}

impl From<CoreError> for Error {
    fn from(value: CoreError) -> Self {
        Error::new(
            ErrorKind::IllegalToken,
            value.span(),
            format_args!("{}", value),
        )
    }
}

#[cfg(test)]
mod tests {
    use jcode_core::{Position, Source, Span};

    use crate::error::{Error, ErrorKind};

    fn span_of(text: &str, from: usize, to: usize) -> Span {
        let mut start = Position::start(Source::new("test.jc", text));
        for ch in text.chars().take(from) {
            start.advance(ch);
        }
        let mut end = start.clone();
        for ch in text.chars().skip(from).take(to - from) {
            end.advance(ch);
        }
        Span::new(start, end)
    }

    #[test]
    fn test_render_points_at_span() {
        let err = Error::new(
            ErrorKind::DivisionByZero,
            &span_of("var x : 5 / 0", 8, 13),
            format_args!("Division by zero"),
        );

        assert_eq!(
            err.render(),
            "Division By Zero: Division by zero\nFile test.jc, line 1\nvar x : 5 / 0\n        ^^^^^"
        );
    }

    #[test]
    fn test_render_with_traceback() {
        let text = "f()\ng()";
        let err = Error::new(
            ErrorKind::UndefinedVariable,
            &span_of(text, 4, 5),
            format_args!("'g' is not defined"),
        )
        .with_frame(&span_of(text, 0, 3), String::from("function f"));

        let rendered = err.render();
        assert!(rendered.starts_with(
            "Traceback (most recent call last):\n  File test.jc, line 1, in function f\n"
        ));
        assert!(rendered.ends_with("line 2\ng()\n^"));
    }

    #[test]
    fn test_trace_is_capped() {
        let span = span_of("x", 0, 1);
        let mut err = Error::new(ErrorKind::StackOverflow, &span, format_args!("deep"));
        for _ in 0..100 {
            err = err.with_frame(&span, String::from("function f"));
        }
        assert_eq!(err.trace.frames().len(), 20);
    }
}
