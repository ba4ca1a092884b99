use std::cell::RefCell;
use std::rc::Rc;

use jcode_core::Scanner;
use tracing::debug;

use crate::ast::Node;
use crate::env::Environment;
use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::native;
use crate::parser::Parser;
use crate::value::Value;

/// Owns the global scope. Everything declared by one `run` is visible to the next, which is
/// what the REPL relies on.
pub struct Session {
    scanner: Scanner,
    globals: Rc<RefCell<Environment>>,
}

impl Session {
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        native::install(&globals);

        Session {
            scanner: Scanner::new(),
            globals,
        }
    }

    /// Scans and parses `text` without running it.
    pub fn parse(&mut self, source_name: &str, text: &str) -> Result<Node, Error> {
        let tokens = self.scanner.scan_all(source_name, text)?;
        Parser::new(&tokens).parse()
    }

    /// Runs `text` against the session's global scope. On success the result is the list of
    /// values of its top-level statements.
    pub fn run(&mut self, source_name: &str, text: &str) -> Result<Value, Error> {
        debug!(source = source_name, "run");
        let program = self.parse(source_name, text)?;
        Interpreter::new(Rc::clone(&self.globals)).interpret(&program)
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

/// Runs `text` in a fresh session.
pub fn run(source_name: &str, text: &str) -> Result<Value, Error> {
    Session::new().run(source_name, text)
}
