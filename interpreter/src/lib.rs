mod ast;
mod callable;
mod env;
mod error;
mod interpreter;
mod limits;
mod native;
mod parse_result;
mod parser;
mod printer;
mod session;
mod value;

pub use ast::Node;
pub use callable::{Class, Function, Instance, Native};
pub use error::{Error, ErrorKind, StackData, StackTrace};
pub use parser::Parser;
pub use session::{run, Session};
pub use value::Value;
