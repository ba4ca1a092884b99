mod error;
mod position;
mod scanner;
mod token;

pub use error::*;
pub use position::*;
pub use scanner::*;
pub use token::*;
