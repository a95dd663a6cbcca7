//! Keyword-driven lab value parsing over extracted report text.

pub mod parser;
pub mod types;

pub use parser::*;
pub use types::*;
