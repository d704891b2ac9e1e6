//! Compile query-intent requests against a configured schema model into Cypher.

pub mod cli;
pub mod compiler;
pub mod request;

pub use compiler::Compiler;
pub use request::RequestFile;
