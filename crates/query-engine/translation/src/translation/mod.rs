//! Compile a request against the schema model into a query AST, then lower it to Cypher.

pub mod ast;
pub mod context;
pub mod error;
pub mod helpers;
pub mod query;
pub mod where_input;
