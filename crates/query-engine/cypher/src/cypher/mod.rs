//! Cypher AST, helpers, rendering into query text plus a parameter table, and the
//! execution plan handed to the executor.

pub mod ast;
pub mod convert;
pub mod execution_plan;
pub mod helpers;
pub mod string;
