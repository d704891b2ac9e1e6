//! Describe the execution plan of a compiled request.

use smol_str::SmolStr;

use super::ast;
use super::string;

/// Definition of an execution plan to be run against the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan<Query> {
    /// The key under which the result is returned to the caller.
    pub root_field: SmolStr,
    pub query: Query,
}

/// Whether a statement only reads or also writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Read,
    Write,
}

/// How the rows of the result column make up the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// Every row is one element of a list.
    List,
    /// The statement returns exactly one row.
    Object,
}

/// A statement to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub statement: ast::Statement,
    pub kind: QueryKind,
    pub result_shape: ResultShape,
}

impl Query {
    /// Render the statement and its parameter table.
    pub fn query_cypher(&self) -> string::Cypher {
        let mut cypher = string::Cypher::new();
        self.statement.to_cypher(&mut cypher);
        cypher
    }
}

/// A simple execution plan with only a root field and a query.
pub fn simple_query_execution_plan(
    root_field: SmolStr,
    statement: ast::Statement,
    kind: QueryKind,
    result_shape: ResultShape,
) -> ExecutionPlan<Query> {
    ExecutionPlan {
        root_field,
        query: Query {
            statement,
            kind,
            result_shape,
        },
    }
}
