//! Operations compose a selection, filters and fields into one executable unit.
//!
//! An operation applied to the root context emits a whole statement returning the
//! result column. Applied to a bound node it emits the body of a subquery returning
//! the value of a relationship field.

mod aggregation;
mod composite;
mod connection;
mod delete;
mod read;

pub use aggregation::{AggregationOperation, AggregationPartial};
pub use composite::{CompositeConnectionOperation, CompositeReadOperation, ConnectionPartial};
pub use connection::{ConnectionOperation, CURSOR_PREFIX};
pub use delete::{DeleteField, DeleteOperation};
pub use read::ReadOperation;

use super::filters::Filter;
use super::selection::Selection;
use super::tree::QueryAstNode;
use crate::translation::context::TraversalContext;
use crate::translation::error::Error;
use crate::translation::helpers::State;
use query_engine_cypher::cypher::{ast as cypher, helpers};
use query_engine_metadata::metadata;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Read(ReadOperation),
    CompositeRead(CompositeReadOperation),
    Connection(ConnectionOperation),
    CompositeConnection(CompositeConnectionOperation),
    Aggregation(AggregationOperation),
    Delete(DeleteOperation),
}

/// The clauses of an operation and the variable its result is returned as.
#[derive(Debug)]
pub struct OperationOutput {
    pub clauses: Vec<cypher::Clause>,
    pub variable: cypher::Variable,
}

impl Operation {
    pub fn apply(
        &self,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<OperationOutput, Error> {
        match self {
            Operation::Read(operation) => operation.apply(context, state),
            Operation::CompositeRead(operation) => operation.apply(context, state),
            Operation::Connection(operation) => operation.apply(context, state),
            Operation::CompositeConnection(operation) => operation.apply(context, state),
            Operation::Aggregation(operation) => operation.apply(context, state),
            Operation::Delete(operation) => operation.apply(context, state),
        }
    }
}

/// Match the rows of an operation: the selection, then the filters, then the
/// validation guards of the rows that passed.
fn select_rows(
    selection: &Selection,
    filters: &[Filter],
    authorization: &[Filter],
    context: &TraversalContext,
    state: &mut State,
) -> Result<(TraversalContext, Vec<cypher::Clause>), Error> {
    let selected = selection.apply(context, state)?;
    let mut clauses = vec![selected.clause];
    let mut predicates: Vec<cypher::Expression> = selected.predicate.into_iter().collect();
    let mut guards = vec![];
    for filter in filters.iter().chain(authorization) {
        let output = filter.apply(&selected.context, state)?;
        clauses.extend(output.subqueries);
        predicates.extend(output.predicate);
        guards.extend(output.guards);
    }
    helpers::attach_where(&mut clauses, helpers::and_all(predicates));
    clauses.extend(guards);
    Ok((selected.context, clauses))
}

/// The fixed result column at the top level, a fresh variable inside a subquery.
fn result_variable(context: &TraversalContext, state: &mut State) -> cypher::Variable {
    if context.is_root() {
        helpers::result_variable()
    } else {
        state.make_value_variable()
    }
}

/// Collect the rows of a relationship field into its value.
fn collect_value(value: cypher::Expression, cardinality: metadata::Cardinality) -> cypher::Expression {
    let collected = helpers::function_expr(cypher::Function::Collect, vec![value]);
    match cardinality {
        metadata::Cardinality::Many => collected,
        metadata::Cardinality::One => helpers::function_expr(cypher::Function::Head, vec![collected]),
    }
}

/// `UNWIND [] AS <variable>`: no rows at all.
fn no_rows(variable: &cypher::Variable) -> cypher::Clause {
    cypher::Clause::Unwind {
        expression: cypher::Expression::List(vec![]),
        alias: variable.clone(),
    }
}

fn filter_children<'a>(
    selection: &'a Selection,
    filters: &'a [Filter],
    authorization: &'a [Filter],
) -> impl Iterator<Item = &'a dyn QueryAstNode> {
    std::iter::once(selection as &dyn QueryAstNode).chain(
        filters
            .iter()
            .chain(authorization)
            .map(|filter| filter as &dyn QueryAstNode),
    )
}

impl QueryAstNode for Operation {
    fn name(&self) -> String {
        match self {
            Operation::Read(operation) => operation.name(),
            Operation::CompositeRead(operation) => operation.name(),
            Operation::Connection(operation) => operation.name(),
            Operation::CompositeConnection(operation) => operation.name(),
            Operation::Aggregation(operation) => operation.name(),
            Operation::Delete(operation) => operation.name(),
        }
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        match self {
            Operation::Read(operation) => operation.children(),
            Operation::CompositeRead(operation) => operation.children(),
            Operation::Connection(operation) => operation.children(),
            Operation::CompositeConnection(operation) => operation.children(),
            Operation::Aggregation(operation) => operation.children(),
            Operation::Delete(operation) => operation.children(),
        }
    }
}
