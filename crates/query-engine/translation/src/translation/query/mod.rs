//! Translate an incoming `QueryRequest`.

pub mod authorization;
pub mod fields;
pub mod filtering;
pub mod operations;
pub mod root;
pub mod sorting;
pub mod values;

use crate::translation::ast::operations::Operation;
use crate::translation::context::TraversalContext;
use crate::translation::error::Error;
use crate::translation::helpers::{Env, State};
use query_engine_cypher::cypher::{self, execution_plan};
use query_engine_metadata::metadata;
use query_engine_models::{QueryRequest, RequestContext};

/// Compile the request into a query AST.
pub fn compile(env: &Env<'_>, request: &QueryRequest) -> Result<Operation, Error> {
    root::translate_root_field(env, &request.operation)
}

/// Lower a compiled operation into a statement returning the result column.
pub fn emit(operation: &Operation) -> Result<cypher::ast::Statement, Error> {
    let mut state = State::new();
    let output = operation.apply(&TraversalContext::root(), &mut state)?;
    Ok(cypher::ast::Statement {
        clauses: output.clauses,
    })
}

/// Translate the incoming QueryRequest to an ExecutionPlan (Cypher) to be run against the database.
pub fn translate(
    metadata: &metadata::Metadata,
    request: &QueryRequest,
    request_context: &RequestContext,
) -> Result<execution_plan::ExecutionPlan<execution_plan::Query>, Error> {
    let root_field = request.operation.output_key().clone();
    let span = tracing::info_span!("translate", root_field = %root_field);
    let _enter = span.enter();

    let env = Env::new(metadata, request_context);
    let operation = compile(&env, request)?;
    let statement = emit(&operation)?;

    let (kind, result_shape) = match operation {
        Operation::Delete(_) => (execution_plan::QueryKind::Write, execution_plan::ResultShape::Object),
        Operation::Read(_) | Operation::CompositeRead(_) => {
            (execution_plan::QueryKind::Read, execution_plan::ResultShape::List)
        }
        Operation::Connection(_)
        | Operation::CompositeConnection(_)
        | Operation::Aggregation(_) => {
            (execution_plan::QueryKind::Read, execution_plan::ResultShape::Object)
        }
    };
    let plan = execution_plan::simple_query_execution_plan(
        root_field.into(),
        statement,
        kind,
        result_shape,
    );
    tracing::debug!(cypher = %plan.query.query_cypher().cypher, "compiled statement");
    Ok(plan)
}
