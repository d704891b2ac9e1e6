#![allow(dead_code)]

use query_engine_cypher::cypher::execution_plan::{ExecutionPlan, Query};
use query_engine_metadata::metadata::Metadata;
use query_engine_models::{QueryRequest, RequestContext, SelectionField};
use query_engine_translation::translation::error::Error;
use query_engine_translation::translation::query;

pub fn metadata() -> Metadata {
    serde_json::from_str(include_str!("../fixtures/movies.json")).expect("valid fixture")
}

pub fn translate(field: SelectionField) -> Result<ExecutionPlan<Query>, Error> {
    translate_as(field, RequestContext::anonymous())
}

pub fn translate_as(
    field: SelectionField,
    context: RequestContext,
) -> Result<ExecutionPlan<Query>, Error> {
    query::translate(&metadata(), &QueryRequest { operation: field }, &context)
}

/// The rendered statement text.
pub fn cypher(field: SelectionField) -> String {
    translate(field)
        .expect("translates")
        .query
        .query_cypher()
        .cypher
}

pub fn fields<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<SelectionField> {
    names.into_iter().map(SelectionField::new).collect()
}

pub fn jwt(claims: serde_json::Value) -> RequestContext {
    RequestContext::with_jwt(claims.as_object().cloned().unwrap_or_default())
}
