//! Dispatch a root field to the operation it requests.

use super::operations::{self, Source};
use crate::translation::ast::operations::Operation;
use crate::translation::error::Error;
use crate::translation::helpers::{Env, RootField};
use query_engine_models::SelectionField;

/// Compile a root field: `movies`, `moviesConnection`, `moviesAggregate` or `deleteMovies`.
pub fn translate_root_field(env: &Env<'_>, field: &SelectionField) -> Result<Operation, Error> {
    match env.lookup_root_field(&field.name)? {
        RootField::Read(target) => operations::translate_read(env, field, target, Source::Root),
        RootField::Connection(target) => {
            operations::translate_connection(env, field, target, Source::Root)
        }
        RootField::Aggregate(target) => {
            operations::translate_aggregation(env, field, target, Source::Root)
        }
        RootField::Delete { name, info } => operations::translate_delete(env, field, name, info),
    }
}
