//! Execute an execution plan against the database.

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;

use crate::cache::RequestCache;
use crate::error::Error;
use crate::executor::{AccessMode, Executor};
use crate::metrics;
use query_engine_cypher::cypher::execution_plan::{ExecutionPlan, Query, QueryKind, ResultShape};

/// Execute a plan and serialize `{ "<root field>": <value> }`.
///
/// Reads are answered from the request cache when the same statement already ran with
/// the same parameters. A write invalidates the cache.
pub async fn execute(
    executor: &dyn Executor,
    cache: &mut RequestCache,
    metrics: &metrics::Metrics,
    plan: ExecutionPlan<Query>,
) -> Result<Bytes, Error> {
    let cypher = plan.query.query_cypher();
    let mode = match plan.query.kind {
        QueryKind::Read => AccessMode::Read,
        QueryKind::Write => AccessMode::Write,
    };

    let cached = match mode {
        AccessMode::Read => cache.get(&cypher.cypher, &cypher.params).cloned(),
        AccessMode::Write => None,
    };
    let rows = match cached {
        Some(rows) => {
            tracing::debug!(root_field = %plan.root_field, "answered from request cache");
            metrics.record_cache_hit();
            rows
        }
        None => {
            let timer = metrics.time_query_execution();
            let result = executor.run(&cypher.cypher, &cypher.params, mode).await;
            timer.observe_duration();
            let rows = result.map_err(|error| {
                let error = Error::from(error);
                if let Error::Forbidden = error {
                    tracing::warn!(root_field = %plan.root_field, "request rejected by an authorization guard");
                    metrics.record_forbidden_query();
                }
                error
            })?;
            match mode {
                AccessMode::Read => cache.insert(&cypher.cypher, &cypher.params, rows.clone()),
                AccessMode::Write => cache.invalidate(),
            }
            metrics.record_successful_query();
            rows
        }
    };

    let value = match plan.query.result_shape {
        ResultShape::List => Value::Array(rows),
        ResultShape::Object => rows.into_iter().next().unwrap_or(Value::Null),
    };
    let mut response = serde_json::Map::new();
    response.insert(plan.root_field.to_string(), value);

    let mut buffer = BytesMut::new().writer();
    serde_json::to_writer(&mut buffer, &Value::Object(response))?;
    Ok(buffer.into_inner().freeze())
}
