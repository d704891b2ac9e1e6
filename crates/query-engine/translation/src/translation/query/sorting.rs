//! Translate sort and pagination arguments.
//!
//! Reads take `sort`, `limit` and `offset`, or the older `options: { sort, limit,
//! offset }`; a top-level argument wins over the same setting in `options`.
//! Connections take `sort: [{ node: {..}, edge: {..} }]`, `first` and `after`.

use base64::Engine;
use serde_json::Value;

use super::values;
use crate::translation::ast::filters::FilterTarget;
use crate::translation::ast::operations::CURSOR_PREFIX;
use crate::translation::ast::sort::Pagination;
use crate::translation::error::Error;
use query_engine_cypher::cypher::ast::OrderByDirection;
use query_engine_metadata::metadata;
use query_engine_models::{FieldName, SelectionField};

/// One requested sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub target: FilterTarget,
    pub field: FieldName,
    pub direction: OrderByDirection,
}

/// The `options` argument, if given.
fn options(field: &SelectionField) -> Result<Option<&serde_json::Map<String, Value>>, Error> {
    values::present(field.argument("options"))
        .map(|value| values::as_object("options", value))
        .transpose()
}

/// A read setting from the top-level argument, falling back to `options`.
fn read_setting<'v>(field: &'v SelectionField, name: &str) -> Result<Option<&'v Value>, Error> {
    if let Some(value) = values::present(field.argument(name)) {
        return Ok(Some(value));
    }
    Ok(options(field)?.and_then(|options| values::present(options.get(name))))
}

/// Sort keys of a read, in request order.
pub fn read_sort(field: &SelectionField) -> Result<Vec<SortKey>, Error> {
    match read_setting(field, "sort")? {
        None => Ok(vec![]),
        Some(value) => sort_elements(value)?
            .iter()
            .map(|element| sort_object("sort", element, FilterTarget::Node))
            .collect::<Result<Vec<_>, Error>>()
            .map(|keys| keys.into_iter().flatten().collect()),
    }
}

/// Skip and limit of a read. The type's limit settings cap the requested limit.
pub fn read_pagination(
    field: &SelectionField,
    limit: Option<metadata::LimitSettings>,
) -> Result<Pagination, Error> {
    let requested = read_setting(field, "limit")?
        .map(|value| values::as_limit("limit", value))
        .transpose()?;
    let skip = read_setting(field, "offset")?
        .map(|value| values::as_offset("offset", value))
        .transpose()?
        .filter(|offset| *offset > 0);
    Ok(Pagination {
        skip,
        limit: resolve_limit(requested, limit),
    })
}

/// Sort keys of a connection: each element sorts on the node or on the edge.
pub fn connection_sort(field: &SelectionField) -> Result<Vec<SortKey>, Error> {
    let Some(value) = values::present(field.argument("sort")) else {
        return Ok(vec![]);
    };
    let mut keys = vec![];
    for element in sort_elements(value)? {
        for (key, value) in values::as_object("sort", element)? {
            let target = match key.as_str() {
                "node" => FilterTarget::Node,
                "edge" => FilterTarget::Relationship,
                _ => {
                    return Err(Error::InvalidArgument {
                        argument: "sort".to_string(),
                        message: format!("expected 'node' or 'edge', got '{key}'"),
                    })
                }
            };
            keys.extend(sort_object("sort", value, target)?);
        }
    }
    Ok(keys)
}

/// Skip and limit of a connection, from `after` and `first`.
pub fn connection_pagination(
    field: &SelectionField,
    limit: Option<metadata::LimitSettings>,
) -> Result<Pagination, Error> {
    let requested = values::present(field.argument("first"))
        .map(|value| values::as_limit("first", value))
        .transpose()?;
    let skip = values::present(field.argument("after"))
        .map(|value| values::as_str("after", value).and_then(decode_cursor))
        .transpose()?;
    Ok(Pagination {
        skip,
        limit: resolve_limit(requested, limit),
    })
}

fn resolve_limit(requested: Option<u32>, settings: Option<metadata::LimitSettings>) -> Option<u32> {
    match settings {
        Some(settings) => settings.resolve(requested),
        None => requested,
    }
}

/// The offset of the element following the one a cursor points at.
pub fn decode_cursor(cursor: &str) -> Result<u64, Error> {
    let invalid = || Error::InvalidCursor(cursor.to_string());
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(cursor)
        .map_err(|_| invalid())?;
    let decoded = String::from_utf8(bytes).map_err(|_| invalid())?;
    let position: u64 = decoded
        .strip_prefix(CURSOR_PREFIX)
        .and_then(|position| position.parse().ok())
        .ok_or_else(invalid)?;
    position.checked_add(1).ok_or_else(invalid)
}

/// The cursor of the element at `position`, as the emitted query computes it.
pub fn encode_cursor(position: u64) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("{CURSOR_PREFIX}{position}"))
}

/// A sort argument is a list of objects; a single object stands for a list of one.
fn sort_elements(value: &Value) -> Result<Vec<&Value>, Error> {
    match value {
        Value::Array(elements) => Ok(elements.iter().collect()),
        Value::Object(_) => Ok(vec![value]),
        _ => Err(Error::InvalidArgument {
            argument: "sort".to_string(),
            message: "expected a list of objects".to_string(),
        }),
    }
}

fn sort_object(argument: &str, value: &Value, target: FilterTarget) -> Result<Vec<SortKey>, Error> {
    values::as_object(argument, value)?
        .iter()
        .filter(|(_, direction)| !direction.is_null())
        .map(|(key, direction)| {
            Ok(SortKey {
                target,
                field: FieldName::from(key.as_str()),
                direction: match values::as_str(argument, direction)? {
                    "ASC" => OrderByDirection::Asc,
                    "DESC" => OrderByDirection::Desc,
                    other => {
                        return Err(Error::InvalidArgument {
                            argument: argument.to_string(),
                            message: format!("invalid sort direction '{other}' for '{key}'"),
                        })
                    }
                },
            })
        })
        .collect()
}
