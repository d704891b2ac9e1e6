//! Conditions over aggregated values of a relationship.
//!
//! `likesAggregate: { count_GT: 1, node: { name_AVERAGE_LENGTH_LT: 4 } }` and
//! `likesConnection: { aggregate: { count: { gt: 1 }, node: { name: { averageLength: { lt: 4 } } } } }`
//! are the same condition.

use serde_json::{Map, Value};

use super::parse::{is_scalar_of, WhereParser};
use super::{AggregateExpr, AggregateOperator, AggregateTarget, AggregationFunction, FilterPath};
use crate::translation::error::Error;
use crate::translation::helpers::FieldsInfo;
use query_engine_metadata::metadata;

const OPERATOR_SUFFIXES: [(&str, AggregateOperator); 5] = [
    ("_EQUAL", AggregateOperator::Equal),
    ("_GTE", AggregateOperator::GreaterThanOrEqual),
    ("_GT", AggregateOperator::GreaterThan),
    ("_LTE", AggregateOperator::LessThanOrEqual),
    ("_LT", AggregateOperator::LessThan),
];

const COUNT_SUFFIXES: [(&str, AggregateOperator); 5] = [
    ("count_EQ", AggregateOperator::Equal),
    ("count_GTE", AggregateOperator::GreaterThanOrEqual),
    ("count_GT", AggregateOperator::GreaterThan),
    ("count_LTE", AggregateOperator::LessThanOrEqual),
    ("count_LT", AggregateOperator::LessThan),
];

/// A requested function, remembering whether it was asked for as a string length.
#[derive(Debug, Clone, Copy)]
struct FunctionKey {
    function: AggregationFunction,
    length: bool,
}

const FUNCTION_SUFFIXES: [(&str, FunctionKey); 9] = [
    ("_AVERAGE_LENGTH", FunctionKey::length(AggregationFunction::Average)),
    ("_SHORTEST_LENGTH", FunctionKey::length(AggregationFunction::Min)),
    ("_LONGEST_LENGTH", FunctionKey::length(AggregationFunction::Max)),
    ("_AVERAGE", FunctionKey::value(AggregationFunction::Average)),
    ("_SHORTEST", FunctionKey::length(AggregationFunction::Min)),
    ("_LONGEST", FunctionKey::length(AggregationFunction::Max)),
    ("_MIN", FunctionKey::value(AggregationFunction::Min)),
    ("_MAX", FunctionKey::value(AggregationFunction::Max)),
    ("_SUM", FunctionKey::value(AggregationFunction::Sum)),
];

impl FunctionKey {
    const fn value(function: AggregationFunction) -> FunctionKey {
        FunctionKey {
            function,
            length: false,
        }
    }

    const fn length(function: AggregationFunction) -> FunctionKey {
        FunctionKey {
            function,
            length: true,
        }
    }

    fn from_key(key: &str) -> Option<FunctionKey> {
        Some(match key {
            "average" => FunctionKey::value(AggregationFunction::Average),
            "min" => FunctionKey::value(AggregationFunction::Min),
            "max" => FunctionKey::value(AggregationFunction::Max),
            "sum" => FunctionKey::value(AggregationFunction::Sum),
            "averageLength" => FunctionKey::length(AggregationFunction::Average),
            "shortestLength" => FunctionKey::length(AggregationFunction::Min),
            "longestLength" => FunctionKey::length(AggregationFunction::Max),
            _ => return None,
        })
    }
}

impl<'a, 'env> WhereParser<'a, 'env> {
    /// Parse the aggregate condition of a relationship, in either input shape.
    pub(super) fn parse_aggregate(
        &self,
        relationship: &'env metadata::RelationshipInfo,
        value: &Value,
        path: &FilterPath,
    ) -> Result<AggregateExpr, Error> {
        let node_fields = FieldsInfo::from(self.env.lookup_target(&relationship.target)?);
        let edge_fields = relationship
            .properties
            .as_ref()
            .map(|info| FieldsInfo::RelationshipProperties { info });
        parse_aggregate_object(node_fields, edge_fields, value, path)
    }
}

fn parse_aggregate_object(
    node_fields: FieldsInfo<'_>,
    edge_fields: Option<FieldsInfo<'_>>,
    value: &Value,
    path: &FilterPath,
) -> Result<AggregateExpr, Error> {
    let object = value
        .as_object()
        .ok_or_else(|| path.error("expected an object"))?;
    let mut exprs = vec![];
    for (key, value) in object {
        let path = path.key(key);
        let expr = match key.as_str() {
            "AND" | "OR" => {
                let operands = as_list(value, &path)?
                    .iter()
                    .enumerate()
                    .map(|(index, value)| {
                        parse_aggregate_object(node_fields, edge_fields, value, &path.index(index))
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                if key == "AND" {
                    AggregateExpr::And(operands)
                } else {
                    AggregateExpr::Or(operands)
                }
            }
            "NOT" => AggregateExpr::Not(Box::new(parse_aggregate_object(
                node_fields,
                edge_fields,
                value,
                &path,
            )?)),
            "count" => parse_count(value, &path)?,
            "node" => parse_attribute_aggregates(AggregateTarget::Node, node_fields, value, &path)?,
            "edge" => {
                let edge_fields =
                    edge_fields.ok_or_else(|| path.error("the relationship has no properties"))?;
                parse_attribute_aggregates(AggregateTarget::Edge, edge_fields, value, &path)?
            }
            _ => {
                let operator = COUNT_SUFFIXES
                    .iter()
                    .find(|(suffix, _)| *suffix == key.as_str())
                    .map(|(_, operator)| *operator)
                    .ok_or_else(|| path.error(format!("unexpected key '{key}' in an aggregate filter")))?;
                count(AggregateTarget::Node, operator, value, &path)?
            }
        };
        exprs.push(expr);
    }
    Ok(AggregateExpr::all(exprs))
}

fn as_list<'v>(value: &'v Value, path: &FilterPath) -> Result<&'v Vec<Value>, Error> {
    value
        .as_array()
        .ok_or_else(|| path.error("expected a list"))
}

fn count(
    target: AggregateTarget,
    operator: AggregateOperator,
    value: &Value,
    path: &FilterPath,
) -> Result<AggregateExpr, Error> {
    if !(value.is_i64() || value.is_u64()) {
        return Err(path.error("expected an integer"));
    }
    Ok(AggregateExpr::Count {
        target,
        operator,
        value: value.clone(),
    })
}

fn count_operators(
    target: AggregateTarget,
    operators: &Map<String, Value>,
    path: &FilterPath,
) -> Result<Vec<AggregateExpr>, Error> {
    operators
        .iter()
        .map(|(key, value)| {
            let path = path.key(key);
            let operator = AggregateOperator::from_key(key)
                .ok_or_else(|| path.error(format!("unknown operator '{key}'")))?;
            count(target, operator, value, &path)
        })
        .collect()
}

/// `count: 3`, `count: { gt: 1 }` or `count: { nodes: { gt: 1 }, edges: { lt: 4 } }`.
fn parse_count(value: &Value, path: &FilterPath) -> Result<AggregateExpr, Error> {
    let object = match value {
        Value::Object(object) => object,
        value => return count(AggregateTarget::Node, AggregateOperator::Equal, value, path),
    };
    let split = object
        .keys()
        .filter(|key| matches!(key.as_str(), "nodes" | "edges"))
        .count();
    if split == 0 {
        return Ok(AggregateExpr::all(count_operators(
            AggregateTarget::Node,
            object,
            path,
        )?));
    }
    if split != object.len() {
        return Err(path.error("count takes either operators or nodes and edges, not both"));
    }
    let mut exprs = vec![];
    for (key, value) in object {
        let path = path.key(key);
        let operators = value
            .as_object()
            .ok_or_else(|| path.error("expected an object"))?;
        let target = if key == "nodes" {
            AggregateTarget::Node
        } else {
            AggregateTarget::Edge
        };
        exprs.extend(count_operators(target, operators, &path)?);
    }
    Ok(AggregateExpr::all(exprs))
}

/// `node: { name: { averageLength: { lt: 4 } } }` or `node: { name_AVERAGE_LENGTH_LT: 4 }`.
fn parse_attribute_aggregates(
    target: AggregateTarget,
    fields: FieldsInfo<'_>,
    value: &Value,
    path: &FilterPath,
) -> Result<AggregateExpr, Error> {
    let object = value
        .as_object()
        .ok_or_else(|| path.error("expected an object"))?;
    let mut exprs = vec![];
    for (key, value) in object {
        let path = path.key(key);
        match key.as_str() {
            "AND" | "OR" => {
                let operands = as_list(value, &path)?
                    .iter()
                    .enumerate()
                    .map(|(index, value)| {
                        parse_attribute_aggregates(target, fields, value, &path.index(index))
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                exprs.push(if key == "AND" {
                    AggregateExpr::And(operands)
                } else {
                    AggregateExpr::Or(operands)
                });
            }
            "NOT" => exprs.push(AggregateExpr::Not(Box::new(parse_attribute_aggregates(
                target, fields, value, &path,
            )?))),
            _ => {
                if let (Some((name, attribute)), Value::Object(functions)) =
                    (fields.find_attribute(key), value)
                {
                    for (function_key, operators) in functions {
                        let path = path.key(function_key);
                        let function = FunctionKey::from_key(function_key).ok_or_else(|| {
                            path.error(format!("unknown aggregation function '{function_key}'"))
                        })?;
                        check_function(attribute, function, &path)?;
                        let operators = operators
                            .as_object()
                            .ok_or_else(|| path.error("expected an object"))?;
                        for (operator_key, value) in operators {
                            let path = path.key(operator_key);
                            let operator = AggregateOperator::from_key(operator_key).ok_or_else(
                                || path.error(format!("unknown operator '{operator_key}'")),
                            )?;
                            check_operand(attribute, value, &path)?;
                            exprs.push(AggregateExpr::Attribute {
                                target,
                                field: name.clone(),
                                function: function.function,
                                operator,
                                value: value.clone(),
                            });
                        }
                    }
                    continue;
                }

                let (base, function, operator) = split_suffixes(key).ok_or_else(|| {
                    path.error(format!("unexpected key '{key}' in an aggregate filter"))
                })?;
                let (name, attribute) =
                    fields
                        .find_attribute(base)
                        .ok_or_else(|| Error::FieldNotFound {
                            type_name: fields.type_name(),
                            field: base.into(),
                        })?;
                check_function(attribute, function, &path)?;
                check_operand(attribute, value, &path)?;
                exprs.push(AggregateExpr::Attribute {
                    target,
                    field: name.clone(),
                    function: function.function,
                    operator,
                    value: value.clone(),
                });
            }
        }
    }
    Ok(AggregateExpr::all(exprs))
}

/// `name_AVERAGE_LENGTH_LT` into `name`, the function and the operator.
fn split_suffixes(key: &str) -> Option<(&str, FunctionKey, AggregateOperator)> {
    let (rest, operator) = OPERATOR_SUFFIXES
        .iter()
        .find_map(|(suffix, operator)| key.strip_suffix(suffix).map(|rest| (rest, *operator)))?;
    let (base, function) = FUNCTION_SUFFIXES
        .iter()
        .find_map(|(suffix, function)| rest.strip_suffix(suffix).map(|base| (base, *function)))?;
    Some((base, function, operator))
}

fn check_function(
    attribute: &metadata::AttributeInfo,
    function: FunctionKey,
    path: &FilterPath,
) -> Result<(), Error> {
    let r#type = attribute.r#type;
    let allowed = !attribute.list
        && if r#type.is_textual() {
            true
        } else if r#type.is_numeric() {
            !function.length
        } else if r#type.is_temporal() {
            !function.length
                && matches!(
                    function.function,
                    AggregationFunction::Min | AggregationFunction::Max
                )
        } else {
            false
        };
    if allowed {
        Ok(())
    } else {
        Err(path.error(format!(
            "{:?} cannot be aggregated with {:?}",
            r#type, function.function
        )))
    }
}

fn check_operand(
    attribute: &metadata::AttributeInfo,
    value: &Value,
    path: &FilterPath,
) -> Result<(), Error> {
    let valid = if attribute.r#type.is_temporal() {
        is_scalar_of(attribute.r#type, value)
    } else {
        value.is_number()
    };
    if valid {
        Ok(())
    } else {
        Err(path.error("expected a number"))
    }
}
