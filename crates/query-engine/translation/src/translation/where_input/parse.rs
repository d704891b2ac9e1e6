//! Parse raw `where` input against the schema.

use serde_json::{Map, Value};
use smol_str::SmolStr;

use super::{
    AggregatePredicate, AttributePredicate, ComparisonOperator, FilterPath, JwtClaim,
    JwtPredicate, PredicateValue, Quantifier, RelationshipPredicate, WhereExpr,
};
use crate::translation::error::Error;
use crate::translation::helpers::{Env, FieldsInfo};
use query_engine_metadata::metadata;
use query_engine_models::{FieldName, TypeName};

const JWT_PREFIX: &str = "$jwt.";

/// Flat attribute suffixes, longest first so that `_NOT_IN` wins over `_IN`.
const ATTRIBUTE_SUFFIXES: [(&str, ComparisonOperator, bool); 17] = [
    ("_NOT_STARTS_WITH", ComparisonOperator::StartsWith, true),
    ("_NOT_ENDS_WITH", ComparisonOperator::EndsWith, true),
    ("_NOT_CONTAINS", ComparisonOperator::Contains, true),
    ("_NOT_INCLUDES", ComparisonOperator::Includes, true),
    ("_NOT_IN", ComparisonOperator::In, true),
    ("_NOT", ComparisonOperator::Equal, true),
    ("_STARTS_WITH", ComparisonOperator::StartsWith, false),
    ("_ENDS_WITH", ComparisonOperator::EndsWith, false),
    ("_CONTAINS", ComparisonOperator::Contains, false),
    ("_INCLUDES", ComparisonOperator::Includes, false),
    ("_MATCHES", ComparisonOperator::Matches, false),
    ("_IN", ComparisonOperator::In, false),
    ("_LTE", ComparisonOperator::LessThanOrEqual, false),
    ("_LT", ComparisonOperator::LessThan, false),
    ("_GTE", ComparisonOperator::GreaterThanOrEqual, false),
    ("_GT", ComparisonOperator::GreaterThan, false),
    ("_EQ", ComparisonOperator::Equal, false),
];

/// Flat relationship suffixes.
const RELATIONSHIP_SUFFIXES: [(&str, Quantifier); 5] = [
    ("_SOME", Quantifier::Some),
    ("_ALL", Quantifier::All),
    ("_NONE", Quantifier::None),
    ("_SINGLE", Quantifier::Single),
    ("_NOT", Quantifier::None),
];

const CONNECTION_KEYS: [&str; 5] = ["some", "all", "none", "single", "aggregate"];

/// Schema-aware parser of `where` input.
pub struct WhereParser<'a, 'env> {
    pub(super) env: &'a Env<'env>,
    /// Inside authorization rules, `"$jwt.<claim>"` strings refer to token claims.
    pub(super) authorization: bool,
}

/// Parse the `where` argument of a read, aggregation or delete.
pub fn parse_where<'env>(
    env: &Env<'env>,
    fields: FieldsInfo<'env>,
    value: &Value,
    path: &FilterPath,
) -> Result<WhereExpr, Error> {
    WhereParser {
        env,
        authorization: false,
    }
    .parse_object(fields, value, path)
}

/// Parse the `where` argument of a connection: `{ node, edge, AND, OR, NOT }`.
/// Without an edge (top-level connections), the node fields may also be given directly.
pub fn parse_connection_where<'env>(
    env: &Env<'env>,
    node_fields: FieldsInfo<'env>,
    edge_fields: Option<FieldsInfo<'env>>,
    value: &Value,
    path: &FilterPath,
) -> Result<WhereExpr, Error> {
    let parser = WhereParser {
        env,
        authorization: false,
    };
    let wrapped = match value {
        Value::Object(object) => {
            edge_fields.is_some()
                || (object.contains_key("node")
                    && object
                        .keys()
                        .all(|key| matches!(key.as_str(), "node" | "AND" | "OR" | "NOT")))
        }
        _ => true,
    };
    if wrapped {
        parser.parse_connection_object(node_fields, edge_fields, value, path)
    } else {
        Ok(WhereExpr::Node(Box::new(
            parser.parse_object(node_fields, value, path)?,
        )))
    }
}

/// Parse the condition of an authorization rule: `{ node, jwt, AND, OR, NOT }`.
pub fn parse_authorization_where<'env>(
    env: &Env<'env>,
    fields: FieldsInfo<'env>,
    value: &Value,
    path: &FilterPath,
) -> Result<WhereExpr, Error> {
    WhereParser {
        env,
        authorization: true,
    }
    .parse_rule_object(fields, value, path)
}

fn as_object<'v>(value: &'v Value, path: &FilterPath) -> Result<&'v Map<String, Value>, Error> {
    value
        .as_object()
        .ok_or_else(|| path.error("expected an object"))
}

fn as_array<'v>(value: &'v Value, path: &FilterPath) -> Result<&'v Vec<Value>, Error> {
    value
        .as_array()
        .ok_or_else(|| path.error("expected a list"))
}

impl<'a, 'env> WhereParser<'a, 'env> {
    /// Parse a where object of an entity, interface, union or relationship properties.
    pub fn parse_object(
        &self,
        fields: FieldsInfo<'env>,
        value: &Value,
        path: &FilterPath,
    ) -> Result<WhereExpr, Error> {
        if value.is_null() {
            return Ok(WhereExpr::And(vec![]));
        }
        let object = as_object(value, path)?;
        let mut exprs = vec![];
        for (key, value) in object {
            let path = path.key(key);
            let expr = match key.as_str() {
                "AND" | "OR" => {
                    let operands = as_array(value, &path)?
                        .iter()
                        .enumerate()
                        .map(|(index, value)| self.parse_object(fields, value, &path.index(index)))
                        .collect::<Result<Vec<_>, Error>>()?;
                    if key == "AND" {
                        WhereExpr::And(operands)
                    } else {
                        WhereExpr::Or(operands)
                    }
                }
                "NOT" => WhereExpr::Not(Box::new(self.parse_object(fields, value, &path)?)),
                _ => self.parse_key(fields, key, value, &path)?,
            };
            push_merging_members(&mut exprs, expr);
        }
        Ok(WhereExpr::all(exprs))
    }

    fn parse_key(
        &self,
        fields: FieldsInfo<'env>,
        key: &str,
        value: &Value,
        path: &FilterPath,
    ) -> Result<WhereExpr, Error> {
        match fields {
            FieldsInfo::Union { info, .. } => return self.parse_member(info, key, value, path),
            FieldsInfo::Interface { info, .. } if key == "typename" || key == "typename_IN" => {
                return self.parse_typename(info, value, path);
            }
            _ => {}
        }

        if let Some((name, attribute)) = fields.find_attribute(key) {
            return match value {
                Value::Object(operators) => self.parse_operators(name, attribute, operators, path),
                value => self.attribute_predicate(name, attribute, ComparisonOperator::Equal, value, path),
            };
        }

        if let Some((name, relationship)) = fields.find_relationship(key) {
            return self.parse_relationship(name, relationship, value, path);
        }

        if let Some(base) = key.strip_suffix("Connection") {
            if let Some((name, relationship)) = fields.find_relationship(base) {
                return self.parse_connection(name, relationship, value, path);
            }
        }

        if let Some(base) = key.strip_suffix("Aggregate") {
            if let Some((name, relationship)) = fields.find_relationship(base) {
                return Ok(WhereExpr::Aggregate(AggregatePredicate {
                    field: name.clone(),
                    condition: self.parse_aggregate(relationship, value, path)?,
                }));
            }
        }

        for (suffix, quantifier) in RELATIONSHIP_SUFFIXES {
            let Some(base) = key.strip_suffix(suffix) else {
                continue;
            };
            if let Some(base) = base.strip_suffix("Connection") {
                if let Some((name, relationship)) = fields.find_relationship(base) {
                    check_quantifier(relationship, quantifier, suffix, path)?;
                    return Ok(WhereExpr::Connection(RelationshipPredicate {
                        field: name.clone(),
                        quantifier,
                        predicate: self.parse_connection_inner(relationship, value, path)?,
                    }));
                }
            }
            if let Some((name, relationship)) = fields.find_relationship(base) {
                check_quantifier(relationship, quantifier, suffix, path)?;
                return Ok(WhereExpr::Relationship(RelationshipPredicate {
                    field: name.clone(),
                    quantifier,
                    predicate: self.parse_related(relationship, value, path)?,
                }));
            }
        }

        for (suffix, operator, negated) in ATTRIBUTE_SUFFIXES {
            let Some(base) = key.strip_suffix(suffix) else {
                continue;
            };
            if let Some((name, attribute)) = fields.find_attribute(base) {
                let expr = self.attribute_predicate(name, attribute, operator, value, path)?;
                return Ok(if negated {
                    WhereExpr::Not(Box::new(expr))
                } else {
                    expr
                });
            }
        }

        Err(Error::FieldNotFound {
            type_name: fields.type_name(),
            field: key.into(),
        })
    }

    /// `title: { eq: "a", contains: "b" }`
    fn parse_operators(
        &self,
        name: &FieldName,
        attribute: &metadata::AttributeInfo,
        operators: &Map<String, Value>,
        path: &FilterPath,
    ) -> Result<WhereExpr, Error> {
        let mut exprs = vec![];
        for (key, value) in operators {
            let path = path.key(key);
            let operator = ComparisonOperator::from_key(key)
                .ok_or_else(|| path.error(format!("unknown operator '{key}'")))?;
            exprs.push(self.attribute_predicate(name, attribute, operator, value, &path)?);
        }
        Ok(WhereExpr::all(exprs))
    }

    fn attribute_predicate(
        &self,
        name: &FieldName,
        attribute: &metadata::AttributeInfo,
        operator: ComparisonOperator,
        value: &Value,
        path: &FilterPath,
    ) -> Result<WhereExpr, Error> {
        let value = match self.jwt_reference(value) {
            Some(claim) => PredicateValue::Jwt(claim),
            None => {
                check_operand(attribute, operator, value, path)?;
                PredicateValue::Literal(value.clone())
            }
        };
        Ok(WhereExpr::Attribute(AttributePredicate {
            field: name.clone(),
            operator,
            value,
        }))
    }

    fn jwt_reference(&self, value: &Value) -> Option<JwtClaim> {
        if !self.authorization {
            return None;
        }
        let path = value.as_str()?.strip_prefix(JWT_PREFIX)?;
        Some(JwtClaim(path.split('.').map(SmolStr::from).collect()))
    }

    /// `typename: [Movie, Series]`
    fn parse_typename(
        &self,
        interface: &metadata::InterfaceInfo,
        value: &Value,
        path: &FilterPath,
    ) -> Result<WhereExpr, Error> {
        let types = as_array(value, path)?
            .iter()
            .map(|value| {
                let name = value
                    .as_str()
                    .ok_or_else(|| path.error("expected a type name"))?;
                interface
                    .implementations
                    .iter()
                    .find(|implementation| implementation.as_str() == name)
                    .cloned()
                    .ok_or_else(|| path.error(format!("'{name}' does not implement the interface")))
            })
            .collect::<Result<Vec<TypeName>, Error>>()?;
        Ok(WhereExpr::Typename(types))
    }

    /// `{ Movie: { .. } }` on a union.
    fn parse_member(
        &self,
        union: &metadata::UnionInfo,
        key: &str,
        value: &Value,
        path: &FilterPath,
    ) -> Result<WhereExpr, Error> {
        let member = union
            .members
            .iter()
            .find(|member| member.as_str() == key)
            .ok_or_else(|| path.error(format!("'{key}' is not a member of the union")))?;
        let (name, info) = self.env.lookup_entity(member)?;
        let expr = self.parse_object(FieldsInfo::Entity { name, info }, value, path)?;
        Ok(WhereExpr::Members(vec![(member.clone(), expr)]))
    }

    /// The where input of the related type.
    fn parse_related(
        &self,
        relationship: &'env metadata::RelationshipInfo,
        value: &Value,
        path: &FilterPath,
    ) -> Result<Option<Box<WhereExpr>>, Error> {
        if value.is_null() {
            return Ok(None);
        }
        let target = self.env.lookup_target(&relationship.target)?;
        Ok(Some(Box::new(self.parse_object(
            FieldsInfo::from(target),
            value,
            path,
        )?)))
    }

    /// `likes: { some: { .. } }`, `author: { .. }` or `author: null`.
    fn parse_relationship(
        &self,
        name: &FieldName,
        relationship: &'env metadata::RelationshipInfo,
        value: &Value,
        path: &FilterPath,
    ) -> Result<WhereExpr, Error> {
        let quantified = match value {
            Value::Null => {
                return Ok(WhereExpr::Relationship(RelationshipPredicate {
                    field: name.clone(),
                    quantifier: Quantifier::None,
                    predicate: None,
                }))
            }
            Value::Object(object) => split_quantifiers(object, &["some", "all", "none", "single"], path)?,
            _ => return Err(path.error("expected an object or null")),
        };

        match quantified {
            Some(entries) => {
                if relationship.cardinality == metadata::Cardinality::One {
                    return Err(path.error(
                        "quantifiers are only allowed on relationships to many nodes",
                    ));
                }
                let exprs = entries
                    .into_iter()
                    .map(|(key, value)| {
                        let path = path.key(key);
                        Ok(WhereExpr::Relationship(RelationshipPredicate {
                            field: name.clone(),
                            quantifier: Quantifier::from_key(key)
                                .ok_or_else(|| path.error("unknown quantifier"))?,
                            predicate: self.parse_related(relationship, value, &path)?,
                        }))
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                Ok(WhereExpr::all(exprs))
            }
            None => Ok(WhereExpr::Relationship(RelationshipPredicate {
                field: name.clone(),
                quantifier: Quantifier::Some,
                predicate: self.parse_related(relationship, value, path)?,
            })),
        }
    }

    /// `likesConnection: { some: { node, edge }, aggregate: { .. } }` or the flat
    /// `likesConnection: { node, edge }`.
    fn parse_connection(
        &self,
        name: &FieldName,
        relationship: &'env metadata::RelationshipInfo,
        value: &Value,
        path: &FilterPath,
    ) -> Result<WhereExpr, Error> {
        let quantified = match value {
            Value::Null => {
                return Ok(WhereExpr::Connection(RelationshipPredicate {
                    field: name.clone(),
                    quantifier: Quantifier::None,
                    predicate: None,
                }))
            }
            Value::Object(object) => split_quantifiers(object, &CONNECTION_KEYS, path)?,
            _ => return Err(path.error("expected an object or null")),
        };

        let Some(entries) = quantified else {
            return Ok(WhereExpr::Connection(RelationshipPredicate {
                field: name.clone(),
                quantifier: Quantifier::Some,
                predicate: self.parse_connection_inner(relationship, value, path)?,
            }));
        };

        let mut exprs = vec![];
        for (key, value) in entries {
            let path = path.key(key);
            if key == "aggregate" {
                exprs.push(WhereExpr::Aggregate(AggregatePredicate {
                    field: name.clone(),
                    condition: self.parse_aggregate(relationship, value, &path)?,
                }));
                continue;
            }
            let quantifier =
                Quantifier::from_key(key).ok_or_else(|| path.error("unknown quantifier"))?;
            if relationship.cardinality == metadata::Cardinality::One {
                return Err(path.error(
                    "quantifiers are only allowed on relationships to many nodes",
                ));
            }
            exprs.push(WhereExpr::Connection(RelationshipPredicate {
                field: name.clone(),
                quantifier,
                predicate: self.parse_connection_inner(relationship, value, &path)?,
            }));
        }
        Ok(WhereExpr::all(exprs))
    }

    fn parse_connection_inner(
        &self,
        relationship: &'env metadata::RelationshipInfo,
        value: &Value,
        path: &FilterPath,
    ) -> Result<Option<Box<WhereExpr>>, Error> {
        if value.is_null() {
            return Ok(None);
        }
        let target = self.env.lookup_target(&relationship.target)?;
        let edge_fields = relationship
            .properties
            .as_ref()
            .map(|info| FieldsInfo::RelationshipProperties { info });
        Ok(Some(Box::new(self.parse_connection_object(
            FieldsInfo::from(target),
            edge_fields,
            value,
            path,
        )?)))
    }

    /// `{ node, edge, AND, OR, NOT }`
    fn parse_connection_object(
        &self,
        node_fields: FieldsInfo<'env>,
        edge_fields: Option<FieldsInfo<'env>>,
        value: &Value,
        path: &FilterPath,
    ) -> Result<WhereExpr, Error> {
        if value.is_null() {
            return Ok(WhereExpr::And(vec![]));
        }
        let object = as_object(value, path)?;
        let mut exprs = vec![];
        for (key, value) in object {
            let path = path.key(key);
            let expr = match key.as_str() {
                "AND" | "OR" => {
                    let operands = as_array(value, &path)?
                        .iter()
                        .enumerate()
                        .map(|(index, value)| {
                            self.parse_connection_object(node_fields, edge_fields, value, &path.index(index))
                        })
                        .collect::<Result<Vec<_>, Error>>()?;
                    if key == "AND" {
                        WhereExpr::And(operands)
                    } else {
                        WhereExpr::Or(operands)
                    }
                }
                "NOT" => WhereExpr::Not(Box::new(self.parse_connection_object(
                    node_fields,
                    edge_fields,
                    value,
                    &path,
                )?)),
                "node" => WhereExpr::Node(Box::new(self.parse_object(node_fields, value, &path)?)),
                "edge" => {
                    let edge_fields = edge_fields
                        .ok_or_else(|| path.error("the relationship has no properties"))?;
                    WhereExpr::Edge(Box::new(self.parse_object(edge_fields, value, &path)?))
                }
                _ => return Err(path.error(format!("unexpected key '{key}' in a connection filter"))),
            };
            exprs.push(expr);
        }
        Ok(WhereExpr::all(exprs))
    }

    /// `{ node, jwt, AND, OR, NOT }`
    fn parse_rule_object(
        &self,
        fields: FieldsInfo<'env>,
        value: &Value,
        path: &FilterPath,
    ) -> Result<WhereExpr, Error> {
        if value.is_null() {
            return Ok(WhereExpr::And(vec![]));
        }
        let object = as_object(value, path)?;
        let mut exprs = vec![];
        for (key, value) in object {
            let path = path.key(key);
            let expr = match key.as_str() {
                "AND" | "OR" => {
                    let operands = as_array(value, &path)?
                        .iter()
                        .enumerate()
                        .map(|(index, value)| self.parse_rule_object(fields, value, &path.index(index)))
                        .collect::<Result<Vec<_>, Error>>()?;
                    if key == "AND" {
                        WhereExpr::And(operands)
                    } else {
                        WhereExpr::Or(operands)
                    }
                }
                "NOT" => WhereExpr::Not(Box::new(self.parse_rule_object(fields, value, &path)?)),
                "node" => WhereExpr::Node(Box::new(self.parse_object(fields, value, &path)?)),
                "jwt" => parse_jwt(value, &path)?,
                _ => return Err(path.error(format!("unexpected key '{key}' in an authorization rule"))),
            };
            exprs.push(expr);
        }
        Ok(WhereExpr::all(exprs))
    }
}

/// Member conditions of one union input object form a single alternative.
fn push_merging_members(exprs: &mut Vec<WhereExpr>, expr: WhereExpr) {
    if let WhereExpr::Members(mut members) = expr {
        if let Some(WhereExpr::Members(existing)) = exprs
            .iter_mut()
            .find(|expr| matches!(expr, WhereExpr::Members(_)))
        {
            existing.append(&mut members);
        } else {
            exprs.push(WhereExpr::Members(members));
        }
    } else {
        exprs.push(expr);
    }
}

/// Split an object into quantifier entries. `None` when no key is a quantifier; an
/// error when quantifier keys are mixed with other keys.
fn split_quantifiers<'v>(
    object: &'v Map<String, Value>,
    keys: &[&str],
    path: &FilterPath,
) -> Result<Option<Vec<(&'v str, &'v Value)>>, Error> {
    let quantifiers = object.keys().filter(|key| keys.contains(&key.as_str())).count();
    if quantifiers == 0 {
        Ok(None)
    } else if quantifiers == object.len() {
        Ok(Some(
            object
                .iter()
                .map(|(key, value)| (key.as_str(), value))
                .collect(),
        ))
    } else {
        Err(path.error(format!(
            "conflicting filter: {} cannot be combined with other fields",
            keys.join(", ")
        )))
    }
}

fn check_quantifier(
    relationship: &metadata::RelationshipInfo,
    quantifier: Quantifier,
    suffix: &str,
    path: &FilterPath,
) -> Result<(), Error> {
    if relationship.cardinality == metadata::Cardinality::One && suffix != "_NOT" {
        return Err(path.error(format!(
            "{quantifier:?} is only allowed on relationships to many nodes"
        )));
    }
    Ok(())
}

/// `jwt: { roles: { includes: "admin" } }` or `jwt: { roles_INCLUDES: "admin" }`.
/// Claims are untyped.
fn parse_jwt(value: &Value, path: &FilterPath) -> Result<WhereExpr, Error> {
    let object = as_object(value, path)?;
    let mut exprs = vec![];
    for (key, value) in object {
        let path = path.key(key);
        let expr = match key.as_str() {
            "AND" | "OR" => {
                let operands = as_array(value, &path)?
                    .iter()
                    .enumerate()
                    .map(|(index, value)| parse_jwt(value, &path.index(index)))
                    .collect::<Result<Vec<_>, Error>>()?;
                if key == "AND" {
                    WhereExpr::And(operands)
                } else {
                    WhereExpr::Or(operands)
                }
            }
            "NOT" => WhereExpr::Not(Box::new(parse_jwt(value, &path)?)),
            _ => {
                if let Value::Object(operators) = value {
                    let claim = jwt_claim(key);
                    let operands = operators
                        .iter()
                        .map(|(operator_key, value)| {
                            let operator = ComparisonOperator::from_key(operator_key).ok_or_else(
                                || path.error(format!("unknown operator '{operator_key}'")),
                            )?;
                            Ok(WhereExpr::Jwt(JwtPredicate {
                                claim: claim.clone(),
                                operator,
                                value: value.clone(),
                            }))
                        })
                        .collect::<Result<Vec<_>, Error>>()?;
                    WhereExpr::all(operands)
                } else {
                    let (claim, operator, negated) = ATTRIBUTE_SUFFIXES
                        .iter()
                        .find_map(|(suffix, operator, negated)| {
                            key.strip_suffix(suffix)
                                .map(|base| (base, *operator, *negated))
                        })
                        .unwrap_or((key.as_str(), ComparisonOperator::Equal, false));
                    let expr = WhereExpr::Jwt(JwtPredicate {
                        claim: jwt_claim(claim),
                        operator,
                        value: value.clone(),
                    });
                    if negated {
                        WhereExpr::Not(Box::new(expr))
                    } else {
                        expr
                    }
                }
            }
        };
        exprs.push(expr);
    }
    Ok(WhereExpr::all(exprs))
}

fn jwt_claim(key: &str) -> JwtClaim {
    JwtClaim(key.split('.').map(SmolStr::from).collect())
}

/// Whether a value can be stored in an attribute of the given scalar type.
pub(super) fn is_scalar_of(r#type: metadata::ScalarType, value: &Value) -> bool {
    match r#type {
        metadata::ScalarType::Id => value.is_string() || value.is_i64() || value.is_u64(),
        metadata::ScalarType::String
        | metadata::ScalarType::DateTime
        | metadata::ScalarType::Date => value.is_string(),
        metadata::ScalarType::Int => value.is_i64() || value.is_u64(),
        metadata::ScalarType::BigInt => {
            value.is_i64()
                || value.is_u64()
                || value.as_str().is_some_and(|s| s.parse::<i64>().is_ok())
        }
        metadata::ScalarType::Float => value.is_number(),
        metadata::ScalarType::Boolean => value.is_boolean(),
    }
}

/// Check that an operator applies to the attribute and that the operand has the right shape.
fn check_operand(
    attribute: &metadata::AttributeInfo,
    operator: ComparisonOperator,
    value: &Value,
    path: &FilterPath,
) -> Result<(), Error> {
    let r#type = attribute.r#type;
    let scalar = |value: &Value| {
        if is_scalar_of(r#type, value) {
            Ok(())
        } else {
            Err(path.error(format!("expected a value of type {:?}", r#type)))
        }
    };
    let list_of_scalars = |value: &Value| match value {
        Value::Array(values) => values.iter().try_for_each(scalar),
        _ => Err(path.error("expected a list")),
    };

    match operator {
        ComparisonOperator::Equal => {
            if value.is_null() {
                Ok(())
            } else if attribute.list {
                list_of_scalars(value)
            } else {
                scalar(value)
            }
        }
        ComparisonOperator::In => {
            if attribute.list {
                Err(path.error("'in' does not apply to list attributes, use 'includes'"))
            } else {
                list_of_scalars(value)
            }
        }
        ComparisonOperator::LessThan
        | ComparisonOperator::LessThanOrEqual
        | ComparisonOperator::GreaterThan
        | ComparisonOperator::GreaterThanOrEqual => {
            if attribute.list || r#type == metadata::ScalarType::Boolean {
                Err(path.error(format!("ordering operators do not apply to {:?}", r#type)))
            } else {
                scalar(value)
            }
        }
        ComparisonOperator::Contains
        | ComparisonOperator::StartsWith
        | ComparisonOperator::EndsWith
        | ComparisonOperator::Matches => {
            if attribute.list || !r#type.is_textual() {
                Err(path.error(format!("string operators do not apply to {:?}", r#type)))
            } else if value.is_string() {
                Ok(())
            } else {
                Err(path.error("expected a string"))
            }
        }
        ComparisonOperator::Includes => {
            if attribute.list {
                scalar(value)
            } else {
                Err(path.error("'includes' only applies to list attributes"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use query_engine_models::RequestContext;

    fn metadata() -> metadata::Metadata {
        serde_json::from_value(json!({
            "entities": {
                "Movie": {
                    "labels": ["Movie"],
                    "attributes": {
                        "title": { "type": "String" },
                        "year": { "type": "Int" },
                        "tags": { "type": "String", "list": true }
                    },
                    "relationships": {
                        "actors": {
                            "type": "ACTED_IN",
                            "direction": "IN",
                            "target": "Person",
                            "cardinality": "MANY",
                            "properties": {
                                "typeName": "ActedIn",
                                "attributes": { "role": { "type": "String" } }
                            }
                        },
                        "director": {
                            "type": "DIRECTED",
                            "direction": "IN",
                            "target": "Person",
                            "cardinality": "ONE"
                        }
                    }
                },
                "Person": {
                    "labels": ["Person"],
                    "attributes": { "name": { "type": "String" } }
                }
            },
            "unions": { "SearchResult": { "members": ["Movie", "Person"] } }
        }))
        .expect("valid metadata")
    }

    fn with_env<R>(f: impl FnOnce(&Env<'_>) -> R) -> R {
        let metadata = metadata();
        let context = RequestContext::anonymous();
        f(&Env::new(&metadata, &context))
    }

    fn movie_where(value: serde_json::Value) -> Result<WhereExpr, Error> {
        with_env(|env| {
            let (name, info) = env.lookup_entity(&"Movie".into())?;
            parse_where(env, FieldsInfo::Entity { name, info }, &value, &FilterPath::new("where"))
        })
    }

    fn title(operator: ComparisonOperator, value: serde_json::Value) -> WhereExpr {
        WhereExpr::Attribute(AttributePredicate {
            field: "title".into(),
            operator,
            value: PredicateValue::Literal(value),
        })
    }

    #[test]
    fn flat_and_nested_operators_agree() {
        let flat = movie_where(json!({ "title_CONTAINS": "Star", "title_NOT": "Up" }));
        let nested = movie_where(json!({ "title": { "contains": "Star" }, "NOT": { "title": "Up" } }));
        assert_eq!(flat, nested);
        assert_eq!(
            flat.expect("parses"),
            WhereExpr::And(vec![
                title(ComparisonOperator::Contains, json!("Star")),
                WhereExpr::Not(Box::new(title(ComparisonOperator::Equal, json!("Up")))),
            ])
        );
    }

    #[test]
    fn equality_with_null_is_allowed() {
        assert_eq!(
            movie_where(json!({ "title": { "eq": null } })),
            Ok(title(ComparisonOperator::Equal, json!(null)))
        );
    }

    #[test]
    fn operand_errors_name_the_path() {
        match movie_where(json!({ "year": { "in": 1999 } })) {
            Err(Error::InvalidFilter { path, .. }) => assert_eq!(path, "where.year.in"),
            other => panic!("expected an invalid filter, got {other:?}"),
        }
        assert!(movie_where(json!({ "year_CONTAINS": "19" })).is_err());
        assert!(movie_where(json!({ "title_INCLUDES": "a" })).is_err());
        assert!(movie_where(json!({ "tags_INCLUDES": "noir" })).is_ok());
    }

    #[test]
    fn null_relationship_means_none_without_a_predicate() {
        assert_eq!(
            movie_where(json!({ "director": null })),
            Ok(WhereExpr::Relationship(RelationshipPredicate {
                field: "director".into(),
                quantifier: Quantifier::None,
                predicate: None,
            }))
        );
    }

    #[test]
    fn to_one_relationships_take_no_explicit_quantifier() {
        let implicit = movie_where(json!({ "director": { "name": "Ada" } })).expect("parses");
        assert!(matches!(
            implicit,
            WhereExpr::Relationship(RelationshipPredicate {
                quantifier: Quantifier::Some,
                predicate: Some(_),
                ..
            })
        ));
        assert!(movie_where(json!({ "director": { "all": { "name": "Ada" } } })).is_err());
        assert!(movie_where(json!({ "director_ALL": { "name": "Ada" } })).is_err());
    }

    #[test]
    fn quantifiers_cannot_be_mixed_with_fields() {
        match movie_where(json!({ "actors": { "some": { "name": "Ada" }, "name": "Bo" } })) {
            Err(Error::InvalidFilter { message, .. }) => assert!(message.contains("conflicting")),
            other => panic!("expected an invalid filter, got {other:?}"),
        }
    }

    #[test]
    fn deprecated_and_current_connection_filters_agree() {
        let flat = movie_where(json!({
            "actorsConnection_SOME": { "node": { "name": "Ada" }, "edge": { "role": "Lead" } }
        }));
        let nested = movie_where(json!({
            "actorsConnection": { "some": { "node": { "name": "Ada" }, "edge": { "role": "Lead" } } }
        }));
        assert!(flat.is_ok());
        assert_eq!(flat, nested);
    }

    #[test]
    fn jwt_references_only_resolve_in_rules() {
        with_env(|env| {
            let (name, info) = env.lookup_entity(&"Movie".into()).expect("entity");
            let fields = FieldsInfo::Entity { name, info };
            let path = FilterPath::new("rule");

            let plain = parse_where(env, fields, &json!({ "title": "$jwt.sub" }), &path);
            assert_eq!(plain, Ok(title(ComparisonOperator::Equal, json!("$jwt.sub"))));

            let rule = parse_authorization_where(
                env,
                fields,
                &json!({ "node": { "title": "$jwt.sub" }, "jwt": { "roles_INCLUDES": "admin" } }),
                &path,
            );
            assert_eq!(
                rule,
                Ok(WhereExpr::And(vec![
                    WhereExpr::Node(Box::new(WhereExpr::Attribute(AttributePredicate {
                        field: "title".into(),
                        operator: ComparisonOperator::Equal,
                        value: PredicateValue::Jwt(JwtClaim(vec!["sub".into()])),
                    }))),
                    WhereExpr::Jwt(JwtPredicate {
                        claim: JwtClaim(vec!["roles".into()]),
                        operator: ComparisonOperator::Includes,
                        value: json!("admin"),
                    }),
                ]))
            );
        });
    }

    #[test]
    fn union_members_form_one_alternative() {
        let expr = with_env(|env| {
            let target = env.lookup_target(&"SearchResult".into())?;
            parse_where(
                env,
                FieldsInfo::from(target),
                &json!({ "Movie": { "title": "Up" }, "Person": { "name": "Ada" } }),
                &FilterPath::new("where"),
            )
        })
        .expect("parses");
        let WhereExpr::Members(members) = &expr else {
            panic!("expected members, got {expr:?}");
        };
        let names: Vec<&str> = members.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Movie", "Person"]);
        assert_eq!(
            expr.narrowed_types().map(|types| types.len()),
            Some(2)
        );
    }

    #[test]
    fn top_level_connection_where_accepts_node_fields_directly() {
        with_env(|env| {
            let (name, info) = env.lookup_entity(&"Movie".into()).expect("entity");
            let fields = FieldsInfo::Entity { name, info };
            let path = FilterPath::new("where");
            let direct = parse_connection_where(env, fields, None, &json!({ "title": "Up" }), &path);
            let wrapped =
                parse_connection_where(env, fields, None, &json!({ "node": { "title": "Up" } }), &path);
            assert_eq!(direct, wrapped);
            assert_eq!(
                direct,
                Ok(WhereExpr::Node(Box::new(title(ComparisonOperator::Equal, json!("Up")))))
            );
        });
    }
}
