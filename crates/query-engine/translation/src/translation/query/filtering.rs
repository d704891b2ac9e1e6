//! Lower parsed `where` expressions into filter nodes.

use super::authorization;
use super::operations::relationship_selection;
use super::values;
use crate::translation::ast::filters::{
    AggregationCondition, AggregationFilter, Filter, FilterTarget, FilterValue, JwtFilter,
    LogicalFilter, LogicalOperator, PropertyFilter, RelationshipFilter,
};
use crate::translation::error::Error;
use crate::translation::helpers::{EntityRef, Env, FieldsInfo, TargetInfo};
use crate::translation::where_input::{
    self, AggregateExpr, AggregateTarget, FilterPath, JwtClaim, PredicateValue, WhereExpr,
};
use query_engine_cypher::cypher::ast as cypher;
use query_engine_models::SelectionField;

/// What the conditions of an expression refer to.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'env> {
    pub node: FieldsInfo<'env>,
    /// Properties of the traversed relationship, inside connection filters.
    pub edge: Option<FieldsInfo<'env>>,
    pub target: FilterTarget,
    /// Whether relationship filters hide related nodes the caller may not read.
    /// Off inside authorization rules, whose conditions see every node.
    pub visibility: bool,
}

impl<'env> Scope<'env> {
    pub fn node(fields: FieldsInfo<'env>) -> Scope<'env> {
        Scope {
            node: fields,
            edge: None,
            target: FilterTarget::Node,
            visibility: true,
        }
    }

    pub fn connection(node: FieldsInfo<'env>, edge: Option<FieldsInfo<'env>>) -> Scope<'env> {
        Scope {
            node,
            edge,
            target: FilterTarget::Node,
            visibility: true,
        }
    }

    pub fn without_visibility(self) -> Scope<'env> {
        Scope {
            visibility: false,
            ..self
        }
    }

    /// A nested scope, keeping the visibility setting.
    fn nested(&self, scope: Scope<'env>) -> Scope<'env> {
        Scope {
            visibility: self.visibility,
            ..scope
        }
    }

    fn fields(&self) -> Result<FieldsInfo<'env>, Error> {
        match self.target {
            FilterTarget::Node => Ok(self.node),
            FilterTarget::Relationship => self.edge.ok_or_else(|| {
                Error::UnboundTraversal("edge condition without relationship properties".to_string())
            }),
        }
    }
}

/// Parse the `where` argument of a read, aggregation or delete into filters.
pub fn translate_where_argument<'env>(
    env: &Env<'env>,
    field: &SelectionField,
    parsed_against: FieldsInfo<'env>,
) -> Result<Option<WhereExpr>, Error> {
    values::present(field.argument("where"))
        .map(|value| where_input::parse_where(env, parsed_against, value, &FilterPath::new("where")))
        .transpose()
}

/// Lower an expression into the filters of an operation. A top-level conjunction
/// becomes a list of filters.
pub fn translate_filters<'env>(
    env: &Env<'env>,
    expr: Option<&WhereExpr>,
    scope: Scope<'env>,
) -> Result<Vec<Filter>, Error> {
    match expr {
        None => Ok(vec![]),
        Some(WhereExpr::And(exprs)) => exprs
            .iter()
            .map(|expr| translate_where(env, expr, scope))
            .collect(),
        Some(expr) => Ok(vec![translate_where(env, expr, scope)?]),
    }
}

/// Lower one expression.
pub fn translate_where<'env>(
    env: &Env<'env>,
    expr: &WhereExpr,
    scope: Scope<'env>,
) -> Result<Filter, Error> {
    match expr {
        WhereExpr::And(exprs) => logical(env, LogicalOperator::And, exprs, scope),
        WhereExpr::Or(exprs) => logical(env, LogicalOperator::Or, exprs, scope),
        WhereExpr::Not(expr) => logical(env, LogicalOperator::Not, std::slice::from_ref(expr.as_ref()), scope),
        WhereExpr::Attribute(predicate) => {
            let attribute = scope.fields()?.lookup_attribute(&predicate.field)?;
            let value = match &predicate.value {
                PredicateValue::Literal(value) => FilterValue::Literal(value.clone()),
                PredicateValue::Jwt(claim) => FilterValue::Claim(jwt_claim(env, claim)),
            };
            Ok(Filter::Property(PropertyFilter {
                attribute,
                target: scope.target,
                operator: predicate.operator,
                value,
            }))
        }
        WhereExpr::Typename(types) => Ok(Filter::Typename(
            types
                .iter()
                .map(|type_name| {
                    env.lookup_entity(type_name)
                        .map(|(name, info)| EntityRef::new(name, info))
                })
                .collect::<Result<_, Error>>()?,
        )),
        WhereExpr::Members(members) => {
            let alternatives = members
                .iter()
                .map(|(type_name, expr)| {
                    let (name, info) = env.lookup_entity(type_name)?;
                    let member = scope.nested(Scope::node(FieldsInfo::Entity { name, info }));
                    Ok(Filter::Logical(LogicalFilter {
                        operator: LogicalOperator::And,
                        filters: vec![
                            Filter::Typename(vec![EntityRef::new(name, info)]),
                            translate_where(env, expr, member)?,
                        ],
                    }))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(Filter::Logical(LogicalFilter {
                operator: LogicalOperator::Or,
                filters: alternatives,
            }))
        }
        WhereExpr::Relationship(predicate) | WhereExpr::Connection(predicate) => {
            let (field_name, info) = scope.node.lookup_relationship(&predicate.field)?;
            let target = env.lookup_target(&info.target)?;
            let inner = scope.nested(if matches!(expr, WhereExpr::Connection(_)) {
                Scope::connection(
                    target.into(),
                    info.properties
                        .as_ref()
                        .map(|info| FieldsInfo::RelationshipProperties { info }),
                )
            } else {
                Scope::node(target.into())
            });
            let filter = RelationshipFilter {
                selection: relationship_selection(env, field_name, info, None, false)?,
                quantifier: predicate.quantifier,
                visibility: visibility(env, target, scope)?,
                filters: translate_filters(env, predicate.predicate.as_deref(), inner)?,
            };
            Ok(if matches!(expr, WhereExpr::Connection(_)) {
                Filter::Connection(filter)
            } else {
                Filter::Relationship(filter)
            })
        }
        WhereExpr::Aggregate(predicate) => {
            let (field_name, info) = scope.node.lookup_relationship(&predicate.field)?;
            let target = env.lookup_target(&info.target)?;
            let inner = Scope::connection(
                target.into(),
                info.properties
                    .as_ref()
                    .map(|info| FieldsInfo::RelationshipProperties { info }),
            );
            Ok(Filter::Aggregation(AggregationFilter {
                selection: relationship_selection(env, field_name, info, None, false)?,
                visibility: visibility(env, target, scope)?,
                condition: aggregation_condition(&predicate.condition, inner)?,
            }))
        }
        WhereExpr::Node(expr) => translate_where(
            env,
            expr,
            Scope {
                target: FilterTarget::Node,
                ..scope
            },
        ),
        WhereExpr::Edge(expr) => translate_where(
            env,
            expr,
            Scope {
                target: FilterTarget::Relationship,
                ..scope
            },
        ),
        WhereExpr::Jwt(predicate) => Ok(Filter::Jwt(JwtFilter {
            claim: jwt_claim(env, &predicate.claim),
            operator: predicate.operator,
            value: predicate.value.clone(),
        })),
    }
}

fn visibility<'env>(
    env: &Env<'env>,
    target: TargetInfo<'env>,
    scope: Scope<'env>,
) -> Result<Vec<Filter>, Error> {
    if scope.visibility {
        authorization::visibility_filters(env, target)
    } else {
        Ok(vec![])
    }
}

fn logical<'env>(
    env: &Env<'env>,
    operator: LogicalOperator,
    exprs: &[WhereExpr],
    scope: Scope<'env>,
) -> Result<Filter, Error> {
    Ok(Filter::Logical(LogicalFilter {
        operator,
        filters: exprs
            .iter()
            .map(|expr| translate_where(env, expr, scope))
            .collect::<Result<_, Error>>()?,
    }))
}

fn aggregation_condition(expr: &AggregateExpr, scope: Scope<'_>) -> Result<AggregationCondition, Error> {
    let all = |exprs: &[AggregateExpr]| {
        exprs
            .iter()
            .map(|expr| aggregation_condition(expr, scope))
            .collect::<Result<Vec<_>, Error>>()
    };
    Ok(match expr {
        AggregateExpr::And(exprs) => AggregationCondition::And(all(exprs)?),
        AggregateExpr::Or(exprs) => AggregationCondition::Or(all(exprs)?),
        AggregateExpr::Not(expr) => {
            AggregationCondition::Not(Box::new(aggregation_condition(expr, scope)?))
        }
        AggregateExpr::Count {
            target,
            operator,
            value,
        } => AggregationCondition::Count {
            target: *target,
            operator: *operator,
            value: value.clone(),
        },
        AggregateExpr::Attribute {
            target,
            field,
            function,
            operator,
            value,
        } => {
            let fields = match target {
                AggregateTarget::Node => scope.node,
                AggregateTarget::Edge => scope.edge.ok_or_else(|| {
                    Error::UnboundTraversal("edge aggregate without relationship properties".to_string())
                })?,
            };
            AggregationCondition::Attribute {
                target: *target,
                attribute: fields.lookup_attribute(field)?,
                function: *function,
                operator: *operator,
                value: value.clone(),
            }
        }
    })
}

/// `$jwt.<path>`
pub fn jwt_claim(env: &Env<'_>, claim: &JwtClaim) -> cypher::Expression {
    claim
        .0
        .iter()
        .fold(env.jwt_param(), |expression, key| cypher::Expression::Property {
            expression: Box::new(expression),
            property: key.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::where_input::ComparisonOperator;
    use query_engine_models::RequestContext;

    #[test]
    fn claims_read_from_the_token_parameter() {
        let metadata = query_engine_metadata::metadata::Metadata::empty();
        let context = RequestContext::with_jwt(
            serde_json::json!({ "sub": "alice" })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        );
        let env = Env::new(&metadata, &context);
        let mut cypher = query_engine_cypher::cypher::string::Cypher::new();
        jwt_claim(&env, &JwtClaim(vec!["org".into(), "id".into()])).to_cypher(&mut cypher);
        assert_eq!(cypher.cypher, "$jwt.org.id");
    }

    #[test]
    fn jwt_predicates_keep_their_operator() {
        Env::with_empty(|env| {
            let filter = translate_where(
                &env,
                &WhereExpr::Jwt(where_input::JwtPredicate {
                    claim: JwtClaim(vec!["roles".into()]),
                    operator: ComparisonOperator::Includes,
                    value: serde_json::json!("admin"),
                }),
                Scope::node(FieldsInfo::RelationshipProperties {
                    info: &query_engine_metadata::metadata::RelationshipPropertiesInfo {
                        type_name: "Likes".into(),
                        attributes: std::collections::BTreeMap::new(),
                    },
                }),
            )
            .expect("lowered");
            assert!(matches!(
                filter,
                Filter::Jwt(JwtFilter {
                    operator: ComparisonOperator::Includes,
                    ..
                })
            ));
        });
    }
}
