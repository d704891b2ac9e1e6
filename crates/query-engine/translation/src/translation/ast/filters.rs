//! Filters compile to predicates over variables bound by a selection.

use serde_json::Value;

use super::selection::RelationshipSelection;
use super::tree::QueryAstNode;
use crate::translation::context::TraversalContext;
use crate::translation::error::Error;
use crate::translation::helpers::{AttributeRef, EntityRef, State};
use crate::translation::where_input::{
    AggregateOperator, AggregateTarget, AggregationFunction, ComparisonOperator, Quantifier,
};
use query_engine_cypher::cypher::{ast as cypher, helpers};
use query_engine_metadata::metadata;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Property(PropertyFilter),
    Logical(LogicalFilter),
    /// The bound node carries the labels of one of these entities.
    Typename(Vec<EntityRef>),
    Relationship(RelationshipFilter),
    /// A quantified condition over the edges of a connection.
    Connection(RelationshipFilter),
    Aggregation(AggregationFilter),
    Jwt(JwtFilter),
    Authorization(AuthorizationFilter),
}

/// Which bound variable a property belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    Node,
    Relationship,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub attribute: AttributeRef,
    pub target: FilterTarget,
    pub operator: ComparisonOperator,
    pub value: FilterValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Literal(Value),
    /// A token claim such as `$jwt.sub`.
    Claim(cypher::Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalFilter {
    pub operator: LogicalOperator,
    pub filters: Vec<Filter>,
}

/// A quantified condition over related nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipFilter {
    pub selection: RelationshipSelection,
    pub quantifier: Quantifier,
    /// Conditions every related node has to meet to be considered at all, such as
    /// read rules of the target type. They are not subject to the quantifier.
    pub visibility: Vec<Filter>,
    /// The quantified condition. Empty when only the existence of related nodes matters.
    pub filters: Vec<Filter>,
}

/// A condition over aggregated values of related nodes or edges.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationFilter {
    pub selection: RelationshipSelection,
    pub visibility: Vec<Filter>,
    pub condition: AggregationCondition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationCondition {
    And(Vec<AggregationCondition>),
    Or(Vec<AggregationCondition>),
    Not(Box<AggregationCondition>),
    Count {
        target: AggregateTarget,
        operator: AggregateOperator,
        value: Value,
    },
    Attribute {
        target: AggregateTarget,
        attribute: AttributeRef,
        function: AggregationFunction,
        operator: AggregateOperator,
        value: Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct JwtFilter {
    /// The claim, `$jwt.<path>`.
    pub claim: cypher::Expression,
    pub operator: ComparisonOperator,
    pub value: Value,
}

/// How a failed authorization rule surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationMode {
    /// Rows failing the rules are not matched.
    Exclusion,
    /// Rows failing the rules abort the statement with the forbidden signal.
    Validation,
}

/// Alternative rules; a row passes if any rule holds.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationFilter {
    pub mode: AuthorizationMode,
    pub rules: Vec<AuthorizationRuleFilter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRuleFilter {
    /// `$isAuthenticated = true`, present when the rule requires authentication.
    pub authentication: Option<cypher::Expression>,
    pub filters: Vec<Filter>,
}

/// The result of applying filters.
#[derive(Debug, Default)]
pub struct FilterOutput {
    /// Subqueries the predicate depends on, run before it is checked.
    pub subqueries: Vec<cypher::Clause>,
    /// `None` means no constraint.
    pub predicate: Option<cypher::Expression>,
    /// Validation clauses, run after the predicate has been applied.
    pub guards: Vec<cypher::Clause>,
}

impl FilterOutput {
    fn predicate(predicate: cypher::Expression) -> FilterOutput {
        FilterOutput {
            predicate: Some(predicate),
            ..FilterOutput::default()
        }
    }
}

/// Apply filters in order and AND their predicates.
pub fn apply_all(
    filters: &[Filter],
    context: &TraversalContext,
    state: &mut State,
) -> Result<FilterOutput, Error> {
    let mut output = FilterOutput::default();
    let mut predicates = vec![];
    for filter in filters {
        let FilterOutput {
            subqueries,
            predicate,
            guards,
        } = filter.apply(context, state)?;
        output.subqueries.extend(subqueries);
        predicates.extend(predicate);
        output.guards.extend(guards);
    }
    output.predicate = helpers::and_all(predicates);
    Ok(output)
}

impl Filter {
    pub fn apply(&self, context: &TraversalContext, state: &mut State) -> Result<FilterOutput, Error> {
        match self {
            Filter::Property(filter) => Ok(FilterOutput::predicate(filter.predicate(context)?)),
            Filter::Logical(filter) => filter.apply(context, state),
            Filter::Typename(entities) => {
                let node = context.target()?;
                Ok(FilterOutput::predicate(
                    helpers::or_any(
                        entities
                            .iter()
                            .map(|entity| helpers::has_labels_expr(node, &entity.labels)),
                    )
                    .unwrap_or_else(helpers::false_expr),
                ))
            }
            Filter::Relationship(filter) | Filter::Connection(filter) => {
                Ok(FilterOutput::predicate(filter.predicate(context, state)?))
            }
            Filter::Aggregation(filter) => filter.apply(context, state),
            Filter::Jwt(filter) => Ok(FilterOutput::predicate(filter.predicate())),
            Filter::Authorization(filter) => filter.apply(context, state),
        }
    }
}

impl PropertyFilter {
    fn predicate(&self, context: &TraversalContext) -> Result<cypher::Expression, Error> {
        let variable = match self.target {
            FilterTarget::Node => context.target()?,
            FilterTarget::Relationship => context.relationship()?,
        };
        let property = helpers::property_expr(variable, &self.attribute.db_name);
        match &self.value {
            FilterValue::Literal(Value::Null) if self.operator == ComparisonOperator::Equal => {
                Ok(cypher::Expression::IsNull(Box::new(property)))
            }
            FilterValue::Literal(value) => Ok(comparison(
                property,
                self.operator,
                value_expr(self.attribute.r#type, value),
            )),
            FilterValue::Claim(claim) => Ok(cypher::Expression::And(vec![
                cypher::Expression::IsNotNull(Box::new(claim.clone())),
                comparison(property, self.operator, claim.clone()),
            ])),
        }
    }
}

/// `<left> <operator> <right>`, `includes` reversing the operands.
fn comparison(
    left: cypher::Expression,
    operator: ComparisonOperator,
    right: cypher::Expression,
) -> cypher::Expression {
    let (left, operator, right) = match operator {
        ComparisonOperator::Equal => (left, cypher::BinaryOperator::Equal, right),
        ComparisonOperator::In => (left, cypher::BinaryOperator::In, right),
        ComparisonOperator::LessThan => (left, cypher::BinaryOperator::LessThan, right),
        ComparisonOperator::LessThanOrEqual => {
            (left, cypher::BinaryOperator::LessThanOrEqual, right)
        }
        ComparisonOperator::GreaterThan => (left, cypher::BinaryOperator::GreaterThan, right),
        ComparisonOperator::GreaterThanOrEqual => {
            (left, cypher::BinaryOperator::GreaterThanOrEqual, right)
        }
        ComparisonOperator::Contains => (left, cypher::BinaryOperator::Contains, right),
        ComparisonOperator::StartsWith => (left, cypher::BinaryOperator::StartsWith, right),
        ComparisonOperator::EndsWith => (left, cypher::BinaryOperator::EndsWith, right),
        ComparisonOperator::Matches => (left, cypher::BinaryOperator::RegexMatch, right),
        ComparisonOperator::Includes => (right, cypher::BinaryOperator::In, left),
    };
    helpers::binary_expr(left, operator, right)
}

/// A parameter holding `value`, converted to a temporal value for temporal attributes.
pub fn value_expr(r#type: metadata::ScalarType, value: &Value) -> cypher::Expression {
    let convert = match r#type {
        metadata::ScalarType::DateTime => cypher::Function::Datetime,
        metadata::ScalarType::Date => cypher::Function::Date,
        _ => return helpers::param_expr(value.clone()),
    };
    match value {
        Value::Array(values) => cypher::Expression::List(
            values
                .iter()
                .map(|value| helpers::function_expr(convert.clone(), vec![helpers::param_expr(value.clone())]))
                .collect(),
        ),
        value => helpers::function_expr(convert, vec![helpers::param_expr(value.clone())]),
    }
}

impl LogicalFilter {
    fn apply(&self, context: &TraversalContext, state: &mut State) -> Result<FilterOutput, Error> {
        match self.operator {
            LogicalOperator::And => apply_all(&self.filters, context, state),
            LogicalOperator::Or => {
                let mut output = FilterOutput::default();
                let mut predicates = vec![];
                let mut unconstrained = false;
                for filter in &self.filters {
                    let FilterOutput {
                        subqueries,
                        predicate,
                        guards,
                    } = filter.apply(context, state)?;
                    output.subqueries.extend(subqueries);
                    output.guards.extend(guards);
                    match predicate {
                        Some(predicate) => predicates.push(predicate),
                        None => unconstrained = true,
                    }
                }
                if !unconstrained {
                    output.predicate = helpers::or_any(predicates);
                }
                Ok(output)
            }
            LogicalOperator::Not => {
                let mut output = apply_all(&self.filters, context, state)?;
                output.predicate = output.predicate.map(helpers::not_expr);
                Ok(output)
            }
        }
    }
}

impl RelationshipFilter {
    fn predicate(
        &self,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<cypher::Expression, Error> {
        let selection = self.selection.apply(context, state)?;
        let visibility = apply_all(&self.visibility, &selection.context, state)?;
        let inner = apply_all(&self.filters, &selection.context, state)?;

        // The pattern with the selection and visibility conditions, plus `condition`.
        let body = |condition: Option<cypher::Expression>| {
            let mut clauses = vec![selection.clause.clone()];
            clauses.extend(visibility.subqueries.iter().cloned());
            clauses.extend(inner.subqueries.iter().cloned());
            helpers::attach_where(
                &mut clauses,
                helpers::and_all(
                    selection
                        .predicate
                        .iter()
                        .chain(visibility.predicate.iter())
                        .cloned()
                        .chain(condition),
                ),
            );
            clauses
        };

        Ok(match self.quantifier {
            Quantifier::Some => cypher::Expression::Exists(body(inner.predicate.clone())),
            Quantifier::None => {
                helpers::not_expr(cypher::Expression::Exists(body(inner.predicate.clone())))
            }
            Quantifier::All => match &inner.predicate {
                None => cypher::Expression::Exists(body(None)),
                Some(predicate) => cypher::Expression::And(vec![
                    cypher::Expression::Exists(body(Some(predicate.clone()))),
                    helpers::not_expr(cypher::Expression::Exists(body(Some(helpers::not_expr(
                        predicate.clone(),
                    ))))),
                ]),
            },
            Quantifier::Single => helpers::binary_expr(
                cypher::Expression::Count(body(inner.predicate.clone())),
                cypher::BinaryOperator::Equal,
                helpers::int_expr(1),
            ),
        })
    }
}

/// Values computed by one aggregation subquery.
#[derive(Default)]
struct AggregationGroup {
    items: Vec<(cypher::Expression, cypher::Variable)>,
}

impl AggregationFilter {
    fn apply(&self, context: &TraversalContext, state: &mut State) -> Result<FilterOutput, Error> {
        let (node, edge) = self.condition.targets();
        let node_rows = if node {
            Some(self.rows(context, state)?)
        } else {
            None
        };
        let edge_rows = if edge {
            Some(self.rows(context, state)?)
        } else {
            None
        };

        let mut node_group = AggregationGroup::default();
        let mut edge_group = AggregationGroup::default();
        let predicate = self.condition.predicate(
            node_rows.as_ref().map(|(context, _)| context),
            edge_rows.as_ref().map(|(context, _)| context),
            &mut node_group,
            &mut edge_group,
            state,
        )?;

        let mut subqueries = vec![];
        if let Some((nested, mut clauses)) = node_rows {
            let target = nested.target()?.clone();
            clauses.push(cypher::Clause::With(cypher::With {
                distinct: true,
                ..helpers::simple_with(helpers::projection([(
                    helpers::variable_expr(&target),
                    None,
                )]))
            }));
            clauses.push(group_return(node_group));
            subqueries.push(helpers::call_subquery(context.imports(), clauses));
        }
        if let Some((_, mut clauses)) = edge_rows {
            clauses.push(group_return(edge_group));
            subqueries.push(helpers::call_subquery(context.imports(), clauses));
        }

        Ok(FilterOutput {
            subqueries,
            predicate: Some(predicate),
            guards: vec![],
        })
    }

    /// The related rows the aggregates range over.
    fn rows(
        &self,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<(TraversalContext, Vec<cypher::Clause>), Error> {
        let selection = self.selection.apply(context, state)?;
        let visibility = apply_all(&self.visibility, &selection.context, state)?;
        let mut clauses = vec![selection.clause];
        clauses.extend(visibility.subqueries);
        helpers::attach_where(
            &mut clauses,
            helpers::and_all(selection.predicate.into_iter().chain(visibility.predicate)),
        );
        Ok((selection.context, clauses))
    }
}

fn group_return(group: AggregationGroup) -> cypher::Clause {
    cypher::Clause::Return(helpers::simple_return(helpers::projection(
        group
            .items
            .into_iter()
            .map(|(expression, variable)| (expression, Some(variable))),
    )))
}

impl AggregationCondition {
    /// Whether node and edge aggregates are needed.
    fn targets(&self) -> (bool, bool) {
        match self {
            AggregationCondition::And(conditions) | AggregationCondition::Or(conditions) => {
                conditions.iter().fold((false, false), |(node, edge), condition| {
                    let (n, e) = condition.targets();
                    (node || n, edge || e)
                })
            }
            AggregationCondition::Not(condition) => condition.targets(),
            AggregationCondition::Count { target, .. }
            | AggregationCondition::Attribute { target, .. } => {
                (*target == AggregateTarget::Node, *target == AggregateTarget::Edge)
            }
        }
    }

    fn predicate(
        &self,
        node: Option<&TraversalContext>,
        edge: Option<&TraversalContext>,
        node_group: &mut AggregationGroup,
        edge_group: &mut AggregationGroup,
        state: &mut State,
    ) -> Result<cypher::Expression, Error> {
        match self {
            AggregationCondition::And(conditions) => Ok(helpers::and_all(
                conditions
                    .iter()
                    .map(|condition| condition.predicate(node, edge, node_group, edge_group, state))
                    .collect::<Result<Vec<_>, Error>>()?,
            )
            .unwrap_or_else(helpers::true_expr)),
            AggregationCondition::Or(conditions) => Ok(helpers::or_any(
                conditions
                    .iter()
                    .map(|condition| condition.predicate(node, edge, node_group, edge_group, state))
                    .collect::<Result<Vec<_>, Error>>()?,
            )
            .unwrap_or_else(helpers::true_expr)),
            AggregationCondition::Not(condition) => Ok(helpers::not_expr(
                condition.predicate(node, edge, node_group, edge_group, state)?,
            )),
            AggregationCondition::Count {
                target,
                operator,
                value,
            } => {
                let (context, group) = pick(*target, node, edge, node_group, edge_group)?;
                let counted = match target {
                    AggregateTarget::Node => context.target()?,
                    AggregateTarget::Edge => context.relationship()?,
                };
                let variable = state.make_value_variable();
                group.items.push((
                    helpers::function_expr(
                        cypher::Function::Count,
                        vec![helpers::variable_expr(counted)],
                    ),
                    variable.clone(),
                ));
                Ok(helpers::binary_expr(
                    helpers::variable_expr(&variable),
                    aggregate_operator(*operator),
                    helpers::param_expr(value.clone()),
                ))
            }
            AggregationCondition::Attribute {
                target,
                attribute,
                function,
                operator,
                value,
            } => {
                let (context, group) = pick(*target, node, edge, node_group, edge_group)?;
                let owner = match target {
                    AggregateTarget::Node => context.target()?,
                    AggregateTarget::Edge => context.relationship()?,
                };
                let variable = state.make_value_variable();
                group.items.push((
                    aggregate_expr(*function, attribute, owner),
                    variable.clone(),
                ));
                Ok(helpers::binary_expr(
                    helpers::variable_expr(&variable),
                    aggregate_operator(*operator),
                    value_expr(attribute.r#type, value),
                ))
            }
        }
    }
}

fn pick<'c, 'g>(
    target: AggregateTarget,
    node: Option<&'c TraversalContext>,
    edge: Option<&'c TraversalContext>,
    node_group: &'g mut AggregationGroup,
    edge_group: &'g mut AggregationGroup,
) -> Result<(&'c TraversalContext, &'g mut AggregationGroup), Error> {
    let (context, group) = match target {
        AggregateTarget::Node => (node, node_group),
        AggregateTarget::Edge => (edge, edge_group),
    };
    context
        .map(|context| (context, group))
        .ok_or_else(|| Error::UnboundTraversal("aggregation rows were not selected".to_string()))
}

/// `avg(this1.someInt)`; over strings the function applies to the length,
/// `avg(size(this1.name))`.
pub fn aggregate_expr(
    function: AggregationFunction,
    attribute: &AttributeRef,
    owner: &cypher::Variable,
) -> cypher::Expression {
    let mut value = helpers::property_expr(owner, &attribute.db_name);
    if attribute.r#type.is_textual() {
        value = helpers::function_expr(cypher::Function::Size, vec![value]);
    }
    let function = match function {
        AggregationFunction::Average => cypher::Function::Avg,
        AggregationFunction::Min => cypher::Function::Min,
        AggregationFunction::Max => cypher::Function::Max,
        AggregationFunction::Sum => cypher::Function::Sum,
    };
    helpers::function_expr(function, vec![value])
}

fn aggregate_operator(operator: AggregateOperator) -> cypher::BinaryOperator {
    match operator {
        AggregateOperator::Equal => cypher::BinaryOperator::Equal,
        AggregateOperator::GreaterThan => cypher::BinaryOperator::GreaterThan,
        AggregateOperator::GreaterThanOrEqual => cypher::BinaryOperator::GreaterThanOrEqual,
        AggregateOperator::LessThan => cypher::BinaryOperator::LessThan,
        AggregateOperator::LessThanOrEqual => cypher::BinaryOperator::LessThanOrEqual,
    }
}

impl JwtFilter {
    fn predicate(&self) -> cypher::Expression {
        cypher::Expression::And(vec![
            cypher::Expression::IsNotNull(Box::new(self.claim.clone())),
            comparison(
                self.claim.clone(),
                self.operator,
                helpers::param_expr(self.value.clone()),
            ),
        ])
    }
}

impl AuthorizationFilter {
    fn apply(&self, context: &TraversalContext, state: &mut State) -> Result<FilterOutput, Error> {
        let mut subqueries = vec![];
        let mut alternatives = vec![];
        let mut unconditional = false;
        for rule in &self.rules {
            let inner = apply_all(&rule.filters, context, state)?;
            subqueries.extend(inner.subqueries);
            let authentication = rule.authentication.clone().map(|is_authenticated| {
                helpers::binary_expr(
                    is_authenticated,
                    cypher::BinaryOperator::Equal,
                    helpers::true_expr(),
                )
            });
            match helpers::and_all(authentication.into_iter().chain(inner.predicate)) {
                Some(predicate) => alternatives.push(predicate),
                None => unconditional = true,
            }
        }
        let predicate = if unconditional {
            None
        } else {
            helpers::or_any(alternatives)
        };

        Ok(match self.mode {
            AuthorizationMode::Exclusion => FilterOutput {
                subqueries,
                predicate,
                guards: vec![],
            },
            AuthorizationMode::Validation => FilterOutput {
                subqueries,
                predicate: None,
                guards: predicate.map(helpers::validate_guard).into_iter().collect(),
            },
        })
    }
}

impl QueryAstNode for Filter {
    fn name(&self) -> String {
        match self {
            Filter::Property(filter) => format!(
                "PropertyFilter {:?} {} {:?}",
                filter.target, filter.attribute.field_name, filter.operator
            ),
            Filter::Logical(filter) => format!("LogicalFilter {:?}", filter.operator),
            Filter::Typename(entities) => format!(
                "TypenameFilter [{}]",
                entities
                    .iter()
                    .map(|entity| entity.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Filter::Relationship(filter) => format!(
                "RelationshipFilter {} {:?}",
                filter.selection.relationship.field_name, filter.quantifier
            ),
            Filter::Connection(filter) => format!(
                "ConnectionFilter {} {:?}",
                filter.selection.relationship.field_name, filter.quantifier
            ),
            Filter::Aggregation(filter) => format!(
                "AggregationFilter {}",
                filter.selection.relationship.field_name
            ),
            Filter::Jwt(filter) => format!("JwtFilter {:?}", filter.operator),
            Filter::Authorization(filter) => format!(
                "AuthorizationFilter {:?} ({} rules)",
                filter.mode,
                filter.rules.len()
            ),
        }
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        match self {
            Filter::Logical(filter) => filter
                .filters
                .iter()
                .map(|filter| filter as &dyn QueryAstNode)
                .collect(),
            Filter::Relationship(filter) | Filter::Connection(filter) => {
                std::iter::once(&filter.selection as &dyn QueryAstNode)
                    .chain(filter.visibility.iter().map(|f| f as &dyn QueryAstNode))
                    .chain(filter.filters.iter().map(|f| f as &dyn QueryAstNode))
                    .collect()
            }
            Filter::Aggregation(filter) => std::iter::once(&filter.selection as &dyn QueryAstNode)
                .chain(filter.visibility.iter().map(|f| f as &dyn QueryAstNode))
                .collect(),
            Filter::Authorization(filter) => filter
                .rules
                .iter()
                .flat_map(|rule| rule.filters.iter())
                .map(|filter| filter as &dyn QueryAstNode)
                .collect(),
            Filter::Property(_) | Filter::Typename(_) | Filter::Jwt(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::ast::selection::{NodeSelection, TargetLabels};
    use crate::translation::helpers::RelationshipRef;
    use query_engine_cypher::cypher::string::Cypher;

    fn render(expression: &cypher::Expression) -> String {
        let mut cypher = Cypher::new();
        expression.to_cypher(&mut cypher);
        cypher.cypher
    }

    fn post_context(state: &mut State) -> TraversalContext {
        NodeSelection::new(EntityRef {
            name: "Post".into(),
            labels: vec!["Post".into()],
        })
        .apply(&TraversalContext::root(), state)
        .expect("node")
        .context
    }

    fn some_int(operator: ComparisonOperator, value: Value) -> Filter {
        Filter::Property(PropertyFilter {
            attribute: AttributeRef {
                field_name: "someInt".into(),
                db_name: "someInt".into(),
                r#type: metadata::ScalarType::Int,
                list: false,
            },
            target: FilterTarget::Node,
            operator,
            value: FilterValue::Literal(value),
        })
    }

    fn likes(quantifier: Quantifier, filters: Vec<Filter>) -> Filter {
        Filter::Relationship(RelationshipFilter {
            selection: RelationshipSelection {
                relationship: RelationshipRef {
                    field_name: "likes".into(),
                    r#type: "LIKES".into(),
                    direction: metadata::Direction::In,
                    cardinality: metadata::Cardinality::Many,
                    nullable: false,
                },
                alias: None,
                target: TargetLabels::Labels(vec!["User".into()]),
                target_override: None,
                optional: false,
            },
            quantifier,
            visibility: vec![],
            filters,
        })
    }

    #[test]
    fn null_equality_is_null_check() {
        let mut state = State::new();
        let context = post_context(&mut state);
        let output = some_int(ComparisonOperator::Equal, Value::Null)
            .apply(&context, &mut state)
            .expect("filter");
        assert_eq!(render(&output.predicate.expect("predicate")), "this0.someInt IS NULL");
    }

    #[test]
    fn all_is_some_and_not_some_negated() {
        let mut state = State::new();
        let context = post_context(&mut state);
        let output = likes(
            Quantifier::All,
            vec![some_int(ComparisonOperator::GreaterThan, 1.into())],
        )
        .apply(&context, &mut state)
        .expect("filter");
        assert_eq!(
            render(&output.predicate.expect("predicate")),
            "(EXISTS {\n    MATCH (this0)<-[rel1:LIKES]-(this2:User)\n    WHERE this2.someInt > $param0\n} AND NOT EXISTS {\n    MATCH (this0)<-[rel1:LIKES]-(this2:User)\n    WHERE NOT (this2.someInt > $param1)\n})"
        );
    }

    #[test]
    fn single_counts_matches() {
        let mut state = State::new();
        let context = post_context(&mut state);
        let output = likes(Quantifier::Single, vec![])
            .apply(&context, &mut state)
            .expect("filter");
        assert_eq!(
            render(&output.predicate.expect("predicate")),
            "COUNT {\n    MATCH (this0)<-[rel1:LIKES]-(this2:User)\n} = 1"
        );
    }

    #[test]
    fn unconditional_rule_lifts_the_restriction() {
        let mut state = State::new();
        let context = post_context(&mut state);
        let filter = Filter::Authorization(AuthorizationFilter {
            mode: AuthorizationMode::Exclusion,
            rules: vec![
                AuthorizationRuleFilter {
                    authentication: None,
                    filters: vec![some_int(ComparisonOperator::Equal, 1.into())],
                },
                AuthorizationRuleFilter {
                    authentication: None,
                    filters: vec![],
                },
            ],
        });
        let output = filter.apply(&context, &mut state).expect("filter");
        assert!(output.predicate.is_none());
    }

    #[test]
    fn validation_becomes_a_guard() {
        let mut state = State::new();
        let context = post_context(&mut state);
        let filter = Filter::Authorization(AuthorizationFilter {
            mode: AuthorizationMode::Validation,
            rules: vec![AuthorizationRuleFilter {
                authentication: None,
                filters: vec![some_int(ComparisonOperator::Equal, 1.into())],
            }],
        });
        let output = filter.apply(&context, &mut state).expect("filter");
        assert!(output.predicate.is_none());
        assert_eq!(output.guards.len(), 1);
    }

    #[test]
    fn string_aggregates_use_length() {
        let attribute = AttributeRef {
            field_name: "name".into(),
            db_name: "name".into(),
            r#type: metadata::ScalarType::String,
            list: false,
        };
        let owner = cypher::Variable {
            name: "this".into(),
            unique_index: Some(1),
        };
        assert_eq!(
            render(&aggregate_expr(AggregationFunction::Average, &attribute, &owner)),
            "avg(size(this1.name))"
        );
    }
}
