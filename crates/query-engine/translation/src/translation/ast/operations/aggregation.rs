use smol_str::SmolStr;

use super::{filter_children, no_rows, result_variable, select_rows, OperationOutput};
use crate::translation::ast::fields::AggregationField;
use crate::translation::ast::filters::{aggregate_expr, Filter};
use crate::translation::ast::selection::Selection;
use crate::translation::ast::tree::QueryAstNode;
use crate::translation::context::TraversalContext;
use crate::translation::error::Error;
use crate::translation::helpers::State;
use crate::translation::where_input::AggregateTarget;
use query_engine_cypher::cypher::{ast as cypher, helpers};

/// The rows of one concrete type to aggregate over.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationPartial {
    pub selection: Selection,
    pub filters: Vec<Filter>,
    pub authorization: Vec<Filter>,
}

/// Aggregate the rows of one or more partials. Node values are computed over
/// distinct nodes, edge values over every matched relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOperation {
    pub partials: Vec<AggregationPartial>,
    pub fields: Vec<AggregationField>,
}

/// Matched rows, with the variables bound to each node and relationship.
struct Rows {
    clauses: Vec<cypher::Clause>,
    node: cypher::Variable,
    relationship: Option<cypher::Variable>,
}

/// One `CALL { .. RETURN <items> }` computing aggregates over a set of rows.
struct Group {
    rows: Rows,
    items: Vec<(cypher::Expression, Option<cypher::Variable>)>,
}

impl AggregationOperation {
    pub fn apply(
        &self,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<OperationOutput, Error> {
        let (node_needed, edge_needed) =
            self.fields
                .iter()
                .fold((false, false), |(node, edge), field| {
                    let (n, e) = field.targets();
                    (node || n, edge || e)
                });
        let mut node_group = if node_needed {
            Some(Group {
                rows: self.rows(context, state)?,
                items: vec![],
            })
        } else {
            None
        };
        let mut edge_group = if edge_needed {
            Some(Group {
                rows: self.rows(context, state)?,
                items: vec![],
            })
        } else {
            None
        };

        let value = aggregation_map(&self.fields, &mut node_group, &mut edge_group, state)?;

        let mut clauses = vec![];
        if let Some(Group { rows, items }) = node_group {
            let mut body = rows.clauses;
            body.push(cypher::Clause::With(cypher::With {
                distinct: true,
                ..helpers::simple_with(helpers::projection([(
                    helpers::variable_expr(&rows.node),
                    None,
                )]))
            }));
            body.push(cypher::Clause::Return(helpers::simple_return(helpers::projection(items))));
            clauses.push(helpers::call_subquery(context.imports(), body));
        }
        if let Some(Group { rows, items }) = edge_group {
            let mut body = rows.clauses;
            body.push(cypher::Clause::Return(helpers::simple_return(helpers::projection(items))));
            clauses.push(helpers::call_subquery(context.imports(), body));
        }

        let variable = result_variable(context, state);
        clauses.push(helpers::return_as(value, &variable));
        Ok(OperationOutput { clauses, variable })
    }

    /// Match the rows of every partial. Several partials are unioned into shared
    /// node and relationship variables.
    fn rows(&self, context: &TraversalContext, state: &mut State) -> Result<Rows, Error> {
        match self.partials.as_slice() {
            [partial] => {
                let (nested, clauses) = select_rows(
                    &partial.selection,
                    &partial.filters,
                    &partial.authorization,
                    context,
                    state,
                )?;
                Ok(Rows {
                    clauses,
                    node: nested.target()?.clone(),
                    relationship: nested.relationship().ok().cloned(),
                })
            }
            [] => {
                let node = state.make_node_variable();
                let mut clauses = vec![no_rows(&node)];
                let relationship = if context.is_root() {
                    None
                } else {
                    let relationship = state.make_relationship_variable();
                    clauses.push(no_rows(&relationship));
                    Some(relationship)
                };
                Ok(Rows {
                    clauses,
                    node,
                    relationship,
                })
            }
            partials => {
                let node = state.make_node_variable();
                let relationship = if context.is_root() {
                    None
                } else {
                    Some(state.make_relationship_variable())
                };
                let mut branches = vec![];
                for partial in partials {
                    let (nested, mut clauses) = select_rows(
                        &partial.selection,
                        &partial.filters,
                        &partial.authorization,
                        context,
                        state,
                    )?;
                    let mut items = vec![(
                        helpers::variable_expr(nested.target()?),
                        Some(node.clone()),
                    )];
                    if let Some(relationship) = &relationship {
                        items.push((
                            helpers::variable_expr(nested.relationship()?),
                            Some(relationship.clone()),
                        ));
                    }
                    clauses.push(cypher::Clause::Return(helpers::simple_return(
                        helpers::projection(items),
                    )));
                    branches.push(clauses);
                }
                Ok(Rows {
                    clauses: vec![helpers::call_union(context.imports(), branches)],
                    node,
                    relationship,
                })
            }
        }
    }
}

/// Build the result map, registering every aggregate with the group computing it.
fn aggregation_map(
    fields: &[AggregationField],
    node_group: &mut Option<Group>,
    edge_group: &mut Option<Group>,
    state: &mut State,
) -> Result<cypher::Expression, Error> {
    let mut entries: Vec<(SmolStr, cypher::Expression)> = vec![];
    for field in fields {
        let entry = match field {
            AggregationField::Count { output_key, target } => {
                let group = pick(*target, node_group, edge_group)?;
                let owner = group.owner(*target)?;
                let value = group.register(
                    helpers::function_expr(cypher::Function::Count, vec![helpers::variable_expr(&owner)]),
                    state,
                );
                (output_key.clone(), value)
            }
            AggregationField::Attribute {
                output_key,
                target,
                attribute,
                functions,
            } => {
                let group = pick(*target, node_group, edge_group)?;
                let owner = group.owner(*target)?;
                let mut values = vec![];
                for (key, function) in functions {
                    let mut aggregate = aggregate_expr(*function, attribute, &owner);
                    if attribute.r#type.is_temporal() {
                        aggregate = helpers::function_expr(cypher::Function::ToString, vec![aggregate]);
                    }
                    values.push((key.clone(), group.register(aggregate, state)));
                }
                (output_key.clone(), cypher::Expression::Map(values))
            }
            AggregationField::Typename {
                output_key,
                type_name,
            } => (output_key.clone(), helpers::string_expr(type_name)),
            AggregationField::Group { output_key, fields } => (
                output_key.clone(),
                aggregation_map(fields, node_group, edge_group, state)?,
            ),
        };
        entries.push(entry);
    }
    Ok(cypher::Expression::Map(entries))
}

fn pick<'g>(
    target: AggregateTarget,
    node_group: &'g mut Option<Group>,
    edge_group: &'g mut Option<Group>,
) -> Result<&'g mut Group, Error> {
    match target {
        AggregateTarget::Node => node_group.as_mut(),
        AggregateTarget::Edge => edge_group.as_mut(),
    }
    .ok_or_else(|| Error::UnboundTraversal("aggregation rows were not selected".to_string()))
}

impl Group {
    fn owner(&self, target: AggregateTarget) -> Result<cypher::Variable, Error> {
        match target {
            AggregateTarget::Node => Ok(self.rows.node.clone()),
            AggregateTarget::Edge => self.rows.relationship.clone().ok_or_else(|| {
                Error::UnboundTraversal("edge aggregation without a relationship".to_string())
            }),
        }
    }

    /// Return `aggregate` from the group under a fresh variable.
    fn register(&mut self, aggregate: cypher::Expression, state: &mut State) -> cypher::Expression {
        let variable = state.make_value_variable();
        self.items.push((aggregate, Some(variable.clone())));
        helpers::variable_expr(&variable)
    }
}

impl QueryAstNode for AggregationOperation {
    fn name(&self) -> String {
        "AggregationOperation".to_string()
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        self.partials
            .iter()
            .map(|partial| partial as &dyn QueryAstNode)
            .chain(self.fields.iter().map(|field| field as &dyn QueryAstNode))
            .collect()
    }
}

impl QueryAstNode for AggregationPartial {
    fn name(&self) -> String {
        "AggregationPartial".to_string()
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        filter_children(&self.selection, &self.filters, &self.authorization).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::ast::selection::{NodeSelection, RelationshipSelection, TargetLabels};
    use crate::translation::context::TraversalStep;
    use crate::translation::helpers::{AttributeRef, EntityRef, RelationshipRef};
    use crate::translation::where_input::AggregationFunction;
    use query_engine_cypher::cypher::string::Cypher;
    use query_engine_metadata::metadata;

    fn render(clauses: Vec<cypher::Clause>) -> String {
        let mut cypher = Cypher::new();
        cypher::Statement { clauses }.to_cypher(&mut cypher);
        cypher.cypher
    }

    fn attribute(name: &str, r#type: metadata::ScalarType) -> AttributeRef {
        AttributeRef {
            field_name: name.into(),
            db_name: name.into(),
            r#type,
            list: false,
        }
    }

    #[test]
    fn root_count_over_distinct_nodes() {
        let mut state = State::new();
        let operation = AggregationOperation {
            partials: vec![AggregationPartial {
                selection: Selection::Node(NodeSelection::new(EntityRef {
                    name: "Post".into(),
                    labels: vec!["Post".into()],
                })),
                filters: vec![],
                authorization: vec![],
            }],
            fields: vec![
                AggregationField::Count {
                    output_key: "count".into(),
                    target: AggregateTarget::Node,
                },
                AggregationField::Attribute {
                    output_key: "title".into(),
                    target: AggregateTarget::Node,
                    attribute: attribute("title", metadata::ScalarType::String),
                    functions: vec![("longestLength".into(), AggregationFunction::Max)],
                },
            ],
        };
        let output = operation.apply(&TraversalContext::root(), &mut state).expect("apply");
        assert_eq!(
            render(output.clauses),
            [
                "CALL {",
                "    MATCH (this0:Post)",
                "    WITH DISTINCT this0",
                "    RETURN count(this0) AS var1, max(size(this0.title)) AS var2",
                "}",
                "RETURN { count: var1, title: { longestLength: var2 } } AS this",
            ]
            .join("\n")
        );
    }

    #[test]
    fn nested_edge_aggregates_run_per_relationship() {
        let mut state = State::new();
        let parent = TraversalContext::root()
            .push(TraversalStep::Node(state.make_node_variable()))
            .expect("node");
        let operation = AggregationOperation {
            partials: vec![AggregationPartial {
                selection: Selection::Relationship(RelationshipSelection {
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
                }),
                filters: vec![],
                authorization: vec![],
            }],
            fields: vec![AggregationField::Group {
                output_key: "edge".into(),
                fields: vec![AggregationField::Attribute {
                    output_key: "likedAt".into(),
                    target: AggregateTarget::Edge,
                    attribute: attribute("likedAt", metadata::ScalarType::DateTime),
                    functions: vec![("min".into(), AggregationFunction::Min)],
                }],
            }],
        };
        let output = operation.apply(&parent, &mut state).expect("apply");
        assert_eq!(output.variable.to_string(), "var4");
        assert_eq!(
            render(output.clauses),
            [
                "CALL {",
                "    WITH this0",
                "    MATCH (this0)<-[rel1:LIKES]-(this2:User)",
                "    RETURN toString(min(rel1.likedAt)) AS var3",
                "}",
                "RETURN { edge: { likedAt: { min: var3 } } } AS var4",
            ]
            .join("\n")
        );
    }
}
