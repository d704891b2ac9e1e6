//! Fields project values of the bound variables under the requested output keys.

use smol_str::SmolStr;

use super::operations::Operation;
use super::tree::QueryAstNode;
use crate::translation::context::TraversalContext;
use crate::translation::error::Error;
use crate::translation::helpers::{AttributeRef, State};
use crate::translation::where_input::{AggregateTarget, AggregationFunction};
use query_engine_cypher::cypher::{ast as cypher, helpers};

/// A field of a node or relationship projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Attribute {
        output_key: SmolStr,
        attribute: AttributeRef,
    },
    Typename {
        output_key: SmolStr,
        type_name: SmolStr,
    },
    /// A relationship field, computed by a nested operation.
    Operation {
        output_key: SmolStr,
        operation: Box<Operation>,
    },
}

/// The result of applying a field.
#[derive(Debug)]
pub struct FieldOutput {
    /// Subqueries computing the value, to run before the projection.
    pub subqueries: Vec<cypher::Clause>,
    pub entry: cypher::MapProjectionEntry,
}

impl Field {
    pub fn output_key(&self) -> &SmolStr {
        match self {
            Field::Attribute { output_key, .. }
            | Field::Typename { output_key, .. }
            | Field::Operation { output_key, .. } => output_key,
        }
    }

    /// Apply the field to the variable it projects from: the bound node, or for
    /// relationship properties the bound relationship.
    pub fn apply(
        &self,
        owner: &cypher::Variable,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<FieldOutput, Error> {
        match self {
            Field::Attribute {
                output_key,
                attribute,
            } => {
                let entry = if attribute.r#type.is_temporal() {
                    cypher::MapProjectionEntry::Expression {
                        key: output_key.clone(),
                        expression: temporal_to_string(owner, attribute),
                    }
                } else {
                    cypher::MapProjectionEntry::Property {
                        key: output_key.clone(),
                        property: attribute.db_name.clone(),
                    }
                };
                Ok(FieldOutput {
                    subqueries: vec![],
                    entry,
                })
            }
            Field::Typename {
                output_key,
                type_name,
            } => Ok(FieldOutput {
                subqueries: vec![],
                entry: cypher::MapProjectionEntry::Expression {
                    key: output_key.clone(),
                    expression: helpers::string_expr(type_name),
                },
            }),
            Field::Operation {
                output_key,
                operation,
            } => {
                let output = operation.apply(context, state)?;
                Ok(FieldOutput {
                    subqueries: vec![helpers::call_subquery(context.imports(), output.clauses)],
                    entry: cypher::MapProjectionEntry::Expression {
                        key: output_key.clone(),
                        expression: helpers::variable_expr(&output.variable),
                    },
                })
            }
        }
    }
}

/// Temporal values are returned in their string form.
fn temporal_to_string(owner: &cypher::Variable, attribute: &AttributeRef) -> cypher::Expression {
    let property = helpers::property_expr(owner, &attribute.db_name);
    if attribute.list {
        let item = helpers::fixed_variable("item");
        cypher::Expression::ListComprehension {
            variable: item.clone(),
            list: Box::new(property),
            where_: None,
            projection: Some(Box::new(helpers::function_expr(
                cypher::Function::ToString,
                vec![helpers::variable_expr(&item)],
            ))),
        }
    } else {
        helpers::function_expr(cypher::Function::ToString, vec![property])
    }
}

/// Project `fields` of `owner` into a map, appending the subqueries they need to `clauses`.
pub fn project(
    owner: &cypher::Variable,
    fields: &[Field],
    context: &TraversalContext,
    state: &mut State,
    clauses: &mut Vec<cypher::Clause>,
) -> Result<cypher::Expression, Error> {
    let mut entries = vec![];
    for field in fields {
        let output = field.apply(owner, context, state)?;
        clauses.extend(output.subqueries);
        entries.push(output.entry);
    }
    Ok(cypher::Expression::MapProjection {
        variable: owner.clone(),
        entries,
    })
}

/// A field of a connection: `{ totalCount edges { .. } pageInfo { .. } }`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionField {
    TotalCount { output_key: SmolStr },
    Edges {
        output_key: SmolStr,
        fields: Vec<EdgeField>,
    },
    PageInfo {
        output_key: SmolStr,
        fields: Vec<PageInfoField>,
    },
    Typename {
        output_key: SmolStr,
        type_name: SmolStr,
    },
}

/// A field of a connection edge.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeField {
    Node {
        output_key: SmolStr,
        fields: Vec<Field>,
    },
    /// Properties of the relationship.
    Properties {
        output_key: SmolStr,
        fields: Vec<Field>,
    },
    Cursor { output_key: SmolStr },
    Typename {
        output_key: SmolStr,
        type_name: SmolStr,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageInfoField {
    HasNextPage { output_key: SmolStr },
    HasPreviousPage { output_key: SmolStr },
    StartCursor { output_key: SmolStr },
    EndCursor { output_key: SmolStr },
    Typename {
        output_key: SmolStr,
        type_name: SmolStr,
    },
}

impl ConnectionField {
    pub fn edge_fields(&self) -> &[EdgeField] {
        match self {
            ConnectionField::Edges { fields, .. } => fields,
            _ => &[],
        }
    }
}

impl EdgeField {
    pub fn output_key(&self) -> &SmolStr {
        match self {
            EdgeField::Node { output_key, .. }
            | EdgeField::Properties { output_key, .. }
            | EdgeField::Cursor { output_key }
            | EdgeField::Typename { output_key, .. } => output_key,
        }
    }
}

/// A field of an aggregation result.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationField {
    /// Count distinct nodes, or edges.
    Count {
        output_key: SmolStr,
        target: AggregateTarget,
    },
    /// Aggregates of one attribute: `title { shortest longest }`.
    Attribute {
        output_key: SmolStr,
        target: AggregateTarget,
        attribute: AttributeRef,
        functions: Vec<(SmolStr, AggregationFunction)>,
    },
    Typename {
        output_key: SmolStr,
        type_name: SmolStr,
    },
    /// A nested map: `count { nodes edges }`, `node { .. }` or `edge { .. }`.
    Group {
        output_key: SmolStr,
        fields: Vec<AggregationField>,
    },
}

impl AggregationField {
    /// Whether node and edge aggregates are needed.
    pub fn targets(&self) -> (bool, bool) {
        match self {
            AggregationField::Count { target, .. } | AggregationField::Attribute { target, .. } => {
                (*target == AggregateTarget::Node, *target == AggregateTarget::Edge)
            }
            AggregationField::Typename { .. } => (false, false),
            AggregationField::Group { fields, .. } => {
                fields.iter().fold((false, false), |(node, edge), field| {
                    let (n, e) = field.targets();
                    (node || n, edge || e)
                })
            }
        }
    }
}

impl QueryAstNode for Field {
    fn name(&self) -> String {
        match self {
            Field::Attribute {
                output_key,
                attribute,
            } => format!("AttributeField {output_key}: {}", attribute.field_name),
            Field::Typename {
                output_key,
                type_name,
            } => format!("TypenameField {output_key}: {type_name}"),
            Field::Operation { output_key, .. } => format!("OperationField {output_key}"),
        }
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        match self {
            Field::Operation { operation, .. } => vec![operation.as_ref() as &dyn QueryAstNode],
            Field::Attribute { .. } | Field::Typename { .. } => vec![],
        }
    }
}

impl QueryAstNode for ConnectionField {
    fn name(&self) -> String {
        match self {
            ConnectionField::TotalCount { output_key } => format!("TotalCount {output_key}"),
            ConnectionField::Edges { output_key, .. } => format!("Edges {output_key}"),
            ConnectionField::PageInfo { output_key, fields } => format!(
                "PageInfo {output_key} [{}]",
                fields
                    .iter()
                    .map(|field| match field {
                        PageInfoField::HasNextPage { output_key }
                        | PageInfoField::HasPreviousPage { output_key }
                        | PageInfoField::StartCursor { output_key }
                        | PageInfoField::EndCursor { output_key }
                        | PageInfoField::Typename { output_key, .. } => output_key.as_str(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ConnectionField::Typename { output_key, type_name } => {
                format!("TypenameField {output_key}: {type_name}")
            }
        }
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        self.edge_fields()
            .iter()
            .map(|field| field as &dyn QueryAstNode)
            .collect()
    }
}

impl QueryAstNode for EdgeField {
    fn name(&self) -> String {
        match self {
            EdgeField::Node { output_key, .. } => format!("EdgeNode {output_key}"),
            EdgeField::Properties { output_key, .. } => format!("EdgeProperties {output_key}"),
            EdgeField::Cursor { output_key } => format!("Cursor {output_key}"),
            EdgeField::Typename {
                output_key,
                type_name,
            } => format!("TypenameField {output_key}: {type_name}"),
        }
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        match self {
            EdgeField::Node { fields, .. } | EdgeField::Properties { fields, .. } => fields
                .iter()
                .map(|field| field as &dyn QueryAstNode)
                .collect(),
            EdgeField::Cursor { .. } | EdgeField::Typename { .. } => vec![],
        }
    }
}

impl QueryAstNode for AggregationField {
    fn name(&self) -> String {
        match self {
            AggregationField::Count { output_key, target } => {
                format!("CountField {output_key} {target:?}")
            }
            AggregationField::Attribute {
                output_key,
                target,
                attribute,
                functions,
            } => format!(
                "AggregationAttributeField {output_key}: {} {target:?} [{}]",
                attribute.field_name,
                functions
                    .iter()
                    .map(|(key, function)| format!("{key}: {function:?}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            AggregationField::Typename {
                output_key,
                type_name,
            } => format!("TypenameField {output_key}: {type_name}"),
            AggregationField::Group { output_key, .. } => format!("AggregationGroup {output_key}"),
        }
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        match self {
            AggregationField::Group { fields, .. } => fields
                .iter()
                .map(|field| field as &dyn QueryAstNode)
                .collect(),
            _ => vec![],
        }
    }
}
