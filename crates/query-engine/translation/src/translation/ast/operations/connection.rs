use smol_str::SmolStr;

use super::{filter_children, result_variable, select_rows, OperationOutput};
use crate::translation::ast::fields::{self, ConnectionField, EdgeField, PageInfoField};
use crate::translation::ast::filters::Filter;
use crate::translation::ast::selection::Selection;
use crate::translation::ast::sort::{sort_and_paginate, Pagination, SortField};
use crate::translation::ast::tree::QueryAstNode;
use crate::translation::context::{TraversalContext, TraversalStep};
use crate::translation::error::Error;
use crate::translation::helpers::State;
use query_engine_cypher::cypher::{ast as cypher, helpers};

/// Prefix of the offset encoded in a cursor.
pub const CURSOR_PREFIX: &str = "arrayconnection:";

/// A relay connection over the nodes of one concrete type.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionOperation {
    pub selection: Selection,
    pub filters: Vec<Filter>,
    pub authorization: Vec<Filter>,
    pub fields: Vec<ConnectionField>,
    pub sort: Vec<SortField>,
    pub pagination: Pagination,
}

impl ConnectionOperation {
    pub fn apply(
        &self,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<OperationOutput, Error> {
        let (nested, mut clauses) = select_rows(
            &self.selection,
            &self.filters,
            &self.authorization,
            context,
            state,
        )?;
        let node = nested.target()?.clone();
        let relationship = nested.relationship().ok().cloned();

        let mut edge = vec![(SmolStr::new("node"), helpers::variable_expr(&node))];
        if let Some(relationship) = &relationship {
            edge.push(("relationship".into(), helpers::variable_expr(relationship)));
        }
        let edges = state.make_variable("edges");
        let total_count = state.make_variable("totalCount");
        clauses.extend(collect_edges(cypher::Expression::Map(edge), &edges, &total_count));

        let page = if needs_page(&self.fields) {
            let item = state.make_variable("edge");
            let page_node = state.make_node_variable();
            let page_relationship = relationship.as_ref().map(|_| state.make_relationship_variable());
            let page_context = match &page_relationship {
                Some(page_relationship) => context.push(TraversalStep::Relationship {
                    relationship: page_relationship.clone(),
                    target: page_node.clone(),
                })?,
                None => context.push(TraversalStep::Node(page_node.clone()))?,
            };

            let mut unpacked = vec![(helpers::property_expr(&item, "node"), Some(page_node.clone()))];
            if let Some(page_relationship) = &page_relationship {
                unpacked.push((
                    helpers::property_expr(&item, "relationship"),
                    Some(page_relationship.clone()),
                ));
            }
            let mut inner = vec![
                cypher::Clause::Unwind {
                    expression: helpers::variable_expr(&edges),
                    alias: item.clone(),
                },
                cypher::Clause::With(helpers::simple_with(helpers::projection(unpacked))),
            ];
            let order_by = self
                .sort
                .iter()
                .map(|sort| sort.order_by(&page_context))
                .collect::<Result<Vec<_>, _>>()?;
            inner.extend(sort_and_paginate(order_by, self.pagination));

            let entries = edge_entries(
                self.fields.iter().flat_map(ConnectionField::edge_fields),
                &page_context,
                state,
                &mut inner,
            )?;
            let keys = entries.iter().map(|(key, _)| key.clone()).collect();
            let page = state.make_value_variable();
            inner.push(helpers::return_as(
                helpers::function_expr(cypher::Function::Collect, vec![cypher::Expression::Map(entries)]),
                &page,
            ));
            clauses.push(helpers::call_subquery(vec![edges.clone()], inner));
            Some(Page {
                variable: page,
                keys,
            })
        } else {
            None
        };

        let variable = result_variable(context, state);
        let value = connection_value(&self.fields, &total_count, page.as_ref(), self.pagination.offset())?;
        clauses.push(helpers::return_as(value, &variable));
        Ok(OperationOutput { clauses, variable })
    }
}

/// `WITH collect(<edge>) AS edges WITH edges, size(edges) AS totalCount`
pub(super) fn collect_edges(
    edge: cypher::Expression,
    edges: &cypher::Variable,
    total_count: &cypher::Variable,
) -> [cypher::Clause; 2] {
    [
        cypher::Clause::With(helpers::simple_with(helpers::projection([(
            helpers::function_expr(cypher::Function::Collect, vec![edge]),
            Some(edges.clone()),
        )]))),
        cypher::Clause::With(helpers::simple_with(helpers::projection([
            (helpers::variable_expr(edges), None),
            (
                helpers::function_expr(cypher::Function::Size, vec![helpers::variable_expr(edges)]),
                Some(total_count.clone()),
            ),
        ]))),
    ]
}

/// Whether the page of edges has to be computed at all.
pub(super) fn needs_page(fields: &[ConnectionField]) -> bool {
    fields.iter().any(|field| match field {
        ConnectionField::Edges { .. } => true,
        ConnectionField::PageInfo { fields, .. } => fields.iter().any(|field| {
            !matches!(
                field,
                PageInfoField::HasPreviousPage { .. } | PageInfoField::Typename { .. }
            )
        }),
        ConnectionField::TotalCount { .. } | ConnectionField::Typename { .. } => false,
    })
}

/// The entries of an edge map, for the edge fields of every `edges` selection.
/// Cursors depend on the position in the page and are added afterwards.
pub(super) fn edge_entries<'a>(
    edge_fields: impl IntoIterator<Item = &'a EdgeField>,
    context: &TraversalContext,
    state: &mut State,
    clauses: &mut Vec<cypher::Clause>,
) -> Result<Vec<(SmolStr, cypher::Expression)>, Error> {
    let mut entries: Vec<(SmolStr, cypher::Expression)> = vec![];
    for field in edge_fields {
        let key = field.output_key();
        if entries.iter().any(|(existing, _)| existing == key) {
            continue;
        }
        let value = match field {
            EdgeField::Node { fields, .. } => {
                let node = context.target()?.clone();
                fields::project(&node, fields, context, state, clauses)?
            }
            EdgeField::Properties { fields, .. } => {
                let relationship = context.relationship()?.clone();
                fields::project(&relationship, fields, context, state, clauses)?
            }
            EdgeField::Typename { type_name, .. } => helpers::string_expr(type_name),
            EdgeField::Cursor { .. } => continue,
        };
        entries.push((key.clone(), value));
    }
    Ok(entries)
}

/// The paginated edges: a list of maps holding `keys`.
pub(super) struct Page {
    pub variable: cypher::Variable,
    pub keys: Vec<SmolStr>,
}

/// The value of a connection, given its total count and its page of edge maps.
pub(super) fn connection_value(
    fields: &[ConnectionField],
    total_count: &cypher::Variable,
    page: Option<&Page>,
    offset: u64,
) -> Result<cypher::Expression, Error> {
    let page_keys: Vec<&SmolStr> = page.map(|page| page.keys.iter().collect()).unwrap_or_default();
    let page = || {
        page.map(|page| &page.variable)
            .ok_or_else(|| Error::UnboundTraversal("connection page was not computed".to_string()))
    };
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    let mut entries = vec![];
    for field in fields {
        let (key, value) = match field {
            ConnectionField::TotalCount { output_key } => {
                (output_key.clone(), helpers::variable_expr(total_count))
            }
            ConnectionField::Edges { output_key, fields } => {
                (output_key.clone(), edges_value(fields, page()?, &page_keys, offset))
            }
            ConnectionField::PageInfo { output_key, fields } => {
                let mut page_info = vec![];
                for field in fields {
                    page_info.push(match field {
                        PageInfoField::HasNextPage { output_key } => (
                            output_key.clone(),
                            helpers::binary_expr(
                                helpers::variable_expr(total_count),
                                cypher::BinaryOperator::GreaterThan,
                                helpers::binary_expr(
                                    helpers::int_expr(offset),
                                    cypher::BinaryOperator::Add,
                                    page_size(page()?),
                                ),
                            ),
                        ),
                        PageInfoField::HasPreviousPage { output_key } => (
                            output_key.clone(),
                            cypher::Expression::Value(cypher::Value::Bool(offset > 0)),
                        ),
                        PageInfoField::StartCursor { output_key } => (
                            output_key.clone(),
                            cursor_if_not_empty(page()?, helpers::int_expr(offset)),
                        ),
                        PageInfoField::EndCursor { output_key } => (
                            output_key.clone(),
                            cursor_if_not_empty(
                                page()?,
                                helpers::binary_expr(
                                    helpers::binary_expr(
                                        helpers::int_expr(offset),
                                        cypher::BinaryOperator::Add,
                                        page_size(page()?),
                                    ),
                                    cypher::BinaryOperator::Subtract,
                                    helpers::int_expr(1),
                                ),
                            ),
                        ),
                        PageInfoField::Typename {
                            output_key,
                            type_name,
                        } => (output_key.clone(), helpers::string_expr(type_name)),
                    });
                }
                (output_key.clone(), cypher::Expression::Map(page_info))
            }
            ConnectionField::Typename {
                output_key,
                type_name,
            } => (output_key.clone(), helpers::string_expr(type_name)),
        };
        entries.push((key, value));
    }
    Ok(cypher::Expression::Map(entries))
}

/// The edges of one `edges` selection. The page maps are returned as they are unless
/// cursors are requested or the page holds keys this selection does not ask for.
fn edges_value(
    fields: &[EdgeField],
    page: &cypher::Variable,
    page_keys: &[&SmolStr],
    offset: i64,
) -> cypher::Expression {
    let has_cursor = fields
        .iter()
        .any(|field| matches!(field, EdgeField::Cursor { .. }));
    if !has_cursor && edge_keys(fields) == page_keys {
        return helpers::variable_expr(page);
    }
    let index = helpers::fixed_variable("idx");
    let element = cypher::Expression::Index {
        expression: Box::new(helpers::variable_expr(page)),
        index: Box::new(helpers::variable_expr(&index)),
    };
    let entries = fields
        .iter()
        .map(|field| {
            let key = field.output_key().clone();
            let value = match field {
                EdgeField::Cursor { .. } => cursor_expr(helpers::binary_expr(
                    helpers::int_expr(offset),
                    cypher::BinaryOperator::Add,
                    helpers::variable_expr(&index),
                )),
                _ => cypher::Expression::Property {
                    expression: Box::new(element.clone()),
                    property: key.clone(),
                },
            };
            (key, value)
        })
        .collect();
    cypher::Expression::ListComprehension {
        variable: index,
        list: Box::new(helpers::function_expr(
            cypher::Function::Range,
            vec![
                helpers::int_expr(0),
                helpers::binary_expr(
                    page_size(page),
                    cypher::BinaryOperator::Subtract,
                    helpers::int_expr(1),
                ),
            ],
        )),
        where_: None,
        projection: Some(Box::new(cypher::Expression::Map(entries))),
    }
}

/// Keys of the edge fields other than cursors, in first-seen order.
fn edge_keys<'a>(fields: impl IntoIterator<Item = &'a EdgeField>) -> Vec<&'a SmolStr> {
    let mut keys: Vec<&SmolStr> = vec![];
    for field in fields {
        let key = field.output_key();
        if !matches!(field, EdgeField::Cursor { .. }) && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

fn page_size(page: &cypher::Variable) -> cypher::Expression {
    helpers::function_expr(cypher::Function::Size, vec![helpers::variable_expr(page)])
}

/// The cursor of the element at `position`: the base64 encoded offset.
pub fn cursor_expr(position: cypher::Expression) -> cypher::Expression {
    helpers::function_expr(
        cypher::Function::Custom("apoc.text.base64Encode".into()),
        vec![helpers::binary_expr(
            helpers::string_expr(CURSOR_PREFIX),
            cypher::BinaryOperator::Add,
            helpers::function_expr(cypher::Function::ToString, vec![position]),
        )],
    )
}

/// `CASE WHEN size(page) > 0 THEN <cursor> ELSE null END`
fn cursor_if_not_empty(page: &cypher::Variable, position: cypher::Expression) -> cypher::Expression {
    cypher::Expression::Case {
        branches: vec![(
            helpers::binary_expr(
                page_size(page),
                cypher::BinaryOperator::GreaterThan,
                helpers::int_expr(0),
            ),
            cursor_expr(position),
        )],
        else_: Some(Box::new(cypher::Expression::Value(cypher::Value::Null))),
    }
}

impl QueryAstNode for ConnectionOperation {
    fn name(&self) -> String {
        let mut name = "ConnectionOperation".to_string();
        if !self.pagination.is_empty() {
            name.push_str(&format!(" {:?}", self.pagination));
        }
        name
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        filter_children(&self.selection, &self.filters, &self.authorization)
            .chain(self.fields.iter().map(|field| field as &dyn QueryAstNode))
            .chain(self.sort.iter().map(|sort| sort as &dyn QueryAstNode))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::ast::selection::NodeSelection;
    use crate::translation::helpers::EntityRef;
    use query_engine_cypher::cypher::string::Cypher;

    fn movies(fields: Vec<ConnectionField>) -> ConnectionOperation {
        ConnectionOperation {
            selection: Selection::Node(NodeSelection::new(EntityRef {
                name: "Movie".into(),
                labels: vec!["Movie".into()],
            })),
            filters: vec![],
            authorization: vec![],
            fields,
            sort: vec![],
            pagination: Pagination::default(),
        }
    }

    #[test]
    fn total_count_alone_skips_the_page() {
        let mut state = State::new();
        let connection = movies(vec![ConnectionField::TotalCount {
            output_key: "totalCount".into(),
        }]);
        let output = connection
            .apply(&TraversalContext::root(), &mut state)
            .expect("connection");
        let mut cypher = Cypher::new();
        cypher::Statement {
            clauses: output.clauses,
        }
        .to_cypher(&mut cypher);
        assert_eq!(
            cypher.cypher,
            [
                "MATCH (this0:Movie)",
                "WITH collect({ node: this0 }) AS edges1",
                "WITH edges1, size(edges1) AS totalCount2",
                "RETURN { totalCount: totalCount2 } AS this",
            ]
            .join("\n")
        );
    }

    #[test]
    fn page_info_without_cursors_needs_no_page() {
        assert!(!needs_page(&[ConnectionField::PageInfo {
            output_key: "pageInfo".into(),
            fields: vec![PageInfoField::HasPreviousPage {
                output_key: "hasPreviousPage".into(),
            }],
        }]));
        assert!(needs_page(&[ConnectionField::PageInfo {
            output_key: "pageInfo".into(),
            fields: vec![PageInfoField::EndCursor {
                output_key: "endCursor".into(),
            }],
        }]));
    }

    #[test]
    fn edge_keys_skip_cursors_and_duplicates() {
        let fields = [
            EdgeField::Cursor {
                output_key: "cursor".into(),
            },
            EdgeField::Node {
                output_key: "node".into(),
                fields: vec![],
            },
            EdgeField::Node {
                output_key: "node".into(),
                fields: vec![],
            },
        ];
        let keys: Vec<&str> = edge_keys(&fields).into_iter().map(SmolStr::as_str).collect();
        assert_eq!(keys, vec!["node"]);
    }
}
