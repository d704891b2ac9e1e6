//! Operations over an interface or union: one branch per concrete type, joined
//! with `UNION ALL`, then sorted and paginated together. Sort keys travel beside
//! the projections as extra columns.

use super::connection::{collect_edges, connection_value, edge_entries, needs_page, Page};
use super::{collect_value, filter_children, no_rows, result_variable, select_rows, OperationOutput};
use super::read::ReadOperation;
use crate::translation::ast::fields::{ConnectionField, EdgeField};
use crate::translation::ast::filters::Filter;
use crate::translation::ast::selection::Selection;
use crate::translation::ast::sort::{sort_and_paginate, Pagination, SortField};
use crate::translation::ast::tree::QueryAstNode;
use crate::translation::context::TraversalContext;
use crate::translation::error::Error;
use crate::translation::helpers::State;
use query_engine_cypher::cypher::{ast as cypher, helpers};
use query_engine_metadata::metadata;

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeReadOperation {
    /// One read per concrete type. Their sorting and pagination are ignored.
    pub partials: Vec<ReadOperation>,
    /// Attributes shared by every concrete type.
    pub sort: Vec<SortField>,
    pub pagination: Pagination,
    pub cardinality: metadata::Cardinality,
}

impl CompositeReadOperation {
    pub fn apply(
        &self,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<OperationOutput, Error> {
        let shared = state.make_value_variable();
        let sort_columns = sort_key_columns(&self.sort, self.partials.is_empty(), state);
        let branches = self
            .partials
            .iter()
            .map(|partial| partial.apply_branch(context, state, &shared, &sort_columns))
            .collect::<Result<Vec<_>, _>>()?;
        let mut clauses = vec![union_or_nothing(context, branches, &shared)];

        let order_by = sort_columns
            .iter()
            .map(|(sort, column)| sort.order_by_column(column))
            .collect();
        clauses.extend(sort_and_paginate(order_by, self.pagination));

        let variable = result_variable(context, state);
        let value = if context.is_root() {
            helpers::variable_expr(&shared)
        } else {
            collect_value(helpers::variable_expr(&shared), self.cardinality)
        };
        clauses.push(helpers::return_as(value, &variable));
        Ok(OperationOutput { clauses, variable })
    }
}

/// A fresh column per sort key. An empty union binds no columns to sort on.
fn sort_key_columns(
    sort: &[SortField],
    no_branches: bool,
    state: &mut State,
) -> Vec<(SortField, cypher::Variable)> {
    if no_branches {
        return vec![];
    }
    sort.iter()
        .map(|sort| (sort.clone(), state.make_value_variable()))
        .collect()
}

fn union_or_nothing(
    context: &TraversalContext,
    branches: Vec<Vec<cypher::Clause>>,
    alias: &cypher::Variable,
) -> cypher::Clause {
    if branches.is_empty() {
        no_rows(alias)
    } else {
        helpers::call_union(context.imports(), branches)
    }
}

/// The rows of one concrete type in a composite connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionPartial {
    pub selection: Selection,
    pub filters: Vec<Filter>,
    pub authorization: Vec<Filter>,
    /// Edge fields resolved for this type, covering every `edges` selection.
    pub edges: Vec<EdgeField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeConnectionOperation {
    pub partials: Vec<ConnectionPartial>,
    pub fields: Vec<ConnectionField>,
    /// Attributes of the shared node or relationship properties.
    pub sort: Vec<SortField>,
    pub pagination: Pagination,
}

impl CompositeConnectionOperation {
    pub fn apply(
        &self,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<OperationOutput, Error> {
        let edge = state.make_variable("edge");
        let sort_columns = sort_key_columns(&self.sort, self.partials.is_empty(), state);
        let mut branches = vec![];
        let mut keys = vec![];
        for partial in &self.partials {
            let (nested, mut clauses) = select_rows(
                &partial.selection,
                &partial.filters,
                &partial.authorization,
                context,
                state,
            )?;
            let entries = edge_entries(&partial.edges, &nested, state, &mut clauses)?;
            keys = entries.iter().map(|(key, _)| key.clone()).collect();
            let mut items = vec![(cypher::Expression::Map(entries), Some(edge.clone()))];
            for (sort, column) in &sort_columns {
                items.push((sort.value(&nested)?, Some(column.clone())));
            }
            clauses.push(cypher::Clause::Return(helpers::simple_return(helpers::projection(items))));
            branches.push(clauses);
        }
        let mut clauses = vec![union_or_nothing(context, branches, &edge)];

        // Rows are collected in the order they are sorted in here.
        let order_by = sort_columns
            .iter()
            .map(|(sort, column)| sort.order_by_column(column))
            .collect();
        clauses.extend(sort_and_paginate(order_by, Pagination::default()));

        let edges = state.make_variable("edges");
        let total_count = state.make_variable("totalCount");
        clauses.extend(collect_edges(helpers::variable_expr(&edge), &edges, &total_count));

        let page = if needs_page(&self.fields) {
            let item = state.make_variable("edge");
            let mut inner = vec![cypher::Clause::Unwind {
                expression: helpers::variable_expr(&edges),
                alias: item.clone(),
            }];
            inner.extend(sort_and_paginate(vec![], self.pagination));
            let page = state.make_value_variable();
            inner.push(helpers::return_as(
                helpers::function_expr(cypher::Function::Collect, vec![helpers::variable_expr(&item)]),
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

impl QueryAstNode for CompositeReadOperation {
    fn name(&self) -> String {
        let mut name = "CompositeReadOperation".to_string();
        if !self.pagination.is_empty() {
            name.push_str(&format!(" {:?}", self.pagination));
        }
        name
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        self.partials
            .iter()
            .map(|partial| partial as &dyn QueryAstNode)
            .chain(self.sort.iter().map(|sort| sort as &dyn QueryAstNode))
            .collect()
    }
}

impl QueryAstNode for ConnectionPartial {
    fn name(&self) -> String {
        "ConnectionPartial".to_string()
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        filter_children(&self.selection, &self.filters, &self.authorization)
            .chain(self.edges.iter().map(|field| field as &dyn QueryAstNode))
            .collect()
    }
}

impl QueryAstNode for CompositeConnectionOperation {
    fn name(&self) -> String {
        let mut name = "CompositeConnectionOperation".to_string();
        if !self.pagination.is_empty() {
            name.push_str(&format!(" {:?}", self.pagination));
        }
        name
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        self.partials
            .iter()
            .map(|partial| partial as &dyn QueryAstNode)
            .chain(self.fields.iter().map(|field| field as &dyn QueryAstNode))
            .chain(self.sort.iter().map(|sort| sort as &dyn QueryAstNode))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::ast::fields::{Field, PageInfoField};
    use crate::translation::ast::filters::FilterTarget;
    use crate::translation::ast::selection::NodeSelection;
    use crate::translation::helpers::{AttributeRef, EntityRef};
    use query_engine_cypher::cypher::string::Cypher;

    fn render(clauses: Vec<cypher::Clause>) -> String {
        let mut cypher = Cypher::new();
        cypher::Statement { clauses }.to_cypher(&mut cypher);
        cypher.cypher
    }

    fn entity(name: &str) -> EntityRef {
        EntityRef {
            name: name.into(),
            labels: vec![name.into()],
        }
    }

    fn title() -> Field {
        Field::Attribute {
            output_key: "title".into(),
            attribute: AttributeRef {
                field_name: "title".into(),
                db_name: "title".into(),
                r#type: metadata::ScalarType::String,
                list: false,
            },
        }
    }

    fn partial(name: &str) -> ReadOperation {
        ReadOperation {
            selection: Selection::Node(NodeSelection::new(entity(name))),
            filters: vec![],
            authorization: vec![],
            fields: vec![
                title(),
                Field::Typename {
                    output_key: "__typename".into(),
                    type_name: name.into(),
                },
            ],
            sort: vec![],
            pagination: Pagination::default(),
            cardinality: metadata::Cardinality::Many,
        }
    }

    fn sort_on(name: &str, target: FilterTarget, direction: cypher::OrderByDirection) -> SortField {
        SortField {
            target,
            attribute: AttributeRef {
                field_name: name.into(),
                db_name: name.into(),
                r#type: metadata::ScalarType::Int,
                list: false,
            },
            direction,
        }
    }

    #[test]
    fn root_union_sorts_on_columns_beside_the_projection() {
        let mut state = State::new();
        let operation = CompositeReadOperation {
            partials: vec![partial("Movie"), partial("Series")],
            sort: vec![sort_on("year", FilterTarget::Node, cypher::OrderByDirection::Desc)],
            pagination: Pagination::default(),
            cardinality: metadata::Cardinality::Many,
        };
        let output = operation.apply(&TraversalContext::root(), &mut state).expect("apply");
        assert_eq!(
            render(output.clauses),
            [
                "CALL {",
                "    MATCH (this2:Movie)",
                "    RETURN this2 { .title, __typename: \"Movie\" } AS var0, this2.year AS var1",
                "    UNION ALL",
                "    MATCH (this3:Series)",
                "    RETURN this3 { .title, __typename: \"Series\" } AS var0, this3.year AS var1",
                "}",
                "WITH *",
                "ORDER BY var1 DESC",
                "RETURN var0 AS this",
            ]
            .join("\n")
        );
    }

    #[test]
    fn no_implementations_return_no_rows() {
        let mut state = State::new();
        let operation = CompositeReadOperation {
            partials: vec![],
            sort: vec![],
            pagination: Pagination::default(),
            cardinality: metadata::Cardinality::Many,
        };
        let output = operation.apply(&TraversalContext::root(), &mut state).expect("apply");
        assert_eq!(render(output.clauses), "UNWIND [] AS var0\nRETURN var0 AS this");
    }

    #[test]
    fn composite_connection_counts_every_branch() {
        let mut state = State::new();
        let connection_partial = |name: &str| ConnectionPartial {
            selection: Selection::Node(NodeSelection::new(entity(name))),
            filters: vec![],
            authorization: vec![],
            edges: vec![EdgeField::Node {
                output_key: "node".into(),
                fields: vec![title()],
            }],
        };
        let operation = CompositeConnectionOperation {
            partials: vec![connection_partial("Movie"), connection_partial("Series")],
            fields: vec![
                ConnectionField::TotalCount {
                    output_key: "totalCount".into(),
                },
                ConnectionField::PageInfo {
                    output_key: "pageInfo".into(),
                    fields: vec![PageInfoField::HasPreviousPage {
                        output_key: "hasPreviousPage".into(),
                    }],
                },
            ],
            sort: vec![],
            pagination: Pagination::default(),
        };
        let output = operation.apply(&TraversalContext::root(), &mut state).expect("apply");
        assert_eq!(
            render(output.clauses),
            [
                "CALL {",
                "    MATCH (this1:Movie)",
                "    RETURN { node: this1 { .title } } AS edge0",
                "    UNION ALL",
                "    MATCH (this2:Series)",
                "    RETURN { node: this2 { .title } } AS edge0",
                "}",
                "WITH collect(edge0) AS edges3",
                "WITH edges3, size(edges3) AS totalCount4",
                "RETURN { totalCount: totalCount4, pageInfo: { hasPreviousPage: false } } AS this",
            ]
            .join("\n")
        );
    }

    #[test]
    fn composite_connection_sorts_rows_before_collecting_edges() {
        let mut state = State::new();
        let connection_partial = |name: &str| ConnectionPartial {
            selection: Selection::Node(NodeSelection::new(entity(name))),
            filters: vec![],
            authorization: vec![],
            edges: vec![EdgeField::Node {
                output_key: "node".into(),
                fields: vec![title()],
            }],
        };
        let operation = CompositeConnectionOperation {
            partials: vec![connection_partial("Movie"), connection_partial("Series")],
            fields: vec![ConnectionField::TotalCount {
                output_key: "totalCount".into(),
            }],
            sort: vec![sort_on("year", FilterTarget::Node, cypher::OrderByDirection::Asc)],
            pagination: Pagination::default(),
        };
        let output = operation.apply(&TraversalContext::root(), &mut state).expect("apply");
        assert_eq!(
            render(output.clauses),
            [
                "CALL {",
                "    MATCH (this2:Movie)",
                "    RETURN { node: this2 { .title } } AS edge0, this2.year AS var1",
                "    UNION ALL",
                "    MATCH (this3:Series)",
                "    RETURN { node: this3 { .title } } AS edge0, this3.year AS var1",
                "}",
                "WITH *",
                "ORDER BY var1 ASC",
                "WITH collect(edge0) AS edges4",
                "WITH edges4, size(edges4) AS totalCount5",
                "RETURN { totalCount: totalCount5 } AS this",
            ]
            .join("\n")
        );
    }
}
