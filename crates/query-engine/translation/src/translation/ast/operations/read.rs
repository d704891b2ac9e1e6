use super::{collect_value, filter_children, result_variable, select_rows, OperationOutput};
use crate::translation::ast::fields::{self, Field};
use crate::translation::ast::filters::Filter;
use crate::translation::ast::selection::Selection;
use crate::translation::ast::sort::{sort_and_paginate, Pagination, SortField};
use crate::translation::ast::tree::QueryAstNode;
use crate::translation::context::TraversalContext;
use crate::translation::error::Error;
use crate::translation::helpers::State;
use query_engine_cypher::cypher::{ast as cypher, helpers};
use query_engine_metadata::metadata;

/// Read the nodes of one concrete type and project their fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOperation {
    pub selection: Selection,
    pub filters: Vec<Filter>,
    /// Filters and guards coming from authorization rules.
    pub authorization: Vec<Filter>,
    pub fields: Vec<Field>,
    pub sort: Vec<SortField>,
    pub pagination: Pagination,
    /// How a nested read returns its rows: a list, or the single first row.
    pub cardinality: metadata::Cardinality,
}

impl ReadOperation {
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

        let order_by = self
            .sort
            .iter()
            .map(|sort| sort.order_by(&nested))
            .collect::<Result<Vec<_>, _>>()?;
        clauses.extend(sort_and_paginate(order_by, self.pagination));

        let projection = fields::project(&node, &self.fields, &nested, state, &mut clauses)?;
        let variable = result_variable(context, state);
        let value = if context.is_root() {
            projection
        } else {
            collect_value(projection, self.cardinality)
        };
        clauses.push(helpers::return_as(value, &variable));
        Ok(OperationOutput { clauses, variable })
    }

    /// One branch of a union: every matching row, projected as `alias`, with the
    /// value of each sort key returned under its column. Sorting and pagination are
    /// left to the composite operation.
    pub fn apply_branch(
        &self,
        context: &TraversalContext,
        state: &mut State,
        alias: &cypher::Variable,
        sort_columns: &[(SortField, cypher::Variable)],
    ) -> Result<Vec<cypher::Clause>, Error> {
        let (nested, mut clauses) = select_rows(
            &self.selection,
            &self.filters,
            &self.authorization,
            context,
            state,
        )?;
        let node = nested.target()?.clone();
        let projection = fields::project(&node, &self.fields, &nested, state, &mut clauses)?;
        let mut items = vec![(projection, Some(alias.clone()))];
        for (sort, column) in sort_columns {
            items.push((sort.value(&nested)?, Some(column.clone())));
        }
        clauses.push(cypher::Clause::Return(helpers::simple_return(helpers::projection(items))));
        Ok(clauses)
    }
}

impl QueryAstNode for ReadOperation {
    fn name(&self) -> String {
        let mut name = "ReadOperation".to_string();
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
