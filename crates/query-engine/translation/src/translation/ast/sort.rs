//! Sorting and pagination.

use super::filters::FilterTarget;
use super::tree::QueryAstNode;
use crate::translation::context::TraversalContext;
use crate::translation::error::Error;
use crate::translation::helpers::AttributeRef;
use query_engine_cypher::cypher::{ast as cypher, helpers};

/// Sort on a stored property of the bound node or relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub target: FilterTarget,
    pub attribute: AttributeRef,
    pub direction: cypher::OrderByDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub skip: Option<u64>,
    pub limit: Option<u32>,
}

impl Pagination {
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.limit.is_none()
    }

    /// The index of the first returned element.
    pub fn offset(&self) -> u64 {
        self.skip.unwrap_or(0)
    }
}

impl SortField {
    /// The sorted property of the node or relationship bound in `context`.
    pub fn value(&self, context: &TraversalContext) -> Result<cypher::Expression, Error> {
        let variable = match self.target {
            FilterTarget::Node => context.target()?,
            FilterTarget::Relationship => context.relationship()?,
        };
        Ok(helpers::property_expr(variable, &self.attribute.db_name))
    }

    pub fn order_by(&self, context: &TraversalContext) -> Result<cypher::OrderByElement, Error> {
        Ok(cypher::OrderByElement {
            target: self.value(context)?,
            direction: self.direction,
        })
    }

    /// Sort on a column a union returned the value under.
    pub fn order_by_column(&self, column: &cypher::Variable) -> cypher::OrderByElement {
        cypher::OrderByElement {
            target: helpers::variable_expr(column),
            direction: self.direction,
        }
    }
}

/// `WITH * ORDER BY .. SKIP .. LIMIT ..`, or nothing when there is nothing to do.
pub fn sort_and_paginate(
    order_by: Vec<cypher::OrderByElement>,
    pagination: Pagination,
) -> Option<cypher::Clause> {
    if order_by.is_empty() && pagination.is_empty() {
        return None;
    }
    Some(cypher::Clause::With(cypher::With {
        order_by,
        skip: pagination
            .skip
            .map(|skip| helpers::param_expr(serde_json::Value::from(skip))),
        limit: pagination
            .limit
            .map(|limit| helpers::param_expr(serde_json::Value::from(limit))),
        ..helpers::simple_with(helpers::star_projection())
    }))
}

impl QueryAstNode for SortField {
    fn name(&self) -> String {
        format!(
            "Sort {:?} {} {:?}",
            self.target, self.attribute.field_name, self.direction
        )
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_engine_cypher::cypher::string::Cypher;

    #[test]
    fn nothing_to_sort_or_paginate() {
        assert_eq!(sort_and_paginate(vec![], Pagination::default()), None);
    }

    #[test]
    fn union_columns_sort_and_paginate() {
        let sort = SortField {
            target: FilterTarget::Node,
            attribute: AttributeRef {
                field_name: "title".into(),
                db_name: "title".into(),
                r#type: query_engine_metadata::metadata::ScalarType::String,
                list: false,
            },
            direction: cypher::OrderByDirection::Desc,
        };
        let clause = sort_and_paginate(
            vec![sort.order_by_column(&helpers::fixed_variable("var1"))],
            Pagination {
                skip: Some(2),
                limit: Some(10),
            },
        )
        .expect("clause");
        let mut cypher = Cypher::new();
        clause.to_cypher(&mut cypher);
        assert_eq!(
            cypher.cypher,
            "WITH *\nORDER BY var1 DESC\nSKIP $param0\nLIMIT $param1"
        );
    }
}
