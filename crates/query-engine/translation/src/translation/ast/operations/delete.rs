use smol_str::SmolStr;

use super::{filter_children, result_variable, select_rows, OperationOutput};
use crate::translation::ast::filters::Filter;
use crate::translation::ast::selection::Selection;
use crate::translation::ast::tree::QueryAstNode;
use crate::translation::context::TraversalContext;
use crate::translation::error::Error;
use crate::translation::helpers::State;
use query_engine_cypher::cypher::{ast as cypher, helpers};

/// Delete the matching nodes together with their relationships.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOperation {
    pub selection: Selection,
    pub filters: Vec<Filter>,
    pub authorization: Vec<Filter>,
    pub fields: Vec<DeleteField>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteField {
    NodesDeleted {
        output_key: SmolStr,
    },
    Typename {
        output_key: SmolStr,
        type_name: SmolStr,
    },
}

impl DeleteOperation {
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
        clauses.push(cypher::Clause::DetachDelete(vec![nested.target()?.clone()]));

        let info = self
            .fields
            .iter()
            .map(|field| match field {
                DeleteField::NodesDeleted { output_key } => {
                    (output_key.clone(), cypher::Expression::CountStar)
                }
                DeleteField::Typename {
                    output_key,
                    type_name,
                } => (output_key.clone(), helpers::string_expr(type_name)),
            })
            .collect();
        let variable = result_variable(context, state);
        clauses.push(helpers::return_as(cypher::Expression::Map(info), &variable));
        Ok(OperationOutput { clauses, variable })
    }
}

impl QueryAstNode for DeleteOperation {
    fn name(&self) -> String {
        "DeleteOperation".to_string()
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        filter_children(&self.selection, &self.filters, &self.authorization).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::ast::filters::{
        AuthorizationFilter, AuthorizationMode, AuthorizationRuleFilter, FilterTarget,
        FilterValue, PropertyFilter,
    };
    use crate::translation::ast::selection::NodeSelection;
    use crate::translation::helpers::{AttributeRef, EntityRef};
    use crate::translation::where_input::ComparisonOperator;
    use query_engine_cypher::cypher::string::Cypher;
    use query_engine_metadata::metadata;

    #[test]
    fn guards_run_before_the_delete() {
        let mut state = State::new();
        let owner = AttributeRef {
            field_name: "owner".into(),
            db_name: "owner".into(),
            r#type: metadata::ScalarType::String,
            list: false,
        };
        let operation = DeleteOperation {
            selection: Selection::Node(NodeSelection::new(EntityRef {
                name: "Post".into(),
                labels: vec!["Post".into()],
            })),
            filters: vec![],
            authorization: vec![Filter::Authorization(AuthorizationFilter {
                mode: AuthorizationMode::Validation,
                rules: vec![AuthorizationRuleFilter {
                    authentication: None,
                    filters: vec![Filter::Property(PropertyFilter {
                        attribute: owner,
                        target: FilterTarget::Node,
                        operator: ComparisonOperator::Equal,
                        value: FilterValue::Literal(serde_json::json!("alice")),
                    })],
                }],
            })],
            fields: vec![DeleteField::NodesDeleted {
                output_key: "nodesDeleted".into(),
            }],
        };
        let output = operation
            .apply(&TraversalContext::root(), &mut state)
            .expect("apply");
        let mut cypher = Cypher::new();
        cypher::Statement {
            clauses: output.clauses,
        }
        .to_cypher(&mut cypher);
        let guard = format!(
            "CALL apoc.util.validate(NOT (this0.owner = $param0), \"{}\", [0])",
            helpers::FORBIDDEN_SIGNAL
        );
        assert_eq!(
            cypher.cypher,
            [
                "MATCH (this0:Post)",
                guard.as_str(),
                "DETACH DELETE this0",
                "RETURN { nodesDeleted: count(*) } AS this",
            ]
            .join("\n")
        );
    }
}
