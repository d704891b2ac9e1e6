//! Selections bind the nodes (and relationships) an operation ranges over.

use smol_str::SmolStr;

use super::tree::QueryAstNode;
use crate::translation::context::{TraversalContext, TraversalStep};
use crate::translation::error::Error;
use crate::translation::helpers::{EntityRef, RelationshipRef, State};
use query_engine_cypher::cypher::{ast as cypher, helpers};
use query_engine_metadata::metadata;

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Node(NodeSelection),
    Relationship(RelationshipSelection),
}

/// Match nodes by label, or through a fulltext index.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSelection {
    pub entity: EntityRef,
    pub fulltext: Option<FulltextSearch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FulltextSearch {
    pub index_name: SmolStr,
    pub phrase: String,
}

/// Hop from the bound node over a relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipSelection {
    pub relationship: RelationshipRef,
    pub alias: Option<SmolStr>,
    /// Labels of the declared target.
    pub target: TargetLabels,
    /// A concrete type replacing an abstract target, when a composite operation
    /// narrows the hop to one of its partials.
    pub target_override: Option<EntityRef>,
    pub optional: bool,
}

/// The labels a related node must carry.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetLabels {
    Labels(Vec<SmolStr>),
    /// An abstract target: any one of the label sets.
    AnyOf(Vec<Vec<SmolStr>>),
}

/// The result of applying a selection.
#[derive(Debug)]
pub struct SelectionOutput {
    pub context: TraversalContext,
    pub clause: cypher::Clause,
    /// A condition the bound node has to meet in addition to the pattern.
    pub predicate: Option<cypher::Expression>,
}

impl Selection {
    pub fn apply(
        &self,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<SelectionOutput, Error> {
        match self {
            Selection::Node(selection) => selection.apply(context, state),
            Selection::Relationship(selection) => selection.apply(context, state),
        }
    }

    /// Concrete labels of the selected nodes, if the selection has them.
    pub fn labels(&self) -> Option<&[SmolStr]> {
        match self {
            Selection::Node(selection) => Some(&selection.entity.labels),
            Selection::Relationship(selection) => match (&selection.target_override, &selection.target) {
                (Some(entity), _) => Some(&entity.labels),
                (None, TargetLabels::Labels(labels)) => Some(labels),
                (None, TargetLabels::AnyOf(_)) => None,
            },
        }
    }
}

impl NodeSelection {
    pub fn new(entity: EntityRef) -> NodeSelection {
        NodeSelection {
            entity,
            fulltext: None,
        }
    }

    pub fn apply(
        &self,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<SelectionOutput, Error> {
        let node = state.make_node_variable();
        let nested = context.push(TraversalStep::Node(node.clone()))?;
        let (clause, predicate) = match &self.fulltext {
            None => (
                helpers::match_clause(
                    helpers::single_node_pattern(&node, &self.entity.labels),
                    None,
                ),
                None,
            ),
            Some(search) => (
                cypher::Clause::CallProcedure(cypher::ProcedureCall {
                    procedure: "db.index.fulltext.queryNodes".into(),
                    arguments: vec![
                        helpers::string_expr(&search.index_name),
                        helpers::param_expr(serde_json::Value::String(search.phrase.clone())),
                    ],
                    yields: vec![cypher::YieldItem {
                        field: "node".into(),
                        alias: Some(node.clone()),
                    }],
                    where_: None,
                }),
                Some(helpers::has_labels_expr(&node, &self.entity.labels)),
            ),
        };
        Ok(SelectionOutput {
            context: nested,
            clause,
            predicate,
        })
    }
}

impl RelationshipSelection {
    pub fn apply(
        &self,
        context: &TraversalContext,
        state: &mut State,
    ) -> Result<SelectionOutput, Error> {
        let source = context.target()?.clone();
        let relationship = state.make_relationship_variable();
        let target = state.make_node_variable();
        let nested = context.push(TraversalStep::Relationship {
            relationship: relationship.clone(),
            target: target.clone(),
        })?;

        let (labels, predicate) = match (&self.target_override, &self.target) {
            (Some(entity), _) => (entity.labels.clone(), None),
            (None, TargetLabels::Labels(labels)) => (labels.clone(), None),
            (None, TargetLabels::AnyOf(label_sets)) => (
                vec![],
                Some(
                    helpers::or_any(
                        label_sets
                            .iter()
                            .map(|labels| helpers::has_labels_expr(&target, labels)),
                    )
                    .unwrap_or_else(helpers::false_expr),
                ),
            ),
        };

        let pattern = cypher::Pattern {
            start: helpers::node_pattern(Some(&source), &[]),
            chain: vec![(
                cypher::RelationshipPattern {
                    variable: Some(relationship),
                    types: vec![self.relationship.r#type.clone()],
                    direction: match self.relationship.direction {
                        metadata::Direction::Out => cypher::PatternDirection::Outgoing,
                        metadata::Direction::In => cypher::PatternDirection::Incoming,
                    },
                },
                helpers::node_pattern(Some(&target), &labels),
            )],
        };

        Ok(SelectionOutput {
            context: nested,
            clause: cypher::Clause::Match(cypher::Match {
                optional: self.optional,
                pattern,
                where_: None,
            }),
            predicate,
        })
    }

    /// The same hop, narrowed to one concrete target.
    pub fn narrowed(&self, entity: EntityRef) -> RelationshipSelection {
        RelationshipSelection {
            target_override: Some(entity),
            ..self.clone()
        }
    }
}

impl QueryAstNode for Selection {
    fn name(&self) -> String {
        match self {
            Selection::Node(selection) => match &selection.fulltext {
                None => format!("NodeSelection {}", selection.entity.name),
                Some(search) => format!(
                    "NodeSelection {} (fulltext {})",
                    selection.entity.name, search.index_name
                ),
            },
            Selection::Relationship(selection) => selection.name(),
        }
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        vec![]
    }
}

impl QueryAstNode for RelationshipSelection {
    fn name(&self) -> String {
        let mut name = format!("RelationshipSelection {}", self.relationship.field_name);
        if let Some(alias) = &self.alias {
            name.push_str(" as ");
            name.push_str(alias);
        }
        if let Some(entity) = &self.target_override {
            name.push_str(" -> ");
            name.push_str(entity.name.as_str());
        }
        name
    }

    fn children(&self) -> Vec<&dyn QueryAstNode> {
        vec![]
    }
}
