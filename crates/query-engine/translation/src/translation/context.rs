//! The traversal context: which variables are bound at the current position of the
//! selection tree.

use query_engine_cypher::cypher::ast::Variable;

use super::error::Error;

/// An immutable binding of the current node (and, after a relationship hop, the
/// relationship) to the position in the selection tree. Every step returns a new
/// context; the one it was derived from stays valid for sibling branches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TraversalContext {
    target: Option<Variable>,
    relationship: Option<Variable>,
    source: Option<Variable>,
}

/// A step into a new scope.
#[derive(Debug, Clone, PartialEq)]
pub enum TraversalStep {
    /// Bind a node on its own.
    Node(Variable),
    /// Hop from the current node over a relationship to a target node.
    Relationship {
        relationship: Variable,
        target: Variable,
    },
}

impl TraversalContext {
    /// The context of a top-level operation: nothing is bound yet.
    pub fn root() -> TraversalContext {
        TraversalContext::default()
    }

    pub fn push(&self, step: TraversalStep) -> Result<TraversalContext, Error> {
        match step {
            TraversalStep::Node(target) => Ok(TraversalContext {
                target: Some(target),
                relationship: None,
                source: self.target.clone(),
            }),
            TraversalStep::Relationship {
                relationship,
                target,
            } => {
                let source = self.target.clone().ok_or_else(|| {
                    Error::UnboundTraversal(format!(
                        "relationship {relationship} traversed outside of a node selection"
                    ))
                })?;
                Ok(TraversalContext {
                    target: Some(target),
                    relationship: Some(relationship),
                    source: Some(source),
                })
            }
        }
    }

    /// The bound node.
    pub fn target(&self) -> Result<&Variable, Error> {
        self.target
            .as_ref()
            .ok_or_else(|| Error::UnboundTraversal("no node is bound".to_string()))
    }

    /// The relationship traversed to reach the bound node.
    pub fn relationship(&self) -> Result<&Variable, Error> {
        self.relationship.as_ref().ok_or_else(|| {
            Error::UnboundTraversal("no relationship is bound".to_string())
        })
    }

    pub fn source(&self) -> Option<&Variable> {
        self.source.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.target.is_none()
    }

    /// The variables a nested subquery has to import.
    pub fn imports(&self) -> Vec<Variable> {
        self.target.iter().cloned().collect()
    }
}
