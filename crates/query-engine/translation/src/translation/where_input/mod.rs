//! The `where` argument, parsed once into a recursive expression.
//!
//! Both the flat, suffix-based input shape (`title_CONTAINS`, `likes_SOME`,
//! `likesAggregate: { count_GT }`) and the nested shape (`title: { contains }`,
//! `likes: { some }`, `likesConnection: { aggregate: { count: { gt } } }`) normalize to
//! the same [`WhereExpr`]. Everything downstream only ever sees this type.

mod aggregate;
mod parse;

use query_engine_models::{FieldName, TypeName};
use serde_json::Value;
use smol_str::SmolStr;

pub use parse::{parse_authorization_where, parse_connection_where, parse_where, WhereParser};

/// A boolean condition over the current scope.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereExpr {
    And(Vec<WhereExpr>),
    Or(Vec<WhereExpr>),
    Not(Box<WhereExpr>),
    Attribute(AttributePredicate),
    /// The node is one of these concrete types.
    Typename(Vec<TypeName>),
    /// Per-member conditions of a union; the node must match one of them.
    Members(Vec<(TypeName, WhereExpr)>),
    Relationship(RelationshipPredicate),
    Connection(RelationshipPredicate),
    Aggregate(AggregatePredicate),
    /// Switch the scope to the node of a connection edge.
    Node(Box<WhereExpr>),
    /// Switch the scope to the relationship of a connection edge.
    Edge(Box<WhereExpr>),
    /// A condition on a claim of the request's token.
    Jwt(JwtPredicate),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributePredicate {
    pub field: FieldName,
    pub operator: ComparisonOperator,
    pub value: PredicateValue,
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateValue {
    Literal(Value),
    /// A `"$jwt.<path>"` reference, only allowed in authorization rules.
    Jwt(JwtClaim),
}

/// A path into the token claims.
#[derive(Debug, Clone, PartialEq)]
pub struct JwtClaim(pub Vec<SmolStr>);

#[derive(Debug, Clone, PartialEq)]
pub struct JwtPredicate {
    pub claim: JwtClaim,
    pub operator: ComparisonOperator,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    In,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    Includes,
}

/// How many related elements have to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    All,
    None,
    Single,
}

/// A quantified condition over a relationship. For connections the predicate is
/// built from [`WhereExpr::Node`] and [`WhereExpr::Edge`] scopes.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPredicate {
    pub field: FieldName,
    pub quantifier: Quantifier,
    pub predicate: Option<Box<WhereExpr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatePredicate {
    pub field: FieldName,
    pub condition: AggregateExpr,
}

/// A condition over aggregated values of a relationship.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateExpr {
    And(Vec<AggregateExpr>),
    Or(Vec<AggregateExpr>),
    Not(Box<AggregateExpr>),
    Count {
        target: AggregateTarget,
        operator: AggregateOperator,
        value: Value,
    },
    Attribute {
        target: AggregateTarget,
        field: FieldName,
        function: AggregationFunction,
        operator: AggregateOperator,
        value: Value,
    },
}

/// Whether an aggregate ranges over the distinct related nodes or over the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateTarget {
    Node,
    Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOperator {
    Equal,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

/// Aggregation functions. Over strings they apply to the string length, so
/// `shortestLength`, `longestLength` and `averageLength` are `Min`, `Max` and
/// `Average`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationFunction {
    Average,
    Min,
    Max,
    Sum,
}

impl WhereExpr {
    /// Combine the conditions of one input object. A single condition stays as is so
    /// that equivalent inputs yield equal expressions.
    pub fn all(mut exprs: Vec<WhereExpr>) -> WhereExpr {
        if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            WhereExpr::And(exprs)
        }
    }

    /// The types a conjunctive `typename` condition at the top of this expression
    /// restricts to, if any.
    pub fn narrowed_types(&self) -> Option<Vec<&TypeName>> {
        match self {
            WhereExpr::Typename(types) => Some(types.iter().collect()),
            WhereExpr::Members(members) => Some(members.iter().map(|(name, _)| name).collect()),
            WhereExpr::And(exprs) => exprs.iter().filter_map(WhereExpr::narrowed_types).reduce(
                |left, right| left.into_iter().filter(|t| right.contains(t)).collect(),
            ),
            _ => None,
        }
    }
}

impl AggregateExpr {
    pub fn all(mut exprs: Vec<AggregateExpr>) -> AggregateExpr {
        if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            AggregateExpr::And(exprs)
        }
    }
}

impl ComparisonOperator {
    /// Keys of the nested operator shape, `title: { contains: "x" }`.
    pub fn from_key(key: &str) -> Option<ComparisonOperator> {
        Some(match key {
            "eq" => ComparisonOperator::Equal,
            "in" => ComparisonOperator::In,
            "lt" => ComparisonOperator::LessThan,
            "lte" => ComparisonOperator::LessThanOrEqual,
            "gt" => ComparisonOperator::GreaterThan,
            "gte" => ComparisonOperator::GreaterThanOrEqual,
            "contains" => ComparisonOperator::Contains,
            "startsWith" => ComparisonOperator::StartsWith,
            "endsWith" => ComparisonOperator::EndsWith,
            "matches" => ComparisonOperator::Matches,
            "includes" => ComparisonOperator::Includes,
            _ => return None,
        })
    }
}

impl AggregateOperator {
    pub fn from_key(key: &str) -> Option<AggregateOperator> {
        Some(match key {
            "eq" => AggregateOperator::Equal,
            "gt" => AggregateOperator::GreaterThan,
            "gte" => AggregateOperator::GreaterThanOrEqual,
            "lt" => AggregateOperator::LessThan,
            "lte" => AggregateOperator::LessThanOrEqual,
            _ => return None,
        })
    }
}

impl Quantifier {
    pub fn from_key(key: &str) -> Option<Quantifier> {
        Some(match key {
            "some" => Quantifier::Some,
            "all" => Quantifier::All,
            "none" => Quantifier::None,
            "single" => Quantifier::Single,
            _ => return None,
        })
    }
}

/// Where in the request a filter sits, for error messages.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPath(Vec<SmolStr>);

impl FilterPath {
    pub fn new(root: &str) -> FilterPath {
        FilterPath(vec![root.into()])
    }

    pub fn key(&self, key: &str) -> FilterPath {
        let mut path = self.0.clone();
        path.push(key.into());
        FilterPath(path)
    }

    pub fn index(&self, index: usize) -> FilterPath {
        let mut path = self.0.clone();
        if let Some(last) = path.last_mut() {
            *last = format!("{last}[{index}]").into();
        }
        FilterPath(path)
    }

    pub fn error(&self, message: impl Into<String>) -> super::error::Error {
        super::error::Error::InvalidFilter {
            path: self.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FilterPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
