//! Type definitions of a Cypher AST representation.

use smol_str::SmolStr;

/// A complete statement: a sequence of clauses run top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub clauses: Vec<Clause>,
}

/// A single clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match(Match),
    With(With),
    Unwind {
        expression: Expression,
        alias: Variable,
    },
    /// `CALL { ... }`, optionally unioning several branches.
    Call(Subquery),
    /// `CALL some.procedure(...) YIELD ...`
    CallProcedure(ProcedureCall),
    DetachDelete(Vec<Variable>),
    Return(Return),
}

/// `[OPTIONAL] MATCH <pattern> [WHERE <predicate>]`
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub optional: bool,
    pub pattern: Pattern,
    pub where_: Option<Expression>,
}

/// `WITH [DISTINCT] <projection> [ORDER BY ..] [SKIP ..] [LIMIT ..] [WHERE ..]`
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub distinct: bool,
    pub projection: Projection,
    pub order_by: Vec<OrderByElement>,
    pub skip: Option<Expression>,
    pub limit: Option<Expression>,
    pub where_: Option<Expression>,
}

/// `RETURN [DISTINCT] <projection> [ORDER BY ..] [SKIP ..] [LIMIT ..]`
#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub distinct: bool,
    pub projection: Projection,
    pub order_by: Vec<OrderByElement>,
    pub skip: Option<Expression>,
    pub limit: Option<Expression>,
}

/// The items of a `WITH` or `RETURN`. `star` renders as a leading `*`.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub star: bool,
    pub items: Vec<ProjectionItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub expression: Expression,
    pub alias: Option<Variable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement {
    pub target: Expression,
    pub direction: OrderByDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

/// A `CALL { }` subquery. Every branch imports `imports` on its own, and branches are
/// joined with `UNION ALL`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub imports: Vec<Variable>,
    pub branches: Vec<Vec<Clause>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub procedure: SmolStr,
    pub arguments: Vec<Expression>,
    pub yields: Vec<YieldItem>,
    pub where_: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YieldItem {
    pub field: SmolStr,
    pub alias: Option<Variable>,
}

/// A path pattern: a start node followed by relationship hops.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub start: NodePattern,
    pub chain: Vec<(RelationshipPattern, NodePattern)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub variable: Option<Variable>,
    pub labels: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPattern {
    pub variable: Option<Variable>,
    pub types: Vec<SmolStr>,
    pub direction: PatternDirection,
}

/// Direction of a hop, read left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternDirection {
    Outgoing,
    Incoming,
    Undirected,
}

/// A bound variable. Generated variables carry a unique index which is appended
/// to the name when printed (`this0`, `edge3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub name: SmolStr,
    pub unique_index: Option<u64>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Variable(Variable),
    Property {
        expression: Box<Expression>,
        property: SmolStr,
    },
    Parameter(Param),
    Value(Value),
    Not(Box<Expression>),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    BinaryOperation {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    IsNull(Box<Expression>),
    IsNotNull(Box<Expression>),
    HasLabels {
        expression: Box<Expression>,
        labels: Vec<SmolStr>,
    },
    FunctionCall {
        function: Function,
        arguments: Vec<Expression>,
        distinct: bool,
    },
    CountStar,
    /// `EXISTS { ... }`
    Exists(Vec<Clause>),
    /// `COUNT { ... }`
    Count(Vec<Clause>),
    /// `this0 { .title, likes: var2 }`
    MapProjection {
        variable: Variable,
        entries: Vec<MapProjectionEntry>,
    },
    Map(Vec<(SmolStr, Expression)>),
    List(Vec<Expression>),
    /// `[x IN list WHERE predicate | projection]`
    ListComprehension {
        variable: Variable,
        list: Box<Expression>,
        where_: Option<Box<Expression>>,
        projection: Option<Box<Expression>>,
    },
    Index {
        expression: Box<Expression>,
        index: Box<Expression>,
    },
    Case {
        branches: Vec<(Expression, Expression)>,
        else_: Option<Box<Expression>>,
    },
}

/// An entry of a map projection.
#[derive(Debug, Clone, PartialEq)]
pub enum MapProjectionEntry {
    /// A stored property, projected under `key`.
    Property { key: SmolStr, property: SmolStr },
    Expression { key: SmolStr, expression: Expression },
}

/// A query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// An anonymous value, numbered when printed.
    Value(serde_json::Value),
    /// A named, request-wide parameter such as `$jwt`. Printed once in the table.
    Named {
        name: SmolStr,
        value: serde_json::Value,
    },
}

/// An inline literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    String(SmolStr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    Contains,
    StartsWith,
    EndsWith,
    RegexMatch,
    Add,
    Subtract,
}

/// Functions we call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Avg,
    Coalesce,
    Collect,
    Count,
    Date,
    Datetime,
    Head,
    Max,
    Min,
    Range,
    Size,
    Sum,
    ToString,
    /// A namespaced function such as `apoc.text.base64Encode`.
    Custom(SmolStr),
}
