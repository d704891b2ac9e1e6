//! Helpers for building cypher::ast types in certain shapes and patterns.

use smol_str::SmolStr;

use super::ast::*;

/// The message carried by the error raised when a validation guard fails. The
/// executor recognises it and reports a forbidden error.
pub const FORBIDDEN_SIGNAL: &str = "@cypher-compiler/FORBIDDEN";

/// The column every statement returns its result in.
pub const RESULT_COLUMN: &str = "this";

// Expressions //

/// A `true` expression.
pub fn true_expr() -> Expression {
    Expression::Value(Value::Bool(true))
}

/// A `false` expression.
pub fn false_expr() -> Expression {
    Expression::Value(Value::Bool(false))
}

pub fn string_expr(value: &str) -> Expression {
    Expression::Value(Value::String(value.into()))
}

pub fn int_expr(value: i64) -> Expression {
    Expression::Value(Value::Int(value))
}

/// A parameter holding the given value.
pub fn param_expr(value: serde_json::Value) -> Expression {
    Expression::Parameter(Param::Value(value))
}

pub fn variable_expr(variable: &Variable) -> Expression {
    Expression::Variable(variable.clone())
}

/// `<variable>.<property>`
pub fn property_expr(variable: &Variable, property: &str) -> Expression {
    Expression::Property {
        expression: Box::new(variable_expr(variable)),
        property: property.into(),
    }
}

pub fn binary_expr(left: Expression, operator: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOperation {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

pub fn not_expr(expression: Expression) -> Expression {
    Expression::Not(Box::new(expression))
}

pub fn function_expr(function: Function, arguments: Vec<Expression>) -> Expression {
    Expression::FunctionCall {
        function,
        arguments,
        distinct: false,
    }
}

pub fn has_labels_expr(variable: &Variable, labels: &[SmolStr]) -> Expression {
    Expression::HasLabels {
        expression: Box::new(variable_expr(variable)),
        labels: labels.to_vec(),
    }
}

/// AND-combine predicates. Nested conjunctions are flattened; `None` means no
/// constraint at all.
pub fn and_all(expressions: impl IntoIterator<Item = Expression>) -> Option<Expression> {
    let mut operands = vec![];
    for expression in expressions {
        match expression {
            Expression::And(inner) => operands.extend(inner),
            other => operands.push(other),
        }
    }
    match operands.len() {
        0 => None,
        1 => operands.pop(),
        _ => Some(Expression::And(operands)),
    }
}

/// OR-combine predicates. `None` when there is nothing to combine.
pub fn or_any(expressions: impl IntoIterator<Item = Expression>) -> Option<Expression> {
    let mut operands = vec![];
    for expression in expressions {
        match expression {
            Expression::Or(inner) => operands.extend(inner),
            other => operands.push(other),
        }
    }
    match operands.len() {
        0 => None,
        1 => operands.pop(),
        _ => Some(Expression::Or(operands)),
    }
}

// Patterns //

pub fn node_pattern(variable: Option<&Variable>, labels: &[SmolStr]) -> NodePattern {
    NodePattern {
        variable: variable.cloned(),
        labels: labels.to_vec(),
    }
}

/// A pattern consisting of a single node.
pub fn single_node_pattern(variable: &Variable, labels: &[SmolStr]) -> Pattern {
    Pattern {
        start: node_pattern(Some(variable), labels),
        chain: vec![],
    }
}

// Clauses //

pub fn match_clause(pattern: Pattern, where_: Option<Expression>) -> Clause {
    Clause::Match(Match {
        optional: false,
        pattern,
        where_,
    })
}

/// Make a projection out of aliased expressions.
pub fn projection(items: impl IntoIterator<Item = (Expression, Option<Variable>)>) -> Projection {
    Projection {
        star: false,
        items: items
            .into_iter()
            .map(|(expression, alias)| ProjectionItem { expression, alias })
            .collect(),
    }
}

/// `WITH *`
pub fn star_projection() -> Projection {
    Projection {
        star: true,
        items: vec![],
    }
}

pub fn simple_with(projection: Projection) -> With {
    With {
        distinct: false,
        projection,
        order_by: vec![],
        skip: None,
        limit: None,
        where_: None,
    }
}

/// `WITH * WHERE <predicate>`
pub fn with_star_where(predicate: Expression) -> Clause {
    Clause::With(With {
        where_: Some(predicate),
        ..simple_with(star_projection())
    })
}

pub fn simple_return(projection: Projection) -> Return {
    Return {
        distinct: false,
        projection,
        order_by: vec![],
        skip: None,
        limit: None,
    }
}

/// `RETURN <expression> AS <alias>`
pub fn return_as(expression: Expression, alias: &Variable) -> Clause {
    Clause::Return(simple_return(projection([(expression, Some(alias.clone()))])))
}

/// `CALL { WITH <imports> <clauses> }`
pub fn call_subquery(imports: Vec<Variable>, clauses: Vec<Clause>) -> Clause {
    Clause::Call(Subquery {
        imports,
        branches: vec![clauses],
    })
}

/// `CALL { <branch> UNION ALL <branch> ... }`, each branch importing `imports`.
pub fn call_union(imports: Vec<Variable>, branches: Vec<Vec<Clause>>) -> Clause {
    Clause::Call(Subquery { imports, branches })
}

/// A guard which aborts the statement with the forbidden signal unless the predicate holds.
pub fn validate_guard(predicate: Expression) -> Clause {
    Clause::CallProcedure(ProcedureCall {
        procedure: "apoc.util.validate".into(),
        arguments: vec![
            not_expr(predicate),
            string_expr(FORBIDDEN_SIGNAL),
            Expression::List(vec![int_expr(0)]),
        ],
        yields: vec![],
        where_: None,
    })
}

/// Attach a predicate to the last clause when it can take a `WHERE`, or append
/// `WITH * WHERE` otherwise.
pub fn attach_where(clauses: &mut Vec<Clause>, predicate: Option<Expression>) {
    let Some(predicate) = predicate else {
        return;
    };
    match clauses.last_mut() {
        Some(Clause::Match(Match { where_, .. }) | Clause::CallProcedure(ProcedureCall { where_, .. })) => {
            *where_ = and_all(where_.take().into_iter().chain([predicate]));
        }
        Some(Clause::With(With {
            where_,
            order_by,
            skip,
            limit,
            ..
        })) if order_by.is_empty() && skip.is_none() && limit.is_none() => {
            *where_ = and_all(where_.take().into_iter().chain([predicate]));
        }
        _ => clauses.push(with_star_where(predicate)),
    }
}

/// Generated variables render as `<name><index>`; this one is used verbatim.
pub fn fixed_variable(name: &str) -> Variable {
    Variable {
        name: name.into(),
        unique_index: None,
    }
}

/// The result column.
pub fn result_variable() -> Variable {
    fixed_variable(RESULT_COLUMN)
}
