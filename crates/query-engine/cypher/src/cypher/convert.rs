//! Convert a Cypher AST to a low-level Cypher string.

use super::ast::*;
use super::string::Cypher;

impl Statement {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        clauses_to_cypher(&self.clauses, cypher);
    }
}

/// Print clauses one per line.
fn clauses_to_cypher(clauses: &[Clause], cypher: &mut Cypher) {
    for (index, clause) in clauses.iter().enumerate() {
        if index > 0 {
            cypher.newline();
        }
        clause.to_cypher(cypher);
    }
}

/// Print clauses on their own indented lines, between braces.
fn block_to_cypher(clauses: &[Clause], cypher: &mut Cypher) {
    cypher.append_syntax("{");
    cypher.indent();
    cypher.newline();
    clauses_to_cypher(clauses, cypher);
    cypher.dedent();
    cypher.newline();
    cypher.append_syntax("}");
}

impl Clause {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        match self {
            Clause::Match(match_) => match_.to_cypher(cypher),
            Clause::With(with) => with.to_cypher(cypher),
            Clause::Unwind { expression, alias } => {
                cypher.append_syntax("UNWIND ");
                expression.to_cypher(cypher);
                cypher.append_syntax(" AS ");
                cypher.append_variable(alias);
            }
            Clause::Call(subquery) => subquery.to_cypher(cypher),
            Clause::CallProcedure(call) => call.to_cypher(cypher),
            Clause::DetachDelete(variables) => {
                cypher.append_syntax("DETACH DELETE ");
                variables_to_cypher(variables, cypher);
            }
            Clause::Return(return_) => return_.to_cypher(cypher),
        }
    }
}

fn variables_to_cypher(variables: &[Variable], cypher: &mut Cypher) {
    for (index, variable) in variables.iter().enumerate() {
        if index > 0 {
            cypher.append_syntax(", ");
        }
        cypher.append_variable(variable);
    }
}

impl Match {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        if self.optional {
            cypher.append_syntax("OPTIONAL ");
        }
        cypher.append_syntax("MATCH ");
        self.pattern.to_cypher(cypher);
        where_to_cypher(self.where_.as_ref(), cypher);
    }
}

fn where_to_cypher(where_: Option<&Expression>, cypher: &mut Cypher) {
    if let Some(predicate) = where_ {
        cypher.newline();
        cypher.append_syntax("WHERE ");
        predicate.to_cypher(cypher);
    }
}

fn pagination_to_cypher(
    order_by: &[OrderByElement],
    skip: Option<&Expression>,
    limit: Option<&Expression>,
    cypher: &mut Cypher,
) {
    if !order_by.is_empty() {
        cypher.newline();
        cypher.append_syntax("ORDER BY ");
        for (index, element) in order_by.iter().enumerate() {
            if index > 0 {
                cypher.append_syntax(", ");
            }
            element.target.to_cypher(cypher);
            match element.direction {
                OrderByDirection::Asc => cypher.append_syntax(" ASC"),
                OrderByDirection::Desc => cypher.append_syntax(" DESC"),
            }
        }
    }
    if let Some(skip) = skip {
        cypher.newline();
        cypher.append_syntax("SKIP ");
        skip.to_cypher(cypher);
    }
    if let Some(limit) = limit {
        cypher.newline();
        cypher.append_syntax("LIMIT ");
        limit.to_cypher(cypher);
    }
}

impl With {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        cypher.append_syntax("WITH ");
        if self.distinct {
            cypher.append_syntax("DISTINCT ");
        }
        self.projection.to_cypher(cypher);
        pagination_to_cypher(
            &self.order_by,
            self.skip.as_ref(),
            self.limit.as_ref(),
            cypher,
        );
        where_to_cypher(self.where_.as_ref(), cypher);
    }
}

impl Return {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        cypher.append_syntax("RETURN ");
        if self.distinct {
            cypher.append_syntax("DISTINCT ");
        }
        self.projection.to_cypher(cypher);
        pagination_to_cypher(
            &self.order_by,
            self.skip.as_ref(),
            self.limit.as_ref(),
            cypher,
        );
    }
}

impl Projection {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        if self.star || self.items.is_empty() {
            cypher.append_syntax("*");
        }
        for (index, item) in self.items.iter().enumerate() {
            if index > 0 || self.star {
                cypher.append_syntax(", ");
            }
            item.expression.to_cypher(cypher);
            if let Some(alias) = &item.alias {
                cypher.append_syntax(" AS ");
                cypher.append_variable(alias);
            }
        }
    }
}

impl Subquery {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        cypher.append_syntax("CALL {");
        cypher.indent();
        for (index, branch) in self.branches.iter().enumerate() {
            if index > 0 {
                cypher.newline();
                cypher.append_syntax("UNION ALL");
            }
            cypher.newline();
            if !self.imports.is_empty() {
                cypher.append_syntax("WITH ");
                variables_to_cypher(&self.imports, cypher);
                if !branch.is_empty() {
                    cypher.newline();
                }
            }
            clauses_to_cypher(branch, cypher);
        }
        cypher.dedent();
        cypher.newline();
        cypher.append_syntax("}");
    }
}

impl ProcedureCall {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        cypher.append_syntax("CALL ");
        cypher.append_syntax(&self.procedure);
        cypher.append_syntax("(");
        expressions_to_cypher(&self.arguments, cypher);
        cypher.append_syntax(")");
        if !self.yields.is_empty() {
            cypher.append_syntax(" YIELD ");
            for (index, item) in self.yields.iter().enumerate() {
                if index > 0 {
                    cypher.append_syntax(", ");
                }
                cypher.append_identifier(&item.field);
                if let Some(alias) = &item.alias {
                    cypher.append_syntax(" AS ");
                    cypher.append_variable(alias);
                }
            }
        }
        where_to_cypher(self.where_.as_ref(), cypher);
    }
}

impl Pattern {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        self.start.to_cypher(cypher);
        for (relationship, node) in &self.chain {
            relationship.to_cypher(cypher);
            node.to_cypher(cypher);
        }
    }
}

impl NodePattern {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        cypher.append_syntax("(");
        if let Some(variable) = &self.variable {
            cypher.append_variable(variable);
        }
        for label in &self.labels {
            cypher.append_syntax(":");
            cypher.append_identifier(label);
        }
        cypher.append_syntax(")");
    }
}

impl RelationshipPattern {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        match self.direction {
            PatternDirection::Incoming => cypher.append_syntax("<-["),
            PatternDirection::Outgoing | PatternDirection::Undirected => {
                cypher.append_syntax("-[");
            }
        }
        if let Some(variable) = &self.variable {
            cypher.append_variable(variable);
        }
        for (index, r#type) in self.types.iter().enumerate() {
            cypher.append_syntax(if index == 0 { ":" } else { "|" });
            cypher.append_identifier(r#type);
        }
        match self.direction {
            PatternDirection::Outgoing => cypher.append_syntax("]->"),
            PatternDirection::Incoming | PatternDirection::Undirected => {
                cypher.append_syntax("]-");
            }
        }
    }
}

fn expressions_to_cypher(expressions: &[Expression], cypher: &mut Cypher) {
    for (index, expression) in expressions.iter().enumerate() {
        if index > 0 {
            cypher.append_syntax(", ");
        }
        expression.to_cypher(cypher);
    }
}

/// Print an operand, parenthesizing operators that would otherwise bind loosely.
fn operand_to_cypher(expression: &Expression, cypher: &mut Cypher) {
    match expression {
        Expression::BinaryOperation { .. }
        | Expression::Not(_)
        | Expression::IsNull(_)
        | Expression::IsNotNull(_) => {
            cypher.append_syntax("(");
            expression.to_cypher(cypher);
            cypher.append_syntax(")");
        }
        _ => expression.to_cypher(cypher),
    }
}

fn connective_to_cypher(expressions: &[Expression], connective: &str, unit: bool, cypher: &mut Cypher) {
    match expressions {
        [] => Value::Bool(unit).to_cypher(cypher),
        [single] => single.to_cypher(cypher),
        _ => {
            cypher.append_syntax("(");
            for (index, expression) in expressions.iter().enumerate() {
                if index > 0 {
                    cypher.append_syntax(connective);
                }
                expression.to_cypher(cypher);
            }
            cypher.append_syntax(")");
        }
    }
}

impl Expression {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        match self {
            Expression::Variable(variable) => cypher.append_variable(variable),
            Expression::Property {
                expression,
                property,
            } => {
                match **expression {
                    Expression::Variable(_)
                    | Expression::Parameter(_)
                    | Expression::Property { .. }
                    | Expression::Index { .. } => expression.to_cypher(cypher),
                    _ => {
                        cypher.append_syntax("(");
                        expression.to_cypher(cypher);
                        cypher.append_syntax(")");
                    }
                }
                cypher.append_syntax(".");
                cypher.append_identifier(property);
            }
            Expression::Parameter(param) => cypher.append_param(param),
            Expression::Value(value) => value.to_cypher(cypher),
            Expression::Not(expression) => {
                cypher.append_syntax("NOT ");
                match **expression {
                    Expression::Exists(_)
                    | Expression::Variable(_)
                    | Expression::And(_)
                    | Expression::Or(_) => expression.to_cypher(cypher),
                    _ => {
                        cypher.append_syntax("(");
                        expression.to_cypher(cypher);
                        cypher.append_syntax(")");
                    }
                }
            }
            Expression::And(expressions) => connective_to_cypher(expressions, " AND ", true, cypher),
            Expression::Or(expressions) => connective_to_cypher(expressions, " OR ", false, cypher),
            Expression::BinaryOperation {
                left,
                operator,
                right,
            } => {
                operand_to_cypher(left, cypher);
                operator.to_cypher(cypher);
                operand_to_cypher(right, cypher);
            }
            Expression::IsNull(expression) => {
                operand_to_cypher(expression, cypher);
                cypher.append_syntax(" IS NULL");
            }
            Expression::IsNotNull(expression) => {
                operand_to_cypher(expression, cypher);
                cypher.append_syntax(" IS NOT NULL");
            }
            Expression::HasLabels { expression, labels } => {
                operand_to_cypher(expression, cypher);
                for label in labels {
                    cypher.append_syntax(":");
                    cypher.append_identifier(label);
                }
            }
            Expression::FunctionCall {
                function,
                arguments,
                distinct,
            } => {
                function.to_cypher(cypher);
                cypher.append_syntax("(");
                if *distinct {
                    cypher.append_syntax("DISTINCT ");
                }
                expressions_to_cypher(arguments, cypher);
                cypher.append_syntax(")");
            }
            Expression::CountStar => cypher.append_syntax("count(*)"),
            Expression::Exists(clauses) => {
                cypher.append_syntax("EXISTS ");
                block_to_cypher(clauses, cypher);
            }
            Expression::Count(clauses) => {
                cypher.append_syntax("COUNT ");
                block_to_cypher(clauses, cypher);
            }
            Expression::MapProjection { variable, entries } if entries.is_empty() => {
                cypher.append_variable(variable);
                cypher.append_syntax(" {}");
            }
            Expression::MapProjection { variable, entries } => {
                cypher.append_variable(variable);
                cypher.append_syntax(" { ");
                for (index, entry) in entries.iter().enumerate() {
                    if index > 0 {
                        cypher.append_syntax(", ");
                    }
                    entry.to_cypher(variable, cypher);
                }
                cypher.append_syntax(" }");
            }
            Expression::Map(entries) if entries.is_empty() => cypher.append_syntax("{}"),
            Expression::Map(entries) => {
                cypher.append_syntax("{ ");
                for (index, (key, expression)) in entries.iter().enumerate() {
                    if index > 0 {
                        cypher.append_syntax(", ");
                    }
                    cypher.append_identifier(key);
                    cypher.append_syntax(": ");
                    expression.to_cypher(cypher);
                }
                cypher.append_syntax(" }");
            }
            Expression::List(expressions) => {
                cypher.append_syntax("[");
                expressions_to_cypher(expressions, cypher);
                cypher.append_syntax("]");
            }
            Expression::ListComprehension {
                variable,
                list,
                where_,
                projection,
            } => {
                cypher.append_syntax("[");
                cypher.append_variable(variable);
                cypher.append_syntax(" IN ");
                list.to_cypher(cypher);
                if let Some(predicate) = where_ {
                    cypher.append_syntax(" WHERE ");
                    predicate.to_cypher(cypher);
                }
                if let Some(projection) = projection {
                    cypher.append_syntax(" | ");
                    projection.to_cypher(cypher);
                }
                cypher.append_syntax("]");
            }
            Expression::Index { expression, index } => {
                operand_to_cypher(expression, cypher);
                cypher.append_syntax("[");
                index.to_cypher(cypher);
                cypher.append_syntax("]");
            }
            Expression::Case { branches, else_ } => {
                cypher.append_syntax("CASE");
                for (condition, result) in branches {
                    cypher.append_syntax(" WHEN ");
                    condition.to_cypher(cypher);
                    cypher.append_syntax(" THEN ");
                    result.to_cypher(cypher);
                }
                if let Some(otherwise) = else_ {
                    cypher.append_syntax(" ELSE ");
                    otherwise.to_cypher(cypher);
                }
                cypher.append_syntax(" END");
            }
        }
    }
}

impl MapProjectionEntry {
    pub fn to_cypher(&self, variable: &Variable, cypher: &mut Cypher) {
        match self {
            MapProjectionEntry::Property { key, property } if key == property => {
                cypher.append_syntax(".");
                cypher.append_identifier(property);
            }
            MapProjectionEntry::Property { key, property } => {
                cypher.append_identifier(key);
                cypher.append_syntax(": ");
                cypher.append_variable(variable);
                cypher.append_syntax(".");
                cypher.append_identifier(property);
            }
            MapProjectionEntry::Expression { key, expression } => {
                cypher.append_identifier(key);
                cypher.append_syntax(": ");
                expression.to_cypher(cypher);
            }
        }
    }
}

impl Value {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        match self {
            Value::Null => cypher.append_syntax("null"),
            Value::Bool(true) => cypher.append_syntax("true"),
            Value::Bool(false) => cypher.append_syntax("false"),
            Value::Int(i) => cypher.append_syntax(&i.to_string()),
            Value::String(s) => cypher.append_string_literal(s),
        }
    }
}

impl BinaryOperator {
    pub fn to_cypher(self, cypher: &mut Cypher) {
        cypher.append_syntax(match self {
            BinaryOperator::Equal => " = ",
            BinaryOperator::NotEqual => " <> ",
            BinaryOperator::LessThan => " < ",
            BinaryOperator::LessThanOrEqual => " <= ",
            BinaryOperator::GreaterThan => " > ",
            BinaryOperator::GreaterThanOrEqual => " >= ",
            BinaryOperator::In => " IN ",
            BinaryOperator::Contains => " CONTAINS ",
            BinaryOperator::StartsWith => " STARTS WITH ",
            BinaryOperator::EndsWith => " ENDS WITH ",
            BinaryOperator::RegexMatch => " =~ ",
            BinaryOperator::Add => " + ",
            BinaryOperator::Subtract => " - ",
        });
    }
}

impl Function {
    pub fn to_cypher(&self, cypher: &mut Cypher) {
        cypher.append_syntax(match self {
            Function::Avg => "avg",
            Function::Coalesce => "coalesce",
            Function::Collect => "collect",
            Function::Count => "count",
            Function::Date => "date",
            Function::Datetime => "datetime",
            Function::Head => "head",
            Function::Max => "max",
            Function::Min => "min",
            Function::Range => "range",
            Function::Size => "size",
            Function::Sum => "sum",
            Function::ToString => "toString",
            Function::Custom(name) => name,
        });
    }
}
