//! Type definitions of a low-level Cypher string representation.

use indexmap::IndexMap;
use serde_json::Value;

use super::ast::{Param, Variable};

const INDENT: &str = "    ";

/// A Cypher query string under construction, together with the parameters it
/// references, in the order they were printed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cypher {
    pub cypher: String,
    pub params: IndexMap<String, Value>,
    indent: usize,
    param_index: u64,
}

impl Cypher {
    /// Create a new empty query.
    pub fn new() -> Cypher {
        Cypher::default()
    }

    /// Append raw syntax.
    pub fn append_syntax(&mut self, syntax: &str) {
        self.cypher.push_str(syntax);
    }

    /// Start a new line at the current indentation level.
    pub fn newline(&mut self) {
        self.cypher.push('\n');
        for _ in 0..self.indent {
            self.cypher.push_str(INDENT);
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Append a label, relationship type, property or map key, escaping it with
    /// backticks when it is not a plain identifier.
    pub fn append_identifier(&mut self, identifier: &str) {
        if is_plain_identifier(identifier) {
            self.cypher.push_str(identifier);
        } else {
            self.cypher.push('`');
            self.cypher.push_str(&identifier.replace('`', "``"));
            self.cypher.push('`');
        }
    }

    pub fn append_variable(&mut self, variable: &Variable) {
        self.append_identifier(&variable.to_string());
    }

    /// Append a double-quoted string literal.
    pub fn append_string_literal(&mut self, value: &str) {
        self.cypher.push('"');
        for c in value.chars() {
            match c {
                '\\' => self.cypher.push_str("\\\\"),
                '"' => self.cypher.push_str("\\\""),
                '\n' => self.cypher.push_str("\\n"),
                '\r' => self.cypher.push_str("\\r"),
                '\t' => self.cypher.push_str("\\t"),
                c => self.cypher.push(c),
            }
        }
        self.cypher.push('"');
    }

    /// Append a parameter reference and record its value. Anonymous values are
    /// numbered in print order; named parameters are recorded once.
    pub fn append_param(&mut self, param: &Param) {
        match param {
            Param::Value(value) => {
                let name = format!("param{}", self.param_index);
                self.param_index += 1;
                self.cypher.push('$');
                self.cypher.push_str(&name);
                self.params.insert(name, value.clone());
            }
            Param::Named { name, value } => {
                self.cypher.push('$');
                self.cypher.push_str(name);
                if !self.params.contains_key(name.as_str()) {
                    self.params.insert(name.to_string(), value.clone());
                }
            }
        }
    }
}

fn is_plain_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unique_index {
            Some(index) => write!(f, "{}{}", self.name, index),
            None => write!(f, "{}", self.name),
        }
    }
}
