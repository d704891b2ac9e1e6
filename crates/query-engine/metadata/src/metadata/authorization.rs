//! Declarative access rules attached to entities and attributes.
//!
//! Rule conditions are kept as raw JSON here; they are parsed against the schema when a
//! request is compiled.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The operations a rule can govern.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    Read,
    Aggregate,
    Create,
    Update,
    Delete,
    CreateRelationship,
    DeleteRelationship,
}

impl Capability {
    pub fn is_mutation(self) -> bool {
        !matches!(self, Capability::Read | Capability::Aggregate)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::Read => "READ",
            Capability::Aggregate => "AGGREGATE",
            Capability::Create => "CREATE",
            Capability::Update => "UPDATE",
            Capability::Delete => "DELETE",
            Capability::CreateRelationship => "CREATE_RELATIONSHIP",
            Capability::DeleteRelationship => "DELETE_RELATIONSHIP",
        };
        write!(f, "{name}")
    }
}

/// When a validation rule runs relative to the mutation it guards.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationTime {
    Before,
    After,
}

/// The rules of one annotation. Rules of the same kind are OR-ed together.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationAnnotation {
    /// Rows that fail every filter rule are excluded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<FilterRule>,
    /// Rows that fail every validation rule abort the request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validate: Vec<ValidateRule>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterRule {
    #[serde(default = "default_filter_operations")]
    pub operations: Vec<Capability>,
    #[serde(default = "default_require_authentication")]
    pub require_authentication: bool,
    /// `{ node: <where>, jwt: <claims where>, AND, OR, NOT }`.
    #[serde(default, rename = "where")]
    pub r#where: Option<serde_json::Value>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRule {
    #[serde(default = "default_validate_operations")]
    pub operations: Vec<Capability>,
    #[serde(default = "default_validation_time")]
    pub when: Vec<ValidationTime>,
    #[serde(default = "default_require_authentication")]
    pub require_authentication: bool,
    #[serde(default, rename = "where")]
    pub r#where: Option<serde_json::Value>,
}

fn default_filter_operations() -> Vec<Capability> {
    vec![
        Capability::Read,
        Capability::Aggregate,
        Capability::Update,
        Capability::Delete,
        Capability::CreateRelationship,
        Capability::DeleteRelationship,
    ]
}

fn default_validate_operations() -> Vec<Capability> {
    vec![
        Capability::Read,
        Capability::Aggregate,
        Capability::Create,
        Capability::Update,
        Capability::Delete,
        Capability::CreateRelationship,
        Capability::DeleteRelationship,
    ]
}

fn default_validation_time() -> Vec<ValidationTime> {
    vec![ValidationTime::Before, ValidationTime::After]
}

fn default_require_authentication() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_defaults_apply() {
        let rule: FilterRule = serde_json::from_value(serde_json::json!({
            "where": { "node": { "id": { "eq": "$jwt.sub" } } }
        }))
        .expect("valid rule");

        assert!(rule.require_authentication);
        assert!(rule.operations.contains(&Capability::Read));
        assert!(!rule.operations.contains(&Capability::Create));
    }

    #[test]
    fn validate_rule_defaults_cover_both_times() {
        let rule: ValidateRule =
            serde_json::from_value(serde_json::json!({ "requireAuthentication": false }))
                .expect("valid rule");

        assert_eq!(rule.when, vec![ValidationTime::Before, ValidationTime::After]);
        assert!(rule.r#where.is_none());
    }
}
