use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use crate::names::{FieldName, TypeName};

/// The introspection field every object carries.
pub const TYPENAME_FIELD: &str = "__typename";

/// One requested field, with its arguments and its nested selections keyed by the
/// type they were requested on.
///
/// Order matters everywhere: arguments, type names and fields keep the order in which
/// the caller wrote them, and the compiled query follows that order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectionField {
    pub name: FieldName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<FieldName>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub arguments: IndexMap<SmolStr, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields_by_type_name: IndexMap<TypeName, Vec<SelectionField>>,
}

impl SelectionField {
    pub fn new(name: impl Into<FieldName>) -> Self {
        SelectionField {
            name: name.into(),
            ..SelectionField::default()
        }
    }

    /// The key under which this field appears in the result.
    pub fn output_key(&self) -> &FieldName {
        self.alias.as_ref().unwrap_or(&self.name)
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// The nested fields requested on any of the given types, in the given type order.
    /// When two types request the same output key, the first one wins.
    pub fn fields_for(&self, type_names: &[&TypeName]) -> Vec<&SelectionField> {
        let mut fields: IndexMap<&FieldName, &SelectionField> = IndexMap::new();
        for type_name in type_names {
            if let Some(type_fields) = self.fields_by_type_name.get(*type_name) {
                for field in type_fields {
                    fields.entry(field.output_key()).or_insert(field);
                }
            }
        }
        fields.into_values().collect()
    }

    /// All nested fields regardless of the type they were requested on. Used for the
    /// synthetic wrapper objects (connections, edges, page info, aggregates) whose type
    /// names are generated by the schema layer.
    pub fn fields(&self) -> Vec<&SelectionField> {
        let type_names: Vec<&TypeName> = self.fields_by_type_name.keys().collect();
        self.fields_for(&type_names)
    }

    /// Builder used by tests and the CLI fixtures.
    pub fn with_alias(mut self, alias: impl Into<FieldName>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_argument(mut self, name: &str, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn with_fields(
        mut self,
        type_name: impl Into<TypeName>,
        fields: impl IntoIterator<Item = SelectionField>,
    ) -> Self {
        self.fields_by_type_name
            .entry(type_name.into())
            .or_default()
            .extend(fields);
        self
    }
}

/// A request for one root field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub operation: SelectionField,
}

/// The authorization context of a request. The caller is authenticated iff a decoded
/// JWT is present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub jwt: Option<serde_json::Map<String, Value>>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        RequestContext::default()
    }

    pub fn with_jwt(jwt: serde_json::Map<String, Value>) -> Self {
        RequestContext { jwt: Some(jwt) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.jwt.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_for_merges_interface_and_concrete_fields() {
        let field = SelectionField::new("productions")
            .with_fields("Production", [SelectionField::new("title")])
            .with_fields(
                "Movie",
                [SelectionField::new("title"), SelectionField::new("runtime")],
            );

        let production = TypeName::from("Production");
        let movie = TypeName::from("Movie");
        let names: Vec<&str> = field
            .fields_for(&[&production, &movie])
            .into_iter()
            .map(|f| f.output_key().as_str())
            .collect();

        assert_eq!(names, vec!["title", "runtime"]);
    }

    #[test]
    fn output_key_prefers_alias() {
        let field = SelectionField::new("title").with_alias("heading");
        assert_eq!(field.output_key().as_str(), "heading");
    }

    #[test]
    fn deserializes_camel_case_selection() {
        let field: SelectionField = serde_json::from_value(serde_json::json!({
            "name": "posts",
            "arguments": { "limit": 2 },
            "fieldsByTypeName": { "Post": [{ "name": "title" }] }
        }))
        .expect("valid selection");

        assert_eq!(field.argument("limit"), Some(&serde_json::json!(2)));
        assert_eq!(field.fields().len(), 1);
    }
}
