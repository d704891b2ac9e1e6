//! Metadata information regarding the graph: node types, their attributes and the
//! relationships between them.

use std::collections::BTreeMap;

use query_engine_models::{FieldName, TypeName};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::authorization::{AuthorizationAnnotation, Capability};

/// Mapping from an entity name to its information.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct EntitiesInfo(pub BTreeMap<TypeName, EntityInfo>);

impl EntitiesInfo {
    pub fn empty() -> Self {
        EntitiesInfo(BTreeMap::new())
    }
}

/// Mapping from an interface name to its information.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct InterfacesInfo(pub BTreeMap<TypeName, InterfaceInfo>);

impl InterfacesInfo {
    pub fn empty() -> Self {
        InterfacesInfo(BTreeMap::new())
    }
}

/// Mapping from a union name to its information.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct UnionsInfo(pub BTreeMap<TypeName, UnionInfo>);

impl UnionsInfo {
    pub fn empty() -> Self {
        UnionsInfo(BTreeMap::new())
    }
}

/// A concrete node type.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityInfo {
    /// Overrides the plural used for root field names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<SmolStr>,
    /// The labels a node of this type carries. The first one is the main label.
    pub labels: Vec<SmolStr>,
    #[serde(default)]
    pub attributes: BTreeMap<FieldName, AttributeInfo>,
    #[serde(default)]
    pub relationships: BTreeMap<FieldName, RelationshipInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<AuthorizationAnnotation>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fulltext_indexes: BTreeMap<SmolStr, FulltextIndexInfo>,
    /// Operations that cannot be requested on this type under any role.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_operations: Vec<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An abstract type implemented by a list of entities.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<SmolStr>,
    /// Implementing entities, in fan-out order.
    pub implementations: Vec<TypeName>,
    /// Attributes every implementation shares.
    #[serde(default)]
    pub attributes: BTreeMap<FieldName, AttributeInfo>,
    /// Relationships every implementation declares.
    #[serde(default)]
    pub relationships: BTreeMap<FieldName, RelationshipInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_operations: Vec<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An abstract type whose members share nothing.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<SmolStr>,
    /// Member entities, in fan-out order.
    pub members: Vec<TypeName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A scalar property stored on a node or a relationship.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributeInfo {
    /// The property name in the database, when it differs from the field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<SmolStr>,
    pub r#type: ScalarType,
    #[serde(default)]
    pub list: bool,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<AuthorizationAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl AttributeInfo {
    pub fn new(r#type: ScalarType) -> Self {
        AttributeInfo {
            db_name: None,
            r#type,
            list: false,
            nullable: true,
            authorization: None,
            description: None,
        }
    }
}

/// The scalar types a property can hold.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
pub enum ScalarType {
    #[serde(rename = "ID")]
    Id,
    String,
    Int,
    BigInt,
    Float,
    Boolean,
    DateTime,
    Date,
}

impl ScalarType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::BigInt | ScalarType::Float)
    }

    pub fn is_textual(self) -> bool {
        matches!(self, ScalarType::String | ScalarType::Id)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, ScalarType::DateTime | ScalarType::Date)
    }
}

/// A directed, typed edge from the declaring type to a target type.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipInfo {
    /// The relationship type in the database.
    pub r#type: SmolStr,
    pub direction: Direction,
    /// An entity, interface or union.
    pub target: TypeName,
    pub cardinality: Cardinality,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<RelationshipPropertiesInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Attributes stored on the relationship itself.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipPropertiesInfo {
    pub type_name: TypeName,
    pub attributes: BTreeMap<FieldName, AttributeInfo>,
}

/// Direction of a relationship, seen from the declaring type.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    In,
    Out,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    One,
    Many,
}

/// A fulltext index usable from root reads.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FulltextIndexInfo {
    pub index_name: SmolStr,
    pub fields: Vec<FieldName>,
}

/// Default and maximum page size for reads of a type.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LimitSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl LimitSettings {
    /// The limit to apply, given what the caller asked for.
    pub fn resolve(&self, requested: Option<u32>) -> Option<u32> {
        let limit = requested.or(self.default);
        match (limit, self.max) {
            (Some(limit), Some(max)) => Some(limit.min(max)),
            (None, Some(max)) => Some(max),
            (limit, None) => limit,
        }
    }
}

/// Default plural of a type name: lower camel case plus an "s".
pub fn default_plural(type_name: &TypeName) -> SmolStr {
    let mut chars = type_name.as_str().chars();
    match chars.next() {
        Some(first) => {
            let mut plural: String = first.to_lowercase().collect();
            plural.push_str(chars.as_str());
            plural.push('s');
            plural.into()
        }
        None => SmolStr::default(),
    }
}

impl EntityInfo {
    pub fn plural(&self, name: &TypeName) -> SmolStr {
        self.plural.clone().unwrap_or_else(|| default_plural(name))
    }
}

impl InterfaceInfo {
    pub fn plural(&self, name: &TypeName) -> SmolStr {
        self.plural.clone().unwrap_or_else(|| default_plural(name))
    }
}

impl UnionInfo {
    pub fn plural(&self, name: &TypeName) -> SmolStr {
        self.plural.clone().unwrap_or_else(|| default_plural(name))
    }
}

impl AttributeInfo {
    /// The property name to use in the database.
    pub fn db_name<'a>(&'a self, field_name: &'a FieldName) -> &'a str {
        self.db_name.as_deref().unwrap_or(field_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plural_lowercases_first_letter() {
        assert_eq!(default_plural(&TypeName::from("BlogPost")), "blogPosts");
        assert_eq!(default_plural(&TypeName::from("User")), "users");
    }

    #[test]
    fn limit_settings_clamp_to_max() {
        let settings = LimitSettings {
            default: Some(10),
            max: Some(50),
        };
        assert_eq!(settings.resolve(None), Some(10));
        assert_eq!(settings.resolve(Some(20)), Some(20));
        assert_eq!(settings.resolve(Some(500)), Some(50));
        assert_eq!(LimitSettings::default().resolve(None), None);
    }
}
