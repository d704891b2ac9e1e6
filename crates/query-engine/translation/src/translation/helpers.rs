//! Helpers for processing requests and building Cypher.

use smol_str::SmolStr;

use super::error::Error;
use query_engine_cypher::cypher;
use query_engine_metadata::metadata;
use query_engine_models::{self as models, FieldName, TypeName};

#[derive(Debug)]
/// Static information from the query and metadata.
pub struct Env<'request> {
    pub(crate) metadata: &'request metadata::Metadata,
    pub(crate) request_context: &'request models::RequestContext,
}

#[derive(Debug)]
/// Stateful information changed throughout the translation process.
pub struct State {
    global_variable_index: VariableIndex,
}

#[derive(Debug)]
/// Used for generating a unique name for bound variables.
pub struct VariableIndex(pub u64);

/// A node type as the query AST refers to it.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef {
    pub name: TypeName,
    pub labels: Vec<SmolStr>,
}

/// An attribute as the query AST refers to it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRef {
    pub field_name: FieldName,
    pub db_name: SmolStr,
    pub r#type: metadata::ScalarType,
    pub list: bool,
}

/// A relationship as the query AST refers to it.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRef {
    pub field_name: FieldName,
    pub r#type: SmolStr,
    pub direction: metadata::Direction,
    pub cardinality: metadata::Cardinality,
    pub nullable: bool,
}

#[derive(Debug, Clone, Copy)]
/// Metadata information about a type that can be the target of a read: a concrete
/// entity, or an abstract type that fans out over concrete entities.
pub enum TargetInfo<'env> {
    Entity {
        name: &'env TypeName,
        info: &'env metadata::EntityInfo,
    },
    Interface {
        name: &'env TypeName,
        info: &'env metadata::InterfaceInfo,
    },
    Union {
        name: &'env TypeName,
        info: &'env metadata::UnionInfo,
    },
}

#[derive(Debug, Clone, Copy)]
/// Metadata information about any object that can have fields.
pub enum FieldsInfo<'env> {
    Entity {
        name: &'env TypeName,
        info: &'env metadata::EntityInfo,
    },
    Interface {
        name: &'env TypeName,
        info: &'env metadata::InterfaceInfo,
    },
    Union {
        name: &'env TypeName,
        info: &'env metadata::UnionInfo,
    },
    RelationshipProperties {
        info: &'env metadata::RelationshipPropertiesInfo,
    },
}

/// The operations a root field can ask for.
#[derive(Debug, Clone, Copy)]
pub enum RootField<'env> {
    Read(TargetInfo<'env>),
    Connection(TargetInfo<'env>),
    Aggregate(TargetInfo<'env>),
    Delete {
        name: &'env TypeName,
        info: &'env metadata::EntityInfo,
    },
}

impl<'env> RootField<'env> {
    /// A short name of the requested operation.
    pub fn operation(&self) -> &'static str {
        match self {
            RootField::Read(_) => "read",
            RootField::Connection(_) => "connection",
            RootField::Aggregate(_) => "aggregate",
            RootField::Delete { .. } => "delete",
        }
    }

    pub fn type_name(&self) -> &'env TypeName {
        match self {
            RootField::Read(target) | RootField::Connection(target) | RootField::Aggregate(target) => {
                target.name()
            }
            RootField::Delete { name, .. } => name,
        }
    }
}

impl<'a> From<TargetInfo<'a>> for FieldsInfo<'a> {
    fn from(value: TargetInfo<'a>) -> Self {
        match value {
            TargetInfo::Entity { name, info } => FieldsInfo::Entity { name, info },
            TargetInfo::Interface { name, info } => FieldsInfo::Interface { name, info },
            TargetInfo::Union { name, info } => FieldsInfo::Union { name, info },
        }
    }
}

impl<'request> Env<'request> {
    /// Run a closure with an empty environment.
    /// This should only be used for tests.
    ///
    /// The reason we cannot just construct and return an empty `Env` is that it contains borrowed
    /// data. Therefore we take a continuation instead which can do what it likes with the `Env`.
    pub fn with_empty<F, R>(f: F) -> R
    where
        F: FnOnce(Env<'_>) -> R,
    {
        let temp_metadata = metadata::Metadata::empty();
        let temp_context = models::RequestContext::anonymous();
        let temp_env = Env {
            metadata: &temp_metadata,
            request_context: &temp_context,
        };
        f(temp_env)
    }

    /// Create a new Env by supplying the metadata and the request context.
    pub fn new(
        metadata: &'request metadata::Metadata,
        request_context: &'request models::RequestContext,
    ) -> Self {
        Env {
            metadata,
            request_context,
        }
    }

    /// Lookup an entity, interface or union.
    pub fn lookup_target(&self, type_name: &TypeName) -> Result<TargetInfo<'request>, Error> {
        if let Some((name, info)) = self.metadata.entities.0.get_key_value(type_name) {
            return Ok(TargetInfo::Entity { name, info });
        }
        if let Some((name, info)) = self.metadata.interfaces.0.get_key_value(type_name) {
            return Ok(TargetInfo::Interface { name, info });
        }
        if let Some((name, info)) = self.metadata.unions.0.get_key_value(type_name) {
            return Ok(TargetInfo::Union { name, info });
        }
        Err(Error::TypeNotFound(type_name.clone()))
    }

    /// Lookup a concrete entity.
    pub fn lookup_entity(
        &self,
        type_name: &TypeName,
    ) -> Result<(&'request TypeName, &'request metadata::EntityInfo), Error> {
        self.metadata
            .entities
            .0
            .get_key_value(type_name)
            .ok_or_else(|| Error::TypeNotFound(type_name.clone()))
    }

    /// Every root field the schema model exposes, in lookup order.
    ///
    /// For a type with plural `p`: `p` reads, `pConnection` reads a connection,
    /// `pAggregate` aggregates and `deleteP` deletes (entities only).
    pub fn root_fields(&self) -> Vec<(SmolStr, RootField<'request>)> {
        let targets = self
            .metadata
            .entities
            .0
            .iter()
            .map(|(name, info)| (info.plural(name), TargetInfo::Entity { name, info }))
            .chain(
                self.metadata.interfaces.0.iter().map(|(name, info)| {
                    (info.plural(name), TargetInfo::Interface { name, info })
                }),
            )
            .chain(
                self.metadata
                    .unions
                    .0
                    .iter()
                    .map(|(name, info)| (info.plural(name), TargetInfo::Union { name, info })),
            );

        let mut fields = vec![];
        for (plural, target) in targets {
            fields.push((format!("{plural}Connection").into(), RootField::Connection(target)));
            fields.push((format!("{plural}Aggregate").into(), RootField::Aggregate(target)));
            if let TargetInfo::Entity { name, info } = target {
                fields.push((
                    format!("delete{}", upper_first(&plural)).into(),
                    RootField::Delete { name, info },
                ));
            }
            fields.push((plural, RootField::Read(target)));
        }
        fields
    }

    /// Resolve a root field name to the operation it requests.
    pub fn lookup_root_field(&self, field_name: &FieldName) -> Result<RootField<'request>, Error> {
        self.root_fields()
            .into_iter()
            .find(|(name, _)| name == field_name.as_str())
            .map(|(_, root_field)| root_field)
            .ok_or_else(|| Error::RootFieldNotFound(field_name.clone()))
    }

    /// `$jwt`, the decoded token of the request (an empty map when anonymous).
    pub fn jwt_param(&self) -> cypher::ast::Expression {
        cypher::ast::Expression::Parameter(cypher::ast::Param::Named {
            name: "jwt".into(),
            value: self
                .request_context
                .jwt
                .clone()
                .map_or_else(|| serde_json::Value::Object(serde_json::Map::new()), serde_json::Value::Object),
        })
    }

    /// `$isAuthenticated`
    pub fn is_authenticated_param(&self) -> cypher::ast::Expression {
        cypher::ast::Expression::Parameter(cypher::ast::Param::Named {
            name: "isAuthenticated".into(),
            value: serde_json::Value::Bool(self.request_context.is_authenticated()),
        })
    }
}

/// Uppercase the first character.
pub fn upper_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl<'env> TargetInfo<'env> {
    pub fn name(&self) -> &'env TypeName {
        match self {
            TargetInfo::Entity { name, .. }
            | TargetInfo::Interface { name, .. }
            | TargetInfo::Union { name, .. } => name,
        }
    }

    /// The concrete entities behind this target, in fan-out order.
    pub fn concrete_entities(
        &self,
        env: &Env<'env>,
    ) -> Result<Vec<(&'env TypeName, &'env metadata::EntityInfo)>, Error> {
        match self {
            TargetInfo::Entity { name, info } => Ok(vec![(*name, *info)]),
            TargetInfo::Interface { info, .. } => info
                .implementations
                .iter()
                .map(|name| env.lookup_entity(name))
                .collect(),
            TargetInfo::Union { info, .. } => info
                .members
                .iter()
                .map(|name| env.lookup_entity(name))
                .collect(),
        }
    }

    pub fn excluded_operations(&self) -> &'env [metadata::Capability] {
        match self {
            TargetInfo::Entity { info, .. } => &info.excluded_operations,
            TargetInfo::Interface { info, .. } => &info.excluded_operations,
            TargetInfo::Union { .. } => &[],
        }
    }

    pub fn limit(&self) -> Option<metadata::LimitSettings> {
        match self {
            TargetInfo::Entity { info, .. } => info.limit,
            TargetInfo::Interface { info, .. } => info.limit,
            TargetInfo::Union { .. } => None,
        }
    }

    /// Fail if the schema excludes the capability for this type.
    pub fn check_capability(&self, capability: metadata::Capability) -> Result<(), Error> {
        if self.excluded_operations().contains(&capability) {
            Err(Error::CapabilityNotAllowed {
                type_name: self.name().clone(),
                capability,
            })
        } else {
            Ok(())
        }
    }
}

impl<'env> FieldsInfo<'env> {
    /// The type name used in error messages.
    pub fn type_name(&self) -> TypeName {
        match self {
            FieldsInfo::Entity { name, .. }
            | FieldsInfo::Interface { name, .. }
            | FieldsInfo::Union { name, .. } => (*name).clone(),
            FieldsInfo::RelationshipProperties { info } => info.type_name.clone(),
        }
    }

    fn attributes(&self) -> Option<&'env std::collections::BTreeMap<FieldName, metadata::AttributeInfo>> {
        match self {
            FieldsInfo::Entity { info, .. } => Some(&info.attributes),
            FieldsInfo::Interface { info, .. } => Some(&info.attributes),
            FieldsInfo::RelationshipProperties { info } => Some(&info.attributes),
            FieldsInfo::Union { .. } => None,
        }
    }

    /// Lookup an attribute, if there is one with this name.
    pub fn find_attribute(
        &self,
        field_name: &str,
    ) -> Option<(&'env FieldName, &'env metadata::AttributeInfo)> {
        self.attributes()
            .and_then(|attributes| attributes.get_key_value(field_name))
    }

    /// Lookup an attribute.
    pub fn lookup_attribute(&self, field_name: &FieldName) -> Result<AttributeRef, Error> {
        self.find_attribute(field_name.as_str())
            .map(|(name, info)| AttributeRef {
                field_name: name.clone(),
                db_name: info.db_name(name).into(),
                r#type: info.r#type,
                list: info.list,
            })
            .ok_or_else(|| Error::FieldNotFound {
                type_name: self.type_name(),
                field: field_name.clone(),
            })
    }

    /// Lookup a relationship, if there is one with this name.
    pub fn find_relationship(
        &self,
        field_name: &str,
    ) -> Option<(&'env FieldName, &'env metadata::RelationshipInfo)> {
        match self {
            FieldsInfo::Entity { info, .. } => info.relationships.get_key_value(field_name),
            FieldsInfo::Interface { info, .. } => info.relationships.get_key_value(field_name),
            FieldsInfo::Union { .. } | FieldsInfo::RelationshipProperties { .. } => None,
        }
    }

    /// Lookup a relationship.
    pub fn lookup_relationship(
        &self,
        field_name: &FieldName,
    ) -> Result<(&'env FieldName, &'env metadata::RelationshipInfo), Error> {
        self.find_relationship(field_name.as_str())
            .ok_or_else(|| Error::RelationshipNotFound {
                type_name: self.type_name(),
                relationship: field_name.clone(),
            })
    }
}

impl EntityRef {
    pub fn new(name: &TypeName, info: &metadata::EntityInfo) -> EntityRef {
        EntityRef {
            name: name.clone(),
            labels: info.labels.clone(),
        }
    }
}

impl RelationshipRef {
    pub fn new(field_name: &FieldName, info: &metadata::RelationshipInfo) -> RelationshipRef {
        RelationshipRef {
            field_name: field_name.clone(),
            r#type: info.r#type.clone(),
            direction: info.direction,
            cardinality: info.cardinality,
            nullable: info.nullable,
        }
    }

    pub fn is_to_many(&self) -> bool {
        self.cardinality == metadata::Cardinality::Many
    }
}

impl Default for State {
    fn default() -> State {
        State {
            global_variable_index: VariableIndex(0),
        }
    }
}

impl State {
    /// Build a new state.
    pub fn new() -> State {
        State::default()
    }

    /// Create variables using this function so they get a unique index.
    pub fn make_variable(&mut self, name: &str) -> cypher::ast::Variable {
        self.global_variable_index.make_variable(name)
    }

    /// A variable bound to a node.
    pub fn make_node_variable(&mut self) -> cypher::ast::Variable {
        self.make_variable("this")
    }

    /// A variable bound to a relationship.
    pub fn make_relationship_variable(&mut self) -> cypher::ast::Variable {
        self.make_variable("rel")
    }

    /// A variable bound to a computed value.
    pub fn make_value_variable(&mut self) -> cypher::ast::Variable {
        self.make_variable("var")
    }
}

impl VariableIndex {
    /// increment the variable index and return the current one.
    fn next_global_variable_index(&mut self) -> VariableIndex {
        let index = self.0;
        *self = VariableIndex(index + 1);
        VariableIndex(index)
    }

    /// Create variables using this function so they get a unique index.
    pub fn make_variable(&mut self, name: &str) -> cypher::ast::Variable {
        cypher::ast::Variable {
            unique_index: Some(self.next_global_variable_index().0),
            name: name.into(),
        }
    }
}
