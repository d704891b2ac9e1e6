//! Build operations for root fields and relationship fields.
//!
//! A concrete target yields a single operation. An interface or union fans out into
//! one partial per concrete type (after narrowing by a `typename` or member filter),
//! joined by a composite operation that sorts and paginates the union.

use smol_str::SmolStr;

use super::authorization::authorization_filters;
use super::fields::{self, selected_attributes};
use super::filtering::{translate_filters, translate_where_argument, Scope};
use super::sorting::{self, SortKey};
use super::values;
use crate::translation::ast::fields::{AggregationField, EdgeField, Field};
use crate::translation::ast::filters::FilterTarget;
use crate::translation::ast::operations::{
    AggregationOperation, AggregationPartial, CompositeConnectionOperation,
    CompositeReadOperation, ConnectionOperation, ConnectionPartial, DeleteOperation, Operation,
    ReadOperation,
};
use crate::translation::ast::selection::{
    FulltextSearch, NodeSelection, RelationshipSelection, Selection, TargetLabels,
};
use crate::translation::ast::sort::{Pagination, SortField};
use crate::translation::error::Error;
use crate::translation::helpers::{
    EntityRef, Env, FieldsInfo, RelationshipRef, TargetInfo,
};
use crate::translation::where_input::{self, AggregateTarget, FilterPath, WhereExpr};
use query_engine_metadata::metadata::{self, Capability};
use query_engine_models::{FieldName, SelectionField, TypeName};

/// Where the rows of an operation come from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'env> {
    /// All nodes of the type.
    Root,
    /// The nodes related to the bound node.
    Relationship {
        field_name: &'env FieldName,
        info: &'env metadata::RelationshipInfo,
    },
}

/// The three fields a relationship offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipField {
    Read,
    Connection,
    Aggregate,
}

impl<'env> Source<'env> {
    fn is_root(&self) -> bool {
        matches!(self, Source::Root)
    }

    fn cardinality(&self) -> metadata::Cardinality {
        match self {
            Source::Root => metadata::Cardinality::Many,
            Source::Relationship { info, .. } => info.cardinality,
        }
    }

    /// Properties of the traversed relationship.
    fn edge_fields(&self) -> Option<FieldsInfo<'env>> {
        match self {
            Source::Root => None,
            Source::Relationship { info, .. } => info
                .properties
                .as_ref()
                .map(|info| FieldsInfo::RelationshipProperties { info }),
        }
    }

    /// Select the nodes of the concrete type `name` reached from this source.
    fn selection(
        &self,
        env: &Env<'env>,
        target: TargetInfo<'env>,
        name: &'env TypeName,
        info: &'env metadata::EntityInfo,
        field: &SelectionField,
        optional: bool,
    ) -> Result<Selection, Error> {
        match self {
            Source::Root => Ok(Selection::Node(NodeSelection::new(EntityRef::new(name, info)))),
            Source::Relationship {
                field_name,
                info: relationship,
            } => {
                let selection = relationship_selection(
                    env,
                    field_name,
                    relationship,
                    field.alias.clone().map(SmolStr::from),
                    optional,
                )?;
                Ok(Selection::Relationship(match target {
                    TargetInfo::Entity { .. } => selection,
                    TargetInfo::Interface { .. } | TargetInfo::Union { .. } => {
                        selection.narrowed(EntityRef::new(name, info))
                    }
                }))
            }
        }
    }
}

/// The hop over a relationship to its declared target.
pub fn relationship_selection(
    env: &Env<'_>,
    field_name: &FieldName,
    info: &metadata::RelationshipInfo,
    alias: Option<SmolStr>,
    optional: bool,
) -> Result<RelationshipSelection, Error> {
    let target = match env.lookup_target(&info.target)? {
        TargetInfo::Entity { info, .. } => TargetLabels::Labels(info.labels.clone()),
        target @ (TargetInfo::Interface { .. } | TargetInfo::Union { .. }) => TargetLabels::AnyOf(
            target
                .concrete_entities(env)?
                .into_iter()
                .map(|(_, info)| info.labels.clone())
                .collect(),
        ),
    };
    Ok(RelationshipSelection {
        relationship: RelationshipRef::new(field_name, info),
        alias,
        target,
        target_override: None,
        optional,
    })
}

/// The operation computing a relationship field of a node.
pub fn translate_relationship_field<'env>(
    env: &Env<'env>,
    field_name: &'env FieldName,
    info: &'env metadata::RelationshipInfo,
    field: &SelectionField,
    kind: RelationshipField,
) -> Result<Operation, Error> {
    let target = env.lookup_target(&info.target)?;
    let source = Source::Relationship { field_name, info };
    match kind {
        RelationshipField::Read => translate_read(env, field, target, source),
        RelationshipField::Connection => translate_connection(env, field, target, source),
        RelationshipField::Aggregate => translate_aggregation(env, field, target, source),
    }
}

/// The concrete types a request ranges over: all of them, or those a `typename` or
/// member condition narrows to.
fn narrowed_entities<'env>(
    env: &Env<'env>,
    target: TargetInfo<'env>,
    where_: Option<&WhereExpr>,
) -> Result<Vec<(&'env TypeName, &'env metadata::EntityInfo)>, Error> {
    let mut entities = target.concrete_entities(env)?;
    if let Some(types) = where_.and_then(WhereExpr::narrowed_types) {
        entities.retain(|(name, _)| types.contains(name));
    }
    Ok(entities)
}

/// Resolve requested sort keys against the node fields and relationship properties.
fn sort_attributes(
    keys: &[SortKey],
    node: FieldsInfo<'_>,
    edge: Option<FieldsInfo<'_>>,
) -> Result<Vec<SortField>, Error> {
    keys.iter()
        .map(|key| {
            let fields = match key.target {
                FilterTarget::Node => node,
                FilterTarget::Relationship => edge.ok_or_else(|| Error::InvalidArgument {
                    argument: "sort".to_string(),
                    message: "the relationship has no properties to sort on".to_string(),
                })?,
            };
            Ok(SortField {
                target: key.target,
                attribute: fields.lookup_attribute(&key.field)?,
                direction: key.direction,
            })
        })
        .collect()
}

/// A read of a type's nodes, or of the nodes related through a relationship.
pub fn translate_read<'env>(
    env: &Env<'env>,
    field: &SelectionField,
    target: TargetInfo<'env>,
    source: Source<'env>,
) -> Result<Operation, Error> {
    target.check_capability(Capability::Read)?;
    let where_ = translate_where_argument(env, field, target.into())?;
    let sort = sort_attributes(&sorting::read_sort(field)?, target.into(), None)?;
    let pagination = sorting::read_pagination(field, target.limit())?;
    let optional = source.cardinality() == metadata::Cardinality::One;

    let read = |name: &'env TypeName, info: &'env metadata::EntityInfo, fields: Vec<Field>| {
        let node = FieldsInfo::Entity { name, info };
        Ok::<_, Error>(ReadOperation {
            selection: source.selection(env, target, name, info, field, optional)?,
            filters: translate_filters(env, where_.as_ref(), Scope::node(node))?,
            authorization: authorization_filters(
                env,
                name,
                info,
                Capability::Read,
                &selected_attributes(&fields),
            )?,
            fields,
            sort: vec![],
            pagination: Pagination::default(),
            cardinality: source.cardinality(),
        })
    };

    match target {
        TargetInfo::Entity { name, info } => {
            let fields = fields::translate_node_fields(env, name, info, &[name], field)?;
            let mut operation = read(name, info, fields)?;
            if let Some(search) = fulltext_search(field, target, source)? {
                operation.selection = Selection::Node(NodeSelection {
                    entity: EntityRef::new(name, info),
                    fulltext: Some(search),
                });
            }
            operation.sort = sort;
            operation.pagination = pagination;
            Ok(Operation::Read(operation))
        }
        TargetInfo::Interface { .. } | TargetInfo::Union { .. } => {
            fulltext_search(field, target, source)?;
            let partials = narrowed_entities(env, target, where_.as_ref())?
                .into_iter()
                .map(|(name, info)| {
                    let fields =
                        fields::translate_node_fields(env, name, info, &[target.name(), name], field)?;
                    read(name, info, fields)
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(Operation::CompositeRead(CompositeReadOperation {
                partials,
                sort,
                pagination,
                cardinality: source.cardinality(),
            }))
        }
    }
}

/// `fulltext: { <index>: { phrase } }`, only on root reads of entities.
fn fulltext_search(
    field: &SelectionField,
    target: TargetInfo<'_>,
    source: Source<'_>,
) -> Result<Option<FulltextSearch>, Error> {
    let Some(value) = values::present(field.argument("fulltext")) else {
        return Ok(None);
    };
    let invalid = |message: String| Error::InvalidArgument {
        argument: "fulltext".to_string(),
        message,
    };
    let TargetInfo::Entity { name, info } = target else {
        return Err(invalid(format!("'{}' has no fulltext indexes", target.name())));
    };
    if !source.is_root() {
        return Err(invalid("fulltext search is only available on root fields".to_string()));
    }
    let object = values::as_object("fulltext", value)?;
    let mut entries = object.iter();
    let (Some((index, search)), None) = (entries.next(), entries.next()) else {
        return Err(invalid("expected exactly one index".to_string()));
    };
    let index = info
        .fulltext_indexes
        .get(index.as_str())
        .ok_or_else(|| invalid(format!("'{name}' has no fulltext index '{index}'")))?;
    let phrase = values::as_str(
        "fulltext",
        values::as_object("fulltext", search)?
            .get("phrase")
            .ok_or_else(|| invalid("missing 'phrase'".to_string()))?,
    )?;
    Ok(Some(FulltextSearch {
        index_name: index.index_name.clone(),
        phrase: phrase.to_string(),
    }))
}

/// A connection over a type's nodes, or over the edges of a relationship.
pub fn translate_connection<'env>(
    env: &Env<'env>,
    field: &SelectionField,
    target: TargetInfo<'env>,
    source: Source<'env>,
) -> Result<Operation, Error> {
    target.check_capability(Capability::Read)?;
    let edge = source.edge_fields();
    let where_ = values::present(field.argument("where"))
        .map(|value| {
            where_input::parse_connection_where(env, target.into(), edge, value, &FilterPath::new("where"))
        })
        .transpose()?;
    let sort_keys = sorting::connection_sort(field)?;
    let sort = sort_attributes(&sort_keys, target.into(), edge)?;
    let pagination = sorting::connection_pagination(field, target.limit())?;

    match target {
        TargetInfo::Entity { name, info } => {
            let mut connection_fields = fields::translate_connection_fields(field, edge, &mut |node| {
                fields::translate_node_fields(env, name, info, &[name], node)
            })?;
            let edges = fields::merge_edge_fields(&mut connection_fields);
            Ok(Operation::Connection(ConnectionOperation {
                selection: source.selection(env, target, name, info, field, false)?,
                filters: translate_filters(
                    env,
                    where_.as_ref(),
                    Scope::connection(FieldsInfo::Entity { name, info }, edge),
                )?,
                authorization: authorization_filters(
                    env,
                    name,
                    info,
                    Capability::Read,
                    &node_attributes(&edges),
                )?,
                fields: connection_fields,
                sort,
                pagination,
            }))
        }
        TargetInfo::Interface { .. } | TargetInfo::Union { .. } => {
            let mut connection_fields =
                fields::translate_connection_fields(field, edge, &mut |_| Ok(vec![]))?;
            fields::merge_edge_fields(&mut connection_fields);

            let partials = narrowed_entities(env, target, where_.as_ref())?
                .into_iter()
                .map(|(name, info)| {
                    let mut partial_fields = fields::translate_connection_fields(field, edge, &mut |node| {
                        fields::translate_node_fields(env, name, info, &[target.name(), name], node)
                    })?;
                    let edges = fields::merge_edge_fields(&mut partial_fields);
                    Ok(ConnectionPartial {
                        selection: source.selection(env, target, name, info, field, false)?,
                        filters: translate_filters(
                            env,
                            where_.as_ref(),
                            Scope::connection(FieldsInfo::Entity { name, info }, edge),
                        )?,
                        authorization: authorization_filters(
                            env,
                            name,
                            info,
                            Capability::Read,
                            &node_attributes(&edges),
                        )?,
                        edges,
                    })
                })
                .collect::<Result<Vec<_>, Error>>()?;

            Ok(Operation::CompositeConnection(CompositeConnectionOperation {
                partials,
                fields: connection_fields,
                sort,
                pagination,
            }))
        }
    }
}

/// Attributes of the nodes projected into edges.
fn node_attributes(edges: &[EdgeField]) -> Vec<&FieldName> {
    edges
        .iter()
        .flat_map(|edge| match edge {
            EdgeField::Node { fields, .. } => selected_attributes(fields),
            EdgeField::Properties { .. } | EdgeField::Cursor { .. } | EdgeField::Typename { .. } => {
                vec![]
            }
        })
        .collect()
}

/// Aggregates over a type's nodes, or over the nodes and edges of a relationship.
pub fn translate_aggregation<'env>(
    env: &Env<'env>,
    field: &SelectionField,
    target: TargetInfo<'env>,
    source: Source<'env>,
) -> Result<Operation, Error> {
    target.check_capability(Capability::Aggregate)?;
    let where_ = translate_where_argument(env, field, target.into())?;
    let fields = fields::translate_aggregation_fields(
        field,
        target.into(),
        source.edge_fields(),
        source.is_root(),
    )?;
    let attributes = aggregated_attributes(&fields);

    let partials = narrowed_entities(env, target, where_.as_ref())?
        .into_iter()
        .map(|(name, info)| {
            Ok(AggregationPartial {
                selection: source.selection(env, target, name, info, field, false)?,
                filters: translate_filters(
                    env,
                    where_.as_ref(),
                    Scope::node(FieldsInfo::Entity { name, info }),
                )?,
                authorization: authorization_filters(
                    env,
                    name,
                    info,
                    Capability::Aggregate,
                    &attributes,
                )?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(Operation::Aggregation(AggregationOperation { partials, fields }))
}

fn aggregated_attributes(fields: &[AggregationField]) -> Vec<&FieldName> {
    fields
        .iter()
        .flat_map(|field| match field {
            AggregationField::Attribute {
                target: AggregateTarget::Node,
                attribute,
                ..
            } => vec![&attribute.field_name],
            AggregationField::Group { fields, .. } => aggregated_attributes(fields),
            AggregationField::Attribute { .. }
            | AggregationField::Count { .. }
            | AggregationField::Typename { .. } => vec![],
        })
        .collect()
}

/// Delete the nodes of an entity matching `where`.
pub fn translate_delete<'env>(
    env: &Env<'env>,
    field: &SelectionField,
    name: &'env TypeName,
    info: &'env metadata::EntityInfo,
) -> Result<Operation, Error> {
    let target = TargetInfo::Entity { name, info };
    target.check_capability(Capability::Delete)?;
    let where_ = translate_where_argument(env, field, target.into())?;
    Ok(Operation::Delete(DeleteOperation {
        selection: Selection::Node(NodeSelection::new(EntityRef::new(name, info))),
        filters: translate_filters(env, where_.as_ref(), Scope::node(target.into()))?,
        authorization: authorization_filters(env, name, info, Capability::Delete, &[])?,
        fields: fields::translate_delete_fields(field)?,
    }))
}
