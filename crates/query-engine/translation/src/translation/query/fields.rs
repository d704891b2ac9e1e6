//! Translate requested fields into the fields of the query AST.

use smol_str::SmolStr;

use super::operations::{self, RelationshipField};
use crate::translation::ast::fields::{
    AggregationField, ConnectionField, EdgeField, Field, PageInfoField,
};
use crate::translation::ast::operations::DeleteField;
use crate::translation::error::Error;
use crate::translation::helpers::{Env, FieldsInfo};
use crate::translation::where_input::{AggregateTarget, AggregationFunction};
use query_engine_metadata::metadata;
use query_engine_models::{FieldName, SelectionField, TypeName, TYPENAME_FIELD};

fn output_key(field: &SelectionField) -> SmolStr {
    field.output_key().clone().into()
}

fn not_found(type_name: &TypeName, field: &SelectionField) -> Error {
    Error::FieldNotFound {
        type_name: type_name.clone(),
        field: field.name.clone(),
    }
}

/// The nested fields of a wrapper object (a connection, an edge, page info or an
/// aggregate), each with the generated type name it was requested on.
pub fn wrapper_fields(field: &SelectionField) -> Vec<(&TypeName, &SelectionField)> {
    let mut seen: Vec<&FieldName> = vec![];
    let mut fields = vec![];
    for (type_name, type_fields) in &field.fields_by_type_name {
        for nested in type_fields {
            if !seen.contains(&nested.output_key()) {
                seen.push(nested.output_key());
                fields.push((type_name, nested));
            }
        }
    }
    fields
}

/// Fields of a node of the concrete type `name`. `type_names` are the types whose
/// selections apply: the declared type of the field, then the concrete type.
pub fn translate_node_fields<'env>(
    env: &Env<'env>,
    name: &'env TypeName,
    info: &'env metadata::EntityInfo,
    type_names: &[&TypeName],
    field: &SelectionField,
) -> Result<Vec<Field>, Error> {
    field
        .fields_for(type_names)
        .into_iter()
        .map(|nested| translate_node_field(env, name, info, nested))
        .collect()
}

fn translate_node_field<'env>(
    env: &Env<'env>,
    name: &'env TypeName,
    info: &'env metadata::EntityInfo,
    field: &SelectionField,
) -> Result<Field, Error> {
    let key = output_key(field);
    if field.name.as_str() == TYPENAME_FIELD {
        return Ok(Field::Typename {
            output_key: key,
            type_name: name.clone().into(),
        });
    }

    let fields = FieldsInfo::Entity { name, info };
    let field_name = field.name.as_str();
    if fields.find_attribute(field_name).is_some() {
        return Ok(Field::Attribute {
            output_key: key,
            attribute: fields.lookup_attribute(&field.name)?,
        });
    }

    let relationship = [
        (field_name, RelationshipField::Read),
        (field_name.strip_suffix("Connection").unwrap_or_default(), RelationshipField::Connection),
        (field_name.strip_suffix("Aggregate").unwrap_or_default(), RelationshipField::Aggregate),
    ]
    .into_iter()
    .find_map(|(relationship_name, kind)| {
        fields
            .find_relationship(relationship_name)
            .map(|(relationship_name, relationship)| (relationship_name, relationship, kind))
    });
    match relationship {
        Some((relationship_name, relationship, kind)) => Ok(Field::Operation {
            output_key: key,
            operation: Box::new(operations::translate_relationship_field(
                env,
                relationship_name,
                relationship,
                field,
                kind,
            )?),
        }),
        None => Err(not_found(name, field)),
    }
}

/// Attributes of the relationship itself.
pub fn translate_property_fields(
    properties: FieldsInfo<'_>,
    field: &SelectionField,
) -> Result<Vec<Field>, Error> {
    field
        .fields()
        .into_iter()
        .map(|nested| {
            if nested.name.as_str() == TYPENAME_FIELD {
                Ok(Field::Typename {
                    output_key: output_key(nested),
                    type_name: properties.type_name().into(),
                })
            } else {
                Ok(Field::Attribute {
                    output_key: output_key(nested),
                    attribute: properties.lookup_attribute(&nested.name)?,
                })
            }
        })
        .collect()
}

/// Attributes projected by a list of fields, for attribute-level authorization.
pub fn selected_attributes(fields: &[Field]) -> Vec<&FieldName> {
    fields
        .iter()
        .filter_map(|field| match field {
            Field::Attribute { attribute, .. } => Some(&attribute.field_name),
            Field::Typename { .. } | Field::Operation { .. } => None,
        })
        .collect()
}

/// Fields of a connection. `node_fields` resolves the selection of `edges.node`.
pub fn translate_connection_fields(
    field: &SelectionField,
    edge: Option<FieldsInfo<'_>>,
    node_fields: &mut dyn FnMut(&SelectionField) -> Result<Vec<Field>, Error>,
) -> Result<Vec<ConnectionField>, Error> {
    wrapper_fields(field)
        .into_iter()
        .map(|(type_name, nested)| {
            let key = output_key(nested);
            Ok(match nested.name.as_str() {
                "totalCount" => ConnectionField::TotalCount { output_key: key },
                "edges" => ConnectionField::Edges {
                    output_key: key,
                    fields: translate_edge_fields(nested, edge, node_fields)?,
                },
                "pageInfo" => ConnectionField::PageInfo {
                    output_key: key,
                    fields: translate_page_info_fields(nested)?,
                },
                TYPENAME_FIELD => ConnectionField::Typename {
                    output_key: key,
                    type_name: type_name.clone().into(),
                },
                _ => return Err(not_found(type_name, nested)),
            })
        })
        .collect()
}

fn translate_edge_fields(
    field: &SelectionField,
    edge: Option<FieldsInfo<'_>>,
    node_fields: &mut dyn FnMut(&SelectionField) -> Result<Vec<Field>, Error>,
) -> Result<Vec<EdgeField>, Error> {
    wrapper_fields(field)
        .into_iter()
        .map(|(type_name, nested)| {
            let key = output_key(nested);
            Ok(match nested.name.as_str() {
                "node" => EdgeField::Node {
                    output_key: key,
                    fields: node_fields(nested)?,
                },
                "properties" => {
                    let properties = edge.ok_or_else(|| Error::UnsupportedField {
                        field: nested.name.clone(),
                        message: "the relationship has no properties".to_string(),
                    })?;
                    EdgeField::Properties {
                        output_key: key,
                        fields: translate_property_fields(properties, nested)?,
                    }
                }
                "cursor" => EdgeField::Cursor { output_key: key },
                TYPENAME_FIELD => EdgeField::Typename {
                    output_key: key,
                    type_name: type_name.clone().into(),
                },
                _ => return Err(not_found(type_name, nested)),
            })
        })
        .collect()
}

fn translate_page_info_fields(field: &SelectionField) -> Result<Vec<PageInfoField>, Error> {
    wrapper_fields(field)
        .into_iter()
        .map(|(type_name, nested)| {
            let key = output_key(nested);
            Ok(match nested.name.as_str() {
                "hasNextPage" => PageInfoField::HasNextPage { output_key: key },
                "hasPreviousPage" => PageInfoField::HasPreviousPage { output_key: key },
                "startCursor" => PageInfoField::StartCursor { output_key: key },
                "endCursor" => PageInfoField::EndCursor { output_key: key },
                TYPENAME_FIELD => PageInfoField::Typename {
                    output_key: key,
                    type_name: type_name.clone().into(),
                },
                _ => return Err(not_found(type_name, nested)),
            })
        })
        .collect()
}

/// Merge the edge fields of every `edges` selection of a connection into one field
/// per output key, and make every selection carry the merged node and property
/// fields. The edge maps are built once, from the merged fields.
pub fn merge_edge_fields(fields: &mut [ConnectionField]) -> Vec<EdgeField> {
    let mut merged: Vec<EdgeField> = vec![];
    for field in fields.iter().flat_map(ConnectionField::edge_fields) {
        match merged
            .iter_mut()
            .find(|existing| existing.output_key() == field.output_key())
        {
            None => merged.push(field.clone()),
            Some(
                EdgeField::Node {
                    fields: existing, ..
                }
                | EdgeField::Properties {
                    fields: existing, ..
                },
            ) => {
                if let EdgeField::Node { fields, .. } | EdgeField::Properties { fields, .. } = field {
                    for nested in fields {
                        if !existing
                            .iter()
                            .any(|known| known.output_key() == nested.output_key())
                        {
                            existing.push(nested.clone());
                        }
                    }
                }
            }
            Some(_) => {}
        }
    }

    for field in fields.iter_mut() {
        if let ConnectionField::Edges { fields, .. } = field {
            for edge_field in fields.iter_mut() {
                if let Some(replacement) = merged
                    .iter()
                    .find(|known| known.output_key() == edge_field.output_key())
                {
                    *edge_field = replacement.clone();
                }
            }
        }
    }
    merged
}

/// Fields of an aggregation result.
pub fn translate_aggregation_fields(
    field: &SelectionField,
    node: FieldsInfo<'_>,
    edge: Option<FieldsInfo<'_>>,
    root: bool,
) -> Result<Vec<AggregationField>, Error> {
    wrapper_fields(field)
        .into_iter()
        .map(|(type_name, nested)| {
            let key = output_key(nested);
            match nested.name.as_str() {
                "count" if nested.fields_by_type_name.is_empty() => Ok(AggregationField::Count {
                    output_key: key,
                    target: AggregateTarget::Node,
                }),
                "count" => Ok(AggregationField::Group {
                    output_key: key,
                    fields: translate_count_fields(nested, root)?,
                }),
                "node" => Ok(AggregationField::Group {
                    output_key: key,
                    fields: translate_attribute_aggregations(nested, node, AggregateTarget::Node)?,
                }),
                "edge" => {
                    let properties = edge.filter(|_| !root).ok_or_else(|| Error::UnsupportedField {
                        field: nested.name.clone(),
                        message: "edge aggregates need a relationship with properties".to_string(),
                    })?;
                    Ok(AggregationField::Group {
                        output_key: key,
                        fields: translate_attribute_aggregations(
                            nested,
                            properties,
                            AggregateTarget::Edge,
                        )?,
                    })
                }
                TYPENAME_FIELD => Ok(AggregationField::Typename {
                    output_key: key,
                    type_name: type_name.clone().into(),
                }),
                name if node.find_attribute(name).is_some() => {
                    translate_attribute_aggregation(nested, node, AggregateTarget::Node)
                }
                _ => Err(not_found(type_name, nested)),
            }
        })
        .collect()
}

fn translate_count_fields(field: &SelectionField, root: bool) -> Result<Vec<AggregationField>, Error> {
    wrapper_fields(field)
        .into_iter()
        .map(|(type_name, nested)| {
            let key = output_key(nested);
            match nested.name.as_str() {
                "nodes" => Ok(AggregationField::Count {
                    output_key: key,
                    target: AggregateTarget::Node,
                }),
                "edges" if root => Err(Error::UnsupportedField {
                    field: nested.name.clone(),
                    message: "edges can only be counted on relationships".to_string(),
                }),
                "edges" => Ok(AggregationField::Count {
                    output_key: key,
                    target: AggregateTarget::Edge,
                }),
                TYPENAME_FIELD => Ok(AggregationField::Typename {
                    output_key: key,
                    type_name: type_name.clone().into(),
                }),
                _ => Err(not_found(type_name, nested)),
            }
        })
        .collect()
}

fn translate_attribute_aggregations(
    field: &SelectionField,
    fields: FieldsInfo<'_>,
    target: AggregateTarget,
) -> Result<Vec<AggregationField>, Error> {
    wrapper_fields(field)
        .into_iter()
        .map(|(type_name, nested)| {
            if nested.name.as_str() == TYPENAME_FIELD {
                Ok(AggregationField::Typename {
                    output_key: output_key(nested),
                    type_name: type_name.clone().into(),
                })
            } else {
                translate_attribute_aggregation(nested, fields, target)
            }
        })
        .collect()
}

/// `title { shortestLength longestLength }`
fn translate_attribute_aggregation(
    field: &SelectionField,
    fields: FieldsInfo<'_>,
    target: AggregateTarget,
) -> Result<AggregationField, Error> {
    let attribute = fields.lookup_attribute(&field.name)?;
    if attribute.list {
        return Err(Error::UnsupportedField {
            field: field.name.clone(),
            message: "list attributes cannot be aggregated".to_string(),
        });
    }
    let functions = wrapper_fields(field)
        .into_iter()
        .map(|(_, nested)| {
            aggregation_function(attribute.r#type, nested.name.as_str())
                .map(|function| (output_key(nested), function))
                .ok_or_else(|| Error::UnsupportedField {
                    field: nested.name.clone(),
                    message: format!("not an aggregate of {:?} attributes", attribute.r#type),
                })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(AggregationField::Attribute {
        output_key: output_key(field),
        target,
        attribute,
        functions,
    })
}

/// The function behind an aggregate field name. String aggregates range over the
/// length; `shortest` and `longest` are the older names of the length aggregates.
fn aggregation_function(r#type: metadata::ScalarType, name: &str) -> Option<AggregationFunction> {
    if r#type.is_textual() {
        match name {
            "shortest" | "shortestLength" => Some(AggregationFunction::Min),
            "longest" | "longestLength" => Some(AggregationFunction::Max),
            "averageLength" => Some(AggregationFunction::Average),
            _ => None,
        }
    } else if r#type.is_numeric() {
        match name {
            "min" => Some(AggregationFunction::Min),
            "max" => Some(AggregationFunction::Max),
            "average" => Some(AggregationFunction::Average),
            "sum" => Some(AggregationFunction::Sum),
            _ => None,
        }
    } else if r#type.is_temporal() {
        match name {
            "min" => Some(AggregationFunction::Min),
            "max" => Some(AggregationFunction::Max),
            _ => None,
        }
    } else {
        None
    }
}

/// Fields of a delete result.
pub fn translate_delete_fields(field: &SelectionField) -> Result<Vec<DeleteField>, Error> {
    wrapper_fields(field)
        .into_iter()
        .map(|(type_name, nested)| {
            let key = output_key(nested);
            match nested.name.as_str() {
                "nodesDeleted" => Ok(DeleteField::NodesDeleted { output_key: key }),
                TYPENAME_FIELD => Ok(DeleteField::Typename {
                    output_key: key,
                    type_name: type_name.clone().into(),
                }),
                "relationshipsDeleted" => Err(Error::UnsupportedField {
                    field: nested.name.clone(),
                    message: "deleted relationships are not counted".to_string(),
                }),
                _ => Err(not_found(type_name, nested)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::helpers::AttributeRef;
    use std::collections::BTreeMap;

    fn properties() -> metadata::RelationshipPropertiesInfo {
        metadata::RelationshipPropertiesInfo {
            type_name: "ActedIn".into(),
            attributes: BTreeMap::from([
                ("role".into(), metadata::AttributeInfo::new(metadata::ScalarType::String)),
                ("screenTime".into(), metadata::AttributeInfo::new(metadata::ScalarType::Int)),
            ]),
        }
    }

    #[test]
    fn deprecated_and_current_string_aggregates_agree() {
        let info = properties();
        let fields = FieldsInfo::RelationshipProperties { info: &info };
        let request = |shortest: &str, longest: &str| {
            SelectionField::new("role").with_fields(
                "StringAggregateSelection",
                [
                    SelectionField::new(shortest).with_alias("short"),
                    SelectionField::new(longest).with_alias("long"),
                ],
            )
        };
        let deprecated =
            translate_attribute_aggregation(&request("shortest", "longest"), fields, AggregateTarget::Edge);
        let current = translate_attribute_aggregation(
            &request("shortestLength", "longestLength"),
            fields,
            AggregateTarget::Edge,
        );
        assert!(deprecated.is_ok());
        assert_eq!(deprecated, current);
    }

    #[test]
    fn numeric_functions_are_rejected_on_strings() {
        let info = properties();
        let field = SelectionField::new("role")
            .with_fields("StringAggregateSelection", [SelectionField::new("sum")]);
        let result = translate_attribute_aggregation(
            &field,
            FieldsInfo::RelationshipProperties { info: &info },
            AggregateTarget::Edge,
        );
        assert!(matches!(result, Err(Error::UnsupportedField { .. })));
    }

    #[test]
    fn edge_counts_are_not_available_at_the_root() {
        let info = properties();
        let field = SelectionField::new("moviesAggregate").with_fields(
            "MovieAggregateSelection",
            [SelectionField::new("count")
                .with_fields("Count", [SelectionField::new("nodes"), SelectionField::new("edges")])],
        );
        let result = translate_aggregation_fields(
            &field,
            FieldsInfo::RelationshipProperties { info: &info },
            None,
            true,
        );
        assert!(matches!(result, Err(Error::UnsupportedField { .. })));
    }

    #[test]
    fn merged_edges_keep_every_requested_node_field() {
        let title = |key: &str| Field::Attribute {
            output_key: key.into(),
            attribute: AttributeRef {
                field_name: key.into(),
                db_name: key.into(),
                r#type: metadata::ScalarType::String,
                list: false,
            },
        };
        let edges = |fields: Vec<Field>| ConnectionField::Edges {
            output_key: "edges".into(),
            fields: vec![EdgeField::Node {
                output_key: "node".into(),
                fields,
            }],
        };
        let mut fields = vec![edges(vec![title("title")]), edges(vec![title("year"), title("title")])];
        let merged = merge_edge_fields(&mut fields);
        let expected = vec![EdgeField::Node {
            output_key: "node".into(),
            fields: vec![title("title"), title("year")],
        }];
        assert_eq!(merged, expected);
        assert_eq!(fields[0].edge_fields(), expected.as_slice());
        assert_eq!(fields[1].edge_fields(), expected.as_slice());
    }

    #[test]
    fn delete_counts_nodes_only() {
        let field = SelectionField::new("deletePosts").with_fields(
            "DeleteInfo",
            [SelectionField::new("nodesDeleted"), SelectionField::new("relationshipsDeleted")],
        );
        assert!(matches!(
            translate_delete_fields(&field),
            Err(Error::UnsupportedField { .. })
        ));
    }
}
