//! Convert the parsed configuration to the runtime configuration used to compile requests.

use super::version1::ParsedConfiguration;
use crate::error::MakeRuntimeConfigurationError;
use crate::settings::CompilerSettings;
use query_engine_metadata::metadata;
use query_engine_models::TypeName;

/// Validate the schema model of a parsed configuration and apply the settings to it.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
) -> Result<crate::Configuration, MakeRuntimeConfigurationError> {
    validate_metadata(&parsed_config.metadata)?;
    Ok(crate::Configuration {
        metadata: apply_settings(parsed_config.metadata, &parsed_config.settings),
        settings: parsed_config.settings,
    })
}

fn validate_metadata(metadata: &metadata::Metadata) -> Result<(), MakeRuntimeConfigurationError> {
    let is_entity = |name: &TypeName| metadata.entities.0.contains_key(name);
    let is_target = |name: &TypeName| {
        is_entity(name)
            || metadata.interfaces.0.contains_key(name)
            || metadata.unions.0.contains_key(name)
    };

    for (name, entity) in &metadata.entities.0 {
        if entity.labels.is_empty() {
            return Err(MakeRuntimeConfigurationError::MissingLabels(name.clone()));
        }
        check_targets(name, &entity.relationships, is_target)?;
        for (index_name, index) in &entity.fulltext_indexes {
            if let Some(field) = index
                .fields
                .iter()
                .find(|field| !entity.attributes.contains_key(*field))
            {
                return Err(MakeRuntimeConfigurationError::UnknownFulltextField {
                    type_name: name.clone(),
                    index: index_name.to_string(),
                    field: field.clone(),
                });
            }
        }
    }

    for (name, interface) in &metadata.interfaces.0 {
        check_targets(name, &interface.relationships, is_target)?;
        if let Some(implementation) = interface
            .implementations
            .iter()
            .find(|implementation| !is_entity(implementation))
        {
            return Err(MakeRuntimeConfigurationError::UnknownImplementation {
                interface: name.clone(),
                implementation: implementation.clone(),
            });
        }
    }

    for (name, union) in &metadata.unions.0 {
        if let Some(member) = union.members.iter().find(|member| !is_entity(member)) {
            return Err(MakeRuntimeConfigurationError::UnknownMember {
                union: name.clone(),
                member: member.clone(),
            });
        }
    }
    Ok(())
}

fn check_targets(
    name: &TypeName,
    relationships: &std::collections::BTreeMap<query_engine_models::FieldName, metadata::RelationshipInfo>,
    is_target: impl Fn(&TypeName) -> bool,
) -> Result<(), MakeRuntimeConfigurationError> {
    match relationships
        .iter()
        .find(|(_, relationship)| !is_target(&relationship.target))
    {
        Some((relationship, info)) => Err(MakeRuntimeConfigurationError::UnknownRelationshipTarget {
            type_name: name.clone(),
            relationship: relationship.clone(),
            target: info.target.clone(),
        }),
        None => Ok(()),
    }
}

/// Types without limit settings of their own get the default limit.
fn apply_settings(mut metadata: metadata::Metadata, settings: &CompilerSettings) -> metadata::Metadata {
    let Some(default_limit) = settings.default_limit else {
        return metadata;
    };
    let default = metadata::LimitSettings {
        default: Some(default_limit),
        max: None,
    };
    for entity in metadata.entities.0.values_mut() {
        entity.limit.get_or_insert(default);
    }
    for interface in metadata.interfaces.0.values_mut() {
        interface.limit.get_or_insert(default);
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(value: serde_json::Value) -> ParsedConfiguration {
        serde_json::from_value(value).expect("valid configuration")
    }

    #[test]
    fn default_limit_fills_in_missing_settings() {
        let configuration = make_runtime_configuration(parsed(json!({
            "version": 1,
            "settings": { "defaultLimit": 25 },
            "metadata": {
                "entities": {
                    "Movie": { "labels": ["Movie"] },
                    "User": { "labels": ["User"], "limit": { "max": 10 } }
                }
            }
        })))
        .expect("valid");
        let entities = &configuration.metadata.entities.0;
        assert_eq!(
            entities[&TypeName::from("Movie")].limit,
            Some(metadata::LimitSettings {
                default: Some(25),
                max: None
            })
        );
        assert_eq!(
            entities[&TypeName::from("User")].limit,
            Some(metadata::LimitSettings {
                default: None,
                max: Some(10)
            })
        );
    }

    #[test]
    fn relationship_targets_must_exist() {
        let result = make_runtime_configuration(parsed(json!({
            "version": 1,
            "metadata": {
                "entities": {
                    "Movie": {
                        "labels": ["Movie"],
                        "relationships": {
                            "actors": {
                                "type": "ACTED_IN",
                                "direction": "IN",
                                "target": "Actor",
                                "cardinality": "MANY"
                            }
                        }
                    }
                }
            }
        })));
        assert!(matches!(
            result,
            Err(MakeRuntimeConfigurationError::UnknownRelationshipTarget { .. })
        ));
    }

    #[test]
    fn union_members_must_be_entities() {
        let result = make_runtime_configuration(parsed(json!({
            "version": 1,
            "metadata": {
                "entities": { "Movie": { "labels": ["Movie"] } },
                "unions": { "SearchResult": { "members": ["Movie", "Book"] } }
            }
        })));
        assert_eq!(
            result.map(|_| ()),
            Err(MakeRuntimeConfigurationError::UnknownMember {
                union: "SearchResult".into(),
                member: "Book".into(),
            })
        );
    }

    #[test]
    fn entities_need_labels() {
        let result = make_runtime_configuration(parsed(json!({
            "version": 1,
            "metadata": { "entities": { "Movie": { "labels": [] } } }
        })));
        assert!(matches!(result, Err(MakeRuntimeConfigurationError::MissingLabels(_))));
    }

    #[test]
    fn fulltext_fields_must_be_attributes() {
        let result = make_runtime_configuration(parsed(json!({
            "version": 1,
            "metadata": {
                "entities": {
                    "Movie": {
                        "labels": ["Movie"],
                        "attributes": { "title": { "type": "String" } },
                        "fulltextIndexes": {
                            "MovieText": { "indexName": "movieText", "fields": ["title", "plot"] }
                        }
                    }
                }
            }
        })));
        assert!(matches!(
            result,
            Err(MakeRuntimeConfigurationError::UnknownFulltextField { .. })
        ));
    }
}
