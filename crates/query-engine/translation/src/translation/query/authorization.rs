//! Turn the declarative authorization annotations of the schema into filters.
//!
//! Each annotation yields at most one exclusion filter (its filter rules) and one
//! validation filter (its validate rules). Rules of one kind are OR-ed; separate
//! annotations, such as the entity's and a selected attribute's, are AND-ed by being
//! separate filters of the operation.

use super::filtering::{translate_where, Scope};
use crate::translation::ast::filters::{
    AuthorizationFilter, AuthorizationMode, AuthorizationRuleFilter, Filter, LogicalFilter,
    LogicalOperator,
};
use crate::translation::error::Error;
use crate::translation::helpers::{EntityRef, Env, FieldsInfo, TargetInfo};
use crate::translation::where_input::{self, FilterPath};
use query_engine_metadata::metadata;
use query_engine_models::{FieldName, TypeName};

/// Filters enforcing the rules of `entity` and of the selected `attributes` for an
/// operation with the given capability.
pub fn authorization_filters<'env>(
    env: &Env<'env>,
    name: &'env TypeName,
    info: &'env metadata::EntityInfo,
    capability: metadata::Capability,
    attributes: &[&FieldName],
) -> Result<Vec<Filter>, Error> {
    let fields = FieldsInfo::Entity { name, info };
    let mut filters = vec![];
    if let Some(annotation) = &info.authorization {
        filters.extend(annotation_filters(
            env,
            fields,
            annotation,
            capability,
            &FilterPath::new(name.as_str()),
        )?);
    }
    let mut seen: Vec<&FieldName> = vec![];
    for &attribute in attributes {
        if seen.contains(&attribute) {
            continue;
        }
        seen.push(attribute);
        if let Some((field_name, attribute_info)) = fields.find_attribute(attribute.as_str()) {
            if let Some(annotation) = &attribute_info.authorization {
                filters.extend(annotation_filters(
                    env,
                    fields,
                    annotation,
                    capability,
                    &FilterPath::new(name.as_str()).key(field_name.as_str()),
                )?);
            }
        }
    }
    Ok(filters)
}

/// The read filter rules of a related type, applied to the candidates of a
/// relationship filter so that hidden nodes never satisfy it.
pub fn visibility_filters<'env>(
    env: &Env<'env>,
    target: TargetInfo<'env>,
) -> Result<Vec<Filter>, Error> {
    let entities = target.concrete_entities(env)?;
    let mut alternatives = vec![];
    let mut restricted = false;
    for &(name, info) in &entities {
        let filters = match &info.authorization {
            Some(annotation) => exclusion_filter(
                env,
                FieldsInfo::Entity { name, info },
                annotation,
                metadata::Capability::Read,
                &FilterPath::new(name.as_str()),
            )?
            .into_iter()
            .collect(),
            None => vec![],
        };
        restricted = restricted || !filters.is_empty();
        alternatives.push((EntityRef::new(name, info), filters));
    }

    if !restricted {
        return Ok(vec![]);
    }
    if let (TargetInfo::Entity { .. }, [(_, filters)]) = (target, alternatives.as_slice()) {
        return Ok(filters.clone());
    }
    Ok(vec![Filter::Logical(LogicalFilter {
        operator: LogicalOperator::Or,
        filters: alternatives
            .into_iter()
            .map(|(entity, filters)| {
                Filter::Logical(LogicalFilter {
                    operator: LogicalOperator::And,
                    filters: std::iter::once(Filter::Typename(vec![entity]))
                        .chain(filters)
                        .collect(),
                })
            })
            .collect(),
    })])
}

fn annotation_filters<'env>(
    env: &Env<'env>,
    fields: FieldsInfo<'env>,
    annotation: &'env metadata::AuthorizationAnnotation,
    capability: metadata::Capability,
    path: &FilterPath,
) -> Result<Vec<Filter>, Error> {
    let mut filters: Vec<Filter> = exclusion_filter(env, fields, annotation, capability, path)?
        .into_iter()
        .collect();

    let path = path.key("validate");
    let rules = annotation
        .validate
        .iter()
        .enumerate()
        .filter(|(_, rule)| {
            rule.operations.contains(&capability)
                && rule.when.contains(&metadata::ValidationTime::Before)
        })
        .map(|(index, rule)| {
            rule_filter(
                env,
                fields,
                rule.require_authentication,
                rule.r#where.as_ref(),
                &path.index(index),
            )
        })
        .collect::<Result<Vec<_>, Error>>()?;
    if !rules.is_empty() {
        filters.push(Filter::Authorization(AuthorizationFilter {
            mode: AuthorizationMode::Validation,
            rules,
        }));
    }
    Ok(filters)
}

fn exclusion_filter<'env>(
    env: &Env<'env>,
    fields: FieldsInfo<'env>,
    annotation: &'env metadata::AuthorizationAnnotation,
    capability: metadata::Capability,
    path: &FilterPath,
) -> Result<Option<Filter>, Error> {
    let path = path.key("filter");
    let rules = annotation
        .filter
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.operations.contains(&capability))
        .map(|(index, rule)| {
            rule_filter(
                env,
                fields,
                rule.require_authentication,
                rule.r#where.as_ref(),
                &path.index(index),
            )
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok((!rules.is_empty()).then_some(Filter::Authorization(AuthorizationFilter {
        mode: AuthorizationMode::Exclusion,
        rules,
    })))
}

fn rule_filter<'env>(
    env: &Env<'env>,
    fields: FieldsInfo<'env>,
    require_authentication: bool,
    r#where: Option<&serde_json::Value>,
    path: &FilterPath,
) -> Result<AuthorizationRuleFilter, Error> {
    let filters = match r#where {
        Some(value) => {
            let expr =
                where_input::parse_authorization_where(env, fields, value, &path.key("where"))?;
            vec![translate_where(env, &expr, Scope::node(fields).without_visibility())?]
        }
        None => vec![],
    };
    Ok(AuthorizationRuleFilter {
        authentication: require_authentication.then(|| env.is_authenticated_param()),
        filters,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use query_engine_models::RequestContext;

    fn metadata() -> metadata::Metadata {
        serde_json::from_value(json!({
            "entities": {
                "Post": {
                    "labels": ["Post"],
                    "attributes": {
                        "title": { "type": "String" },
                        "draft": {
                            "type": "Boolean",
                            "authorization": {
                                "validate": [{ "when": ["AFTER"], "where": { "jwt": { "admin": true } } }]
                            }
                        },
                        "author": {
                            "type": "ID",
                            "authorization": {
                                "validate": [{ "where": { "node": { "author": "$jwt.sub" } } }]
                            }
                        }
                    },
                    "authorization": {
                        "filter": [
                            { "operations": ["READ"], "requireAuthentication": false, "where": { "node": { "draft": false } } },
                            { "operations": ["DELETE"], "where": { "node": { "author": "$jwt.sub" } } }
                        ]
                    }
                },
                "Comment": { "labels": ["Comment"] }
            },
            "unions": { "Feed": { "members": ["Post", "Comment"] } }
        }))
        .expect("valid metadata")
    }

    fn filters_for(capability: metadata::Capability, attributes: &[&str]) -> Vec<Filter> {
        let metadata = metadata();
        let context = RequestContext::anonymous();
        let env = Env::new(&metadata, &context);
        let (name, info) = env.lookup_entity(&"Post".into()).expect("entity");
        let attributes: Vec<FieldName> = attributes.iter().map(|&name| name.into()).collect();
        let attributes: Vec<&FieldName> = attributes.iter().collect();
        authorization_filters(&env, name, info, capability, &attributes).expect("filters")
    }

    fn modes(filters: &[Filter]) -> Vec<(AuthorizationMode, usize)> {
        filters
            .iter()
            .filter_map(|filter| match filter {
                Filter::Authorization(filter) => Some((filter.mode, filter.rules.len())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn filter_rules_apply_per_capability() {
        let read = filters_for(metadata::Capability::Read, &["title"]);
        assert_eq!(modes(&read), vec![(AuthorizationMode::Exclusion, 1)]);
        let Filter::Authorization(filter) = &read[0] else {
            panic!("expected an authorization filter");
        };
        assert!(filter.rules[0].authentication.is_none());

        let delete = filters_for(metadata::Capability::Delete, &[]);
        let Filter::Authorization(filter) = &delete[0] else {
            panic!("expected an authorization filter");
        };
        assert!(filter.rules[0].authentication.is_some());

        assert!(filters_for(metadata::Capability::Aggregate, &[]).is_empty());
    }

    #[test]
    fn attribute_rules_apply_once_and_only_before() {
        let filters = filters_for(metadata::Capability::Read, &["author", "draft", "author"]);
        assert_eq!(
            modes(&filters),
            vec![
                (AuthorizationMode::Exclusion, 1),
                (AuthorizationMode::Validation, 1),
            ]
        );
    }

    #[test]
    fn visibility_of_a_union_checks_each_member() {
        let metadata = metadata();
        let context = RequestContext::anonymous();
        let env = Env::new(&metadata, &context);
        let target = env.lookup_target(&"Feed".into()).expect("union");
        let filters = visibility_filters(&env, target).expect("filters");
        let [Filter::Logical(LogicalFilter {
            operator: LogicalOperator::Or,
            filters: alternatives,
        })] = filters.as_slice()
        else {
            panic!("expected one alternative per member, got {filters:?}");
        };
        assert_eq!(alternatives.len(), 2);
    }

    #[test]
    fn unrestricted_targets_need_no_visibility_filter() {
        let metadata = metadata();
        let context = RequestContext::anonymous();
        let env = Env::new(&metadata, &context);
        let target = env.lookup_target(&"Comment".into()).expect("entity");
        assert!(visibility_filters(&env, target).expect("filters").is_empty());
    }
}
