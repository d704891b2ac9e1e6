mod common;

use std::collections::BTreeSet;

use common::{fields, translate};
use proptest::prelude::*;
use query_engine_models::SelectionField;
use serde_json::json;

fn request(title: String, limit: u32, offset: u64, descending: bool) -> SelectionField {
    SelectionField::new("movies")
        .with_argument("where", json!({ "OR": [{ "title_STARTS_WITH": title }, { "year_GT": 1999 }] }))
        .with_argument("sort", json!([{ "year": if descending { "DESC" } else { "ASC" } }]))
        .with_argument("limit", json!(limit))
        .with_argument("offset", json!(offset))
        .with_fields(
            "Movie",
            [
                SelectionField::new("title"),
                SelectionField::new("actors")
                    .with_argument("where", json!({ "name_CONTAINS": "a" }))
                    .with_fields("Person", fields(["name"])),
                SelectionField::new("director").with_fields("Person", fields(["name"])),
                SelectionField::new("actorsAggregate")
                    .with_fields("MoviePersonActorsAggregationSelection", fields(["count"])),
            ],
        )
}

/// Names following `$` in the statement text.
fn referenced_params(text: &str) -> BTreeSet<String> {
    text.split('$')
        .skip(1)
        .map(|rest| {
            rest.chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect()
        })
        .collect()
}

proptest! {
    #[test]
    fn translation_is_deterministic(
        title in "[A-Za-z ]{0,12}",
        limit in 1u32..500,
        offset in 0u64..1000,
        descending in any::<bool>(),
    ) {
        let first = translate(request(title.clone(), limit, offset, descending)).expect("translates");
        let second = translate(request(title, limit, offset, descending)).expect("translates");
        prop_assert_eq!(first.query.query_cypher(), second.query.query_cypher());
    }

    #[test]
    fn every_parameter_is_referenced_once_recorded(
        title in "[A-Za-z ]{0,12}",
        limit in 1u32..500,
        offset in 0u64..1000,
    ) {
        let cypher = translate(request(title, limit, offset, false))
            .expect("translates")
            .query
            .query_cypher();
        let recorded: BTreeSet<String> = cypher.params.keys().cloned().collect();
        prop_assert_eq!(referenced_params(&cypher.cypher), recorded);
    }

    #[test]
    fn node_variables_are_bound_once(
        title in "[A-Za-z ]{0,12}",
        limit in 1u32..500,
    ) {
        let text = translate(request(title, limit, 0, true))
            .expect("translates")
            .query
            .query_cypher()
            .cypher;
        let mut seen = BTreeSet::new();
        for binding in text.split("(this").skip(1) {
            let index: String = binding.chars().take_while(char::is_ascii_digit).collect();
            if binding[index.len()..].starts_with(':') {
                prop_assert!(seen.insert(index), "node variable bound twice in {}", text);
            }
        }
    }
}
