mod common;

use common::{cypher, fields, jwt, translate, translate_as};
use query_engine_cypher::cypher::execution_plan::{QueryKind, ResultShape};
use query_engine_cypher::cypher::helpers::FORBIDDEN_SIGNAL;
use query_engine_models::SelectionField;
use query_engine_translation::translation::error::Error;
use query_engine_translation::translation::query::sorting::encode_cursor;
use serde_json::json;

fn movies() -> SelectionField {
    SelectionField::new("movies")
}

#[test]
fn root_read_filters_sorts_and_limits() {
    let field = movies()
        .with_argument("where", json!({ "title": "Up" }))
        .with_argument("sort", json!([{ "title": "ASC" }]))
        .with_argument("limit", json!(5))
        .with_fields("Movie", fields(["title"]));
    let plan = translate(field).expect("translates");
    assert_eq!(plan.root_field, "movies");
    assert_eq!(plan.query.kind, QueryKind::Read);
    assert_eq!(plan.query.result_shape, ResultShape::List);

    let cypher = plan.query.query_cypher();
    assert_eq!(
        cypher.cypher,
        [
            "MATCH (this0:Movie)",
            "WHERE this0.title = $param0",
            "WITH *",
            "ORDER BY this0.title ASC",
            "LIMIT $param1",
            "RETURN this0 { .title } AS this",
        ]
        .join("\n")
    );
    assert_eq!(cypher.params.get("param0"), Some(&json!("Up")));
}

#[test]
fn alias_names_the_result() {
    let plan = translate(movies().with_alias("films").with_fields("Movie", fields(["title"])))
        .expect("translates");
    assert_eq!(plan.root_field, "films");
}

#[test]
fn unknown_root_fields_are_rejected() {
    assert!(matches!(
        translate(SelectionField::new("documentaries")),
        Err(Error::RootFieldNotFound(_))
    ));
}

#[test]
fn unknown_attributes_are_rejected() {
    assert!(matches!(
        translate(movies().with_fields("Movie", fields(["budget"]))),
        Err(Error::FieldNotFound { .. })
    ));
}

#[test]
fn excluded_operations_are_rejected() {
    let field = SelectionField::new("deleteUsers").with_fields("DeleteInfo", fields(["nodesDeleted"]));
    assert!(matches!(
        translate(field),
        Err(Error::CapabilityNotAllowed { .. })
    ));
}

#[test]
fn delete_is_a_write_returning_one_object() {
    let field = SelectionField::new("deleteMovies")
        .with_argument("where", json!({ "year_LT": 1950 }))
        .with_fields("DeleteInfo", fields(["nodesDeleted"]));
    let plan = translate(field).expect("translates");
    assert_eq!(plan.query.kind, QueryKind::Write);
    assert_eq!(plan.query.result_shape, ResultShape::Object);
    assert!(plan.query.query_cypher().cypher.contains("DETACH DELETE this0"));
}

#[test]
fn nested_to_one_reads_are_optional() {
    let text = cypher(movies().with_fields(
        "Movie",
        [
            SelectionField::new("title"),
            SelectionField::new("director").with_fields("Person", fields(["name"])),
        ],
    ));
    assert!(text.contains("OPTIONAL MATCH (this0)<-[rel1:DIRECTED]-(this2:Person)"));
    assert!(text.contains("head(collect("));
}

#[test]
fn interface_reads_union_their_implementations() {
    let field = SelectionField::new("productions")
        .with_argument("sort", json!([{ "title": "DESC" }]))
        .with_fields("Production", fields(["title"]));
    let plan = translate(field).expect("translates");
    assert_eq!(plan.query.result_shape, ResultShape::List);
    let text = plan.query.query_cypher().cypher;
    assert!(text.contains(":Movie"));
    assert!(text.contains(":Series"));
    assert!(text.contains("UNION ALL"));
    assert!(text.contains("DESC"));
}

#[test]
fn interface_reads_concatenate_the_reads_of_each_implementation() {
    let field = SelectionField::new("productions").with_fields("Production", fields(["title"]));
    assert_eq!(
        cypher(field),
        [
            "CALL {",
            "    MATCH (this1:Movie)",
            "    RETURN this1 { .title } AS var0",
            "    UNION ALL",
            "    MATCH (this2:Series)",
            "    RETURN this2 { .title } AS var0",
            "}",
            "RETURN var0 AS this",
        ]
        .join("\n")
    );
}

#[test]
fn composite_branches_keep_duplicate_rows() {
    let reads = [
        SelectionField::new("productions").with_fields("Production", fields(["title"])),
        SelectionField::new("searchResults")
            .with_fields("Movie", fields(["title"]))
            .with_fields("Person", fields(["name"])),
        SelectionField::new("productionsConnection").with_fields(
            "ProductionsConnection",
            [SelectionField::new("edges").with_fields(
                "ProductionEdge",
                [SelectionField::new("node").with_fields("Production", fields(["title"]))],
            )],
        ),
    ];
    for read in reads {
        let text = cypher(read);
        let joins: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("UNION"))
            .collect();
        assert_eq!(joins, vec!["UNION ALL"], "{text}");
    }
}

#[test]
fn composite_sort_keys_stay_out_of_the_projection() {
    let field = SelectionField::new("productions")
        .with_argument("sort", json!([{ "title": "DESC" }]))
        .with_fields("Production", fields(["__typename"]));
    let text = cypher(field);
    assert!(text.contains("this2.title AS var1"), "{text}");
    assert!(text.contains("this3.title AS var1"), "{text}");
    assert!(text.contains("ORDER BY var1 DESC"), "{text}");
    assert!(!text.contains(".title }"), "{text}");
    assert!(!text.contains("{ .title"), "{text}");
    assert!(text.ends_with("RETURN var0 AS this"), "{text}");
}

#[test]
fn typename_filters_narrow_the_fan_out() {
    let field = SelectionField::new("productions")
        .with_argument("where", json!({ "typename": ["Series"] }))
        .with_fields("Production", fields(["title"]));
    let text = cypher(field);
    assert!(text.contains(":Series"));
    assert!(!text.contains(":Movie"));
}

#[test]
fn union_member_filters_narrow_the_fan_out() {
    let field = SelectionField::new("searchResults")
        .with_argument("where", json!({ "Person": { "name": "Ada" } }))
        .with_fields("Person", fields(["name"]));
    let text = cypher(field);
    assert!(text.contains(":Person"));
    assert!(!text.contains(":Movie"));
}

#[test]
fn fulltext_search_uses_the_index() {
    let field = movies()
        .with_argument("fulltext", json!({ "MovieTitle": { "phrase": "matrix" } }))
        .with_fields("Movie", fields(["title"]));
    let cypher = translate(field).expect("translates").query.query_cypher();
    assert!(cypher.cypher.contains("db.index.fulltext.queryNodes"));
    assert!(cypher.cypher.contains("\"movieTitles\""));
    assert!(cypher.params.values().any(|value| value == &json!("matrix")));
}

#[test]
fn fulltext_search_needs_a_known_index_on_an_entity() {
    let unknown = movies()
        .with_argument("fulltext", json!({ "Plot": { "phrase": "heist" } }))
        .with_fields("Movie", fields(["title"]));
    assert!(matches!(translate(unknown), Err(Error::InvalidArgument { .. })));

    let abstract_target = SelectionField::new("productions")
        .with_argument("fulltext", json!({ "MovieTitle": { "phrase": "heist" } }))
        .with_fields("Production", fields(["title"]));
    assert!(matches!(
        translate(abstract_target),
        Err(Error::InvalidArgument { .. })
    ));
}

#[test]
fn connections_return_one_object() {
    let field = SelectionField::new("moviesConnection")
        .with_argument("first", json!(10))
        .with_argument("after", json!(encode_cursor(19)))
        .with_fields(
            "MoviesConnection",
            [
                SelectionField::new("totalCount"),
                SelectionField::new("edges").with_fields(
                    "MovieEdge",
                    [
                        SelectionField::new("cursor"),
                        SelectionField::new("node").with_fields("Movie", fields(["title"])),
                    ],
                ),
                SelectionField::new("pageInfo").with_fields("PageInfo", fields(["hasNextPage"])),
            ],
        );
    let plan = translate(field).expect("translates");
    assert_eq!(plan.query.result_shape, ResultShape::Object);
    let cypher = plan.query.query_cypher();
    assert!(cypher.cypher.contains("SKIP $param"));
    assert!(cypher.params.values().any(|value| value == &json!(20)));
    assert!(cypher.cypher.contains("apoc.text.base64Encode"));
}

#[test]
fn malformed_cursors_are_rejected() {
    let field = SelectionField::new("moviesConnection")
        .with_argument("after", json!("not a cursor"))
        .with_fields("MoviesConnection", fields(["totalCount"]));
    assert!(matches!(translate(field), Err(Error::InvalidCursor(_))));
}

#[test]
fn root_aggregations_count_nodes() {
    let field = SelectionField::new("moviesAggregate")
        .with_fields("MovieAggregateSelection", fields(["count"]));
    let plan = translate(field).expect("translates");
    assert_eq!(plan.query.result_shape, ResultShape::Object);
    assert!(plan
        .query
        .query_cypher()
        .cypher
        .contains("    WITH DISTINCT this0\n    RETURN count(this0) AS var1"));
}

#[test]
fn filter_rules_exclude_rows_for_anonymous_callers() {
    let field = SelectionField::new("users").with_fields("User", fields(["name"]));
    let cypher = translate(field).expect("translates").query.query_cypher();
    assert!(cypher.cypher.contains("$isAuthenticated = true"));
    assert!(cypher.cypher.contains("$jwt.sub"));
    assert_eq!(cypher.params.get("isAuthenticated"), Some(&json!(false)));
}

#[test]
fn token_claims_become_the_jwt_parameter() {
    let field = SelectionField::new("users").with_fields("User", fields(["name"]));
    let cypher = translate_as(field, jwt(json!({ "sub": "u-1" })))
        .expect("translates")
        .query
        .query_cypher();
    assert_eq!(cypher.params.get("jwt"), Some(&json!({ "sub": "u-1" })));
    assert_eq!(cypher.params.get("isAuthenticated"), Some(&json!(true)));
}

#[test]
fn limit_settings_apply_without_a_requested_limit() {
    let field = SelectionField::new("users").with_fields("User", fields(["name"]));
    let cypher = translate(field).expect("translates").query.query_cypher();
    assert!(cypher.cypher.contains("LIMIT $param"));
    assert!(cypher.params.values().any(|value| value == &json!(20)));
}

#[test]
fn attribute_rules_apply_only_when_the_attribute_is_selected() {
    let public = cypher(SelectionField::new("persons").with_fields("Person", fields(["name"])));
    assert!(!public.contains(FORBIDDEN_SIGNAL));

    let private = cypher(SelectionField::new("persons").with_fields("Person", fields(["name", "salary"])));
    assert!(private.contains("apoc.util.validate"));
    assert!(private.contains(FORBIDDEN_SIGNAL));
    assert!(private.contains("$jwt.roles"));
}

#[test]
fn relationship_filters_hide_unreadable_targets() {
    let field = movies()
        .with_argument("where", json!({ "reviewers_SOME": { "name": "Ada" } }))
        .with_fields("Movie", fields(["title"]));
    let text = cypher(field);
    assert!(text.contains("EXISTS"));
    assert!(text.contains("$jwt.sub"));
}

#[test]
fn deprecated_and_nested_filters_compile_alike() {
    let deprecated = movies()
        .with_argument("where", json!({ "title_CONTAINS": "Star", "actors_SOME": { "name": "Ada" } }))
        .with_fields("Movie", fields(["title"]));
    let nested = movies()
        .with_argument(
            "where",
            json!({ "title": { "contains": "Star" }, "actors": { "some": { "name": "Ada" } } }),
        )
        .with_fields("Movie", fields(["title"]));
    let deprecated = translate(deprecated).expect("translates").query.query_cypher();
    let nested = translate(nested).expect("translates").query.query_cypher();
    assert_eq!(deprecated.cypher, nested.cypher);
    assert_eq!(deprecated.params, nested.params);
}

#[test]
fn options_fall_back_behind_top_level_arguments() {
    let legacy = movies()
        .with_argument("options", json!({ "sort": [{ "year": "DESC" }], "limit": 3 }))
        .with_fields("Movie", fields(["title"]));
    let current = movies()
        .with_argument("sort", json!([{ "year": "DESC" }]))
        .with_argument("limit", json!(3))
        .with_fields("Movie", fields(["title"]));
    assert_eq!(cypher(legacy), cypher(current));
}

#[test]
fn deprecated_and_current_aggregate_filters_compile_alike() {
    let deprecated = movies()
        .with_argument(
            "where",
            json!({ "actorsAggregate": { "node": { "name_SHORTEST_LENGTH_LT": 5 } } }),
        )
        .with_fields("Movie", fields(["title"]));
    let current = movies()
        .with_argument(
            "where",
            json!({
                "actorsConnection": {
                    "aggregate": { "node": { "name": { "shortestLength": { "lt": 5 } } } }
                }
            }),
        )
        .with_fields("Movie", fields(["title"]));
    let deprecated = translate(deprecated).expect("translates").query.query_cypher();
    let current = translate(current).expect("translates").query.query_cypher();
    assert_eq!(deprecated.cypher, current.cypher);
    assert_eq!(deprecated.params, current.params);
    assert!(current.cypher.contains("WITH DISTINCT"), "{}", current.cypher);
}

fn quantified(quantifier: &str) -> (String, serde_json::Value) {
    let field = movies()
        .with_argument("where", json!({ "actors": { quantifier: { "name": "Ada" } } }))
        .with_fields("Movie", fields(["title"]));
    let cypher = translate(field).expect("translates").query.query_cypher();
    (cypher.cypher, json!(cypher.params))
}

#[test]
fn quantifiers_are_built_from_the_same_pattern() {
    let (some, some_params) = quantified("some");
    let block = some
        .split_once("WHERE EXISTS ")
        .and_then(|(_, rest)| rest.split_once("\nRETURN"))
        .map(|(block, _)| block.to_string())
        .expect("an existential subquery");
    assert!(block.contains("this2.name = $param0"), "{block}");

    let (none, none_params) = quantified("none");
    assert!(none.contains(&format!("WHERE NOT EXISTS {block}")), "{none}");

    let (single, single_params) = quantified("single");
    assert!(single.contains(&format!("WHERE COUNT {block} = 1")), "{single}");

    let (all, all_params) = quantified("all");
    assert!(all.contains(&format!("EXISTS {block} AND NOT EXISTS {{")), "{all}");
    assert!(all.contains("NOT (this2.name = $param0)"), "{all}");

    for params in [none_params, single_params, all_params] {
        assert_eq!(params, some_params);
    }
}
