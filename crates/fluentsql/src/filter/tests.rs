use super::*;
use serde_json::json;

fn mysql(expr: &FilterExpr) -> String {
    expr.to_sql(Dialect::MySql).unwrap()
}

#[test]
fn raw_filter_is_verbatim() {
    let f = FilterExpr::raw("name like 'foo%' and age > 18");
    assert_eq!(mysql(&f), "name like 'foo%' and age > 18");
    assert_eq!(
        where_clause(&f, Dialect::MySql).unwrap().as_deref(),
        Some("WHERE name like 'foo%' and age > 18")
    );
}

#[test]
fn raw_and_predicate_text_keep_surrounding_whitespace() {
    let f = FilterExpr::raw(" age > 18\n");
    assert_eq!(mysql(&f), " age > 18\n");
    let f = FilterExpr::predicate(|| "  ok = 1 ".to_string());
    assert_eq!(mysql(&f), "  ok = 1 ");
    assert_eq!(
        where_clause(&f, Dialect::MySql).unwrap().as_deref(),
        Some("WHERE   ok = 1 ")
    );
}

#[test]
fn predicate_is_invoked_at_compile_time() {
    let f = FilterExpr::predicate(|| "name = 'xiaoming'".to_string());
    assert_eq!(mysql(&f), "name = 'xiaoming'");
}

#[test]
fn range_lower_bound_only() {
    let f: FilterExpr = FieldMap::new()
        .with("age", Condition::range().gt(18))
        .into();
    let sql = mysql(&f);
    assert_eq!(sql, "age > 18");
    assert!(!sql.trim_end().ends_with("AND"));
    assert_eq!(
        where_clause(&f, Dialect::MySql).unwrap().as_deref(),
        Some("WHERE age > 18")
    );
}

#[test]
fn range_bounds_are_fused() {
    let f: FilterExpr = FieldMap::new()
        .with("age", Condition::range().gt(18).lt(30))
        .into();
    assert_eq!(mysql(&f), "age > 18 AND age < 30");
}

#[test]
fn inclusive_range_bounds() {
    let f: FilterExpr = FieldMap::new()
        .with("score", Condition::range().gte(1.5).lte(9))
        .into();
    assert_eq!(mysql(&f), "score >= 1.5 AND score <= 9");
}

#[test]
fn unbounded_range_is_rejected() {
    let f: FilterExpr = FieldMap::new().with("age", Condition::range()).into();
    assert!(f.to_sql(Dialect::MySql).unwrap_err().is_validation());
}

#[test]
fn or_of_field_maps() {
    let f = FilterExpr::or(vec![
        FieldMap::new().eq("a", 1).into(),
        FieldMap::new().eq("b", 2).into(),
    ]);
    assert_eq!(mysql(&f), "(a = 1) OR (b = 2)");
}

#[test]
fn nested_conjunctions_are_fully_parenthesized() {
    let f = FilterExpr::and(vec![
        FieldMap::new().eq("status", "active").into(),
        FilterExpr::or(vec![
            FieldMap::new().eq("role", "admin").into(),
            FieldMap::new().like("name", "foo%").eq("vip", true).into(),
        ]),
    ]);
    let sql = mysql(&f);
    assert_eq!(
        sql,
        "(status = 'active') AND ((role = 'admin') OR (name LIKE 'foo%' AND vip = true))"
    );
    assert_eq!(sql.matches('(').count(), sql.matches(')').count());
}

#[test]
fn parentheses_balance_at_depth() {
    let mut f: FilterExpr = FieldMap::new().eq("x", 0).into();
    for depth in 1..6 {
        let term: FilterExpr = FieldMap::new().eq("x", depth).into();
        f = if depth % 2 == 0 {
            FilterExpr::and(vec![f, term])
        } else {
            FilterExpr::or(vec![term, f])
        };
    }
    let sql = mysql(&f);
    assert_eq!(sql.matches('(').count(), sql.matches(')').count());
}

#[test]
fn compile_is_deterministic() {
    let f = FilterExpr::and(vec![
        FieldMap::new()
            .in_list("id", [3, 1, 2])
            .with("age", Condition::range().gt(18).lte(65))
            .into(),
        FilterExpr::raw("deleted_at IS NULL"),
    ]);
    assert_eq!(mysql(&f), mysql(&f));
    assert_eq!(
        mysql(&f),
        "(id IN (3,1,2) AND age > 18 AND age <= 65) AND (deleted_at IS NULL)"
    );
}

#[test]
fn field_map_conditions() {
    let f: FilterExpr = FieldMap::new()
        .like("name", "foo%")
        .with("id", Condition::raw("IN (SELECT uid FROM vip)"))
        .in_list("tag", ["a", "b"])
        .with("created", Condition::between("2024-01-01", "2024-12-31"))
        .with("level", Condition::eq(3))
        .eq("city", "O'Neil")
        .into();
    assert_eq!(
        mysql(&f),
        "name LIKE 'foo%' AND id IN (SELECT uid FROM vip) AND tag IN ('a','b') \
         AND created BETWEEN '2024-01-01' AND '2024-12-31' AND level = 3 AND city = 'O\\'Neil'"
    );
}

#[test]
fn empty_in_list_is_emitted_as_is() {
    let f: FilterExpr = FieldMap::new().in_list("id", Vec::<i64>::new()).into();
    assert_eq!(mysql(&f), "id IN ()");
}

#[test]
fn between_requires_two_bounds() {
    let f: FilterExpr = FieldMap::new()
        .with("age", Condition::Between(vec![Value::Int(1)]))
        .into();
    let err = f.to_sql(Dialect::MySql).unwrap_err();
    assert!(err.is_validation());
    assert!(err.message().contains("exactly 2 bounds"));
}

#[test]
fn subquery_values_are_not_escaped() {
    let f: FilterExpr = FieldMap::new()
        .eq("uid", "(SELECT id FROM users WHERE name = 'a')")
        .eq("owner", "`orders`.`uid`")
        .into();
    assert_eq!(
        mysql(&f),
        "uid = (SELECT id FROM users WHERE name = 'a') AND owner = `orders`.`uid`"
    );
}

#[test]
fn postgres_escaping() {
    let f: FilterExpr = FieldMap::new().eq("name", "O'Neil").eq("ok", true).into();
    assert_eq!(f.to_sql(Dialect::Postgres).unwrap(), "name = 'O''Neil' AND ok = TRUE");
}

#[test]
fn empty_filters() {
    let empty: FilterExpr = FieldMap::new().into();
    assert_eq!(where_clause(&empty, Dialect::MySql).unwrap(), None);
    assert_eq!(where_clause(&FilterExpr::raw("  "), Dialect::MySql).unwrap(), None);

    assert!(FilterExpr::and(vec![]).to_sql(Dialect::MySql).unwrap_err().is_validation());
    let with_empty_term = FilterExpr::or(vec![FieldMap::new().eq("a", 1).into(), empty]);
    assert!(with_empty_term.to_sql(Dialect::MySql).unwrap_err().is_validation());
}

#[test]
fn setting_a_field_twice_keeps_first_position() {
    let f: FilterExpr = FieldMap::new().eq("a", 1).eq("b", 2).eq("a", 3).into();
    assert_eq!(mysql(&f), "a = 3 AND b = 2");
}

// ==================== JSON documents ====================

#[test]
fn json_field_map() {
    let f = FilterExpr::from_json(&json!({
        "name": {"$like": "foo%"},
        "age": {"$gt": 18, "$lt": 30},
        "status": "active"
    }))
    .unwrap();
    assert_eq!(
        mysql(&f),
        "name LIKE 'foo%' AND age > 18 AND age < 30 AND status = 'active'"
    );
}

#[test]
fn json_conjunctions() {
    let f = FilterExpr::from_json(&json!({
        "$or": [
            {"a": 1},
            {"$and": [{"b": {"$in": [1, 2]}}, {"c": {"$between": [1, 5]}}]}
        ]
    }))
    .unwrap();
    assert_eq!(mysql(&f), "(a = 1) OR ((b IN (1,2)) AND (c BETWEEN 1 AND 5))");
}

#[test]
fn json_raw_operators() {
    let f = FilterExpr::from_json(&json!({
        "id": {"$sql": "IN (SELECT uid FROM vip)"},
        "level": {"$eq": 2},
        "note": null
    }))
    .unwrap();
    assert_eq!(
        mysql(&f),
        "id IN (SELECT uid FROM vip) AND level = 2 AND note = NULL"
    );
}

#[test]
fn json_string_is_raw() {
    let f = FilterExpr::from_json(&json!("age > 18")).unwrap();
    assert_eq!(mysql(&f), "age > 18");
}

#[test]
fn json_rejects_malformed_documents() {
    let cases = [
        json!(42),
        json!({"age": {"$foo": 1}}),
        json!({"age": {}}),
        json!({"age": {"$gt": 1, "$gte": 2}}),
        json!({"age": {"$gt": 1, "$like": "x"}}),
        json!({"age": {"$in": 1}}),
        json!({"age": [1, 2]}),
        json!({"$and": {"a": 1}}),
        json!({"$and": [{"a": 1}], "b": 2}),
        json!({"$nor": [{"a": 1}]}),
        json!({"id": {"$sql": 5}}),
    ];
    for doc in cases {
        let err = FilterExpr::from_json(&doc).unwrap_err();
        assert!(err.is_validation(), "{doc} should be rejected");
    }
}

#[test]
fn json_between_arity_is_checked_at_compile() {
    let f = FilterExpr::from_json(&json!({"age": {"$between": [1, 2, 3]}})).unwrap();
    assert!(f.to_sql(Dialect::MySql).unwrap_err().is_validation());
}
