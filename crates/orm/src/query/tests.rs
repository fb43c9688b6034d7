use serde_json::{json, Value};

use super::*;
use crate::backends::{Row, SqlDialect};

fn placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut quoted = false;
    for c in sql.chars() {
        match c {
            '\'' => quoted = !quoted,
            '?' if !quoted => count += 1,
            _ => {}
        }
    }
    count
}

fn assert_parity<T>(query: &QueryBuilder<T>) {
    for dialect in [SqlDialect::MySQL, SqlDialect::SQLite, SqlDialect::PostgreSQL] {
        let compiled = query.compile_select(dialect);
        assert_eq!(
            placeholders(&compiled.sql),
            compiled.bindings.len(),
            "placeholder/binding mismatch in {}",
            compiled.sql
        );
    }
}

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn test_basic_select() {
    let query = QueryBuilder::table("users");
    assert_eq!(query.to_sql(), "SELECT * FROM users");
    assert!(query.get_bindings().is_empty());
}

#[test]
fn test_connector_rendering() {
    let query = QueryBuilder::table("users")
        .where_eq("a", 1)
        .or_where_eq("b", 2)
        .where_eq("c", 3);
    assert_eq!(query.to_sql(), "SELECT * FROM users WHERE a = ? OR b = ? AND c = ?");
    assert_eq!(query.get_bindings(), vec![json!(1), json!(2), json!(3)]);
}

#[test]
fn test_first_predicate_or_has_no_leading_connector() {
    let query = QueryBuilder::table("users").or_where_eq("a", 1).where_eq("b", 2);
    assert_eq!(query.to_sql(), "SELECT * FROM users WHERE a = ? AND b = ?");
}

#[test]
fn test_unknown_operator_becomes_equality_value() {
    let query = QueryBuilder::table("users").where_op("name", "Ann", Value::Null);
    assert_eq!(query.to_sql(), "SELECT * FROM users WHERE name = ?");
    assert_eq!(query.get_bindings(), vec![json!("Ann")]);
}

#[test]
fn test_operator_is_case_insensitive() {
    let query = QueryBuilder::table("users").where_op("name", "LIKE", "A%");
    assert_eq!(query.to_sql(), "SELECT * FROM users WHERE name LIKE ?");
}

#[test]
fn test_null_comparisons() {
    let query = QueryBuilder::table("users")
        .where_op("deleted_at", "=", Value::Null)
        .where_op("email", "<>", Value::Null);
    assert_eq!(
        query.to_sql(),
        "SELECT * FROM users WHERE deleted_at IS NULL AND email IS NOT NULL"
    );
    assert!(query.get_bindings().is_empty());
}

#[test]
fn test_where_in_dedups_and_drops_nulls() {
    let query = QueryBuilder::table("t").where_in("x", vec![json!(1), json!(1), json!(2), Value::Null]);
    assert_eq!(query.to_sql(), "SELECT * FROM t WHERE x IN (?, ?)");
    assert_eq!(query.get_bindings(), vec![json!(1), json!(2)]);
}

#[test]
fn test_empty_where_in_matches_nothing() {
    let query = QueryBuilder::table("t").where_in("x", Vec::<i64>::new());
    assert_eq!(query.to_sql(), "SELECT * FROM t WHERE 0 = 1");
    let query = QueryBuilder::table("t").where_not_in("x", Vec::<i64>::new());
    assert_eq!(query.to_sql(), "SELECT * FROM t WHERE 1 = 1");
}

#[test]
fn test_in_operator_routes_to_in_list() {
    let query = QueryBuilder::table("t").where_op("x", "in", json!([3, 4]));
    assert_eq!(query.to_sql(), "SELECT * FROM t WHERE x IN (?, ?)");
}

#[test]
fn test_in_and_between_operators_with_scalar_values() {
    let query = QueryBuilder::table("t")
        .where_op("x", "in", 3)
        .where_op("y", "not in", "a")
        .where_op("z", "between", 5);
    assert_eq!(
        query.to_sql(),
        "SELECT * FROM t WHERE x IN (?) AND y NOT IN (?) AND z BETWEEN ? AND ?"
    );
    assert_eq!(query.get_bindings(), vec![json!(3), json!("a"), json!(5), json!(5)]);

    let empty = QueryBuilder::table("t").where_op("z", "between", json!([]));
    assert_eq!(empty.to_sql(), "SELECT * FROM t WHERE 0 = 1");
    assert_parity(&query);
}

#[test]
fn test_large_where_in_is_chunked_with_or() {
    let values: Vec<i64> = (0..1500).collect();
    let query = QueryBuilder::table("t").where_eq("a", 0).where_in("x", values);
    let sql = query.to_sql();
    assert!(sql.starts_with("SELECT * FROM t WHERE a = ? AND (x IN ("));
    assert_eq!(sql.matches("x IN (").count(), 2);
    assert!(sql.contains(") OR x IN ("));
    assert_eq!(query.get_bindings().len(), 1501);
    assert_parity(&query);
}

#[test]
fn test_large_where_not_in_is_chunked_with_and() {
    let values: Vec<i64> = (0..2001).collect();
    let query = QueryBuilder::table("t").where_not_in("x", values);
    let sql = query.to_sql();
    assert_eq!(sql.matches("x NOT IN (").count(), 3);
    assert!(sql.contains(") AND x NOT IN ("));
    assert!(!sql.contains(" OR "));
    assert_parity(&query);
}

#[test]
fn test_nested_where_splices_bindings() {
    let query = QueryBuilder::table("users")
        .where_eq("active", true)
        .where_nested(|q| q.where_gt("age", 18).or_where_eq("role", "admin"))
        .where_eq("team", 4);
    assert_eq!(
        query.to_sql(),
        "SELECT * FROM users WHERE active = ? AND (age > ? OR role = ?) AND team = ?"
    );
    assert_eq!(query.get_bindings(), vec![json!(true), json!(18), json!("admin"), json!(4)]);
}

#[test]
fn test_empty_nested_group_is_skipped() {
    let query = QueryBuilder::table("users").where_nested(|q| q).where_eq("a", 1);
    assert_eq!(query.to_sql(), "SELECT * FROM users WHERE a = ?");
}

#[test]
fn test_where_map_groups_equalities() {
    let query = QueryBuilder::table("users")
        .where_eq("a", 1)
        .or_where_map([("b", json!(2)), ("c", json!(3))]);
    assert_eq!(query.to_sql(), "SELECT * FROM users WHERE a = ? OR (b = ? AND c = ?)");
}

#[test]
fn test_between_and_column() {
    let query = QueryBuilder::table("orders")
        .where_between("total", 10, 20)
        .where_not_between("qty", 1, 2)
        .where_column("updated_at", ">", "created_at");
    assert_eq!(
        query.to_sql(),
        "SELECT * FROM orders WHERE total BETWEEN ? AND ? AND qty NOT BETWEEN ? AND ? AND updated_at > created_at"
    );
    assert_eq!(query.get_bindings(), vec![json!(10), json!(20), json!(1), json!(2)]);
}

#[test]
fn test_date_predicates_per_dialect() {
    let query = QueryBuilder::table("posts")
        .where_date("created_at", "=", "2024-03-01")
        .where_month("created_at", "=", 3);
    assert_eq!(
        query.to_sql_for(SqlDialect::MySQL),
        "SELECT * FROM posts WHERE DATE(created_at) = ? AND MONTH(created_at) = ?"
    );
    assert_eq!(
        query.to_sql_for(SqlDialect::SQLite),
        "SELECT * FROM posts WHERE strftime('%Y-%m-%d', created_at) = cast(? as text) AND strftime('%m', created_at) = cast(? as text)"
    );
    assert_eq!(
        query.to_sql_for(SqlDialect::PostgreSQL),
        "SELECT * FROM posts WHERE created_at::date = ?::date AND extract(month from created_at) = ?::integer"
    );
    assert_eq!(query.get_bindings(), vec![json!("2024-03-01"), json!("03")]);
    assert_parity(&query);
}

#[test]
fn test_exists_subquery_bindings_in_place() {
    let sub = QueryBuilder::table("orders")
        .where_column("orders.user_id", "=", "users.id")
        .where_gt("total", 100);
    let query = QueryBuilder::table("users")
        .where_eq("active", 1)
        .where_exists(sub)
        .where_eq("team", 2);
    assert_eq!(
        query.to_sql(),
        "SELECT * FROM users WHERE active = ? AND EXISTS (SELECT * FROM orders WHERE orders.user_id = users.id AND total > ?) AND team = ?"
    );
    assert_eq!(query.get_bindings(), vec![json!(1), json!(100), json!(2)]);
}

#[test]
fn test_join_bindings_precede_where_bindings() {
    let query = QueryBuilder::table("users")
        .select("users.id, posts.title")
        .join_with("posts", JoinType::Left, |j| {
            j.on("posts.user_id", "=", "users.id").where_eq("posts.published", true)
        })
        .where_eq("users.active", 1);
    assert_eq!(
        query.to_sql(),
        "SELECT users.id, posts.title FROM users LEFT JOIN posts ON posts.user_id = users.id AND posts.published = ? WHERE users.active = ?"
    );
    assert_eq!(query.get_bindings(), vec![json!(true), json!(1)]);
    let raw = query.get_raw_bindings();
    assert_eq!(raw.join, vec![json!(true)]);
    assert_eq!(raw.wheres, vec![json!(1)]);
}

#[test]
fn test_cross_join_has_no_on() {
    let query = QueryBuilder::table("sizes").cross_join("colors");
    assert_eq!(query.to_sql(), "SELECT * FROM sizes CROSS JOIN colors");
}

#[test]
fn test_clause_order() {
    let query = QueryBuilder::table("orders")
        .distinct()
        .select("user_id")
        .select_raw("SUM(total) > ? AS big", vec![json!(500)])
        .join("users", "users.id", "=", "orders.user_id")
        .where_eq("status", "paid")
        .group_by("user_id")
        .having("COUNT(*)", ">", 2)
        .order_by_desc("user_id")
        .order_by_raw("FIELD(status, ?)", vec![json!("paid")])
        .limit(10)
        .offset(20);
    assert_eq!(
        query.to_sql(),
        "SELECT DISTINCT user_id, SUM(total) > ? AS big FROM orders INNER JOIN users ON users.id = orders.user_id WHERE status = ? GROUP BY user_id HAVING COUNT(*) > ? ORDER BY user_id DESC, FIELD(status, ?) LIMIT 10 OFFSET 20"
    );
    assert_eq!(
        query.get_bindings(),
        vec![json!(500), json!("paid"), json!(2), json!("paid")]
    );
}

#[test]
fn test_offset_without_limit() {
    let query = QueryBuilder::table("t").offset(5);
    assert_eq!(
        query.to_sql_for(SqlDialect::MySQL),
        "SELECT * FROM t LIMIT 18446744073709551615 OFFSET 5"
    );
    assert_eq!(query.to_sql_for(SqlDialect::SQLite), "SELECT * FROM t LIMIT -1 OFFSET 5");
    assert_eq!(query.to_sql_for(SqlDialect::PostgreSQL), "SELECT * FROM t OFFSET 5");
}

#[test]
fn test_for_page_and_reorder() {
    let query = QueryBuilder::table("t").latest("created_at").for_page(3, 15);
    assert_eq!(query.to_sql(), "SELECT * FROM t ORDER BY created_at DESC LIMIT 15 OFFSET 30");
    assert_eq!(query.reorder().to_sql(), "SELECT * FROM t LIMIT 15 OFFSET 30");
}

#[test]
fn test_for_page_saturates_large_page_numbers() {
    let query = QueryBuilder::table("t").for_page(u64::MAX, 2);
    assert_eq!(
        query.to_sql(),
        format!("SELECT * FROM t LIMIT 2 OFFSET {}", u64::MAX)
    );
    assert_eq!(
        QueryBuilder::table("t").for_page(0, 10).to_sql(),
        "SELECT * FROM t LIMIT 10 OFFSET 0"
    );
}

#[test]
fn test_when_applies_conditionally() {
    let query = QueryBuilder::table("t")
        .when(true, |q| q.where_eq("a", 1))
        .when(false, |q| q.where_eq("b", 2));
    assert_eq!(query.to_sql(), "SELECT * FROM t WHERE a = ?");
}

#[test]
fn test_update_bindings_values_then_wheres() {
    let query = QueryBuilder::table("users").where_eq("id", 1);
    let compiled = query.compile_update(
        &[
            ("credits".to_string(), Assignment::Value(json!(20))),
            (
                "visits".to_string(),
                Assignment::Raw {
                    sql: "visits + ?".to_string(),
                    bindings: vec![json!(1)],
                },
            ),
        ],
        SqlDialect::MySQL,
    );
    assert_eq!(compiled.sql, "UPDATE users SET credits = ?, visits = visits + ? WHERE id = ?");
    assert_eq!(compiled.bindings, vec![json!(20), json!(1), json!(1)]);
}

#[test]
fn test_insert_many_uses_first_row_columns() {
    let query = QueryBuilder::table("users");
    let rows = vec![
        row(&[("name", json!("Ann")), ("credits", json!(10))]),
        row(&[("name", json!("Bo"))]),
    ];
    let compiled = query.compile_insert(&rows, SqlDialect::SQLite);
    assert_eq!(compiled.sql, "INSERT INTO users (name, credits) VALUES (?, ?), (?, ?)");
    assert_eq!(
        compiled.bindings,
        vec![json!("Ann"), json!(10), json!("Bo"), Value::Null]
    );
}

#[test]
fn test_insert_get_id_returning_on_postgres() {
    let query = QueryBuilder::table("users");
    let compiled = query.compile_insert_get_id(&row(&[("name", json!("Ann"))]), "id", SqlDialect::PostgreSQL);
    assert_eq!(compiled.sql, "INSERT INTO users (name) VALUES (?) RETURNING id");
    let compiled = query.compile_insert_get_id(&row(&[("name", json!("Ann"))]), "id", SqlDialect::MySQL);
    assert_eq!(compiled.sql, "INSERT INTO users (name) VALUES (?)");
}

#[test]
fn test_delete_and_truncate() {
    let query = QueryBuilder::table("users").where_lt("credits", 0);
    let compiled = query.compile_delete(SqlDialect::MySQL);
    assert_eq!(compiled.sql, "DELETE FROM users WHERE credits < ?");
    assert_eq!(compiled.bindings, vec![json!(0)]);
    assert_eq!(query.compile_truncate(SqlDialect::SQLite), "DELETE FROM users");
    assert_eq!(query.compile_truncate(SqlDialect::PostgreSQL), "TRUNCATE TABLE users");
}

#[test]
fn test_binding_parity_across_shapes() {
    let queries = vec![
        QueryBuilder::table("a").where_eq("x", 1).or_where_in("y", vec![1, 2, 3]),
        QueryBuilder::table("a")
            .where_nested(|q| q.where_between("x", 1, 5).or_where_null("z"))
            .having_raw("SUM(x) > ?", vec![json!(3)]),
        QueryBuilder::table("a")
            .where_year("d", "=", 2024)
            .where_time("d", ">", "10:00:00")
            .where_raw("x = ? OR y = ?", vec![json!(1), json!(2)]),
        QueryBuilder::table("a").where_like("name", "%'?%"),
    ];
    for query in &queries {
        assert_parity(query);
    }
}
