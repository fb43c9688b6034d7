//! Transaction depth tests on real SQLite connections

use serde_json::json;

use crate::model::Record;
use crate::query::QueryBuilder;
use crate::tests::{row, users_db};

struct Account;

impl crate::model::Model for Account {
    fn table_name() -> String {
        "users".to_string()
    }

    fn fillable() -> &'static [&'static str] {
        &["name", "credits"]
    }
}

#[tokio::test]
async fn test_nested_begin_sends_one_begin() {
    let dir = tempfile::tempdir().unwrap();
    let db = users_db(&dir).await;
    let mut conn = db.connection(None).await.unwrap();

    assert!(conn.begin_transaction().await.unwrap());
    assert!(conn.begin_transaction().await.unwrap());
    assert_eq!(conn.transaction_level(), 2);

    assert!(conn.commit().await.unwrap());
    assert_eq!(conn.transaction_level(), 1);
    assert!(conn.commit().await.unwrap());
    assert_eq!(conn.transaction_level(), 0);
    assert!(!conn.commit().await.unwrap());
    assert!(!conn.rollback().await.unwrap());

    let control: Vec<&str> = conn.query_log().iter().map(|e| e.sql.as_str()).collect();
    assert_eq!(control, vec!["BEGIN", "COMMIT"]);
}

#[tokio::test]
async fn test_rollback_discards_writes() {
    let dir = tempfile::tempdir().unwrap();
    let db = users_db(&dir).await;
    let users = QueryBuilder::table("users");

    {
        let mut conn = db.connection(None).await.unwrap();
        conn.begin_transaction().await.unwrap();
        users
            .insert_many_on(&mut conn, vec![row(json!({"name": "Cy", "credits": 1}))])
            .await
            .unwrap();
        assert_eq!(users.clone().count_on(&mut conn).await.unwrap(), 3);
        users.clone().where_eq("id", 1).delete_on(&mut conn).await.unwrap();
        assert!(conn.rollback().await.unwrap());
        assert_eq!(conn.transaction_level(), 0);
    }

    assert_eq!(users.clone().count(&db).await.unwrap(), 2);
    assert!(users.clone().where_eq("id", 1).exists(&db).await.unwrap());
}

#[tokio::test]
async fn test_inner_rollback_defers_to_outer_commit() {
    let dir = tempfile::tempdir().unwrap();
    let db = users_db(&dir).await;
    let users = QueryBuilder::table("users");

    {
        let mut conn = db.connection(None).await.unwrap();
        conn.begin_transaction().await.unwrap();
        conn.begin_transaction().await.unwrap();
        users
            .clone()
            .where_eq("id", 2)
            .update_on(&mut conn, row(json!({"credits": 50})))
            .await
            .unwrap();
        conn.rollback().await.unwrap();
        assert_eq!(conn.transaction_level(), 1);
        conn.commit().await.unwrap();
    }

    let credits = users.where_eq("id", 2).value(&db, "credits").await.unwrap();
    assert_eq!(credits, Some(json!(50)));
}

#[tokio::test]
async fn test_records_save_inside_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let db = users_db(&dir).await;

    {
        let mut conn = db.connection(None).await.unwrap();
        conn.begin_transaction().await.unwrap();

        let mut account = Record::<Account>::new();
        account.fill(row(json!({"name": "Gus", "credits": 9})));
        assert!(account.save_on(&mut conn, db.registry()).await.unwrap());
        assert!(account.exists());

        let mut ann = Record::<Account>::query()
            .find_on(&mut conn, 1)
            .await
            .unwrap()
            .unwrap();
        assert!(ann.delete_on(&mut conn, db.registry()).await.unwrap());

        conn.rollback().await.unwrap();
    }

    let names = QueryBuilder::table("users").order_by("id").pluck(&db, "name").await.unwrap();
    assert_eq!(names.all(), vec![json!("Ann"), json!("Bo")]);
}

#[tokio::test]
async fn test_open_transaction_is_not_returned_to_pool() {
    let dir = tempfile::tempdir().unwrap();
    let db = users_db(&dir).await;

    {
        let mut conn = db.connection(None).await.unwrap();
        conn.begin_transaction().await.unwrap();
        QueryBuilder::table("users")
            .where_eq("id", 1)
            .delete_on(&mut conn)
            .await
            .unwrap();
    }

    let conn = db.connection(None).await.unwrap();
    assert_eq!(conn.transaction_level(), 0);
    drop(conn);
    assert_eq!(QueryBuilder::table("users").count(&db).await.unwrap(), 2);
}
