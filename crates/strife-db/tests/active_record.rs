//! Integration tests for query sessions against in-memory SQLite.

mod common;

use common::{add_user, database, seeded, User};
use serde::Deserialize;
use strife_db::{DbError, Dispatched, Model, QueryBuilder, SqlValue};

fn usernames(rows: &[strife_db::Record]) -> Vec<String> {
    rows.iter()
        .map(|row| row.get_str("username").unwrap().unwrap().to_owned())
        .collect()
}

// =============================================================================
// Session state
// =============================================================================

#[tokio::test]
async fn test_terminal_call_leaves_no_state_behind() {
    let mut db = seeded().await;
    let mut users = User::objects(&mut db);

    users
        .select(["username"])
        .unwrap()
        .where_eq("role", "editor")
        .order_by("score", "DESC")
        .unwrap()
        .limit(1);
    let top_editor = users.get().await.unwrap();
    assert_eq!(usernames(&top_editor), vec!["cy"]);
    assert!(users.state().is_idle());

    // The next query on the same table sees none of the previous clauses.
    let everyone = users.get().await.unwrap();
    assert_eq!(everyone.len(), 5);
    assert!(everyone[0].contains("email"));
}

#[tokio::test]
async fn test_failed_terminal_call_still_clears_state() {
    let mut db = seeded().await;
    let mut users = User::objects(&mut db);

    users.where_eq("no_such_column", 1);
    assert!(matches!(users.get().await, Err(DbError::Database(_))));
    assert!(users.state().is_idle());
    assert_eq!(users.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_where_clauses_combine_with_and() {
    let mut db = database().await;
    let mut users = User::objects(&mut db);
    users.where_eq("a", 1).where_eq("b", 2);

    assert_eq!(users.state().where_clause(), Some("WHERE a = ? AND b = ?"));
    assert_eq!(
        users.state().bound_values(),
        &[SqlValue::Int(1), SqlValue::Int(2)]
    );
    assert_eq!(users.to_sql(), "SELECT * FROM users WHERE a = ? AND b = ?");
}

#[tokio::test]
async fn test_or_where_requires_where() {
    let mut db = database().await;
    let mut users = User::objects(&mut db);
    assert!(matches!(
        users.or_where_eq("username", "bob"),
        Err(DbError::ChainOrder { .. })
    ));
    assert!(matches!(
        users.or_where_between("score", 1, 5),
        Err(DbError::ChainOrder { .. })
    ));
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_clause_filters() {
    let mut db = seeded().await;
    let mut users = User::objects(&mut db);

    users
        .where_eq("role", "guest")
        .or_where_eq("username", "ann")
        .unwrap();
    assert_eq!(users.count().await.unwrap(), 3);

    users.where_in("username", ["bob", "dee"]).unwrap();
    assert_eq!(usernames(&users.get().await.unwrap()), vec!["bob", "dee"]);

    users.where_between("score", 3, 7);
    assert_eq!(users.count().await.unwrap(), 3);

    users
        .where_eq("role", "admin")
        .or_where_between("score", 0, 1)
        .unwrap();
    assert_eq!(usernames(&users.get().await.unwrap()), vec!["ann", "dee"]);

    users.where_op("score", ">", 5).order_by("score", "asc").unwrap();
    assert_eq!(usernames(&users.get().await.unwrap()), vec!["cy", "ann"]);
}

#[tokio::test]
async fn test_distinct_selection() {
    let mut db = seeded().await;
    let mut users = User::objects(&mut db);
    users
        .distinct(["role"])
        .unwrap()
        .order_by("role", "ASC")
        .unwrap();
    let roles: Vec<String> = users
        .get()
        .await
        .unwrap()
        .iter()
        .map(|row| row.get_str("role").unwrap().unwrap().to_owned())
        .collect();
    assert_eq!(roles, vec!["admin", "editor", "guest"]);
}

#[tokio::test]
async fn test_first_last_and_find() {
    let mut db = seeded().await;
    let mut users = User::objects(&mut db);

    let first = users.first_row().await.unwrap().unwrap();
    assert_eq!(first.get_str("username").unwrap(), Some("ann"));
    let last = users.last_row().await.unwrap().unwrap();
    assert_eq!(last.get_str("username").unwrap(), Some("ed"));
    assert_eq!(users.result(), Some(&last));

    users.where_eq("role", "editor");
    let editor = users.first().await.unwrap().unwrap();
    assert_eq!(editor.get_str("username").unwrap(), Some("bob"));

    assert!(users.find(999).await.unwrap().is_none());
    let found = users.find(3).await.unwrap().unwrap();
    assert_eq!(found.get_str("username").unwrap(), Some("cy"));
}

#[tokio::test]
async fn test_exists_and_pull() {
    let mut db = seeded().await;
    let mut users = User::objects(&mut db);

    users.where_eq("username", "bob");
    assert!(users.exists().await.unwrap());
    users.where_eq("username", "zed");
    assert!(!users.exists().await.unwrap());

    users.where_eq("username", "dee");
    assert_eq!(
        users.pull("email").await.unwrap(),
        Some(SqlValue::from("dee@example.com"))
    );
    users.where_eq("username", "zed");
    assert_eq!(users.pull("email").await.unwrap(), None);

    users.where_eq("username", "dee");
    assert!(matches!(
        users.pull("password").await,
        Err(DbError::FieldNotFound(field)) if field == "password"
    ));
    assert!(users.state().is_idle());
}

#[tokio::test]
async fn test_get_as_typed_rows() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Player {
        username: String,
        score: i64,
    }

    let mut db = seeded().await;
    let mut users = User::objects(&mut db);
    users
        .select(["username, score"])
        .unwrap()
        .where_eq("role", "guest");
    let guests: Vec<Player> = users.get_as().await.unwrap();
    assert_eq!(
        guests,
        vec![
            Player {
                username: String::from("dee"),
                score: 1
            },
            Player {
                username: String::from("ed"),
                score: 3
            },
        ]
    );
}

#[tokio::test]
async fn test_data_falls_back_to_first() {
    let mut db = seeded().await;
    let mut users = User::objects(&mut db);
    users.where_eq("role", "guest");
    let held = users.data().await.unwrap().unwrap();
    assert_eq!(held.get_str("username").unwrap(), Some("dee"));
    assert_eq!(users.result(), Some(&held));
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn test_insert_round_trip() {
    let mut db = database().await;
    db.query("CREATE TABLE points (id INTEGER PRIMARY KEY, x INTEGER)")
        .await
        .unwrap();

    let mut points = db.table("points");
    assert!(matches!(
        points.insert(Vec::<(&str, i64)>::new()).await,
        Err(DbError::EmptyValue(_))
    ));
    points.insert([("x", 1_i64)]).await.unwrap();
    drop(points);

    let id = db.last_inserted_id().unwrap();
    let row = db.table("points").find(id).await.unwrap().unwrap();
    assert_eq!(row.get_i64("x").unwrap(), Some(1));
}

#[tokio::test]
async fn test_unique_constraint_is_reported() {
    let mut db = database().await;
    add_user(&mut db, "bob", "editor", 0).await;
    let err = User::objects(&mut db)
        .insert([
            ("username", "bob"),
            ("email", "other@example.com"),
            ("role", "guest"),
            ("score", "0"),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Database(_)));
}

#[tokio::test]
async fn test_increment_held_record() {
    let mut db = database().await;
    let id = add_user(&mut db, "bob", "editor", 5).await;

    let mut users = User::objects(&mut db);
    users.find(id).await.unwrap();
    users.increment("score", 1).await.unwrap();
    let row = users.find(id).await.unwrap().unwrap();
    assert_eq!(row.get_i64("score").unwrap(), Some(6));

    users.update([("score", 5_i64)], Some(id)).await.unwrap();
    users.find(id).await.unwrap();
    users.increment("score", 3).await.unwrap();
    let row = users.find(id).await.unwrap().unwrap();
    assert_eq!(row.get_i64("score").unwrap(), Some(8));

    assert!(matches!(
        users.increment("username", 1).await,
        Err(DbError::NotNumeric(_))
    ));
}

#[tokio::test]
async fn test_delete_by_query_with_limit() {
    let mut db = seeded().await;
    let mut users = User::objects(&mut db);

    users
        .where_eq("role", "guest")
        .order_by("score", "DESC")
        .unwrap()
        .limit(1);
    assert_eq!(users.delete(&[]).await.unwrap(), 1);
    assert_eq!(usernames(&users.get().await.unwrap()), vec!["ann", "bob", "cy", "dee"]);

    assert_eq!(users.delete(&[1, 2]).await.unwrap(), 2);
    assert_eq!(users.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_transaction_rollback_discards_writes() {
    let mut db = seeded().await;
    db.transact().await.unwrap();
    add_user(&mut db, "zed", "guest", 0).await;
    assert_eq!(User::objects(&mut db).count().await.unwrap(), 6);
    db.rollback().await.unwrap();
    assert_eq!(User::objects(&mut db).count().await.unwrap(), 5);
    assert!(matches!(db.commit().await, Err(DbError::NoActiveTransaction)));
}

// =============================================================================
// Dynamic calls
// =============================================================================

#[tokio::test]
async fn test_dynamic_where_matches_named_call() {
    let mut db = database().await;

    let mut named = User::objects(&mut db);
    named.where_eq("username", "bob");
    let expected = named.state().clone();
    drop(named);

    let mut dynamic = User::objects(&mut db);
    let outcome = dynamic
        .call("whereUsername", vec![SqlValue::from("bob")])
        .await
        .unwrap();
    assert_eq!(outcome, Dispatched::Chained);
    assert_eq!(dynamic.state(), &expected);
}

#[tokio::test]
async fn test_dynamic_verbs() {
    let mut db = seeded().await;
    let mut users = User::objects(&mut db);

    users
        .call("whereRole", vec![SqlValue::from("guest")])
        .await
        .unwrap();
    users
        .call("orWhereUsername", vec![SqlValue::from("!="), SqlValue::from("ann")])
        .await
        .unwrap();
    users
        .call("orderByScore", vec![SqlValue::from("desc")])
        .await
        .unwrap();
    assert_eq!(
        users.to_sql(),
        "SELECT * FROM users WHERE role = ? OR username != ? ORDER BY score DESC"
    );
    users.reset();

    users.find(2).await.unwrap();
    assert_eq!(
        users.call("incrementScore", Vec::new()).await.unwrap(),
        Dispatched::Updated(SqlValue::Int(6))
    );
    assert_eq!(
        users
            .call("decrementScore", vec![SqlValue::Int(4)])
            .await
            .unwrap(),
        Dispatched::Updated(SqlValue::Int(2))
    );
    assert_eq!(
        users.call("pullUsername", Vec::new()).await.unwrap(),
        Dispatched::Pulled(Some(SqlValue::from("bob")))
    );

    assert!(matches!(
        users.call("fetchUsername", Vec::new()).await,
        Err(DbError::UnknownOperation(name)) if name == "fetchUsername"
    ));
}

#[tokio::test]
async fn test_dynamic_call_never_splits_built_in_names() {
    let mut db = seeded().await;
    let mut users = User::objects(&mut db);

    for name in ["whereIn", "whereBetween", "orWhereBetween", "orderBy"] {
        assert!(
            matches!(
                users.call(name, vec![SqlValue::Int(1)]).await,
                Err(DbError::UnknownOperation(_))
            ),
            "{name}"
        );
    }
    assert_eq!(users.to_sql(), "SELECT * FROM users");
}

#[tokio::test]
async fn test_quote_escapes() {
    assert_eq!(QueryBuilder::quote("it's"), "'it''s'");
}
