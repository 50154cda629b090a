#![allow(dead_code)]

use strife_db::{ConnectionConfig, ConnectionManager, Migration, Model, SchemaBuilder, SqlValue};

pub struct UsersTable;

impl Migration for UsersTable {
    fn table(&self) -> &str {
        "users"
    }

    fn define(&self, schema: &mut SchemaBuilder) {
        schema.increments("id");
        schema.varchar("username").length(50).unique();
        schema.varchar("email").unique();
        schema.varchar("role").length(20);
        schema.integer("score");
    }
}

pub struct User;

impl Model for User {
    const TABLE: &'static str = "users";
}

/// In-memory database with the users table installed.
pub async fn database() -> ConnectionManager {
    let mut db = ConnectionManager::new(ConnectionConfig::in_memory());
    UsersTable
        .schema()
        .install(&mut db)
        .await
        .unwrap_or_else(|e| panic!("Failed to install users: {e}"));
    db
}

/// Inserts one user and returns its id.
pub async fn add_user(db: &mut ConnectionManager, username: &str, role: &str, score: i64) -> i64 {
    User::objects(db)
        .insert([
            ("username", SqlValue::from(username)),
            ("email", SqlValue::from(format!("{username}@example.com"))),
            ("role", SqlValue::from(role)),
            ("score", SqlValue::Int(score)),
        ])
        .await
        .unwrap_or_else(|e| panic!("Failed to insert {username}: {e}"))
}

/// Database seeded with five users.
pub async fn seeded() -> ConnectionManager {
    let mut db = database().await;
    for (username, role, score) in [
        ("ann", "admin", 10),
        ("bob", "editor", 5),
        ("cy", "editor", 7),
        ("dee", "guest", 1),
        ("ed", "guest", 3),
    ] {
        add_user(&mut db, username, role, score).await;
    }
    db
}
