#![allow(dead_code)]

use quill_query::{TableMeta, TableQuery};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    sqlx::query(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            nickname TEXT
        )",
    )
    .execute(&pool)
    .await
    .expect("Failed to create users table");

    sqlx::query(
        "CREATE TABLE posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            published INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(&pool)
    .await
    .expect("Failed to create posts table");

    pool
}

pub fn users() -> TableMeta {
    TableMeta::new("users", &["id", "name", "age", "active", "nickname"], "id")
}

pub fn posts() -> TableMeta {
    TableMeta::new("posts", &["id", "user_id", "title", "published"], "id")
}

pub fn users_query() -> TableQuery {
    TableQuery::new(users())
}

pub fn posts_query() -> TableQuery {
    TableQuery::new(posts())
}

/// Inserts `n` users named user_1 .. user_n with ages 1 .. n.
pub async fn seed_users(pool: &SqlitePool, n: i64) {
    for i in 1..=n {
        sqlx::query("INSERT INTO users (name, age, active) VALUES (?, ?, ?)")
            .bind(format!("user_{i}"))
            .bind(i)
            .bind(i % 2 == 0)
            .execute(pool)
            .await
            .expect("Failed to seed user");
    }
}

pub async fn seed_post(pool: &SqlitePool, user_id: i64, title: &str, published: bool) {
    sqlx::query("INSERT INTO posts (user_id, title, published) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(title)
        .bind(published)
        .execute(pool)
        .await
        .expect("Failed to seed post");
}
