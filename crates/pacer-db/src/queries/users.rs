//! Database query functions for the `users` table.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::User;

/// Insert a new user. Returns the inserted row.
///
/// Usernames are unique; inserting a duplicate is rejected by the
/// constraint and surfaces as an error.
pub async fn insert_user(pool: &PgPool, username: &str) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username) VALUES ($1) RETURNING *",
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert user {username:?}"))?;

    Ok(user)
}

/// Fetch a user by ID.
pub async fn get_user(pool: &PgPool, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user")?;

    Ok(user)
}

/// Fetch a user by their unique username.
pub async fn get_user_by_username(pool: &PgPool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to fetch user by username {username:?}"))?;

    Ok(user)
}

/// List all users, ordered by id.
pub async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await
        .context("failed to list users")?;

    Ok(users)
}
