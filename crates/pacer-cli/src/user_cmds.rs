//! Operator CLI handlers for `pacer user` subcommands.
//!
//! Implements:
//! - `pacer user add`  -- create a user and print their bearer token
//! - `pacer user list` -- list all users in table format

use anyhow::{Result, bail};
use sqlx::PgPool;

use pacer_core::token::TokenSigner;
use pacer_db::queries::users;

use crate::UserCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `UserCommands` variant to the appropriate handler.
pub async fn run_user_command(
    command: UserCommands,
    pool: &PgPool,
    tokens: &TokenSigner,
) -> Result<()> {
    match command {
        UserCommands::Add { username } => cmd_add(pool, tokens, &username).await,
        UserCommands::List => cmd_list(pool).await,
    }
}

// -----------------------------------------------------------------------
// pacer user add
// -----------------------------------------------------------------------

async fn cmd_add(pool: &PgPool, tokens: &TokenSigner, username: &str) -> Result<()> {
    if let Some(existing) = users::get_user_by_username(pool, username).await? {
        bail!("username {username:?} is already taken (user {})", existing.id);
    }

    let user = users::insert_user(pool, username).await?;
    let bearer = tokens.mint(user.id);

    println!("User created:");
    println!("  ID:       {}", user.id);
    println!("  Username: {}", user.username);
    println!("  Token:    {bearer}");
    println!();
    println!("Send the token as `Authorization: Bearer {bearer}` to the API.");

    Ok(())
}

// -----------------------------------------------------------------------
// pacer user list
// -----------------------------------------------------------------------

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let all = users::list_users(pool).await?;

    if all.is_empty() {
        println!("No users found. Use `pacer user add` to create one.");
        return Ok(());
    }

    // Table format: fixed-width columns.
    let id_w = all
        .iter()
        .map(|u| u.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);
    let user_w = all
        .iter()
        .map(|u| u.username.len())
        .max()
        .unwrap_or(8)
        .max(8);

    println!("{:<id_w$}  {:<user_w$}  {:<6}  CREATED", "ID", "USERNAME", "PLAN");
    for user in &all {
        let plan = user
            .plan_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<id_w$}  {:<user_w$}  {:<6}  {}",
            user.id,
            user.username,
            plan,
            user.created_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
