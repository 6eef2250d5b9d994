use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::{RepoError, RepoResult};

/// DB access for the `users` table.
///
/// Assumed schema:
/// - users.id (uuid, default gen_random_uuid())
/// - users.username (text, unique index `users_username_key`)
/// - users.email (text, unique index `users_email_key`)
/// - users.password_hash (text)
/// - users.first_name (text, nullable)
/// - users.last_name (text, nullable)
/// - users.created_at (timestamptz, default now())
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

pub async fn create(db: &PgPool, user: NewUser<'_>) -> RepoResult<UserRow> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (username, email, password_hash, first_name, last_name)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, email, password_hash, first_name, last_name, created_at
        "#,
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.first_name)
    .bind(user.last_name)
    .fetch_one(db)
    .await
    .map_err(map_insert_error)?;

    Ok(row)
}

pub async fn find_by_email(db: &PgPool, email: &str) -> RepoResult<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, email, password_hash, first_name, last_name, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn find_by_id(db: &PgPool, user_id: Uuid) -> RepoResult<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, username, email, password_hash, first_name, last_name, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

/// Give meaning to insert errors: a unique violation becomes
/// `RepoError::Duplicate` carrying the conflicting column name.
fn map_insert_error(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        let field = db_err
            .constraint()
            .and_then(field_from_constraint)
            .unwrap_or_else(|| "value".to_string());
        return RepoError::Duplicate(field);
    }

    RepoError::Db(err)
}

/// Extract the column name from a Postgres unique-constraint name of the
/// form `users_<column>_key`.
fn field_from_constraint(constraint: &str) -> Option<String> {
    constraint
        .strip_prefix("users_")?
        .strip_suffix("_key")
        .map(|s| s.to_string())
}
