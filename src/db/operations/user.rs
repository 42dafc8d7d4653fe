use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::db::Database;
use crate::progress::types::User;

fn map_user(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: row.try_get("createdAt")?,
    })
}

pub async fn fetch_user(db: &Database, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT "id", "email", "name", "createdAt" FROM "users" WHERE "id" = ?"#)
        .bind(user_id)
        .fetch_optional(db.pool())
        .await?;
    row.as_ref().map(map_user).transpose()
}

pub async fn find_user_by_email(db: &Database, email: &str) -> Result<Option<User>, sqlx::Error> {
    let row =
        sqlx::query(r#"SELECT "id", "email", "name", "createdAt" FROM "users" WHERE "email" = ?"#)
            .bind(email)
            .fetch_optional(db.pool())
            .await?;
    row.as_ref().map(map_user).transpose()
}

pub async fn user_exists(db: &Database, user_id: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(r#"SELECT 1 FROM "users" WHERE "id" = ?"#)
        .bind(user_id)
        .fetch_optional(db.pool())
        .await?;
    Ok(found.is_some())
}

/// Inserts the user unless the email is taken. Returns `false` on an email conflict.
pub async fn insert_user(db: &Database, user: &User) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO "users" ("id", "email", "name", "createdAt")
        VALUES (?, ?, ?, ?)
        ON CONFLICT ("email") DO NOTHING
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.created_at)
    .execute(db.pool())
    .await?;
    Ok(result.rows_affected() == 1)
}
