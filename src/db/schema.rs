use sqlx::SqlitePool;

pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");
pub const SCHEMA_VERSION: &str = "1";

/// Splits a SQL script on `;`, ignoring separators inside quoted identifiers or literals
/// and dropping `--` comment lines.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for line in sql.lines() {
        if quote.is_none() && line.trim_start().starts_with("--") {
            continue;
        }

        for ch in line.chars() {
            match (quote, ch) {
                (None, '\'' | '"') => quote = Some(ch),
                (Some(open), _) if open == ch => quote = None,
                (None, ';') => {
                    let stmt = current.trim();
                    if !stmt.is_empty() {
                        statements.push(stmt.to_string());
                    }
                    current.clear();
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
        current.push('\n');
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }

    statements
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let has_metadata: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "sqlite_master" WHERE "type" = 'table' AND "name" = '_db_metadata'"#,
    )
    .fetch_one(pool)
    .await?;

    let applied: Option<String> = if has_metadata > 0 {
        sqlx::query_scalar(r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#)
            .fetch_optional(pool)
            .await?
    } else {
        None
    };

    if applied.as_deref() == Some(SCHEMA_VERSION) {
        tracing::debug!(version = SCHEMA_VERSION, "schema up to date");
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for stmt in split_sql_statements(SCHEMA_SQL) {
        sqlx::query(&stmt).execute(&mut *tx).await?;
    }
    sqlx::query(
        r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#,
    )
    .bind(SCHEMA_VERSION)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(version = SCHEMA_VERSION, "schema applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_ignores_comments_and_quoted_semicolons() {
        let sql = "-- header; comment\nCREATE TABLE \"a;b\" (x TEXT DEFAULT ';');\n\nCREATE INDEX i ON t (x);\n";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE \"a;b\""));
        assert!(statements[0].ends_with("DEFAULT ';')"));
        assert_eq!(statements[1], "CREATE INDEX i ON t (x)");
    }

    #[test]
    fn bundled_schema_creates_every_table() {
        let statements = split_sql_statements(SCHEMA_SQL);
        for table in [
            "\"courses\"",
            "\"modules\"",
            "\"prerequisites\"",
            "\"users\"",
            "\"module_completions\"",
            "\"course_progress\"",
        ] {
            assert!(
                statements
                    .iter()
                    .any(|stmt| stmt.starts_with("CREATE TABLE") && stmt.contains(table)),
                "missing table {table}"
            );
        }
    }

    #[tokio::test]
    async fn rerunning_migrations_keeps_the_recorded_version() {
        let db = crate::db::Database::in_memory().await.unwrap();
        run_migrations(db.pool()).await.unwrap();

        let version: String = sqlx::query_scalar(
            r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#,
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
