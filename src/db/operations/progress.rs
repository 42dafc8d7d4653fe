use std::collections::{HashMap, HashSet};

use sqlx::{Row, SqliteConnection};

use crate::progress::types::{CourseProgress, ModuleCompletion};

/// Atomic "insert if absent and eligible": the row is written only when every direct
/// prerequisite of the module is already among the user's completions. Returns whether
/// this call created the completion.
pub async fn insert_completion_if_eligible(
    conn: &mut SqliteConnection,
    completion: &ModuleCompletion,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO "module_completions" ("userId", "moduleId", "courseId", "completedAt")
        SELECT ?1, ?2, ?3, ?4
        WHERE NOT EXISTS (
            SELECT 1 FROM "prerequisites" p
            WHERE p."moduleId" = ?2
              AND NOT EXISTS (
                  SELECT 1 FROM "module_completions" c
                  WHERE c."userId" = ?1 AND c."moduleId" = p."requiredModuleId"
              )
        )
        ON CONFLICT ("userId", "moduleId") DO NOTHING
        "#,
    )
    .bind(&completion.user_id)
    .bind(&completion.module_id)
    .bind(&completion.course_id)
    .bind(&completion.completed_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn completion_exists(
    conn: &mut SqliteConnection,
    user_id: &str,
    module_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"SELECT 1 FROM "module_completions" WHERE "userId" = ? AND "moduleId" = ?"#,
    )
    .bind(user_id)
    .bind(module_id)
    .fetch_optional(conn)
    .await?;
    Ok(found.is_some())
}

pub async fn completed_module_ids(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<HashSet<String>, sqlx::Error> {
    let ids: Vec<String> =
        sqlx::query_scalar(r#"SELECT "moduleId" FROM "module_completions" WHERE "userId" = ?"#)
            .bind(user_id)
            .fetch_all(conn)
            .await?;
    Ok(ids.into_iter().collect())
}

pub async fn course_completed_module_ids(
    conn: &mut SqliteConnection,
    user_id: &str,
    course_id: &str,
) -> Result<HashSet<String>, sqlx::Error> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"SELECT "moduleId" FROM "module_completions" WHERE "userId" = ? AND "courseId" = ?"#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_all(conn)
    .await?;
    Ok(ids.into_iter().collect())
}

pub async fn fetch_completions(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<ModuleCompletion>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "userId", "moduleId", "courseId", "completedAt"
        FROM "module_completions"
        WHERE "userId" = ?
        ORDER BY "completedAt", "moduleId"
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ModuleCompletion {
                user_id: row.try_get("userId")?,
                module_id: row.try_get("moduleId")?,
                course_id: row.try_get("courseId")?,
                completed_at: row.try_get("completedAt")?,
            })
        })
        .collect()
}

pub async fn upsert_course_progress(
    conn: &mut SqliteConnection,
    progress: &CourseProgress,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "course_progress" (
            "userId", "courseId", "completedCount", "totalCount",
            "percentComplete", "isComplete", "updatedAt"
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT ("userId", "courseId") DO UPDATE SET
            "completedCount" = excluded."completedCount",
            "totalCount" = excluded."totalCount",
            "percentComplete" = excluded."percentComplete",
            "isComplete" = excluded."isComplete",
            "updatedAt" = excluded."updatedAt"
        "#,
    )
    .bind(&progress.user_id)
    .bind(&progress.course_id)
    .bind(progress.completed_count)
    .bind(progress.total_count)
    .bind(progress.percent_complete)
    .bind(progress.is_complete)
    .bind(&progress.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Persisted projections for a user, with completed module ids in curriculum order.
pub async fn fetch_course_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<CourseProgress>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "userId", "courseId", "completedCount", "totalCount",
               "percentComplete", "isComplete", "updatedAt"
        FROM "course_progress"
        WHERE "userId" = ?
        ORDER BY "courseId"
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let completion_rows = sqlx::query(
        r#"
        SELECT m."courseId", c."moduleId"
        FROM "module_completions" c
        JOIN "modules" m ON m."id" = c."moduleId"
        WHERE c."userId" = ?
        ORDER BY m."courseId", m."position", m."id"
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut completed_by_course: HashMap<String, Vec<String>> = HashMap::new();
    for row in &completion_rows {
        let course_id: String = row.try_get("courseId")?;
        completed_by_course
            .entry(course_id)
            .or_default()
            .push(row.try_get("moduleId")?);
    }

    rows.iter()
        .map(|row| {
            let course_id: String = row.try_get("courseId")?;
            let completed_module_ids = completed_by_course.remove(&course_id).unwrap_or_default();
            Ok(CourseProgress {
                user_id: row.try_get("userId")?,
                completed_count: row.try_get("completedCount")?,
                total_count: row.try_get("totalCount")?,
                percent_complete: row.try_get("percentComplete")?,
                is_complete: row.try_get("isComplete")?,
                updated_at: row.try_get("updatedAt")?,
                course_id,
                completed_module_ids,
                warnings: Vec::new(),
            })
        })
        .collect()
}
