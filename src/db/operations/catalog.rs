use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::Database;
use crate::progress::types::{Course, Module, PrerequisiteEdge};

const COURSE_COLUMNS: &str =
    r#""id", "title", "description", "category", "level", "durationHours""#;
const MODULE_COLUMNS: &str = r#""id", "courseId", "position", "title", "description", "durationMinutes", "exercises", "videos""#;

fn map_course(row: &SqliteRow, module_ids: Vec<String>) -> Result<Course, sqlx::Error> {
    Ok(Course {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        level: row.try_get("level")?,
        duration_hours: row.try_get("durationHours")?,
        module_ids,
    })
}

fn map_module(row: &SqliteRow) -> Result<Module, sqlx::Error> {
    Ok(Module {
        id: row.try_get("id")?,
        course_id: row.try_get("courseId")?,
        position: row.try_get("position")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        duration_minutes: row.try_get("durationMinutes")?,
        exercises: row.try_get("exercises")?,
        videos: row.try_get("videos")?,
    })
}

pub async fn fetch_course(db: &Database, course_id: &str) -> Result<Option<Course>, sqlx::Error> {
    let mut conn = db.pool().acquire().await?;
    let sql = format!(r#"SELECT {COURSE_COLUMNS} FROM "courses" WHERE "id" = ?"#);
    let Some(row) = sqlx::query(&sql)
        .bind(course_id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let module_ids = fetch_module_ids_by_course(&mut conn, course_id).await?;
    map_course(&row, module_ids).map(Some)
}

pub async fn fetch_courses(
    db: &Database,
    category: Option<&str>,
) -> Result<Vec<Course>, sqlx::Error> {
    let rows = match category {
        Some(category) => {
            let sql = format!(
                r#"SELECT {COURSE_COLUMNS} FROM "courses" WHERE "category" = ? ORDER BY "title", "id""#
            );
            sqlx::query(&sql).bind(category).fetch_all(db.pool()).await?
        }
        None => {
            let sql = format!(r#"SELECT {COURSE_COLUMNS} FROM "courses" ORDER BY "title", "id""#);
            sqlx::query(&sql).fetch_all(db.pool()).await?
        }
    };

    let module_rows = sqlx::query(
        r#"SELECT "id", "courseId" FROM "modules" ORDER BY "courseId", "position", "id""#,
    )
    .fetch_all(db.pool())
    .await?;

    let mut modules_by_course: std::collections::HashMap<String, Vec<String>> =
        std::collections::HashMap::new();
    for row in &module_rows {
        let course_id: String = row.try_get("courseId")?;
        modules_by_course
            .entry(course_id)
            .or_default()
            .push(row.try_get("id")?);
    }

    rows.iter()
        .map(|row| {
            let id: String = row.try_get("id")?;
            let module_ids = modules_by_course.remove(&id).unwrap_or_default();
            map_course(row, module_ids)
        })
        .collect()
}

pub async fn fetch_modules_by_course(
    db: &Database,
    course_id: &str,
) -> Result<Vec<Module>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {MODULE_COLUMNS} FROM "modules" WHERE "courseId" = ? ORDER BY "position", "id""#
    );
    let rows = sqlx::query(&sql).bind(course_id).fetch_all(db.pool()).await?;
    rows.iter().map(map_module).collect()
}

pub async fn fetch_module(db: &Database, module_id: &str) -> Result<Option<Module>, sqlx::Error> {
    let sql = format!(r#"SELECT {MODULE_COLUMNS} FROM "modules" WHERE "id" = ?"#);
    let row = sqlx::query(&sql)
        .bind(module_id)
        .fetch_optional(db.pool())
        .await?;
    row.as_ref().map(map_module).transpose()
}

/// Module ids of a course in curriculum order.
pub async fn fetch_module_ids_by_course(
    conn: &mut SqliteConnection,
    course_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"SELECT "id" FROM "modules" WHERE "courseId" = ? ORDER BY "position", "id""#,
    )
    .bind(course_id)
    .fetch_all(conn)
    .await
}

/// Edges whose dependent module belongs to the course. A required module outside the
/// course shows up as a dangling reference during validation.
pub async fn fetch_prerequisite_edges(
    conn: &mut SqliteConnection,
    course_id: &str,
) -> Result<Vec<PrerequisiteEdge>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT p."moduleId", p."requiredModuleId"
        FROM "prerequisites" p
        JOIN "modules" m ON m."id" = p."moduleId"
        WHERE m."courseId" = ?
        ORDER BY p."moduleId", p."requiredModuleId"
        "#,
    )
    .bind(course_id)
    .fetch_all(conn)
    .await?;
    rows.iter().map(map_edge).collect()
}

pub async fn fetch_all_prerequisites(db: &Database) -> Result<Vec<PrerequisiteEdge>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "moduleId", "requiredModuleId" FROM "prerequisites" ORDER BY "moduleId", "requiredModuleId""#,
    )
    .fetch_all(db.pool())
    .await?;
    rows.iter().map(map_edge).collect()
}

fn map_edge(row: &SqliteRow) -> Result<PrerequisiteEdge, sqlx::Error> {
    Ok(PrerequisiteEdge {
        module_id: row.try_get("moduleId")?,
        required_module_id: row.try_get("requiredModuleId")?,
    })
}

pub async fn upsert_course(conn: &mut SqliteConnection, course: &Course) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "courses" ("id", "title", "description", "category", "level", "durationHours")
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT ("id") DO UPDATE SET
            "title" = excluded."title",
            "description" = excluded."description",
            "category" = excluded."category",
            "level" = excluded."level",
            "durationHours" = excluded."durationHours"
        "#,
    )
    .bind(&course.id)
    .bind(&course.title)
    .bind(&course.description)
    .bind(&course.category)
    .bind(&course.level)
    .bind(course.duration_hours)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn upsert_module(conn: &mut SqliteConnection, module: &Module) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "modules" (
            "id", "courseId", "position", "title", "description",
            "durationMinutes", "exercises", "videos"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT ("id") DO UPDATE SET
            "courseId" = excluded."courseId",
            "position" = excluded."position",
            "title" = excluded."title",
            "description" = excluded."description",
            "durationMinutes" = excluded."durationMinutes",
            "exercises" = excluded."exercises",
            "videos" = excluded."videos"
        "#,
    )
    .bind(&module.id)
    .bind(&module.course_id)
    .bind(module.position)
    .bind(&module.title)
    .bind(&module.description)
    .bind(module.duration_minutes)
    .bind(module.exercises)
    .bind(module.videos)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_prerequisite(
    conn: &mut SqliteConnection,
    edge: &PrerequisiteEdge,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO "prerequisites" ("moduleId", "requiredModuleId") VALUES (?, ?)
           ON CONFLICT ("moduleId", "requiredModuleId") DO NOTHING"#,
    )
    .bind(&edge.module_id)
    .bind(&edge.required_module_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Removes every edge whose dependent is `module_id`.
pub async fn delete_prerequisites_of(
    conn: &mut SqliteConnection,
    module_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "prerequisites" WHERE "moduleId" = ?"#)
        .bind(module_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Completions of a deleted module stay in the ledger; progress only counts modules
/// that are still part of a course.
pub async fn delete_module(conn: &mut SqliteConnection, module_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(r#"DELETE FROM "modules" WHERE "id" = ?"#)
        .bind(module_id)
        .execute(conn)
        .await?;
    Ok(())
}
