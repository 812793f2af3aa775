//! Job store: owner-scoped CRUD. Every query filters on the owning user.

pub mod handlers;

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::JobRow;

pub async fn find_by_id(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<JobRow>, AppError> {
    let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Case-insensitive exact title match, scoped to the owner.
pub async fn find_by_title(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
) -> Result<Option<JobRow>, AppError> {
    let row: Option<JobRow> =
        sqlx::query_as("SELECT * FROM jobs WHERE user_id = $1 AND LOWER(title) = LOWER($2)")
            .bind(user_id)
            .bind(title)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<JobRow>, AppError> {
    let rows: Vec<JobRow> =
        sqlx::query_as("SELECT * FROM jobs WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

pub async fn insert(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    description: &str,
    status: &str,
) -> Result<JobRow, AppError> {
    let row: JobRow = sqlx::query_as(
        r#"
        INSERT INTO jobs (id, user_id, title, description, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Partial update; absent fields keep their stored values.
pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    status: Option<&str>,
) -> Result<Option<JobRow>, AppError> {
    let row: Option<JobRow> = sqlx::query_as(
        r#"
        UPDATE jobs
        SET title = COALESCE($3, title),
            description = COALESCE($4, description),
            status = COALESCE($5, status),
            updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(status)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Deletes the job only. Applications keep their job_id; whether to remove
/// them too is the client's decision.
pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
