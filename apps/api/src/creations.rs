//! Creation Record Store: append-only persistence of generated artifacts.
//!
//! One row per successful generation, keyed by user and type. Rows are never
//! updated after insert. Callers on the generation path treat insert failure
//! as non-fatal (logged at the orchestrator, artifact still returned).

use sqlx::PgPool;

use crate::models::CreationRow;

pub async fn insert_creation(
    pool: &PgPool,
    user_id: &str,
    prompt: &str,
    content: &str,
    creation_type: &str,
) -> sqlx::Result<CreationRow> {
    sqlx::query_as::<_, CreationRow>(
        r#"
        INSERT INTO creations (id, user_id, prompt, content, type, created_at)
        VALUES (gen_random_uuid(), $1, $2, $3, $4, now())
        RETURNING id, user_id, prompt, content, type, created_at
        "#,
    )
    .bind(user_id)
    .bind(prompt)
    .bind(content)
    .bind(creation_type)
    .fetch_one(pool)
    .await
}

/// All creations for a caller, newest first.
pub async fn list_creations(pool: &PgPool, user_id: &str) -> sqlx::Result<Vec<CreationRow>> {
    sqlx::query_as::<_, CreationRow>(
        "SELECT id, user_id, prompt, content, type, created_at
         FROM creations WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
