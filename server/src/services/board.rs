//! Board directory service — CRUD with ownership checks.
//!
//! DESIGN
//! ======
//! Boards are owned by their creator; ownerless boards are open to any
//! authenticated user. Permission failures are rejected before any
//! mutating statement runs, and surface as `E_FORBIDDEN` frames or 403s.

use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("board not found: {0}")]
    NotFound(Uuid),
    #[error("board owned by another user: {0}")]
    Forbidden(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl frames::ErrorCode for BoardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_BOARD_NOT_FOUND",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Row returned from board queries. `data` is the serialized scene.
#[derive(Debug, Clone)]
pub struct BoardRow {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub data: String,
}

fn row_to_board(r: &sqlx::postgres::PgRow) -> BoardRow {
    BoardRow {
        id: r.get("id"),
        name: r.get("name"),
        owner_id: r.get("owner_id"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
        data: r.get("data"),
    }
}

// =============================================================================
// ACCESS
// =============================================================================

/// Verify the board exists and the user may touch it (owner or ownerless).
///
/// # Errors
///
/// `NotFound` for a missing board, `Forbidden` for someone else's board.
pub async fn ensure_board_access(pool: &PgPool, board_id: Uuid, user_id: Uuid) -> Result<(), BoardError> {
    let owner: Option<Option<Uuid>> = sqlx::query_scalar("SELECT owner_id FROM boards WHERE id = $1")
        .bind(board_id)
        .fetch_optional(pool)
        .await?;

    match owner {
        None => Err(BoardError::NotFound(board_id)),
        Some(Some(owner_id)) if owner_id != user_id => Err(BoardError::Forbidden(board_id)),
        Some(_) => Ok(()),
    }
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a new board with an empty scene.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_board(pool: &PgPool, name: &str, owner_id: Uuid) -> Result<BoardRow, BoardError> {
    let id = Uuid::new_v4();
    let row = sqlx::query(
        "INSERT INTO boards (id, name, owner_id) VALUES ($1, $2, $3)
         RETURNING id, name, owner_id, created_at, updated_at, data",
    )
    .bind(id)
    .bind(name)
    .bind(owner_id)
    .fetch_one(pool)
    .await?;

    Ok(row_to_board(&row))
}

/// List boards visible to the user (owned or ownerless), newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_boards(pool: &PgPool, user_id: Uuid) -> Result<Vec<BoardRow>, BoardError> {
    let rows = sqlx::query(
        "SELECT id, name, owner_id, created_at, updated_at, data
         FROM boards
         WHERE owner_id = $1 OR owner_id IS NULL
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_board).collect())
}

/// Fetch one board, enforcing access.
///
/// # Errors
///
/// `NotFound`, `Forbidden`, or a database error.
pub async fn get_board(pool: &PgPool, board_id: Uuid, user_id: Uuid) -> Result<BoardRow, BoardError> {
    ensure_board_access(pool, board_id, user_id).await?;

    let row = sqlx::query(
        "SELECT id, name, owner_id, created_at, updated_at, data
         FROM boards WHERE id = $1",
    )
    .bind(board_id)
    .fetch_optional(pool)
    .await?
    .ok_or(BoardError::NotFound(board_id))?;

    Ok(row_to_board(&row))
}

/// Rename a board and/or replace its scene data.
///
/// # Errors
///
/// `NotFound`, `Forbidden`, or a database error.
pub async fn update_board(
    pool: &PgPool,
    board_id: Uuid,
    user_id: Uuid,
    name: Option<&str>,
    data: Option<&str>,
) -> Result<(), BoardError> {
    ensure_board_access(pool, board_id, user_id).await?;

    let result = sqlx::query(
        "UPDATE boards
         SET name = COALESCE($2, name),
             data = COALESCE($3, data),
             updated_at = now()
         WHERE id = $1",
    )
    .bind(board_id)
    .bind(name)
    .bind(data)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BoardError::NotFound(board_id));
    }
    Ok(())
}

/// Delete a board.
///
/// # Errors
///
/// `NotFound`, `Forbidden`, or a database error.
pub async fn delete_board(pool: &PgPool, board_id: Uuid, user_id: Uuid) -> Result<(), BoardError> {
    ensure_board_access(pool, board_id, user_id).await?;

    sqlx::query("DELETE FROM boards WHERE id = $1")
        .bind(board_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Overwrite a board's scene data. Used by the persistence flush, which
/// bypasses per-user access (the room already validated its members).
pub async fn flush_board_data(pool: &PgPool, board_id: Uuid, data: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE boards SET data = $2, updated_at = now() WHERE id = $1")
        .bind(board_id)
        .bind(data)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
