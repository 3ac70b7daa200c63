//! Board directory routes — REST CRUD plus the SVG export surface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::board::{self, BoardError, BoardRow};
use crate::state::AppState;

// =============================================================================
// RESPONSE SHAPES
// =============================================================================

/// Board metadata for list views. Scene data is omitted; fetch the board
/// to get it.
#[derive(Serialize)]
pub struct BoardSummary {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Full board record including the serialized scene.
#[derive(Serialize)]
pub struct BoardResponse {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
    pub data: String,
}

fn unix_ms(dt: time::OffsetDateTime) -> i64 {
    i64::try_from(dt.unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
}

fn to_summary(row: &BoardRow) -> BoardSummary {
    BoardSummary {
        id: row.id,
        name: row.name.clone(),
        owner_id: row.owner_id,
        created_at: unix_ms(row.created_at),
        updated_at: unix_ms(row.updated_at),
    }
}

fn to_response(row: BoardRow) -> BoardResponse {
    BoardResponse {
        id: row.id,
        name: row.name,
        owner_id: row.owner_id,
        created_at: unix_ms(row.created_at),
        updated_at: unix_ms(row.updated_at),
        data: row.data,
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/board` — boards visible to the user.
pub async fn list_boards_rest(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<BoardSummary>>, StatusCode> {
    let rows = board::list_boards(&state.pool, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(rows.iter().map(to_summary).collect()))
}

#[derive(Deserialize)]
pub struct CreateBoardBody {
    pub name: Option<String>,
}

/// `POST /api/board` — create a board owned by the caller.
pub async fn create_board_rest(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateBoardBody>,
) -> Result<Json<BoardResponse>, StatusCode> {
    let name = body.name.as_deref().unwrap_or("Untitled Board");
    let row = board::create_board(&state.pool, name, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(to_response(row)))
}

/// `GET /api/board/:id` — full board record, scene data included.
pub async fn get_board_rest(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
) -> Result<Json<BoardResponse>, StatusCode> {
    let row = board::get_board(&state.pool, board_id, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(to_response(row)))
}

#[derive(Deserialize)]
pub struct UpdateBoardBody {
    pub name: Option<String>,
    pub data: Option<String>,
}

/// `PATCH /api/board/:id` — rename and/or replace scene data.
pub async fn update_board_rest(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
    Json(body): Json<UpdateBoardBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    board::update_board(&state.pool, board_id, auth.user.id, body.name.as_deref(), body.data.as_deref())
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `DELETE /api/board/:id` — delete a board.
pub async fn delete_board_rest(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    board::delete_board(&state.pool, board_id, auth.user.id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `GET /api/board/:id/export.svg` — flatten the stored scene to SVG.
pub async fn export_svg(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(board_id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    let row = board::get_board(&state.pool, board_id, auth.user.id)
        .await
        .map_err(board_error_to_status)?;

    // A placeholder or unparseable record exports as an empty scene.
    let doc = scene::SceneDocument::from_json(&row.data).unwrap_or_default();
    let svg = scene::export::to_svg(&doc);

    let filename = format!("attachment; filename=\"{}.svg\"", row.name.replace('"', ""));
    Ok((
        [(CONTENT_TYPE, "image/svg+xml"), (CONTENT_DISPOSITION, filename.as_str())],
        svg,
    )
        .into_response())
}

pub(crate) fn board_error_to_status(err: BoardError) -> StatusCode {
    match err {
        BoardError::NotFound(_) => StatusCode::NOT_FOUND,
        BoardError::Forbidden(_) => StatusCode::FORBIDDEN,
        BoardError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "boards_test.rs"]
mod tests;
