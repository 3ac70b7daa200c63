//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router binds the REST API (auth, board directory) and the
//! realtime websocket endpoint. Clients are headless: there is no UI
//! surface served from this process.

pub mod auth;
pub mod boards;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/ws-ticket", post(auth::ws_ticket))
        .route("/api/board", get(boards::list_boards_rest).post(boards::create_board_rest))
        .route(
            "/api/board/{id}",
            get(boards::get_board_rest)
                .patch(boards::update_board_rest)
                .delete(boards::delete_board_rest),
        )
        .route("/api/board/{id}/export.svg", get(boards::export_svg))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
