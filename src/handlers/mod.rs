/// Chat completion streaming
pub mod chat;

/// Halt requests for running streams
pub mod halt;

pub mod response;

/// Session status and service health
pub mod status;

pub mod summarize;

/// User profile upsert
pub mod users;

use axum::{
    response::Redirect,
    routing::{get, post},
    Extension, Router,
};

pub use chat::{completions_handler, AppState};
pub use halt::halt_handler;
pub use response::ApiResponse;
pub use status::{health_handler, session_status_handler};
pub use summarize::summarize_handler;
pub use users::upsert_user_handler;

/// All HTTP routes, with `state` attached as an `Extension`
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::temporary("/v1/health") }))
        .route("/v1/health", get(health_handler))
        .route("/v1/chat/completions", post(completions_handler))
        .route("/v1/chat/halt", post(halt_handler))
        .route("/v1/chat/status", get(session_status_handler))
        .route("/v1/chat/summarize", post(summarize_handler))
        .route("/users", post(upsert_user_handler))
        .layer(Extension(state))
}
