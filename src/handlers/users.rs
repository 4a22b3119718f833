//! User profile upsert

use axum::{
    extract::{rejection::JsonRejection, Json},
    Extension,
};

use super::chat::AppState;
use super::response::ApiResponse;
use crate::domain::models::UserProfile;
use crate::infrastructure::storage::UserUpsert;
use crate::shared::logging::log_user_saved;
use crate::shared::{AppError, Result};

/// POST /users
///
/// Creates the profile named in the body, or updates only the fields the
/// body provides when the name is already known.
pub async fn upsert_user_handler(
    Extension(state): Extension<AppState>,
    payload: std::result::Result<Json<UserProfile>, JsonRejection>,
) -> Result<ApiResponse<UserUpsert>> {
    let Json(profile) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let name = profile
        .key_name()
        .map_err(AppError::InvalidRequest)?
        .to_string();

    let saved = state.users.upsert(&name, profile).await?;
    log_user_saved(&saved.user_id, saved.created);

    Ok(ApiResponse::success(saved))
}
