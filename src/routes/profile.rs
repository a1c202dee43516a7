use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::profile_dto::UpsertProfileRequest;
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpsertProfileRequest>,
) -> Result<Response> {
    req.validate()?;
    let profile = state
        .profile_service
        .upsert_profile(
            &claims.sub,
            &req.email,
            req.full_name.as_deref(),
            &req.role,
            req.resume_url.as_deref(),
        )
        .await?;
    Ok(Json(profile).into_response())
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let profile = state.profile_service.get_profile(&claims.sub).await?;
    Ok(Json(profile).into_response())
}
