use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};

use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_dashboard_stats(State(state): State<AppState>) -> Result<Response> {
    let stats = state.interview_store.dashboard_stats().await?;
    Ok(Json(stats).into_response())
}
