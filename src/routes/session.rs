use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::session_dto::{
    SaveDraftRequest, SessionResponse, StartSessionRequest, SubmitAnswerRequest,
    SubmitAnswerResponse, SummaryResponse,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::session::InterviewSession;
use crate::AppState;

/// Sessions are addressed by id but owned by the candidate who started
/// them; a foreign id reads as not-found rather than forbidden.
async fn owned_session(
    state: &AppState,
    claims: &Claims,
    id: Uuid,
) -> Result<InterviewSession> {
    let session = state.session_service.snapshot(id).await?;
    if session.candidate_id != claims.sub {
        return Err(Error::NotFound("Session not found".to_string()));
    }
    Ok(session)
}

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartSessionRequest>,
) -> Result<Response> {
    req.validate()?;
    let per_tier = req
        .questions_per_tier
        .map(|n| n as usize)
        .unwrap_or(crate::config::get_config().questions_per_tier);

    let session = state
        .session_service
        .start_session(claims.sub, req.resume_context, per_tier)
        .await?;
    Ok(Json(SessionResponse::from(&session)).into_response())
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let session = owned_session(&state, &claims, id).await?;
    Ok(Json(SessionResponse::from(&session)).into_response())
}

#[axum::debug_handler]
pub async fn save_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<SaveDraftRequest>,
) -> Result<Response> {
    owned_session(&state, &claims, id).await?;
    state
        .session_service
        .update_draft(id, req.text, req.transcript)
        .await?;
    Ok(Json(serde_json::json!({ "saved": true })).into_response())
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Response> {
    owned_session(&state, &claims, id).await?;
    let (answer, session) = state
        .session_service
        .submit_answer(id, req.text, req.transcript)
        .await?;
    Ok(Json(SubmitAnswerResponse {
        score: answer.score,
        feedback: answer.feedback,
        time_spent: answer.time_spent,
        session: SessionResponse::from(&session),
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    owned_session(&state, &claims, id).await?;
    let (summary, session) = state.session_service.generate_final_summary(id).await?;

    // The report stands on its own even when the database is unreachable.
    if let Err(e) = state.interview_store.save_completed(&session, &summary).await {
        tracing::error!(session_id = %id, error = ?e, "Failed to persist completed interview");
    }

    Ok(Json(SummaryResponse::new(&session, &summary)).into_response())
}

#[axum::debug_handler]
pub async fn abandon_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    owned_session(&state, &claims, id).await?;
    state.session_service.abandon(id).await?;
    Ok(Json(serde_json::json!({ "abandoned": true })).into_response())
}
