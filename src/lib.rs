pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::time::Duration;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::ai_service::AiService;
use crate::services::eval_service::AnswerEvaluator;
use crate::services::interview_store::InterviewStore;
use crate::services::profile_service::ProfileService;
use crate::services::question_service::QuestionGenerator;
use crate::services::session_service::SessionService;
use crate::services::summary_service::SummaryAggregator;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_service: SessionService,
    pub profile_service: ProfileService,
    pub interview_store: InterviewStore,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");

        let ai = AiService::new(
            config.openai_api_key.clone(),
            http_client,
            Duration::from_secs(config.ai_timeout_secs),
        );
        let session_service = SessionService::new(
            QuestionGenerator::new(ai.clone()),
            AnswerEvaluator::new(ai.clone()),
            SummaryAggregator::new(ai),
        );
        let profile_service = ProfileService::new(pool.clone());
        let interview_store = InterviewStore::new(pool.clone());

        Self {
            pool,
            session_service,
            profile_service,
            interview_store,
        }
    }
}

/// Full application router; shared by `main` and the integration tests.
pub fn build_router(state: AppState, public_rps: u32) -> Router {
    let base_routes = Router::new().route("/health", get(routes::health::health));

    let session_api = Router::new()
        .route("/api/session/start", post(routes::session::start_session))
        .route("/api/session/:id", get(routes::session::get_session))
        .route("/api/session/:id", delete(routes::session::abandon_session))
        .route("/api/session/:id/draft", patch(routes::session::save_draft))
        .route("/api/session/:id/answer", post(routes::session::submit_answer))
        .route("/api/session/:id/summary", post(routes::session::get_summary))
        .layer(axum::middleware::from_fn(
            middleware::auth::require_candidate,
        ))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::RateLimiter::new(public_rps),
            middleware::rate_limit::rps_middleware,
        ));

    let profile_api = Router::new()
        .route("/api/profile", put(routes::profile::upsert_profile))
        .route("/api/profile", get(routes::profile::get_profile))
        .layer(axum::middleware::from_fn(
            middleware::auth::require_bearer_auth,
        ));

    let dashboard_api = Router::new()
        .route(
            "/api/dashboard/stats",
            get(routes::dashboard::get_dashboard_stats),
        )
        .layer(axum::middleware::from_fn(
            middleware::auth::require_interviewer,
        ));

    base_routes
        .merge(session_api)
        .merge(profile_api)
        .merge(dashboard_api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
