use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::profile::{ROLE_CANDIDATE, ROLE_INTERVIEWER};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

/// Pulls and verifies the bearer token, returning the claims or a ready
/// 401 response.
fn authenticate(req: &Request) -> Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| unauthorized("invalid_token"))
}

async fn run_with_role(mut req: Request, next: Next, allowed: &[&str]) -> Response {
    let claims = match authenticate(&req) {
        Ok(claims) => claims,
        Err(response) => return response,
    };
    if !allowed.is_empty() {
        let role = claims.role.as_deref().unwrap_or_default();
        if !allowed.iter().any(|r| r.eq_ignore_ascii_case(role)) {
            return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"}))).into_response();
        }
    }
    req.extensions_mut().insert(claims);
    next.run(req).await
}

/// Any valid token; handlers read the caller identity from the
/// [`Claims`] extension.
pub async fn require_bearer_auth(req: Request, next: Next) -> Response {
    run_with_role(req, next, &[]).await
}

pub async fn require_candidate(req: Request, next: Next) -> Response {
    run_with_role(req, next, &[ROLE_CANDIDATE]).await
}

pub async fn require_interviewer(req: Request, next: Next) -> Response {
    run_with_role(req, next, &[ROLE_INTERVIEWER]).await
}
