use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::Question;
use crate::models::session::InterviewSession;
use crate::services::summary_service::Summary;

#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(length(max = 8000, message = "Resume context is too long"))]
    pub resume_context: Option<String>,
    #[validate(range(min = 1, max = 5, message = "questions_per_tier must be between 1 and 5"))]
    pub questions_per_tier: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SaveDraftRequest {
    pub text: String,
    pub transcript: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub text: String,
    pub transcript: Option<String>,
}

/// Candidate-facing view of a session: the current question plus progress,
/// never the full upcoming question list.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub current_question: Option<Question>,
    pub question_number: usize,
    pub total_questions: usize,
    pub time_remaining: i32,
    pub is_active: bool,
    pub is_completed: bool,
    pub answered: usize,
}

impl From<&InterviewSession> for SessionResponse {
    fn from(session: &InterviewSession) -> Self {
        Self {
            session_id: session.id,
            current_question: session.current_question().cloned(),
            question_number: (session.current_question_index + 1).min(session.questions.len()),
            total_questions: session.questions.len(),
            time_remaining: session.time_remaining,
            is_active: session.is_active,
            is_completed: session.is_completed,
            answered: session.answers.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub time_spent: i32,
    pub session: SessionResponse,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub session_id: Uuid,
    pub overall_score: f64,
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl SummaryResponse {
    pub fn new(session: &InterviewSession, summary: &Summary) -> Self {
        Self {
            session_id: session.id,
            overall_score: summary.overall_score,
            summary: summary.summary.clone(),
            strengths: summary.strengths.clone(),
            improvements: summary.improvements.clone(),
            completed_at: session.completed_at,
        }
    }
}
