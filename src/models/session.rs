use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::question::Question;

/// One complete candidate interview attempt.
///
/// The lifecycle is `NotStarted -> Active(index, time_remaining) -> Completed`,
/// driven exclusively through [`reduce`]. Nothing outside the orchestrator
/// mutates a session; every transition takes the current value and an event
/// and yields a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub candidate_id: String,
    pub questions: Vec<Question>,
    /// 0-based, monotonically increasing; equals `questions.len()` once done.
    pub current_question_index: usize,
    pub answers: Vec<Answer>,
    /// Seconds left on the current question; only meaningful while active.
    pub time_remaining: i32,
    pub is_active: bool,
    pub is_completed: bool,
    pub final_score: Option<f64>,
    pub final_summary: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Events carry their own timestamps so `reduce` stays a pure function.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Start {
        questions: Vec<Question>,
        at: DateTime<Utc>,
    },
    Tick,
    RecordAnswer(Answer),
    Finalize {
        score: f64,
        summary: String,
    },
    Abandon,
}

impl InterviewSession {
    pub fn new(id: Uuid, candidate_id: String) -> Self {
        Self {
            id,
            candidate_id,
            questions: Vec::new(),
            current_question_index: 0,
            answers: Vec::new(),
            time_remaining: 0,
            is_active: false,
            is_completed: false,
            final_score: None,
            final_summary: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }
}

/// Pure state transition for the interview session.
pub fn reduce(state: &InterviewSession, event: SessionEvent) -> Result<InterviewSession> {
    let mut next = state.clone();
    match event {
        SessionEvent::Start { questions, at } => {
            if state.is_active {
                return Err(Error::InvalidState(
                    "Session is already active".to_string(),
                ));
            }
            if state.is_completed {
                return Err(Error::InvalidState(
                    "Session has already been completed".to_string(),
                ));
            }
            if questions.is_empty() {
                return Err(Error::InvalidState(
                    "Cannot start a session without questions".to_string(),
                ));
            }
            next.time_remaining = questions[0].time_limit;
            next.questions = questions;
            next.current_question_index = 0;
            next.answers = Vec::new();
            next.is_active = true;
            next.is_completed = false;
            next.final_score = None;
            next.final_summary = None;
            next.started_at = Some(at);
            next.completed_at = None;
        }
        SessionEvent::Tick => {
            if !state.is_active {
                return Err(Error::InvalidState(
                    "Cannot tick an inactive session".to_string(),
                ));
            }
            next.time_remaining = (state.time_remaining - 1).max(0);
        }
        SessionEvent::RecordAnswer(answer) => {
            if !state.is_active {
                return Err(Error::InvalidState(
                    "Cannot record an answer on an inactive session".to_string(),
                ));
            }
            let completed_at = answer.submitted_at;
            next.answers.push(answer);
            if state.current_question_index + 1 < state.questions.len() {
                next.current_question_index += 1;
                next.time_remaining = next.questions[next.current_question_index].time_limit;
            } else {
                next.current_question_index += 1;
                next.is_completed = true;
                next.is_active = false;
                next.time_remaining = 0;
                next.completed_at = Some(completed_at);
            }
        }
        SessionEvent::Finalize { score, summary } => {
            if !state.is_completed {
                return Err(Error::InvalidState(
                    "Summary is only available after completion".to_string(),
                ));
            }
            // Idempotent: the first finalization wins.
            if state.final_score.is_none() {
                next.final_score = Some(score);
                next.final_summary = Some(summary);
            }
        }
        SessionEvent::Abandon => {
            if !state.is_active {
                return Err(Error::InvalidState(
                    "Only an active session can be abandoned".to_string(),
                ));
            }
            next.is_active = false;
            next.time_remaining = 0;
        }
    }
    Ok(next)
}
