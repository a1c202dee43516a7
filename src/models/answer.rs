use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One answer per question, appended in question order. Text may be empty
/// for a timed-out non-response; score stays absent until evaluation lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
    /// Seconds, clamped to `[0, question.time_limit]`.
    pub time_spent: i32,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    /// Raw speech-to-text output when the answer came in by voice.
    pub transcript: Option<String>,
}
