use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ROLE_CANDIDATE: &str = "candidate";
pub const ROLE_INTERVIEWER: &str = "interviewer";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub resume_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
