use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::session::InterviewSession;
use crate::services::summary_service::Summary;

#[derive(Debug, Serialize, FromRow)]
pub struct RecentInterview {
    pub id: Uuid,
    pub candidate_id: String,
    pub overall_score: Option<f64>,
    pub total_questions: i32,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_interviews: i64,
    pub completed_interviews: i64,
    pub average_score: Option<f64>,
    pub recent: Vec<RecentInterview>,
}

/// Durable record of finished interviews. Live sessions stay in memory;
/// only completed runs are written here, after the final summary exists.
#[derive(Clone)]
pub struct InterviewStore {
    pool: PgPool,
}

impl InterviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes the interview, its question set, and every answer in one
    /// transaction so the dashboard never sees a half-persisted run.
    pub async fn save_completed(
        &self,
        session: &InterviewSession,
        summary: &Summary,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO interviews
                (id, candidate_id, status, overall_score, total_questions,
                 current_question_index, summary, started_at, completed_at)
            VALUES ($1, $2, 'completed', $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(session.id)
        .bind(&session.candidate_id)
        .bind(summary.overall_score)
        .bind(session.questions.len() as i32)
        .bind(session.current_question_index as i32)
        .bind(&summary.summary)
        .bind(session.started_at)
        .bind(session.completed_at)
        .execute(&mut *tx)
        .await?;

        // Already persisted by an earlier summary request.
        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(());
        }

        for (idx, question) in session.questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO questions
                    (id, interview_id, question_key, question_text, difficulty,
                     time_limit, order_index, category)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(session.id)
            .bind(&question.id)
            .bind(&question.text)
            .bind(question.difficulty.as_str())
            .bind(question.time_limit)
            .bind(idx as i32)
            .bind(&question.category)
            .execute(&mut *tx)
            .await?;
        }

        for answer in &session.answers {
            sqlx::query(
                r#"
                INSERT INTO answers
                    (id, interview_id, question_key, answer_text, score,
                     feedback, time_taken, transcript, submitted_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(session.id)
            .bind(&answer.question_id)
            .bind(&answer.text)
            .bind(answer.score)
            .bind(&answer.feedback)
            .bind(answer.time_spent)
            .bind(&answer.transcript)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(interview_id = %session.id, "Completed interview persisted");
        Ok(())
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interviews")
            .fetch_one(&self.pool)
            .await?;

        let completed: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM interviews WHERE status = 'completed'")
                .fetch_one(&self.pool)
                .await?;

        let average_score: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(overall_score) FROM interviews WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await?;

        let recent = sqlx::query_as::<_, RecentInterview>(
            r#"
            SELECT id, candidate_id, overall_score, total_questions, completed_at
            FROM interviews
            WHERE status = 'completed'
            ORDER BY completed_at DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_interviews: total,
            completed_interviews: completed,
            average_score,
            recent,
        })
    }
}
