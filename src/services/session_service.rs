use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::question::{Difficulty, Question};
use crate::models::session::{reduce, InterviewSession, SessionEvent};
use crate::services::eval_service::AnswerEvaluator;
use crate::services::question_service::QuestionGenerator;
use crate::services::summary_service::{AnswerTranscript, Summary, SummaryAggregator};

/// Live state for one session: the immutable session value plus the bits
/// the reducer must not know about (draft buffer, in-flight guard, cache).
struct SessionEntry {
    session: InterviewSession,
    /// Text buffered for the current question; consumed on auto-submit.
    draft: String,
    draft_transcript: Option<String>,
    /// One evaluation in flight per question index; a second submission is
    /// rejected and the ticker skips auto-submit until it lands.
    eval_in_flight: bool,
    summary: Option<Summary>,
}

/// Owns every live session and serializes timer ticks against submissions.
/// Evaluator calls run with the entry lock released so the countdown keeps
/// going while the external service is slow.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Mutex<SessionEntry>>>>>,
    generator: QuestionGenerator,
    evaluator: AnswerEvaluator,
    aggregator: SummaryAggregator,
}

impl SessionService {
    pub fn new(
        generator: QuestionGenerator,
        evaluator: AnswerEvaluator,
        aggregator: SummaryAggregator,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            generator,
            evaluator,
            aggregator,
        }
    }

    /// Builds the fixed question sequence (easy, then medium, then hard) and
    /// activates a fresh session for the candidate.
    pub async fn start_session(
        &self,
        candidate_id: String,
        resume_context: Option<String>,
        questions_per_tier: usize,
    ) -> Result<InterviewSession> {
        let mut questions: Vec<Question> = Vec::with_capacity(questions_per_tier * 3);
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let batch = self
                .generator
                .generate(difficulty, questions_per_tier, resume_context.as_deref())
                .await;
            questions.extend(batch);
        }

        let id = Uuid::new_v4();
        let session = InterviewSession::new(id, candidate_id);
        let session = reduce(
            &session,
            SessionEvent::Start {
                questions,
                at: Utc::now(),
            },
        )?;

        tracing::info!(
            session_id = %id,
            candidate_id = %session.candidate_id,
            total_questions = session.questions.len(),
            "Interview session started"
        );

        let entry = SessionEntry {
            session: session.clone(),
            draft: String::new(),
            draft_transcript: None,
            eval_in_flight: false,
            summary: None,
        };
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(entry)));

        Ok(session)
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<InterviewSession> {
        let entry = self.entry(id).await?;
        let guard = entry.lock().await;
        Ok(guard.session.clone())
    }

    /// Buffers answer text for the current question so a timer expiry can
    /// submit whatever the candidate had typed (or dictated) so far.
    pub async fn update_draft(
        &self,
        id: Uuid,
        text: String,
        transcript: Option<String>,
    ) -> Result<()> {
        let entry = self.entry(id).await?;
        let mut guard = entry.lock().await;
        if !guard.session.is_active {
            return Err(Error::InvalidState("Session is not active".to_string()));
        }
        guard.draft = text;
        guard.draft_transcript = transcript;
        Ok(())
    }

    /// Manual submission: blank text is rejected without touching state.
    pub async fn submit_answer(
        &self,
        id: Uuid,
        text: String,
        transcript: Option<String>,
    ) -> Result<(Answer, InterviewSession)> {
        if text.trim().is_empty() {
            return Err(Error::EmptyAnswer);
        }

        let entry = self.entry(id).await?;
        let (question, time_spent) = {
            let mut guard = entry.lock().await;
            if !guard.session.is_active {
                return Err(Error::InvalidState("Session is not active".to_string()));
            }
            if guard.eval_in_flight {
                return Err(Error::DuplicateSubmission);
            }
            let question = guard
                .session
                .current_question()
                .cloned()
                .ok_or_else(|| Error::Internal("Active session without a question".to_string()))?;
            let time_spent =
                (question.time_limit - guard.session.time_remaining).clamp(0, question.time_limit);
            guard.eval_in_flight = true;
            (question, time_spent)
        };

        // Lock released: the ticker keeps decrementing while we wait.
        let evaluation = self
            .evaluator
            .evaluate(&question.text, &text, question.difficulty, time_spent)
            .await;

        let mut guard = entry.lock().await;
        guard.eval_in_flight = false;
        if !guard.session.is_active {
            tracing::warn!(session_id = %id, "Discarding evaluation for a torn-down session");
            return Err(Error::InvalidState(
                "Session ended before the evaluation finished".to_string(),
            ));
        }

        let answer = Answer {
            question_id: question.id,
            text,
            submitted_at: Utc::now(),
            time_spent,
            score: Some(evaluation.score),
            feedback: Some(evaluation.feedback),
            transcript,
        };
        guard.session = reduce(&guard.session, SessionEvent::RecordAnswer(answer.clone()))?;
        guard.draft.clear();
        guard.draft_transcript = None;

        tracing::info!(
            session_id = %id,
            question_index = guard.session.answers.len(),
            score = answer.score,
            "Answer recorded"
        );
        Ok((answer, guard.session.clone()))
    }

    /// One-second tick across every live session. Entries whose lock is
    /// contended (a submission is being applied) are skipped this round so
    /// the ticker never stalls on a single session.
    pub async fn tick_all(&self) {
        let entries: Vec<(Uuid, Arc<Mutex<SessionEntry>>)> = {
            let map = self.sessions.read().await;
            map.iter().map(|(id, e)| (*id, e.clone())).collect()
        };

        for (id, entry) in entries {
            let Ok(mut guard) = entry.try_lock() else {
                continue;
            };
            if !guard.session.is_active {
                continue;
            }
            match reduce(&guard.session, SessionEvent::Tick) {
                Ok(next) => guard.session = next,
                Err(e) => {
                    tracing::error!(session_id = %id, error = ?e, "Tick rejected");
                    continue;
                }
            }
            if guard.session.time_remaining > 0 {
                continue;
            }
            // Timer hit zero. A manual submission mid-flight wins; the
            // auto-submit is suppressed rather than racing it.
            if guard.eval_in_flight {
                continue;
            }
            self.auto_submit(id, &entry, &mut guard);
        }
    }

    /// Timer-driven submission. An empty buffer is recorded as score 0
    /// without contacting the evaluator; buffered text is evaluated exactly
    /// like a manual submission.
    fn auto_submit(
        &self,
        id: Uuid,
        entry: &Arc<Mutex<SessionEntry>>,
        guard: &mut SessionEntry,
    ) {
        let Some(question) = guard.session.current_question().cloned() else {
            return;
        };
        let draft = std::mem::take(&mut guard.draft);
        let transcript = guard.draft_transcript.take();

        if draft.trim().is_empty() {
            let answer = Answer {
                question_id: question.id,
                text: String::new(),
                submitted_at: Utc::now(),
                time_spent: question.time_limit,
                score: Some(0.0),
                feedback: None,
                transcript: None,
            };
            match reduce(&guard.session, SessionEvent::RecordAnswer(answer)) {
                Ok(next) => {
                    guard.session = next;
                    tracing::info!(session_id = %id, "Time expired with no answer, scored 0");
                }
                Err(e) => tracing::error!(session_id = %id, error = ?e, "Auto-submit rejected"),
            }
            return;
        }

        guard.eval_in_flight = true;
        let evaluator = self.evaluator.clone();
        let entry = entry.clone();
        tokio::spawn(async move {
            let evaluation = evaluator
                .evaluate(&question.text, &draft, question.difficulty, question.time_limit)
                .await;
            let mut guard = entry.lock().await;
            guard.eval_in_flight = false;
            if !guard.session.is_active {
                tracing::warn!(session_id = %id, "Discarding auto-submit for a torn-down session");
                return;
            }
            let answer = Answer {
                question_id: question.id,
                text: draft,
                submitted_at: Utc::now(),
                time_spent: question.time_limit,
                score: Some(evaluation.score),
                feedback: Some(evaluation.feedback),
                transcript,
            };
            match reduce(&guard.session, SessionEvent::RecordAnswer(answer)) {
                Ok(next) => {
                    guard.session = next;
                    tracing::info!(session_id = %id, "Time expired, buffered answer evaluated");
                }
                Err(e) => tracing::error!(session_id = %id, error = ?e, "Auto-submit rejected"),
            }
        });
    }

    /// Produces the final report. The first call invokes the aggregator and
    /// caches the result; repeat calls return the cached report.
    pub async fn generate_final_summary(
        &self,
        id: Uuid,
    ) -> Result<(Summary, InterviewSession)> {
        let entry = self.entry(id).await?;
        let mut guard = entry.lock().await;
        if !guard.session.is_completed {
            return Err(Error::InvalidState(
                "Summary is only available after completion".to_string(),
            ));
        }
        if let Some(summary) = guard.summary.clone() {
            return Ok((summary, guard.session.clone()));
        }

        let transcripts: Vec<AnswerTranscript> = guard
            .session
            .questions
            .iter()
            .zip(guard.session.answers.iter())
            .map(|(q, a)| AnswerTranscript {
                question_text: q.text.clone(),
                answer_text: a.text.clone(),
                difficulty: q.difficulty,
                score: a.score,
                time_spent: a.time_spent,
            })
            .collect();

        // Completed sessions no longer tick, so holding the entry across
        // the aggregator call only serializes concurrent summary requests.
        let summary = self.aggregator.summarize(&transcripts).await;
        guard.session = reduce(
            &guard.session,
            SessionEvent::Finalize {
                score: summary.overall_score,
                summary: summary.summary.clone(),
            },
        )?;
        guard.summary = Some(summary.clone());

        tracing::info!(session_id = %id, overall_score = summary.overall_score, "Final summary generated");
        Ok((summary, guard.session.clone()))
    }

    /// Teardown: the timer entry is dropped and any in-flight evaluation
    /// result is discarded when it arrives.
    pub async fn abandon(&self, id: Uuid) -> Result<()> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| Error::NotFound("Session not found".to_string()))?;
        let mut guard = entry.lock().await;
        if guard.session.is_active {
            guard.session = reduce(&guard.session, SessionEvent::Abandon)?;
        }
        tracing::info!(session_id = %id, "Session abandoned");
        Ok(())
    }

    async fn entry(&self, id: Uuid) -> Result<Arc<Mutex<SessionEntry>>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Session not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_service::AiService;
    use std::time::Duration;

    fn service() -> SessionService {
        // No API key: every AI call resolves through the local fallback.
        let ai = AiService::new(None, reqwest::Client::new(), Duration::from_secs(1));
        SessionService::new(
            QuestionGenerator::new(ai.clone()),
            AnswerEvaluator::new(ai.clone()),
            SummaryAggregator::new(ai),
        )
    }

    #[tokio::test]
    async fn start_builds_the_fixed_tier_sequence() {
        let svc = service();
        let session = svc
            .start_session("cand-1".to_string(), None, 2)
            .await
            .unwrap();
        assert_eq!(session.questions.len(), 6);
        let tiers: Vec<Difficulty> = session.questions.iter().map(|q| q.difficulty).collect();
        assert_eq!(
            tiers,
            vec![
                Difficulty::Easy,
                Difficulty::Easy,
                Difficulty::Medium,
                Difficulty::Medium,
                Difficulty::Hard,
                Difficulty::Hard
            ]
        );
        assert!(session.is_active);
        assert_eq!(session.time_remaining, 20);
    }

    #[tokio::test]
    async fn full_run_completes_with_one_answer_per_question() {
        let svc = service();
        let session = svc
            .start_session("cand-1".to_string(), None, 2)
            .await
            .unwrap();
        let id = session.id;

        for i in 0..6 {
            let (_, snapshot) = svc
                .submit_answer(id, format!("answer number {} about state and props", i), None)
                .await
                .unwrap();
            assert_eq!(snapshot.answers.len(), i + 1);
            if i < 5 {
                assert_eq!(snapshot.current_question_index, i + 1);
                assert!(snapshot.is_active);
            } else {
                assert!(snapshot.is_completed);
                assert!(!snapshot.is_active);
            }
        }

        let snapshot = svc.snapshot(id).await.unwrap();
        assert_eq!(snapshot.answers.len(), 6);
        assert!(snapshot.completed_at.is_some());
    }

    #[tokio::test]
    async fn manual_blank_submission_is_rejected_without_state_change() {
        let svc = service();
        let session = svc
            .start_session("cand-1".to_string(), None, 1)
            .await
            .unwrap();
        let err = svc
            .submit_answer(session.id, "   ".to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyAnswer));
        let snapshot = svc.snapshot(session.id).await.unwrap();
        assert_eq!(snapshot.answers.len(), 0);
        assert_eq!(snapshot.current_question_index, 0);
    }

    #[tokio::test]
    async fn second_submission_during_evaluation_is_rejected() {
        let svc = service();
        let session = svc
            .start_session("cand-1".to_string(), None, 1)
            .await
            .unwrap();
        let entry = svc.entry(session.id).await.unwrap();
        entry.lock().await.eval_in_flight = true;

        let err = svc
            .submit_answer(session.id, "a real answer".to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSubmission));
    }

    #[tokio::test]
    async fn timer_keeps_ticking_while_evaluation_is_in_flight() {
        let svc = service();
        let session = svc
            .start_session("cand-1".to_string(), None, 1)
            .await
            .unwrap();
        let entry = svc.entry(session.id).await.unwrap();
        entry.lock().await.eval_in_flight = true;

        for _ in 0..25 {
            svc.tick_all().await;
        }
        let snapshot = svc.snapshot(session.id).await.unwrap();
        // Ticked down to zero, but the expiry never fired a second submission.
        assert_eq!(snapshot.time_remaining, 0);
        assert_eq!(snapshot.answers.len(), 0);
        assert_eq!(snapshot.current_question_index, 0);
    }

    #[tokio::test]
    async fn expiry_with_empty_buffer_scores_zero_without_the_evaluator() {
        let svc = service();
        let session = svc
            .start_session("cand-1".to_string(), None, 1)
            .await
            .unwrap();
        let id = session.id;

        for _ in 0..20 {
            svc.tick_all().await;
        }
        let snapshot = svc.snapshot(id).await.unwrap();
        assert_eq!(snapshot.answers.len(), 1);
        let answer = &snapshot.answers[0];
        assert_eq!(answer.text, "");
        assert_eq!(answer.score, Some(0.0));
        assert_eq!(answer.time_spent, 20);
        assert!(answer.feedback.is_none());
        assert_eq!(snapshot.current_question_index, 1);
        assert_eq!(snapshot.time_remaining, 60);
    }

    #[tokio::test]
    async fn expiry_with_buffered_text_goes_through_the_evaluator() {
        let svc = service();
        let session = svc
            .start_session("cand-1".to_string(), None, 1)
            .await
            .unwrap();
        let id = session.id;

        svc.update_draft(id, "state and props drive react rendering".to_string(), None)
            .await
            .unwrap();
        for _ in 0..20 {
            svc.tick_all().await;
        }
        // The evaluation runs on a spawned task; give it a moment to land.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = svc.snapshot(id).await.unwrap();
        assert_eq!(snapshot.answers.len(), 1);
        let answer = &snapshot.answers[0];
        assert_eq!(answer.text, "state and props drive react rendering");
        assert_eq!(answer.time_spent, 20);
        assert!(answer.score.unwrap() > 0.0);
        assert!(answer.feedback.is_some());
    }

    #[tokio::test]
    async fn summary_requires_completion_and_is_cached() {
        let svc = service();
        let session = svc
            .start_session("cand-1".to_string(), None, 1)
            .await
            .unwrap();
        let id = session.id;

        let err = svc.generate_final_summary(id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        for i in 0..3 {
            svc.submit_answer(id, format!("detailed answer {} with state and api talk", i), None)
                .await
                .unwrap();
        }

        let (first, snapshot) = svc.generate_final_summary(id).await.unwrap();
        assert_eq!(snapshot.final_score, Some(first.overall_score));

        // Poke the cache so a recomputation would be observable.
        {
            let entry = svc.entry(id).await.unwrap();
            let mut guard = entry.lock().await;
            guard.summary.as_mut().unwrap().summary = "cached sentinel".to_string();
        }
        let (second, _) = svc.generate_final_summary(id).await.unwrap();
        assert_eq!(second.summary, "cached sentinel");
    }

    #[tokio::test]
    async fn abandoned_sessions_disappear_and_stop_ticking() {
        let svc = service();
        let session = svc
            .start_session("cand-1".to_string(), None, 1)
            .await
            .unwrap();
        svc.abandon(session.id).await.unwrap();
        let err = svc.snapshot(session.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        // Ticking with no live sessions is a no-op.
        svc.tick_all().await;
    }
}
