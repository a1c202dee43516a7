use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::question::Difficulty;
use crate::services::ai_service::{with_fallback, AiService};

/// Vocabulary the fallback scorer rewards. A term counts when it appears
/// as a standalone whitespace-delimited token, case-insensitively, and
/// each distinct term counts once no matter how often it repeats.
const TECHNICAL_TERMS: &[&str] = &[
    "react",
    "component",
    "hook",
    "state",
    "props",
    "api",
    "async",
    "performance",
    "optimization",
    "scalability",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub improvement_tips: Vec<String>,
}

#[derive(Clone)]
pub struct AnswerEvaluator {
    ai: AiService,
}

impl AnswerEvaluator {
    pub fn new(ai: AiService) -> Self {
        Self { ai }
    }

    /// Never fails from the session's point of view: any transport error,
    /// non-success status, or unparseable body falls back to the local scorer.
    pub async fn evaluate(
        &self,
        question_text: &str,
        answer_text: &str,
        difficulty: Difficulty,
        time_spent: i32,
    ) -> Evaluation {
        with_fallback(
            "evaluate_answer",
            self.evaluate_remote(question_text, answer_text, difficulty, time_spent),
            || Self::fallback_score(answer_text, difficulty, time_spent),
        )
        .await
    }

    async fn evaluate_remote(
        &self,
        question_text: &str,
        answer_text: &str,
        difficulty: Difficulty,
        time_spent: i32,
    ) -> Result<Evaluation> {
        let system_prompt = "You are a strict but fair technical interviewer. \
            Grade the candidate's answer to the given question. \
            Return a JSON object: {\"score\": number between 0 and 10, \
            \"feedback\": string, \"strengths\": [string], \"improvement_tips\": [string]}. \
            Weigh correctness and depth against the question's difficulty and the time budget.";

        let user_payload = serde_json::json!({
            "question": question_text,
            "answer": answer_text,
            "difficulty": difficulty.as_str(),
            "time_spent_seconds": time_spent,
            "time_limit_seconds": difficulty.time_limit(),
        });

        let response = self.ai.complete_json(system_prompt, &user_payload).await?;
        let mut evaluation: Evaluation = serde_json::from_value(response)?;
        evaluation.score = evaluation.score.clamp(0.0, 10.0);
        Ok(evaluation)
    }

    /// Deterministic heuristic scorer. Pure function of
    /// `(answer_text, difficulty, time_spent)`; identical inputs always
    /// yield the identical score and feedback string.
    pub fn fallback_score(answer_text: &str, difficulty: Difficulty, time_spent: i32) -> Evaluation {
        let length = answer_text.chars().count() as f64;
        let base = (length / 50.0).clamp(2.0, 8.0);

        let matched_terms = matched_terms(answer_text);
        let term_bonus = (matched_terms.len() as f64 * 0.3).min(2.0);

        let time_limit = difficulty.time_limit() as f64;
        let time_ratio = time_spent as f64 / time_limit;
        let time_bonus = if (0.5..=0.8).contains(&time_ratio) {
            0.5
        } else if time_ratio < 0.5 {
            0.2
        } else {
            0.0
        };

        let raw = base * difficulty.score_multiplier() + term_bonus + time_bonus;
        let score = round1(raw.clamp(0.0, 10.0));

        Evaluation {
            feedback: feedback_for(score, time_ratio),
            strengths: fallback_strengths(score, &matched_terms),
            improvement_tips: fallback_tips(score, time_ratio, &matched_terms),
            score,
        }
    }
}

fn matched_terms(answer_text: &str) -> Vec<&'static str> {
    let tokens: Vec<String> = answer_text
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();
    TECHNICAL_TERMS
        .iter()
        .filter(|term| tokens.iter().any(|t| t == *term))
        .copied()
        .collect()
}

fn feedback_for(score: f64, time_ratio: f64) -> String {
    let mut feedback = if score >= 8.0 {
        "Excellent answer! You demonstrated strong understanding and provided comprehensive details."
    } else if score >= 6.0 {
        "Good answer! You covered the key points well. Consider adding more specific examples."
    } else if score >= 4.0 {
        "Decent answer. You understood the basics but could elaborate more on the implementation details."
    } else {
        "Your answer could be improved. Try to provide more specific examples and technical details."
    }
    .to_string();

    if time_ratio <= 0.5 {
        feedback.push_str(" You answered very quickly - consider taking more time to elaborate.");
    } else if time_ratio >= 0.9 {
        feedback.push_str(" You used most of the available time - good thoroughness!");
    }

    feedback
}

fn fallback_strengths(score: f64, matched: &[&str]) -> Vec<String> {
    let mut strengths = Vec::new();
    if !matched.is_empty() {
        strengths.push("References relevant technical concepts".to_string());
    }
    if score >= 6.0 {
        strengths.push("Covers the question in reasonable depth".to_string());
    }
    strengths
}

fn fallback_tips(score: f64, time_ratio: f64, matched: &[&str]) -> Vec<String> {
    let mut tips = Vec::new();
    if score < 6.0 {
        tips.push("Add concrete examples and implementation details".to_string());
    }
    if matched.is_empty() {
        tips.push("Work relevant technical terminology into your answers".to_string());
    }
    if time_ratio <= 0.5 {
        tips.push("Use more of the available time to elaborate".to_string());
    }
    tips
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worked_example_scores_two_point_eight() {
        // 20s easy question answered in 10s.
        let text = "I use useState and useEffect for state and side effects in React.";
        let eval = AnswerEvaluator::fallback_score(text, Difficulty::Easy, 10);
        // base clamps up to 2.0, "state" is the only standalone term match
        // (0.3), and the 0.5 time ratio earns the efficiency bonus (0.5).
        assert_eq!(eval.score, 2.8);
        assert!(eval.feedback.contains("answered very quickly"));
    }

    #[test]
    fn scorer_is_deterministic() {
        let a = AnswerEvaluator::fallback_score("promises and the event loop", Difficulty::Medium, 40);
        let b = AnswerEvaluator::fallback_score("promises and the event loop", Difficulty::Medium, 40);
        assert_eq!(a.score, b.score);
        assert_eq!(a.feedback, b.feedback);
    }

    #[test]
    fn base_score_stays_within_two_and_eight() {
        let short = AnswerEvaluator::fallback_score("ok", Difficulty::Easy, 19);
        // base floor 2.0, no terms, ratio 0.95 -> no bonus
        assert_eq!(short.score, 2.0);

        let long_text = "x".repeat(2000);
        let long = AnswerEvaluator::fallback_score(&long_text, Difficulty::Easy, 19);
        // base ceiling 8.0
        assert_eq!(long.score, 8.0);
    }

    #[test]
    fn final_score_never_exceeds_ten() {
        // Ceiling base, full term bonus, quick-answer bonus.
        let mut text = "x".repeat(500);
        text.push(' ');
        text.push_str(
            "react component hook state props api async performance optimization scalability",
        );
        let eval = AnswerEvaluator::fallback_score(&text, Difficulty::Easy, 2);
        assert_eq!(eval.score, 10.0);
    }

    #[test]
    fn distinct_terms_count_once() {
        let eval = AnswerEvaluator::fallback_score("state state state state", Difficulty::Easy, 19);
        // 2.0 base + 0.3 single-term bonus, ratio 0.95 -> no time bonus
        assert_eq!(eval.score, 2.3);
    }

    #[test]
    fn difficulty_multiplier_scales_base() {
        let text = "x".repeat(400); // base 8.0
        let easy = AnswerEvaluator::fallback_score(&text, Difficulty::Easy, 18);
        let medium = AnswerEvaluator::fallback_score(&text, Difficulty::Medium, 55);
        let hard = AnswerEvaluator::fallback_score(&text, Difficulty::Hard, 110);
        // ratio 0.9+ in all three cases -> no time bonus, no terms
        assert_eq!(easy.score, 8.0);
        assert_eq!(medium.score, 6.4);
        assert_eq!(hard.score, 4.8);
    }

    #[test]
    fn thorough_answers_get_the_time_remark() {
        let eval = AnswerEvaluator::fallback_score("a thorough answer", Difficulty::Easy, 19);
        assert!(eval.feedback.contains("used most of the available time"));
    }
}
