use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::question::Difficulty;
use crate::services::ai_service::{with_fallback, AiService};

/// One scored answer as the aggregator sees it.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerTranscript {
    pub question_text: String,
    pub answer_text: String,
    pub difficulty: Difficulty,
    pub score: Option<f64>,
    pub time_spent: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub overall_score: f64,
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Clone)]
pub struct SummaryAggregator {
    ai: AiService,
}

impl SummaryAggregator {
    pub fn new(ai: AiService) -> Self {
        Self { ai }
    }

    pub async fn summarize(&self, answers: &[AnswerTranscript]) -> Summary {
        with_fallback(
            "generate_summary",
            self.summarize_remote(answers),
            || Self::fallback_summary(answers),
        )
        .await
    }

    async fn summarize_remote(&self, answers: &[AnswerTranscript]) -> Result<Summary> {
        let system_prompt = "You are a technical interviewer writing the final report for a \
            completed interview. Given the full transcript of scored answers, return a JSON \
            object: {\"overall_score\": number between 0 and 10, \"summary\": string, \
            \"strengths\": [string], \"improvements\": [string]}. \
            Keep the narrative concise and grounded in the transcript.";

        let user_payload = serde_json::json!({ "answers": answers });

        let response = self.ai.complete_json(system_prompt, &user_payload).await?;
        let mut summary: Summary = serde_json::from_value(response)?;
        summary.overall_score = summary.overall_score.clamp(0.0, 10.0);
        Ok(summary)
    }

    /// Heuristic aggregate: overall score is the arithmetic mean of the
    /// answers that carry a score (0 when none do), with fixed-rule
    /// strengths/improvements and a template-assembled narrative.
    pub fn fallback_summary(answers: &[AnswerTranscript]) -> Summary {
        let scores: Vec<f64> = answers.iter().filter_map(|a| a.score).collect();
        let overall = if scores.is_empty() {
            0.0
        } else {
            round1(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        let strengths = identify_strengths(answers, overall);
        let improvements = identify_improvements(answers, overall);
        let summary = assemble_narrative(overall, &strengths, &improvements);

        Summary {
            overall_score: overall,
            summary,
            strengths,
            improvements,
        }
    }
}

fn tier_average(answers: &[AnswerTranscript], difficulty: Difficulty) -> Option<f64> {
    let tier: Vec<&AnswerTranscript> =
        answers.iter().filter(|a| a.difficulty == difficulty).collect();
    if tier.is_empty() {
        return None;
    }
    let sum: f64 = tier.iter().map(|a| a.score.unwrap_or(0.0)).sum();
    Some(sum / tier.len() as f64)
}

fn average_time_ratio(answers: &[AnswerTranscript]) -> Option<f64> {
    if answers.is_empty() {
        return None;
    }
    let sum: f64 = answers
        .iter()
        .map(|a| a.time_spent as f64 / a.difficulty.time_limit() as f64)
        .sum();
    Some(sum / answers.len() as f64)
}

fn identify_strengths(answers: &[AnswerTranscript], overall: f64) -> Vec<String> {
    let mut strengths = Vec::new();

    if overall >= 7.0 {
        strengths.push("Strong technical knowledge".to_string());
        strengths.push("Clear communication skills".to_string());
    }
    if tier_average(answers, Difficulty::Easy).is_some_and(|avg| avg >= 7.0) {
        strengths.push("Solid fundamental understanding".to_string());
    }
    if tier_average(answers, Difficulty::Hard).is_some_and(|avg| avg >= 6.0) {
        strengths.push("Handles complex problems well".to_string());
    }
    if average_time_ratio(answers).is_some_and(|ratio| ratio <= 0.7) {
        strengths.push("Efficient problem solving".to_string());
    }

    if strengths.is_empty() {
        strengths.push("Shows potential for growth".to_string());
    }
    strengths
}

fn identify_improvements(answers: &[AnswerTranscript], overall: f64) -> Vec<String> {
    let mut improvements = Vec::new();

    if overall < 6.0 {
        improvements.push("Focus on providing more detailed technical explanations".to_string());
    }
    let short_answers = answers
        .iter()
        .filter(|a| a.answer_text.chars().count() < 100)
        .count();
    if !answers.is_empty() && short_answers * 2 > answers.len() {
        improvements.push("Elaborate more on your answers with specific examples".to_string());
    }
    if tier_average(answers, Difficulty::Hard).is_some_and(|avg| avg < 5.0) {
        improvements.push("Practice more complex system design and architecture questions".to_string());
    }
    improvements.push("Continue practicing interview scenarios".to_string());
    improvements
}

fn assemble_narrative(overall: f64, strengths: &[String], improvements: &[String]) -> String {
    let mut summary = if overall >= 8.0 {
        "Outstanding performance! You demonstrated excellent technical knowledge and communication skills. "
    } else if overall >= 6.0 {
        "Good performance overall! You showed solid understanding of key concepts. "
    } else if overall >= 4.0 {
        "Fair performance. You have a basic understanding but there's room for improvement. "
    } else {
        "There's significant room for improvement. Focus on strengthening your technical fundamentals. "
    }
    .to_string();

    summary.push_str(&format!(
        "Your key strengths include: {}. ",
        strengths.join(", ")
    ));
    summary.push_str(&format!(
        "Areas for development: {}.",
        improvements.join(", ")
    ));
    summary
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(difficulty: Difficulty, score: Option<f64>, time_spent: i32, text: &str) -> AnswerTranscript {
        AnswerTranscript {
            question_text: "q".to_string(),
            answer_text: text.to_string(),
            difficulty,
            score,
            time_spent,
        }
    }

    #[test]
    fn overall_is_mean_of_present_scores() {
        let answers = vec![
            transcript(Difficulty::Easy, Some(8.0), 10, "a"),
            transcript(Difficulty::Medium, None, 30, "b"),
            transcript(Difficulty::Hard, Some(5.0), 60, "c"),
        ];
        let summary = SummaryAggregator::fallback_summary(&answers);
        assert_eq!(summary.overall_score, 6.5);
    }

    #[test]
    fn all_unscored_answers_yield_zero() {
        let answers = vec![
            transcript(Difficulty::Easy, None, 10, "a"),
            transcript(Difficulty::Medium, None, 30, "b"),
        ];
        let summary = SummaryAggregator::fallback_summary(&answers);
        assert_eq!(summary.overall_score, 0.0);
        assert!(summary
            .improvements
            .contains(&"Continue practicing interview scenarios".to_string()));
    }

    #[test]
    fn empty_transcript_yields_generic_report() {
        let summary = SummaryAggregator::fallback_summary(&[]);
        assert_eq!(summary.overall_score, 0.0);
        assert_eq!(summary.strengths, vec!["Shows potential for growth".to_string()]);
        assert!(!summary.summary.is_empty());
    }

    #[test]
    fn high_scores_unlock_strength_heuristics() {
        // 10/20 easy and 60/120 hard -> average time ratio 0.5.
        let answers = vec![
            transcript(Difficulty::Easy, Some(9.0), 10, &"x".repeat(150)),
            transcript(Difficulty::Hard, Some(7.0), 60, &"y".repeat(150)),
        ];
        let summary = SummaryAggregator::fallback_summary(&answers);
        assert!(summary.strengths.contains(&"Strong technical knowledge".to_string()));
        assert!(summary
            .strengths
            .contains(&"Solid fundamental understanding".to_string()));
        assert!(summary
            .strengths
            .contains(&"Handles complex problems well".to_string()));
        assert!(summary.strengths.contains(&"Efficient problem solving".to_string()));
        assert!(summary.summary.starts_with("Outstanding performance!"));
    }

    #[test]
    fn weak_runs_pick_up_improvement_heuristics() {
        let answers = vec![
            transcript(Difficulty::Hard, Some(2.0), 110, "short"),
            transcript(Difficulty::Hard, Some(3.0), 115, "short"),
        ];
        let summary = SummaryAggregator::fallback_summary(&answers);
        assert!(summary
            .improvements
            .contains(&"Focus on providing more detailed technical explanations".to_string()));
        assert!(summary
            .improvements
            .contains(&"Elaborate more on your answers with specific examples".to_string()));
        assert!(summary
            .improvements
            .contains(&"Practice more complex system design and architecture questions".to_string()));
    }
}
