use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::question::{Difficulty, Question};
use crate::services::ai_service::{with_fallback, AiService};

const EASY_TEMPLATES: &[&str] = &[
    "What is {concept}? Can you explain it in simple terms?",
    "How would you implement {feature} in React?",
    "What's the difference between {concept1} and {concept2}?",
    "Describe your experience with {technology}.",
    "What are the benefits of using {tool} in web development?",
];

const MEDIUM_TEMPLATES: &[&str] = &[
    "Explain how you would optimize {scenario} for better performance.",
    "Walk me through your approach to solving {problem}.",
    "How would you handle {challenge} in a production environment?",
    "Describe the trade-offs between {approach1} and {approach2}.",
    "How would you debug {issue} in a React application?",
];

const HARD_TEMPLATES: &[&str] = &[
    "Design a scalable architecture for {complex_system}.",
    "How would you implement {advanced_feature} considering {constraints}?",
    "Explain your strategy for {complex_scenario} with multiple stakeholders.",
    "How would you optimize {performance_issue} at scale?",
    "Design and implement {complex_algorithm} with consideration for {factors}.",
];

const REACT_CONCEPTS: &[&str] = &[
    "hooks",
    "state management",
    "component lifecycle",
    "virtual DOM",
    "JSX",
];
const JAVASCRIPT_CONCEPTS: &[&str] = &[
    "closures",
    "promises",
    "event loop",
    "prototypes",
    "async/await",
];
const FRONTEND_CONCEPTS: &[&str] = &[
    "responsive design",
    "accessibility",
    "performance",
    "bundling",
    "testing",
];
const BACKEND_CONCEPTS: &[&str] = &[
    "APIs",
    "databases",
    "authentication",
    "caching",
    "microservices",
];
const GENERAL_CONCEPTS: &[&str] = &[
    "problem solving",
    "debugging",
    "code review",
    "team collaboration",
    "project management",
];

const CATEGORIES: &[&str] = &[
    "React",
    "JavaScript",
    "Frontend",
    "Backend",
    "System Design",
    "Problem Solving",
];

/// Every placeholder a template can contain must appear here so filled
/// questions carry no leftover braces.
const SUBSTITUTIONS: &[(&str, &[&str])] = &[
    ("{concept1}", REACT_CONCEPTS),
    ("{concept2}", JAVASCRIPT_CONCEPTS),
    ("{technology}", FRONTEND_CONCEPTS),
    ("{feature}", &["a form", "a modal", "a carousel", "a dropdown"]),
    ("{tool}", &["TypeScript", "Redux", "Next.js", "Tailwind CSS"]),
    (
        "{scenario}",
        &["a large dataset", "image loading", "API calls", "user interactions"],
    ),
    (
        "{problem}",
        &["memory leaks", "slow rendering", "API errors", "state synchronization"],
    ),
    (
        "{challenge}",
        &["high traffic", "complex state", "real-time updates", "data consistency"],
    ),
    (
        "{approach1}",
        &["server-side rendering", "client-side routing", "REST APIs"],
    ),
    (
        "{approach2}",
        &["static generation", "hash routing", "GraphQL"],
    ),
    (
        "{complex_system}",
        &["e-commerce platform", "social media app", "real-time chat", "video streaming"],
    ),
    (
        "{advanced_feature}",
        &[
            "real-time collaboration",
            "offline functionality",
            "micro-frontends",
            "progressive web app",
        ],
    ),
    (
        "{constraints}",
        &[
            "limited bandwidth",
            "legacy browser support",
            "mobile-first design",
            "accessibility requirements",
        ],
    ),
    (
        "{complex_scenario}",
        &[
            "migrating a monolith",
            "implementing CI/CD",
            "scaling infrastructure",
            "data migration",
        ],
    ),
    (
        "{performance_issue}",
        &["bundle size", "render blocking", "memory usage", "network latency"],
    ),
    (
        "{complex_algorithm}",
        &[
            "search functionality",
            "recommendation engine",
            "data synchronization",
            "caching strategy",
        ],
    ),
    (
        "{factors}",
        &[
            "scalability and maintainability",
            "performance and security",
            "user experience and accessibility",
            "cost and reliability",
        ],
    ),
    (
        "{issue}",
        &["infinite re-renders", "memory leaks", "failed API calls", "broken routing"],
    ),
];

#[derive(Clone)]
pub struct QuestionGenerator {
    ai: AiService,
}

impl QuestionGenerator {
    pub fn new(ai: AiService) -> Self {
        Self { ai }
    }

    /// Returns exactly `count` questions of the requested tier. Any failure
    /// of the external service routes to local template generation.
    pub async fn generate(
        &self,
        difficulty: Difficulty,
        count: usize,
        resume_context: Option<&str>,
    ) -> Vec<Question> {
        with_fallback(
            "generate_questions",
            self.generate_remote(difficulty, count, resume_context),
            || Self::generate_fallback(difficulty, count),
        )
        .await
    }

    async fn generate_remote(
        &self,
        difficulty: Difficulty,
        count: usize,
        resume_context: Option<&str>,
    ) -> Result<Vec<Question>> {
        let system_prompt = "You are a senior technical interviewer for frontend/React roles. \
            Generate interview questions as a JSON object with a 'questions' array of \
            {\"text\": string, \"difficulty\": string, \"category\": string} items. \
            Questions must be practical, self-contained, and answerable verbally.";

        let user_payload = serde_json::json!({
            "difficulty": difficulty.as_str(),
            "count": count,
            "candidate_background": resume_context,
            "allowed_categories": CATEGORIES,
        });

        let response = self.ai.complete_json(system_prompt, &user_payload).await?;
        let questions = Self::coerce_questions(&response, difficulty, count)?;
        tracing::info!(
            difficulty = difficulty.as_str(),
            count = questions.len(),
            "Generated questions via AI service"
        );
        Ok(questions)
    }

    fn coerce_questions(
        raw: &JsonValue,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Vec<Question>> {
        let items = raw
            .get("questions")
            .and_then(|q| q.as_array())
            .or_else(|| raw.as_array())
            .ok_or_else(|| anyhow::anyhow!("Response carries no question array"))?;

        let batch_stamp = Utc::now().timestamp_millis();
        let mut questions = Vec::new();
        for (idx, item) in items.iter().enumerate() {
            let Some(text) = item.get("text").and_then(|t| t.as_str()) else {
                continue;
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let category = item
                .get("category")
                .and_then(|c| c.as_str())
                .unwrap_or("General")
                .to_string();
            // The requested tier wins over whatever the model claims.
            questions.push(Question {
                id: make_question_id(difficulty, batch_stamp, idx),
                text: text.to_string(),
                difficulty,
                time_limit: difficulty.time_limit(),
                category,
            });
            if questions.len() == count {
                break;
            }
        }

        if questions.len() != count {
            return Err(anyhow::anyhow!(
                "Expected {} questions, got {}",
                count,
                questions.len()
            )
            .into());
        }
        Ok(questions)
    }

    /// Template-based local generation; deterministic shape, random content.
    pub fn generate_fallback(difficulty: Difficulty, count: usize) -> Vec<Question> {
        let mut rng = rand::thread_rng();
        let templates = match difficulty {
            Difficulty::Easy => EASY_TEMPLATES,
            Difficulty::Medium => MEDIUM_TEMPLATES,
            Difficulty::Hard => HARD_TEMPLATES,
        };

        let batch_stamp = Utc::now().timestamp_millis();
        (0..count)
            .map(|idx| {
                let template = templates[rng.gen_range(0..templates.len())];
                Question {
                    id: make_question_id(difficulty, batch_stamp, idx),
                    text: fill_template(template, &mut rng),
                    difficulty,
                    time_limit: difficulty.time_limit(),
                    category: CATEGORIES.choose(&mut rng).unwrap().to_string(),
                }
            })
            .collect()
    }
}

fn make_question_id(difficulty: Difficulty, batch_stamp: i64, index: usize) -> String {
    format!("{}_{}_{}", difficulty, batch_stamp, index)
}

fn fill_template(template: &str, rng: &mut impl Rng) -> String {
    let mut text = template.to_string();
    if text.contains("{concept}") {
        let all: Vec<&str> = [
            REACT_CONCEPTS,
            JAVASCRIPT_CONCEPTS,
            FRONTEND_CONCEPTS,
            BACKEND_CONCEPTS,
            GENERAL_CONCEPTS,
        ]
        .concat();
        text = text.replacen("{concept}", all.choose(rng).unwrap(), 1);
    }
    for (token, options) in SUBSTITUTIONS {
        if text.contains(token) {
            text = text.replacen(token, options.choose(rng).unwrap(), 1);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_produces_requested_count_with_fixed_limits() {
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let questions = QuestionGenerator::generate_fallback(difficulty, 4);
            assert_eq!(questions.len(), 4);
            for q in &questions {
                assert_eq!(q.difficulty, difficulty);
                assert_eq!(q.time_limit, difficulty.time_limit());
                assert!(!q.category.is_empty());
            }
        }
    }

    #[test]
    fn fallback_leaves_no_placeholder_tokens() {
        for _ in 0..50 {
            for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
                for q in QuestionGenerator::generate_fallback(difficulty, 5) {
                    assert!(
                        !q.text.contains('{') && !q.text.contains('}'),
                        "leftover placeholder in: {}",
                        q.text
                    );
                }
            }
        }
    }

    #[test]
    fn ids_are_unique_within_a_batch() {
        let questions = QuestionGenerator::generate_fallback(Difficulty::Medium, 6);
        let mut ids: Vec<_> = questions.iter().map(|q| q.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn coerce_enforces_tier_and_count() {
        let raw = serde_json::json!({
            "questions": [
                {"text": "Explain hooks.", "difficulty": "hard", "category": "React"},
                {"text": "What is JSX?", "category": "React"},
            ]
        });
        let questions =
            QuestionGenerator::coerce_questions(&raw, Difficulty::Easy, 2).unwrap();
        assert_eq!(questions.len(), 2);
        assert!(questions.iter().all(|q| q.difficulty == Difficulty::Easy));
        assert!(questions.iter().all(|q| q.time_limit == 20));

        let err = QuestionGenerator::coerce_questions(&raw, Difficulty::Easy, 3);
        assert!(err.is_err());
    }
}
