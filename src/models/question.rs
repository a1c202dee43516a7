use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Per-question countdown budget in seconds, fixed per tier.
    pub fn time_limit(&self) -> i32 {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 60,
            Difficulty::Hard => 120,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Length multiplier applied by the fallback scorer.
    pub fn score_multiplier(&self) -> f64 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 0.8,
            Difficulty::Hard => 0.6,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(crate::error::Error::BadRequest(format!(
                "Unknown difficulty: {}",
                other
            ))),
        }
    }
}

/// Immutable once generated; the session never rewrites its question list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub difficulty: Difficulty,
    /// Seconds, always `difficulty.time_limit()`.
    pub time_limit: i32,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_limits_are_fixed_per_tier() {
        assert_eq!(Difficulty::Easy.time_limit(), 20);
        assert_eq!(Difficulty::Medium.time_limit(), 60);
        assert_eq!(Difficulty::Hard.time_limit(), 120);
    }

    #[test]
    fn difficulty_round_trips_through_serde() {
        let d: Difficulty = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(d, Difficulty::Medium);
        assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), "\"hard\"");
    }
}
