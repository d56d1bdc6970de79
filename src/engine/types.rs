use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum EngagementState {
    HighlyEngaged,
    Engaged,
    #[default]
    Neutral,
    Struggling,
    Disengaged,
}

impl EngagementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighlyEngaged => "highly_engaged",
            Self::Engaged => "engaged",
            Self::Neutral => "neutral",
            Self::Struggling => "struggling",
            Self::Disengaged => "disengaged",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "highly_engaged" => Self::HighlyEngaged,
            "engaged" => Self::Engaged,
            "struggling" => Self::Struggling,
            "disengaged" => Self::Disengaged,
            _ => Self::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum EngagementLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl EngagementLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_score(score: f64, low: f64, high: f64) -> Self {
        if score < low {
            Self::Low
        } else if score >= high {
            Self::High
        } else {
            Self::Medium
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Pacing {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl Pacing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Medium => "medium",
            Self::Fast => "fast",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "slow" => Self::Slow,
            "fast" => Self::Fast,
            _ => Self::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum SessionStatus {
    #[default]
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "paused" => Self::Paused,
            "completed" => Self::Completed,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum NavigationPattern {
    #[default]
    Sequential,
    Revisit,
    Backtrack,
}

impl NavigationPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Revisit => "revisit",
            Self::Backtrack => "backtrack",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "revisit" => Self::Revisit,
            "backtrack" => Self::Backtrack,
            _ => Self::Sequential,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum TutoringAction {
    IncreaseDifficulty,
    DecreaseDifficulty,
    #[default]
    MaintainDifficulty,
    ProvideHint,
    GiveMotivationalFeedback,
    SuggestShortBreak,
}

impl TutoringAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncreaseDifficulty => "increase_difficulty",
            Self::DecreaseDifficulty => "decrease_difficulty",
            Self::MaintainDifficulty => "maintain_difficulty",
            Self::ProvideHint => "provide_hint",
            Self::GiveMotivationalFeedback => "give_motivational_feedback",
            Self::SuggestShortBreak => "suggest_short_break",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "increase_difficulty" => Self::IncreaseDifficulty,
            "decrease_difficulty" => Self::DecreaseDifficulty,
            "provide_hint" => Self::ProvideHint,
            "give_motivational_feedback" => Self::GiveMotivationalFeedback,
            "suggest_short_break" => Self::SuggestShortBreak,
            _ => Self::MaintainDifficulty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum AdaptationCadence {
    #[default]
    Window,
    PerResponse,
}

impl AdaptationCadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Window => "window",
            Self::PerResponse => "per_response",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "per_response" => Self::PerResponse,
            _ => Self::Window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum TrendLabel {
    Improving,
    Stable,
    Declining,
    #[default]
    None,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
            Self::None => "none",
        }
    }
}

/// One answered question as the engine sees it, stripped of storage detail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseSample {
    pub is_correct: bool,
    pub response_time_seconds: f64,
    pub hints_used: u32,
    pub timestamp_ms: i64,
}

/// Raw multimodal indicators extracted from a response window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub response_time_deviation: f64,
    pub inactivity_duration: f64,
    pub hint_usage_count: u32,
    pub rapid_guessing_probability: f64,
    pub accuracy_trend: f64,
    pub consistency_score: f64,
    pub inferred_cognitive_load: f64,
    pub frustration_probability: f64,
    pub confusion_probability: f64,
    pub boredom_probability: f64,
    pub window_size: usize,
    pub is_valid: bool,
}

impl Indicators {
    /// Placeholder emitted when no responses exist yet.
    pub fn invalid() -> Self {
        Self {
            response_time_deviation: 0.0,
            inactivity_duration: 0.0,
            hint_usage_count: 0,
            rapid_guessing_probability: 0.0,
            accuracy_trend: 0.0,
            consistency_score: 0.0,
            inferred_cognitive_load: 0.0,
            frustration_probability: 0.0,
            confusion_probability: 0.0,
            boredom_probability: 0.0,
            window_size: 0,
            is_valid: false,
        }
    }
}

/// Output of the weighted multimodal fusion step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedEngagement {
    pub score: f64,
    pub categorical_state: EngagementState,
    pub behavioral_score: f64,
    pub cognitive_score: f64,
    pub affective_score: f64,
    pub confidence: f64,
    pub primary_driver: String,
    pub secondary_driver: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FusedEngagement {
    /// Neutral result used before the first response arrives.
    pub fn neutral(now: DateTime<Utc>) -> Self {
        Self {
            score: 0.5,
            categorical_state: EngagementState::Neutral,
            behavioral_score: 0.5,
            cognitive_score: 0.5,
            affective_score: 0.5,
            confidence: 0.0,
            primary_driver: "Insufficient data".to_string(),
            secondary_driver: None,
            timestamp: now,
        }
    }
}

/// Decision produced by the adaptation policy for one evaluation point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveDecision {
    pub primary_action: TutoringAction,
    pub secondary_actions: Vec<TutoringAction>,
    pub difficulty_delta: f64,
    pub new_difficulty: f64,
    pub rationale: String,
    pub engagement_influenced: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HintRecord {
    pub hint_index: u32,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionChange {
    pub from: AnswerOption,
    pub to: AnswerOption,
    pub timestamp_ms: i64,
}

/// Optional facial-channel reading attached to a response submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacialMetrics {
    pub emotion: String,
    pub confidence: f64,
    #[serde(default)]
    pub gaze_direction: Option<String>,
    #[serde(default)]
    pub posture_state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_option_round_trip() {
        for s in ["A", "b", " c ", "D"] {
            let opt = AnswerOption::parse(s).unwrap();
            assert_eq!(opt, AnswerOption::parse(opt.as_str()).unwrap());
        }
        assert!(AnswerOption::parse("E").is_none());
        assert!(AnswerOption::parse("").is_none());
    }

    #[test]
    fn engagement_state_counts_as_a_map_key() {
        use std::collections::HashMap;
        let states = [
            EngagementState::Engaged,
            EngagementState::Neutral,
            EngagementState::Engaged,
        ];
        let mut counts: HashMap<EngagementState, usize> = HashMap::new();
        for state in states {
            *counts.entry(state).or_insert(0) += 1;
        }
        assert_eq!(counts[&EngagementState::Engaged], 2);
        assert_eq!(counts[&EngagementState::Neutral], 1);
    }

    #[test]
    fn engagement_state_parse_defaults_to_neutral() {
        assert_eq!(EngagementState::parse("highly_engaged"), EngagementState::HighlyEngaged);
        assert_eq!(EngagementState::parse("bogus"), EngagementState::Neutral);
    }

    #[test]
    fn engagement_level_from_score_uses_half_open_bands() {
        assert_eq!(EngagementLevel::from_score(0.29, 0.3, 0.7), EngagementLevel::Low);
        assert_eq!(EngagementLevel::from_score(0.3, 0.3, 0.7), EngagementLevel::Medium);
        assert_eq!(EngagementLevel::from_score(0.7, 0.3, 0.7), EngagementLevel::High);
    }

    #[test]
    fn action_serde_uses_snake_case() {
        let json = serde_json::to_string(&TutoringAction::GiveMotivationalFeedback).unwrap();
        assert_eq!(json, "\"give_motivational_feedback\"");
        assert_eq!(TutoringAction::parse("suggest_short_break"), TutoringAction::SuggestShortBreak);
    }

    #[test]
    fn neutral_fusion_matches_cold_start_contract() {
        let f = FusedEngagement::neutral(Utc::now());
        assert_eq!(f.score, 0.5);
        assert_eq!(f.confidence, 0.0);
        assert_eq!(f.primary_driver, "Insufficient data");
    }
}
