//! Per-session runtime state and the evaluation pipeline.
//!
//! Each session owns one `SessionRuntime` behind a mutex: policy
//! memory, the rolling performance window, and hints requested before
//! the answer lands. The registry hands out runtimes and serializes
//! writers per session; different sessions never contend.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::config::EngineConfig;
use super::facial;
use super::fusion;
use super::indicators;
use super::policy::{cumulative_accuracy_delta, PolicyEngine};
use super::types::{
    AdaptationCadence, AdaptiveDecision, EngagementState, FacialMetrics, FusedEngagement,
    HintRecord, Indicators, ResponseSample, TutoringAction,
};
use super::window::{WindowScore, WindowTracker};

/// Everything one response evaluation produced, ready for persistence.
#[derive(Debug, Clone)]
pub struct ResponseEvaluation {
    pub indicators: Indicators,
    pub fused: FusedEngagement,
    pub decision: Option<AdaptiveDecision>,
    pub window_score: Option<WindowScore>,
    pub window_summary: Option<WindowSummaryData>,
    pub new_difficulty: f64,
}

/// Aggregates for a just-completed window.
#[derive(Debug, Clone)]
pub struct WindowSummaryData {
    pub window_number: usize,
    pub score: WindowScore,
    pub avg_engagement_score: f64,
    pub avg_behavioral_score: f64,
    pub avg_cognitive_score: f64,
    pub avg_affective_score: f64,
    pub dominant_state: EngagementState,
    pub primary_driver_summary: String,
    pub difficulty_at_start: f64,
    pub difficulty_at_end: f64,
    pub increase_count: usize,
    pub decrease_count: usize,
    pub maintain_count: usize,
}

#[derive(Debug)]
pub struct SessionRuntime {
    config: EngineConfig,
    cadence: AdaptationCadence,
    policy: PolicyEngine,
    window: WindowTracker,
    window_fused: Vec<FusedEngagement>,
    window_decisions: Vec<TutoringAction>,
    window_start_difficulty: f64,
    pending_hints: HashMap<String, Vec<HintRecord>>,
}

impl SessionRuntime {
    pub fn new(config: EngineConfig, cadence: AdaptationCadence, initial_difficulty: f64) -> Self {
        Self {
            policy: PolicyEngine::new(config.adaptation.clone()),
            window: WindowTracker::new(config.window_size),
            window_fused: Vec::new(),
            window_decisions: Vec::new(),
            window_start_difficulty: initial_difficulty,
            pending_hints: HashMap::new(),
            cadence,
            config,
        }
    }

    pub fn cadence(&self) -> AdaptationCadence {
        self.cadence
    }

    pub fn window_number(&self) -> usize {
        self.window.window_number()
    }

    /// Record a hint served before the question was answered. Hints
    /// merge on unique timestamps so retries stay idempotent.
    pub fn record_pending_hint(&mut self, question_id: &str, record: HintRecord) {
        let records = self.pending_hints.entry(question_id.to_string()).or_default();
        if !records.iter().any(|r| r.timestamp_ms == record.timestamp_ms) {
            records.push(record);
        }
    }

    /// Drain hints recorded for a question when its answer arrives.
    pub fn take_pending_hints(&mut self, question_id: &str) -> Vec<HintRecord> {
        self.pending_hints.remove(question_id).unwrap_or_default()
    }

    /// Run the full pipeline for one persisted response.
    ///
    /// `window_samples` are the last N responses including this one;
    /// `cumulative_accuracy` covers the whole session and only feeds
    /// the per-response cadence.
    pub fn evaluate_response(
        &mut self,
        window_samples: &[ResponseSample],
        latest: ResponseSample,
        current_difficulty: f64,
        cumulative_accuracy: f64,
        facial_metrics: Option<&FacialMetrics>,
        now: DateTime<Utc>,
    ) -> ResponseEvaluation {
        let indicators = indicators::extract(window_samples);
        let mut fused = fusion::fuse(&indicators, &self.config.fusion, now);

        let facial_signal = facial_metrics.and_then(|m| {
            match facial::engagement_signal(m, &self.config.facial) {
                Ok(signal) => Some(signal),
                Err(reason) => {
                    tracing::debug!(%reason, "facial payload ignored");
                    None
                }
            }
        });
        if let Some(signal) = facial_signal {
            fused.score = facial::modify_engagement(fused.score, signal, &self.config.facial);
        }

        let window_score = self.window.add_response(latest);
        self.window_fused.push(fused.clone());

        let decision = match self.cadence {
            AdaptationCadence::Window => window_score
                .as_ref()
                .map(|score| self.policy.decide(&fused, score.score, current_difficulty, now)),
            AdaptationCadence::PerResponse => {
                Some(self.cumulative_decision(cumulative_accuracy, current_difficulty, now))
            }
        };

        let decision = decision.map(|d| match facial_signal {
            Some(signal) => self.apply_facial_delta(d, signal, current_difficulty),
            None => d,
        });

        if let Some(d) = &decision {
            self.window_decisions.push(d.primary_action);
        }

        let new_difficulty = decision
            .as_ref()
            .map(|d| d.new_difficulty)
            .unwrap_or(current_difficulty);

        let window_summary = window_score
            .as_ref()
            .map(|score| self.finish_window(score.clone(), new_difficulty));

        ResponseEvaluation {
            indicators,
            fused,
            decision,
            window_score,
            window_summary,
            new_difficulty,
        }
    }

    fn cumulative_decision(
        &mut self,
        accuracy: f64,
        current_difficulty: f64,
        now: DateTime<Utc>,
    ) -> AdaptiveDecision {
        let bounds = &self.config.adaptation;
        let raw = cumulative_accuracy_delta(accuracy);
        let new_difficulty = (current_difficulty + raw).clamp(bounds.min_difficulty, bounds.max_difficulty);
        let delta = new_difficulty - current_difficulty;

        let primary_action = if delta > 0.001 {
            TutoringAction::IncreaseDifficulty
        } else if delta < -0.001 {
            TutoringAction::DecreaseDifficulty
        } else {
            TutoringAction::MaintainDifficulty
        };

        AdaptiveDecision {
            primary_action,
            secondary_actions: Vec::new(),
            difficulty_delta: delta,
            new_difficulty,
            rationale: format!(
                "Cumulative accuracy {:.0}% -> step {:+.3}",
                accuracy * 100.0,
                delta
            ),
            engagement_influenced: false,
            timestamp: now,
        }
    }

    fn apply_facial_delta(
        &self,
        mut decision: AdaptiveDecision,
        signal: f64,
        current_difficulty: f64,
    ) -> AdaptiveDecision {
        let base = decision.difficulty_delta;
        let modified = facial::modify_delta(base, signal, &self.config.facial);
        let bounds = &self.config.adaptation;
        let new_difficulty =
            (current_difficulty + modified).clamp(bounds.min_difficulty, bounds.max_difficulty);
        let delta = new_difficulty - current_difficulty;
        if (delta - base).abs() > f64::EPSILON {
            decision.rationale.push_str(&format!(
                " [Facial signal {:.2}: delta {:+.3} -> {:+.3}]",
                signal, base, delta
            ));
        }
        decision.difficulty_delta = delta;
        decision.new_difficulty = new_difficulty;
        decision
    }

    fn finish_window(&mut self, score: WindowScore, difficulty_at_end: f64) -> WindowSummaryData {
        let n = self.window_fused.len().max(1) as f64;
        let avg = |f: fn(&FusedEngagement) -> f64| {
            self.window_fused.iter().map(f).sum::<f64>() / n
        };

        let mut state_counts: HashMap<EngagementState, usize> = HashMap::new();
        for fused in &self.window_fused {
            *state_counts.entry(fused.categorical_state).or_insert(0) += 1;
        }
        let dominant_state = state_counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map(|(state, _)| state)
            .unwrap_or_default();

        let mut drivers: Vec<&str> = Vec::new();
        for fused in &self.window_fused {
            if !drivers.contains(&fused.primary_driver.as_str()) {
                drivers.push(&fused.primary_driver);
            }
        }
        let primary_driver_summary = drivers.join("; ");

        let increase_count = self
            .window_decisions
            .iter()
            .filter(|a| **a == TutoringAction::IncreaseDifficulty)
            .count();
        let decrease_count = self
            .window_decisions
            .iter()
            .filter(|a| **a == TutoringAction::DecreaseDifficulty)
            .count();
        let maintain_count = self.window_decisions.len() - increase_count - decrease_count;

        let summary = WindowSummaryData {
            // add_response already rolled the tracker over.
            window_number: self.window.window_number() - 1,
            avg_engagement_score: avg(|f| f.score),
            avg_behavioral_score: avg(|f| f.behavioral_score),
            avg_cognitive_score: avg(|f| f.cognitive_score),
            avg_affective_score: avg(|f| f.affective_score),
            dominant_state,
            primary_driver_summary,
            difficulty_at_start: self.window_start_difficulty,
            difficulty_at_end,
            increase_count,
            decrease_count,
            maintain_count,
            score,
        };

        self.window_fused.clear();
        self.window_decisions.clear();
        self.window_start_difficulty = difficulty_at_end;

        summary
    }
}

/// Hands out per-session runtimes. Holding the runtime's mutex makes
/// the caller the single writer for that session.
pub struct CoordinatorRegistry {
    config: EngineConfig,
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionRuntime>>>>,
}

impl CoordinatorRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn runtime(
        &self,
        session_id: &str,
        cadence: AdaptationCadence,
        current_difficulty: f64,
    ) -> Arc<Mutex<SessionRuntime>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(runtime) = sessions.get(session_id) {
                return Arc::clone(runtime);
            }
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(session_id.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(SessionRuntime::new(
                self.config.clone(),
                cadence,
                current_difficulty,
            )))
        }))
    }

    pub async fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}
