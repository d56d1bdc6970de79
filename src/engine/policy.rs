//! Deterministic adaptation policy.
//!
//! Difficulty deltas come from a performance x engagement decision
//! matrix, then pass through oscillation damping, momentum, and a
//! bounds clamp, in that order. The engine keeps the last three
//! decisions plus break state for the lifetime of one session.

use chrono::{DateTime, Duration, Utc};

use super::config::AdaptationParams;
use super::types::{AdaptiveDecision, EngagementState, FusedEngagement, TutoringAction};

pub const EXCELLENT_PERFORMANCE: f64 = 0.85;
pub const GOOD_PERFORMANCE: f64 = 0.70;
pub const FAIR_PERFORMANCE: f64 = 0.50;

pub const HIGH_ENGAGEMENT: f64 = 0.70;
pub const MODERATE_ENGAGEMENT: f64 = 0.50;

/// Deltas smaller than this count as "maintain".
const MEANINGFUL_DELTA: f64 = 0.001;

/// Behavioral score above this reads as suspiciously perfect pacing.
const RUSHING_BEHAVIORAL: f64 = 0.95;

/// Minimum gap after a suggested break before recovery feedback fires.
const BREAK_RECOVERY_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct PolicyEngine {
    params: AdaptationParams,
    recent_deltas: Vec<f64>,
    break_suggestions_made: u32,
    last_break_time: Option<DateTime<Utc>>,
}

impl PolicyEngine {
    pub fn new(params: AdaptationParams) -> Self {
        Self {
            params,
            recent_deltas: Vec::new(),
            break_suggestions_made: 0,
            last_break_time: None,
        }
    }

    pub fn params(&self) -> &AdaptationParams {
        &self.params
    }

    pub fn reset(&mut self) {
        self.recent_deltas.clear();
        self.break_suggestions_made = 0;
        self.last_break_time = None;
    }

    /// Evaluate one decision point.
    ///
    /// `window_performance` is the weighted window score (or cumulative
    /// accuracy under the per-response cadence); `current_difficulty`
    /// is the session difficulty before the delta is applied.
    pub fn decide(
        &mut self,
        fused: &FusedEngagement,
        window_performance: f64,
        current_difficulty: f64,
        now: DateTime<Utc>,
    ) -> AdaptiveDecision {
        if fused.score < 0.0 {
            return AdaptiveDecision {
                primary_action: TutoringAction::MaintainDifficulty,
                secondary_actions: Vec::new(),
                difficulty_delta: 0.0,
                new_difficulty: current_difficulty,
                rationale: "Invalid engagement state".to_string(),
                engagement_influenced: false,
                timestamp: now,
            };
        }

        let (delta, band_reason) =
            self.adjust_difficulty(fused, window_performance, current_difficulty);

        let (primary_action, engagement_influenced, rationale) = if delta.abs() > MEANINGFUL_DELTA {
            if delta > 0.0 {
                (
                    TutoringAction::IncreaseDifficulty,
                    true,
                    format!("Increase difficulty (+{:.3}). {}", delta, band_reason),
                )
            } else {
                (
                    TutoringAction::DecreaseDifficulty,
                    true,
                    format!("Decrease difficulty ({:.3}). {}", delta, band_reason),
                )
            }
        } else {
            (
                TutoringAction::MaintainDifficulty,
                false,
                format!("Maintain difficulty. {}", band_reason),
            )
        };

        let delta = if delta.abs() > MEANINGFUL_DELTA { delta } else { 0.0 };
        let secondary_actions = self.suggest_secondary_actions(fused, window_performance, now);

        self.recent_deltas.push(delta);
        if self.recent_deltas.len() > self.params.oscillation_window {
            self.recent_deltas.remove(0);
        }

        AdaptiveDecision {
            primary_action,
            secondary_actions,
            difficulty_delta: delta,
            new_difficulty: current_difficulty + delta,
            rationale,
            engagement_influenced,
            timestamp: now,
        }
    }

    fn adjust_difficulty(
        &self,
        fused: &FusedEngagement,
        performance: f64,
        current_difficulty: f64,
    ) -> (f64, String) {
        let p = &self.params;
        let engagement = fused.score;
        let rushing_suspected = fused.behavioral_score > RUSHING_BEHAVIORAL;

        let (mut delta, reason): (f64, &str) = if performance >= EXCELLENT_PERFORMANCE {
            if engagement >= HIGH_ENGAGEMENT {
                (p.large_step, "Excellent accuracy (>=85%) + engaged -> large increase")
            } else if engagement >= MODERATE_ENGAGEMENT {
                if rushing_suspected {
                    (
                        p.tiny_step,
                        "Excellent accuracy + moderate engagement, but suspiciously perfect behavior -> cautious increase",
                    )
                } else {
                    (p.small_step, "Excellent accuracy (>=85%) + moderate engagement -> small increase")
                }
            } else {
                (p.small_step, "Excellent accuracy (>=85%) despite low engagement -> small increase (monitor engagement)")
            }
        } else if performance >= GOOD_PERFORMANCE {
            if engagement >= HIGH_ENGAGEMENT {
                (p.small_step, "Good accuracy (70-84%) + engaged -> small increase")
            } else if engagement >= MODERATE_ENGAGEMENT {
                if rushing_suspected {
                    (-p.tiny_step, "Good accuracy but suspiciously perfect behavior -> tiny decrease (monitor engagement)")
                } else {
                    (0.0, "Good accuracy (70-84%) + moderate engagement -> maintain")
                }
            } else {
                (-p.tiny_step, "Good accuracy but disengaged -> tiny decrease (re-engage)")
            }
        } else if performance >= FAIR_PERFORMANCE {
            if engagement >= HIGH_ENGAGEMENT {
                (0.0, "Fair accuracy (50-69%) but engaged -> maintain")
            } else if engagement >= MODERATE_ENGAGEMENT {
                (-p.tiny_step, "Fair accuracy (50-69%) + moderate engagement -> tiny decrease")
            } else {
                (-p.small_step, "Fair accuracy + low engagement -> small decrease (reduce load)")
            }
        } else if engagement >= MODERATE_ENGAGEMENT {
            (-p.small_step, "Poor accuracy (<50%) despite engagement -> small decrease (too hard)")
        } else {
            (-p.large_step, "Poor accuracy (<50%) + low engagement -> large decrease (struggling)")
        };

        let mut reason = reason.to_string();

        // Damping: opposite-signed last two decisions halve the new delta.
        if self.recent_deltas.len() >= 2 {
            let tail = &self.recent_deltas[self.recent_deltas.len() - 2..];
            if tail[0] * tail[1] < -MEANINGFUL_DELTA {
                delta *= self.params.oscillation_damping;
                reason.push_str(" [Oscillation damped to x0.5]");
            }
        }

        // Momentum: three same-signed decisions in a row.
        if self.recent_deltas.len() >= 3 {
            let tail = &self.recent_deltas[self.recent_deltas.len() - 3..];
            if tail.iter().all(|d| *d > MEANINGFUL_DELTA) {
                if delta > 0.0 {
                    delta = (delta * self.params.momentum_boost).min(p.large_step);
                    reason.push_str(" [Momentum boost applied]");
                }
            } else if tail.iter().all(|d| *d < -MEANINGFUL_DELTA) && delta < 0.0 {
                delta = (delta * self.params.decline_momentum).max(-p.large_step);
            }
        }

        // Clamp against the configured difficulty bounds.
        let new_difficulty = current_difficulty + delta;
        if new_difficulty < p.min_difficulty {
            delta = p.min_difficulty - current_difficulty;
            reason.push_str(&format!(" [Clamped to min: {}]", p.min_difficulty));
        } else if new_difficulty > p.max_difficulty {
            delta = p.max_difficulty - current_difficulty;
            reason.push_str(&format!(" [Clamped to max: {}]", p.max_difficulty));
        }

        (delta, reason)
    }

    fn suggest_secondary_actions(
        &mut self,
        fused: &FusedEngagement,
        performance: f64,
        now: DateTime<Utc>,
    ) -> Vec<TutoringAction> {
        let mut actions = Vec::new();

        if fused.affective_score < 0.3 {
            actions.push(TutoringAction::ProvideHint);
        }

        if fused.categorical_state == EngagementState::Disengaged {
            actions.push(TutoringAction::GiveMotivationalFeedback);
        }

        let struggling = matches!(
            fused.categorical_state,
            EngagementState::Struggling | EngagementState::Disengaged
        );
        if struggling && performance < FAIR_PERFORMANCE && self.break_suggestions_made < 1 {
            actions.push(TutoringAction::SuggestShortBreak);
            self.break_suggestions_made += 1;
            self.last_break_time = Some(now);
        }

        if let Some(break_time) = self.last_break_time {
            if now - break_time > Duration::seconds(BREAK_RECOVERY_SECS)
                && fused.score > MODERATE_ENGAGEMENT
            {
                actions.push(TutoringAction::GiveMotivationalFeedback);
            }
        }

        if fused.cognitive_score > 0.8
            && !actions.contains(&TutoringAction::GiveMotivationalFeedback)
        {
            actions.push(TutoringAction::GiveMotivationalFeedback);
        }

        actions
    }
}

/// Fixed difficulty steps driven by cumulative session accuracy; used
/// when a session opts into the per-response cadence instead of the
/// window cadence.
pub fn cumulative_accuracy_delta(accuracy: f64) -> f64 {
    if accuracy >= 0.80 {
        0.10
    } else if accuracy >= 0.67 {
        0.01
    } else if accuracy > 0.33 {
        0.0
    } else {
        -0.10
    }
}
