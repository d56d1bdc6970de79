//! Weighted multimodal fusion of engagement indicators.
//!
//! Behavioral and cognitive channels each carry 40% of the fused score,
//! the (inferred) affective channel 20%. The fused score is
//! deterministic: the same indicator set always produces the same
//! output bit for bit.

use chrono::{DateTime, Utc};

use super::config::FusionWeights;
use super::types::{EngagementState, FusedEngagement, Indicators};

const HIGHLY_ENGAGED_THRESHOLD: f64 = 0.80;
const ENGAGED_THRESHOLD: f64 = 0.60;
const NEUTRAL_THRESHOLD: f64 = 0.40;
const STRUGGLING_THRESHOLD: f64 = 0.20;

pub fn fuse(indicators: &Indicators, weights: &FusionWeights, now: DateTime<Utc>) -> FusedEngagement {
    if !indicators.is_valid {
        return FusedEngagement::neutral(now);
    }

    let behavioral = normalize_behavioral(indicators);
    let cognitive = normalize_cognitive(indicators);
    let affective = normalize_affective(indicators);

    let score = (behavioral * weights.behavioral
        + cognitive * weights.cognitive
        + affective * weights.affective)
        .clamp(0.0, 1.0);

    let (primary, secondary) = identify_drivers(behavioral, cognitive, affective, indicators);

    FusedEngagement {
        score,
        categorical_state: score_to_state(score),
        behavioral_score: behavioral,
        cognitive_score: cognitive,
        affective_score: affective,
        confidence: confidence_for_window(indicators.window_size),
        primary_driver: primary,
        secondary_driver: secondary,
        timestamp: now,
    }
}

pub fn score_to_state(score: f64) -> EngagementState {
    if score >= HIGHLY_ENGAGED_THRESHOLD {
        EngagementState::HighlyEngaged
    } else if score >= ENGAGED_THRESHOLD {
        EngagementState::Engaged
    } else if score >= NEUTRAL_THRESHOLD {
        EngagementState::Neutral
    } else if score >= STRUGGLING_THRESHOLD {
        EngagementState::Struggling
    } else {
        EngagementState::Disengaged
    }
}

/// Steady pacing, presence, independence from hints, and no guessing.
fn normalize_behavioral(ind: &Indicators) -> f64 {
    let consistency = 1.0 - ind.response_time_deviation;
    let presence = (1.0 - ind.inactivity_duration / 60.0).max(0.0);
    let hints = match ind.hint_usage_count {
        0 => 1.0,
        1 => 0.8,
        2 => 0.6,
        n => (1.0 - n as f64 * 0.2).max(0.2),
    };
    let no_guessing = 1.0 - ind.rapid_guessing_probability;

    ((consistency + presence + hints + no_guessing) / 4.0).clamp(0.0, 1.0)
}

/// Trend maps [-1, 1] onto [0.2, 0.9]; load is a tent peaking at 0.5.
fn normalize_cognitive(ind: &Indicators) -> f64 {
    let trend = (ind.accuracy_trend + 1.0) / 2.0 * 0.7 + 0.2;
    let consistency = ind.consistency_score;
    let load = if ind.inferred_cognitive_load < 0.5 {
        0.3 + ind.inferred_cognitive_load * 1.4
    } else {
        1.0 - (ind.inferred_cognitive_load - 0.5) * 1.6
    }
    .clamp(0.2, 1.0);

    ((trend + consistency + load) / 3.0).clamp(0.0, 1.0)
}

fn normalize_affective(ind: &Indicators) -> f64 {
    let score = ((1.0 - ind.frustration_probability)
        + (1.0 - ind.confusion_probability)
        + (1.0 - ind.boredom_probability))
        / 3.0;
    score.clamp(0.0, 1.0)
}

/// Priority-ordered rule table; negative drivers outrank positive ones,
/// behavioral before cognitive before affective within each group.
fn identify_drivers(
    behavioral: f64,
    cognitive: f64,
    affective: f64,
    ind: &Indicators,
) -> (String, Option<String>) {
    let mut drivers: Vec<&'static str> = Vec::new();

    if ind.hint_usage_count > 2 {
        drivers.push("Struggling (many hints)");
    } else if ind.response_time_deviation > 0.8 {
        drivers.push("Variable response times");
    } else if ind.rapid_guessing_probability > 0.5 {
        drivers.push("Rapid guessing detected");
    } else if ind.inactivity_duration > 30.0 {
        drivers.push("Long inactivity periods");
    }

    if ind.accuracy_trend < -0.3 {
        drivers.push("Declining accuracy");
    } else if ind.inferred_cognitive_load > 0.8 {
        drivers.push("High cognitive load");
    } else if ind.consistency_score < 0.3 {
        drivers.push("Inconsistent performance");
    }

    if ind.frustration_probability > 0.7 {
        drivers.push("Frustration detected");
    } else if ind.confusion_probability > 0.7 {
        drivers.push("Confusion detected");
    } else if ind.boredom_probability > 0.7 {
        drivers.push("Boredom detected");
    }

    if drivers.is_empty() {
        if behavioral > 0.8 {
            drivers.push("Steady behavioral engagement");
        }
        if cognitive > 0.8 {
            drivers.push("Strong cognitive performance");
        }
        if affective > 0.8 {
            drivers.push("Positive affective state");
        }
    }

    let primary = drivers.first().copied().unwrap_or("No clear driver").to_string();
    let secondary = drivers.get(1).map(|d| d.to_string());
    (primary, secondary)
}

/// Larger windows back the assessment with more evidence.
fn confidence_for_window(window_size: usize) -> f64 {
    if window_size < 3 {
        0.3
    } else if window_size < 5 {
        0.6
    } else if window_size < 10 {
        0.85
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::indicators::extract;
    use crate::engine::types::ResponseSample;

    fn window(correct: bool, time: f64, hints: u32, gap_ms: i64) -> Vec<ResponseSample> {
        (0..5)
            .map(|i| ResponseSample {
                is_correct: correct,
                response_time_seconds: time,
                hints_used: hints,
                timestamp_ms: 1_000_000 + gap_ms * i as i64,
            })
            .collect()
    }

    #[test]
    fn invalid_indicators_fuse_to_neutral() {
        let fused = fuse(&Indicators::invalid(), &FusionWeights::default(), Utc::now());
        assert_eq!(fused.score, 0.5);
        assert_eq!(fused.categorical_state, EngagementState::Neutral);
        assert_eq!(fused.confidence, 0.0);
        assert_eq!(fused.primary_driver, "Insufficient data");
    }

    #[test]
    fn fusion_is_exact_weighted_sum() {
        let ind = extract(&window(true, 5.0, 0, 5_000));
        let w = FusionWeights::default();
        let fused = fuse(&ind, &w, Utc::now());
        let expected = fused.behavioral_score * w.behavioral
            + fused.cognitive_score * w.cognitive
            + fused.affective_score * w.affective;
        assert!((fused.score - expected).abs() < 1e-9);
        assert_eq!(fused.confidence, 0.85);
    }

    #[test]
    fn fusion_is_deterministic() {
        let ind = extract(&window(false, 20.0, 3, 20_000));
        let now = Utc::now();
        let a = fuse(&ind, &FusionWeights::default(), now);
        let b = fuse(&ind, &FusionWeights::default(), now);
        assert_eq!(a, b);
    }

    #[test]
    fn struggling_window_scores_low_with_negative_drivers() {
        // 5 wrong at 20s with hints everywhere: all channels depressed.
        let fused = fuse(
            &extract(&window(false, 20.0, 3, 20_000)),
            &FusionWeights::default(),
            Utc::now(),
        );
        assert!(fused.score < 0.6);
        assert_eq!(fused.primary_driver, "Struggling (many hints)");
        assert!(fused.secondary_driver.is_some());
    }

    #[test]
    fn boredom_driver_fires_on_rushed_perfect_window() {
        let fused = fuse(
            &extract(&window(true, 0.8, 0, 1_000)),
            &FusionWeights::default(),
            Utc::now(),
        );
        assert_eq!(fused.primary_driver, "Boredom detected");
    }

    #[test]
    fn category_bands_are_half_open() {
        assert_eq!(score_to_state(0.80), EngagementState::HighlyEngaged);
        assert_eq!(score_to_state(0.60), EngagementState::Engaged);
        assert_eq!(score_to_state(0.40), EngagementState::Neutral);
        assert_eq!(score_to_state(0.20), EngagementState::Struggling);
        assert_eq!(score_to_state(0.19), EngagementState::Disengaged);
    }

    #[test]
    fn cognitive_load_tent_peaks_at_half() {
        let mut ind = extract(&window(true, 5.0, 0, 5_000));
        ind.inferred_cognitive_load = 0.5;
        let mid = normalize_cognitive(&ind);
        ind.inferred_cognitive_load = 0.0;
        let low = normalize_cognitive(&ind);
        ind.inferred_cognitive_load = 1.0;
        let high = normalize_cognitive(&ind);
        assert!(mid > low && mid > high);
    }
}
