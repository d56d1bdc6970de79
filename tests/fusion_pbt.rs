//! Property-Based Tests for the engagement pipeline
//!
//! Tests the following invariants:
//! - Fused score is always the exact 0.4/0.4/0.2 weighted channel sum
//! - All channel scores and probabilities stay inside [0, 1]
//! - Extraction and fusion are deterministic for a fixed window
//! - Window performance scores stay inside [0, 1] and match their components
//! - Policy deltas never push difficulty outside the configured bounds

use chrono::Utc;
use proptest::prelude::*;

use tutor_backend_rust::engine::config::{AdaptationParams, FusionWeights};
use tutor_backend_rust::engine::policy::PolicyEngine;
use tutor_backend_rust::engine::types::{FusedEngagement, ResponseSample};
use tutor_backend_rust::engine::window::WindowTracker;
use tutor_backend_rust::engine::{fusion, indicators};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_f64_0_1() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_sample() -> impl Strategy<Value = ResponseSample> {
    (
        any::<bool>(),
        (0u64..=120_000u64).prop_map(|ms| ms as f64 / 1000.0), // 0..120s
        0u32..=4u32,
    )
        .prop_map(|(is_correct, response_time_seconds, hints_used)| ResponseSample {
            is_correct,
            response_time_seconds,
            hints_used,
            timestamp_ms: 0,
        })
}

/// A window of 2..=10 responses with monotone timestamps.
fn arb_window() -> impl Strategy<Value = Vec<ResponseSample>> {
    (
        proptest::collection::vec(arb_sample(), 2..=10),
        proptest::collection::vec(0i64..=60_000i64, 10),
    )
        .prop_map(|(mut samples, gaps)| {
            let mut ts = 1_000_000i64;
            for (sample, gap) in samples.iter_mut().zip(gaps) {
                ts += gap;
                sample.timestamp_ms = ts;
            }
            samples
        })
}

fn arb_fused(score: f64) -> FusedEngagement {
    FusedEngagement {
        score,
        categorical_state: fusion::score_to_state(score),
        behavioral_score: score,
        cognitive_score: score,
        affective_score: score,
        confidence: 0.85,
        primary_driver: String::new(),
        secondary_driver: None,
        timestamp: Utc::now(),
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn fused_score_is_exact_weighted_sum(window in arb_window()) {
        let ind = indicators::extract(&window);
        prop_assert!(ind.is_valid);
        let weights = FusionWeights::default();
        let fused = fusion::fuse(&ind, &weights, Utc::now());

        let expected = (fused.behavioral_score * weights.behavioral
            + fused.cognitive_score * weights.cognitive
            + fused.affective_score * weights.affective)
            .clamp(0.0, 1.0);
        prop_assert!((fused.score - expected).abs() < 1e-9);
    }

    #[test]
    fn channels_and_probabilities_stay_in_unit_range(window in arb_window()) {
        let ind = indicators::extract(&window);
        prop_assert!((0.0..=1.0).contains(&ind.response_time_deviation));
        prop_assert!((0.0..=1.0).contains(&ind.rapid_guessing_probability));
        prop_assert!((-1.0..=1.0).contains(&ind.accuracy_trend));
        prop_assert!((0.0..=1.0).contains(&ind.consistency_score));
        prop_assert!((0.0..=1.0).contains(&ind.inferred_cognitive_load));
        prop_assert!((0.0..=1.0).contains(&ind.frustration_probability));
        prop_assert!((0.0..=1.0).contains(&ind.confusion_probability));
        prop_assert!((0.0..=1.0).contains(&ind.boredom_probability));

        let fused = fusion::fuse(&ind, &FusionWeights::default(), Utc::now());
        prop_assert!((0.0..=1.0).contains(&fused.score));
        prop_assert!((0.0..=1.0).contains(&fused.behavioral_score));
        prop_assert!((0.0..=1.0).contains(&fused.cognitive_score));
        prop_assert!((0.0..=1.0).contains(&fused.affective_score));
    }

    #[test]
    fn extraction_and_fusion_are_deterministic(window in arb_window()) {
        let now = Utc::now();
        let a = fusion::fuse(&indicators::extract(&window), &FusionWeights::default(), now);
        let b = fusion::fuse(&indicators::extract(&window), &FusionWeights::default(), now);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn window_score_matches_its_components(window in arb_window()) {
        let mut tracker = WindowTracker::new(window.len());
        let mut score = None;
        for sample in &window {
            score = tracker.add_response(*sample);
        }
        let score = score.expect("final response completes the window");

        let expected = score.accuracy_component * 0.60
            + score.time_component * 0.25
            + score.hint_component * 0.15;
        prop_assert!((score.score - expected).abs() < 1e-9);
        prop_assert!((0.0..=1.0).contains(&score.score));
        prop_assert_eq!(
            score.metrics.correct_count + score.metrics.incorrect_count,
            window.len()
        );
    }

    #[test]
    fn policy_never_leaves_the_difficulty_bounds(
        engagement in arb_f64_0_1(),
        performance in arb_f64_0_1(),
        behavioral in arb_f64_0_1(),
        difficulty in (100u64..=900u64).prop_map(|v| v as f64 / 1000.0),
        steps in 1usize..=8,
    ) {
        let params = AdaptationParams::default();
        let (min, max) = (params.min_difficulty, params.max_difficulty);
        let mut engine = PolicyEngine::new(params);
        let mut fused = arb_fused(engagement);
        fused.behavioral_score = behavioral;

        let mut current = difficulty;
        for _ in 0..steps {
            let decision = engine.decide(&fused, performance, current, Utc::now());
            prop_assert!(
                (decision.new_difficulty - (current + decision.difficulty_delta)).abs() < 1e-12
            );
            current = decision.new_difficulty;
            prop_assert!((min..=max).contains(&current));
        }
    }
}
