//! End-to-end adaptation scenarios run through a session runtime under
//! the window cadence: one full window of responses in, one decision out.

use chrono::Utc;
use tutor_backend_rust::engine::types::{AdaptationCadence, ResponseSample, TutoringAction};
use tutor_backend_rust::engine::{EngineConfig, ResponseEvaluation, SessionRuntime};

fn window(correct: bool, time: f64, hints: u32, gap_ms: i64, start_ms: i64) -> Vec<ResponseSample> {
    (0..5)
        .map(|i| ResponseSample {
            is_correct: correct,
            response_time_seconds: time,
            hints_used: hints,
            timestamp_ms: start_ms + gap_ms * i as i64,
        })
        .collect()
}

/// Feed one window of samples; returns the evaluation of the final
/// (decision-carrying) response.
fn run_window(
    rt: &mut SessionRuntime,
    samples: &[ResponseSample],
    difficulty: f64,
) -> ResponseEvaluation {
    let mut last = None;
    for i in 0..samples.len() {
        last = Some(rt.evaluate_response(
            &samples[..=i],
            samples[i],
            difficulty,
            0.0,
            None,
            Utc::now(),
        ));
    }
    last.expect("window is non-empty")
}

fn runtime(difficulty: f64) -> SessionRuntime {
    SessionRuntime::new(EngineConfig::default(), AdaptationCadence::Window, difficulty)
}

#[test]
fn steady_correct_window_takes_small_increase() {
    let mut rt = runtime(0.5);
    let eval = run_window(&mut rt, &window(true, 5.0, 0, 5_000, 1_000_000), 0.5);

    let score = eval.window_score.expect("window completed");
    assert!((score.score - 1.0).abs() < 1e-9);

    // All correct at steady pace fuses to moderate engagement, so the
    // excellent window earns the small step rather than the large one.
    assert!(eval.fused.score >= 0.5 && eval.fused.score < 0.7);
    let decision = eval.decision.expect("boundary decision");
    assert_eq!(decision.primary_action, TutoringAction::IncreaseDifficulty);
    assert!((decision.difficulty_delta - 0.05).abs() < 1e-9);
    assert!((eval.new_difficulty - 0.55).abs() < 1e-9);
}

#[test]
fn struggling_window_takes_large_decrease() {
    let mut rt = runtime(0.70);
    let eval = run_window(&mut rt, &window(false, 20.0, 3, 20_000, 1_000_000), 0.70);

    let score = eval.window_score.expect("window completed");
    // accuracy 0, 20s time tier, 15 hints tier.
    assert!((score.score - (0.7 * 0.25 + 0.1 * 0.15)).abs() < 1e-9);
    assert!(eval.fused.score < 0.5);

    let decision = eval.decision.expect("boundary decision");
    assert_eq!(decision.primary_action, TutoringAction::DecreaseDifficulty);
    assert!((decision.difficulty_delta + 0.10).abs() < 1e-9);
    assert!((eval.new_difficulty - 0.60).abs() < 1e-9);
}

#[test]
fn rushed_perfect_window_gets_cautious_increase() {
    let mut rt = runtime(0.5);
    let eval = run_window(&mut rt, &window(true, 0.5, 0, 1_000, 1_000_000), 0.5);

    // Sub-second perfect answers: near-perfect behavioral score reads
    // as suspicious pacing and boredom dominates the drivers.
    assert!(eval.fused.behavioral_score > 0.95);
    assert_eq!(eval.fused.primary_driver, "Boredom detected");

    let decision = eval.decision.expect("boundary decision");
    assert!((decision.difficulty_delta - 0.025).abs() < 1e-9);
    assert!(decision.rationale.contains("suspiciously perfect"));
    assert!((eval.new_difficulty - 0.525).abs() < 1e-9);
}

#[test]
fn alternating_windows_are_damped() {
    let mut rt = runtime(0.5);

    let up = run_window(&mut rt, &window(true, 5.0, 0, 5_000, 1_000_000), 0.5);
    assert!((up.new_difficulty - 0.55).abs() < 1e-9);

    let down = run_window(&mut rt, &window(false, 20.0, 3, 20_000, 2_000_000), 0.55);
    assert!((down.new_difficulty - 0.45).abs() < 1e-9);

    // Third window reverses again; the +0.05 step is halved.
    let damped = run_window(&mut rt, &window(true, 5.0, 0, 5_000, 3_000_000), 0.45);
    let decision = damped.decision.expect("boundary decision");
    assert!((decision.difficulty_delta - 0.025).abs() < 1e-9);
    assert!(decision.rationale.contains("Oscillation damped"));
    assert!((damped.new_difficulty - 0.475).abs() < 1e-9);
}

#[test]
fn increase_clamps_at_the_upper_bound() {
    let mut rt = runtime(0.87);
    let eval = run_window(&mut rt, &window(true, 5.0, 0, 5_000, 1_000_000), 0.87);

    let decision = eval.decision.expect("boundary decision");
    assert!((decision.difficulty_delta - 0.03).abs() < 1e-9);
    assert!((eval.new_difficulty - 0.9).abs() < 1e-9);
    assert!(decision.rationale.contains("Clamped to max"));
}

#[test]
fn window_summary_tracks_difficulty_and_drivers() {
    let mut rt = runtime(0.5);
    let eval = run_window(&mut rt, &window(true, 5.0, 0, 5_000, 1_000_000), 0.5);

    let summary = eval.window_summary.expect("summary at boundary");
    assert_eq!(summary.window_number, 0);
    assert_eq!(summary.difficulty_at_start, 0.5);
    assert!((summary.difficulty_at_end - 0.55).abs() < 1e-9);
    assert_eq!(summary.score.metrics.correct_count, 5);
    // First response of a session has no window yet, so averages blend
    // the neutral bootstrap with the later fused scores.
    assert!(summary.avg_engagement_score > 0.0 && summary.avg_engagement_score <= 1.0);
    assert!(!summary.primary_driver_summary.is_empty());
}
