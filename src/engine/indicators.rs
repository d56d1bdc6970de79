//! Multimodal indicator extraction over a response window.
//!
//! All probabilities are in [0, 1]; `accuracy_trend` is in [-1, 1];
//! `inactivity_duration` stays in raw seconds and `hint_usage_count`
//! in raw counts.

use super::types::{Indicators, ResponseSample};

/// Responses faster than this are treated as potential guesses.
pub const RESPONSE_TIME_MIN: f64 = 1.0;
/// Sweet-spot response time; cognitive load ramps up above it.
pub const RESPONSE_TIME_IDEAL: f64 = 5.0;
/// Inactivity beyond this many seconds reads as disengagement.
pub const INACTIVITY_THRESHOLD: f64 = 30.0;
/// Hints per window at or above which the student counts as struggling.
pub const HINT_OVERUSE_THRESHOLD: u32 = 3;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator), 0 for fewer than two values.
fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Number of runs in a correctness sequence: transitions plus one.
fn count_runs(sequence: &[bool]) -> usize {
    if sequence.len() < 2 {
        return sequence.len();
    }
    1 + sequence.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Extract the full indicator set from a window of responses.
///
/// Fewer than two responses yields `Indicators::invalid()` so callers
/// can fall back to the neutral engagement state.
pub fn extract(responses: &[ResponseSample]) -> Indicators {
    if responses.len() < 2 {
        return Indicators::invalid();
    }

    let mut out = Indicators::invalid();
    out.window_size = responses.len();

    let correctness: Vec<bool> = responses.iter().map(|r| r.is_correct).collect();
    let accuracy = correctness.iter().filter(|c| **c).count() as f64 / responses.len() as f64;
    let times: Vec<f64> = responses
        .iter()
        .map(|r| r.response_time_seconds)
        .filter(|t| *t > 0.0)
        .collect();

    // Behavioral: coefficient of variation of response times, capped at 1.
    if times.len() >= 2 {
        let m = mean(&times);
        if m > 0.0 {
            out.response_time_deviation = (sample_stdev(&times) / m).min(1.0);
        }
    }

    // Behavioral: summed inter-response gaps, in seconds.
    out.inactivity_duration = responses
        .windows(2)
        .map(|w| (w[1].timestamp_ms - w[0].timestamp_ms) as f64 / 1000.0)
        .sum();

    // Behavioral: responses that needed at least one hint.
    out.hint_usage_count = responses.iter().filter(|r| r.hints_used > 0).count() as u32;

    // Behavioral: among sub-second responses, the fraction answered wrong.
    let rapid: Vec<&ResponseSample> = responses
        .iter()
        .filter(|r| r.response_time_seconds > 0.0 && r.response_time_seconds < RESPONSE_TIME_MIN)
        .collect();
    if !rapid.is_empty() {
        let wrong = rapid.iter().filter(|r| !r.is_correct).count();
        out.rapid_guessing_probability = wrong as f64 / rapid.len() as f64;
    }

    // Cognitive: second-half accuracy minus first-half accuracy.
    if responses.len() >= 4 {
        let mid = responses.len() / 2;
        let first = correctness[..mid].iter().filter(|c| **c).count() as f64 / mid as f64;
        let second = correctness[mid..].iter().filter(|c| **c).count() as f64
            / (responses.len() - mid) as f64;
        out.accuracy_trend = (second - first).clamp(-1.0, 1.0);
    }

    // Cognitive: accuracy polarization averaged with the run pattern.
    if responses.len() >= 3 {
        let polarization = 1.0 - (accuracy - 0.5).abs() * 2.0;
        let max_runs = responses.len() / 2 + 1;
        let run_ratio = count_runs(&correctness) as f64 / max_runs as f64;
        let run_component = (1.0 - run_ratio).clamp(0.0, 1.0);
        out.consistency_score = (polarization + run_component) / 2.0;
    }

    // Cognitive: equal-weight blend of accuracy, pace, and hint pressure.
    let load_from_accuracy = 1.0 - accuracy;
    let load_from_time = if times.is_empty() {
        0.0
    } else {
        ((mean(&times) - RESPONSE_TIME_IDEAL) / 25.0).clamp(0.0, 1.0)
    };
    let load_from_hints = (out.hint_usage_count as f64 / HINT_OVERUSE_THRESHOLD as f64).min(1.0);
    out.inferred_cognitive_load = (load_from_accuracy + load_from_time + load_from_hints) / 3.0;

    // Affective: each probability is the mean of whichever signals fired.
    let mut frustration = vec![1.0 - accuracy];
    if out.inactivity_duration > INACTIVITY_THRESHOLD {
        frustration.push(0.7);
    }
    if out.accuracy_trend < -0.2 {
        frustration.push(0.8);
    }
    if out.hint_usage_count > HINT_OVERUSE_THRESHOLD {
        frustration.push(0.6);
    }
    out.frustration_probability = mean(&frustration);

    let mut confusion = vec![1.0 - out.consistency_score];
    if out.inferred_cognitive_load > 0.7 {
        confusion.push(0.8);
    }
    if out.inactivity_duration > 10.0 {
        confusion.push(0.5);
    }
    out.confusion_probability = mean(&confusion);

    let mut boredom = Vec::new();
    if !times.is_empty() && mean(&times) < RESPONSE_TIME_MIN {
        boredom.push(0.9);
    }
    if accuracy == 1.0 {
        boredom.push(0.7);
    }
    if out.hint_usage_count == 0 && accuracy > 0.8 {
        boredom.push(0.6);
    }
    if out.inactivity_duration == 0.0 {
        boredom.push(0.4);
    }
    out.boredom_probability = mean(&boredom);

    out.is_valid = true;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(correct: bool, time: f64, hints: u32, ts_ms: i64) -> ResponseSample {
        ResponseSample {
            is_correct: correct,
            response_time_seconds: time,
            hints_used: hints,
            timestamp_ms: ts_ms,
        }
    }

    fn uniform_window(correct: bool, time: f64, hints: u32, gap_ms: i64, n: usize) -> Vec<ResponseSample> {
        (0..n)
            .map(|i| sample(correct, time, hints, 1_000_000 + gap_ms * i as i64))
            .collect()
    }

    #[test]
    fn single_response_is_invalid() {
        let out = extract(&[sample(true, 5.0, 0, 0)]);
        assert!(!out.is_valid);
        assert_eq!(out.window_size, 0);
    }

    #[test]
    fn identical_times_have_zero_deviation() {
        let out = extract(&uniform_window(true, 5.0, 0, 5_000, 5));
        assert!(out.is_valid);
        assert_eq!(out.response_time_deviation, 0.0);
        assert!((out.inactivity_duration - 20.0).abs() < 1e-9);
    }

    #[test]
    fn all_correct_consistency_uses_run_pattern() {
        // 5 correct: polarization = 0, runs = 1 of max 3, run component = 2/3.
        let out = extract(&uniform_window(true, 5.0, 0, 5_000, 5));
        assert!((out.consistency_score - (0.0 + 2.0 / 3.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn alternating_correctness_floors_run_component() {
        let responses: Vec<ResponseSample> = (0..5)
            .map(|i| sample(i % 2 == 0, 5.0, 0, 1_000_000 + 5_000 * i as i64))
            .collect();
        // 5 runs over max 3 would go negative; component floors at 0.
        let out = extract(&responses);
        let polarization = 1.0 - (0.6_f64 - 0.5).abs() * 2.0;
        assert!((out.consistency_score - polarization / 2.0).abs() < 1e-9);
    }

    #[test]
    fn rapid_wrong_answers_read_as_guessing() {
        let mut responses = uniform_window(false, 0.5, 0, 2_000, 4);
        responses.push(sample(true, 0.5, 0, 1_008_000));
        let out = extract(&responses);
        assert!((out.rapid_guessing_probability - 0.8).abs() < 1e-9);
    }

    #[test]
    fn declining_accuracy_produces_negative_trend() {
        let responses = vec![
            sample(true, 10.0, 0, 1_000_000),
            sample(true, 10.0, 0, 1_010_000),
            sample(false, 10.0, 0, 1_020_000),
            sample(false, 10.0, 0, 1_030_000),
        ];
        let out = extract(&responses);
        assert!((out.accuracy_trend - (-1.0)).abs() < 1e-9);
        // Trend below -0.2 adds the 0.8 frustration signal.
        assert!((out.frustration_probability - (0.5 + 0.8) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn struggling_window_loads_up_all_channels() {
        // 5 wrong at 20s each with hints on every response.
        let out = extract(&uniform_window(false, 20.0, 3, 20_000, 5));
        assert_eq!(out.hint_usage_count, 5);
        let expected_load = (1.0 + (20.0 - 5.0) / 25.0 + 1.0) / 3.0;
        assert!((out.inferred_cognitive_load - expected_load).abs() < 1e-9);
        // Signals: accuracy 1.0, inactivity 80s -> 0.7, hints > 3 -> 0.6.
        assert!((out.frustration_probability - (1.0 + 0.7 + 0.6) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn fast_perfect_window_is_bored() {
        let out = extract(&uniform_window(true, 0.8, 0, 1_000, 5));
        // Signals: avg < 1s -> 0.9, perfect -> 0.7, no hints & high acc -> 0.6.
        assert!((out.boredom_probability - (0.9 + 0.7 + 0.6) / 3.0).abs() < 1e-9);
        assert_eq!(out.rapid_guessing_probability, 0.0);
    }
}
