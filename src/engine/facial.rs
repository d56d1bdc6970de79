//! Optional facial-channel modifier.
//!
//! Emotion payloads nudge the policy delta and the fused engagement
//! score but never override the behavioral channels: the weights are
//! small enough that a facial signal alone cannot flip the sign of a
//! delta or move the score across a band on its own.

use super::config::FacialParams;
use super::types::FacialMetrics;

const KNOWN_EMOTIONS: [(&str, f64); 10] = [
    ("happy", 0.95),
    ("excited", 1.0),
    ("confident", 0.85),
    ("neutral", 0.60),
    ("confused", 0.40),
    ("frustrated", 0.20),
    ("bored", 0.15),
    ("anxious", 0.30),
    ("sad", 0.25),
    ("angry", 0.10),
];

fn emotion_baseline(emotion: &str) -> Option<f64> {
    KNOWN_EMOTIONS
        .iter()
        .find(|(name, _)| *name == emotion)
        .map(|(_, v)| *v)
}

fn gaze_adjustment(gaze: &str) -> f64 {
    match gaze {
        "focused" => 0.2,
        "reading" => 0.1,
        "scattered" => -0.3,
        "downward" => -0.5,
        "away" => -0.7,
        _ => 0.0,
    }
}

fn posture_adjustment(posture: &str) -> f64 {
    match posture {
        "upright_engaged" => 0.15,
        "leaning_forward" => 0.25,
        "relaxed" => 0.0,
        "slumped" => -0.25,
        "tense" => -0.2,
        _ => 0.0,
    }
}

/// Why a facial payload was ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FacialRejection {
    #[error("facial integration disabled")]
    Disabled,
    #[error("invalid or missing emotion label: {0}")]
    UnknownEmotion(String),
    #[error("emotion confidence below minimum")]
    LowConfidence,
}

/// Validate a payload and derive the engagement signal in [0, 1].
///
/// The emotion baseline is nudged by at most 0.1 from gaze and 0.1 from
/// posture, clamping after each step.
pub fn engagement_signal(
    metrics: &FacialMetrics,
    params: &FacialParams,
) -> Result<f64, FacialRejection> {
    if !params.enabled {
        return Err(FacialRejection::Disabled);
    }
    let Some(baseline) = emotion_baseline(&metrics.emotion) else {
        return Err(FacialRejection::UnknownEmotion(metrics.emotion.clone()));
    };
    if !(0.0..=1.0).contains(&metrics.confidence) || metrics.confidence < params.min_confidence {
        return Err(FacialRejection::LowConfidence);
    }

    let mut signal = baseline;
    if let Some(gaze) = &metrics.gaze_direction {
        let adj = gaze_adjustment(gaze);
        if adj != 0.0 {
            signal = (signal + adj * 0.1).clamp(0.0, 1.0);
        }
    }
    if let Some(posture) = &metrics.posture_state {
        let adj = posture_adjustment(posture);
        if adj != 0.0 {
            signal = (signal + adj * 0.1).clamp(0.0, 1.0);
        }
    }

    Ok(signal.clamp(0.0, 1.0))
}

/// Scale the policy delta toward or away from zero by the facial
/// signal, bounded to the configured maximum magnitude.
pub fn modify_delta(base_delta: f64, signal: f64, params: &FacialParams) -> f64 {
    let modifier = (signal - 0.5) * 2.0;
    let adjusted = base_delta + base_delta * modifier * params.delta_weight;
    adjusted.clamp(-params.max_modified_delta, params.max_modified_delta)
}

/// Blend the facial signal into the fused engagement score.
pub fn modify_engagement(base_score: f64, signal: f64, params: &FacialParams) -> f64 {
    ((1.0 - params.engagement_weight) * base_score + params.engagement_weight * signal)
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_params() -> FacialParams {
        FacialParams {
            enabled: true,
            ..FacialParams::default()
        }
    }

    fn metrics(emotion: &str, confidence: f64) -> FacialMetrics {
        FacialMetrics {
            emotion: emotion.to_string(),
            confidence,
            gaze_direction: None,
            posture_state: None,
        }
    }

    #[test]
    fn disabled_channel_rejects_everything() {
        let err = engagement_signal(&metrics("happy", 0.9), &FacialParams::default());
        assert_eq!(err, Err(FacialRejection::Disabled));
    }

    #[test]
    fn low_confidence_is_rejected() {
        let p = enabled_params();
        assert_eq!(
            engagement_signal(&metrics("happy", 0.59), &p),
            Err(FacialRejection::LowConfidence)
        );
        assert!(engagement_signal(&metrics("happy", 0.6), &p).is_ok());
    }

    #[test]
    fn unknown_emotion_is_rejected() {
        let p = enabled_params();
        assert!(matches!(
            engagement_signal(&metrics("smug", 0.9), &p),
            Err(FacialRejection::UnknownEmotion(_))
        ));
    }

    #[test]
    fn gaze_and_posture_nudge_the_baseline() {
        let p = enabled_params();
        let mut m = metrics("neutral", 0.9);
        m.gaze_direction = Some("focused".to_string());
        m.posture_state = Some("leaning_forward".to_string());
        let signal = engagement_signal(&m, &p).unwrap();
        assert!((signal - (0.60 + 0.02 + 0.025)).abs() < 1e-9);

        let mut m = metrics("excited", 0.9);
        m.gaze_direction = Some("away".to_string());
        let signal = engagement_signal(&m, &p).unwrap();
        assert!((signal - 0.93).abs() < 1e-9);
    }

    #[test]
    fn delta_modifier_cannot_flip_sign() {
        let p = enabled_params();
        // Fully disengaged face shrinks a positive delta by 10%.
        let modified = modify_delta(0.10, 0.0, &p);
        assert!((modified - 0.09).abs() < 1e-9);
        assert!(modified > 0.0);
        // Fully engaged face grows it by 10%, inside the cap.
        let modified = modify_delta(0.10, 1.0, &p);
        assert!((modified - 0.11).abs() < 1e-9);
        // Neutral signal is the identity.
        assert!((modify_delta(-0.05, 0.5, &p) + 0.05).abs() < 1e-12);
    }

    #[test]
    fn delta_modifier_respects_magnitude_cap() {
        let p = enabled_params();
        assert!((modify_delta(0.20, 1.0, &p) - 0.15).abs() < 1e-9);
        assert!((modify_delta(-0.20, 0.0, &p) + 0.15).abs() < 1e-9);
    }

    #[test]
    fn engagement_blend_uses_fixed_weight() {
        let p = enabled_params();
        let blended = modify_engagement(0.8, 0.2, &p);
        assert!((blended - (0.85 * 0.8 + 0.15 * 0.2)).abs() < 1e-9);
    }
}
