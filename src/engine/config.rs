use serde::{Deserialize, Serialize};

/// Thresholds used by indicator extraction and level banding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementThresholds {
    pub response_time_slow: f64,
    pub response_time_fast: f64,
    pub inactivity_timeout: f64,
    pub low_engagement: f64,
    pub high_engagement: f64,
}

impl Default for EngagementThresholds {
    fn default() -> Self {
        Self {
            response_time_slow: 30.0,
            response_time_fast: 5.0,
            inactivity_timeout: 60.0,
            low_engagement: 0.3,
            high_engagement: 0.7,
        }
    }
}

/// Difficulty-adjustment parameters shared by both cadences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationParams {
    pub min_difficulty: f64,
    pub max_difficulty: f64,
    pub large_step: f64,
    pub small_step: f64,
    pub tiny_step: f64,
    pub hint_threshold: f64,
    pub oscillation_window: usize,
    pub oscillation_damping: f64,
    pub momentum_boost: f64,
    pub decline_momentum: f64,
}

impl Default for AdaptationParams {
    fn default() -> Self {
        Self {
            min_difficulty: 0.1,
            max_difficulty: 0.9,
            large_step: 0.10,
            small_step: 0.05,
            tiny_step: 0.025,
            hint_threshold: 0.5,
            oscillation_window: 3,
            oscillation_damping: 0.5,
            momentum_boost: 1.1,
            decline_momentum: 1.05,
        }
    }
}

/// Fusion weights over the three modality channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionWeights {
    pub behavioral: f64,
    pub cognitive: f64,
    pub affective: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            behavioral: 0.4,
            cognitive: 0.4,
            affective: 0.2,
        }
    }
}

/// Parameters for the optional facial channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacialParams {
    pub enabled: bool,
    pub min_confidence: f64,
    pub delta_weight: f64,
    pub engagement_weight: f64,
    pub max_modified_delta: f64,
}

impl Default for FacialParams {
    fn default() -> Self {
        Self {
            enabled: false,
            min_confidence: 0.6,
            delta_weight: 0.10,
            engagement_weight: 0.15,
            max_modified_delta: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub engagement: EngagementThresholds,
    pub adaptation: AdaptationParams,
    pub fusion: FusionWeights,
    pub facial: FacialParams,
    pub window_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engagement: EngagementThresholds::default(),
            adaptation: AdaptationParams::default(),
            fusion: FusionWeights::default(),
            facial: FacialParams::default(),
            window_size: 5,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ADAPT_MIN_DIFFICULTY") {
            if let Ok(v) = val.parse::<f64>() {
                config.adaptation.min_difficulty = v.clamp(0.0, 1.0);
            }
        }
        if let Ok(val) = std::env::var("ADAPT_MAX_DIFFICULTY") {
            if let Ok(v) = val.parse::<f64>() {
                config.adaptation.max_difficulty = v.clamp(0.0, 1.0);
            }
        }
        if let Ok(val) = std::env::var("ENGAGE_WINDOW_SIZE") {
            if let Ok(v) = val.parse::<usize>() {
                if v >= 2 {
                    config.window_size = v;
                }
            }
        }
        if let Ok(val) = std::env::var("FACIAL_ENABLED") {
            config.facial.enabled = val.parse().unwrap_or(false);
        }
        if config.adaptation.max_difficulty < config.adaptation.min_difficulty {
            std::mem::swap(
                &mut config.adaptation.min_difficulty,
                &mut config.adaptation.max_difficulty,
            );
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_are_inside_unit_interval() {
        let c = EngineConfig::default();
        assert_eq!(c.adaptation.min_difficulty, 0.1);
        assert_eq!(c.adaptation.max_difficulty, 0.9);
        assert_eq!(c.window_size, 5);
    }

    #[test]
    fn fusion_weights_sum_to_one() {
        let w = FusionWeights::default();
        assert!((w.behavioral + w.cognitive + w.affective - 1.0).abs() < 1e-12);
    }
}
