use serde::{Deserialize, Serialize};

/// Discrete difficulty band over the continuous [0, 1] scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum DifficultyBand {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl DifficultyBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            _ => Self::Medium,
        }
    }

    /// Band classification with half-open boundaries; 0.35 and 0.65
    /// belong to the higher band.
    pub fn from_value(value: f64) -> Self {
        if value < 0.35 {
            Self::Easy
        } else if value < 0.65 {
            Self::Medium
        } else {
            Self::Hard
        }
    }

    /// Inclusive pool range for question lookup within this band.
    /// Neighbouring ranges deliberately overlap so near-boundary
    /// targets draw from both sides.
    pub fn pool_range(&self) -> (f64, f64) {
        match self {
            Self::Easy => (0.1, 0.4),
            Self::Medium => (0.35, 0.65),
            Self::Hard => (0.6, 0.95),
        }
    }

    pub fn easier(&self) -> Self {
        match self {
            Self::Hard => Self::Medium,
            _ => Self::Easy,
        }
    }

    pub fn harder(&self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            _ => Self::Hard,
        }
    }
}

/// Half-width of the fallback window around the continuous target,
/// used when the label band's pool range yields no candidates.
pub const TARGET_TOLERANCE: f64 = 0.1;

/// Inclusive [lo, hi] window around a continuous target difficulty,
/// clamped to the [0, 1] scale.
pub fn target_window(value: f64) -> (f64, f64) {
    (
        (value - TARGET_TOLERANCE).max(0.0),
        (value + TARGET_TOLERANCE).min(1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_fall_into_higher_band() {
        assert_eq!(DifficultyBand::from_value(0.0), DifficultyBand::Easy);
        assert_eq!(DifficultyBand::from_value(0.349), DifficultyBand::Easy);
        assert_eq!(DifficultyBand::from_value(0.35), DifficultyBand::Medium);
        assert_eq!(DifficultyBand::from_value(0.649), DifficultyBand::Medium);
        assert_eq!(DifficultyBand::from_value(0.65), DifficultyBand::Hard);
        assert_eq!(DifficultyBand::from_value(1.0), DifficultyBand::Hard);
    }

    #[test]
    fn pool_ranges_overlap_at_band_edges() {
        let (_, easy_hi) = DifficultyBand::Easy.pool_range();
        let (med_lo, med_hi) = DifficultyBand::Medium.pool_range();
        let (hard_lo, _) = DifficultyBand::Hard.pool_range();
        assert!(easy_hi > med_lo);
        assert!(med_hi > hard_lo);
    }

    #[test]
    fn stepping_saturates() {
        assert_eq!(DifficultyBand::Easy.easier(), DifficultyBand::Easy);
        assert_eq!(DifficultyBand::Hard.harder(), DifficultyBand::Hard);
        assert_eq!(DifficultyBand::Medium.harder(), DifficultyBand::Hard);
    }

    #[test]
    fn target_window_is_symmetric() {
        let (lo, hi) = target_window(0.5);
        assert!((lo - 0.4).abs() < 1e-12);
        assert!((hi - 0.6).abs() < 1e-12);
    }

    #[test]
    fn target_window_clamps_to_the_scale() {
        let (lo, _) = target_window(0.05);
        assert_eq!(lo, 0.0);
        let (_, hi) = target_window(0.97);
        assert_eq!(hi, 1.0);
    }
}
