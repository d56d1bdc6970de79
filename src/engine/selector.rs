//! Question selection with staged difficulty fallback.
//!
//! Stage 1 draws from questions within the label band's pool range
//! around the continuous target; stage 2 falls back to the tight
//! tolerance window, which can reach past the label boundaries; stage 3
//! accepts any unanswered question in the subject. Within a stage the
//! pick is uniform random.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::difficulty::{target_window, DifficultyBand};

/// Minimal view of a question the selector needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuestion {
    pub id: String,
    pub difficulty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStage {
    PoolRange,
    TargetWindow,
    AnyInSubject,
}

impl SelectionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PoolRange => "pool_range",
            Self::TargetWindow => "target_window",
            Self::AnyInSubject => "any_in_subject",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Chosen { id: String, stage: SelectionStage },
    Exhausted,
}

/// Pick the next question for a target difficulty from the unanswered
/// candidates. `Exhausted` means the subject pool is spent and the
/// session should complete.
pub fn select<R: Rng>(
    candidates: &[CandidateQuestion],
    target_difficulty: f64,
    rng: &mut R,
) -> Selection {
    if candidates.is_empty() {
        return Selection::Exhausted;
    }

    let (pool_lo, pool_hi) = DifficultyBand::from_value(target_difficulty).pool_range();
    let primary: Vec<&CandidateQuestion> = candidates
        .iter()
        .filter(|q| q.difficulty >= pool_lo && q.difficulty <= pool_hi)
        .collect();
    if !primary.is_empty() {
        let pick = primary[rng.random_range(0..primary.len())];
        return Selection::Chosen {
            id: pick.id.clone(),
            stage: SelectionStage::PoolRange,
        };
    }

    let (lo, hi) = target_window(target_difficulty);
    let fallback: Vec<&CandidateQuestion> = candidates
        .iter()
        .filter(|q| q.difficulty >= lo && q.difficulty <= hi)
        .collect();
    if !fallback.is_empty() {
        let pick = fallback[rng.random_range(0..fallback.len())];
        return Selection::Chosen {
            id: pick.id.clone(),
            stage: SelectionStage::TargetWindow,
        };
    }

    let pick = &candidates[rng.random_range(0..candidates.len())];
    Selection::Chosen {
        id: pick.id.clone(),
        stage: SelectionStage::AnyInSubject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, difficulty: f64) -> CandidateQuestion {
        CandidateQuestion {
            id: id.to_string(),
            difficulty,
        }
    }

    #[test]
    fn empty_pool_is_exhausted() {
        let mut rng = rand::rng();
        assert_eq!(select(&[], 0.5, &mut rng), Selection::Exhausted);
    }

    #[test]
    fn primary_stage_spans_the_whole_label_range() {
        // Target 0.5: pool range is the medium band [0.35, 0.65], so
        // a candidate well outside the 0.1 tolerance still belongs to
        // the primary pool and must surface eventually.
        let mut rng = rand::rng();
        let pool = vec![candidate("near", 0.45), candidate("edge", 0.38)];
        let mut seen_near = false;
        let mut seen_edge = false;
        for _ in 0..1000 {
            match select(&pool, 0.5, &mut rng) {
                Selection::Chosen { id, stage } => {
                    assert_eq!(stage, SelectionStage::PoolRange);
                    match id.as_str() {
                        "near" => seen_near = true,
                        "edge" => seen_edge = true,
                        _ => unreachable!(),
                    }
                }
                Selection::Exhausted => panic!("pool not empty"),
            }
            if seen_near && seen_edge {
                break;
            }
        }
        assert!(seen_near && seen_edge);
    }

    #[test]
    fn falls_back_to_target_window() {
        // Target 0.36: pool range [0.35, 0.65] misses both candidates,
        // but the tolerance window [0.26, 0.46] reaches below the band
        // boundary and catches 0.30.
        let mut rng = rand::rng();
        let pool = vec![candidate("below_band", 0.30), candidate("far", 0.95)];
        match select(&pool, 0.36, &mut rng) {
            Selection::Chosen { id, stage } => {
                assert_eq!(id, "below_band");
                assert_eq!(stage, SelectionStage::TargetWindow);
            }
            Selection::Exhausted => panic!("pool not empty"),
        }
    }

    #[test]
    fn last_resort_takes_anything_in_subject() {
        let mut rng = rand::rng();
        let pool = vec![candidate("only", 0.95)];
        match select(&pool, 0.2, &mut rng) {
            Selection::Chosen { id, stage } => {
                assert_eq!(id, "only");
                assert_eq!(stage, SelectionStage::AnyInSubject);
            }
            Selection::Exhausted => panic!("pool not empty"),
        }
    }

    #[test]
    fn selection_is_uniform_over_the_primary_pool() {
        let mut rng = rand::rng();
        let pool = vec![candidate("a", 0.48), candidate("b", 0.52)];
        let mut seen_a = false;
        let mut seen_b = false;
        for _ in 0..200 {
            if let Selection::Chosen { id, .. } = select(&pool, 0.5, &mut rng) {
                match id.as_str() {
                    "a" => seen_a = true,
                    "b" => seen_b = true,
                    _ => unreachable!(),
                }
            }
            if seen_a && seen_b {
                break;
            }
        }
        assert!(seen_a && seen_b);
    }
}
