//! Fixed-size performance windows over the response stream.
//!
//! A window holds up to `window_size` responses. When it fills, a
//! performance score is computed and the window rolls over; partial
//! windows only ever report interim metrics.

use serde::{Deserialize, Serialize};

use super::types::{ResponseSample, TrendLabel};

/// Qualitative label for a window performance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceFeedback {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl PerformanceFeedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::VeryPoor => "very_poor",
        }
    }

    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            Self::Excellent
        } else if score >= 0.70 {
            Self::Good
        } else if score >= 0.50 {
            Self::Fair
        } else if score >= 0.30 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }
}

/// Raw counters for one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub accuracy: f64,
    pub avg_response_time: f64,
    pub hints_used: u32,
    pub window_number: usize,
    pub is_complete: bool,
}

/// Weighted performance score with its component breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowScore {
    pub score: f64,
    pub accuracy_component: f64,
    pub time_component: f64,
    pub hint_component: f64,
    pub feedback: PerformanceFeedback,
    pub metrics: WindowMetrics,
}

const ACCURACY_WEIGHT: f64 = 0.60;
const TIME_WEIGHT: f64 = 0.25;
const HINT_WEIGHT: f64 = 0.15;

fn time_component(avg_time: f64) -> f64 {
    if avg_time <= 15.0 {
        1.0
    } else if avg_time <= 30.0 {
        0.7
    } else if avg_time <= 60.0 {
        0.4
    } else {
        0.1
    }
}

fn hint_component(hints: u32) -> f64 {
    match hints {
        0 => 1.0,
        1..=2 => 0.9,
        3..=5 => 0.7,
        6..=10 => 0.4,
        _ => 0.1,
    }
}

/// Rollup over the completed windows of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowHistoryStats {
    pub windows_completed: usize,
    pub mean_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
    pub trend: TrendLabel,
}

/// Tracks the rolling window for one session and the scores of every
/// window completed so far.
#[derive(Debug, Clone)]
pub struct WindowTracker {
    window_size: usize,
    current: Vec<ResponseSample>,
    window_number: usize,
    completed: Vec<WindowScore>,
}

impl WindowTracker {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            current: Vec::with_capacity(window_size),
            window_number: 0,
            completed: Vec::new(),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn window_number(&self) -> usize {
        self.window_number
    }

    pub fn responses_in_window(&self) -> usize {
        self.current.len()
    }

    pub fn completed_windows(&self) -> &[WindowScore] {
        &self.completed
    }

    /// Add one response. Returns the window score when this response
    /// completes a window, after which the tracker rolls over.
    pub fn add_response(&mut self, sample: ResponseSample) -> Option<WindowScore> {
        self.current.push(sample);
        if self.current.len() < self.window_size {
            return None;
        }
        let score = self.score_current();
        self.completed.push(score.clone());
        self.current.clear();
        self.window_number += 1;
        Some(score)
    }

    pub fn current_metrics(&self) -> WindowMetrics {
        if self.current.is_empty() {
            return WindowMetrics {
                correct_count: 0,
                incorrect_count: 0,
                accuracy: 0.0,
                avg_response_time: 0.0,
                hints_used: 0,
                window_number: self.window_number,
                is_complete: false,
            };
        }

        let correct = self.current.iter().filter(|r| r.is_correct).count();
        let times: Vec<f64> = self
            .current
            .iter()
            .map(|r| r.response_time_seconds)
            .filter(|t| *t > 0.0)
            .collect();
        let avg_time = if times.is_empty() {
            0.0
        } else {
            times.iter().sum::<f64>() / times.len() as f64
        };

        WindowMetrics {
            correct_count: correct,
            incorrect_count: self.current.len() - correct,
            accuracy: correct as f64 / self.current.len() as f64,
            avg_response_time: avg_time,
            hints_used: self.current.iter().map(|r| r.hints_used).sum(),
            window_number: self.window_number,
            is_complete: self.current.len() >= self.window_size,
        }
    }

    fn score_current(&self) -> WindowScore {
        let metrics = self.current_metrics();
        let accuracy_component = metrics.accuracy;
        let time_component = time_component(metrics.avg_response_time);
        let hint_component = hint_component(metrics.hints_used);

        let score = accuracy_component * ACCURACY_WEIGHT
            + time_component * TIME_WEIGHT
            + hint_component * HINT_WEIGHT;

        WindowScore {
            score,
            accuracy_component,
            time_component,
            hint_component,
            feedback: PerformanceFeedback::from_score(score),
            metrics,
        }
    }

    /// Mean, best, and worst over completed windows plus the trend
    /// label. `None` until the first window completes.
    pub fn history_stats(&self) -> Option<WindowHistoryStats> {
        if self.completed.is_empty() {
            return None;
        }
        let scores: Vec<f64> = self.completed.iter().map(|w| w.score).collect();
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        Some(WindowHistoryStats {
            windows_completed: scores.len(),
            mean_score: mean,
            best_score: scores.iter().copied().fold(f64::MIN, f64::max),
            worst_score: scores.iter().copied().fold(f64::MAX, f64::min),
            trend: self.overall_trend(),
        })
    }

    /// Aggregate trend over completed windows: mean of the last two
    /// scores against the mean of everything before them, with a 0.1
    /// dead band.
    pub fn overall_trend(&self) -> TrendLabel {
        let scores: Vec<f64> = self.completed.iter().map(|w| w.score).collect();
        if scores.len() < 2 {
            return TrendLabel::None;
        }
        let recent = (scores[scores.len() - 2] + scores[scores.len() - 1]) / 2.0;
        let older = if scores.len() > 2 {
            scores[..scores.len() - 2].iter().sum::<f64>() / (scores.len() - 2) as f64
        } else {
            scores[0]
        };
        if recent > older + 0.1 {
            TrendLabel::Improving
        } else if recent < older - 0.1 {
            TrendLabel::Declining
        } else {
            TrendLabel::Stable
        }
    }
}
