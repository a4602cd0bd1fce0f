//! Result and control types for the matching engine

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::frame::Rect;

/// Similarity metric used to score a template placement.
///
/// All methods report a normalized confidence in `[0, 1]` where higher is
/// better; the squared-difference metric is inverted internally so callers
/// never deal with "lower is better" scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMethod {
    /// Normalized cross-correlation.
    CcorrNormed,
    /// Zero-mean normalized correlation coefficient.
    CcoeffNormed,
    /// Normalized sum of squared differences, reported as `1 - score`.
    SqdiffNormed,
}

impl MatchMethod {
    /// True for metrics whose raw extremum is a minimum.
    pub fn is_distance(self) -> bool {
        matches!(self, MatchMethod::SqdiffNormed)
    }
}

/// Outcome of a single template search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Whether the best placement reached the confidence threshold.
    pub found: bool,
    /// Confidence of the best placement, `[0, 1]`, higher is better.
    pub confidence: f32,
    /// Bounding box of the best placement in source-image coordinates.
    pub region: Rect,
    /// Template scale factor this result was produced at.
    pub scale: f32,
    /// Metric that produced the confidence.
    pub method: MatchMethod,
    /// Wall-clock duration of the search in milliseconds.
    pub elapsed_ms: f64,
}

impl MatchResult {
    pub(crate) fn not_found(method: MatchMethod, elapsed_ms: f64) -> Self {
        Self {
            found: false,
            confidence: 0.0,
            region: Rect::default(),
            scale: 1.0,
            method,
            elapsed_ms,
        }
    }

    /// Center of the matched region, e.g. where a tap should land.
    pub fn tap_point(&self) -> (u32, u32) {
        self.region.center()
    }
}

/// Outcome of a multi-scale template search.
#[derive(Debug, Clone, Serialize)]
pub struct MultiScaleResult {
    /// Every scale that reached the threshold, in ascending scale order.
    pub matches: Vec<MatchResult>,
    /// Highest-confidence qualifying result; on exact ties the lowest scale
    /// wins.
    pub best: Option<MatchResult>,
    /// Wall-clock duration of the whole sweep in milliseconds.
    pub total_ms: f64,
}

impl MultiScaleResult {
    pub fn found(&self) -> bool {
        self.best.is_some()
    }
}

/// Cooperative cancellation flag for long-running searches.
///
/// Cloning shares the flag. The engine checks it between scan rows and
/// between scale iterations, so cancelling a stale request abandons the rest
/// of the sweep without locking.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
