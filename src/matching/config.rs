//! Configuration for matching operations

use serde::{Deserialize, Serialize};

use super::template::TemplateCategory;
use super::types::MatchMethod;
use crate::frame::Rect;

/// Caller-supplied knobs for a matching operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Confidence threshold a placement must reach, `0.0` to `1.0`.
    pub threshold: f32,
    /// Similarity metric.
    pub method: MatchMethod,
    /// Inclusive template scale range for multi-scale search.
    pub scale_range: (f32, f32),
    /// Step between successive scale factors.
    pub scale_step: f32,
    /// Maximum number of results returned by an exhaustive search.
    pub max_matches: usize,
    /// Optional search region; clipped to the source frame.
    pub roi: Option<Rect>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            method: MatchMethod::CcoeffNormed,
            scale_range: (0.8, 1.2),
            scale_step: 0.1,
            max_matches: 1,
            roi: None,
        }
    }
}

impl MatchOptions {
    /// Preset with the confidence bar of a semantic category.
    pub fn for_category(category: TemplateCategory) -> Self {
        Self {
            threshold: category.min_confidence(),
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_method(mut self, method: MatchMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_roi(mut self, roi: Rect) -> Self {
        self.roi = Some(roi);
        self
    }

    pub fn with_max_matches(mut self, max_matches: usize) -> Self {
        self.max_matches = max_matches;
        self
    }

    pub(crate) fn validate(&self) -> crate::error::VisionResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(crate::error::VisionError::InvalidOptions {
                description: format!("threshold {} is outside 0.0..=1.0", self.threshold),
            });
        }
        let (min, max) = self.scale_range;
        if !(min > 0.0 && max >= min && self.scale_step > 0.0) {
            return Err(crate::error::VisionError::InvalidOptions {
                description: format!(
                    "scale range {min}..={max} with step {} is not ascending and positive",
                    self.scale_step
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = MatchOptions::default();
        assert_eq!(options.threshold, 0.8);
        assert_eq!(options.method, MatchMethod::CcoeffNormed);
        assert_eq!(options.scale_range, (0.8, 1.2));
        assert_eq!(options.max_matches, 1);
        assert!(options.roi.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_for_category_uses_category_threshold() {
        let options = MatchOptions::for_category(TemplateCategory::CriticalElement);
        assert_eq!(options.threshold, 0.85);
    }

    #[test]
    fn test_validate_rejects_bad_threshold_and_scales() {
        assert!(
            MatchOptions::default()
                .with_threshold(1.5)
                .validate()
                .is_err()
        );

        let mut options = MatchOptions::default();
        options.scale_step = 0.0;
        assert!(options.validate().is_err());

        let mut options = MatchOptions::default();
        options.scale_range = (1.2, 0.8);
        assert!(options.validate().is_err());
    }
}
