//! Rule-based game state classification
//!
//! A greedy first-match-wins pass over a priority-ordered list of state
//! profiles. Every anchor of a profile must clear its category's confidence
//! bar for the profile to win; any anchor failure, including a missing or
//! undecodable template, simply counts as "did not match" so a noisy frame
//! degrades to a later profile or `Unknown` instead of aborting the loop.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::types::{AnchorSpec, GameState, StateProfile};
use crate::assets::TemplateSource;
use crate::cache::TemplateCache;
use crate::frame::Frame;
use crate::matching::{MatchOptions, MatchResult, Matcher};

/// Classification outcome with per-anchor diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub state: GameState,
    /// Matches for the winning profile's anchors; empty for `Unknown`.
    pub anchor_matches: Vec<MatchResult>,
    pub elapsed_ms: f64,
}

/// Classifies captured frames against a library of per-state anchor sets.
pub struct StateClassifier<S: TemplateSource> {
    profiles: Vec<StateProfile>,
    cache: Arc<TemplateCache>,
    source: S,
    base: MatchOptions,
}

impl<S: TemplateSource> StateClassifier<S> {
    /// Build a classifier over `profiles`, evaluated in the given priority
    /// order.
    pub fn new(profiles: Vec<StateProfile>, cache: Arc<TemplateCache>, source: S) -> Self {
        Self {
            profiles,
            cache,
            source,
            base: MatchOptions::default(),
        }
    }

    /// Override the base matching options; per-anchor threshold and region
    /// still come from each [`AnchorSpec`].
    pub fn with_base_options(mut self, options: MatchOptions) -> Self {
        self.base = options;
        self
    }

    pub fn profiles(&self) -> &[StateProfile] {
        &self.profiles
    }

    /// Determine the current game state for a captured frame.
    pub fn classify(&self, frame: &Frame) -> GameState {
        self.classify_detailed(frame).state
    }

    /// Like [`StateClassifier::classify`], with the winning anchor matches
    /// and total duration attached.
    pub fn classify_detailed(&self, frame: &Frame) -> Classification {
        let start = Instant::now();
        for profile in &self.profiles {
            if profile.anchors.is_empty() || profile.state == GameState::Unknown {
                continue;
            }
            let mut anchor_matches = Vec::with_capacity(profile.anchors.len());
            let mut all_matched = true;
            for anchor in &profile.anchors {
                match self.match_anchor(frame, anchor) {
                    Some(result) if result.found => anchor_matches.push(result),
                    _ => {
                        all_matched = false;
                        break;
                    }
                }
            }
            if all_matched {
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                log::debug!(
                    "🎮 classified frame as {:?} ({} anchors, {elapsed_ms:.1}ms)",
                    profile.state,
                    anchor_matches.len()
                );
                return Classification {
                    state: profile.state,
                    anchor_matches,
                    elapsed_ms,
                };
            }
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::debug!("no state profile matched, frame is Unknown ({elapsed_ms:.1}ms)");
        Classification {
            state: GameState::Unknown,
            anchor_matches: Vec::new(),
            elapsed_ms,
        }
    }

    fn match_anchor(&self, frame: &Frame, anchor: &AnchorSpec) -> Option<MatchResult> {
        let template = match self.cache.get_or_load(&anchor.template_id, &self.source) {
            Ok(template) => template,
            Err(err) => {
                log::warn!("anchor '{}' unavailable: {err}", anchor.template_id);
                return None;
            }
        };

        let mut options = self.base.clone();
        options.threshold = anchor.category.min_confidence();
        options.roi = anchor.roi;

        match Matcher::new(options).match_single(frame, &template) {
            Ok(result) => Some(result),
            Err(err) => {
                log::debug!(
                    "anchor '{}' skipped on this frame: {err}",
                    anchor.template_id
                );
                None
            }
        }
    }
}
