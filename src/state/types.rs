//! Game state and classification rule types

use serde::{Deserialize, Serialize};

use crate::frame::Rect;
use crate::matching::TemplateCategory;

/// Recognizable game phases.
///
/// `Unknown` is the fall-through outcome when no anchor set matches; it is
/// never produced by a confident match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Loading,
    BattleCommand,
    BattleResult,
    Menu,
    Unknown,
}

impl GameState {
    pub fn is_known(self) -> bool {
        self != GameState::Unknown
    }
}

/// One anchor template a state must exhibit.
///
/// The category fixes the confidence bar; an optional region restricts the
/// search to where the anchor is known to render.
#[derive(Debug, Clone)]
pub struct AnchorSpec {
    pub template_id: String,
    pub category: TemplateCategory,
    pub roi: Option<Rect>,
}

impl AnchorSpec {
    pub fn new(template_id: impl Into<String>, category: TemplateCategory) -> Self {
        Self {
            template_id: template_id.into(),
            category,
            roi: None,
        }
    }

    pub fn with_roi(mut self, roi: Rect) -> Self {
        self.roi = Some(roi);
        self
    }
}

/// A candidate state and the anchors that identify it.
///
/// Profiles are evaluated in the order the classifier receives them;
/// earlier profiles win ambiguous frames, so result screens belong before
/// command screens.
#[derive(Debug, Clone)]
pub struct StateProfile {
    pub state: GameState,
    pub anchors: Vec<AnchorSpec>,
}

impl StateProfile {
    pub fn new(state: GameState) -> Self {
        Self {
            state,
            anchors: Vec::new(),
        }
    }

    pub fn with_anchor(mut self, anchor: AnchorSpec) -> Self {
        self.anchors.push(anchor);
        self
    }
}
