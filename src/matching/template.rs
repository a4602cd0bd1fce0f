//! Templates and their confidence categories

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

use crate::error::{VisionError, VisionResult};
use crate::frame::Frame;

/// Smallest accepted template edge, in pixels.
pub const MIN_TEMPLATE_DIM: u32 = 20;
/// Largest accepted template edge, in pixels.
pub const MAX_TEMPLATE_DIM: u32 = 500;

/// Semantic category of a template, which fixes the confidence bar a match
/// against it must clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateCategory {
    /// Buttons, menus, dialogs.
    UiElement,
    /// Servant and character portraits.
    Servant,
    /// Command card faces.
    Card,
    /// Elements that gate irreversible decisions.
    CriticalElement,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 4] = [
        TemplateCategory::UiElement,
        TemplateCategory::Servant,
        TemplateCategory::Card,
        TemplateCategory::CriticalElement,
    ];

    /// Minimum acceptable match confidence for this category.
    ///
    /// Total over the enum; `CriticalElement` carries the highest bar.
    pub fn min_confidence(self) -> f32 {
        match self {
            TemplateCategory::UiElement => 0.75,
            TemplateCategory::Servant => 0.80,
            TemplateCategory::Card => 0.82,
            TemplateCategory::CriticalElement => 0.85,
        }
    }

    /// Directory name used by the on-disk asset layout.
    pub fn dir_name(self) -> &'static str {
        match self {
            TemplateCategory::UiElement => "ui",
            TemplateCategory::Servant => "servant",
            TemplateCategory::Card => "card",
            TemplateCategory::CriticalElement => "critical",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            "ui" => Some(TemplateCategory::UiElement),
            "servant" => Some(TemplateCategory::Servant),
            "card" => Some(TemplateCategory::Card),
            "critical" => Some(TemplateCategory::CriticalElement),
            _ => None,
        }
    }
}

/// A reference image to be located inside captured frames.
///
/// Construction validates the size bounds, so any `Template` handed to the
/// matcher is already known to be searchable. The gray plane used for
/// matching is converted once here rather than on every search.
#[derive(Debug, Clone)]
pub struct Template {
    id: String,
    category: TemplateCategory,
    frame: Frame,
    gray: GrayImage,
}

impl Template {
    pub fn new(
        id: impl Into<String>,
        category: TemplateCategory,
        frame: Frame,
    ) -> VisionResult<Self> {
        let id = id.into();
        let (width, height) = (frame.width(), frame.height());
        if width < MIN_TEMPLATE_DIM
            || height < MIN_TEMPLATE_DIM
            || width > MAX_TEMPLATE_DIM
            || height > MAX_TEMPLATE_DIM
        {
            return Err(VisionError::InvalidTemplateSize {
                id,
                width,
                height,
                detail: format!(
                    "each dimension must be within {MIN_TEMPLATE_DIM}..={MAX_TEMPLATE_DIM}px"
                ),
            });
        }
        let gray = frame.to_gray();
        Ok(Self {
            id,
            category,
            frame,
            gray,
        })
    }

    pub fn from_dynamic(
        id: impl Into<String>,
        category: TemplateCategory,
        image: &DynamicImage,
    ) -> VisionResult<Self> {
        Self::new(id, category, Frame::from_dynamic(image))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> TemplateCategory {
        self.category
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Approximate resident size, used for cache accounting.
    pub fn approx_bytes(&self) -> usize {
        self.frame.len_bytes() + self.gray.as_raw().len() + self.id.len()
    }
}
