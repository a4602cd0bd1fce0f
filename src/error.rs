use std::path::PathBuf;
use thiserror::Error;

use crate::frame::Rect;

/// A specialized `Result` type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// The error type for all template-matching and classification operations.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("invalid template size for '{id}': {width}x{height}px ({detail})")]
    InvalidTemplateSize {
        id: String,
        width: u32,
        height: u32,
        detail: String,
    },

    #[error("malformed pixel buffer: {description}")]
    BufferShape { description: String },

    #[error("region {region:?} lies outside the {width}x{height} image")]
    RegionOutOfBounds {
        region: Rect,
        width: u32,
        height: u32,
    },

    #[error("invalid match options: {description}")]
    InvalidOptions { description: String },

    #[error("template '{id}' not found in the asset store")]
    TemplateNotFound { id: String },

    #[error("template '{id}' refers to unknown category directory '{directory}'")]
    UnknownCategory { id: String, directory: String },

    #[error("failed to decode template '{id}': {source}")]
    TemplateDecode {
        id: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read asset store at {path:?}: {source}")]
    AssetStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VisionError {
    /// Check whether this error is a pre-match size rejection.
    pub fn is_size_rejection(&self) -> bool {
        matches!(self, VisionError::InvalidTemplateSize { .. })
    }
}
