//! Template matching for game frames
//!
//! Single-scale and multi-scale normalized matching between captured frames
//! and known templates, plus the template and option types the engine
//! consumes.

pub mod config;
pub mod matcher;
pub mod template;
pub mod types;


pub use config::MatchOptions;
pub use matcher::Matcher;
pub use template::{MAX_TEMPLATE_DIM, MIN_TEMPLATE_DIM, Template, TemplateCategory};
pub use types::{CancelToken, MatchMethod, MatchResult, MultiScaleResult};
