//! battle-vision: the computer-vision core of an automated game-playing
//! agent.
//!
//! Locates known UI and game elements inside captured frames via
//! single-scale and multi-scale normalized template matching, caches decoded
//! templates behind an LRU bound, and classifies the current game phase from
//! priority-ordered anchor template sets. Everything here is synchronous and
//! CPU-bound; callers run it on a worker thread and keep capture, input
//! injection and persistence outside.
//!
//! ```
//! use battle_vision::{Frame, MatchOptions, Matcher, Rect, Template, TemplateCategory};
//!
//! # fn main() -> battle_vision::VisionResult<()> {
//! // A synthetic 100x80 frame with a bright 20x20 block at (30, 20).
//! let mut pixels = vec![10u8; 100 * 80];
//! for y in 20..40usize {
//!     for x in 30..50usize {
//!         pixels[y * 100 + x] = 240;
//!     }
//! }
//! let frame = Frame::from_raw(100, 80, 1, pixels)?;
//! let template = Template::new(
//!     "ui/confirm",
//!     TemplateCategory::UiElement,
//!     frame.crop(Rect::new(25, 15, 20, 20))?,
//! )?;
//!
//! let result = Matcher::new(MatchOptions::default()).match_single(&frame, &template)?;
//! assert!(result.found);
//! assert_eq!((result.region.x, result.region.y), (25, 15));
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod cache;
pub mod error;
pub mod frame;
pub mod matching;
pub mod perf;
pub mod state;

pub use assets::{DirectorySource, MemorySource, TemplateSource};
pub use cache::{CacheStats, DEFAULT_CACHE_CAPACITY, TemplateCache};
pub use error::{VisionError, VisionResult};
pub use frame::{Frame, Rect};
pub use matching::{
    CancelToken, MAX_TEMPLATE_DIM, MIN_TEMPLATE_DIM, MatchMethod, MatchOptions, MatchResult,
    Matcher, MultiScaleResult, Template, TemplateCategory,
};
pub use state::{AnchorSpec, Classification, GameState, StateClassifier, StateProfile};
