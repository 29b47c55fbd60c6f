//! Search-and-extract pipeline.
//!
//! - [`search`]: per-theme provider queries with tuple dedup and early stop
//! - [`content`]: per-item page fetches with fault isolation
//! - [`extract`]: the main-content selector cascade and text normalization
//! - [`pipeline`]: session ownership and the search → fetch composition
//! - [`testing`]: a scripted in-memory browser for exercising the above

pub mod content;
pub mod extract;
pub mod pipeline;
pub mod search;
pub mod testing;

pub use content::{ContentFetcher, FetchRun, FetchSettings};
pub use pipeline::{Pipeline, PipelineReport};
pub use search::{SearchOrchestrator, SearchRun, SearchSettings};
