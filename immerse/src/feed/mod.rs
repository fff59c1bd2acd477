//! The feed: fetch and shuffle, per-viewer annotation, optimistic mutations and preloading.

pub mod annotator;
pub mod controller;
pub mod preload;
pub mod store;

pub use annotator::{AnnotationReport, Annotator, BlockCheckPolicy};
pub use controller::{FeedController, FeedState};
pub use preload::{BufferPolicy, BufferedPreparer, MediaPreparer, PlaybackResource, PreloadReport, PreloadScheduler};
pub use store::PostStore;
