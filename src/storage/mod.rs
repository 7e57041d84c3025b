pub mod cache;
pub mod registry;
pub mod status;

pub use cache::{CachedFile, FeedCache};
pub use registry::{RegistryEntry, RegistryStore};
pub use status::{FeedHealth, FeedStatus, Freshness, StatusTracker};
