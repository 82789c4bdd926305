//! Client side of the idea map
//!
//! - `api`: typed HTTP client for the `/api` routes
//! - `cache`: keyed query cache with invalidation and optimistic updates
//! - `session`: drives one open map through the cache

pub mod api;
pub mod cache;
pub mod error;
pub mod session;

pub use api::ApiClient;
pub use cache::{Fetcher, Invalidation, PatchId, QueryCache, QueryKey, QueryState, Resource};
pub use error::{ClientError, ClientResult};
pub use session::{CreatedNode, IdeaMapSession};
