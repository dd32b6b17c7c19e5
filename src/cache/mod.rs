//! In-memory memoization for API lookups.
//!
//! This module provides an API-agnostic caching mechanism that:
//! - Remembers successful lookups by key for the life of the owning object
//! - Bounds memory with least-recently-used eviction
//! - Never remembers failures, so a failed lookup is retried next time

mod layer;
mod traits;

pub use layer::CacheLayer;
pub use traits::{CacheResult, CacheSource};
