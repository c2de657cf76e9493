//! adoq Result Cache
//!
//! Holds the most recent fetched result set for each session so that
//! follow-up analysis can run without re-querying the store.
//!
//! - One slot per session: a new `put` replaces the old entry atomically.
//! - Entries older than the TTL read as absent; a TTL of zero or less
//!   never expires.
//! - The cache is an explicit object shared through `Arc`, never a global.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod clock;
pub mod config;

pub use cache::{CacheEntry, CacheOrigin, CacheStatus, ResultCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, MAX_TTL_SECS};
