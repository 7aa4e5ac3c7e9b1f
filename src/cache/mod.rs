//! Local cache for remote media
//!
//! Guarantees each configured source is present exactly once in the cache
//! directory and tracks where every local copy came from.
//!
//! # Components
//!
//! - [`CacheStore`]: one key at a time. Checks for the local file, fetches
//!   it only when absent, deletes and exports files.
//! - [`CacheCoordinator`]: the whole key list. Concurrent populate, export,
//!   clear-and-repopulate, and the [`CacheSnapshot`] presentation reads.
//!
//! # File naming
//!
//! | Naming | File name |
//! |--------|-----------|
//! | index | `image_<index>.<ext>` |
//! | hash | `<sha256(url)[..16]>.<ext>` |

pub mod coordinator;
pub mod entry;
pub mod fetch;
pub mod key;
pub mod locks;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{CacheCoordinator, ClearReport, CoordinatorOptions, ExportOutcome};
pub use entry::{CacheEntry, CacheSnapshot, EntryStatus};
pub use fetch::{Fetcher, SourceFetcher};
pub use key::{CacheKey, FileNaming, SourceScheme};
pub use store::{CacheStore, Ensured};
