//! Pixstash - local cache for remote images
//!
//! Keeps exactly one local copy of each configured source URL, reports per
//! entry whether it was fetched or already cached, and can export, clear and
//! rebuild the cache.
//!
//! The core lives in [`cache`]; [`cli`] and [`ui`] are the terminal front end.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{StashError, StashResult};
