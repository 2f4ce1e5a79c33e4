//! Execution unit tests.

/// Set-associative data cache.
pub mod cache;

/// Cache replacement policies in isolation.
pub mod policies;
