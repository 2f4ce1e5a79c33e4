//! Shared test utilities.

/// Fluent program construction.
pub mod builder;


pub use builder::ProgramBuilder;
pub use harness::TestContext;
