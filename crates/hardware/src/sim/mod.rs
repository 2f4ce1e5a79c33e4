//! Simulation utilities and program loading.
//!
//! Provides the loader that places program data into memory and builds the
//! initial machine image of a run.

pub mod loader;

pub use loader::load_program;
