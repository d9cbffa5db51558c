//! cellar_engine - Spreadsheet formula engine.
//!
//! Turns a cell's authored text into a display value and describes which
//! cells a formula reads, so the document layer can keep dependents current.

pub mod builtins;
pub mod engine;
pub mod error;

pub use error::{EngineError, Result};
