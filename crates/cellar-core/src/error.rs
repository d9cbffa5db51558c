//! Error types for Cellar core.

use std::path::PathBuf;

use cellar_engine::EngineError;
use thiserror::Error;

/// Errors that can occur while editing, loading or storing sheets
#[derive(Error, Debug)]
pub enum CellarError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Cell {address} lies outside the {row_count}x{col_count} grid")]
    AddressOutOfBounds {
        address: String,
        row_count: usize,
        col_count: usize,
    },

    #[error("Circular reference through {0}")]
    CircularReference(String),

    #[error("Sheet {0} not found")]
    SheetNotFound(u64),

    #[error("Sheet store is not open")]
    StoreClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, CellarError>;
