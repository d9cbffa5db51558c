//! cellar_core - Sheet documents, recalculation and storage.
//!
//! Builds on `cellar_engine`: the engine evaluates single formulas, this
//! crate applies edits to whole sheets, keeps dependents current and stores
//! the results.

pub mod config;
pub mod document;
pub mod error;
pub mod storage;

pub use config::Config;
pub use document::{
    CellUpdate, RecalcMode, Recalculated, Recalculator, Sheet, apply_cell_update,
};
pub use error::{CellarError, Result};
pub use storage::{FileStore, MemoryStore, NewSheet, SheetStore, StoredSheet};

/// Open the store selected by `config`: a [`FileStore`] when a storage
/// directory is configured, a [`MemoryStore`] otherwise.
pub fn open_store(config: &Config) -> Result<Box<dyn SheetStore>> {
    let mut store: Box<dyn SheetStore> = match &config.storage_dir {
        Some(dir) => Box::new(FileStore::new(dir)),
        None => Box::new(MemoryStore::new()),
    };
    store.open()?;
    Ok(store)
}
