//! Persistence of sheets by integer id.
//!
//! - [`MemoryStore`] - Process-local, lost on exit
//! - [`FileStore`] - One JSON file per sheet in a directory

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::document::Sheet;
use crate::error::Result;

/// A sheet as held by a store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSheet {
    pub id: u64,
    pub name: String,
    pub data: Sheet,
}

/// A sheet that has not been assigned an id yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSheet {
    pub name: String,
    pub data: Sheet,
}

/// Create, read, update and delete sheets.
///
/// Every operation other than `open` fails with `StoreClosed` until the
/// store has been opened. Ids start at 1 and are never reused.
pub trait SheetStore: Send + Sync {
    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn create(&self, sheet: NewSheet) -> Result<StoredSheet>;

    fn get(&self, id: u64) -> Result<Option<StoredSheet>>;

    /// Replace the data of an existing sheet, keeping its name.
    fn update(&self, id: u64, data: Sheet) -> Result<StoredSheet>;

    /// Remove a sheet. Deleting an absent id succeeds.
    fn delete(&self, id: u64) -> Result<()>;

    /// Ids of every stored sheet, ascending.
    fn ids(&self) -> Result<Vec<u64>>;
}
