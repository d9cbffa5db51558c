//! Directory-backed sheet store.
//!
//! Each sheet lives in `<dir>/<id>.json`. The next id to hand out is kept in
//! `<dir>/next_id`, so ids of deleted sheets are not handed out again after
//! a reopen. Opening also scans the directory and never resumes below the
//! highest sheet file found.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use super::{NewSheet, SheetStore, StoredSheet};
use crate::document::Sheet;
use crate::error::{CellarError, Result};

const SHEET_EXTENSION: &str = "json";
const COUNTER_FILE: &str = "next_id";

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    /// Held across a create so the counter file only moves forward
    next_id: Mutex<u64>,
    open: bool,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore {
            dir: dir.into(),
            next_id: Mutex::new(1),
            open: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(CellarError::StoreClosed)
        }
    }

    fn path_for(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{id}.{SHEET_EXTENSION}"))
    }

    fn read(&self, id: u64) -> Result<Option<StoredSheet>> {
        let content = match fs::read_to_string(self.path_for(id)) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let stored: StoredSheet = serde_json::from_str(&content)?;
        stored.data.validate()?;
        Ok(Some(stored))
    }

    /// Write through a temporary file so readers never see half a sheet.
    fn write(&self, stored: &StoredSheet) -> Result<()> {
        let path = self.path_for(stored.id);
        let tmp = path.with_extension(format!("{SHEET_EXTENSION}.tmp"));
        fs::write(&tmp, serde_json::to_string_pretty(stored)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn lock_next_id(&self) -> MutexGuard<'_, u64> {
        self.next_id
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_counter(&self) -> Result<u64> {
        let content = match fs::read_to_string(self.dir.join(COUNTER_FILE)) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        match content.trim().parse() {
            Ok(next) => Ok(next),
            Err(_) => {
                warn!(dir = %self.dir.display(), "ignoring unreadable id counter");
                Ok(0)
            }
        }
    }

    fn write_counter(&self, next: u64) -> Result<()> {
        let path = self.dir.join(COUNTER_FILE);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, next.to_string())?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn scan_ids(&self) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SHEET_EXTENSION) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

impl SheetStore for FileStore {
    fn open(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let highest = self.scan_ids()?.last().copied().unwrap_or(0);
        let counter = self.read_counter()?;
        let next_id = self.next_id.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        *next_id = (*next_id).max(counter).max(highest.saturating_add(1));
        let resume = *next_id;
        self.open = true;
        debug!(dir = %self.dir.display(), next_id = resume, "opened file store");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn create(&self, sheet: NewSheet) -> Result<StoredSheet> {
        self.ensure_open()?;
        let mut next_id = self.lock_next_id();
        let id = *next_id;
        self.write_counter(id.saturating_add(1))?;
        *next_id = id.saturating_add(1);
        drop(next_id);

        let stored = StoredSheet {
            id,
            name: sheet.name,
            data: sheet.data,
        };
        self.write(&stored)?;
        debug!(id, "created sheet");
        Ok(stored)
    }

    fn get(&self, id: u64) -> Result<Option<StoredSheet>> {
        self.ensure_open()?;
        self.read(id)
    }

    fn update(&self, id: u64, data: Sheet) -> Result<StoredSheet> {
        self.ensure_open()?;
        let mut stored = self.read(id)?.ok_or(CellarError::SheetNotFound(id))?;
        stored.data = data;
        self.write(&stored)?;
        debug!(id, "updated sheet");
        Ok(stored)
    }

    fn delete(&self, id: u64) -> Result<()> {
        self.ensure_open()?;
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => {
                debug!(id, "deleted sheet");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn ids(&self) -> Result<Vec<u64>> {
        self.ensure_open()?;
        self.scan_ids()
    }
}
