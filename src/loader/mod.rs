pub mod json;
pub mod file_model;

use std::sync::atomic::{AtomicBool, Ordering};
use crate::core::error::Result;
use crate::core::types::Attributes;

pub use json::JsonFile;
pub use file_model::FileModel;

/// Where a file-backed model gets its rows from.
pub trait DataSource: Send + Sync {
    /// Read every row. Called on each reload.
    fn load(&self) -> Result<Vec<Attributes>>;

    /// True when the underlying data changed since the last `load`, or
    /// when it was never loaded.
    fn is_stale(&self) -> bool;
}

/// Fixed in-memory rows, never stale once loaded.
pub struct StaticRows {
    rows: Vec<Attributes>,
    loaded: AtomicBool,
}

impl StaticRows {
    pub fn new(rows: Vec<Attributes>) -> Self {
        StaticRows {
            rows,
            loaded: AtomicBool::new(false),
        }
    }
}

impl DataSource for StaticRows {
    fn load(&self) -> Result<Vec<Attributes>> {
        self.loaded.store(true, Ordering::Release);
        Ok(self.rows.clone())
    }

    fn is_stale(&self) -> bool {
        !self.loaded.load(Ordering::Acquire)
    }
}
