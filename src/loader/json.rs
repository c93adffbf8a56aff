use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Deserialize;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::table::Model;
use crate::core::types::Attributes;
use crate::loader::DataSource;

/// Top-level shape of a data file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Document {
    Rows(Vec<Attributes>),
    Keyed(IndexMap<String, Attributes>),
}

/// One or more JSON files holding the rows of a model.
///
/// A file holds either an array of row objects or an object whose values
/// are the rows. With several files, arrays are concatenated and objects
/// merged (later keys win) before taking their values; mixing the two is
/// an error.
#[derive(Debug)]
pub struct JsonFile {
    paths: Vec<PathBuf>,
    mtimes: Mutex<Option<Vec<Option<SystemTime>>>>,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFile::with_paths([path.into()])
    }

    pub fn with_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        JsonFile {
            paths: paths.into_iter().map(Into::into).collect(),
            mtimes: Mutex::new(None),
        }
    }

    /// `<root_path>/<filename>.<extension>` for each configured filename,
    /// or for the model's table name when none is configured.
    pub fn for_model(model: &Model, config: &Config) -> Self {
        let filenames = if config.filenames.is_empty() {
            vec![model.table_name()]
        } else {
            config.filenames.clone()
        };

        JsonFile::with_paths(filenames.iter().map(|name| {
            config
                .root_path
                .join(format!("{}.{}", name, config.extension))
        }))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn read_document(path: &Path) -> Result<Document> {
        let text = fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io, format!("{}: {}", path.display(), err))
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Parse, format!("{}: {}", path.display(), err))
        })
    }

    fn current_mtimes(&self) -> Vec<Option<SystemTime>> {
        self.paths
            .iter()
            .map(|path| fs::metadata(path).and_then(|meta| meta.modified()).ok())
            .collect()
    }
}

fn merge(documents: Vec<Document>) -> Result<Vec<Attributes>> {
    let all_rows = documents.iter().all(|doc| matches!(doc, Document::Rows(_)));
    let all_keyed = documents.iter().all(|doc| matches!(doc, Document::Keyed(_)));

    if !all_rows && !all_keyed {
        return Err(Error::new(
            ErrorKind::FileTypeMismatch,
            "Data files must all contain arrays or all contain objects".to_string(),
        ));
    }

    if all_rows {
        let mut rows = Vec::new();
        for doc in documents {
            if let Document::Rows(part) = doc {
                rows.extend(part);
            }
        }
        return Ok(rows);
    }

    let mut keyed = IndexMap::new();
    for doc in documents {
        if let Document::Keyed(part) = doc {
            keyed.extend(part);
        }
    }
    Ok(keyed.into_values().collect())
}

impl DataSource for JsonFile {
    fn load(&self) -> Result<Vec<Attributes>> {
        let mtimes = self.current_mtimes();
        let documents = self
            .paths
            .iter()
            .map(|path| Self::read_document(path))
            .collect::<Result<Vec<_>>>()?;
        let rows = merge(documents)?;

        tracing::debug!(files = self.paths.len(), rows = rows.len(), "loaded json data");
        *self.mtimes.lock() = Some(mtimes);
        Ok(rows)
    }

    fn is_stale(&self) -> bool {
        match &*self.mtimes.lock() {
            Some(seen) => *seen != self.current_mtimes(),
            None => true,
        }
    }
}
