use std::sync::atomic::{AtomicBool, Ordering};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::record::Record;
use crate::core::table::Model;
use crate::core::types::Value;
use crate::loader::json::JsonFile;
use crate::loader::DataSource;
use crate::query::ast::Constraints;
use crate::query::relation::{Dispatch, Relation};

/// A model whose rows come from a [`DataSource`], loaded lazily.
///
/// Reads reload first when the source was never loaded or has changed.
/// Programmatic changes mark the model dirty, and a dirty model keeps its
/// records until `reload(true)`.
pub struct FileModel<S: DataSource = JsonFile> {
    model: Model,
    source: S,
    loaded: AtomicBool,
}

impl FileModel<JsonFile> {
    pub fn new(name: impl Into<String>, config: &Config) -> Self {
        let model = Model::with_config(name, config);
        let source = JsonFile::for_model(&model, config);
        FileModel::with_source(model, source)
    }
}

impl<S: DataSource> FileModel<S> {
    pub fn with_source(model: Model, source: S) -> Self {
        FileModel {
            model,
            source,
            loaded: AtomicBool::new(false),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn reload(&self, force: bool) -> Result<()> {
        if !force && self.model.is_dirty() {
            tracing::debug!(model = self.model.name(), "skipping reload of dirty model");
            return Ok(());
        }

        self.model.reload_from(&self.source)?;
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    fn ensure_fresh(&self) -> Result<()> {
        if !self.is_loaded() || self.source.is_stale() {
            self.reload(false)?;
        }
        Ok(())
    }

    pub fn all(&self) -> Result<Relation> {
        self.ensure_fresh()?;
        Ok(self.model.all())
    }

    pub fn filter(&self, constraints: impl Into<Option<Constraints>>) -> Result<Relation> {
        self.ensure_fresh()?;
        Ok(self.model.filter(constraints))
    }

    pub fn find(&self, id: impl Into<Value>) -> Result<Record> {
        self.ensure_fresh()?;
        self.model.find(id)
    }

    pub fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<Record>> {
        self.ensure_fresh()?;
        Ok(self.model.find_by_id(id))
    }

    pub fn count(&self) -> Result<usize> {
        self.ensure_fresh()?;
        Ok(self.model.count())
    }

    pub fn call(&self, method: &str, args: &[Value]) -> Result<Dispatch> {
        self.ensure_fresh()?;
        self.model.call(method, args)
    }
}
