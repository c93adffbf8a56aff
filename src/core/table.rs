use std::fmt;
use std::sync::Arc;
use chrono::{DateTime, NaiveDateTime, Utc};
use heck::ToSnakeCase;
use parking_lot::{Mutex, RwLock};
use crate::association::AssociationRegistry;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::record::Record;
use crate::core::types::{Attributes, Value};
use crate::index::record_index::RecordIndex;
use crate::loader::DataSource;
use crate::query::ast::{Constraints, OrderArg};
use crate::query::cache::CacheStats;
use crate::query::relation::{Dispatch, Relation, WhereChain};
use crate::schema::schema::{FieldOptions, ModelSchema};

/// Ordered records of one model plus their id index
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    records: Arc<Vec<Record>>,
    index: RecordIndex,
    dirty: bool,
    data: Option<Vec<Attributes>>,
}

impl RecordTable {
    pub fn new() -> Self {
        RecordTable::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record, assigning the next id when it has none.
    ///
    /// Duplicate ids are only rejected while the table is dirty: a freshly
    /// created table, or one just marked clean after a reload, accepts the
    /// next insert unchecked.
    pub fn insert(&mut self, mut record: Record) -> Result<Record> {
        if record.id().is_none() {
            if let Some(id) = self.next_id() {
                record.set_id(id);
            }
        }

        if self.dirty {
            if let Some(id) = record.id() {
                if self.index.contains(id) {
                    return Err(Error::new(
                        ErrorKind::IdError,
                        format!("Duplicate ID found for record {:?}", record.attributes()),
                    ));
                }
            }
        }

        self.dirty = true;
        if let Some(id) = record.id() {
            self.index.insert(id, self.records.len());
        }
        Arc::make_mut(&mut self.records).push(record.clone());
        Ok(record)
    }

    /// Largest integer id + 1, 1 for an empty table, `None` when any
    /// record has a non-integer (or missing) id or the largest id is `i64::MAX`.
    pub fn next_id(&self) -> Option<Value> {
        if self.records.is_empty() {
            return Some(Value::Int(1));
        }

        let mut max = i64::MIN;
        for record in self.records.iter() {
            match record.id() {
                Some(Value::Int(id)) => max = max.max(*id),
                _ => return None,
            }
        }
        max.checked_add(1).map(Value::Int)
    }

    pub fn max_id(&self) -> Option<Value> {
        self.records
            .iter()
            .filter_map(Record::id)
            .fold(None, |max: Option<&Value>, id| match max {
                Some(current) if current.compare(id) != Some(std::cmp::Ordering::Less) => Some(current),
                _ => Some(id),
            })
            .cloned()
    }

    pub fn position(&self, id: &Value) -> Option<usize> {
        self.index.position(id)
    }

    pub fn clear(&mut self) {
        self.records = Arc::new(Vec::new());
        self.index.clear();
        self.dirty = true;
    }
}

struct ModelInner {
    schema: Arc<ModelSchema>,
    table: RwLock<RecordTable>,
    reload_lock: Mutex<()>,
    associations: AssociationRegistry,
}

/// Handle to one model: its schema and its process-wide record table.
///
/// Clones share the same table. Reads take a snapshot of the record
/// sequence; `set_data`, `reload` and `reload_from` swap the whole table at
/// once, and reloads are serialized against each other.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Model::with_config(name, &Config::default())
    }

    pub fn with_config(name: impl Into<String>, config: &Config) -> Self {
        Model {
            inner: Arc::new(ModelInner {
                schema: Arc::new(ModelSchema::new(name, config.finder_cache_size)),
                table: RwLock::new(RecordTable::new()),
                reload_lock: Mutex::new(()),
                associations: AssociationRegistry::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.schema.name()
    }

    /// Plural snake-case name, e.g. `Country` -> `countries`.
    pub fn table_name(&self) -> String {
        pluralizer::pluralize(&self.name().to_snake_case(), 2, false)
    }

    pub(crate) fn schema(&self) -> &Arc<ModelSchema> {
        &self.inner.schema
    }

    pub(crate) fn associations(&self) -> &AssociationRegistry {
        &self.inner.associations
    }

    // ---- fields and methods ----

    pub fn field(&self, name: &str, options: FieldOptions) -> Result<()> {
        self.inner.schema.declare_field(name, options)
    }

    pub fn fields<I, S>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.field(name.as_ref(), FieldOptions::default())?;
        }
        Ok(())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.inner.schema.field_names()
    }

    pub fn define_method<F>(&self, name: &str, method: F)
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.inner.schema.define_method(name, method);
    }

    /// Register a named scope, reachable through [`Model::call`] and [`Relation::call`].
    pub fn scope<F>(&self, name: &str, scope: F)
    where
        F: Fn(&Relation, &[Value]) -> Result<Relation> + Send + Sync + 'static,
    {
        self.inner.schema.define_scope(name, scope);
    }

    pub fn finder_cache_stats(&self) -> CacheStats {
        self.inner.schema.finder_cache_stats()
    }

    // ---- ingestion and mutation ----

    /// Replace every record. Field names are discovered from the rows, ids
    /// are assigned where missing, and the table is left dirty. `None`
    /// empties the table.
    pub fn set_data(&self, rows: impl Into<Option<Vec<Attributes>>>) -> Result<()> {
        let table = self.build_table(rows.into())?;
        let count = table.len();
        *self.inner.table.write() = table;
        tracing::debug!(model = self.name(), records = count, "loaded table data");
        Ok(())
    }

    fn build_table(&self, rows: Option<Vec<Attributes>>) -> Result<RecordTable> {
        let mut table = RecordTable::new();
        table.dirty = true;

        if let Some(rows) = rows {
            self.auto_assign_fields(&rows)?;
            for row in rows {
                table.insert(Record::from_parts(self.inner.schema.clone(), row))?;
            }
            table.data = Some(
                table
                    .records
                    .iter()
                    .map(|record| record.attributes().clone())
                    .collect(),
            );
        }

        Ok(table)
    }

    fn auto_assign_fields(&self, rows: &[Attributes]) -> Result<()> {
        let mut seen = indexmap::IndexSet::new();
        for row in rows {
            for key in row.keys() {
                if key != "id" {
                    seen.insert(key.as_str());
                }
            }
        }
        for key in seen {
            self.field(key, FieldOptions::default())?;
        }
        Ok(())
    }

    /// Rows from the last `set_data`, including the ids that were assigned.
    pub fn data(&self) -> Option<Vec<Attributes>> {
        self.inner.table.read().data.clone()
    }

    pub fn new_record(&self, attributes: Attributes) -> Record {
        Record::from_parts(self.inner.schema.clone(), attributes)
    }

    pub fn insert(&self, record: Record) -> Result<Record> {
        let record = Record::from_parts(self.inner.schema.clone(), record.into_attributes());
        self.inner.table.write().insert(record)
    }

    pub fn create(&self, attributes: Attributes) -> Result<Record> {
        let record = self.insert(self.new_record(attributes))?;
        self.mark_dirty();
        Ok(record)
    }

    /// Insert `record` and write the assigned id back into it.
    pub fn save(&self, record: &mut Record) -> Result<()> {
        *record = self.insert(record.clone())?;
        Ok(())
    }

    pub fn delete_all(&self) {
        self.inner.table.write().clear();
        tracing::debug!(model = self.name(), "deleted all records");
    }

    pub fn next_id(&self) -> Option<Value> {
        self.inner.table.read().next_id()
    }

    pub(crate) fn max_id(&self) -> Option<Value> {
        self.inner.table.read().max_id()
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Record>> {
        self.inner.table.read().records.clone()
    }

    pub(crate) fn index_position(&self, id: &Value) -> Option<usize> {
        self.inner.table.read().position(id)
    }

    // ---- reload signal ----

    pub fn is_dirty(&self) -> bool {
        self.inner.table.read().dirty
    }

    pub fn mark_dirty(&self) {
        self.inner.table.write().dirty = true;
    }

    pub fn mark_clean(&self) {
        self.inner.table.write().dirty = false;
    }

    /// Rebuild the table from the stored `data()` and mark it clean.
    pub fn reload(&self) -> Result<()> {
        let _guard = self.inner.reload_lock.lock();
        let rows = self.data();
        self.swap_clean(rows)
    }

    /// Rebuild the table from `source` and mark it clean.
    pub fn reload_from<S: DataSource + ?Sized>(&self, source: &S) -> Result<()> {
        let _guard = self.inner.reload_lock.lock();
        let rows = source.load()?;
        self.swap_clean(Some(rows))
    }

    fn swap_clean(&self, rows: Option<Vec<Attributes>>) -> Result<()> {
        let mut table = self.build_table(rows)?;
        table.dirty = false;
        let count = table.len();
        *self.inner.table.write() = table;
        tracing::debug!(model = self.name(), records = count, "reloaded table");
        Ok(())
    }

    // ---- reads ----

    pub fn all(&self) -> Relation {
        Relation::new(self.clone(), self.snapshot())
    }

    pub fn filter(&self, constraints: impl Into<Option<Constraints>>) -> Relation {
        self.all().filter(constraints)
    }

    pub fn filter_chain(&self) -> WhereChain {
        self.all().filter_chain()
    }

    pub fn filter_not(&self, constraints: impl Into<Option<Constraints>>) -> Result<Relation> {
        self.all().filter_not(constraints)
    }

    pub fn order<I, A>(&self, args: I) -> Result<Relation>
    where
        I: IntoIterator<Item = A>,
        A: Into<OrderArg>,
    {
        self.all().order(args)
    }

    pub fn find(&self, id: impl Into<Value>) -> Result<Record> {
        self.all().find(id)
    }

    pub fn find_many<I, V>(&self, ids: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.all().find_many(ids)
    }

    pub fn find_first(&self) -> Option<Record> {
        self.first()
    }

    pub fn find_with<F>(&self, predicate: F) -> Option<Record>
    where
        F: Fn(&Record) -> bool,
    {
        self.all().find_with(predicate)
    }

    /// O(1) lookup through the id index; never fails.
    pub fn find_by_id(&self, id: impl Into<Value>) -> Option<Record> {
        let id = id.into();
        let table = self.inner.table.read();
        let position = table.position(&id)?;
        table.records.get(position).cloned()
    }

    pub fn find_by(&self, constraints: impl Into<Option<Constraints>>) -> Result<Option<Record>> {
        self.all().find_by(constraints)
    }

    pub fn find_by_strict(&self, constraints: impl Into<Option<Constraints>>) -> Result<Record> {
        self.all().find_by_strict(constraints)
    }

    pub fn pluck(&self, fields: &[&str]) -> Vec<Value> {
        self.all().pluck(fields)
    }

    pub fn pick(&self, fields: &[&str]) -> Option<Value> {
        self.all().pick(fields)
    }

    pub fn ids(&self) -> Vec<Value> {
        self.all().ids()
    }

    pub fn count(&self) -> usize {
        self.inner.table.read().len()
    }

    pub fn first(&self) -> Option<Record> {
        self.inner.table.read().records.first().cloned()
    }

    pub fn last(&self) -> Option<Record> {
        self.inner.table.read().records.last().cloned()
    }

    /// Name-based dispatch: generated and dynamic finders, scopes and
    /// `find_by`. Anything else is a missing-method error naming the model.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Dispatch> {
        self.all().call(method, args)
    }

    // ---- record identity ----

    pub fn is_new_record(&self, record: &Record) -> bool {
        let table = self.inner.table.read();
        match record.id().and_then(|id| table.position(id)) {
            Some(position) => table.records.get(position) != Some(record),
            None => true,
        }
    }

    /// `<table>/new` for unsaved records, otherwise `<table>/<id>` with an
    /// `-<YYYYmmddHHMMSS>` suffix when the record has `updated_at`.
    pub fn cache_key(&self, record: &Record) -> String {
        let table_name = self.table_name();
        if self.is_new_record(record) {
            return format!("{}/new", table_name);
        }

        match timestamp(&record.read("updated_at")) {
            Some(updated_at) => format!(
                "{}/{}-{}",
                table_name,
                record.to_param(),
                updated_at.format("%Y%m%d%H%M%S")
            ),
            None => format!("{}/{}", table_name, record.to_param()),
        }
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(t) => Some(*t),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|t| t.and_utc())
            }),
        _ => None,
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let table = self.inner.table.read();
        f.debug_struct("Model")
            .field("name", &self.name())
            .field("records", &table.len())
            .field("dirty", &table.dirty)
            .finish()
    }
}
