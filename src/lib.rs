pub mod core;
pub mod index;
pub mod schema;
pub mod query;
pub mod loader;
pub mod association;

pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::record::Record;
pub use crate::core::table::Model;
pub use crate::core::types::{attributes, Attributes, Value};
pub use crate::query::ast::{Constraints, Direction, Matcher, OrderTerm};
pub use crate::query::relation::{Dispatch, Relation, WhereChain};
pub use crate::schema::schema::FieldOptions;

/*
┌──────────────────────────────────── HASHBASE STRUCT ARCHITECTURE ──────────────────────────────────┐
│                                                                                                    │
│  ┌───────────────────────────────────────── struct Model ──────────────────────────────────────┐   │
│  │ schema: Arc<ModelSchema>          // fields, generated methods, scopes, finder cache        │   │
│  │ table: RwLock<RecordTable>        // records + RecordIndex + dirty flag + ingested rows     │   │
│  │ reload_lock: Mutex<()>            // serializes reloads                                     │   │
│  │ associations: AssociationRegistry // has_many / has_one / belongs_to                        │   │
│  └─────────────────────────────────────────────────────────────────────────────────────────────┘   │
│                                                                                                    │
│  ┌──────────────────────┐  ┌──────────────────────┐  ┌──────────────────────────────────────┐      │
│  │ struct RecordTable   │  │ struct Record        │  │ struct Relation                      │      │
│  │ • records: Arc<Vec>  │  │ • schema             │  │ • model: Model                       │      │
│  │ • index: RecordIndex │  │ • attributes         │  │ • base: Arc<Vec<Record>> (snapshot)  │      │
│  │ • dirty: bool        │  └──────────────────────┘  │ • conditions: ConditionSet           │      │
│  │ • data               │                            │ • order: Vec<OrderTerm>              │      │
│  └──────────────────────┘  ┌──────────────────────┐  │ • cache: OnceLock<Arc<Vec<Record>>>  │      │
│                            │ enum Matcher         │  └──────────────────────────────────────┘      │
│  ┌──────────────────────┐  │ • Eq / AnyOf         │                                                │
│  │ struct FinderCache   │  │ • Range / Pattern    │  ┌──────────────────────────────────────┐      │
│  │ • LruCache<name,     │  └──────────────────────┘  │ trait DataSource                     │      │
│  │   Option<FinderSpec>>│                            │ • JsonFile -> FileModel              │      │
│  └──────────────────────┘                            └──────────────────────────────────────┘      │
└────────────────────────────────────────────────────────────────────────────────────────────────────┘
*/
