use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::record::Record;
use crate::core::types::Value;
use crate::query::cache::{CacheStats, FinderCache};
use crate::query::finder::FinderSpec;
use crate::query::relation::Relation;

/// Names that collide with record machinery and cannot be fields.
pub const RESERVED_FIELDS: &[&str] = &["attributes"];

pub type CustomMethod = Arc<dyn Fn(&Record) -> Value + Send + Sync>;
pub type ScopeFn = Arc<dyn Fn(&Relation, &[Value]) -> Result<Relation> + Send + Sync>;

/// Field definition with its default value
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub default: Value,
}

#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub default: Value,
}

impl FieldOptions {
    pub fn with_default(default: impl Into<Value>) -> Self {
        FieldOptions {
            default: default.into(),
        }
    }
}

/// Record-level method, resolved by name
#[derive(Clone)]
pub enum InstanceMethod {
    Reader { field: String, default: Value },
    Writer { field: String },
    Predicate { field: String },
    Custom(CustomMethod),
}

impl fmt::Debug for InstanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InstanceMethod::Reader { field, default } => {
                write!(f, "Reader({}, default={:?})", field, default)
            }
            InstanceMethod::Writer { field } => write!(f, "Writer({})", field),
            InstanceMethod::Predicate { field } => write!(f, "Predicate({})", field),
            InstanceMethod::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Model-level finder generated for a declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassMethod {
    FindBy { field: String },
    FindAllBy { field: String },
}

#[derive(Default)]
struct Registry {
    fields: IndexMap<String, FieldDefinition>,
    instance_methods: HashMap<String, InstanceMethod>,
    class_methods: HashMap<String, ClassMethod>,
    scopes: HashMap<String, ScopeFn>,
}

/// Everything a model knows about its shape, shared by its records.
pub struct ModelSchema {
    name: String,
    registry: RwLock<Registry>,
    finder_cache: FinderCache,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>, finder_cache_size: usize) -> Self {
        ModelSchema {
            name: name.into(),
            registry: RwLock::new(Registry::default()),
            finder_cache: FinderCache::new(finder_cache_size),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a field and generate its reader, writer, predicate and finders.
    /// Methods that already exist, generated or user-defined, are left alone.
    pub fn declare_field(&self, name: &str, options: FieldOptions) -> Result<()> {
        if RESERVED_FIELDS.contains(&name) {
            return Err(Error::new(
                ErrorKind::ReservedField,
                format!("{} is a reserved field. Please use another name.", name),
            ));
        }

        let mut registry = self.registry.write();
        registry
            .fields
            .entry(name.to_string())
            .or_insert_with(|| FieldDefinition {
                name: name.to_string(),
                default: options.default.clone(),
            });

        registry
            .instance_methods
            .entry(name.to_string())
            .or_insert_with(|| InstanceMethod::Reader {
                field: name.to_string(),
                default: options.default,
            });
        registry
            .instance_methods
            .entry(format!("{}=", name))
            .or_insert_with(|| InstanceMethod::Writer {
                field: name.to_string(),
            });
        registry
            .instance_methods
            .entry(format!("{}?", name))
            .or_insert_with(|| InstanceMethod::Predicate {
                field: name.to_string(),
            });

        registry
            .class_methods
            .entry(format!("find_by_{}", name))
            .or_insert_with(|| ClassMethod::FindBy {
                field: name.to_string(),
            });
        registry
            .class_methods
            .entry(format!("find_all_by_{}", name))
            .or_insert_with(|| ClassMethod::FindAllBy {
                field: name.to_string(),
            });

        Ok(())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.registry.read().fields.keys().cloned().collect()
    }

    pub fn field(&self, name: &str) -> Option<FieldDefinition> {
        self.registry.read().fields.get(name).cloned()
    }

    pub fn define_method<F>(&self, name: &str, method: F)
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.registry
            .write()
            .instance_methods
            .insert(name.to_string(), InstanceMethod::Custom(Arc::new(method)));
    }

    pub fn instance_method(&self, name: &str) -> Option<InstanceMethod> {
        self.registry.read().instance_methods.get(name).cloned()
    }

    pub fn class_method(&self, name: &str) -> Option<ClassMethod> {
        self.registry.read().class_methods.get(name).cloned()
    }

    pub fn define_scope<F>(&self, name: &str, scope: F)
    where
        F: Fn(&Relation, &[Value]) -> Result<Relation> + Send + Sync + 'static,
    {
        self.registry
            .write()
            .scopes
            .insert(name.to_string(), Arc::new(scope));
    }

    pub fn scope(&self, name: &str) -> Option<ScopeFn> {
        self.registry.read().scopes.get(name).cloned()
    }

    /// Resolve a dynamic finder whose fields are all declared (or `id`).
    pub fn resolve_finder(&self, method_name: &str) -> Option<FinderSpec> {
        let spec = self.finder_cache.resolve(method_name)?;
        let registry = self.registry.read();
        let known = spec
            .fields
            .iter()
            .all(|f| f == "id" || registry.fields.contains_key(f));
        known.then_some(spec)
    }

    pub fn finder_cache_stats(&self) -> CacheStats {
        self.finder_cache.stats()
    }
}

impl fmt::Debug for ModelSchema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ModelSchema")
            .field("name", &self.name)
            .field("fields", &self.field_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_field_generates_methods() {
        let schema = ModelSchema::new("Country", 8);
        schema.declare_field("name", FieldOptions::default()).unwrap();

        assert!(matches!(schema.instance_method("name"), Some(InstanceMethod::Reader { .. })));
        assert!(matches!(schema.instance_method("name="), Some(InstanceMethod::Writer { .. })));
        assert!(matches!(schema.instance_method("name?"), Some(InstanceMethod::Predicate { .. })));
        assert_eq!(
            schema.class_method("find_by_name"),
            Some(ClassMethod::FindBy { field: "name".into() })
        );
        assert_eq!(
            schema.class_method("find_all_by_name"),
            Some(ClassMethod::FindAllBy { field: "name".into() })
        );
    }

    #[test]
    fn reserved_field_is_rejected() {
        let schema = ModelSchema::new("Country", 8);
        let err = schema.declare_field("attributes", FieldOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReservedField);
        assert!(schema.field_names().is_empty());
    }

    #[test]
    fn redeclaring_keeps_first_definition() {
        let schema = ModelSchema::new("Country", 8);
        schema.declare_field("name", FieldOptions::with_default("foo")).unwrap();
        schema.declare_field("name", FieldOptions::with_default("bar")).unwrap();

        assert_eq!(schema.field_names(), vec!["name"]);
        assert_eq!(schema.field("name").unwrap().default, Value::from("foo"));
    }

    #[test]
    fn user_defined_methods_survive_field_declaration() {
        let schema = ModelSchema::new("Country", 8);
        schema.define_method("name", |_| Value::from("custom"));
        schema.declare_field("name", FieldOptions::default()).unwrap();

        assert!(matches!(schema.instance_method("name"), Some(InstanceMethod::Custom(_))));
    }

    #[test]
    fn finders_require_known_fields() {
        let schema = ModelSchema::new("Country", 8);
        schema.declare_field("name", FieldOptions::default()).unwrap();

        assert!(schema.resolve_finder("find_by_name").is_some());
        assert!(schema.resolve_finder("find_by_id_and_name").is_some());
        assert!(schema.resolve_finder("find_by_capital").is_none());
    }
}
