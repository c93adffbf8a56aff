use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use serde::Serialize;
use crate::core::error::{Error, Result};
use crate::core::types::{Attributes, Value};
use crate::schema::schema::{InstanceMethod, ModelSchema};

static NULL: Value = Value::Null;

/// One row of a model: an attribute bag plus its model identity.
///
/// Two records are equal when they belong to the same model and share a
/// non-nil id. A record without an id is equal to nothing, itself included,
/// which is why `Record` is `PartialEq` but not `Eq`.
#[derive(Clone, Serialize)]
pub struct Record {
    #[serde(skip)]
    schema: Arc<ModelSchema>,
    #[serde(flatten)]
    attributes: Attributes,
}

impl Record {
    pub(crate) fn from_parts(schema: Arc<ModelSchema>, attributes: Attributes) -> Self {
        Record { schema, attributes }
    }

    pub fn model_name(&self) -> &str {
        self.schema.name()
    }

    pub fn id(&self) -> Option<&Value> {
        self.attributes.get("id").filter(|id| !id.is_null())
    }

    pub fn set_id(&mut self, id: impl Into<Value>) {
        self.attributes.insert("id".to_string(), id.into());
    }

    /// Raw stored value, nil when absent.
    pub fn get(&self, field: &str) -> &Value {
        self.attributes.get(field).unwrap_or(&NULL)
    }

    /// Value as seen through the model's reader: user-defined methods
    /// first, then the stored value, then the declared default.
    pub fn read(&self, field: &str) -> Value {
        match self.schema.instance_method(field) {
            Some(InstanceMethod::Reader { field, default }) => match self.attributes.get(&field) {
                Some(value) if !value.is_null() => value.clone(),
                _ => default,
            },
            Some(InstanceMethod::Custom(method)) => method(self),
            _ => self.get(field).clone(),
        }
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(field.into(), value.into());
    }

    pub fn is_present(&self, field: &str) -> bool {
        self.read(field).is_present()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }

    pub fn to_param(&self) -> String {
        self.id().map(|id| id.canonical().into_owned()).unwrap_or_default()
    }

    pub fn is_readonly(&self) -> bool {
        true
    }

    /// Invoke a reader, predicate or user-defined method by name.
    pub fn call(&self, method: &str) -> Result<Value> {
        match method {
            "id" => return Ok(self.get("id").clone()),
            "attributes" => return Ok(Value::Map(self.attributes.clone())),
            _ => {}
        }

        match self.schema.instance_method(method) {
            Some(InstanceMethod::Reader { field, .. }) => Ok(self.read(&field)),
            Some(InstanceMethod::Predicate { field }) => Ok(Value::Bool(self.is_present(&field))),
            Some(InstanceMethod::Custom(f)) => Ok(f(self)),
            Some(InstanceMethod::Writer { .. }) | None => {
                Err(Error::no_method(method, self.model_name()))
            }
        }
    }

    /// Invoke a writer (`<field>=`) by name.
    pub fn call_mut(&mut self, method: &str, value: impl Into<Value>) -> Result<()> {
        if method == "id=" {
            self.set_id(value);
            return Ok(());
        }

        match self.schema.instance_method(method) {
            Some(InstanceMethod::Writer { field }) => {
                self.set(field, value);
                Ok(())
            }
            _ => Err(Error::no_method(method, self.model_name())),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        let same_model = Arc::ptr_eq(&self.schema, &other.schema)
            || self.schema.name() == other.schema.name();
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => same_model && a == b,
            _ => false,
        }
    }
}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.name().hash(state);
        self.get("id").canonical().hash(state);
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct(self.schema.name())
            .field("attributes", &self.attributes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::attributes;
    use crate::core::error::ErrorKind;
    use crate::schema::schema::FieldOptions;

    fn schema(name: &str) -> Arc<ModelSchema> {
        Arc::new(ModelSchema::new(name, 8))
    }

    fn record(schema: &Arc<ModelSchema>, attrs: Attributes) -> Record {
        Record::from_parts(schema.clone(), attrs)
    }

    #[test]
    fn equality_by_model_and_id() {
        let country = schema("Country");
        let region = schema("Region");

        let a = record(&country, attributes([("id", 23)]));
        let b = record(&country, attributes([("id", 23)]));
        let c = record(&country, attributes([("id", 24)]));
        let d = record(&region, attributes([("id", 23)]));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn records_without_id_are_never_equal() {
        let country = schema("Country");
        let a = record(&country, Attributes::new());
        let b = record(&country, Attributes::new());

        assert_ne!(a, b);
        assert_ne!(a, a.clone());
    }

    #[test]
    fn reader_falls_back_to_default() {
        let country = schema("Country");
        country.declare_field("name", FieldOptions::with_default("foobar")).unwrap();

        let blank = record(&country, Attributes::new());
        let spain = record(&country, attributes([("name", "Spain")]));

        assert_eq!(blank.read("name"), Value::from("foobar"));
        assert_eq!(spain.read("name"), Value::from("Spain"));
        assert_eq!(blank.get("name"), &Value::Null);
    }

    #[test]
    fn predicate_uses_presence() {
        let country = schema("Country");
        country.declare_field("name", FieldOptions::default()).unwrap();

        let spain = record(&country, attributes([("name", "Spain")]));
        let blank = record(&country, attributes([("name", " ")]));
        let missing = record(&country, Attributes::new());

        assert_eq!(spain.call("name?").unwrap(), Value::Bool(true));
        assert_eq!(blank.call("name?").unwrap(), Value::Bool(false));
        assert_eq!(missing.call("name?").unwrap(), Value::Bool(false));
    }

    #[test]
    fn dispatch_setters_and_unknown_methods() {
        let country = schema("Country");
        country.declare_field("name", FieldOptions::default()).unwrap();
        let mut r = record(&country, Attributes::new());

        r.call_mut("name=", "Canada").unwrap();
        assert_eq!(r.call("name").unwrap(), Value::from("Canada"));

        let err = r.call("capital").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoMethod);
        assert!(err.context.contains("Country"));
        assert!(r.call_mut("capital=", "Ottawa").is_err());
    }

    #[test]
    fn to_param_is_id_string() {
        let country = schema("Country");
        assert_eq!(record(&country, attributes([("id", 2)])).to_param(), "2");
        assert_eq!(record(&country, Attributes::new()).to_param(), "");
    }
}
