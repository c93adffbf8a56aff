use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Deserialize};

/// Field name → value mapping, in insertion order.
pub type Attributes = IndexMap<String, Value>;

/// Dynamically typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    #[serde(skip_deserializing)]
    Timestamp(DateTime<Utc>),   // strings in data stay strings
    String(String),
    #[serde(skip_deserializing)]
    Symbol(String),
    Array(Vec<Value>),
    Map(Attributes),
}

impl Value {
    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical string form used for every equality comparison.
    ///
    /// Symbols, strings and numbers collapse onto their textual
    /// representation, so `:US == "US"` and `"13" == 13` both hold.
    pub fn canonical(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::String(s) | Value::Symbol(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Blank values are nil, false, whitespace-only strings and empty collections.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::String(s) | Value::Symbol(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn is_present(&self) -> bool {
        !self.is_blank()
    }

    /// Total order used for sorting. Values of one kind compare naturally;
    /// across kinds they rank nil < bool < number < timestamp < string <
    /// array < map. NaN sorts after every other number.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => float_cmp(*a, *b),
            (Value::Int(a), Value::Float(b)) => int_float_cmp(*a, *b),
            (Value::Float(a), Value::Int(b)) => int_float_cmp(*b, *a).reverse(),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (
                Value::String(a) | Value::Symbol(a),
                Value::String(b) | Value::Symbol(b),
            ) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.sort_cmp(y))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Value::Map(a), Value::Map(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.sort_cmp(vb)))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Timestamp(_) => 3,
            Value::String(_) | Value::Symbol(_) => 4,
            Value::Array(_) => 5,
            Value::Map(_) => 6,
        }
    }

    /// Ordering between two values, `None` when the types are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (
                Value::String(a) | Value::Symbol(a),
                Value::String(b) | Value::Symbol(b),
            ) => Some(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }
}

fn float_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

// exact comparison; i64 -> f64 rounding is monotone, ties are settled in i128
fn int_float_cmp(a: i64, b: f64) -> Ordering {
    if b.is_nan() {
        return Ordering::Less;
    }
    match (a as f64).partial_cmp(&b) {
        Some(Ordering::Equal) => (a as i128).cmp(&(b as i128)),
        Some(ord) => ord,
        None => Ordering::Equal,
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::String(s) | Value::Symbol(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}", item.canonical())?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {:?}", key, value.canonical())?;
                }
                f.write_str("}")
            }
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    String => String,
    DateTime<Utc> => Timestamp,
    Attributes => Map,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

/// Build an `Attributes` map from `(name, value)` pairs.
pub fn attributes<K, V, I>(pairs: I) -> Attributes
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_unifies_symbols_strings_and_numbers() {
        assert_eq!(Value::symbol("US").canonical(), Value::from("US").canonical());
        assert_eq!(Value::from(13).canonical(), Value::from("13").canonical());
        assert_eq!(Value::Null.canonical(), "");
        assert_eq!(Value::Float(2.0).canonical(), "2.0");
    }

    #[test]
    fn blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::from(" ").is_blank());
        assert!(Value::from(false).is_blank());
        assert!(Value::Array(vec![]).is_blank());
        assert!(Value::from("Spain").is_present());
        assert!(Value::from(0).is_present());
    }

    #[test]
    fn compare_mixed_types() {
        assert_eq!(Value::from(1).compare(&Value::from(2.5)), Some(Ordering::Less));
        assert_eq!(Value::symbol("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::from(1).compare(&Value::from("1")), None);
        assert_eq!(Value::Null.compare(&Value::from(1)), None);
    }

    #[test]
    fn sort_order_is_total_across_kinds() {
        let mut values = vec![
            Value::from("b"),
            Value::from(2),
            Value::Null,
            Value::from(1.5),
            Value::from(true),
            Value::Float(f64::NAN),
            Value::from("a"),
            Value::from(vec![1]),
            Value::Null,
        ];
        values.sort_by(|a, b| a.sort_cmp(b));

        assert!(values[0].is_null() && values[1].is_null());
        assert_eq!(values[2], Value::from(true));
        assert_eq!(values[3], Value::from(1.5));
        assert_eq!(values[4], Value::from(2));
        assert!(matches!(values[5], Value::Float(x) if x.is_nan()));
        assert_eq!(&values[6..], &[Value::from("a"), Value::from("b"), Value::from(vec![1])]);
    }

    #[test]
    fn int_and_float_compare_exactly() {
        let big = i64::MAX;
        assert_eq!(Value::from(big).sort_cmp(&Value::from(big as f64)), Ordering::Less);
        assert_eq!(Value::from(2).sort_cmp(&Value::from(2.0)), Ordering::Equal);
        assert_eq!(Value::from(-0.0).sort_cmp(&Value::from(0)), Ordering::Equal);
    }

    #[test]
    fn date_like_strings_deserialize_as_strings() {
        let value: Value = serde_json::from_str(r#""2024-01-02T03:04:05Z""#).unwrap();
        assert_eq!(value, Value::from("2024-01-02T03:04:05Z"));
    }

    #[test]
    fn converts_json_documents() {
        let json = serde_json::json!({"id": 1, "name": "US", "ratio": 0.5, "tags": ["a"]});
        let Value::Map(map) = Value::from(json) else {
            panic!("expected map");
        };
        assert_eq!(map["id"], Value::Int(1));
        assert_eq!(map["name"], Value::from("US"));
        assert_eq!(map["ratio"], Value::Float(0.5));
        assert_eq!(map["tags"], Value::from(vec!["a"]));
    }
}
