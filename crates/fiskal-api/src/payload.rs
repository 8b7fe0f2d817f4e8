// Order-preserving wrapper around a response body.
//
// JSON objects keep their key order, JSON arrays are keyed "0", "1", ...
// and anything else becomes a one-element sequence holding the raw text.

use std::ops::Index;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::Error;

static NULL: Value = Value::Null;

/// Decoding hook for dispatcher responses.
///
/// The dispatcher hands every successful body to `R::from_response`, so the
/// caller picks the response type through a type parameter.
pub trait FromBody: Sized {
    fn from_response(status: u16, body: &str) -> Result<Self, Error>;

    /// What the client logs after a successful call.
    fn summary(&self) -> Value;
}

/// Whether the payload started life as a JSON object or as a sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Shape {
    #[default]
    Mapping,
    Sequence,
}

/// A response body with map-like access.
///
/// Writing a non-integer key into a sequence turns it into a mapping, so the
/// JSON form never drops an entry.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    items: IndexMap<String, Value>,
    shape: Shape,
    next_index: u64,
    raw: Option<String>,
    status: Option<u16>,
}

impl Payload {
    /// An empty mapping-shaped payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a raw body.
    ///
    /// Bodies shaped like `{...}` or `[...]` must parse as JSON; any other
    /// body is stored verbatim as a one-element sequence.
    pub fn from_body(raw: &str) -> Result<Self, Error> {
        let mut payload = if looks_like_json(raw) {
            let value: Value =
                serde_json::from_str(raw.trim()).map_err(|e| Error::Deserialization {
                    message: e.to_string(),
                    body: raw.to_owned(),
                })?;
            Self::from_value(value)
        } else {
            let mut seq = Self::with_shape(Shape::Sequence);
            seq.push(Value::String(raw.to_owned()));
            seq
        };
        payload.raw = Some(raw.to_owned());
        Ok(payload)
    }

    /// Wrap an already-parsed JSON value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let next_index = next_free_index(map.keys());
                Self {
                    items: map.into_iter().collect(),
                    next_index,
                    ..Self::default()
                }
            }
            Value::Array(values) => {
                let next_index = u64::try_from(values.len()).unwrap_or(u64::MAX);
                Self {
                    items: values
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v))
                        .collect(),
                    shape: Shape::Sequence,
                    next_index,
                    ..Self::default()
                }
            }
            scalar => {
                let mut seq = Self::with_shape(Shape::Sequence);
                seq.push(scalar);
                seq
            }
        }
    }

    fn with_shape(shape: Shape) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The body exactly as received, if this payload came from a response.
    pub fn raw_body(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// HTTP status of the response this payload came from.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    // ── Keyed access ─────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    /// String value under `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Integer value under `key`. Numeric strings are accepted.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Insert or overwrite `key`. An existing key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        match key.parse::<u64>() {
            Ok(index) => self.next_index = self.next_index.max(index.saturating_add(1)),
            Err(_) => self.shape = Shape::Mapping,
        }
        self.items.insert(key, value.into());
    }

    /// Append under the next free integer key.
    pub fn push(&mut self, value: impl Into<Value>) {
        let next = self.next_index;
        self.next_index = next.saturating_add(1);
        self.items.insert(next.to_string(), value.into());
    }

    pub fn has(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Remove `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.items.shift_remove(key)
    }

    // ── Conversion ───────────────────────────────────────────────────

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.items.values()
    }

    /// Keyed view, in insertion order.
    pub fn to_mapping(&self) -> Map<String, Value> {
        self.items
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Values in insertion order, keys dropped.
    pub fn to_sequence(&self) -> Vec<Value> {
        self.items.values().cloned().collect()
    }

    /// JSON form: an array for sequences, an object for mappings.
    pub fn to_value(&self) -> Value {
        match self.shape {
            Shape::Mapping => Value::Object(self.to_mapping()),
            Shape::Sequence => Value::Array(self.to_sequence()),
        }
    }

    /// Decode into a typed struct.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(self.to_value()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: self.raw.clone().unwrap_or_default(),
        })
    }

    // ── Bulk operations ──────────────────────────────────────────────

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&Value> {
        self.items.first().map(|(_, v)| v)
    }

    pub fn last(&self) -> Option<&Value> {
        self.items.last().map(|(_, v)| v)
    }

    /// Keep only the given keys, in the payload's own order.
    pub fn only<S: AsRef<str>>(&self, keys: &[S]) -> Self {
        self.filter(|k, _| keys.iter().any(|want| want.as_ref() == k))
    }

    /// Drop the given keys.
    pub fn except<S: AsRef<str>>(&self, keys: &[S]) -> Self {
        self.filter(|k, _| keys.iter().all(|skip| skip.as_ref() != k))
    }

    /// Keep entries matching `pred`. Keys are preserved.
    pub fn filter(&self, mut pred: impl FnMut(&str, &Value) -> bool) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|(k, v)| pred(k.as_str(), v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            shape: self.shape,
            next_index: self.next_index,
            raw: None,
            status: self.status,
        }
    }

    /// Transform every value. Keys are preserved.
    pub fn map(&self, mut f: impl FnMut(&str, &Value) -> Value) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|(k, v)| (k.clone(), f(k.as_str(), v)))
                .collect(),
            shape: self.shape,
            next_index: self.next_index,
            raw: None,
            status: self.status,
        }
    }

    /// Collect `field` from every object-valued entry.
    pub fn pluck(&self, field: &str) -> Vec<Value> {
        self.items
            .values()
            .filter_map(|v| v.get(field).cloned())
            .collect()
    }

    /// Run a bulk operation by name.
    ///
    /// Names are accepted in snake_case or camelCase (`is_empty`, `isEmpty`).
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        let op = to_snake_case(name);
        let value = match op.as_str() {
            "all" | "to_array" => self.to_value(),
            "to_json" => Value::String(self.to_value().to_string()),
            "count" => Value::from(self.count()),
            "is_empty" => Value::Bool(self.is_empty()),
            "is_not_empty" => Value::Bool(!self.is_empty()),
            "keys" => self.keys().map(Value::from).collect(),
            "values" => Value::Array(self.to_sequence()),
            "first" => self.first().cloned().unwrap_or(Value::Null),
            "last" => self.last().cloned().unwrap_or(Value::Null),
            "get" => {
                let key = key_args(args).into_iter().next().unwrap_or_default();
                self.get(&key)
                    .cloned()
                    .or_else(|| args.get(1).cloned())
                    .unwrap_or(Value::Null)
            }
            "has" => {
                let keys = key_args(args);
                Value::Bool(!keys.is_empty() && keys.iter().all(|k| self.has(k)))
            }
            "only" => self.only(&key_args(args)).to_value(),
            "except" => self.except(&key_args(args)).to_value(),
            "pluck" => {
                let field = key_args(args).into_iter().next().unwrap_or_default();
                Value::Array(self.pluck(&field))
            }
            _ => {
                return Err(Error::UnsupportedOperation {
                    name: name.to_owned(),
                });
            }
        };
        Ok(value)
    }
}

impl FromBody for Payload {
    fn from_response(status: u16, body: &str) -> Result<Self, Error> {
        let mut payload = Self::from_body(body)?;
        payload.status = Some(status);
        Ok(payload)
    }

    fn summary(&self) -> Value {
        self.to_value()
    }
}

impl Index<&str> for Payload {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

fn next_free_index<'a>(keys: impl Iterator<Item = &'a String>) -> u64 {
    keys.filter_map(|k| k.parse::<u64>().ok())
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

fn looks_like_json(raw: &str) -> bool {
    let trimmed = raw.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

/// Flatten positional arguments into key names (`only("a", "b")` or `only(["a", "b"])`).
fn key_args(args: &[Value]) -> Vec<String> {
    let mut keys = Vec::new();
    for arg in args {
        match arg {
            Value::Array(inner) => keys.extend(key_args(inner)),
            Value::String(s) => keys.push(s.clone()),
            Value::Null => {}
            other => keys.push(other.to_string()),
        }
    }
    keys
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
