//! Dynamic Property Values
//!
//! A [`Store`] holds string-keyed slots of [`Value`]. The variants mirror
//! plain JSON data plus two runtime-only kinds:
//!
//! - [`Value::Store`]: an object that has already been wrapped. Reading a
//!   plain [`Value::Object`] out of a store replaces it with this variant.
//! - [`Value::Function`]: a callable payload (an event handler, say). It is
//!   handed back untouched and never tracked.
//!
//! Arrays are opaque data. Their elements are never wrapped, so mutating an
//! array means writing a new array to the slot.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

use crate::reactive::{Observer, Store, StoreId};

/// Ordered key/value pairs of a plain, not-yet-wrapped object.
pub type Map = IndexMap<String, Value>;

/// A property value held by a store.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent or explicit null.
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Opaque list; elements are never wrapped.
    Array(Vec<Value>),
    /// Plain object, wrapped lazily on first read through a store.
    Object(Map),
    /// Wrapped object.
    Store(Store),
    /// Non-reactive callable payload.
    Function(Observer),
}

impl Value {
    /// Human-readable name of this value's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Store(_) => "store",
            Value::Function(_) => "function",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is object-shaped, wrapped or not.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Store(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_store(&self) -> Option<&Store> {
        match self {
            Value::Store(store) => Some(store),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Observer> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Convert to plain JSON without recording any reads.
    ///
    /// Functions become `null`, as does a store that (directly or through
    /// nested stores) contains itself at the point where it recurs.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_within(&mut Vec::new())
    }

    /// `to_json` with the stack of stores currently being snapshotted.
    pub(crate) fn to_json_within(&self, visiting: &mut Vec<StoreId>) -> serde_json::Value {
        match self {
            Value::Null | Value::Function(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(|v| v.to_json_within(visiting)).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_within(visiting)))
                    .collect(),
            ),
            Value::Store(store) => store.to_json_within(visiting),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality for data; identity for stores and functions.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => numbers_eq(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Store(a), Value::Store(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

/// Numeric equality that never rounds integers through `f64`.
fn numbers_eq(a: &Number, b: &Number) -> bool {
    match (a.is_f64(), b.is_f64()) {
        (false, false) => a == b,
        (true, true) => a.as_f64() == b.as_f64(),
        (true, false) => a.as_f64().is_some_and(|f| float_eq_int(f, b)),
        (false, true) => b.as_f64().is_some_and(|f| float_eq_int(f, a)),
    }
}

/// Whether float `f` is exactly the integer held by `n`.
fn float_eq_int(f: f64, n: &Number) -> bool {
    // 2^63 and 2^64 are exactly representable; casts below them are exact
    // for integral floats.
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
    const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

    if !f.is_finite() || f.fract() != 0.0 {
        return false;
    }
    if let Some(i) = n.as_i64() {
        (-I64_BOUND..I64_BOUND).contains(&f) && f as i64 == i
    } else if let Some(u) = n.as_u64() {
        (0.0..U64_BOUND).contains(&f) && f as u64 == u
    } else {
        false
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Value::Store(store) => f.debug_tuple("Store").field(&store.id()).finish(),
            Value::Function(func) => f.debug_tuple("Function").field(&func.id()).finish(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::Function(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Store(store) => store.serialize(serializer),
        }
    }
}

// ----------------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------------

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for Value {
    /// Non-finite floats have no JSON representation and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::from(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl From<Store> for Value {
    fn from(store: Store) -> Self {
        Value::Store(store)
    }
}

impl From<Observer> for Value {
    fn from(func: Observer) -> Self {
        Value::Function(func)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
