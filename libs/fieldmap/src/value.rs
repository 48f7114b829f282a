use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::ser::{SerializeMap, SerializeSeq};

use crate::reflect::{Record, Reflect};
use crate::types::TypeDesc;

/// Dynamic value handed to the engine by callers.
///
/// Every value knows its own runtime type ([`Value::type_desc`]), which is
/// what the converter negotiates against a field's declared type.
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    Str(String),
    Ptr(PtrValue),
    Seq(SeqValue),
    Map(MapValue),
    Record(Box<dyn Record>),
}

/// Nullable reference to a value of type `elem`.
#[derive(Clone, Debug, PartialEq)]
pub struct PtrValue {
    pub elem: TypeDesc,
    pub target: Option<Box<Value>>,
}

/// Sequence of values declared as `Vec<elem>`.
///
/// Items of an `Any` sequence may each carry a different runtime type.
#[derive(Clone, Debug, PartialEq)]
pub struct SeqValue {
    pub elem: TypeDesc,
    pub items: Vec<Value>,
}

#[derive(Clone, Debug)]
pub struct MapValue {
    pub key: TypeDesc,
    pub value: TypeDesc,
    pub entries: Vec<(Value, Value)>,
}

impl MapValue {
    /// Looks up a string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for MapValue {
    /// Entry order is not significant.
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.value == other.value
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|entry| other.entries.iter().any(|candidate| candidate == entry))
    }
}

impl Value {
    /// A nil reference to `elem`.
    pub fn nil(elem: TypeDesc) -> Self {
        Value::Ptr(PtrValue { elem, target: None })
    }

    /// A non-nil reference to `value`.
    pub fn pointer(value: impl Into<Value>) -> Self {
        let value = value.into();
        Value::Ptr(PtrValue {
            elem: value.type_desc(),
            target: Some(Box::new(value)),
        })
    }

    pub fn seq(elem: TypeDesc, items: Vec<Value>) -> Self {
        Value::Seq(SeqValue { elem, items })
    }

    /// Heterogeneous list, `Vec<Value>`.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::seq(TypeDesc::Any, items.into_iter().map(Into::into).collect())
    }

    pub fn record<R: Record>(record: R) -> Self {
        Value::Record(Box::new(record))
    }

    /// Captures any reflectable value.
    pub fn of<T: Reflect>(value: T) -> Self {
        value.into_value()
    }

    /// Runtime type of this value.
    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Value::Bool(_) => TypeDesc::Bool,
            Value::I8(_) => TypeDesc::I8,
            Value::I16(_) => TypeDesc::I16,
            Value::I32(_) => TypeDesc::I32,
            Value::I64(_) => TypeDesc::I64,
            Value::Isize(_) => TypeDesc::Isize,
            Value::U8(_) => TypeDesc::U8,
            Value::U16(_) => TypeDesc::U16,
            Value::U32(_) => TypeDesc::U32,
            Value::U64(_) => TypeDesc::U64,
            Value::Usize(_) => TypeDesc::Usize,
            Value::F32(_) => TypeDesc::F32,
            Value::F64(_) => TypeDesc::F64,
            Value::Str(_) => TypeDesc::Str,
            Value::Ptr(ptr) => TypeDesc::ptr(ptr.elem.clone()),
            Value::Seq(seq) => TypeDesc::seq(seq.elem.clone()),
            Value::Map(map) => TypeDesc::map(map.key.clone(), map.value.clone()),
            Value::Record(record) => TypeDesc::Record(record.record_type()),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Ptr(PtrValue { target: None, .. }))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&SeqValue> {
        match self {
            Value::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Follows a non-nil reference, returns `self` otherwise.
    pub fn resolve(&self) -> &Value {
        match self {
            Value::Ptr(PtrValue {
                target: Some(target),
                ..
            }) => target,
            other => other,
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Bool(v) => Value::Bool(*v),
            Value::I8(v) => Value::I8(*v),
            Value::I16(v) => Value::I16(*v),
            Value::I32(v) => Value::I32(*v),
            Value::I64(v) => Value::I64(*v),
            Value::Isize(v) => Value::Isize(*v),
            Value::U8(v) => Value::U8(*v),
            Value::U16(v) => Value::U16(*v),
            Value::U32(v) => Value::U32(*v),
            Value::U64(v) => Value::U64(*v),
            Value::Usize(v) => Value::Usize(*v),
            Value::F32(v) => Value::F32(*v),
            Value::F64(v) => Value::F64(*v),
            Value::Str(v) => Value::Str(v.clone()),
            Value::Ptr(v) => Value::Ptr(v.clone()),
            Value::Seq(v) => Value::Seq(v.clone()),
            Value::Map(v) => Value::Map(v.clone()),
            Value::Record(v) => Value::Record(v.clone_record()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::Isize(a), Value::Isize(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::Usize(a), Value::Usize(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Ptr(a), Value::Ptr(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => records_eq(a.as_ref(), b.as_ref()),
            _ => false,
        }
    }
}

/// Same record type and equal exported field values.
fn records_eq(a: &dyn Record, b: &dyn Record) -> bool {
    let record_type = a.record_type();
    if record_type != b.record_type() {
        return false;
    }
    record_type
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, decl)| decl.exported)
        .all(|(ordinal, _)| match (a.field(ordinal), b.field(ordinal)) {
            (Some(x), Some(y)) => x.get() == y.get(),
            (None, None) => true,
            _ => false,
        })
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v:?}"),
            Value::I8(v) => write!(f, "{v:?}i8"),
            Value::I16(v) => write!(f, "{v:?}i16"),
            Value::I32(v) => write!(f, "{v:?}i32"),
            Value::I64(v) => write!(f, "{v:?}i64"),
            Value::Isize(v) => write!(f, "{v:?}isize"),
            Value::U8(v) => write!(f, "{v:?}u8"),
            Value::U16(v) => write!(f, "{v:?}u16"),
            Value::U32(v) => write!(f, "{v:?}u32"),
            Value::U64(v) => write!(f, "{v:?}u64"),
            Value::Usize(v) => write!(f, "{v:?}usize"),
            Value::F32(v) => write!(f, "{v:?}f32"),
            Value::F64(v) => write!(f, "{v:?}f64"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Ptr(PtrValue { target: None, .. }) => f.write_str("None"),
            Value::Ptr(PtrValue {
                target: Some(target),
                ..
            }) => f.debug_tuple("Some").field(target).finish(),
            Value::Seq(seq) => f.debug_list().entries(&seq.items).finish(),
            Value::Map(map) => f
                .debug_map()
                .entries(map.entries.iter().map(|(k, v)| (k, v)))
                .finish(),
            Value::Record(record) => write!(f, "{record:?}"),
        }
    }
}

/// Plain rendering used in error messages: strings unquoted, references
/// shown as their target.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::Isize(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::Usize(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
            Value::Ptr(PtrValue { target: None, .. }) => f.write_str("nil"),
            Value::Ptr(PtrValue {
                target: Some(target),
                ..
            }) => write!(f, "&{target}"),
            Value::Seq(seq) => {
                f.write_str("[")?;
                for (i, item) in seq.items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Record(record) => write!(f, "{record:?}"),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::I8(v) => serializer.serialize_i8(*v),
            Value::I16(v) => serializer.serialize_i16(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::Isize(v) => serializer.serialize_i64(*v as i64),
            Value::U8(v) => serializer.serialize_u8(*v),
            Value::U16(v) => serializer.serialize_u16(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::Usize(v) => serializer.serialize_u64(*v as u64),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Ptr(PtrValue { target: None, .. }) => serializer.serialize_none(),
            Value::Ptr(PtrValue {
                target: Some(target),
                ..
            }) => serializer.serialize_some(target.as_ref()),
            Value::Seq(seq) => {
                let mut out = serializer.serialize_seq(Some(seq.items.len()))?;
                for item in &seq.items {
                    out.serialize_element(item)?;
                }
                out.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.entries.len()))?;
                for (k, v) in &map.entries {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Record(record) => {
                let decls = record.record_type().fields();
                let mut out = serializer.serialize_map(None)?;
                for (ordinal, decl) in decls.iter().enumerate() {
                    if !decl.exported {
                        continue;
                    }
                    if let Some(slot) = record.field(ordinal) {
                        out.serialize_entry(decl.name, &slot.get())?;
                    }
                }
                out.end()
            }
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    String => Str,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl<T: Reflect> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        v.into_value()
    }
}

impl<T: Reflect> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.into_value()
    }
}

impl<K, V> From<HashMap<K, V>> for Value
where
    K: Reflect + Eq + Hash,
    V: Reflect,
{
    fn from(v: HashMap<K, V>) -> Self {
        v.into_value()
    }
}

/// JSON documents bind as `Value` trees: arrays become `Vec<Value>`,
/// objects become `HashMap<String, Value>`, `null` a nil reference.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::nil(TypeDesc::Any),
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::I64(i)
                } else if let Some(u) = n.as_u64() {
                    Value::U64(u)
                } else {
                    Value::F64(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::seq(TypeDesc::Any, items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(object) => Value::Map(MapValue {
                key: TypeDesc::Str,
                value: TypeDesc::Any,
                entries: object
                    .into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_types() {
        assert_eq!(Value::from(3u8).type_desc(), TypeDesc::U8);
        assert_eq!(
            Value::from(vec![1.5f64]).type_desc(),
            TypeDesc::seq(TypeDesc::F64)
        );
        assert_eq!(
            Value::pointer(7i32).type_desc(),
            TypeDesc::ptr(TypeDesc::I32)
        );
        assert_eq!(Value::list([1i64]).type_desc(), TypeDesc::seq(TypeDesc::Any));
    }

    #[test]
    fn display_is_plain() {
        assert_eq!(Value::from("example-value").to_string(), "example-value");
        assert_eq!(Value::from(vec![1i64, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(Value::nil(TypeDesc::I32).to_string(), "nil");
    }

    #[test]
    fn json_documents_become_value_trees() {
        let json = serde_json::json!({
            "id": 42,
            "name": "fake",
            "ratio": 0.5,
            "tags": ["a", "b"],
            "parent": null,
        });
        let value = Value::from(json);
        let map = value.as_map().unwrap();
        assert_eq!(map.get("id"), Some(&Value::I64(42)));
        assert_eq!(map.get("name").and_then(Value::as_str), Some("fake"));
        assert_eq!(map.get("ratio"), Some(&Value::F64(0.5)));
        assert_eq!(
            map.get("tags"),
            Some(&Value::list(["a", "b"]))
        );
        assert!(map.get("parent").is_some_and(Value::is_nil));
        assert_eq!(map.get("missing"), None);
    }

    #[test]
    fn serializes_to_json() {
        let value = Value::list([Value::from(1i32), Value::from("x"), Value::nil(TypeDesc::Any)]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[1,"x",null]"#);
    }
}
