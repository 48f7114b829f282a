//! The traits that stand in for runtime reflection.
//!
//! - [`Reflect`]: a concrete type that can be read into and rebuilt from a
//!   [`Value`]. Implemented here for scalars, `String`, `Option<T>`,
//!   `Vec<T>`, `HashMap<K, V>` and `Value` itself, and by `#[derive(Record)]`.
//! - [`Slot`]: object-safe view of a settable location; every `Reflect`
//!   type is one.
//! - [`Record`]: a record with a field table and per-ordinal accessors.
//! - [`Sequence`]: object-safe view of a growable sequence.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::ConvertError;
use crate::types::{FieldDecl, RecordType, TypeDesc};
use crate::value::{MapValue, PtrValue, SeqValue, Value};

pub trait Reflect: Sized + 'static {
    /// Declared type of `Self`.
    fn type_desc() -> TypeDesc;

    fn to_value(&self) -> Value;

    fn into_value(self) -> Value {
        self.to_value()
    }

    /// Rebuilds `Self` from a value whose runtime type is exactly
    /// `Self::type_desc()`. Use the converter to get there from anything else.
    fn from_value(value: Value) -> Result<Self, ConvertError>;

    /// Type of the value currently held; differs from the declared type
    /// only for dynamic slots.
    fn value_type(&self) -> TypeDesc {
        Self::type_desc()
    }

    fn is_null(&self) -> bool {
        false
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        None
    }

    fn as_sequence_mut(&mut self) -> Option<&mut dyn Sequence> {
        None
    }
}

/// A typed, settable location: a record field, a sequence element, or any
/// variable the caller hands to a walker.
pub trait Slot {
    fn declared_type(&self) -> TypeDesc;

    fn runtime_type(&self) -> TypeDesc;

    fn is_nil(&self) -> bool;

    /// Snapshot of the current contents.
    fn get(&self) -> Value;

    /// Stores a value already converted to the declared type.
    fn put(&mut self, value: Value) -> Result<(), ConvertError>;

    /// The record this location holds or points at.
    fn as_record(&mut self) -> Option<&mut dyn Record>;

    /// The sequence this location holds or points at.
    fn as_sequence(&mut self) -> Option<&mut dyn Sequence>;
}

impl<T: Reflect> Slot for T {
    fn declared_type(&self) -> TypeDesc {
        T::type_desc()
    }

    fn runtime_type(&self) -> TypeDesc {
        Reflect::value_type(self)
    }

    fn is_nil(&self) -> bool {
        Reflect::is_null(self)
    }

    fn get(&self) -> Value {
        Reflect::to_value(self)
    }

    fn put(&mut self, value: Value) -> Result<(), ConvertError> {
        *self = T::from_value(value)?;
        Ok(())
    }

    fn as_record(&mut self) -> Option<&mut dyn Record> {
        Reflect::as_record_mut(self)
    }

    fn as_sequence(&mut self) -> Option<&mut dyn Sequence> {
        Reflect::as_sequence_mut(self)
    }
}

/// A record type with a field table.
///
/// Normally produced by `#[derive(Record)]`. Hand-written impls must keep
/// `field`/`field_mut` ordinals aligned with `field_decls`.
pub trait Record: fmt::Debug + 'static {
    fn record_name() -> &'static str
    where
        Self: Sized;

    /// All declared fields, exported or not, in declaration order.
    fn field_decls() -> Vec<FieldDecl>
    where
        Self: Sized;

    fn record_type(&self) -> RecordType;

    fn field(&self, ordinal: usize) -> Option<&dyn Slot>;

    fn field_mut(&mut self, ordinal: usize) -> Option<&mut dyn Slot>;

    fn clone_record(&self) -> Box<dyn Record>;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// `Reflect::from_value` for record types.
pub fn record_from_value<R: Record + Reflect>(value: Value) -> Result<R, ConvertError> {
    match value {
        Value::Record(record) if record.record_type().type_id() == TypeId::of::<R>() => {
            let found = TypeDesc::Record(record.record_type());
            record
                .into_any()
                .downcast::<R>()
                .map(|record| *record)
                .map_err(|_| ConvertError::TypeMismatch {
                    found,
                    expected: R::type_desc(),
                })
        }
        other => Err(ConvertError::mismatch(&other, R::type_desc())),
    }
}

pub trait Sequence {
    fn elem_type(&self) -> TypeDesc;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn item(&self, index: usize) -> Option<&dyn Slot>;

    fn item_mut(&mut self, index: usize) -> Option<&mut dyn Slot>;

    /// Appends values already converted to the element type. Either all of
    /// them land or none do.
    fn push_values(&mut self, items: Vec<Value>) -> Result<(), ConvertError>;
}

macro_rules! reflect_scalar {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Reflect for $t {
                fn type_desc() -> TypeDesc {
                    TypeDesc::$variant
                }

                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> Result<Self, ConvertError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(ConvertError::mismatch(&other, TypeDesc::$variant)),
                    }
                }
            }
        )*
    };
}

reflect_scalar! {
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

impl<T: Reflect> Reflect for Option<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::ptr(T::type_desc())
    }

    fn to_value(&self) -> Value {
        Value::Ptr(PtrValue {
            elem: T::type_desc(),
            target: self.as_ref().map(|v| Box::new(v.to_value())),
        })
    }

    fn into_value(self) -> Value {
        Value::Ptr(PtrValue {
            elem: T::type_desc(),
            target: self.map(|v| Box::new(v.into_value())),
        })
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Ptr(PtrValue { target, .. }) => {
                target.map(|target| T::from_value(*target)).transpose()
            }
            other => Err(ConvertError::mismatch(&other, Self::type_desc())),
        }
    }

    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        self.as_mut().and_then(|inner| inner.as_record_mut())
    }

    fn as_sequence_mut(&mut self) -> Option<&mut dyn Sequence> {
        self.as_mut().and_then(|inner| inner.as_sequence_mut())
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::seq(T::type_desc())
    }

    fn to_value(&self) -> Value {
        Value::Seq(SeqValue {
            elem: T::type_desc(),
            items: self.iter().map(Reflect::to_value).collect(),
        })
    }

    fn into_value(self) -> Value {
        Value::Seq(SeqValue {
            elem: T::type_desc(),
            items: self.into_iter().map(Reflect::into_value).collect(),
        })
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Seq(seq) => seq.items.into_iter().map(T::from_value).collect(),
            other => Err(ConvertError::mismatch(&other, Self::type_desc())),
        }
    }

    fn as_sequence_mut(&mut self) -> Option<&mut dyn Sequence> {
        Some(self)
    }
}

impl<T: Reflect> Sequence for Vec<T> {
    fn elem_type(&self) -> TypeDesc {
        T::type_desc()
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn item(&self, index: usize) -> Option<&dyn Slot> {
        self.as_slice().get(index).map(|item| item as &dyn Slot)
    }

    fn item_mut(&mut self, index: usize) -> Option<&mut dyn Slot> {
        self.as_mut_slice()
            .get_mut(index)
            .map(|item| item as &mut dyn Slot)
    }

    fn push_values(&mut self, items: Vec<Value>) -> Result<(), ConvertError> {
        let items = items
            .into_iter()
            .map(T::from_value)
            .collect::<Result<Vec<T>, _>>()?;
        self.extend(items);
        Ok(())
    }
}

impl<K, V> Reflect for HashMap<K, V>
where
    K: Reflect + Eq + Hash,
    V: Reflect,
{
    fn type_desc() -> TypeDesc {
        TypeDesc::map(K::type_desc(), V::type_desc())
    }

    fn to_value(&self) -> Value {
        Value::Map(MapValue {
            key: K::type_desc(),
            value: V::type_desc(),
            entries: self
                .iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        })
    }

    fn into_value(self) -> Value {
        Value::Map(MapValue {
            key: K::type_desc(),
            value: V::type_desc(),
            entries: self
                .into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        })
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Map(map) => map
                .entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(ConvertError::mismatch(&other, Self::type_desc())),
        }
    }
}

/// `Value` is the dynamic slot: it accepts anything and reports the runtime
/// type of whatever it currently holds.
impl Reflect for Value {
    fn type_desc() -> TypeDesc {
        TypeDesc::Any
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        Ok(value)
    }

    fn value_type(&self) -> TypeDesc {
        Value::type_desc(self)
    }

    fn is_null(&self) -> bool {
        self.is_nil()
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        match self {
            Value::Ptr(PtrValue {
                target: Some(target),
                ..
            }) => match &mut **target {
                Value::Record(record) => Some(&mut **record),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_sequence_mut(&mut self) -> Option<&mut dyn Sequence> {
        match self {
            Value::Ptr(PtrValue {
                target: Some(target),
                ..
            }) => match &mut **target {
                Value::Seq(seq) => Some(seq),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Sequence for SeqValue {
    fn elem_type(&self) -> TypeDesc {
        self.elem.clone()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn item(&self, index: usize) -> Option<&dyn Slot> {
        self.items.as_slice().get(index).map(|item| item as &dyn Slot)
    }

    fn item_mut(&mut self, index: usize) -> Option<&mut dyn Slot> {
        self.items
            .as_mut_slice()
            .get_mut(index)
            .map(|item| item as &mut dyn Slot)
    }

    fn push_values(&mut self, items: Vec<Value>) -> Result<(), ConvertError> {
        self.items.extend(items);
        Ok(())
    }
}
