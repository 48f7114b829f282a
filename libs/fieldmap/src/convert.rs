//! Value conversion.
//!
//! Given a source [`Value`] and a target [`TypeDesc`], produce a value that
//! can be stored in a location of the target type. The rules are tried in a fixed order
//! and the first one that applies wins:
//!
//! 1. a dynamic (`Value`) target: assign as-is, nil and references
//!    included;
//! 2. pointer source, non-pointer target: dereference and retry
//!    (nil fails);
//! 3. pointer target, non-pointer source: convert to the pointee and box;
//! 4. sequence to sequence: convert element-wise into a new sequence;
//! 5. identical types: assign as-is;
//! 6. an untyped nil (`Value::nil(TypeDesc::Any)`) becomes a nil of the
//!    target reference type;
//! 7. numeric to numeric: `as` cast to the target width;
//! 8. anything else fails, naming both types.
//!
//! Reordering these changes results, e.g. a reference to a sequence must be
//! dereferenced before the sequence rule sees it.

use crate::error::ConvertError;
use crate::types::TypeDesc;
use crate::value::{PtrValue, Value};

/// Converts one source value to whatever target type is asked of it.
#[derive(Debug, Clone)]
pub struct Converter {
    source: Value,
}

impl Converter {
    pub fn new(source: impl Into<Value>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &Value {
        &self.source
    }

    pub fn convert(self, target: &TypeDesc) -> Result<Value, ConvertError> {
        convert(self.source, target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Deref,
    Box,
    Elementwise,
    Assign,
    /// An untyped nil reference fits any reference type.
    Nil,
    Numeric,
    Incompatible,
}

fn route(source: &Value, target: &TypeDesc) -> Route {
    let source_type = source.type_desc();

    if target.is_any() {
        Route::Assign
    } else if source_type.is_pointer() && !target.is_pointer() {
        Route::Deref
    } else if target.is_pointer() && !source_type.is_pointer() {
        Route::Box
    } else if source_type.is_sequence() && target.is_sequence() {
        Route::Elementwise
    } else if source_type == *target {
        Route::Assign
    } else if source.is_nil() && source_type.elem().is_some_and(TypeDesc::is_any) {
        Route::Nil
    } else if source_type.is_numeric() && target.is_numeric() {
        Route::Numeric
    } else {
        Route::Incompatible
    }
}

/// Converts `source` into a value of type `target`.
pub fn convert(source: Value, target: &TypeDesc) -> Result<Value, ConvertError> {
    match route(&source, target) {
        Route::Deref => match source {
            Value::Ptr(PtrValue {
                target: Some(inner),
                ..
            }) => convert(*inner, target),
            _ => Err(ConvertError::Nil {
                target: target.clone(),
            }),
        },
        Route::Box => match target {
            TypeDesc::Ptr(elem) => {
                let inner = convert(source, elem)?;
                Ok(Value::Ptr(PtrValue {
                    elem: (**elem).clone(),
                    target: Some(Box::new(inner)),
                }))
            }
            _ => Err(ConvertError::incompatible(&source, target)),
        },
        Route::Elementwise => elementwise(source, target),
        Route::Nil => match target {
            TypeDesc::Ptr(elem) => Ok(Value::nil((**elem).clone())),
            _ => Err(ConvertError::incompatible(&source, target)),
        },
        Route::Assign => Ok(source),
        Route::Numeric => {
            numeric(&source, target).ok_or_else(|| ConvertError::incompatible(&source, target))
        }
        Route::Incompatible => Err(ConvertError::incompatible(&source, target)),
    }
}

fn elementwise(source: Value, target: &TypeDesc) -> Result<Value, ConvertError> {
    match (source, target) {
        (Value::Seq(seq), TypeDesc::Seq(elem)) => {
            let from = TypeDesc::seq(seq.elem.clone());
            let items = seq
                .items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    convert(item, elem).map_err(|source| ConvertError::Element {
                        index,
                        from: from.clone(),
                        to: target.clone(),
                        source: Box::new(source),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::seq((**elem).clone(), items))
        }
        (source, _) => Err(ConvertError::incompatible(&source, target)),
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

fn number(value: &Value) -> Option<Number> {
    Some(match *value {
        Value::I8(v) => Number::Signed(v.into()),
        Value::I16(v) => Number::Signed(v.into()),
        Value::I32(v) => Number::Signed(v.into()),
        Value::I64(v) => Number::Signed(v),
        Value::Isize(v) => Number::Signed(v as i64),
        Value::U8(v) => Number::Unsigned(v.into()),
        Value::U16(v) => Number::Unsigned(v.into()),
        Value::U32(v) => Number::Unsigned(v.into()),
        Value::U64(v) => Number::Unsigned(v),
        Value::Usize(v) => Number::Unsigned(v as u64),
        Value::F32(v) => Number::Float(v.into()),
        Value::F64(v) => Number::Float(v),
        _ => return None,
    })
}

fn numeric(source: &Value, target: &TypeDesc) -> Option<Value> {
    let n = number(source)?;

    macro_rules! cast {
        ($variant:ident, $t:ty) => {
            Value::$variant(match n {
                Number::Signed(v) => v as $t,
                Number::Unsigned(v) => v as $t,
                Number::Float(v) => v as $t,
            })
        };
    }

    Some(match target {
        TypeDesc::I8 => cast!(I8, i8),
        TypeDesc::I16 => cast!(I16, i16),
        TypeDesc::I32 => cast!(I32, i32),
        TypeDesc::I64 => cast!(I64, i64),
        TypeDesc::Isize => cast!(Isize, isize),
        TypeDesc::U8 => cast!(U8, u8),
        TypeDesc::U16 => cast!(U16, u16),
        TypeDesc::U32 => cast!(U32, u32),
        TypeDesc::U64 => cast!(U64, u64),
        TypeDesc::Usize => cast!(Usize, usize),
        TypeDesc::F32 => cast!(F32, f32),
        TypeDesc::F64 => cast!(F64, f64),
        _ => return None,
    })
}
