use crate::tags::TagError;
use crate::types::TypeDesc;
use crate::value::Value;

/// Error type visitors return. Anything `?`-able converts into it.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A value that does not fit a target type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error("cannot convert nil to {target}")]
    Nil { target: TypeDesc },

    #[error("cannot convert {value} of type {from} to {to}")]
    Incompatible {
        value: String,
        from: TypeDesc,
        to: TypeDesc,
    },

    #[error("error converting element {index} of {from} to {to}: {source}")]
    Element {
        index: usize,
        from: TypeDesc,
        to: TypeDesc,
        source: Box<ConvertError>,
    },

    #[error("value {value} of type {found} does not fit {expected}")]
    Mismatch {
        value: String,
        found: TypeDesc,
        expected: TypeDesc,
    },

    #[error("type {found} does not fit {expected}")]
    TypeMismatch { found: TypeDesc, expected: TypeDesc },
}

impl ConvertError {
    pub fn incompatible(value: &Value, to: &TypeDesc) -> Self {
        ConvertError::Incompatible {
            value: value.to_string(),
            from: value.type_desc(),
            to: to.clone(),
        }
    }

    pub fn mismatch(value: &Value, expected: TypeDesc) -> Self {
        ConvertError::Mismatch {
            value: value.to_string(),
            found: value.type_desc(),
            expected,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("expected struct pointer but got: {0}")]
    NotStructPointer(TypeDesc),

    #[error("expected non-nil pointer to struct, but got: nil {0}")]
    NilStructPointer(TypeDesc),

    #[error("can only get struct info from structs, but got: {0}")]
    NotStruct(TypeDesc),

    #[error("unexpected nil input")]
    NilInput,

    #[error("expected slice pointer but got: {0}")]
    NotSlicePointer(TypeDesc),

    #[error("can only get slice info from slices, but got: {0}")]
    NotSlice(TypeDesc),

    #[error("expected slice for field {field} of type {field_type} but got {value} of type {found}")]
    ExpectedSlice {
        field: &'static str,
        field_type: TypeDesc,
        value: String,
        found: TypeDesc,
    },

    /// One element of a sequence write failed; nothing was stored.
    #[error("error converting {container}[{index}]: {source}")]
    Element {
        container: String,
        index: usize,
        source: ConvertError,
    },

    /// One item of an append failed; nothing was appended.
    #[error("error converting {value} to {elem}: {source}")]
    Append {
        value: String,
        elem: TypeDesc,
        source: ConvertError,
    },

    #[error("field {field} of {record} has no accessor")]
    FieldUnavailable {
        record: &'static str,
        field: &'static str,
    },

    /// A visitor failed on this field. `source()` is the visitor's error.
    #[error("iteration error on field '{name}' of type '{ty}': {source}")]
    Field {
        name: &'static str,
        ty: TypeDesc,
        source: BoxError,
    },

    /// A visitor failed on this item. `source()` is the visitor's error.
    #[error("iteration error on item '{index}' of type '{ty}': {source}")]
    Item {
        index: usize,
        ty: TypeDesc,
        source: BoxError,
    },
}
