use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::reflect::Record;

/// Static type descriptor.
///
/// This is the "declared type" side of every conversion: field tables carry
/// one per field and the converter targets one. The set of variants is
/// closed: anything the engine can read or write is spelled with it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Str,
    /// Nullable reference (`Option<T>`).
    Ptr(Box<TypeDesc>),
    /// Ordered, homogeneous sequence (`Vec<T>`).
    Seq(Box<TypeDesc>),
    /// `HashMap<K, V>`.
    Map(Box<TypeDesc>, Box<TypeDesc>),
    Record(RecordType),
    /// Dynamic slot, holds a value of any type (`Value`).
    Any,
}

/// Coarse grouping of [`TypeDesc`] variants, handy for visitor dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Pointer,
    Sequence,
    Map,
    Record,
    Any,
}

impl TypeDesc {
    pub fn ptr(elem: TypeDesc) -> Self {
        TypeDesc::Ptr(Box::new(elem))
    }

    pub fn seq(elem: TypeDesc) -> Self {
        TypeDesc::Seq(Box::new(elem))
    }

    pub fn map(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Map(Box::new(key), Box::new(value))
    }

    pub fn kind(&self) -> Kind {
        match self {
            TypeDesc::Bool => Kind::Bool,
            TypeDesc::I8 | TypeDesc::I16 | TypeDesc::I32 | TypeDesc::I64 | TypeDesc::Isize => {
                Kind::Int
            }
            TypeDesc::U8 | TypeDesc::U16 | TypeDesc::U32 | TypeDesc::U64 | TypeDesc::Usize => {
                Kind::Uint
            }
            TypeDesc::F32 | TypeDesc::F64 => Kind::Float,
            TypeDesc::Str => Kind::String,
            TypeDesc::Ptr(_) => Kind::Pointer,
            TypeDesc::Seq(_) => Kind::Sequence,
            TypeDesc::Map(..) => Kind::Map,
            TypeDesc::Record(_) => Kind::Record,
            TypeDesc::Any => Kind::Any,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeDesc::Ptr(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, TypeDesc::Seq(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind(), Kind::Int | Kind::Uint | Kind::Float)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TypeDesc::Any)
    }

    /// Pointee of a `Ptr` or element of a `Seq`.
    pub fn elem(&self) -> Option<&TypeDesc> {
        match self {
            TypeDesc::Ptr(elem) | TypeDesc::Seq(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn record(&self) -> Option<RecordType> {
        match self {
            TypeDesc::Record(record) => Some(*record),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Bool => f.write_str("bool"),
            TypeDesc::I8 => f.write_str("i8"),
            TypeDesc::I16 => f.write_str("i16"),
            TypeDesc::I32 => f.write_str("i32"),
            TypeDesc::I64 => f.write_str("i64"),
            TypeDesc::Isize => f.write_str("isize"),
            TypeDesc::U8 => f.write_str("u8"),
            TypeDesc::U16 => f.write_str("u16"),
            TypeDesc::U32 => f.write_str("u32"),
            TypeDesc::U64 => f.write_str("u64"),
            TypeDesc::Usize => f.write_str("usize"),
            TypeDesc::F32 => f.write_str("f32"),
            TypeDesc::F64 => f.write_str("f64"),
            TypeDesc::Str => f.write_str("String"),
            TypeDesc::Ptr(elem) => write!(f, "Option<{elem}>"),
            TypeDesc::Seq(elem) => write!(f, "Vec<{elem}>"),
            TypeDesc::Map(key, value) => write!(f, "HashMap<{key}, {value}>"),
            TypeDesc::Record(record) => f.write_str(record.name()),
            TypeDesc::Any => f.write_str("Value"),
        }
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl serde::Serialize for TypeDesc {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identity and field table of a record type.
///
/// Two `RecordType`s are equal when they describe the same Rust type. The
/// field table is produced lazily; `StructCache` is what guarantees it is
/// turned into descriptors only once.
#[derive(Clone, Copy)]
pub struct RecordType {
    name: &'static str,
    type_id: TypeId,
    fields: fn() -> Vec<FieldDecl>,
}

impl RecordType {
    pub fn new(name: &'static str, type_id: TypeId, fields: fn() -> Vec<FieldDecl>) -> Self {
        Self {
            name,
            type_id,
            fields,
        }
    }

    pub fn of<R: Record>() -> Self {
        Self::new(R::record_name(), TypeId::of::<R>(), R::field_decls)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Declared fields in declaration order, including non-exported ones.
    pub fn fields(&self) -> Vec<FieldDecl> {
        (self.fields)()
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for RecordType {}

impl Hash for RecordType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordType").field(&self.name).finish()
    }
}

/// One entry of a record's field table.
///
/// `#[derive(Record)]` emits these; hand-written `Record` impls build them
/// with the builder methods:
///
/// ```ignore
/// FieldDecl::new("home", TypeDesc::Str).tag(r#"env:"HOME""#)
/// ```
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: &'static str,
    pub ty: TypeDesc,
    /// Raw, unparsed tag text.
    pub tag: &'static str,
    pub embedded: bool,
    /// Non-exported fields are invisible to the walkers.
    pub exported: bool,
}

impl FieldDecl {
    pub fn new(name: &'static str, ty: TypeDesc) -> Self {
        Self {
            name,
            ty,
            tag: "",
            embedded: false,
            exported: true,
        }
    }

    pub fn tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }
}
