//! Generic field mapping: walk the fields of any record, or the elements of
//! any sequence, and write values into them with automatic type conversion.
//!
//! The caller supplies a visitor; for every visible field the visitor gets a
//! handle with the field's name, type and parsed tags, and decides whether and
//! what to write. Where values come from (environment, JSON, a database row)
//! is entirely the visitor's business.
//!
//! ```ignore
//! use fieldmap::Record;
//!
//! #[derive(Record, Clone, Debug, Default)]
//! struct Config {
//!     #[fieldmap(tag = r#"env:"PORT""#)]
//!     pub port: u16,
//! }
//!
//! let mut config = Config::default();
//! fieldmap::for_each(&mut config, |mut field| {
//!     if let Some(var) = field.tag("env") {
//!         field.set(std::env::var(var)?.parse::<i64>()?)?;
//!     }
//!     Ok(())
//! })?;
//! ```

extern crate self as fieldmap;

pub mod convert;
pub mod error;
pub mod reflect;
pub mod slices;
pub mod structs;
pub mod tags;
pub mod types;
pub mod value;

pub use convert::{Converter, convert};
pub use error::{BoxError, ConvertError, Error};
pub use reflect::{Record, Reflect, Sequence, Slot};
pub use slices::ElementHandle;
pub use structs::{
    FieldDescriptor, FieldHandle, StructCache, StructInfo, Walker, for_each, struct_info,
    struct_info_for, struct_info_of,
};
pub use tags::{TagError, TagMap, parse_tags};
pub use types::{FieldDecl, Kind, RecordType, TypeDesc};
pub use value::{MapValue, PtrValue, SeqValue, Value};

pub use fieldmap_derive::Record;
