//! Record iteration and introspection.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::ser::SerializeStruct;

use crate::convert::convert;
use crate::error::{BoxError, Error};
use crate::reflect::{Reflect, Slot};
use crate::tags::{TagError, TagMap, parse_tags};
use crate::types::{Kind, RecordType, TypeDesc};
use crate::value::{PtrValue, Value};

/// Cached, immutable description of one exported record field.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FieldDescriptor {
    ordinal: usize,
    name: &'static str,
    #[serde(rename = "type")]
    ty: TypeDesc,
    tags: TagMap,
    embedded: bool,
}

impl FieldDescriptor {
    /// Position among all declared fields, exported or not.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ty(&self) -> &TypeDesc {
        &self.ty
    }

    pub fn kind(&self) -> Kind {
        self.ty.kind()
    }

    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key)
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }
}

/// Snapshot of a record type's exported fields.
#[derive(Debug, Clone)]
pub struct StructInfo {
    record: RecordType,
    fields: Arc<[FieldDescriptor]>,
}

impl StructInfo {
    pub fn name(&self) -> &'static str {
        self.record.name()
    }

    pub fn record_type(&self) -> RecordType {
        self.record
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether both snapshots come from the same cached descriptor list.
    pub fn shares_descriptors(&self, other: &StructInfo) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }
}

impl serde::Serialize for StructInfo {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_struct("StructInfo", 2)?;
        out.serialize_field("name", self.name())?;
        out.serialize_field("fields", self.fields())?;
        out.end()
    }
}

/// Descriptor lists per record type.
///
/// Entries are computed on first use and never evicted: the set of record
/// types in a process is finite. Concurrent first lookups may both compute
/// the list; the first one stored is the one every caller gets from then on.
#[derive(Debug, Default)]
pub struct StructCache {
    entries: RwLock<HashMap<TypeId, Arc<[FieldDescriptor]>>>,
}

impl StructCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by the free functions of this crate.
    pub fn global() -> &'static StructCache {
        static GLOBAL: OnceLock<StructCache> = OnceLock::new();
        GLOBAL.get_or_init(StructCache::new)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Exported field descriptors of `record`, computing them on first use.
    pub fn descriptors(&self, record: RecordType) -> Result<Arc<[FieldDescriptor]>, TagError> {
        if let Some(fields) = self.read().get(&record.type_id()) {
            tracing::trace!(record = record.name(), "struct descriptors cache hit");
            return Ok(Arc::clone(fields));
        }

        let computed: Arc<[FieldDescriptor]> = describe(record)?.into();

        let mut guard = self.write();
        let fields = Arc::clone(guard.entry(record.type_id()).or_insert(computed));
        tracing::debug!(
            record = record.name(),
            fields = fields.len(),
            "cached struct descriptors"
        );
        Ok(fields)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Arc<[FieldDescriptor]>>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("struct cache read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Arc<[FieldDescriptor]>>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("struct cache write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

fn describe(record: RecordType) -> Result<Vec<FieldDescriptor>, TagError> {
    record
        .fields()
        .into_iter()
        .enumerate()
        .filter(|(_, decl)| decl.exported)
        .map(|(ordinal, decl)| -> Result<FieldDescriptor, TagError> {
            Ok(FieldDescriptor {
                ordinal,
                name: decl.name,
                tags: parse_tags(decl.tag)?,
                ty: decl.ty,
                embedded: decl.embedded,
            })
        })
        .collect()
}

/// Resolves the record a target location holds or points at.
///
/// Typed locations are addressed in place. A dynamic `Value` location only
/// qualifies when it holds a reference (`Value::Ptr`) to a record.
fn record_shape(target: &dyn Slot) -> Result<RecordType, Error> {
    let dynamic = target.declared_type().is_any();
    let ty = target.runtime_type();

    match &ty {
        TypeDesc::Ptr(elem) => match elem.record() {
            Some(_) if target.is_nil() => Err(Error::NilStructPointer(ty.clone())),
            Some(record) => Ok(record),
            None => Err(Error::NotStruct(ty.clone())),
        },
        TypeDesc::Record(record) if !dynamic => Ok(*record),
        _ if dynamic => Err(Error::NotStructPointer(ty.clone())),
        _ => Err(Error::NotStruct(ty.clone())),
    }
}

/// Walks records against a descriptor cache.
#[derive(Debug, Clone, Copy)]
pub struct Walker<'c> {
    cache: &'c StructCache,
}

impl Walker<'static> {
    /// A walker over [`StructCache::global`].
    pub fn global() -> Self {
        Self::new(StructCache::global())
    }
}

impl Default for Walker<'static> {
    fn default() -> Self {
        Self::global()
    }
}

impl<'c> Walker<'c> {
    pub fn new(cache: &'c StructCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &'c StructCache {
        self.cache
    }

    /// Field metadata of the record `target` holds or points at.
    pub fn struct_info(&self, target: &dyn Slot) -> Result<StructInfo, Error> {
        let record = record_shape(target)?;
        self.info(record)
    }

    /// Field metadata of a record type, or of a reference to one.
    pub fn struct_info_for(&self, ty: &TypeDesc) -> Result<StructInfo, Error> {
        let record = match ty {
            TypeDesc::Record(record) => *record,
            TypeDesc::Ptr(elem) => elem.record().ok_or_else(|| Error::NotStruct(ty.clone()))?,
            _ => return Err(Error::NotStruct(ty.clone())),
        };
        self.info(record)
    }

    pub fn struct_info_of<R: Reflect>(&self) -> Result<StructInfo, Error> {
        self.struct_info_for(&R::type_desc())
    }

    /// Calls `visit` once per exported field of the record `target` holds
    /// or points at, in declaration order.
    ///
    /// The first visitor error stops the walk and comes back as
    /// [`Error::Field`], with the visitor's error as its `source()`.
    pub fn for_each<F>(&self, target: &mut dyn Slot, mut visit: F) -> Result<(), Error>
    where
        F: FnMut(FieldHandle<'_>) -> Result<(), BoxError>,
    {
        let record_type = record_shape(target)?;
        let fields = self.cache.descriptors(record_type)?;

        let ty = target.runtime_type();
        let record = target
            .as_record()
            .ok_or_else(|| Error::NilStructPointer(ty))?;

        for field in fields.iter() {
            let slot = record
                .field_mut(field.ordinal)
                .ok_or(Error::FieldUnavailable {
                    record: record_type.name(),
                    field: field.name,
                })?;

            visit(FieldHandle { field, slot }).map_err(|source| Error::Field {
                name: field.name,
                ty: field.ty.clone(),
                source,
            })?;
        }

        Ok(())
    }

    fn info(&self, record: RecordType) -> Result<StructInfo, Error> {
        let fields = self.cache.descriptors(record)?;
        Ok(StructInfo { record, fields })
    }
}

/// Read/write access to one field during a visitor call.
pub struct FieldHandle<'a> {
    field: &'a FieldDescriptor,
    slot: &'a mut dyn Slot,
}

impl<'a> FieldHandle<'a> {
    pub fn descriptor(&self) -> &'a FieldDescriptor {
        self.field
    }

    pub fn name(&self) -> &'static str {
        self.field.name
    }

    pub fn ty(&self) -> &'a TypeDesc {
        &self.field.ty
    }

    pub fn kind(&self) -> Kind {
        self.field.kind()
    }

    pub fn tags(&self) -> &'a TagMap {
        &self.field.tags
    }

    pub fn tag(&self, key: &str) -> Option<&'a str> {
        self.field.tags.get(key)
    }

    pub fn is_embedded(&self) -> bool {
        self.field.embedded
    }

    /// Current contents of the field.
    pub fn value(&self) -> Value {
        self.slot.get()
    }

    /// The live field storage, e.g. to walk a nested record in place.
    pub fn slot(&mut self) -> &mut dyn Slot {
        &mut *self.slot
    }

    /// Converts `value` to the field's type and stores it immediately.
    ///
    /// Sequence fields are rebuilt element by element and replaced as a
    /// whole; if any element fails the field keeps its old contents.
    pub fn set(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        let converted = match &self.field.ty {
            TypeDesc::Seq(elem) => self.sequence(value, elem)?,
            ty => convert(value, ty)?,
        };
        self.slot.put(converted)?;
        Ok(())
    }

    fn sequence(&self, value: Value, elem: &TypeDesc) -> Result<Value, Error> {
        let value = match value {
            Value::Ptr(PtrValue {
                target: Some(target),
                ..
            }) => *target,
            other => other,
        };

        let seq = match value {
            Value::Seq(seq) => seq,
            other => {
                return Err(Error::ExpectedSlice {
                    field: self.field.name,
                    field_type: self.field.ty.clone(),
                    value: other.to_string(),
                    found: other.type_desc(),
                });
            }
        };

        let items = seq
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                convert(item, elem).map_err(|source| Error::Element {
                    container: self.field.name.to_owned(),
                    index,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Value::seq(elem.clone(), items))
    }
}

/// [`Walker::for_each`] over the process-wide cache.
pub fn for_each<F>(target: &mut dyn Slot, visit: F) -> Result<(), Error>
where
    F: FnMut(FieldHandle<'_>) -> Result<(), BoxError>,
{
    Walker::global().for_each(target, visit)
}

/// [`Walker::struct_info`] over the process-wide cache.
pub fn struct_info(target: &dyn Slot) -> Result<StructInfo, Error> {
    Walker::global().struct_info(target)
}

/// [`Walker::struct_info_for`] over the process-wide cache.
pub fn struct_info_for(ty: &TypeDesc) -> Result<StructInfo, Error> {
    Walker::global().struct_info_for(ty)
}

/// [`Walker::struct_info_of`] over the process-wide cache.
pub fn struct_info_of<R: Reflect>() -> Result<StructInfo, Error> {
    Walker::global().struct_info_of::<R>()
}
