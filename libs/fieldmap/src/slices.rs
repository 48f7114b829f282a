//! Sequence iteration and append.

use crate::convert::convert;
use crate::error::{BoxError, Error};
use crate::reflect::{Sequence, Slot};
use crate::types::{Kind, TypeDesc};
use crate::value::Value;

/// Checks that `target` holds, or points at, a sequence.
///
/// A nil reference to a sequence is reported as nil input. A dynamic `Value`
/// location only qualifies when it holds a reference (`Value::Ptr`).
fn sequence_shape(target: &dyn Slot) -> Result<(), Error> {
    let dynamic = target.declared_type().is_any();
    let ty = target.runtime_type();

    match &ty {
        TypeDesc::Ptr(elem) if elem.is_sequence() => {
            if target.is_nil() {
                Err(Error::NilInput)
            } else {
                Ok(())
            }
        }
        TypeDesc::Ptr(_) => Err(Error::NotSlice(ty.clone())),
        TypeDesc::Seq(_) if !dynamic => Ok(()),
        _ if dynamic => Err(Error::NotSlicePointer(ty.clone())),
        _ => Err(Error::NotSlice(ty.clone())),
    }
}

fn sequence(target: &mut dyn Slot) -> Result<&mut dyn Sequence, Error> {
    sequence_shape(target)?;
    target.as_sequence().ok_or(Error::NilInput)
}

/// Read/write access to one element during a visitor call.
pub struct ElementHandle<'a> {
    index: usize,
    elem: &'a TypeDesc,
    container: &'a TypeDesc,
    slot: &'a mut dyn Slot,
}

impl<'a> ElementHandle<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn ty(&self) -> &'a TypeDesc {
        self.elem
    }

    pub fn kind(&self) -> Kind {
        self.elem.kind()
    }

    pub fn value(&self) -> Value {
        self.slot.get()
    }

    pub fn slot(&mut self) -> &mut dyn Slot {
        &mut *self.slot
    }

    /// Converts `value` to the element type and stores it in place.
    pub fn set(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        let converted = convert(value.into(), self.elem).map_err(|source| Error::Element {
            container: self.container.to_string(),
            index: self.index,
            source,
        })?;
        self.slot.put(converted)?;
        Ok(())
    }
}

/// Calls `visit` once per element of the sequence `target` holds or points
/// at, in index order. An empty sequence never calls `visit`.
///
/// The first visitor error stops the walk and comes back as [`Error::Item`],
/// with the visitor's error as its `source()`.
pub fn for_each<F>(target: &mut dyn Slot, mut visit: F) -> Result<(), Error>
where
    F: FnMut(ElementHandle<'_>) -> Result<(), BoxError>,
{
    let seq = sequence(target)?;
    let elem = seq.elem_type();
    let container = TypeDesc::seq(elem.clone());

    for index in 0..seq.len() {
        let Some(slot) = seq.item_mut(index) else {
            break;
        };

        visit(ElementHandle {
            index,
            elem: &elem,
            container: &container,
            slot,
        })
        .map_err(|source| Error::Item {
            index,
            ty: elem.clone(),
            source,
        })?;
    }

    Ok(())
}

/// Converts every item to the element type of `target`, then appends them
/// all at once.
///
/// If any item fails to convert nothing is appended. No items is a no-op.
pub fn append<I, V>(target: &mut dyn Slot, items: I) -> Result<(), Error>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let seq = sequence(target)?;
    let elem = seq.elem_type();

    let converted = items
        .into_iter()
        .map(|item| {
            let item = item.into();
            let value = item.to_string();
            convert(item, &elem).map_err(|source| Error::Append {
                value,
                elem: elem.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if converted.is_empty() {
        return Ok(());
    }

    tracing::trace!(elem = %elem, items = converted.len(), "appending to sequence");
    seq.push_values(converted)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visits_every_element_in_order() {
        let mut items = vec!["a".to_owned(), "b".to_owned()];
        let mut seen = Vec::new();
        for_each(&mut items, |item| {
            seen.push((item.index(), item.kind(), item.value()));
            Ok(())
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![
                (0, Kind::String, Value::from("a")),
                (1, Kind::String, Value::from("b")),
            ]
        );
    }

    #[test]
    fn shape_errors() {
        let mut missing: Option<Vec<i32>> = None;
        let err = for_each(&mut missing, |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::NilInput));

        let mut by_value = Value::from(vec![1i32]);
        let err = for_each(&mut by_value, |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("expected slice pointer"), "{err}");

        let mut scalar = 3i32;
        let err = for_each(&mut scalar, |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("can only get slice info from slices"), "{err}");
    }

    #[test]
    fn dynamic_reference_to_sequence_is_walked() {
        let mut target = Value::pointer(vec![1i64, 2]);
        append(&mut target, [3u8]).unwrap();
        assert_eq!(target, Value::pointer(vec![1i64, 2, 3]));
    }
}
