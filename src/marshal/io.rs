// Fri Jan 16 2026 - Alex

use crate::config::LayoutConfig;
use crate::marshal::codec::{decode_scalar, encode_scalar, mismatch, truncate};
use crate::marshal::{StructValue, Value};
use crate::memory::TypedMemoryView;
use crate::structure::{
    BitSlot, FieldLayout, MarshalError, ResolvedKind, StructComparator, StructLayout,
};
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::sync::Arc;

/// Reads and writes instances of one struct type through a [`TypedMemoryView`].
///
/// Holds no per-instance state: every call works on the view it is given and
/// forgets it afterwards.
#[derive(Debug, Clone)]
pub struct StructIO {
    pub(crate) layout: Arc<StructLayout>,
    zero_fill_padding: bool,
}

impl StructIO {
    pub fn new(layout: Arc<StructLayout>) -> Self {
        Self {
            layout,
            zero_fill_padding: false,
        }
    }

    pub fn with_config(layout: Arc<StructLayout>, config: &LayoutConfig) -> Self {
        Self {
            layout,
            zero_fill_padding: config.zero_fill_padding,
        }
    }

    pub fn layout(&self) -> &Arc<StructLayout> {
        &self.layout
    }

    /// Stores every field present in `instance`. On error the struct may be
    /// partially written.
    pub fn write_all(&self, instance: &StructValue, view: &mut dyn TypedMemoryView) -> Result<(), MarshalError> {
        let size = self.layout.size();
        write_struct(&self.layout, instance, view, 0, size, self.zero_fill_padding)
    }

    /// Loads every field of the struct into `instance`.
    pub fn read_all(&self, instance: &mut StructValue, view: &dyn TypedMemoryView) -> Result<(), MarshalError> {
        read_struct(&self.layout, instance, view, 0, self.layout.size())
    }

    pub fn read(&self, view: &dyn TypedMemoryView) -> Result<StructValue, MarshalError> {
        let mut instance = StructValue::new();
        self.read_all(&mut instance, view)?;
        Ok(instance)
    }

    pub fn compare(&self, a: &dyn TypedMemoryView, b: &dyn TypedMemoryView) -> Result<Ordering, MarshalError> {
        StructComparator::new(&self.layout).compare(a, b)
    }

    pub fn equal(&self, a: &dyn TypedMemoryView, b: &dyn TypedMemoryView) -> Result<bool, MarshalError> {
        StructComparator::new(&self.layout).equal(a, b)
    }

    /// Human-readable dump of the instance behind `view`.
    pub fn describe(&self, view: &dyn TypedMemoryView) -> Result<String, MarshalError> {
        let instance = self.read(view)?;
        let mut out = String::new();
        let _ = writeln!(out, "struct {} {{ // {} @ {}", self.layout.name(), self.layout.size(), view.base_address());
        for field in self.layout.fields() {
            if let Some(value) = instance.get(field.name()) {
                let _ = writeln!(out, "    {} {} = {}; // @ 0x{:X}", field.kind(), field.name(), value, field.byte_offset());
            }
        }
        out.push('}');
        Ok(out)
    }
}

pub(crate) fn check_bounds(offset: usize, len: usize, size: usize) -> Result<(), MarshalError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(MarshalError::OutOfBounds { offset, len, size }),
    }
}

fn in_struct_context(layout: &StructLayout, view: &dyn TypedMemoryView, base: usize, err: MarshalError) -> MarshalError {
    MarshalError::Struct {
        struct_name: layout.name().to_string(),
        instance: view.base_address() + base as u64,
        source: Box::new(err),
    }
}

fn write_struct(
    layout: &StructLayout,
    instance: &StructValue,
    view: &mut dyn TypedMemoryView,
    base: usize,
    limit: usize,
    zero_fill: bool,
) -> Result<(), MarshalError> {
    let result = write_fields(layout, instance, view, base, limit, zero_fill);
    result.map_err(|err| in_struct_context(layout, view, base, err))
}

fn write_fields(
    layout: &StructLayout,
    instance: &StructValue,
    view: &mut dyn TypedMemoryView,
    base: usize,
    limit: usize,
    zero_fill: bool,
) -> Result<(), MarshalError> {
    if let Some(unknown) = instance.names().find(|name| layout.field(name).is_none()) {
        return Err(MarshalError::FieldNotFound(unknown.to_string()));
    }
    if zero_fill {
        for span in layout.padding() {
            check_bounds(base + span.offset, span.len, limit)?;
            view.fill(base + span.offset, span.len, 0)?;
        }
    }
    for field in layout.fields() {
        if let Some(value) = instance.get(field.name()) {
            write_field(field, value, view, base, limit)?;
        }
    }
    Ok(())
}

pub(crate) fn write_field(
    field: &FieldLayout,
    value: &Value,
    view: &mut dyn TypedMemoryView,
    base: usize,
    limit: usize,
) -> Result<(), MarshalError> {
    let offset = base + field.byte_offset();
    match field.bit_slot() {
        Some(slot) => write_bits(field, slot, value, view, offset, limit),
        None => write_value(field.name(), field.resolved(), value, view, offset, limit),
    }
}

pub(crate) fn write_value(
    name: &str,
    resolved: &ResolvedKind,
    value: &Value,
    view: &mut dyn TypedMemoryView,
    offset: usize,
    limit: usize,
) -> Result<(), MarshalError> {
    match resolved {
        ResolvedKind::Scalar { kind, size, .. } => {
            check_bounds(offset, *size, limit)?;
            if kind.is_pointer() {
                let addr = value.as_address().ok_or_else(|| mismatch(name, kind, value))?;
                view.set_address_at(offset, addr.truncate(*size))?;
            } else {
                let raw = encode_scalar(name, kind, *size, value)?;
                view.set_at(offset, *size, raw)?;
            }
            Ok(())
        }
        ResolvedKind::Struct(nested) => {
            let instance = match value {
                Value::Struct(s) => s,
                other => {
                    return Err(MarshalError::KindMismatch {
                        field: name.to_string(),
                        expected: format!("struct {}", nested.name()),
                        found: other.type_name().to_string(),
                    })
                }
            };
            write_struct(nested, instance, view, offset, limit, false)
        }
        ResolvedKind::Array { element, len } => {
            let items = match value {
                Value::Array(items) => items,
                other => {
                    return Err(MarshalError::KindMismatch {
                        field: name.to_string(),
                        expected: "array".to_string(),
                        found: other.type_name().to_string(),
                    })
                }
            };
            if items.len() != *len {
                return Err(MarshalError::ArrayLength {
                    field: name.to_string(),
                    expected: *len,
                    found: items.len(),
                });
            }
            let stride = element.size();
            for (i, item) in items.iter().enumerate() {
                write_value(name, element, item, view, offset + i * stride, limit)?;
            }
            Ok(())
        }
    }
}

/// Read-modify-write of the backing word: only the bits under the slot's mask change.
fn write_bits(
    field: &FieldLayout,
    slot: BitSlot,
    value: &Value,
    view: &mut dyn TypedMemoryView,
    offset: usize,
    limit: usize,
) -> Result<(), MarshalError> {
    let width = field.byte_length();
    check_bounds(offset, width, limit)?;
    let raw = encode_scalar(field.name(), field.kind(), width, value)?;
    store_bits(view, offset, width, slot, raw)
}

pub(crate) fn store_bits(
    view: &mut dyn TypedMemoryView,
    offset: usize,
    width: usize,
    slot: BitSlot,
    raw: u64,
) -> Result<(), MarshalError> {
    let previous = view.get_at(offset, width)?;
    let word = (previous & !slot.mask) | ((raw << slot.offset) & slot.mask);
    view.set_at(offset, width, word)?;
    Ok(())
}

fn read_struct(
    layout: &StructLayout,
    instance: &mut StructValue,
    view: &dyn TypedMemoryView,
    base: usize,
    limit: usize,
) -> Result<(), MarshalError> {
    for field in layout.fields() {
        let value = read_field(field, view, base, limit).map_err(|err| in_struct_context(layout, view, base, err))?;
        instance.set(field.name(), value);
    }
    Ok(())
}

pub(crate) fn read_field(
    field: &FieldLayout,
    view: &dyn TypedMemoryView,
    base: usize,
    limit: usize,
) -> Result<Value, MarshalError> {
    let offset = base + field.byte_offset();
    match field.bit_slot() {
        Some(slot) => {
            check_bounds(offset, field.byte_length(), limit)?;
            let word = view.get_at(offset, field.byte_length())?;
            Ok(decode_scalar(field.kind(), slot.bits, (word & slot.mask) >> slot.offset))
        }
        None => read_value(field.resolved(), view, offset, limit),
    }
}

pub(crate) fn read_value(
    resolved: &ResolvedKind,
    view: &dyn TypedMemoryView,
    offset: usize,
    limit: usize,
) -> Result<Value, MarshalError> {
    match resolved {
        ResolvedKind::Scalar { kind, size, .. } => {
            check_bounds(offset, *size, limit)?;
            if kind.is_pointer() {
                let addr = view.get_address_at(offset)?;
                Ok(Value::Pointer(addr.truncate(*size)))
            } else {
                let raw = view.get_at(offset, *size)?;
                Ok(decode_scalar(kind, *size as u32 * 8, truncate(raw, *size as u32 * 8)))
            }
        }
        ResolvedKind::Struct(nested) => {
            let mut instance = StructValue::new();
            read_struct(nested, &mut instance, view, offset, limit)?;
            Ok(Value::Struct(instance))
        }
        ResolvedKind::Array { element, len } => {
            let stride = element.size();
            let items = (0..*len)
                .map(|i| read_value(element, view, offset + i * stride, limit))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(items))
        }
    }
}
