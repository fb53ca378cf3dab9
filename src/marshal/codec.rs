// Fri Jan 16 2026 - Alex

use crate::marshal::Value;
use crate::memory::Address;
use crate::structure::{FieldKind, FloatWidth, MarshalError};

/// Keeps the low `bits` bits of `raw`.
pub fn truncate(raw: u64, bits: u32) -> u64 {
    if bits >= 64 {
        raw
    } else {
        raw & ((1u64 << bits) - 1)
    }
}

/// Interprets the low `bits` bits of `raw` as a two's complement number.
pub fn sign_extend(raw: u64, bits: u32) -> i64 {
    if bits == 0 || bits >= 64 {
        return raw as i64;
    }
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

pub(crate) fn mismatch(field: &str, kind: &FieldKind, value: &Value) -> MarshalError {
    MarshalError::KindMismatch {
        field: field.to_string(),
        expected: kind.to_string(),
        found: value.type_name().to_string(),
    }
}

/// Native bits of `value` for a scalar field of `size` bytes, narrowed to that width.
pub(crate) fn encode_scalar(field: &str, kind: &FieldKind, size: usize, value: &Value) -> Result<u64, MarshalError> {
    let raw = match (kind, value) {
        (FieldKind::Float(FloatWidth::F32), Value::Float(v)) => (*v as f32).to_bits() as u64,
        (FieldKind::Float(FloatWidth::F64), Value::Float(v)) => v.to_bits(),
        (FieldKind::Bool, Value::Bool(v)) => *v as u64,
        (FieldKind::Pointer(_), v) => v.as_address().ok_or_else(|| mismatch(field, kind, v))?.as_u64(),
        (FieldKind::Signed(_) | FieldKind::Unsigned(_) | FieldKind::Enum(_) | FieldKind::Platform(_), v) => {
            v.as_u64().ok_or_else(|| mismatch(field, kind, v))?
        }
        (_, v) => return Err(mismatch(field, kind, v)),
    };
    Ok(truncate(raw, size as u32 * 8))
}

/// Shadow value for `bits` significant bits read from a scalar field.
pub(crate) fn decode_scalar(kind: &FieldKind, bits: u32, raw: u64) -> Value {
    match kind {
        FieldKind::Float(FloatWidth::F32) => Value::Float(f32::from_bits(raw as u32) as f64),
        FieldKind::Float(FloatWidth::F64) => Value::Float(f64::from_bits(raw)),
        FieldKind::Bool => Value::Bool(raw != 0),
        FieldKind::Pointer(_) => Value::Pointer(Address::new(truncate(raw, bits))),
        k if k.is_signed() => Value::Int(sign_extend(raw, bits)),
        _ => Value::UInt(truncate(raw, bits)),
    }
}
