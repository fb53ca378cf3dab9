// Fri Jan 16 2026 - Alex

use crate::marshal::codec::{sign_extend, truncate};
use crate::marshal::io::{check_bounds, read_field, read_value, store_bits, write_field, write_value};
use crate::marshal::{StructIO, StructValue, Value};
use crate::memory::{Address, TypedMemoryView};
use crate::structure::{FieldKind, FieldLayout, FloatWidth, MarshalError, PlatformInt, ResolvedKind};
use bitflags::Flags;

// Single-field accessors. Each one touches only the bytes of the field it
// names, using the same offset and mask arithmetic as the whole-struct calls.

macro_rules! integral_accessors {
    ($($ty:ty => $get:ident, $set:ident;)*) => {
        $(
            pub fn $get(&self, view: &dyn TypedMemoryView, index: usize) -> Result<$ty, MarshalError> {
                let field = self.integral_field(index)?;
                Ok(self.load_integral(field, view)? as $ty)
            }

            pub fn $set(&self, view: &mut dyn TypedMemoryView, index: usize, value: $ty) -> Result<(), MarshalError> {
                let field = self.integral_field(index)?;
                self.store_integral(field, view, value as u64)
            }
        )*
    };
}

macro_rules! platform_accessors {
    ($($kind:ident: $ty:ty => $get:ident, $set:ident;)*) => {
        $(
            pub fn $get(&self, view: &dyn TypedMemoryView, index: usize) -> Result<$ty, MarshalError> {
                let field = self.platform_field(index, PlatformInt::$kind)?;
                Ok(self.load_integral(field, view)? as $ty)
            }

            /// Bits above the platform width of the field are dropped.
            pub fn $set(&self, view: &mut dyn TypedMemoryView, index: usize, value: $ty) -> Result<(), MarshalError> {
                let field = self.platform_field(index, PlatformInt::$kind)?;
                self.store_integral(field, view, value as u64)
            }
        )*
    };
}

impl StructIO {
    integral_accessors! {
        i8 => get_i8_field, set_i8_field;
        i16 => get_i16_field, set_i16_field;
        i32 => get_i32_field, set_i32_field;
        i64 => get_i64_field, set_i64_field;
        u8 => get_u8_field, set_u8_field;
        u16 => get_u16_field, set_u16_field;
        u32 => get_u32_field, set_u32_field;
        u64 => get_u64_field, set_u64_field;
    }

    platform_accessors! {
        SizeT: u64 => get_size_t_field, set_size_t_field;
        Long: i64 => get_long_field, set_long_field;
        ULong: u64 => get_ulong_field, set_ulong_field;
        TimeT: i64 => get_time_t_field, set_time_t_field;
    }

    pub fn field_index(&self, name: &str) -> Result<usize, MarshalError> {
        self.layout
            .field_index(name)
            .ok_or_else(|| MarshalError::FieldNotFound(name.to_string()))
    }

    /// Decoded value of any field.
    pub fn get_field(&self, view: &dyn TypedMemoryView, index: usize) -> Result<Value, MarshalError> {
        let field = self.field(index)?;
        read_field(field, view, 0, self.layout.size())
    }

    pub fn set_field(&self, view: &mut dyn TypedMemoryView, index: usize, value: &Value) -> Result<(), MarshalError> {
        let field = self.field(index)?;
        write_field(field, value, view, 0, self.layout.size())
    }

    pub fn get_f32_field(&self, view: &dyn TypedMemoryView, index: usize) -> Result<f32, MarshalError> {
        Ok(self.get_f64_field(view, index)? as f32)
    }

    pub fn set_f32_field(&self, view: &mut dyn TypedMemoryView, index: usize, value: f32) -> Result<(), MarshalError> {
        self.set_f64_field(view, index, value as f64)
    }

    pub fn get_f64_field(&self, view: &dyn TypedMemoryView, index: usize) -> Result<f64, MarshalError> {
        let field = self.float_field(index)?;
        let value = self.get_field(view, index)?;
        value.as_f64().ok_or_else(|| self.kind_error(field, "float"))
    }

    pub fn set_f64_field(&self, view: &mut dyn TypedMemoryView, index: usize, value: f64) -> Result<(), MarshalError> {
        self.float_field(index)?;
        self.set_field(view, index, &Value::Float(value))
    }

    pub fn get_bool_field(&self, view: &dyn TypedMemoryView, index: usize) -> Result<bool, MarshalError> {
        let field = self.field(index)?;
        if *field.kind() != FieldKind::Bool {
            return Err(self.kind_error(field, "bool"));
        }
        Ok(self.load_integral(field, view)? != 0)
    }

    pub fn set_bool_field(&self, view: &mut dyn TypedMemoryView, index: usize, value: bool) -> Result<(), MarshalError> {
        let field = self.field(index)?;
        if *field.kind() != FieldKind::Bool {
            return Err(self.kind_error(field, "bool"));
        }
        self.store_integral(field, view, value as u64)
    }

    pub fn get_pointer_field(&self, view: &dyn TypedMemoryView, index: usize) -> Result<Address, MarshalError> {
        let field = self.pointer_field(index)?;
        check_bounds(field.byte_offset(), field.byte_length(), self.layout.size())?;
        Ok(view.get_address_at(field.byte_offset())?.truncate(field.byte_length()))
    }

    pub fn set_pointer_field(&self, view: &mut dyn TypedMemoryView, index: usize, value: Address) -> Result<(), MarshalError> {
        let field = self.pointer_field(index)?;
        check_bounds(field.byte_offset(), field.byte_length(), self.layout.size())?;
        view.set_address_at(field.byte_offset(), value.truncate(field.byte_length()))?;
        Ok(())
    }

    /// Reads an embedded struct field in full.
    pub fn get_struct_field(&self, view: &dyn TypedMemoryView, index: usize) -> Result<StructValue, MarshalError> {
        let field = self.struct_field(index)?;
        match self.get_field(view, index)? {
            Value::Struct(value) => Ok(value),
            _ => Err(self.kind_error(field, "struct")),
        }
    }

    pub fn set_struct_field(&self, view: &mut dyn TypedMemoryView, index: usize, value: &StructValue) -> Result<(), MarshalError> {
        self.struct_field(index)?;
        self.set_field(view, index, &Value::Struct(value.clone()))
    }

    pub fn get_enum_field(&self, view: &dyn TypedMemoryView, index: usize) -> Result<u64, MarshalError> {
        let field = self.enum_field(index)?;
        self.load_integral(field, view)
    }

    pub fn set_enum_field(&self, view: &mut dyn TypedMemoryView, index: usize, value: u64) -> Result<(), MarshalError> {
        let field = self.enum_field(index)?;
        self.store_integral(field, view, value)
    }

    /// Reads an enum field as a flag set. Unknown bits are kept.
    pub fn get_flags_field<F>(&self, view: &dyn TypedMemoryView, index: usize) -> Result<F, MarshalError>
    where
        F: Flags,
        F::Bits: TryFrom<u64>,
    {
        let field = self.enum_field(index)?;
        let raw = self.load_integral(field, view)?;
        let bits = F::Bits::try_from(raw).map_err(|_| MarshalError::ValueOutOfRange {
            field: field.name().to_string(),
            value: raw,
        })?;
        Ok(F::from_bits_retain(bits))
    }

    pub fn set_flags_field<F>(&self, view: &mut dyn TypedMemoryView, index: usize, flags: F) -> Result<(), MarshalError>
    where
        F: Flags,
        F::Bits: Into<u64>,
    {
        let field = self.enum_field(index)?;
        self.store_integral(field, view, flags.bits().into())
    }

    /// Raw, unsigned content of a bit-field.
    pub fn get_bits_field(&self, view: &dyn TypedMemoryView, index: usize) -> Result<u64, MarshalError> {
        let field = self.bitfield(index)?;
        let raw = self.load_integral(field, view)?;
        Ok(truncate(raw, field.bit_slot().map_or(64, |slot| slot.bits)))
    }

    /// Stores the low bits of `value` into a bit-field; the rest of the word is preserved.
    pub fn set_bits_field(&self, view: &mut dyn TypedMemoryView, index: usize, value: u64) -> Result<(), MarshalError> {
        let field = self.bitfield(index)?;
        self.store_integral(field, view, value)
    }

    pub fn get_array_element(&self, view: &dyn TypedMemoryView, index: usize, element: usize) -> Result<Value, MarshalError> {
        let (_, resolved, offset) = self.array_element(index, element)?;
        read_value(resolved, view, offset, self.layout.size())
    }

    pub fn set_array_element(
        &self,
        view: &mut dyn TypedMemoryView,
        index: usize,
        element: usize,
        value: &Value,
    ) -> Result<(), MarshalError> {
        let (field, resolved, offset) = self.array_element(index, element)?;
        write_value(field.name(), resolved, value, view, offset, self.layout.size())
    }

    fn field(&self, index: usize) -> Result<&FieldLayout, MarshalError> {
        self.layout
            .field_at(index)
            .ok_or_else(|| MarshalError::FieldNotFound(format!("{}#{}", self.layout.name(), index)))
    }

    fn kind_error(&self, field: &FieldLayout, requested: &str) -> MarshalError {
        MarshalError::KindMismatch {
            field: field.name().to_string(),
            expected: field.kind().to_string(),
            found: requested.to_string(),
        }
    }

    fn integral_field(&self, index: usize) -> Result<&FieldLayout, MarshalError> {
        let field = self.field(index)?;
        match field.kind() {
            FieldKind::Signed(_) | FieldKind::Unsigned(_) | FieldKind::Enum(_) | FieldKind::Platform(_) => Ok(field),
            _ => Err(self.kind_error(field, "integer")),
        }
    }

    fn platform_field(&self, index: usize, kind: PlatformInt) -> Result<&FieldLayout, MarshalError> {
        let field = self.field(index)?;
        if *field.kind() == FieldKind::Platform(kind) {
            Ok(field)
        } else {
            Err(self.kind_error(field, &FieldKind::Platform(kind).to_string()))
        }
    }

    fn float_field(&self, index: usize) -> Result<&FieldLayout, MarshalError> {
        let field = self.field(index)?;
        match field.kind() {
            FieldKind::Float(FloatWidth::F32 | FloatWidth::F64) => Ok(field),
            _ => Err(self.kind_error(field, "float")),
        }
    }

    fn pointer_field(&self, index: usize) -> Result<&FieldLayout, MarshalError> {
        let field = self.field(index)?;
        if field.kind().is_pointer() {
            Ok(field)
        } else {
            Err(self.kind_error(field, "pointer"))
        }
    }

    fn struct_field(&self, index: usize) -> Result<&FieldLayout, MarshalError> {
        let field = self.field(index)?;
        if field.kind().is_struct() {
            Ok(field)
        } else {
            Err(self.kind_error(field, "struct"))
        }
    }

    fn enum_field(&self, index: usize) -> Result<&FieldLayout, MarshalError> {
        let field = self.field(index)?;
        if matches!(field.kind(), FieldKind::Enum(_)) {
            Ok(field)
        } else {
            Err(self.kind_error(field, "enum"))
        }
    }

    fn bitfield(&self, index: usize) -> Result<&FieldLayout, MarshalError> {
        let field = self.field(index)?;
        if field.is_bitfield() {
            Ok(field)
        } else {
            Err(self.kind_error(field, "bit-field"))
        }
    }

    fn array_element(&self, index: usize, element: usize) -> Result<(&FieldLayout, &ResolvedKind, usize), MarshalError> {
        let field = self.field(index)?;
        match field.resolved() {
            ResolvedKind::Array { element: resolved, len } => {
                if element >= *len {
                    return Err(MarshalError::IndexOutOfRange {
                        field: field.name().to_string(),
                        index: element,
                        len: *len,
                    });
                }
                Ok((field, resolved.as_ref(), field.byte_offset() + element * resolved.size()))
            }
            _ => Err(self.kind_error(field, "array")),
        }
    }

    /// Integral content of a scalar or bit-field, sign-extended for signed kinds.
    fn load_integral(&self, field: &FieldLayout, view: &dyn TypedMemoryView) -> Result<u64, MarshalError> {
        let width = field.byte_length();
        check_bounds(field.byte_offset(), width, self.layout.size())?;
        let word = view.get_at(field.byte_offset(), width)?;
        let (raw, bits) = match field.bit_slot() {
            Some(slot) => ((word & slot.mask) >> slot.offset, slot.bits),
            None => (word, width as u32 * 8),
        };
        Ok(if field.kind().is_signed() {
            sign_extend(raw, bits) as u64
        } else {
            truncate(raw, bits)
        })
    }

    fn store_integral(&self, field: &FieldLayout, view: &mut dyn TypedMemoryView, value: u64) -> Result<(), MarshalError> {
        let width = field.byte_length();
        check_bounds(field.byte_offset(), width, self.layout.size())?;
        match field.bit_slot() {
            Some(slot) => store_bits(view, field.byte_offset(), width, slot, value),
            None => {
                view.set_at(field.byte_offset(), width, truncate(value, width as u32 * 8))?;
                Ok(())
            }
        }
    }
}
