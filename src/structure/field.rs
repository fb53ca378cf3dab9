// Tue Jan 13 2026 - Alex

use crate::structure::{FieldKind, FloatWidth, IntWidth, PlatformInt, StructId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declaration of one struct field, as handed over by whoever declares the type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    bits: Option<u32>,
    alignment: Option<usize>,
    offset: Option<usize>,
    union_member: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            bits: None,
            alignment: None,
            offset: None,
            union_member: false,
        }
    }

    pub fn signed(name: impl Into<String>, width: IntWidth) -> Self {
        Self::new(name, FieldKind::Signed(width))
    }

    pub fn unsigned(name: impl Into<String>, width: IntWidth) -> Self {
        Self::new(name, FieldKind::Unsigned(width))
    }

    pub fn float(name: impl Into<String>, width: FloatWidth) -> Self {
        Self::new(name, FieldKind::Float(width))
    }

    pub fn platform(name: impl Into<String>, kind: PlatformInt) -> Self {
        Self::new(name, FieldKind::Platform(kind))
    }

    pub fn pointer(name: impl Into<String>, target: FieldKind) -> Self {
        Self::new(name, FieldKind::pointer_to(target))
    }

    pub fn nested(name: impl Into<String>, id: impl Into<StructId>) -> Self {
        Self::new(name, FieldKind::Struct(id.into()))
    }

    pub fn array(name: impl Into<String>, element: FieldKind, len: usize) -> Self {
        Self::new(name, FieldKind::array_of(element, len))
    }

    /// Declares the field as a bit-field of `bits` bits inside a word of its integral kind.
    pub fn with_bits(mut self, bits: u32) -> Self {
        self.bits = Some(bits);
        self
    }

    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn union_member(mut self) -> Self {
        self.union_member = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn bits(&self) -> Option<u32> {
        self.bits
    }

    pub fn alignment(&self) -> Option<usize> {
        self.alignment
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn is_union_member(&self) -> bool {
        self.union_member
    }

    pub fn is_bitfield(&self) -> bool {
        self.bits.is_some()
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        if let Some(bits) = self.bits {
            write!(f, " : {}", bits)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " @ 0x{:X}", offset)?;
        }
        Ok(())
    }
}
