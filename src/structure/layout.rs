// Tue Jan 13 2026 - Alex

use crate::structure::{Alignment, FieldKind, StructId, StructKind};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A half-open byte range `[offset, offset + len)` inside a struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn shifted(&self, by: usize) -> Self {
        Self::new(self.offset + by, self.len)
    }

    pub fn intersects(&self, other: &Span) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:X}, 0x{:X})", self.offset, self.end())
    }
}

/// Position of a bit-field inside its backing word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitSlot {
    pub offset: u32,
    pub bits: u32,
    /// Bits owned by the field, already shifted into place.
    pub mask: u64,
}

impl BitSlot {
    pub fn new(offset: u32, bits: u32) -> Self {
        let low = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
        Self { offset, bits, mask: low << offset }
    }
}

/// Storage shape of a field once nested types are resolved.
#[derive(Debug, Clone)]
pub enum ResolvedKind {
    Scalar { kind: FieldKind, size: usize, alignment: Alignment },
    Struct(Arc<StructLayout>),
    Array { element: Box<ResolvedKind>, len: usize },
}

impl ResolvedKind {
    pub fn size(&self) -> usize {
        match self {
            Self::Scalar { size, .. } => *size,
            Self::Struct(layout) => layout.size(),
            Self::Array { element, len } => element.size() * len,
        }
    }

    pub fn alignment(&self) -> Alignment {
        match self {
            Self::Scalar { alignment, .. } => *alignment,
            Self::Struct(layout) => layout.alignment(),
            Self::Array { element, .. } => element.alignment(),
        }
    }

    pub fn has_pointers(&self) -> bool {
        match self {
            Self::Scalar { kind, .. } => kind.is_pointer(),
            Self::Struct(layout) => layout.has_pointers(),
            Self::Array { element, .. } => element.has_pointers(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldLayout {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) resolved: ResolvedKind,
    pub(crate) byte_offset: usize,
    pub(crate) byte_length: usize,
    pub(crate) alignment: Alignment,
    pub(crate) bit_slot: Option<BitSlot>,
    pub(crate) explicit_offset: bool,
    pub(crate) union_group: Option<usize>,
}

impl FieldLayout {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn resolved(&self) -> &ResolvedKind {
        &self.resolved
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Bytes occupied by the field; the whole backing word for bit-fields.
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    pub fn span(&self) -> Span {
        Span::new(self.byte_offset, self.byte_length)
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn bit_slot(&self) -> Option<BitSlot> {
        self.bit_slot
    }

    pub fn is_bitfield(&self) -> bool {
        self.bit_slot.is_some()
    }

    pub fn bit_offset(&self) -> u32 {
        self.bit_slot.map_or(0, |slot| slot.offset)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.resolved, ResolvedKind::Array { .. })
    }

    pub fn array_length(&self) -> Option<usize> {
        match &self.resolved {
            ResolvedKind::Array { len, .. } => Some(*len),
            _ => None,
        }
    }

    pub fn element_size(&self) -> usize {
        match &self.resolved {
            ResolvedKind::Array { element, .. } => element.size(),
            other => other.size(),
        }
    }

    pub fn nested_layout(&self) -> Option<&Arc<StructLayout>> {
        match &self.resolved {
            ResolvedKind::Struct(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn has_explicit_offset(&self) -> bool {
        self.explicit_offset
    }

    pub fn union_group(&self) -> Option<usize> {
        self.union_group
    }
}

impl fmt::Display for FieldLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ 0x{:X} ({} bytes)", self.kind, self.name, self.byte_offset, self.byte_length)?;
        if let Some(slot) = self.bit_slot {
            write!(f, " : {} bits at {}", slot.bits, slot.offset)?;
        }
        Ok(())
    }
}

/// Concrete native layout of one struct type. Immutable once built.
#[derive(Debug, Clone)]
pub struct StructLayout {
    id: StructId,
    kind: StructKind,
    fields: Vec<FieldLayout>,
    field_map: AHashMap<String, usize>,
    size: usize,
    alignment: Alignment,
    solid_ranges: Vec<Span>,
    padding: Vec<Span>,
    has_pointers: bool,
}

impl StructLayout {
    pub(crate) fn new(
        id: StructId,
        kind: StructKind,
        fields: Vec<FieldLayout>,
        size: usize,
        alignment: Alignment,
    ) -> Self {
        let field_map = fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.name.clone(), idx))
            .collect();
        let has_pointers = fields.iter().any(|f| f.resolved.has_pointers());
        let mut layout = Self {
            id,
            kind,
            fields,
            field_map,
            size,
            alignment,
            solid_ranges: Vec::new(),
            padding: Vec::new(),
            has_pointers,
        };
        layout.solid_ranges = crate::structure::solid::solid_ranges(&layout);
        layout.padding = crate::structure::solid::padding_spans(&layout);
        layout
    }

    pub fn id(&self) -> &StructId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    pub fn kind(&self) -> StructKind {
        self.kind
    }

    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.field_map.get(name).map(|&idx| &self.fields[idx])
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.field_map.get(name).copied()
    }

    pub fn field_at(&self, index: usize) -> Option<&FieldLayout> {
        self.fields.get(index)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Byte ranges that hold plain data and may be compared byte by byte.
    pub fn solid_ranges(&self) -> &[Span] {
        &self.solid_ranges
    }

    /// Bytes not covered by any field, nested padding included.
    pub fn padding(&self) -> &[Span] {
        &self.padding
    }

    pub fn has_pointers(&self) -> bool {
        self.has_pointers
    }
}

impl fmt::Display for StructLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.kind {
            StructKind::Sequential => "struct",
            StructKind::Union => "union",
        };
        writeln!(f, "{} {} // size {}, align {}", keyword, self.id, self.size, self.alignment.as_usize())?;
        for field in &self.fields {
            writeln!(f, "    {}", field)?;
        }
        Ok(())
    }
}
