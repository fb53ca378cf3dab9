// Tue Jan 13 2026 - Alex

use crate::config::{BitOrder, LayoutConfig};
use crate::structure::{
    Alignment, BitSlot, FieldDescriptor, FieldKind, FieldLayout, LayoutError, LayoutValidator,
    ResolvedKind, StructId, StructKind, StructLayout, StructTypeDescriptor,
};
use ahash::{AHashMap, AHashSet};
use std::sync::Arc;

/// Source of layouts for structs embedded by value.
pub trait NestedResolver {
    fn resolve(&mut self, id: &StructId) -> Result<Arc<StructLayout>, LayoutError>;
}

impl NestedResolver for AHashMap<StructId, Arc<StructLayout>> {
    fn resolve(&mut self, id: &StructId) -> Result<Arc<StructLayout>, LayoutError> {
        self.get(id)
            .cloned()
            .ok_or_else(|| LayoutError::UnknownStruct(id.to_string()))
    }
}

/// Computes C-compatible layouts. Pure: the output only depends on the
/// descriptor, the configuration and what the resolver returns.
pub struct LayoutBuilder<'a> {
    config: &'a LayoutConfig,
}

struct Prepared<'d> {
    desc: &'d FieldDescriptor,
    resolved: ResolvedKind,
    size: usize,
    alignment: Alignment,
}

struct OpenWord {
    offset: usize,
    width: usize,
    used: u32,
}

impl<'a> LayoutBuilder<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        desc: &StructTypeDescriptor,
        resolver: &mut dyn NestedResolver,
    ) -> Result<StructLayout, LayoutError> {
        let owner = desc.id().as_str();
        let pack = match desc.pack().or(self.config.default_pack) {
            Some(pack) => Some(alignment_of(owner, pack)?),
            None => None,
        };

        let mut seen = AHashSet::new();
        let mut prepared = Vec::with_capacity(desc.fields().len());
        for field in desc.fields() {
            if field.name().is_empty() || !seen.insert(field.name()) {
                return Err(LayoutError::InvalidField {
                    owner: owner.to_string(),
                    field: field.name().to_string(),
                    reason: "field names must be non-empty and unique".to_string(),
                });
            }
            prepared.push(self.prepare(owner, field, pack, resolver)?);
        }

        let (fields, end) = match desc.kind() {
            StructKind::Sequential => self.place_sequential(owner, &prepared)?,
            StructKind::Union => self.place_union(owner, &prepared)?,
        };

        let natural = fields.iter().map(|f| f.alignment).max().unwrap_or_default();
        let alignment = match desc.alignment() {
            Some(explicit) => {
                let explicit = alignment_of(owner, explicit)?;
                if explicit < natural {
                    return Err(LayoutError::UnsatisfiableAlignment {
                        owner: owner.to_string(),
                        reason: format!(
                            "struct alignment {} is below the {} required by its fields",
                            explicit.as_usize(),
                            natural.as_usize()
                        ),
                    });
                }
                explicit
            }
            None => natural,
        };

        let size = alignment
            .checked_align(end)
            .ok_or_else(|| overflow(owner, fields.last().map_or("", |f| f.name())))?;
        let layout = StructLayout::new(desc.id().clone(), desc.kind(), fields, size, alignment);
        LayoutValidator::new().validate(&layout)?;
        Ok(layout)
    }

    fn prepare<'d>(
        &self,
        owner: &str,
        field: &'d FieldDescriptor,
        pack: Option<Alignment>,
        resolver: &mut dyn NestedResolver,
    ) -> Result<Prepared<'d>, LayoutError> {
        let resolved = self.resolve_kind(owner, field.name(), field.kind(), resolver)?;
        let size = resolved.size();

        if let Some(bits) = field.bits() {
            if !field.kind().is_integral() || bits == 0 {
                return Err(LayoutError::InvalidBitfield(format!("{}.{}", owner, field.name())));
            }
            let capacity = size as u32 * 8;
            if bits > capacity {
                return Err(LayoutError::BitfieldTooWide {
                    field: format!("{}.{}", owner, field.name()),
                    bits,
                    capacity,
                });
            }
        }

        let alignment = match field.alignment() {
            Some(explicit) => {
                let explicit = alignment_of(&format!("{}.{}", owner, field.name()), explicit)?;
                if let Some(pack) = pack.filter(|pack| explicit > *pack) {
                    return Err(LayoutError::UnsatisfiableAlignment {
                        owner: format!("{}.{}", owner, field.name()),
                        reason: format!(
                            "requested alignment {} exceeds pack {}",
                            explicit.as_usize(),
                            pack.as_usize()
                        ),
                    });
                }
                explicit
            }
            None => resolved.alignment().packed(pack),
        };

        Ok(Prepared { desc: field, resolved, size, alignment })
    }

    fn resolve_kind(
        &self,
        owner: &str,
        field: &str,
        kind: &FieldKind,
        resolver: &mut dyn NestedResolver,
    ) -> Result<ResolvedKind, LayoutError> {
        let platform = &self.config.platform;
        Ok(match kind {
            FieldKind::Struct(id) => ResolvedKind::Struct(resolver.resolve(id)?),
            FieldKind::Array(element, len) => {
                let element = self.resolve_kind(owner, field, element, resolver)?;
                if element.size().checked_mul(*len).is_none() {
                    return Err(overflow(owner, field));
                }
                ResolvedKind::Array { element: Box::new(element), len: *len }
            }
            scalar => {
                let size = scalar.scalar_size(platform).ok_or_else(|| LayoutError::InvalidField {
                    owner: owner.to_string(),
                    field: field.to_string(),
                    reason: format!("{} has no scalar size", scalar),
                })?;
                let alignment = Alignment::new(platform.scalar_alignment(size)).ok_or_else(|| {
                    LayoutError::InvalidField {
                        owner: owner.to_string(),
                        field: field.to_string(),
                        reason: format!("unsupported width {} for {}", size, scalar),
                    }
                })?;
                ResolvedKind::Scalar { kind: scalar.clone(), size, alignment }
            }
        })
    }

    fn place_sequential(&self, owner: &str, prepared: &[Prepared<'_>]) -> Result<(Vec<FieldLayout>, usize), LayoutError> {
        let mut fields = Vec::with_capacity(prepared.len());
        let mut cursor = 0usize;
        let mut word: Option<OpenWord> = None;
        let mut i = 0;

        while i < prepared.len() {
            let field = &prepared[i];

            if let Some(offset) = field.desc.offset() {
                close_word(&mut word, &mut cursor);
                let slot = field.desc.bits().map(|bits| self.slot(field.size, 0, bits));
                let end = offset.checked_add(field.size).ok_or_else(|| overflow(owner, field.desc.name()))?;
                fields.push(field_layout(field, offset, slot, true, None));
                cursor = cursor.max(end);
                i += 1;
                continue;
            }

            if field.desc.is_union_member() {
                let group = &prepared[i..];
                let count = group
                    .iter()
                    .take_while(|p| p.desc.is_union_member() && p.desc.offset().is_none())
                    .count();
                let group = &group[..count];
                close_word(&mut word, &mut cursor);
                let alignment = group.iter().map(|p| p.alignment).max().unwrap_or_default();
                let size = group.iter().map(|p| p.size).max().unwrap_or(0);
                let (start, end) = reserve(cursor, alignment, size).ok_or_else(|| overflow(owner, field.desc.name()))?;
                cursor = start;
                for member in group {
                    let slot = member.desc.bits().map(|bits| self.slot(member.size, 0, bits));
                    fields.push(field_layout(member, cursor, slot, false, Some(i)));
                }
                log::trace!("union group of {} members at 0x{:X}", count, cursor);
                cursor = end;
                i += count;
                continue;
            }

            match field.desc.bits() {
                Some(bits) => {
                    let fits = matches!(
                        &word,
                        Some(w) if w.width == field.size && w.used + bits <= field.size as u32 * 8
                    );
                    if !fits {
                        close_word(&mut word, &mut cursor);
                        cursor = reserve(cursor, field.alignment, field.size)
                            .ok_or_else(|| overflow(owner, field.desc.name()))?
                            .0;
                        word = Some(OpenWord { offset: cursor, width: field.size, used: 0 });
                    }
                    if let Some(w) = word.as_mut() {
                        let slot = self.slot(w.width, w.used, bits);
                        fields.push(field_layout(field, w.offset, Some(slot), false, None));
                        w.used += bits;
                    }
                }
                None => {
                    close_word(&mut word, &mut cursor);
                    let (start, end) = reserve(cursor, field.alignment, field.size)
                        .ok_or_else(|| overflow(owner, field.desc.name()))?;
                    fields.push(field_layout(field, start, None, false, None));
                    cursor = end;
                }
            }
            i += 1;
        }
        close_word(&mut word, &mut cursor);

        for f in &fields {
            log::trace!("placed {}", f);
        }
        Ok((fields, cursor))
    }

    fn place_union(&self, owner: &str, prepared: &[Prepared<'_>]) -> Result<(Vec<FieldLayout>, usize), LayoutError> {
        let mut fields = Vec::with_capacity(prepared.len());
        for field in prepared {
            if field.desc.offset().is_some_and(|offset| offset != 0) {
                return Err(LayoutError::InvalidField {
                    owner: owner.to_string(),
                    field: field.desc.name().to_string(),
                    reason: "union members always live at offset 0".to_string(),
                });
            }
            let slot = field.desc.bits().map(|bits| self.slot(field.size, 0, bits));
            fields.push(field_layout(field, 0, slot, false, None));
        }
        let end = prepared.iter().map(|p| p.size).max().unwrap_or(0);
        Ok((fields, end))
    }

    /// Bit position for a field of `bits` bits placed after `used` bits of a
    /// `width`-byte word, honouring the configured allocation order.
    fn slot(&self, width: usize, used: u32, bits: u32) -> BitSlot {
        let capacity = width as u32 * 8;
        match self.config.bit_order {
            BitOrder::LsbFirst => BitSlot::new(used, bits),
            BitOrder::MsbFirst => BitSlot::new(capacity - used - bits, bits),
        }
    }
}

fn close_word(word: &mut Option<OpenWord>, cursor: &mut usize) {
    if let Some(w) = word.take() {
        *cursor = (*cursor).max(w.offset + w.width);
    }
}

/// Start and end of `size` bytes placed at the first `alignment` boundary at or after `cursor`.
fn reserve(cursor: usize, alignment: Alignment, size: usize) -> Option<(usize, usize)> {
    let start = alignment.checked_align(cursor)?;
    Some((start, start.checked_add(size)?))
}

fn overflow(owner: &str, field: &str) -> LayoutError {
    LayoutError::InvalidField {
        owner: owner.to_string(),
        field: field.to_string(),
        reason: "size overflows usize".to_string(),
    }
}

fn field_layout(
    field: &Prepared<'_>,
    offset: usize,
    bit_slot: Option<BitSlot>,
    explicit_offset: bool,
    union_group: Option<usize>,
) -> FieldLayout {
    FieldLayout {
        name: field.desc.name().to_string(),
        kind: field.desc.kind().clone(),
        resolved: field.resolved.clone(),
        byte_offset: offset,
        byte_length: field.size,
        alignment: field.alignment,
        bit_slot,
        explicit_offset,
        union_group,
    }
}

fn alignment_of(owner: &str, value: usize) -> Result<Alignment, LayoutError> {
    Alignment::new(value).ok_or_else(|| LayoutError::InvalidAlignment {
        owner: owner.to_string(),
        alignment: value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Platform;
    use crate::structure::{FloatWidth, IntWidth, Span};

    fn lp64() -> LayoutConfig {
        LayoutConfig::for_platform(Platform::lp64())
    }

    fn build(config: &LayoutConfig, desc: &StructTypeDescriptor) -> Result<StructLayout, LayoutError> {
        let mut known: AHashMap<StructId, Arc<StructLayout>> = AHashMap::new();
        LayoutBuilder::new(config).build(desc, &mut known)
    }

    fn offsets(layout: &StructLayout) -> Vec<(usize, usize)> {
        layout.fields().iter().map(|f| (f.byte_offset(), f.byte_length())).collect()
    }

    #[test]
    fn test_padding_between_fields() {
        let desc = StructTypeDescriptor::sequential("padded")
            .field(FieldDescriptor::signed("a", IntWidth::W8))
            .field(FieldDescriptor::float("b", FloatWidth::F64))
            .field(FieldDescriptor::signed("c", IntWidth::W16));
        let layout = build(&lp64(), &desc).unwrap();

        assert_eq!(offsets(&layout), vec![(0, 1), (8, 8), (16, 2)]);
        assert_eq!(layout.size(), 24);
        assert_eq!(layout.alignment().as_usize(), 8);
        assert_eq!(layout.padding(), &[Span::new(1, 7), Span::new(18, 6)]);
    }

    #[test]
    fn test_bitfields_share_backing_byte() {
        let desc = StructTypeDescriptor::sequential("flags")
            .field(FieldDescriptor::signed("a", IntWidth::W32))
            .field(FieldDescriptor::unsigned("flag", IntWidth::W8).with_bits(1))
            .field(FieldDescriptor::unsigned("other", IntWidth::W8).with_bits(7))
            .field(FieldDescriptor::signed("b", IntWidth::W32));
        let layout = build(&lp64(), &desc).unwrap();

        assert_eq!(offsets(&layout), vec![(0, 4), (4, 1), (4, 1), (8, 4)]);
        assert_eq!(layout.size(), 12);
        let flag = layout.field("flag").unwrap().bit_slot().unwrap();
        let other = layout.field("other").unwrap().bit_slot().unwrap();
        assert_eq!((flag.offset, flag.mask), (0, 0x01));
        assert_eq!((other.offset, other.mask), (1, 0xFE));
    }

    #[test]
    fn test_bitfield_opens_new_word_when_full() {
        let desc = StructTypeDescriptor::sequential("split")
            .field(FieldDescriptor::unsigned("lo", IntWidth::W16).with_bits(12))
            .field(FieldDescriptor::unsigned("hi", IntWidth::W16).with_bits(6))
            .field(FieldDescriptor::unsigned("wide", IntWidth::W32).with_bits(3));
        let layout = build(&lp64(), &desc).unwrap();

        assert_eq!(offsets(&layout), vec![(0, 2), (2, 2), (4, 4)]);
        assert_eq!(layout.size(), 8);
        assert_eq!(layout.field("hi").unwrap().bit_offset(), 0);
    }

    #[test]
    fn test_msb_first_bit_order() {
        let config = lp64().with_bit_order(BitOrder::MsbFirst);
        let desc = StructTypeDescriptor::sequential("msb")
            .field(FieldDescriptor::unsigned("top", IntWidth::W8).with_bits(3))
            .field(FieldDescriptor::unsigned("next", IntWidth::W8).with_bits(2));
        let layout = build(&config, &desc).unwrap();

        assert_eq!(layout.field("top").unwrap().bit_slot().unwrap().mask, 0xE0);
        assert_eq!(layout.field("next").unwrap().bit_slot().unwrap().mask, 0x18);
    }

    #[test]
    fn test_union_layout() {
        let desc = StructTypeDescriptor::union("num")
            .field(FieldDescriptor::signed("x", IntWidth::W32))
            .field(FieldDescriptor::float("y", FloatWidth::F32));
        let layout = build(&lp64(), &desc).unwrap();

        assert_eq!(offsets(&layout), vec![(0, 4), (0, 4)]);
        assert_eq!(layout.size(), 4);
        assert_eq!(layout.alignment().as_usize(), 4);
    }

    #[test]
    fn test_union_rounds_to_max_alignment() {
        let desc = StructTypeDescriptor::union("mixed")
            .field(FieldDescriptor::array("bytes", FieldKind::Unsigned(IntWidth::W8), 5))
            .field(FieldDescriptor::unsigned("word", IntWidth::W32));
        let layout = build(&lp64(), &desc).unwrap();
        assert_eq!(layout.size(), 8);
    }

    #[test]
    fn test_anonymous_union_group_in_struct() {
        let desc = StructTypeDescriptor::sequential("tagged")
            .field(FieldDescriptor::unsigned("tag", IntWidth::W8))
            .field(FieldDescriptor::signed("i", IntWidth::W32).union_member())
            .field(FieldDescriptor::float("d", FloatWidth::F64).union_member())
            .field(FieldDescriptor::unsigned("tail", IntWidth::W16));
        let layout = build(&lp64(), &desc).unwrap();

        assert_eq!(offsets(&layout), vec![(0, 1), (8, 4), (8, 8), (16, 2)]);
        assert_eq!(layout.size(), 24);
    }

    #[test]
    fn test_pack_removes_padding() {
        let desc = StructTypeDescriptor::sequential("packed")
            .field(FieldDescriptor::unsigned("a", IntWidth::W8))
            .field(FieldDescriptor::unsigned("b", IntWidth::W32))
            .with_pack(1);
        let layout = build(&lp64(), &desc).unwrap();

        assert_eq!(offsets(&layout), vec![(0, 1), (1, 4)]);
        assert_eq!(layout.size(), 5);
        assert!(layout.padding().is_empty());
    }

    #[test]
    fn test_explicit_struct_alignment() {
        let desc = StructTypeDescriptor::sequential("aligned")
            .field(FieldDescriptor::unsigned("a", IntWidth::W32))
            .with_alignment(16);
        let layout = build(&lp64(), &desc).unwrap();
        assert_eq!(layout.size(), 16);
        assert_eq!(layout.alignment().as_usize(), 16);
    }

    #[test]
    fn test_unsatisfiable_alignment() {
        let below = StructTypeDescriptor::sequential("below")
            .field(FieldDescriptor::unsigned("a", IntWidth::W64))
            .with_alignment(4);
        assert!(matches!(build(&lp64(), &below), Err(LayoutError::UnsatisfiableAlignment { .. })));

        let over_pack = StructTypeDescriptor::sequential("over_pack")
            .field(FieldDescriptor::unsigned("a", IntWidth::W8).with_alignment(8))
            .with_pack(2);
        assert!(matches!(build(&lp64(), &over_pack), Err(LayoutError::UnsatisfiableAlignment { .. })));

        let odd = StructTypeDescriptor::sequential("odd")
            .field(FieldDescriptor::unsigned("a", IntWidth::W8).with_alignment(3));
        assert!(matches!(build(&lp64(), &odd), Err(LayoutError::InvalidAlignment { alignment: 3, .. })));
    }

    #[test]
    fn test_bitfield_errors() {
        let wide = StructTypeDescriptor::sequential("wide")
            .field(FieldDescriptor::unsigned("x", IntWidth::W8).with_bits(9));
        assert!(matches!(
            build(&lp64(), &wide),
            Err(LayoutError::BitfieldTooWide { bits: 9, capacity: 8, .. })
        ));

        let float = StructTypeDescriptor::sequential("float_bits")
            .field(FieldDescriptor::float("x", FloatWidth::F32).with_bits(3));
        assert!(matches!(build(&lp64(), &float), Err(LayoutError::InvalidBitfield(_))));
    }

    #[test]
    fn test_explicit_offsets_overlap() {
        let desc = StructTypeDescriptor::sequential("overlap")
            .field(FieldDescriptor::unsigned("a", IntWidth::W32).with_offset(0))
            .field(FieldDescriptor::unsigned("b", IntWidth::W32).with_offset(2));
        assert!(matches!(build(&lp64(), &desc), Err(LayoutError::Overlap { .. })));

        let disjoint = StructTypeDescriptor::sequential("disjoint")
            .field(FieldDescriptor::unsigned("a", IntWidth::W32).with_offset(8))
            .field(FieldDescriptor::unsigned("b", IntWidth::W16));
        let layout = build(&lp64(), &disjoint).unwrap();
        assert_eq!(offsets(&layout), vec![(8, 4), (12, 2)]);
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn test_duplicate_field_names() {
        let desc = StructTypeDescriptor::sequential("dup")
            .field(FieldDescriptor::unsigned("a", IntWidth::W8))
            .field(FieldDescriptor::unsigned("a", IntWidth::W8));
        assert!(matches!(build(&lp64(), &desc), Err(LayoutError::InvalidField { .. })));
    }

    #[test]
    fn test_nested_struct_and_arrays() {
        let config = lp64();
        let point = StructTypeDescriptor::sequential("point")
            .field(FieldDescriptor::signed("x", IntWidth::W32))
            .field(FieldDescriptor::signed("y", IntWidth::W32));
        let mut known = AHashMap::new();
        known.insert(StructId::from("point"), Arc::new(build(&config, &point).unwrap()));

        let desc = StructTypeDescriptor::sequential("shape")
            .field(FieldDescriptor::unsigned("count", IntWidth::W8))
            .field(FieldDescriptor::array("points", FieldKind::Struct("point".into()), 3))
            .field(FieldDescriptor::pointer("next", FieldKind::Struct("shape".into())));
        let layout = LayoutBuilder::new(&config).build(&desc, &mut known).unwrap();

        let points = layout.field("points").unwrap();
        assert_eq!((points.byte_offset(), points.byte_length()), (4, 24));
        assert_eq!(points.array_length(), Some(3));
        assert_eq!(points.element_size(), 8);
        assert_eq!(layout.field("next").unwrap().byte_offset(), 32);
        assert_eq!(layout.size(), 40);
        assert_eq!(layout.solid_ranges(), &[Span::new(0, 1), Span::new(4, 24)]);
    }

    #[test]
    fn test_unknown_nested_struct() {
        let desc = StructTypeDescriptor::sequential("outer").field(FieldDescriptor::nested("inner", "missing"));
        assert_eq!(
            build(&lp64(), &desc).unwrap_err(),
            LayoutError::UnknownStruct("missing".to_string())
        );
    }

    #[test]
    fn test_platform_dependent_widths() {
        let desc = StructTypeDescriptor::sequential("sizes")
            .field(FieldDescriptor::platform("len", crate::structure::PlatformInt::SizeT))
            .field(FieldDescriptor::platform("l", crate::structure::PlatformInt::Long))
            .field(FieldDescriptor::pointer("p", FieldKind::Bool));

        let wide = build(&lp64(), &desc).unwrap();
        assert_eq!(offsets(&wide), vec![(0, 8), (8, 8), (16, 8)]);

        let win = build(&LayoutConfig::for_platform(Platform::llp64()), &desc).unwrap();
        assert_eq!(offsets(&win), vec![(0, 8), (8, 4), (16, 8)]);

        let narrow = build(&LayoutConfig::for_platform(Platform::ilp32()), &desc).unwrap();
        assert_eq!(offsets(&narrow), vec![(0, 4), (4, 4), (8, 4)]);
        assert_eq!(narrow.size(), 12);
    }

    #[test]
    fn test_oversized_fields_rejected() {
        let huge_array = StructTypeDescriptor::sequential("huge_array")
            .field(FieldDescriptor::array("a", FieldKind::Unsigned(IntWidth::W64), usize::MAX / 4));
        assert!(matches!(
            build(&lp64(), &huge_array),
            Err(LayoutError::InvalidField { ref field, ref reason, .. }) if field == "a" && reason == "size overflows usize"
        ));

        let far_offset = StructTypeDescriptor::sequential("far_offset")
            .field(FieldDescriptor::unsigned("a", IntWidth::W32).with_offset(usize::MAX - 1));
        assert!(matches!(build(&lp64(), &far_offset), Err(LayoutError::InvalidField { .. })));

        let after_far = StructTypeDescriptor::sequential("after_far")
            .field(FieldDescriptor::unsigned("a", IntWidth::W8).with_offset(usize::MAX - 8))
            .field(FieldDescriptor::unsigned("b", IntWidth::W64));
        assert!(matches!(
            build(&lp64(), &after_far),
            Err(LayoutError::InvalidField { ref field, .. }) if field == "b"
        ));
    }

    #[test]
    fn test_empty_struct() {
        let layout = build(&lp64(), &StructTypeDescriptor::sequential("empty")).unwrap();
        assert_eq!(layout.size(), 0);
        assert_eq!(layout.alignment().as_usize(), 1);
    }
}
