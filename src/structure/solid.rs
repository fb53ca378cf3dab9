// Fri Jan 16 2026 - Alex

use crate::structure::{ResolvedKind, Span, StructLayout};
use itertools::Itertools;

/// Plain-data byte ranges of `layout`, merged and sorted by offset.
///
/// Pointer bytes, and every byte of a nested struct or array that contains a
/// pointer, are carved out of the result even where a union overlays them with
/// plain data.
pub fn solid_ranges(layout: &StructLayout) -> Vec<Span> {
    let mut solid = Vec::new();
    let mut tainted = Vec::new();
    for field in layout.fields() {
        collect_solid(field.resolved(), field.span(), &mut solid, &mut tainted);
    }
    subtract_spans(&merge_spans(solid), &merge_spans(tainted))
}

fn collect_solid(resolved: &ResolvedKind, span: Span, solid: &mut Vec<Span>, tainted: &mut Vec<Span>) {
    if resolved.has_pointers() {
        tainted.push(span);
        return;
    }
    match resolved {
        ResolvedKind::Scalar { .. } => solid.push(span),
        ResolvedKind::Struct(nested) => {
            solid.extend(nested.solid_ranges().iter().map(|r| r.shifted(span.offset)));
        }
        ResolvedKind::Array { element, .. } if element.size() == 0 => {}
        ResolvedKind::Array { element, .. } if is_fully_solid(element) => solid.push(span),
        ResolvedKind::Array { element, len } => {
            let size = element.size();
            for i in 0..*len {
                collect_solid(element, Span::new(span.offset + i * size, size), solid, tainted);
            }
        }
    }
}

/// Bytes of `layout` that no field (at any nesting depth) occupies.
pub fn padding_spans(layout: &StructLayout) -> Vec<Span> {
    let mut occupied = Vec::new();
    for field in layout.fields() {
        collect_occupied(field.resolved(), field.span(), &mut occupied);
    }
    complement(&merge_spans(occupied), layout.size())
}

fn collect_occupied(resolved: &ResolvedKind, span: Span, out: &mut Vec<Span>) {
    match resolved {
        ResolvedKind::Scalar { .. } => out.push(span),
        ResolvedKind::Struct(nested) => {
            let inner = complement(nested.padding(), nested.size());
            out.extend(inner.iter().map(|r| r.shifted(span.offset)));
        }
        ResolvedKind::Array { element, .. } if element.size() == 0 => {}
        ResolvedKind::Array { element, .. } if is_fully_occupied(element) => out.push(span),
        ResolvedKind::Array { element, len } => {
            let size = element.size();
            for i in 0..*len {
                collect_occupied(element, Span::new(span.offset + i * size, size), out);
            }
        }
    }
}

/// Every byte of a pointer-free `resolved` is plain data.
fn is_fully_solid(resolved: &ResolvedKind) -> bool {
    match resolved {
        ResolvedKind::Scalar { .. } => true,
        ResolvedKind::Struct(nested) => nested.solid_ranges() == [Span::new(0, nested.size())],
        ResolvedKind::Array { element, .. } => is_fully_solid(element),
    }
}

fn is_fully_occupied(resolved: &ResolvedKind) -> bool {
    match resolved {
        ResolvedKind::Scalar { .. } => true,
        ResolvedKind::Struct(nested) => nested.padding().is_empty(),
        ResolvedKind::Array { element, .. } => is_fully_occupied(element),
    }
}

/// Sorts spans and fuses the ones that touch or overlap. Empty spans are dropped.
pub fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.retain(|s| s.len > 0);
    spans.sort();
    spans
        .into_iter()
        .coalesce(|a, b| {
            if b.offset <= a.end() {
                Ok(Span::new(a.offset, a.end().max(b.end()) - a.offset))
            } else {
                Err((a, b))
            }
        })
        .collect()
}

/// Removes every byte of `holes` from `spans`. Both inputs must be merged.
pub fn subtract_spans(spans: &[Span], holes: &[Span]) -> Vec<Span> {
    let mut out = Vec::new();
    for span in spans {
        let mut start = span.offset;
        for hole in holes.iter().filter(|h| h.intersects(span)) {
            if hole.offset > start {
                out.push(Span::new(start, hole.offset - start));
            }
            start = start.max(hole.end());
        }
        if start < span.end() {
            out.push(Span::new(start, span.end() - start));
        }
    }
    out
}

fn complement(merged: &[Span], size: usize) -> Vec<Span> {
    subtract_spans(&[Span::new(0, size)], merged)
        .into_iter()
        .filter(|s| s.len > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayoutConfig, Platform};
    use crate::structure::{
        FieldDescriptor, FieldKind, IntWidth, LayoutBuilder, StructId, StructTypeDescriptor,
    };
    use ahash::AHashMap;
    use std::sync::Arc;

    #[test]
    fn test_large_plain_array_is_one_span() {
        let config = LayoutConfig::for_platform(Platform::lp64());
        let desc = StructTypeDescriptor::sequential("blob")
            .field(FieldDescriptor::unsigned("tag", IntWidth::W32))
            .field(FieldDescriptor::array("data", FieldKind::Unsigned(IntWidth::W8), 10_000_000))
            .field(FieldDescriptor::array(
                "words",
                FieldKind::Array(Box::new(FieldKind::Unsigned(IntWidth::W16)), 4),
                1_000_000,
            ));
        let mut known: AHashMap<StructId, Arc<StructLayout>> = AHashMap::new();
        let layout = LayoutBuilder::new(&config).build(&desc, &mut known).unwrap();

        assert_eq!(layout.solid_ranges(), &[Span::new(0, 18_000_004)]);
        assert!(layout.padding().is_empty());
    }

    #[test]
    fn test_array_of_padded_structs_keeps_gaps() {
        let config = LayoutConfig::for_platform(Platform::lp64());
        let pair = StructTypeDescriptor::sequential("pair")
            .field(FieldDescriptor::unsigned("a", IntWidth::W8))
            .field(FieldDescriptor::unsigned("b", IntWidth::W16));
        let mut known: AHashMap<StructId, Arc<StructLayout>> = AHashMap::new();
        let pair = LayoutBuilder::new(&config).build(&pair, &mut known).unwrap();
        known.insert(StructId::from("pair"), Arc::new(pair));

        let desc = StructTypeDescriptor::sequential("pairs")
            .field(FieldDescriptor::array("items", FieldKind::Struct("pair".into()), 2));
        let layout = LayoutBuilder::new(&config).build(&desc, &mut known).unwrap();

        assert_eq!(layout.solid_ranges(), &[Span::new(0, 1), Span::new(2, 3), Span::new(6, 2)]);
        assert_eq!(layout.padding(), &[Span::new(1, 1), Span::new(5, 1)]);
    }

    #[test]
    fn test_merge_touching_and_overlapping() {
        let merged = merge_spans(vec![
            Span::new(8, 4),
            Span::new(0, 4),
            Span::new(4, 2),
            Span::new(10, 4),
            Span::new(20, 0),
        ]);
        assert_eq!(merged, vec![Span::new(0, 6), Span::new(8, 6)]);
    }

    #[test]
    fn test_subtract_holes() {
        let spans = vec![Span::new(0, 16)];
        let holes = vec![Span::new(0, 2), Span::new(4, 4), Span::new(14, 8)];
        assert_eq!(
            subtract_spans(&spans, &holes),
            vec![Span::new(2, 2), Span::new(8, 6)]
        );
    }

    #[test]
    fn test_complement() {
        let occupied = vec![Span::new(0, 4), Span::new(8, 4)];
        assert_eq!(complement(&occupied, 16), vec![Span::new(4, 4), Span::new(12, 4)]);
        assert!(complement(&[Span::new(0, 8)], 8).is_empty());
    }
}
