// Tue Jan 13 2026 - Alex

use crate::structure::{FieldLayout, LayoutError, StructKind, StructLayout};

/// Checks the placement invariants of a freshly built layout.
pub struct LayoutValidator;

impl LayoutValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, layout: &StructLayout) -> Result<(), LayoutError> {
        for field in layout.fields() {
            if !field.has_explicit_offset() && !field.alignment().is_aligned(field.byte_offset()) {
                return Err(LayoutError::InvalidField {
                    owner: layout.name().to_string(),
                    field: field.name().to_string(),
                    reason: format!(
                        "offset 0x{:X} is not aligned to {}",
                        field.byte_offset(),
                        field.alignment().as_usize()
                    ),
                });
            }
            if field.span().end() > layout.size() {
                return Err(LayoutError::InvalidField {
                    owner: layout.name().to_string(),
                    field: field.name().to_string(),
                    reason: format!("ends past the struct size {}", layout.size()),
                });
            }
        }

        if layout.kind() == StructKind::Sequential {
            self.check_overlaps(layout)?;
        }
        Ok(())
    }

    fn check_overlaps(&self, layout: &StructLayout) -> Result<(), LayoutError> {
        let mut ordered: Vec<&FieldLayout> = layout.fields().iter().filter(|f| f.byte_length() > 0).collect();
        ordered.sort_by_key(|f| f.byte_offset());

        for (i, a) in ordered.iter().enumerate() {
            for b in ordered[i + 1..].iter().take_while(|b| b.byte_offset() < a.span().end()) {
                if !shares_storage(a, b) {
                    return Err(LayoutError::Overlap {
                        owner: layout.name().to_string(),
                        first: a.name().to_string(),
                        second: b.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Fields allowed to overlap: members of one anonymous union, and sibling
/// bit-fields packed into the same backing word.
fn shares_storage(a: &FieldLayout, b: &FieldLayout) -> bool {
    if a.union_group().is_some() && a.union_group() == b.union_group() {
        return true;
    }
    match (a.bit_slot(), b.bit_slot()) {
        (Some(x), Some(y)) => a.span() == b.span() && x.mask & y.mask == 0,
        _ => false,
    }
}

impl Default for LayoutValidator {
    fn default() -> Self {
        Self::new()
    }
}
