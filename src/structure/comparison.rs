// Tue Jan 15 2026 - Alex

use crate::memory::TypedMemoryView;
use crate::structure::{MarshalError, StructLayout};
use std::cmp::Ordering;

/// Orders two instances of the same struct by the bytes of its solid ranges.
///
/// Padding and address-valued fields never take part, so two instances that
/// only differ in a pointer compare equal.
pub struct StructComparator<'a> {
    layout: &'a StructLayout,
}

impl<'a> StructComparator<'a> {
    pub fn new(layout: &'a StructLayout) -> Self {
        Self { layout }
    }

    pub fn compare(&self, a: &dyn TypedMemoryView, b: &dyn TypedMemoryView) -> Result<Ordering, MarshalError> {
        for range in self.layout.solid_ranges() {
            let left = a.read_bytes(range.offset, range.len)?;
            let right = b.read_bytes(range.offset, range.len)?;
            match left.cmp(&right) {
                Ordering::Equal => continue,
                unequal => return Ok(unequal),
            }
        }
        Ok(Ordering::Equal)
    }

    pub fn equal(&self, a: &dyn TypedMemoryView, b: &dyn TypedMemoryView) -> Result<bool, MarshalError> {
        Ok(self.compare(a, b)? == Ordering::Equal)
    }
}
