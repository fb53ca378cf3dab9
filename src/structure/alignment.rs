// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Alignment {
    value: usize,
}

impl Alignment {
    pub const BYTE: Alignment = Alignment { value: 1 };

    pub fn new(value: usize) -> Option<Self> {
        if value > 0 && value.is_power_of_two() {
            Some(Self { value })
        } else {
            None
        }
    }

    pub fn as_usize(&self) -> usize {
        self.value
    }

    pub fn align(&self, offset: usize) -> usize {
        (offset + self.value - 1) & !(self.value - 1)
    }

    /// Like [`align`](Self::align), but `None` instead of wrapping past `usize::MAX`.
    pub fn checked_align(&self, offset: usize) -> Option<usize> {
        offset.checked_add(self.value - 1).map(|end| end & !(self.value - 1))
    }

    pub fn is_aligned(&self, offset: usize) -> bool {
        offset & (self.value - 1) == 0
    }

    /// Applies a `#pragma pack(n)` style cap.
    pub fn packed(self, pack: Option<Alignment>) -> Self {
        match pack {
            Some(pack) => self.min(pack),
            None => self,
        }
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::BYTE
    }
}
