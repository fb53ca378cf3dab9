// Wed Jan 15 2026 - Alex

use crate::config::{Endianness, Platform};
use crate::memory::{Address, MemoryError, TypedMemoryView};

/// A [`TypedMemoryView`] over an owned, zero-initialised byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferView {
    data: Vec<u8>,
    endianness: Endianness,
    pointer_width: usize,
}

impl BufferView {
    pub fn new(size: usize, platform: &Platform) -> Self {
        Self::from_bytes(vec![0; size], platform)
    }

    pub fn from_bytes(data: Vec<u8>, platform: &Platform) -> Self {
        Self {
            data,
            endianness: platform.endianness,
            pointer_width: platform.pointer_width,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn span(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>, MemoryError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(offset..end),
            _ => Err(MemoryError::OutOfBounds {
                offset,
                len,
                capacity: self.data.len(),
            }),
        }
    }
}

fn check_width(width: usize) -> Result<(), MemoryError> {
    match width {
        1 | 2 | 4 | 8 => Ok(()),
        _ => Err(MemoryError::UnsupportedWidth(width)),
    }
}

impl TypedMemoryView for BufferView {
    fn get_at(&self, offset: usize, width: usize) -> Result<u64, MemoryError> {
        check_width(width)?;
        let bytes = &self.data[self.span(offset, width)?];
        let mut buf = [0u8; 8];
        Ok(match self.endianness {
            Endianness::Little => {
                buf[..width].copy_from_slice(bytes);
                u64::from_le_bytes(buf)
            }
            Endianness::Big => {
                buf[8 - width..].copy_from_slice(bytes);
                u64::from_be_bytes(buf)
            }
        })
    }

    fn set_at(&mut self, offset: usize, width: usize, bits: u64) -> Result<(), MemoryError> {
        check_width(width)?;
        let range = self.span(offset, width)?;
        match self.endianness {
            Endianness::Little => self.data[range].copy_from_slice(&bits.to_le_bytes()[..width]),
            Endianness::Big => self.data[range].copy_from_slice(&bits.to_be_bytes()[8 - width..]),
        }
        Ok(())
    }

    fn get_address_at(&self, offset: usize) -> Result<Address, MemoryError> {
        self.get_at(offset, self.pointer_width).map(Address::new)
    }

    fn set_address_at(&mut self, offset: usize, address: Address) -> Result<(), MemoryError> {
        let narrowed = address.truncate(self.pointer_width);
        self.set_at(offset, self.pointer_width, narrowed.as_u64())
    }

    fn base_address(&self) -> Address {
        Address::from_ptr(self.data.as_ptr())
    }

    fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>, MemoryError> {
        Ok(self.data[self.span(offset, len)?].to_vec())
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        let range = self.span(offset, data.len())?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    fn fill(&mut self, offset: usize, len: usize, byte: u8) -> Result<(), MemoryError> {
        let range = self.span(offset, len)?;
        self.data[range].fill(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_store() {
        let mut view = BufferView::new(8, &Platform::lp64());
        view.set_at(0, 4, 0x1122_3344).unwrap();
        assert_eq!(&view.as_bytes()[..4], &[0x44, 0x33, 0x22, 0x11]);
        assert_eq!(view.get_at(0, 4).unwrap(), 0x1122_3344);
        assert_eq!(view.get_at(0, 2).unwrap(), 0x3344);
    }

    #[test]
    fn test_big_endian_store() {
        let platform = Platform {
            endianness: Endianness::Big,
            ..Platform::lp64()
        };
        let mut view = BufferView::new(4, &platform);
        view.set_at(0, 4, 0x1122_3344).unwrap();
        assert_eq!(view.as_bytes(), &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(view.get_at(2, 2).unwrap(), 0x3344);
    }

    #[test]
    fn test_out_of_bounds() {
        let view = BufferView::new(4, &Platform::lp64());
        assert!(matches!(view.get_at(2, 4), Err(MemoryError::OutOfBounds { .. })));
        assert!(matches!(view.get_at(0, 3), Err(MemoryError::UnsupportedWidth(3))));
    }

    #[test]
    fn test_address_narrowed_on_32_bit() {
        let mut view = BufferView::new(4, &Platform::ilp32());
        view.set_address_at(0, Address::new(0xdead_beef_cafe_f00d)).unwrap();
        assert_eq!(view.get_address_at(0).unwrap(), Address::new(0xcafe_f00d));
    }
}
