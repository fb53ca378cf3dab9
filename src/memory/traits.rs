// Wed Jan 15 2026 - Alex

use crate::memory::{Address, MemoryError};

/// Raw access to the native memory backing one struct instance.
///
/// Offsets are relative to the start of the struct. Integral accesses move
/// `width` bytes (1, 2, 4 or 8) in the view's byte order and hand the bits
/// back zero-extended into a `u64`; interpreting them is the caller's job.
pub trait TypedMemoryView {
    fn get_at(&self, offset: usize, width: usize) -> Result<u64, MemoryError>;
    fn set_at(&mut self, offset: usize, width: usize, bits: u64) -> Result<(), MemoryError>;
    fn get_address_at(&self, offset: usize) -> Result<Address, MemoryError>;
    fn set_address_at(&mut self, offset: usize, address: Address) -> Result<(), MemoryError>;

    /// Address of the first byte of the view, used to identify an instance in errors.
    fn base_address(&self) -> Address {
        Address::null()
    }

    fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>, MemoryError> {
        (0..len)
            .map(|i| self.get_at(offset + i, 1).map(|b| b as u8))
            .collect()
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        for (i, byte) in data.iter().enumerate() {
            self.set_at(offset + i, 1, *byte as u64)?;
        }
        Ok(())
    }

    fn fill(&mut self, offset: usize, len: usize, byte: u8) -> Result<(), MemoryError> {
        for i in 0..len {
            self.set_at(offset + i, 1, byte as u64)?;
        }
        Ok(())
    }
}
