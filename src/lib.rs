// Tue Jan 15 2026 - Alex

pub mod config;
pub mod marshal;
pub mod memory;
pub mod structure;
pub mod utils;

pub use config::{BitOrder, Endianness, LayoutConfig, Platform};
pub use marshal::{StructIO, StructValue, Value};
pub use memory::{Address, BufferView, TypedMemoryView};
pub use structure::{
    FieldDescriptor, FieldKind, LayoutError, LayoutRegistry, MarshalError, StructLayout, StructTypeDescriptor,
};
