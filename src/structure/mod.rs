// Tue Jan 15 2026 - Alex

pub mod alignment;
pub mod builder;
pub mod comparison;
pub mod descriptor;
pub mod error;
pub mod field;
pub mod layout;
pub mod registry;
pub mod serializer;
pub mod solid;
pub mod type_info;
pub mod validator;

pub use alignment::Alignment;
pub use builder::{LayoutBuilder, NestedResolver};
pub use comparison::StructComparator;
pub use descriptor::{StructId, StructKind, StructTypeDescriptor};
pub use error::{LayoutError, MarshalError};
pub use field::FieldDescriptor;
pub use layout::{BitSlot, FieldLayout, ResolvedKind, Span, StructLayout};
pub use registry::LayoutRegistry;
pub use serializer::{SerializableField, SerializableLayout};
pub use type_info::{FieldKind, FloatWidth, IntWidth, PlatformInt};
pub use validator::LayoutValidator;
