// Tue Jan 13 2026 - Alex

use crate::config::Platform;
use crate::structure::StructId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bytes(self) -> usize {
        match self {
            Self::W8 => 1,
            Self::W16 => 2,
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    pub fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            1 => Some(Self::W8),
            2 => Some(Self::W16),
            4 => Some(Self::W32),
            8 => Some(Self::W64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatWidth {
    F32,
    F64,
}

impl FloatWidth {
    pub fn bytes(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

/// C integer types whose width is only known once a target is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformInt {
    SizeT,
    Long,
    ULong,
    TimeT,
}

impl PlatformInt {
    pub fn width(self, platform: &Platform) -> usize {
        match self {
            Self::SizeT => platform.size_t_width,
            Self::Long | Self::ULong => platform.long_width,
            Self::TimeT => platform.time_t_width,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::Long | Self::TimeT)
    }

    fn c_name(self) -> &'static str {
        match self {
            Self::SizeT => "size_t",
            Self::Long => "long",
            Self::ULong => "unsigned long",
            Self::TimeT => "time_t",
        }
    }
}

/// Semantic type of a declared struct field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Signed(IntWidth),
    Unsigned(IntWidth),
    Float(FloatWidth),
    Bool,
    Platform(PlatformInt),
    /// C enum or flag set stored as an integer of the given width.
    Enum(IntWidth),
    /// Address of a value of the target kind. The target is never resolved.
    Pointer(Box<FieldKind>),
    /// Struct embedded by value.
    Struct(StructId),
    Array(Box<FieldKind>, usize),
}

impl FieldKind {
    pub fn pointer_to(target: FieldKind) -> Self {
        Self::Pointer(Box::new(target))
    }

    pub fn array_of(element: FieldKind, len: usize) -> Self {
        Self::Array(Box::new(element), len)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_, _))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_))
    }

    /// Kinds that may carry an explicit bit width.
    pub fn is_integral(&self) -> bool {
        matches!(self, Self::Signed(_) | Self::Unsigned(_) | Self::Enum(_) | Self::Bool)
    }

    pub fn is_signed(&self) -> bool {
        match self {
            Self::Signed(_) => true,
            Self::Platform(p) => p.is_signed(),
            _ => false,
        }
    }

    /// Byte size of a scalar kind; `None` for structs and arrays, whose size
    /// comes from a resolved layout.
    pub fn scalar_size(&self, platform: &Platform) -> Option<usize> {
        match self {
            Self::Signed(w) | Self::Unsigned(w) | Self::Enum(w) => Some(w.bytes()),
            Self::Float(w) => Some(w.bytes()),
            Self::Bool => Some(1),
            Self::Platform(p) => Some(p.width(platform)),
            Self::Pointer(_) => Some(platform.pointer_width),
            Self::Struct(_) | Self::Array(_, _) => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signed(w) => write!(f, "i{}", w.bits()),
            Self::Unsigned(w) => write!(f, "u{}", w.bits()),
            Self::Float(w) => write!(f, "f{}", w.bytes() * 8),
            Self::Bool => write!(f, "bool"),
            Self::Platform(p) => write!(f, "{}", p.c_name()),
            Self::Enum(w) => write!(f, "enum{}", w.bits()),
            Self::Pointer(target) => write!(f, "*{}", target),
            Self::Struct(id) => write!(f, "struct {}", id),
            Self::Array(elem, len) => write!(f, "[{}; {}]", elem, len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_widths() {
        let lp64 = Platform::lp64();
        let llp64 = Platform::llp64();
        let long = FieldKind::Platform(PlatformInt::Long);
        assert_eq!(long.scalar_size(&lp64), Some(8));
        assert_eq!(long.scalar_size(&llp64), Some(4));
        assert_eq!(FieldKind::pointer_to(FieldKind::Bool).scalar_size(&Platform::ilp32()), Some(4));
    }

    #[test]
    fn test_display() {
        let kind = FieldKind::array_of(FieldKind::pointer_to(FieldKind::Signed(IntWidth::W32)), 3);
        assert_eq!(kind.to_string(), "[*i32; 3]");
        assert_eq!(FieldKind::Struct(StructId::from("node")).to_string(), "struct node");
    }
}
