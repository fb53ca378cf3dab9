// Fri Jan 16 2026 - Alex

use crate::structure::FieldDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of a struct type in the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructId(Arc<str>);

impl StructId {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StructId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StructId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StructId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructKind {
    Sequential,
    Union,
}

/// Everything the layout builder needs to know about one struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructTypeDescriptor {
    id: StructId,
    kind: StructKind,
    fields: Vec<FieldDescriptor>,
    alignment: Option<usize>,
    pack: Option<usize>,
}

impl StructTypeDescriptor {
    pub fn new(id: impl Into<StructId>, kind: StructKind) -> Self {
        Self {
            id: id.into(),
            kind,
            fields: Vec::new(),
            alignment: None,
            pack: None,
        }
    }

    pub fn sequential(id: impl Into<StructId>) -> Self {
        Self::new(id, StructKind::Sequential)
    }

    pub fn union(id: impl Into<StructId>) -> Self {
        Self::new(id, StructKind::Union)
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields_from<I: IntoIterator<Item = FieldDescriptor>>(mut self, fields: I) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Explicit struct alignment, like `__attribute__((aligned(n)))`.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Caps every member's alignment, like `#pragma pack(n)`.
    pub fn with_pack(mut self, pack: usize) -> Self {
        self.pack = Some(pack);
        self
    }

    pub fn id(&self) -> &StructId {
        &self.id
    }

    pub fn kind(&self) -> StructKind {
        self.kind
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn alignment(&self) -> Option<usize> {
        self.alignment
    }

    pub fn pack(&self) -> Option<usize> {
        self.pack
    }
}
