// Tue Jan 13 2026 - Alex

use crate::structure::{Span, StructKind, StructLayout};
use serde::{Deserialize, Serialize};

/// Flat, serde-friendly export of a computed layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableLayout {
    pub name: String,
    pub union: bool,
    pub size: usize,
    pub alignment: usize,
    pub fields: Vec<SerializableField>,
    pub solid_ranges: Vec<Span>,
    pub padding: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub offset: usize,
    pub size: usize,
    pub alignment: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_length: Option<usize>,
}

impl SerializableLayout {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&StructLayout> for SerializableLayout {
    fn from(layout: &StructLayout) -> Self {
        Self {
            name: layout.name().to_string(),
            union: layout.kind() == StructKind::Union,
            size: layout.size(),
            alignment: layout.alignment().as_usize(),
            fields: layout
                .fields()
                .iter()
                .map(|f| SerializableField {
                    name: f.name().to_string(),
                    type_name: f.kind().to_string(),
                    offset: f.byte_offset(),
                    size: f.byte_length(),
                    alignment: f.alignment().as_usize(),
                    bit_offset: f.bit_slot().map(|slot| slot.offset),
                    bit_length: f.bit_slot().map(|slot| slot.bits),
                    array_length: f.array_length(),
                })
                .collect(),
            solid_ranges: layout.solid_ranges().to_vec(),
            padding: layout.padding().to_vec(),
        }
    }
}
