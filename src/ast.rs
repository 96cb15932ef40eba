//! Parsed schema entries: what one definition file declares, before any model building.

/// One parsed definition file.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    /// `<include>` entries, recorded as written (not resolved).
    pub includes: Vec<String>,
    pub version: Option<u32>,
    pub dialect: Option<u32>,
    pub enums: Vec<EnumDef>,
    pub messages: Vec<MessageDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub entries: Vec<EntryDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryDef {
    pub name: String,
    pub value: Option<i64>,
    pub description: Option<String>,
    /// `(index, description)` in declaration order; duplicates are rejected by the model builder.
    pub params: Vec<(u32, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDef {
    pub name: String,
    pub id: u32,
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
    /// Index of the first field declared after `<extensions/>`; `None` when the message has no marker.
    pub extensions_at: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    /// Type as written, e.g. `uint8_t` or `char[16]`.
    pub type_name: String,
    pub description: Option<String>,
    /// Enumeration named by the field's `enum` attribute.
    pub enum_name: Option<String>,
    pub units: Option<String>,
}

impl MessageDef {
    /// Field index where the extension segment starts (field count when there is none).
    pub fn extensions_boundary(&self) -> usize {
        self.extensions_at
            .map(|at| at.min(self.fields.len()))
            .unwrap_or(self.fields.len())
    }
}
