//! Wire layout and CRC-extra computation.
//!
//! Base fields are packed largest type first; extension fields keep declaration order and
//! do not take part in the CRC-extra seed.

use crate::model::Field;

/// X.25 CRC-16 (CCITT polynomial, reflected, initial value 0xFFFF, no final XOR),
/// as used by the MAVLink checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct X25Crc {
    crc: u16,
}

impl Default for X25Crc {
    fn default() -> Self {
        Self::new()
    }
}

impl X25Crc {
    pub fn new() -> Self {
        X25Crc { crc: 0xFFFF }
    }

    pub fn accumulate(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            let mut tmp = b ^ (self.crc & 0xFF) as u8;
            tmp ^= tmp << 4;
            let tmp = tmp as u16;
            self.crc = (self.crc >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4);
        }
        self
    }

    pub fn accumulate_str(&mut self, s: &str) -> &mut Self {
        self.accumulate(s.as_bytes())
    }

    pub fn value(&self) -> u16 {
        self.crc
    }

    /// Fold the register into one byte: low byte XOR high byte.
    pub fn fold(&self) -> u8 {
        ((self.crc & 0xFF) as u8) ^ ((self.crc >> 8) as u8)
    }
}

/// Derived per-message layout values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLayout {
    /// Payload bytes of the base segment (MAVLink 1 layout).
    pub base_size: usize,
    /// Payload bytes including extensions (MAVLink 2 layout).
    pub extended_size: usize,
    pub crc_extra: u8,
}

impl MessageLayout {
    /// `fields` must already be in wire order.
    pub fn compute(wire_name: &str, fields: &[Field], extensions_start: usize) -> Self {
        let (base_size, extended_size) = wire_sizes(fields, extensions_start);
        MessageLayout {
            base_size,
            extended_size,
            crc_extra: crc_extra(wire_name, &fields[..extensions_start.min(fields.len())]),
        }
    }
}

/// Stable-sort the base segment by descending type size; the extension segment is left alone.
pub fn reorder_fields(fields: &mut [Field], extensions_start: usize) {
    let end = extensions_start.min(fields.len());
    fields[..end].sort_by(|a, b| b.field_type.primitive.size().cmp(&a.field_type.primitive.size()));
}

/// `(base, extended)` payload sizes.
pub fn wire_sizes(fields: &[Field], extensions_start: usize) -> (usize, usize) {
    let end = extensions_start.min(fields.len());
    let base: usize = fields[..end].iter().map(|f| f.field_type.wire_size()).sum();
    let extra: usize = fields[end..].iter().map(|f| f.field_type.wire_size()).sum();
    (base, base + extra)
}

/// CRC-extra seed over the message name and its base fields (in wire order). Names are taken as
/// written in the definition file, before reserved-name remapping (`DEBUG` hashes to 46).
pub fn crc_extra(wire_name: &str, base_fields: &[Field]) -> u8 {
    let mut crc = X25Crc::new();
    crc.accumulate_str(wire_name).accumulate_str(" ");
    for f in base_fields {
        crc.accumulate_str(f.field_type.primitive.crc_name())
            .accumulate_str(" ")
            .accumulate_str(&f.wire_name)
            .accumulate_str(" ");
        if let Some(n) = f.field_type.count {
            crc.accumulate(&[n]);
        }
    }
    crc.fold()
}
