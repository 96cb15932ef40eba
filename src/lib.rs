//! # mavgen: MAVLink definition compiler
//!
//! Reads MAVLink message definition files (XML), builds a protocol model, computes the wire
//! layout and CRC-extra seed of every message, and renders one of three targets:
//!
//! - **C++**: enumeration/message-id header, payload struct header and metadata implementation
//! - **Python**: a module of enumeration and message descriptor classes
//! - **Lua**: a Wireshark dissector
//!
//! ## Layout rules
//!
//! - Base fields are stably reordered by descending type size; extension fields (declared after
//!   `<extensions/>`) keep declaration order.
//! - `base_size` covers the base fields, `extended_size` all fields.
//! - CRC-extra is the folded X.25 CRC of `NAME ` followed by `type name ` (plus the array length
//!   byte for arrays) of every base field.
//!
//! ## Example
//!
//! ```no_run
//! use mavgen::{load_model, RenderContext, Source};
//!
//! let xml = std::fs::read_to_string("common.xml").unwrap();
//! let model = load_model(&[Source::new("common.xml", xml)], RenderContext::default()).unwrap();
//! for m in &model.messages {
//!     println!("{} id={} crc_extra={}", m.name, m.id, m.layout.crc_extra);
//! }
//! ```

pub mod ast;
pub mod config;
pub mod emit;
pub mod error;
pub mod generator;
pub mod layout;
pub mod model;
pub mod parser;
pub mod types;

pub use config::{GeneratorConfig, RenderContext, Target};
pub use emit::{emitter_for, write_artifacts, Artifact, Emitter};
pub use error::{ConfigError, GenError, SchemaError};
pub use generator::{generate, load_model, Source};
pub use layout::{crc_extra, MessageLayout, X25Crc};
pub use model::{ModelBuilder, ProtocolModel};
pub use parser::parse;
pub use types::{FieldType, PrimitiveType};
