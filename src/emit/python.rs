//! Python backend: a single module with enumeration classes, message ids and message
//! descriptor classes for tooling that introspects messages.

use super::{entry_comment, line_comment, Artifact, Emitter, GENERATED_BANNER};
use crate::config::Target;
use crate::error::GenError;
use crate::model::{Message, ProtocolModel};
use crate::types::PrimitiveType;
use std::fmt::Write;

pub const MODULE_PATH: &str = "auto_mavlink.py";

pub struct PythonEmitter;

impl Emitter for PythonEmitter {
    fn target(&self) -> Target {
        Target::Python
    }

    fn emit(&self, model: &ProtocolModel) -> Result<Vec<Artifact>, GenError> {
        Ok(vec![Artifact::new(MODULE_PATH, render_module(model)?)])
    }
}

/// Message class name: `HEARTBEAT` becomes `Heartbeat`, `apm::AHRS` becomes `Apm_ahrs`.
pub fn class_name(identifier: &str) -> String {
    let lower = identifier.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn message_ident(model: &ProtocolModel, msg: &Message) -> String {
    msg.qualified_name(model.context()).joined("_")
}

fn comment(out: &mut String, text: &str, indent: usize) {
    line_comment(out, "#", text, indent);
}

fn render_enums(out: &mut String, model: &ProtocolModel) -> Result<(), GenError> {
    comment(out, "Common enumerations", 0);
    out.push_str("\n\n");
    let mut names = Vec::with_capacity(model.enums.len());
    for e in &model.enums {
        let ident = e.qualified_name(model.context()).joined("_");
        if let Some(d) = &e.description {
            comment(out, d, 0);
        }
        writeln!(out, "class {}:", ident)?;
        for entry in &e.entries {
            comment(out, &entry_comment(entry.description.as_deref(), &entry.params), 1);
            writeln!(out, "    {} = {}", entry.name, entry.value)?;
        }
        if e.entries.is_empty() {
            out.push_str("    pass\n");
        }
        out.push_str("\n\n");
        names.push(ident);
    }

    comment(out, "Mavlink message identifier.", 0);
    out.push_str("class MESSAGE_ID:\n");
    for msg in &model.messages {
        if let Some(d) = &msg.description {
            comment(out, d, 1);
        }
        writeln!(out, "    {} = {}", message_ident(model, msg), msg.id)?;
    }
    if model.messages.is_empty() {
        out.push_str("    pass\n");
    }
    out.push_str("\n\n");

    out.push_str("enumList = [\n");
    for name in &names {
        writeln!(out, "    {},", name)?;
    }
    out.push_str("    MESSAGE_ID,\n]\n\n");
    Ok(())
}

fn render_field_types(out: &mut String) -> std::fmt::Result {
    out.push_str(
        "\nclass MsgFieldType:\n    def __init__(self, id, numElements):\n        self.id = id\n        self.numElements = numElements\n\n    # ID values for MAVLink types\n",
    );
    for t in PrimitiveType::ALL {
        writeln!(out, "    {} = {}", t.id_token(), t.index())?;
    }
    out.push_str(
        "\nclass MsgFieldDesc:\n    def __init__(self, name, type):\n        self.name = name\n        self.type = type\n\nclass Msg:\n\n",
    );
    Ok(())
}

fn render_message(out: &mut String, model: &ProtocolModel, msg: &Message) -> Result<(), GenError> {
    let ident = message_ident(model, msg);
    if let Some(d) = &msg.description {
        comment(out, d, 1);
    }
    writeln!(out, "    class {}:", class_name(&ident))?;
    writeln!(out, "        name = '{}'", msg.qualified_name(model.context()))?;
    writeln!(out, "        id = MESSAGE_ID.{}", ident)?;
    writeln!(out, "        crcExtraByte = {}", msg.layout.crc_extra)?;
    writeln!(out, "        baseSize = {}", msg.layout.base_size)?;
    writeln!(out, "        extendedSize = {}", msg.layout.extended_size)?;
    writeln!(out, "        extensionsStart = {}", msg.extensions_start)?;
    for field in &msg.fields {
        if let Some(d) = &field.description {
            comment(out, d, 2);
        }
        writeln!(
            out,
            "        fd_{0} = MsgFieldDesc('{0}', MsgFieldType(MsgFieldType.{1}, {2}))",
            field.name,
            field.field_type.primitive.id_token(),
            field.field_type.count()
        )?;
    }
    let descs: Vec<String> = msg.fields.iter().map(|f| format!("fd_{}", f.name)).collect();
    writeln!(out, "        fieldDescs = [{}]\n", descs.join(", "))?;
    Ok(())
}

pub fn render_module(model: &ProtocolModel) -> Result<String, GenError> {
    let mut out = String::new();
    comment(
        &mut out,
        &format!("{}\n\nDefinitions for MAVLink protocol.", GENERATED_BANNER),
        0,
    );
    out.push('\n');
    render_enums(&mut out, model)?;
    render_field_types(&mut out)?;
    for msg in &model.messages {
        render_message(&mut out, model, msg)?;
    }
    out.push_str("    list = [\n");
    for msg in &model.messages {
        writeln!(out, "        {},", class_name(&message_ident(model, msg)))?;
    }
    out.push_str("        ]\n");
    Ok(out)
}
