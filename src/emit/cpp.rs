//! C++ backend: enumeration and message-id header, message payload header, and the
//! out-of-line metadata implementation consumed by the vehicle-side serialization runtime.

use super::{block_comment, entry_comment, namespace_groups, Artifact, Emitter, GENERATED_BANNER};
use crate::config::Target;
use crate::error::GenError;
use crate::model::{Enumeration, Field, Message, ProtocolModel};
use crate::types::{FieldType, PrimitiveType};
use std::fmt::Write;

pub const ENUMS_HEADER: &str = "include/ugcs/vsm/auto_mavlink_enums.h";
pub const MESSAGES_HEADER: &str = "include/ugcs/vsm/auto_mavlink_messages.h";
pub const MESSAGES_IMPL: &str = "auto_mavlink_messages.cpp";

/// CRC-extra map type. The runtime declares the record as
/// `struct Extra_byte_length_info { uint8_t crc_extra; uint16_t base_length; uint16_t extended_length; }`
/// and `Extension::Get_crc_extra_byte_map()` returns a pointer to this map.
const CRC_MAP_TYPE: &str = "std::map<MESSAGE_ID_TYPE, Extra_byte_length_info>";

pub struct CppEmitter;

impl Emitter for CppEmitter {
    fn target(&self) -> Target {
        Target::Cpp
    }

    fn emit(&self, model: &ProtocolModel) -> Result<Vec<Artifact>, GenError> {
        Ok(vec![
            Artifact::new(ENUMS_HEADER, render_enums(model)?),
            Artifact::new(MESSAGES_HEADER, render_messages_header(model)?),
            Artifact::new(MESSAGES_IMPL, render_messages_impl(model)?),
        ])
    }
}

/// Runtime scalar type name.
pub fn scalar_name(t: PrimitiveType) -> &'static str {
    match t {
        PrimitiveType::Char => "Char",
        PrimitiveType::Uint8 => "Uint8",
        PrimitiveType::Int8 => "Int8",
        PrimitiveType::Uint16 => "Uint16",
        PrimitiveType::Int16 => "Int16",
        PrimitiveType::Uint32 => "Uint32",
        PrimitiveType::Int32 => "Int32",
        PrimitiveType::Uint64 => "Uint64",
        PrimitiveType::Int64 => "Int64",
        PrimitiveType::Float => "Float",
        PrimitiveType::Double => "Double",
        PrimitiveType::Uint8Version => "Uint8_version",
    }
}

/// Member type of a payload struct field. Char arrays get string semantics from the runtime's
/// `Value_array<Char, N>` specialization.
pub fn member_type(t: &FieldType) -> String {
    match t.count {
        Some(n) => format!("Value_array<{}, {}>", scalar_name(t.primitive), n),
        None => scalar_name(t.primitive).to_string(),
    }
}

/// Naming of one message in the generated sources.
struct MessageNames {
    /// Effective namespace; `None` when global or merged.
    namespace: Option<String>,
    name: String,
    lower: String,
}

impl MessageNames {
    fn of(model: &ProtocolModel, msg: &Message) -> Self {
        let q = msg.qualified_name(model.context());
        MessageNames { namespace: q.namespace, lower: q.name.to_lowercase(), name: q.name }
    }

    /// `ns::` or empty.
    fn prefix(&self) -> String {
        self.namespace.as_ref().map(|ns| format!("{}::", ns)).unwrap_or_default()
    }

    fn id_constant(&self) -> String {
        format!("{}MESSAGE_ID::{}", self.prefix(), self.name)
    }
}

fn open_namespace(out: &mut String, ns: Option<&str>) -> std::fmt::Result {
    match ns {
        Some(ns) => writeln!(out, "namespace {} {{", ns),
        None => Ok(()),
    }
}

fn close_namespace(out: &mut String, ns: Option<&str>) -> std::fmt::Result {
    match ns {
        Some(ns) => writeln!(out, "}} /* namespace {} */", ns),
        None => Ok(()),
    }
}

fn open_root(out: &mut String) {
    out.push_str("namespace ugcs {\nnamespace vsm {\nnamespace mavlink {\n\n");
}

fn close_root(out: &mut String) {
    out.push_str("} /* namespace mavlink */\n} /* namespace vsm */\n} /* namespace ugcs */\n");
}

fn render_enum(out: &mut String, model: &ProtocolModel, e: &Enumeration) -> Result<(), GenError> {
    let q = e.qualified_name(model.context());
    open_namespace(out, q.namespace.as_deref())?;
    if let Some(d) = &e.description {
        block_comment(out, d, 0);
    }
    writeln!(out, "enum {} {{", q.name)?;
    for entry in &e.entries {
        block_comment(out, &entry_comment(entry.description.as_deref(), &entry.params), 1);
        writeln!(out, "    {} = {},", entry.name, entry.value)?;
    }
    out.push_str("};\n");
    close_namespace(out, q.namespace.as_deref())?;
    out.push('\n');
    Ok(())
}

pub fn render_enums(model: &ProtocolModel) -> Result<String, GenError> {
    let mut out = String::new();
    block_comment(
        &mut out,
        &format!("{}\n\nEnumerations definitions for MAVLink protocol.", GENERATED_BANNER),
        0,
    );
    open_root(&mut out);
    for e in &model.enums {
        render_enum(&mut out, model, e)?;
    }

    block_comment(&mut out, "Mavlink message identifier.", 0);
    for (ns, messages) in namespace_groups(model) {
        open_namespace(&mut out, ns.as_deref())?;
        out.push_str("enum MESSAGE_ID: MESSAGE_ID_TYPE {\n");
        for msg in messages {
            if let Some(d) = &msg.description {
                block_comment(&mut out, d, 1);
            }
            writeln!(out, "    {} = {},", msg.name, msg.id)?;
        }
        out.push_str("};\n");
        close_namespace(&mut out, ns.as_deref())?;
        out.push('\n');
    }
    close_root(&mut out);
    Ok(out)
}

fn render_extension_class(out: &mut String, ns: &str) -> std::fmt::Result {
    writeln!(
        out,
        r#"namespace {ns} {{
    class Extension: public mavlink::Extension {{
    public:
        static const Extension &
        Get()
        {{
            return instance;
        }}

        virtual std::string
        Get_name() const override
        {{
            return "{ns}";
        }}

        virtual const {map} *
        Get_crc_extra_byte_map() const override
        {{
            return &crc_extra_bytes_length_map;
        }}

    private:
        static const Extension instance;
        static const {map} crc_extra_bytes_length_map;
    }};
}} /* namespace {ns} */
"#,
        ns = ns,
        map = CRC_MAP_TYPE
    )
}

fn render_member(out: &mut String, field: &Field) -> std::fmt::Result {
    if let Some(d) = &field.description {
        block_comment(out, d, 1);
    }
    writeln!(out, "    {} {};", member_type(&field.field_type), field.name)
}

fn render_message(out: &mut String, model: &ProtocolModel, msg: &Message) -> Result<(), GenError> {
    let names = MessageNames::of(model, msg);
    let ns = names.namespace.as_deref();
    let lower = &names.lower;
    if let Some(d) = &msg.description {
        block_comment(out, d, 0);
    }
    open_namespace(out, ns)?;
    out.push_str("namespace internal {\n");
    writeln!(out, "struct Pld_struct_{} {{", lower)?;
    block_comment(out, "Reset all fields to UgCS default values", 1);
    out.push_str("    void\n    Reset();\n");
    for field in msg.base_fields() {
        render_member(out, field)?;
    }
    if msg.has_extensions() {
        block_comment(out, "Extension fields, present in MAVLink 2 payloads only.", 1);
        for field in msg.extension_fields() {
            render_member(out, field)?;
        }
    }
    out.push_str("} __PACKED;\n\n");
    writeln!(out, "extern mavlink::internal::Field_descriptor pld_desc_{}[];\n", lower)?;
    writeln!(out, "extern const char pld_name_{}[];\n", lower)?;
    out.push_str("} /* namespace internal */\n\n");

    block_comment(out, &format!("@see internal::Pld_struct_{}", lower), 0);
    writeln!(out, "typedef Payload<internal::Pld_struct_{}, internal::pld_desc_{},", lower, lower)?;
    writeln!(out, "                internal::pld_name_{},", lower)?;
    writeln!(out, "                {},", names.id_constant())?;
    writeln!(out, "                {}>", msg.layout.crc_extra)?;
    writeln!(out, "    Pld_{};", lower)?;
    close_namespace(out, ns)?;

    let extension = ns.map(|ns| format!(", {}::Extension", ns)).unwrap_or_default();
    writeln!(
        out,
        "\ntemplate<>\nstruct Payload_type_mapper<{}{}> {{\n    typedef {}Pld_{} type;\n}};\n\n",
        names.id_constant(),
        extension,
        names.prefix(),
        lower
    )?;
    Ok(())
}

pub fn render_messages_header(model: &ProtocolModel) -> Result<String, GenError> {
    let mut out = String::new();
    block_comment(
        &mut out,
        &format!("{}\n\nMessages definitions for MAVLink protocol.", GENERATED_BANNER),
        0,
    );
    open_root(&mut out);
    for (ns, _) in namespace_groups(model) {
        if let Some(ns) = ns {
            render_extension_class(&mut out, &ns)?;
        }
    }
    for msg in &model.messages {
        render_message(&mut out, model, msg)?;
    }
    close_root(&mut out);
    Ok(out)
}

fn render_crc_entry(out: &mut String, model: &ProtocolModel, msg: &Message) -> std::fmt::Result {
    let names = MessageNames::of(model, msg);
    writeln!(
        out,
        "{{{},\n    {{{}, {}, {}}}}},",
        names.id_constant(),
        msg.layout.crc_extra,
        msg.layout.base_size,
        msg.layout.extended_size
    )
}

fn render_message_impl(out: &mut String, model: &ProtocolModel, msg: &Message) -> std::fmt::Result {
    let names = MessageNames::of(model, msg);
    let prefix = names.prefix();
    let lower = &names.lower;
    writeln!(out, "mavlink::internal::Field_descriptor mavlink::{}internal::pld_desc_{}[] = {{", prefix, lower)?;
    for field in &msg.fields {
        writeln!(
            out,
            "{{\"{}\", {}, {}}},",
            field.name,
            field.field_type.primitive.id_token(),
            field.field_type.count()
        )?;
    }
    out.push_str("{nullptr, NONE, 0}\n};\n\n");
    writeln!(out, "const char mavlink::{}internal::pld_name_{}[] = \"{}\";\n", prefix, lower, names.name)?;
    writeln!(out, "void\nmavlink::{}internal::Pld_struct_{}::Reset()\n{{", prefix, lower)?;
    for field in &msg.fields {
        writeln!(out, "    {}.Reset();", field.name)?;
    }
    out.push_str("}\n\n");
    Ok(())
}

pub fn render_messages_impl(model: &ProtocolModel) -> Result<String, GenError> {
    let mut out = String::new();
    block_comment(
        &mut out,
        &format!("{}\n\nMessages definitions for MAVLink protocol.", GENERATED_BANNER),
        0,
    );
    out.push_str("\n#include <ugcs/vsm/mavlink.h>\n\n");
    out.push_str("using namespace ugcs::vsm;\nusing namespace ugcs::vsm::mavlink;\n\n");

    let groups = namespace_groups(model);
    block_comment(&mut out, "Map values are {crc_extra, base_length, extended_length}.", 0);
    writeln!(out, "const {} mavlink::Extension::crc_extra_bytes_length_map = {{", CRC_MAP_TYPE)?;
    for (_, messages) in groups.iter().filter(|(ns, _)| ns.is_none()) {
        for msg in messages {
            render_crc_entry(&mut out, model, msg)?;
        }
    }
    out.push_str("};\n\n");

    for (ns, messages) in &groups {
        let Some(ns) = ns else { continue };
        let helper = format!("Extension_{}_type_helper", ns);
        writeln!(out, "using {} = ::ugcs::vsm::mavlink::{}::Extension;", helper, ns)?;
        writeln!(out, "const {} {}::instance;", helper, helper)?;
        writeln!(out, "const {} {}::crc_extra_bytes_length_map = {{", CRC_MAP_TYPE, helper)?;
        for msg in messages {
            render_crc_entry(&mut out, model, msg)?;
        }
        out.push_str("};\n\n");
    }

    for msg in &model.messages {
        render_message_impl(&mut out, model, msg)?;
    }
    Ok(out)
}
