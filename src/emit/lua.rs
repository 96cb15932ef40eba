//! Wireshark Lua dissector backend.
//!
//! Every message gets a payload dissector with static field offsets; payloads shorter than the
//! extended size are zero-padded before decoding. The frame dispatcher understands both MAVLink 1
//! and MAVLink 2 headers.

use super::{line_comment, Artifact, Emitter, GENERATED_BANNER};
use crate::config::Target;
use crate::error::GenError;
use crate::model::{Field, Message, ProtocolModel};
use crate::types::PrimitiveType;
use std::fmt::Write;

pub const DISSECTOR_PATH: &str = "auto_mavlink_dissector.lua";

pub const UDP_PORTS: &[u16] = &[14550];
pub const TCP_PORTS: &[u16] = &[14555, 14556, 14557, 40115];

pub struct LuaEmitter;

impl Emitter for LuaEmitter {
    fn target(&self) -> Target {
        Target::Lua
    }

    fn emit(&self, model: &ProtocolModel) -> Result<Vec<Artifact>, GenError> {
        Ok(vec![Artifact::new(DISSECTOR_PATH, render_dissector(model)?)])
    }
}

/// `ProtoField` constructor for one element of a field.
pub fn proto_field_type(field: &Field) -> &'static str {
    if field.field_type.is_string() {
        return "string";
    }
    match field.field_type.primitive {
        PrimitiveType::Char | PrimitiveType::Uint8 | PrimitiveType::Uint8Version => "uint8",
        PrimitiveType::Int8 => "int8",
        PrimitiveType::Uint16 => "uint16",
        PrimitiveType::Int16 => "int16",
        PrimitiveType::Uint32 => "uint32",
        PrimitiveType::Int32 => "int32",
        PrimitiveType::Uint64 => "uint64",
        PrimitiveType::Int64 => "int64",
        PrimitiveType::Float => "float",
        PrimitiveType::Double => "double",
    }
}

/// One decoded item of a field: a scalar, one array element, or a whole string.
struct FieldItem {
    /// Suffix of the field key (`_0`, `_1`, ...) for array elements.
    key_suffix: String,
    label_suffix: String,
    size: usize,
}

fn field_items(field: &Field) -> Vec<FieldItem> {
    let t = &field.field_type;
    if t.is_string() || !t.is_array() {
        return vec![FieldItem { key_suffix: String::new(), label_suffix: String::new(), size: t.wire_size() }];
    }
    (0..t.count())
        .map(|i| FieldItem {
            key_suffix: format!("_{}", i),
            label_suffix: format!("[{}]", i),
            size: t.primitive.size(),
        })
        .collect()
}

fn message_ident(model: &ProtocolModel, msg: &Message) -> String {
    msg.qualified_name(model.context()).joined("_")
}

/// Name of the value table for `field`, when it has an enumeration Wireshark can display.
fn value_table(model: &ProtocolModel, msg: &Message, field: &Field) -> Option<String> {
    let t = &field.field_type;
    if !t.primitive.is_integer() || t.primitive.size() > 4 {
        return None;
    }
    let message = msg.qualified_name(model.context()).to_string();
    let qualified = model.associations.lookup(&message, &field.name)?;
    let e = model.get_enum(qualified)?;
    Some(format!("enum_{}", e.qualified_name(model.context()).joined("_")))
}

const PROLOGUE: &str = r#"
mavlink_proto = Proto("mavlink_proto", "MAVLink protocol")
local f = mavlink_proto.fields
"#;

const HEADER_FIELDS: &str = r#"
f.magic = ProtoField.uint8("mavlink_proto.magic", "Magic value / version", base.HEX)
f.length = ProtoField.uint8("mavlink_proto.length", "Payload length")
f.incompat_flags = ProtoField.uint8("mavlink_proto.incompat_flags", "Incompatibility flags", base.HEX)
f.compat_flags = ProtoField.uint8("mavlink_proto.compat_flags", "Compatibility flags", base.HEX)
f.sequence = ProtoField.uint8("mavlink_proto.sequence", "Packet sequence")
f.sysid = ProtoField.uint8("mavlink_proto.sysid", "System id")
f.compid = ProtoField.uint8("mavlink_proto.compid", "Component id")
f.msgid = ProtoField.uint24("mavlink_proto.msgid", "Message id", base.DEC, messageName)
f.payload = ProtoField.uint24("mavlink_proto.payload", "Payload", base.DEC, messageName)
f.crc = ProtoField.uint16("mavlink_proto.crc", "Message CRC", base.HEX)
f.signature_link = ProtoField.uint8("mavlink_proto.signature_link", "Signature link id")
f.signature_time = ProtoField.bytes("mavlink_proto.signature_time", "Signature timestamp")
f.signature = ProtoField.bytes("mavlink_proto.signature", "Signature")
f.rawpayload = ProtoField.bytes("mavlink_proto.rawpayload", "Unparsable payload")

-- payload bytes padded with zeros up to the size the dissector expects
local function payload_tvb(buffer, offset, len, wire_len)
    if len >= wire_len then
        return buffer(offset, wire_len):tvb()
    end
    local bytes = ByteArray.new()
    if len > 0 then
        bytes = buffer(offset, len):bytes()
    end
    bytes:set_size(wire_len)
    return bytes:tvb("Zero-padded payload")
end

local function check_payload_length(tree, len, base_len, wire_len)
    if len < base_len then
        tree:add_expert_info(PI_MALFORMED, PI_WARN,
            "Payload truncated: " .. len .. " of " .. base_len .. " bytes, missing bytes read as zero")
    elseif len > wire_len then
        tree:add_expert_info(PI_PROTOCOL, PI_NOTE,
            "Payload longer than known fields: " .. len .. " of " .. wire_len .. " bytes")
    end
end
"#;

const DISPATCHER: &str = r#"
-- dissect one frame starting at offset; nil when more bytes are needed
local function dissect_frame(buffer, pinfo, tree, offset)
    local bytes_remaining = buffer:len() - offset
    local v2 = buffer(offset, 1):uint() == 0xfd
    local header_len = 6
    if v2 then
        header_len = 10
    end

    if bytes_remaining < header_len then
        pinfo.desegment_offset = offset
        pinfo.desegment_len = header_len - bytes_remaining
        return nil
    end

    local payload_len = buffer(offset + 1, 1):uint()
    local signature_len = 0
    if v2 and buffer(offset + 2, 1):uint() % 2 == 1 then
        signature_len = 13
    end
    local frame_len = header_len + payload_len + 2 + signature_len
    if frame_len > bytes_remaining then
        pinfo.desegment_offset = offset
        pinfo.desegment_len = frame_len - bytes_remaining
        return nil
    end

    local msgid
    if v2 then
        msgid = buffer(offset + 7, 3):le_uint()
    else
        msgid = buffer(offset + 5, 1):uint()
    end
    local name = messageName[msgid]
    local label = name or ("msg " .. msgid)
    local subtree = tree:add(mavlink_proto, buffer(offset, frame_len), "mavlink " .. label .. " (" .. frame_len .. ")")

    local header = subtree:add(mavlink_proto, buffer(offset, header_len), "Header")
    header:add(f.magic, buffer(offset, 1))
    header:add(f.length, buffer(offset + 1, 1))
    if v2 then
        pinfo.cols.protocol = "MAVLink 2.0"
        header:add(f.incompat_flags, buffer(offset + 2, 1))
        header:add(f.compat_flags, buffer(offset + 3, 1))
        header:add(f.sequence, buffer(offset + 4, 1))
        header:add(f.sysid, buffer(offset + 5, 1))
        header:add(f.compid, buffer(offset + 6, 1))
        header:add_le(f.msgid, buffer(offset + 7, 3))
    else
        pinfo.cols.protocol = "MAVLink 1.0"
        header:add(f.sequence, buffer(offset + 2, 1))
        header:add(f.sysid, buffer(offset + 3, 1))
        header:add(f.compid, buffer(offset + 4, 1))
        header:add(f.msgid, buffer(offset + 5, 1))
    end
    offset = offset + header_len

    local fn = payload_dissectors[msgid]
    if fn == nil then
        subtree:add_expert_info(PI_MALFORMED, PI_ERROR, "Unknown message type")
        if payload_len > 0 then
            subtree:add(f.rawpayload, buffer(offset, payload_len))
        end
    else
        local payload = subtree:add(f.payload, msgid)
        fn(buffer, payload, offset, payload_len)
    end
    pinfo.cols.info:append(" " .. label)
    offset = offset + payload_len

    subtree:add_le(f.crc, buffer(offset, 2))
    offset = offset + 2

    if signature_len > 0 then
        subtree:add(f.signature_link, buffer(offset, 1))
        subtree:add(f.signature_time, buffer(offset + 1, 6))
        subtree:add(f.signature, buffer(offset + 7, 6))
        offset = offset + signature_len
    end
    return offset
end

function mavlink_proto.dissector(buffer, pinfo, tree)
    local offset = 0
    pinfo.cols.info = "mavlink"

    while offset < buffer:len() do
        local magic = buffer(offset, 1):uint()
        if magic ~= 0xfe and magic ~= 0xfd then
            -- not a frame start, resynchronize on the next byte
            offset = offset + 1
        elseif buffer:len() - offset < 2 then
            pinfo.desegment_offset = offset
            pinfo.desegment_len = DESEGMENT_ONE_MORE_SEGMENT
            return
        else
            local next_offset = dissect_frame(buffer, pinfo, tree, offset)
            if next_offset == nil then
                return
            end
            offset = next_offset
        end
    end
    return offset
end
"#;

fn render_tables(out: &mut String, model: &ProtocolModel) -> std::fmt::Result {
    let ctx = model.context();
    out.push_str("\nmessageName = {\n");
    for msg in &model.messages {
        writeln!(out, "[{}] = '{}',", msg.id, msg.qualified_name(ctx))?;
    }
    out.push_str("}\n\n");
    for e in &model.enums {
        writeln!(out, "enum_{} = {{", e.qualified_name(ctx).joined("_"))?;
        for entry in &e.entries {
            writeln!(out, "[{}] = '{}',", entry.value, entry.name)?;
        }
        out.push_str("}\n\n");
    }
    Ok(())
}

fn render_field_declarations(out: &mut String, model: &ProtocolModel, msg: &Message) -> std::fmt::Result {
    let ident = message_ident(model, msg);
    if let Some(d) = &msg.description {
        line_comment(out, "--", d, 0);
    }
    for field in &msg.fields {
        let ltype = proto_field_type(field);
        let table = value_table(model, msg, field);
        for item in field_items(field) {
            let key = format!("{}_{}{}", ident, field.name, item.key_suffix);
            write!(
                out,
                "f.{key} = ProtoField.{ltype}(\"mavlink_proto.{key}\", \"{name}{label} ({ltype})\"",
                key = key,
                ltype = ltype,
                name = field.name,
                label = item.label_suffix
            )?;
            match &table {
                Some(t) => writeln!(out, ", base.DEC, {})", t)?,
                None => out.push_str(")\n"),
            }
        }
    }
    out.push('\n');
    Ok(())
}

fn render_payload_dissector(out: &mut String, model: &ProtocolModel, msg: &Message) -> std::fmt::Result {
    let ident = message_ident(model, msg);
    let layout = &msg.layout;
    writeln!(out, "-- dissect payload of message type {}", msg.qualified_name(model.context()))?;
    writeln!(out, "payload_dissectors[{}] = function(buffer, tree, offset, len)", msg.id)?;
    writeln!(
        out,
        "    check_payload_length(tree, len, {}, {})",
        layout.base_size, layout.extended_size
    )?;
    if layout.extended_size > 0 {
        writeln!(out, "    local payload = payload_tvb(buffer, offset, len, {})", layout.extended_size)?;
        let mut at = 0usize;
        for field in &msg.fields {
            for item in field_items(field) {
                writeln!(
                    out,
                    "    tree:add_le(f.{}_{}{}, payload({}, {}))",
                    ident, field.name, item.key_suffix, at, item.size
                )?;
                at += item.size;
            }
        }
    }
    out.push_str("end\n\n");
    Ok(())
}

pub fn render_dissector(model: &ProtocolModel) -> Result<String, GenError> {
    let mut out = String::new();
    line_comment(
        &mut out,
        "--",
        &format!(
            "{}\n\nWireshark dissector for the MAVLink protocol.\n\nUsage: copy this file into the Wireshark plugins directory.",
            GENERATED_BANNER
        ),
        0,
    );
    out.push_str(PROLOGUE);
    render_tables(&mut out, model)?;
    out.push_str(HEADER_FIELDS);
    out.push('\n');

    for msg in &model.messages {
        render_field_declarations(&mut out, model, msg)?;
    }
    // one table instead of a local per message: a Lua chunk holds at most 200 locals
    out.push_str("local payload_dissectors = {}\n\n");
    for msg in &model.messages {
        render_payload_dissector(&mut out, model, msg)?;
    }
    out.push_str(DISPATCHER);

    out.push_str("\nlocal udp_encap = DissectorTable.get(\"udp.port\")\n");
    for port in UDP_PORTS {
        writeln!(out, "udp_encap:add({}, mavlink_proto)", port)?;
    }
    out.push_str("local tcp_encap = DissectorTable.get(\"tcp.port\")\n");
    for port in TCP_PORTS {
        writeln!(out, "tcp_encap:add({}, mavlink_proto)", port)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderContext;
    use crate::generator::{load_model, Source};
    use mlua::Lua;

    const COMMON: &str = r#"<mavlink>
  <enums>
    <enum name="MAV_TYPE">
      <entry value="0" name="MAV_TYPE_GENERIC"/>
      <entry value="2" name="MAV_TYPE_QUADROTOR"/>
    </enum>
    <enum name="MAV_STATE">
      <entry name="MAV_STATE_UNINIT"/>
      <entry name="MAV_STATE_BOOT"/>
    </enum>
  </enums>
  <messages>
    <message id="0" name="HEARTBEAT">
      <description>Presence.</description>
      <field type="uint8_t" name="type">Type.</field>
      <field type="uint32_t" name="custom_mode">Mode.</field>
      <field type="uint8_t" name="system_status">Status.</field>
      <field type="uint8_t_mavlink_version" name="mavlink_version">Version.</field>
    </message>
    <message id="30" name="ATTITUDE_Q">
      <field type="float[4]" name="q">Quaternion.</field>
      <field type="char[5]" name="tag">Tag.</field>
      <extensions/>
      <field type="uint64_t" name="stamp" enum="MAV_STATE">Stamp.</field>
    </message>
    <message id="300" name="EMPTY"/>
  </messages>
</mavlink>"#;

    /// Minimal stand-ins for the Wireshark Lua API used by the dissector. Decoded values land in
    /// `seen[abbr]` (ranges up to 4 bytes as integers, longer ones as their length) and expert
    /// info texts in `experts`.
    const WIRESHARK_STUB: &str = r#"
base = { DEC = 1, HEX = 2 }
PI_MALFORMED, PI_PROTOCOL = 1, 2
PI_ERROR, PI_WARN, PI_NOTE = 1, 2, 3
DESEGMENT_ONE_MORE_SEGMENT = 0x0fffffff

ports = {}
DissectorTable = {
    get = function(name)
        return { add = function(_, port, proto) ports[name .. ":" .. port] = proto end }
    end,
}

function Proto(name, description)
    return { name = name, description = description, fields = {} }
end

ProtoField = setmetatable({}, {
    __index = function(_, kind)
        return function(abbr, label, display, values)
            return { kind = kind, abbr = abbr, label = label, values = values }
        end
    end,
})

local Range = {}
Range.__index = Range

local function new_range(data, offset, len)
    assert(offset >= 0 and len >= 0 and offset + len <= #data,
        "range " .. offset .. "+" .. len .. " outside " .. #data .. " bytes")
    return setmetatable({ data = data, offset = offset, length = len }, Range)
end

function Range:uint()
    local v = 0
    for i = 1, self.length do v = v * 256 + self.data[self.offset + i] end
    return v
end

function Range:le_uint()
    local v = 0
    for i = self.length, 1, -1 do v = v * 256 + self.data[self.offset + i] end
    return v
end

function Range:len() return self.length end

function Range:bytes()
    local b = ByteArray.new()
    for i = 1, self.length do b.data[i] = self.data[self.offset + i] end
    return b
end

function Range:tvb() return self:bytes():tvb("range") end

local Tvb = {}
Tvb.__index = Tvb
Tvb.__call = function(self, offset, len)
    return new_range(self.data, offset, len or (#self.data - offset))
end

function new_tvb(data) return setmetatable({ data = data }, Tvb) end
function Tvb:len() return #self.data end

ByteArray = {}
ByteArray.__index = ByteArray
function ByteArray.new() return setmetatable({ data = {} }, ByteArray) end
function ByteArray:set_size(n)
    for i = #self.data + 1, n do self.data[i] = 0 end
    for i = #self.data, n + 1, -1 do self.data[i] = nil end
end
function ByteArray:tvb(name) return new_tvb(self.data) end

local Tree = {}
Tree.__index = Tree
function new_tree() return setmetatable({}, Tree) end

local function record(field, value, little_endian)
    if type(field) == "table" and field.abbr ~= nil then
        if type(value) == "table" then
            if value.length <= 4 then
                value = little_endian and value:le_uint() or value:uint()
            else
                value = value.length
            end
        end
        seen[field.abbr] = value
    end
    return new_tree()
end
function Tree:add(field, value, label) return record(field, value, false) end
function Tree:add_le(field, value, label) return record(field, value, true) end
function Tree:add_expert_info(group, severity, text) table.insert(experts, text) end

local function column()
    local c = { text = "" }
    function c:append(s) self.text = self.text .. s end
    return c
end

function new_pinfo()
    local columns = { info = column(), protocol = column() }
    local cols = setmetatable({}, {
        __index = columns,
        __newindex = function(_, k, v) columns[k].text = tostring(v) end,
    })
    return { cols = cols }
end

function run_dissector(bytes)
    seen, experts = {}, {}
    pinfo = new_pinfo()
    return mavlink_proto.dissector(new_tvb(bytes), pinfo, new_tree())
end
"#;

    fn render(ctx: RenderContext) -> String {
        let model = load_model(&[Source::new("common.xml", COMMON)], ctx).unwrap();
        render_dissector(&model).unwrap()
    }

    /// Loads the stubbed API and `text`, then feeds `frame` to the dissector; the return value
    /// is stored in `consumed`.
    fn dissect(text: &str, frame: &[u8]) -> Lua {
        let lua = Lua::new();
        lua.load(WIRESHARK_STUB).exec().unwrap();
        lua.load(text).exec().unwrap();
        let bytes: Vec<String> = frame.iter().map(|b| b.to_string()).collect();
        let call = format!("consumed = run_dissector({{{}}})", bytes.join(", "));
        lua.load(call.as_str()).exec().unwrap();
        lua
    }

    fn int(lua: &Lua, expr: &str) -> Option<i64> {
        lua.load(format!("return {}", expr).as_str()).eval().unwrap()
    }

    fn string(lua: &Lua, expr: &str) -> String {
        lua.load(format!("return {}", expr).as_str()).eval().unwrap()
    }

    #[test]
    fn tables() {
        let text = render(RenderContext::default());
        assert!(text.contains("messageName = {\n[0] = 'HEARTBEAT',\n[30] = 'ATTITUDE_Q',\n[300] = 'EMPTY',\n}\n"));
        assert!(text.contains("enum_MAV_TYPE = {\n[0] = 'MAV_TYPE_GENERIC',\n[2] = 'MAV_TYPE_QUADROTOR',\n}\n"));
        assert!(text.contains("enum_MAV_STATE = {\n[0] = 'MAV_STATE_UNINIT',\n[1] = 'MAV_STATE_BOOT',\n}\n"));
    }

    #[test]
    fn field_declarations() {
        let text = render(RenderContext::default());
        assert!(text.contains(
            "f.HEARTBEAT_type = ProtoField.uint8(\"mavlink_proto.HEARTBEAT_type\", \"type (uint8)\", base.DEC, enum_MAV_TYPE)\n"
        ));
        assert!(text.contains(
            "f.HEARTBEAT_system_status = ProtoField.uint8(\"mavlink_proto.HEARTBEAT_system_status\", \"system_status (uint8)\", base.DEC, enum_MAV_STATE)\n"
        ));
        assert!(text.contains(
            "f.HEARTBEAT_mavlink_version = ProtoField.uint8(\"mavlink_proto.HEARTBEAT_mavlink_version\", \"mavlink_version (uint8)\")\n"
        ));
        assert!(text.contains("f.ATTITUDE_Q_q_3 = ProtoField.float(\"mavlink_proto.ATTITUDE_Q_q_3\", \"q[3] (float)\")\n"));
        assert!(text.contains("f.ATTITUDE_Q_tag = ProtoField.string(\"mavlink_proto.ATTITUDE_Q_tag\", \"tag (string)\")\n"));
        // 64-bit fields never get a value table
        assert!(text.contains("f.ATTITUDE_Q_stamp = ProtoField.uint64(\"mavlink_proto.ATTITUDE_Q_stamp\", \"stamp (uint64)\")\n"));
    }

    #[test]
    fn payload_dissectors_use_static_offsets() {
        let text = render(RenderContext::default());
        assert!(text.contains(
            "payload_dissectors[0] = function(buffer, tree, offset, len)\n    check_payload_length(tree, len, 7, 7)\n    local payload = payload_tvb(buffer, offset, len, 7)\n    tree:add_le(f.HEARTBEAT_custom_mode, payload(0, 4))\n    tree:add_le(f.HEARTBEAT_type, payload(4, 1))\n"
        ));
        assert!(text.contains("    tree:add_le(f.ATTITUDE_Q_q_1, payload(4, 4))\n"));
        assert!(text.contains("    tree:add_le(f.ATTITUDE_Q_tag, payload(16, 5))\n    tree:add_le(f.ATTITUDE_Q_stamp, payload(21, 8))\n"));
        assert!(text.contains("check_payload_length(tree, len, 21, 29)"));
        assert!(text.contains(
            "payload_dissectors[300] = function(buffer, tree, offset, len)\n    check_payload_length(tree, len, 0, 0)\nend\n"
        ));
    }

    #[test]
    fn ports() {
        let text = render(RenderContext::default());
        assert!(text.contains("udp_encap:add(14550, mavlink_proto)\n"));
        for port in [14555, 14556, 14557, 40115] {
            assert!(text.contains(&format!("tcp_encap:add({}, mavlink_proto)\n", port)));
        }
    }

    #[test]
    fn namespaced_identifiers() {
        let vendor = r#"<mavlink>
            <enums><enum name="MOUNT"><entry name="RETRACT"/></enum></enums>
            <messages>
            <message id="150" name="SENSOR_OFFSETS">
              <field type="int16_t[3]" name="mag_ofs">m</field>
              <field type="uint8_t" name="mount" enum="MOUNT">m</field>
            </message>
        </messages></mavlink>"#;
        let model = load_model(
            &[Source::new("common.xml", COMMON), Source::new("ardupilotmega.xml", vendor)],
            RenderContext::default(),
        )
        .unwrap();
        let text = render_dissector(&model).unwrap();
        assert!(text.contains("[150] = 'apm::SENSOR_OFFSETS',\n"));
        assert!(text.contains("f.apm_SENSOR_OFFSETS_mag_ofs_2 = ProtoField.int16("));
        assert!(text.contains("\"mount (uint8)\", base.DEC, enum_apm_MOUNT)\n"));
        assert!(text.contains("payload_dissectors[150] = function("));
    }

    #[test]
    fn large_model_compiles_and_registers() {
        let mut xml = String::from("<mavlink><messages>\n");
        for id in 0..300 {
            xml.push_str(&format!(
                "<message id=\"{id}\" name=\"MSG_{id}\"><field type=\"uint16_t\" name=\"a\">A</field>\
                 <field type=\"char[4]\" name=\"s\">S</field></message>\n",
                id = id
            ));
        }
        xml.push_str("</messages></mavlink>");
        let model = load_model(&[Source::new("common.xml", xml)], RenderContext::default()).unwrap();
        let text = render_dissector(&model).unwrap();

        let top_level_locals = text.lines().filter(|l| l.starts_with("local ")).count();
        assert!(top_level_locals < 10, "{} top-level locals", top_level_locals);

        let lua = Lua::new();
        lua.load(text.as_str()).into_function().expect("dissector compiles");
        lua.load(WIRESHARK_STUB).exec().unwrap();
        lua.load(text.as_str()).exec().unwrap();
        assert_eq!(int(&lua, "(function() local n = 0 for _ in pairs(messageName) do n = n + 1 end return n end)()"), Some(300));
        assert_eq!(string(&lua, "ports['udp.port:14550'].name"), "mavlink_proto");
        assert_eq!(string(&lua, "ports['tcp.port:40115'].name"), "mavlink_proto");
    }

    #[test]
    fn short_payload_is_zero_padded_after_resync() {
        let text = render(RenderContext::default());
        let frame = [
            0x00, 0x11, // garbage before the frame start
            0xfe, 5, 1, 2, 3, 0, // MAVLink 1 header, HEARTBEAT
            0x04, 0x03, 0x02, 0x01, 0x02, // custom_mode, type; status and version missing
            0xaa, 0xbb,
        ];
        let lua = dissect(&text, &frame);
        assert_eq!(int(&lua, "consumed"), Some(15));
        assert_eq!(int(&lua, "seen['mavlink_proto.msgid']"), Some(0));
        assert_eq!(int(&lua, "seen['mavlink_proto.HEARTBEAT_custom_mode']"), Some(0x0102_0304));
        assert_eq!(int(&lua, "seen['mavlink_proto.HEARTBEAT_type']"), Some(2));
        assert_eq!(int(&lua, "seen['mavlink_proto.HEARTBEAT_system_status']"), Some(0));
        assert_eq!(int(&lua, "seen['mavlink_proto.HEARTBEAT_mavlink_version']"), Some(0));
        assert_eq!(int(&lua, "seen['mavlink_proto.crc']"), Some(0xbbaa));
        assert_eq!(
            string(&lua, "table.concat(experts, '|')"),
            "Payload truncated: 5 of 7 bytes, missing bytes read as zero"
        );
        assert_eq!(string(&lua, "pinfo.cols.protocol.text"), "MAVLink 1.0");
        assert_eq!(string(&lua, "pinfo.cols.info.text"), "mavlink HEARTBEAT");
    }

    #[test]
    fn long_payload_gets_a_note() {
        let text = render(RenderContext::default());
        let frame = [0xfe, 9, 0, 1, 1, 0, 1, 0, 0, 0, 7, 3, 4, 0xff, 0xff, 0, 0];
        let lua = dissect(&text, &frame);
        assert_eq!(int(&lua, "consumed"), Some(frame.len() as i64));
        assert_eq!(int(&lua, "seen['mavlink_proto.HEARTBEAT_custom_mode']"), Some(1));
        assert_eq!(int(&lua, "seen['mavlink_proto.HEARTBEAT_mavlink_version']"), Some(4));
        assert_eq!(
            string(&lua, "table.concat(experts, '|')"),
            "Payload longer than known fields: 9 of 7 bytes"
        );
    }

    #[test]
    fn mavlink2_frame_with_signature() {
        let text = render(RenderContext::default());
        let mut frame = vec![
            0xfd, 0, 0x01, 0, 9, 1, 1, 0x2c, 0x01, 0x00, // header, message 300, signed
            0x12, 0x34, // crc
            5, // link id
        ];
        frame.extend_from_slice(&[0; 12]);
        let lua = dissect(&text, &frame);
        assert_eq!(int(&lua, "consumed"), Some(25));
        assert_eq!(int(&lua, "seen['mavlink_proto.msgid']"), Some(300));
        assert_eq!(int(&lua, "seen['mavlink_proto.incompat_flags']"), Some(1));
        assert_eq!(int(&lua, "seen['mavlink_proto.signature_link']"), Some(5));
        assert_eq!(string(&lua, "pinfo.cols.protocol.text"), "MAVLink 2.0");
        assert_eq!(string(&lua, "pinfo.cols.info.text"), "mavlink EMPTY");
        assert_eq!(string(&lua, "table.concat(experts, '|')"), "");
    }

    #[test]
    fn unknown_message_keeps_raw_payload() {
        let text = render(RenderContext::default());
        let frame = [0xfe, 2, 0, 1, 1, 99, 0xab, 0xcd, 0, 0];
        let lua = dissect(&text, &frame);
        assert_eq!(int(&lua, "consumed"), Some(10));
        assert_eq!(int(&lua, "seen['mavlink_proto.rawpayload']"), Some(0xabcd));
        assert_eq!(string(&lua, "table.concat(experts, '|')"), "Unknown message type");
        assert_eq!(string(&lua, "pinfo.cols.info.text"), "mavlink msg 99");
    }

    #[test]
    fn partial_frames_ask_for_more_bytes() {
        let text = render(RenderContext::default());

        // full MAVLink 2 header, payload cut short
        let lua = dissect(&text, &[0x42, 0xfd, 9, 0, 0, 1, 1, 1, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(int(&lua, "consumed"), None);
        assert_eq!(int(&lua, "pinfo.desegment_offset"), Some(1));
        assert_eq!(int(&lua, "pinfo.desegment_len"), Some(7));

        // header cut short
        let lua = dissect(&text, &[0xfe, 5, 0]);
        assert_eq!(int(&lua, "consumed"), None);
        assert_eq!(int(&lua, "pinfo.desegment_offset"), Some(0));
        assert_eq!(int(&lua, "pinfo.desegment_len"), Some(3));

        // lone frame start at the end of the buffer
        let lua = dissect(&text, &[0x01, 0xfe]);
        assert_eq!(int(&lua, "pinfo.desegment_offset"), Some(1));
        assert_eq!(int(&lua, "pinfo.desegment_len"), Some(0x0fff_ffff));
    }
}
