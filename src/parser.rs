//! Parse MAVLink definition XML into schema entries using PEST.
//!
//! Only the XML subset found in definition files is supported: elements, quoted
//! attributes, text, CDATA, comments, processing instructions and character
//! references. The pest tree is first lowered into a small element tree, then the
//! `<mavlink>` vocabulary is read from it.

use crate::ast::*;
use crate::error::SchemaError;
use pest::Parser;
use pest_derive::Parser as PestParser;
use tracing::warn;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct SchemaParser;

/// Element tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text content of direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

/// Parse one definition file. `origin` names the source in error messages.
pub fn parse(origin: &str, source: &str) -> Result<SchemaDocument, SchemaError> {
    let malformed = |reason: String| SchemaError::Malformed {
        origin: origin.to_string(),
        reason,
    };
    let root = parse_xml(source).map_err(malformed)?;
    build_document(&root).map_err(|e| match e {
        BuildError::Structure(reason) => malformed(reason),
        BuildError::Schema(e) => e,
    })
}

/// Parse XML text into its root element.
pub fn parse_xml(source: &str) -> Result<Element, String> {
    let mut pairs = SchemaParser::parse(Rule::document, source)
        .map_err(|e| format!("Parse error: {}", e))?;
    let document = pairs.next().ok_or("Empty parse")?;
    let element = document
        .into_inner()
        .find(|p| p.as_rule() == Rule::element)
        .ok_or("missing root element")?;
    build_element(element)
}

fn build_element(pair: pest::iterators::Pair<Rule>) -> Result<Element, String> {
    let mut inner = pair.into_inner();
    let first = inner.next().ok_or("empty element")?;
    match first.as_rule() {
        Rule::empty_element => {
            let (name, attributes) = build_tag(first)?;
            Ok(Element { name, attributes, children: Vec::new() })
        }
        Rule::open_tag => {
            let (name, attributes) = build_tag(first)?;
            let content = inner.next().ok_or("element: missing content")?;
            let close = inner.next().ok_or("element: missing closing tag")?;
            let close_name = close
                .into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .ok_or("closing tag: missing name")?;
            if close_name != name {
                return Err(format!(
                    "mismatched closing tag </{}> for <{}>",
                    close_name, name
                ));
            }
            let children = build_content(content)?;
            Ok(Element { name, attributes, children })
        }
        other => Err(format!("unexpected element rule: {:?}", other)),
    }
}

fn build_tag(pair: pest::iterators::Pair<Rule>) -> Result<(String, Vec<(String, String)>), String> {
    let mut name = String::new();
    let mut attributes: Vec<(String, String)> = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::name => name = inner.as_str().to_string(),
            Rule::attribute => {
                let mut it = inner.into_inner();
                let key = it.next().ok_or("attribute: name")?.as_str().to_string();
                let raw = it.next().ok_or("attribute: value")?.as_str();
                if attributes.iter().any(|(k, _)| *k == key) {
                    return Err(format!("duplicate attribute '{}' on <{}>", key, name));
                }
                attributes.push((key, unescape(raw)?));
            }
            _ => {}
        }
    }
    if name.is_empty() {
        return Err("tag: missing name".to_string());
    }
    Ok((name, attributes))
}

fn build_content(pair: pest::iterators::Pair<Rule>) -> Result<Vec<Node>, String> {
    let mut children = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::element => children.push(Node::Element(build_element(inner)?)),
            Rule::text => children.push(Node::Text(unescape(inner.as_str())?)),
            Rule::cdata => {
                let raw = inner.into_inner().next().map(|p| p.as_str()).unwrap_or("");
                children.push(Node::Text(raw.to_string()));
            }
            _ => {}
        }
    }
    Ok(children)
}

/// Replace predefined entities and character references.
fn unescape(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| format!("unterminated entity in '{}'", raw))?;
        let entity = &after[..semi];
        let ch = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| format!("unknown entity '&{};'", entity))?
            }
        };
        out.push(ch);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

// ==================== MAVLink vocabulary ====================

enum BuildError {
    Structure(String),
    Schema(SchemaError),
}

impl From<String> for BuildError {
    fn from(s: String) -> Self {
        BuildError::Structure(s)
    }
}

impl From<&str> for BuildError {
    fn from(s: &str) -> Self {
        BuildError::Structure(s.to_string())
    }
}

fn build_document(root: &Element) -> Result<SchemaDocument, BuildError> {
    if root.name != "mavlink" {
        return Err(format!("root element must be <mavlink>, found <{}>", root.name).into());
    }
    let mut doc = SchemaDocument::default();
    for e in root.elements() {
        match e.name.as_str() {
            "include" => doc.includes.push(e.text().trim().to_string()),
            "version" => doc.version = Some(parse_u32("version", e.text().trim())?),
            "dialect" => doc.dialect = Some(parse_u32("dialect", e.text().trim())?),
            "enums" => {
                for en in e.elements().filter(|c| c.name == "enum") {
                    doc.enums.push(build_enum(en)?);
                }
            }
            "messages" => {
                for m in e.elements().filter(|c| c.name == "message") {
                    doc.messages.push(build_message(m)?);
                }
            }
            other => warn!(element = other, "ignoring unknown top-level element"),
        }
    }
    Ok(doc)
}

fn required<'a>(e: &'a Element, attr: &str) -> Result<&'a str, String> {
    e.attr(attr)
        .ok_or_else(|| format!("<{}> requires attribute '{}'", e.name, attr))
}

fn build_enum(e: &Element) -> Result<EnumDef, BuildError> {
    let name = required(e, "name")?.to_string();
    let mut description = None;
    let mut entries = Vec::new();
    for child in e.elements() {
        match child.name.as_str() {
            "description" => description = normalize_description(&child.text()),
            "entry" => entries.push(build_entry(child)?),
            _ => {}
        }
    }
    Ok(EnumDef { name, description, entries })
}

fn build_entry(e: &Element) -> Result<EntryDef, BuildError> {
    let name = required(e, "name")?.to_string();
    let value = match e.attr("value") {
        Some(v) => Some(
            parse_enum_value(v)
                .ok_or_else(|| format!("entry {}: invalid value '{}'", name, v))?,
        ),
        None => None,
    };
    let mut description = None;
    let mut params = Vec::new();
    for child in e.elements() {
        match child.name.as_str() {
            "description" => description = normalize_description(&child.text()),
            "param" => {
                let index = parse_u32("param index", required(child, "index")?)?;
                if index == 0 {
                    return Err(format!("entry {}: param index must be positive", name).into());
                }
                let text = normalize_description(&child.text()).unwrap_or_default();
                params.push((index, text));
            }
            _ => {}
        }
    }
    Ok(EntryDef { name, value, description, params })
}

fn build_message(e: &Element) -> Result<MessageDef, BuildError> {
    let name = required(e, "name")?.to_string();
    let id = parse_u32("message id", required(e, "id")?)?;
    let mut description = None;
    let mut fields = Vec::new();
    let mut extensions_at = None;
    for child in e.elements() {
        match child.name.as_str() {
            "description" => description = normalize_description(&child.text()),
            "extensions" => {
                if extensions_at.is_none() {
                    extensions_at = Some(fields.len());
                }
            }
            "field" => fields.push(build_field(child)?),
            _ => {}
        }
    }
    Ok(MessageDef { name, id, description, fields, extensions_at })
}

fn build_field(e: &Element) -> Result<FieldDef, BuildError> {
    let name = required(e, "name")?.to_string();
    let type_name = required(e, "type")?.to_string();
    // reject unknown types and bad counts while the source is still known
    crate::types::FieldType::parse(&type_name).map_err(BuildError::Schema)?;
    Ok(FieldDef {
        name,
        type_name,
        description: normalize_description(&e.text()),
        enum_name: e.attr("enum").map(str::to_string),
        units: e.attr("units").map(str::to_string),
    })
}

fn parse_u32(what: &str, s: &str) -> Result<u32, String> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid {}: '{}'", what, s))
}

/// Entry value: decimal, `0x` hex, `0b` binary or `2**N`.
pub fn parse_enum_value(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        return i64::from_str_radix(bin, 2).ok();
    }
    if let Some((base, exp)) = s.split_once("**") {
        let base: i64 = base.trim().parse().ok()?;
        let exp: u32 = exp.trim().parse().ok()?;
        return base.checked_pow(exp);
    }
    s.parse::<i64>().ok()
}

/// Collapse whitespace inside paragraphs; keep blank-line paragraph breaks. Empty text yields `None`.
pub fn normalize_description(text: &str) -> Option<String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            continue;
        }
        current.extend(line.split_whitespace());
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}
