//! Protocol model: definition groups, enumerations, messages and fields, built from parsed
//! schema documents. The model is built once per run and read-only afterwards.

use crate::ast::{EnumDef, MessageDef, SchemaDocument};
use crate::config::RenderContext;
use crate::error::SchemaError;
use crate::layout::{reorder_fields, MessageLayout};
use crate::types::FieldType;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// Reserved symbols of target environments and their replacements.
const NAME_FILTER: &[(&str, &str)] = &[("DEBUG", "DEBUG_VALUE")];

/// Definition files whose namespace differs from their name.
const NAMESPACE_MAP: &[(&str, &str)] = &[("ardupilotmega", "apm")];

/// Group whose definitions live in the global namespace.
pub const COMMON_GROUP: &str = "common";

/// Re-map names colliding with target environment symbols.
pub fn filter_name(name: &str) -> String {
    NAME_FILTER
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Group name from a source identifier: file name without directory and `.xml` suffix.
pub fn group_name(source_id: &str) -> String {
    let base = source_id
        .rsplit(&['/', '\\'][..])
        .next()
        .unwrap_or(source_id);
    match base.strip_suffix(".xml") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

/// Namespace of a group; `None` is the global namespace.
pub fn derive_namespace(group_name: &str) -> Option<String> {
    if let Some((_, ns)) = NAMESPACE_MAP.iter().find(|(name, _)| *name == group_name) {
        return Some(ns.to_string());
    }
    if group_name == COMMON_GROUP {
        None
    } else {
        Some(group_name.to_string())
    }
}

/// Resolve entry values: an explicit value is kept, a missing one continues from the
/// previous entry + 1 (starting at 0).
pub fn resolve_values<I>(declared: I) -> Vec<i64>
where
    I: IntoIterator<Item = Option<i64>>,
{
    let mut next = 0i64;
    declared
        .into_iter()
        .map(|v| {
            let value = v.unwrap_or(next);
            next = value.wrapping_add(1);
            value
        })
        .collect()
}

/// Namespace-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub name: String,
}

impl QualifiedName {
    /// Identifier-safe form, joining namespace and name with `sep`.
    pub fn joined(&self, sep: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}{}{}", ns, sep, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}::{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// One schema source and its namespace.
#[derive(Debug, Clone)]
pub struct DefinitionGroup {
    /// Source identifier as given (usually a path).
    pub source: String,
    pub name: String,
    /// Derived namespace, independent of the merge mode.
    pub namespace: Option<String>,
    pub includes: Vec<String>,
    /// Indices into [`ProtocolModel::enums`] of enumerations first declared here.
    pub enums: Vec<usize>,
    /// Indices into [`ProtocolModel::messages`], declaration order.
    pub messages: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumEntry {
    pub name: String,
    /// Value as declared.
    pub declared: Option<i64>,
    /// Value after resolution over the merged entry list.
    pub value: i64,
    pub description: Option<String>,
    pub params: BTreeMap<u32, String>,
}

#[derive(Debug, Clone)]
pub struct Enumeration {
    pub name: String,
    pub namespace: Option<String>,
    pub group: usize,
    pub description: Option<String>,
    pub entries: Vec<EnumEntry>,
}

impl Enumeration {
    pub fn qualified_name(&self, ctx: &RenderContext) -> QualifiedName {
        QualifiedName {
            namespace: ctx.effective_namespace(self.namespace.as_deref()).map(str::to_string),
            name: self.name.clone(),
        }
    }

    fn add_entry(&mut self, entry: EnumEntry) -> Result<(), SchemaError> {
        if self.entries.iter().any(|e| e.name == entry.name) {
            return Err(SchemaError::DuplicateEnumEntry {
                enumeration: self.name.clone(),
                entry: entry.name,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    fn resolve(&mut self) {
        let values = resolve_values(self.entries.iter().map(|e| e.declared));
        for (entry, value) in self.entries.iter_mut().zip(values) {
            entry.value = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// Name as written in the schema; hashed into the CRC-extra seed.
    pub wire_name: String,
    pub field_type: FieldType,
    pub description: Option<String>,
    /// Enumeration named by the schema for this field.
    pub enum_name: Option<String>,
    pub units: Option<String>,
}

impl Field {
    pub fn new(name: &str, field_type: FieldType, description: Option<String>) -> Self {
        Field {
            name: filter_name(name),
            wire_name: name.to_string(),
            field_type,
            description,
            enum_name: None,
            units: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub name: String,
    pub wire_name: String,
    pub id: u32,
    pub namespace: Option<String>,
    pub group: usize,
    pub description: Option<String>,
    /// Wire order: reordered base segment, then extensions in declaration order.
    pub fields: Vec<Field>,
    pub extensions_start: usize,
    pub layout: MessageLayout,
}

impl Message {
    /// Build a message from its parsed definition: filter names, reorder and lay out fields.
    pub fn from_def(def: &MessageDef, namespace: Option<String>, group: usize) -> Result<Self, SchemaError> {
        let mut fields = Vec::with_capacity(def.fields.len());
        for fd in &def.fields {
            let mut field = Field::new(&fd.name, FieldType::parse(&fd.type_name)?, fd.description.clone());
            field.enum_name = fd.enum_name.clone();
            field.units = fd.units.clone();
            fields.push(field);
        }
        let extensions_start = def.extensions_boundary();
        reorder_fields(&mut fields, extensions_start);
        let layout = MessageLayout::compute(&def.name, &fields, extensions_start);
        Ok(Message {
            name: filter_name(&def.name),
            wire_name: def.name.clone(),
            id: def.id,
            namespace,
            group,
            description: def.description.clone(),
            fields,
            extensions_start,
            layout,
        })
    }

    pub fn qualified_name(&self, ctx: &RenderContext) -> QualifiedName {
        QualifiedName {
            namespace: ctx.effective_namespace(self.namespace.as_deref()).map(str::to_string),
            name: self.name.clone(),
        }
    }

    pub fn base_fields(&self) -> &[Field] {
        &self.fields[..self.extensions_start]
    }

    pub fn extension_fields(&self) -> &[Field] {
        &self.fields[self.extensions_start..]
    }

    pub fn has_extensions(&self) -> bool {
        self.extensions_start < self.fields.len()
    }
}

/// Field to enumeration associations used for display (value names) by the analyzer backend.
///
/// Keys are `(message, field)` for message-specific entries, with the message's qualified name
/// (`ns::NAME`), and `("", field)` for entries applying to any message; values are qualified
/// enumeration names present in the model.
#[derive(Debug, Clone, Default)]
pub struct EnumAssociations {
    map: HashMap<(String, String), String>,
}

/// Associations for definition files that predate the field `enum` attribute.
const LEGACY_ASSOCIATIONS: &[(&str, &str, &str)] = &[
    ("", "autopilot", "MAV_AUTOPILOT"),
    ("", "base_mode", "MAV_MODE"),
    ("", "system_status", "MAV_STATE"),
    ("MISSION_ACK", "type", "MAV_MISSION_RESULT"),
    ("HEARTBEAT", "type", "MAV_TYPE"),
    ("", "param_type", "MAV_PARAM_TYPE"),
    ("", "command", "MAV_CMD"),
    ("", "frame", "MAV_FRAME"),
    ("", "result", "MAV_RESULT"),
    ("", "mode", "MAV_MODE"),
    ("", "nav_mode", "MAV_NAV_MODE"),
    ("", "mount_mode", "MAV_MOUNT_MODE"),
    ("", "severity", "MAV_SEVERITY"),
];

impl EnumAssociations {
    fn build(messages: &[Message], enums_by_name: &HashMap<String, usize>, ctx: &RenderContext) -> Self {
        let mut map = HashMap::new();
        for (msg, field, enumeration) in LEGACY_ASSOCIATIONS {
            if enums_by_name.contains_key(*enumeration) {
                map.insert((msg.to_string(), field.to_string()), enumeration.to_string());
            }
        }
        for m in messages {
            let message = m.qualified_name(ctx).to_string();
            for f in &m.fields {
                let Some(name) = &f.enum_name else { continue };
                // the attribute names an enumeration of the message's own group or a global one
                let scoped = QualifiedName {
                    namespace: ctx.effective_namespace(m.namespace.as_deref()).map(str::to_string),
                    name: name.clone(),
                }
                .to_string();
                let resolved = [scoped, name.clone()]
                    .into_iter()
                    .find(|n| enums_by_name.contains_key(n));
                match resolved {
                    Some(qualified) => {
                        map.insert((message.clone(), f.name.clone()), qualified);
                    }
                    None => debug!(
                        message = %message,
                        field = %f.name,
                        enumeration = %name,
                        "dropping association to unknown enumeration"
                    ),
                }
            }
        }
        EnumAssociations { map }
    }

    /// Enumeration (qualified name) used to display `message.field`, if any. `message` is the
    /// qualified message name.
    pub fn lookup(&self, message: &str, field: &str) -> Option<&str> {
        self.map
            .get(&(message.to_string(), field.to_string()))
            .or_else(|| self.map.get(&(String::new(), field.to_string())))
            .map(String::as_str)
    }
}

/// The full load result.
#[derive(Debug, Clone)]
pub struct ProtocolModel {
    pub groups: Vec<DefinitionGroup>,
    pub enums: Vec<Enumeration>,
    pub messages: Vec<Message>,
    pub associations: EnumAssociations,
    context: RenderContext,
    groups_by_source: HashMap<String, usize>,
    enums_by_name: HashMap<String, usize>,
    messages_by_name: HashMap<String, usize>,
}

impl ProtocolModel {
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn get_group(&self, source: &str) -> Option<&DefinitionGroup> {
        self.groups_by_source.get(source).map(|&i| &self.groups[i])
    }

    /// Look up by qualified name (`ns::NAME`, or bare name for global/merged).
    pub fn get_enum(&self, qualified: &str) -> Option<&Enumeration> {
        self.enums_by_name.get(qualified).map(|&i| &self.enums[i])
    }

    pub fn get_message(&self, qualified: &str) -> Option<&Message> {
        self.messages_by_name.get(qualified).map(|&i| &self.messages[i])
    }

    pub fn group_of(&self, message: &Message) -> &DefinitionGroup {
        &self.groups[message.group]
    }

    pub fn messages_of<'a>(&'a self, group: &'a DefinitionGroup) -> impl Iterator<Item = &'a Message> + 'a {
        group.messages.iter().map(move |&i| &self.messages[i])
    }
}

/// Incrementally loads schema sources into a [`ProtocolModel`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    context: RenderContext,
    groups: Vec<DefinitionGroup>,
    enums: Vec<Enumeration>,
    messages: Vec<Message>,
    groups_by_source: HashMap<String, usize>,
    enums_by_name: HashMap<String, usize>,
    messages_by_name: HashMap<String, usize>,
    messages_by_id: HashMap<u32, usize>,
}

impl ModelBuilder {
    pub fn new(context: RenderContext) -> Self {
        ModelBuilder { context, ..Default::default() }
    }

    /// Add one parsed source. Enumerations are taken before messages.
    pub fn add_source(&mut self, source: &str, doc: &SchemaDocument) -> Result<&mut Self, SchemaError> {
        if self.groups_by_source.contains_key(source) {
            return Err(SchemaError::DuplicateSource(source.to_string()));
        }
        let name = group_name(source);
        let namespace = derive_namespace(&name);
        let group = self.groups.len();
        self.groups.push(DefinitionGroup {
            source: source.to_string(),
            name,
            namespace: namespace.clone(),
            includes: doc.includes.clone(),
            enums: Vec::new(),
            messages: Vec::new(),
        });
        self.groups_by_source.insert(source.to_string(), group);

        for def in &doc.enums {
            self.add_enum(def, group, namespace.clone())?;
        }
        for def in &doc.messages {
            self.add_message(def, group, namespace.clone())?;
        }
        Ok(self)
    }

    fn add_enum(&mut self, def: &EnumDef, group: usize, namespace: Option<String>) -> Result<(), SchemaError> {
        let mut enumeration = Enumeration {
            name: filter_name(&def.name),
            namespace,
            group,
            description: def.description.clone(),
            entries: Vec::with_capacity(def.entries.len()),
        };
        for e in &def.entries {
            let name = filter_name(&e.name);
            let mut params = BTreeMap::new();
            for (index, text) in &e.params {
                if params.insert(*index, text.clone()).is_some() {
                    return Err(SchemaError::DuplicateParam { entry: name, index: *index });
                }
            }
            enumeration.add_entry(EnumEntry {
                name,
                declared: e.value,
                value: 0,
                description: e.description.clone(),
                params,
            })?;
        }

        let qualified = enumeration.qualified_name(&self.context).to_string();
        match self.enums_by_name.get(&qualified) {
            Some(&existing) => {
                debug!(enumeration = %qualified, "merging enumeration entries");
                let target = &mut self.enums[existing];
                if target.description.is_none() {
                    target.description = enumeration.description;
                }
                for entry in enumeration.entries {
                    target.add_entry(entry)?;
                }
            }
            None => {
                let index = self.enums.len();
                self.enums.push(enumeration);
                self.enums_by_name.insert(qualified, index);
                self.groups[group].enums.push(index);
            }
        }
        Ok(())
    }

    fn add_message(&mut self, def: &MessageDef, group: usize, namespace: Option<String>) -> Result<(), SchemaError> {
        let message = Message::from_def(def, namespace, group)?;
        let qualified = message.qualified_name(&self.context).to_string();
        if self.messages_by_name.contains_key(&qualified) {
            return Err(SchemaError::DuplicateMessage(qualified));
        }
        if let Some(&other) = self.messages_by_id.get(&message.id) {
            return Err(SchemaError::DuplicateMessageId {
                id: message.id,
                first: self.messages[other].qualified_name(&self.context).to_string(),
                second: qualified,
            });
        }
        debug!(
            message = %qualified,
            id = message.id,
            base_size = message.layout.base_size,
            extended_size = message.layout.extended_size,
            crc_extra = message.layout.crc_extra,
            "message layout"
        );
        let index = self.messages.len();
        self.messages_by_id.insert(message.id, index);
        self.messages_by_name.insert(qualified, index);
        self.groups[group].messages.push(index);
        self.messages.push(message);
        Ok(())
    }

    /// Resolve enumeration values over the merged entries and freeze the model.
    pub fn finish(mut self) -> ProtocolModel {
        for e in &mut self.enums {
            e.resolve();
        }
        let associations = EnumAssociations::build(&self.messages, &self.enums_by_name, &self.context);
        ProtocolModel {
            groups: self.groups,
            enums: self.enums,
            messages: self.messages,
            associations,
            context: self.context,
            groups_by_source: self.groups_by_source,
            enums_by_name: self.enums_by_name,
            messages_by_name: self.messages_by_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EntryDef, FieldDef};

    fn entry(name: &str, value: Option<i64>) -> EntryDef {
        EntryDef { name: name.to_string(), value, description: None, params: Vec::new() }
    }

    fn enum_def(name: &str, entries: Vec<EntryDef>) -> EnumDef {
        EnumDef { name: name.to_string(), description: None, entries }
    }

    fn field_def(name: &str, ty: &str) -> FieldDef {
        FieldDef {
            name: name.to_string(),
            type_name: ty.to_string(),
            description: None,
            enum_name: None,
            units: None,
        }
    }

    fn message_def(name: &str, id: u32, fields: Vec<FieldDef>) -> MessageDef {
        MessageDef { name: name.to_string(), id, description: None, fields, extensions_at: None }
    }

    fn doc(enums: Vec<EnumDef>, messages: Vec<MessageDef>) -> SchemaDocument {
        SchemaDocument { enums, messages, ..Default::default() }
    }

    #[test]
    fn namespaces() {
        assert_eq!(derive_namespace("common"), None);
        assert_eq!(derive_namespace("ardupilotmega"), Some("apm".to_string()));
        assert_eq!(derive_namespace("vendorX"), Some("vendorX".to_string()));
        assert_eq!(group_name("defs/ardupilotmega.xml"), "ardupilotmega");
        assert_eq!(group_name("C:\\defs\\common.xml"), "common");
        assert_eq!(group_name("plain"), "plain");
    }

    #[test]
    fn reserved_names_are_filtered() {
        assert_eq!(filter_name("DEBUG"), "DEBUG_VALUE");
        assert_eq!(filter_name("HEARTBEAT"), "HEARTBEAT");
    }

    #[test]
    fn value_resolution() {
        assert_eq!(resolve_values(vec![None, None, Some(10), None, Some(3), None]), vec![0, 1, 10, 11, 3, 4]);
        assert!(resolve_values(Vec::<Option<i64>>::new()).is_empty());
    }

    #[test]
    fn filtered_message_keeps_wire_name_for_seed() {
        let mut b = ModelBuilder::new(RenderContext::default());
        b.add_source("common.xml", &doc(vec![], vec![message_def("DEBUG", 254, vec![
            field_def("time_boot_ms", "uint32_t"),
            field_def("ind", "uint8_t"),
            field_def("value", "float"),
        ])]))
        .unwrap();
        let model = b.finish();
        let m = model.get_message("DEBUG_VALUE").expect("filtered name");
        assert_eq!(m.wire_name, "DEBUG");
        // published seed for DEBUG
        assert_eq!(m.layout.crc_extra, 46);
    }

    #[test]
    fn duplicate_source_rejected() {
        let mut b = ModelBuilder::new(RenderContext::default());
        b.add_source("common.xml", &SchemaDocument::default()).unwrap();
        assert_eq!(
            b.add_source("common.xml", &SchemaDocument::default()).unwrap_err(),
            SchemaError::DuplicateSource("common.xml".to_string())
        );
    }

    #[test]
    fn duplicate_entry_and_param_rejected() {
        let mut b = ModelBuilder::new(RenderContext::default());
        let err = b
            .add_source("common.xml", &doc(vec![enum_def("E", vec![entry("A", None), entry("A", Some(3))])], vec![]))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateEnumEntry { .. }));

        let mut with_params = entry("B", None);
        with_params.params = vec![(1, "x".to_string()), (1, "y".to_string())];
        let mut b = ModelBuilder::new(RenderContext::default());
        let err = b.add_source("common.xml", &doc(vec![enum_def("E", vec![with_params])], vec![])).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateParam { entry: "B".to_string(), index: 1 });
    }

    #[test]
    fn enums_merge_across_groups_in_merge_mode() {
        let mut b = ModelBuilder::new(RenderContext::merged());
        b.add_source("common.xml", &doc(vec![enum_def("MAV_CMD", vec![entry("A", Some(5)), entry("B", None)])], vec![]))
            .unwrap();
        b.add_source("vendor.xml", &doc(vec![enum_def("MAV_CMD", vec![entry("C", None)])], vec![]))
            .unwrap();
        let model = b.finish();
        assert_eq!(model.enums.len(), 1);
        let e = model.get_enum("MAV_CMD").unwrap();
        let values: Vec<(String, i64)> = e.entries.iter().map(|x| (x.name.clone(), x.value)).collect();
        assert_eq!(values, vec![("A".into(), 5), ("B".into(), 6), ("C".into(), 7)]);
        assert_eq!(model.groups[0].enums, vec![0]);
        assert!(model.groups[1].enums.is_empty());
    }

    #[test]
    fn same_enum_in_distinct_namespaces_stays_separate() {
        let mut b = ModelBuilder::new(RenderContext::default());
        b.add_source("common.xml", &doc(vec![enum_def("MAV_CMD", vec![entry("A", None)])], vec![])).unwrap();
        b.add_source("vendor.xml", &doc(vec![enum_def("MAV_CMD", vec![entry("A", None)])], vec![])).unwrap();
        let model = b.finish();
        assert!(model.get_enum("MAV_CMD").is_some());
        assert!(model.get_enum("vendor::MAV_CMD").is_some());
    }

    #[test]
    fn merging_enum_with_itself_collides() {
        let e = enum_def("MAV_STATE", vec![entry("UNINIT", None), entry("BOOT", None)]);
        let mut b = ModelBuilder::new(RenderContext::default());
        let err = b.add_source("common.xml", &doc(vec![e.clone(), e], vec![])).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateEnumEntry { enumeration: "MAV_STATE".to_string(), entry: "UNINIT".to_string() }
        );
    }

    #[test]
    fn duplicate_message_name_and_id_rejected() {
        let mut b = ModelBuilder::new(RenderContext::default());
        let err = b
            .add_source("common.xml", &doc(vec![], vec![message_def("A", 1, vec![]), message_def("A", 2, vec![])]))
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateMessage("A".to_string()));

        let mut b = ModelBuilder::new(RenderContext::default());
        b.add_source("common.xml", &doc(vec![], vec![message_def("A", 1, vec![])])).unwrap();
        let err = b.add_source("vendor.xml", &doc(vec![], vec![message_def("B", 1, vec![])])).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateMessageId { id: 1, first: "A".to_string(), second: "vendor::B".to_string() }
        );
    }

    #[test]
    fn same_message_name_in_two_namespaces_collides_only_when_merged() {
        let sources = [
            ("common.xml", doc(vec![], vec![message_def("PING", 4, vec![])])),
            ("vendor.xml", doc(vec![], vec![message_def("PING", 200, vec![])])),
        ];
        let mut b = ModelBuilder::new(RenderContext::default());
        for (id, d) in &sources {
            b.add_source(id, d).unwrap();
        }
        let model = b.finish();
        assert_eq!(model.get_message("vendor::PING").map(|m| m.id), Some(200));

        let mut b = ModelBuilder::new(RenderContext::merged());
        b.add_source(sources[0].0, &sources[0].1).unwrap();
        assert_eq!(
            b.add_source(sources[1].0, &sources[1].1).unwrap_err(),
            SchemaError::DuplicateMessage("PING".to_string())
        );
    }

    #[test]
    fn qualified_names_follow_context() {
        let d = doc(vec![], vec![message_def("STATUS", 9, vec![])]);
        let mut b = ModelBuilder::new(RenderContext::default());
        b.add_source("ardupilotmega.xml", &d).unwrap();
        let model = b.finish();
        let m = &model.messages[0];
        assert_eq!(m.qualified_name(model.context()).to_string(), "apm::STATUS");
        assert_eq!(m.qualified_name(&RenderContext::merged()).to_string(), "STATUS");
        assert_eq!(m.qualified_name(model.context()).joined("_"), "apm_STATUS");
        assert_eq!(model.group_of(m).namespace.as_deref(), Some("apm"));
    }

    #[test]
    fn extension_boundary_splits_segments() {
        let mut def = message_def("M", 3, vec![
            field_def("a", "uint8_t"),
            field_def("b", "uint32_t"),
            field_def("c", "uint8_t"),
            field_def("d", "uint64_t"),
        ]);
        def.extensions_at = Some(2);
        let m = Message::from_def(&def, None, 0).unwrap();
        let base: Vec<&str> = m.base_fields().iter().map(|f| f.name.as_str()).collect();
        let ext: Vec<&str> = m.extension_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(base, vec!["b", "a"]);
        assert_eq!(ext, vec!["c", "d"]);
        assert!(m.has_extensions());
        assert_eq!(m.layout.base_size, 5);
        assert_eq!(m.layout.extended_size, 14);
    }

    #[test]
    fn associations_prefer_declared_then_legacy() {
        let mut status = field_def("state", "uint8_t");
        status.enum_name = Some("MAV_STATE".to_string());
        let mut dangling = field_def("other", "uint8_t");
        dangling.enum_name = Some("NOPE".to_string());
        let d = doc(
            vec![
                enum_def("MAV_STATE", vec![entry("UNINIT", None)]),
                enum_def("MAV_TYPE", vec![entry("GENERIC", None)]),
                enum_def("MAV_RESULT", vec![entry("ACCEPTED", None)]),
            ],
            vec![message_def("HEARTBEAT", 0, vec![field_def("type", "uint8_t"), status, dangling])],
        );
        let mut b = ModelBuilder::new(RenderContext::default());
        b.add_source("common.xml", &d).unwrap();
        let model = b.finish();
        let a = &model.associations;
        assert_eq!(a.lookup("HEARTBEAT", "state"), Some("MAV_STATE"));
        assert_eq!(a.lookup("HEARTBEAT", "type"), Some("MAV_TYPE"));
        assert_eq!(a.lookup("COMMAND_ACK", "result"), Some("MAV_RESULT"));
        assert_eq!(a.lookup("HEARTBEAT", "other"), None);
        // legacy entries for enumerations absent from the model are dropped
        assert_eq!(a.lookup("COMMAND_LONG", "command"), None);
    }

    #[test]
    fn associations_are_keyed_by_qualified_message() {
        let mut mode = field_def("mode", "uint8_t");
        mode.enum_name = Some("COPTER_MODE".to_string());
        let mut other = field_def("mode", "uint8_t");
        other.enum_name = Some("ROVER_MODE".to_string());
        let apm = doc(
            vec![enum_def("COPTER_MODE", vec![entry("STABILIZE", None)])],
            vec![message_def("STATUS", 1, vec![mode])],
        );
        let rover = doc(
            vec![enum_def("ROVER_MODE", vec![entry("MANUAL", None)])],
            vec![message_def("STATUS", 2, vec![other])],
        );
        let mut b = ModelBuilder::new(RenderContext::default());
        b.add_source("ardupilotmega.xml", &apm).unwrap();
        b.add_source("rover.xml", &rover).unwrap();
        let model = b.finish();
        let a = &model.associations;
        assert_eq!(a.lookup("apm::STATUS", "mode"), Some("apm::COPTER_MODE"));
        assert_eq!(a.lookup("rover::STATUS", "mode"), Some("rover::ROVER_MODE"));
        assert_eq!(a.lookup("STATUS", "mode"), None);
    }
}
