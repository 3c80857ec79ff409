//! Operator descriptor: parsing, script externalization and renaming.
//!
//! A descriptor is assembled from two documents:
//!
//! ```text
//! operator.json       ports (inports / outports), config values, config.script
//! configSchema.json   properties.<param>.type for every config parameter
//! ```
//!
//! The raw JSON of both documents is kept alongside the typed view so fields
//! this crate does not model survive a rewrite untouched.

use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Map, Value};

use crate::artifact::ArtifactSet;
use crate::error::DescriptorError;
use crate::types::{
    ConfigParam, OperatorId, ParamType, Port, PortDirection, PortKind, ScriptRef,
};

pub const OPERATOR_JSON: &str = "operator.json";
pub const CONFIG_SCHEMA_JSON: &str = "configSchema.json";

/// Name given to an externalized inline script.
pub const DEFAULT_SCRIPT_NAME: &str = "script.py";

/// Config keys that are operator plumbing, not user parameters.
const RESERVED_PARAMS: [&str; 2] = ["script", "codelanguage"];

/// Key in `operator.json` `config` holding the config-schema identifier.
pub const CONFIG_TYPE_KEY: &str = "$type";

const SCHEMA_ID_KEY: &str = "$id";
const SCHEMA_URI_PREFIX: &str = "http://sap.com/vflow/";

/// Indentation used when serializing a descriptor document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonIndent {
    /// Written after script externalization on download.
    Two,
    /// Written after renaming for a new upload target.
    Four,
}

/// Typed view of an operator plus its raw source documents.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorDescriptor {
    id: OperatorId,
    ports: Vec<Port>,
    params: Vec<ConfigParam>,
    script: ScriptRef,
    operator_doc: Value,
    schema_doc: Value,
}

impl OperatorDescriptor {
    /// Parse `operator.json` and `configSchema.json` for operator `id`.
    pub fn parse(
        id: OperatorId,
        operator_json: &str,
        config_schema_json: &str,
    ) -> Result<Self, DescriptorError> {
        let operator_doc: Value =
            serde_json::from_str(operator_json).map_err(|source| DescriptorError::Json {
                document: OPERATOR_JSON,
                source,
            })?;
        let schema_doc: Value =
            serde_json::from_str(config_schema_json).map_err(|source| DescriptorError::Json {
                document: CONFIG_SCHEMA_JSON,
                source,
            })?;

        let config = required_object(&operator_doc, OPERATOR_JSON, "config")?;
        let script = match config.get("script") {
            Some(Value::String(raw)) => ScriptRef::parse(raw),
            Some(_) => {
                return Err(DescriptorError::InvalidField {
                    document: OPERATOR_JSON,
                    field: "config.script".into(),
                    expected: "must be a string",
                })
            }
            None => {
                return Err(DescriptorError::MissingField {
                    document: OPERATOR_JSON,
                    field: "config.script".into(),
                })
            }
        };

        let mut ports = parse_ports(&operator_doc, "inports", PortDirection::In)?;
        ports.extend(parse_ports(&operator_doc, "outports", PortDirection::Out)?);

        let properties = required_object(&schema_doc, CONFIG_SCHEMA_JSON, "properties")?;
        let params = properties
            .iter()
            .filter(|(name, _)| !RESERVED_PARAMS.contains(&name.as_str()))
            .map(|(name, property)| ConfigParam {
                name: name.clone(),
                param_type: declared_type(property),
                value: config.get(name).filter(|v| !v.is_null()).cloned(),
            })
            .collect();

        Ok(Self {
            id,
            ports,
            params,
            script,
            operator_doc,
            schema_doc,
        })
    }

    /// Parse the descriptor documents out of an artifact set.
    pub fn from_artifacts(id: OperatorId, artifacts: &ArtifactSet) -> Result<Self, DescriptorError> {
        let operator_json = artifacts
            .get(OPERATOR_JSON)
            .ok_or(DescriptorError::MissingDocument { name: OPERATOR_JSON })?;
        let schema_json = artifacts
            .get(CONFIG_SCHEMA_JSON)
            .ok_or(DescriptorError::MissingDocument { name: CONFIG_SCHEMA_JSON })?;
        Self::parse(id, operator_json, schema_json)
    }

    pub fn id(&self) -> &OperatorId {
        &self.id
    }

    /// All ports, inports first, each group in declaration order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn inports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.direction == PortDirection::In)
    }

    pub fn outports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.direction == PortDirection::Out)
    }

    pub fn params(&self) -> &[ConfigParam] {
        &self.params
    }

    pub fn script(&self) -> &ScriptRef {
        &self.script
    }

    /// Script file name, once the script reference has been externalized.
    pub fn script_file(&self) -> Option<&str> {
        self.script.file_name()
    }

    /// Test scaffold file name: `<script stem>_test.py`.
    pub fn test_file(&self) -> Option<String> {
        self.script_file()
            .map(|name| format!("{}_test.py", script_module(name)))
    }

    pub fn operator_doc(&self) -> &Value {
        &self.operator_doc
    }

    pub fn schema_doc(&self) -> &Value {
        &self.schema_doc
    }

    /// Serialize the current `operator.json`.
    pub fn operator_json(&self, indent: JsonIndent) -> Result<String, DescriptorError> {
        to_json(&self.operator_doc, indent, OPERATOR_JSON)
    }

    /// Serialize the current `configSchema.json`.
    pub fn config_schema_json(&self, indent: JsonIndent) -> Result<String, DescriptorError> {
        to_json(&self.schema_doc, indent, CONFIG_SCHEMA_JSON)
    }
}

/// Python module name of a script file (`script.py` → `script`).
pub fn script_module(file_name: &str) -> &str {
    file_name.strip_suffix(".py").unwrap_or(file_name)
}

/// Config-schema identifier shared by `operator.json` and `configSchema.json`.
pub fn config_type_uri(id: &OperatorId) -> String {
    format!(
        "{SCHEMA_URI_PREFIX}{}.{}.configSchema.json",
        id.package(),
        id.operator()
    )
}

// ---------------------------------------------------------------------------
// normalize_script_ref
// ---------------------------------------------------------------------------

/// Move an inline script body into its own artifact.
///
/// The body lands in `script.py` (or the next free `script_<n>.py` when
/// `script.py` already holds different content), `config.script` becomes a
/// `file://` reference and `operator.json` in the artifact set is rewritten.
/// File references pass through untouched, so the call is idempotent.
pub fn normalize_script_ref(
    descriptor: OperatorDescriptor,
    artifacts: ArtifactSet,
) -> Result<(OperatorDescriptor, ArtifactSet), DescriptorError> {
    let body = match descriptor.script() {
        ScriptRef::File(_) => return Ok((descriptor, artifacts)),
        ScriptRef::Inline(body) => body.clone(),
    };

    let name = free_script_name(&artifacts, &body);
    if name != DEFAULT_SCRIPT_NAME {
        tracing::warn!(
            "{DEFAULT_SCRIPT_NAME} already holds other content; inline script extracted to {name}"
        );
    }
    let others: Vec<&str> = artifacts
        .names()
        .filter(|n| n.ends_with(".py") && *n != name && !n.ends_with("_test.py"))
        .collect();
    if !others.is_empty() {
        tracing::warn!(
            "operator {} uses an inline script but also ships {}",
            descriptor.id(),
            others.join(", ")
        );
    }

    let mut descriptor = descriptor;
    let mut artifacts = artifacts;
    descriptor.script = ScriptRef::File(name.clone());
    if let Some(config) = descriptor
        .operator_doc
        .get_mut("config")
        .and_then(Value::as_object_mut)
    {
        config.insert(
            "script".to_owned(),
            Value::String(descriptor.script.to_config_value()),
        );
    }
    tracing::info!("extracted inline script of {} into {name}", descriptor.id());
    artifacts.insert(name, body);
    artifacts.insert(OPERATOR_JSON, descriptor.operator_json(JsonIndent::Two)?);
    Ok((descriptor, artifacts))
}

fn free_script_name(artifacts: &ArtifactSet, body: &str) -> String {
    std::iter::once(DEFAULT_SCRIPT_NAME.to_owned())
        .chain((2..).map(|n| format!("script_{n}.py")))
        .find(|name| artifacts.get(name).map_or(true, |existing| existing == body))
        .unwrap_or_else(|| DEFAULT_SCRIPT_NAME.to_owned())
}

// ---------------------------------------------------------------------------
// rename_for_target
// ---------------------------------------------------------------------------

/// Re-point both descriptor documents at a new `package.operator` location.
///
/// Sets the capitalized operator name as `description` and writes the same
/// identifier URI into `operator.json` `config.$type` and
/// `configSchema.json` `$id`.
pub fn rename_for_target(descriptor: OperatorDescriptor, target: &OperatorId) -> OperatorDescriptor {
    let uri = config_type_uri(target);
    let mut descriptor = descriptor;

    if let Some(doc) = descriptor.operator_doc.as_object_mut() {
        doc.insert(
            "description".to_owned(),
            Value::String(capitalize(target.operator())),
        );
    }
    if let Some(config) = descriptor
        .operator_doc
        .get_mut("config")
        .and_then(Value::as_object_mut)
    {
        config.insert(CONFIG_TYPE_KEY.to_owned(), Value::String(uri.clone()));
    }
    if let Some(schema) = descriptor.schema_doc.as_object_mut() {
        schema.insert(SCHEMA_ID_KEY.to_owned(), Value::String(uri));
    }
    descriptor.id = target.clone();
    descriptor
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn required_object<'a>(
    doc: &'a Value,
    document: &'static str,
    field: &str,
) -> Result<&'a Map<String, Value>, DescriptorError> {
    match doc.get(field) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(DescriptorError::InvalidField {
            document,
            field: field.to_owned(),
            expected: "must be an object",
        }),
        None => Err(DescriptorError::MissingField {
            document,
            field: field.to_owned(),
        }),
    }
}

fn parse_ports(
    doc: &Value,
    field: &'static str,
    direction: PortDirection,
) -> Result<Vec<Port>, DescriptorError> {
    let Some(raw) = doc.get(field) else {
        return Ok(Vec::new());
    };
    let items = raw.as_array().ok_or_else(|| DescriptorError::InvalidField {
        document: OPERATOR_JSON,
        field: field.to_owned(),
        expected: "must be an array of ports",
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let text = |key: &str| {
                item.get(key)
                    .and_then(Value::as_str)
                    .ok_or_else(|| DescriptorError::InvalidField {
                        document: OPERATOR_JSON,
                        field: format!("{field}[{i}].{key}"),
                        expected: "must be a string",
                    })
            };
            Ok(Port {
                name: text("name")?.to_owned(),
                direction,
                kind: PortKind::from(text("type")?),
            })
        })
        .collect()
}

/// `type` of a schema property; for a type list the first entry wins.
fn declared_type(property: &Value) -> ParamType {
    match property.get("type") {
        Some(Value::String(t)) => ParamType::from(t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .find_map(Value::as_str)
            .map(ParamType::from)
            .unwrap_or_else(|| ParamType::Other("unspecified".to_owned())),
        _ => ParamType::Other("unspecified".to_owned()),
    }
}

fn to_json(
    doc: &Value,
    indent: JsonIndent,
    document: &'static str,
) -> Result<String, DescriptorError> {
    let indent: &[u8] = match indent {
        JsonIndent::Two => b"  ",
        JsonIndent::Four => b"    ",
    };
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent));
    doc.serialize(&mut ser)
        .map_err(|source| DescriptorError::Serialize { document, source })?;
    // serde_json only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
