//! Domain types for operator descriptors.
//!
//! Port and parameter kinds are closed tagged unions with an `Other` escape
//! hatch that keeps the raw type string, so descriptors using port or
//! parameter types the generator has no template for still parse.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;

// ---------------------------------------------------------------------------
// OperatorId
// ---------------------------------------------------------------------------

/// `package.operator` identifier of a single operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorId {
    package: String,
    operator: String,
}

impl OperatorId {
    /// Build an identifier from its two segments.
    ///
    /// Segments must be non-empty and must not contain `.` or `/`.
    pub fn new(package: &str, operator: &str) -> Result<Self, DescriptorError> {
        let valid = |s: &str| !s.is_empty() && !s.contains(['.', '/', '\\']);
        if !valid(package) || !valid(operator) {
            return Err(DescriptorError::InvalidOperatorId(format!(
                "{package}.{operator}"
            )));
        }
        Ok(Self {
            package: package.to_owned(),
            operator: operator.to_owned(),
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Relative directory `package/operator`, used locally and remotely.
    pub fn dir(&self) -> String {
        format!("{}/{}", self.package, self.operator)
    }
}

impl FromStr for OperatorId {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(package), Some(operator), None) => OperatorId::new(package, operator)
                .map_err(|_| DescriptorError::InvalidOperatorId(s.to_owned())),
            _ => Err(DescriptorError::InvalidOperatorId(s.to_owned())),
        }
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.operator)
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    In,
    Out,
}

/// Data kind carried by a port; decides which code block the generator emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    /// `message.table`
    Table,
    /// `message.file`
    File,
    /// bare `message`
    Message,
    /// Any other declared type, kept verbatim.
    Other(String),
}

impl PortKind {
    /// The descriptor type string for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            PortKind::Table => "message.table",
            PortKind::File => "message.file",
            PortKind::Message => "message",
            PortKind::Other(raw) => raw,
        }
    }
}

impl From<&str> for PortKind {
    fn from(s: &str) -> Self {
        match s {
            "message.table" => PortKind::Table,
            "message.file" => PortKind::File,
            "message" => PortKind::Message,
            other => PortKind::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed connection point on an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub direction: PortDirection,
    pub kind: PortKind,
}

// ---------------------------------------------------------------------------
// Config parameters
// ---------------------------------------------------------------------------

/// Declared type of a configuration parameter in `configSchema.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Integer,
    String,
    Array,
    Other(String),
}

impl ParamType {
    pub fn as_str(&self) -> &str {
        match self {
            ParamType::Integer => "integer",
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Other(raw) => raw,
        }
    }
}

impl From<&str> for ParamType {
    fn from(s: &str) -> Self {
        match s {
            "integer" => ParamType::Integer,
            "string" => ParamType::String,
            "array" => ParamType::Array,
            other => ParamType::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configuration parameter: declared type plus the value currently set
/// in `operator.json`, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigParam {
    pub name: String,
    pub param_type: ParamType,
    pub value: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Script reference
// ---------------------------------------------------------------------------

/// Prefix marking an external script reference in `config.script`.
pub const FILE_REF_PREFIX: &str = "file://";

/// Where the operator's script lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptRef {
    /// `file://<name>`: a file in the artifact set.
    File(String),
    /// Source embedded directly in `operator.json`.
    Inline(String),
}

impl ScriptRef {
    /// Classify a raw `config.script` value.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(FILE_REF_PREFIX) {
            Some(name) => ScriptRef::File(name.to_owned()),
            None => ScriptRef::Inline(raw.to_owned()),
        }
    }

    /// Serialized `config.script` value.
    pub fn to_config_value(&self) -> String {
        match self {
            ScriptRef::File(name) => format!("{FILE_REF_PREFIX}{name}"),
            ScriptRef::Inline(body) => body.clone(),
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            ScriptRef::File(name) => Some(name),
            ScriptRef::Inline(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_id_parses_two_segments() {
        let id: OperatorId = "demo.passthrough".parse().unwrap();
        assert_eq!(id.package(), "demo");
        assert_eq!(id.operator(), "passthrough");
        assert_eq!(id.dir(), "demo/passthrough");
        assert_eq!(id.to_string(), "demo.passthrough");
    }

    #[test]
    fn operator_id_rejects_wrong_separator_count() {
        for bad in ["demo", "a.b.c", ".op", "pkg.", "", "pkg/x.op"] {
            let err = bad.parse::<OperatorId>().unwrap_err();
            assert!(
                matches!(err, DescriptorError::InvalidOperatorId(ref s) if s == bad),
                "expected InvalidOperatorId for '{bad}', got {err}"
            );
        }
    }

    #[test]
    fn port_kind_roundtrips_type_string() {
        for raw in ["message.table", "message.file", "message", "string"] {
            assert_eq!(PortKind::from(raw).as_str(), raw);
        }
        assert_eq!(PortKind::from("blob"), PortKind::Other("blob".into()));
    }

    #[test]
    fn script_ref_classifies_values() {
        assert_eq!(
            ScriptRef::parse("file://main.py"),
            ScriptRef::File("main.py".into())
        );
        assert_eq!(
            ScriptRef::parse("api.send('x', 1)"),
            ScriptRef::Inline("api.send('x', 1)".into())
        );
        assert_eq!(
            ScriptRef::File("script.py".into()).to_config_value(),
            "file://script.py"
        );
    }
}
