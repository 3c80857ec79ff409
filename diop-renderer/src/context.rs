//! Template contexts: serializable rendering payloads built from an
//! [`OperatorDescriptor`].
//!
//! Everything that depends on a port's kind is decided here or in
//! [`crate::engine`] by matching on [`PortKind`]; templates never branch on
//! kind strings.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use diop_core::descriptor::script_module;
use diop_core::{ConfigParam, OperatorDescriptor, ParamType, Port, PortKind};

use crate::error::RenderError;

/// `imports.py.tera`
#[derive(Debug, Clone, Serialize)]
pub struct ImportsCtx {
    pub needs_io: bool,
    pub needs_os: bool,
}

impl ImportsCtx {
    pub fn from_descriptor(descriptor: &OperatorDescriptor) -> Self {
        Self {
            needs_io: descriptor.inports().any(|p| p.kind == PortKind::File),
            needs_os: descriptor.outports().any(|p| p.kind == PortKind::File),
        }
    }
}

/// `inbound/*.py.tera` and `outbound/*.py.tera`
#[derive(Debug, Clone, Serialize)]
pub struct PortCtx {
    /// Port name for comments, on one line.
    pub port: String,
    /// Port name as a Python string literal.
    pub port_literal: String,
    pub datatype: String,
    /// Python expression for the attributes the outbound message starts from.
    pub attributes: String,
}

impl PortCtx {
    pub fn new(port: &Port, attributes: &str) -> Self {
        Self {
            port: one_line(&port.name),
            port_literal: python_str(&port.name),
            datatype: one_line(&port.kind.to_string()),
            attributes: attributes.to_owned(),
        }
    }
}

/// `callback.py.tera`
#[derive(Debug, Clone, Serialize)]
pub struct CallbackCtx {
    pub port_literal: String,
    pub function: String,
    pub datatype: String,
    pub inbound: String,
    pub config: String,
    pub outbound: String,
}

/// `generator.py.tera`
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorCtx {
    pub config: String,
    pub outbound: String,
}

/// `test_script.py.tera`
#[derive(Debug, Clone, Serialize)]
pub struct TestScriptCtx {
    pub module: String,
    pub config: String,
    pub calls: Vec<TestCallCtx>,
}

/// One entry point exercised by the test scaffold.
#[derive(Debug, Clone, Serialize)]
pub struct TestCallCtx {
    /// Statement building the input message; empty for the generator.
    pub message: String,
    /// Call on the script module, e.g. `on_input(msg)`.
    pub invocation: String,
}

impl TestScriptCtx {
    pub fn from_descriptor(
        descriptor: &OperatorDescriptor,
        script_file: &str,
        config: &ConfigBlock,
    ) -> Self {
        let operator = python_str(&descriptor.id().to_string());
        let functions = callback_names(descriptor.inports());
        let mut calls: Vec<TestCallCtx> = descriptor
            .inports()
            .zip(functions)
            .enumerate()
            .map(|(index, (port, function))| {
                // The first inport's fixtures carry no index suffix.
                let idx = if index == 0 { String::new() } else { index.to_string() };
                let message = match &port.kind {
                    PortKind::Table => {
                        format!("msg{idx} = optest.get_msgtable('testdata{idx}.csv')")
                    }
                    PortKind::File => {
                        format!("msg{idx} = optest.get_msgfile('test_file{idx}.csv')")
                    }
                    PortKind::Message | PortKind::Other(_) => format!(
                        "msg{idx} = api.Message(attributes={{'operator':{operator}}},body = None)"
                    ),
                };
                TestCallCtx {
                    message,
                    invocation: format!("{function}(msg{idx})"),
                }
            })
            .collect();
        if calls.is_empty() {
            calls.push(TestCallCtx {
                message: String::new(),
                invocation: "gen()".to_owned(),
            });
        }
        Self {
            module: script_module(script_file).to_owned(),
            config: config.live.clone(),
            calls,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

// ---------------------------------------------------------------------------
// Config parameter block
// ---------------------------------------------------------------------------

/// The config parameter assignments, rendered two ways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBlock {
    /// Executable assignments, used by the test scaffold.
    pub live: String,
    /// Indented and commented out, placed in every main-script function body.
    pub commented: String,
}

impl ConfigBlock {
    pub fn from_params(params: &[ConfigParam]) -> Self {
        let mut live = String::from("# config parameter\n");
        let mut commented = String::from("    # config parameter\n");
        for param in params {
            let value = python_literal(&param.param_type, param.value.as_ref());
            let datatype = one_line(&param.param_type.to_string());
            let line = if is_identifier(&param.name) {
                format!("api.config.{} = {value}    # datatype : {datatype}\n", param.name)
            } else {
                format!(
                    "setattr(api.config, {}, {value})    # datatype : {datatype}\n",
                    python_str(&param.name)
                )
            };
            live.push_str(&line);
            commented.push_str("    #");
            commented.push_str(&line);
        }
        Self { live, commented }
    }
}

fn python_literal(param_type: &ParamType, value: Option<&Value>) -> String {
    let Some(value) = value else {
        return "None".to_owned();
    };
    match param_type {
        ParamType::Integer => plain_text(value),
        ParamType::Array => match value {
            Value::Array(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(|v| python_str(&plain_text(v)))
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            other => format!("[{}]", python_str(&plain_text(other))),
        },
        ParamType::String | ParamType::Other(_) => python_str(&plain_text(value)),
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Single-quoted Python string literal.
pub(crate) fn python_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Text safe to place after `#`: control characters become spaces.
fn one_line(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

const PYTHON_KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// ASCII Python identifier that is not a keyword.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !PYTHON_KEYWORDS.contains(&name)
}

/// Callback function name for an inport: `on_<port>`, with every character
/// that is not valid in a Python identifier replaced by `_`.
fn callback_name(port: &str) -> String {
    let ident: String = port
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("on_{ident}")
}

/// Callback names for `inports`, in order. Ports whose names map to the same
/// function get `_2`, `_3`, ... appended until every name is distinct.
pub fn callback_names<'a>(inports: impl IntoIterator<Item = &'a Port>) -> Vec<String> {
    let mut taken = HashSet::new();
    inports
        .into_iter()
        .map(|port| {
            let base = callback_name(&port.name);
            let mut function = base.clone();
            let mut n = 2;
            while !taken.insert(function.clone()) {
                function = format!("{base}_{n}");
                n += 1;
            }
            if function != base {
                tracing::warn!("inport '{}': {base} is taken, using {function}", port.name);
            }
            function
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn param(name: &str, ty: ParamType, value: Option<Value>) -> ConfigParam {
        ConfigParam {
            name: name.to_owned(),
            param_type: ty,
            value,
        }
    }

    #[test]
    fn literals_follow_declared_type() {
        let block = ConfigBlock::from_params(&[
            param("limit", ParamType::Integer, Some(json!(5))),
            param("label", ParamType::String, Some(json!("it's"))),
            param("keys", ParamType::Array, Some(json!(["a", "b"]))),
            param("unset", ParamType::String, None),
            param("ratio", ParamType::Other("number".into()), Some(json!(0.5))),
        ]);
        let lines: Vec<_> = block.live.lines().collect();
        assert_eq!(lines[0], "# config parameter");
        assert_eq!(lines[1], "api.config.limit = 5    # datatype : integer");
        assert_eq!(lines[2], "api.config.label = 'it\\'s'    # datatype : string");
        assert_eq!(lines[3], "api.config.keys = ['a','b']    # datatype : array");
        assert_eq!(lines[4], "api.config.unset = None    # datatype : string");
        assert_eq!(lines[5], "api.config.ratio = '0.5'    # datatype : number");
    }

    #[test]
    fn commented_block_mirrors_live_block() {
        let block = ConfigBlock::from_params(&[param("limit", ParamType::Integer, Some(json!(5)))]);
        assert_eq!(
            block.commented,
            "    # config parameter\n    #api.config.limit = 5    # datatype : integer\n"
        );
    }

    #[test]
    fn callback_names_are_python_identifiers() {
        assert_eq!(callback_name("input"), "on_input");
        assert_eq!(callback_name("in-2.x"), "on_in_2_x");
    }

    fn inport(name: &str) -> Port {
        Port {
            name: name.to_owned(),
            direction: diop_core::PortDirection::In,
            kind: PortKind::Message,
        }
    }

    #[test]
    fn colliding_callback_names_get_suffixes() {
        let ports = [inport("in-3"), inport("in_3"), inport("in_3_2"), inport("other")];
        assert_eq!(
            callback_names(&ports),
            vec!["on_in_3", "on_in_3_2", "on_in_3_2_2", "on_other"]
        );
    }

    #[test]
    fn names_that_are_not_identifiers_use_setattr() {
        let block = ConfigBlock::from_params(&[
            param("max-rows", ParamType::Integer, Some(json!(3))),
            param("class", ParamType::String, Some(json!("a"))),
        ]);
        let lines: Vec<_> = block.live.lines().collect();
        assert_eq!(lines[1], "setattr(api.config, 'max-rows', 3)    # datatype : integer");
        assert_eq!(lines[2], "setattr(api.config, 'class', 'a')    # datatype : string");
    }

    #[test]
    fn string_literals_escape_quotes_and_line_breaks() {
        assert_eq!(python_str("it's"), "'it\\'s'");
        assert_eq!(python_str("a\nb\\"), "'a\\nb\\\\'");
    }

    #[test]
    fn port_context_quotes_name_and_flattens_comment_text() {
        let ctx = PortCtx::new(&inport("o'k\nx"), "{}");
        assert_eq!(ctx.port_literal, "'o\\'k\\nx'");
        assert_eq!(ctx.port, "o'k x");
    }
}
