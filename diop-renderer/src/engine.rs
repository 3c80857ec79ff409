//! Tera generation engine: [`Generator`] and the per-kind block templates.
//!
//! # Main script layout
//!
//! ```text
//! bootstrap header
//! imports
//! def gen() / def on_<inport>(msg)    one function per inport, or one generator
//!     inbound block                   selected by the inport's PortKind
//!     commented config block
//!     outbound block per outport      selected by the outport's PortKind
//! api.add_generator / api.set_port_callback
//! ```
//!
//! Output is a pure function of the descriptor: no timestamps, no random
//! names, deterministic iteration everywhere.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::Tera;

use diop_core::bootstrap::{prepend_header, BOOTSTRAP_HEADER};
use diop_core::{ArtifactSet, OperatorDescriptor, Port, PortKind};

use crate::context::{
    callback_names, python_str, CallbackCtx, ConfigBlock, GeneratorCtx, ImportsCtx, PortCtx,
    TestScriptCtx,
};
use crate::error::RenderError;

/// Existing scripts shorter than this (in bytes) are treated as empty.
pub const MIN_SCRIPT_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const IMPORTS: &str = "imports.py.tera";
const GENERATOR: &str = "generator.py.tera";
const CALLBACK: &str = "callback.py.tera";
const TEST_SCRIPT: &str = "test_script.py.tera";

const TPLS: &[(&str, &str)] = &[
    (IMPORTS, include_str!("templates/imports.py.tera")),
    (GENERATOR, include_str!("templates/generator.py.tera")),
    (CALLBACK, include_str!("templates/callback.py.tera")),
    (TEST_SCRIPT, include_str!("templates/test_script.py.tera")),
    ("inbound/table.py.tera", include_str!("templates/inbound/table.py.tera")),
    ("inbound/file.py.tera", include_str!("templates/inbound/file.py.tera")),
    ("inbound/message.py.tera", include_str!("templates/inbound/message.py.tera")),
    ("inbound/other.py.tera", include_str!("templates/inbound/other.py.tera")),
    ("outbound/table.py.tera", include_str!("templates/outbound/table.py.tera")),
    ("outbound/file.py.tera", include_str!("templates/outbound/file.py.tera")),
    ("outbound/message.py.tera", include_str!("templates/outbound/message.py.tera")),
    ("outbound/other.py.tera", include_str!("templates/outbound/other.py.tera")),
];

/// Inbound conversion template for an inport kind.
fn inbound_template(kind: &PortKind) -> &'static str {
    match kind {
        PortKind::Table => "inbound/table.py.tera",
        PortKind::File => "inbound/file.py.tera",
        PortKind::Message => "inbound/message.py.tera",
        PortKind::Other(_) => "inbound/other.py.tera",
    }
}

/// Outbound send template for an outport kind.
fn outbound_template(kind: &PortKind) -> &'static str {
    match kind {
        PortKind::Table => "outbound/table.py.tera",
        PortKind::File => "outbound/file.py.tera",
        PortKind::Message => "outbound/message.py.tera",
        PortKind::Other(_) => "outbound/other.py.tera",
    }
}

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(normalize_template_name(Path::new(name)), (*content).to_string());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            tracing::debug!("template override: {name}");
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// Generation result
// ---------------------------------------------------------------------------

/// What happened to one generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactAction {
    /// Absent before; rendered from the descriptor.
    Created,
    /// Present but too short or `overwrite` requested; rendered anew.
    Regenerated,
    /// Hand-written script kept, bootstrap header prepended.
    Adjusted,
    /// Left exactly as it was.
    Unchanged,
}

/// Output of [`Generator::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub artifacts: ArtifactSet,
    pub script: (String, ArtifactAction),
    pub test: (String, ArtifactAction),
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Renders operator scaffolds from descriptors.
///
/// Create once with [`Generator::new`] and reuse. `user_template_dir` in
/// [`Generator::with_templates`] may hold `.tera` files (same relative names
/// as the embedded ones) that override the defaults.
pub struct Generator {
    tera: Tera,
}

impl Generator {
    /// Construct a generator with the embedded templates.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_templates(None)
    }

    /// Construct a generator, applying overrides from `user_template_dir`.
    pub fn with_templates(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Generator { tera: build_tera(user_template_dir)? })
    }

    /// Produce the updated artifact set for `descriptor`.
    ///
    /// The main script is rendered when it is absent, shorter than
    /// [`MIN_SCRIPT_LEN`], or `overwrite` is set; otherwise it is kept and
    /// only gets the bootstrap header (once). The test script is rendered
    /// when absent or on `overwrite`. Every other artifact passes through.
    pub fn generate(
        &self,
        descriptor: &OperatorDescriptor,
        existing: &ArtifactSet,
        overwrite: bool,
    ) -> Result<Generation, RenderError> {
        let (script_name, test_name) = match (descriptor.script_file(), descriptor.test_file()) {
            (Some(script), Some(test)) => (script.to_owned(), test),
            _ => {
                return Err(RenderError::ScriptNotExternalized {
                    operator: descriptor.id().to_string(),
                })
            }
        };
        let mut artifacts = existing.clone();

        let script_action = match existing.get(&script_name) {
            Some(current) if !overwrite && current.len() >= MIN_SCRIPT_LEN => {
                let adjusted = prepend_header(current);
                if adjusted == current {
                    ArtifactAction::Unchanged
                } else {
                    artifacts.insert(script_name.as_str(), adjusted);
                    ArtifactAction::Adjusted
                }
            }
            current => {
                artifacts.insert(script_name.as_str(), self.render_script(descriptor)?);
                if current.is_some() {
                    ArtifactAction::Regenerated
                } else {
                    ArtifactAction::Created
                }
            }
        };
        tracing::info!("{script_name}: {script_action:?}");

        let test_action = match existing.get(&test_name) {
            Some(_) if !overwrite => ArtifactAction::Unchanged,
            current => {
                artifacts.insert(test_name.as_str(), self.render_test(descriptor)?);
                if current.is_some() {
                    ArtifactAction::Regenerated
                } else {
                    ArtifactAction::Created
                }
            }
        };
        tracing::info!("{test_name}: {test_action:?}");

        Ok(Generation {
            artifacts,
            script: (script_name, script_action),
            test: (test_name, test_action),
        })
    }

    /// Render a fresh main script, bootstrap header included.
    pub fn render_script(&self, descriptor: &OperatorDescriptor) -> Result<String, RenderError> {
        let config = ConfigBlock::from_params(descriptor.params());
        let mut out = String::from(BOOTSTRAP_HEADER);
        out.push('\n');
        out.push_str(&self.render_block(IMPORTS, &ImportsCtx::from_descriptor(descriptor))?);
        out.push_str("\n\n");

        let inports: Vec<&Port> = descriptor.inports().collect();
        if inports.is_empty() {
            let attributes = format!("{{'operator':{}}}", python_str(&descriptor.id().to_string()));
            let ctx = GeneratorCtx {
                config: config.commented,
                outbound: self.outbound_blocks(descriptor, &attributes)?,
            };
            out.push_str(&self.render_block(GENERATOR, &ctx)?);
        } else {
            let outbound = self.outbound_blocks(descriptor, "copy.deepcopy(msg.attributes)")?;
            let functions = callback_names(inports.iter().copied());
            for (i, (port, function)) in inports.into_iter().zip(functions).enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                let port_ctx = PortCtx::new(port, "");
                let ctx = CallbackCtx {
                    port_literal: port_ctx.port_literal.clone(),
                    function,
                    datatype: port_ctx.datatype.clone(),
                    inbound: self.render_block(inbound_template(&port.kind), &port_ctx)?,
                    config: config.commented.clone(),
                    outbound: outbound.clone(),
                };
                out.push_str(&self.render_block(CALLBACK, &ctx)?);
            }
        }
        Ok(out)
    }

    /// Render a fresh test scaffold.
    pub fn render_test(&self, descriptor: &OperatorDescriptor) -> Result<String, RenderError> {
        let script_file = descriptor.script_file().ok_or_else(|| {
            RenderError::ScriptNotExternalized {
                operator: descriptor.id().to_string(),
            }
        })?;
        let config = ConfigBlock::from_params(descriptor.params());
        let ctx = TestScriptCtx::from_descriptor(descriptor, script_file, &config);
        let rendered = self.tera.render(TEST_SCRIPT, &ctx.to_tera_context()?)?;
        Ok(with_single_trailing_newline(&rendered))
    }

    /// One send block per outport, separated by blank lines.
    fn outbound_blocks(
        &self,
        descriptor: &OperatorDescriptor,
        attributes: &str,
    ) -> Result<String, RenderError> {
        let blocks = descriptor
            .outports()
            .map(|port| self.render_block(outbound_template(&port.kind), &PortCtx::new(port, attributes)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(blocks.join("\n"))
    }

    fn render_block<T: Serialize>(&self, name: &str, ctx: &T) -> Result<String, RenderError> {
        let ctx = tera::Context::from_serialize(ctx)?;
        let rendered = self.tera.render(name, &ctx)?;
        Ok(with_single_trailing_newline(&rendered))
    }
}

fn with_single_trailing_newline(s: &str) -> String {
    let mut out = s.trim_end_matches('\n').to_owned();
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use diop_core::OperatorId;
    use serde_json::json;
    use tempfile::TempDir;

    fn descriptor(inports: serde_json::Value, outports: serde_json::Value) -> OperatorDescriptor {
        let op = json!({
            "inports": inports,
            "outports": outports,
            "config": {"script": "file://script.py"}
        });
        let schema = json!({"properties": {"script": {"type": "string"}}});
        let id: OperatorId = "demo.op".parse().unwrap();
        OperatorDescriptor::parse(id, &op.to_string(), &schema.to_string()).unwrap()
    }

    #[test]
    fn generator_new_succeeds() {
        Generator::new().expect("embedded templates must parse");
    }

    #[test]
    fn every_kind_has_templates_for_both_directions() {
        let generator = Generator::new().unwrap();
        let names: Vec<_> = generator.tera.get_template_names().collect();
        for kind in [
            PortKind::Table,
            PortKind::File,
            PortKind::Message,
            PortKind::Other("x".into()),
        ] {
            assert!(names.contains(&inbound_template(&kind)), "{kind:?} inbound");
            assert!(names.contains(&outbound_template(&kind)), "{kind:?} outbound");
        }
    }

    #[test]
    fn imports_only_when_needed() {
        let generator = Generator::new().unwrap();
        let plain = generator
            .render_script(&descriptor(json!([{"name": "in", "type": "message"}]), json!([])))
            .unwrap();
        assert!(!plain.contains("import io"));
        assert!(!plain.contains("import os"));

        let files = generator
            .render_script(&descriptor(
                json!([{"name": "a", "type": "message.file"}, {"name": "b", "type": "message.file"}]),
                json!([{"name": "out", "type": "message.file"}]),
            ))
            .unwrap();
        assert_eq!(files.matches("import io\n").count(), 1);
        assert_eq!(files.matches("import os\n").count(), 1);
    }

    #[test]
    fn inline_script_is_rejected() {
        let op = json!({"config": {"script": "print(1)"}}).to_string();
        let schema = json!({"properties": {}}).to_string();
        let d = OperatorDescriptor::parse("demo.op".parse().unwrap(), &op, &schema).unwrap();
        let err = Generator::new()
            .unwrap()
            .generate(&d, &ArtifactSet::new(), false)
            .unwrap_err();
        assert!(matches!(err, RenderError::ScriptNotExternalized { .. }));
    }

    #[test]
    fn user_template_overrides_embedded_block() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("outbound")).unwrap();
        std::fs::write(
            dir.path().join("outbound").join("message.py.tera"),
            "    custom_send('{{ port }}')\n",
        )
        .unwrap();
        let generator = Generator::with_templates(Some(dir.path())).unwrap();
        let script = generator
            .render_script(&descriptor(
                json!([{"name": "in", "type": "message"}]),
                json!([{"name": "out", "type": "message"}]),
            ))
            .unwrap();
        assert!(script.contains("    custom_send('out')\n"));
    }

    #[test]
    fn inports_mapping_to_one_function_get_distinct_callbacks() {
        let generator = Generator::new().unwrap();
        let d = descriptor(
            json!([{"name": "in-3", "type": "message"}, {"name": "in_3", "type": "message"}]),
            json!([]),
        );
        let script = generator.render_script(&d).unwrap();
        assert_eq!(script.matches("def on_in_3(msg) :").count(), 1);
        assert_eq!(script.matches("def on_in_3_2(msg) :").count(), 1);
        assert!(script.contains("api.set_port_callback('in-3',on_in_3)"));
        assert!(script.contains("api.set_port_callback('in_3',on_in_3_2)"));

        let test = generator.render_test(&d).unwrap();
        assert!(test.contains("script.on_in_3(msg)"));
        assert!(test.contains("script.on_in_3_2(msg1)"));
    }

    #[test]
    fn quotes_in_port_names_are_escaped() {
        let generator = Generator::new().unwrap();
        let script = generator
            .render_script(&descriptor(
                json!([{"name": "it's", "type": "message"}]),
                json!([{"name": "o'out", "type": "message.table"}]),
            ))
            .unwrap();
        assert!(script.contains("api.set_port_callback('it\\'s',on_it_s)"));
        assert!(script.contains("api.send('o\\'out',out_msg)"));
        assert!(script.contains("    # Sending to outport o'out\n"));
    }

    #[test]
    fn no_crlf_in_rendered_output() {
        let generator = Generator::new().unwrap();
        let d = descriptor(
            json!([{"name": "in", "type": "message.table"}]),
            json!([{"name": "out", "type": "message.table"}]),
        );
        assert!(!generator.render_script(&d).unwrap().contains('\r'));
        assert!(!generator.render_test(&d).unwrap().contains('\r'));
    }
}
