//! # diop-renderer
//!
//! Tera-based generator that renders an operator's main script and test
//! scaffold from its descriptor, preserving hand-written scripts across
//! regenerations.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use diop_core::{ArtifactSet, OperatorDescriptor};
//! use diop_renderer::Generator;
//!
//! fn scaffold(descriptor: &OperatorDescriptor, existing: &ArtifactSet) {
//!     if let Ok(generator) = Generator::new() {
//!         if let Ok(generation) = generator.generate(descriptor, existing, false) {
//!             for (name, content) in generation.artifacts.iter() {
//!                 println!("{name}: {} bytes", content.len());
//!             }
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::ConfigBlock;
pub use engine::{ArtifactAction, Generation, Generator, MIN_SCRIPT_LEN};
pub use error::RenderError;
