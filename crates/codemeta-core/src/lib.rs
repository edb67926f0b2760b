//! Uniform code entity extraction.
//!
//! Turns Python, TypeScript, JavaScript and CSS files into flat
//! [`CodeEntity`] records for an indexing pipeline. Each language uses its
//! own parsing strategy behind the [`extract::Extractor`] trait; the
//! [`EntityParser`] routes by extension and never fails a call.
//!
//! ```no_run
//! let entities = codemeta_core::parse_file("src/app.ts");
//! for entity in &entities {
//!     println!("{} {}", entity.entity_type, entity.full_name);
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod schema;

use std::collections::BTreeSet;
use std::path::Path;

pub use config::{Config, ConfigError};
pub use dispatcher::EntityParser;
pub use error::{Diagnostic, DiagnosticKind, ExtractError};
pub use extract::{Extraction, ExtractionStats, ParseReport};
pub use schema::{CodeEntity, EntityType, Parameter, ParameterKind, Relationships};

/// Entities of one file using the built-in in-process extractors.
///
/// Unsupported, unreadable or invalid files yield an empty list.
pub fn parse_file(path: impl AsRef<Path>) -> Vec<CodeEntity> {
    EntityParser::new().parse_file(path)
}

/// Whether the file's extension has a built-in extractor.
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    EntityParser::new().is_supported(path)
}

/// Extensions with a built-in extractor, lower-case.
pub fn supported_extensions() -> BTreeSet<String> {
    EntityParser::new().supported_extensions()
}
