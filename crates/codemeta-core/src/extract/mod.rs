//! Language extractors for code entity extraction.
//!
//! Provides an `Extractor` trait turning one source file into
//! [`crate::CodeEntity`] records, with one implementation per language
//! variant, each using its own parsing strategy.
//!
//! ## Components
//!
//! - `Extractor` trait - Common interface for all extractors
//! - `ExtractorRegistry` - Maps file extensions to extractors
//! - `ProcessBridge` - Runs an extractor as an external compiler service
//! - `Extraction` / `ParseReport` - Entities plus recovered diagnostics
//!
//! ## Supported Languages
//!
//! - Python (tree-sitter, in-process)
//! - TypeScript/JavaScript (tree-sitter, in-process or compiler service)
//! - CSS (regex structural scan)

mod bridge;
mod python;
mod registry;
mod result;
mod script;
mod source;
mod stylesheet;
mod traits;
mod treesitter;

pub use bridge::{ProcessBridge, DEFAULT_TIMEOUT, SYNTAX_EXIT_CODE};
pub use python::PythonExtractor;
pub use registry::ExtractorRegistry;
pub use result::{Extraction, ExtractionStats, ParseReport};
pub use script::{extract_source as extract_script_source, ScriptEngine, ScriptExtractor, ScriptSyntax};
pub use source::{LineIndex, SourceEncoding, SourceText};
pub use stylesheet::StylesheetExtractor;
pub use traits::{Extractor, ExtractorCapability};
