//! Core extractor trait for language-agnostic entity extraction.

use std::path::Path;

use super::result::Extraction;
use crate::error::ExtractError;
use crate::schema::EntityType;

/// Language-agnostic extractor trait.
///
/// Implement this trait for each language variant and register it with
/// [`super::ExtractorRegistry`]; nothing else needs to change. Each
/// extractor is responsible for:
///
/// 1. **Reading**: tolerate any byte sequence (see [`super::SourceText`])
/// 2. **Walking**: emit one [`crate::CodeEntity`] per declaration of interest
/// 3. **Stamping**: attach file-scoped imports to every entity
///
/// # Example Implementation
///
/// ```ignore
/// impl Extractor for PythonExtractor {
///     fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
///         let source = SourceText::read(path)?;
///         // Parse, walk, stamp...
///     }
///
///     fn language_name(&self) -> &'static str { "python" }
///     fn supported_extensions(&self) -> &[&'static str] { &["py"] }
///     fn entity_types(&self) -> &[EntityType] { &[EntityType::Function] }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// Extract entities from the file at `path`.
    ///
    /// # Returns
    /// * `Ok(Extraction)` - Entities plus non-fatal diagnostics
    /// * `Err(ExtractError)` - The file yields nothing; the caller degrades to empty
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError>;

    /// Language string stamped on every entity.
    fn language_name(&self) -> &'static str;

    /// File extensions this extractor handles (lower-case, no dot).
    fn supported_extensions(&self) -> &[&'static str];

    /// Entity types this extractor may emit.
    fn entity_types(&self) -> &[EntityType];

    /// Check if this extractor can handle the given file extension.
    fn can_extract(&self, extension: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Extraction strategy.
    ///
    /// - `Pattern`: regex-based structural scanning
    /// - `SyntaxTree`: in-process syntax tree walk
    /// - `Service`: delegated to an external compiler-service process
    fn capability(&self) -> ExtractorCapability {
        ExtractorCapability::SyntaxTree
    }
}

/// How an extractor obtains its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExtractorCapability {
    /// Regex scanning over raw text.
    Pattern,
    /// In-process syntax tree.
    SyntaxTree,
    /// Out-of-process compiler service.
    Service,
}

impl std::fmt::Display for ExtractorCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pattern => write!(f, "Pattern"),
            Self::SyntaxTree => write!(f, "SyntaxTree"),
            Self::Service => write!(f, "Service"),
        }
    }
}
