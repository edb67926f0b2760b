//! Public entry points: route a file to its extractor and never fail.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{Diagnostic, DiagnosticKind, ExtractError};
use crate::extract::{Extractor, ExtractorRegistry, ParseReport};
use crate::schema::CodeEntity;

/// Routes files by extension to the registered extractors.
///
/// Calls share no mutable state, so one parser can serve many threads.
pub struct EntityParser {
    registry: ExtractorRegistry,
    /// Zero disables the size check.
    max_file_size: u64,
}

impl EntityParser {
    /// Built-in extractors, in-process, default limits.
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            registry: ExtractorRegistry::from_config(&config.service),
            max_file_size: config.extract.max_file_size,
        }
    }

    /// Use a custom registry.
    pub fn with_registry(registry: ExtractorRegistry) -> Self {
        Self {
            registry,
            max_file_size: Config::default().extract.max_file_size,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Whether the file's extension has a registered extractor.
    pub fn is_supported(&self, path: impl AsRef<Path>) -> bool {
        self.registry.extractor_for_path(path.as_ref()).is_some()
    }

    pub fn supported_extensions(&self) -> BTreeSet<String> {
        self.registry.supported_extensions()
    }

    /// Entities of one file. Every failure degrades to an empty list.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Vec<CodeEntity> {
        self.parse_file_report(path).entities
    }

    /// Entities plus the diagnostics explaining anything missing.
    pub fn parse_file_report(&self, path: impl AsRef<Path>) -> ParseReport {
        let path = path.as_ref();
        let language = self
            .registry
            .extractor_for_path(path)
            .map(|e| e.language_name().to_string());

        match self.try_parse_file(path) {
            Ok(report) => {
                for diagnostic in &report.diagnostics {
                    tracing::warn!(
                        path = %path.display(),
                        kind = %diagnostic.kind,
                        entities = report.entities.len(),
                        "{}",
                        diagnostic.message
                    );
                }
                report
            }
            Err(err) => {
                let diagnostic = Diagnostic::from(&err);
                if diagnostic.kind == DiagnosticKind::UnsupportedExtension {
                    tracing::debug!(path = %path.display(), "Skipping unsupported file");
                } else {
                    tracing::warn!(
                        path = %path.display(),
                        language = language.as_deref().unwrap_or("unknown"),
                        kind = %diagnostic.kind,
                        "Extraction degraded to empty: {}",
                        err
                    );
                }
                ParseReport::degraded(path.to_string_lossy(), language, diagnostic)
            }
        }
    }

    /// Like [`Self::parse_file_report`], but hard failures are returned.
    pub fn try_parse_file(&self, path: impl AsRef<Path>) -> Result<ParseReport, ExtractError> {
        let path = path.as_ref();
        let extractor = self
            .registry
            .extractor_for_path(path)
            .ok_or_else(|| ExtractError::UnsupportedExtension {
                path: path.to_path_buf(),
            })?;

        self.check_size(path)?;

        let started = Instant::now();
        let extraction = extractor.extract(path)?;
        debug_assert_entity_types(&extractor, &extraction.entities);

        tracing::debug!(
            path = %path.display(),
            language = extractor.language_name(),
            entities = extraction.entities.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Extracted entities"
        );

        Ok(ParseReport {
            path: path.to_string_lossy().into_owned(),
            language: Some(extractor.language_name().to_string()),
            entities: extraction.entities,
            diagnostics: extraction.diagnostics,
        })
    }

    fn check_size(&self, path: &Path) -> Result<(), ExtractError> {
        if self.max_file_size == 0 {
            return Ok(());
        }
        let size = std::fs::metadata(path)
            .map_err(|source| ExtractError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if size > self.max_file_size {
            return Err(ExtractError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }
}

impl Default for EntityParser {
    fn default() -> Self {
        Self::new()
    }
}

fn debug_assert_entity_types(extractor: &Arc<dyn Extractor>, entities: &[CodeEntity]) {
    if cfg!(debug_assertions) {
        let allowed = extractor.entity_types();
        for entity in entities {
            debug_assert!(
                allowed.contains(&entity.entity_type),
                "{} extractor emitted {}",
                extractor.language_name(),
                entity.entity_type
            );
        }
    }
}
