//! Extraction result types.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::schema::{CodeEntity, EntityType};

/// Output of one extractor run over one file.
///
/// Contains the extracted entities and any non-fatal diagnostics.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Extracted entities, already stamped with file-scoped facts.
    pub entities: Vec<CodeEntity>,

    /// Recovered problems (encoding fallback, partial structure).
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn new(entities: Vec<CodeEntity>) -> Self {
        Self {
            entities,
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic.
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Whether any diagnostic of `kind` was recorded.
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    /// Get statistics about the extraction.
    pub fn stats(&self) -> ExtractionStats {
        ExtractionStats::from_entities(&self.entities, self.diagnostics.len())
    }
}

/// Per-file result handed back to the ingestion pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ParseReport {
    /// Path as supplied by the caller.
    pub path: String,

    /// Language of the selected extractor, if any.
    pub language: Option<String>,

    pub entities: Vec<CodeEntity>,

    pub diagnostics: Vec<Diagnostic>,
}

impl ParseReport {
    /// A report that produced nothing, explained by one diagnostic.
    pub fn degraded(path: impl Into<String>, language: Option<String>, diagnostic: Diagnostic) -> Self {
        Self {
            path: path.into(),
            language,
            entities: Vec::new(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn stats(&self) -> ExtractionStats {
        ExtractionStats::from_entities(&self.entities, self.diagnostics.len())
    }
}

/// Entity counts by type.
#[derive(Debug, Default, Clone)]
pub struct ExtractionStats {
    pub by_type: BTreeMap<EntityType, usize>,
    pub total: usize,
    pub diagnostics: usize,
}

impl ExtractionStats {
    fn from_entities(entities: &[CodeEntity], diagnostics: usize) -> Self {
        let mut stats = Self {
            diagnostics,
            ..Default::default()
        };
        for entity in entities {
            *stats.by_type.entry(entity.entity_type).or_default() += 1;
            stats.total += 1;
        }
        stats
    }

    /// Merge another file's counts into this one.
    pub fn absorb(&mut self, other: &ExtractionStats) {
        for (entity_type, count) in &other.by_type {
            *self.by_type.entry(*entity_type).or_default() += count;
        }
        self.total += other.total;
        self.diagnostics += other.diagnostics;
    }

    pub fn count(&self, entity_type: EntityType) -> usize {
        self.by_type.get(&entity_type).copied().unwrap_or(0)
    }
}

impl std::fmt::Display for ExtractionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Entities: {}", self.total)?;
        for (entity_type, count) in &self.by_type {
            writeln!(f, "  {:<12}{}", format!("{}:", entity_type), count)?;
        }
        if self.diagnostics > 0 {
            writeln!(f, "Diagnostics: {}", self.diagnostics)?;
        }
        Ok(())
    }
}
