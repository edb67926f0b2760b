//! Extractor registry for routing files to language-specific extractors.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use super::python::PythonExtractor;
use super::script::{ScriptEngine, ScriptExtractor};
use super::stylesheet::StylesheetExtractor;
use super::traits::Extractor;
use crate::config::ServiceConfig;

/// Registry of language extractors.
///
/// Maps lower-case file extensions to their respective extractors.
/// Adding a language means implementing [`Extractor`] and registering it.
pub struct ExtractorRegistry {
    /// Extension to extractor mapping.
    extractors: HashMap<String, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create a registry with all built-in extractors running in-process.
    pub fn new() -> Self {
        Self::with_script_engine(|| ScriptEngine::InProcess)
    }

    /// Create a registry whose script extractors follow `service`.
    pub fn from_config(service: &ServiceConfig) -> Self {
        Self::with_script_engine(|| ScriptEngine::from_config(service))
    }

    fn with_script_engine(engine: impl Fn() -> ScriptEngine) -> Self {
        let mut registry = Self {
            extractors: HashMap::new(),
        };

        registry.register(Arc::new(PythonExtractor::new()));
        registry.register(Arc::new(ScriptExtractor::typescript(engine())));
        registry.register(Arc::new(ScriptExtractor::javascript(engine())));
        registry.register(Arc::new(StylesheetExtractor::new()));

        registry
    }

    /// Create a registry with no extractors.
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Register an extractor for its supported extensions.
    ///
    /// A later registration replaces an earlier one for the same extension.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        for ext in extractor.supported_extensions() {
            self.extractors
                .insert(ext.to_lowercase(), Arc::clone(&extractor));
        }
    }

    /// Get an extractor for the given file extension.
    pub fn extractor_for_extension(&self, extension: &str) -> Option<Arc<dyn Extractor>> {
        self.extractors.get(&extension.to_lowercase()).cloned()
    }

    /// Get an extractor for the given file path.
    pub fn extractor_for_path(&self, path: &Path) -> Option<Arc<dyn Extractor>> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.extractor_for_extension(ext))
    }

    /// Check if any extractor can handle the given extension.
    pub fn can_extract(&self, extension: &str) -> bool {
        self.extractors.contains_key(&extension.to_lowercase())
    }

    /// All supported extensions, sorted.
    pub fn supported_extensions(&self) -> BTreeSet<String> {
        self.extractors.keys().cloned().collect()
    }

    /// List all registered extractors with their extensions.
    pub fn list_extractors(&self) -> Vec<(&'static str, &[&'static str])> {
        // The same extractor is registered under several extensions
        let mut seen = HashSet::new();
        let mut result: Vec<(&'static str, &[&'static str])> = self
            .extractors
            .values()
            .filter(|e| seen.insert(e.language_name()))
            .map(|e| (e.language_name(), e.supported_extensions()))
            .collect();
        result.sort_by_key(|(name, _)| *name);
        result
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceMode;
    use crate::extract::ExtractorCapability;

    #[test]
    fn test_registry_has_all_extractors() {
        let registry = ExtractorRegistry::new();
        let expected: BTreeSet<String> = ["css", "js", "jsx", "py", "ts", "tsx"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(registry.supported_extensions(), expected);
    }

    #[test]
    fn test_extractor_for_path() {
        let registry = ExtractorRegistry::new();
        let python = registry.extractor_for_path(Path::new("src/main.py")).unwrap();
        assert_eq!(python.language_name(), "python");
        let tsx = registry.extractor_for_path(Path::new("App.tsx")).unwrap();
        assert_eq!(tsx.language_name(), "typescript");
        let jsx = registry.extractor_for_path(Path::new("App.jsx")).unwrap();
        assert_eq!(jsx.language_name(), "javascript");
        assert!(registry.extractor_for_path(Path::new("unknown.xyz")).is_none());
        assert!(registry.extractor_for_path(Path::new("Makefile")).is_none());
    }

    #[test]
    fn test_case_insensitive() {
        let registry = ExtractorRegistry::new();
        assert!(registry.can_extract("PY"));
        assert!(registry.can_extract("Css"));
        assert!(registry.extractor_for_path(Path::new("STYLE.CSS")).is_some());
    }

    #[test]
    fn test_list_extractors() {
        let registry = ExtractorRegistry::new();
        let names: Vec<&str> = registry.list_extractors().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["css", "javascript", "python", "typescript"]);
    }

    #[test]
    fn test_external_service_capability() {
        let service = ServiceConfig {
            mode: ServiceMode::External,
            ..ServiceConfig::default()
        };
        let registry = ExtractorRegistry::from_config(&service);
        let ts = registry.extractor_for_extension("ts").unwrap();
        assert_eq!(ts.capability(), ExtractorCapability::Service);
        let py = registry.extractor_for_extension("py").unwrap();
        assert_eq!(py.capability(), ExtractorCapability::SyntaxTree);
    }

    #[test]
    fn test_empty_registry() {
        let mut registry = ExtractorRegistry::empty();
        assert!(registry.supported_extensions().is_empty());
        registry.register(Arc::new(StylesheetExtractor::new()));
        assert!(registry.can_extract("css"));
    }
}
