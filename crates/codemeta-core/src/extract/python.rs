//! Python extractor using tree-sitter.
//!
//! Walks module and class-body statements only; declarations nested in
//! function bodies are not entities.

use std::path::Path;

use tree_sitter::Node;

use super::result::Extraction;
use super::source::SourceText;
use super::traits::{Extractor, ExtractorCapability};
use super::treesitter::{
    collapse_whitespace, compact_text, field_text, has_token, node_end_line, node_line, node_text,
    TreeSitterParser,
};
use crate::error::ExtractError;
use crate::schema::{
    modifier_string, CodeEntity, EntityType, FileFacts, Parameter, ParameterKind, Relationships,
    REL_EXTENDS,
};

const LANGUAGE: &str = "python";

const ENTITY_TYPES: &[EntityType] = &[
    EntityType::Function,
    EntityType::Method,
    EntityType::Class,
    EntityType::Variable,
];

/// Python extractor using tree-sitter.
pub struct PythonExtractor {
    base: TreeSitterParser,
}

impl PythonExtractor {
    pub fn new() -> Self {
        Self {
            base: TreeSitterParser::new(tree_sitter_python::LANGUAGE.into(), LANGUAGE),
        }
    }

    /// Extract entities from already-decoded content.
    pub fn extract_source(&self, path: &str, content: &str) -> Result<Vec<CodeEntity>, ExtractError> {
        let tree = self.base.parse_tree(content)?;
        let root = tree.root_node();

        let facts = FileFacts::new(path, collect_imports(root, content));
        let mut entities = Vec::new();
        self.walk_block(root, content, "", &mut entities);

        Ok(facts.stamp(entities))
    }

    /// Visit the statements of a module or class body.
    fn walk_block(&self, block: Node, content: &str, parent: &str, out: &mut Vec<CodeEntity>) {
        let mut cursor = block.walk();
        for stmt in block.named_children(&mut cursor) {
            self.process_statement(stmt, content, parent, Vec::new(), out);
        }
    }

    fn process_statement(
        &self,
        stmt: Node,
        content: &str,
        parent: &str,
        decorators: Vec<String>,
        out: &mut Vec<CodeEntity>,
    ) {
        match stmt.kind() {
            "function_definition" => {
                if let Some(func) = self.extract_function(&stmt, content, parent, decorators) {
                    out.push(func);
                }
            }
            "class_definition" => self.extract_class(&stmt, content, parent, decorators, out),
            "decorated_definition" => {
                let decorators = extract_decorators(&stmt, content);
                if let Some(definition) = stmt.child_by_field_name("definition") {
                    self.process_statement(definition, content, parent, decorators, out);
                }
            }
            "expression_statement" => {
                if let Some(var) = self.extract_variable(&stmt, content, parent) {
                    out.push(var);
                }
            }
            _ => {}
        }
    }

    fn extract_function(
        &self,
        node: &Node,
        content: &str,
        parent: &str,
        decorators: Vec<String>,
    ) -> Option<CodeEntity> {
        let name_node = node.child_by_field_name("name")?;
        let name = node_text(&name_node, content);

        let is_async = has_token(node, "async");
        let is_method = !parent.is_empty();
        let params_node = node.child_by_field_name("parameters");
        let return_type = field_text(node, "return_type", content);

        let mut signature = format!(
            "{}def {}{}",
            if is_async { "async " } else { "" },
            name,
            params_node
                .map(|p| render_parameter_list(&p, content))
                .unwrap_or_else(|| "()".to_string())
        );
        if !return_type.is_empty() {
            signature.push_str(" -> ");
            signature.push_str(&return_type);
        }

        let mut modifiers = Vec::new();
        if is_async {
            modifiers.push("async");
        }
        if is_method
            && decorators
                .iter()
                .any(|d| d == "@staticmethod" || d == "@classmethod")
        {
            modifiers.push("static");
        }

        let entity_type = if is_method {
            EntityType::Method
        } else {
            EntityType::Function
        };

        Some(CodeEntity {
            line_start: node_line(node),
            line_end: node_end_line(node),
            signature,
            parameters: params_node
                .map(|p| extract_parameters(&p, content))
                .unwrap_or_default(),
            return_type,
            docstring: extract_docstring(node, content),
            decorators,
            modifiers: modifier_string(&modifiers),
            source_code: node_text(node, content).to_string(),
            ..CodeEntity::new(entity_type, name, parent, LANGUAGE)
        })
    }

    fn extract_class(
        &self,
        node: &Node,
        content: &str,
        parent: &str,
        decorators: Vec<String>,
        out: &mut Vec<CodeEntity>,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(&name_node, content).to_string();

        // Positional base classes; `metaclass=...` and friends are not heritage.
        let superclasses = node.child_by_field_name("superclasses");
        let bases: Vec<String> = superclasses
            .map(|sc| {
                let mut cursor = sc.walk();
                sc.named_children(&mut cursor)
                    .filter(|c| !matches!(c.kind(), "keyword_argument" | "comment"))
                    .map(|c| compact_text(&c, content))
                    .collect()
            })
            .unwrap_or_default();

        let signature = match superclasses {
            Some(sc) => format!("class {}{}", name, compact_text(&sc, content)),
            None => format!("class {}", name),
        };

        out.push(CodeEntity {
            line_start: node_line(node),
            line_end: node_end_line(node),
            signature,
            docstring: extract_docstring(node, content),
            decorators,
            source_code: node_text(node, content).to_string(),
            relationships: Relationships::new().with(REL_EXTENDS, bases),
            ..CodeEntity::new(EntityType::Class, &name, parent, LANGUAGE)
        });

        if let Some(body) = node.child_by_field_name("body") {
            self.walk_block(body, content, &name, out);
        }
    }

    /// Simple or annotated assignment to a bare name.
    fn extract_variable(&self, stmt: &Node, content: &str, parent: &str) -> Option<CodeEntity> {
        let assignment = stmt.named_child(0)?;
        if assignment.kind() != "assignment" {
            return None;
        }
        let left = assignment.child_by_field_name("left")?;
        if left.kind() != "identifier" {
            return None;
        }
        let name = node_text(&left, content);
        let annotation = assignment
            .child_by_field_name("type")
            .map(|t| compact_text(&t, content))
            .unwrap_or_default();

        let signature = if annotation.is_empty() {
            name.to_string()
        } else {
            format!("{}: {}", name, annotation)
        };

        Some(CodeEntity {
            line_start: node_line(stmt),
            line_end: node_end_line(stmt),
            signature,
            return_type: annotation,
            source_code: node_text(stmt, content).to_string(),
            ..CodeEntity::new(EntityType::Variable, name, parent, LANGUAGE)
        })
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for PythonExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let source = SourceText::read(path)?;
        let entities = self.extract_source(&path.to_string_lossy(), &source.text)?;

        let mut extraction = Extraction::new(entities);
        if let Some(diag) = source.fallback_diagnostic(path) {
            extraction.warn(diag);
        }
        Ok(extraction)
    }

    fn language_name(&self) -> &'static str {
        LANGUAGE
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &["py"]
    }

    fn entity_types(&self) -> &[EntityType] {
        ENTITY_TYPES
    }

    fn capability(&self) -> ExtractorCapability {
        ExtractorCapability::SyntaxTree
    }
}

/// Module names imported by top-level import statements.
fn collect_imports(root: Node, content: &str) -> Vec<String> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();

    for stmt in root.named_children(&mut cursor) {
        match stmt.kind() {
            "import_statement" => {
                let mut inner = stmt.walk();
                for name in stmt.named_children(&mut inner) {
                    match name.kind() {
                        "dotted_name" => imports.push(node_text(&name, content).to_string()),
                        "aliased_import" => {
                            let module = field_text(&name, "name", content);
                            if !module.is_empty() {
                                imports.push(module);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                let module = field_text(&stmt, "module_name", content);
                if !module.is_empty() {
                    imports.push(module);
                }
            }
            "future_import_statement" => imports.push("__future__".to_string()),
            _ => {}
        }
    }

    imports
}

fn extract_decorators(decorated: &Node, content: &str) -> Vec<String> {
    let mut cursor = decorated.walk();
    let decorators = decorated
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .map(|d| match d.named_child(0) {
            Some(expr) => format!("@{}", compact_text(&expr, content)),
            None => compact_text(&d, content),
        })
        .collect();
    decorators
}

/// Parameter records, tracking variadic and keyword-only positions.
fn extract_parameters(params: &Node, content: &str) -> Vec<Parameter> {
    let mut result = Vec::new();
    let mut keyword_only = false;
    let positional = |keyword_only: bool| {
        if keyword_only {
            ParameterKind::KeywordOnly
        } else {
            ParameterKind::Positional
        }
    };

    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                result.push(Parameter::new(node_text(&child, content)).with_kind(positional(keyword_only)));
            }
            "typed_parameter" => {
                let Some(inner) = child.named_child(0) else {
                    continue;
                };
                let type_name = field_text(&child, "type", content);
                let param = match inner.kind() {
                    "list_splat_pattern" => {
                        keyword_only = true;
                        Parameter::new(splat_name(&inner, content))
                            .with_kind(ParameterKind::Variadic)
                            .optional(true)
                    }
                    "dictionary_splat_pattern" => Parameter::new(splat_name(&inner, content))
                        .with_kind(ParameterKind::KeywordVariadic)
                        .optional(true),
                    _ => Parameter::new(node_text(&inner, content)).with_kind(positional(keyword_only)),
                };
                result.push(param.with_type(type_name));
            }
            "default_parameter" | "typed_default_parameter" => {
                result.push(
                    Parameter::new(field_text(&child, "name", content))
                        .with_type(field_text(&child, "type", content))
                        .with_default(compact_default(&child, content))
                        .with_kind(positional(keyword_only)),
                );
            }
            "list_splat_pattern" => {
                keyword_only = true;
                result.push(
                    Parameter::new(splat_name(&child, content))
                        .with_kind(ParameterKind::Variadic)
                        .optional(true),
                );
            }
            "dictionary_splat_pattern" => {
                result.push(
                    Parameter::new(splat_name(&child, content))
                        .with_kind(ParameterKind::KeywordVariadic)
                        .optional(true),
                );
            }
            "keyword_separator" => keyword_only = true,
            _ => {}
        }
    }

    result
}

fn splat_name(pattern: &Node, content: &str) -> String {
    pattern
        .named_child(0)
        .map(|n| node_text(&n, content).to_string())
        .unwrap_or_else(|| node_text(pattern, content).trim_start_matches('*').to_string())
}

fn compact_default(param: &Node, content: &str) -> String {
    param
        .child_by_field_name("value")
        .map(|v| compact_text(&v, content))
        .unwrap_or_default()
}

/// `(a, b: int = 1, *args, **kwargs)` with comments and line breaks removed.
fn render_parameter_list(params: &Node, content: &str) -> String {
    let mut cursor = params.walk();
    let parts: Vec<String> = params
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .map(|c| compact_text(&c, content))
        .collect();
    format!("({})", parts.join(", "))
}

/// First statement of the body, when it is a string literal.
fn extract_docstring(node: &Node, content: &str) -> String {
    let Some(body) = node.child_by_field_name("body") else {
        return String::new();
    };
    let Some(first) = body.named_child(0) else {
        return String::new();
    };
    if first.kind() != "expression_statement" {
        return String::new();
    }
    match first.named_child(0) {
        Some(string) if string.kind() == "string" => clean_docstring(node_text(&string, content)),
        _ => String::new(),
    }
}

/// Strip prefix and quotes, remove common indentation, trim.
pub(crate) fn clean_docstring(raw: &str) -> String {
    let unprefixed = raw.trim_start_matches(|c: char| "rRuUbBfF".contains(c));
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|quote| {
            unprefixed
                .strip_prefix(quote)
                .and_then(|s| s.strip_suffix(quote))
        })
        .unwrap_or(unprefixed);

    let mut lines = inner.lines();
    let first = lines.next().unwrap_or("").trim().to_string();
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = vec![first];
    for line in rest {
        let dedented = line.get(indent..).unwrap_or_else(|| line.trim_start());
        out.push(dedented.trim_end().to_string());
    }

    let joined = out.join("\n");
    let trimmed = joined.trim();
    if trimmed.contains('\n') {
        trimmed.to_string()
    } else {
        collapse_whitespace(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str) -> Vec<CodeEntity> {
        PythonExtractor::new().extract_source("mod.py", content).unwrap()
    }

    fn find<'a>(entities: &'a [CodeEntity], full_name: &str) -> &'a CodeEntity {
        entities
            .iter()
            .find(|e| e.full_name == full_name)
            .unwrap_or_else(|| panic!("no entity {full_name}"))
    }

    #[test]
    fn test_simple_function() {
        let entities = extract("def add(a, b):\n    return a + b\n");
        assert_eq!(entities.len(), 1);

        let add = &entities[0];
        assert_eq!(add.entity_type, EntityType::Function);
        assert_eq!(add.name, "add");
        assert_eq!(add.signature, "def add(a, b)");
        assert_eq!(add.return_type, "");
        assert_eq!(add.line_start, 1);
        assert_eq!(add.line_end, 2);
        assert_eq!(add.parameters.len(), 2);
        assert!(add.parameters.iter().all(|p| p.type_name.is_empty() && !p.optional));
    }

    #[test]
    fn test_annotated_async_function() {
        let source = r#"
async def fetch(url: str, retries: int = 3, *args, timeout: float, **kwargs) -> bytes:
    """Fetch a URL.

    Retries on failure.
    """
    pass
"#;
        let entities = extract(source);
        let fetch = find(&entities, "fetch");

        assert_eq!(fetch.modifiers, "async");
        assert_eq!(fetch.return_type, "bytes");
        assert!(fetch.signature.starts_with("async def fetch(url: str, retries: int = 3"));
        assert!(fetch.signature.ends_with(" -> bytes"));
        assert_eq!(fetch.docstring, "Fetch a URL.\n\nRetries on failure.");

        let params = &fetch.parameters;
        assert_eq!(params.len(), 5);
        assert_eq!(params[0].type_name, "str");
        assert_eq!(params[1].default, "3");
        assert!(params[1].optional);
        assert_eq!(params[2].name, "args");
        assert_eq!(params[2].kind, ParameterKind::Variadic);
        assert_eq!(params[3].name, "timeout");
        assert_eq!(params[3].kind, ParameterKind::KeywordOnly);
        assert_eq!(params[4].name, "kwargs");
        assert_eq!(params[4].kind, ParameterKind::KeywordVariadic);
    }

    #[test]
    fn test_class_with_methods() {
        let source = r#"
import os
from typing import Optional

class Service(Base, metaclass=Meta):
    """A service."""

    retries: int = 3

    def __init__(self, name):
        self.name = name

    @staticmethod
    def build():
        def helper():
            pass
        return Service("x")

    class Config:
        debug = False
"#;
        let entities = extract(source);

        let service = find(&entities, "Service");
        assert_eq!(service.entity_type, EntityType::Class);
        assert_eq!(service.relationships.extends(), ["Base"]);
        assert_eq!(service.signature, "class Service(Base, metaclass=Meta)");
        assert_eq!(service.docstring, "A service.");

        let retries = find(&entities, "Service.retries");
        assert_eq!(retries.entity_type, EntityType::Variable);
        assert_eq!(retries.return_type, "int");

        let init = find(&entities, "Service.__init__");
        assert_eq!(init.entity_type, EntityType::Method);
        assert_eq!(init.parent_entity, "Service");

        let build = find(&entities, "Service.build");
        assert_eq!(build.decorators, vec!["@staticmethod"]);
        assert_eq!(build.modifiers, "static");

        let config = find(&entities, "Service.Config");
        assert_eq!(config.entity_type, EntityType::Class);
        assert_eq!(find(&entities, "Config.debug").parent_entity, "Config");

        assert!(entities.iter().all(|e| e.name != "helper"));

        for entity in &entities {
            assert_eq!(entity.dependencies, vec!["os", "typing"]);
            assert_eq!(entity.relationships.imports(), ["os", "typing"]);
            assert!(entity.line_start <= entity.line_end);
        }
    }

    #[test]
    fn test_module_variables() {
        let entities = extract("MAX = 10\nname: str = 'x'\nlabel: str\na, b = 1, 2\nx += 1\n");
        let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["MAX", "name", "label"]);
        assert_eq!(entities[1].signature, "name: str");
        assert_eq!(entities[1].return_type, "str");
    }

    #[test]
    fn test_decorated_function_span() {
        let entities = extract("@app.route('/')\n@cached\ndef index():\n    return 1\n");
        let index = find(&entities, "index");
        assert_eq!(index.decorators, vec!["@app.route('/')", "@cached"]);
        assert_eq!(index.line_start, 3);
        assert_eq!(index.line_end, 4);
    }

    #[test]
    fn test_syntax_error_is_an_error() {
        let err = PythonExtractor::new()
            .extract_source("bad.py", "def broken(:\n    pass\n")
            .unwrap_err();
        assert!(matches!(err, ExtractError::Syntax { .. }));
    }

    #[test]
    fn test_clean_docstring() {
        assert_eq!(clean_docstring(r#""""  One line.  """"#), "One line.");
        assert_eq!(clean_docstring("'single'"), "single");
        assert_eq!(clean_docstring("r'''raw\n    indented\n'''"), "raw\nindented");
    }
}
