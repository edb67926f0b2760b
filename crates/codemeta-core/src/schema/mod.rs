//! Uniform code entity schema.
//!
//! Every extractor, whatever its parsing strategy, produces [`CodeEntity`]
//! records with the same flat shape. Collection-valued fields are typed in
//! Rust but travel as JSON-encoded strings on the wire, so the records can
//! be inserted into a property-map index store as-is.
//!
//! ## Invariants
//!
//! - `line_start <= line_end`, both 1-based.
//! - `full_name` is `name` at top level, else `parent_entity.name`.
//! - `dependencies` and `relationships["imports"]` are identical for every
//!   entity of one file.

mod json_field;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Relationship key for base classes / extended interfaces.
pub const REL_EXTENDS: &str = "extends";
/// Relationship key for implemented interfaces.
pub const REL_IMPLEMENTS: &str = "implements";
/// Relationship key for the file-scoped import list.
pub const REL_IMPORTS: &str = "imports";

/// Order in which modifier keywords are rendered.
pub const MODIFIER_ORDER: &[&str] = &[
    "export",
    "default",
    "async",
    "static",
    "readonly",
    "public",
    "private",
    "protected",
    "abstract",
    "const",
    "declare",
];

/// Kind of code entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Enum,
    Variable,
    Property,
    Constructor,
    Style,
    Animation,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Enum => "enum",
            Self::Variable => "variable",
            Self::Property => "property",
            Self::Constructor => "constructor",
            Self::Style => "style",
            Self::Animation => "animation",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a parameter binds its arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    #[default]
    Positional,
    /// `*args` / `...rest`
    Variadic,
    /// Declared after a bare `*` or a variadic parameter.
    KeywordOnly,
    /// `**kwargs`
    KeywordVariadic,
}

/// One parameter (or enum/interface member) record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    /// Declared type text, empty when unannotated.
    #[serde(rename = "type", default)]
    pub type_name: String,

    #[serde(default)]
    pub optional: bool,

    /// Default / initializer expression text, empty when absent.
    #[serde(default)]
    pub default: String,

    #[serde(default)]
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Set the default expression. A parameter with a default is optional.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        if !self.default.is_empty() {
            self.optional = true;
        }
        self
    }

    pub fn with_kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = self.optional || optional;
        self
    }
}

/// Relationship map: `extends`, `implements`, `imports` -> targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Relationships(BTreeMap<String, Vec<String>>);

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a relationship list, skipping empty lists.
    pub fn with(mut self, key: &str, targets: Vec<String>) -> Self {
        if !targets.is_empty() {
            self.0.insert(key.to_string(), targets);
        }
        self
    }

    /// Insert or replace a key, keeping empty lists.
    pub fn insert(&mut self, key: &str, targets: Vec<String>) {
        self.0.insert(key.to_string(), targets);
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn extends(&self) -> &[String] {
        self.get(REL_EXTENDS).unwrap_or_default()
    }

    pub fn implements(&self) -> &[String] {
        self.get(REL_IMPLEMENTS).unwrap_or_default()
    }

    pub fn imports(&self) -> &[String] {
        self.get(REL_IMPORTS).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single extracted code entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntity {
    pub entity_type: EntityType,

    /// Simple identifier (or selector / animation name for stylesheets).
    pub name: String,

    /// `parent_entity.name`, or `name` at top level.
    pub full_name: String,

    /// Path as supplied by the caller.
    pub file_path: String,

    pub line_start: u32,
    pub line_end: u32,

    /// Reconstructed declaration text.
    pub signature: String,

    #[serde(with = "json_field")]
    pub parameters: Vec<Parameter>,

    pub return_type: String,

    pub docstring: String,

    #[serde(with = "json_field")]
    pub decorators: Vec<String>,

    /// Comma-joined modifier keywords, see [`MODIFIER_ORDER`].
    pub modifiers: String,

    /// Simple name of the lexically enclosing entity.
    pub parent_entity: String,

    pub language: String,

    pub source_code: String,

    #[serde(with = "json_field")]
    pub dependencies: Vec<String>,

    #[serde(with = "json_field")]
    pub relationships: Relationships,
}

impl CodeEntity {
    /// Start an entity with its identity fields set and everything else empty.
    ///
    /// Meant to be used as the base of a struct update expression.
    pub fn new(entity_type: EntityType, name: &str, parent: &str, language: &str) -> Self {
        Self {
            entity_type,
            name: name.to_string(),
            full_name: full_name(parent, name),
            file_path: String::new(),
            line_start: 1,
            line_end: 1,
            signature: String::new(),
            parameters: Vec::new(),
            return_type: String::new(),
            docstring: String::new(),
            decorators: Vec::new(),
            modifiers: String::new(),
            parent_entity: parent.to_string(),
            language: language.to_string(),
            source_code: String::new(),
            dependencies: Vec::new(),
            relationships: Relationships::new(),
        }
    }

    /// Attach file-scoped facts, producing the final record.
    pub fn with_file_facts(self, facts: &FileFacts) -> Self {
        let mut relationships = self.relationships;
        relationships.insert(REL_IMPORTS, facts.imports.clone());
        Self {
            file_path: facts.file_path.clone(),
            dependencies: facts.imports.clone(),
            relationships,
            ..self
        }
    }
}

/// Facts collected once per file and stamped onto every entity.
#[derive(Debug, Clone, Default)]
pub struct FileFacts {
    pub file_path: String,
    pub imports: Vec<String>,
}

impl FileFacts {
    pub fn new(file_path: impl Into<String>, imports: Vec<String>) -> Self {
        let mut unique = Vec::with_capacity(imports.len());
        for import in imports {
            if !unique.contains(&import) {
                unique.push(import);
            }
        }
        Self {
            file_path: file_path.into(),
            imports: unique,
        }
    }

    /// Second pass: stamp every entity with the file's facts.
    pub fn stamp(&self, entities: Vec<CodeEntity>) -> Vec<CodeEntity> {
        entities
            .into_iter()
            .map(|entity| entity.with_file_facts(self))
            .collect()
    }
}

/// Dotted path from the enclosing entity.
pub fn full_name(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

/// Render present modifier keywords in canonical order.
pub fn modifier_string(present: &[&str]) -> String {
    MODIFIER_ORDER
        .iter()
        .filter(|m| present.contains(m))
        .copied()
        .collect::<Vec<_>>()
        .join(",")
}
