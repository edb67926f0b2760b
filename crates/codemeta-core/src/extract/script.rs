//! TypeScript and JavaScript extractor.
//!
//! One walk serves both languages. It runs in-process on the tree-sitter
//! grammars, or out of process through a [`ProcessBridge`] when built with
//! [`ScriptEngine::Service`]. The `codemeta-tsc` binary is the in-process
//! walk sitting behind that bridge.

use std::path::Path;

use tree_sitter::{Language, Node};

use super::bridge::ProcessBridge;
use super::result::Extraction;
use super::source::SourceText;
use super::traits::{Extractor, ExtractorCapability};
use super::treesitter::{
    collapse_whitespace, compact_text, has_token, node_end_line, node_line, node_text,
    split_top_level, TreeSitterParser,
};
use crate::config::{ServiceConfig, ServiceMode};
use crate::error::ExtractError;
use crate::schema::{
    modifier_string, CodeEntity, EntityType, FileFacts, Parameter, ParameterKind, Relationships,
    REL_EXTENDS, REL_IMPLEMENTS,
};

const TYPESCRIPT: &str = "typescript";
const JAVASCRIPT: &str = "javascript";

const TYPESCRIPT_TYPES: &[EntityType] = &[
    EntityType::Function,
    EntityType::Method,
    EntityType::Class,
    EntityType::Interface,
    EntityType::Type,
    EntityType::Enum,
    EntityType::Variable,
    EntityType::Property,
    EntityType::Constructor,
];

const JAVASCRIPT_TYPES: &[EntityType] = &[
    EntityType::Function,
    EntityType::Method,
    EntityType::Class,
    EntityType::Variable,
    EntityType::Property,
    EntityType::Constructor,
];

/// Grammar flavour selected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptSyntax {
    TypeScript,
    /// TypeScript with JSX markup.
    Tsx,
    /// JavaScript; the grammar accepts JSX in both `.js` and `.jsx`.
    JavaScript,
}

impl ScriptSyntax {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "js" | "jsx" => Some(Self::JavaScript),
            _ => None,
        }
    }

    pub fn language_name(&self) -> &'static str {
        match self {
            Self::TypeScript | Self::Tsx => TYPESCRIPT,
            Self::JavaScript => JAVASCRIPT,
        }
    }

    fn grammar(&self) -> Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

/// Where the walk runs.
#[derive(Debug, Clone)]
pub enum ScriptEngine {
    InProcess,
    Service(ProcessBridge),
}

impl ScriptEngine {
    pub fn from_config(config: &ServiceConfig) -> Self {
        match config.mode {
            ServiceMode::InProcess => Self::InProcess,
            ServiceMode::External => Self::Service(
                ProcessBridge::new(&config.program).with_timeout(config.timeout()),
            ),
        }
    }
}

/// Extractor for the TypeScript / JavaScript pair.
pub struct ScriptExtractor {
    syntax: ScriptSyntax,
    engine: ScriptEngine,
}

impl ScriptExtractor {
    /// Handles `.ts` and `.tsx`.
    pub fn typescript(engine: ScriptEngine) -> Self {
        Self {
            syntax: ScriptSyntax::TypeScript,
            engine,
        }
    }

    /// Handles `.js` and `.jsx`.
    pub fn javascript(engine: ScriptEngine) -> Self {
        Self {
            syntax: ScriptSyntax::JavaScript,
            engine,
        }
    }

    /// In-process extractor for the language of `path`, if it is a script file.
    pub fn for_path(path: &Path) -> Option<Self> {
        match ScriptSyntax::from_path(path)? {
            ScriptSyntax::TypeScript | ScriptSyntax::Tsx => {
                Some(Self::typescript(ScriptEngine::InProcess))
            }
            ScriptSyntax::JavaScript => Some(Self::javascript(ScriptEngine::InProcess)),
        }
    }

    /// Run the walk in this process, whatever the configured engine.
    pub fn extract_in_process(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let source = SourceText::read(path)?;
        let syntax = ScriptSyntax::from_path(path)
            .filter(|s| s.language_name() == self.syntax.language_name())
            .unwrap_or(self.syntax);
        let entities = extract_source(&path.to_string_lossy(), &source.text, syntax)?;

        let mut extraction = Extraction::new(entities);
        if let Some(diag) = source.fallback_diagnostic(path) {
            extraction.warn(diag);
        }
        Ok(extraction)
    }
}

impl Extractor for ScriptExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        match &self.engine {
            ScriptEngine::InProcess => self.extract_in_process(path),
            ScriptEngine::Service(bridge) => Ok(Extraction::new(bridge.invoke(path)?)),
        }
    }

    fn language_name(&self) -> &'static str {
        self.syntax.language_name()
    }

    fn supported_extensions(&self) -> &[&'static str] {
        match self.syntax {
            ScriptSyntax::TypeScript | ScriptSyntax::Tsx => &["ts", "tsx"],
            ScriptSyntax::JavaScript => &["js", "jsx"],
        }
    }

    fn entity_types(&self) -> &[EntityType] {
        match self.syntax {
            ScriptSyntax::TypeScript | ScriptSyntax::Tsx => TYPESCRIPT_TYPES,
            ScriptSyntax::JavaScript => JAVASCRIPT_TYPES,
        }
    }

    fn capability(&self) -> ExtractorCapability {
        match self.engine {
            ScriptEngine::InProcess => ExtractorCapability::SyntaxTree,
            ScriptEngine::Service(_) => ExtractorCapability::Service,
        }
    }
}

/// Extract entities from already-decoded script content.
pub fn extract_source(
    path: &str,
    content: &str,
    syntax: ScriptSyntax,
) -> Result<Vec<CodeEntity>, ExtractError> {
    let tree = TreeSitterParser::new(syntax.grammar(), syntax.language_name()).parse_tree(content)?;

    let mut walker = Walker::new(content, syntax.language_name());
    walker.visit(tree.root_node(), "", Scope::default());

    let facts = FileFacts::new(path, walker.imports);
    Ok(facts.stamp(walker.entities))
}

/// Node kinds the walk reacts to. Everything else is descended.
enum ScriptNode<'t> {
    /// Function and arrow expressions; their bodies hold no entities.
    Callable,
    Import(Node<'t>),
    Export(Node<'t>),
    Ambient(Node<'t>),
    Function(Node<'t>),
    Variables(Node<'t>),
    Class(Node<'t>),
    Interface(Node<'t>),
    TypeAlias(Node<'t>),
    Enum(Node<'t>),
    Other(Node<'t>),
}

impl<'t> ScriptNode<'t> {
    fn classify(node: Node<'t>) -> Self {
        match node.kind() {
            "import_statement" => Self::Import(node),
            "export_statement" => Self::Export(node),
            "ambient_declaration" => Self::Ambient(node),
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                Self::Function(node)
            }
            "lexical_declaration" | "variable_declaration" => Self::Variables(node),
            "class_declaration" | "abstract_class_declaration" => Self::Class(node),
            "interface_declaration" => Self::Interface(node),
            "type_alias_declaration" => Self::TypeAlias(node),
            "enum_declaration" => Self::Enum(node),
            kind if is_function_expression(kind) => Self::Callable,
            _ => Self::Other(node),
        }
    }
}

/// Context inherited from wrapping statements.
#[derive(Debug, Clone, Copy, Default)]
struct Scope<'t> {
    exported: bool,
    default_export: bool,
    declared: bool,
    /// Outermost wrapper; supplies span, source and doc comment.
    anchor: Option<Node<'t>>,
}

impl<'t> Scope<'t> {
    fn anchor_or(&self, node: Node<'t>) -> Node<'t> {
        self.anchor.unwrap_or(node)
    }

    fn modifiers(&self) -> Vec<&'static str> {
        let mut modifiers = Vec::new();
        if self.exported {
            modifiers.push("export");
        }
        if self.default_export {
            modifiers.push("default");
        }
        if self.declared {
            modifiers.push("declare");
        }
        modifiers
    }
}

struct Walker<'s> {
    content: &'s str,
    language: &'static str,
    entities: Vec<CodeEntity>,
    imports: Vec<String>,
}

impl<'s> Walker<'s> {
    fn new(content: &'s str, language: &'static str) -> Self {
        Self {
            content,
            language,
            entities: Vec::new(),
            imports: Vec::new(),
        }
    }

    fn visit<'t>(&mut self, node: Node<'t>, parent: &str, scope: Scope<'t>) {
        match ScriptNode::classify(node) {
            ScriptNode::Callable => {}
            ScriptNode::Import(n) => self.collect_import(n),
            ScriptNode::Export(n) => {
                // `export { x } from "y"` re-exports count as imports
                if let Some(source) = n.child_by_field_name("source") {
                    self.push_import(source);
                }
                let scope = Scope {
                    exported: true,
                    default_export: has_token(&n, "default"),
                    anchor: Some(n),
                    ..scope
                };
                // export default function name() {} as an expression
                if let Some(value) = n.child_by_field_name("value") {
                    if let Some(name) = value
                        .child_by_field_name("name")
                        .filter(|_| is_function_expression(value.kind()))
                    {
                        let name = node_text(&name, self.content);
                        let entity = self.function(name, parent, value, n, scope.modifiers());
                        self.entities.push(entity);
                        return;
                    }
                }
                self.visit_children(n, parent, scope);
            }
            ScriptNode::Ambient(n) => {
                let scope = Scope {
                    declared: true,
                    anchor: Some(scope.anchor_or(n)),
                    ..scope
                };
                self.visit_children(n, parent, scope);
            }
            ScriptNode::Function(n) => {
                if let Some(entity) = self.function_declaration(n, parent, scope) {
                    self.entities.push(entity);
                }
            }
            ScriptNode::Variables(n) => self.variables(n, parent, scope),
            ScriptNode::Class(n) => self.class(n, parent, scope),
            ScriptNode::Interface(n) => {
                if let Some(entity) = self.interface(n, parent, scope) {
                    self.entities.push(entity);
                }
            }
            ScriptNode::TypeAlias(n) => {
                if let Some(entity) = self.type_alias(n, parent, scope) {
                    self.entities.push(entity);
                }
            }
            ScriptNode::Enum(n) => {
                if let Some(entity) = self.enumeration(n, parent, scope) {
                    self.entities.push(entity);
                }
            }
            ScriptNode::Other(n) => {
                let scope = Scope {
                    declared: scope.declared,
                    ..Scope::default()
                };
                self.visit_children(n, parent, scope);
            }
        }
    }

    fn visit_children<'t>(&mut self, node: Node<'t>, parent: &str, scope: Scope<'t>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, parent, scope);
        }
    }

    fn collect_import(&mut self, node: Node) {
        let source = node.child_by_field_name("source").or_else(|| {
            // import fs = require("fs")
            let mut cursor = node.walk();
            let clause = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "import_require_clause");
            clause.and_then(|c| {
                let mut inner = c.walk();
                let source = c.child_by_field_name("source").or_else(|| {
                    c.named_children(&mut inner).find(|n| n.kind() == "string")
                });
                source
            })
        });
        if let Some(source) = source {
            self.push_import(source);
        }
    }

    fn push_import(&mut self, literal: Node) {
        let specifier = string_literal(&literal, self.content);
        if !specifier.is_empty() {
            self.imports.push(specifier);
        }
    }

    /// Fields shared by every entity: span, source, doc comment, decorators.
    fn base<'t>(
        &self,
        entity_type: EntityType,
        name: &str,
        parent: &str,
        node: Node<'t>,
        anchor: Node<'t>,
    ) -> CodeEntity {
        CodeEntity {
            line_start: node_line(&anchor),
            line_end: node_end_line(&anchor),
            docstring: doc_comment(anchor, self.content),
            decorators: decorators(node, anchor, self.content),
            source_code: node_text(&anchor, self.content).to_string(),
            ..CodeEntity::new(entity_type, name, parent, self.language)
        }
    }

    fn function_declaration<'t>(
        &self,
        node: Node<'t>,
        parent: &str,
        scope: Scope<'t>,
    ) -> Option<CodeEntity> {
        let name = node_text(&node.child_by_field_name("name")?, self.content);
        Some(self.function(name, parent, node, scope.anchor_or(node), scope.modifiers()))
    }

    /// A `function` entity from any callable node.
    fn function<'t>(
        &self,
        name: &str,
        parent: &str,
        callable: Node<'t>,
        anchor: Node<'t>,
        mut modifiers: Vec<&'static str>,
    ) -> CodeEntity {
        let is_async = has_token(&callable, "async");
        if is_async {
            modifiers.push("async");
        }
        let params = script_parameters(&callable, self.content);
        let return_type = type_annotation(&callable, "return_type", self.content);

        let signature = format!(
            "{}function {}{}{}",
            if is_async { "async " } else { "" },
            name,
            render_parameters(&params),
            type_suffix(&return_type)
        );

        CodeEntity {
            signature,
            parameters: params.into_iter().map(|p| p.record).collect(),
            return_type,
            modifiers: modifier_string(&modifiers),
            ..self.base(EntityType::Function, name, parent, callable, anchor)
        }
    }

    fn variables<'t>(&mut self, node: Node<'t>, parent: &str, scope: Scope<'t>) {
        let content = self.content;
        let keyword = match node.child_by_field_name("kind") {
            Some(kind) => node_text(&kind, content),
            None => "var",
        };

        let mut cursor = node.walk();
        let declarators: Vec<Node<'t>> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "variable_declarator")
            .collect();
        let single = declarators.len() == 1;

        for declarator in declarators {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            // destructuring patterns are not entities
            if name_node.kind() != "identifier" {
                continue;
            }
            let name = node_text(&name_node, content);
            let anchor = if single {
                scope.anchor_or(node)
            } else {
                declarator
            };

            let mut modifiers = scope.modifiers();
            if keyword == "const" {
                modifiers.push("const");
            }

            let mut entity = match declarator.child_by_field_name("value") {
                Some(value) if is_function_expression(value.kind()) => {
                    self.function(name, parent, value, anchor, modifiers)
                }
                _ => {
                    let type_name = type_annotation(&declarator, "type", content);
                    CodeEntity {
                        signature: format!("{} {}{}", keyword, name, type_suffix(&type_name)),
                        return_type: type_name,
                        modifiers: modifier_string(&modifiers),
                        ..self.base(EntityType::Variable, name, parent, declarator, anchor)
                    }
                }
            };
            // the doc comment sits above the statement, not the declarator
            if !single {
                entity.docstring = doc_comment(scope.anchor_or(node), content);
            }
            self.entities.push(entity);
        }
    }

    fn class<'t>(&mut self, node: Node<'t>, parent: &str, scope: Scope<'t>) {
        let content = self.content;
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(&name_node, content);
        let (extends, implements) = heritage(&node, content);
        let is_abstract = node.kind() == "abstract_class_declaration";

        let mut signature = format!(
            "{}class {}{}",
            if is_abstract { "abstract " } else { "" },
            name,
            type_parameters(&node, content)
        );
        if !extends.is_empty() {
            signature.push_str(" extends ");
            signature.push_str(&extends.join(", "));
        }
        if !implements.is_empty() {
            signature.push_str(" implements ");
            signature.push_str(&implements.join(", "));
        }

        let mut modifiers = scope.modifiers();
        if is_abstract {
            modifiers.push("abstract");
        }

        let entity = CodeEntity {
            signature,
            modifiers: modifier_string(&modifiers),
            relationships: Relationships::new()
                .with(REL_EXTENDS, extends)
                .with(REL_IMPLEMENTS, implements),
            ..self.base(EntityType::Class, name, parent, node, scope.anchor_or(node))
        };
        self.entities.push(entity);

        if let Some(body) = node.child_by_field_name("body") {
            self.class_members(body, name);
        }
    }

    /// Members are leaves: their bodies are never walked.
    fn class_members(&mut self, body: Node, class_name: &str) {
        let mut cursor = body.walk();
        let members: Vec<Node> = body.named_children(&mut cursor).collect();
        for member in members {
            let entity = match member.kind() {
                "method_definition" | "method_signature" | "abstract_method_signature" => {
                    self.method(member, class_name)
                }
                "public_field_definition" | "field_definition" => self.field(member, class_name),
                _ => None,
            };
            if let Some(entity) = entity {
                self.entities.push(entity);
            }
        }
    }

    fn method(&self, node: Node, class_name: &str) -> Option<CodeEntity> {
        let content = self.content;
        let name = node_text(&node.child_by_field_name("name")?, content);
        let params = script_parameters(&node, content);
        let rendered = render_parameters(&params);
        let parameters: Vec<Parameter> = params.into_iter().map(|p| p.record).collect();
        let modifiers = member_modifiers(&node, content);

        if name == "constructor" {
            return Some(CodeEntity {
                signature: format!("constructor{}", rendered),
                parameters,
                return_type: class_name.to_string(),
                modifiers,
                ..self.base(EntityType::Constructor, name, class_name, node, node)
            });
        }

        let return_type = type_annotation(&node, "return_type", content);
        let accessor = ["get", "set"]
            .into_iter()
            .find(|token| has_token(&node, token))
            .map(|token| format!("{} ", token))
            .unwrap_or_default();
        let signature = format!(
            "{}{}{}{}{}",
            if has_token(&node, "async") { "async " } else { "" },
            accessor,
            name,
            rendered,
            type_suffix(&return_type)
        );

        Some(CodeEntity {
            signature,
            parameters,
            return_type,
            modifiers,
            ..self.base(EntityType::Method, name, class_name, node, node)
        })
    }

    fn field(&self, node: Node, class_name: &str) -> Option<CodeEntity> {
        let content = self.content;
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| node.child_by_field_name("property"))?;
        let name = node_text(&name_node, content);
        let type_name = type_annotation(&node, "type", content);
        let signature = format!(
            "{}{}{}",
            name,
            if has_token(&node, "?") { "?" } else { "" },
            type_suffix(&type_name)
        );

        Some(CodeEntity {
            signature,
            return_type: type_name,
            modifiers: member_modifiers(&node, content),
            ..self.base(EntityType::Property, name, class_name, node, node)
        })
    }

    fn interface<'t>(&self, node: Node<'t>, parent: &str, scope: Scope<'t>) -> Option<CodeEntity> {
        let content = self.content;
        let name = node_text(&node.child_by_field_name("name")?, content);

        let mut extends = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "extends_type_clause" {
                let mut inner = child.walk();
                extends.extend(
                    child
                        .named_children(&mut inner)
                        .map(|t| compact_text(&t, content)),
                );
            }
        }

        let members = node
            .child_by_field_name("body")
            .map(|body| interface_members(&body, content))
            .unwrap_or_default();

        let mut signature = format!("interface {}{}", name, type_parameters(&node, content));
        if !extends.is_empty() {
            signature.push_str(" extends ");
            signature.push_str(&extends.join(", "));
        }

        Some(CodeEntity {
            signature,
            parameters: members,
            modifiers: modifier_string(&scope.modifiers()),
            relationships: Relationships::new().with(REL_EXTENDS, extends),
            ..self.base(EntityType::Interface, name, parent, node, scope.anchor_or(node))
        })
    }

    fn type_alias<'t>(&self, node: Node<'t>, parent: &str, scope: Scope<'t>) -> Option<CodeEntity> {
        let content = self.content;
        let name = node_text(&node.child_by_field_name("name")?, content);
        let value = node
            .child_by_field_name("value")
            .map(|v| compact_text(&v, content))
            .unwrap_or_default();

        Some(CodeEntity {
            signature: format!("type {}{} = {}", name, type_parameters(&node, content), value),
            return_type: value,
            modifiers: modifier_string(&scope.modifiers()),
            ..self.base(EntityType::Type, name, parent, node, scope.anchor_or(node))
        })
    }

    fn enumeration<'t>(&self, node: Node<'t>, parent: &str, scope: Scope<'t>) -> Option<CodeEntity> {
        let content = self.content;
        let name = node_text(&node.child_by_field_name("name")?, content);

        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "enum_assignment" => {
                        let Some(member_name) = member.child_by_field_name("name") else {
                            continue;
                        };
                        members.push(Parameter {
                            default: member
                                .child_by_field_name("value")
                                .map(|v| compact_text(&v, content))
                                .unwrap_or_default(),
                            ..Parameter::new(node_text(&member_name, content))
                        });
                    }
                    "comment" => {}
                    _ => members.push(Parameter::new(node_text(&member, content))),
                }
            }
        }

        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        let signature = if names.is_empty() {
            format!("enum {} {{}}", name)
        } else {
            format!("enum {} {{ {} }}", name, names.join(", "))
        };

        let mut modifiers = scope.modifiers();
        if has_token(&node, "const") {
            modifiers.push("const");
        }

        Some(CodeEntity {
            signature,
            parameters: members,
            modifiers: modifier_string(&modifiers),
            ..self.base(EntityType::Enum, name, parent, node, scope.anchor_or(node))
        })
    }
}

/// A parameter record plus the `?` marker, which only matters for rendering.
struct ScriptParam {
    record: Parameter,
    question: bool,
}

impl ScriptParam {
    fn plain(record: Parameter) -> Self {
        Self {
            record,
            question: false,
        }
    }

    /// `[...]name[?][: type][ = default]`; `any` is not rendered.
    fn render(&self) -> String {
        let record = &self.record;
        let mut out = String::new();
        if record.kind == ParameterKind::Variadic {
            out.push_str("...");
        }
        out.push_str(&record.name);
        if self.question {
            out.push('?');
        }
        if !record.type_name.is_empty() && record.type_name != "any" {
            out.push_str(": ");
            out.push_str(&record.type_name);
        }
        if !record.default.is_empty() {
            out.push_str(" = ");
            out.push_str(&record.default);
        }
        out
    }
}

fn render_parameters(params: &[ScriptParam]) -> String {
    let rendered: Vec<String> = params.iter().map(ScriptParam::render).collect();
    format!("({})", rendered.join(", "))
}

fn script_parameters(callable: &Node, content: &str) -> Vec<ScriptParam> {
    // `x => x`
    if let Some(single) = callable.child_by_field_name("parameter") {
        return vec![ScriptParam::plain(Parameter::new(node_text(&single, content)))];
    }
    let Some(list) = callable.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = list.walk();
    let params = list
        .named_children(&mut cursor)
        .filter_map(|p| script_parameter(&p, content))
        .collect();
    params
}

fn script_parameter(node: &Node, content: &str) -> Option<ScriptParam> {
    match node.kind() {
        "required_parameter" | "optional_parameter" => {
            let pattern = node.child_by_field_name("pattern")?;
            let question = node.kind() == "optional_parameter";
            let variadic = pattern.kind() == "rest_pattern";
            let name = if variadic {
                rest_name(&pattern, content)
            } else {
                compact_text(&pattern, content)
            };
            let default = node
                .child_by_field_name("value")
                .map(|v| compact_text(&v, content))
                .unwrap_or_default();

            let mut record = Parameter::new(name)
                .with_type(type_annotation(node, "type", content))
                .with_default(default)
                .optional(question || variadic);
            if variadic {
                record = record.with_kind(ParameterKind::Variadic);
            }
            Some(ScriptParam { record, question })
        }
        "identifier" | "object_pattern" | "array_pattern" => {
            Some(ScriptParam::plain(Parameter::new(compact_text(node, content))))
        }
        "assignment_pattern" => {
            let left = node.child_by_field_name("left")?;
            let default = node
                .child_by_field_name("right")
                .map(|v| compact_text(&v, content))
                .unwrap_or_default();
            Some(ScriptParam::plain(
                Parameter::new(compact_text(&left, content)).with_default(default),
            ))
        }
        "rest_pattern" => Some(ScriptParam::plain(
            Parameter::new(rest_name(node, content))
                .with_kind(ParameterKind::Variadic)
                .optional(true),
        )),
        _ => None,
    }
}

fn rest_name(pattern: &Node, content: &str) -> String {
    pattern
        .named_child(0)
        .map(|n| compact_text(&n, content))
        .unwrap_or_else(|| node_text(pattern, content).trim_start_matches("...").to_string())
}

fn interface_members(body: &Node, content: &str) -> Vec<Parameter> {
    let mut members = Vec::new();
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        let Some(name_node) = member.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(&name_node, content);
        let type_name = match member.kind() {
            "property_signature" => type_annotation(&member, "type", content),
            "method_signature" => format!(
                "{}{}",
                render_parameters(&script_parameters(&member, content)),
                type_suffix(&type_annotation(&member, "return_type", content))
            ),
            _ => continue,
        };
        members.push(
            Parameter::new(name)
                .with_type(type_name)
                .optional(has_token(&member, "?")),
        );
    }
    members
}

/// Extends and implements targets of a class.
fn heritage(class: &Node, content: &str) -> (Vec<String>, Vec<String>) {
    let mut extends = Vec::new();
    let mut implements = Vec::new();

    let mut cursor = class.walk();
    for child in class.named_children(&mut cursor) {
        if child.kind() != "class_heritage" {
            continue;
        }
        let mut inner = child.walk();
        for clause in child.named_children(&mut inner) {
            match clause.kind() {
                "extends_clause" => {
                    let text = node_text(&clause, content).trim_start();
                    extends.extend(split_top_level(
                        text.strip_prefix("extends").unwrap_or(text),
                        ',',
                    ));
                }
                "implements_clause" => {
                    let mut targets = clause.walk();
                    implements.extend(
                        clause
                            .named_children(&mut targets)
                            .map(|t| compact_text(&t, content)),
                    );
                }
                "comment" => {}
                // JavaScript: the heritage is the bare expression
                _ => extends.push(compact_text(&clause, content)),
            }
        }
    }

    (extends, implements)
}

fn member_modifiers(node: &Node, content: &str) -> String {
    let mut present: Vec<&str> = ["async", "static", "readonly", "abstract", "declare"]
        .into_iter()
        .filter(|token| has_token(node, token))
        .collect();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "accessibility_modifier" {
            match node_text(&child, content) {
                "public" => present.push("public"),
                "private" => present.push("private"),
                "protected" => present.push("protected"),
                _ => {}
            }
        }
    }

    modifier_string(&present)
}

/// Decorators attached to `node`, including those on its wrapper and those
/// written as preceding siblings (class members).
fn decorators<'t>(node: Node<'t>, anchor: Node<'t>, content: &str) -> Vec<String> {
    let mut found = Vec::new();

    let mut current = anchor.prev_named_sibling();
    while let Some(sibling) = current {
        match sibling.kind() {
            "decorator" => found.push(sibling),
            "comment" => {}
            _ => break,
        }
        current = sibling.prev_named_sibling();
    }
    found.reverse();

    let owners = if anchor == node {
        vec![node]
    } else {
        vec![anchor, node]
    };
    for owner in owners {
        let mut cursor = owner.walk();
        found.extend(
            owner
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "decorator"),
        );
    }

    found
        .iter()
        .map(|d| match d.named_child(0) {
            Some(expr) => format!("@{}", compact_text(&expr, content)),
            None => compact_text(d, content),
        })
        .collect()
}

/// Contiguous `/** */` blocks directly above `anchor`.
fn doc_comment(anchor: Node, content: &str) -> String {
    let mut blocks = Vec::new();
    let mut current = anchor.prev_named_sibling();
    while let Some(sibling) = current {
        match sibling.kind() {
            "decorator" => {}
            "comment" => {
                let text = node_text(&sibling, content);
                if !text.starts_with("/**") {
                    break;
                }
                blocks.push(clean_doc_block(text));
            }
            _ => break,
        }
        current = sibling.prev_named_sibling();
    }
    blocks.reverse();
    blocks.join("\n").trim().to_string()
}

fn clean_doc_block(raw: &str) -> String {
    let inner = raw.strip_prefix("/**").unwrap_or(raw);
    let inner = inner.strip_suffix("*/").unwrap_or(inner);
    let lines: Vec<&str> = inner
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').map(str::trim_start).unwrap_or(line)
        })
        .collect();
    lines.join("\n").trim().to_string()
}

/// Text of a type annotation field without its leading colon.
fn type_annotation(node: &Node, field: &str, content: &str) -> String {
    node.child_by_field_name(field)
        .map(|n| collapse_whitespace(node_text(&n, content).trim_start_matches(':')))
        .unwrap_or_default()
}

fn type_parameters(node: &Node, content: &str) -> String {
    node.child_by_field_name("type_parameters")
        .map(|n| compact_text(&n, content))
        .unwrap_or_default()
}

fn type_suffix(type_name: &str) -> String {
    if type_name.is_empty() {
        String::new()
    } else {
        format!(": {}", type_name)
    }
}

fn string_literal(node: &Node, content: &str) -> String {
    node_text(node, content)
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

fn is_function_expression(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}
