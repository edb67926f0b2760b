//! CSS extractor using structural pattern matching.
//!
//! Stylesheets are scanned as a token stream of comments, strings and
//! `{ } ;` delimiters. No grammar is built. A structural break stops the
//! scan, and everything whose block closed before it is kept.

use std::path::Path;

use regex::Regex;

use super::result::Extraction;
use super::source::{LineIndex, SourceText};
use super::traits::{Extractor, ExtractorCapability};
use super::treesitter::collapse_whitespace;
use crate::error::{Diagnostic, DiagnosticKind, ExtractError};
use crate::schema::{CodeEntity, EntityType, FileFacts};

const LANGUAGE: &str = "css";

const ENTITY_TYPES: &[EntityType] = &[EntityType::Style, EntityType::Animation];

/// Comments (possibly unterminated), strings, and block delimiters.
const TOKEN_PATTERN: &str = r#"(?s)/\*.*?(?:\*/|\z)|"(?:[^"\\\n]|\\.)*"?|'(?:[^'\\\n]|\\.)*'?|[{};]"#;

const KEYFRAMES_PATTERN: &str = r#"(?i)^@(?:-[a-z]+-)?keyframes\s+("[^"]*"|'[^']*'|[^\s{]+)"#;

const IMPORT_PATTERN: &str =
    r#"(?i)^@import\s+(?:url\(\s*)?(?:"([^"]*)"|'([^']*)'|([^\s;)'"]+))"#;

/// Conditional group rules; transparent containers for nested rules.
const GROUP_PATTERN: &str =
    r"(?i)^@(?:media|supports|container|layer|document|-moz-document|scope)\b";

struct Patterns {
    token: Regex,
    keyframes: Regex,
    import: Regex,
    group: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, ExtractError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ExtractError::Grammar(format!("css pattern: {}", e)))
        };
        Ok(Self {
            token: compile(TOKEN_PATTERN)?,
            keyframes: compile(KEYFRAMES_PATTERN)?,
            import: compile(IMPORT_PATTERN)?,
            group: compile(GROUP_PATTERN)?,
        })
    }
}

/// CSS extractor.
pub struct StylesheetExtractor;

impl StylesheetExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Scan already-decoded stylesheet content.
    ///
    /// The returned extraction carries a `PartialStructure` diagnostic when
    /// the scan stopped early.
    pub fn extract_source(&self, path: &str, content: &str) -> Result<Extraction, ExtractError> {
        let patterns = Patterns::compile()?;
        let mut scanner = Scanner::new(content, &patterns);

        let mut last = 0;
        let mut broken = None;
        for token in patterns.token.find_iter(content) {
            if token.start() > last {
                scanner.text(last, &content[last..token.start()]);
            }
            last = token.end();

            let step = match token.as_str() {
                "{" => scanner.open(token.start()),
                "}" => scanner.close(token.start(), token.end()),
                ";" => {
                    scanner.statement_end();
                    Ok(())
                }
                text if text.starts_with("/*") => scanner.comment(token.start(), text),
                text => {
                    scanner.text(token.start(), text);
                    Ok(())
                }
            };
            if let Err(diag) = step {
                broken = Some(diag);
                break;
            }
        }

        let diagnostic = match broken {
            Some(diag) => Some(diag),
            None => scanner.unclosed(),
        };

        let facts = FileFacts::new(path, std::mem::take(&mut scanner.imports));
        let mut extraction = Extraction::new(facts.stamp(scanner.finish()));
        if let Some(diag) = diagnostic {
            extraction.warn(diag);
        }
        Ok(extraction)
    }
}

impl Default for StylesheetExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for StylesheetExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let source = SourceText::read(path)?;
        let mut extraction = self.extract_source(&path.to_string_lossy(), &source.text)?;
        if let Some(diag) = source.fallback_diagnostic(path) {
            extraction.warn(diag);
        }
        Ok(extraction)
    }

    fn language_name(&self) -> &'static str {
        LANGUAGE
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &["css"]
    }

    fn entity_types(&self) -> &[EntityType] {
        ENTITY_TYPES
    }

    fn capability(&self) -> ExtractorCapability {
        ExtractorCapability::Pattern
    }
}

enum BlockKind {
    /// Qualified rule; its selector parents nested rules.
    Rule(String),
    /// `@keyframes`; keyframe selectors inside are not entities.
    Keyframes,
    /// `@media` and friends; the prelude decorates nested entities.
    Group(String),
    /// Declaration-only or unknown block.
    Opaque,
}

struct Block {
    kind: BlockKind,
    /// Index into `Scanner::pending` of the entity this block closes.
    entity: Option<usize>,
    start: usize,
}

/// Entity whose block has been opened, possibly not yet closed.
struct PendingEntity {
    entity_type: EntityType,
    name: String,
    signature: String,
    parent: String,
    decorators: Vec<String>,
    docstring: String,
    start: usize,
    end: Option<usize>,
}

struct Scanner<'a> {
    content: &'a str,
    patterns: &'a Patterns,
    lines: LineIndex,
    stack: Vec<Block>,
    prelude: String,
    prelude_start: Option<usize>,
    pending_doc: Option<String>,
    pending: Vec<PendingEntity>,
    imports: Vec<String>,
}

impl<'a> Scanner<'a> {
    fn new(content: &'a str, patterns: &'a Patterns) -> Self {
        Self {
            content,
            patterns,
            lines: LineIndex::new(content),
            stack: Vec::new(),
            prelude: String::new(),
            prelude_start: None,
            pending_doc: None,
            pending: Vec::new(),
            imports: Vec::new(),
        }
    }

    fn text(&mut self, offset: usize, text: &str) {
        if self.prelude_start.is_none() {
            if let Some(lead) = text.find(|c: char| !c.is_whitespace()) {
                self.prelude_start = Some(offset + lead);
            }
        }
        self.prelude.push_str(text);
    }

    fn comment(&mut self, offset: usize, text: &str) -> Result<(), Diagnostic> {
        if !text.ends_with("*/") || text.len() < 4 {
            return Err(self.break_at(offset, "unterminated comment"));
        }
        if self.prelude.trim().is_empty() {
            self.pending_doc = Some(clean_comment(text));
        }
        Ok(())
    }

    fn statement_end(&mut self) {
        self.pending_doc = None;
        let prelude = self.take_prelude();
        if self.at_import_scope() {
            if let Some(specifier) = self.import_specifier(&prelude) {
                self.imports.push(specifier);
            }
        }
    }

    fn open(&mut self, offset: usize) -> Result<(), Diagnostic> {
        let start = self.prelude_start.unwrap_or(offset);
        let docstring = self.pending_doc.take().unwrap_or_default();
        let prelude = self.take_prelude();

        let inside_opaque = matches!(
            self.stack.last().map(|b| &b.kind),
            Some(BlockKind::Keyframes) | Some(BlockKind::Opaque)
        );

        let keyframes_name = self
            .patterns
            .keyframes
            .captures(&prelude)
            .map(|caps| caps[1].trim_matches(|c| c == '"' || c == '\'').to_string());

        let (kind, entity) = if inside_opaque || prelude.is_empty() {
            (BlockKind::Opaque, None)
        } else if let Some(name) = keyframes_name {
            let entity = self.push_pending(EntityType::Animation, name, prelude, docstring, start);
            (BlockKind::Keyframes, Some(entity))
        } else if self.patterns.group.is_match(&prelude) {
            (BlockKind::Group(prelude), None)
        } else if prelude.starts_with('@') {
            // descriptor at-rules: @font-face, @page, ...
            let entity = self.push_pending(EntityType::Style, prelude.clone(), prelude, docstring, start);
            (BlockKind::Opaque, Some(entity))
        } else {
            let entity = self.push_pending(EntityType::Style, prelude.clone(), prelude.clone(), docstring, start);
            (BlockKind::Rule(prelude), Some(entity))
        };

        self.stack.push(Block {
            kind,
            entity,
            start: offset,
        });
        Ok(())
    }

    fn close(&mut self, offset: usize, end: usize) -> Result<(), Diagnostic> {
        self.take_prelude();
        self.pending_doc = None;
        let Some(block) = self.stack.pop() else {
            return Err(self.break_at(offset, "unmatched `}`"));
        };
        if let Some(index) = block.entity {
            self.pending[index].end = Some(end);
        }
        Ok(())
    }

    /// Diagnostic for blocks still open at end of input.
    fn unclosed(&self) -> Option<Diagnostic> {
        let innermost = self.stack.last()?;
        Some(self.break_at(
            innermost.start,
            &format!("{} block(s) still open at end of file", self.stack.len()),
        ))
    }

    fn break_at(&self, offset: usize, reason: &str) -> Diagnostic {
        let line = self.lines.line_of(offset);
        Diagnostic::new(
            DiagnosticKind::PartialStructure,
            format!("{}; kept {} entities closed before it", reason, self.closed_count()),
        )
        .at_line(line)
    }

    fn closed_count(&self) -> usize {
        self.pending.iter().filter(|p| p.end.is_some()).count()
    }

    fn push_pending(
        &mut self,
        entity_type: EntityType,
        name: String,
        signature: String,
        docstring: String,
        start: usize,
    ) -> usize {
        let parent = self
            .stack
            .iter()
            .rev()
            .find_map(|b| match &b.kind {
                BlockKind::Rule(selector) => Some(selector.clone()),
                _ => None,
            })
            .unwrap_or_default();
        let decorators = self
            .stack
            .iter()
            .filter_map(|b| match &b.kind {
                BlockKind::Group(prelude) => Some(prelude.clone()),
                _ => None,
            })
            .collect();

        self.pending.push(PendingEntity {
            entity_type,
            name,
            signature,
            parent,
            decorators,
            docstring,
            start,
            end: None,
        });
        self.pending.len() - 1
    }

    fn take_prelude(&mut self) -> String {
        self.prelude_start = None;
        let prelude = collapse_whitespace(&self.prelude);
        self.prelude.clear();
        prelude
    }

    /// `@import` is honoured at top level and inside group rules.
    fn at_import_scope(&self) -> bool {
        self.stack
            .iter()
            .all(|b| matches!(b.kind, BlockKind::Group(_)))
    }

    fn import_specifier(&self, prelude: &str) -> Option<String> {
        let caps = self.patterns.import.captures(prelude)?;
        (1..=3)
            .find_map(|i| caps.get(i))
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Closed entities in source order.
    fn finish(self) -> Vec<CodeEntity> {
        let content = self.content;
        let lines = self.lines;
        let mut closed: Vec<(usize, usize, PendingEntity)> = self
            .pending
            .into_iter()
            .filter_map(|p| p.end.map(|end| (p.start, end, p)))
            .collect();
        closed.sort_by_key(|(start, _, _)| *start);

        closed
            .into_iter()
            .map(|(start, end, p)| CodeEntity {
                line_start: lines.line_of(start),
                line_end: lines.line_of(end.saturating_sub(1)),
                signature: p.signature,
                docstring: p.docstring,
                decorators: p.decorators,
                source_code: content[start..end].to_string(),
                ..CodeEntity::new(p.entity_type, &p.name, &p.parent, LANGUAGE)
            })
            .collect()
    }
}

fn clean_comment(raw: &str) -> String {
    let inner = raw.strip_prefix("/*").unwrap_or(raw);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> Extraction {
        StylesheetExtractor::new()
            .extract_source("styles/app.css", content)
            .unwrap()
    }

    const SHEET: &str = r#"@import url("reset.css");
@import 'theme.css';

/* Base button */
.btn, .btn-primary {
  color: red;
  &:hover { color: blue; }
}

@media (max-width: 600px) {
  .btn { padding: 0; }
}

@-webkit-keyframes spin {
  from { transform: rotate(0deg); }
  to { transform: rotate(360deg); }
}

@font-face {
  font-family: "X";
  src: url("x.woff");
}
a[href="}"] { color: green; }
"#;

    #[test]
    fn test_stylesheet_entities() {
        let extraction = scan(SHEET);
        assert!(extraction.diagnostics.is_empty(), "{:?}", extraction.diagnostics);

        let names: Vec<&str> = extraction.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![".btn, .btn-primary", "&:hover", ".btn", "spin", "@font-face", r#"a[href="}"]"#]
        );

        let btn = &extraction.entities[0];
        assert_eq!(btn.entity_type, EntityType::Style);
        assert_eq!(btn.docstring, "Base button");
        assert_eq!((btn.line_start, btn.line_end), (5, 8));
        assert!(btn.source_code.starts_with(".btn, .btn-primary {"));
        assert!(btn.source_code.ends_with('}'));

        let hover = &extraction.entities[1];
        assert_eq!(hover.parent_entity, ".btn, .btn-primary");
        assert_eq!(hover.full_name, ".btn, .btn-primary.&:hover");
        assert_eq!((hover.line_start, hover.line_end), (7, 7));

        let media_btn = &extraction.entities[2];
        assert_eq!(media_btn.decorators, vec!["@media (max-width: 600px)"]);
        assert_eq!(media_btn.parent_entity, "");
        assert_eq!(media_btn.line_start, 11);

        let spin = &extraction.entities[3];
        assert_eq!(spin.entity_type, EntityType::Animation);
        assert_eq!(spin.signature, "@-webkit-keyframes spin");
        assert_eq!((spin.line_start, spin.line_end), (14, 17));

        for entity in &extraction.entities {
            assert_eq!(entity.language, "css");
            assert_eq!(entity.dependencies, vec!["reset.css", "theme.css"]);
            assert_eq!(entity.relationships.imports(), ["reset.css", "theme.css"]);
        }
    }

    #[test]
    fn test_unclosed_block_keeps_prefix() {
        let extraction = scan(".a { color: red; }\n.b { color: blue;\n");
        assert_eq!(extraction.entities.len(), 1);
        assert_eq!(extraction.entities[0].name, ".a");
        assert!(extraction.has(DiagnosticKind::PartialStructure));
        assert_eq!(extraction.diagnostics[0].line, Some(2));
    }

    #[test]
    fn test_unmatched_brace_stops_scan() {
        let extraction = scan(".a {}\n}\n.b {}\n");
        let names: Vec<&str> = extraction.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![".a"]);
        assert_eq!(extraction.diagnostics[0].line, Some(2));
    }

    #[test]
    fn test_unterminated_comment() {
        let extraction = scan(".a {}\n/* never closed\n.b {}\n");
        assert_eq!(extraction.entities.len(), 1);
        assert!(extraction.has(DiagnosticKind::PartialStructure));
    }

    #[test]
    fn test_import_inside_rule_ignored() {
        let extraction = scan("@import \"a.css\";\n.x { @import \"b.css\"; }\n");
        assert_eq!(extraction.entities[0].dependencies, vec!["a.css"]);
    }

    #[test]
    fn test_clean_comment() {
        assert_eq!(clean_comment("/**\n * Cards\n */"), "Cards");
        assert_eq!(clean_comment("/* one */"), "one");
    }
}
