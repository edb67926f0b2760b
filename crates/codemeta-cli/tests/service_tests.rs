//! Drives the real `codemeta-tsc` binary through the process bridge.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use codemeta_core::extract::{ExtractorRegistry, ProcessBridge, ScriptEngine, ScriptExtractor};
use codemeta_core::{DiagnosticKind, EntityParser, EntityType, ExtractError};
use tempfile::TempDir;

const SERVICE: &str = env!("CARGO_BIN_EXE_codemeta-tsc");

fn bridge() -> ProcessBridge {
    ProcessBridge::new(SERVICE).with_timeout(Duration::from_secs(30))
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

const GREETER: &str = r#"import { Logger } from "./logger";

/** Greets people. */
export class Greeter implements Named {
  constructor(private readonly logger: Logger) {}

  greet(name: string): string {
    return `hello ${name}`;
  }
}
"#;

#[test]
fn test_service_matches_in_process_extraction() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "greeter.ts", GREETER);

    let from_service = bridge().invoke(&path).unwrap();
    let in_process = ScriptExtractor::for_path(&path)
        .unwrap()
        .extract_in_process(&path)
        .unwrap()
        .entities;

    assert_eq!(from_service, in_process);

    let greeter = from_service.iter().find(|e| e.name == "Greeter").unwrap();
    assert_eq!(greeter.entity_type, EntityType::Class);
    assert_eq!(greeter.docstring, "Greets people.");
    assert_eq!(greeter.relationships.implements(), ["Named"]);
    assert_eq!(greeter.dependencies, vec!["./logger"]);
    assert!(from_service.iter().any(|e| e.full_name == "Greeter.greet"));
}

#[test]
fn test_service_handles_javascript() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "util.js", "export function add(a, b = 1) {\n  return a + b;\n}\n");

    let entities = bridge().invoke(&path).unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].language, "javascript");
    assert_eq!(entities[0].parameters[1].default, "1");
}

#[test]
fn test_syntax_error_exits_two() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.ts", "export class {\n");

    let output = Command::new(SERVICE).arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(2));

    let err = bridge().invoke(&path).unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::SyntaxError);

    // Same line as the in-process walk reports.
    let in_process = ScriptExtractor::for_path(&path)
        .unwrap()
        .extract_in_process(&path)
        .unwrap_err();
    assert_eq!(err.line(), in_process.line());
    assert!(err.line().is_some());
}

#[test]
fn test_encoding_fallback_is_reported_on_stderr() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.ts");
    let mut content = b"// caf".to_vec();
    content.push(0xE9);
    content.extend_from_slice(b"\nexport function greet() {}\n");
    std::fs::write(&path, content).unwrap();

    let output = Command::new(SERVICE).arg(&path).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("encoding_fallback"));

    let entities = bridge().invoke(&path).unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].name, "greet");
}

#[test]
fn test_missing_file_exits_one() {
    let dir = TempDir::new().unwrap();

    match bridge().invoke(&dir.path().join("gone.ts")).unwrap_err() {
        ExtractError::ServiceFailed { status, .. } => assert_eq!(status, "exit code 1"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_usage_errors() {
    let output = Command::new(SERVICE).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage"));

    let output = Command::new(SERVICE).args(["a.ts", "b.ts"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let output = Command::new(SERVICE).arg("style.css").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_dispatcher_in_external_mode() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "greeter.ts", GREETER);
    let bad = write(&dir, "broken.tsx", "const x = <div>;\n");

    let mut registry = ExtractorRegistry::new();
    registry.register(Arc::new(ScriptExtractor::typescript(ScriptEngine::Service(
        bridge(),
    ))));
    let parser = EntityParser::with_registry(registry);

    assert!(!parser.parse_file(&good).is_empty());

    let report = parser.parse_file_report(&bad);
    assert!(report.entities.is_empty());
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::SyntaxError);
    assert!(report.diagnostics[0].line.is_some());

    // The same file in-process yields the same diagnostic.
    let in_process = EntityParser::new().parse_file_report(&bad);
    assert_eq!(in_process.diagnostics[0].kind, report.diagnostics[0].kind);
    assert_eq!(in_process.diagnostics[0].line, report.diagnostics[0].line);
}

#[test]
fn test_cli_parse_outputs_entities() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.py", "def main():\n    pass\n");
    write(&dir, "notes.txt", "not code\n");

    let output = Command::new(env!("CARGO_BIN_EXE_codemeta"))
        .arg("parse")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entities = value.as_array().unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0]["name"], "main");
    assert_eq!(entities[0]["dependencies"], "[]");
}

#[test]
fn test_cli_lists_extensions() {
    let output = Command::new(env!("CARGO_BIN_EXE_codemeta"))
        .arg("extensions")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for language in ["css", "javascript", "python", "typescript"] {
        assert!(stdout.contains(language), "{stdout}");
    }
    assert!(Path::new(SERVICE).exists());
}
