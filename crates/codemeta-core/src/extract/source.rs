//! Encoding-tolerant source reading and offset-to-line mapping.

use std::fs;
use std::path::Path;

use crate::error::{Diagnostic, DiagnosticKind, ExtractError};

/// Encoding a source file was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    /// Single-byte fallback; accepts any byte sequence.
    Latin1,
}

impl SourceEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
        }
    }
}

/// Decoded file content.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    pub encoding: SourceEncoding,
}

impl SourceText {
    /// Read a file, decoding as UTF-8 with a Latin-1 fallback.
    ///
    /// Only I/O failures are errors; no byte sequence is rejected.
    pub fn read(path: &Path) -> Result<Self, ExtractError> {
        let bytes = fs::read(path).map_err(|source| ExtractError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::decode(bytes))
    }

    /// Decode raw bytes.
    pub fn decode(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(mut text) => {
                if text.starts_with('\u{feff}') {
                    text.drain(..'\u{feff}'.len_utf8());
                }
                Self {
                    text,
                    encoding: SourceEncoding::Utf8,
                }
            }
            Err(err) => {
                let text = err.into_bytes().into_iter().map(char::from).collect();
                Self {
                    text,
                    encoding: SourceEncoding::Latin1,
                }
            }
        }
    }

    /// Diagnostic to attach when the fallback decoder was used.
    pub fn fallback_diagnostic(&self, path: &Path) -> Option<Diagnostic> {
        match self.encoding {
            SourceEncoding::Utf8 => None,
            SourceEncoding::Latin1 => Some(Diagnostic::new(
                DiagnosticKind::EncodingFallback,
                format!("{} is not valid UTF-8; decoded as latin-1", path.display()),
            )),
        }
    }
}

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> u32 {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        line as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        let source = SourceText::decode("def café(): pass".as_bytes().to_vec());
        assert_eq!(source.encoding, SourceEncoding::Utf8);
        assert_eq!(source.text, "def café(): pass");
    }

    #[test]
    fn test_decode_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"x = 1");
        let source = SourceText::decode(bytes);
        assert_eq!(source.text, "x = 1");
    }

    #[test]
    fn test_decode_falls_back_to_latin1() {
        let bytes = vec![b'#', b' ', 0xE9, 0xFF, b'\n', b'x'];
        let source = SourceText::decode(bytes);
        assert_eq!(source.encoding, SourceEncoding::Latin1);
        assert_eq!(source.text, "# \u{e9}\u{ff}\nx");
        assert!(source.fallback_diagnostic(Path::new("a.py")).is_some());
    }

    #[test]
    fn test_read_missing_file() {
        let err = SourceText::read(Path::new("/definitely/not/here.py")).unwrap_err();
        assert!(matches!(err, ExtractError::Read { .. }));
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("a\nbc\n\nd");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(1), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(4), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(6), 4);
    }
}
