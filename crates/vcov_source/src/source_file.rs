//! Source file representation with per-line access.

use crate::file_id::FileId;
use std::path::PathBuf;

/// An original Verilog source file loaded for instrumentation.
pub struct SourceFile {
    /// The unique identifier for this file within the [`SourceDb`](crate::SourceDb).
    pub id: FileId,
    /// The filesystem path of this file (or a synthetic name for in-memory sources).
    pub path: PathBuf,
    /// The full text content of the file.
    pub content: String,
    /// Byte offsets of each line start (the first entry is always 0).
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Creates a new `SourceFile` with precomputed line starts.
    pub fn new(id: FileId, path: PathBuf, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        Self {
            id,
            path,
            content,
            line_starts,
        }
    }

    /// Returns the number of lines in the file.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns the text of the given 1-based line without its newline.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let idx = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map_or(self.content.len(), |next| next - 1);
        let text = &self.content[start..end.max(start)];
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    /// Returns the file's base name, used to derive the instrumented output name.
    pub fn base_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Computes the byte offsets of each line start in the given content.
fn compute_line_starts(content: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file(content: &str) -> SourceFile {
        SourceFile::new(FileId::from_raw(0), PathBuf::from("rtl/top.v"), content.to_string())
    }

    #[test]
    fn line_starts_computation() {
        let f = make_file("abc\ndef\nghi");
        assert_eq!(f.line_starts, vec![0, 4, 8]);
        assert_eq!(f.line_count(), 3);
    }

    #[test]
    fn line_text_lookup() {
        let f = make_file("module m;\n  wire a;\nendmodule\n");
        assert_eq!(f.line_text(1), Some("module m;"));
        assert_eq!(f.line_text(2), Some("  wire a;"));
        assert_eq!(f.line_text(3), Some("endmodule"));
        assert_eq!(f.line_text(4), Some(""));
        assert_eq!(f.line_text(5), None);
        assert_eq!(f.line_text(0), None);
    }

    #[test]
    fn crlf_stripped() {
        let f = make_file("a;\r\nb;\r\n");
        assert_eq!(f.line_text(1), Some("a;"));
    }

    #[test]
    fn base_name() {
        assert_eq!(make_file("").base_name(), "top.v");
    }
}
