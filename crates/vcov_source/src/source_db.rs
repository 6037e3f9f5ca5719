//! Central database of all original source files in a generation run.

use crate::file_id::FileId;
use crate::source_file::SourceFile;
use std::io;
use std::path::{Path, PathBuf};

/// The source database, owning all loaded original Verilog text.
pub struct SourceDb {
    files: Vec<SourceFile>,
}

impl SourceDb {
    /// Creates an empty source database.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Loads a source file from the filesystem and returns its [`FileId`].
    pub fn load_file(&mut self, path: &Path) -> Result<FileId, io::Error> {
        let content = std::fs::read_to_string(path)?;
        Ok(self.add_source(path.to_path_buf(), content))
    }

    /// Adds a source file from an in-memory string (useful for tests).
    ///
    /// The `name` parameter is used as the file path in diagnostics and to
    /// derive the output file name.
    pub fn add_source(&mut self, name: impl Into<PathBuf>, content: String) -> FileId {
        let id = FileId::from_raw(self.files.len() as u32);
        self.files.push(SourceFile::new(id, name.into(), content));
        id
    }

    /// Returns the [`SourceFile`] for the given [`FileId`].
    ///
    /// # Panics
    ///
    /// Panics if the `FileId` is invalid.
    pub fn get_file(&self, id: FileId) -> &SourceFile {
        &self.files[id.as_raw() as usize]
    }

    /// Looks up a loaded file by path.
    pub fn find(&self, path: &Path) -> Option<FileId> {
        self.files.iter().find(|f| f.path == path).map(|f| f.id)
    }

    /// Iterates over all loaded files in load order.
    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }
}

impl Default for SourceDb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let mut db = SourceDb::new();
        let id = db.add_source("top.v", "module top; endmodule".to_string());
        assert_eq!(db.get_file(id).content, "module top; endmodule");
    }

    #[test]
    fn find_by_path() {
        let mut db = SourceDb::new();
        let a = db.add_source("a.v", String::new());
        let b = db.add_source("b.v", String::new());
        assert_eq!(db.find(Path::new("b.v")), Some(b));
        assert_eq!(db.find(Path::new("a.v")), Some(a));
        assert_eq!(db.find(Path::new("c.v")), None);
        assert_eq!(db.files().count(), 2);
    }

    #[test]
    fn load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("dut.v");
        std::fs::write(&file_path, "module dut; endmodule\n").unwrap();

        let mut db = SourceDb::new();
        let id = db.load_file(&file_path).unwrap();
        assert_eq!(db.get_file(id).line_text(1), Some("module dut; endmodule"));
    }
}
