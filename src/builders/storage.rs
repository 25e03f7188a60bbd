use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Destination for generated and annotated Lua files.
pub trait OutputProvider {
    /// Writes `lines` to `path`, one per line. Empty content is never written.
    /// Returns whether anything was written.
    fn write_lines(&mut self, path: &Path, lines: &[String]) -> Result<bool>;
    fn write_text(&mut self, path: &Path, content: &str) -> Result<bool>;
}

pub struct FileOutput;

impl FileOutput {
    pub fn new() -> Self {
        Self
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create output directory: {}", parent.display())
            })?;
        }
        Ok(())
    }
}

impl OutputProvider for FileOutput {
    fn write_lines(&mut self, path: &Path, lines: &[String]) -> Result<bool> {
        if lines.is_empty() {
            return Ok(false);
        }
        let mut content = lines.join("\n");
        content.push('\n');
        self.write_text(path, &content)
    }

    fn write_text(&mut self, path: &Path, content: &str) -> Result<bool> {
        if content.is_empty() {
            return Ok(false);
        }
        Self::ensure_parent(path)?;
        fs::write(path, content)
            .with_context(|| format!("Unable to write output file: {}", path.display()))?;
        Ok(true)
    }
}

/// Keeps output in memory; used by dry runs.
pub struct MemoryOutput {
    files: HashMap<PathBuf, String>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl OutputProvider for MemoryOutput {
    fn write_lines(&mut self, path: &Path, lines: &[String]) -> Result<bool> {
        if lines.is_empty() {
            return Ok(false);
        }
        let mut content = lines.join("\n");
        content.push('\n');
        self.write_text(path, &content)
    }

    fn write_text(&mut self, path: &Path, content: &str) -> Result<bool> {
        if content.is_empty() {
            return Ok(false);
        }
        self.files.insert(path.to_path_buf(), content.to_string());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_output_creates_parents_and_skips_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.lua");
        let mut output = FileOutput::new();

        assert!(!output.write_lines(&path, &[]).unwrap());
        assert!(!path.exists());

        let lines = vec!["---@class A".to_string(), "A = {}".to_string()];
        assert!(output.write_lines(&path, &lines).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "---@class A\nA = {}\n");
    }

    #[test]
    fn test_memory_output() {
        let mut output = MemoryOutput::new();
        output.write_text(Path::new("a.lua"), "x = 1\n").unwrap();
        output.write_text(Path::new("b.lua"), "").unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output.get(Path::new("a.lua")), Some("x = 1\n"));
    }
}
