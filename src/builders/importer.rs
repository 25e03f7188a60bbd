use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::core::catalog::{CatalogFile, DeclarationCatalog};

/// A trait that defines the behavior for importing a declaration catalog.
///
/// This trait allows for different implementations of catalog importers (e.g., from
/// files, from a reflection pipeline) to be used interchangeably.
pub trait CatalogImporter {
    /// Imports a catalog from a file.
    ///
    /// # Arguments
    /// * `file_path`: The path to the serialized catalog.
    /// * `format`: The format to parse ("json", "yaml" or "toml"). When `None`,
    ///   the format is derived from the file extension.
    ///
    /// # Returns
    /// A `Result<DeclarationCatalog>` holding every entry in declaration order.
    fn import_catalog(&mut self, file_path: &Path, format: Option<&str>) -> Result<DeclarationCatalog>;
}

/// A trait for reading Java-style `.properties` content into a key/value store.
pub trait PropertiesImporter {
    /// Parses `key=value` (or `key: value`) lines into an ordered map.
    fn parse_properties(&self, content: &str) -> Result<BTreeMap<String, String>>;
}

/// A concrete implementation of the importer traits for handling file-based imports.
///
/// This struct contains the logic for parsing the different file formats and
/// converting their content into the internal representations.
pub struct FileImporter;

impl Default for FileImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl FileImporter {
    /// Constructs a new `FileImporter` instance.
    pub fn new() -> Self {
        Self
    }

    /// Deserializes catalog content in the given format.
    ///
    /// # Arguments
    /// * `content`: The full string content of the catalog file.
    /// * `format`: One of "json", "yaml"/"yml" or "toml".
    pub fn parse_catalog(&self, content: &str, format: &str) -> Result<CatalogFile> {
        match format {
            "json" => serde_json::from_str(content).context("Failed to parse JSON catalog"),
            "yaml" | "yml" => serde_yaml::from_str(content).context("Failed to parse YAML catalog"),
            "toml" => toml::from_str(content).context("Failed to parse TOML catalog"),
            _ => anyhow::bail!("Unsupported catalog format: {}", format),
        }
    }
}

/// Implementation of the `CatalogImporter` trait for `FileImporter`.
impl CatalogImporter for FileImporter {
    fn import_catalog(&mut self, file_path: &Path, format: Option<&str>) -> Result<DeclarationCatalog> {
        // Read the entire file content into a string.
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read catalog file {}", file_path.display()))?;

        // An explicit format wins; otherwise trust the extension, then fall back to JSON.
        let format = match format {
            Some(format) => format.to_string(),
            None => file_path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("json")
                .to_ascii_lowercase(),
        };

        let file = self.parse_catalog(&content, &format)?;
        debug!(
            "Loaded {} catalog entries from {}",
            file.entries.len(),
            file_path.display()
        );
        Ok(DeclarationCatalog::new(file.entries))
    }
}

/// Implementation of the `PropertiesImporter` trait for `FileImporter`.
impl PropertiesImporter for FileImporter {
    /// Parses `.properties` content.
    ///
    /// Lines starting with `#` or `!` are comments. A trailing backslash joins
    /// the next line onto the current value. Values are otherwise taken
    /// verbatim, so regex escapes like `\w` survive.
    fn parse_properties(&self, content: &str) -> Result<BTreeMap<String, String>> {
        let mut result = BTreeMap::new();
        let mut pending = String::new();

        for (index, raw) in content.lines().enumerate() {
            let line = if pending.is_empty() { raw.trim() } else { raw.trim_start() };
            // Skip comments and empty lines, unless we are continuing a value.
            if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
                continue;
            }

            // Lines ending with a single backslash continue on the next line.
            if let Some(head) = line.strip_suffix('\\')
                && !head.ends_with('\\')
            {
                pending.push_str(head);
                continue;
            }
            pending.push_str(line);

            let entry = std::mem::take(&mut pending);
            let split_at = entry
                .find(['=', ':'])
                .with_context(|| format!("Missing '=' in properties line {}: {}", index + 1, entry))?;

            let key = entry[..split_at].trim();
            if key.is_empty() {
                anyhow::bail!("Empty key in properties line {}", index + 1);
            }
            let value = entry[split_at + 1..].trim();
            result.insert(key.to_string(), value.to_string());
        }

        if !pending.is_empty() {
            anyhow::bail!("Unterminated line continuation at end of properties");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::DeclarationKind;

    #[test]
    fn test_parse_properties() {
        let content = "# annotate rules\n\
                       exclude = Foo,Bar\n\
                       ! legacy comment\n\
                       pattern.function=^function (?P<name>\\w+)\\((?P<params>[^)]*)\\)\n\
                       rename.IsoPlayer: Player\n\
                       compile.exclude = A,\\\n    B\n";
        let properties = FileImporter::new().parse_properties(content).unwrap();

        assert_eq!(properties.len(), 4);
        assert_eq!(properties["exclude"], "Foo,Bar");
        assert_eq!(
            properties["pattern.function"],
            r"^function (?P<name>\w+)\((?P<params>[^)]*)\)"
        );
        assert_eq!(properties["rename.IsoPlayer"], "Player");
        assert_eq!(properties["compile.exclude"], "A,B");
    }

    #[test]
    fn test_parse_properties_rejects_lines_without_separator() {
        assert!(FileImporter::new().parse_properties("just words").is_err());
    }

    #[test]
    fn test_import_json_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{ "entries": [
                { "name": "TestClass", "kind": "class", "parent": "Base" },
                { "name": "TestClass.test", "kind": "method", "type": "Object",
                  "params": [ { "name": "a", "type": "String" }, { "name": "b" } ],
                  "modifier": { "visibility": "public", "static": true } }
            ] }"#,
        )
        .unwrap();

        let catalog = FileImporter::new().import_catalog(&path, None).unwrap();
        assert_eq!(catalog.len(), 2);
        let method = catalog.methods(Some("TestClass"), "test").next().unwrap();
        assert_eq!(method.kind, DeclarationKind::Method);
        assert_eq!(method.params[1].type_name, None);
        assert!(method.modifier.is_static);
    }

    #[test]
    fn test_import_yaml_catalog_with_explicit_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.txt");
        fs::write(
            &path,
            "entries:\n  - name: TestClass.count\n    kind: field\n    type: Integer\n",
        )
        .unwrap();

        let catalog = FileImporter::new().import_catalog(&path, Some("yaml")).unwrap();
        assert!(catalog.field(Some("TestClass"), "count").is_some());
        assert!(FileImporter::new().import_catalog(&path, None).is_err());
    }
}
