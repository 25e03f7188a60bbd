use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use crate::builders::importer::{FileImporter, PropertiesImporter};
use crate::builders::patterns::PatternType;
use crate::builders::validator::{ConfigValidator, StandardValidator};

pub const CONFIG_FILE_NAME: &str = "zdoc.toml";
pub const CONFIG_VERSION: &str = "1.0";
pub const DEFAULT_IGNORE_MARKER: &str = "-- zdoc:ignore";
pub const DEFAULT_DOC_WIDTH: usize = 80;
pub const DEFAULT_TYPES_FILE: &str = "Types.lua";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RuleSettings {
    /// Regex overriding the built-in recognition pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Names excluded for this kind of declaration only.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AnnotateSettings {
    #[serde(default)]
    pub only_annotated: bool,
    /// Names excluded for every kind of declaration.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub ignore_files: Vec<String>,
    #[serde(default = "default_ignore_marker")]
    pub ignore_marker: String,
    #[serde(default = "default_doc_width")]
    pub doc_width: usize,
    #[serde(default)]
    pub class: RuleSettings,
    #[serde(default)]
    pub function: RuleSettings,
    #[serde(default)]
    pub field: RuleSettings,
}

impl AnnotateSettings {
    pub fn rule(&self, kind: PatternType) -> &RuleSettings {
        match kind {
            PatternType::Class => &self.class,
            PatternType::Function => &self.function,
            PatternType::Field => &self.field,
        }
    }

    pub fn rule_mut(&mut self, kind: PatternType) -> &mut RuleSettings {
        match kind {
            PatternType::Class => &mut self.class,
            PatternType::Function => &mut self.function,
            PatternType::Field => &mut self.field,
        }
    }
}

impl Default for AnnotateSettings {
    fn default() -> Self {
        Self {
            only_annotated: false,
            exclude: Vec::new(),
            ignore_files: Vec::new(),
            ignore_marker: default_ignore_marker(),
            doc_width: DEFAULT_DOC_WIDTH,
            class: RuleSettings::default(),
            function: RuleSettings::default(),
            field: RuleSettings::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CompileSettings {
    /// Classes left out of compilation.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Document name overrides; an empty value skips the document.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    #[serde(default = "default_types_file")]
    pub types_file: String,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            rename: BTreeMap::new(),
            types_file: default_types_file(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct GlobalSettings {
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ZdocConfig {
    pub version: String,
    #[serde(default)]
    pub annotate: AnnotateSettings,
    #[serde(default)]
    pub compile: CompileSettings,
    #[serde(default)]
    pub global_settings: GlobalSettings,
}

impl Default for ZdocConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            annotate: AnnotateSettings::default(),
            compile: CompileSettings::default(),
            global_settings: GlobalSettings::default(),
        }
    }
}

fn default_ignore_marker() -> String {
    DEFAULT_IGNORE_MARKER.to_string()
}

fn default_doc_width() -> usize {
    DEFAULT_DOC_WIDTH
}

fn default_types_file() -> String {
    DEFAULT_TYPES_FILE.to_string()
}

impl ZdocConfig {
    /// Builds a configuration from a flat key/value property store.
    ///
    /// Unknown keys are ignored; `rename.<Doc>` keys fill the rename table.
    pub fn from_properties(properties: &BTreeMap<String, String>) -> Result<Self> {
        let mut config = Self::default();
        let annotate = &mut config.annotate;

        for (key, value) in properties {
            match key.as_str() {
                "exclude" => annotate.exclude.extend(split_list(value)),
                "include.only.annotated" => {
                    annotate.only_annotated = value
                        .trim()
                        .parse()
                        .with_context(|| format!("Invalid boolean for {key}: {value}"))?;
                }
                "ignore" => annotate.ignore_files.extend(split_list(value)),
                "ignore.marker" => annotate.ignore_marker = value.trim().to_string(),
                "doc.width" => {
                    annotate.doc_width = value
                        .trim()
                        .parse()
                        .with_context(|| format!("Invalid number for {key}: {value}"))?;
                }
                "compile.exclude" => config.compile.exclude.extend(split_list(value)),
                "compile.types" => config.compile.types_file = value.trim().to_string(),
                "verbose" => config.global_settings.verbose = value.trim() == "true",
                _ => {
                    if let Some(doc) = key.strip_prefix("rename.") {
                        config
                            .compile
                            .rename
                            .insert(doc.to_string(), value.trim().to_string());
                    } else if let Some(kind) = key.strip_prefix("pattern.") {
                        let kind: PatternType = kind.parse()?;
                        annotate.rule_mut(kind).pattern = Some(value.clone());
                    } else if let Some(kind) = key.strip_prefix("exclude.") {
                        let kind: PatternType = kind.parse()?;
                        annotate.rule_mut(kind).exclude.extend(split_list(value));
                    }
                }
            }
        }
        Ok(config)
    }
}

/// Splits a comma separated property value, dropping blank entries.
pub fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Uses `zdoc.toml` in the current directory.
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to read current directory")?;
        Ok(Self::new_at(current_dir.join(CONFIG_FILE_NAME)))
    }

    pub fn new_at(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn initialize(&self) -> Result<()> {
        if self.config_path.exists() {
            return Ok(());
        }

        let default_config = ZdocConfig::default();
        self.save_config(&default_config)?;
        Ok(())
    }

    pub fn validate_config(&self) -> Result<()> {
        let config = self.load_config()?;
        let validator = StandardValidator::new();
        let issues = validator.validate_config(&config)?;

        if issues.is_empty() {
            println!("✓ Configuration is valid.");
            Ok(())
        } else {
            println!("⚠️  Found issues in configuration:");
            for issue in issues {
                println!("  - {issue}");
            }
            anyhow::bail!("Configuration validation failed.");
        }
    }

    pub fn export_config(&self, file_path: &Path, format: &str) -> Result<()> {
        let config = self.load_config()?;

        let content = match format {
            "json" => {
                serde_json::to_string_pretty(&config).context("Failed to serialize to JSON")?
            }
            "yaml" => serde_yaml::to_string(&config).context("Failed to serialize to YAML")?,
            "toml" => toml::to_string_pretty(&config).context("Failed to serialize to TOML")?,
            _ => anyhow::bail!("Unsupported export format: {}", format),
        };

        fs::write(file_path, content).context("Failed to write export file")?;

        Ok(())
    }

    fn is_properties(&self) -> bool {
        self.config_path
            .extension()
            .is_some_and(|ext| ext == "properties")
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<ZdocConfig>;
    fn save_config(&self, config: &ZdocConfig) -> Result<()>;
    fn get_config_path(&self) -> &Path;
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<ZdocConfig> {
        if !self.config_path.exists() {
            return Ok(ZdocConfig::default());
        }

        let content =
            fs::read_to_string(&self.config_path).context("Failed to read config file")?;

        if self.is_properties() {
            let properties = FileImporter::new().parse_properties(&content)?;
            return ZdocConfig::from_properties(&properties)
                .with_context(|| format!("Failed to parse {}", self.config_path.display()));
        }
        toml::from_str(&content).context("Failed to parse config file")
    }

    fn save_config(&self, config: &ZdocConfig) -> Result<()> {
        if self.is_properties() {
            anyhow::bail!("Refusing to overwrite properties file {}", self.config_path.display());
        }
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn get_config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_map_onto_config() {
        let properties: BTreeMap<String, String> = [
            ("exclude", "Foo, Bar,"),
            ("include.only.annotated", "true"),
            ("pattern.class", r"^(?P<name>\w+) = class\(\)"),
            ("exclude.function", "new"),
            ("doc.width", "100"),
            ("rename.IsoPlayer", "Player"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = ZdocConfig::from_properties(&properties).unwrap();
        assert_eq!(config.annotate.exclude, vec!["Foo", "Bar"]);
        assert!(config.annotate.only_annotated);
        assert!(config.annotate.class.pattern.is_some());
        assert_eq!(config.annotate.function.exclude, vec!["new"]);
        assert_eq!(config.annotate.doc_width, 100);
        assert_eq!(config.compile.rename.get("IsoPlayer").map(String::as_str), Some("Player"));
    }

    #[test]
    fn test_invalid_property_values_are_rejected() {
        let properties: BTreeMap<String, String> =
            [("doc.width".to_string(), "wide".to_string())].into_iter().collect();
        assert!(ZdocConfig::from_properties(&properties).is_err());

        let properties: BTreeMap<String, String> =
            [("pattern.table".to_string(), "x".to_string())].into_iter().collect();
        assert!(ZdocConfig::from_properties(&properties).is_err());
    }

    #[test]
    fn test_toml_round_trip_through_manager() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::new_at(dir.path().join(CONFIG_FILE_NAME));
        manager.initialize().unwrap();

        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded, ZdocConfig::default());
    }
}
