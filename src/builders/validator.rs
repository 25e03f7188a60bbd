use anyhow::Result;
use std::collections::HashSet;

use crate::builders::patterns::{self, PatternType};
use crate::core::config::{self, CONFIG_VERSION};

/// The `ConfigValidator` trait defines the public interface for validating the
/// zdoc configuration.
///
/// This trait allows for the implementation of different validation strategies,
/// such as a strict validator or a more permissive one, by adhering to a common
/// set of methods.
pub trait ConfigValidator {
    /// Performs a full validation of the `ZdocConfig` and returns
    /// a list of issues found.
    ///
    /// # Arguments
    /// * `config`: The `ZdocConfig` to be validated.
    ///
    /// # Returns
    /// A `Result<Vec<String>>` containing a vector of strings, where each string
    /// describes a specific validation issue.
    fn validate_config(&self, config: &config::ZdocConfig) -> Result<Vec<String>>;

    /// Validates a single `DeclarationPattern` and returns a list of issues.
    ///
    /// # Arguments
    /// * `pattern`: The `DeclarationPattern` to be validated.
    ///
    /// # Returns
    /// A `Result<Vec<String>>` containing a vector of strings, each describing a
    /// validation issue for the given pattern.
    fn validate_pattern(&self, pattern: &patterns::DeclarationPattern) -> Result<Vec<String>>;
}

/// The `StandardValidator` is a concrete implementation of `ConfigValidator`.
///
/// It performs a series of standard checks to ensure the configuration file
/// is well-formed and does not contain patterns or exclusions that would
/// silently do nothing.
pub struct StandardValidator;

impl StandardValidator {
    /// Creates a new instance of `StandardValidator`.
    pub fn new() -> Self {
        Self
    }

    /// Checks a list of exclusion names for blanks and duplicates.
    ///
    /// Names are matched exactly and case-sensitively, so a blank name or one
    /// padded with whitespace can never exclude anything.
    ///
    /// # Arguments
    /// * `label`: Where the list came from, for the messages.
    /// * `names`: The configured names.
    ///
    /// # Returns
    /// A `Vec<String>` containing warnings for any problems found.
    fn check_exclusions(&self, label: &str, names: &[String]) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for name in names {
            if name.trim().is_empty() {
                warnings.push(format!("Blank name in {label} exclusions"));
            } else if name.trim() != name {
                warnings.push(format!("Exclusion '{name}' in {label} has surrounding whitespace"));
            }
            // Check if this name has already been seen.
            if !seen.insert(name.as_str()) {
                warnings.push(format!("Duplicate exclusion '{name}' in {label}"));
            }
        }
        warnings
    }
}

impl ConfigValidator for StandardValidator {
    /// The main public method for validating the entire configuration.
    ///
    /// It orchestrates multiple checks, including:
    /// - Version compatibility.
    /// - The validity of every pattern override.
    /// - Exclusion lists for blanks and duplicates.
    /// - Output settings such as the doc width and the types file name.
    fn validate_config(&self, config: &config::ZdocConfig) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        // Check for an unsupported configuration version.
        if config.version != CONFIG_VERSION {
            issues.push(format!("Unsupported config version: {}", config.version));
        }

        let annotate = &config.annotate;
        issues.extend(self.check_exclusions("annotate", &annotate.exclude));

        for kind in PatternType::ALL {
            let rule = annotate.rule(kind);
            if let Some(regex) = &rule.pattern {
                let pattern = patterns::DeclarationPattern::of(kind, regex.clone());
                issues.extend(self.validate_pattern(&pattern)?);
            }
            issues.extend(self.check_exclusions(&format!("{kind} rule"), &rule.exclude));
        }

        if annotate.doc_width == 0 {
            issues.push("doc_width must be at least 1".to_string());
        }
        if annotate.ignore_marker.trim().is_empty() {
            issues.push("Empty ignore marker disables marker-based file ignores".to_string());
        }

        issues.extend(self.check_exclusions("compile", &config.compile.exclude));
        if !config.compile.types_file.ends_with(".lua") {
            issues.push(format!(
                "Types file '{}' does not end in .lua",
                config.compile.types_file
            ));
        }

        Ok(issues)
    }

    /// Validates a single pattern's syntax and checks for problematic configurations.
    ///
    /// This function performs two levels of validation:
    /// 1. **Syntax Validation:** It calls the pattern's own `validate()` method
    ///    to check that the regex compiles and defines the required groups.
    /// 2. **Semantic Validation:** It checks for patterns that, while
    ///    syntactically correct, are probably a mistake (e.g. an unanchored
    ///    pattern that would also match inside expressions).
    fn validate_pattern(&self, pattern: &patterns::DeclarationPattern) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        // Perform the pattern's own validation, which checks for correct syntax.
        if let Err(e) = pattern.validate() {
            issues.push(format!("Invalid {} pattern {}: {:#}", pattern.pattern_type, pattern.id, e));
        }

        if pattern.specification.trim().is_empty() {
            issues.push(format!("Empty {} pattern will match every line", pattern.pattern_type));
        } else if !pattern.specification.starts_with('^') {
            issues.push(format!(
                "The {} pattern is not anchored with '^' and may match inside expressions",
                pattern.pattern_type
            ));
        }

        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ZdocConfig;

    #[test]
    fn test_default_config_is_valid() {
        let issues = StandardValidator::new()
            .validate_config(&ZdocConfig::default())
            .unwrap();
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_reports_bad_patterns_and_exclusions() {
        let mut config = ZdocConfig::default();
        config.version = "0.9".to_string();
        config.annotate.field.pattern = Some(r"(?P<name>\w+) = ".to_string());
        config.annotate.exclude = vec!["Foo".to_string(), "Foo".to_string(), " ".to_string()];
        config.annotate.doc_width = 0;

        let issues = StandardValidator::new().validate_config(&config).unwrap();
        assert!(issues.iter().any(|i| i.contains("Unsupported config version")));
        assert!(issues.iter().any(|i| i.contains("named group 'owner'")));
        assert!(issues.iter().any(|i| i.contains("not anchored")));
        assert!(issues.iter().any(|i| i.contains("Duplicate exclusion 'Foo'")));
        assert!(issues.iter().any(|i| i.contains("Blank name")));
        assert!(issues.iter().any(|i| i.contains("doc_width")));
    }
}
