use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::builders::patterns::{DeclarationPattern, LineClassifier, LineKind, LineRecord, PatternType};
use crate::core::config::{AnnotateSettings, DEFAULT_DOC_WIDTH, DEFAULT_IGNORE_MARKER};

/// Per-run annotation rules: how declarations are recognized, which names are
/// excluded, and whether files without annotations are kept.
///
/// Built once before a batch and shared read-only by every file in it.
#[derive(Debug, Clone)]
pub struct AnnotateRules {
    classifier: LineClassifier,
    excluded: HashMap<PatternType, HashSet<String>>,
    only_annotated: bool,
    ignored_files: HashSet<String>,
    ignore_marker: String,
    doc_width: usize,
}

impl AnnotateRules {
    /// Combines the configured settings with a caller-supplied exclusion set,
    /// which applies to every kind of declaration.
    pub fn new(settings: &AnnotateSettings, exclude: &HashSet<String>) -> Result<Self> {
        let pattern = |kind: PatternType| match &settings.rule(kind).pattern {
            Some(regex) => DeclarationPattern::of(kind, regex.clone()),
            None => DeclarationPattern::default_for(kind),
        };
        let classifier = LineClassifier::new(
            &pattern(PatternType::Class),
            &pattern(PatternType::Function),
            &pattern(PatternType::Field),
        )
        .context("Failed to build declaration patterns")?;

        let excluded: HashMap<_, _> = PatternType::ALL
            .iter()
            .map(|kind| {
                let names: HashSet<String> = settings
                    .exclude
                    .iter()
                    .chain(&settings.rule(*kind).exclude)
                    .chain(exclude)
                    .cloned()
                    .collect();
                (*kind, names)
            })
            .collect();

        Ok(Self {
            classifier,
            excluded,
            only_annotated: settings.only_annotated,
            ignored_files: settings.ignore_files.iter().cloned().collect(),
            ignore_marker: settings.ignore_marker.clone(),
            doc_width: settings.doc_width.max(1),
        })
    }

    pub fn with_only_annotated(mut self, only_annotated: bool) -> Self {
        self.only_annotated = only_annotated;
        self
    }

    pub fn classifier(&self) -> &LineClassifier {
        &self.classifier
    }

    pub fn only_annotated(&self) -> bool {
        self.only_annotated
    }

    pub fn doc_width(&self) -> usize {
        self.doc_width
    }

    /// Whether the declared name, bare or qualified, is excluded for the
    /// record's kind. Plain lines are never excluded.
    pub fn is_excluded(&self, record: &LineRecord) -> bool {
        let kind = match record.kind {
            LineKind::None => return false,
            LineKind::ClassDecl => PatternType::Class,
            LineKind::FunctionDecl => PatternType::Function,
            LineKind::FieldDecl => PatternType::Field,
        };
        let Some(names) = self.excluded.get(&kind) else {
            return false;
        };
        let Some(name) = record.name else {
            return false;
        };
        names.contains(name)
            || record
                .qualified_name()
                .is_some_and(|qualified| names.contains(&qualified))
    }

    /// A file is ignored when its name is listed in the rules, or when the
    /// ignore marker appears in its leading comment header.
    pub fn is_file_ignored<S: AsRef<str>>(&self, file_name: &str, lines: &[S]) -> bool {
        let base_name = Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(file_name);
        if self.ignored_files.contains(file_name) || self.ignored_files.contains(base_name) {
            return true;
        }
        if self.ignore_marker.is_empty() {
            return false;
        }
        lines
            .iter()
            .map(|line| line.as_ref().trim())
            .take_while(|line| line.is_empty() || line.starts_with("--"))
            .any(|line| line.contains(&self.ignore_marker))
    }
}

impl Default for AnnotateRules {
    fn default() -> Self {
        Self {
            classifier: LineClassifier::default(),
            excluded: HashMap::new(),
            only_annotated: false,
            ignored_files: HashSet::new(),
            ignore_marker: DEFAULT_IGNORE_MARKER.to_string(),
            doc_width: DEFAULT_DOC_WIDTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RuleSettings;

    fn names(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exclusions_are_per_kind() {
        let settings = AnnotateSettings {
            function: RuleSettings {
                pattern: None,
                exclude: vec!["new".to_string()],
            },
            ..AnnotateSettings::default()
        };
        let rules = AnnotateRules::new(&settings, &names(&["TestClass.secret"])).unwrap();
        let classifier = rules.classifier();

        assert!(rules.is_excluded(&classifier.classify("function TestClass:new()")));
        assert!(!rules.is_excluded(&classifier.classify("TestClass.new = 5")));
        assert!(rules.is_excluded(&classifier.classify("TestClass.secret = 5")));
        assert!(!rules.is_excluded(&classifier.classify("Other.secret = 5")));
        assert!(!rules.is_excluded(&classifier.classify("print(1)")));
    }

    #[test]
    fn test_invalid_override_fails_to_build() {
        let settings = AnnotateSettings {
            class: RuleSettings {
                pattern: Some("(".to_string()),
                exclude: Vec::new(),
            },
            ..AnnotateSettings::default()
        };
        assert!(AnnotateRules::new(&settings, &HashSet::new()).is_err());
    }

    #[test]
    fn test_file_ignore_by_name_and_marker() {
        let settings = AnnotateSettings {
            ignore_files: vec!["vendor.lua".to_string()],
            ..AnnotateSettings::default()
        };
        let rules = AnnotateRules::new(&settings, &HashSet::new()).unwrap();

        assert!(rules.is_file_ignored("lib/vendor.lua", &["x = 1"]));
        assert!(rules.is_file_ignored("a.lua", &["-- header", "", "-- zdoc:ignore", "x = 1"]));
        assert!(!rules.is_file_ignored("a.lua", &["x = 1", "-- zdoc:ignore"]));
    }
}
