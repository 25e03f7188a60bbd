use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

use crate::builders::matcher::{MatchOutcome, match_declaration};
use crate::builders::patterns::open_long_comment;
use crate::builders::renderer::{ANNOTATION_PREFIX, AnnotationRenderer, DOC_PREFIX};
use crate::core::catalog::DeclarationCatalog;
use crate::core::rules::AnnotateRules;

/// File-level verdict on how completely a file was annotated.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnotateResult {
    AllIncluded,
    PartialInclusion,
    NoMatch,
    AllExcluded,
    SkippedFileEmpty,
    SkippedFileIgnored,
}

impl AnnotateResult {
    /// Derives the verdict from the counters of a completed pass.
    ///
    /// Precedence: nothing seen, everything excluded, everything matched,
    /// anything matched, and finally no match. A file with some exclusions
    /// and no matches is therefore `NoMatch`.
    pub fn from_stats(stats: &AnnotateStats) -> Self {
        if stats.declarations_seen == 0 {
            AnnotateResult::NoMatch
        } else if stats.excluded == stats.declarations_seen {
            AnnotateResult::AllExcluded
        } else if stats.matched == stats.declarations_seen {
            AnnotateResult::AllIncluded
        } else if stats.matched > 0 {
            AnnotateResult::PartialInclusion
        } else {
            AnnotateResult::NoMatch
        }
    }

    /// Whether the output of a file with this verdict carries annotations.
    pub fn is_annotated(&self) -> bool {
        matches!(self, AnnotateResult::AllIncluded | AnnotateResult::PartialInclusion)
    }
}

impl fmt::Display for AnnotateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotateResult::AllIncluded => write!(f, "ALL_INCLUDED"),
            AnnotateResult::PartialInclusion => write!(f, "PARTIAL_INCLUSION"),
            AnnotateResult::NoMatch => write!(f, "NO_MATCH"),
            AnnotateResult::AllExcluded => write!(f, "ALL_EXCLUDED"),
            AnnotateResult::SkippedFileEmpty => write!(f, "SKIPPED_FILE_EMPTY"),
            AnnotateResult::SkippedFileIgnored => write!(f, "SKIPPED_FILE_IGNORED"),
        }
    }
}

/// Per-file counters the verdict is derived from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateStats {
    pub declarations_seen: usize,
    pub matched: usize,
    pub excluded: usize,
}

impl AnnotateStats {
    pub fn unmatched(&self) -> usize {
        self.declarations_seen - self.matched - self.excluded
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedFile {
    pub lines: Vec<String>,
    pub result: AnnotateResult,
    pub stats: AnnotateStats,
}

/// Streams Lua source through classification, matching and rendering.
///
/// Holds only shared references, so one annotator can serve any number of
/// files; every call owns its output buffer.
pub struct LuaAnnotator<'a> {
    catalog: &'a DeclarationCatalog,
    rules: &'a AnnotateRules,
    renderer: AnnotationRenderer,
}

impl<'a> LuaAnnotator<'a> {
    pub fn new(catalog: &'a DeclarationCatalog, rules: &'a AnnotateRules) -> Self {
        Self {
            catalog,
            rules,
            renderer: AnnotationRenderer::new(rules.doc_width()),
        }
    }

    pub fn annotate<S: AsRef<str>>(&self, file_name: &str, source: &[S]) -> AnnotatedFile {
        if source.is_empty() {
            return AnnotatedFile {
                lines: Vec::new(),
                result: AnnotateResult::SkippedFileEmpty,
                stats: AnnotateStats::default(),
            };
        }
        if self.rules.is_file_ignored(file_name, source) {
            let lines = if self.rules.only_annotated() {
                Vec::new()
            } else {
                source.iter().map(|line| line.as_ref().to_string()).collect()
            };
            return AnnotatedFile {
                lines,
                result: AnnotateResult::SkippedFileIgnored,
                stats: AnnotateStats::default(),
            };
        }

        let mut stats = AnnotateStats::default();
        let mut lines: Vec<String> = Vec::with_capacity(source.len());
        let classifier = self.rules.classifier();
        // Closing bracket of the long comment the current line is in.
        let mut comment_closer: Option<String> = None;

        for (index, line) in source.iter().enumerate() {
            let line = line.as_ref();
            if let Some(closer) = &comment_closer {
                if line.contains(closer.as_str()) {
                    comment_closer = None;
                }
                lines.push(line.to_string());
                continue;
            }

            let record = classifier.classify(line);
            if record.is_declaration() {
                stats.declarations_seen += 1;
                match match_declaration(&record, self.catalog, self.rules) {
                    MatchOutcome::Matched(entry) => {
                        stats.matched += 1;
                        if has_annotation_block(&lines) {
                            trace!("{}:{} already annotated", file_name, index + 1);
                        } else {
                            trace!("{}:{} matched {}", file_name, index + 1, entry.name);
                            lines.extend(self.renderer.render_for(entry, &record));
                        }
                    }
                    MatchOutcome::Excluded => {
                        stats.excluded += 1;
                        debug!("{}:{} excluded \"{}\"", file_name, index + 1, line.trim());
                    }
                    MatchOutcome::NoMatch => {
                        debug!("{}:{} no match for \"{}\"", file_name, index + 1, line.trim());
                    }
                }
            }
            lines.push(line.to_string());
            comment_closer = open_long_comment(line);
        }

        let result = AnnotateResult::from_stats(&stats);
        if self.rules.only_annotated() && !result.is_annotated() {
            lines.clear();
        }
        AnnotatedFile { lines, result, stats }
    }
}

/// Whether the lines directly above the next declaration already form an
/// annotation block: a contiguous run of `---` lines holding a directive.
fn has_annotation_block(lines: &[String]) -> bool {
    lines
        .iter()
        .rev()
        .map(|line| line.trim_start())
        .take_while(|line| line.starts_with(DOC_PREFIX))
        .any(|line| line.starts_with(ANNOTATION_PREFIX))
}
