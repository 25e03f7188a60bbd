use anyhow::Result;
use std::collections::BTreeMap;

use crate::core::engine::{AnnotateResult, AnnotateStats};

/// A struct that holds the annotation summary for a single file.
///
/// This provides a clean way to pass file-specific data from the annotate
/// command to the `StatusReporter`.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// The path of the source file, as shown to the user.
    pub path: String,
    /// The verdict for the file.
    pub result: AnnotateResult,
    /// The counters the verdict was derived from.
    pub stats: AnnotateStats,
    /// Whether an output file was written.
    pub written: bool,
}

pub trait StatusReporter {
    fn generate_report(&self, reports: &[FileReport]) -> Result<()>;
}

/// A concrete implementation of `StatusReporter` that prints the report to the console.
///
/// This is the reporter used at the end of the `annotate` command.
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    /// Constructs a new `ConsoleReporter` instance.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// A private helper function to format the status message for a single file.
    ///
    /// This function generates a human-readable string with an icon, the file
    /// path, and a summary of the matched declarations.
    ///
    /// # Arguments
    /// * `report`: The `FileReport` for this file.
    ///
    /// # Returns
    /// A `String` containing the formatted status report line.
    fn format_file_status(&self, report: &FileReport) -> String {
        // Determine the appropriate emoji icon based on the verdict.
        // 🟢: every declaration was annotated.
        // 🟡: some declarations were annotated.
        // 🔴: declarations were found but none matched.
        // ⚪: the file was skipped or everything was excluded.
        let status_icon = match report.result {
            AnnotateResult::AllIncluded => "🟢",
            AnnotateResult::PartialInclusion => "🟡",
            AnnotateResult::NoMatch => "🔴",
            AnnotateResult::AllExcluded
            | AnnotateResult::SkippedFileEmpty
            | AnnotateResult::SkippedFileIgnored => "⚪",
        };

        // Calculate the percentage of matched declarations, handling files without any.
        let stats = &report.stats;
        let percentage = if stats.declarations_seen > 0 {
            (stats.matched as f64 / stats.declarations_seen as f64) * 100.0
        } else {
            0.0
        };

        format!(
            "{} {} [{}] ({}/{} matched, {} excluded, {:.1}%){}",
            status_icon,
            report.path,
            report.result,
            stats.matched,
            stats.declarations_seen,
            stats.excluded,
            percentage,
            if report.written { "" } else { " - not written" }
        )
    }
}

/// Implementation of the `StatusReporter` trait for `ConsoleReporter`.
impl StatusReporter for ConsoleReporter {
    /// Generates and prints the full annotation report to the standard output.
    fn generate_report(&self, reports: &[FileReport]) -> Result<()> {
        println!("📊 Lua Annotation Report");
        println!("========================");

        // If no files were processed, print a simple message and exit.
        if reports.is_empty() {
            println!("No Lua files processed.");
            return Ok(());
        }

        let mut by_result: BTreeMap<String, usize> = BTreeMap::new();
        let mut total = AnnotateStats::default();

        for report in reports {
            *by_result.entry(report.result.to_string()).or_default() += 1;
            total.declarations_seen += report.stats.declarations_seen;
            total.matched += report.stats.matched;
            total.excluded += report.stats.excluded;

            // Fully annotated files are only listed in verbose mode.
            if self.verbose || report.result != AnnotateResult::AllIncluded {
                println!("{}", self.format_file_status(report));
            }
        }

        // Print the final summary section.
        println!("\n📈 Summary:");
        println!("  Total files: {}", reports.len());
        for (result, count) in &by_result {
            println!("  {result}: {count}");
        }
        println!("  Declarations: {}", total.declarations_seen);
        println!("  Matched: {}", total.matched);
        println!("  Excluded: {}", total.excluded);
        println!("  Unmatched: {}", total.unmatched());

        if !self.verbose && by_result.contains_key("ALL_INCLUDED") {
            println!("\nℹ️  Run with --verbose to list fully annotated files");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_status() {
        let reporter = ConsoleReporter::new(false);
        let report = FileReport {
            path: "media/lua/client/ISUI.lua".to_string(),
            result: AnnotateResult::PartialInclusion,
            stats: AnnotateStats {
                declarations_seen: 4,
                matched: 1,
                excluded: 1,
            },
            written: true,
        };
        assert_eq!(
            reporter.format_file_status(&report),
            "🟡 media/lua/client/ISUI.lua [PARTIAL_INCLUSION] (1/4 matched, 1 excluded, 25.0%)"
        );
    }
}
