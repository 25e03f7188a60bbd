use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::builders::compiler::LuaCompiler;
use crate::builders::importer::{CatalogImporter, FileImporter};
use crate::builders::renderer::AnnotationRenderer;
use crate::builders::reporter::{ConsoleReporter, FileReport, StatusReporter};
use crate::builders::storage::{FileOutput, MemoryOutput, OutputProvider};
use crate::core::catalog::DeclarationCatalog;
use crate::core::config::{ConfigManager, ConfigProvider, ZdocConfig};
use crate::core::engine::{AnnotateResult, LuaAnnotator};
use crate::core::rules::AnnotateRules;

#[derive(Debug, Clone, Default)]
pub struct AnnotateOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub catalog: PathBuf,
    pub exclude: Vec<String>,
    pub only_annotated: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub catalog: PathBuf,
    pub output: Option<PathBuf>,
    pub exclude: Vec<String>,
}

pub fn initialize_config(config_path: Option<&Path>) -> Result<()> {
    let config_manager = get_config_manager(config_path)?;
    config_manager.initialize()?;
    println!(
        "✓ Initialized zdoc configuration at {}",
        config_manager.get_config_path().display()
    );
    Ok(())
}

pub fn validate_config(config_path: Option<&Path>) -> Result<()> {
    get_config_manager(config_path)?.validate_config()
}

pub fn export_config(config_path: Option<&Path>, file: &Path, format: &str) -> Result<()> {
    get_config_manager(config_path)?.export_config(file, format)?;
    println!("✓ Exported configuration to {}", file.display());
    Ok(())
}

pub fn load_config(config_path: Option<&Path>) -> Result<ZdocConfig> {
    get_config_manager(config_path)?.load_config()
}

/// Runs the `annotate` command and prints the report.
pub fn run_annotate(config: &ZdocConfig, options: &AnnotateOptions) -> Result<()> {
    let reports = if options.dry_run {
        let mut output = MemoryOutput::new();
        let reports = annotate_files(config, options, &mut output)?;
        info!("Dry run, {} files would be written", output.len());
        reports
    } else {
        annotate_files(config, options, &mut FileOutput::new())?
    };
    ConsoleReporter::new(config.global_settings.verbose).generate_report(&reports)
}

/// Annotates every Lua file under `options.input` and hands the results to
/// `output`.
pub fn annotate_files(
    config: &ZdocConfig,
    options: &AnnotateOptions,
    output: &mut dyn OutputProvider,
) -> Result<Vec<FileReport>> {
    let root = options.input.as_path();
    if !root.exists() {
        anyhow::bail!("Input path does not exist: {}", root.display());
    }

    let catalog = FileImporter::new().import_catalog(&options.catalog, None)?;
    let exclude: HashSet<String> = options.exclude.iter().cloned().collect();
    let rules = AnnotateRules::new(&config.annotate, &exclude)?
        .with_only_annotated(options.only_annotated || config.annotate.only_annotated);
    let annotator = LuaAnnotator::new(&catalog, &rules);

    let paths = collect_lua_files(root)?;
    if paths.len() > 1 {
        info!("Parsing and documenting lua files found in {}", root.display());
    } else if paths.is_empty() {
        warn!("No files found under path {}", root.display());
    }
    if options.output.is_none() && !options.dry_run {
        warn!("Unspecified output directory, overwriting files");
    }

    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        let file_name = path.to_string_lossy().to_string();
        let lines = match read_lines(&path) {
            Ok(lines) => lines,
            Err(e) => {
                error!("Skipped annotating file \"{}\": {:#}", file_name, e);
                continue;
            }
        };
        let annotated = annotator.annotate(&file_name, &lines);

        log_result(&file_name, annotated.result);
        let target = match &options.output {
            Some(dir) => resolve_output_path(root, &path, dir),
            None => path.clone(),
        };
        debug!("Writing {} lines to {}", annotated.lines.len(), target.display());
        let written = output.write_lines(&target, &annotated.lines)?;

        reports.push(FileReport {
            path: file_name,
            result: annotated.result,
            stats: annotated.stats,
            written,
        });
    }
    Ok(reports)
}

fn log_result(file_name: &str, result: AnnotateResult) {
    match result {
        AnnotateResult::AllIncluded => {
            info!("Finished annotating file \"{}\", all elements matched.", file_name)
        }
        AnnotateResult::PartialInclusion => {
            error!("Failed annotating file \"{}\", some elements were not matched.", file_name)
        }
        AnnotateResult::NoMatch => {
            error!("Failed annotating file \"{}\", no elements were matched", file_name)
        }
        AnnotateResult::SkippedFileIgnored => {
            info!("Skipped annotating file \"{}\", file was ignored.", file_name)
        }
        AnnotateResult::SkippedFileEmpty => {
            warn!("Skipped annotating file \"{}\", file was empty.", file_name)
        }
        AnnotateResult::AllExcluded => {
            warn!("Skipped annotating file \"{}\", all elements were excluded.", file_name)
        }
    }
}

/// Runs the `compile` command. Returns the number of documents written.
pub fn run_compile(config: &ZdocConfig, options: &CompileOptions) -> Result<usize> {
    let catalog = FileImporter::new().import_catalog(&options.catalog, None)?;
    let dir = options.output.clone().unwrap_or_else(|| PathBuf::from("."));
    if dir.exists() && !dir.is_dir() {
        anyhow::bail!("Output path does not point to a directory: {}", dir.display());
    }
    compile_catalog(config, &catalog, &options.exclude, &dir, &mut FileOutput::new())
}

pub fn compile_catalog(
    config: &ZdocConfig,
    catalog: &DeclarationCatalog,
    extra_exclude: &[String],
    dir: &Path,
    output: &mut dyn OutputProvider,
) -> Result<usize> {
    let exclude: HashSet<String> = config
        .compile
        .exclude
        .iter()
        .chain(extra_exclude)
        .cloned()
        .collect();
    debug!("Compiling {} catalog entries, {} exclusions", catalog.len(), exclude.len());

    let renderer = AnnotationRenderer::new(config.annotate.doc_width);
    let compiler = LuaCompiler::new(catalog, exclude);
    let mut written = 0;

    for document in compiler.compile() {
        let document = match config.compile.rename.get(&document.name) {
            Some(name) if name.trim().is_empty() => {
                debug!("Skipping document {}, renamed to nothing", document.name);
                continue;
            }
            Some(name) => document.renamed(name.trim()),
            None => document,
        };
        let path = dir.join(format!("{}.lua", document.name));
        if output.write_text(&path, &document.to_lua(&renderer))? {
            written += 1;
        }
    }
    info!("Compiled and written {} lua documents", written);

    let types_path = dir.join(&config.compile.types_file);
    output.write_text(&types_path, &compiler.global_types())?;
    Ok(written)
}

// Helper function to create ConfigManager instance
fn get_config_manager(config_path: Option<&Path>) -> Result<ConfigManager> {
    match config_path {
        Some(path) => Ok(ConfigManager::new_at(path)),
        None => ConfigManager::new(),
    }
}

pub fn is_lua_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "lua")
}

/// Every Lua file at or below `root`, in a stable order.
pub fn collect_lua_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if is_lua_file(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Mirrors `path`'s location under `root` into `dir`. A single input file
/// lands directly in `dir`.
pub fn resolve_output_path(root: &Path, path: &Path, dir: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => dir.join(relative),
        _ => dir.join(path.file_name().unwrap_or(path.as_os_str())),
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read lua file {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}
