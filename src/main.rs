//! zdoc: annotates Project Zomboid Lua sources with EmmyLua documentation
//! taken from a catalog of known game API declarations, and compiles that
//! catalog into standalone Lua stubs.
//!
//! Every declaration found in a Lua file is looked up in the catalog. A match
//! gets an annotation block inserted right above it; anything else is left
//! as it was. Each file ends up with a verdict telling how much of it could
//! be documented.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use zdoc::utils::{self, AnnotateOptions, CompileOptions};

#[derive(Parser)]
#[command(name = "zdoc")]
#[command(about = "Annotate Lua sources with EmmyLua documentation from a declaration catalog")]
struct Cli {
    /// Configuration file (zdoc.toml or a .properties file)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print debug logging and list every processed file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Annotate Lua files with documentation from the catalog
    Annotate {
        /// Lua file or directory to annotate
        input: PathBuf,
        /// Directory to write annotated files to; files are overwritten when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Declaration catalog (json, yaml or toml)
        #[arg(long)]
        catalog: PathBuf,
        /// Names to exclude from annotation
        #[arg(short, long, value_delimiter = ',')]
        exclude: Vec<String>,
        /// Only write files that received annotations
        #[arg(long)]
        only_annotated: bool,
        /// Annotate without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Compile the catalog into Lua stub documents
    Compile {
        /// Declaration catalog (json, yaml or toml)
        #[arg(long)]
        catalog: PathBuf,
        /// Directory to write documents to
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Classes to exclude from compilation
        #[arg(short, long, value_delimiter = ',')]
        exclude: Vec<String>,
    },
    /// Validate the configuration file
    Validate,
    /// Export the configuration to another format
    Export {
        /// Output format (json, yaml, toml)
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Output file path
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "zdoc=debug" } else { "zdoc=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => {
            init_logging(cli.verbose);
            utils::initialize_config(config_path)
        }
        Commands::Annotate {
            input,
            output,
            catalog,
            exclude,
            only_annotated,
            dry_run,
        } => {
            let mut config = utils::load_config(config_path)?;
            config.global_settings.verbose |= cli.verbose;
            init_logging(config.global_settings.verbose);

            let options = AnnotateOptions {
                input,
                output,
                catalog,
                exclude,
                only_annotated,
                dry_run,
            };
            utils::run_annotate(&config, &options)
        }
        Commands::Compile {
            catalog,
            output,
            exclude,
        } => {
            let mut config = utils::load_config(config_path)?;
            config.global_settings.verbose |= cli.verbose;
            init_logging(config.global_settings.verbose);

            let options = CompileOptions {
                catalog,
                output,
                exclude,
            };
            utils::run_compile(&config, &options).map(|_| ())
        }
        Commands::Validate => {
            init_logging(cli.verbose);
            utils::validate_config(config_path)
        }
        Commands::Export { format, file } => {
            init_logging(cli.verbose);
            utils::export_config(config_path, &file, &format)
        }
    }
}
