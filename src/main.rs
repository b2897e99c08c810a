use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};

use dream::catalog::TranslatorCatalog;
use dream::config::Settings;
use dream::engine::NixEngine;
use dream::error::TranslateError;
use dream::hash_extract::FodPathScraper;
use dream::special_args::{SpecialArgs, split_special_args};
use dream::telemetry;
use dream::translate::{TranslateOptions, Translator};

/// Translate project manifests into reproducible lock files
///
/// Each build ecosystem (npm, pip, cargo, ...) is handled by a pluggable
/// translator. `dream translate` picks one (or auto-detects it from the
/// inputs), builds it, and runs it to produce a dream.lock listing every
/// external source the project needs.
///
/// QUICK START:
///
///   dream list
///   dream translate ./package-lock.json
///   dream translate -t nodejs.pure.package-lock -o out/ --arg_noDev=true .
///
/// Translator-specific options are passed as --arg_<name>=<value>; see
/// `dream list` for what each translator accepts.
#[derive(Parser)]
#[command(name = "dream")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'dream <command> --help' for more information on a specific command.")]
struct Cli {
    /// Translator catalog (JSON)
    #[arg(long, env = "DREAM_TRANSLATORS_FILE", global = true)]
    translators: Option<PathBuf>,

    /// Root of the build definitions the translators live in
    #[arg(long, env = "DREAM_SRC", global = true)]
    source_root: Option<PathBuf>,

    /// Build engine program (overrides builder.program in dream.toml)
    #[arg(long, env = "DREAM_BUILDER", global = true)]
    builder: Option<String>,

    /// Orchestrator configuration file
    #[arg(long, env = "DREAM_CONFIG", default_value = "dream.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available translators and their special arguments
    List,

    /// Translate projects to a dream.lock
    Translate(TranslateArgs),

    /// Print shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Select translator (list via: 'dream list'); auto-detected when empty
    #[arg(short, long, default_value = "")]
    translator: String,

    /// Output file/directory for the generic lock
    #[arg(short, long, default_value = "./dream.lock")]
    output: PathBuf,

    /// Store only one hash for all sources combined (smaller lock file -> larger FOD)
    #[arg(short, long)]
    combined: bool,

    /// Input files or directories containing sources and metadata
    #[arg(required = true, num_args = 1..)]
    input: Vec<PathBuf>,
}

fn main() -> ExitCode {
    telemetry::init();
    match run(std::env::args_os().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(argv: Vec<OsString>) -> Result<()> {
    let passthrough: Vec<OsString> = argv.iter().skip(1).cloned().collect();
    let (clap_argv, special_args) = split_special_args(argv)?;
    let cli = Cli::parse_from(clap_argv);

    match cli.command {
        Commands::List => {
            let catalog = load_catalog(cli.translators.as_ref())?;
            if catalog.is_empty() {
                tracing::warn!("translator catalog declares no translators");
            }
            println!("{}", catalog.render_listing());
            Ok(())
        }
        Commands::Translate(ref args) => {
            translate(&cli, args, special_args, passthrough)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "dream", &mut io::stdout());
            Ok(())
        }
    }
}

fn load_catalog(path: Option<&PathBuf>) -> Result<TranslatorCatalog> {
    let path = path.context(
        "No translator catalog given.\n  \
         Set DREAM_TRANSLATORS_FILE or pass --translators <path>",
    )?;
    let catalog = TranslatorCatalog::load(path).map_err(TranslateError::from)?;
    Ok(catalog)
}

fn translate(
    cli: &Cli,
    args: &TranslateArgs,
    special_args: SpecialArgs,
    passthrough: Vec<OsString>,
) -> Result<()> {
    let catalog = load_catalog(cli.translators.as_ref())?;
    let source_root = cli.source_root.clone().context(
        "No build definitions given.\n  \
         Set DREAM_SRC or pass --source-root <path>",
    )?;
    let settings = Settings::new(source_root, &cli.config, cli.builder.clone())
        .map_err(TranslateError::from)?;
    let engine = NixEngine::new(&settings.config.builder, &settings.source_root);

    let translator = Translator {
        catalog: &catalog,
        settings: &settings,
        engine: &engine,
        extractor: &FodPathScraper,
    };
    translator.run(&TranslateOptions {
        inputs: args.input.clone(),
        output: args.output.clone(),
        selector: args.translator.clone(),
        combined: args.combined,
        special_args,
        passthrough,
    })?;
    Ok(())
}
