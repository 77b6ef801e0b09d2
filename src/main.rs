//! cppcheck-catalog CLI
//!
//! Usage:
//!   cppcheck-catalog parse <report>              # Print messages of a report
//!   cppcheck-catalog compile [--check]           # Merge version snapshots into the catalog
//!   cppcheck-catalog rules [--language cpp]      # List rules per language
//!   cppcheck-catalog import [report] --base dir  # Map a report onto rules and files
//!   cppcheck-catalog import --files 'src/**/*.c' # Restrict the indexed files

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use cppcheck_catalog::config::{ColorMode, Config, OutputFormat};
use cppcheck_catalog::snapshot::discover;
use cppcheck_catalog::{
    index_files, parse_file, render_catalog, save_catalog, CatalogCompiler, EventSink, Importer, Issue,
    LanguageScope, LogSink, MemorySink, Message, ReplacementTable, RuleRepository, RuleStatus,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "cppcheck-catalog",
    version,
    about = "Cppcheck report importer and rule catalog compiler"
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a Cppcheck XML report and print its messages
    Parse {
        /// Report file
        report: PathBuf,
    },

    /// Compile the rule catalog from version snapshots
    Compile {
        /// Directory with cppcheck-<version>.xml files
        #[arg(long)]
        snapshots: Option<PathBuf>,

        /// Replacement table
        #[arg(long)]
        replacements: Option<PathBuf>,

        /// Catalog file to write
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compare with the existing catalog instead of writing it
        #[arg(long)]
        check: bool,
    },

    /// List rules of the compiled catalog
    Rules {
        /// Language (default: all configured languages)
        #[arg(short, long)]
        language: Option<String>,

        /// Catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Import a report against the catalog
    Import {
        /// Report file (default: report_path from configuration)
        report: Option<PathBuf>,

        /// Catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Source root relative report paths are resolved against
        #[arg(long, default_value = ".")]
        base: PathBuf,

        /// Glob patterns of indexed files, relative to the source root
        /// (default: every file with a language extension)
        #[arg(long, num_args = 1..)]
        files: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default().context("Failed to load default config")?,
    };

    let format = cli.format.map(|f| match f {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
    });
    config.merge_cli(format, None, None, None, None);
    Ok(config)
}

fn print_message(message: &Message) {
    let place = match message.location() {
        Some(location) => format!("{}:{}", location.file, location.line.as_deref().unwrap_or("?")),
        None => "(definition)".to_string(),
    };
    let severity = message.severity.as_deref().unwrap_or("-");
    let severity = match severity {
        "error" => severity.red(),
        "warning" => severity.yellow(),
        _ => severity.blue(),
    };
    print!("{}: {} [{}] {}", place, severity, message.id.cyan(), message.msg);
    if let Some(replacement) = message.replacement() {
        print!(" {}", format!("-> {}", replacement).dimmed());
    }
    println!();
}

fn cmd_parse(config: &Config, report: &Path) -> anyhow::Result<i32> {
    let messages = parse_file(report, &LogSink)?;
    match config.output.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&messages)?),
        OutputFormat::Text => {
            for message in &messages {
                print_message(message);
            }
            println!("{} {} messages", "Parsed".green().bold(), messages.len());
        }
    }
    Ok(0)
}

fn cmd_compile(config: &Config, check: bool) -> anyhow::Result<i32> {
    let settings = &config.catalog;
    let sources = discover(&settings.snapshots_dir, &settings.file_prefix)
        .with_context(|| format!("Failed to list snapshots in {}", settings.snapshots_dir.display()))?;
    if sources.is_empty() {
        bail!(
            "no {}<version>.xml snapshots found in {}",
            settings.file_prefix,
            settings.snapshots_dir.display()
        );
    }

    let table = match &settings.replacements {
        Some(path) => ReplacementTable::load(path)
            .with_context(|| format!("Failed to load replacements {}", path.display()))?,
        None => ReplacementTable::new(),
    };

    let sink = MemorySink::new();
    let catalog = CatalogCompiler::new(&sink)
        .with_replacements(&table)
        .compile_files(&sources)?;

    let deprecated = catalog.entries().filter(|e| e.deprecated()).count();
    println!(
        "{} {} rules from {} snapshots (latest {}), {} deprecated",
        "Compiled".green().bold(),
        catalog.len(),
        sources.len(),
        catalog.latest_version().unwrap_or("-"),
        deprecated
    );
    for entry in catalog.needing_review() {
        println!(
            "  {} {} appears in non-contiguous versions, review {}",
            "review".yellow(),
            entry.id().cyan(),
            entry.versions
        );
    }
    let warnings = sink.warnings().len();
    if warnings > 0 {
        println!("  {} warnings", warnings);
    }

    let output = &settings.output;
    if check {
        let rendered = render_catalog(&catalog);
        let existing = std::fs::read_to_string(output)
            .with_context(|| format!("Failed to read {}", output.display()))?;
        if existing != rendered {
            eprintln!(
                "{}: {} is out of date, re-run compile without --check",
                "error".red().bold(),
                output.display()
            );
            return Ok(1);
        }
        println!("{} {} is up to date", "OK".green().bold(), output.display());
    } else {
        save_catalog(&catalog, output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Wrote {}", output.display());
    }
    Ok(0)
}

fn load_repositories(languages: &[String], catalog: &Path) -> anyhow::Result<Vec<RuleRepository>> {
    let sink = LogSink;
    let definitions = parse_file(catalog, &sink)
        .context("Unable to load descriptions of rules for Cppcheck")?;
    if languages.is_empty() {
        bail!("no languages configured");
    }
    log::info!("Loaded {} rule definitions for {:?}", definitions.len(), languages);
    Ok(languages
        .iter()
        .map(|lang| RuleRepository::from_definitions(lang, &definitions, &sink))
        .collect())
}

fn cmd_rules(config: &Config, language: Option<&str>, catalog: Option<&Path>) -> anyhow::Result<i32> {
    let languages = match language {
        Some(lang) => vec![lang.to_string()],
        None => config.languages.clone(),
    };
    let catalog = catalog.unwrap_or(config.catalog.output.as_path());
    let repositories = load_repositories(&languages, catalog)?;

    match config.output.format {
        OutputFormat::Json => {
            let map: std::collections::BTreeMap<String, &[cppcheck_catalog::Rule]> = repositories
                .iter()
                .map(|r| (r.key(), r.rules()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        OutputFormat::Text => {
            for repo in &repositories {
                println!(
                    "{} ({} rules, {} deprecated)",
                    repo.key().bold(),
                    repo.rules().len(),
                    repo.deprecated_count()
                );
                for rule in repo.rules() {
                    let status = match rule.status {
                        RuleStatus::Ready => "".normal(),
                        RuleStatus::Deprecated => " [deprecated]".red(),
                    };
                    println!("    {}{} {}", rule.key.cyan(), status, rule.name);
                }
            }
        }
    }
    Ok(0)
}

fn cmd_import(
    config: &Config,
    report: Option<&Path>,
    catalog: Option<&Path>,
    base: &Path,
    patterns: &[String],
) -> anyhow::Result<i32> {
    let report = match report {
        Some(path) => path,
        None => config.report_file()?,
    };
    let base = std::fs::canonicalize(base)
        .with_context(|| format!("Source root not found: {}", base.display()))?;
    let catalog = catalog.unwrap_or(config.catalog.output.as_path());
    let repositories = load_repositories(&config.languages, catalog)?;

    let mut index = index_files(&base, &config.languages, patterns, &config.header_language)?;
    let scopes: Vec<LanguageScope> = repositories
        .iter()
        .map(|repo| LanguageScope::new(repo, index.remove(repo.language()).unwrap_or_default()))
        .collect();

    let sink = LogSink;
    if !Importer::should_import(&scopes) {
        sink.info("No active language with indexed files, nothing to import");
        return Ok(0);
    }

    let messages = parse_file(report, &sink)?;
    let issues = Importer::new(&base, &sink).import(&messages, &scopes);

    match config.output.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&issues)?),
        OutputFormat::Text => {
            for issue in &issues {
                print_issue(issue, &base);
            }
            println!("{} {} issues", "Imported".green().bold(), issues.len());
        }
    }
    Ok(0)
}

fn print_issue(issue: &Issue, base: &Path) {
    let place = match &issue.file {
        Some(file) => {
            let shown = file.strip_prefix(base).unwrap_or(file);
            match issue.line {
                Some(line) => format!("{}:{}", shown.display(), line),
                None => shown.display().to_string(),
            }
        }
        None => "(project)".to_string(),
    };
    println!(
        "{}: [{}:{}] {}",
        place,
        issue.repository_key,
        issue.rule_key.cyan(),
        issue.message
    );
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(&cli)?;

    match config.output.color {
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Auto => {}
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    match &cli.command {
        Commands::Parse { report } => cmd_parse(&config, report),
        Commands::Compile {
            snapshots,
            replacements,
            output,
            check,
        } => {
            let mut config = config.clone();
            config.merge_cli(None, None, snapshots.clone(), replacements.clone(), output.clone());
            cmd_compile(&config, *check)
        }
        Commands::Rules { language, catalog } => {
            cmd_rules(&config, language.as_deref(), catalog.as_deref())
        }
        Commands::Import {
            report,
            catalog,
            base,
            files,
        } => cmd_import(&config, report.as_deref(), catalog.as_deref(), base, files),
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}
