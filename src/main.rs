//! flare-lint CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use flare_lint::config::CliOptions;
use flare_lint::output;
use flare_lint::{Config, LintEngine, LoaderError, Project, RuleBook, RuleLoader, Severity};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "flare-lint")]
#[command(
    author,
    version,
    about = "A rule-driven linter for MadCap Flare projects",
    long_about = None
)]
struct Cli {
    /// Flare project file (.flprj) or the directory holding it
    project: Option<PathBuf>,

    /// Directory of *rule.txt files
    #[arg(short, long, env = "FLARELINT_RULES", value_name = "DIR")]
    rules: Option<PathBuf>,

    /// Config file path (default: auto-detect .flarelintrc.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Number of parallel jobs (0 = auto, 1 = sequential)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<usize>,

    /// Disable a rule by file name (can be used multiple times)
    #[arg(short, long = "ignore", value_name = "RULE")]
    ignore: Vec<String>,

    /// Language tag overriding the project language
    #[arg(short, long, value_name = "TAG")]
    language: Option<String>,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,

    /// List the loaded rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let project_path = match cli.project {
        Some(ref path) => path.clone(),
        None => std::env::current_dir().context("Cannot determine the current directory")?,
    };
    let start_dir = if project_path.is_dir() {
        project_path.clone()
    } else {
        project_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    };

    let mut config = load_config(cli.config.as_deref(), &start_dir)?;
    config.merge_cli(CliOptions {
        rules_dir: cli.rules.clone(),
        disabled_rules: cli.ignore.clone(),
        min_severity: cli.quiet.then_some(Severity::Error),
        language: cli.language.as_ref().map(|l| l.to_lowercase()),
        jobs: cli.jobs,
    });

    let rules_dir = config
        .rules_dir
        .clone()
        .or_else(|| dirs::config_dir().map(|dir| dir.join("flarelint")))
        .context("No rules directory given and no user config directory found")?;

    let rulebook = match RuleLoader::new(&rules_dir).load_all() {
        Ok(rulebook) => rulebook,
        Err(LoaderError::Compile(e)) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e).context("Failed to load rules"),
    };
    info!("Loaded {} rules from {}", rulebook.len(), rules_dir.display());

    if cli.list_rules {
        print_rules(&rulebook);
        return Ok(ExitCode::SUCCESS);
    }

    let project = Project::open(&project_path)
        .with_context(|| format!("Failed to open project {}", project_path.display()))?;
    info!("Scanning {}", project.file.display());

    let engine = LintEngine::new(rulebook, config);
    let report = engine
        .lint_project(&project)
        .with_context(|| format!("Failed to scan {}", project.dir.display()))?;

    match cli.format {
        OutputFormat::Text => output::print_text(&report, &project.dir)?,
        OutputFormat::Json => output::print_json(&report, &project.dir)?,
    }

    Ok(ExitCode::from(report.exit_code()))
}

fn load_config(explicit: Option<&Path>, start_dir: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    match Config::find_and_load(start_dir) {
        Ok(Some((path, config))) => {
            info!("Using config: {}", path.display());
            Ok(config)
        }
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

fn print_rules(rulebook: &RuleBook) {
    for rule in rulebook.iter() {
        println!(
            "{}  {}  [{}]",
            rule.source.bold(),
            rule.severity.colored(),
            rule.extensions.join(", ")
        );
        if let Some(ref description) = rule.description {
            for line in description.lines() {
                println!("    {}", line.trim().dimmed());
            }
        }
    }
    println!("{} rules for {}", rulebook.len(), rulebook.extensions().join(", "));
}
