//! plugin-index - maintain the Binary Ninja community plugin index.
//!
//! Generates `plugins.json` and its summary table from the listing, checks
//! plugin submissions, and prunes entries that should no longer be listed.

#![allow(clippy::single_match_else)]

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use plugin_index::core::Config;
use plugin_index::github::GitHubClient;
use plugin_index::index::{
    load_index, load_listing, load_requests, save_json, write_summary, IndexGenerator,
    RemovalPlan, RemovalRequest, RemovalTarget, INDEX_INDENT,
};
use plugin_index::metadata::{render_license, render_readme, RawMetadata, Validator};
use plugin_index::submission;

/// Maintain the Binary Ninja community plugin index
#[derive(Parser)]
#[command(name = "plugin-index")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Configuration file (default: .plugin-index.toml, then the user config)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every listed plugin and write plugins.json and README.md
    Generate {
        /// GitHub API token
        #[arg(env = "GITHUB_TOKEN", hide_env_values = true)]
        token: String,

        /// Listing configuration file
        #[arg(short, long)]
        listing: Option<PathBuf>,

        /// Output index file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Summary document to write
        #[arg(long)]
        readme: Option<PathBuf>,

        /// Skip generating the summary document
        #[arg(short = 'r', long)]
        skip_readme: bool,

        /// Fetch and report, but write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a plugin submission named in the ISSUE_CONTENT environment variable
    ValidateIssue {
        /// GitHub API token
        #[arg(env = "GITHUB_TOKEN", hide_env_values = true)]
        token: String,

        /// Fail on schema findings, not just on fetch or parse errors
        #[arg(long)]
        strict: bool,
    },

    /// Remove named entries from the index or the listing (dry run by default)
    Remove {
        /// File kind to edit
        #[arg(long, value_enum)]
        target: Target,

        /// File to edit (default: the configured index or listing)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Entry to remove (repeatable)
        #[arg(long = "name", value_name = "NAME")]
        names: Vec<String>,

        /// JSON array of names or {name, reason} objects to remove
        #[arg(long)]
        names_file: Option<PathBuf>,

        /// JSON array of stale names to report but keep
        #[arg(long)]
        stale_file: Option<PathBuf>,

        /// Actually remove entries
        #[arg(long)]
        execute: bool,

        /// Don't ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Work with a plugin's own plugin.json
    Plugin {
        /// Plugin operation
        #[command(subcommand)]
        operation: PluginOperation,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PluginOperation {
    /// Validate a plugin.json file
    Check {
        /// Path to plugin.json
        #[arg(default_value = "plugin.json")]
        file: PathBuf,
    },

    /// Write README.md next to plugin.json
    Readme {
        /// Path to plugin.json
        #[arg(default_value = "plugin.json")]
        file: PathBuf,

        /// Overwrite an existing README.md without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Write LICENSE next to plugin.json
    License {
        /// Path to plugin.json
        #[arg(default_value = "plugin.json")]
        file: PathBuf,

        /// Overwrite an existing LICENSE without asking
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    /// Published plugins.json
    Index,
    /// listing.json configuration
    Listing,
}

impl From<Target> for RemovalTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Index => Self::Index,
            Target::Listing => Self::Listing,
        }
    }
}

fn main() -> Result<()> {
    // Environment first so GITHUB_TOKEN can come from .env
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    match cli.command {
        Commands::Generate { token, listing, output, readme, skip_readme, dry_run } => {
            let readme = readme.unwrap_or_else(|| config.index.readme.clone());
            let options = GenerateOptions {
                listing: listing.unwrap_or_else(|| config.index.listing.clone()),
                output: output.unwrap_or_else(|| config.index.output.clone()),
                readme: (!skip_readme).then_some(readme),
                dry_run,
            };
            cmd_generate(&config, &token, &options)
        }
        Commands::ValidateIssue { token, strict } => cmd_validate_issue(&config, &token, strict),
        Commands::Remove { target, file, names, names_file, stale_file, execute, yes } => {
            let path = file.unwrap_or_else(|| match target {
                Target::Index => config.index.output.clone(),
                Target::Listing => config.index.listing.clone(),
            });
            cmd_remove(
                target.into(),
                &path,
                &names,
                names_file.as_deref(),
                stale_file.as_deref(),
                !execute,
                yes,
            )
        }
        Commands::Plugin { operation } => cmd_plugin(&config, operation),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Console logging, plus an optional plain-text log file.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_target(false).with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    Ok(())
}

struct GenerateOptions {
    listing: PathBuf,
    output: PathBuf,
    readme: Option<PathBuf>,
    dry_run: bool,
}

fn cmd_generate(config: &Config, token: &str, options: &GenerateOptions) -> Result<()> {
    let previous = load_index(&options.output)?;
    let entries = load_listing(&options.listing)?;

    let client = GitHubClient::from_config(config, token)?;
    let mut generator = IndexGenerator::from_config(client, config).with_previous(previous);
    let outcome = generator.merge(&entries);
    outcome.log_summary();

    if options.dry_run {
        println!(
            "[DRY RUN] Would write {} plugins to {}",
            outcome.records.len(),
            options.output.display()
        );
        if let Some(readme) = &options.readme {
            println!("[DRY RUN] Would write {}", readme.display());
        }
        return Ok(());
    }

    info!("Writing {}", options.output.display());
    save_json(&options.output, &outcome.records, INDEX_INDENT)?;

    if let Some(readme) = &options.readme {
        write_summary(readme, &outcome.records, &config.index.footer)?;
    }

    info!("Plugin index generation completed successfully!");
    Ok(())
}

fn cmd_validate_issue(config: &Config, token: &str, strict: bool) -> Result<()> {
    let content = submission::issue_content()?;
    let client = GitHubClient::from_config(config, token)?;
    let validator = Validator::new(config.index.metadata_version);

    let report = submission::validate_submission(&client, &validator, &content, strict)?;
    if report.validation.is_valid() {
        info!("Validation successful!");
    } else {
        warn!(
            "{} at {} has {} schema findings",
            report.repository,
            report.tag,
            report.validation.issues().len()
        );
    }
    Ok(())
}

fn cmd_remove(
    target: RemovalTarget,
    path: &Path,
    names: &[String],
    names_file: Option<&Path>,
    stale_file: Option<&Path>,
    dry_run: bool,
    skip_confirm: bool,
) -> Result<()> {
    let mut requests: Vec<RemovalRequest> =
        names.iter().map(|name| RemovalRequest::named(name)).collect();
    if let Some(names_file) = names_file {
        requests.extend(load_requests(names_file)?);
    }
    if requests.is_empty() {
        anyhow::bail!("Nothing to remove; pass --name or --names-file");
    }

    let stale: Vec<String> = match stale_file {
        Some(stale_file) => load_requests(stale_file)?.into_iter().map(|r| r.name).collect(),
        None => Vec::new(),
    };

    let plan = RemovalPlan::for_file(target, path, &requests, &stale)?;

    if dry_run {
        info!("Running in DRY RUN mode. Use --execute to apply changes.");
        plan.report(true);
        println!("[DRY RUN] {} unchanged; use --execute to apply.", path.display());
        return Ok(());
    }

    if plan.is_empty() {
        plan.report(false);
        println!("No matching entries found to remove.");
        return Ok(());
    }

    warn!("EXECUTING removal - entries will be permanently removed from {}", path.display());
    if !skip_confirm && !confirm("Are you sure you want to continue? (yes/no): ")? {
        println!("Cancelled");
        return Ok(());
    }

    plan.report(false);
    if let Some(backup) = plan.apply(path)? {
        println!("Backup written to {}", backup.display());
    }
    println!(
        "Removed {} entries from {}",
        plan.original_count - plan.retained.len(),
        path.display()
    );
    Ok(())
}

fn cmd_plugin(config: &Config, operation: PluginOperation) -> Result<()> {
    let validator = Validator::new(config.index.metadata_version);

    match operation {
        PluginOperation::Check { file } => {
            let raw = read_metadata(&file)?;
            let report = raw.validate(&validator);
            if !report.is_valid() {
                for issue in report.issues() {
                    println!("  ✗ {issue}");
                }
                anyhow::bail!("{} failed {} checks", file.display(), report.issues().len());
            }
            println!("✓ {} is valid", file.display());
        }

        PluginOperation::Readme { file, force } => {
            let metadata = read_metadata(&file)?.into_validated(&validator).map_err(|report| {
                anyhow::anyhow!("{} failed {} checks", file.display(), report.issues().len())
            })?;
            write_beside(&file, "README.md", &render_readme(&metadata), force)?;
        }

        PluginOperation::License { file, force } => {
            let metadata = read_metadata(&file)?.into_validated(&validator).map_err(|report| {
                anyhow::anyhow!("{} failed {} checks", file.display(), report.issues().len())
            })?;
            write_beside(&file, "LICENSE", &render_license(&metadata), force)?;
        }
    }

    Ok(())
}

fn read_metadata(path: &Path) -> Result<RawMetadata> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    RawMetadata::parse(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write `name` in the directory of `anchor`, asking before overwriting.
fn write_beside(anchor: &Path, name: &str, content: &str, force: bool) -> Result<()> {
    let path = anchor.with_file_name(name);
    if path.exists()
        && !force
        && !confirm(&format!("{} exists. Overwrite? (yes/no): ", path.display()))?
    {
        println!("Cancelled");
        return Ok(());
    }

    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ Wrote {}", path.display());
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("yes"))
}

fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, plugin_index::APP_NAME, &mut io::stdout());
}
