//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use bibtree_core::pipeline::{
    self, BuildConfig, BuildReport, ProgressReporter, QueryOptions,
};
use bibtree_shared::{
    AppConfig, DefaultsConfig, init_config, last_segment, load_config, load_config_from,
    path_depth,
};
use bibtree_taxonomy::Lookup;
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// bibtree: categorized bibliography builder.
#[derive(Parser)]
#[command(
    name = "bibtree",
    version,
    about = "File BibTeX entries under a category taxonomy and render them as a LaTeX document.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.bibtree/bibtree.toml).
    #[arg(long, global = true, env = "BIBTREE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build the categorized bibliography document.
    Build {
        /// Bibliography file (bare names resolve inside the work directory).
        #[arg(short, long)]
        bibfile: Option<String>,

        /// Taxonomy description file.
        #[arg(short, long)]
        taxonomy: Option<String>,

        /// Output `.tex` file.
        #[arg(short, long)]
        out: Option<String>,

        /// Do not require the document class and style files.
        #[arg(long)]
        skip_support_check: bool,

        /// Print the build report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the entries filed under a category and its subcategories.
    Query {
        /// Category path (abbreviations allowed, e.g. `arch::tr`).
        key: String,

        /// Bibliography file.
        #[arg(short, long)]
        bibfile: Option<String>,

        /// Taxonomy description file.
        #[arg(short, long)]
        taxonomy: Option<String>,

        /// Only entries filed directly under the category.
        #[arg(long)]
        exact: bool,

        /// Also list entries that have no category.
        #[arg(long)]
        include_uncategorized: bool,
    },

    /// Print the declared categories in section order.
    Categories {
        /// Taxonomy description file.
        #[arg(short, long)]
        taxonomy: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "bibtree=info",
        1 => "bibtree=debug",
        _ => "bibtree=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Build {
            bibfile,
            taxonomy,
            out,
            skip_support_check,
            json,
        } => cmd_build(
            &config,
            bibfile.as_deref(),
            taxonomy.as_deref(),
            out.as_deref(),
            skip_support_check,
            json,
        ),
        Command::Query {
            key,
            bibfile,
            taxonomy,
            exact,
            include_uncategorized,
        } => cmd_query(
            &config,
            &key,
            bibfile.as_deref(),
            taxonomy.as_deref(),
            exact,
            include_uncategorized,
        ),
        Command::Categories { taxonomy } => cmd_categories(&config, taxonomy.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Resolved input files for commands that read the bibliography.
struct Inputs {
    bibfile: PathBuf,
    taxonomy: PathBuf,
}

fn resolve_inputs(
    defaults: &DefaultsConfig,
    bibfile: Option<&str>,
    taxonomy: Option<&str>,
) -> Result<Inputs> {
    Ok(Inputs {
        bibfile: defaults.resolve_existing(bibfile.unwrap_or(&defaults.bibfile), "bib")?,
        taxonomy: resolve_taxonomy(defaults, taxonomy)?,
    })
}

fn resolve_taxonomy(defaults: &DefaultsConfig, taxonomy: Option<&str>) -> Result<PathBuf> {
    Ok(defaults.resolve_existing(taxonomy.unwrap_or(&defaults.taxonomy), "json")?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(
    config: &AppConfig,
    bibfile: Option<&str>,
    taxonomy: Option<&str>,
    out: Option<&str>,
    skip_support_check: bool,
    json: bool,
) -> Result<()> {
    let defaults = &config.defaults;
    if !skip_support_check {
        defaults.check_support_files(&config.document.support_files)?;
    }

    let inputs = resolve_inputs(defaults, bibfile, taxonomy)?;
    let output = defaults.resolve(out.unwrap_or(&defaults.output), "tex");

    let build_config = BuildConfig {
        bibfile: inputs.bibfile,
        taxonomy: inputs.taxonomy,
        output,
        document: config.document.clone(),
        abbreviations: config.abbreviations.clone(),
    };

    info!(
        bibfile = %build_config.bibfile.display(),
        taxonomy = %build_config.taxonomy.display(),
        "building document"
    );

    let reporter = CliProgress::new();
    let report = pipeline::build_document(&build_config, &reporter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("  Written to LaTeX file {}", report.document.path.display());
    println!("  Entries:  {}", report.entry_count);
    println!("  Sections: {}", report.section_count);
    println!("  Lines:    {}", report.document.line_count);
    println!("  SHA-256:  {}", report.document.sha256);
    println!("  Time:     {}ms", report.elapsed_ms);
    println!();

    Ok(())
}

fn cmd_query(
    config: &AppConfig,
    key: &str,
    bibfile: Option<&str>,
    taxonomy: Option<&str>,
    exact: bool,
    include_uncategorized: bool,
) -> Result<()> {
    let inputs = resolve_inputs(&config.defaults, bibfile, taxonomy)?;
    let abbrev = pipeline::abbreviation_table(&config.abbreviations)?;
    let map = pipeline::build_category_map(
        &inputs.taxonomy,
        &inputs.bibfile,
        abbrev,
        &pipeline::SilentProgress,
    )?;

    let opts = QueryOptions {
        lookup: if exact { Lookup::Exact } else { Lookup::Multilevel },
        include_uncategorized,
    };
    let items = pipeline::query(&map, key, opts)?;

    println!("------ {} -------\n", key.to_uppercase());
    for item in &items {
        println!("[{}]", item.location.join(" | "));
        println!("{}\n", item.to_latex());
    }
    info!(key, matches = items.len(), "query complete");

    Ok(())
}

fn cmd_categories(config: &AppConfig, taxonomy: Option<&str>) -> Result<()> {
    let path = resolve_taxonomy(&config.defaults, taxonomy)?;
    let abbrev = pipeline::abbreviation_table(&config.abbreviations)?;
    let map = pipeline::load_category_map(&path, abbrev)?;

    for key in &map {
        println!("{}", describe_category(key, &map));
    }
    Ok(())
}

/// One indented line per category, with its short code when it has one.
fn describe_category(key: &str, map: &bibtree_taxonomy::CategoryMap) -> String {
    let indent = "  ".repeat(path_depth(key));
    let segment = last_segment(key);
    match map.abbreviations().abbreviate(segment) {
        Some(short) => format!("{indent}{segment} ({short})"),
        None => format!("{indent}{segment}"),
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn entry_ingested(&self, id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Filing [{current}/{total}] {id}"));
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
