//! # Workflow Index CLI (`wfx`)
//!
//! Thin command-line collaborator over [`workflow_index::Catalog`].
//!
//! ## Usage
//!
//! ```bash
//! wfx --config ./config/wfx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wfx init` | Create the SQLite database and run schema migrations |
//! | `wfx reindex` | Index new and changed corpus documents |
//! | `wfx search "<query>"` | Search indexed workflows |
//! | `wfx get <filename>` | Show one workflow record |
//! | `wfx stats` | Corpus analytics |
//! | `wfx similar <filename>` | Workflows similar to a reference |
//! | `wfx categories` | List categories from the category map |

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use workflow_index::config;
use workflow_index::models::{Complexity, TriggerType};
use workflow_index::search::QueryRequest;
use workflow_index::store::SortKey;
use workflow_index::{Catalog, IndexError};

/// Workflow Index CLI: catalog, search and rank a corpus of workflow
/// definitions.
#[derive(Parser)]
#[command(name = "wfx", version, about = "Catalog and search a corpus of workflow definitions")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/wfx.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Analyze the corpus and index documents whose content changed.
    Reindex {
        /// Rewrite every document, even when its digest is unchanged.
        #[arg(long)]
        force: bool,
    },

    /// Search indexed workflows.
    Search {
        /// Free-text query. Quoted substrings match as exact phrases.
        #[arg(default_value = "")]
        query: String,

        /// Only workflows with this trigger type.
        #[arg(long)]
        trigger: Option<TriggerType>,

        /// Only workflows with this complexity (low, medium, high).
        #[arg(long)]
        complexity: Option<Complexity>,

        /// Only active workflows.
        #[arg(long)]
        active_only: bool,

        /// Require this integration; repeat to require several.
        #[arg(long = "integration")]
        integrations: Vec<String>,

        /// Only workflows in this category.
        #[arg(long)]
        category: Option<String>,

        /// Page size (1-100). Defaults to `[query].default_limit`.
        #[arg(long)]
        limit: Option<i64>,

        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,

        #[arg(long, value_enum, default_value = "name")]
        sort: SortArg,

        /// Print the JSON response instead of a listing.
        #[arg(long)]
        json: bool,
    },

    /// Show one workflow by filename.
    Get {
        filename: String,
        #[arg(long)]
        json: bool,
    },

    /// Show corpus-wide analytics.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Rank workflows by similarity to a reference workflow.
    Similar {
        filename: String,
        /// Minimum combined score in [0, 1].
        #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
        threshold: f64,
        #[arg(long)]
        json: bool,
    },

    /// List categories and their member counts.
    Categories,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    /// Name ascending.
    Name,
    /// Node count descending.
    Nodes,
    /// Most recently analyzed first.
    Recent,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortKey::Name,
            SortArg::Nodes => SortKey::NodeCount,
            SortArg::Recent => SortKey::AnalyzedAt,
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Print the error and exit non-zero.
fn fail(err: IndexError, json: bool) -> ! {
    if json {
        let body = serde_json::to_string_pretty(&err.to_body()).unwrap_or_default();
        eprintln!("{}", body);
    } else {
        eprintln!("Error: {}", err);
    }
    std::process::exit(1);
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cfg = config::load_config(&cli.config).unwrap_or_else(|e| fail(e, false));

    match cli.command {
        Commands::Init => {
            Catalog::init(&cfg).await.unwrap_or_else(|e| fail(e, false));
            println!("Database initialized successfully.");
        }
        Commands::Reindex { force } => {
            let catalog = Catalog::init(&cfg).await.unwrap_or_else(|e| fail(e, false));
            let report = catalog.reindex(force).await.unwrap_or_else(|e| fail(e, false));
            println!("reindex{}", if force { " (force)" } else { "" });
            println!("  processed: {}", report.processed);
            println!("  skipped: {}", report.skipped);
            println!("  errors: {}", report.errors);
            println!("  total: {}", report.total);
            println!("ok");
        }
        Commands::Search {
            query,
            trigger,
            complexity,
            active_only,
            integrations,
            category,
            limit,
            offset,
            sort,
            json,
        } => {
            let catalog = Catalog::open(&cfg).await.unwrap_or_else(|e| fail(e, json));
            let request = QueryRequest {
                query,
                trigger,
                complexity,
                active_only,
                integrations,
                category,
                limit: limit.unwrap_or(i64::from(cfg.query.default_limit)),
                offset,
                sort: sort.into(),
            };
            let response = catalog
                .query(&request)
                .await
                .unwrap_or_else(|e| fail(e, json));

            if json {
                return print_json(&response);
            }
            if response.documents.is_empty() {
                println!("No results.");
                println!("total: {}", response.total);
                return Ok(());
            }
            for (i, doc) in response.documents.iter().enumerate() {
                println!(
                    "{}. {} [{}, {}, {} nodes]",
                    response.offset + i as i64 + 1,
                    doc.name,
                    doc.trigger_type,
                    doc.complexity,
                    doc.node_count
                );
                println!("    file: {}", doc.filename);
                if !doc.integrations.is_empty() {
                    let names: Vec<&str> = doc.integrations.iter().map(String::as_str).collect();
                    println!("    integrations: {}", names.join(", "));
                }
                println!("    {}", doc.description);
                println!();
            }
            println!("total: {} (pages: {})", response.total, response.pages);
        }
        Commands::Get { filename, json } => {
            let catalog = Catalog::open(&cfg).await.unwrap_or_else(|e| fail(e, json));
            let doc = catalog
                .get(&filename)
                .await
                .unwrap_or_else(|e| fail(e, json));

            if json {
                return print_json(&doc);
            }
            println!("--- Workflow ---");
            println!("filename:     {}", doc.filename);
            println!("name:         {}", doc.name);
            println!("source_id:    {}", doc.source_id);
            println!("active:       {}", doc.active);
            println!("trigger:      {}", doc.trigger_type);
            println!("complexity:   {}", doc.complexity);
            println!("nodes:        {}", doc.node_count);
            let integrations: Vec<&str> = doc.integrations.iter().map(String::as_str).collect();
            println!("integrations: {}", integrations.join(", "));
            let tags: Vec<&str> = doc.tags.iter().map(String::as_str).collect();
            println!("tags:         {}", tags.join(", "));
            if let Some(ref created) = doc.created_at {
                println!("created_at:   {}", created);
            }
            if let Some(ref updated) = doc.updated_at {
                println!("updated_at:   {}", updated);
            }
            println!("analyzed_at:  {}", doc.analyzed_at);
            println!("digest:       {}", doc.digest);
            println!("size:         {} bytes", doc.byte_size);
            println!();
            println!("{}", doc.description);
        }
        Commands::Stats { json } => {
            let catalog = Catalog::open(&cfg).await.unwrap_or_else(|e| fail(e, json));
            let stats = catalog.stats().await.unwrap_or_else(|e| fail(e, json));

            if json {
                return print_json(&stats);
            }
            println!("Workflow Index — Stats");
            println!("======================");
            println!();
            println!("  Workflows:   {}", stats.total);
            println!(
                "  Active:      {} ({}%)",
                stats.active, stats.active_percentage
            );
            println!("  Inactive:    {}", stats.inactive);
            println!("  Nodes:       {} (avg {})", stats.total_nodes, stats.avg_nodes);
            println!("  Integrations: {}", stats.unique_integrations);
            println!();
            println!("  By trigger:");
            for (trigger, count) in &stats.triggers {
                println!("    {:<12} {:>6}", trigger, count);
            }
            println!("  By complexity:");
            for (complexity, count) in &stats.complexity {
                println!("    {:<12} {:>6}", complexity, count);
            }
            if !stats.top_integrations.is_empty() {
                println!("  Top integrations:");
                for integration in &stats.top_integrations {
                    println!("    {:<24} {:>6}", integration.name, integration.count);
                }
            }
            println!();
        }
        Commands::Similar {
            filename,
            threshold,
            json,
        } => {
            let catalog = Catalog::open(&cfg).await.unwrap_or_else(|e| fail(e, json));
            let response = catalog
                .find_similar(&filename, threshold)
                .await
                .unwrap_or_else(|e| fail(e, json));

            if json {
                return print_json(&response);
            }
            if response.results.is_empty() {
                println!("No similar workflows.");
                return Ok(());
            }
            for (i, similar) in response.results.iter().enumerate() {
                println!(
                    "{}. [{:.2}] {} ({})",
                    i + 1,
                    similar.score,
                    similar.workflow.name,
                    similar.workflow.filename
                );
                if !similar.shared_integrations.is_empty() {
                    println!("    shared: {}", similar.shared_integrations.join(", "));
                }
            }
            println!();
            println!(
                "showing {} of {} above {:.2}",
                response.results.len(),
                response.total,
                response.threshold
            );
        }
        Commands::Categories => {
            let catalog = Catalog::open(&cfg).await.unwrap_or_else(|e| fail(e, false));
            let categories = catalog.categories();
            if categories.is_empty() {
                println!("No categories.");
                return Ok(());
            }
            println!("{:<32} {:>6}", "CATEGORY", "COUNT");
            for category in &categories {
                println!("{:<32} {:>6}", category.name, category.count);
            }
        }
    }

    Ok(())
}
