//! Lexigraph CLI - ingest and inspect a lexical graph

mod commands;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use lexigraph::config::{self, LexigraphConfig};
use lexigraph::SqliteStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lexigraph")]
#[command(version)]
#[command(about = "Single-pass dictionary graph ingester with deferred reference resolution")]
#[command(long_about = r#"
Lexigraph ingests a JSON Lines dump of dictionary entries in one pass.
Patterns referenced before their own entry are parked and linked as soon
as the entry defining them is read.

Example usage:
  lexigraph init --database dict.db
  lexigraph ingest --corpus dump.jsonl --shards 4
  lexigraph pending
  lexigraph show --title chien
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a lexigraph.toml config file
    Init {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Ingest a JSONL corpus ("-" reads stdin)
    Ingest {
        /// Path to the corpus
        #[arg(short = 'i', long)]
        corpus: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Number of ingestion threads
        #[arg(short, long)]
        shards: Option<usize>,

        /// Register every reference as pending, even when its pattern exists
        #[arg(long)]
        strict: bool,

        /// Clear the database before ingesting
        #[arg(long)]
        fresh: bool,
    },

    /// Show statistics about the graph
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show a record and its relations
    Show {
        /// Record title (case-sensitive)
        #[arg(short, long)]
        title: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// List pending references
    Pending {
        /// Only list referencers of this name
        #[arg(short, long)]
        name: Option<String>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Transfer pending references of a name to the record with that title
    Transfer {
        /// Pending name (and destination title)
        #[arg(short, long)]
        name: String,

        /// Relation kind to create
        #[arg(short, long, default_value = "pattern")]
        kind: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Delete a record, its relations and its pending references
    Delete {
        /// Record title (case-sensitive)
        #[arg(short, long)]
        title: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print the version
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

/// Print a JSON success envelope
pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

/// Settings shared by every command
pub struct Context {
    pub output_mode: OutputMode,
    pub config: LexigraphConfig,
    pub config_path: PathBuf,
}

impl Context {
    pub fn database_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.config.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| config::default_database_path_in(Path::new(".")))
    }

    pub fn open_store(&self, flag: Option<PathBuf>) -> anyhow::Result<SqliteStore> {
        let path = self.database_path(flag);
        config::ensure_db_dir(&path)?;
        tracing::debug!("Using database {}", path.display());
        Ok(SqliteStore::open_with_timeout(&path, self.config.busy_timeout())?)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(Some(&config_path))?.unwrap_or_default();
    let ctx = Context {
        output_mode: if cli.json { OutputMode::Json } else { OutputMode::Human },
        config,
        config_path,
    };

    let result = match cli.command {
        Commands::Init { database, force } => commands::run_init(&ctx, database, force),
        Commands::Ingest { corpus, database, shards, strict, fresh } => {
            commands::run_ingest(&ctx, commands::IngestArgs { corpus, database, shards, strict, fresh })
        }
        Commands::Stats { database } => commands::run_stats(&ctx, database),
        Commands::Show { title, database } => commands::run_show(&ctx, &title, database),
        Commands::Pending { name, database } => commands::run_pending(&ctx, name.as_deref(), database),
        Commands::Transfer { name, kind, database } => commands::run_transfer(&ctx, &name, &kind, database),
        Commands::Delete { title, database } => commands::run_delete(&ctx, &title, database),
        Commands::Version => commands::run_version(ctx.output_mode),
    };

    if let Err(e) = &result {
        match ctx.output_mode {
            OutputMode::Human => lexigraph::ui::error(&format!("{:#}", e)),
            OutputMode::Json => {
                let envelope = serde_json::json!({
                    "ok": false,
                    "error": format!("{:#}", e),
                });
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            }
        }
        std::process::exit(1);
    }
    Ok(())
}
