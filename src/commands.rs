use crate::{Context, OutputMode, emit_success};
use lexigraph::config::{self, LexigraphConfig};
use lexigraph::ingest::{IngestDriver, IngestOptions};
use lexigraph::ui::{self, Icons};
use lexigraph::{DeferredResolver, RecordId, RelationKind, SqliteStore};
use owo_colors::OwoColorize;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::time::Instant;

pub fn run_version(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        println!(
            "{} {}",
            "Lexigraph".bold().style(ui::theme().accent.clone()),
            env!("CARGO_PKG_VERSION").bold()
        );
    } else {
        let data = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        });
        emit_success(output_mode, "version", data)?;
    }
    Ok(())
}

pub fn run_init(ctx: &Context, database: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let database = ctx.database_path(database);
    let config = LexigraphConfig {
        database: Some(database.display().to_string()),
        ..ctx.config.clone()
    };
    config::write_config(&ctx.config_path, &config, force)?;
    ctx.open_store(Some(database.clone()))?;

    if ctx.output_mode.is_human() {
        ui::success(&format!("Wrote {}", ctx.config_path.display()));
        ui::status(Icons::DATABASE, "Database", &database.display().to_string());
    } else {
        emit_success(ctx.output_mode, "init", serde_json::to_value(&config)?)?;
    }
    Ok(())
}

pub struct IngestArgs {
    pub corpus: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub shards: Option<usize>,
    pub strict: bool,
    pub fresh: bool,
}

pub fn run_ingest(ctx: &Context, args: IngestArgs) -> anyhow::Result<()> {
    let corpus = args
        .corpus
        .or_else(|| ctx.config.corpus.as_ref().map(PathBuf::from))
        .ok_or_else(|| anyhow::anyhow!("no corpus given (use --corpus or set `corpus` in the config)"))?;
    let options = IngestOptions {
        strict: args.strict || ctx.config.strict.unwrap_or(false),
        shards: args.shards.or(ctx.config.shards).unwrap_or(1),
    };
    if options.strict && options.shards > 1 {
        ui::warn("--strict ingests in corpus order; ignoring --shards");
    }

    let store = ctx.open_store(args.database)?;
    if args.fresh {
        store.clear_all()?;
        tracing::info!("Cleared database before ingestion");
    }

    if ctx.output_mode.is_human() {
        ui::header(&format!("Ingesting {}", corpus.display()));
        ui::info("Shards", &options.effective_shards().to_string());
    }

    let started = Instant::now();
    let (mut progress, tx) = ui::IngestProgress::new();
    let driver = IngestDriver::new(DeferredResolver::new(&store), options).with_progress(tx);

    let result = if corpus.as_os_str() == "-" {
        driver.ingest(io::stdin().lock())
    } else {
        let file = File::open(&corpus)
            .map_err(|e| anyhow::anyhow!("cannot open corpus {}: {}", corpus.display(), e))?;
        driver.ingest(BufReader::new(file))
    };
    drop(driver);
    progress.join();
    let stats = result?;

    let db_stats = store.stats()?;
    if ctx.output_mode.is_human() {
        progress.finish_with_summary(started.elapsed(), stats.entries, db_stats.relations, db_stats.pending);
        println!();
        print!("{}", stats);
        for failure in stats.failures.iter().take(10) {
            ui::warn(&format!(
                "line {} ({}): {}",
                failure.line,
                failure.title.as_deref().unwrap_or("?"),
                failure.reason
            ));
        }
        if stats.failures.len() > 10 {
            ui::warn(&format!("... and {} more skipped entries", stats.failures.len() - 10));
        }
    } else {
        progress.clear();
        let data = serde_json::json!({
            "ingest": stats,
            "database": db_stats,
        });
        emit_success(ctx.output_mode, "ingest", data)?;
    }
    Ok(())
}

pub fn run_stats(ctx: &Context, database: Option<PathBuf>) -> anyhow::Result<()> {
    let store = ctx.open_store(database)?;
    let stats = store.stats()?;

    if ctx.output_mode.is_human() {
        ui::section(&format!("{} Lexigraph Statistics", Icons::STATS));
        println!("{}", ui::stats_table(&stats));
    } else {
        emit_success(ctx.output_mode, "stats", serde_json::to_value(&stats)?)?;
    }
    Ok(())
}

pub fn run_show(ctx: &Context, title: &str, database: Option<PathBuf>) -> anyhow::Result<()> {
    let store = ctx.open_store(database)?;
    let record = store
        .find(title)?
        .ok_or_else(|| lexigraph::Error::RecordNotFound(title.to_string()))?;
    let outgoing = store.relations_from(record.id)?;
    let incoming = store.relations_to(record.id)?;

    if !ctx.output_mode.is_human() {
        let data = serde_json::json!({
            "record": record,
            "outgoing": outgoing,
            "incoming": incoming,
        });
        return emit_success(ctx.output_mode, "show", data);
    }

    println!("{}", ui::record_line(&record));
    if let Some(content) = &record.content {
        println!("  {}", content);
    }

    let title_of = |id: RecordId| -> anyhow::Result<String> {
        Ok(store.get(id)?.map(|r| ui::record_line(&r)).unwrap_or_else(|| id.to_string()))
    };

    if !outgoing.is_empty() {
        ui::section("Outgoing");
        for relation in &outgoing {
            println!("  {} {} {}", Icons::RIGHT, ui::dim(relation.kind.as_str()), title_of(relation.destination)?);
        }
    }
    if !incoming.is_empty() {
        ui::section("Incoming");
        for relation in &incoming {
            println!("  {} {} {}", Icons::LEFT, ui::dim(relation.kind.as_str()), title_of(relation.source)?);
        }
    }
    Ok(())
}

pub fn run_pending(ctx: &Context, name: Option<&str>, database: Option<PathBuf>) -> anyhow::Result<()> {
    let store = ctx.open_store(database)?;
    let resolver = DeferredResolver::new(&store);
    let index = resolver.pending();

    match name {
        Some(name) => {
            let entries = index.entries_for(name)?;
            if !ctx.output_mode.is_human() {
                return emit_success(ctx.output_mode, "pending", serde_json::to_value(&entries)?);
            }
            if entries.is_empty() {
                ui::success(&format!("Nothing is waiting on '{}'", name));
            } else {
                println!("{}", ui::pending_table(&entries));
            }
        }
        None => {
            let names = index.names()?;
            if !ctx.output_mode.is_human() {
                let data: Vec<_> = names
                    .iter()
                    .map(|(name, count)| serde_json::json!({ "name": name, "referencers": count }))
                    .collect();
                return emit_success(ctx.output_mode, "pending", serde_json::Value::Array(data));
            }
            if names.is_empty() {
                ui::success("No pending references.");
            }
            for (name, count) in &names {
                ui::pending_name(name, *count);
            }
        }
    }
    Ok(())
}

pub fn run_transfer(ctx: &Context, name: &str, kind: &str, database: Option<PathBuf>) -> anyhow::Result<()> {
    let kind: RelationKind = kind.parse()?;
    let store = ctx.open_store(database)?;
    let resolver = DeferredResolver::new(&store);

    let started = Instant::now();
    let spinner = ui::Spinner::new(&format!("Transferring '{}'...", name));
    let outcome = resolver.resolve_by_title(name, kind);
    spinner.finish_and_clear();
    let outcome = outcome?;

    if ctx.output_mode.is_human() {
        if outcome.is_noop() {
            ui::success(&format!("Nothing was pending on '{}'", name));
        } else {
            ui::success(&format!("Linked {} referencer(s) to '{}' as {}", outcome.linked, name, kind));
        }
        ui::timing(&format!("{:.2?}", started.elapsed()));
    } else {
        emit_success(ctx.output_mode, "transfer", serde_json::to_value(&outcome)?)?;
    }
    Ok(())
}

pub fn run_delete(ctx: &Context, title: &str, database: Option<PathBuf>) -> anyhow::Result<()> {
    let store: SqliteStore = ctx.open_store(database)?;
    let resolver = DeferredResolver::new(&store);

    let deleted = match store.find(title)? {
        Some(record) => resolver.delete(&record)?,
        None => false,
    };

    if ctx.output_mode.is_human() {
        if deleted {
            println!("{} Deleted '{}'", Icons::DEL, title);
        } else {
            ui::info("Nothing to delete", title);
        }
    } else {
        emit_success(ctx.output_mode, "delete", serde_json::json!({ "title": title, "deleted": deleted }))?;
    }
    Ok(())
}
