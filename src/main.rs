//! quizcache - offline-first storage and caching core for a quiz app.
//!
//! The binary is a thin CLI over the storage layer: export/import bundles,
//! backup/restore, text ingestion, cache install, and a stats view. All quiz
//! UI lives elsewhere and talks to the same repositories.

mod app;
mod cache;
mod config;
mod import_export;
mod models;
mod repo;
mod store;
mod utils;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::AppContext;
use cache::{CacheConfig, CacheController, CacheStorage, HttpFetcher, SyncQueue};
use import_export::ImportOptions;
use repo::SearchFilters;
use utils::format_bytes;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Set up logging with environment-based filter
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("quizcache starting");

    let config = config::Config::load()?;
    let ctx = AppContext::new(&config)?;

    let evicted = ctx.run_startup_eviction()?;
    if evicted > 0 {
        eprintln!("Evicted {} stale history entries", evicted);
    }

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None | Some("--stats") => print_stats(&ctx),
        Some("--export") => export(&ctx, &args[2..]),
        Some("--import") => import(&ctx, &args[2..]),
        Some("--import-text") => import_text(&ctx, &args[2..]),
        Some("--backup") => backup(&ctx, &args[2..]),
        Some("--restore") => restore(&ctx, &args[2..]),
        Some("--search") => search(&ctx, &args[2..]),
        Some("--delete-question") => delete_question(&ctx, &args[2..]),
        Some("--clear-history") => clear_history(&ctx),
        Some("--install-cache") => install_cache(&ctx, &config).await,
        Some("--sync") => drain_sync(&ctx).await,
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            eprintln!(
                "Usage: quizcache [--stats | --export <file> [--history] | --import <file> | \
                 --import-text <file> | --backup <file> | --restore <file> | --search <query> | \
                 --delete-question <id> | --clear-history | --install-cache | --sync]"
            );
            std::process::exit(2);
        }
    }
}

fn print_stats(ctx: &AppContext) -> Result<()> {
    let usage = ctx.store.usage();
    let stats = ctx.history.aggregate();

    println!("Questions:    {}", ctx.questions.get_all().len());
    println!("Collections:  {}", ctx.collections.get_all().len());
    println!("Quiz runs:    {}", stats.total_quizzes);
    println!("Imports:      {}", ctx.engine.import_log().len());
    if stats.total_quizzes > 0 {
        println!("Average:      {:.1}%", stats.average_score);
        println!("Best:         {:.1}%", stats.best_score);
    }
    println!("Storage used: {}", format_bytes(usage.total_bytes));
    for (key, size) in &usage.entries {
        println!("  {:<16} {}", key, format_bytes(*size));
    }
    Ok(())
}

fn export(ctx: &AppContext, args: &[String]) -> Result<()> {
    let path = args.first().context("--export requires a file path")?;
    let include_history = args.iter().any(|a| a == "--history");

    let bundle = ctx.engine.export_bundle(include_history);
    let contents = serde_json::to_string_pretty(&bundle)?;
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path))?;
    println!("Exported {} questions to {}", bundle.questions.len(), path);
    Ok(())
}

fn import(ctx: &AppContext, args: &[String]) -> Result<()> {
    let path = args.first().context("--import requires a file path")?;
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let bundle: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", path))?;

    let outcome = ctx.engine.import_bundle(&bundle, &ImportOptions::default());
    println!("Imported {} questions", outcome.imported_count);
    if let Some(error) = outcome.error {
        eprintln!("Warning: {}", error);
    }
    Ok(())
}

fn import_text(ctx: &AppContext, args: &[String]) -> Result<()> {
    let path = args.first().context("--import-text requires a file path")?;
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;

    let mut count = 0;
    for question in import_export::parse_questions(&raw) {
        let problems = models::validate_question(&question);
        if !problems.is_empty() {
            eprintln!("Skipping '{}': {}", question.text, problems.join("; "));
            continue;
        }
        ctx.questions.save(question)?;
        count += 1;
    }
    println!("Imported {} questions from text", count);
    Ok(())
}

fn backup(ctx: &AppContext, args: &[String]) -> Result<()> {
    let path = args.first().context("--backup requires a file path")?;
    let bundle = ctx.engine.create_backup();
    let contents = serde_json::to_string_pretty(&bundle)?;
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path))?;
    println!("Backup written to {}", path);
    Ok(())
}

fn restore(ctx: &AppContext, args: &[String]) -> Result<()> {
    let path = args.first().context("--restore requires a file path")?;
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let bundle: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", path))?;

    let outcome = ctx.engine.restore_backup(&bundle);
    if outcome.success {
        println!("Restore complete");
    } else {
        eprintln!(
            "Restore failed: {}",
            outcome.error.unwrap_or_else(|| "unknown error".to_string())
        );
        std::process::exit(1);
    }
    Ok(())
}

fn search(ctx: &AppContext, args: &[String]) -> Result<()> {
    let query = args.first().context("--search requires a query")?;
    let hits = ctx.questions.search(query, &SearchFilters::default());
    for question in &hits {
        println!(
            "{}  [{}/{}]  {}",
            question.id.as_deref().unwrap_or("-"),
            question.difficulty,
            question.question_type,
            question.text
        );
    }
    println!("{} match(es)", hits.len());
    Ok(())
}

fn delete_question(ctx: &AppContext, args: &[String]) -> Result<()> {
    let id = args.first().context("--delete-question requires an id")?;
    if ctx.questions.delete(id)? {
        println!("Deleted {}", id);
    } else {
        println!("No question with id {}", id);
    }
    Ok(())
}

fn clear_history(ctx: &AppContext) -> Result<()> {
    ctx.history.clear()?;
    println!("Quiz history cleared");
    Ok(())
}

/// Precache the app shell and activate the new generation
async fn install_cache(ctx: &AppContext, config: &config::Config) -> Result<()> {
    let storage = Arc::new(CacheStorage::new(config.cache_dir()?)?);
    let fetcher = Arc::new(HttpFetcher::new()?);
    let sync = Arc::new(SyncQueue::new(ctx.store.clone(), fetcher.clone()));
    let controller = CacheController::new(CacheConfig::default(), storage, fetcher, sync);

    controller.install().await.context("Cache install failed")?;
    controller.activate()?;
    println!("Cache installed and activated");
    Ok(())
}

/// Replay all queued offline mutations
async fn drain_sync(ctx: &AppContext) -> Result<()> {
    let fetcher = Arc::new(HttpFetcher::new()?);
    let sync = SyncQueue::new(ctx.store.clone(), fetcher);

    let pending = sync.pending(None).len();
    let delivered = sync.drain_all().await?;
    println!("Replayed {}/{} queued requests", delivered, pending);
    Ok(())
}
