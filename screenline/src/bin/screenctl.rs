// screenctl — demo CLI for the screening engine.
//
// Four operational subcommands mirroring the public engine API (§6):
//   screen  — run one piece of text through the full pipeline
//   batch   — run every line of a file through the pipeline
//   reload  — replace or overlay the watchlist from a JSON doc file
//   stats   — print accumulated processing stats
//   health  — print a health snapshot
//
// Usage:
//   screenctl screen --text "Petro Poroshenko" --watchlist watchlist.json
//   screenctl batch --path names.txt --watchlist watchlist.json
//   screenctl stats --watchlist watchlist.json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use screenline::config::EngineConfig;
use screenline::types::WatchlistDoc;
use screenline::{Engine, ProcessingOptions};

#[derive(Parser)]
#[command(
    name    = "screenctl",
    about   = "Sanctions-screening and name-matching engine CLI",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "JSON array of watchlist docs to load at startup")]
    watchlist: Option<PathBuf>,

    #[arg(long, global = true, help = "Engine config JSON file")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    Screen {
        #[arg(long)]
        text: String,
    },
    Batch {
        #[arg(long)]
        path: PathBuf,
    },
    Reload {
        #[arg(long)]
        docs: PathBuf,
        #[arg(long, help = "Merge into the existing watchlist instead of replacing it")]
        overlay: bool,
    },
    Stats,
    Health,
}

fn load_watchlist(path: &Option<PathBuf>) -> Result<Vec<WatchlistDoc>> {
    match path {
        None => Ok(Vec::new()),
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading watchlist file {}", p.display()))?;
            let docs: Vec<WatchlistDoc> = serde_json::from_str(&text)
                .with_context(|| format!("parsing watchlist JSON {}", p.display()))?;
            Ok(docs)
        }
    }
}

fn print_result(result: &screenline::UnifiedProcessingResult) {
    println!("language     : {} ({:.2})", result.language, result.language_confidence);
    println!("normalized   : {}", result.normalized_text);
    if let Some(screening) = &result.screening {
        println!("risk level   : {}", screening.risk_level);
        println!("confidence   : {:.3}", screening.final_confidence);
        println!("early stopped: {}", screening.early_stopped);
        for c in screening.candidates.iter().take(5) {
            println!("  candidate  : {} ({:.3}) {:?}", c.name, c.confidence, c.reason_codes);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("screenline=info".parse()?))
        .compact()
        .init();

    let cli = Cli::parse();
    let docs = load_watchlist(&cli.watchlist)?;
    let config = match &cli.config {
        Some(p) => EngineConfig::load(Some(p)),
        None => EngineConfig::load(None),
    };
    let max_concurrent = config.max_concurrent;
    let engine = std::sync::Arc::new(Engine::new(config, docs));
    engine.spawn_pressure_monitor();

    match cli.command {
        Command::Screen { text } => {
            let result = engine.process(&text, &ProcessingOptions::default())?;
            print_result(&result);
        }
        Command::Batch { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading batch file {}", path.display()))?;
            let lines: Vec<String> = text.lines().map(str::to_string).filter(|l| !l.trim().is_empty()).collect();
            let results = engine.process_batch_async(&lines, &ProcessingOptions::default(), max_concurrent).await;
            for (line, result) in lines.iter().zip(results) {
                println!("\n--- {line} ---");
                match result {
                    Ok(r) => print_result(&r),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
        }
        Command::Reload { docs, overlay } => {
            let new_docs = load_watchlist(&Some(docs))?;
            let status = engine.reload_watchlist(new_docs, overlay);
            println!("watchlist reloaded: version={} docs={} patterns={}", status.version, status.doc_count, status.pattern_count);
        }
        Command::Stats => {
            let stats = engine.get_processing_stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Health => {
            let health = engine.health_check();
            println!("healthy={} docs={} version={} cache_len={}", health.healthy, health.watchlist_docs, health.watchlist_version, health.cache_len);
        }
    }

    Ok(())
}
