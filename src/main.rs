//! # Agro Pulse
//!
//! A live agricultural news dashboard. Four categories of feeds are polled on
//! a staggered schedule, converted from RSS through a feed-to-JSON service,
//! translated into Ukrainian, and projected into a dashboard snapshot.
//!
//! ## Features
//!
//! - Per-category random feed selection with canned fallback articles
//! - Best-effort translation that never blocks or fails a refresh
//! - Category, hot, ticker and sentiment projections
//! - JSON snapshot output, with an optional Markdown page
//!
//! ## Usage
//!
//! ```sh
//! agro_pulse -j ./json -m ./markdown
//! ```
//!
//! ## Architecture
//!
//! 1. **Scheduling**: one repeating task per category, offset by a stagger
//! 2. **Fetching**: pick a feed, request it, normalize up to ten items
//! 3. **Translation**: title and summary of every item, concurrently
//! 4. **Rendering**: project the store into views and write the outputs
//!
//! Everything runs on a single thread inside a `LocalSet`.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::rc::Rc;
use tokio::task::LocalSet;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod registry;
mod render;
mod scheduler;
mod sentiment;
mod store;
mod translate;
mod utils;
mod views;

use cli::Cli;
use fetcher::{FeedFetcher, Rss2JsonEndpoint};
use pipeline::CategoryPipeline;
use registry::SourceRegistry;
use render::SnapshotRenderer;
use store::Store;
use translate::{MyMemoryApi, Translator};
use utils::ensure_writable_dir;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("agro_pulse starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Early check: output dirs must be writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    if let Some(dir) = &args.markdown_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Markdown output directory is not writable");
            return Err(e);
        }
    }

    // ---- Sources ----
    let now = Utc::now();
    let registry = match &args.sources {
        Some(path) => SourceRegistry::from_yaml_file(path, now).inspect_err(|e| {
            error!(path = %path, error = %e, "Failed to load source registry");
        })?,
        None => SourceRegistry::builtin(now),
    };
    let registry = Rc::new(registry);
    let categories = registry.categories();
    info!(categories = categories.len(), "Source registry loaded");

    // ---- Clients ----
    let client = reqwest::Client::builder()
        .user_agent(concat!("agro_pulse/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let fetcher = FeedFetcher::new(
        Rss2JsonEndpoint::new(client.clone(), args.feed_endpoint.clone()),
        Rc::clone(&registry),
    );
    let translator = Translator::new(MyMemoryApi::new(
        client,
        args.translate_endpoint.clone(),
        args.langpair.clone(),
    ));
    let renderer = SnapshotRenderer::new(args.json_output_dir.clone(), args.markdown_output_dir.clone());

    let store = Rc::new(Store::new());
    let pipeline = Rc::new(CategoryPipeline::new(
        fetcher,
        translator,
        renderer,
        Rc::clone(&store),
        Rc::clone(&registry),
    ));
    let schedule = args.schedule();

    LocalSet::new()
        .run_until(async {
            if args.once {
                scheduler::run_cycle(&*pipeline, &store, &categories, schedule).await;
                return Ok::<(), Box<dyn Error>>(());
            }

            let tasks = scheduler::spawn_schedule(
                Rc::clone(&pipeline),
                Rc::clone(&store),
                &categories,
                schedule,
            );
            info!(
                tasks = tasks.len(),
                interval_secs = schedule.interval.as_secs(),
                "Scheduler running; press Ctrl-C to stop"
            );
            tokio::signal::ctrl_c().await?;
            info!("Shutdown requested");
            for task in tasks {
                task.abort();
            }
            Ok(())
        })
        .await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        log_entries = store.log_entries().len(),
        "Execution complete"
    );

    Ok(())
}
