#![doc = include_str!("../README.md")]

mod config;
mod render;
mod telemetry;
mod writer;

use chunkfeed::{Collection, CollectionParams, memory::MemoryDataset};
use clap::Parser;
use config::{CliArgs, DemoConfig};
use render::render_loop;
use std::sync::Arc;
use telemetry::init_telemetry;
use tokio::{signal, time::sleep};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use writer::{WriterStats, writer_loop};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let dataset = MemoryDataset::new();
    for i in 0..config.seed_docs {
        dataset.add(format!("seed: todo {i}"));
    }

    let collection = Collection::open(
        Arc::new(dataset.clone()),
        CollectionParams::by_rank(config.page_size),
    )?;
    let shutdown = CancellationToken::new();

    let renderer = tokio::spawn(render_loop(
        WatchStream::new(collection.subscribe()),
        config.json,
        shutdown.clone(),
    ));
    let writers: Vec<_> = (0..config.num_writers)
        .map(|writer_id| {
            tokio::spawn(writer_loop(
                writer_id,
                dataset.clone(),
                config.writer,
                shutdown.clone(),
            ))
        })
        .collect();

    tokio::select! {
        result = load_rounds(&collection, &config) => result?,
        () = shutdown_signal() => {}
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Stopping writers");
    shutdown.cancel();

    let mut totals = WriterStats::default();
    for writer in writers {
        let stats = writer.await?;
        totals.added += stats.added;
        totals.inserted += stats.inserted;
        totals.completed += stats.completed;
        totals.deleted += stats.deleted;
    }

    let last = collection.view();
    collection.close().await?;
    renderer.await?;

    println!(
        "Writers: {} added, {} inserted, {} completed, {} deleted",
        totals.added, totals.inserted, totals.completed, totals.deleted
    );
    println!(
        "Loaded {} of {} todos in {} chunk(s), has_more: {}",
        last.docs.len(),
        dataset.len(),
        last.chunk_count,
        last.has_more
    );
    println!(
        "Listeners opened: {}, closed: {}, still active: {}",
        dataset.listeners_opened(),
        dataset.listeners_closed(),
        dataset.active_listeners()
    );

    if dataset.active_listeners() != 0 {
        anyhow::bail!(
            "{} listener(s) still attached after close",
            dataset.active_listeners()
        );
    }

    Ok(())
}

/// Asks for one more page every `load_interval`, `load_rounds` times, then
/// waits one more interval so the last page can settle on screen.
async fn load_rounds(
    collection: &Collection<MemoryDataset>,
    config: &DemoConfig,
) -> anyhow::Result<()> {
    for _round in 0..config.load_rounds {
        sleep(config.load_interval).await;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Round {}/{}: load_more (has_more: {})",
            _round + 1,
            config.load_rounds,
            collection.has_more()
        );
        collection.load_more()?;
    }

    sleep(config.load_interval).await;
    Ok(())
}

fn log_startup_info(_config: &DemoConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting demo with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting demo with page size {} and {} writer(s)",
            _config.page_size,
            _config.num_writers
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to install SIGTERM handler: {_e}");
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to install Ctrl+C handler: {_e}");
            core::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }
}
