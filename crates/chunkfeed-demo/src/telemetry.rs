//! Console logging for the demo.
//!
//! Logs go through a `tracing_subscriber` registry filtered by `RUST_LOG`
//! (`info` when unset). With the `tracing` feature, the collection loop inside
//! `chunkfeed` logs through the same subscriber; `RUST_LOG=chunkfeed=debug`
//! shows every chunk subscription and detach.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .with_writer(std::io::stderr)
                .pretty(),
        )
        .try_init()?;

    Ok(())
}
