use crate::config::WriterConfig;
use chunkfeed::memory::MemoryDataset;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// How many edits of each kind a writer made.
#[derive(Debug, Default, Clone, Copy)]
pub struct WriterStats {
    pub added: usize,
    pub inserted: usize,
    pub completed: usize,
    pub deleted: usize,
}

/// Edits the todo list at a fixed pace until `shutdown` is cancelled.
///
/// Each tick does one of the following:
///
/// - deletes a random todo (with probability `delete_ratio`);
/// - marks a random todo as done;
/// - inserts a todo right after a random existing one, inside whatever page
///   it belongs to;
/// - appends a todo at the end of the list, past every loaded page.
pub async fn writer_loop(
    writer_id: usize,
    dataset: MemoryDataset,
    config: WriterConfig,
    shutdown: CancellationToken,
) -> WriterStats {
    #[cfg(feature = "tracing")]
    tracing::trace!("Writer {writer_id} started");

    let mut rng = StdRng::from_rng(&mut rand::rng());
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut stats = WriterStats::default();
    let mut next = 0_usize;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let docs = dataset.documents();
        let Some(target) = docs.choose(&mut rng) else {
            dataset.add(format!("w{writer_id}: todo {next}"));
            next += 1;
            stats.added += 1;
            continue;
        };

        if rng.random_bool(config.delete_ratio) {
            dataset.delete(target.id);
            stats.deleted += 1;
        } else if rng.random_bool(0.3) && !target.body.ends_with(" [done]") {
            dataset.update(target.id, format!("{} [done]", target.body));
            stats.completed += 1;
        } else if rng.random_bool(0.5) {
            dataset.insert_at(target.rank, format!("w{writer_id}: todo {next}"));
            next += 1;
            stats.inserted += 1;
        } else {
            dataset.add(format!("w{writer_id}: todo {next}"));
            next += 1;
            stats.added += 1;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Writer {writer_id} stopped: {stats:?}");
    stats
}
