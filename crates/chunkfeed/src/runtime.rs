//! The event loop behind a [`Collection`](crate::Collection).
//!
//! Each collection runs on its own task. Caller commands and asynchronous
//! completions (fetch results, listener pushes) arrive on two channels and
//! are applied to the [`CollectionState`] one at a time, in arrival order.
//! Commands are polled first so a `close` is never starved by a busy
//! dataset.
//!
//! The [`EffectRunner`] is the only place that touches the dataset. It owns
//! every live handle: one subscription per chunk, the availability probe, and
//! the boundary fetch in flight.

use crate::{
    ChunkSlots, CollectionParams, CollectionState, Dataset, Effect, Event, ProbeSlot, View,
    fetch_next_boundary, open_chunk_subscription, watch_availability,
};
use std::{collections::VecDeque, sync::Arc};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::AbortHandle,
};

/// Requests sent by a [`Collection`](crate::Collection) handle to its loop.
pub(crate) enum Command<Q> {
    LoadMore,
    Reset(CollectionParams<Q>),
    /// Detach everything and stop, acknowledging on `response` once every
    /// handle has been released.
    Close { response: oneshot::Sender<()> },
}

type DatasetEvent<DS> = Event<<DS as Dataset>::Query, <DS as Dataset>::Doc>;
type DatasetEffect<DS> = Effect<<DS as Dataset>::Query, <DS as Dataset>::Doc>;
type DatasetState<DS> = CollectionState<<DS as Dataset>::Query, <DS as Dataset>::Doc>;

/// Executes [`Effect`]s against a dataset and feeds completions back as
/// [`Event`]s.
pub(crate) struct EffectRunner<DS: Dataset> {
    dataset: Arc<DS>,
    events: mpsc::UnboundedSender<DatasetEvent<DS>>,
    chunks: ChunkSlots,
    probe: ProbeSlot,
    resolving: Option<AbortHandle>,
}

impl<DS: Dataset> EffectRunner<DS> {
    pub(crate) const fn new(
        dataset: Arc<DS>,
        events: mpsc::UnboundedSender<DatasetEvent<DS>>,
    ) -> Self {
        Self {
            dataset,
            events,
            chunks: ChunkSlots::new(),
            probe: ProbeSlot::new(),
            resolving: None,
        }
    }

    /// Reduces `event` and executes everything it causes, including events
    /// the effects themselves produce synchronously.
    pub(crate) fn dispatch(&mut self, state: &mut DatasetState<DS>, event: DatasetEvent<DS>) {
        let effects = state.reduce(event);
        self.execute(state, effects);
    }

    pub(crate) fn execute(&mut self, state: &mut DatasetState<DS>, effects: Vec<DatasetEffect<DS>>) {
        let mut pending: VecDeque<_> = effects
            .into_iter()
            .filter_map(|effect| self.run(effect))
            .collect();

        while let Some(event) = pending.pop_front() {
            for effect in state.reduce(event) {
                if let Some(follow_up) = self.run(effect) {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    /// Executes one effect. Returns the event to apply immediately, if the
    /// effect completed synchronously.
    fn run(&mut self, effect: DatasetEffect<DS>) -> Option<DatasetEvent<DS>> {
        match effect {
            Effect::Resolve {
                ticket,
                forward,
                after,
                size,
            } => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Resolving boundary {ticket} (size {size})");

                let dataset = Arc::clone(&self.dataset);
                let events = self.events.clone();
                let task = tokio::spawn(async move {
                    let result = fetch_next_boundary(&*dataset, forward, after, size).await;
                    if events.send(Event::Resolved { ticket, result }).is_err() {
                        #[cfg(feature = "tracing")]
                        tracing::trace!("Boundary {ticket} resolved after the loop stopped");
                    }
                });
                if let Some(previous) = self.resolving.replace(task.abort_handle()) {
                    previous.abort();
                }
                None
            }
            Effect::OpenChunk {
                index,
                ticket,
                reverse,
                range,
            } => {
                let updates = self.events.clone();
                let errors = self.events.clone();
                let subscription = open_chunk_subscription(
                    &*self.dataset,
                    reverse,
                    &range,
                    move |docs| {
                        let _ = updates.send(Event::ChunkSnapshot {
                            index,
                            ticket,
                            result: Ok(docs),
                        });
                    },
                    move |error| {
                        let _ = errors.send(Event::ChunkSnapshot {
                            index,
                            ticket,
                            result: Err(error),
                        });
                    },
                );

                let _replaced = self.chunks.install(index, subscription);
                #[cfg(feature = "tracing")]
                {
                    if _replaced {
                        tracing::warn!("Chunk {index} was still subscribed; closed the old listener");
                    } else {
                        tracing::debug!("Chunk {index} subscribed ({ticket})");
                    }
                }

                Some(Event::Attached { index, ticket })
            }
            Effect::Watch {
                ticket,
                forward,
                after,
            } => {
                let dataset = &*self.dataset;
                let events = self.events.clone();
                self.probe.replace(|| {
                    watch_availability(dataset, forward, after, move |result| {
                        let _ = events.send(Event::Availability { ticket, result });
                    })
                });
                None
            }
            Effect::DetachAll => {
                if let Some(task) = self.resolving.take() {
                    task.abort();
                }
                let _chunks = self.chunks.close_all();
                let _probe = self.probe.close();

                #[cfg(feature = "tracing")]
                tracing::debug!("Detached {_chunks} chunk subscription(s), probe open: {_probe}");
                None
            }
        }
    }
}

/// Drives one collection until it is closed or its handle is dropped.
///
/// The current [`View`] is published on `view` after every applied command
/// or event.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub(crate) async fn run_collection<DS: Dataset>(
    dataset: Arc<DS>,
    params: CollectionParams<DS::Query>,
    mut commands: mpsc::UnboundedReceiver<Command<DS::Query>>,
    view: watch::Sender<View<DS::Doc>>,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Collection loop started");

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let mut runner = EffectRunner::new(dataset, events_tx);
    let (mut state, effects) = CollectionState::initialize(params);
    runner.execute(&mut state, effects);
    view.send_replace(state.view());

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(Command::LoadMore) => runner.dispatch(&mut state, Event::LoadMore),
                Some(Command::Reset(params)) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Resetting collection");
                    runner.dispatch(&mut state, Event::Reset(params));
                }
                Some(Command::Close { response }) => {
                    runner.dispatch(&mut state, Event::Detach);
                    view.send_replace(state.view());

                    if response.send(()).is_err() {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Close was requested but nobody awaited the acknowledgement");
                    }
                    break;
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Collection handle dropped; detaching");
                    runner.dispatch(&mut state, Event::Detach);
                    view.send_replace(state.view());
                    break;
                }
            },
            Some(event) = events.recv() => runner.dispatch(&mut state, event),
        }

        view.send_replace(state.view());
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Collection loop stopped");
}
