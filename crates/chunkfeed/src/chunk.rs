//! Live range subscriptions, one per chunk.
//!
//! A chunk covers the documents in `(lower, upper]` of the dataset's forward
//! order, where `upper` is the boundary its page resolved to and `lower` is
//! the boundary before it (absent for the first chunk). The range is watched
//! through the *reverse* query, starting at `upper` and ending before
//! `lower`, so the result set stays anchored at the page boundary no matter
//! how many documents arrive past it.
//!
//! Every push carries the full contents of the range; consumers replace the
//! chunk's snapshot rather than patching it.

use crate::{Dataset, DatasetError, ListenerRegistration, QuerySpec};

/// The fixed bounds of a chunk in forward order: `lower` exclusive, `upper`
/// inclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkRange<D> {
    pub lower: Option<D>,
    pub upper: D,
}

impl<D: Clone> ChunkRange<D> {
    pub const fn new(lower: Option<D>, upper: D) -> Self {
        Self { lower, upper }
    }

    /// The reverse-ordered live query covering this range.
    pub fn spec<Q>(&self, reverse: Q) -> QuerySpec<Q, D> {
        let spec = QuerySpec::new(reverse).start_at(self.upper.clone());
        match &self.lower {
            Some(lower) => spec.end_before(lower.clone()),
            None => spec,
        }
    }
}

/// An open live subscription over one chunk's range.
#[derive(Debug)]
pub struct ChunkSubscription {
    registration: ListenerRegistration,
}

impl ChunkSubscription {
    /// Detaches the listener. Safe to call any number of times; returns
    /// `true` only when this call closed it.
    pub fn close(&mut self) -> bool {
        self.registration.remove()
    }

    pub const fn is_open(&self) -> bool {
        self.registration.is_active()
    }
}

/// Opens the live range subscription for `range`.
///
/// `on_update` receives the full snapshot of the range, in reverse order,
/// on every push. `on_error` receives listener failures; the listener is not
/// closed because of them.
pub fn open_chunk_subscription<DS, U, E>(
    dataset: &DS,
    reverse: DS::Query,
    range: &ChunkRange<DS::Doc>,
    on_update: U,
    on_error: E,
) -> ChunkSubscription
where
    DS: Dataset,
    U: Fn(Vec<DS::Doc>) + Send + Sync + 'static,
    E: Fn(DatasetError) + Send + Sync + 'static,
{
    let registration = dataset.on_snapshot(
        range.spec(reverse),
        Box::new(move |snapshot| match snapshot {
            Ok(docs) => on_update(docs),
            Err(e) => on_error(e),
        }),
    );
    ChunkSubscription { registration }
}

/// Owns the subscription of every chunk, keyed by chunk index.
///
/// A slot holds at most one subscription. Installing into an occupied slot
/// closes the previous subscription before the new one is stored.
#[derive(Debug, Default)]
pub struct ChunkSlots {
    slots: Vec<Option<ChunkSubscription>>,
}

impl ChunkSlots {
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Stores `subscription` for chunk `index`. Returns `true` if a previous
    /// subscription was closed to make room.
    pub fn install(&mut self, index: usize, subscription: ChunkSubscription) -> bool {
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        let replaced = match self.slots[index].take() {
            Some(mut previous) => previous.close(),
            None => false,
        };
        self.slots[index] = Some(subscription);
        replaced
    }

    /// Closes the subscription of chunk `index`, if any.
    pub fn close(&mut self, index: usize) -> bool {
        self.slots
            .get_mut(index)
            .and_then(Option::take)
            .is_some_and(|mut subscription| subscription.close())
    }

    /// Closes every subscription and empties the registry. Returns how many
    /// were open.
    pub fn close_all(&mut self) -> usize {
        self.slots
            .drain(..)
            .flatten()
            .filter_map(|mut subscription| subscription.close().then_some(()))
            .count()
    }

    pub fn open_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|subscription| subscription.is_open())
            .count()
    }
}
