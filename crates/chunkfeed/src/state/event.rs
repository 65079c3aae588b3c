use crate::{ChunkRange, CollectionParams, DatasetError};
use core::fmt;

/// Identifies one asynchronous operation issued by the state machine: a
/// boundary fetch, a chunk subscription, or a probe.
///
/// Tickets are never reused, not even across resets. Completions and pushes
/// carry the ticket they were issued under, so anything that arrives for an
/// operation the state no longer tracks is recognised and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub(crate) u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything that can change a collection's state.
#[derive(Clone, Debug)]
pub enum Event<Q, D> {
    /// The caller asked for one more page.
    LoadMore,
    /// The caller replaced the query triple.
    Reset(CollectionParams<Q>),
    /// The caller is done with the collection.
    Detach,
    /// A boundary fetch completed.
    Resolved {
        ticket: Ticket,
        result: Result<Option<D>, DatasetError>,
    },
    /// The effect layer installed the subscription for chunk `index`.
    Attached { index: usize, ticket: Ticket },
    /// A chunk's live range pushed a snapshot or failed.
    ChunkSnapshot {
        index: usize,
        ticket: Ticket,
        result: Result<Vec<D>, DatasetError>,
    },
    /// The probe pushed its presence flag or failed.
    Availability {
        ticket: Ticket,
        result: Result<bool, DatasetError>,
    },
}

/// Work the state machine asks the effect layer to perform.
///
/// Effects are the only way subscriptions get opened or closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect<Q, D> {
    /// Fetch the next page boundary and report it as [`Event::Resolved`].
    Resolve {
        ticket: Ticket,
        forward: Q,
        after: Option<D>,
        size: usize,
    },
    /// Open the live range of chunk `index`, closing whatever held the slot,
    /// and report [`Event::Attached`].
    OpenChunk {
        index: usize,
        ticket: Ticket,
        reverse: Q,
        range: ChunkRange<D>,
    },
    /// Replace the probe with one scoped past `after`.
    Watch {
        ticket: Ticket,
        forward: Q,
        after: Option<D>,
    },
    /// Close every chunk subscription and the probe, and abandon any fetch in
    /// flight.
    DetachAll,
}
