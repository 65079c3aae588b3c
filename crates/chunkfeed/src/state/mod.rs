//! The collection state machine.
//!
//! [`CollectionState::reduce`] is a deterministic transition function: it
//! takes an [`Event`], updates the state, and returns the [`Effect`]s the
//! caller must execute. It never touches the dataset and never holds a
//! subscription handle, which keeps it testable without any runtime.
//!
//! ## Transitions
//!
//! | from            | event                                | to             |
//! |-----------------|--------------------------------------|----------------|
//! | `Idle`          | `LoadMore`, chunks settled, boundary | `LoadingMore`  |
//! | `Idle`          | `LoadMore`, no boundary              | `LoadingFirst` |
//! | `Idle`          | probe reports data, no boundary      | `LoadingFirst` |
//! | `Loading*`      | `Resolved(Some)`                     | `Idle` + chunk |
//! | `Loading*`      | `Resolved(None)` / `Resolved(Err)`   | `Idle`         |
//! | any             | `Detach`                             | `Detached`     |
//! | any             | `Reset`                              | `Idle` (fresh) |
//!
//! Everything else leaves the status unchanged. Events carrying a stale
//! [`Ticket`] are ignored.

mod event;
#[cfg(test)]
mod tests;

pub use event::*;

use crate::{
    ChunkRange, CollectionParams, Error, LoadStatus, SubscriptionTarget, View, merge_chunks,
};

/// One loaded chunk as the state machine sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkState<D> {
    range: ChunkRange<D>,
    ticket: Ticket,
    attached: bool,
    snapshot: Option<Vec<D>>,
}

impl<D> ChunkState<D> {
    pub const fn range(&self) -> &ChunkRange<D> {
        &self.range
    }

    pub const fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Whether the effect layer confirmed the subscription is installed.
    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    /// Latest pushed snapshot, in reverse order.
    pub fn snapshot(&self) -> Option<&[D]> {
        self.snapshot.as_deref()
    }

    /// Attached and has heard from its subscription at least once.
    pub const fn is_settled(&self) -> bool {
        self.attached && self.snapshot.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionState<Q, D> {
    params: CollectionParams<Q>,
    chunks: Vec<ChunkState<D>>,
    boundary: Option<D>,
    loading_first: bool,
    loading_more: bool,
    has_more: bool,
    error: Option<Error>,
    detached: bool,
    resolving: Option<Ticket>,
    probe: Option<Ticket>,
    next_ticket: u64,
}

impl<Q, D> CollectionState<Q, D>
where
    Q: Clone,
    D: Clone,
{
    /// Builds the initial state and the effects that start it: a probe over
    /// the whole dataset, which bootstraps the first chunk once data exists.
    pub fn initialize(params: CollectionParams<Q>) -> (Self, Vec<Effect<Q, D>>) {
        let mut state = Self::fresh(params, 0);
        let effects = vec![state.watch()];
        (state, effects)
    }

    fn fresh(params: CollectionParams<Q>, next_ticket: u64) -> Self {
        Self {
            params,
            chunks: Vec::new(),
            boundary: None,
            loading_first: false,
            loading_more: false,
            has_more: false,
            error: None,
            detached: false,
            resolving: None,
            probe: None,
            next_ticket,
        }
    }

    /// Applies `event` and returns the effects to execute, in order.
    pub fn reduce(&mut self, event: Event<Q, D>) -> Vec<Effect<Q, D>> {
        match event {
            Event::LoadMore => self.load_more(),
            Event::Reset(params) => self.reset(params),
            Event::Detach => self.detach(),
            Event::Resolved { ticket, result } => self.resolved(ticket, result),
            Event::Attached { index, ticket } => {
                if let Some(chunk) = self.live_chunk(index, ticket) {
                    chunk.attached = true;
                }
                Vec::new()
            }
            Event::ChunkSnapshot {
                index,
                ticket,
                result,
            } => {
                let Some(chunk) = self.live_chunk(index, ticket) else {
                    return Vec::new();
                };
                match result {
                    Ok(docs) => chunk.snapshot = Some(docs),
                    Err(source) => {
                        // Keep the last snapshot on screen. A chunk that never
                        // received one counts as settled (and empty) so the
                        // collection can still be extended.
                        chunk.snapshot.get_or_insert_with(Vec::new);
                        self.error = Some(Error::Subscription {
                            target: SubscriptionTarget::Chunk(index),
                            source,
                        });
                    }
                }
                Vec::new()
            }
            Event::Availability { ticket, result } => self.availability(ticket, result),
        }
    }

    /// Whether a `LoadMore` would be accepted right now.
    pub fn can_load_more(&self) -> bool {
        !self.detached
            && !self.loading_first
            && !self.loading_more
            && self.chunks.iter().all(ChunkState::is_settled)
    }

    fn load_more(&mut self) -> Vec<Effect<Q, D>> {
        if !self.can_load_more() {
            return Vec::new();
        }

        let ticket = self.issue();
        self.resolving = Some(ticket);
        if self.boundary.is_none() {
            self.loading_first = true;
        } else {
            self.loading_more = true;
        }

        vec![Effect::Resolve {
            ticket,
            forward: self.params.forward.clone(),
            after: self.boundary.clone(),
            size: self.params.size,
        }]
    }

    fn resolved(
        &mut self,
        ticket: Ticket,
        result: Result<Option<D>, crate::DatasetError>,
    ) -> Vec<Effect<Q, D>> {
        if self.detached || self.resolving != Some(ticket) {
            return Vec::new();
        }

        let extending = self.loading_more;
        self.resolving = None;
        self.loading_first = false;
        self.loading_more = false;

        match result {
            Err(e) => {
                self.error = Some(Error::Fetch(e));
                Vec::new()
            }
            Ok(None) => {
                if extending {
                    self.has_more = false;
                }
                Vec::new()
            }
            Ok(Some(upper)) => {
                let index = self.chunks.len();
                let ticket = self.issue();
                let range = ChunkRange::new(self.boundary.replace(upper.clone()), upper);
                self.chunks.push(ChunkState {
                    range: range.clone(),
                    ticket,
                    attached: false,
                    snapshot: None,
                });

                vec![
                    Effect::OpenChunk {
                        index,
                        ticket,
                        reverse: self.params.reverse.clone(),
                        range,
                    },
                    self.watch(),
                ]
            }
        }
    }

    fn availability(
        &mut self,
        ticket: Ticket,
        result: Result<bool, crate::DatasetError>,
    ) -> Vec<Effect<Q, D>> {
        if self.detached || self.probe != Some(ticket) {
            return Vec::new();
        }

        match result {
            Err(source) => {
                self.error = Some(Error::Subscription {
                    target: SubscriptionTarget::Availability,
                    source,
                });
                Vec::new()
            }
            // Nothing loaded yet: the first document showing up starts the
            // pipeline.
            Ok(present) if self.boundary.is_none() => {
                if present {
                    self.load_more()
                } else {
                    Vec::new()
                }
            }
            Ok(present) => {
                self.has_more = present;
                Vec::new()
            }
        }
    }

    fn detach(&mut self) -> Vec<Effect<Q, D>> {
        if self.detached {
            return Vec::new();
        }

        self.detached = true;
        self.loading_first = false;
        self.loading_more = false;
        self.resolving = None;
        self.probe = None;
        for chunk in &mut self.chunks {
            chunk.attached = false;
        }
        vec![Effect::DetachAll]
    }

    fn reset(&mut self, params: CollectionParams<Q>) -> Vec<Effect<Q, D>> {
        let mut effects = self.detach();
        *self = Self::fresh(params, self.next_ticket);
        effects.push(self.watch());
        effects
    }

    /// Issues a new probe scoped past the current boundary.
    fn watch(&mut self) -> Effect<Q, D> {
        let ticket = self.issue();
        self.probe = Some(ticket);
        Effect::Watch {
            ticket,
            forward: self.params.forward.clone(),
            after: self.boundary.clone(),
        }
    }

    fn issue(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn live_chunk(&mut self, index: usize, ticket: Ticket) -> Option<&mut ChunkState<D>> {
        if self.detached {
            return None;
        }
        self.chunks
            .get_mut(index)
            .filter(|chunk| chunk.ticket == ticket)
    }

    /// The merged, forward-ordered documents of every chunk.
    pub fn docs(&self) -> Vec<D> {
        merge_chunks(self.chunks.iter().filter_map(ChunkState::snapshot))
    }

    pub fn view(&self) -> View<D> {
        View {
            docs: self.docs(),
            boundary: self.boundary.clone(),
            has_more: self.has_more,
            error: self.error.clone(),
            status: self.status(),
            chunk_count: self.chunks.len(),
        }
    }
}

impl<Q, D> CollectionState<Q, D> {
    pub const fn params(&self) -> &CollectionParams<Q> {
        &self.params
    }

    pub fn chunks(&self) -> &[ChunkState<D>] {
        &self.chunks
    }

    pub const fn boundary(&self) -> Option<&D> {
        self.boundary.as_ref()
    }

    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub const fn status(&self) -> LoadStatus {
        if self.detached {
            LoadStatus::Detached
        } else if self.loading_first {
            LoadStatus::LoadingFirst
        } else if self.loading_more {
            LoadStatus::LoadingMore
        } else {
            LoadStatus::Idle
        }
    }

    /// Number of chunks whose subscription is installed.
    pub fn attached_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.attached).count()
    }
}
