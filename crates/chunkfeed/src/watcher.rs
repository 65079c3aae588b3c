//! The availability probe.
//!
//! A live forward query limited to one document past the current boundary
//! answers "is there anything left to load?". Its single-document window
//! changes whenever documents are added past, or removed from just after,
//! the boundary.
//!
//! Unlike chunk subscriptions, the probe is keyed by a value that moves: each
//! new boundary needs a new probe. [`ProbeSlot::replace`] swaps it as one
//! operation so there is never a moment with two probes or, once one has
//! been opened, with none.

use crate::{Dataset, DatasetError, ListenerRegistration, QuerySpec};

/// An open probe subscription.
#[derive(Debug)]
pub struct AvailabilityWatch {
    registration: ListenerRegistration,
}

impl AvailabilityWatch {
    /// Detaches the probe. Idempotent.
    pub fn close(&mut self) -> bool {
        self.registration.remove()
    }

    pub const fn is_open(&self) -> bool {
        self.registration.is_active()
    }
}

/// Watches for at least one document strictly after `after` (or anywhere in
/// the dataset when there is no boundary yet).
///
/// `on_has_more` is called with the probe's result on every push, including
/// the initial one. Listener failures are reported as `Err`.
pub fn watch_availability<DS, F>(
    dataset: &DS,
    forward: DS::Query,
    after: Option<DS::Doc>,
    on_has_more: F,
) -> AvailabilityWatch
where
    DS: Dataset,
    F: Fn(Result<bool, DatasetError>) + Send + Sync + 'static,
{
    let spec = match after {
        Some(after) => QuerySpec::new(forward).start_after(after),
        None => QuerySpec::new(forward),
    }
    .limit(1);

    let registration = dataset.on_snapshot(
        spec,
        Box::new(move |snapshot| on_has_more(snapshot.map(|docs| !docs.is_empty()))),
    );
    AvailabilityWatch { registration }
}

/// Holds the one active probe.
#[derive(Debug, Default)]
pub struct ProbeSlot {
    current: Option<AvailabilityWatch>,
}

impl ProbeSlot {
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Closes the current probe, then opens a new one with `open`.
    pub fn replace(&mut self, open: impl FnOnce() -> AvailabilityWatch) {
        self.close();
        self.current = Some(open());
    }

    /// Closes the current probe, if any. Returns `true` if one was open.
    pub fn close(&mut self) -> bool {
        self.current
            .take()
            .is_some_and(|mut watch| watch.close())
    }

    pub fn is_watching(&self) -> bool {
        self.current.as_ref().is_some_and(AvailabilityWatch::is_open)
    }
}
