use crate::DatasetError;
use core::{fmt, future::Future, ops::Bound};

/// Callback invoked with the full result set of a live query every time it
/// changes. Each call replaces whatever the previous call delivered.
pub type SnapshotListener<D> = Box<dyn Fn(Result<Vec<D>, DatasetError>) + Send + Sync>;

/// A remote, ordered, continuously changing collection of documents.
///
/// The dataset knows how to run a [`QuerySpec`] once ([`Dataset::get`]) and
/// how to keep running it, pushing a fresh snapshot whenever the result set
/// changes ([`Dataset::on_snapshot`]).
///
/// `Query` carries the ordering (and any filter) of a query. A collection is
/// configured with two of them: one that walks the dataset in its natural
/// forward order, and one that walks the same order in reverse.
pub trait Dataset: Send + Sync + 'static {
    type Doc: Clone + fmt::Debug + Send + Sync + 'static;
    type Query: Clone + fmt::Debug + Send + Sync + 'static;

    /// Runs `spec` once and returns its result set in query order.
    fn get(
        &self,
        spec: QuerySpec<Self::Query, Self::Doc>,
    ) -> impl Future<Output = Result<Vec<Self::Doc>, DatasetError>> + Send;

    /// Attaches `listener` to `spec`.
    ///
    /// Implementations deliver an initial snapshot and then one snapshot per
    /// change of the result set. Errors are delivered through the listener
    /// as well. The listener stays attached until the returned registration
    /// is removed or dropped.
    fn on_snapshot(
        &self,
        spec: QuerySpec<Self::Query, Self::Doc>,
        listener: SnapshotListener<Self::Doc>,
    ) -> ListenerRegistration;
}

/// A query plus cursor bounds and an optional limit.
///
/// Bounds are documents: the dataset positions the cursor at the document's
/// place in the query's order. The builder methods mirror the usual cursor
/// vocabulary:
///
/// | method         | bound               |
/// |----------------|---------------------|
/// | `start_at`     | `start = Included`  |
/// | `start_after`  | `start = Excluded`  |
/// | `end_at`       | `end = Included`    |
/// | `end_before`   | `end = Excluded`    |
#[derive(Clone, Debug)]
pub struct QuerySpec<Q, D> {
    pub query: Q,
    pub start: Bound<D>,
    pub end: Bound<D>,
    pub limit: Option<usize>,
}

impl<Q, D> QuerySpec<Q, D> {
    pub const fn new(query: Q) -> Self {
        Self {
            query,
            start: Bound::Unbounded,
            end: Bound::Unbounded,
            limit: None,
        }
    }

    #[must_use]
    pub fn start_at(mut self, doc: D) -> Self {
        self.start = Bound::Included(doc);
        self
    }

    #[must_use]
    pub fn start_after(mut self, doc: D) -> Self {
        self.start = Bound::Excluded(doc);
        self
    }

    #[must_use]
    pub fn end_at(mut self, doc: D) -> Self {
        self.end = Bound::Included(doc);
        self
    }

    #[must_use]
    pub fn end_before(mut self, doc: D) -> Self {
        self.end = Bound::Excluded(doc);
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Handle to an attached snapshot listener.
///
/// Removing is idempotent: the detach callback runs at most once, whether it
/// is triggered by [`ListenerRegistration::remove`] or by dropping the handle.
pub struct ListenerRegistration {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// A registration with nothing to detach.
    pub const fn noop() -> Self {
        Self { detach: None }
    }

    /// Detaches the listener. Returns `true` only on the call that actually
    /// detached it.
    pub fn remove(&mut self) -> bool {
        match self.detach.take() {
            Some(detach) => {
                detach();
                true
            }
            None => false,
        }
    }

    pub const fn is_active(&self) -> bool {
        self.detach.is_some()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builder_sets_bounds() {
        let spec = QuerySpec::new("by_rank").start_after(3).end_before(9).limit(2);
        assert_eq!(spec.start, Bound::Excluded(3));
        assert_eq!(spec.end, Bound::Excluded(9));
        assert_eq!(spec.limit, Some(2));

        let spec = QuerySpec::new("by_rank").start_at(9).end_at(3);
        assert_eq!(spec.start, Bound::Included(9));
        assert_eq!(spec.end, Bound::Included(3));
        assert_eq!(spec.limit, None);
    }

    #[test]
    fn registration_detaches_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registration = ListenerRegistration::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registration.is_active());
        assert!(registration.remove());
        assert!(!registration.remove());
        drop(registration);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_registration_detaches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        drop(ListenerRegistration::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
