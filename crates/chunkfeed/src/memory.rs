//! An in-process [`Dataset`] with live listeners.
//!
//! Documents are ordered by `(rank, id)`. [`MemoryDataset::add`] appends at
//! the end of that order, [`MemoryDataset::insert_at`] places a document at
//! an explicit rank. Every mutation re-evaluates the attached listeners and
//! pushes a snapshot to those whose result set changed.
//!
//! Listener accounting ([`MemoryDataset::listeners_opened`],
//! [`MemoryDataset::listeners_closed`], [`MemoryDataset::active_listeners`])
//! makes subscription leaks observable, and the `fail_*` methods inject
//! remote failures.

use crate::{
    CollectionParams, Dataset, DatasetError, ListenerRegistration, QuerySpec, SnapshotListener,
};
use core::{cmp::Ordering as CmpOrdering, future::Future, ops::Bound};
use parking_lot::{Mutex, ReentrantMutex};
use portable_atomic::{AtomicUsize, Ordering};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Weak},
};

/// Direction a query walks the `(rank, id)` order in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Order::Ascending => Order::Descending,
            Order::Descending => Order::Ascending,
        }
    }

    fn compare(self, a: &MemoryDoc, b: &MemoryDoc) -> CmpOrdering {
        let natural = a.key().cmp(&b.key());
        match self {
            Order::Ascending => natural,
            Order::Descending => natural.reverse(),
        }
    }

    fn past_start(self, doc: &MemoryDoc, start: &Bound<MemoryDoc>) -> bool {
        match start {
            Bound::Unbounded => true,
            Bound::Included(cursor) => self.compare(doc, cursor) != CmpOrdering::Less,
            Bound::Excluded(cursor) => self.compare(doc, cursor) == CmpOrdering::Greater,
        }
    }

    fn before_end(self, doc: &MemoryDoc, end: &Bound<MemoryDoc>) -> bool {
        match end {
            Bound::Unbounded => true,
            Bound::Included(cursor) => self.compare(doc, cursor) != CmpOrdering::Greater,
            Bound::Excluded(cursor) => self.compare(doc, cursor) == CmpOrdering::Less,
        }
    }
}

impl CollectionParams<Order> {
    /// Pages forward by ascending rank and keeps chunks live in descending
    /// rank.
    pub const fn by_rank(size: usize) -> Self {
        Self::new(Order::Ascending, Order::Descending, size)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryDoc {
    pub id: u64,
    pub rank: i64,
    pub body: String,
}

impl MemoryDoc {
    const fn key(&self) -> (i64, u64) {
        (self.rank, self.id)
    }
}

type SharedListener = Arc<dyn Fn(Result<Vec<MemoryDoc>, DatasetError>) + Send + Sync>;

struct Listener {
    spec: QuerySpec<Order, MemoryDoc>,
    callback: SharedListener,
    last: Vec<MemoryDoc>,
}

#[derive(Default)]
struct Store {
    docs: BTreeMap<(i64, u64), MemoryDoc>,
    ranks: HashMap<u64, i64>,
    listeners: HashMap<u64, Listener>,
    next_id: u64,
    next_rank: i64,
    next_listener: u64,
    failing_fetch: Option<DatasetError>,
}

impl Store {
    fn evaluate(&self, spec: &QuerySpec<Order, MemoryDoc>) -> Vec<MemoryDoc> {
        evaluate(&self.docs, spec)
    }

    fn remove(&mut self, id: u64) -> Option<MemoryDoc> {
        let rank = self.ranks.remove(&id)?;
        self.docs.remove(&(rank, id))
    }

    /// Re-runs every listener's query and collects the ones whose result set
    /// changed.
    fn changed_listeners(&mut self) -> Vec<(SharedListener, Vec<MemoryDoc>)> {
        let Store {
            docs, listeners, ..
        } = self;
        let docs = &*docs;

        listeners
            .values_mut()
            .filter_map(|listener| {
                let next = evaluate(docs, &listener.spec);
                if next == listener.last {
                    return None;
                }
                listener.last.clone_from(&next);
                Some((Arc::clone(&listener.callback), next))
            })
            .collect()
    }
}

fn evaluate(
    docs: &BTreeMap<(i64, u64), MemoryDoc>,
    spec: &QuerySpec<Order, MemoryDoc>,
) -> Vec<MemoryDoc> {
    let order = spec.query;
    let ordered: Box<dyn Iterator<Item = &MemoryDoc>> = match order {
        Order::Ascending => Box::new(docs.values()),
        Order::Descending => Box::new(docs.values().rev()),
    };

    ordered
        .skip_while(|doc| !order.past_start(doc, &spec.start))
        .take_while(|doc| order.before_end(doc, &spec.end))
        .take(spec.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

struct Shared {
    store: Mutex<Store>,
    // Held while a mutation computes and delivers its snapshots, so listeners
    // observe mutations in the order they were applied. Reentrant so a
    // listener may itself mutate the dataset.
    delivery: ReentrantMutex<()>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    fetches: AtomicUsize,
}

/// A cheaply cloneable, in-memory ordered dataset.
#[derive(Clone)]
pub struct MemoryDataset {
    shared: Arc<Shared>,
}

impl Default for MemoryDataset {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(Store::default()),
                delivery: ReentrantMutex::new(()),
                opened: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
            }),
        }
    }

    /// Appends a document after every existing one.
    pub fn add(&self, body: impl Into<String>) -> MemoryDoc {
        self.mutate(|store| {
            let rank = store.next_rank;
            insert(store, rank, body.into())
        })
    }

    /// Inserts a document at `rank`. Ties are broken by insertion order.
    pub fn insert_at(&self, rank: i64, body: impl Into<String>) -> MemoryDoc {
        self.mutate(|store| insert(store, rank, body.into()))
    }

    /// Replaces the body of document `id`, keeping its position.
    pub fn update(&self, id: u64, body: impl Into<String>) -> Option<MemoryDoc> {
        self.mutate(|store| {
            let rank = *store.ranks.get(&id)?;
            let doc = store.docs.get_mut(&(rank, id))?;
            doc.body = body.into();
            Some(doc.clone())
        })
    }

    pub fn delete(&self, id: u64) -> Option<MemoryDoc> {
        self.mutate(|store| store.remove(id))
    }

    /// All documents in ascending order.
    pub fn documents(&self) -> Vec<MemoryDoc> {
        self.shared.store.lock().docs.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.shared.store.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes the next [`Dataset::get`] fail with `error`.
    pub fn fail_next_fetch(&self, error: DatasetError) {
        self.shared.store.lock().failing_fetch = Some(error);
    }

    /// Delivers `error` to every attached listener. Listeners stay attached.
    pub fn fail_listeners(&self, error: DatasetError) {
        let _delivery = self.shared.delivery.lock();
        let callbacks: Vec<SharedListener> = self
            .shared
            .store
            .lock()
            .listeners
            .values()
            .map(|listener| Arc::clone(&listener.callback))
            .collect();
        for callback in callbacks {
            callback(Err(error.clone()));
        }
    }

    /// Total number of listeners ever attached.
    pub fn listeners_opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Total number of listeners detached through their registration.
    pub fn listeners_closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn active_listeners(&self) -> usize {
        self.shared.store.lock().listeners.len()
    }

    /// Number of one-shot queries served, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.shared.fetches.load(Ordering::SeqCst)
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut Store) -> T) -> T {
        let _delivery = self.shared.delivery.lock();
        let (out, pending) = {
            let mut store = self.shared.store.lock();
            let out = apply(&mut store);
            (out, store.changed_listeners())
        };
        for (callback, snapshot) in pending {
            callback(Ok(snapshot));
        }
        out
    }
}

fn insert(store: &mut Store, rank: i64, body: String) -> MemoryDoc {
    let id = store.next_id;
    store.next_id += 1;
    store.next_rank = store.next_rank.max(rank + 1);

    let doc = MemoryDoc { id, rank, body };
    store.ranks.insert(id, rank);
    store.docs.insert(doc.key(), doc.clone());
    doc
}

fn detach(shared: &Weak<Shared>, id: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    if shared.store.lock().listeners.remove(&id).is_some() {
        shared.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Dataset for MemoryDataset {
    type Doc = MemoryDoc;
    type Query = Order;

    fn get(
        &self,
        spec: QuerySpec<Order, MemoryDoc>,
    ) -> impl Future<Output = Result<Vec<MemoryDoc>, DatasetError>> + Send {
        self.shared.fetches.fetch_add(1, Ordering::SeqCst);
        let result = {
            let mut store = self.shared.store.lock();
            match store.failing_fetch.take() {
                Some(error) => Err(error),
                None => Ok(store.evaluate(&spec)),
            }
        };
        futures::future::ready(result)
    }

    fn on_snapshot(
        &self,
        spec: QuerySpec<Order, MemoryDoc>,
        listener: SnapshotListener<MemoryDoc>,
    ) -> ListenerRegistration {
        let _delivery = self.shared.delivery.lock();
        let callback: SharedListener = Arc::from(listener);

        let (id, initial) = {
            let mut store = self.shared.store.lock();
            let initial = store.evaluate(&spec);
            let id = store.next_listener;
            store.next_listener += 1;
            store.listeners.insert(
                id,
                Listener {
                    spec,
                    callback: Arc::clone(&callback),
                    last: initial.clone(),
                },
            );
            (id, initial)
        };
        self.shared.opened.fetch_add(1, Ordering::SeqCst);

        callback(Ok(initial));

        let shared = Arc::downgrade(&self.shared);
        ListenerRegistration::new(move || detach(&shared, id))
    }
}
