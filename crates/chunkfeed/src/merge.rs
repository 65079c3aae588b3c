use crate::{Error, LoadStatus};

/// Concatenates chunk snapshots into one forward-ordered sequence.
///
/// Snapshots are given in chunk-index order and each holds its documents in
/// reverse order, as pushed by the chunk's live range query. Every snapshot
/// is flipped before it is appended.
pub fn merge_chunks<'a, D, I>(snapshots: I) -> Vec<D>
where
    D: Clone + 'a,
    I: IntoIterator<Item = &'a [D]>,
{
    snapshots
        .into_iter()
        .flat_map(|snapshot| snapshot.iter().rev())
        .cloned()
        .collect()
}

/// What the presentation layer sees of a collection.
#[derive(Clone, Debug)]
pub struct View<D> {
    /// Every loaded document, in dataset order.
    pub docs: Vec<D>,
    /// Last document of the most recent page, if any page has loaded.
    pub boundary: Option<D>,
    /// Whether the probe sees at least one document past `boundary`.
    pub has_more: bool,
    /// Most recent failure, kept until the next reset.
    pub error: Option<Error>,
    pub status: LoadStatus,
    pub chunk_count: usize,
}

impl<D> Default for View<D> {
    fn default() -> Self {
        Self {
            docs: Vec::new(),
            boundary: None,
            has_more: false,
            error: None,
            status: LoadStatus::Idle,
            chunk_count: 0,
        }
    }
}
