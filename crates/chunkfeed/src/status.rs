/// What a collection is currently doing.
///
/// This is orthogonal to whether more data exists and to whether an error
/// was observed; both are tracked separately on [`View`](crate::View).
///
/// - [`LoadStatus::Idle`]: nothing in flight, `load_more` may be accepted.
/// - [`LoadStatus::LoadingFirst`]: resolving the boundary of chunk 0.
/// - [`LoadStatus::LoadingMore`]: resolving the boundary of the next chunk.
/// - [`LoadStatus::Detached`]: every subscription was released; the
///   collection only comes back through a reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadStatus {
    #[default]
    Idle,
    LoadingFirst,
    LoadingMore,
    Detached,
}

impl LoadStatus {
    pub const fn is_loading(self) -> bool {
        matches!(self, LoadStatus::LoadingFirst | LoadStatus::LoadingMore)
    }
}
