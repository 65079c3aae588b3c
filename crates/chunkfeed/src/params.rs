use crate::{Error, Result};

/// The query triple a collection is built from.
///
/// `forward` walks the dataset in its natural order and is used for paging
/// and for the availability probe. `reverse` is the same ordering reversed
/// and is used for the live range of every chunk. `size` is the number of
/// documents requested per page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionParams<Q> {
    pub forward: Q,
    pub reverse: Q,
    pub size: usize,
}

impl<Q> CollectionParams<Q> {
    pub const fn new(forward: Q, reverse: Q, size: usize) -> Self {
        Self {
            forward,
            reverse,
            size,
        }
    }

    /// Checks that the triple can drive a collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `size` is zero, since an empty
    /// page can never produce a boundary.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidRequest {
                reason: "Page size must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
