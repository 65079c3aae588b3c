//! Page boundary resolution.
//!
//! A boundary is the last document of a forward page. It is both the cursor
//! for the next page (`start_after`) and the upper end of the reverse live
//! range that keeps the page's chunk up to date.

use crate::{Dataset, DatasetError, QuerySpec};

/// Fetches one forward page of at most `size` documents, strictly after
/// `after` when given, and returns its last document.
///
/// `Ok(None)` means the dataset has nothing past `after`. Failures are
/// returned as-is; retrying is up to the caller.
pub async fn fetch_next_boundary<DS>(
    dataset: &DS,
    forward: DS::Query,
    after: Option<DS::Doc>,
    size: usize,
) -> Result<Option<DS::Doc>, DatasetError>
where
    DS: Dataset,
{
    let spec = match after {
        Some(after) => QuerySpec::new(forward).start_after(after),
        None => QuerySpec::new(forward),
    }
    .limit(size);

    let mut page = dataset.get(spec).await?;
    Ok(page.pop())
}
