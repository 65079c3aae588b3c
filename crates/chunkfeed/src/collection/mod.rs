//! The caller-facing handle of a chunked live collection.


use crate::{
    CollectionParams, Dataset, Error, LoadStatus, Result, View,
    runtime::{Command, run_collection},
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// A paginated, live view over a [`Dataset`].
///
/// Pages are fetched one boundary at a time with [`Collection::load_more`].
/// Every loaded page stays subscribed, so edits anywhere in the loaded range
/// show up in [`Collection::docs`] without reloading. The first page loads by
/// itself as soon as the dataset has a document.
///
/// All state lives on a background task; the handle only sends commands and
/// reads the latest published [`View`]. Dropping the handle detaches every
/// subscription, [`Collection::close`] does the same and waits for it.
///
/// ```no_run
/// # async fn demo() -> chunkfeed::Result<()> {
/// use chunkfeed::{Collection, CollectionParams, memory::MemoryDataset};
/// use std::sync::Arc;
///
/// let dataset = MemoryDataset::new();
/// let collection = Collection::open(Arc::new(dataset.clone()), CollectionParams::by_rank(20))?;
///
/// dataset.add("buy milk");
/// let view = collection.wait_for(|view| !view.docs.is_empty()).await?;
/// assert_eq!(view.docs[0].body, "buy milk");
///
/// collection.load_more()?;
/// collection.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Collection<DS: Dataset> {
    commands: mpsc::UnboundedSender<Command<DS::Query>>,
    view: watch::Receiver<View<DS::Doc>>,
}

impl<DS: Dataset> Collection<DS> {
    /// Starts a collection over `dataset` on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `params` fails validation.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn open(dataset: Arc<DS>, params: CollectionParams<DS::Query>) -> Result<Self> {
        params.validate()?;

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(View::default());
        tokio::spawn(run_collection(dataset, params, commands_rx, view_tx));

        Ok(Self { commands, view })
    }

    /// Requests the next page.
    ///
    /// Ignored while a page is being fetched or while the most recent chunk
    /// has not delivered its first snapshot. Without any page loaded yet,
    /// this fetches the first one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Detached`] if the collection's loop has stopped.
    pub fn load_more(&self) -> Result<()> {
        self.send(Command::LoadMore)
    }

    /// Detaches everything and starts over with `params`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `params` fails validation, or
    /// [`Error::Detached`] if the collection's loop has stopped.
    pub fn reset(&self, params: CollectionParams<DS::Query>) -> Result<()> {
        params.validate()?;
        self.send(Command::Reset(params))
    }

    /// Detaches every subscription and stops the collection, returning once
    /// the loop has confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Detached`] if the loop stopped before acknowledging.
    pub async fn close(self) -> Result<()> {
        let (response, ack) = oneshot::channel();
        self.send(Command::Close { response })?;
        ack.await.map_err(|_| Error::Detached)
    }

    /// A snapshot of the latest published view.
    pub fn view(&self) -> View<DS::Doc> {
        self.view.borrow().clone()
    }

    /// Every loaded document, in dataset order.
    pub fn docs(&self) -> Vec<DS::Doc> {
        self.view.borrow().docs.clone()
    }

    pub fn has_more(&self) -> bool {
        self.view.borrow().has_more
    }

    pub fn error(&self) -> Option<Error> {
        self.view.borrow().error.clone()
    }

    pub fn status(&self) -> LoadStatus {
        self.view.borrow().status
    }

    pub fn boundary(&self) -> Option<DS::Doc> {
        self.view.borrow().boundary.clone()
    }

    /// A receiver that is notified every time the view is republished.
    pub fn subscribe(&self) -> watch::Receiver<View<DS::Doc>> {
        self.view.clone()
    }

    /// Waits until the published view satisfies `ready` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Detached`] if the loop stops first.
    pub async fn wait_for(&self, ready: impl FnMut(&View<DS::Doc>) -> bool) -> Result<View<DS::Doc>> {
        let mut view = self.view.clone();
        let current = view.wait_for(ready).await.map_err(|_| Error::Detached)?;
        Ok(current.clone())
    }

    fn send(&self, command: Command<DS::Query>) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::Detached)
    }
}

impl<DS: Dataset> core::fmt::Debug for Collection<DS> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let view = self.view.borrow();
        f.debug_struct("Collection")
            .field("status", &view.status)
            .field("chunk_count", &view.chunk_count)
            .field("docs", &view.docs.len())
            .field("has_more", &view.has_more)
            .finish()
    }
}
