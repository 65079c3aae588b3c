use chunkfeed::{LoadStatus, View, memory::MemoryDoc};
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tokio_util::sync::CancellationToken;

/// The parts of a view that are worth redrawing for.
type Frame = (Vec<MemoryDoc>, bool, LoadStatus, usize, Option<String>);

fn frame(view: &View<MemoryDoc>) -> Frame {
    (
        view.docs.clone(),
        view.has_more,
        view.status,
        view.chunk_count,
        view.error.as_ref().map(ToString::to_string),
    )
}

/// Prints the collection every time its visible state changes, until the
/// stream ends or `shutdown` is cancelled.
pub async fn render_loop(
    mut views: WatchStream<View<MemoryDoc>>,
    json: bool,
    shutdown: CancellationToken,
) {
    let mut last: Option<Frame> = None;

    loop {
        let view = tokio::select! {
            () = shutdown.cancelled() => break,
            next = views.next() => match next {
                Some(view) => view,
                None => break,
            },
        };

        let current = frame(&view);
        if last.as_ref() == Some(&current) {
            continue;
        }

        if json {
            println!("{}", to_json(&view));
        } else {
            print!("{}", to_table(&view));
        }
        last = Some(current);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Renderer stopped");
}

fn to_json(view: &View<MemoryDoc>) -> serde_json::Value {
    serde_json::json!({
        "status": view.status,
        "chunks": view.chunk_count,
        "has_more": view.has_more,
        "error": view.error.as_ref().map(ToString::to_string),
        "docs": view.docs,
    })
}

fn to_table(view: &View<MemoryDoc>) -> String {
    let mut out = format!(
        "== {} todo(s) in {} chunk(s) | {:?} | {}\n",
        view.docs.len(),
        view.chunk_count,
        view.status,
        if view.has_more { "more below" } else { "end of list" },
    );
    for doc in &view.docs {
        out.push_str(&format!("  {:>5}  {}\n", doc.rank, doc.body));
    }
    if let Some(error) = &view.error {
        out.push_str(&format!("  !! {error}\n"));
    }
    out
}
