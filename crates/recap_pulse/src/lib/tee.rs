//! Forward-and-buffer adapter for streamed generation results.
//!
//! The consumer (a terminal renderer, a UI) drains fragments at its own pace;
//! each fragment it pulls is forwarded unchanged and appended to an internal
//! buffer. When the upstream is exhausted, and only then, the joined buffer is
//! committed through the sink. Dropping the tee before exhaustion discards the
//! partial result without error.

use std::{
    path::PathBuf,
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use recap_store::ResultStore;
use serde_json::Value;

/// Where the tee commits the accumulated text on exhaustion.
pub trait TeeSink {
    fn commit(&mut self, text: String) -> anyhow::Result<()>;
}

/// Production sink: loads the result store document, sets the key path and
/// persists. Reloading per commit keeps the tee free of shared references to
/// a live store; commits are one-per-generation so the extra read is cheap.
pub struct StoreSink {
    path: PathBuf,
    key_path: Vec<String>,
}

impl StoreSink {
    pub fn new<S: Into<String>>(
        path: impl Into<PathBuf>,
        key_path: impl IntoIterator<Item = S>,
    ) -> Self {
        StoreSink {
            path: path.into(),
            key_path: key_path.into_iter().map(Into::into).collect(),
        }
    }
}

impl TeeSink for StoreSink {
    fn commit(&mut self, text: String) -> anyhow::Result<()> {
        let mut store = ResultStore::load(&self.path)?;
        store.set(&self.key_path, Value::String(text));
        store.persist(&self.path)?;
        Ok(())
    }
}

/// Pass-through stream of text fragments with a conditional on-exhaustion
/// commit.
///
/// Fragments are forwarded in the exact order received and the committed value
/// is their exact concatenation. With `store_result` false the buffer is
/// discarded after exhaustion (used when a customized prompt makes the result
/// not worth caching). A forwarded upstream error poisons the session: partial
/// output is never committed.
pub struct StreamTee<S, K> {
    inner: S,
    sink: K,
    buffer: String,
    store_result: bool,
    poisoned: bool,
    done: bool,
}

impl<S, K> StreamTee<S, K> {
    pub fn new(inner: S, sink: K, store_result: bool) -> Self {
        StreamTee {
            inner,
            sink,
            buffer: String::new(),
            store_result,
            poisoned: false,
            done: false,
        }
    }
}

impl<S, K> Stream for StreamTee<S, K>
where
    S: Stream<Item = anyhow::Result<String>> + Unpin,
    K: TeeSink + Unpin,
{
    type Item = anyhow::Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(fragment))) => {
                this.buffer.push_str(&fragment);
                Poll::Ready(Some(Ok(fragment)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.poisoned = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.done = true;
                if this.store_result && !this.poisoned {
                    let joined = std::mem::take(&mut this.buffer);
                    if let Err(e) = this.sink.commit(joined) {
                        // A lost commit must not pass silently: surface it as
                        // the final item before the stream completes.
                        tracing::error!(error = ?e, "Failed to persist accumulated stream result");
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
