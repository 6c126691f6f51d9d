//! Streaming record pipe
//!
//! A [`RecordPipe`] runs a finite producer on a blocking worker thread and
//! hands its output to the async consumer one item at a time. The channel
//! holds a single item, so the worker never runs more than one step ahead.
//!
//! Every item is tagged:
//!
//! - [`PipeItem::Item`] carries a value
//! - [`PipeItem::RowError`] reports a bad row; more items may follow
//! - [`PipeItem::Fatal`] is the last item the pipe ever yields
//!
//! Dropping the pipe (or calling [`RecordPipe::cancel`]) cancels its token.
//! The worker sees the cancellation at its next emit or
//! [`Emitter::check`] and returns, closing any connection it holds.
//!
//! ```rust,ignore
//! let mut pipe = RecordPipe::spawn("numbers", |emit| {
//!     for n in 0..3 {
//!         if !emit.item(n) {
//!             break;
//!         }
//!     }
//!     Ok(())
//! });
//!
//! while let Some(item) = pipe.next().await {
//!     // ...
//! }
//! ```

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

/// A row that could not be decoded. Never terminates a pipe.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("row {row}: {message}")]
pub struct RowError {
    /// 1-based position of the row in its input
    pub row: u64,
    pub message: String,
}

impl RowError {
    pub fn new(row: u64, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

/// Raised inside a worker once its consumer has gone away.
#[derive(Debug, Error)]
#[error("pipe cancelled")]
pub struct Cancelled;

/// One element of a pipe's output
#[derive(Debug)]
pub enum PipeItem<T> {
    Item(T),
    RowError(RowError),
    Fatal(anyhow::Error),
}

/// Producer half handed to a pipe worker.
pub struct Emitter<T> {
    tx: mpsc::Sender<PipeItem<T>>,
    cancel: CancellationToken,
}

impl<T> Emitter<T> {
    /// Send a value. Returns `false` once the consumer is gone.
    pub fn item(&self, value: T) -> bool {
        self.send(PipeItem::Item(value))
    }

    /// Report a row error. Returns `false` once the consumer is gone.
    pub fn row_error(&self, error: RowError) -> bool {
        self.send(PipeItem::RowError(error))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`Cancelled`] if the consumer has stopped listening.
    ///
    /// Workers call this between remote operations.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() || self.tx.is_closed() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    fn send(&self, item: PipeItem<T>) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if self.tx.blocking_send(item).is_err() {
            self.cancel.cancel();
            return false;
        }
        true
    }
}

/// Lazily consumed output of a background producer.
pub struct RecordPipe<T> {
    rx: mpsc::Receiver<PipeItem<T>>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl<T: Send + 'static> RecordPipe<T> {
    /// Start `worker` on the blocking pool.
    ///
    /// An `Err` returned by the worker becomes the single terminal
    /// [`PipeItem::Fatal`], unless the pipe was cancelled first.
    pub fn spawn<F>(label: &'static str, worker: F) -> Self
    where
        F: FnOnce(&Emitter<T>) -> anyhow::Result<()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let emitter = Emitter {
            tx,
            cancel: cancel.clone(),
        };

        tokio::task::spawn_blocking(move || {
            debug!(pipe = label, "worker started");
            match worker(&emitter) {
                Ok(()) => debug!(pipe = label, "worker finished"),
                Err(e) if emitter.is_cancelled() || e.is::<Cancelled>() => {
                    debug!(pipe = label, "worker stopped after cancellation");
                },
                Err(e) => {
                    warn!(pipe = label, error = %e, "worker failed");
                    if emitter.tx.blocking_send(PipeItem::Fatal(e)).is_err() {
                        warn!(pipe = label, "consumer gone before the failure was delivered");
                    }
                },
            }
        });

        Self {
            rx,
            _guard: cancel.clone().drop_guard(),
            cancel,
        }
    }

    /// Pipe over a finite iterator of row results.
    pub fn from_iter<I>(label: &'static str, rows: I) -> Self
    where
        I: IntoIterator<Item = Result<T, RowError>> + Send + 'static,
        I::IntoIter: Send,
    {
        Self::spawn(label, move |emit| {
            for row in rows {
                let delivered = match row {
                    Ok(value) => emit.item(value),
                    Err(e) => emit.row_error(e),
                };
                if !delivered {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Next item, or `None` once the worker is done.
    pub async fn next(&mut self) -> Option<PipeItem<T>> {
        self.rx.recv().await
    }

    /// Stop the worker. Items already queued are still delivered.
    ///
    /// Closing the receiver also wakes a worker parked on a full channel.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.rx.close();
    }

    /// Token observed by the worker
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain every value, skipping row errors and failing on the first
    /// fatal item.
    pub async fn try_collect(mut self) -> anyhow::Result<Vec<T>> {
        let mut values = Vec::new();
        while let Some(item) = self.next().await {
            match item {
                PipeItem::Item(value) => values.push(value),
                PipeItem::RowError(e) => debug!(error = %e, "skipping row"),
                PipeItem::Fatal(e) => return Err(e),
            }
        }
        Ok(values)
    }
}

impl<T> Stream for RecordPipe<T> {
    type Item = PipeItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
