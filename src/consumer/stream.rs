//! `MessageStream` (spec §4.8.5): a lazy, backpressured sequence of decoded
//! records. Not restartable; closing drains in-flight fetches before the
//! terminal sentinel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::error::Result;

use super::Consumer;

/// Per-message commit hook (spec §4.8.4, §4.8.5): with `autocommit=false`,
/// committing is the caller's responsibility via this handle rather than
/// `Consumer::commit`.
#[derive(Clone)]
pub struct CommitHandle {
    pub(crate) consumer: Arc<Consumer>,
    pub(crate) topic: String,
    pub(crate) partition: i32,
    pub(crate) offset: i64,
}

impl CommitHandle {
    pub async fn commit(&self) -> Result<()> {
        self.consumer.commit(&[(self.topic.clone(), self.partition, self.offset)]).await
    }
}

/// One record handed to the caller, with the original `(topic,partition,offset)`
/// so the caller can build a commit request from it (spec §4.8.5). Headers
/// keep on-wire insertion order, so `Vec` rather than a map. `commit` is
/// `Some` only when the stream's autocommit mode is `Disabled`.
#[derive(Clone)]
pub struct ConsumedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: i64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: Vec<(String, Vec<u8>)>,
    pub commit: Option<CommitHandle>,
}

/// Consumed from a `MessageStream` wrapping a bounded channel: the bound
/// itself is the `highWaterMark` backpressure threshold (spec §4.8.4,
/// §6.4 `highWaterMark`).
pub struct MessageStream {
    inner: ReceiverStream<ConsumedMessage>,
    closer: mpsc::Sender<()>,
}

impl MessageStream {
    pub(crate) fn new(high_water_mark: usize) -> (mpsc::Sender<ConsumedMessage>, mpsc::Receiver<()>, Self) {
        let (tx, rx) = mpsc::channel(high_water_mark.max(1));
        let (close_tx, close_rx) = mpsc::channel(1);
        (tx, close_rx, Self { inner: ReceiverStream::new(rx), closer: close_tx })
    }

    /// Pulls the next message, or `None` once the stream is closed and every
    /// in-flight fetch has drained (spec §4.8.5).
    pub async fn next(&mut self) -> Option<ConsumedMessage> {
        self.inner.next().await
    }

    /// Signals the fetch loop to stop issuing new `Fetch` requests and close
    /// after draining. Idempotent: a second call finds the channel closed
    /// and is a no-op.
    pub async fn close(&self) {
        let _ = self.closer.send(()).await;
    }
}
