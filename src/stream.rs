//! Async flow record stream with close semantics
//!
//! [`FlowEventStream`] wraps a [`RecordSource`] and layers cancellation on
//! top: a cloneable [`StreamHandle`] closes the stream from any task, and
//! every blocked [`FlowEventStream::next`] call observes the close.

use std::io;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Source of raw flow records. Implemented by the XDP ring buffer reader
/// and by in-memory channels in tests.
#[async_trait]
pub trait RecordSource: Send {
    /// Wait for the next raw record. Errors are transient; the source
    /// stays usable after returning one.
    async fn recv(&mut self) -> io::Result<Vec<u8>>;
}

/// Consuming half of the stream. Owned by the ingest loop.
pub struct FlowEventStream<S> {
    source: S,
    token: CancellationToken,
}

/// Closing half of the stream. Clones share one token, so any clone may
/// close and later calls are no-ops.
#[derive(Clone)]
pub struct StreamHandle {
    token: CancellationToken,
}

impl StreamHandle {
    /// Close the stream. Idempotent and safe to call while another task
    /// is blocked in [`FlowEventStream::next`].
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<S: RecordSource> FlowEventStream<S> {
    /// Wrap `source`, returning the stream and the handle that closes it.
    pub fn open(source: S) -> (Self, StreamHandle) {
        let token = CancellationToken::new();
        let handle = StreamHandle {
            token: token.clone(),
        };

        (Self { source, token }, handle)
    }

    /// Wait for the next record.
    ///
    /// Returns `Ok(Some(bytes))` for a record, `Ok(None)` once the stream
    /// is closed, and `Err` for a transient source error. After the first
    /// `Ok(None)` every further call returns `Ok(None)` as well; records
    /// still queued in the source are discarded.
    pub async fn next(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.token.is_cancelled() {
            return Ok(None);
        }

        tokio::select! {
            biased;

            _ = self.token.cancelled() => Ok(None),
            result = self.source.recv() => result.map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    /// Source that never yields. Stands in for an idle ring buffer.
    struct NeverSource;

    #[async_trait]
    impl RecordSource for NeverSource {
        async fn recv(&mut self) -> io::Result<Vec<u8>> {
            std::future::pending().await
        }
    }

    /// Source that yields queued items, then blocks forever.
    struct QueueSource(VecDeque<io::Result<Vec<u8>>>);

    #[async_trait]
    impl RecordSource for QueueSource {
        async fn recv(&mut self) -> io::Result<Vec<u8>> {
            match self.0.pop_front() {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }
    }

    #[tokio::test]
    async fn yields_records_in_order() {
        let source = QueueSource(VecDeque::from([Ok(vec![1u8]), Ok(vec![2u8])]));
        let (mut stream, _handle) = FlowEventStream::open(source);

        assert_eq!(stream.next().await.unwrap(), Some(vec![1u8]));
        assert_eq!(stream.next().await.unwrap(), Some(vec![2u8]));
    }

    #[tokio::test]
    async fn survives_transient_errors() {
        let source = QueueSource(VecDeque::from([
            Err(io::Error::other("ring hiccup")),
            Ok(vec![7u8]),
        ]));
        let (mut stream, _handle) = FlowEventStream::open(source);

        assert!(stream.next().await.is_err());
        assert_eq!(stream.next().await.unwrap(), Some(vec![7u8]));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut stream, handle) = FlowEventStream::open(NeverSource);

        handle.close();
        handle.close();

        assert!(handle.is_closed());
        assert_eq!(stream.next().await.unwrap(), None);
        assert_eq!(stream.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn close_unblocks_a_pending_next() {
        let (mut stream, handle) = FlowEventStream::open(NeverSource);

        let reader = tokio::spawn(async move { stream.next().await });
        tokio::task::yield_now().await;
        handle.close();

        let item = tokio::time::timeout(std::time::Duration::from_secs(5), reader)
            .await
            .expect("next did not observe close")
            .unwrap();
        assert_eq!(item.unwrap(), None);
    }

    #[tokio::test]
    async fn close_discards_queued_records() {
        let source = QueueSource(VecDeque::from([Ok(vec![1u8])]));
        let (mut stream, handle) = FlowEventStream::open(source);

        handle.close();

        assert_eq!(stream.next().await.unwrap(), None);
    }
}
