//! Queue-backed client sink
//!
//! The transport creates a [`ChannelSink`] per connection and drains the
//! [`SinkReceiver`] from its writer task. Frames go through a bounded FIFO
//! queue. Close is signalled out of band on a watch channel, so a client
//! whose queue is full can still be closed.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use super::{ClientSink, SinkError, SinkFuture};
use crate::protocol::message::{CloseReason, Outgoing};

/// Sink writing into a bounded mpsc queue
#[derive(Debug, Clone)]
pub struct ChannelSink {
    frames: mpsc::Sender<Outgoing>,
    closed: Arc<watch::Sender<Option<CloseReason>>>,
}

impl ChannelSink {
    /// Create a new sink.
    ///
    /// Returns the sink and the receiver the writer task drains.
    pub fn new(capacity: usize) -> (Self, SinkReceiver) {
        let (frames_tx, frames_rx) = mpsc::channel(capacity.max(1));
        let (closed_tx, closed_rx) = watch::channel(None);

        let sink = Self {
            frames: frames_tx,
            closed: Arc::new(closed_tx),
        };
        let receiver = SinkReceiver {
            frames: frames_rx,
            signal: CloseSignal { rx: closed_rx },
        };
        (sink, receiver)
    }

    /// Check if the connection was asked to close
    pub fn is_closed(&self) -> bool {
        self.closed.borrow().is_some()
    }
}

impl ClientSink for ChannelSink {
    fn write(&self, message: Outgoing) -> SinkFuture<'_> {
        Box::pin(async move {
            if self.is_closed() {
                return Err(SinkError::Closed);
            }
            self.frames.send(message).await.map_err(|_| SinkError::Closed)
        })
    }

    fn close(&self, reason: CloseReason) -> SinkFuture<'_> {
        Box::pin(async move {
            // First reason wins
            self.closed.send_if_modified(|state| {
                if state.is_none() {
                    *state = Some(reason);
                    true
                } else {
                    false
                }
            });
            Ok(())
        })
    }
}

/// Transport side of a [`ChannelSink`]
#[derive(Debug)]
pub struct SinkReceiver {
    frames: mpsc::Receiver<Outgoing>,
    signal: CloseSignal,
}

impl SinkReceiver {
    /// Next queued frame, `None` once every sink handle is gone
    pub async fn recv(&mut self) -> Option<Outgoing> {
        self.frames.recv().await
    }

    /// Queued frame, if one is ready
    pub fn try_recv(&mut self) -> Option<Outgoing> {
        self.frames.try_recv().ok()
    }

    /// Another handle on the close signal
    pub fn close_signal(&self) -> CloseSignal {
        self.signal.clone()
    }

    /// Split into the frame queue and the close signal
    pub fn into_parts(self) -> (mpsc::Receiver<Outgoing>, CloseSignal) {
        (self.frames, self.signal)
    }
}

/// Watches for [`ClientSink::close`] on a [`ChannelSink`]
#[derive(Debug, Clone)]
pub struct CloseSignal {
    rx: watch::Receiver<Option<CloseReason>>,
}

impl CloseSignal {
    /// Reason the sink was closed with, if any
    pub fn reason(&self) -> Option<CloseReason> {
        *self.rx.borrow()
    }

    /// Wait until the sink is closed.
    ///
    /// Resolves to `None` if every sink handle is dropped without a close.
    pub async fn closed(&mut self) -> Option<CloseReason> {
        loop {
            let reason = *self.rx.borrow_and_update();
            if reason.is_some() {
                return reason;
            }
            if self.rx.changed().await.is_err() {
                return *self.rx.borrow();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::EventError;

    fn frame() -> Outgoing {
        Outgoing::error(&EventError::NotInRoom)
    }

    #[tokio::test]
    async fn test_frames_delivered_in_order() {
        let (sink, mut rx) = ChannelSink::new(8);

        sink.write(frame()).await.unwrap();
        sink.write(Outgoing::error(&EventError::AlreadyInRoom))
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(frame()));
        assert_eq!(
            rx.recv().await,
            Some(Outgoing::error(&EventError::AlreadyInRoom))
        );
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_close_bypasses_full_queue() {
        let (sink, rx) = ChannelSink::new(1);
        let mut signal = rx.close_signal();

        sink.write(frame()).await.unwrap();
        // Queue is full and nobody drains it
        let blocked = tokio::time::timeout(Duration::from_millis(20), sink.write(frame())).await;
        assert!(blocked.is_err());

        let close = tokio::time::timeout(
            Duration::from_millis(20),
            sink.close(CloseReason::Unresponsive),
        )
        .await;
        assert_eq!(close, Ok(Ok(())));

        let reason = tokio::time::timeout(Duration::from_millis(20), signal.closed()).await;
        assert_eq!(reason, Ok(Some(CloseReason::Unresponsive)));
    }

    #[tokio::test]
    async fn test_first_close_reason_wins() {
        let (sink, rx) = ChannelSink::new(4);

        sink.close(CloseReason::Unresponsive).await.unwrap();
        sink.close(CloseReason::Shutdown).await.unwrap();

        assert_eq!(rx.close_signal().reason(), Some(CloseReason::Unresponsive));
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let (sink, mut rx) = ChannelSink::new(4);

        sink.close(CloseReason::RoomClosed).await.unwrap();

        assert!(sink.is_closed());
        assert_eq!(sink.write(frame()).await, Err(SinkError::Closed));
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_signal_ends_when_sink_dropped() {
        let (sink, rx) = ChannelSink::new(1);
        let mut signal = rx.close_signal();

        drop(sink);
        assert_eq!(signal.closed().await, None);
    }

    #[tokio::test]
    async fn test_write_after_receiver_dropped() {
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);

        let result = sink.write(frame()).await;
        assert_eq!(result, Err(SinkError::Closed));
    }
}
