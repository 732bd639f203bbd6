// ── Event bus subscriptions ──
//
// A subscriber that falls behind loses the oldest events in its ring.
// The subscription absorbs the resulting `Lagged` signals, counts what
// was lost, and carries on from the oldest retained event.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::debug;

use crate::model::RawNotificationEvent;

/// One subscriber's view of the event bus.
pub struct EventSubscription {
    receiver: broadcast::Receiver<Arc<RawNotificationEvent>>,
    dropped: u64,
}

impl EventSubscription {
    pub(crate) fn new(receiver: broadcast::Receiver<Arc<RawNotificationEvent>>) -> Self {
        Self {
            receiver,
            dropped: 0,
        }
    }

    /// Wait for the next event.
    /// Returns `None` once the bus has been dropped and the buffer drained.
    pub async fn recv(&mut self) -> Option<Arc<RawNotificationEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<RawNotificationEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Events this subscriber lost to drop-oldest overflow.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// Overflow gaps are skipped silently; the stream ends when the bus is
    /// dropped.
    pub fn into_stream(self) -> EventStream {
        EventStream {
            inner: BroadcastStream::new(self.receiver),
        }
    }

    fn note_lag(&mut self, skipped: u64) {
        self.dropped += skipped;
        debug!(skipped, total = self.dropped, "subscriber lagged, oldest events dropped");
    }
}

/// `Stream` adapter over a bus subscription.
pub struct EventStream {
    inner: BroadcastStream<Arc<RawNotificationEvent>>,
}

impl Stream for EventStream {
    type Item = Arc<RawNotificationEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    debug!(skipped, "stream subscriber lagged, oldest events dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
