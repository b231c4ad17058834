//! In-process response channel standing in for a server-streaming RPC.
//!
//! [`ResponseSender`] is the transport-owned [`PushHandle`] a scoring call
//! writes into; [`ResponseStream`] is what the client reads. Wire encoding is
//! left to whatever RPC framework wraps these.

use crate::element::PushHandle;
use crate::error::{Error, Result};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

enum Frame<T> {
    Item(T),
    Error(Error),
    End,
}

/// Create a connected response sender and stream.
pub fn response_channel<T>() -> (ResponseSender<T>, ResponseStream<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ResponseSender {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        },
        ResponseStream { rx, done: false },
    )
}

/// Writing half of a response stream.
///
/// Honors at most one terminal call across all clones; anything after it is
/// dropped.
pub struct ResponseSender<T> {
    tx: mpsc::UnboundedSender<Frame<T>>,
    closed: Arc<AtomicBool>,
}

impl<T> Clone for ResponseSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<T> ResponseSender<T> {
    /// Whether the client side has gone away.
    pub fn is_disconnected(&self) -> bool {
        self.tx.is_closed()
    }

    /// Whether a terminal frame has been written.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close_with(&self, frame: Frame<T>) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::trace!("response stream already closed, terminal dropped");
            return;
        }
        if self.tx.send(frame).is_err() {
            tracing::debug!("response stream: client disconnected before terminal");
        }
    }
}

impl<T: Send> PushHandle<T> for ResponseSender<T> {
    fn deliver(&self, item: T) {
        if self.is_closed() {
            tracing::trace!("response stream closed, element dropped");
            return;
        }
        if self.tx.send(Frame::Item(item)).is_err() {
            tracing::trace!("response stream: client disconnected, element dropped");
        }
    }

    fn fail(&self, error: Error) {
        self.close_with(Frame::Error(error));
    }

    fn finish(&self) {
        self.close_with(Frame::End);
    }
}

/// Reading half of a response stream.
///
/// Yields `Ok(item)` per element, then ends on completion or yields a single
/// `Err` on failure. If every sender is dropped without a terminal frame the
/// stream reports that as a transport error rather than ending quietly.
pub struct ResponseStream<T> {
    rx: mpsc::UnboundedReceiver<Frame<T>>,
    done: bool,
}

impl<T> ResponseStream<T> {
    /// Receive the next item.
    ///
    /// Returns `None` once the stream has ended.
    pub async fn next_item(&mut self) -> Option<Result<T>> {
        std::future::poll_fn(|cx| self.poll_frame(cx)).await
    }

    /// Whether the stream has delivered its terminal frame.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn poll_frame(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<T>>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Frame::Item(item))) => Poll::Ready(Some(Ok(item))),
            Poll::Ready(Some(Frame::Error(e))) => {
                self.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Some(Frame::End)) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(Some(Err(Error::Transport(
                    "response stream closed without a terminal signal".into(),
                ))))
            }
        }
    }
}

impl<T> futures::Stream for ResponseStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_frame(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_response_items_then_end() {
        let (tx, rx) = response_channel();

        tx.deliver(1);
        tx.deliver(2);
        tx.finish();
        tx.deliver(3);

        let items: Vec<_> = rx.collect().await;
        assert_eq!(items, vec![Ok(1), Ok(2)]);
    }

    #[tokio::test]
    async fn test_response_single_terminal() {
        let (tx, mut rx) = response_channel::<u32>();

        tx.fail(Error::Pipeline("boom".into()));
        tx.finish();
        tx.fail(Error::Cancelled);

        assert_eq!(
            rx.next_item().await,
            Some(Err(Error::Pipeline("boom".into())))
        );
        assert_eq!(rx.next_item().await, None);
        assert!(rx.is_done());
    }

    #[tokio::test]
    async fn test_response_dropped_sender_is_explicit() {
        let (tx, mut rx) = response_channel::<u32>();

        tx.deliver(7);
        drop(tx);

        assert_eq!(rx.next_item().await, Some(Ok(7)));
        match rx.next_item().await {
            Some(Err(e)) => assert!(e.is_transport()),
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(rx.next_item().await, None);
    }

    #[test]
    fn test_response_disconnect_visible() {
        let (tx, rx) = response_channel::<u32>();
        assert!(!tx.is_disconnected());
        drop(rx);
        assert!(tx.is_disconnected());
        // Writes after the client left are dropped quietly.
        tx.deliver(1);
        tx.finish();
        assert!(tx.is_closed());
    }
}
