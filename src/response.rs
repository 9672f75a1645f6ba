//! Outbound response boundary.
//!
//! The dispatcher writes through a [`ResponseSink`]. It calls either
//! `set_content_type` followed by `write_body`, or `fail`, and does so once
//! per dispatched request, possibly from a different thread or coroutine
//! than the one that called `dispatch`.
//!
//! Two sinks are provided:
//!
//! - [`ChannelSink`] forwards the single terminal outcome over a `may`
//!   channel, so a transport worker can park until a deferred handler finishes
//! - [`BufferedResponse`] keeps the outcome in shared memory for inspection

use crate::error::DispatchError;
use may::sync::mpsc;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where the encoded result goes.
pub trait ResponseSink: Send {
    fn set_content_type(&mut self, mime_type: &str);

    /// Write the full body. Called once, after [`set_content_type`](Self::set_content_type).
    ///
    /// # Errors
    ///
    /// Any I/O failure of the underlying transport.
    fn write_body(&mut self, body: &str) -> io::Result<()>;

    /// Terminal failure after the handler was started.
    fn fail(&mut self, error: DispatchError);
}

/// A completed response as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedResponse {
    pub content_type: String,
    pub body: String,
}

/// Terminal outcome delivered by a [`ChannelSink`].
pub type ResponseResult = Result<DispatchedResponse, DispatchError>;

/// [`ResponseSink`] that sends its outcome to a receiver.
///
/// The receiver sees exactly one message; once the sink is dropped further
/// `recv` calls return an error.
pub struct ChannelSink {
    delivery: Delivery,
    content_type: String,
}

enum Delivery {
    Open(mpsc::Sender<ResponseResult>),
    Delivered,
    /// The receiver was gone when the outcome was sent.
    Disconnected,
}

impl std::fmt::Debug for ChannelSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSink")
            .field("content_type", &self.content_type)
            .field("finished", &!matches!(self.delivery, Delivery::Open(_)))
            .finish()
    }
}

impl ChannelSink {
    /// Create a sink and the receiver for its outcome.
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<ResponseResult>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                delivery: Delivery::Open(tx),
                content_type: String::new(),
            },
            rx,
        )
    }

    fn finish(&mut self, outcome: ResponseResult) -> io::Result<()> {
        let broken = || io::Error::new(io::ErrorKind::BrokenPipe, "response receiver dropped");
        match std::mem::replace(&mut self.delivery, Delivery::Delivered) {
            Delivery::Open(tx) => tx.send(outcome).map_err(|_| {
                self.delivery = Delivery::Disconnected;
                broken()
            }),
            Delivery::Delivered => {
                warn!("Response already delivered, dropping second outcome");
                Ok(())
            }
            Delivery::Disconnected => {
                self.delivery = Delivery::Disconnected;
                Err(broken())
            }
        }
    }
}

impl ResponseSink for ChannelSink {
    fn set_content_type(&mut self, mime_type: &str) {
        self.content_type = mime_type.to_string();
    }

    fn write_body(&mut self, body: &str) -> io::Result<()> {
        let response = DispatchedResponse {
            content_type: std::mem::take(&mut self.content_type),
            body: body.to_string(),
        };
        self.finish(Ok(response))
    }

    fn fail(&mut self, error: DispatchError) {
        if self.finish(Err(error)).is_err() {
            debug!("Response receiver gone, failure not delivered");
        }
    }
}

#[derive(Debug, Default)]
struct BufferedState {
    content_type: Option<String>,
    body: Option<String>,
    error: Option<DispatchError>,
    completions: usize,
}

/// In-memory [`ResponseSink`].
///
/// Clones share the same buffer: hand one clone to the dispatcher and keep
/// the other to read the outcome.
#[derive(Debug, Clone, Default)]
pub struct BufferedResponse {
    inner: Arc<Mutex<BufferedState>>,
}

impl BufferedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed clone suitable for [`Dispatcher::dispatch`](crate::dispatcher::Dispatcher::dispatch).
    #[must_use]
    pub fn sink(&self) -> Box<dyn ResponseSink> {
        Box::new(self.clone())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.inner.lock().content_type.clone()
    }

    #[must_use]
    pub fn body(&self) -> Option<String> {
        self.inner.lock().body.clone()
    }

    #[must_use]
    pub fn error(&self) -> Option<DispatchError> {
        self.inner.lock().error.clone()
    }

    /// Number of terminal writes (`write_body` or `fail`) received.
    #[must_use]
    pub fn completions(&self) -> usize {
        self.inner.lock().completions
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completions() > 0
    }

    /// The terminal outcome, if any.
    #[must_use]
    pub fn outcome(&self) -> Option<ResponseResult> {
        let state = self.inner.lock();
        if let Some(err) = &state.error {
            return Some(Err(err.clone()));
        }
        state.body.as_ref().map(|body| {
            Ok(DispatchedResponse {
                content_type: state.content_type.clone().unwrap_or_default(),
                body: body.clone(),
            })
        })
    }
}

impl ResponseSink for BufferedResponse {
    fn set_content_type(&mut self, mime_type: &str) {
        self.inner.lock().content_type = Some(mime_type.to_string());
    }

    fn write_body(&mut self, body: &str) -> io::Result<()> {
        let mut state = self.inner.lock();
        state.body = Some(body.to_string());
        state.completions += 1;
        Ok(())
    }

    fn fail(&mut self, error: DispatchError) {
        let mut state = self.inner.lock();
        state.error = Some(error);
        state.completions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers_once() {
        let (mut sink, rx) = ChannelSink::channel();
        sink.set_content_type("text/plain");
        sink.write_body("hello").expect("write");
        sink.fail(DispatchError::ResponseWrite {
            message: "late".into(),
        });
        drop(sink);

        let first = rx.recv().expect("first outcome");
        assert_eq!(
            first,
            Ok(DispatchedResponse {
                content_type: "text/plain".into(),
                body: "hello".into(),
            })
        );
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_channel_sink_broken_pipe() {
        let (mut sink, rx) = ChannelSink::channel();
        drop(rx);
        let err = sink.write_body("x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        // Stays broken rather than looking delivered
        let err = sink.write_body("y").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    /// Counts WARN events.
    #[derive(Clone, Default)]
    struct WarnCounter(Arc<Mutex<usize>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::WARN {
                *self.0.lock() += 1;
            }
        }
    }

    fn warnings_during(f: impl FnOnce()) -> usize {
        use tracing_subscriber::layer::SubscriberExt;
        let counter = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        tracing::subscriber::with_default(subscriber, f);
        let count = *counter.0.lock();
        count
    }

    #[test]
    fn test_failure_after_broken_pipe_is_not_a_duplicate() {
        let warnings = warnings_during(|| {
            let (mut sink, rx) = ChannelSink::channel();
            drop(rx);
            sink.set_content_type("text/plain");
            assert!(sink.write_body("x").is_err());
            sink.fail(DispatchError::ResponseWrite {
                message: "response receiver dropped".into(),
            });
        });
        assert_eq!(warnings, 0);

        let warnings = warnings_during(|| {
            let (mut sink, _rx) = ChannelSink::channel();
            sink.write_body("x").expect("write");
            sink.fail(DispatchError::ResponseWrite {
                message: "late".into(),
            });
        });
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_buffered_response_shares_state() {
        let buffer = BufferedResponse::new();
        let mut sink = buffer.sink();
        assert!(buffer.outcome().is_none());
        sink.set_content_type("application/json");
        sink.write_body("{}").expect("write");
        assert_eq!(buffer.content_type().as_deref(), Some("application/json"));
        assert_eq!(buffer.body().as_deref(), Some("{}"));
        assert_eq!(buffer.completions(), 1);
    }
}
