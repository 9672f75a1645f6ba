//! One-shot deferred results.
//!
//! A [`Deferred`] is the uniform completion contract every execution
//! strategy returns. It holds at most one result and at most one
//! continuation. Whichever side arrives second runs the continuation:
//! registering on a finished value runs it inline, completing a value that
//! already has a continuation runs it on the completing context.

use super::{panic_message, ExecutionStrategy};
use crate::arguments::TypedArguments;
use crate::descriptor::{HandlerDescriptor, HandlerKind};
use crate::error::HandlerError;
use crate::service::{HandlerResult, Service};
use may::coroutine;
use may::sync::mpsc;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

type Continuation = Box<dyn FnOnce(HandlerResult) + Send>;

enum State {
    Pending(Option<Continuation>),
    Ready(HandlerResult),
    Done,
}

/// Where a continuation registered with [`Deferred::on_complete`] ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumption {
    /// The result was already available; the continuation ran before `on_complete` returned
    Inline,
    /// The continuation will run on the context that completes the result
    Scheduled,
}

/// A result that may not be available yet.
#[must_use = "a Deferred does nothing until a continuation is registered"]
pub struct Deferred {
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Write side of a pending [`Deferred`].
///
/// Consumed by [`complete`](Self::complete), so a result is delivered at
/// most once. Dropping a completer without completing it resolves the
/// deferred with a [`HandlerError`].
pub struct Completer {
    state: Option<Arc<Mutex<State>>>,
}

impl std::fmt::Debug for Completer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completer").finish_non_exhaustive()
    }
}

impl Deferred {
    /// An already-resolved result.
    pub fn ready(result: HandlerResult) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Ready(result))),
        }
    }

    /// A pending result and the handle that resolves it.
    pub fn pending() -> (Self, Completer) {
        let state = Arc::new(Mutex::new(State::Pending(None)));
        (
            Self {
                state: Arc::clone(&state),
            },
            Completer { state: Some(state) },
        )
    }

    /// Run `f` on a new coroutine and resolve with its result.
    ///
    /// A panic in `f` resolves the deferred with [`HandlerError::Failed`].
    pub fn spawn<F>(f: F) -> Self
    where
        F: FnOnce() -> HandlerResult + Send + 'static,
    {
        let (deferred, completer) = Self::pending();
        // The completer lives in a shared slot so a failed spawn can still resolve it.
        let slot = Arc::new(Mutex::new(Some(completer)));
        let worker_slot = Arc::clone(&slot);

        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
        // The closure is Send + 'static and owns everything it touches, and a
        // panic inside `f` is caught before it can unwind through the scheduler.
        let spawn_result = unsafe {
            coroutine::Builder::new().spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
                    let message = panic_message(panic.as_ref());
                    error!(panic_message = %message, "Deferred computation panicked");
                    Err(HandlerError::failed(format!("handler panicked: {}", message)))
                });
                if let Some(completer) = worker_slot.lock().take() {
                    completer.complete(result);
                }
            })
        };

        if let Err(e) = spawn_result {
            error!(error = %e, "Failed to spawn deferred coroutine - CRITICAL");
            if let Some(completer) = slot.lock().take() {
                completer.complete(Err(HandlerError::failed(format!(
                    "failed to spawn coroutine: {}",
                    e
                ))));
            }
        }
        deferred
    }

    /// Whether the result is already available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), State::Ready(_))
    }

    /// Register the single continuation.
    ///
    /// The continuation receives the result exactly once. It must only
    /// capture data that is safe to use on any thread or coroutine.
    pub fn on_complete<F>(self, f: F) -> Resumption
    where
        F: FnOnce(HandlerResult) + Send + 'static,
    {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, State::Done) {
            State::Ready(result) => {
                drop(state);
                f(result);
                Resumption::Inline
            }
            State::Pending(None) => {
                *state = State::Pending(Some(Box::new(f)));
                Resumption::Scheduled
            }
            // Unreachable through the public API: on_complete consumes the only Deferred
            State::Pending(Some(existing)) => {
                *state = State::Pending(Some(existing));
                warn!("Continuation already registered, ignoring");
                Resumption::Scheduled
            }
            State::Done => {
                warn!("Deferred already consumed, ignoring continuation");
                Resumption::Scheduled
            }
        }
    }

    /// Block the current thread or coroutine until the result is available.
    pub fn wait(self) -> HandlerResult {
        let (tx, rx) = mpsc::channel();
        let _ = self.on_complete(move |result| {
            let _ = tx.send(result);
        });
        rx.recv()
            .unwrap_or_else(|_| Err(HandlerError::failed("deferred result was lost")))
    }
}

impl Completer {
    /// Resolve the deferred, running its continuation here if one is registered.
    pub fn complete(mut self, result: HandlerResult) {
        if let Some(state) = self.state.take() {
            resolve(&state, result);
        }
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            debug!("Completer dropped without a result");
            resolve(
                &state,
                Err(HandlerError::failed("deferred computation was abandoned")),
            );
        }
    }
}

fn resolve(state: &Mutex<State>, result: HandlerResult) {
    let mut guard = state.lock();
    match std::mem::replace(&mut *guard, State::Done) {
        State::Pending(Some(continuation)) => {
            // Run outside the lock; the continuation may be arbitrarily slow
            drop(guard);
            continuation(result);
        }
        State::Pending(None) => *guard = State::Ready(result),
        other => *guard = other,
    }
}

/// Runs operations that hand back their own [`Deferred`] via
/// [`Service::invoke_deferred`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredStrategy;

impl ExecutionStrategy for DeferredStrategy {
    fn name(&self) -> &'static str {
        "deferred"
    }

    fn can_handle(&self, descriptor: &HandlerDescriptor) -> bool {
        descriptor.kind == HandlerKind::Deferred
    }

    fn execute(
        &self,
        service: Arc<dyn Service>,
        descriptor: &HandlerDescriptor,
        args: TypedArguments,
    ) -> Deferred {
        let operation = &descriptor.operation;
        catch_unwind(AssertUnwindSafe(|| service.invoke_deferred(operation, args)))
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                error!(
                    operation = %operation,
                    panic_message = %message,
                    "Deferred handler panicked before returning - CRITICAL"
                );
                Deferred::ready(Err(HandlerError::failed(format!(
                    "handler panicked: {}",
                    message
                ))))
            })
    }
}
