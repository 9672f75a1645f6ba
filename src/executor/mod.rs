//! # Executor Module
//!
//! An [`ExecutionStrategy`] decides how a located service runs one
//! operation. Each strategy declares which descriptors it accepts; the
//! [`ExecutorSet`] holds them in registration order and the first one that
//! accepts a descriptor runs it, so selection is deterministic even when two
//! strategies overlap.
//!
//! Every strategy returns a [`Deferred`]:
//!
//! - [`BlockingStrategy`] calls [`Service::invoke`] in place and hands back an
//!   already-resolved result
//! - [`DeferredStrategy`] calls [`Service::invoke_deferred`] and hands back
//!   whatever pending result the handler produced
//!
//! Handler panics are caught by both strategies and surface as
//! [`HandlerError::Failed`](crate::error::HandlerError::Failed).

mod blocking;
mod deferred;

pub use blocking::BlockingStrategy;
pub use deferred::{Completer, Deferred, DeferredStrategy, Resumption};

use crate::arguments::TypedArguments;
use crate::descriptor::HandlerDescriptor;
use crate::error::DispatchError;
use crate::service::Service;
use std::any::Any;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Invocation policy for a class of descriptors.
pub trait ExecutionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this strategy knows how to run `descriptor`.
    fn can_handle(&self, descriptor: &HandlerDescriptor) -> bool;

    /// Start the operation. Must not panic; handler panics become failed results.
    fn execute(
        &self,
        service: Arc<dyn Service>,
        descriptor: &HandlerDescriptor,
        args: TypedArguments,
    ) -> Deferred;
}

/// Ordered collection of strategies.
#[derive(Clone, Default)]
pub struct ExecutorSet {
    strategies: Vec<Arc<dyn ExecutionStrategy>>,
}

impl std::fmt::Debug for ExecutorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ExecutorSet {
    /// An empty set. Dispatching through it fails with `NoExecutor`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `[deferred, blocking]`.
    #[must_use]
    pub fn standard() -> Self {
        Self::new().with(DeferredStrategy).with(BlockingStrategy)
    }

    #[must_use]
    pub fn with<S: ExecutionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.push(Arc::new(strategy));
        self
    }

    pub fn push(&mut self, strategy: Arc<dyn ExecutionStrategy>) {
        self.strategies.push(strategy);
    }

    /// First strategy, in registration order, that accepts `descriptor`.
    #[inline]
    #[must_use]
    pub fn select(&self, descriptor: &HandlerDescriptor) -> Option<&Arc<dyn ExecutionStrategy>> {
        self.strategies.iter().find(|s| s.can_handle(descriptor))
    }

    /// Names of every strategy that accepts `descriptor`, in registration order.
    #[must_use]
    pub fn claimants(&self, descriptor: &HandlerDescriptor) -> Vec<&'static str> {
        self.strategies
            .iter()
            .filter(|s| s.can_handle(descriptor))
            .map(|s| s.name())
            .collect()
    }

    /// Check that every descriptor is claimed by exactly one strategy.
    ///
    /// Overlap is only warned about; the first claimant keeps running it.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoExecutor`] for the first unclaimed descriptor.
    pub fn validate(&self, descriptors: &[Arc<HandlerDescriptor>]) -> Result<(), DispatchError> {
        for d in descriptors {
            let claimants = self.claimants(d);
            if claimants.len() > 1 {
                warn!(
                    operation = %d.qualified_name(),
                    kind = %d.kind,
                    claimants = ?claimants,
                    selected = ?claimants.first(),
                    "Descriptor claimed by more than one executor"
                );
            }
            if claimants.is_empty() {
                error!(
                    operation = %d.qualified_name(),
                    kind = %d.kind,
                    strategies = ?self.names(),
                    "No executor accepts descriptor - CRITICAL"
                );
                return Err(DispatchError::NoExecutor {
                    declaring_type: d.declaring_type.to_string(),
                    operation: d.operation.to_string(),
                });
            }
        }
        info!(
            descriptors = descriptors.len(),
            strategies = ?self.names(),
            "Executor coverage validated"
        );
        Ok(())
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
