use super::{panic_message, Deferred, ExecutionStrategy};
use crate::arguments::TypedArguments;
use crate::descriptor::{HandlerDescriptor, HandlerKind};
use crate::error::HandlerError;
use crate::service::Service;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Runs the operation on the dispatching context and returns an
/// already-resolved [`Deferred`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingStrategy;

impl ExecutionStrategy for BlockingStrategy {
    fn name(&self) -> &'static str {
        "blocking"
    }

    fn can_handle(&self, descriptor: &HandlerDescriptor) -> bool {
        descriptor.kind == HandlerKind::Blocking
    }

    fn execute(
        &self,
        service: Arc<dyn Service>,
        descriptor: &HandlerDescriptor,
        args: TypedArguments,
    ) -> Deferred {
        let operation = &descriptor.operation;
        let started = Instant::now();

        let result = catch_unwind(AssertUnwindSafe(|| service.invoke(operation, args)))
            .unwrap_or_else(|panic| {
                // H3: Handler panic caught
                let message = panic_message(panic.as_ref());
                error!(
                    operation = %operation,
                    panic_message = %message,
                    "Handler panicked - CRITICAL"
                );
                Err(HandlerError::failed(format!("handler panicked: {}", message)))
            });

        // H4: Handler execution complete
        debug!(
            operation = %operation,
            execution_time_us = started.elapsed().as_micros() as u64,
            success = result.is_ok(),
            "Handler execution complete"
        );
        Deferred::ready(result)
    }
}
