//! The single per-request entry point: resolve, coerce, invoke, marshal.

use tracing::{debug, debug_span};

use crate::coerce::coerce_arguments;
use crate::context::Context;
use crate::envelope::ResultEnvelope;
use crate::error::DispatchError;
use crate::marshal::marshal;
use crate::registry::Registry;
use crate::resolver::resolve;

impl Registry {
    /// Dispatches the request carried by `ctx` exactly once.
    ///
    /// Runs synchronously on the calling thread and blocks for as long as
    /// the target callable does. A failure reported by the callable itself is
    /// embedded in the returned envelope's `error`; an `Err` means the request
    /// could not be dispatched and the callable was not invoked.
    ///
    /// # Errors
    ///
    /// Any [`DispatchError`] raised by resolution, coercion or argument
    /// binding.
    pub fn execute(&self, ctx: &Context) -> Result<ResultEnvelope, DispatchError> {
        let request = ctx.request();
        let span = debug_span!(
            "dispatch",
            operation = %request.operation,
            id = request.id.as_deref().unwrap_or_default(),
        );
        let _enter = span.enter();

        let result = self.dispatch(ctx);
        if let Err(err) = &result {
            debug!(error = %err, "dispatch rejected");
        }
        result
    }

    fn dispatch(&self, ctx: &Context) -> Result<ResultEnvelope, DispatchError> {
        let request = ctx.request();
        let resolved = resolve(self, &request.operation)?;
        let args = coerce_arguments(ctx, &resolved)?;
        let outputs = resolved.entry.invoke(args)?;
        Ok(marshal(
            request.id.clone(),
            resolved.entry.signature(),
            outputs,
        ))
    }
}
