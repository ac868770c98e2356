//! kairpc core: a registry of named callables, dynamic argument coercion and
//! result envelopes for remote invocation.
//!
//! A [`Registry`] holds free-standing operations (`echo`) and stateful
//! objects whose methods are addressed as `object.Method`. Each request is
//! carried by a [`Context`] and dispatched with [`Registry::execute`], which
//! resolves the name, validates and coerces positional arguments against the
//! callable's [`Signature`], invokes it, and marshals its outputs into a
//! [`ResultEnvelope`].

pub mod coerce;
pub mod context;
mod dispatch;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod marshal;
pub mod registry;
pub mod resolver;
pub mod signature;
pub mod value;

pub use context::Context;
pub use envelope::{RequestEnvelope, ResultEnvelope, DEFAULT_ENDPOINT_PATH};
pub use error::{DispatchError, RegistrationError};
pub use handler::{CallableEntry, Handler};
pub use registry::{Methods, Registry, ServiceObject};
pub use resolver::{resolve, Resolved, METHOD_SEPARATOR};
pub use signature::{Argument, Param, ReturnValue, Returns, Signature};
pub use value::{TypeTag, Value};
