use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::RegistrationError;
use crate::handler::{CallableEntry, Handler};
use crate::resolver::METHOD_SEPARATOR;

// ---------------------------------------------------------------------------
// ServiceObject trait
// ---------------------------------------------------------------------------

/// A stateful object whose methods can be dispatched as `object.Method`.
///
/// The method table is built on demand each time a dotted name addressing
/// this object is resolved; it is never expanded into the registry.
///
/// ```
/// use std::sync::Arc;
/// use kairpc_core::{Methods, ServiceObject};
///
/// struct Greeter;
///
/// impl Greeter {
///     fn hello(&self, name: &str) -> String {
///         format!("hello {name}")
///     }
/// }
///
/// impl ServiceObject for Greeter {
///     fn methods(self: Arc<Self>) -> Methods {
///         Methods::new().method("Hello", move |name: String| self.hello(&name))
///     }
/// }
/// ```
pub trait ServiceObject: Send + Sync + 'static {
    fn methods(self: Arc<Self>) -> Methods;
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// Method table exposed by a [`ServiceObject`].
#[derive(Debug, Clone, Default)]
pub struct Methods {
    table: HashMap<String, CallableEntry>,
}

impl Methods {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method. A later method with the same name replaces an earlier one.
    #[must_use]
    pub fn method<H, Args>(mut self, name: &str, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.table.insert(name.to_string(), CallableEntry::new(handler));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CallableEntry> {
        self.table.get(name)
    }

    /// Removes and returns a method, consuming it from this table.
    pub fn take(&mut self, name: &str) -> Option<CallableEntry> {
        self.table.remove(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CallableEntry)> {
        self.table.iter().map(|(name, entry)| (name.as_str(), entry))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Table of dispatchable operations and objects.
///
/// Registration takes `&mut self` and is meant to happen during startup.
/// Once populated, share the registry behind an `Arc`; dispatch only needs
/// `&self` and never mutates it, so concurrent lookups need no locking. A host
/// that wants to register while serving must serialize that itself (e.g. with
/// a read-write lock around the registry).
#[derive(Default)]
pub struct Registry {
    operations: HashMap<String, CallableEntry>,
    objects: HashMap<String, Arc<dyn ServiceObject>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a free-standing operation under `name`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for an empty name or one containing the method
    /// separator, `DuplicateName` if `name` is taken, and `NotCallable` if the
    /// handler's signature cannot be dispatched.
    pub fn register_operation<H, Args>(
        &mut self,
        name: &str,
        handler: H,
    ) -> Result<(), RegistrationError>
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.register_entry(name, CallableEntry::new(handler))
    }

    /// Registers an already constructed [`CallableEntry`].
    ///
    /// # Errors
    ///
    /// Same as [`Registry::register_operation`].
    pub fn register_entry(
        &mut self,
        name: &str,
        entry: CallableEntry,
    ) -> Result<(), RegistrationError> {
        validate_name(name)?;
        if self.operations.contains_key(name) {
            return Err(RegistrationError::DuplicateName {
                kind: "operation",
                name: name.to_string(),
            });
        }
        entry
            .signature()
            .validate()
            .map_err(|reason| RegistrationError::NotCallable {
                name: name.to_string(),
                reason,
            })?;

        debug!(
            operation = name,
            params = ?entry.signature().params(),
            returns = entry.signature().return_count(),
            "registered operation"
        );
        self.operations.insert(name.to_string(), entry);
        Ok(())
    }

    /// Registers a stateful object whose methods become dispatchable as
    /// `name.Method`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` or `DuplicateName` as for operations, and
    /// `NotAnObject` if the object exposes no methods or one of its methods
    /// has an undispatchable signature.
    pub fn register_object<T: ServiceObject>(
        &mut self,
        name: &str,
        object: Arc<T>,
    ) -> Result<(), RegistrationError> {
        validate_name(name)?;
        if self.objects.contains_key(name) {
            return Err(RegistrationError::DuplicateName {
                kind: "object",
                name: name.to_string(),
            });
        }

        let methods = Arc::clone(&object).methods();
        if methods.is_empty() {
            return Err(RegistrationError::NotAnObject {
                name: name.to_string(),
                reason: "no dispatchable methods".to_string(),
            });
        }
        for (method, entry) in methods.iter() {
            entry.signature().validate().map_err(|reason| RegistrationError::NotAnObject {
                name: name.to_string(),
                reason: format!("method '{method}': {reason}"),
            })?;
        }

        debug!(object = name, methods = methods.len(), "registered object");
        self.objects.insert(name.to_string(), object);
        Ok(())
    }

    /// Looks up a registered operation by its plain name.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&CallableEntry> {
        self.operations.get(name)
    }

    /// Looks up a registered object by name.
    #[must_use]
    pub fn object(&self, name: &str) -> Option<&Arc<dyn ServiceObject>> {
        self.objects.get(name)
    }

    /// Names of all registered operations, in no particular order.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Names of all registered objects, in no particular order.
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("objects", &self.objects.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn validate_name(name: &str) -> Result<(), RegistrationError> {
    if name.is_empty() || name.contains(METHOD_SEPARATOR) {
        return Err(RegistrationError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
