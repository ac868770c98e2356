//! Operation name resolution.
//!
//! A plain name (`echo`) is looked up among registered operations. A dotted
//! name (`acct.Login`) addresses a method on a registered object; only one
//! level of nesting is supported.

use std::sync::Arc;

use crate::error::DispatchError;
use crate::handler::CallableEntry;
use crate::registry::Registry;

/// Separates the object name from the method name in a dotted operation name.
pub const METHOD_SEPARATOR: char = '.';

/// A callable resolved from an operation name.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub entry: CallableEntry,
    /// Whether the first declared parameter is the reserved context type.
    pub has_context: bool,
}

impl Resolved {
    fn new(entry: CallableEntry) -> Self {
        let has_context = entry.signature().has_context();
        Self { entry, has_context }
    }
}

/// Resolves `name` against `registry`.
///
/// # Errors
///
/// - `NestedAccessNotSupported` if `name` contains more than one separator,
///   checked before any lookup.
/// - `UnknownObject` / `UnknownMethod` for a dotted name whose object or
///   method is not registered.
/// - `UnknownOperation` for an unregistered plain name.
pub fn resolve(registry: &Registry, name: &str) -> Result<Resolved, DispatchError> {
    let Some((object_name, method_name)) = name.split_once(METHOD_SEPARATOR) else {
        return registry
            .operation(name)
            .cloned()
            .map(Resolved::new)
            .ok_or_else(|| DispatchError::UnknownOperation {
                name: name.to_string(),
            });
    };

    if method_name.contains(METHOD_SEPARATOR) {
        return Err(DispatchError::NestedAccessNotSupported {
            name: name.to_string(),
        });
    }

    let object = registry
        .object(object_name)
        .ok_or_else(|| DispatchError::UnknownObject {
            name: object_name.to_string(),
        })?;

    Arc::clone(object)
        .methods()
        .take(method_name)
        .map(Resolved::new)
        .ok_or_else(|| DispatchError::UnknownMethod {
            object: object_name.to_string(),
            method: method_name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::context::Context;
    use crate::registry::{Methods, ServiceObject};

    struct Account;

    impl ServiceObject for Account {
        fn methods(self: Arc<Self>) -> Methods {
            Methods::new()
                .method("Login", |_ctx: Context, _name: String| -> Result<(), String> { Ok(()) })
                .method("Count", || 1.0_f64)
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_operation("echo", |s: String| s).unwrap();
        registry.register_object("acct", Arc::new(Account)).unwrap();
        registry
    }

    #[test]
    fn plain_name_resolves_operation() {
        let resolved = resolve(&registry(), "echo").unwrap();
        assert!(!resolved.has_context);
        assert_eq!(resolved.entry.signature().required_arity(), 1);
    }

    #[test]
    fn dotted_name_resolves_method() {
        let resolved = resolve(&registry(), "acct.Login").unwrap();
        assert!(resolved.has_context);
        assert_eq!(resolved.entry.signature().required_arity(), 1);

        let resolved = resolve(&registry(), "acct.Count").unwrap();
        assert!(!resolved.has_context);
    }

    #[test]
    fn unknown_plain_name() {
        let err = resolve(&registry(), "nope").unwrap_err();
        assert_eq!(err, DispatchError::UnknownOperation { name: "nope".into() });
    }

    #[test]
    fn unknown_object() {
        let err = resolve(&registry(), "bank.Login").unwrap_err();
        assert_eq!(err, DispatchError::UnknownObject { name: "bank".into() });
    }

    #[test]
    fn unknown_method() {
        let err = resolve(&registry(), "acct.Logout").unwrap_err();
        assert_eq!(
            err,
            DispatchError::UnknownMethod {
                object: "acct".into(),
                method: "Logout".into()
            }
        );
    }

    #[test]
    fn operations_are_not_reachable_through_objects() {
        // "echo" is an operation, not an object.
        let err = resolve(&registry(), "echo.Login").unwrap_err();
        assert!(matches!(err, DispatchError::UnknownObject { .. }));
    }

    proptest! {
        #[test]
        fn more_than_one_separator_is_always_nested_access(
            head in prop_oneof![Just("acct".to_string()), "[a-z]{0,6}"],
            middle in "[A-Za-z]{0,6}",
            tail in "[A-Za-z.]{0,6}",
        ) {
            let name = format!("{head}.{middle}.{tail}");
            let err = resolve(&registry(), &name).unwrap_err();
            let is_nested = matches!(err, DispatchError::NestedAccessNotSupported { .. });
            prop_assert!(is_nested);
        }
    }
}
