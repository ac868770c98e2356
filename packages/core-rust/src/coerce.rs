//! Argument validation and coercion.
//!
//! Checks are applied in a fixed order: calling-mode conflicts, then arity,
//! then each argument in turn (array normalization followed by an exact type
//! match against the declared parameter). The first failure wins and the
//! callable is never invoked.

use crate::context::Context;
use crate::error::DispatchError;
use crate::resolver::Resolved;
use crate::signature::Argument;
use crate::value::{TypeTag, Value};

/// Builds the final argument list for `resolved`, injecting the context
/// first when the callable declares it.
///
/// # Errors
///
/// Returns the first of `ModeConflict`, `JsonModeRequiresContext`,
/// `NotJsonModeCallable`, `ArityMismatch`, `HeterogeneousArray`,
/// `UnsupportedArrayElement` or `ParameterTypeMismatch` that applies.
pub fn coerce_arguments(
    ctx: &Context,
    resolved: &Resolved,
) -> Result<Vec<Argument>, DispatchError> {
    let request = ctx.request();
    let signature = resolved.entry.signature();
    let supplied = request.params.len();

    if request.payload().is_some() {
        if supplied > 0 {
            return Err(DispatchError::ModeConflict);
        }
        if !resolved.has_context {
            return Err(DispatchError::JsonModeRequiresContext {
                name: request.operation.clone(),
            });
        }
        if signature.params().len() != 1 {
            return Err(DispatchError::NotJsonModeCallable {
                name: request.operation.clone(),
            });
        }
    }

    let required = signature.required_arity();
    if supplied != required {
        return Err(DispatchError::ArityMismatch {
            required,
            declared: signature.param_names(),
            supplied,
        });
    }

    let offset = usize::from(resolved.has_context);
    let mut args = Vec::with_capacity(signature.params().len());
    if resolved.has_context {
        args.push(Argument::Context(ctx.clone()));
    }

    for (position, value) in request.params.iter().enumerate() {
        let index = position + offset;
        let arg = normalize(value.clone())?;
        let expected = signature.params()[index];
        let supplied_type = arg.type_tag();
        if supplied_type != expected {
            return Err(DispatchError::ParameterTypeMismatch {
                index,
                supplied_type: supplied_type.to_string(),
                supplied_value: value.to_string(),
                expected_type: expected.to_string(),
            });
        }
        args.push(arg);
    }

    Ok(args)
}

/// Normalizes a homogeneous array into its typed form.
///
/// The first element decides the element kind (text, boolean or number) and
/// every other element must match it. Empty arrays and non-array values pass
/// through unchanged.
///
/// # Errors
///
/// `HeterogeneousArray` when an element differs from the first element's
/// kind, `UnsupportedArrayElement` when the first element is not text,
/// boolean or number.
pub fn normalize(value: Value) -> Result<Argument, DispatchError> {
    let Value::Array(items) = value else {
        return Ok(Argument::Value(value));
    };

    match items.first() {
        None => Ok(Argument::Value(Value::Array(items))),
        Some(Value::Text(_)) => uniform(items, TypeTag::Text, |item| match item {
            Value::Text(s) => Some(s),
            _ => None,
        })
        .map(Argument::TextArray),
        Some(Value::Bool(_)) => uniform(items, TypeTag::Bool, |item| match item {
            Value::Bool(b) => Some(b),
            _ => None,
        })
        .map(Argument::BoolArray),
        Some(Value::Number(_)) => uniform(items, TypeTag::Number, |item| match item {
            Value::Number(n) => Some(n),
            _ => None,
        })
        .map(Argument::NumberArray),
        Some(other) => Err(DispatchError::UnsupportedArrayElement {
            value: other.to_string(),
        }),
    }
}

fn uniform<T>(
    items: Vec<Value>,
    kind: TypeTag,
    pick: impl Fn(Value) -> Option<T>,
) -> Result<Vec<T>, DispatchError> {
    items
        .into_iter()
        .map(|item| pick(item).ok_or(DispatchError::HeterogeneousArray { kind }))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::envelope::RequestEnvelope;
    use crate::handler::CallableEntry;

    fn resolved(entry: CallableEntry) -> Resolved {
        let has_context = entry.signature().has_context();
        Resolved { entry, has_context }
    }

    fn ctx(request: RequestEnvelope) -> Context {
        Context::new("session", request)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn context_is_injected_first() {
        let target = resolved(CallableEntry::new(|_c: Context, s: String| s));
        let args = coerce_arguments(&ctx(RequestEnvelope::new("echo", vec![text("hi")])), &target)
            .unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].type_tag(), TypeTag::Context);
        assert_eq!(args[1].type_tag(), TypeTag::Text);
    }

    #[test]
    fn arity_excludes_context() {
        let target = resolved(CallableEntry::new(|_c: Context, s: String| s));
        let err = coerce_arguments(&ctx(RequestEnvelope::new("echo", vec![])), &target).unwrap_err();
        assert_eq!(
            err,
            DispatchError::ArityMismatch {
                required: 1,
                declared: vec!["Context".into(), "String".into()],
                supplied: 0,
            }
        );

        let err = coerce_arguments(
            &ctx(RequestEnvelope::new("echo", vec![text("a"), text("b")])),
            &target,
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::ArityMismatch { supplied: 2, .. }));
    }

    #[test]
    fn mismatch_index_counts_the_context_slot() {
        let target = resolved(CallableEntry::new(|_c: Context, s: String| s));
        let err = coerce_arguments(
            &ctx(RequestEnvelope::new("echo", vec![Value::Number(3.0)])),
            &target,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DispatchError::ParameterTypeMismatch {
                index: 1,
                supplied_type: "f64".into(),
                supplied_value: "3".into(),
                expected_type: "String".into(),
            }
        );
    }

    #[test]
    fn homogeneous_arrays_normalize_to_typed_arrays() {
        assert!(matches!(
            normalize(Value::Array(vec![text("a"), text("b")])).unwrap(),
            Argument::TextArray(items) if items == ["a", "b"]
        ));
        assert!(matches!(
            normalize(Value::Array(vec![Value::Bool(true), Value::Bool(false)])).unwrap(),
            Argument::BoolArray(items) if items == [true, false]
        ));
        assert!(matches!(
            normalize(Value::Array(vec![Value::Number(1.0)])).unwrap(),
            Argument::NumberArray(items) if items == [1.0]
        ));
    }

    #[test]
    fn empty_array_passes_through() {
        let arg = normalize(Value::Array(vec![])).unwrap();
        assert_eq!(arg.type_tag(), TypeTag::List);
    }

    #[test]
    fn mixed_array_is_heterogeneous() {
        let err = normalize(Value::Array(vec![text("a"), Value::Number(1.0)])).unwrap_err();
        assert_eq!(
            err,
            DispatchError::HeterogeneousArray {
                kind: TypeTag::Text
            }
        );
    }

    #[test]
    fn unsupported_first_element() {
        let err = normalize(Value::Array(vec![Value::Null, text("a")])).unwrap_err();
        assert_eq!(
            err,
            DispatchError::UnsupportedArrayElement {
                value: "null".into()
            }
        );

        let nested = Value::Array(vec![Value::Array(vec![])]);
        assert!(matches!(
            normalize(nested),
            Err(DispatchError::UnsupportedArrayElement { .. })
        ));
    }

    #[test]
    fn typed_array_must_match_declared_element_type() {
        let target = resolved(CallableEntry::new(|v: Vec<f64>| v.len() == 2));
        let request = RequestEnvelope::new(
            "sum",
            vec![Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])],
        );
        assert!(coerce_arguments(&ctx(request), &target).is_ok());

        let request = RequestEnvelope::new("sum", vec![Value::Array(vec![text("x")])]);
        let err = coerce_arguments(&ctx(request), &target).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ParameterTypeMismatch { index: 0, expected_type, .. }
                if expected_type == "Vec<f64>"
        ));
    }

    #[test]
    fn map_argument_matches_map_parameter() {
        let target = resolved(CallableEntry::new(|m: BTreeMap<String, Value>| m.len() == 1));
        let mut fields = BTreeMap::new();
        fields.insert("k".to_string(), Value::Bool(true));
        let request = RequestEnvelope::new("keys", vec![Value::Map(fields)]);
        assert!(coerce_arguments(&ctx(request), &target).is_ok());
    }

    #[test]
    fn null_matches_no_declared_type() {
        let target = resolved(CallableEntry::new(|s: String| s));
        let request = RequestEnvelope::new("echo", vec![Value::Null]);
        let err = coerce_arguments(&ctx(request), &target).unwrap_err();
        assert!(matches!(err, DispatchError::ParameterTypeMismatch { .. }));
    }

    #[test]
    fn payload_and_params_conflict() {
        let target = resolved(CallableEntry::new(|_c: Context| true));
        let mut request = RequestEnvelope::with_payload("op", "{}");
        request.params = vec![text("x")];
        let err = coerce_arguments(&ctx(request), &target).unwrap_err();
        assert_eq!(err, DispatchError::ModeConflict);
    }

    #[test]
    fn payload_requires_context() {
        let target = resolved(CallableEntry::new(|| true));
        let err = coerce_arguments(&ctx(RequestEnvelope::with_payload("op", "{}")), &target)
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::JsonModeRequiresContext { name: "op".into() }
        );
    }

    #[test]
    fn payload_requires_context_only_signature() {
        let target = resolved(CallableEntry::new(|_c: Context, s: String| s));
        let err = coerce_arguments(&ctx(RequestEnvelope::with_payload("op", "{}")), &target)
            .unwrap_err();
        assert_eq!(err, DispatchError::NotJsonModeCallable { name: "op".into() });
    }

    #[test]
    fn payload_mode_passes_only_context() {
        let target = resolved(CallableEntry::new(|_c: Context| true));
        let args = coerce_arguments(&ctx(RequestEnvelope::with_payload("op", "{}")), &target)
            .unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].type_tag(), TypeTag::Context);
    }

    #[test]
    fn empty_payload_is_positional_mode() {
        let target = resolved(CallableEntry::new(|s: String| s));
        let mut request = RequestEnvelope::with_payload("op", "");
        request.params = vec![text("x")];
        assert!(coerce_arguments(&ctx(request), &target).is_ok());
    }
}
