//! Dispatch-time and registration-time error types.
//!
//! `Display` strings are caller-facing: transports render a `DispatchError`
//! verbatim into the `e` field of a failure envelope.

use crate::value::TypeTag;

/// Failures raised while resolving, validating, or decoding a single request.
///
/// All variants are recoverable at the request boundary. A callable's own
/// reported failure is not a `DispatchError`; it travels inside the result
/// envelope instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("operation '{name}' does not exist")]
    UnknownOperation { name: String },

    #[error("object '{name}' does not exist")]
    UnknownObject { name: String },

    #[error("method '{method}' from object '{object}' does not exist")]
    UnknownMethod { object: String, method: String },

    #[error("object access is only limited to top level: '{name}'")]
    NestedAccessNotSupported { name: String },

    #[error("request contains both a JSON payload and positional parameters")]
    ModeConflict,

    #[error(
        "operation '{name}' was called with a JSON payload but does not accept a context, \
         use positional parameters instead"
    )]
    JsonModeRequiresContext { name: String },

    #[error("operation '{name}' does not accept a JSON payload")]
    NotJsonModeCallable { name: String },

    #[error("operation accepts {required} params <{types}>, provided {supplied}", types = .declared.join(", "))]
    ArityMismatch {
        required: usize,
        declared: Vec<String>,
        supplied: usize,
    },

    #[error("array parameter does not contain uniform types: '{kind}'")]
    HeterogeneousArray { kind: TypeTag },

    #[error("parameter contains an array with an unsupported type '{value}'")]
    UnsupportedArrayElement { value: String },

    #[error(
        "parameter '{index}' mismatch: supplied '<{supplied_value}:{supplied_type}>', \
         expected '<{expected_type}>'"
    )]
    ParameterTypeMismatch {
        index: usize,
        supplied_type: String,
        supplied_value: String,
        expected_type: String,
    },

    #[error("the operation expects a JSON payload but none was supplied")]
    MissingPayload,

    #[error("failed to decode JSON payload: {0}")]
    DecodeFailure(String),
}

/// Malformed registrations. These indicate a programming error in the host
/// and are expected to abort startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("item passed as '{name}' is not callable: {reason}")]
    NotCallable { name: String, reason: &'static str },

    #[error("item passed as '{name}' is not an object: {reason}")]
    NotAnObject { name: String, reason: String },

    #[error("{kind} '{name}' is already registered")]
    DuplicateName { kind: &'static str, name: String },

    #[error("'{name}' is not a valid registration name")]
    InvalidName { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_mismatch_lists_declared_types() {
        let err = DispatchError::ArityMismatch {
            required: 1,
            declared: vec!["Context".into(), "String".into()],
            supplied: 0,
        };
        assert_eq!(
            err.to_string(),
            "operation accepts 1 params <Context, String>, provided 0"
        );
    }

    #[test]
    fn parameter_mismatch_carries_value_and_types() {
        let err = DispatchError::ParameterTypeMismatch {
            index: 1,
            supplied_type: "f64".into(),
            supplied_value: "3".into(),
            expected_type: "String".into(),
        };
        assert_eq!(
            err.to_string(),
            "parameter '1' mismatch: supplied '<3:f64>', expected '<String>'"
        );
    }

    #[test]
    fn heterogeneous_array_names_the_element_kind() {
        let err = DispatchError::HeterogeneousArray {
            kind: TypeTag::Bool,
        };
        assert_eq!(
            err.to_string(),
            "array parameter does not contain uniform types: 'bool'"
        );
    }
}
