//! Signature introspection.
//!
//! A callable's signature is derived from its Rust types when it is
//! registered: each parameter type implements [`Param`] and the return type
//! implements [`Returns`]. The resulting [`Signature`] is computed once and
//! cached in the [`CallableEntry`](crate::CallableEntry).

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::context::Context;
use crate::value::{TypeTag, Value};

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Declared shape of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<TypeTag>,
    return_count: usize,
    last_is_failure: bool,
}

impl Signature {
    #[must_use]
    pub fn new(params: Vec<TypeTag>, return_count: usize, last_is_failure: bool) -> Self {
        Self {
            params,
            return_count,
            last_is_failure,
        }
    }

    /// Declared parameter types, context included.
    #[must_use]
    pub fn params(&self) -> &[TypeTag] {
        &self.params
    }

    /// Whether parameter 0 is the reserved context type.
    #[must_use]
    pub fn has_context(&self) -> bool {
        self.params.first() == Some(&TypeTag::Context)
    }

    /// Number of positional arguments a caller must supply.
    #[must_use]
    pub fn required_arity(&self) -> usize {
        self.params.len() - usize::from(self.has_context())
    }

    #[must_use]
    pub fn return_count(&self) -> usize {
        self.return_count
    }

    #[must_use]
    pub fn last_is_failure(&self) -> bool {
        self.last_is_failure
    }

    /// Declared parameter type names, for diagnostics.
    #[must_use]
    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(ToString::to_string).collect()
    }

    /// Checks that this signature can be dispatched.
    ///
    /// # Errors
    ///
    /// Returns the reason if the callable declares no return value or takes
    /// the context anywhere but first.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.return_count == 0 {
            return Err("callable must declare at least one return value");
        }
        if self.params.iter().skip(1).any(|tag| *tag == TypeTag::Context) {
            return Err("context may only be the first parameter");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Argument
// ---------------------------------------------------------------------------

/// A validated argument ready to be extracted into a callable's parameter.
///
/// Produced by coercion: the injected context, a plain value, or a
/// homogeneous array normalized to its element type.
#[derive(Debug, Clone)]
pub enum Argument {
    Context(Context),
    Value(Value),
    TextArray(Vec<String>),
    BoolArray(Vec<bool>),
    NumberArray(Vec<f64>),
}

impl Argument {
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Context(_) => TypeTag::Context,
            Self::Value(value) => value.type_tag(),
            Self::TextArray(_) => TypeTag::TextArray,
            Self::BoolArray(_) => TypeTag::BoolArray,
            Self::NumberArray(_) => TypeTag::NumberArray,
        }
    }
}

// ---------------------------------------------------------------------------
// Param
// ---------------------------------------------------------------------------

/// A type usable as a callable parameter.
pub trait Param: Sized {
    /// The concrete type an argument must carry to bind to this parameter.
    const TAG: TypeTag;

    /// Takes the argument, or `None` if it is not of [`Self::TAG`].
    fn extract(arg: Argument) -> Option<Self>;
}

impl Param for Context {
    const TAG: TypeTag = TypeTag::Context;

    fn extract(arg: Argument) -> Option<Self> {
        match arg {
            Argument::Context(ctx) => Some(ctx),
            _ => None,
        }
    }
}

macro_rules! value_param {
    ($ty:ty, $tag:ident, $variant:ident) => {
        impl Param for $ty {
            const TAG: TypeTag = TypeTag::$tag;

            fn extract(arg: Argument) -> Option<Self> {
                match arg {
                    Argument::Value(Value::$variant(inner)) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

value_param!(bool, Bool, Bool);
value_param!(f64, Number, Number);
value_param!(String, Text, Text);
value_param!(Vec<Value>, List, Array);
value_param!(BTreeMap<String, Value>, Map, Map);

macro_rules! array_param {
    ($elem:ty, $tag:ident) => {
        impl Param for Vec<$elem> {
            const TAG: TypeTag = TypeTag::$tag;

            fn extract(arg: Argument) -> Option<Self> {
                match arg {
                    Argument::$tag(items) => Some(items),
                    _ => None,
                }
            }
        }
    };
}

array_param!(String, TextArray);
array_param!(bool, BoolArray);
array_param!(f64, NumberArray);

// ---------------------------------------------------------------------------
// Returns
// ---------------------------------------------------------------------------

/// A single non-failure return value.
pub trait ReturnValue {
    fn into_value(self) -> Value;
}

macro_rules! return_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ReturnValue for $ty {
                fn into_value(self) -> Value {
                    Value::from(self)
                }
            }
        )*
    };
}

return_value!(bool, f64, i32, u32, String, &'static str, BTreeMap<String, Value>);

impl ReturnValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl ReturnValue for serde_json::Value {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl<T: ReturnValue> ReturnValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(ReturnValue::into_value).collect())
    }
}

impl<T: ReturnValue> ReturnValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, ReturnValue::into_value)
    }
}

/// The full declared return of a callable.
///
/// `Result<_, E>` declares a trailing failure-kind return; `Result<(), E>` is
/// a callable whose only return is the failure indicator.
pub trait Returns {
    const COUNT: usize;
    const LAST_IS_FAILURE: bool;

    /// Flattens the returned value into positional outputs. A failure slot is
    /// `Null` when the call succeeded and the failure message otherwise.
    fn into_outputs(self) -> Vec<Value>;
}

fn failure_slot<E: Display>(err: &E) -> Value {
    Value::Text(err.to_string())
}

macro_rules! single_return {
    ($([$($generics:tt)*] $ty:ty),* $(,)?) => {
        $(
            impl<$($generics)*> Returns for $ty {
                const COUNT: usize = 1;
                const LAST_IS_FAILURE: bool = false;

                fn into_outputs(self) -> Vec<Value> {
                    vec![self.into_value()]
                }
            }

            impl<$($generics)* E: Display> Returns for Result<$ty, E> {
                const COUNT: usize = 2;
                const LAST_IS_FAILURE: bool = true;

                fn into_outputs(self) -> Vec<Value> {
                    match self {
                        Ok(value) => vec![value.into_value(), Value::Null],
                        Err(err) => vec![Value::Null, failure_slot(&err)],
                    }
                }
            }
        )*
    };
}

single_return!(
    [] bool,
    [] f64,
    [] i32,
    [] u32,
    [] String,
    [] &'static str,
    [] Value,
    [] serde_json::Value,
    [] BTreeMap<String, Value>,
    [T: ReturnValue,] Vec<T>,
    [T: ReturnValue,] Option<T>,
);

impl<E: Display> Returns for Result<(), E> {
    const COUNT: usize = 1;
    const LAST_IS_FAILURE: bool = true;

    fn into_outputs(self) -> Vec<Value> {
        match self {
            Ok(()) => vec![Value::Null],
            Err(err) => vec![failure_slot(&err)],
        }
    }
}

macro_rules! tuple_return {
    ($count:expr; $($ty:ident),+) => {
        impl<$($ty: ReturnValue),+> Returns for ($($ty,)+) {
            const COUNT: usize = $count;
            const LAST_IS_FAILURE: bool = false;

            #[allow(non_snake_case)]
            fn into_outputs(self) -> Vec<Value> {
                let ($($ty,)+) = self;
                vec![$($ty.into_value()),+]
            }
        }

        impl<$($ty: ReturnValue,)+ E: Display> Returns for Result<($($ty,)+), E> {
            const COUNT: usize = $count + 1;
            const LAST_IS_FAILURE: bool = true;

            #[allow(non_snake_case)]
            fn into_outputs(self) -> Vec<Value> {
                match self {
                    Ok(($($ty,)+)) => vec![$($ty.into_value(),)+ Value::Null],
                    Err(err) => {
                        let mut outputs = vec![Value::Null; $count];
                        outputs.push(failure_slot(&err));
                        outputs
                    }
                }
            }
        }
    };
}

tuple_return!(2; A, B);
tuple_return!(3; A, B, C);

#[cfg(test)]
mod tests {
    use super::*;

    fn signature_of<R: Returns>(params: Vec<TypeTag>) -> Signature {
        Signature::new(params, R::COUNT, R::LAST_IS_FAILURE)
    }

    #[test]
    fn context_first_counts_as_context() {
        let sig = signature_of::<String>(vec![TypeTag::Context, TypeTag::Text]);
        assert!(sig.has_context());
        assert_eq!(sig.required_arity(), 1);

        let sig = signature_of::<String>(vec![TypeTag::Text]);
        assert!(!sig.has_context());
        assert_eq!(sig.required_arity(), 1);
    }

    #[test]
    fn failure_only_return_is_single_failure() {
        assert_eq!(<Result<(), String> as Returns>::COUNT, 1);
        assert!(<Result<(), String> as Returns>::LAST_IS_FAILURE);
        assert_eq!(
            Err::<(), _>("user not found").into_outputs(),
            vec![Value::Text("user not found".into())]
        );
        assert_eq!(Ok::<(), String>(()).into_outputs(), vec![Value::Null]);
    }

    #[test]
    fn value_and_failure_return_two_slots() {
        assert_eq!(<Result<String, String> as Returns>::COUNT, 2);
        assert_eq!(
            Ok::<_, String>("hi".to_string()).into_outputs(),
            vec![Value::Text("hi".into()), Value::Null]
        );
        assert_eq!(
            Err::<String, _>("nope").into_outputs(),
            vec![Value::Null, Value::Text("nope".into())]
        );
    }

    #[test]
    fn tuples_flatten_in_order() {
        assert_eq!(<(bool, f64) as Returns>::COUNT, 2);
        assert!(!<(bool, f64) as Returns>::LAST_IS_FAILURE);
        assert_eq!(
            (true, 2.0, "x").into_outputs(),
            vec![Value::Bool(true), Value::Number(2.0), Value::Text("x".into())]
        );
        assert_eq!(<Result<(bool, f64), String> as Returns>::COUNT, 3);
    }

    #[test]
    fn validate_rejects_missing_returns_and_misplaced_context() {
        let sig = Signature::new(vec![TypeTag::Text], 0, false);
        assert!(sig.validate().is_err());

        let sig = Signature::new(vec![TypeTag::Text, TypeTag::Context], 1, false);
        assert!(sig.validate().is_err());

        let sig = Signature::new(vec![TypeTag::Context, TypeTag::Text], 1, true);
        assert!(sig.validate().is_ok());
    }

    #[test]
    fn params_extract_only_their_own_tag() {
        assert_eq!(
            String::extract(Argument::Value(Value::Text("a".into()))),
            Some("a".to_string())
        );
        assert_eq!(String::extract(Argument::Value(Value::Number(1.0))), None);
        assert_eq!(
            <Vec<String>>::extract(Argument::TextArray(vec!["a".into()])),
            Some(vec!["a".to_string()])
        );
        assert_eq!(<Vec<f64>>::extract(Argument::BoolArray(vec![true])), None);
        assert_eq!(
            <Vec<Value>>::extract(Argument::Value(Value::Array(vec![]))),
            Some(vec![])
        );
    }
}
