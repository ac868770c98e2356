//! Callable units and invocation.

use std::fmt;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::signature::{Argument, Param, Returns, Signature};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// A function or closure that can be registered as a callable.
///
/// Implemented for every `Fn(P1, .., Pn) -> R` with up to eight parameters
/// where each `Pi: Param` and `R: Returns`. `Args` is the parameter tuple and
/// only serves to keep the arity impls apart.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Signature derived from the parameter and return types.
    fn signature(&self) -> Signature;

    /// Calls the handler with already validated arguments, capturing every
    /// declared return value positionally.
    ///
    /// # Errors
    ///
    /// Returns `ParameterTypeMismatch` if an argument cannot bind to its
    /// parameter. Coercion rules this out for arguments it has checked.
    fn call(&self, args: Vec<Argument>) -> Result<Vec<Value>, DispatchError>;
}

fn next_param<P: Param>(
    args: &mut impl Iterator<Item = Argument>,
    index: usize,
) -> Result<P, DispatchError> {
    let mismatch = |supplied_type: String, supplied_value: String| {
        DispatchError::ParameterTypeMismatch {
            index,
            supplied_type,
            supplied_value,
            expected_type: P::TAG.to_string(),
        }
    };
    match args.next() {
        Some(arg) => {
            let supplied_type = arg.type_tag().to_string();
            let supplied_value = match &arg {
                Argument::Value(value) => value.to_string(),
                _ => String::new(),
            };
            P::extract(arg).ok_or_else(|| mismatch(supplied_type, supplied_value))
        }
        None => Err(mismatch("nothing".to_string(), String::new())),
    }
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        impl<F, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: Returns,
            $($ty: Param,)*
        {
            fn signature(&self) -> Signature {
                Signature::new(vec![$($ty::TAG),*], R::COUNT, R::LAST_IS_FAILURE)
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call(&self, args: Vec<Argument>) -> Result<Vec<Value>, DispatchError> {
                let mut args = args.into_iter();
                let mut index = 0;
                $(
                    let $ty = next_param::<$ty>(&mut args, index)?;
                    index += 1;
                )*
                Ok((self)($($ty),*).into_outputs())
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

// ---------------------------------------------------------------------------
// CallableEntry
// ---------------------------------------------------------------------------

type Invoke = dyn Fn(Vec<Argument>) -> Result<Vec<Value>, DispatchError> + Send + Sync;

/// A registered callable together with its signature, computed once at
/// construction and immutable afterwards.
#[derive(Clone)]
pub struct CallableEntry {
    signature: Signature,
    invoke: Arc<Invoke>,
}

impl CallableEntry {
    pub fn new<H, Args>(handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let signature = handler.signature();
        Self {
            signature,
            invoke: Arc::new(move |args| handler.call(args)),
        }
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Performs the call with the final ordered argument list.
    ///
    /// Blocks for as long as the callable does; no timeout is applied.
    ///
    /// # Errors
    ///
    /// Propagates argument binding failures from [`Handler::call`].
    pub fn invoke(&self, args: Vec<Argument>) -> Result<Vec<Value>, DispatchError> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for CallableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableEntry")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}
