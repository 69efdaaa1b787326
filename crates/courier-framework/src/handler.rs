//! Handler system for the Courier framework.
//!
//! Any async function (or closure) taking up to twelve [`Injectable`]
//! parameters implements [`Handler`]. Registration erases it into a
//! [`Callback`], which carries the parameter declarations the binder resolves
//! and the call itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_framework::{Api, Current, Message};
//!
//! // No parameters
//! async fn tick() {}
//!
//! // Typed update object
//! async fn echo(api: Api, message: Message) -> ApiResult<()> {
//!     api.send_message(message.chat.id, message.text.unwrap_or_default()).await?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::binder::{Bound, ParamSpec};
use crate::error::{BindError, BoxError};
use crate::extractor::Injectable;
use crate::plugin::Propagation;

// ============================================================================
// IntoOutcome - Handle handler return values
// ============================================================================

/// Conversion of a handler's return value into the outcome its slot expects.
///
/// Middleware, listeners and setup hooks expect `()`; plugins expect a
/// [`Propagation`] signal, where returning `()` means
/// [`Propagation::Next`].
pub trait IntoOutcome<R> {
    /// Converts this value, surfacing handler failures as `Err`.
    fn into_outcome(self) -> Result<R, BoxError>;
}

impl IntoOutcome<()> for () {
    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> IntoOutcome<()> for Result<(), E> {
    fn into_outcome(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

impl IntoOutcome<Propagation> for () {
    fn into_outcome(self) -> Result<Propagation, BoxError> {
        Ok(Propagation::Next)
    }
}

impl IntoOutcome<Propagation> for Propagation {
    fn into_outcome(self) -> Result<Propagation, BoxError> {
        Ok(self)
    }
}

impl<E: Into<BoxError>> IntoOutcome<Propagation> for Result<(), E> {
    fn into_outcome(self) -> Result<Propagation, BoxError> {
        self.map(|()| Propagation::Next).map_err(Into::into)
    }
}

impl<E: Into<BoxError>> IntoOutcome<Propagation> for Result<Propagation, E> {
    fn into_outcome(self) -> Result<Propagation, BoxError> {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// A callable whose parameters the binder can resolve.
///
/// `T` is the tuple of parameter types and `R` the outcome type of the slot
/// the handler is registered in.
pub trait Handler<T, R>: Clone + Send + Sync + 'static {
    /// Parameter declarations, in order.
    fn signature() -> Vec<ParamSpec>;

    /// Calls the handler with resolved arguments.
    fn call(self, args: Vec<Bound>) -> BoxFuture<'static, Result<R, BoxError>>;
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

/// Macro to generate Handler implementations for functions with different arities.
macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, Res, R, $($ty,)*> Handler<($($ty,)*), R> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoOutcome<R>,
            R: Send + 'static,
            $( $ty: Injectable, )*
        {
            fn signature() -> Vec<ParamSpec> {
                vec![$( $ty::param(), )*]
            }

            fn call(self, args: Vec<Bound>) -> BoxFuture<'static, Result<R, BoxError>> {
                Box::pin(async move {
                    let expected = count!($($ty)*);
                    let got = args.len();
                    let mut args = args.into_iter();
                    $(
                        let Some(bound) = args.next() else {
                            return Err(BindError::Arity { expected, got }.into());
                        };
                        let $ty = $ty::inject(bound)?;
                    )*

                    IntoOutcome::<R>::into_outcome((self)($($ty,)*).await)
                })
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
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

// ============================================================================
// Callback - Type-erased handler stored in collections
// ============================================================================

type CallFn<R> = dyn Fn(Vec<Bound>) -> BoxFuture<'static, Result<R, BoxError>> + Send + Sync;

/// A type-erased handler together with its parameter declarations.
pub struct Callback<R> {
    name: &'static str,
    params: Arc<[ParamSpec]>,
    call: Arc<CallFn<R>>,
}

impl<R: Send + 'static> Callback<R> {
    /// Erases `handler`.
    pub fn new<H, T>(handler: H) -> Self
    where
        H: Handler<T, R>,
        T: 'static,
    {
        Self {
            name: std::any::type_name::<H>(),
            params: H::signature().into(),
            call: Arc::new(move |args| handler.clone().call(args)),
        }
    }

    /// Type name of the wrapped handler.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared parameters.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub(crate) fn call(&self, args: Vec<Bound>) -> BoxFuture<'static, Result<R, BoxError>> {
        (self.call)(args)
    }
}

impl<R> Clone for Callback<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            params: Arc::clone(&self.params),
            call: Arc::clone(&self.call),
        }
    }
}

impl<R> fmt::Debug for Callback<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}
