//! Extractor system for the Courier framework.
//!
//! This module provides the [`Injectable`] trait, which defines how a handler
//! parameter is declared to the [`Binder`](crate::binder::Binder) and how the
//! resolved [`Bound`] value becomes that parameter.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use courier_core::types::{
    CallbackQuery, ChatJoinRequest, ChatMemberUpdated, ChosenInlineResult, InlineQuery, Message,
    Poll, PollAnswer, PreCheckoutQuery, ShippingQuery,
};
use courier_core::{Api, ContextBag, TypeKey, Update, UpdateObject};

use crate::binder::{Bound, ParamSpec};
use crate::context::HandlerContext;
use crate::error::{BindError, BindResult};

/// A type that can appear as a handler parameter.
///
/// # Example
///
/// ```rust,ignore
/// use courier_framework::{Bound, Injectable, ParamSpec};
///
/// struct Locale(String);
///
/// impl Injectable for Locale {
///     fn param() -> ParamSpec {
///         ParamSpec::named("locale")
///     }
///
///     fn inject(bound: Bound) -> BindResult<Self> {
///         decode("locale", bound).map(Locale)
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + 'static {
    /// Declaration handed to the binder.
    fn param() -> ParamSpec;

    /// Builds the parameter from the value the binder resolved.
    fn inject(bound: Bound) -> BindResult<Self>;
}

/// Decodes a JSON-carrying [`Bound`] into `T`.
pub fn decode<T: DeserializeOwned>(param: &'static str, bound: Bound) -> BindResult<T> {
    let value = match bound {
        Bound::Field { value, .. } | Bound::Named(value) => value,
        Bound::Current(current) => current.value.clone(),
        other => {
            return Err(BindError::Mismatch {
                param,
                got: other.kind(),
            });
        }
    };
    serde_json::from_value(value).map_err(|source| BindError::Decode { param, source })
}

// ─── Receivers ───

impl Injectable for Arc<Update> {
    fn param() -> ParamSpec {
        ParamSpec::typed(TypeKey::UPDATE)
    }

    fn inject(bound: Bound) -> BindResult<Self> {
        match bound {
            Bound::Update(update) => Ok(update),
            other => Err(mismatch(TypeKey::UPDATE, &other)),
        }
    }
}

impl Injectable for Api {
    fn param() -> ParamSpec {
        ParamSpec::typed(TypeKey::API)
    }

    fn inject(bound: Bound) -> BindResult<Self> {
        match bound {
            Bound::Api(api) => Ok(api),
            other => Err(mismatch(TypeKey::API, &other)),
        }
    }
}

impl Injectable for ContextBag {
    fn param() -> ParamSpec {
        ParamSpec::typed(TypeKey::BAG)
    }

    fn inject(bound: Bound) -> BindResult<Self> {
        match bound {
            Bound::Bag(bag) => Ok(bag),
            other => Err(mismatch(TypeKey::BAG, &other)),
        }
    }
}

impl Injectable for HandlerContext {
    fn param() -> ParamSpec {
        ParamSpec::typed(TypeKey::HANDLER)
    }

    fn inject(bound: Bound) -> BindResult<Self> {
        match bound {
            Bound::Handler(ctx) => Ok(ctx),
            other => Err(mismatch(TypeKey::HANDLER, &other)),
        }
    }
}

fn mismatch(key: TypeKey, bound: &Bound) -> BindError {
    BindError::Mismatch {
        param: key.as_str(),
        got: bound.kind(),
    }
}

// ─── Current ───

/// The value a listener was selected for, decoded as `T`.
///
/// ```rust,ignore
/// registry.on("message", |Current(message): Current<Message>| async move {
///     println!("{:?}", message.text);
/// });
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Current<T = Value>(pub T);

impl<T: DeserializeOwned + Send + 'static> Injectable for Current<T> {
    fn param() -> ParamSpec {
        ParamSpec::typed(TypeKey::CURRENT)
    }

    fn inject(bound: Bound) -> BindResult<Self> {
        decode(TypeKey::CURRENT.as_str(), bound).map(Current)
    }
}

// ─── Named arguments ───

/// Declares a by-name argument for [`Named`].
pub trait NamedArg: Send + 'static {
    /// Key looked up in the named-argument bag.
    const NAME: &'static str;
    /// Decoded type.
    type Value: DeserializeOwned + Send + 'static;
}

/// An argument resolved from the named-argument bag.
pub struct Named<A: NamedArg>(pub A::Value);

impl<A: NamedArg> Injectable for Named<A> {
    fn param() -> ParamSpec {
        ParamSpec::named(A::NAME)
    }

    fn inject(bound: Bound) -> BindResult<Self> {
        decode(A::NAME, bound).map(Named)
    }
}

// ─── Update objects ───

macro_rules! impl_update_object {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Injectable for $ty {
                fn param() -> ParamSpec {
                    ParamSpec::typed(<$ty as UpdateObject>::KEY)
                }

                fn inject(bound: Bound) -> BindResult<Self> {
                    decode(<$ty as UpdateObject>::KEY.as_str(), bound)
                }
            }
        )*
    };
}

impl_update_object!(
    Message,
    CallbackQuery,
    InlineQuery,
    ChosenInlineResult,
    ShippingQuery,
    PreCheckoutQuery,
    Poll,
    PollAnswer,
    ChatMemberUpdated,
    ChatJoinRequest,
);
