//! Capability binder.
//!
//! Maps a callback's declared parameters to values taken from the current
//! dispatch. Each parameter carries a name and zero or more candidate
//! [`TypeKey`]s; resolution tries, in order, for the first match:
//!
//! 1. [`TypeKey::UPDATE`]: the update itself.
//! 2. [`TypeKey::API`]: the API handle reachable from the update.
//! 3. [`TypeKey::BAG`], [`TypeKey::HANDLER`], [`TypeKey::CURRENT`]: receivers
//!    held by the dispatch [`Scope`].
//! 4. The update's field registry: the first present field whose type is a
//!    candidate.
//! 5. The named-argument bag, by parameter name. A hit is removed from the bag.
//!
//! A parameter matching none of these is dropped. If fewer parameters resolve
//! than were declared the callback is not invoked and the binder reports
//! [`Invocation::Skipped`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use courier_core::{Api, ContextBag, TypeKey, Update};

use crate::context::{CurrentField, HandlerContext, Scope};
use crate::error::BoxError;
use crate::handler::Callback;

// =============================================================================
// Signatures and resolved values
// =============================================================================

/// One declared callback parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Name used for the named-argument fallback.
    pub name: &'static str,
    /// Accepted semantic types, in preference order.
    pub candidates: Vec<TypeKey>,
}

impl ParamSpec {
    pub fn new(name: &'static str, candidates: Vec<TypeKey>) -> Self {
        Self { name, candidates }
    }

    /// A parameter of a single type, named after it.
    pub fn typed(key: TypeKey) -> Self {
        Self::new(key.as_str(), vec![key])
    }

    /// A parameter resolved by name only.
    pub fn named(name: &'static str) -> Self {
        Self::new(name, Vec::new())
    }

    fn accepts(&self, key: TypeKey) -> bool {
        self.candidates.contains(&key)
    }
}

/// A resolved argument.
#[derive(Debug, Clone)]
pub enum Bound {
    Update(Arc<Update>),
    Api(Api),
    Bag(ContextBag),
    Handler(HandlerContext),
    Current(Arc<CurrentField>),
    /// An update field matched by type.
    Field { field: String, value: Value },
    /// A value taken from the named-argument bag.
    Named(Value),
}

impl Bound {
    /// Short description used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Update(_) => "update",
            Self::Api(_) => "api",
            Self::Bag(_) => "bag",
            Self::Handler(_) => "handler context",
            Self::Current(_) => "current value",
            Self::Field { .. } => "update field",
            Self::Named(_) => "named",
        }
    }
}

/// Named arguments available to the last resolution step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedArgs(HashMap<String, Value>);

impl NamedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for NamedArgs {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Outcome of [`Binder::invoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation<R> {
    /// The callback ran and returned `R`.
    Invoked(R),
    /// A parameter could not be resolved; the callback did not run.
    Skipped,
}

impl<R> Invocation<R> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn into_option(self) -> Option<R> {
        match self {
            Self::Invoked(value) => Some(value),
            Self::Skipped => None,
        }
    }
}

// =============================================================================
// Binder
// =============================================================================

/// Resolves and invokes callbacks against a dispatch [`Scope`].
pub struct Binder;

impl Binder {
    /// Resolves `params` in order, or returns `None` if any is unresolvable.
    ///
    /// Named arguments consumed by a parameter are removed from `named`.
    pub fn resolve(params: &[ParamSpec], scope: &Scope, named: &mut NamedArgs) -> Option<Vec<Bound>> {
        let resolved: Vec<Bound> = params
            .iter()
            .filter_map(|param| Self::resolve_one(param, scope, named))
            .collect();

        (resolved.len() >= params.len()).then_some(resolved)
    }

    fn resolve_one(param: &ParamSpec, scope: &Scope, named: &mut NamedArgs) -> Option<Bound> {
        let update = scope.update();

        if param.accepts(TypeKey::UPDATE) {
            return Some(Bound::Update(Arc::clone(update)));
        }
        if param.accepts(TypeKey::API) {
            return Some(Bound::Api(update.api().clone()));
        }
        if param.accepts(TypeKey::BAG) {
            return Some(Bound::Bag(scope.bag().clone()));
        }
        if param.accepts(TypeKey::HANDLER)
            && let Some(handler) = scope.handler()
        {
            return Some(Bound::Handler(handler.clone()));
        }
        if param.accepts(TypeKey::CURRENT)
            && let Some(current) = scope.current()
        {
            return Some(Bound::Current(current));
        }

        let field = update
            .field_types()
            .iter()
            .filter(|(_, key)| param.accepts(*key))
            .find_map(|(field, _)| update.get(field).map(|value| (field, value)));
        if let Some((field, value)) = field {
            return Some(Bound::Field {
                field: field.to_owned(),
                value: value.clone(),
            });
        }

        named.remove(param.name).map(Bound::Named)
    }

    /// Resolves `callback`'s parameters and runs it.
    ///
    /// Returns [`Invocation::Skipped`] without running anything when the
    /// signature cannot be satisfied. Failures of the callback itself are
    /// returned as `Err`.
    pub async fn invoke<R>(
        callback: &Callback<R>,
        scope: &Scope,
        mut named: NamedArgs,
    ) -> Result<Invocation<R>, BoxError>
    where
        R: Send + 'static,
    {
        let Some(args) = Self::resolve(callback.params(), scope, &mut named) else {
            trace!(callback = callback.name(), "Skipping callback with unresolved parameters");
            return Ok(Invocation::Skipped);
        };
        callback.call(args).await.map(Invocation::Invoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{Named, NamedArg};
    use crate::test_support::{scope, update};
    use courier_core::UpdateObject;
    use courier_core::types::{CallbackQuery, Message};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn message_update() -> Update {
        update(json!({
            "update_id": 1,
            "message": {
                "message_id": 3,
                "chat": { "id": 10, "type": "private" },
                "text": "hello"
            }
        }))
    }

    #[test]
    fn test_resolution_order() {
        let scope = scope(message_update());
        let mut named = NamedArgs::new();

        let params = vec![
            ParamSpec::typed(TypeKey::API),
            ParamSpec::new("anything", vec![TypeKey::BAG, TypeKey::UPDATE]),
            ParamSpec::typed(Message::KEY),
        ];
        let bound = Binder::resolve(&params, &scope, &mut named).unwrap();

        assert!(matches!(bound[0], Bound::Api(_)));
        // UPDATE beats BAG regardless of candidate order.
        assert!(matches!(bound[1], Bound::Update(_)));
        assert!(matches!(&bound[2], Bound::Field { field, .. } if field == "message"));
    }

    #[test]
    fn test_named_fallback_consumes_entry() {
        let scope = scope(message_update());
        let mut named: NamedArgs = [("limit", json!(5))].into_iter().collect();

        let params = vec![ParamSpec::named("limit"), ParamSpec::named("limit")];
        assert!(Binder::resolve(&params, &scope, &mut named).is_none());
        assert!(named.is_empty());
    }

    #[test]
    fn test_absent_field_is_unresolvable() {
        let scope = scope(message_update());
        let params = vec![ParamSpec::typed(CallbackQuery::KEY)];
        assert!(Binder::resolve(&params, &scope, &mut NamedArgs::new()).is_none());
    }

    #[test]
    fn test_handler_receiver_needs_handler_scope() {
        let scope = scope(message_update());
        let params = vec![ParamSpec::typed(TypeKey::HANDLER)];
        assert!(Binder::resolve(&params, &scope, &mut NamedArgs::new()).is_none());
    }

    #[tokio::test]
    async fn test_unresolvable_callback_is_skipped_not_run() {
        let scope = scope(message_update());
        let calls = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&calls);
        let callback: Callback<()> = Callback::new(move |_query: CallbackQuery| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        let outcome = Binder::invoke(&callback, &scope, NamedArgs::new()).await.unwrap();
        assert!(outcome.is_skipped());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invoked_with_arguments_in_declared_order() {
        struct Limit;
        impl NamedArg for Limit {
            const NAME: &'static str = "limit";
            type Value = u32;
        }

        let scope = scope(message_update());
        let seen = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&seen);
        let callback: Callback<()> = Callback::new(move |limit: Named<Limit>, message: Message| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock() = Some(format!("{}:{}", limit.0, message.text.unwrap_or_default()));
            }
        });

        let named = [("limit", json!(7))].into_iter().collect();
        let outcome = Binder::invoke(&callback, &scope, named).await.unwrap();

        assert_eq!(outcome, Invocation::Invoked(()));
        assert_eq!(seen.lock().as_deref(), Some("7:hello"));
    }
}
