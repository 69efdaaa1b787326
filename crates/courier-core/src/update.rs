//! The inbound update record and its field registry.
//!
//! An [`Update`] wraps the raw payload of one inbound event together with the
//! [`FieldRegistry`] that says which top-level field carries which semantic
//! type, and the [`Api`] handle the update arrived through. The registry is
//! built once at startup; parameter binding is then a table lookup over it.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::Api;

// =============================================================================
// TypeKey
// =============================================================================

/// Identifier of a semantic type known to the binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(&'static str);

impl TypeKey {
    /// The update itself.
    pub const UPDATE: TypeKey = TypeKey::new("Update");
    /// The API service handle.
    pub const API: TypeKey = TypeKey::new("Api");
    /// The per-dispatch context bag.
    pub const BAG: TypeKey = TypeKey::new("ContextBag");
    /// The per-dispatch handler context.
    pub const HANDLER: TypeKey = TypeKey::new("HandlerContext");
    /// The value a listener was selected for.
    pub const CURRENT: TypeKey = TypeKey::new("Current");

    /// Creates a key.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Key name.
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A typed object that can appear as a top-level update field.
pub trait UpdateObject: DeserializeOwned + Send + 'static {
    /// Semantic type key under which the object is registered.
    const KEY: TypeKey;
}

// =============================================================================
// FieldRegistry
// =============================================================================

/// Ordered map from update field name to semantic type.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    entries: Vec<(String, TypeKey)>,
}

impl FieldRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of the standard platform update fields.
    pub fn telegram() -> Self {
        use crate::types::*;

        Self::new()
            .field("message", Message::KEY)
            .field("edited_message", Message::KEY)
            .field("channel_post", Message::KEY)
            .field("edited_channel_post", Message::KEY)
            .field("inline_query", InlineQuery::KEY)
            .field("chosen_inline_result", ChosenInlineResult::KEY)
            .field("callback_query", CallbackQuery::KEY)
            .field("shipping_query", ShippingQuery::KEY)
            .field("pre_checkout_query", PreCheckoutQuery::KEY)
            .field("poll", Poll::KEY)
            .field("poll_answer", PollAnswer::KEY)
            .field("my_chat_member", ChatMemberUpdated::KEY)
            .field("chat_member", ChatMemberUpdated::KEY)
            .field("chat_join_request", ChatJoinRequest::KEY)
    }

    /// Shared instance of [`telegram`](Self::telegram), built once.
    pub fn shared() -> Arc<FieldRegistry> {
        static REGISTRY: OnceLock<Arc<FieldRegistry>> = OnceLock::new();
        Arc::clone(REGISTRY.get_or_init(|| Arc::new(Self::telegram())))
    }

    /// Registers a field (builder style). Re-registering a field replaces its type.
    pub fn field(mut self, name: impl Into<String>, key: TypeKey) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(field, _)| *field == name) {
            Some(entry) => entry.1 = key,
            None => self.entries.push((name, key)),
        }
        self
    }

    /// Semantic type of `field`.
    pub fn type_of(&self, field: &str) -> Option<TypeKey> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, key)| *key)
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TypeKey)> {
        self.entries.iter().map(|(name, key)| (name.as_str(), *key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Update
// =============================================================================

/// One inbound event. Read-only for the duration of a dispatch.
#[derive(Clone)]
pub struct Update {
    payload: Map<String, Value>,
    fields: Arc<FieldRegistry>,
    api: Api,
}

impl Update {
    /// Creates an update using the shared standard field registry.
    pub fn new(payload: Map<String, Value>, api: Api) -> Self {
        Self::with_fields(payload, FieldRegistry::shared(), api)
    }

    /// Creates an update with a custom field registry.
    pub fn with_fields(payload: Map<String, Value>, fields: Arc<FieldRegistry>, api: Api) -> Self {
        Self {
            payload,
            fields,
            api,
        }
    }

    /// Returns `true` if `field` is present and not `null`.
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Raw value of `field`, ignoring `null`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field).filter(|value| !value.is_null())
    }

    /// Decodes the first present field registered with `T`'s key.
    pub fn object<T: UpdateObject>(&self) -> Option<T> {
        let (field, value) = self
            .fields
            .iter()
            .filter(|(_, key)| *key == T::KEY)
            .find_map(|(field, _)| self.get(field).map(|value| (field, value)))?;

        match serde_json::from_value(value.clone()) {
            Ok(object) => Some(object),
            Err(err) => {
                debug!(field, type_key = %T::KEY, error = %err, "Update field does not decode");
                None
            }
        }
    }

    /// Decodes `field` as `T` regardless of its registered type.
    pub fn decode<T: DeserializeOwned>(&self, field: &str) -> Option<T> {
        self.get(field)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Field → semantic type map used for binding.
    pub fn field_types(&self) -> &FieldRegistry {
        &self.fields
    }

    /// The API handle this update arrived through.
    pub fn api(&self) -> &Api {
        &self.api
    }

    /// `update_id` of the payload, if any.
    pub fn update_id(&self) -> Option<i64> {
        self.payload.get("update_id").and_then(Value::as_i64)
    }

    /// Name of the first registered field present on this update.
    pub fn kind(&self) -> Option<&str> {
        self.fields
            .iter()
            .map(|(field, _)| field)
            .find(|field| self.has(field))
    }

    /// Raw payload.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update")
            .field("update_id", &self.update_id())
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}
