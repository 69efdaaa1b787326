//! Per-dispatch contexts.
//!
//! - [`Scope`]: what the [`Binder`](crate::binder::Binder) resolves receivers
//!   from. One is built per dispatch, before middleware run, and extended with
//!   a [`HandlerContext`] once middleware have finished.
//! - [`HandlerContext`]: the helper object handed to plugins, listeners and
//!   stateful handlers. It knows the update, the bag, and for listeners the
//!   value they were selected for.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use courier_core::api::BotIdentity;
use courier_core::types::Message;
use courier_core::{Api, ApiError, ApiResult, ContextBag, Update};

/// Fields inspected by mention detection, in order.
pub const MENTION_FIELDS: [&str; 3] = ["message", "edited_message", "channel_post"];

/// The update field a listener was selected for.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentField {
    /// Field name, e.g. `"message"`.
    pub field: String,
    /// Field value.
    pub value: Value,
}

// =============================================================================
// HandlerContext
// =============================================================================

/// Contextual helpers for one dispatch.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    update: Arc<Update>,
    bag: ContextBag,
    current: Option<Arc<CurrentField>>,
}

impl HandlerContext {
    pub(crate) fn new(update: Arc<Update>, bag: ContextBag) -> Self {
        Self {
            update,
            bag,
            current: None,
        }
    }

    /// A copy of this context focused on `current`.
    pub(crate) fn focus(&self, current: CurrentField) -> Self {
        Self {
            update: Arc::clone(&self.update),
            bag: self.bag.clone(),
            current: Some(Arc::new(current)),
        }
    }

    pub fn update(&self) -> &Arc<Update> {
        &self.update
    }

    pub fn bag(&self) -> &ContextBag {
        &self.bag
    }

    pub fn api(&self) -> &Api {
        self.update.api()
    }

    /// The value this listener was selected for, if any.
    pub fn current(&self) -> Option<&CurrentField> {
        self.current.as_deref()
    }

    pub(crate) fn current_arc(&self) -> Option<Arc<CurrentField>> {
        self.current.clone()
    }

    /// Decodes the current value as `T`.
    pub fn current_as<T: DeserializeOwned>(&self) -> Option<T> {
        let current = self.current.as_deref()?;
        serde_json::from_value(current.value.clone()).ok()
    }

    /// The message this context is about: the current value if it is a
    /// message, otherwise the first message-typed field of the update.
    pub fn message(&self) -> Option<Message> {
        self.current_as::<Message>()
            .or_else(|| self.update.object::<Message>())
    }

    /// The first message of the update that mentions the bot.
    ///
    /// A message mentions the bot when its text or caption contains
    /// `@username` (case-insensitive), when a `text_mention` entity targets
    /// the bot user, or when it replies to a message sent by the bot.
    pub fn mention(&self) -> Option<CurrentField> {
        let identity = self.api().identity();
        MENTION_FIELDS.iter().find_map(|field| {
            let value = self.update.get(field)?;
            let message: Message = serde_json::from_value(value.clone()).ok()?;
            mentions_bot(&message, identity).then(|| CurrentField {
                field: (*field).to_owned(),
                value: value.clone(),
            })
        })
    }

    pub fn is_mention(&self) -> bool {
        self.mention().is_some()
    }

    /// Sends `text` to the chat of [`message`](Self::message).
    pub async fn reply(&self, text: impl Into<String>) -> ApiResult<Message> {
        let message = self.message().ok_or_else(|| {
            ApiError::InvalidArguments("no message in this context to reply to".into())
        })?;
        self.api().send_message(message.chat.id, text).await
    }
}

fn mentions_bot(message: &Message, identity: &BotIdentity) -> bool {
    if let (Some(username), Some(text)) = (&identity.username, message.text_or_caption()) {
        let handle = format!("@{}", username.to_lowercase());
        if text.to_lowercase().contains(&handle) {
            return true;
        }
    }

    let Some(bot_id) = identity.user_id else {
        return false;
    };

    let targeted = message.all_entities().any(|entity| {
        entity.kind == "text_mention" && entity.user.as_ref().is_some_and(|user| user.id == bot_id)
    });

    targeted
        || message
            .reply_to_message
            .as_ref()
            .and_then(|reply| reply.from.as_ref())
            .is_some_and(|author| author.id == bot_id)
}

// =============================================================================
// Scope
// =============================================================================

/// Receivers available to the binder during one dispatch.
#[derive(Debug, Clone)]
pub struct Scope {
    update: Arc<Update>,
    bag: ContextBag,
    handler: Option<HandlerContext>,
}

impl Scope {
    pub fn new(update: Arc<Update>, bag: ContextBag) -> Self {
        Self {
            update,
            bag,
            handler: None,
        }
    }

    /// This scope with `handler` available to callbacks.
    pub fn with_handler(mut self, handler: HandlerContext) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn update(&self) -> &Arc<Update> {
        &self.update
    }

    pub fn bag(&self) -> &ContextBag {
        &self.bag
    }

    pub fn handler(&self) -> Option<&HandlerContext> {
        self.handler.as_ref()
    }

    /// The value the handler context is focused on.
    pub fn current(&self) -> Option<Arc<CurrentField>> {
        self.handler.as_ref().and_then(HandlerContext::current_arc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{handler_context, update};
    use serde_json::json;

    fn message(body: Value) -> Update {
        update(json!({ "update_id": 9, "message": body }))
    }

    #[test]
    fn test_username_mention_is_case_insensitive() {
        let ctx = handler_context(message(json!({
            "message_id": 1,
            "chat": { "id": 5, "type": "group" },
            "text": "hey @Courier_Bot what's up"
        })));

        let mention = ctx.mention().unwrap();
        assert_eq!(mention.field, "message");
    }

    #[test]
    fn test_caption_mention_counts() {
        let ctx = handler_context(update(json!({
            "update_id": 9,
            "channel_post": {
                "message_id": 1,
                "chat": { "id": -100, "type": "channel" },
                "caption": "photo for @courier_bot"
            }
        })));
        assert_eq!(ctx.mention().map(|m| m.field), Some("channel_post".to_owned()));
    }

    #[test]
    fn test_text_mention_entity_targets_bot() {
        let ctx = handler_context(message(json!({
            "message_id": 1,
            "chat": { "id": 5, "type": "group" },
            "text": "Courier, ping",
            "entities": [{
                "type": "text_mention", "offset": 0, "length": 7,
                "user": { "id": 42, "is_bot": true, "first_name": "Courier" }
            }]
        })));
        assert!(ctx.is_mention());
    }

    #[test]
    fn test_reply_to_bot_counts() {
        let ctx = handler_context(message(json!({
            "message_id": 2,
            "chat": { "id": 5, "type": "group" },
            "text": "thanks",
            "reply_to_message": {
                "message_id": 1,
                "from": { "id": 42, "is_bot": true, "first_name": "Courier" },
                "chat": { "id": 5, "type": "group" },
                "text": "done"
            }
        })));
        assert!(ctx.is_mention());
    }

    #[test]
    fn test_plain_message_is_not_a_mention() {
        let ctx = handler_context(message(json!({
            "message_id": 1,
            "chat": { "id": 5, "type": "group" },
            "text": "hello @someone_else"
        })));
        assert!(ctx.mention().is_none());
    }
}
