//! Simple selector-based listeners.
//!
//! A listener is registered under a selector:
//!
//! - `"any"` matches every update and runs without a current value;
//! - `"mention"` matches when a message of the update mentions the bot, and
//!   runs with that message as the current value;
//! - any other string names an update field; it matches when that field is
//!   present and runs with the field's value as the current value. The value
//!   is also offered as a named argument under the field name.
//!
//! Selectors are case-insensitive. Registering a selector again replaces the
//! listener previously registered for it.

use std::fmt;

use tracing::debug;

use crate::binder::NamedArgs;
use crate::context::{CurrentField, HandlerContext};
use crate::handler::Callback;

/// What a listener is registered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Any,
    Mention,
    Field(String),
}

impl Selector {
    pub const ANY: &'static str = "any";
    pub const MENTION: &'static str = "mention";

    /// Parses a selector string, case-insensitively.
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim().to_lowercase();
        match selector.as_str() {
            Self::ANY => Self::Any,
            Self::MENTION => Self::Mention,
            _ => Self::Field(selector),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => Self::ANY,
            Self::Mention => Self::MENTION,
            Self::Field(field) => field,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Selector {
    fn from(selector: &str) -> Self {
        Self::parse(selector)
    }
}

/// One or more selectors.
pub trait IntoSelectors {
    fn into_selectors(self) -> Vec<Selector>;
}

impl IntoSelectors for Selector {
    fn into_selectors(self) -> Vec<Selector> {
        vec![self]
    }
}

impl IntoSelectors for &str {
    fn into_selectors(self) -> Vec<Selector> {
        vec![Selector::parse(self)]
    }
}

impl IntoSelectors for String {
    fn into_selectors(self) -> Vec<Selector> {
        vec![Selector::parse(&self)]
    }
}

impl<const N: usize> IntoSelectors for [&str; N] {
    fn into_selectors(self) -> Vec<Selector> {
        self.into_iter().map(Selector::parse).collect()
    }
}

impl IntoSelectors for &[&str] {
    fn into_selectors(self) -> Vec<Selector> {
        self.iter().copied().map(Selector::parse).collect()
    }
}

impl IntoSelectors for Vec<String> {
    fn into_selectors(self) -> Vec<Selector> {
        self.iter().map(|s| Selector::parse(s)).collect()
    }
}

/// A listener ready to run: callback, focused context and named arguments.
pub(crate) struct Activation<'a> {
    pub(crate) selector: &'a Selector,
    pub(crate) callback: &'a Callback<()>,
    pub(crate) ctx: HandlerContext,
    pub(crate) named: NamedArgs,
}

/// Listeners keyed by selector, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Listeners {
    entries: Vec<(Selector, Callback<()>)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under `selector`; returns `true` if it replaced one.
    pub fn register(&mut self, selector: Selector, callback: Callback<()>) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|(s, _)| *s == selector) {
            debug!(%selector, "Replacing listener");
            entry.1 = callback;
            return true;
        }
        debug!(%selector, "Registered listener");
        self.entries.push((selector, callback));
        false
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selectors(&self) -> impl Iterator<Item = &Selector> {
        self.entries.iter().map(|(selector, _)| selector)
    }

    /// Listeners matching the update of `ctx`.
    pub(crate) fn matching(&self, ctx: &HandlerContext) -> Vec<Activation<'_>> {
        self.entries
            .iter()
            .filter_map(|(selector, callback)| {
                let (ctx, named) = match selector {
                    Selector::Any => (ctx.clone(), NamedArgs::new()),
                    Selector::Mention => focus(ctx, ctx.mention()?),
                    Selector::Field(field) => {
                        let value = ctx.update().get(field)?.clone();
                        focus(ctx, CurrentField {
                            field: field.clone(),
                            value,
                        })
                    }
                };
                Some(Activation {
                    selector,
                    callback,
                    ctx,
                    named,
                })
            })
            .collect()
    }
}

fn focus(ctx: &HandlerContext, current: CurrentField) -> (HandlerContext, NamedArgs) {
    let named = [(current.field.clone(), current.value.clone())]
        .into_iter()
        .collect::<NamedArgs>();
    (ctx.focus(current), named)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{handler_context, update};
    use serde_json::{Value, json};

    fn current_value(activation: &Activation<'_>) -> Option<Value> {
        activation.ctx.current().map(|current| current.value.clone())
    }

    fn noop() -> Callback<()> {
        Callback::new(|| async {})
    }

    #[test]
    fn test_selectors_are_case_insensitive() {
        assert_eq!(Selector::parse("Message"), Selector::Field("message".into()));
        assert_eq!(Selector::parse("ANY"), Selector::Any);
        assert_eq!(Selector::parse(" Mention "), Selector::Mention);
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut listeners = Listeners::new();
        assert!(!listeners.register(Selector::parse("message"), noop()));
        assert!(listeners.register(Selector::parse("MESSAGE"), noop()));
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_field_listener_gets_field_value_any_gets_none() {
        let mut listeners = Listeners::new();
        for selector in ["message", "any", "callback_query", "mention"] {
            listeners.register(Selector::parse(selector), noop());
        }

        let message = json!({ "message_id": 1, "chat": { "id": 1, "type": "private" }, "text": "hi" });
        let ctx = handler_context(update(json!({ "update_id": 1, "message": message.clone() })));

        let matched = listeners.matching(&ctx);
        let selectors: Vec<&str> = matched.iter().map(|a| a.selector.as_str()).collect();
        assert_eq!(selectors, vec!["message", "any"]);

        assert_eq!(current_value(&matched[0]), Some(message.clone()));
        assert_eq!(matched[0].named.get("message"), Some(&message));
        assert_eq!(current_value(&matched[1]), None);
        assert!(matched[1].named.is_empty());
    }
}
