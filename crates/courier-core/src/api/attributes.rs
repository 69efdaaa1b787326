//! Request shaping applied to every call before it is sent.

use serde_json::{Map, Value};

use super::ApiSettings;
use super::args::CallArgs;
use super::markup;
use super::methods::Shape;
use crate::error::{ApiError, ApiResult};

/// Alias resolved to the configured bot user id.
pub const SELF_ALIAS: &str = "me";

const RECEPTOR_KEYS: [&str; 2] = ["user_id", "chat_id"];

/// Applies the attribute transforms to `args`.
///
/// - `text` that is not a string is rendered to one.
/// - `reply_markup` given as raw rows is expanded; given as an object it is
///   serialized.
/// - `user_id` / `chat_id` given as a user or chat object collapse to its
///   `id`; the alias `"me"` becomes the bot user id.
/// - `parse_mode` is defaulted unless `shape` is [`Shape::Bare`].
pub(crate) fn shape(args: CallArgs, shape: Shape, settings: &ApiSettings) -> ApiResult<CallArgs> {
    let mut args = args;
    let body = args.as_map_mut();

    if let Some(text) = body.get_mut("text") {
        stringify(text);
    }

    if let Some(reply_markup) = body.get_mut("reply_markup") {
        expand_markup(reply_markup);
    }

    for key in RECEPTOR_KEYS {
        if let Some(value) = body.get_mut(key) {
            resolve_receptor(key, value, settings)?;
        }
    }

    if shape == Shape::Standard
        && !body.contains_key("parse_mode")
        && let Some(mode) = &settings.parse_mode
    {
        body.insert("parse_mode".into(), Value::String(mode.clone()));
    }

    Ok(args)
}

fn stringify(text: &mut Value) {
    match text {
        Value::String(_) | Value::Null => {}
        other => *other = Value::String(other.to_string()),
    }
}

fn expand_markup(value: &mut Value) {
    match value {
        Value::Array(rows) => *value = Value::String(markup::expand_keyboard(rows, &Map::new())),
        Value::Object(_) => *value = Value::String(value.to_string()),
        _ => {}
    }
}

fn resolve_receptor(key: &str, value: &mut Value, settings: &ApiSettings) -> ApiResult<()> {
    match value {
        Value::Object(object) => {
            if let Some(id) = object.get("id").cloned() {
                *value = id;
            }
        }
        Value::String(alias) if alias.as_str() == SELF_ALIAS => {
            let id = settings.identity.user_id.ok_or_else(|| {
                ApiError::InvalidArguments(format!(
                    "cannot resolve {key} \"{SELF_ALIAS}\": bot user id is not configured"
                ))
            })?;
            *value = Value::from(id);
        }
        _ => {}
    }
    Ok(())
}
