//! Expansion of the reply-keyboard shorthand into wire format.
//!
//! A shorthand keyboard is a list of rows, each row a list of buttons:
//!
//! | Button          | Reply keyboard               | Inline keyboard                 |
//! |-----------------|------------------------------|---------------------------------|
//! | `"Yes"`         | `{"text": "Yes"}`            | `{"text": "Yes"}`               |
//! | `["Yes"]`       | `{"text": "Yes"}`            | `{"text": "Yes"}`               |
//! | `["Go", "cb"]`  | n/a                          | `{"text": "Go", "callback_data": "cb"}` |
//! | `["Go", "https://…"]` | n/a                    | `{"text": "Go", "url": "https://…"}` |
//! | `["Call", 2]`   | `{"text": "Call", "request_contact": true}` | n/a |
//! | `["Here", 3]`   | `{"text": "Here", "request_location": true}` | n/a |
//! | `{…}`           | passed through unchanged     | passed through unchanged        |
//!
//! The keyboard is inline when any button of the first row carries a string
//! payload.

use serde_json::{Map, Value, json};

const REQUEST_CONTACT: i64 = 2;
const REQUEST_LOCATION: i64 = 3;

/// Expands shorthand `rows` into a serialized markup object.
///
/// Reply keyboards get `resize_keyboard: true` and `one_time_keyboard: false`
/// unless `options` overrides them; `options` is merged into either kind.
pub fn expand_keyboard(rows: &[Value], options: &Map<String, Value>) -> String {
    let inline = is_inline(rows);

    let buttons: Vec<Value> = rows
        .iter()
        .map(|row| match row {
            Value::Array(cols) => Value::Array(cols.iter().map(|c| button(c, inline)).collect()),
            single => Value::Array(vec![button(single, inline)]),
        })
        .collect();

    let mut markup = Map::new();
    if inline {
        markup.insert("inline_keyboard".into(), Value::Array(buttons));
    } else {
        markup.insert("keyboard".into(), Value::Array(buttons));
        markup.insert("resize_keyboard".into(), Value::Bool(true));
        markup.insert("one_time_keyboard".into(), Value::Bool(false));
    }
    markup.extend(options.clone());

    Value::Object(markup).to_string()
}

/// Serialized `ReplyKeyboardRemove` markup.
pub fn remove_keyboard() -> String {
    json!({ "remove_keyboard": true }).to_string()
}

fn is_inline(rows: &[Value]) -> bool {
    rows.first()
        .and_then(Value::as_array)
        .is_some_and(|row| {
            row.iter()
                .any(|button| button.get(1).is_some_and(Value::is_string))
        })
}

fn button(column: &Value, inline: bool) -> Value {
    let parts = match column {
        Value::Array(parts) => parts,
        Value::Object(_) => return column.clone(),
        Value::String(text) => return json!({ "text": text }),
        other => return json!({ "text": other.to_string() }),
    };

    let text = match parts.first() {
        Some(Value::String(text)) => Value::String(text.clone()),
        Some(other) => Value::String(other.to_string()),
        None => Value::String(String::new()),
    };
    let mut out = Map::new();
    out.insert("text".into(), text);

    match (parts.get(1), inline) {
        (Some(Value::String(payload)), true) => {
            let key = if is_link(payload) { "url" } else { "callback_data" };
            out.insert(key.into(), Value::String(payload.clone()));
        }
        (Some(Value::Number(code)), false) => match code.as_i64() {
            Some(REQUEST_CONTACT) => {
                out.insert("request_contact".into(), Value::Bool(true));
            }
            Some(REQUEST_LOCATION) => {
                out.insert("request_location".into(), Value::Bool(true));
            }
            _ => {}
        },
        _ => {}
    }

    // Trailing object carries extra button fields.
    if let Some(Value::Object(extra)) = parts.last() {
        for (k, v) in extra {
            out.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    Value::Object(out)
}

fn is_link(payload: &str) -> bool {
    ["http://", "https://", "tg://"]
        .iter()
        .any(|scheme| payload.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn test_plain_rows_become_reply_keyboard() {
        let rows = vec![json!(["Yes", "No"]), json!([["Share phone", 2]])];
        let markup = parse(&expand_keyboard(&rows, &Map::new()));

        assert_eq!(
            markup,
            json!({
                "keyboard": [
                    [{ "text": "Yes" }, { "text": "No" }],
                    [{ "text": "Share phone", "request_contact": true }]
                ],
                "resize_keyboard": true,
                "one_time_keyboard": false
            })
        );
    }

    #[test]
    fn test_string_payload_makes_inline_keyboard() {
        let rows = vec![json!([["Open", "https://example.org"], ["Vote", "vote:1"]])];
        let markup = parse(&expand_keyboard(&rows, &Map::new()));

        assert_eq!(
            markup,
            json!({
                "inline_keyboard": [[
                    { "text": "Open", "url": "https://example.org" },
                    { "text": "Vote", "callback_data": "vote:1" }
                ]]
            })
        );
    }

    #[test]
    fn test_options_override_defaults() {
        let mut options = Map::new();
        options.insert("one_time_keyboard".into(), Value::Bool(true));
        let markup = parse(&expand_keyboard(&[json!(["A"])], &options));
        assert_eq!(markup["one_time_keyboard"], json!(true));
    }
}
