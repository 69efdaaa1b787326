//! Call argument normalization.

use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

/// Named arguments of one remote call.
///
/// Built either from a single mapping or from a positional list of mappings
/// merged left to right (later keys win).
///
/// ```rust,ignore
/// let args = CallArgs::try_from(json!({ "chat_id": 1, "text": "hi" }))?;
/// let args = CallArgs::from_parts([json!({ "chat_id": 1 }), json!({ "text": "hi" })])?;
/// let args = CallArgs::new().arg("chat_id", "me").arg("text", "hi");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs(Map<String, Value>);

impl CallArgs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one argument (builder style).
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Merges a positional list of mappings into one.
    ///
    /// Fails with [`ApiError::InvalidArguments`] when a part is not a JSON
    /// object (or `null`, which is skipped).
    pub fn from_parts<I>(parts: I) -> ApiResult<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut merged = Map::new();
        for (index, part) in parts.into_iter().enumerate() {
            match part {
                Value::Object(map) => merged.extend(map),
                Value::Null => {}
                other => {
                    return Err(ApiError::InvalidArguments(format!(
                        "positional argument #{index} is not a mapping: {other}"
                    )));
                }
            }
        }
        Ok(Self(merged))
    }

    /// Merges `other` on top of `self`.
    pub fn merge(mut self, other: CallArgs) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Returns the argument named `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if `key` is set.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Mutable access to the underlying mapping.
    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Borrowed view of the underlying mapping.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the set, returning the request body.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for CallArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// An object is taken as is, an array is merged like [`CallArgs::from_parts`]
/// and `null` is empty. Any other value is rejected.
impl TryFrom<Value> for CallArgs {
    type Error = ApiError;

    fn try_from(value: Value) -> ApiResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Array(parts) => Self::from_parts(parts),
            Value::Null => Ok(Self::default()),
            other => Err(ApiError::InvalidArguments(format!(
                "arguments must be a mapping or a list of mappings, got {other}"
            ))),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for CallArgs
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for CallArgs
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Anything [`Api::call`](super::Api::call) accepts as arguments.
pub trait IntoCallArgs {
    fn into_call_args(self) -> ApiResult<CallArgs>;
}

impl IntoCallArgs for CallArgs {
    fn into_call_args(self) -> ApiResult<CallArgs> {
        Ok(self)
    }
}

impl IntoCallArgs for Map<String, Value> {
    fn into_call_args(self) -> ApiResult<CallArgs> {
        Ok(CallArgs(self))
    }
}

impl IntoCallArgs for Value {
    fn into_call_args(self) -> ApiResult<CallArgs> {
        CallArgs::try_from(self)
    }
}

impl IntoCallArgs for Vec<Value> {
    fn into_call_args(self) -> ApiResult<CallArgs> {
        CallArgs::from_parts(self)
    }
}

impl<K, V, const N: usize> IntoCallArgs for [(K, V); N]
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_call_args(self) -> ApiResult<CallArgs> {
        Ok(CallArgs::from(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positional_parts_merge_left_to_right() {
        let args = CallArgs::from_parts([
            json!({ "chat_id": 1, "text": "first" }),
            Value::Null,
            json!({ "text": "second" }),
        ])
        .unwrap();

        assert_eq!(args.get("chat_id"), Some(&json!(1)));
        assert_eq!(args.get("text"), Some(&json!("second")));
    }

    #[test]
    fn test_non_mapping_part_is_rejected() {
        let err = CallArgs::from_parts([json!({ "chat_id": 1 }), json!("oops")]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArguments(_)));
    }

    #[test]
    fn test_array_value_merges_its_parts() {
        let args = CallArgs::try_from(json!([{ "chat_id": 1 }, null, { "text": "hi" }])).unwrap();
        assert_eq!(args, CallArgs::new().arg("chat_id", 1).arg("text", "hi"));
    }

    #[test]
    fn test_scalar_value_is_rejected() {
        for value in [json!("oops"), json!(3), json!(true)] {
            let err = CallArgs::try_from(value).unwrap_err();
            assert!(matches!(err, ApiError::InvalidArguments(_)));
        }
        assert_eq!(CallArgs::try_from(Value::Null).unwrap(), CallArgs::new());
    }

    #[test]
    fn test_pairs_and_builder_agree() {
        let a = CallArgs::from([("chat_id", json!(5)), ("text", json!("x"))]);
        let b = CallArgs::new().arg("chat_id", 5).arg("text", "x");
        assert_eq!(a, b);
    }
}
