//! Schemaless wrapper around API responses.
//!
//! Freesound responses vary with the `fields` and `descriptors` request
//! parameters, so objects are kept as JSON and read through explicit,
//! fallible lookups instead of fixed structs.

use crate::client::FreesoundClient;
use crate::error::{FreesoundError, Result};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// A JSON object returned by the API, plus the client that fetched it.
///
/// Keys containing `-` are rewritten with `_` (e.g. `preview-lq-mp3`
/// becomes `preview_lq_mp3`) at every depth, including objects inside
/// arrays, before the object is exposed. If two keys collide after the
/// rewrite, the one that comes later in key order wins.
///
/// Objects are immutable. [`as_dict`](Self::as_dict) and `Serialize`
/// return the normalized mapping.
#[derive(Clone)]
pub struct FreesoundObject {
    fields: Map<String, Value>,
    client: FreesoundClient,
}

impl FreesoundObject {
    /// Wrap a JSON mapping, normalizing its keys.
    pub fn new(fields: Map<String, Value>, client: FreesoundClient) -> Self {
        Self {
            fields: normalize_keys(fields),
            client,
        }
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value, client: FreesoundClient) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self::new(fields, client)),
            other => Err(FreesoundError::parse(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Client used for follow-up requests.
    pub fn client(&self) -> &FreesoundClient {
        &self.client
    }

    /// Raw value of a field.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.fields
            .get(name)
            .ok_or_else(|| FreesoundError::missing_field(name))
    }

    /// Raw value of a field, if present.
    pub fn get_opt(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field deserialized as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.get(name)?;
        T::deserialize(value).map_err(|e| {
            FreesoundError::field_type(name, format!("{} ({e})", std::any::type_name::<T>()))
        })
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        self.get(name)?
            .as_str()
            .ok_or_else(|| FreesoundError::field_type(name, "a string"))
    }

    pub fn u64(&self, name: &str) -> Result<u64> {
        self.get(name)?
            .as_u64()
            .ok_or_else(|| FreesoundError::field_type(name, "an unsigned integer"))
    }

    pub fn f64(&self, name: &str) -> Result<f64> {
        self.get(name)?
            .as_f64()
            .ok_or_else(|| FreesoundError::field_type(name, "a number"))
    }

    /// Nested object field, wrapped.
    pub fn object(&self, name: &str) -> Result<FreesoundObject> {
        match self.get(name)? {
            Value::Object(fields) => Ok(Self {
                fields: fields.clone(),
                client: self.client.clone(),
            }),
            _ => Err(FreesoundError::field_type(name, "an object")),
        }
    }

    /// Follow a dotted path through nested objects.
    ///
    /// `analysis.lookup("lowlevel.mfcc.mean")` is the same as reading
    /// `mean` from the `mfcc` object of the `lowlevel` object. The error
    /// names the full path up to the first missing segment.
    pub fn lookup(&self, path: &str) -> Result<&Value> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = self.get(first)?;
        let mut walked = first.to_string();

        for segment in segments {
            let Value::Object(map) = current else {
                return Err(FreesoundError::field_type(walked, "an object"));
            };
            walked.push('.');
            walked.push_str(segment);
            current = map
                .get(segment)
                .ok_or_else(|| FreesoundError::missing_field(walked.clone()))?;
        }

        Ok(current)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The underlying (normalized) mapping.
    pub fn as_dict(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_dict(self) -> Map<String, Value> {
        self.fields
    }
}

impl PartialEq for FreesoundObject {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl fmt::Debug for FreesoundObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreesoundObject")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl Serialize for FreesoundObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Types built from a response object.
///
/// Implemented by [`FreesoundObject`] itself, the resource types, and the
/// pagers, so [`FreesoundClient::request`] can return any of them.
pub trait FromObject: Sized {
    fn from_object(object: FreesoundObject) -> Result<Self>;
}

impl FromObject for FreesoundObject {
    fn from_object(object: FreesoundObject) -> Result<Self> {
        Ok(object)
    }
}

/// Rewrite `-` to `_` in every key, depth-first.
pub(crate) fn normalize_keys(fields: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(fields.len());
    for (key, value) in fields {
        let key = if key.contains('-') {
            key.replace('-', "_")
        } else {
            key
        };
        out.insert(key, normalize_value(value));
    }
    out
}

fn normalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_keys(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        other => other,
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientConfig;
    use serde_json::json;

    fn client() -> FreesoundClient {
        FreesoundClient::new(ClientConfig::with_api_key("test")).expect("valid config")
    }

    fn wrap(value: Value) -> FreesoundObject {
        FreesoundObject::from_value(value, client()).expect("json object")
    }

    #[test]
    fn test_round_trip_without_dashes() {
        let original = json!({
            "id": 96541,
            "name": "violoncello.wav",
            "tags": ["cello", "tenuto"],
            "duration": 3.25,
            "license": null,
            "analysis": {"lowlevel": {"mfcc": {"mean": [1.0, 2.0]}}}
        });

        let object = wrap(original.clone());
        assert_eq!(Value::Object(object.as_dict().clone()), original);
        assert_eq!(serde_json::to_value(&object).unwrap(), original);
    }

    #[test]
    fn test_dashes_normalized_at_every_depth() {
        let object = wrap(json!({
            "top-level": 1,
            "previews": {
                "preview-lq-mp3": "https://cdn.example.com/1-lq.mp3",
                "nested": {"deep-key": true}
            },
            "results": [{"inner-key": "x"}]
        }));

        assert_eq!(object.u64("top_level").unwrap(), 1);
        assert!(!object.contains("top-level"));

        let previews = object.object("previews").unwrap();
        assert_eq!(
            previews.str("preview_lq_mp3").unwrap(),
            "https://cdn.example.com/1-lq.mp3"
        );
        assert_eq!(
            previews.object("nested").unwrap().get("deep_key").unwrap(),
            &json!(true)
        );
        assert_eq!(object.get("results").unwrap(), &json!([{"inner_key": "x"}]));
    }

    #[test]
    fn test_values_are_not_rewritten() {
        let object = wrap(json!({"name": "a-b-c"}));
        assert_eq!(object.str("name").unwrap(), "a-b-c");
    }

    #[test]
    fn test_collision_later_key_wins() {
        // Keys iterate in sorted order; `a_b` sorts after `a-b`.
        let object = wrap(json!({"a-b": "dashed", "a_b": "underscored"}));
        assert_eq!(object.len(), 1);
        assert_eq!(object.str("a_b").unwrap(), "underscored");
    }

    #[test]
    fn test_missing_field() {
        let object = wrap(json!({"id": 1}));
        match object.get("name") {
            Err(FreesoundError::MissingField(field)) => assert_eq!(field, "name"),
            other => panic!("Expected MissingField, got: {:?}", other),
        }
        assert!(object.get_opt("name").is_none());
    }

    #[test]
    fn test_wrong_type() {
        let object = wrap(json!({"id": "not a number", "tags": ["a"]}));
        assert!(matches!(
            object.u64("id"),
            Err(FreesoundError::FieldType { .. })
        ));
        assert!(matches!(
            object.object("tags"),
            Err(FreesoundError::FieldType { .. })
        ));
        assert!(matches!(
            object.get_as::<Vec<u32>>("tags"),
            Err(FreesoundError::FieldType { .. })
        ));
    }

    #[test]
    fn test_typed_access() {
        let object = wrap(json!({"tags": ["field-recording", "rain"], "duration": 2.5}));
        let tags: Vec<String> = object.get_as("tags").unwrap();
        assert_eq!(tags, ["field-recording", "rain"]);
        assert_eq!(object.f64("duration").unwrap(), 2.5);
    }

    #[test]
    fn test_lookup_dotted_path() {
        let object = wrap(json!({
            "lowlevel": {"spectral_centroid": {"mean": 1234.5}}
        }));

        assert_eq!(
            object.lookup("lowlevel.spectral_centroid.mean").unwrap(),
            &json!(1234.5)
        );
        match object.lookup("lowlevel.mfcc.mean") {
            Err(FreesoundError::MissingField(path)) => assert_eq!(path, "lowlevel.mfcc"),
            other => panic!("Expected MissingField, got: {:?}", other),
        }
        assert!(matches!(
            object.lookup("lowlevel.spectral_centroid.mean.x"),
            Err(FreesoundError::FieldType { .. })
        ));
    }

    #[test]
    fn test_non_object_rejected() {
        let result = FreesoundObject::from_value(json!([1, 2, 3]), client());
        assert!(matches!(result, Err(FreesoundError::Parse(_))));
    }

    #[test]
    fn test_equality_ignores_client() {
        let a = wrap(json!({"id": 1}));
        let b = FreesoundObject::from_value(json!({"id": 1}), client()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, wrap(json!({"id": 2})));
    }
}
