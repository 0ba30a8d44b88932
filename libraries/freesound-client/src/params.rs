//! Query parameters forwarded to the API.

use std::fmt::Write as _;

/// Ordered set of query string parameters.
///
/// Keys are unique: setting a key twice keeps the last value in the
/// position of the first.
///
/// ```ignore
/// let params = QueryParams::new()
///     .param("query", "violoncello")
///     .param("filter", "tag:tenuto duration:[1.0 TO 15.0]")
///     .param("sort", "rating_desc")
///     .param("page_size", 10);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key.into(), value.to_string());
        self
    }

    /// Set a vector-valued parameter (similarity targets).
    ///
    /// Serialized as `[v1,v2,...]` with 5 decimal digits to keep URLs short.
    pub fn vector(self, key: impl Into<String>, values: &[f64]) -> Self {
        let formatted = format_vector(values);
        self.param(key, formatted)
    }

    /// Set a parameter only when it is not present yet.
    pub fn with_default(mut self, key: &str, value: impl ToString) -> Self {
        if !self.contains(key) {
            self.pairs.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    fn set(&mut self, key: String, value: String) {
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key, value)),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |params, (k, v)| params.param(k, v))
    }
}

/// Format a vector as a bracketed, comma-joined list with 5 decimals.
pub fn format_vector(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 9 + 2);
    out.push('[');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{value:.5}");
    }
    out.push(']');
    out
}
