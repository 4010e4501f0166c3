use std::collections::HashMap;
use std::fmt::{self, Display};
use std::ops::Add;

use hyper::HeaderMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Prefix of every user metadata header.
pub const X_AMAZON_META_HEADER_START: &str = "x-amz-meta-";

/// User defined metadata of an object, keyed by normalized header name.
///
/// Every key is lower-cased and starts with [`X_AMAZON_META_HEADER_START`];
/// values set through [`MetaData::set`] are percent-escaped so they are
/// always valid header values. Insertion order is kept for iteration and
/// display, equality ignores it.
///
/// ## Example
/// ```rust
/// use minio_template::MetaData;
/// let mut meta = MetaData::from([("Color", "red")]);
/// meta.set("owner", "dean");
/// assert_eq!(meta.get("x-amz-meta-color"), Some("red"));
/// assert_eq!(meta.get("owner"), Some("dean"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    entries: Vec<(String, String)>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Whether the key already carries the metadata prefix, ignoring case.
    pub fn is_meta_key(key: &str) -> bool {
        key.len() >= X_AMAZON_META_HEADER_START.len()
            && key.as_bytes()[..X_AMAZON_META_HEADER_START.len()]
                .eq_ignore_ascii_case(X_AMAZON_META_HEADER_START.as_bytes())
    }

    /// Lower-case the key and add the metadata prefix unless already present.
    pub fn normalize(key: &str) -> String {
        let key = key.to_lowercase();
        if Self::is_meta_key(&key) {
            key
        } else {
            format!("{X_AMAZON_META_HEADER_START}{key}")
        }
    }

    /// Percent-escape a value for use as a header.
    ///
    /// Everything but the unreserved characters is escaped, which covers
    /// the path segment escapes plus the reserved `! $ & ' ( ) * + , / : ; = @ [ ]`.
    pub fn encode(value: &str) -> String {
        urlencoding::encode(value).into_owned()
    }

    /// Build from headers as a multi-valued map.
    ///
    /// Only keys carrying the metadata prefix are kept, with their first value.
    pub fn from_header_map<I, K, L>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: AsRef<str>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        let mut meta = Self::new();
        for (key, values) in headers {
            let key = key.as_ref();
            if !Self::is_meta_key(key) {
                continue;
            }
            if let Some(value) = values.into_iter().next() {
                meta.insert_raw(key.to_lowercase(), value.into());
            }
        }
        meta
    }

    /// Build from the headers of an http response.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut meta = Self::new();
        for key in headers.keys() {
            if !Self::is_meta_key(key.as_str()) {
                continue;
            }
            if let Some(value) = headers.get(key).and_then(|v| v.to_str().ok()) {
                meta.insert_raw(key.as_str().to_lowercase(), value.to_owned());
            }
        }
        meta
    }

    /// Build from metadata as sent over the wire: keys are normalized, values kept as is.
    pub fn from_wire<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut meta = Self::new();
        for (key, value) in pairs {
            meta.insert_raw(Self::normalize(key.as_ref()), value.into());
        }
        meta
    }

    fn insert_raw(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Set an entry, normalizing the key and escaping the value.
    pub fn set<K: AsRef<str>, V: Display>(&mut self, key: K, value: V) -> &mut Self {
        let key = Self::normalize(key.as_ref());
        self.insert_raw(key, Self::encode(&value.to_string()));
        self
    }

    /// Builder flavour of [`MetaData::set`].
    pub fn with<K: AsRef<str>, V: Display>(mut self, key: K, value: V) -> Self {
        self.set(key, value);
        self
    }

    /// Get the raw (escaped) value; the key may be given with or without prefix.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = Self::normalize(key);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the value with the percent escapes undone.
    pub fn get_decoded(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| {
            urlencoding::decode(v)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| v.to_owned())
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let key = Self::normalize(key);
        let index = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// A new instance with `other` applied on top of `self`; `other` wins on collisions.
    pub fn merge(&self, other: &MetaData) -> MetaData {
        let mut merged = self.clone();
        for (key, value) in &other.entries {
            merged.insert_raw(key.clone(), value.clone());
        }
        merged
    }

    /// Normalized header name to value.
    pub fn to_hash(&self) -> HashMap<String, String> {
        self.entries.iter().cloned().collect()
    }

    /// Keys without the metadata prefix, the form S3 SDKs expect.
    pub fn to_user_map(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (k[X_AMAZON_META_HEADER_START.len()..].to_owned(), v.clone()))
            .collect()
    }
}

impl<K: AsRef<str>, V: Display> FromIterator<(K, V)> for MetaData {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut meta = MetaData::new();
        for (key, value) in iter {
            meta.set(key, value);
        }
        meta
    }
}

// keys are unique, so equal length plus matching lookups is map equality
impl PartialEq for MetaData {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(key, value)| {
                other
                    .entries
                    .iter()
                    .any(|(k, v)| k == key && v == value)
            })
    }
}

impl Eq for MetaData {}

impl<K: AsRef<str>, V: Display, const N: usize> From<[(K, V); N]> for MetaData {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl Add<&MetaData> for &MetaData {
    type Output = MetaData;

    fn add(self, rhs: &MetaData) -> MetaData {
        self.merge(rhs)
    }
}

impl<'a> IntoIterator for &'a MetaData {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl Serialize for MetaData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl fmt::Display for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::write_json(self, f)
    }
}
