// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Request parameters.
//!
//! Parses a raw query string into ordered parameters, collapsing PHP-style
//! `key[]=a&key[]=b` pairs into lists, and re-serializes them for filter
//! forms and "clear filter" links.
//!
//! ```
//! use search_augment::params::RequestParams;
//!
//! let params = RequestParams::parse("s=report&metadata_color=red,blue&paged=3");
//! assert_eq!(params.get_str("s"), Some("report"));
//! assert_eq!(params.get("metadata_color").unwrap().as_list(), vec!["red", "blue"]);
//!
//! // Filter changes reset pagination
//! let cleared = params.without_value("metadata_color", "red");
//! assert_eq!(cleared.to_query_string(), "s=report&metadata_color=blue");
//! ```

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Pagination cursor; never carried across a filter change.
pub const PAGED_PARAM: &str = "paged";

/// A single parameter value: scalar or list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl ParamValue {
    /// Values as a list. Scalars are split on commas; entries are trimmed
    /// and empty entries dropped.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            ParamValue::Scalar(s) => split_comma_list(s),
            ParamValue::List(items) => items
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
        }
    }

    /// First non-empty value.
    pub fn first(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(s) => Some(s.as_str()).filter(|s| !s.is_empty()),
            ParamValue::List(items) => items.iter().map(String::as_str).find(|s| !s.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::Scalar(s) => s.is_empty(),
            ParamValue::List(items) => items.iter().all(String::is_empty),
        }
    }

    fn without(&self, value: &str) -> Option<ParamValue> {
        match self {
            ParamValue::List(items) => {
                let kept: Vec<String> =
                    items.iter().filter(|v| v.trim() != value).cloned().collect();
                (!kept.is_empty()).then_some(ParamValue::List(kept))
            }
            ParamValue::Scalar(s) => {
                let kept: Vec<String> =
                    split_comma_list(s).into_iter().filter(|v| v != value).collect();
                (!kept.is_empty()).then(|| ParamValue::Scalar(kept.join(",")))
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::List(values.into_iter().map(str::to_string).collect())
    }
}

/// Ordered request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    entries: Vec<(String, ParamValue)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::new();
        for (raw_key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match list_base(&raw_key) {
                Some(base) => params.push_list_item(base, value),
                None => params.insert(raw_key.into_owned(), ParamValue::Scalar(value)),
            }
        }
        params
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// First non-empty value of a parameter.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::first)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_str(key).is_some()
    }

    /// Insert or replace a parameter, keeping its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy with one value removed from a parameter ("clear individual filter").
    ///
    /// The parameter is dropped entirely once it has no values left. Pagination
    /// is always dropped since the result set changes.
    pub fn without_value(&self, key: &str, value: &str) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(k, _)| k != PAGED_PARAM)
            .filter_map(|(k, v)| {
                if k == key {
                    v.without(value).map(|v| (k.clone(), v))
                } else {
                    Some((k.clone(), v.clone()))
                }
            })
            .collect();
        Self { entries }
    }

    /// Copy without every parameter whose key starts with `prefix`.
    pub fn without_prefix(&self, prefix: &str) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(k, _)| k != PAGED_PARAM && !k.starts_with(prefix))
            .cloned()
            .collect();
        Self { entries }
    }

    /// Serialize for a filter form submission. `paged` is omitted so that
    /// changing a filter resets pagination.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.entries {
            if key == PAGED_PARAM {
                continue;
            }
            match value {
                ParamValue::Scalar(v) => {
                    serializer.append_pair(key, v);
                }
                ParamValue::List(items) => {
                    let list_key = format!("{key}[]");
                    for item in items {
                        serializer.append_pair(&list_key, item);
                    }
                }
            }
        }
        serializer.finish()
    }

    fn push_list_item(&mut self, key: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => {
                let merged = match std::mem::replace(existing, ParamValue::List(Vec::new())) {
                    ParamValue::List(mut items) => {
                        items.push(value);
                        items
                    }
                    ParamValue::Scalar(prev) => vec![prev, value],
                };
                *existing = ParamValue::List(merged);
            }
            None => self.entries.push((key.to_string(), ParamValue::List(vec![value]))),
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v.into());
        }
        params
    }
}

/// `key[]` / `key[3]` → `key`
fn list_base(raw_key: &str) -> Option<&str> {
    let open = raw_key.find('[')?;
    if !raw_key.ends_with(']') || open == 0 {
        return None;
    }
    let index = &raw_key[open + 1..raw_key.len() - 1];
    if index.chars().all(|c| c.is_ascii_digit()) {
        Some(&raw_key[..open])
    } else {
        None
    }
}

fn split_comma_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase and keep only `[a-z0-9_-]`.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

/// Strip markup and control characters, collapse whitespace, trim.
pub fn sanitize_text_field(value: &str) -> String {
    let mut stripped = String::with_capacity(value.len());
    let mut in_tag = false;
    for c in value.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c if c.is_control() => stripped.push(' '),
            c => stripped.push(c),
        }
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
