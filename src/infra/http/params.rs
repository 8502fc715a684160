//! Query parameters and request headers as sorted scalar maps.

use std::collections::BTreeMap;

use sijil_api_types::{ParamValue, SortDirection};

/// Query parameters keyed by name, iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(BTreeMap<String, ParamValue>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn extend<I, K, V>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
        self
    }

    /// Combine several parameter sets; later sets win on conflicting keys.
    pub fn merge<'a>(sets: impl IntoIterator<Item = &'a QueryParams>) -> Self {
        let mut merged = Self::new();
        for set in sets {
            merged
                .0
                .extend(set.0.iter().map(|(key, value)| (key.clone(), value.clone())));
        }
        merged
    }

    /// Copy without the named keys.
    pub fn without(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(key, _)| !keys.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Copy with null and empty-string values dropped.
    pub fn compact(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stringified pairs ready for a query string. Empty values are skipped.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect()
    }

    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_pairs())
            .finish()
    }

    /// Parse `a=1&b=x`, with or without a leading `?`. Values stay text.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(key, value)| (key.into_owned(), ParamValue::Text(value.into_owned())))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        params.extend(iter);
        params
    }
}

impl<'a> IntoIterator for &'a QueryParams {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// `page` and `pageSize`, plus any extra parameters.
pub fn pagination_params(page: u32, page_size: u32, extra: Option<&QueryParams>) -> QueryParams {
    let mut params = QueryParams::new()
        .with("page", page)
        .with("pageSize", page_size);
    if let Some(extra) = extra {
        params.extend(extra.iter().map(|(key, value)| (key.clone(), value.clone())));
    }
    params.compact()
}

/// `sortBy` and `sortDirection` when a sort field is given, plus any extra parameters.
pub fn sort_params(
    sort_by: Option<&str>,
    direction: SortDirection,
    extra: Option<&QueryParams>,
) -> QueryParams {
    let mut params = extra.cloned().unwrap_or_default();
    if let Some(field) = sort_by.filter(|field| !field.is_empty()) {
        params.set("sortBy", field).set("sortDirection", direction.as_str());
    }
    params.compact()
}

/// Request headers keyed by name, iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders(BTreeMap<String, String>);

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a RequestHeaders {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}
