//! Tags and tag value formatting.
//!
//! # Responsibilities
//! - Represent a tag as an owned (key, value) pair
//! - Keep tag sets ordered and deterministic
//! - Collapse free-form values into a bounded set via a `TagFormatter`
//!
//! # Design Decisions
//! - Formatting is total: a formatter cannot fail
//! - The default formatter is the identity; hosts replace it wholesale

use std::fmt;

/// A single key/value label attached to an observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// An ordered sequence of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Append a tag, keeping insertion order.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(Tag::new(key, value));
    }

    /// Builder-style variant of [`TagSet::push`].
    pub fn and(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Value of the first tag with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|t| t.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert to labels for the `metrics` facade.
    pub fn to_labels(&self) -> Vec<metrics::Label> {
        self.0
            .iter()
            .map(|t| metrics::Label::new(t.key.clone(), t.value.clone()))
            .collect()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", tag)?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| Tag::new(k, v)).collect())
    }
}

impl IntoIterator for TagSet {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Normalizes free-form strings into low-cardinality tag values.
pub trait TagFormatter: Send + Sync {
    fn format(&self, input: &str) -> String;
}

/// Default formatter: values pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTagFormatter;

impl TagFormatter for IdentityTagFormatter {
    fn format(&self, input: &str) -> String {
        input.to_string()
    }
}

/// Collapses numeric and UUID path segments to `{id}`.
///
/// Values without a `/` are returned unchanged, so method names and status
/// codes pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathNormalizingFormatter;

impl TagFormatter for PathNormalizingFormatter {
    fn format(&self, input: &str) -> String {
        if !input.contains('/') {
            return input.to_string();
        }

        input
            .split('/')
            .map(|seg| {
                if is_uuid(seg) || is_numeric(seg) {
                    "{id}"
                } else {
                    seg
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Check if a string looks like a UUID (8-4-4-4-12 hex pattern).
fn is_uuid(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }

    let expected_lengths = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == expected_lengths.len()
        && parts
            .iter()
            .zip(expected_lengths)
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_set_keeps_order() {
        let tags = TagSet::new()
            .and("method", "GET")
            .and("uri", "/users/{id}")
            .and("status", "200");

        assert_eq!(tags.keys().collect::<Vec<_>>(), vec!["method", "uri", "status"]);
        assert_eq!(tags.get("uri"), Some("/users/{id}"));
        assert_eq!(tags.get("exception"), None);
        assert_eq!(tags.to_string(), "{method=GET, uri=/users/{id}, status=200}");
    }

    #[test]
    fn test_labels() {
        let tags: TagSet = [("method", "POST")].into_iter().collect();
        let labels = tags.to_labels();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].key(), "method");
        assert_eq!(labels[0].value(), "POST");
    }

    #[test]
    fn test_identity_formatter() {
        assert_eq!(IdentityTagFormatter.format("/users/42"), "/users/42");
        assert_eq!(IdentityTagFormatter.format(""), "");
    }

    #[test]
    fn test_normalizing_formatter() {
        let f = PathNormalizingFormatter;
        assert_eq!(f.format("/users/42"), "/users/{id}");
        assert_eq!(
            f.format("/jobs/550e8400-e29b-41d4-a716-446655440000/status"),
            "/jobs/{id}/status"
        );
        assert_eq!(f.format("/users/{id}"), "/users/{id}");
        assert_eq!(f.format("200"), "200");
        assert_eq!(f.format("GET"), "GET");
    }
}
