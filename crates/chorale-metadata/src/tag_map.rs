// SPDX-License-Identifier: GPL-3.0-or-later

use crate::coercion::{read_as, FromTagValue};

/// Ordered view over the tag/value pairs of one file.
///
/// Keys may repeat and keep the order in which the decoder reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    entries: Vec<(String, String)>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
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

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// First value stored under exactly `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.find_first(&[key])
    }

    /// Every value stored under exactly `key`, in map order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Fallback-chain lookup: the first entry, in map order, whose key is any
    /// of `aliases`.
    ///
    /// The position of a key inside `aliases` does not matter; the map order
    /// decides.
    pub fn find_first<S: AsRef<str>>(&self, aliases: &[S]) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| aliases.iter().any(|alias| alias.as_ref() == k))
            .map(|(_, v)| v.as_str())
    }

    /// [`find_first`](Self::find_first) followed by a trimmed typed read.
    ///
    /// Only the first matching entry is considered: if it fails to coerce the
    /// field is absent, later aliases are not tried.
    pub fn find_first_as<T: FromTagValue, S: AsRef<str>>(&self, aliases: &[S]) -> Option<T> {
        self.find_first(aliases).and_then(read_as::<T>)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_order_wins_over_alias_order() {
        let tags: TagMap = [("YEAR", "1999"), ("DATE", "2001-04-02")].into_iter().collect();
        assert_eq!(tags.find_first(&["DATE", "YEAR"]), Some("1999"));
    }

    #[test]
    fn repeated_keys_are_kept_in_order() {
        let mut tags = TagMap::new();
        tags.push("GENRE", "Rock");
        tags.push("TITLE", "Song");
        tags.push("GENRE", "Jazz");

        assert_eq!(tags.len(), 3);
        assert_eq!(tags.get("GENRE"), Some("Rock"));
        assert_eq!(tags.get_all("GENRE").collect::<Vec<_>>(), vec!["Rock", "Jazz"]);
    }

    #[test]
    fn lookups_are_exact() {
        let tags: TagMap = [("title", "lower")].into_iter().collect();
        assert!(tags.get("TITLE").is_none());
        assert!(!tags.contains_key("TITLE"));
        assert!(tags.contains_key("title"));
    }

    #[test]
    fn typed_lookup_does_not_fall_through_on_failure() {
        let tags: TagMap = [("DATE", "someday"), ("YEAR", "1984")].into_iter().collect();
        let date: Option<chorale_domain::ReleaseDate> = tags.find_first_as(&["DATE", "YEAR"]);
        assert!(date.is_none());
    }
}
