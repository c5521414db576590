//! Header Multimap and Copy Rules
//!
//! HTTP header blocks are multimaps: a case-insensitive field name mapped
//! to an ordered list of values. Two instances live per response: the
//! pending map the RPC layer mutates, and the flushed map of the real
//! output. The transcoder moves entries between them through a small
//! declarative rule pipeline:
//!
//! - [`HeaderRule::Skip`]: drop reserved keys (e.g. the `trailer`
//!   announcement) or keys already flushed
//! - [`HeaderRule::StripKeyPrefix`]: turn a transport-level
//!   trailer-prefixed key back into its logical name
//! - [`HeaderRule::ReplaceValue`]: rewrite the gRPC content-type token
//!   into the negotiated gRPC-Web token
//! - [`HeaderRule::LowercaseKeys`]: canonicalize key casing
//!
//! Rules are applied in order while copying; each rule sees the output of
//! the previous one.

/// Ordered, case-insensitive header multimap.
///
/// Insertion order of keys is preserved and is the serialization order.
/// Lookup compares field names ASCII-case-insensitively; the stored key
/// keeps the casing it was first inserted with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Get the first value for a key, if any
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|i| self.entries[i].1.first())
            .map(String::as_str)
    }

    /// Get all values for a key
    pub fn get_all(&self, name: &str) -> &[String] {
        self.position(name)
            .map(|i| self.entries[i].1.as_slice())
            .unwrap_or(&[])
    }

    /// Check whether a key is present
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Replace all values for a key with a single value
    pub fn set(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => self.entries[i].1 = vec![value.to_string()],
            None => self
                .entries
                .push((name.to_string(), vec![value.to_string()])),
        }
    }

    /// Append a value for a key, keeping existing values
    pub fn add(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => self.entries[i].1.push(value.to_string()),
            None => self
                .entries
                .push((name.to_string(), vec![value.to_string()])),
        }
    }

    /// Remove a key and all its values
    pub fn remove(&mut self, name: &str) {
        if let Some(i) = self.position(name) {
            self.entries.remove(i);
        }
    }

    /// Iterate over (key, values) entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, vs)| (k.as_str(), vs.as_slice()))
    }

    /// Iterate over keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

/// One transformation step applied while copying headers.
///
/// Rules are pure over a (key, value) pair and compose in order.
#[derive(Debug, Clone)]
pub enum HeaderRule {
    /// Drop any key matching the given set (case-insensitive)
    Skip(Vec<String>),
    /// Strip a fixed prefix from matching keys (case-insensitive match)
    StripKeyPrefix(String),
    /// For a specific key, substitute the first occurrence of `from`
    /// with `to` in each value
    ReplaceValue {
        /// Key whose values are rewritten (case-insensitive)
        key: String,
        /// Substring to replace
        from: String,
        /// Replacement
        to: String,
    },
    /// Canonicalize keys to lower-case (HTTP/2 wire form)
    LowercaseKeys,
}

impl HeaderRule {
    /// Build a `Skip` rule from string-likes
    pub fn skip<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Skip(names.into_iter().map(Into::into).collect())
    }

    /// Build a `ReplaceValue` rule
    pub fn replace_value(key: &str, from: &str, to: &str) -> Self {
        Self::ReplaceValue {
            key: key.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Copy every (key, value) pair from `src` into `dst`, applying `rules`
/// in order.
///
/// A pair dropped by a `Skip` rule never reaches the rules after it.
/// Values are appended to `dst`, so keys already present there keep their
/// existing values. Never errors; the only side effect is mutating `dst`.
pub fn copy_headers(dst: &mut HeaderMap, src: &HeaderMap, rules: &[HeaderRule]) {
    for (key, values) in src.iter() {
        for value in values {
            let mut key = key.to_string();
            let mut value = value.clone();
            let mut skipped = false;

            for rule in rules {
                match rule {
                    HeaderRule::Skip(names) => {
                        if names.iter().any(|n| n.eq_ignore_ascii_case(&key)) {
                            skipped = true;
                            break;
                        }
                    }
                    HeaderRule::StripKeyPrefix(prefix) => {
                        if key.len() >= prefix.len()
                            && key[..prefix.len()].eq_ignore_ascii_case(prefix)
                        {
                            key = key[prefix.len()..].to_string();
                        }
                    }
                    HeaderRule::ReplaceValue { key: k, from, to } => {
                        if k.eq_ignore_ascii_case(&key) {
                            value = value.replacen(from.as_str(), to.as_str(), 1);
                        }
                    }
                    HeaderRule::LowercaseKeys => {
                        key = key.to_ascii_lowercase();
                    }
                }
            }

            if !skipped {
                dst.add(&key, &value);
            }
        }
    }
}

/// Collect the key names of a map in insertion order
pub fn header_keys(map: &HeaderMap) -> Vec<String> {
    map.keys().map(String::from).collect()
}
