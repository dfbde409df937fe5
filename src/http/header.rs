use std::collections::hash_map::Iter;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result};

/// Header names are kept exactly as received, so [`HeaderMap::get`] is
/// case-sensitive. [`HeaderMap::find`] matches names the way HTTP does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    inner: HashMap<String, String>,
}

impl HeaderMap {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, String, String> {
        self.inner.iter()
    }

    /// Looks a header up ignoring ASCII case in its name.
    #[inline]
    pub fn find(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.get(name) {
            return Some(value);
        }
        self.inner
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[inline]
    pub fn content_length(&self) -> Option<usize> {
        self.find("Content-Length")?.trim().parse().ok()
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a String, &'a String);
    type IntoIter = Iter<'a, String, String>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for HeaderMap {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        #[expect(clippy::iter_over_hash_type, reason = "headers order is not important")]
        for (key, value) in &self.inner {
            write!(f, "{}: {}\r\n", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_is_exact_but_find_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.insert("content-encoding", "gzip");
        assert_eq!(headers.get("Content-Encoding"), None);
        assert_eq!(headers.find("Content-Encoding"), Some("gzip"));
        assert_eq!(headers.find("CONTENT-ENCODING"), Some("gzip"));
        assert_eq!(headers.find("Content-Type"), None);
    }

    #[test]
    fn content_length_matches_any_case() {
        let mut headers = HeaderMap::new();
        headers.insert("content-length", " 42");
        assert_eq!(headers.content_length(), Some(42));

        let mut headers = HeaderMap::new();
        headers.insert("CONTENT-LENGTH", "nope");
        assert_eq!(headers.content_length(), None);
    }
}
