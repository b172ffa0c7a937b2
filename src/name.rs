//! Hierarchical names and NDN URI handling.
//!
//! A [`Name`] is an ordered list of opaque byte components. Names are parsed
//! from and printed as NDN URIs (`ndn:/a/b`, `/a/b`), with `%XX` escapes for
//! bytes outside the unreserved URI set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Component appended to the configured prefix for every probe name.
pub const PING_COMPONENT: &str = "ping";

const URI_SCHEMES: &[&str] = &["ndn:", "ndnx:", "ccnx:"];

/// Errors raised while parsing a name from its URI form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The URI path does not start with `/`.
    #[error("name URI must be an absolute path: {0}")]
    NotAbsolute(String),

    /// A `%` escape is truncated or not followed by two hex digits.
    #[error("invalid percent escape in name URI: {0}")]
    BadEscape(String),
}

/// A single name component.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Component(Vec<u8>);

impl Component {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Component(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Interprets the component as a probe token.
    ///
    /// Only a non-empty run of ASCII decimal digits that fits in `u64` is
    /// accepted; signs, whitespace and trailing characters are rejected.
    pub fn to_token(&self) -> Option<u64> {
        if self.0.is_empty() || !self.0.iter().all(u8::is_ascii_digit) {
            return None;
        }
        std::str::from_utf8(&self.0).ok()?.parse().ok()
    }
}

impl From<&str> for Component {
    fn from(s: &str) -> Self {
        Component(s.as_bytes().to_vec())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "%{:02X}", b)?;
            }
        }
        Ok(())
    }
}

/// An NDN name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    /// Creates the empty (root) name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a name from its URI form.
    ///
    /// ```
    /// use ndn_ping::name::Name;
    /// let name = Name::from_uri("ndn:/a/b%20c").unwrap();
    /// assert_eq!(name.len(), 2);
    /// assert_eq!(name.to_string(), "/a/b%20c");
    /// ```
    pub fn from_uri(uri: &str) -> Result<Self, NameError> {
        let path = URI_SCHEMES
            .iter()
            .find_map(|scheme| uri.strip_prefix(scheme))
            .unwrap_or(uri);

        let path = path
            .strip_prefix('/')
            .ok_or_else(|| NameError::NotAbsolute(uri.to_string()))?;

        let mut name = Name::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            name.push(Component(decode_segment(segment, uri)?));
        }
        Ok(name)
    }

    /// Returns a copy of this name with `component` appended.
    pub fn append(&self, component: impl Into<Component>) -> Self {
        let mut name = self.clone();
        name.push(component.into());
        name
    }

    pub fn push(&mut self, component: Component) {
        self.components.push(component);
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn last(&self) -> Option<&Component> {
        self.components.last()
    }

    /// Returns true if every component of `self` matches the leading components of `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.len() <= other.len() && self.components[..] == other.components[..self.len()]
    }

    /// Returns the components of `self` that follow `prefix`, or `None` when
    /// `prefix` is not a prefix of `self`.
    pub fn suffix_after(&self, prefix: &Name) -> Option<Name> {
        if !prefix.is_prefix_of(self) {
            return None;
        }
        Some(Name {
            components: self.components[prefix.len()..].to_vec(),
        })
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::from_uri(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for c in &self.components {
            write!(f, "/{}", c)?;
        }
        Ok(())
    }
}

/// Builds the probe name `<prefix>/<token>`.
///
/// `prefix` is expected to already end with [`PING_COMPONENT`]. Tokens are
/// rendered in canonical decimal so two different tokens never share a name.
pub fn probe_name(prefix: &Name, token: u64) -> Name {
    prefix.append(Component::new(token.to_string()))
}

fn decode_segment(segment: &str, uri: &str) -> Result<Vec<u8>, NameError> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| NameError::BadEscape(uri.to_string()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schemes() {
        for uri in ["/a/b", "ndn:/a/b", "ndnx:/a/b", "ccnx:/a/b"] {
            let name = Name::from_uri(uri).unwrap();
            assert_eq!(name.len(), 2, "{}", uri);
            assert_eq!(name.to_string(), "/a/b");
        }
    }

    #[test]
    fn test_parse_skips_empty_components() {
        let name = Name::from_uri("/a//b/").unwrap();
        assert_eq!(name.len(), 2);
        assert!(Name::from_uri("/").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert_eq!(
            Name::from_uri("a/b"),
            Err(NameError::NotAbsolute("a/b".to_string()))
        );
        assert!(Name::from_uri("ndn:a").is_err());
        assert!(Name::from_uri("").is_err());
    }

    #[test]
    fn test_percent_escapes() {
        let name = Name::from_uri("/x%2Fy/%00").unwrap();
        assert_eq!(name.components()[0].as_bytes(), b"x/y");
        assert_eq!(name.components()[1].as_bytes(), &[0u8]);
        assert_eq!(name.to_string(), "/x%2Fy/%00");

        assert!(matches!(
            Name::from_uri("/bad%2"),
            Err(NameError::BadEscape(_))
        ));
        assert!(matches!(
            Name::from_uri("/bad%zz"),
            Err(NameError::BadEscape(_))
        ));
    }

    #[test]
    fn test_prefix_and_suffix() {
        let prefix = Name::from_uri("/a/b/ping").unwrap();
        let name = probe_name(&prefix, 42);
        assert!(prefix.is_prefix_of(&name));
        assert!(!name.is_prefix_of(&prefix));
        assert_eq!(name.to_string(), "/a/b/ping/42");

        let suffix = name.suffix_after(&prefix).unwrap();
        assert_eq!(suffix.len(), 1);
        assert_eq!(suffix.last().unwrap().to_token(), Some(42));

        let other = Name::from_uri("/a/c/ping/42").unwrap();
        assert!(other.suffix_after(&prefix).is_none());
    }

    #[test]
    fn test_token_parsing() {
        assert_eq!(Component::from("0").to_token(), Some(0));
        assert_eq!(Component::from("12345").to_token(), Some(12345));
        assert_eq!(Component::from("-1").to_token(), None);
        assert_eq!(Component::from("abc").to_token(), None);
        assert_eq!(Component::from("12x").to_token(), None);
        assert_eq!(Component::from("+5").to_token(), None);
        assert_eq!(Component::from(" 5").to_token(), None);
        assert_eq!(Component::from("").to_token(), None);
        assert_eq!(Component::from("99999999999999999999999").to_token(), None);
    }

    #[test]
    fn test_distinct_tokens_never_alias() {
        let prefix = Name::from_uri("/p/ping").unwrap();
        assert_ne!(probe_name(&prefix, 1), probe_name(&prefix, 10));
        assert_eq!(probe_name(&prefix, 7), probe_name(&prefix, 7));
    }
}
