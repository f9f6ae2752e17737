//! Route keys.
//!
//! A key looks like a URL path (`docs/all`) but is a literal lookup string,
//! never a pattern. Anything that a path router would read as a parameter
//! (`{id}`, `:id`, `*rest`) is rejected up front, so keys can be handed to
//! [`matchit`] at reification time without changing meaning. Dot segments
//! (`.`, `..`) are rejected too: URL normalization strips them.

use std::borrow::Borrow;
use std::fmt;

use crate::error::{Error, Result};

/// A validated, `/`-delimited, parameter-free route key.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RouteKey(String);

impl RouteKey {
    /// Validates `raw` and wraps it.
    ///
    /// ```rust
    /// use keyway::RouteKey;
    ///
    /// assert!(RouteKey::parse("docs/all").is_ok());
    /// assert!(RouteKey::parse("docs/{id}").is_err());
    /// assert!(RouteKey::parse("/docs").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        validate(raw)?;
        Ok(Self(raw.to_owned()))
    }

    /// `prefix/key`. The prefix follows the same rules as a key.
    pub fn join(prefix: &str, key: &RouteKey) -> Result<Self> {
        validate(prefix)?;
        Ok(Self(format!("{prefix}/{}", key.0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

fn validate(raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(Error::config("route key is empty"));
    }
    if !raw.is_ascii() {
        return Err(Error::config(format!("route key `{raw}` is not ASCII")));
    }
    for segment in raw.split('/') {
        if segment.is_empty() {
            return Err(Error::config(format!("route key `{raw}` has an empty segment")));
        }
        if segment == "." || segment == ".." {
            return Err(Error::config(format!("route key `{raw}` has a dot segment")));
        }
        if segment.contains(['{', '}'])
            || segment.starts_with(':')
            || segment.starts_with('*')
        {
            return Err(Error::config(format!(
                "route key `{raw}` contains a parameter placeholder in `{segment}`"
            )));
        }
        if segment.chars().any(|c| c.is_ascii_whitespace() || c.is_ascii_control() || c == '?' || c == '#') {
            return Err(Error::config(format!(
                "route key `{raw}` contains a reserved character in `{segment}`"
            )));
        }
    }
    Ok(())
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RouteKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RouteKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for RouteKey {
    type Error = Error;

    fn try_from(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_paths() {
        for raw in ["docs", "docs/all", "orgs/by-name/v2", "a.b/c_d", ".well-known/x", "v/..."] {
            assert_eq!(RouteKey::parse(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn rejects_malformed_keys() {
        for raw in [
            "", "/docs", "docs/", "docs//all", "docs/{id}", "docs/:id", "files/*rest",
            "dócs", "docs all", "docs?x=1", ".", "docs/..", "../docs", "docs/./all",
        ] {
            let err = RouteKey::parse(raw).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn keys_are_case_sensitive() {
        assert_ne!(RouteKey::parse("Docs").unwrap(), RouteKey::parse("docs").unwrap());
    }

    #[test]
    fn join_validates_prefix() {
        let key = RouteKey::parse("docs/all").unwrap();
        assert_eq!(RouteKey::join("nested", &key).unwrap().as_str(), "nested/docs/all");
        assert_eq!(RouteKey::join("a/b", &key).unwrap().segments().count(), 4);
        assert!(RouteKey::join("", &key).is_err());
        assert!(RouteKey::join("{x}", &key).is_err());
    }
}
