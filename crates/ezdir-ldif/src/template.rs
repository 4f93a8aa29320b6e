//! Placeholder substitution for LDIF templates.
//!
//! Templates are plain UTF-8 text with `$name` (or `${name}`) placeholders.
//! Substitution replaces every placeholder with the string form of its
//! mapped value and fails with [`Error::Template`] naming the first
//! placeholder that has no mapping. `$$` produces a literal dollar sign; a
//! `$` not followed by an identifier passes through unchanged.

use ezdir_core::{Error, Result};
use std::fmt::Display;

/// Ordered replacement map from placeholder name to string value.
///
/// Values are stringified at insertion, so numeric values can be passed
/// directly. Later insertions for the same name override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements {
    pairs: Vec<(String, String)>,
}

impl Replacements {
    /// Creates an empty replacement map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overrides a replacement value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Display) {
        let name = name.into();
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((name, value)),
        }
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the value for a placeholder name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Copies all pairs from `other`, overriding existing names.
    pub fn extend_from(&mut self, other: &Replacements) {
        for (name, value) in &other.pairs {
            self.set(name.clone(), value);
        }
    }

    /// Returns true if no replacements are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<N: Into<String>, V: Display> FromIterator<(N, V)> for Replacements {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut replacements = Self::new();
        for (name, value) in iter {
            replacements.set(name, value);
        }
        replacements
    }
}

/// Replaces every `$name` placeholder in `text` from the replacement map.
///
/// With `None` replacements this is the identity transform, which is useful
/// when reading literal, non-templated LDIF.
///
/// # Errors
///
/// Returns [`Error::Template`] naming the placeholder when one occurs in the
/// text without a mapped value, and [`Error::InvalidRequest`] for an
/// unterminated `${` placeholder.
pub fn substitute(text: &str, replacements: Option<&Replacements>) -> Result<String> {
    let Some(replacements) = replacements else {
        return Ok(text.to_string());
    };

    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }

        match chars.peek() {
            Some(&(_, '$')) => {
                chars.next();
                out.push('$');
            }
            Some(&(start, '{')) => {
                chars.next();
                let name = take_while(&mut chars, is_ident_char);
                match chars.peek() {
                    Some(&(_, '}')) => {
                        chars.next();
                        out.push_str(lookup(replacements, &name)?);
                    }
                    _ => {
                        return Err(Error::InvalidRequest(format!(
                            "unterminated placeholder `${{` at byte {start}"
                        )));
                    }
                }
            }
            Some(&(_, next)) if is_ident_start(next) => {
                let name = take_while(&mut chars, is_ident_char);
                out.push_str(lookup(replacements, &name)?);
            }
            // A lone dollar sign is passed through as-is.
            _ => out.push('$'),
        }
    }

    Ok(out)
}

fn lookup<'a>(replacements: &'a Replacements, name: &str) -> Result<&'a str> {
    replacements
        .get(name)
        .ok_or_else(|| Error::missing_placeholder(name))
}

fn take_while<I>(chars: &mut std::iter::Peekable<I>, pred: fn(char) -> bool) -> String
where
    I: Iterator<Item = (usize, char)>,
{
    let mut taken = String::new();
    while let Some(&(_, ch)) = chars.peek() {
        if !pred(ch) {
            break;
        }
        taken.push(ch);
        chars.next();
    }
    taken
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_named_placeholders() {
        let replacements = Replacements::new()
            .with("groupname", "test")
            .with("gid", 10_001);
        let out = substitute("cn: $groupname\ngidNumber: $gid\n", Some(&replacements)).unwrap();
        assert_eq!(out, "cn: test\ngidNumber: 10001\n");
    }

    #[test]
    fn substitutes_braced_placeholders() {
        let replacements = Replacements::new().with("host", "ldap01");
        let out = substitute("cn=${host}srv", Some(&replacements)).unwrap();
        assert_eq!(out, "cn=ldap01srv");
    }

    #[test]
    fn missing_placeholder_names_the_identifier() {
        let replacements = Replacements::new().with("groupname", "test");
        let err = substitute("cn=$groupname,$groupdn", Some(&replacements)).unwrap_err();
        assert_eq!(
            err,
            Error::Template {
                placeholder: "groupdn".to_string()
            }
        );
        assert!(err.to_string().contains("groupdn"));
    }

    #[test]
    fn no_replacements_is_identity() {
        let text = "dn: cn=$literal,dc=example,dc=com\n";
        assert_eq!(substitute(text, None).unwrap(), text);
    }

    #[test]
    fn double_dollar_escapes() {
        let replacements = Replacements::new();
        assert_eq!(substitute("cost: $$5", Some(&replacements)).unwrap(), "cost: $5");
    }

    #[test]
    fn lone_dollar_passes_through() {
        let replacements = Replacements::new();
        assert_eq!(substitute("a $ b", Some(&replacements)).unwrap(), "a $ b");
        assert_eq!(substitute("end$", Some(&replacements)).unwrap(), "end$");
        assert_eq!(substitute("x$1", Some(&replacements)).unwrap(), "x$1");
    }

    #[test]
    fn unterminated_brace_fails() {
        let replacements = Replacements::new().with("name", "x");
        let err = substitute("${name", Some(&replacements)).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn later_set_overrides() {
        let mut replacements = Replacements::new().with("gid", 1);
        replacements.set("gid", 2);
        assert_eq!(replacements.get("gid"), Some("2"));
    }

    #[test]
    fn extend_from_overrides() {
        let mut base = Replacements::new().with("a", "1").with("b", "2");
        let overrides = Replacements::new().with("b", "3");
        base.extend_from(&overrides);
        assert_eq!(base.get("a"), Some("1"));
        assert_eq!(base.get("b"), Some("3"));
    }
}
