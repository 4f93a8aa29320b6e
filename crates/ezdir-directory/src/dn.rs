//! Distinguished name utilities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use ezdir_core::Error as CoreError;

/// Errors that can occur when parsing or manipulating distinguished names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component in the distinguished name was invalid.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// A component was missing the value to the right of the `=`.
    #[error("distinguished name component missing value for attribute {0}")]
    MissingValue(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DnError> for CoreError {
    fn from(err: DnError) -> Self {
        CoreError::InvalidDn(err.to_string())
    }
}

/// Single attribute/value pair of a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rdn {
    attribute: String,
    value: String,
}

impl Rdn {
    /// Creates a new relative distinguished name.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Attribute portion of the RDN (e.g. `cn`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Attribute value portion of the RDN.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if this RDN matches the attribute name (case-insensitive).
    #[must_use]
    pub fn matches_attribute(&self, attribute: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(attribute)
    }
}

/// Strongly-typed distinguished name.
///
/// Keeps a canonical string form alongside the parsed components. Parsing is
/// strict so malformed DNs surface early instead of reaching the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<Rdn>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DnError`] if the distinguished name is empty or contains
    /// invalid syntax.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DnError> {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            return Err(DnError::Empty);
        }

        let mut rdns = Vec::new();
        for component in split_escaped(raw, ',')? {
            let (attribute, value) = split_attribute_value(&component)?;
            rdns.push(Rdn::new(attribute, value));
        }

        Ok(Self {
            raw: rdns_to_string(&rdns),
            rdns,
        })
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the relative distinguished names in order, leaf first.
    #[must_use]
    pub fn components(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Looks up the value for the first matching attribute (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.rdns
            .iter()
            .find(|rdn| rdn.matches_attribute(attribute))
            .map(Rdn::value)
    }

    /// Returns the parent distinguished name, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.rdns.len() < 2 {
            return None;
        }
        let rdns = self.rdns[1..].to_vec();
        Some(Self {
            raw: rdns_to_string(&rdns),
            rdns,
        })
    }

    /// Creates a child distinguished name by prefixing an RDN.
    #[must_use]
    pub fn child(&self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(Rdn::new(attribute, value));
        rdns.extend(self.rdns.iter().cloned());
        Self {
            raw: rdns_to_string(&rdns),
            rdns,
        }
    }

    /// Returns the `.`-delimited address form of the DN.
    ///
    /// The naming context `dc=ezdir,dc=io` becomes `ezdir.io`. Used to
    /// derive fully-qualified hostnames for new host entries. Whitespace in
    /// values is replaced with `-` and the result is lowercased.
    #[must_use]
    pub fn address(&self) -> String {
        self.rdns
            .iter()
            .map(|rdn| {
                rdn.value()
                    .to_lowercase()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DnError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DistinguishedName> for String {
    fn from(value: DistinguishedName) -> Self {
        value.raw
    }
}

fn split_escaped(input: &str, delimiter: char) -> std::result::Result<Vec<String>, DnError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push(ch);
            escape = false;
            continue;
        }

        if ch == '\\' {
            escape = true;
            current.push(ch);
            continue;
        }

        if ch == delimiter {
            parts.push(current.trim().to_string());
            current.clear();
            continue;
        }

        current.push(ch);
    }

    if escape {
        return Err(DnError::UnterminatedEscape);
    }

    parts.push(current.trim().to_string());
    if parts.iter().any(String::is_empty) {
        return Err(DnError::InvalidComponent(input.to_string()));
    }
    Ok(parts)
}

fn split_attribute_value(component: &str) -> std::result::Result<(String, String), DnError> {
    let Some(index) = component.find('=') else {
        return Err(DnError::InvalidComponent(component.to_string()));
    };

    let attribute = component[..index].trim();
    let value_part = component[index + 1..].trim_start();

    if attribute.is_empty() {
        return Err(DnError::InvalidComponent(component.to_string()));
    }
    if value_part.is_empty() {
        return Err(DnError::MissingValue(attribute.to_string()));
    }

    Ok((attribute.to_string(), unescape(value_part)?))
}

fn unescape(value: &str) -> std::result::Result<String, DnError> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let next = chars.next().ok_or(DnError::UnterminatedEscape)?;
            result.push(next);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn escape(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in chars.iter().enumerate() {
        let is_first = idx == 0;
        let is_last = idx == chars.len() - 1;
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (is_first && (*ch == ' ' || *ch == '#'))
            || (is_last && *ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(*ch);
    }

    escaped
}

fn rdns_to_string(rdns: &[Rdn]) -> String {
    rdns.iter()
        .map(|rdn| format!("{}={}", rdn.attribute(), escape(rdn.value())))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_dn() {
        let dn = DistinguishedName::parse("cn=John Doe,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("John Doe"));
        assert_eq!(dn.get("ou"), Some("People"));
        assert_eq!(dn.to_string(), "cn=John Doe,ou=People,dc=example,dc=com");
        assert_eq!(dn.components().len(), 4);
    }

    #[test]
    fn parse_dn_with_escape() {
        let dn = DistinguishedName::parse("cn=Smith\\, John,ou=People,dc=example,dc=com").unwrap();
        assert_eq!(dn.get("cn"), Some("Smith, John"));
        assert!(dn.to_string().starts_with("cn=Smith\\, John,ou=People"));
    }

    #[test]
    fn invalid_trailing_delimiter() {
        let err = DistinguishedName::parse("cn=John,").unwrap_err();
        assert!(matches!(err, DnError::InvalidComponent(_)));
    }

    #[test]
    fn empty_dn_rejected() {
        assert_eq!(DistinguishedName::parse("  "), Err(DnError::Empty));
    }

    #[test]
    fn missing_value_rejected() {
        let err = DistinguishedName::parse("cn=,dc=example").unwrap_err();
        assert_eq!(err, DnError::MissingValue("cn".to_string()));
    }

    #[test]
    fn parent_and_child() {
        let base = DistinguishedName::parse("ou=People,dc=example,dc=com").unwrap();
        let user = base.child("uid", "jdoe");
        assert_eq!(user.to_string(), "uid=jdoe,ou=People,dc=example,dc=com");
        assert_eq!(user.parent().unwrap(), base);

        let root = DistinguishedName::parse("dc=com").unwrap();
        assert!(root.parent().is_none());
    }

    #[test]
    fn address_joins_values_with_dots() {
        let dn = DistinguishedName::parse("dc=ezdir,dc=io").unwrap();
        assert_eq!(dn.address(), "ezdir.io");

        let spaced = DistinguishedName::parse("dc=My Org,dc=example,dc=com").unwrap();
        assert_eq!(spaced.address(), "my-org.example.com");
    }
}
