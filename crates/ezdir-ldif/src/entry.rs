//! LDIF entry model.
//!
//! An [`Entry`] is an insertion-ordered mapping from attribute name to an
//! ordered list of values. Attribute emission order is observable when the
//! entry is written back out, so the map preserves the order keys were first
//! inserted. The reserved key `dn` is always present and single-valued.
//!
//! Modify-type entries additionally carry the ordered list of [`ChangeUnit`]s
//! compiled from their `add:`/`replace:`/`delete:` directives.

use serde::{Deserialize, Serialize};

/// Reserved attribute key holding the distinguished name.
pub const DN: &str = "dn";

/// Reserved attribute key enumerating schema classes of an add entry.
pub const OBJECT_CLASS: &str = "objectClass";

/// Whether a record adds a new entry or modifies an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    /// The record describes a new entry.
    Add,
    /// The record describes mutations to an existing entry.
    Modify,
}

/// Operation of a single modify directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifyOp {
    /// Add values to an attribute.
    Add,
    /// Replace all values of an attribute.
    Replace,
    /// Delete values of an attribute (all values when none are named).
    Delete,
}

impl ModifyOp {
    /// Maps an LDIF directive keyword to its operation.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "add" => Some(Self::Add),
            "replace" => Some(Self::Replace),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One discrete mutation compiled from a modify-type record.
///
/// Each LDIF value line lowers to its own single-valued unit; units for the
/// same attribute are intentionally not coalesced. An empty value list is
/// only produced for [`ModifyOp::Delete`] and means "delete every value of
/// the attribute".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeUnit {
    /// The modify operation.
    pub op: ModifyOp,
    /// Attribute the operation targets.
    pub attribute: String,
    /// Values the operation carries.
    pub values: Vec<String>,
}

impl ChangeUnit {
    /// Creates a change unit.
    #[must_use]
    pub fn new(op: ModifyOp, attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            op,
            attribute: attribute.into(),
            values,
        }
    }

    /// Creates a delete-all unit for the attribute.
    #[must_use]
    pub fn delete_all(attribute: impl Into<String>) -> Self {
        Self::new(ModifyOp::Delete, attribute, Vec::new())
    }
}

/// One LDIF record: an ordered attribute map plus its change type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    change_type: ChangeType,
    attributes: Vec<(String, Vec<String>)>,
    changes: Vec<ChangeUnit>,
}

impl Entry {
    /// Creates an add-type entry with the given distinguished name.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            change_type: ChangeType::Add,
            attributes: vec![(DN.to_string(), vec![dn.into()])],
            changes: Vec::new(),
        }
    }

    /// Returns the distinguished name.
    #[must_use]
    pub fn dn(&self) -> &str {
        // The dn key is populated at construction and never removed.
        self.get(DN)
            .and_then(|values| values.first())
            .map_or("", String::as_str)
    }

    /// Returns the record's change type.
    #[must_use]
    pub const fn change_type(&self) -> ChangeType {
        self.change_type
    }

    pub(crate) fn set_change_type(&mut self, change_type: ChangeType) {
        self.change_type = change_type;
    }

    /// Returns the compiled change units of a modify-type record, in order.
    #[must_use]
    pub fn changes(&self) -> &[ChangeUnit] {
        &self.changes
    }

    pub(crate) fn push_change(&mut self, change: ChangeUnit) {
        self.changes.push(change);
    }

    /// Returns all values of an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the first value of an attribute.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns true if the attribute key exists (even with no values).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.iter().any(|(key, _)| key == name)
    }

    /// Appends a value to the named attribute, creating the key on first use.
    ///
    /// Values accumulate under one key; duplicate keys are never created.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, values)) => values.push(value),
            None => self.attributes.push((name, vec![value])),
        }
    }

    /// Replaces all values of the named attribute.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = values,
            None => self.attributes.push((name, values)),
        }
    }

    /// Creates the attribute key with no values if it does not exist yet.
    pub(crate) fn ensure_key(&mut self, name: &str) {
        if !self.contains(name) {
            self.attributes.push((name.to_string(), Vec::new()));
        }
    }

    /// Removes an attribute, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Iterates attributes in insertion order, `dn` included.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.attributes
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Consumes the entry, returning its attribute pairs in insertion order.
    #[must_use]
    pub fn into_attributes(self) -> Vec<(String, Vec<String>)> {
        self.attributes
    }

    /// Number of attribute keys, `dn` included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if the entry holds no attributes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
