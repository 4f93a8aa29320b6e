//! # ezdir-directory
//!
//! LDAP directory client and templated admin operations for the ezdir
//! toolkit.
//!
//! The client wraps the `ldap3` crate behind mockable session/connector
//! traits and speaks in terms of the `ezdir-ldif` entry model: searches
//! hydrate [`ezdir_ldif::Entry`] values and LDIF add/modify records are
//! replayed against the server. High-level operations (add user, add group,
//! membership and host management) consume `$placeholder` LDIF templates.

#![deny(missing_docs)]

mod client;
mod dn;
mod ops;
mod password;

pub use client::{
    escape_filter_value, DirectoryClient, RawEntry, RealLdapConnector, SearchScope, ALL_ATTRIBUTES,
};
pub use dn::{DistinguishedName, DnError, Rdn};
pub use password::{random_password, ssha_password, ssha_verify};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = ezdir_core::Result<T>;
