//! # ezdir-ldif
//!
//! Templated LDIF engine: placeholder substitution, record parsing,
//! modify-list compilation, and serialization.
//!
//! The crate handles the plain-text subset of RFC 2849: `key: value` lines,
//! `#` comments, `-` directive separators, and the `dn:`/`changetype:`/
//! `add:`/`replace:`/`delete:` reserved keys. Base64 (`::`) and URL (`:<`)
//! values and line folding are not supported.
//!
//! ```
//! use ezdir_ldif::{parse_str, ChangeType};
//!
//! let entries = parse_str(
//!     "dn: cn=admins,ou=Group,dc=example,dc=com\n\
//!      objectClass: posixGroup\n\
//!      cn: admins\n\
//!      gidNumber: 10001\n",
//! )?;
//! assert_eq!(entries[0].change_type(), ChangeType::Add);
//! assert_eq!(entries[0].first("gidNumber"), Some("10001"));
//! # Ok::<(), ezdir_core::Error>(())
//! ```

#![deny(missing_docs)]

mod entry;
mod reader;
mod template;
mod writer;

pub use entry::{ChangeType, ChangeUnit, Entry, ModifyOp, DN, OBJECT_CLASS};
pub use reader::{parse, parse_str};
pub use template::{substitute, Replacements};
pub use writer::{to_ldif_string, write, write_file};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = ezdir_core::Result<T>;
