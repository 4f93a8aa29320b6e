//! LDIF serialization.
//!
//! Entries are written attribute-per-line with a blank line between entries:
//! `dn` first, then every `objectClass` value, then the remaining attributes
//! in insertion order. Multi-valued attributes produce one line per value
//! under the same key. Values are written as-is; binary-safe base64 encoding
//! is not performed, so only plain-text values survive a round trip.

use crate::entry::{Entry, DN, OBJECT_CLASS};
use ezdir_core::{Error, Result};
use std::io::Write;

/// Serializes entries as LDIF text to a writer.
///
/// The entry sequence is only borrowed and never mutated.
///
/// # Errors
///
/// Returns [`Error::Io`] when the underlying writer fails.
pub fn write<W: Write>(entries: &[Entry], output: &mut W) -> Result<()> {
    for entry in entries {
        write_entry(entry, output)?;
    }
    Ok(())
}

/// Serializes entries as LDIF text to a file, replacing its contents.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be created or written.
pub fn write_file(entries: &[Entry], path: impl AsRef<std::path::Path>) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|err| {
        Error::Io(format!("failed to create {}: {err}", path.display()))
    })?;
    let mut output = std::io::BufWriter::new(file);
    write(entries, &mut output)?;
    output.flush().map_err(io_error)
}

/// Serializes entries as an LDIF string.
#[must_use]
pub fn to_ldif_string(entries: &[Entry]) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write(entries, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

fn write_entry<W: Write>(entry: &Entry, output: &mut W) -> Result<()> {
    emit(output, DN, entry.dn())?;

    if let Some(classes) = entry.get(OBJECT_CLASS) {
        for class in classes {
            emit(output, OBJECT_CLASS, class)?;
        }
    }

    for (name, values) in entry.attributes() {
        if name == DN || name == OBJECT_CLASS {
            continue;
        }
        for value in values {
            emit(output, name, value)?;
        }
    }

    writeln!(output).map_err(io_error)?;
    Ok(())
}

fn emit<W: Write>(output: &mut W, key: &str, value: &str) -> Result<()> {
    writeln!(output, "{key}: {value}").map_err(io_error)
}

fn io_error(err: std::io::Error) -> Error {
    Error::Io(format!("failed to write LDIF output: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_str;

    fn group_entry() -> Entry {
        let mut entry = Entry::new("cn=test,ou=Group,dc=example,dc=com");
        entry.append(OBJECT_CLASS, "posixGroup");
        entry.append("cn", "test");
        entry.append("gidNumber", "10001");
        entry
    }

    #[test]
    fn writes_dn_then_objectclass_then_attributes() {
        let out = to_ldif_string(&[group_entry()]);
        assert_eq!(
            out,
            "dn: cn=test,ou=Group,dc=example,dc=com\n\
             objectClass: posixGroup\n\
             cn: test\n\
             gidNumber: 10001\n\n"
        );
    }

    #[test]
    fn objectclass_precedes_earlier_inserted_attributes() {
        let mut entry = Entry::new("uid=jdoe,ou=People,dc=example,dc=com");
        entry.append("uid", "jdoe");
        entry.append(OBJECT_CLASS, "posixAccount");
        entry.append(OBJECT_CLASS, "inetOrgPerson");

        let out = to_ldif_string(&[entry]);
        assert_eq!(
            out,
            "dn: uid=jdoe,ou=People,dc=example,dc=com\n\
             objectClass: posixAccount\n\
             objectClass: inetOrgPerson\n\
             uid: jdoe\n\n"
        );
    }

    #[test]
    fn multi_valued_attributes_repeat_the_key() {
        let mut entry = group_entry();
        entry.append("memberUid", "alice");
        entry.append("memberUid", "bob");

        let out = to_ldif_string(&[entry]);
        assert!(out.contains("memberUid: alice\nmemberUid: bob\n"));
    }

    #[test]
    fn entries_are_blank_line_separated() {
        let mut second = Entry::new("cn=other,ou=Group,dc=example,dc=com");
        second.append(OBJECT_CLASS, "posixGroup");
        second.append("cn", "other");

        let out = to_ldif_string(&[group_entry(), second]);
        assert!(out.contains("gidNumber: 10001\n\ndn: cn=other"));
        assert!(out.ends_with("cn: other\n\n"));
    }

    #[test]
    fn writer_does_not_mutate_entries() {
        let entries = vec![group_entry()];
        let before = entries.clone();
        let _ = to_ldif_string(&entries);
        assert_eq!(entries, before);
    }

    #[test]
    fn write_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ldif");
        let entries = vec![group_entry()];

        write_file(&entries, &path).unwrap();
        let reparsed = crate::reader::parse(&path, None).unwrap();
        assert_eq!(reparsed, entries);
    }

    #[test]
    fn round_trip_preserves_attributes_and_order() {
        let mut user = Entry::new("uid=jdoe,ou=People,dc=example,dc=com");
        user.append(OBJECT_CLASS, "inetOrgPerson");
        user.append(OBJECT_CLASS, "posixAccount");
        user.append("uid", "jdoe");
        user.append("mail", "a@x");
        user.append("mail", "b@x");
        let originals = vec![group_entry(), user];

        let parsed = parse_str(&to_ldif_string(&originals)).unwrap();
        assert_eq!(parsed, originals);
    }
}
