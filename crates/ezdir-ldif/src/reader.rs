//! Line-oriented LDIF parser.
//!
//! The parser is a finite-state machine over lines. Entry boundaries are
//! detected at `dn:` lines (an in-progress entry is flushed when the next one
//! starts) and at end of stream; blank lines are not terminators. For
//! changetype=modify records the modify-list compiler is embedded here:
//! every value line under an `add:`/`replace:`/`delete:` directive lowers to
//! its own single-valued [`ChangeUnit`], and a `delete` directive closed by a
//! `-` separator with no collected values lowers to a delete-all unit.
//!
//! The parser is purely syntactic; it performs no schema validation. The
//! plain-text subset of RFC 2849 is supported: no base64 (`::`) or URL
//! (`:<`) values and no line folding.

use crate::entry::{ChangeType, ChangeUnit, Entry, ModifyOp};
use crate::template::{substitute, Replacements};
use ezdir_core::{Error, Result};
use std::path::Path;

/// Parser states, one per line-handling regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No entry started yet; leading content is ignored.
    Start,
    /// Collecting attributes of an add-type record.
    InAddEntry,
    /// Inside a modify-type record, between directives.
    InModifyEntry,
    /// Inside a modify directive, collecting value lines for its target.
    AwaitingChangeValue,
}

/// An open `add:`/`replace:`/`delete:` directive.
#[derive(Debug)]
struct Directive {
    op: ModifyOp,
    target: String,
    values_seen: usize,
}

/// Reads an LDIF file, substituting template placeholders first.
///
/// With `None` replacements the file is parsed as literal LDIF.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for a missing file, [`Error::Template`] for a
/// placeholder without a replacement (before any entry is produced), and
/// [`Error::MalformedRecord`] for structural LDIF violations.
pub fn parse(path: impl AsRef<Path>, replacements: Option<&Replacements>) -> Result<Vec<Entry>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(format!("LDIF file {} not found", path.display()))
        } else {
            Error::Io(format!("failed to read {}: {err}", path.display()))
        }
    })?;
    let substituted = substitute(&text, replacements)?;
    parse_str(&substituted)
}

/// Parses LDIF text into an ordered sequence of entries.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] for structural violations: an empty
/// `dn`, an unsupported changetype, or an attribute line in modify mode that
/// does not match the active change target.
pub fn parse_str(text: &str) -> Result<Vec<Entry>> {
    Parser::new().run(text)
}

struct Parser {
    state: State,
    current: Option<Entry>,
    directive: Option<Directive>,
    entries: Vec<Entry>,
}

impl Parser {
    fn new() -> Self {
        Self {
            state: State::Start,
            current: None,
            directive: None,
            entries: Vec::new(),
        }
    }

    fn run(mut self, text: &str) -> Result<Vec<Entry>> {
        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim_end();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('-') {
                self.close_directive();
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                // Lines without a key/value shape carry nothing we track.
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "dn" => self.begin_entry(value, line_no)?,
                "changetype" => self.set_changetype(value, line_no)?,
                _ => self.attribute_line(key, value, line_no)?,
            }
        }

        self.flush();
        Ok(self.entries)
    }

    /// Flushes any in-progress entry and starts a new one.
    fn begin_entry(&mut self, dn: &str, line_no: usize) -> Result<()> {
        if dn.is_empty() {
            return Err(Error::MalformedRecord(format!(
                "empty dn on line {line_no}"
            )));
        }
        self.flush();
        self.current = Some(Entry::new(dn));
        self.state = State::InAddEntry;
        Ok(())
    }

    fn set_changetype(&mut self, value: &str, line_no: usize) -> Result<()> {
        let Some(entry) = self.current.as_mut() else {
            // changetype before any dn is leading content, ignored.
            return Ok(());
        };

        match value {
            "add" => {
                entry.set_change_type(ChangeType::Add);
                self.state = State::InAddEntry;
            }
            "modify" => {
                entry.set_change_type(ChangeType::Modify);
                self.state = State::InModifyEntry;
            }
            other => {
                return Err(Error::MalformedRecord(format!(
                    "unsupported changetype `{other}` on line {line_no}"
                )));
            }
        }
        Ok(())
    }

    fn attribute_line(&mut self, key: &str, value: &str, line_no: usize) -> Result<()> {
        match self.state {
            // No entry started yet; ignored.
            State::Start => Ok(()),
            State::InAddEntry => {
                if let Some(entry) = self.current.as_mut() {
                    entry.append(key, value);
                }
                Ok(())
            }
            State::InModifyEntry => self.open_directive(key, value, line_no),
            State::AwaitingChangeValue => {
                if ModifyOp::from_keyword(key).is_some() {
                    // A new directive line re-targets the context without a
                    // separator; no delete-all synthesis happens here.
                    return self.open_directive(key, value, line_no);
                }

                match self.directive.as_mut() {
                    None => self.open_directive(key, value, line_no),
                    Some(directive) if key != directive.target => {
                        Err(Error::MalformedRecord(format!(
                            "attribute `{key}` on line {line_no} does not match active change \
                             target `{}`",
                            directive.target
                        )))
                    }
                    Some(directive) => {
                        directive.values_seen += 1;
                        let unit = ChangeUnit::new(directive.op, key, vec![value.to_string()]);
                        if let Some(entry) = self.current.as_mut() {
                            entry.append(key, value);
                            entry.push_change(unit);
                        }
                        Ok(())
                    }
                }
            }
        }
    }

    fn open_directive(&mut self, keyword: &str, target: &str, line_no: usize) -> Result<()> {
        let Some(op) = ModifyOp::from_keyword(keyword) else {
            return Err(Error::MalformedRecord(format!(
                "attribute `{keyword}` on line {line_no} outside of a change directive"
            )));
        };
        if target.is_empty() {
            return Err(Error::MalformedRecord(format!(
                "change directive `{keyword}:` on line {line_no} names no attribute"
            )));
        }

        // The target key becomes visible even when no value lines follow.
        if let Some(entry) = self.current.as_mut() {
            entry.ensure_key(target);
        }
        self.directive = Some(Directive {
            op,
            target: target.to_string(),
            values_seen: 0,
        });
        self.state = State::AwaitingChangeValue;
        Ok(())
    }

    /// Closes the open directive at a `-` separator line.
    ///
    /// A `delete` directive with zero collected values means "remove every
    /// value of the attribute" and lowers to a delete-all unit.
    fn close_directive(&mut self) {
        if let Some(directive) = self.directive.take() {
            if directive.op == ModifyOp::Delete && directive.values_seen == 0 {
                if let Some(entry) = self.current.as_mut() {
                    entry.push_change(ChangeUnit::delete_all(directive.target));
                }
            }
            self.state = State::InModifyEntry;
        }
    }

    /// Flushes the in-progress entry onto the result sequence.
    fn flush(&mut self) {
        self.directive = None;
        if let Some(entry) = self.current.take() {
            self.entries.push(entry);
        }
        self.state = State::Start;
    }
}
