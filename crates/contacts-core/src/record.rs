// # Contact Records
//
// Parsing of raw input lines and identifier classification.
//
// ## Line Format
//
// ```text
// identifier [first_name [last_name]]
// ```
//
// The identifier is everything up to the first run of whitespace. The first
// name is the next word; the last name is whatever remains, verbatim.
// Missing pieces become empty strings.
//
// ## Classification
//
// An identifier starting with `@` or an alphabetic character is a handle
// (username). Anything else is treated as a phone number.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// How an identifier is resolved by the import step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// Phone number (`+7999...`, `8999...`)
    Phone,
    /// Username-style handle (`@alice`, `alice`)
    Handle,
}

/// Classify an identifier
///
/// Total and deterministic. An empty identifier classifies as
/// [`IdentifierKind::Phone`]; the parser never produces one.
pub fn classify(identifier: &str) -> IdentifierKind {
    match identifier.chars().next() {
        Some(c) if c == '@' || c.is_alphabetic() => IdentifierKind::Handle,
        _ => IdentifierKind::Phone,
    }
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    identifier: String,
    first_name: String,
    last_name: String,
}

impl ContactRecord {
    /// Parse one raw input line
    ///
    /// # Returns
    ///
    /// - `Ok(ContactRecord)`: for any line containing a non-whitespace character
    /// - `Err(Error::Parse)`: if the line is blank
    pub fn parse(line: &str) -> Result<Self> {
        let (identifier, rest) = split_first_word(line);
        if identifier.is_empty() {
            return Err(Error::parse("line does not contain an identifier"));
        }

        let (first_name, last_name) = split_first_word(rest);

        Ok(Self {
            identifier: identifier.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.trim_end().to_string(),
        })
    }

    /// The phone number or handle
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// First name, empty when not supplied
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Last name, empty when not supplied
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Classification of this record's identifier
    pub fn kind(&self) -> IdentifierKind {
        classify(&self.identifier)
    }
}

/// Split off the first whitespace-delimited word
fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim_start()),
        None => (s.trim_end(), ""),
    }
}
