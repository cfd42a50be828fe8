//! Address → password table loaded from a two-column file
//!
//! The file has no header and one `address,password` record per line. A
//! field wrapped in double quotes may contain commas, and `""` inside it is
//! a literal quote. The address is trimmed; the password is kept exactly as
//! written, surrounding spaces included.
//! Keys are [`Address`] values, so every insert and lookup goes through the
//! same normalization and matching is case-insensitive. A later row for the
//! same address replaces an earlier one.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::address::Address;
use crate::error::ConfigError;

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Immutable credential table
#[derive(Clone, Default)]
pub struct Credentials {
    entries: HashMap<Address, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let credentials = Self::parse(&text)?;
        debug!(
            "Loaded {} credentials from {}",
            credentials.len(),
            path.display()
        );
        Ok(credentials)
    }

    /// Parse credential text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut credentials = Self::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let row = raw.trim_end_matches('\r');
            if row.trim().is_empty() {
                continue;
            }

            let columns = split_record(row).ok_or_else(|| {
                ConfigError::Parse(format!("line {}: unterminated quoted field", line))
            })?;
            let [address, password]: [String; 2] =
                columns
                    .try_into()
                    .map_err(|columns: Vec<String>| ConfigError::MalformedRow {
                        line,
                        columns: columns.len(),
                    })?;

            let address = address.trim();
            let address: Address = address.parse().map_err(|_| ConfigError::InvalidAddress {
                line,
                value: address.to_string(),
            })?;
            credentials.insert(address, password);
        }

        Ok(credentials)
    }

    /// Insert or replace the password for an address
    pub fn insert(&mut self, address: Address, password: impl Into<String>) {
        self.entries.insert(address, password.into());
    }

    pub fn get(&self, address: &Address) -> Option<&str> {
        self.entries.get(address).map(String::as_str)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Addresses with a stored password, in no particular order
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.entries.keys()
    }
}

/// Split one record into fields
///
/// Returns `None` when a quoted field is never closed.
fn split_record(row: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = row.chars().peekable();
    let mut in_quotes = false;
    let mut at_field_start = true;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    chars.next();
                    field.push(QUOTE);
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            QUOTE if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            DELIMITER => {
                fields.push(std::mem::take(&mut field));
                at_field_start = true;
            }
            c => {
                field.push(c);
                at_field_start = false;
            }
        }
    }

    if in_quotes {
        return None;
    }
    fields.push(field);
    Some(fields)
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.keys().map(|address| (address, "<redacted>")))
            .finish()
    }
}
