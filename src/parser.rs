use thiserror::Error;
use uuid::Uuid;

use crate::contact::Contact;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("file is empty")]
    Empty,
    #[error("no line had at least a name and a phone column")]
    NoRecords,
}

/// Result of parsing an upload, with the lines that were dropped.
#[derive(Debug, Clone)]
pub struct ParsedUpload {
    pub contacts: Vec<Contact>,
    /// 1-based line numbers with fewer than two columns
    pub skipped_lines: Vec<usize>,
}

pub fn parse_contacts(text: &str) -> Result<Vec<Contact>, ParseError> {
    parse_upload(text).map(|parsed| parsed.contacts)
}

/// Parse a comma or tab delimited guest list.
///
/// Columns are positional: name, phone, intimacy, group. There is no header
/// detection and no quoting; either delimiter is accepted on any line.
pub fn parse_upload(text: &str) -> Result<ParsedUpload, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut contacts = Vec::with_capacity(lines.len());
    let mut skipped_lines = Vec::new();

    for (index, line) in lines {
        let values: Vec<&str> = line.split([',', '\t']).map(str::trim).collect();
        if values.len() < 2 {
            skipped_lines.push(index + 1);
            continue;
        }

        let column = |i: usize| values.get(i).copied().unwrap_or_default().to_string();
        contacts.push(Contact {
            id: Uuid::new_v4(),
            name: column(0),
            phone: column(1),
            contact: column(2),
            intimacy: column(2),
            group: column(3),
            invited: Some(false),
        });
    }

    if contacts.is_empty() {
        return Err(ParseError::NoRecords);
    }

    Ok(ParsedUpload {
        contacts,
        skipped_lines,
    })
}
