use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::contact::Contact;

pub const TSV_HEADER: [&str; 5] = ["name", "phone", "친밀도(5/5)", "그룹", "초대여부"];

pub fn invited_mark(invited: Option<bool>) -> &'static str {
    match invited {
        Some(true) => "O",
        Some(false) => "X",
        None => "",
    }
}

/// Tab-delimited export of the given rows, header first, no trailing newline.
pub fn to_tsv<'a, I>(contacts: I) -> String
where
    I: IntoIterator<Item = &'a Contact>,
{
    let mut lines = vec![TSV_HEADER.join("\t")];
    for contact in contacts {
        lines.push(
            [
                contact.name.as_str(),
                contact.phone.as_str(),
                contact.intimacy.as_str(),
                contact.group.as_str(),
                invited_mark(contact.invited),
            ]
            .join("\t"),
        );
    }
    lines.join("\n")
}

/// Write `content` to `path`, or to stdout when `path` is `-`.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if path.as_os_str() == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        stdout.write_all(b"\n")?;
        return Ok(());
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Parse a JSON backup produced by `backup` (or saved from the old web app).
pub fn parse_backup(raw: &str) -> Result<Vec<Contact>> {
    let contacts: Vec<Contact> =
        serde_json::from_str(raw).context("backup is not a JSON list of contacts")?;
    Ok(contacts)
}
