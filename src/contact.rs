use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Valid intimacy ratings, lowest to highest.
pub const INTIMACY_LEVELS: [&str; 5] = ["1", "2", "3", "4", "5"];

/// One row of the guest list.
///
/// Field names match the stored JSON blob so that backups and shared links
/// produced by older builds (which had no `id`) still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Synthetic identifier assigned at parse time. Nil until assigned.
    #[serde(default = "Uuid::nil")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    /// Mirrors the intimacy column of the upload.
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub intimacy: String,
    #[serde(default)]
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invited: Option<bool>,
}

impl Contact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: phone.into(),
            contact: String::new(),
            intimacy: String::new(),
            group: String::new(),
            invited: Some(false),
        }
    }

    /// A record is complete once both intimacy and group are filled in.
    pub fn is_complete(&self) -> bool {
        !self.intimacy.is_empty() && !self.group.is_empty()
    }

    pub fn is_invited(&self) -> bool {
        self.invited == Some(true)
    }

    /// Apply a review edit. Returns true if any field changed.
    ///
    /// Empty intimacy or group values keep the stored value.
    pub fn apply(&mut self, patch: &ContactPatch) -> bool {
        let mut changed = false;
        if let Some(intimacy) = patch.intimacy.as_deref().filter(|v| !v.is_empty()) {
            if self.intimacy != intimacy {
                self.intimacy = intimacy.to_string();
                changed = true;
            }
        }
        if let Some(group) = patch.group.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            if self.group != group {
                self.group = group.to_string();
                changed = true;
            }
        }
        if let Some(invited) = patch.invited {
            if self.invited != Some(invited) {
                self.invited = Some(invited);
                changed = true;
            }
        }
        changed
    }
}

/// Partial update produced by the review editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub intimacy: Option<String>,
    pub group: Option<String>,
    pub invited: Option<bool>,
}

impl ContactPatch {
    pub fn intimacy(value: impl Into<String>) -> Self {
        Self {
            intimacy: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn group(value: impl Into<String>) -> Self {
        Self {
            group: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn invited(value: bool) -> Self {
        Self {
            invited: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intimacy.is_none() && self.group.is_none() && self.invited.is_none()
    }
}

pub fn is_valid_intimacy(value: &str) -> bool {
    INTIMACY_LEVELS.contains(&value)
}

/// Give every record without an id a fresh one. Returns how many were assigned.
pub fn assign_missing_ids(contacts: &mut [Contact]) -> usize {
    let mut assigned = 0;
    for contact in contacts.iter_mut().filter(|c| c.id.is_nil()) {
        contact.id = Uuid::new_v4();
        assigned += 1;
    }
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_requires_intimacy_and_group() {
        let mut contact = Contact::new("Alice", "555-1111");
        assert!(!contact.is_complete());
        contact.intimacy = "3".into();
        assert!(!contact.is_complete());
        contact.group = "family".into();
        assert!(contact.is_complete());
    }

    #[test]
    fn apply_ignores_empty_values() {
        let mut contact = Contact::new("Bob", "555-2222");
        contact.intimacy = "4".into();
        contact.group = "work".into();

        let changed = contact.apply(&ContactPatch {
            intimacy: Some(String::new()),
            group: Some("  ".into()),
            invited: None,
        });
        assert!(!changed);
        assert_eq!(contact.intimacy, "4");
        assert_eq!(contact.group, "work");
    }

    #[test]
    fn apply_reports_changes() {
        let mut contact = Contact::new("Carol", "555-3333");
        assert!(contact.apply(&ContactPatch::invited(true)));
        assert!(!contact.apply(&ContactPatch::invited(true)));
        assert!(contact.is_invited());
        assert!(contact.apply(&ContactPatch::group(" 친구 ")));
        assert_eq!(contact.group, "친구");
    }

    #[test]
    fn legacy_blob_without_id_deserializes() {
        let raw = r#"[{"name":"Dan","phone":"1","contact":"","intimacy":"","group":""}]"#;
        let mut contacts: Vec<Contact> = serde_json::from_str(raw).unwrap();
        assert!(contacts[0].id.is_nil());
        assert_eq!(contacts[0].invited, None);
        assert_eq!(assign_missing_ids(&mut contacts), 1);
        assert!(!contacts[0].id.is_nil());
    }

    #[test]
    fn intimacy_validation() {
        assert!(is_valid_intimacy("1"));
        assert!(is_valid_intimacy("5"));
        assert!(!is_valid_intimacy("0"));
        assert!(!is_valid_intimacy("6"));
        assert!(!is_valid_intimacy(""));
    }
}
