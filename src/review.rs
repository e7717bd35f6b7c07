//! Sequential review of the guest list, one contact at a time.

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::contact::{Contact, ContactPatch};
use crate::store::{ContactStore, StoreError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JumpError {
    #[error("there are no contacts to jump to")]
    NoContacts,
    #[error("enter a number from 1 to {len}")]
    OutOfRange { len: usize },
}

/// Position in an ordered list of `len` records. Always 0 when the list is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewCursor {
    position: usize,
    len: usize,
}

impl ReviewCursor {
    pub fn new(len: usize) -> Self {
        Self { position: 0, len }
    }

    pub fn at(position: usize, len: usize) -> Self {
        let mut cursor = Self::new(len);
        cursor.position = position.min(len.saturating_sub(1));
        cursor
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the position moved.
    pub fn next(&mut self) -> bool {
        if self.position + 1 < self.len {
            self.position += 1;
            true
        } else {
            false
        }
    }

    pub fn previous(&mut self) -> bool {
        if self.position > 0 {
            self.position -= 1;
            true
        } else {
            false
        }
    }

    pub fn first(&mut self) {
        self.position = 0;
    }

    /// Last record of the first half: position `len / 2 - 1`, or 0 for short lists.
    pub fn middle(&mut self) {
        self.position = (self.len / 2).saturating_sub(1);
    }

    pub fn last(&mut self) {
        self.position = self.len.saturating_sub(1);
    }

    /// Move to a 1-based position typed by the user.
    pub fn jump_to(&mut self, one_based: usize) -> Result<(), JumpError> {
        if self.len == 0 {
            return Err(JumpError::NoContacts);
        }
        if one_based == 0 || one_based > self.len {
            return Err(JumpError::OutOfRange { len: self.len });
        }
        self.position = one_based - 1;
        Ok(())
    }

    /// Like [`jump_to`](Self::jump_to) but from raw input text.
    pub fn jump_to_input(&mut self, input: &str) -> Result<(), JumpError> {
        let parsed = input
            .trim()
            .parse::<usize>()
            .map_err(|_| self.range_error())?;
        self.jump_to(parsed)
    }

    fn range_error(&self) -> JumpError {
        if self.len == 0 {
            JumpError::NoContacts
        } else {
            JumpError::OutOfRange { len: self.len }
        }
    }
}

/// Index of the first record missing intimacy or group, or 0 if all are complete.
pub fn first_incomplete(contacts: &[Contact]) -> usize {
    find_incomplete(contacts).unwrap_or(0)
}

pub fn find_incomplete(contacts: &[Contact]) -> Option<usize> {
    contacts.iter().position(|c| !c.is_complete())
}

pub fn position_of(contacts: &[Contact], id: Uuid) -> Option<usize> {
    contacts.iter().position(|c| c.id == id)
}

/// Groups already used in the list, in first-seen order, followed by the
/// predefined ones.
pub fn group_options(contacts: &[Contact], predefined: &[String]) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    let used = contacts.iter().map(|c| c.group.as_str());
    for group in used.chain(predefined.iter().map(String::as_str)) {
        let group = group.trim();
        if !group.is_empty() && !options.iter().any(|g| g == group) {
            options.push(group.to_string());
        }
    }
    options
}

/// Fields of the record under the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    pub intimacy: String,
    pub group: String,
    pub invited: bool,
}

impl EditBuffer {
    fn from_contact(contact: &Contact) -> Self {
        Self {
            intimacy: contact.intimacy.clone(),
            group: contact.group.clone(),
            invited: contact.is_invited(),
        }
    }
}

/// Review state over an in-memory copy of the list. Every edit is written
/// straight through to the store.
pub struct ReviewSession {
    contacts: Vec<Contact>,
    cursor: ReviewCursor,
    buffer: EditBuffer,
}

impl ReviewSession {
    /// Start at the pending handoff position, or at the first incomplete record.
    pub fn open(store: &mut dyn ContactStore) -> Result<Self, StoreError> {
        let contacts = store.load()?;
        let handoff = store.take_cursor()?.filter(|&i| i < contacts.len());
        let start = handoff.unwrap_or_else(|| first_incomplete(&contacts));
        Ok(Self::with_contacts(contacts, start))
    }

    pub fn with_contacts(contacts: Vec<Contact>, start: usize) -> Self {
        let cursor = ReviewCursor::at(start, contacts.len());
        let mut session = Self {
            contacts,
            cursor,
            buffer: EditBuffer::default(),
        };
        session.enter();
        session
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn cursor(&self) -> ReviewCursor {
        self.cursor
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn current(&self) -> Option<&Contact> {
        self.contacts.get(self.cursor.position())
    }

    pub fn next(&mut self) -> bool {
        let moved = self.cursor.next();
        self.enter();
        moved
    }

    pub fn previous(&mut self) -> bool {
        let moved = self.cursor.previous();
        self.enter();
        moved
    }

    pub fn first(&mut self) {
        self.cursor.first();
        self.enter();
    }

    pub fn middle(&mut self) {
        self.cursor.middle();
        self.enter();
    }

    pub fn last(&mut self) {
        self.cursor.last();
        self.enter();
    }

    pub fn jump_to_input(&mut self, input: &str) -> Result<(), JumpError> {
        self.cursor.jump_to_input(input)?;
        self.enter();
        Ok(())
    }

    /// Go to the first incomplete record. Returns false if everything is complete.
    pub fn goto_first_incomplete(&mut self) -> bool {
        let found = find_incomplete(&self.contacts);
        self.cursor = ReviewCursor::at(found.unwrap_or(0), self.contacts.len());
        self.enter();
        found.is_some()
    }

    pub fn goto_id(&mut self, id: Uuid) -> bool {
        match position_of(&self.contacts, id) {
            Some(index) => {
                self.cursor = ReviewCursor::at(index, self.contacts.len());
                self.enter();
                true
            }
            None => false,
        }
    }

    /// Replace the in-memory list, keeping the same record under the cursor if it survives.
    pub fn reload(&mut self, contacts: Vec<Contact>) {
        let current = self.current().map(|c| c.id);
        let fallback = self.cursor.position();
        let index = current
            .and_then(|id| position_of(&contacts, id))
            .unwrap_or(fallback);
        self.contacts = contacts;
        self.cursor = ReviewCursor::at(index, self.contacts.len());
        self.enter();
    }

    pub fn set_intimacy(
        &mut self,
        store: &mut dyn ContactStore,
        value: &str,
    ) -> Result<bool, StoreError> {
        self.buffer.intimacy = value.to_string();
        self.commit(store, ContactPatch::intimacy(value))
    }

    pub fn set_group(
        &mut self,
        store: &mut dyn ContactStore,
        value: &str,
    ) -> Result<bool, StoreError> {
        self.buffer.group = value.trim().to_string();
        self.commit(store, ContactPatch::group(value))
    }

    pub fn toggle_invited(&mut self, store: &mut dyn ContactStore) -> Result<bool, StoreError> {
        let invited = !self.buffer.invited;
        self.buffer.invited = invited;
        self.commit(store, ContactPatch::invited(invited))
    }

    fn enter(&mut self) {
        self.buffer = self
            .current()
            .map(EditBuffer::from_contact)
            .unwrap_or_default();
    }

    /// Write one field through to the store. Returns true if the record changed.
    fn commit(
        &mut self,
        store: &mut dyn ContactStore,
        patch: ContactPatch,
    ) -> Result<bool, StoreError> {
        let index = self.cursor.position();
        let Some(current) = self.contacts.get(index) else {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.contacts.len(),
            });
        };

        let mut preview = current.clone();
        if !preview.apply(&patch) {
            self.enter();
            return Ok(false);
        }

        match store.update_at(index, &patch) {
            Ok(updated) => {
                debug!(index, name = %updated.name, "review edit saved");
                self.contacts[index] = updated;
                self.enter();
                Ok(true)
            }
            Err(err) => {
                self.enter();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_contacts;
    use crate::store::{MemoryKv, SlotStore};

    fn store_with(text: &str) -> SlotStore<MemoryKv> {
        let mut store = SlotStore::new(MemoryKv::new());
        store.replace_all(&parse_contacts(text).unwrap()).unwrap();
        store
    }

    #[test]
    fn cursor_clamps_at_both_ends() {
        let mut cursor = ReviewCursor::new(3);
        assert!(!cursor.previous());
        assert!(cursor.next());
        assert!(cursor.next());
        assert!(!cursor.next());
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn jump_validates_range() {
        let mut cursor = ReviewCursor::new(4);
        assert_eq!(cursor.jump_to(0), Err(JumpError::OutOfRange { len: 4 }));
        assert_eq!(cursor.jump_to(5), Err(JumpError::OutOfRange { len: 4 }));
        assert_eq!(cursor.jump_to_input("abc"), Err(JumpError::OutOfRange { len: 4 }));
        assert_eq!(cursor.position(), 0);

        cursor.jump_to_input(" 4 ").unwrap();
        assert_eq!(cursor.position(), 3);
        assert_eq!(
            JumpError::OutOfRange { len: 4 }.to_string(),
            "enter a number from 1 to 4"
        );
        assert_eq!(ReviewCursor::new(0).jump_to(1), Err(JumpError::NoContacts));
    }

    #[test]
    fn middle_and_last_on_empty_list() {
        let mut cursor = ReviewCursor::new(0);
        cursor.middle();
        assert_eq!(cursor.position(), 0);
        cursor.last();
        assert_eq!(cursor.position(), 0);
        let mut cursor = ReviewCursor::new(5);
        cursor.middle();
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn middle_is_end_of_first_half() {
        let mut cursor = ReviewCursor::new(10);
        cursor.last();
        cursor.middle();
        assert_eq!(cursor.position(), 4);

        let mut cursor = ReviewCursor::new(1);
        cursor.middle();
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn first_incomplete_falls_back_to_zero() {
        let mut store = store_with("A,1\nB,2,3\nC,3");
        let mut session = ReviewSession::open(&mut store).unwrap();
        assert_eq!(session.cursor().position(), 0);

        for _ in 0..3 {
            session.set_intimacy(&mut store, "3").unwrap();
            session.set_group(&mut store, "family").unwrap();
            session.next();
        }
        let contacts = store.load().unwrap();
        assert!(contacts.iter().all(Contact::is_complete));
        assert_eq!(find_incomplete(&contacts), None);
        assert_eq!(first_incomplete(&contacts), 0);
        assert!(!session.goto_first_incomplete());
        assert_eq!(session.cursor().position(), 0);
    }

    #[test]
    fn open_starts_at_first_incomplete() {
        let mut store = store_with("A,1,4,work\nB,2,5\nC,3");
        let session = ReviewSession::open(&mut store).unwrap();
        assert_eq!(session.cursor().position(), 1);
        assert_eq!(session.buffer().intimacy, "5");
        assert_eq!(session.buffer().group, "");
    }

    #[test]
    fn open_prefers_handoff_cursor() {
        let mut store = store_with("A,1\nB,2\nC,3");
        store.set_cursor(2).unwrap();
        let session = ReviewSession::open(&mut store).unwrap();
        assert_eq!(session.current().unwrap().name, "C");

        store.set_cursor(99).unwrap();
        let session = ReviewSession::open(&mut store).unwrap();
        assert_eq!(session.cursor().position(), 0);
    }

    #[test]
    fn edits_write_through() {
        let mut store = store_with("A,1\nB,2");
        let mut session = ReviewSession::open(&mut store).unwrap();
        session.next();
        assert!(session.toggle_invited(&mut store).unwrap());
        assert!(session.buffer().invited);

        let stored = store.load().unwrap();
        assert_eq!(stored[1].invited, Some(true));
        assert_eq!(stored[0].invited, Some(false));

        assert!(!session.set_group(&mut store, "").unwrap());
        assert_eq!(store.load().unwrap()[1].group, "");
    }

    #[test]
    fn invalid_intimacy_restores_buffer() {
        let mut store = store_with("A,1,2,work");
        let mut session = ReviewSession::open(&mut store).unwrap();
        assert!(session.set_intimacy(&mut store, "7").is_err());
        assert_eq!(session.buffer().intimacy, "2");
    }

    #[test]
    fn goto_id_and_reload_keep_identity() {
        let mut store = store_with("A,1\nB,2\nC,3");
        let contacts = store.load().unwrap();
        let target = contacts[2].id;
        let mut session = ReviewSession::with_contacts(contacts.clone(), 0);
        assert!(session.goto_id(target));
        assert_eq!(session.cursor().position(), 2);

        let mut reordered = contacts;
        reordered.swap(0, 2);
        session.reload(reordered);
        assert_eq!(session.cursor().position(), 0);
        assert_eq!(session.current().unwrap().id, target);
    }

    #[test]
    fn group_options_merge_used_and_predefined() {
        let contacts = parse_contacts("A,1,1,work\nB,2,2,가족\nC,3,3,work\nD,4").unwrap();
        let predefined = vec!["가족".to_string(), "친구".to_string()];
        assert_eq!(group_options(&contacts, &predefined), vec!["work", "가족", "친구"]);
    }
}
