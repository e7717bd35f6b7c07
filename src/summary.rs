use crate::contact::Contact;

/// Progress figures shown on the home screen and by `summary`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactSummary {
    pub total: usize,
    pub invited: usize,
    pub not_invited: usize,
    pub with_intimacy: usize,
    pub with_group: usize,
    pub complete: usize,
}

impl ContactSummary {
    pub fn of(contacts: &[Contact]) -> Self {
        let invited = contacts.iter().filter(|c| c.is_invited()).count();
        Self {
            total: contacts.len(),
            invited,
            not_invited: contacts.len() - invited,
            with_intimacy: contacts.iter().filter(|c| !c.intimacy.is_empty()).count(),
            with_group: contacts.iter().filter(|c| !c.group.is_empty()).count(),
            complete: contacts.iter().filter(|c| c.is_complete()).count(),
        }
    }

    /// Share of `count` in the total, rounded to a whole percent. 0 for an empty list.
    pub fn percent(&self, count: usize) -> usize {
        if self.total == 0 {
            return 0;
        }
        (count * 100 + self.total / 2) / self.total
    }

    pub fn lines(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("total", self.total),
            ("invited", self.invited),
            ("not invited", self.not_invited),
            ("with intimacy", self.with_intimacy),
            ("with group", self.with_group),
            ("reviewed", self.complete),
        ]
    }
}
