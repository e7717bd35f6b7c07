use crate::contact::Contact;

/// Which invitation state the results view is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InviteTab {
    #[default]
    All,
    Invited,
    NotInvited,
}

impl InviteTab {
    pub const ALL: [InviteTab; 3] = [InviteTab::All, InviteTab::Invited, InviteTab::NotInvited];

    pub fn title(self) -> &'static str {
        match self {
            InviteTab::All => "ALL",
            InviteTab::Invited => "INVITED",
            InviteTab::NotInvited => "NOT INVITED",
        }
    }

    pub fn matches(self, contact: &Contact) -> bool {
        match self {
            InviteTab::All => true,
            InviteTab::Invited => contact.is_invited(),
            InviteTab::NotInvited => !contact.is_invited(),
        }
    }

    pub fn next(self) -> Self {
        match self {
            InviteTab::All => InviteTab::Invited,
            InviteTab::Invited => InviteTab::NotInvited,
            InviteTab::NotInvited => InviteTab::All,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            InviteTab::All => InviteTab::NotInvited,
            InviteTab::Invited => InviteTab::All,
            InviteTab::NotInvited => InviteTab::Invited,
        }
    }
}

/// Predicates of the results view. `None` and empty strings match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFilter {
    pub search: String,
    pub intimacy: Option<String>,
    pub group: Option<String>,
    pub tab: InviteTab,
}

/// A contact that passed the filter, with its position in the full list.
#[derive(Debug, Clone, Copy)]
pub struct FilteredContact<'a> {
    pub index: usize,
    pub contact: &'a Contact,
}

impl ContactFilter {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, contact: &Contact) -> bool {
        self.matches_search(contact)
            && self
                .intimacy
                .as_deref()
                .map_or(true, |v| contact.intimacy == v)
            && self.group.as_deref().map_or(true, |g| contact.group == g)
            && self.tab.matches(contact)
    }

    /// Name matches case-insensitively, phone matches as typed. The term is
    /// not trimmed, so a lone space only matches names containing one.
    fn matches_search(&self, contact: &Contact) -> bool {
        let term = self.search.as_str();
        if term.is_empty() {
            return true;
        }
        contact.name.to_lowercase().contains(&term.to_lowercase()) || contact.phone.contains(term)
    }

    pub fn apply<'a>(&self, contacts: &'a [Contact]) -> Vec<FilteredContact<'a>> {
        contacts
            .iter()
            .enumerate()
            .filter(|(_, c)| self.matches(c))
            .map(|(index, contact)| FilteredContact { index, contact })
            .collect()
    }

    /// Step the intimacy filter through all, 1..5.
    pub fn cycle_intimacy(&mut self) {
        use crate::contact::INTIMACY_LEVELS;
        self.intimacy = match self.intimacy.as_deref() {
            None => Some(INTIMACY_LEVELS[0].to_string()),
            Some(current) => INTIMACY_LEVELS
                .iter()
                .position(|l| *l == current)
                .and_then(|i| INTIMACY_LEVELS.get(i + 1))
                .map(|l| l.to_string()),
        };
    }

    /// Step the group filter through all and the given groups.
    pub fn cycle_group(&mut self, groups: &[String]) {
        self.group = match self.group.as_deref() {
            None => groups.first().cloned(),
            Some(current) => groups
                .iter()
                .position(|g| g == current)
                .and_then(|i| groups.get(i + 1))
                .cloned(),
        };
    }
}

/// Counts shown next to the invite tabs. Always over the unfiltered list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InviteCounts {
    pub all: usize,
    pub invited: usize,
    pub not_invited: usize,
}

impl InviteCounts {
    pub fn of(contacts: &[Contact]) -> Self {
        let invited = contacts.iter().filter(|c| c.is_invited()).count();
        Self {
            all: contacts.len(),
            invited,
            not_invited: contacts.len() - invited,
        }
    }

    pub fn for_tab(&self, tab: InviteTab) -> usize {
        match tab {
            InviteTab::All => self.all,
            InviteTab::Invited => self.invited,
            InviteTab::NotInvited => self.not_invited,
        }
    }
}

/// Non-empty groups in first-seen order.
pub fn unique_groups(contacts: &[Contact]) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    for contact in contacts {
        if !contact.group.is_empty() && !groups.contains(&contact.group) {
            groups.push(contact.group.clone());
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_contacts;

    fn sample() -> Vec<Contact> {
        let mut contacts = parse_contacts(
            "Alice,010-1111,4,family\nbob,010-2222,2,work\nAlicia,010-3333,4,work\nDan,010-4444",
        )
        .unwrap();
        contacts[0].invited = Some(true);
        contacts[2].invited = Some(true);
        contacts[3].invited = None;
        contacts
    }

    fn names(rows: &[FilteredContact<'_>]) -> Vec<String> {
        rows.iter().map(|r| r.contact.name.clone()).collect()
    }

    #[test]
    fn invited_tab_keeps_order() {
        let contacts = sample();
        let filter = ContactFilter {
            tab: InviteTab::Invited,
            ..Default::default()
        };
        let rows = filter.apply(&contacts);
        assert_eq!(names(&rows), vec!["Alice", "Alicia"]);
        assert_eq!(rows.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 2]);
        assert!(rows.iter().all(|r| r.contact.invited == Some(true)));
    }

    #[test]
    fn not_invited_includes_undecided() {
        let contacts = sample();
        let filter = ContactFilter {
            tab: InviteTab::NotInvited,
            ..Default::default()
        };
        assert_eq!(names(&filter.apply(&contacts)), vec!["bob", "Dan"]);
    }

    #[test]
    fn search_name_is_case_insensitive_phone_is_substring() {
        let contacts = sample();
        let mut filter = ContactFilter {
            search: "ALI".into(),
            ..Default::default()
        };
        assert_eq!(names(&filter.apply(&contacts)), vec!["Alice", "Alicia"]);
        filter.search = "2222".into();
        assert_eq!(names(&filter.apply(&contacts)), vec!["bob"]);
    }

    #[test]
    fn search_term_is_not_trimmed() {
        let contacts = sample();
        let mut filter = ContactFilter {
            search: " ".into(),
            ..Default::default()
        };
        assert!(filter.apply(&contacts).is_empty());
        filter.search = "ali ".into();
        assert!(filter.apply(&contacts).is_empty());
    }

    #[test]
    fn predicates_combine() {
        let contacts = sample();
        let filter = ContactFilter {
            search: String::new(),
            intimacy: Some("4".into()),
            group: Some("work".into()),
            tab: InviteTab::All,
        };
        assert_eq!(names(&filter.apply(&contacts)), vec!["Alicia"]);
        assert!(!filter.is_default());
        assert!(ContactFilter::default().is_default());
    }

    #[test]
    fn counts_and_groups() {
        let contacts = sample();
        let counts = InviteCounts::of(&contacts);
        assert_eq!(
            counts,
            InviteCounts {
                all: 4,
                invited: 2,
                not_invited: 2
            }
        );
        assert_eq!(counts.for_tab(InviteTab::Invited), 2);
        assert_eq!(unique_groups(&contacts), vec!["family", "work"]);
    }

    #[test]
    fn cycling_filters_wraps_to_all() {
        let mut filter = ContactFilter::default();
        for expected in ["1", "2", "3", "4", "5"] {
            filter.cycle_intimacy();
            assert_eq!(filter.intimacy.as_deref(), Some(expected));
        }
        filter.cycle_intimacy();
        assert_eq!(filter.intimacy, None);

        let groups = vec!["family".to_string(), "work".to_string()];
        filter.cycle_group(&groups);
        filter.cycle_group(&groups);
        assert_eq!(filter.group.as_deref(), Some("work"));
        filter.cycle_group(&groups);
        assert_eq!(filter.group, None);

        assert_eq!(InviteTab::NotInvited.next(), InviteTab::All);
        assert_eq!(InviteTab::All.prev(), InviteTab::NotInvited);
    }
}
