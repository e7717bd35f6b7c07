/// Top-level screens of the terminal UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    /// One contact at a time, with intimacy/group/invited editing
    #[default]
    Review,
    /// Filterable table of every contact
    Results,
}

impl Screen {
    pub const ALL: [Screen; 2] = [Screen::Review, Screen::Results];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Review => "REVIEW",
            Screen::Results => "RESULTS",
        }
    }
}
