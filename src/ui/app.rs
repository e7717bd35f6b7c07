use std::io::stdout;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::config::{Config, TopBarAction, TopBarButton, UiColors};
use crate::export;
use crate::filter::{unique_groups, ContactFilter, FilteredContact, InviteCounts};
use crate::review::{group_options, position_of, ReviewSession};
use crate::share;
use crate::store::{ContactStore, StoreError};
use crate::summary::ContactSummary;

use super::draw;
use super::edit::{EditTarget, InlineEditor};
use super::panes::Screen;

const RESULTS_PAGE: usize = 10;
/// Links longer than this do not fit a terminal-sized QR code.
const QR_MAX_BYTES: usize = 2500;

/// Share modal with QR code
#[derive(Debug, Clone)]
pub struct ShareModal {
    /// QR code rendered as lines of Unicode characters, empty if the link is too long
    pub qr_lines: Vec<String>,
    pub link: String,
}

/// Help modal state (for scrolling)
#[derive(Debug, Clone)]
pub struct HelpModal {
    pub scroll: usize,
    pub total_lines: usize,
    pub viewport_height: usize,
}

impl HelpModal {
    pub fn new(total_lines: usize) -> Self {
        Self {
            scroll: 0,
            total_lines,
            viewport_height: 10, // updated during render
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height);
        self.scroll = (self.scroll + lines).min(max_scroll);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn can_scroll_up(&self) -> bool {
        self.scroll > 0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.scroll + self.viewport_height < self.total_lines
    }
}

/// A section in the help modal (e.g., "Global", "Review")
pub struct HelpSection {
    pub title: &'static str,
    pub entries: Vec<HelpEntry>,
}

/// A single help entry (action name + key bindings)
pub struct HelpEntry {
    pub action: &'static str,
    pub keys: String,
}

/// Group picker for the contact under the review cursor
#[derive(Debug, Clone)]
pub struct GroupModal {
    pub options: Vec<String>,
    pub selected: usize,
}

impl GroupModal {
    fn new(options: Vec<String>, current: &str) -> Self {
        let selected = options.iter().position(|g| g == current).unwrap_or(0);
        Self { options, selected }
    }

    fn select_next(&mut self) {
        if !self.options.is_empty() {
            self.selected = (self.selected + 1) % self.options.len();
        }
    }

    fn select_prev(&mut self) {
        if !self.options.is_empty() {
            self.selected = (self.selected + self.options.len() - 1) % self.options.len();
        }
    }

    pub fn selected_group(&self) -> Option<&str> {
        self.options.get(self.selected).map(String::as_str)
    }
}

pub struct App<'a> {
    store: &'a mut dyn ContactStore,
    config: &'a Config,
    pub screen: Screen,
    pub session: ReviewSession,
    pub filter: ContactFilter,
    pub search_input: Input,
    pub search_focused: bool,
    pub results_selected: usize,
    pub editor: InlineEditor,
    pub status: Option<String>,
    pub help_modal: Option<HelpModal>,
    pub share_modal: Option<ShareModal>,
    pub group_modal: Option<GroupModal>,
}

impl<'a> App<'a> {
    pub fn new(store: &'a mut dyn ContactStore, config: &'a Config) -> Self {
        let (session, status) = match ReviewSession::open(&mut *store) {
            Ok(session) => (session, None),
            Err(err) => {
                warn!(error = %err, "could not load contacts");
                (
                    ReviewSession::with_contacts(Vec::new(), 0),
                    Some(format!("Could not load contacts: {err}")),
                )
            }
        };
        Self {
            store,
            config,
            screen: Screen::Review,
            session,
            filter: ContactFilter::default(),
            search_input: Input::default(),
            search_focused: false,
            results_selected: 0,
            editor: InlineEditor::default(),
            status,
            help_modal: None,
            share_modal: None,
            group_modal: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return true;
        }

        // status messages last until the next key
        self.status = None;

        if self.help_modal.is_some() {
            self.handle_help_modal_key(key);
            return false;
        }

        if self.share_modal.is_some() {
            self.handle_share_modal_key(key);
            return false;
        }

        if self.editor.active {
            self.handle_editor_key(key);
            return false;
        }

        if self.group_modal.is_some() {
            self.handle_group_modal_key(key);
            return false;
        }

        if let Some(action) = self.top_bar_action_for_key(&key) {
            self.handle_top_bar_action(action);
            return false;
        }

        if self.screen == Screen::Results && self.search_focused {
            self.handle_search_input_key(key);
            return false;
        }

        let config = self.config;
        let global = &config.keys.global;
        if self.key_matches_any(&key, &global.quit) {
            return true;
        }
        if self.key_matches_any(&key, &global.help) {
            self.show_help();
            return false;
        }

        match self.screen {
            Screen::Review => self.handle_review_key(key),
            Screen::Results => self.handle_results_key(key),
        }
        false
    }

    // =========================================================================
    // Review screen
    // =========================================================================

    fn handle_review_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.review;

        if let KeyCode::Char(digit @ '1'..='5') = key.code {
            let value = digit.to_string();
            let result = self.session.set_intimacy(&mut *self.store, &value);
            self.report_edit(result, "Intimacy");
            return;
        }

        if self.key_matches_any(&key, &keys.next) {
            if !self.session.next() {
                self.set_status("Already at the last contact");
            }
        } else if self.key_matches_any(&key, &keys.prev) {
            if !self.session.previous() {
                self.set_status("Already at the first contact");
            }
        } else if self.key_matches_any(&key, &keys.first) {
            self.session.first();
        } else if self.key_matches_any(&key, &keys.middle) {
            self.session.middle();
        } else if self.key_matches_any(&key, &keys.last) {
            self.session.last();
        } else if self.key_matches_any(&key, &keys.toggle_invited) {
            let result = self.session.toggle_invited(&mut *self.store);
            self.report_edit(result, "Invitation");
        } else if self.key_matches_any(&key, &keys.group) {
            self.open_group_modal();
        } else if self.key_matches_any(&key, &keys.jump) {
            if self.session.contacts().is_empty() {
                self.set_status("No contacts loaded");
            } else {
                self.editor.start("", EditTarget::Jump);
            }
        } else if self.key_matches_any(&key, &keys.first_incomplete) {
            if self.session.goto_first_incomplete() {
                self.set_status("First contact still missing intimacy or group");
            } else {
                self.set_status("Every contact has intimacy and group");
            }
        }
    }

    fn report_edit(&mut self, result: Result<bool, StoreError>, what: &str) {
        match result {
            Ok(true) => self.set_status(format!("{what} saved")),
            Ok(false) => {}
            Err(err) => {
                warn!(error = %err, "review edit failed");
                self.set_status(format!("Save failed: {err}"));
            }
        }
    }

    fn open_group_modal(&mut self) {
        let Some(current) = self.session.current() else {
            self.set_status("No contacts loaded");
            return;
        };
        let options = group_options(self.session.contacts(), &self.config.groups);
        self.group_modal = Some(GroupModal::new(options, &current.group));
    }

    fn handle_group_modal_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.modal;

        if self.key_matches_any(&key, &keys.cancel) {
            self.group_modal = None;
        } else if self.key_matches_any(&key, &keys.next) {
            if let Some(modal) = self.group_modal.as_mut() {
                modal.select_next();
            }
        } else if self.key_matches_any(&key, &keys.prev) {
            if let Some(modal) = self.group_modal.as_mut() {
                modal.select_prev();
            }
        } else if self.key_matches_any(&key, &keys.add) {
            self.editor.start("", EditTarget::CustomGroup);
        } else if self.key_matches_any(&key, &keys.confirm) {
            let group = self
                .group_modal
                .take()
                .and_then(|m| m.selected_group().map(str::to_string));
            if let Some(group) = group {
                let result = self.session.set_group(&mut *self.store, &group);
                self.report_edit(result, "Group");
            }
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let editor_keys = &config.keys.editor;

        if self.key_matches_any(&key, &editor_keys.cancel) {
            self.editor.cancel();
            return;
        }

        if self.key_matches_any(&key, &editor_keys.confirm) {
            let value = self.editor.value().trim().to_string();
            match self.editor.target() {
                Some(EditTarget::Jump) => match self.session.jump_to_input(&value) {
                    Ok(()) => {
                        self.editor.cancel();
                        let cursor = self.session.cursor();
                        self.set_status(format!(
                            "Contact {} of {}",
                            cursor.position() + 1,
                            cursor.len()
                        ));
                    }
                    // keep the prompt open so the number can be corrected
                    Err(err) => self.set_status(err.to_string()),
                },
                Some(EditTarget::CustomGroup) => {
                    if value.is_empty() {
                        self.set_status("Group name is empty");
                        return;
                    }
                    self.editor.cancel();
                    self.group_modal = None;
                    let result = self.session.set_group(&mut *self.store, &value);
                    self.report_edit(result, "Group");
                }
                None => self.editor.cancel(),
            }
            return;
        }

        self.editor.handle_key_event(key);
    }

    // =========================================================================
    // Results screen
    // =========================================================================

    pub fn filtered(&self) -> Vec<FilteredContact<'_>> {
        self.filter.apply(self.session.contacts())
    }

    pub fn invite_counts(&self) -> InviteCounts {
        InviteCounts::of(self.session.contacts())
    }

    pub fn summary(&self) -> ContactSummary {
        ContactSummary::of(self.session.contacts())
    }

    fn clamp_results_selection(&mut self) {
        let len = self.filtered().len();
        self.results_selected = self.results_selected.min(len.saturating_sub(1));
    }

    fn handle_search_input_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let editor_keys = &config.keys.editor;
        if self.key_matches_any(&key, &editor_keys.cancel)
            || self.key_matches_any(&key, &editor_keys.confirm)
        {
            self.search_focused = false;
            return;
        }

        if self.search_input.handle_event(&Event::Key(key)).is_some() {
            self.filter.search = self.search_input.value().to_string();
            self.results_selected = 0;
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.results;
        let len = self.filtered().len();

        if self.key_matches_any(&key, &keys.search) {
            self.search_focused = true;
        } else if self.key_matches_any(&key, &keys.next) {
            if self.results_selected + 1 < len {
                self.results_selected += 1;
            }
        } else if self.key_matches_any(&key, &keys.prev) {
            self.results_selected = self.results_selected.saturating_sub(1);
        } else if self.key_matches_any(&key, &keys.page_down) {
            self.results_selected =
                (self.results_selected + RESULTS_PAGE).min(len.saturating_sub(1));
        } else if self.key_matches_any(&key, &keys.page_up) {
            self.results_selected = self.results_selected.saturating_sub(RESULTS_PAGE);
        } else if self.key_matches_any(&key, &keys.tab_next) {
            self.filter.tab = self.filter.tab.next();
            self.results_selected = 0;
        } else if self.key_matches_any(&key, &keys.tab_prev) {
            self.filter.tab = self.filter.tab.prev();
            self.results_selected = 0;
        } else if self.key_matches_any(&key, &keys.cycle_intimacy) {
            self.filter.cycle_intimacy();
            self.results_selected = 0;
        } else if self.key_matches_any(&key, &keys.cycle_group) {
            let groups = unique_groups(self.session.contacts());
            self.filter.cycle_group(&groups);
            self.results_selected = 0;
        } else if self.key_matches_any(&key, &keys.clear) {
            self.filter = ContactFilter::default();
            self.search_input.reset();
            self.results_selected = 0;
            self.set_status("Filters cleared");
        } else if self.key_matches_any(&key, &keys.open) {
            self.open_selected_in_review();
        } else if self.key_matches_any(&key, &keys.export) {
            self.export_tsv();
        }
    }

    /// Hand the selected row to the review screen through the stored cursor.
    fn open_selected_in_review(&mut self) {
        let selected = self
            .filtered()
            .get(self.results_selected)
            .map(|row| row.contact.id);
        let Some(id) = selected else {
            self.set_status("No contact selected");
            return;
        };

        let handoff = self.store.load().and_then(|contacts| {
            match position_of(&contacts, id) {
                Some(index) => self.store.set_cursor(index).map(|_| true),
                None => Ok(false),
            }
        });

        match handoff {
            Ok(true) => self.enter_review(),
            Ok(false) => self.set_status("That contact no longer exists"),
            Err(err) => self.set_status(format!("Could not open contact: {err}")),
        }
    }

    fn enter_review(&mut self) {
        match ReviewSession::open(&mut *self.store) {
            Ok(session) => {
                self.session = session;
                self.screen = Screen::Review;
            }
            Err(err) => self.set_status(format!("Could not load contacts: {err}")),
        }
    }

    /// Pick up changes made to the store outside this session.
    fn reload(&mut self) {
        match self.store.load() {
            Ok(contacts) => {
                self.session.reload(contacts);
                self.clamp_results_selection();
            }
            Err(err) => self.set_status(format!("Could not load contacts: {err}")),
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        self.reload();
        self.screen = screen;
        self.search_focused = false;
    }

    // =========================================================================
    // Export and share
    // =========================================================================

    /// Write the visible rows (the filtered table, or everything from the
    /// review screen) as TSV.
    fn export_tsv(&mut self) {
        let config = self.config;
        let path = Path::new(&config.export.csv_file_name);
        let (count, tsv) = match self.screen {
            Screen::Results => {
                let rows = self.filtered();
                (rows.len(), export::to_tsv(rows.iter().map(|r| r.contact)))
            }
            Screen::Review => {
                let contacts = self.session.contacts();
                (contacts.len(), export::to_tsv(contacts))
            }
        };

        match export::write_output(path, &tsv) {
            Ok(()) => {
                info!(count, path = %path.display(), "exported contacts");
                self.set_status(format!("Exported {} contacts to {}", count, path.display()));
            }
            Err(err) => self.set_status(format!("Export failed: {err:#}")),
        }
    }

    fn show_share_modal(&mut self) {
        use qrcode::{render::unicode, QrCode};

        let raw = match self.store.raw() {
            Ok(Some(raw)) if !self.session.contacts().is_empty() => raw,
            Ok(_) => {
                self.set_status("Nothing to share yet");
                return;
            }
            Err(err) => {
                self.set_status(format!("Could not read contacts: {err}"));
                return;
            }
        };

        let link = share::encode_link(&self.config.share_base_url, &raw);
        info!(bytes = link.len(), "built share link");

        let mut qr_lines = Vec::new();
        if link.len() <= QR_MAX_BYTES {
            match QrCode::new(link.as_bytes()) {
                Ok(code) => {
                    let rendered = code
                        .render::<unicode::Dense1x2>()
                        .dark_color(unicode::Dense1x2::Dark)
                        .light_color(unicode::Dense1x2::Light)
                        .build();
                    qr_lines = rendered.lines().map(str::to_string).collect();
                }
                Err(err) => self.set_status(format!("QR generation failed: {err}")),
            }
        } else {
            self.set_status("List too large for a QR code, showing the link only");
        }

        self.share_modal = Some(ShareModal { qr_lines, link });
    }

    fn handle_share_modal_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc) || matches!(key.code, KeyCode::Char('q')) {
            self.share_modal = None;
        }
    }

    // =========================================================================
    // Accessors for drawing
    // =========================================================================

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn top_bar_buttons(&self) -> &[TopBarButton] {
        &self.config.top_bar.buttons
    }

    // =========================================================================
    // Key matching
    // =========================================================================

    /// Check if the key event matches any of the bindings in the list
    fn key_matches_any(&self, event: &KeyEvent, bindings: &[String]) -> bool {
        bindings.iter().any(|b| key_matches_single(event, b))
    }

    // =========================================================================
    // Help Modal
    // =========================================================================

    /// Generate help content from current keybindings configuration
    pub fn help_entries(&self) -> Vec<HelpSection> {
        let keys = &self.config.keys;
        let entry = |action: &'static str, bindings: &[String]| HelpEntry {
            action,
            keys: bindings.join(", "),
        };

        let mut global = vec![
            entry("Quit", &keys.global.quit),
            entry("Help", &keys.global.help),
        ];
        for button in self.top_bar_buttons() {
            global.push(HelpEntry {
                action: button.action.title(),
                keys: button.key.clone(),
            });
        }

        vec![
            HelpSection {
                title: "Global",
                entries: global,
            },
            HelpSection {
                title: "Review",
                entries: vec![
                    HelpEntry {
                        action: "Set Intimacy",
                        keys: "1-5".to_string(),
                    },
                    entry("Next", &keys.review.next),
                    entry("Previous", &keys.review.prev),
                    entry("First", &keys.review.first),
                    entry("Middle", &keys.review.middle),
                    entry("Last", &keys.review.last),
                    entry("Pick Group", &keys.review.group),
                    entry("Toggle Invited", &keys.review.toggle_invited),
                    entry("Go To Number", &keys.review.jump),
                    entry("First Incomplete", &keys.review.first_incomplete),
                ],
            },
            HelpSection {
                title: "Results",
                entries: vec![
                    entry("Search", &keys.results.search),
                    entry("Next", &keys.results.next),
                    entry("Previous", &keys.results.prev),
                    entry("Page Down", &keys.results.page_down),
                    entry("Page Up", &keys.results.page_up),
                    entry("Next Tab", &keys.results.tab_next),
                    entry("Previous Tab", &keys.results.tab_prev),
                    entry("Cycle Intimacy", &keys.results.cycle_intimacy),
                    entry("Cycle Group", &keys.results.cycle_group),
                    entry("Clear Filters", &keys.results.clear),
                    entry("Open In Review", &keys.results.open),
                    entry("Export TSV", &keys.results.export),
                ],
            },
            HelpSection {
                title: "Modal",
                entries: vec![
                    entry("Cancel", &keys.modal.cancel),
                    entry("Confirm", &keys.modal.confirm),
                    entry("Next", &keys.modal.next),
                    entry("Previous", &keys.modal.prev),
                    entry("New Group", &keys.modal.add),
                ],
            },
            HelpSection {
                title: "Editor",
                entries: vec![
                    entry("Cancel", &keys.editor.cancel),
                    entry("Confirm", &keys.editor.confirm),
                ],
            },
        ]
    }

    /// Calculate total number of lines in help content
    fn help_total_lines(&self) -> usize {
        // header + entries + blank line per section
        self.help_entries()
            .iter()
            .map(|section| section.entries.len() + 2)
            .sum()
    }

    pub fn show_help(&mut self) {
        let total_lines = self.help_total_lines();
        self.help_modal = Some(HelpModal::new(total_lines));
    }

    fn handle_help_modal_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc) || matches!(key.code, KeyCode::Char('q')) {
            self.help_modal = None;
            return;
        }

        let Some(modal) = self.help_modal.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => modal.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => modal.scroll_up(1),
            KeyCode::PageDown => {
                let page = modal.viewport_height.saturating_sub(1).max(1);
                modal.scroll_down(page);
            }
            KeyCode::PageUp => {
                let page = modal.viewport_height.saturating_sub(1).max(1);
                modal.scroll_up(page);
            }
            KeyCode::Home => modal.scroll = 0,
            KeyCode::End => modal.scroll_down(modal.total_lines),
            _ => {}
        }
    }

    // =========================================================================
    // Top Bar Actions
    // =========================================================================

    fn top_bar_action_for_key(&self, key: &KeyEvent) -> Option<TopBarAction> {
        let KeyCode::F(n) = key.code else {
            return None;
        };
        self.config
            .top_bar
            .buttons
            .iter()
            .find(|b| b.function_key_number() == Some(n))
            .map(|b| b.action)
    }

    fn handle_top_bar_action(&mut self, action: TopBarAction) {
        match action {
            TopBarAction::Help => self.show_help(),
            TopBarAction::Review => self.switch_screen(Screen::Review),
            TopBarAction::Results => self.switch_screen(Screen::Results),
            TopBarAction::Export => self.export_tsv(),
            TopBarAction::Share => self.show_share_modal(),
        }
    }
}

/// Check if the key event matches a single binding string
fn key_matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Ctrl/Alt/Super chords are not bindable
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "space" => matches!(event.code, KeyCode::Char(' ')),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        name if name.starts_with('f') && name.len() > 1 => match name[1..].parse::<u8>() {
            Ok(n) => event.code == KeyCode::F(n),
            Err(_) => false,
        },
        // Single character - case-sensitive (m != M)
        _ => {
            let mut chars = trimmed.chars();
            if let (Some(first), None) = (chars.next(), chars.next()) {
                matches!(event.code, KeyCode::Char(c) if c == first)
            } else {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::parser::parse_contacts;
    use crate::store::{MemoryKv, SlotStore};
    use std::path::PathBuf;

    fn test_config() -> Config {
        config::parse("", PathBuf::from("/tmp/guestlist-tests/config.toml")).unwrap()
    }

    fn store_with(text: &str) -> SlotStore<MemoryKv> {
        let mut store = SlotStore::new(MemoryKv::new());
        store.replace_all(&parse_contacts(text).unwrap()).unwrap();
        store
    }

    fn press(app: &mut App<'_>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App<'_>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn quit_keys() {
        let config = test_config();
        let mut store = store_with("A,1");
        let mut app = App::new(&mut store, &config);
        assert!(app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn review_keys_write_through() {
        let config = test_config();
        let mut store = store_with("A,1\nB,2");
        let mut app = App::new(&mut store, &config);

        press(&mut app, KeyCode::Char('4'));
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('2'));

        let stored = app.store.load().unwrap();
        assert_eq!(stored[0].intimacy, "4");
        assert_eq!(stored[0].invited, Some(true));
        assert_eq!(stored[1].intimacy, "2");
        assert_eq!(app.session.cursor().position(), 1);

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.status.as_deref(), Some("Already at the last contact"));
    }

    #[test]
    fn jump_prompt_validates_range() {
        let config = test_config();
        let mut store = store_with("A,1\nB,2\nC,3");
        let mut app = App::new(&mut store, &config);

        press(&mut app, KeyCode::Char(':'));
        assert_eq!(app.editor.target(), Some(EditTarget::Jump));
        type_text(&mut app, "9");
        press(&mut app, KeyCode::Enter);
        assert!(app.editor.active);
        assert_eq!(app.status.as_deref(), Some("enter a number from 1 to 3"));
        assert_eq!(app.session.cursor().position(), 0);

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char(':'));
        type_text(&mut app, "3");
        press(&mut app, KeyCode::Enter);
        assert!(!app.editor.active);
        assert_eq!(app.session.current().unwrap().name, "C");
    }

    #[test]
    fn group_picker_and_custom_group() {
        let config = test_config();
        let mut store = store_with("A,1,3,work\nB,2");
        let mut app = App::new(&mut store, &config);
        assert_eq!(app.session.current().unwrap().name, "B");

        press(&mut app, KeyCode::Char('g'));
        let modal = app.group_modal.as_ref().unwrap();
        assert_eq!(modal.options[0], "work");
        assert_eq!(modal.options[1], "가족");
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert!(app.group_modal.is_none());
        assert_eq!(app.store.load().unwrap()[1].group, "가족");

        press(&mut app, KeyCode::Char('g'));
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "cousins");
        press(&mut app, KeyCode::Enter);
        assert!(app.group_modal.is_none());
        assert_eq!(app.store.load().unwrap()[1].group, "cousins");
    }

    #[test]
    fn results_search_and_handoff() {
        let config = test_config();
        let mut store = store_with("Alice,010-1\nBob,010-2\nCarol,010-3");
        let mut app = App::new(&mut store, &config);

        press(&mut app, KeyCode::F(3));
        assert_eq!(app.screen, Screen::Results);
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "car");
        assert_eq!(app.filtered().len(), 1);
        // 'q' while typing is text, not quit
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert_eq!(app.filtered().len(), 0);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Esc);
        assert!(!app.search_focused);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Review);
        assert_eq!(app.session.current().unwrap().name, "Carol");
        assert_eq!(app.store.take_cursor().unwrap(), None);
    }

    #[test]
    fn results_tabs_and_filters() {
        let config = test_config();
        let mut store = store_with("A,1,5,family\nB,2,3,work\nC,3");
        let mut app = App::new(&mut store, &config);
        assert_eq!(app.session.current().unwrap().name, "C");
        press(&mut app, KeyCode::Char('p'));
        press(&mut app, KeyCode::Char(' '));

        press(&mut app, KeyCode::F(3));
        press(&mut app, KeyCode::Tab);
        let names: Vec<String> = app.filtered().iter().map(|r| r.contact.name.clone()).collect();
        assert_eq!(names, vec!["B"]);
        assert_eq!(app.invite_counts().invited, 1);

        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.filter.group.as_deref(), Some("family"));
        assert_eq!(app.filtered().len(), 1);

        press(&mut app, KeyCode::Char('c'));
        assert!(app.filter.is_default());
        assert_eq!(app.filtered().len(), 3);
    }

    #[test]
    fn share_modal_holds_link() {
        let config = test_config();
        let mut store = store_with("A,1");
        let mut app = App::new(&mut store, &config);

        press(&mut app, KeyCode::F(7));
        let modal = app.share_modal.as_ref().unwrap();
        assert!(modal.link.starts_with("http://localhost:3000/options?data="));
        assert!(!modal.qr_lines.is_empty());
        let decoded = share::decode_payload(&modal.link).unwrap();
        assert_eq!(decoded, app.session.contacts().to_vec());

        press(&mut app, KeyCode::Esc);
        assert!(app.share_modal.is_none());
    }

    #[test]
    fn empty_store_is_not_fatal() {
        let config = test_config();
        let mut store = SlotStore::new(MemoryKv::new());
        let mut app = App::new(&mut store, &config);
        press(&mut app, KeyCode::Char('3'));
        assert!(app.status.as_deref().unwrap_or_default().starts_with("Save failed"));
        press(&mut app, KeyCode::F(7));
        assert_eq!(app.status.as_deref(), Some("Nothing to share yet"));
    }

    #[test]
    fn key_matching() {
        let f5 = KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        assert!(key_matches_single(&f5, "F5"));
        assert!(!key_matches_single(&f5, "F6"));
        let shifted = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert!(key_matches_single(&shifted, "?"));
        let ctrl = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL);
        assert!(!key_matches_single(&ctrl, "n"));
        let f = KeyEvent::new(KeyCode::Char('f'), KeyModifiers::NONE);
        assert!(key_matches_single(&f, "f"));
    }
}
