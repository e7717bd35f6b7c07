use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

/// What the text being typed will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    /// 1-based position for the review cursor
    Jump,
    /// Group name not in the picker list
    CustomGroup,
}

impl EditTarget {
    pub fn title(self) -> &'static str {
        match self {
            EditTarget::Jump => "GO TO",
            EditTarget::CustomGroup => "NEW GROUP",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EditTarget::Jump => "NUMBER: ",
            EditTarget::CustomGroup => "GROUP: ",
        }
    }
}

#[derive(Default)]
pub struct InlineEditor {
    pub active: bool,
    target: Option<EditTarget>,
    input: Input,
}

impl InlineEditor {
    pub fn start(&mut self, current: &str, target: EditTarget) {
        self.active = true;
        self.target = Some(target);
        self.input = Input::new(current.to_string());
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.target = None;
        self.input.reset();
    }

    pub fn target(&self) -> Option<EditTarget> {
        self.target
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.input.handle_event(&Event::Key(key)).is_some()
    }
}
