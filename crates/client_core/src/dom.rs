//! Document abstraction handed to the router and containers.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

pub const DEFAULT_MODAL_WIDTH: u32 = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    Window,
    Mail,
}

impl Icon {
    /// Navbar order.
    pub const ALL: [Icon; 2] = [Self::Window, Self::Mail];

    pub fn test_id(self) -> &'static str {
        match self {
            Self::Window => "icon-window",
            Self::Mail => "icon-mail",
        }
    }
}

/// The root element a page is rendered into, plus the page-level widgets
/// (modal, alert, file input) containers poke at.
pub trait ViewRoot: Send + Sync {
    fn set_content(&self, markup: String);
    fn content(&self) -> String;
    fn set_active_icon(&self, icon: Option<Icon>);
    fn active_icon(&self) -> Option<Icon>;
    fn open_modal(&self, markup: String);
    fn modal_width(&self) -> u32;
    fn alert(&self, message: &str);
    fn reset_file_input(&self);
    fn show_form_error(&self, message: &str);
}

/// Minimal stand-in for a clicked DOM element: only attributes are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    attributes: BTreeMap<String, String>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// `data-*` attribute lookup, `key` given without the prefix.
    pub fn data(&self, key: &str) -> Option<&str> {
        self.attribute(&format!("data-{key}"))
    }
}

#[derive(Debug, Default)]
struct MemoryRootState {
    content: String,
    active_icon: Option<Icon>,
    modal: Option<String>,
    alerts: Vec<String>,
    file_input_resets: usize,
    form_error: Option<String>,
}

/// Records every mutation so tests and the CLI can inspect the page.
pub struct MemoryRoot {
    modal_width: u32,
    state: Mutex<MemoryRootState>,
}

impl Default for MemoryRoot {
    fn default() -> Self {
        Self::with_modal_width(DEFAULT_MODAL_WIDTH)
    }
}

impl MemoryRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_modal_width(modal_width: u32) -> Self {
        Self {
            modal_width,
            state: Mutex::new(MemoryRootState::default()),
        }
    }

    pub fn modal(&self) -> Option<String> {
        self.state().modal.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.state().alerts.clone()
    }

    pub fn file_input_resets(&self) -> usize {
        self.state().file_input_resets
    }

    pub fn form_error(&self) -> Option<String> {
        self.state().form_error.clone()
    }

    fn state(&self) -> MutexGuard<'_, MemoryRootState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ViewRoot for MemoryRoot {
    fn set_content(&self, markup: String) {
        let mut state = self.state();
        state.content = markup;
        state.modal = None;
        state.form_error = None;
    }

    fn content(&self) -> String {
        self.state().content.clone()
    }

    fn set_active_icon(&self, icon: Option<Icon>) {
        self.state().active_icon = icon;
    }

    fn active_icon(&self) -> Option<Icon> {
        self.state().active_icon
    }

    fn open_modal(&self, markup: String) {
        self.state().modal = Some(markup);
    }

    fn modal_width(&self) -> u32 {
        self.modal_width
    }

    fn alert(&self, message: &str) {
        self.state().alerts.push(message.to_string());
    }

    fn reset_file_input(&self) {
        self.state().file_input_resets += 1;
    }

    fn show_form_error(&self, message: &str) {
        self.state().form_error = Some(message.to_string());
    }
}
