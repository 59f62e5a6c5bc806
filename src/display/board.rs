//! In-memory registry of display elements.
//!
//! Every piece of text or colour the panel shows lives here. Elements are
//! registered once during initialization and never removed. All mutation goes
//! through [`DisplayBoard::update`], which applies a whole batch of changes
//! under one write lock, so an observer never sees half of a button press.

use crate::error::{PanelError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::watch;

/// Handle to one element on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

/// A CSS-style colour name (`silver`, `aqua`, `#ff8800`...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Color {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Visible state of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
}

#[derive(Default)]
struct BoardState {
    elements: Vec<Element>,
    by_name: HashMap<String, ElementId>,
    /// Bound field that owns each element's text, if any
    owners: HashMap<ElementId, String>,
}

/// Shared display state.
///
/// The version counter is bumped on every batch that changed something and is
/// published through a watch channel so renderers can wait for changes.
pub struct DisplayBoard {
    state: RwLock<BoardState>,
    version: watch::Sender<u64>,
}

impl DisplayBoard {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: RwLock::new(BoardState::default()),
            version,
        }
    }

    /// Register a new element with empty text and no colours.
    pub fn register(&self, name: impl Into<String>) -> Result<ElementId> {
        let name = name.into();
        let mut state = self.state.write();
        if state.by_name.contains_key(&name) {
            return Err(PanelError::InvalidConfig(format!(
                "element {} registered twice",
                name
            )));
        }
        let id = ElementId(state.elements.len());
        state.elements.push(Element {
            name: name.clone(),
            ..Element::default()
        });
        state.by_name.insert(name, id);
        Ok(id)
    }

    /// Record that `field` exclusively writes the text of `id`.
    pub fn bind(&self, id: ElementId, field: &str) -> Result<()> {
        let mut state = self.state.write();
        if id.0 >= state.elements.len() {
            return Err(PanelError::InvalidConfig(format!(
                "field {} bound to unregistered element",
                field
            )));
        }
        if let Some(owner) = state.owners.get(&id) {
            return Err(PanelError::InvalidConfig(format!(
                "element {} already bound to field {}",
                state.elements[id.0].name, owner
            )));
        }
        state.owners.insert(id, field.to_string());
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<ElementId> {
        self.state.read().by_name.get(name).copied()
    }

    /// Text of an element. An id this board never issued reads as empty.
    pub fn text(&self, id: ElementId) -> String {
        self.state
            .read()
            .elements
            .get(id.0)
            .map(|e| e.text.clone())
            .unwrap_or_default()
    }

    pub fn element(&self, id: ElementId) -> Element {
        self.state
            .read()
            .elements
            .get(id.0)
            .cloned()
            .unwrap_or_default()
    }

    /// Apply a batch of mutations atomically with respect to readers.
    pub fn update<R>(&self, f: impl FnOnce(&mut Frame<'_>) -> R) -> R {
        let mut state = self.state.write();
        let mut frame = Frame {
            elements: &mut state.elements,
            changed: false,
        };
        let result = f(&mut frame);
        let changed = frame.changed;
        drop(state);

        if changed {
            self.version.send_modify(|v| *v += 1);
        }
        result
    }

    pub fn set_text(&self, id: ElementId, text: impl Into<String>) {
        let text = text.into();
        self.update(|frame| frame.set_text(id, text));
    }

    /// Consistent copy of every element.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            elements: self.state.read().elements.clone(),
        }
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Receiver that is marked changed whenever the board changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

impl Default for DisplayBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable view of the board inside one [`DisplayBoard::update`] batch.
///
/// Writes to an id this board never issued are ignored.
pub struct Frame<'a> {
    elements: &'a mut Vec<Element>,
    changed: bool,
}

impl Frame<'_> {
    pub fn text(&self, id: ElementId) -> &str {
        self.elements.get(id.0).map_or("", |e| e.text.as_str())
    }

    pub fn set_text(&mut self, id: ElementId, text: impl Into<String>) {
        let Some(element) = self.elements.get_mut(id.0) else {
            return;
        };
        let text = text.into();
        if element.text != text {
            element.text = text;
            self.changed = true;
        }
    }

    pub fn set_foreground(&mut self, id: ElementId, color: &Color) {
        let Some(element) = self.elements.get_mut(id.0) else {
            return;
        };
        if element.foreground.as_ref() != Some(color) {
            element.foreground = Some(color.clone());
            self.changed = true;
        }
    }

    pub fn set_background(&mut self, id: ElementId, color: &Color) {
        let Some(element) = self.elements.get_mut(id.0) else {
            return;
        };
        if element.background.as_ref() != Some(color) {
            element.background = Some(color.clone());
            self.changed = true;
        }
    }
}

/// Point-in-time copy of the board.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    elements: Vec<Element>,
}

impl Snapshot {
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }
}
