//! Plain-text rendering of the board.
//!
//! Static labels ("Status: ", "Bedroom: "...) belong to the layout, never to
//! the values pushed by the synchronizer.

use super::board::{ElementId, Snapshot};

/// One labelled value inside a line.
#[derive(Debug, Clone)]
pub struct Slot {
    pub label: &'static str,
    pub element: ElementId,
}

#[derive(Debug, Clone)]
pub enum Line {
    Heading(&'static str),
    /// Values on one line, followed by static trailing text.
    Values {
        slots: Vec<Slot>,
        suffix: &'static str,
    },
    /// A row of buttons, each shown as its caption and background colour.
    Buttons(Vec<ElementId>),
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    lines: Vec<Line>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(mut self, text: &'static str) -> Self {
        self.lines.push(Line::Heading(text));
        self
    }

    pub fn value(self, label: &'static str, element: ElementId) -> Self {
        self.values(vec![Slot { label, element }], "")
    }

    pub fn values(mut self, slots: Vec<Slot>, suffix: &'static str) -> Self {
        self.lines.push(Line::Values { slots, suffix });
        self
    }

    pub fn buttons(mut self, buttons: Vec<ElementId>) -> Self {
        self.lines.push(Line::Buttons(buttons));
        self
    }

    pub fn render(&self, snapshot: &Snapshot) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Heading(text) => {
                    out.push_str("== ");
                    out.push_str(text);
                    out.push_str(" ==");
                }
                Line::Values { slots, suffix } => {
                    for slot in slots {
                        let Some(element) = snapshot.get(slot.element) else {
                            continue;
                        };
                        out.push_str(slot.label);
                        out.push_str(element.text.trim_end());
                        if let Some(color) = &element.foreground {
                            out.push_str(&format!(" <{}>", color));
                        }
                    }
                    out.push_str(suffix);
                }
                Line::Buttons(buttons) => {
                    let row: Vec<String> = buttons
                        .iter()
                        .filter_map(|id| snapshot.get(*id))
                        .map(|element| match &element.background {
                            Some(color) => format!("[{} ({})]", element.text, color),
                            None => format!("[{}]", element.text),
                        })
                        .collect();
                    out.push_str(&row.join(" "));
                }
            }
            out.push('\n');
        }
        out
    }
}
