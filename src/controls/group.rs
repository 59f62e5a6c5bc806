//! Control group declarations and their resolution against the board.

use crate::display::{Color, DisplayBoard, ElementId};
use crate::error::{PanelError, Result};
use crate::fields::FieldRegistry;
use std::collections::HashSet;

/// What selecting an option does to a bound field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionLink {
    None,
    /// Overwrite the field's text with the option id (mode/fan indicator).
    SetText { field: String },
    /// Add `step` to the integer shown in the field.
    Counter { field: String, step: i64 },
}

/// How an option chooses which peers to reset when it is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Every other option in the group.
    AllPeers,
    /// Only the peers each option lists in its `uncolor` set.
    Declared,
}

/// Static declaration of one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub id: String,
    pub color_when_selected: Option<Color>,
    pub link: OptionLink,
    pub uncolor: Vec<String>,
    /// Value source holding a server-side initial background colour
    pub preseed_key: Option<String>,
}

impl OptionSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color_when_selected: None,
            link: OptionLink::None,
            uncolor: Vec::new(),
            preseed_key: None,
        }
    }

    pub fn color(mut self, color: impl Into<Color>) -> Self {
        self.color_when_selected = Some(color.into());
        self
    }

    pub fn sets_text(mut self, field: impl Into<String>) -> Self {
        self.link = OptionLink::SetText {
            field: field.into(),
        };
        self
    }

    pub fn counter(mut self, field: impl Into<String>, step: i64) -> Self {
        self.link = OptionLink::Counter {
            field: field.into(),
            step,
        };
        self
    }

    pub fn uncolors<I, S>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uncolor = peers.into_iter().map(Into::into).collect();
        self
    }

    pub fn preseed_from(mut self, key: impl Into<String>) -> Self {
        self.preseed_key = Some(key.into());
        self
    }
}

/// Static declaration of a group of options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: String,
    pub exclusion: Exclusion,
    pub options: Vec<OptionSpec>,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>, exclusion: Exclusion) -> Self {
        Self {
            name: name.into(),
            exclusion,
            options: Vec::new(),
        }
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    /// Peers reset when `option` is selected.
    fn peers_of<'a>(&'a self, option: &'a OptionSpec) -> Vec<&'a str> {
        match self.exclusion {
            Exclusion::AllPeers => self
                .options
                .iter()
                .filter(|o| o.id != option.id)
                .map(|o| o.id.as_str())
                .collect(),
            Exclusion::Declared => option.uncolor.iter().map(String::as_str).collect(),
        }
    }

    /// Check that the group can never show two options selected at once.
    ///
    /// Declared peers must be members of this group, and any two options that
    /// both colour themselves on selection must reset each other.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for option in &self.options {
            if !ids.insert(option.id.as_str()) {
                return Err(PanelError::InvalidConfig(format!(
                    "group {} declares option {} twice",
                    self.name, option.id
                )));
            }
        }

        for option in &self.options {
            for peer in &option.uncolor {
                if peer == &option.id {
                    return Err(PanelError::InvalidConfig(format!(
                        "option {}.{} lists itself as a peer",
                        self.name, option.id
                    )));
                }
                if !ids.contains(peer.as_str()) {
                    return Err(PanelError::InvalidConfig(format!(
                        "option {}.{} resets {} which is not in the group",
                        self.name, option.id, peer
                    )));
                }
            }
        }

        let colored: Vec<&OptionSpec> = self
            .options
            .iter()
            .filter(|o| o.color_when_selected.is_some())
            .collect();
        for a in &colored {
            let peers = self.peers_of(a);
            for b in &colored {
                if a.id != b.id && !peers.contains(&b.id.as_str()) {
                    return Err(PanelError::InvalidConfig(format!(
                        "option {}.{} does not reset {}; both could appear selected",
                        self.name, a.id, b.id
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Resolved effect of an option on a display element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    None,
    SetText(ElementId),
    Counter { target: ElementId, step: i64 },
}

/// An option bound to its button element.
#[derive(Debug, Clone)]
pub struct ControlOption {
    id: String,
    group: String,
    button: ElementId,
    color_when_selected: Option<Color>,
    link: LinkTarget,
    resets: Vec<ElementId>,
    preseed_key: Option<String>,
}

impl ControlOption {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the owning group.
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn button(&self) -> ElementId {
        self.button
    }

    pub fn color_when_selected(&self) -> Option<&Color> {
        self.color_when_selected.as_ref()
    }

    pub fn link(&self) -> LinkTarget {
        self.link
    }

    /// Buttons returned to the unselected colour when this option is selected.
    pub fn resets(&self) -> &[ElementId] {
        &self.resets
    }

    pub fn preseed_key(&self) -> Option<&str> {
        self.preseed_key.as_deref()
    }
}

/// A validated group bound to the board.
#[derive(Debug, Clone)]
pub struct ControlGroup {
    name: String,
    options: Vec<ControlOption>,
}

impl ControlGroup {
    /// Validate `spec`, register one button per option and resolve field links.
    pub fn bind(spec: &GroupSpec, board: &DisplayBoard, fields: &FieldRegistry) -> Result<Self> {
        spec.validate()?;

        let mut buttons = Vec::with_capacity(spec.options.len());
        for option in &spec.options {
            let button = board.register(format!("{}.{}", spec.name, option.id))?;
            board.set_text(button, option.id.clone());
            buttons.push(button);
        }
        let button_of = |id: &str| {
            spec.options
                .iter()
                .position(|o| o.id == id)
                .map(|i| buttons[i])
        };

        let mut options = Vec::with_capacity(spec.options.len());
        for (option, &button) in spec.options.iter().zip(&buttons) {
            let link = match &option.link {
                OptionLink::None => LinkTarget::None,
                OptionLink::SetText { field } => LinkTarget::SetText(fields.get(field)?.target()),
                OptionLink::Counter { field, step } => LinkTarget::Counter {
                    target: fields.get(field)?.target(),
                    step: *step,
                },
            };
            let resets = spec
                .peers_of(option)
                .into_iter()
                .filter_map(button_of)
                .collect();

            options.push(ControlOption {
                id: option.id.clone(),
                group: spec.name.clone(),
                button,
                color_when_selected: option.color_when_selected.clone(),
                link,
                resets,
                preseed_key: option.preseed_key.clone(),
            });
        }

        Ok(Self {
            name: spec.name.clone(),
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &[ControlOption] {
        &self.options
    }

    pub fn option(&self, id: &str) -> Result<&ControlOption> {
        self.options
            .iter()
            .find(|o| o.id == id)
            .ok_or_else(|| PanelError::UnknownOption {
                group: self.name.clone(),
                option: id.to_string(),
            })
    }

    pub fn buttons(&self) -> Vec<ElementId> {
        self.options.iter().map(|o| o.button).collect()
    }
}
