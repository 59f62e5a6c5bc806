//! Button-group state model.
//!
//! Selecting an option resets its peers, colours the option and updates its
//! linked field in one board batch. Nothing waits on the network.

use super::group::{ControlGroup, ControlOption, LinkTarget};
use crate::display::{Color, DisplayBoard};
use crate::error::{PanelError, Result};
use log::debug;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct ButtonGroupModel {
    board: Arc<DisplayBoard>,
    groups: Vec<ControlGroup>,
    /// Background of an unselected button
    unselected: Color,
    /// Currently selected option id per group
    selected: Mutex<HashMap<String, String>>,
}

impl ButtonGroupModel {
    /// Take ownership of bound groups and paint every button unselected.
    pub fn new(
        board: Arc<DisplayBoard>,
        groups: Vec<ControlGroup>,
        unselected: Color,
    ) -> Result<Self> {
        let mut names = HashSet::new();
        for group in &groups {
            if !names.insert(group.name()) {
                return Err(PanelError::InvalidConfig(format!(
                    "group {} declared twice",
                    group.name()
                )));
            }
        }

        board.update(|frame| {
            for option in groups.iter().flat_map(|g| g.options()) {
                frame.set_background(option.button(), &unselected);
            }
        });

        Ok(Self {
            board,
            groups,
            unselected,
            selected: Mutex::new(HashMap::new()),
        })
    }

    pub fn groups(&self) -> &[ControlGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Result<&ControlGroup> {
        self.groups
            .iter()
            .find(|g| g.name() == name)
            .ok_or_else(|| PanelError::UnknownGroup(name.to_string()))
    }

    pub fn option(&self, group: &str, option: &str) -> Result<&ControlOption> {
        self.group(group)?.option(option)
    }

    /// Find an option by id alone. Ambiguous ids are an error.
    pub fn find_option(&self, option: &str) -> Result<&ControlOption> {
        let mut matches = self
            .groups
            .iter()
            .flat_map(|g| g.options())
            .filter(|o| o.id() == option);
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(found),
            (Some(_), Some(_)) => Err(PanelError::InvalidConfig(format!(
                "option id {} is ambiguous; qualify it with a group",
                option
            ))),
            (None, _) => Err(PanelError::UnknownOptionId(option.to_string())),
        }
    }

    /// Currently selected option of a group, if any.
    pub fn selected(&self, group: &str) -> Option<String> {
        self.selected.lock().get(group).cloned()
    }

    /// Apply a selection to the board.
    pub fn select(&self, group: &str, option: &str) -> Result<&ControlOption> {
        let option = self.option(group, option)?;

        let mut selected = self.selected.lock();
        self.board.update(|frame| {
            for &peer in option.resets() {
                frame.set_background(peer, &self.unselected);
            }
            if let Some(color) = option.color_when_selected() {
                frame.set_background(option.button(), color);
            }
            match option.link() {
                LinkTarget::None => {}
                LinkTarget::SetText(target) => frame.set_text(target, option.id()),
                LinkTarget::Counter { target, step } => {
                    let current = frame.text(target).trim();
                    match current.parse::<i64>().ok().and_then(|v| v.checked_add(step)) {
                        Some(next) => frame.set_text(target, next.to_string()),
                        None => debug!(
                            "[Panel] {}.{}: counter text {:?} is not an integer, left unchanged",
                            option.group(),
                            option.id(),
                            current
                        ),
                    }
                }
            }
        });
        selected.insert(option.group().to_string(), option.id().to_string());

        Ok(option)
    }

    /// Apply a server-rendered initial background to one option's button.
    ///
    /// If the colour is the option's selected colour the option becomes the
    /// group's selection and its peers are reset, so when the server reports
    /// two selected options the later one wins. Any other colour on a
    /// coloured option clears that option's selection.
    pub fn preseed(&self, group: &str, option: &str, color: Color) -> Result<()> {
        let option = self.option(group, option)?;
        let selects = option.color_when_selected() == Some(&color);

        let mut selected = self.selected.lock();
        self.board.update(|frame| {
            if selects {
                for &peer in option.resets() {
                    frame.set_background(peer, &self.unselected);
                }
            }
            frame.set_background(option.button(), &color);
        });

        if selects {
            selected.insert(option.group().to_string(), option.id().to_string());
        } else if option.color_when_selected().is_some()
            && selected.get(option.group()).map(String::as_str) == Some(option.id())
        {
            selected.remove(option.group());
        }
        Ok(())
    }
}
