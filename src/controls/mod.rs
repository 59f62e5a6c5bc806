//! Mutually exclusive control groups and the model that keeps them consistent.

pub mod catalog;
mod group;
mod model;

pub use group::{
    ControlGroup, ControlOption, Exclusion, GroupSpec, LinkTarget, OptionLink, OptionSpec,
};
pub use model::ButtonGroupModel;
