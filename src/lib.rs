//! Thermostat control panel library.
//!
//! This library keeps a headless thermostat panel in sync with its backend:
//! a polling read path that mirrors small text value sources onto display
//! elements, button groups that stay mutually exclusive, and a staleness
//! signal when the backend stops reporting.

pub mod command;
pub mod config;
pub mod controls;
pub mod display;
pub mod error;
pub mod fields;
pub mod panel;
pub mod simulation;
pub mod source;
pub mod staleness;
pub mod sync;

pub use error::{PanelError, Result};
pub use panel::Panel;
