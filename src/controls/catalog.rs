//! The thermostat's fixed control groups.

use super::group::{Exclusion, GroupSpec, OptionSpec};
use crate::fields;

pub const TEMP: &str = "temp";
pub const MODE: &str = "mode";
pub const FAN: &str = "fan";

/// Setpoint Down/Up, Cool/Heat/Off mode and Auto/On fan.
///
/// Mode keeps the historical pairwise relations: Cool and Heat reset each
/// other and Off resets both.
pub fn thermostat_groups() -> Vec<GroupSpec> {
    vec![
        GroupSpec::new(TEMP, Exclusion::Declared)
            .option(OptionSpec::new("Down").counter(fields::SETPOINT, -1))
            .option(OptionSpec::new("Up").counter(fields::SETPOINT, 1)),
        GroupSpec::new(MODE, Exclusion::Declared)
            .option(
                OptionSpec::new("Cool")
                    .color("aqua")
                    .uncolors(["Heat"])
                    .sets_text(fields::MODE)
                    .preseed_from("cool_color.txt"),
            )
            .option(
                OptionSpec::new("Heat")
                    .color("orange")
                    .uncolors(["Cool"])
                    .sets_text(fields::MODE)
                    .preseed_from("heat_color.txt"),
            )
            .option(
                OptionSpec::new("Off")
                    .uncolors(["Heat", "Cool"])
                    .sets_text(fields::MODE),
            ),
        GroupSpec::new(FAN, Exclusion::Declared)
            .option(
                OptionSpec::new("Auto")
                    .color("lime")
                    .uncolors(["On"])
                    .sets_text(fields::FAN)
                    .preseed_from("auto_color.txt"),
            )
            .option(
                OptionSpec::new("On")
                    .color("lime")
                    .uncolors(["Auto"])
                    .sets_text(fields::FAN)
                    .preseed_from("on_color.txt"),
            ),
    ]
}
