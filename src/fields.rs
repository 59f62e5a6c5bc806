//! Bound fields: display elements whose text mirrors an external value source.

use crate::display::{DisplayBoard, ElementId};
use crate::error::{PanelError, Result};

pub const STATUS: &str = "status";
pub const AVERAGE_TEMP: &str = "average_temp";
pub const BEDROOM_TEMP: &str = "bedroom_temp";
pub const NURSERY_TEMP: &str = "nursery_temp";
pub const FAMILY_ROOM_TEMP: &str = "family_room_temp";
pub const BASEMENT_TEMP: &str = "basement_temp";
pub const CLOSET_TEMP: &str = "closet_temp";
pub const SETPOINT: &str = "setpoint";
pub const MODE: &str = "mode";
pub const FAN: &str = "fan";
pub const HOUR_DUTY_CYCLE: &str = "hour_duty_cycle";
pub const DAY_DUTY_CYCLE: &str = "day_duty_cycle";
pub const LAST_UPDATE: &str = "last_update";

/// Static description of a field before it is bound to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub source_key: &'static str,
    /// Whether the element turns the alert colour while data is stale
    pub staleness_tracked: bool,
}

const fn field(name: &'static str, source_key: &'static str, tracked: bool) -> FieldSpec {
    FieldSpec {
        name,
        source_key,
        staleness_tracked: tracked,
    }
}

/// The thermostat's fixed field catalog.
pub fn catalog() -> &'static [FieldSpec] {
    const CATALOG: &[FieldSpec] = &[
        field(STATUS, "curstat.txt", true),
        field(AVERAGE_TEMP, "averagetemp.txt", true),
        field(BEDROOM_TEMP, "bedroomtemp.txt", true),
        field(NURSERY_TEMP, "nurserytemp.txt", true),
        field(FAMILY_ROOM_TEMP, "familyroomtemp.txt", true),
        field(BASEMENT_TEMP, "basementtemp.txt", true),
        field(CLOSET_TEMP, "closettemp.txt", true),
        field(SETPOINT, "temp.txt", false),
        field(MODE, "mode.txt", false),
        field(FAN, "fan.txt", false),
        field(HOUR_DUTY_CYCLE, "hourdutycycle.txt", false),
        field(DAY_DUTY_CYCLE, "daydutycycle.txt", false),
        field(LAST_UPDATE, "lastupdate.txt", true),
    ];
    CATALOG
}

/// A field bound to its display element. The source key never changes once bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundField {
    name: String,
    source_key: String,
    target: ElementId,
    staleness_tracked: bool,
}

impl BoundField {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn target(&self) -> ElementId {
        self.target
    }

    pub fn staleness_tracked(&self) -> bool {
        self.staleness_tracked
    }
}

/// All bound fields of a panel.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<BoundField>,
}

impl FieldRegistry {
    /// Register one element per spec on `board` and bind it exclusively.
    pub fn bind_all(board: &DisplayBoard, specs: &[FieldSpec]) -> Result<Self> {
        let mut fields = Vec::with_capacity(specs.len());
        for spec in specs {
            let target = board.register(spec.name)?;
            board.bind(target, spec.name)?;
            fields.push(BoundField {
                name: spec.name.to_string(),
                source_key: spec.source_key.to_string(),
                target,
                staleness_tracked: spec.staleness_tracked,
            });
        }
        Ok(Self { fields })
    }

    pub fn get(&self, name: &str) -> Result<&BoundField> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| PanelError::UnknownField(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Targets that switch colour with the staleness status.
    pub fn staleness_targets(&self) -> Vec<ElementId> {
        self.fields
            .iter()
            .filter(|f| f.staleness_tracked)
            .map(|f| f.target)
            .collect()
    }
}
