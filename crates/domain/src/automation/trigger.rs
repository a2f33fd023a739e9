//! Trigger: the environmental reading an automation rule watches.

use serde::{Deserialize, Serialize};

use super::Comparison;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTrigger {
    /// Outdoor temperature in °C.
    Temperature,
    /// Relative humidity in %.
    Humidity,
    /// Illuminance in lux, measured or estimated from sun elevation.
    LightLevel,
    /// Occupancy of the rule's target rooms.
    Occupancy,
}

impl RuleTrigger {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::LightLevel => "light_level",
            Self::Occupancy => "occupancy",
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Occupancy)
    }

    /// Numeric triggers take `above`/`below`; occupancy takes
    /// `occupied`/`unoccupied`.
    #[must_use]
    pub fn accepts(self, comparison: Comparison) -> bool {
        self.is_numeric() == comparison.is_numeric()
    }
}

impl std::fmt::Display for RuleTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
