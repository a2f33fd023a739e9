//! Action: what a rule does to each targeted device.

use serde::{Deserialize, Serialize};

use crate::device::CoverTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Close,
    Open,
    /// Keep the position, set the slats to 45°.
    #[serde(rename = "tilt_45", alias = "tilt45")]
    Tilt45,
    /// Ask the energy strategy for a position.
    ComputeEnergyPosition,
    /// Go back to the device's favorite for the current time of day.
    RestorePrevious,
}

impl RuleAction {
    /// Target for actions that do not depend on outside state.
    ///
    /// Returns `None` for [`RuleAction::ComputeEnergyPosition`] and
    /// [`RuleAction::RestorePrevious`].
    #[must_use]
    pub fn fixed_target(self, current: CoverTarget) -> Option<CoverTarget> {
        match self {
            Self::Close => Some(CoverTarget::CLOSED),
            Self::Open => Some(CoverTarget::OPEN),
            Self::Tilt45 => Some(CoverTarget {
                position: current.position,
                tilt: 45,
            }),
            Self::ComputeEnergyPosition | Self::RestorePrevious => None,
        }
    }
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Close => "close",
            Self::Open => "open",
            Self::Tilt45 => "tilt_45",
            Self::ComputeEnergyPosition => "compute_energy_position",
            Self::RestorePrevious => "restore_previous",
        })
    }
}
