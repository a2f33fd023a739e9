//! Comparison: how a rule's reading is tested.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Strictly greater than the threshold.
    Above,
    /// Strictly less than the threshold.
    Below,
    Occupied,
    Unoccupied,
}

impl Comparison {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
            Self::Occupied => "occupied",
            Self::Unoccupied => "unoccupied",
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Above | Self::Below)
    }

    /// Test a numeric reading. Occupancy comparisons never match numbers.
    #[must_use]
    pub fn holds_for_value(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Above => value > threshold,
            Self::Below => value < threshold,
            Self::Occupied | Self::Unoccupied => false,
        }
    }

    /// Test an occupancy reading. Numeric comparisons never match occupancy.
    #[must_use]
    pub fn holds_for_occupancy(self, occupied: bool) -> bool {
        match self {
            Self::Occupied => occupied,
            Self::Unoccupied => !occupied,
            Self::Above | Self::Below => false,
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_compare_strictly_against_threshold() {
        assert!(Comparison::Above.holds_for_value(26.1, 26.0));
        assert!(!Comparison::Above.holds_for_value(26.0, 26.0));
        assert!(Comparison::Below.holds_for_value(9.9, 10.0));
        assert!(!Comparison::Below.holds_for_value(10.0, 10.0));
    }

    #[test]
    fn should_match_occupancy_states() {
        assert!(Comparison::Occupied.holds_for_occupancy(true));
        assert!(Comparison::Unoccupied.holds_for_occupancy(false));
        assert!(!Comparison::Unoccupied.holds_for_occupancy(true));
    }

    #[test]
    fn should_never_mix_numeric_and_occupancy_tests() {
        assert!(!Comparison::Occupied.holds_for_value(1.0, 0.0));
        assert!(!Comparison::Above.holds_for_occupancy(true));
    }
}
