//! Seasonal energy strategy: shade the sunny side in summer, harvest heat
//! in winter, insulate at night.

use shadehub_domain::device::{CoverTarget, Facing};
use shadehub_domain::time::Season;

use crate::ports::EnergyStrategy;

const SUMMER_SHADE: CoverTarget = CoverTarget {
    position: 20,
    tilt: 45,
};
const MID_SEASON_SHADE: CoverTarget = CoverTarget {
    position: 60,
    tilt: 30,
};

/// Default [`EnergyStrategy`] keyed on facing and season.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalEnergyStrategy;

impl SeasonalEnergyStrategy {
    fn sun_side(facing: Option<Facing>) -> bool {
        !matches!(
            facing,
            None | Some(Facing::North | Facing::NorthEast | Facing::NorthWest)
        )
    }

    fn south_side(facing: Option<Facing>) -> bool {
        matches!(
            facing,
            Some(Facing::South | Facing::SouthEast | Facing::SouthWest)
        )
    }
}

impl EnergyStrategy for SeasonalEnergyStrategy {
    fn recommend(&self, facing: Option<Facing>, season: Season, is_daylight: bool) -> CoverTarget {
        match (season, is_daylight) {
            // summer nights: let the house cool down
            (Season::Summer, false) => CoverTarget::OPEN,
            (_, false) => CoverTarget::CLOSED,
            (Season::Summer, true) if Self::sun_side(facing) => SUMMER_SHADE,
            (Season::Spring | Season::Autumn, true) if Self::south_side(facing) => {
                MID_SEASON_SHADE
            }
            (_, true) => CoverTarget::OPEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_shade_sun_side_in_summer() {
        let strategy = SeasonalEnergyStrategy;
        assert_eq!(
            strategy.recommend(Some(Facing::West), Season::Summer, true),
            SUMMER_SHADE
        );
        assert_eq!(
            strategy.recommend(Some(Facing::North), Season::Summer, true),
            CoverTarget::OPEN
        );
    }

    #[test]
    fn should_open_for_solar_gain_in_winter() {
        let strategy = SeasonalEnergyStrategy;
        assert_eq!(
            strategy.recommend(Some(Facing::South), Season::Winter, true),
            CoverTarget::OPEN
        );
    }

    #[test]
    fn should_insulate_at_night_outside_summer() {
        let strategy = SeasonalEnergyStrategy;
        assert_eq!(
            strategy.recommend(Some(Facing::South), Season::Winter, false),
            CoverTarget::CLOSED
        );
        assert_eq!(
            strategy.recommend(Some(Facing::South), Season::Summer, false),
            CoverTarget::OPEN
        );
    }

    #[test]
    fn should_partially_shade_south_in_mid_season() {
        let strategy = SeasonalEnergyStrategy;
        assert_eq!(
            strategy.recommend(Some(Facing::SouthWest), Season::Autumn, true),
            MID_SEASON_SHADE
        );
        assert_eq!(
            strategy.recommend(Some(Facing::East), Season::Spring, true),
            CoverTarget::OPEN
        );
    }
}
