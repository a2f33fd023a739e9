//! Energy strategy port: picks a heat-managing position for one covering.

use shadehub_domain::device::{CoverTarget, Facing};
use shadehub_domain::time::Season;

/// Decides where a covering should sit to save heating or cooling energy.
///
/// Used by rules whose action is `compute_energy_position`.
pub trait EnergyStrategy {
    fn recommend(&self, facing: Option<Facing>, season: Season, is_daylight: bool) -> CoverTarget;
}

impl<T: EnergyStrategy + ?Sized> EnergyStrategy for std::sync::Arc<T> {
    fn recommend(&self, facing: Option<Facing>, season: Season, is_daylight: bool) -> CoverTarget {
        (**self).recommend(facing, season, is_daylight)
    }
}
