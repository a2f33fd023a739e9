//! Solar ephemeris: sun position and day boundaries for a place and instant.
//!
//! Uses Spencer's (1971) Fourier series for declination and the equation of
//! time. Precision is around 0.01° for declination, which is plenty for
//! minute-level actuation decisions.

use std::f64::consts::PI;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::device::Facing;
use crate::error::{ShadeHubError, ValidationError};
use crate::time::{ClockTime, LocalTimeRule, Timestamp};

/// Observer position in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    /// # Errors
    ///
    /// Returns [`ValidationError::LatitudeOutOfRange`] or
    /// [`ValidationError::LongitudeOutOfRange`] for coordinates off the globe.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ShadeHubError> {
        let location = Self {
            latitude,
            longitude,
        };
        location.validate()?;
        Ok(location)
    }

    /// # Errors
    ///
    /// See [`GeoLocation::new`].
    pub fn validate(&self) -> Result<(), ShadeHubError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::LatitudeOutOfRange(self.latitude).into());
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::LongitudeOutOfRange(self.longitude).into());
        }
        Ok(())
    }
}

/// Whether the sun rises and sets on the computed day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaylightRegime {
    Normal,
    /// The sun never sets.
    MidnightSun,
    /// The sun never rises.
    PolarNight,
}

impl std::fmt::Display for DaylightRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::MidnightSun => "midnight_sun",
            Self::PolarNight => "polar_night",
        })
    }
}

/// Sun position and day boundaries at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarState {
    /// Degrees clockwise from north, `0..360`.
    pub azimuth: f64,
    /// Degrees above the horizon, `-90..=90`.
    pub elevation: f64,
    pub is_daylight: bool,
    pub sunrise: Option<ClockTime>,
    pub sunset: Option<ClockTime>,
    pub solar_noon: Option<ClockTime>,
    pub regime: DaylightRegime,
    pub computed_at: Timestamp,
}

/// Compute the solar state for `location` at `at`.
///
/// Sunrise, sunset and solar noon are local clock times per `local`. During
/// polar night they are all `None`; during midnight sun sunrise is `00:00`
/// and sunset `24:00`.
#[must_use]
pub fn compute(location: GeoLocation, at: Timestamp, local: &LocalTimeRule) -> SolarState {
    let day_of_year = f64::from(at.ordinal());
    let b = 2.0 * PI * (day_of_year - 1.0) / 365.0;

    let declination = 0.006_918 - 0.399_912 * b.cos() + 0.070_257 * b.sin()
        - 0.006_758 * (2.0 * b).cos()
        + 0.000_907 * (2.0 * b).sin()
        - 0.002_697 * (3.0 * b).cos()
        + 0.001_48 * (3.0 * b).sin();

    let equation_of_time = 229.18
        * (0.000_075 + 0.001_868 * b.cos()
            - 0.032_077 * b.sin()
            - 0.014_615 * (2.0 * b).cos()
            - 0.040_849 * (2.0 * b).sin());

    let utc_hours = f64::from(chrono::Timelike::num_seconds_from_midnight(&at)) / 3600.0;
    let solar_time = utc_hours + location.longitude / 15.0 + equation_of_time / 60.0;
    let hour_angle = ((solar_time - 12.0) * 15.0).to_radians();

    let lat = location.latitude.to_radians();
    let sin_elevation =
        lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.cos();
    let elevation = sin_elevation.clamp(-1.0, 1.0).asin();

    let denominator = lat.cos() * elevation.cos();
    let mut azimuth = if denominator.abs() < 1e-9 {
        180.0
    } else {
        ((declination.sin() - lat.sin() * elevation.sin()) / denominator)
            .clamp(-1.0, 1.0)
            .acos()
            .to_degrees()
    };
    if hour_angle > 0.0 {
        azimuth = 360.0 - azimuth;
    }
    let azimuth = azimuth.rem_euclid(360.0);

    let elevation = elevation.to_degrees();
    let offset_hours = f64::from(local.offset(at).local_minus_utc()) / 3600.0;
    let noon_utc = 12.0 - location.longitude / 15.0 - equation_of_time / 60.0;
    let to_local = |utc: f64| ClockTime::from_hours_wrapping(utc + offset_hours);

    let cos_h0 = -lat.tan() * declination.tan();
    let (regime, sunrise, sunset, solar_noon) = if cos_h0 > 1.0 {
        (DaylightRegime::PolarNight, None, None, None)
    } else if cos_h0 < -1.0 {
        (
            DaylightRegime::MidnightSun,
            Some(ClockTime::MIDNIGHT),
            Some(ClockTime::END_OF_DAY),
            Some(to_local(noon_utc)),
        )
    } else {
        let half_day_hours = cos_h0.acos().to_degrees() / 15.0;
        (
            DaylightRegime::Normal,
            Some(to_local(noon_utc - half_day_hours)),
            Some(to_local(noon_utc + half_day_hours)),
            Some(to_local(noon_utc)),
        )
    };

    SolarState {
        azimuth,
        elevation,
        is_daylight: elevation > 0.0,
        sunrise,
        sunset,
        solar_noon,
        regime,
        computed_at: at,
    }
}

impl SolarState {
    /// Direct-beam incidence on a vertical window with the given facing.
    ///
    /// `cos(elevation) · cos(azimuth − facing)`, floored at zero, and zero
    /// while the sun is below the horizon.
    #[must_use]
    pub fn exposure(&self, facing: Facing) -> f64 {
        if !self.is_daylight {
            return 0.0;
        }
        let relative = (self.azimuth - facing.azimuth()).to_radians();
        (self.elevation.to_radians().cos() * relative.cos()).max(0.0)
    }

    /// Exposure factor for each of the eight facings.
    #[must_use]
    pub fn exposure_summary(&self) -> Vec<FacingExposure> {
        Facing::ALL
            .into_iter()
            .map(|facing| {
                let factor = self.exposure(facing);
                FacingExposure {
                    facing,
                    factor,
                    exposed: factor > 0.0,
                }
            })
            .collect()
    }
}

/// One row of [`SolarState::exposure_summary`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacingExposure {
    pub facing: Facing,
    pub factor: f64,
    pub exposed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn paris() -> GeoLocation {
        GeoLocation::new(48.85, 2.35).unwrap()
    }

    #[test]
    fn should_reject_coordinates_off_the_globe() {
        assert!(matches!(
            GeoLocation::new(91.0, 0.0),
            Err(ShadeHubError::Validation(ValidationError::LatitudeOutOfRange(_)))
        ));
        assert!(matches!(
            GeoLocation::new(0.0, -181.0),
            Err(ShadeHubError::Validation(ValidationError::LongitudeOutOfRange(_)))
        ));
    }

    #[test]
    fn should_place_sun_high_and_south_at_midday_in_summer() {
        let at = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        let state = compute(paris(), at, &LocalTimeRule::UTC);
        assert!(state.is_daylight);
        assert!(state.elevation > 60.0 && state.elevation < 66.0, "{}", state.elevation);
        assert!(state.azimuth > 160.0 && state.azimuth < 200.0, "{}", state.azimuth);
        assert_eq!(state.regime, DaylightRegime::Normal);
    }

    #[test]
    fn should_report_night_below_horizon() {
        let at = Utc.with_ymd_and_hms(2024, 12, 21, 0, 0, 0).unwrap();
        let state = compute(paris(), at, &LocalTimeRule::UTC);
        assert!(!state.is_daylight);
        assert!(state.elevation < 0.0);
        assert!(state.exposure(Facing::South).abs() < f64::EPSILON);
    }

    #[test]
    fn should_put_sunrise_before_noon_before_sunset() {
        let at = Utc.with_ymd_and_hms(2024, 3, 20, 9, 0, 0).unwrap();
        let state = compute(paris(), at, &LocalTimeRule::UTC);
        let sunrise = state.sunrise.unwrap();
        let noon = state.solar_noon.unwrap();
        let sunset = state.sunset.unwrap();
        assert!(sunrise < noon && noon < sunset);
        // Equinox in Paris: roughly 05:50 to 18:00 UTC.
        assert!((5..=6).contains(&sunrise.hour()), "{sunrise}");
        assert!((17..=18).contains(&sunset.hour()), "{sunset}");
    }

    #[test]
    fn should_shift_day_boundaries_by_local_offset() {
        let at = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let utc = compute(paris(), at, &LocalTimeRule::UTC);
        let cest = compute(paris(), at, &LocalTimeRule::new(60, true));
        let shift = cest.sunrise.unwrap().minute_of_day() - utc.sunrise.unwrap().minute_of_day();
        assert_eq!(shift, 120);
    }

    #[test]
    fn should_peak_elevation_at_solar_noon() {
        let location = paris();
        let day = Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap();
        let noon = compute(location, day, &LocalTimeRule::UTC).solar_noon.unwrap();
        let noon_at = day + Duration::minutes(i64::from(noon.minute_of_day()));
        let at_noon = compute(location, noon_at, &LocalTimeRule::UTC).elevation;

        let max_of_day = (0..24 * 60)
            .map(|minute| {
                compute(location, day + Duration::minutes(minute), &LocalTimeRule::UTC).elevation
            })
            .fold(f64::MIN, f64::max);
        assert!((max_of_day - at_noon).abs() <= 0.1, "{max_of_day} vs {at_noon}");
    }

    #[test]
    fn should_return_no_day_boundaries_during_polar_night() {
        let location = GeoLocation::new(70.0, 25.0).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 12, 21, 11, 0, 0).unwrap();
        let state = compute(location, at, &LocalTimeRule::UTC);
        assert_eq!(state.regime, DaylightRegime::PolarNight);
        assert!(state.sunrise.is_none());
        assert!(state.sunset.is_none());
        assert!(state.solar_noon.is_none());
    }

    #[test]
    fn should_span_whole_day_during_midnight_sun() {
        let location = GeoLocation::new(70.0, 25.0).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 6, 21, 23, 0, 0).unwrap();
        let state = compute(location, at, &LocalTimeRule::UTC);
        assert_eq!(state.regime, DaylightRegime::MidnightSun);
        assert_eq!(state.sunrise, Some(ClockTime::MIDNIGHT));
        assert_eq!(state.sunset, Some(ClockTime::END_OF_DAY));
        assert!(state.is_daylight);
    }

    #[test]
    fn should_expose_west_facing_windows_in_the_afternoon() {
        let at = Utc.with_ymd_and_hms(2024, 6, 21, 17, 0, 0).unwrap();
        let state = compute(paris(), at, &LocalTimeRule::UTC);
        assert!(state.azimuth > 180.0);
        assert!(state.exposure(Facing::West) > 0.0);
        assert!(state.exposure(Facing::East).abs() < f64::EPSILON);
        let summary = state.exposure_summary();
        assert_eq!(summary.len(), 8);
        assert!(summary.iter().any(|row| row.facing == Facing::West && row.exposed));
    }
}
