//! Weather input and the hazards the safety interlock reacts to.

use serde::{Deserialize, Serialize};

use crate::device::{CoverTarget, Device};
use crate::error::ValidationError;
use crate::time::Timestamp;

/// A weather push from an outside source. Missing wind and rain count as calm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    /// km/h
    #[serde(default)]
    pub wind_speed: f64,
    /// km/h
    #[serde(default)]
    pub wind_gust: f64,
    /// mm/h
    #[serde(default)]
    pub rain_intensity: f64,
}

impl WeatherReading {
    /// Reject negative or non-finite wind and rain values.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidReading`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("wind_speed", self.wind_speed),
            ("wind_gust", self.wind_gust),
            ("rain_intensity", self.rain_intensity),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidReading(name));
            }
        }
        Ok(())
    }
}

/// Latest known weather.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherState {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: f64,
    pub wind_gust: f64,
    pub rain_intensity: f64,
    pub updated_at: Option<Timestamp>,
}

impl WeatherState {
    /// Replace the state with a new reading.
    pub fn apply(&mut self, reading: WeatherReading, at: Timestamp) {
        *self = Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            wind_speed: reading.wind_speed.max(0.0),
            wind_gust: reading.wind_gust.max(0.0),
            rain_intensity: reading.rain_intensity.max(0.0),
            updated_at: Some(at),
        };
    }

    /// The stronger of sustained wind and gust.
    #[must_use]
    pub fn peak_wind(&self) -> f64 {
        self.wind_speed.max(self.wind_gust)
    }

    /// Active hazards, most urgent first.
    ///
    /// High wind and storm are mutually exclusive: storm replaces high wind.
    #[must_use]
    pub fn hazards(&self, thresholds: &SafetyThresholds) -> Vec<Hazard> {
        let mut hazards = Vec::new();
        let wind = self.peak_wind();
        if wind >= thresholds.storm_retract_speed {
            hazards.push(Hazard::Storm);
        } else if wind >= thresholds.high_wind_speed {
            hazards.push(Hazard::HighWind);
        }
        if self.rain_intensity >= thresholds.heavy_rain_intensity {
            hazards.push(Hazard::HeavyRain);
        }
        if self
            .temperature
            .is_some_and(|t| t <= thresholds.frost_temperature)
        {
            hazards.push(Hazard::Frost);
        }
        hazards
    }
}

/// Limits above which the safety interlock takes over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyThresholds {
    /// km/h
    pub high_wind_speed: f64,
    /// km/h
    pub storm_retract_speed: f64,
    /// mm/h
    pub heavy_rain_intensity: f64,
    /// °C
    pub frost_temperature: f64,
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self {
            high_wind_speed: 50.0,
            storm_retract_speed: 75.0,
            heavy_rain_intensity: 10.0,
            frost_temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hazard {
    HighWind,
    Storm,
    HeavyRain,
    Frost,
}

impl Hazard {
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::Storm => Severity::Severe,
            Self::HighWind | Self::HeavyRain | Self::Frost => Severity::Warning,
        }
    }

    /// Wind and frost threaten exterior coverings; heavy rain also
    /// threatens skylights.
    #[must_use]
    pub fn affects(self, device: &Device) -> bool {
        match self {
            Self::HighWind | Self::Storm | Self::Frost => device.is_exterior,
            Self::HeavyRain => device.is_exterior || device.is_skylight(),
        }
    }

    /// Every hazard retracts or closes fully.
    #[must_use]
    pub fn secured_target(self) -> CoverTarget {
        CoverTarget::CLOSED
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::HighWind => "high_wind",
            Self::Storm => "storm",
            Self::HeavyRain => "heavy_rain",
            Self::Frost => "frost",
        }
    }
}

impl std::fmt::Display for Hazard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;

    #[test]
    fn should_reject_negative_wind_reading() {
        let reading = WeatherReading {
            wind_gust: -3.0,
            ..WeatherReading::default()
        };
        assert_eq!(
            reading.validate(),
            Err(ValidationError::InvalidReading("wind_gust"))
        );
        assert!(WeatherReading::default().validate().is_ok());
    }

    fn state(wind: f64, gust: f64, rain: f64, temperature: Option<f64>) -> WeatherState {
        let mut state = WeatherState::default();
        state.apply(
            WeatherReading {
                temperature,
                humidity: None,
                wind_speed: wind,
                wind_gust: gust,
                rain_intensity: rain,
            },
            crate::time::now(),
        );
        state
    }

    #[test]
    fn should_report_no_hazard_in_calm_weather() {
        let hazards = state(10.0, 20.0, 0.0, Some(18.0)).hazards(&SafetyThresholds::default());
        assert!(hazards.is_empty());
    }

    #[test]
    fn should_use_gust_when_stronger_than_sustained_wind() {
        let hazards = state(30.0, 55.0, 0.0, None).hazards(&SafetyThresholds::default());
        assert_eq!(hazards, vec![Hazard::HighWind]);
    }

    #[test]
    fn should_escalate_high_wind_to_storm() {
        let hazards = state(80.0, 0.0, 0.0, None).hazards(&SafetyThresholds::default());
        assert_eq!(hazards, vec![Hazard::Storm]);
        assert_eq!(Hazard::Storm.severity(), Severity::Severe);
    }

    #[test]
    fn should_list_all_active_hazards_in_priority_order() {
        let hazards = state(60.0, 0.0, 12.0, Some(-2.0)).hazards(&SafetyThresholds::default());
        assert_eq!(
            hazards,
            vec![Hazard::HighWind, Hazard::HeavyRain, Hazard::Frost]
        );
    }

    #[test]
    fn should_trigger_at_exact_threshold() {
        let hazards = state(50.0, 0.0, 10.0, Some(0.0)).hazards(&SafetyThresholds::default());
        assert_eq!(
            hazards,
            vec![Hazard::HighWind, Hazard::HeavyRain, Hazard::Frost]
        );
    }

    #[test]
    fn should_affect_skylights_only_for_rain() {
        let skylight = Device::builder()
            .id("roof")
            .room("attic")
            .kind(DeviceKind::Skylight)
            .build()
            .unwrap();
        let exterior = Device::builder()
            .id("terrace")
            .room("living")
            .kind(DeviceKind::Awning)
            .exterior(true)
            .build()
            .unwrap();
        assert!(Hazard::HeavyRain.affects(&skylight));
        assert!(!Hazard::Storm.affects(&skylight));
        assert!(Hazard::Frost.affects(&exterior));
        assert!(Hazard::HighWind.affects(&exterior));
    }
}
