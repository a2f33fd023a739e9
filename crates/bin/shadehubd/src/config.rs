//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `shadehub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use shadehub_app::actuator::ActuatorSettings;
use shadehub_app::runtime::CycleIntervals;
use shadehub_app::state::{HomeState, HomeStateBuilder};
use shadehub_domain::automation::{
    AutomationRule, Comparison, RuleAction, RuleTrigger, TargetSelector,
};
use shadehub_domain::device::{CoverTarget, Device, DeviceKind, Facing};
use shadehub_domain::error::ShadeHubError;
use shadehub_domain::id::DeviceId;
use shadehub_domain::schedule::{Schedule, ScheduleAction, ScheduleTrigger};
use shadehub_domain::solar::GeoLocation;
use shadehub_domain::time::{DayPeriod, LocalTimeRule, Season, Timestamp, WeekdaySet};
use shadehub_domain::weather::SafetyThresholds;
use shadehub_domain::zone::Zone;

/// Upper bound for any configured motor duration.
const MAX_ACTUATOR_SECS: f64 = 3600.0;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Where the home is and how local time is derived.
    pub location: LocationConfig,
    /// Period of each background cycle.
    pub cycles: CyclesConfig,
    /// Weather limits for the safety interlock.
    pub safety: SafetyThresholds,
    /// Motor timing and maintenance bookkeeping.
    pub actuator: ActuatorConfig,
    /// Rule engine tuning.
    pub automation: AutomationConfig,
    pub devices: Vec<DeviceConfig>,
    pub zones: Vec<Zone>,
    pub schedules: Vec<ScheduleConfig>,
    pub rules: Vec<RuleConfig>,
    pub favorites: Vec<FavoriteConfig>,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Standard (winter) offset from UTC in minutes.
    pub utc_offset_minutes: i32,
    /// Apply the European summer time rule.
    pub summer_time: bool,
}

/// Cycle periods in seconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CyclesConfig {
    pub ephemeris_secs: u64,
    pub schedules_secs: u64,
    pub rules_secs: u64,
    pub safety_secs: u64,
    pub statistics_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub full_travel_secs: f64,
    pub tilt_travel_secs: f64,
    pub calibration_secs: f64,
    /// Battery percentage used per movement.
    pub battery_drain_per_move: f64,
    pub battery_low_threshold: f64,
    pub motor_cycle_alerts: Vec<u64>,
    /// Number of position log entries kept in memory.
    pub log_capacity: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Estimated lux per degree of sun elevation when no sensor reports.
    pub lux_per_degree: f64,
    /// Force a season instead of deriving it from the date.
    pub season: Option<Season>,
}

/// One `[[devices]]` entry.
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    pub name: Option<String>,
    pub room: String,
    #[serde(default = "default_kind")]
    pub kind: DeviceKind,
    pub facing: Option<Facing>,
    #[serde(default)]
    pub exterior: bool,
    #[serde(default)]
    pub street_facing: bool,
    #[serde(default)]
    pub position: u8,
    #[serde(default)]
    pub tilt: u8,
}

/// One `[[schedules]]` entry.
#[derive(Debug, Deserialize)]
pub struct ScheduleConfig {
    pub name: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub weekdays: WeekdaySet,
    pub trigger: ScheduleTrigger,
    pub actions: Vec<ScheduleAction>,
}

/// One `[[rules]]` entry.
#[derive(Debug, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub trigger: RuleTrigger,
    pub comparison: Comparison,
    #[serde(default)]
    pub threshold: f64,
    pub target: TargetSelector,
    pub action: RuleAction,
    #[serde(default)]
    pub cooldown_minutes: u32,
    pub season: Option<Season>,
}

/// One `[[favorites]]` entry.
#[derive(Debug, Deserialize)]
pub struct FavoriteConfig {
    pub device: String,
    pub period: DayPeriod,
    pub position: u8,
    #[serde(default)]
    pub tilt: u8,
}

fn default_kind() -> DeviceKind {
    DeviceKind::RollerBlind
}

fn enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from `shadehub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting values fail validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("shadehub.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SHADEHUB_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("SHADEHUB_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("SHADEHUB_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("SHADEHUB_LATITUDE") {
            if let Ok(latitude) = val.parse() {
                self.location.latitude = latitude;
            }
        }
        if let Ok(val) = std::env::var("SHADEHUB_LONGITUDE") {
            if let Ok(longitude) = val.parse() {
                self.location.longitude = longitude;
            }
        }
        if let Ok(val) = std::env::var("SHADEHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        let periods = [
            self.cycles.ephemeris_secs,
            self.cycles.schedules_secs,
            self.cycles.rules_secs,
            self.cycles.safety_secs,
            self.cycles.statistics_secs,
        ];
        if periods.contains(&0) {
            return Err(ConfigError::Validation(
                "cycle periods must be non-zero".to_string(),
            ));
        }
        let travel = [
            self.actuator.full_travel_secs,
            self.actuator.tilt_travel_secs,
            self.actuator.calibration_secs,
        ];
        if travel
            .iter()
            .any(|secs| !(0.0..=MAX_ACTUATOR_SECS).contains(secs))
        {
            return Err(ConfigError::Validation(format!(
                "actuator durations must be between 0 and {MAX_ACTUATOR_SECS} seconds"
            )));
        }
        let battery = [
            self.actuator.battery_drain_per_move,
            self.actuator.battery_low_threshold,
        ];
        if battery.iter().any(|level| !(0.0..=100.0).contains(level)) {
            return Err(ConfigError::Validation(
                "battery settings must be percentages between 0 and 100".to_string(),
            ));
        }
        self.validate_safety()?;
        if !self.automation.lux_per_degree.is_finite() || self.automation.lux_per_degree < 0.0 {
            return Err(ConfigError::Validation(
                "lux_per_degree must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_safety(&self) -> Result<(), ConfigError> {
        let safety = &self.safety;
        let limits = [
            safety.high_wind_speed,
            safety.storm_retract_speed,
            safety.heavy_rain_intensity,
        ];
        if limits.iter().any(|limit| !limit.is_finite() || *limit < 0.0) {
            return Err(ConfigError::Validation(
                "safety limits must be finite and non-negative".to_string(),
            ));
        }
        if !safety.frost_temperature.is_finite() {
            return Err(ConfigError::Validation(
                "frost temperature must be finite".to_string(),
            ));
        }
        if safety.storm_retract_speed < safety.high_wind_speed {
            return Err(ConfigError::Validation(
                "storm_retract_speed must not be below high_wind_speed".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn cycle_intervals(&self) -> CycleIntervals {
        CycleIntervals {
            ephemeris: Duration::from_secs(self.cycles.ephemeris_secs),
            schedules: Duration::from_secs(self.cycles.schedules_secs),
            rules: Duration::from_secs(self.cycles.rules_secs),
            safety: Duration::from_secs(self.cycles.safety_secs),
            statistics: Duration::from_secs(self.cycles.statistics_secs),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when a duration cannot be
    /// represented.
    pub fn actuator_settings(&self) -> Result<ActuatorSettings, ConfigError> {
        Ok(ActuatorSettings {
            full_travel: seconds(self.actuator.full_travel_secs)?,
            tilt_travel: seconds(self.actuator.tilt_travel_secs)?,
            calibration: seconds(self.actuator.calibration_secs)?,
            battery_drain_per_move: self.actuator.battery_drain_per_move,
            battery_low_threshold: self.actuator.battery_low_threshold,
            motor_cycle_alerts: self.actuator.motor_cycle_alerts.clone(),
            log_capacity: self.actuator.log_capacity,
        })
    }

    /// Build the in-memory home from the configured inventory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for out-of-range settings and
    /// [`ConfigError::Domain`] when a device, zone, schedule, rule or the
    /// location fails validation.
    pub fn build_state(&self, now: Timestamp) -> Result<HomeState, ConfigError> {
        self.validate()?;
        let location = GeoLocation::new(self.location.latitude, self.location.longitude)?;
        let mut builder = HomeState::builder()
            .location(location)
            .local_time(LocalTimeRule::new(
                self.location.utc_offset_minutes,
                self.location.summer_time,
            ))
            .actuator_settings(self.actuator_settings()?)
            .safety_thresholds(self.safety)
            .lux_per_degree(self.automation.lux_per_degree)
            .season_override(self.automation.season);

        for device in &self.devices {
            builder = builder.device(device.to_device()?);
        }
        for zone in &self.zones {
            builder = builder.zone(zone.clone());
        }
        for schedule in &self.schedules {
            builder = builder.schedule(schedule.to_schedule()?);
        }
        for rule in &self.rules {
            builder = builder.rule(rule.to_rule()?);
        }
        builder = self.favorites.iter().fold(builder, add_favorite);

        Ok(builder.build(now)?)
    }
}

fn seconds(secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|err| ConfigError::Validation(format!("invalid duration {secs}: {err}")))
}

fn add_favorite(builder: HomeStateBuilder, favorite: &FavoriteConfig) -> HomeStateBuilder {
    builder.favorite(
        DeviceId::new(favorite.device.clone()),
        favorite.period,
        CoverTarget::clamped(favorite.position, favorite.tilt),
    )
}

impl DeviceConfig {
    fn to_device(&self) -> Result<Device, ShadeHubError> {
        let mut builder = Device::builder()
            .id(self.id.as_str())
            .room(self.room.as_str())
            .kind(self.kind)
            .exterior(self.exterior)
            .street_facing(self.street_facing)
            .position(self.position)
            .tilt(self.tilt);
        if let Some(name) = &self.name {
            builder = builder.name(name.as_str());
        }
        if let Some(facing) = self.facing {
            builder = builder.facing(facing);
        }
        builder.build()
    }
}

impl ScheduleConfig {
    fn to_schedule(&self) -> Result<Schedule, ShadeHubError> {
        self.actions
            .iter()
            .cloned()
            .fold(
                Schedule::builder()
                    .name(self.name.as_str())
                    .enabled(self.enabled)
                    .weekdays(self.weekdays)
                    .trigger(self.trigger),
                |builder, action| builder.action(action),
            )
            .build()
    }
}

impl RuleConfig {
    fn to_rule(&self) -> Result<AutomationRule, ShadeHubError> {
        let mut builder = AutomationRule::builder()
            .name(self.name.as_str())
            .enabled(self.enabled)
            .when(self.trigger, self.comparison, self.threshold)
            .target(self.target.clone())
            .action(self.action)
            .cooldown_minutes(self.cooldown_minutes);
        if let Some(season) = self.season {
            builder = builder.season(season);
        }
        builder.build()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "shadehubd=info,shadehub_app=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: 48.8566,
            longitude: 2.3522,
            utc_offset_minutes: 60,
            summer_time: true,
        }
    }
}

impl Default for CyclesConfig {
    fn default() -> Self {
        let defaults = CycleIntervals::default();
        Self {
            ephemeris_secs: defaults.ephemeris.as_secs(),
            schedules_secs: defaults.schedules.as_secs(),
            rules_secs: defaults.rules.as_secs(),
            safety_secs: defaults.safety.as_secs(),
            statistics_secs: defaults.statistics.as_secs(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        let defaults = ActuatorSettings::default();
        Self {
            full_travel_secs: defaults.full_travel.as_secs_f64(),
            tilt_travel_secs: defaults.tilt_travel.as_secs_f64(),
            calibration_secs: defaults.calibration.as_secs_f64(),
            battery_drain_per_move: defaults.battery_drain_per_move,
            battery_low_threshold: defaults.battery_low_threshold,
            motor_cycle_alerts: defaults.motor_cycle_alerts,
            log_capacity: defaults.log_capacity,
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            lux_per_degree: shadehub_app::rule_engine::DEFAULT_LUX_PER_DEGREE,
            season: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// Inventory rejected by the domain.
    #[error("invalid home inventory: {0}")]
    Domain(#[from] ShadeHubError),
}
