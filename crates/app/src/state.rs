//! Home state: the single owner of everything the cycles read and write.
//!
//! Each cycle borrows the state mutably for its whole run and collects side
//! effects in an [`Outbox`]. Device fields are only ever changed through the
//! [`Actuator`].

use std::collections::{BTreeMap, HashMap};

use shadehub_domain::automation::AutomationRule;
use shadehub_domain::device::{CoverTarget, Device};
use shadehub_domain::error::{NotFoundError, ShadeHubError, ValidationError};
use shadehub_domain::id::{DeviceId, RoomId, RuleId, ScheduleId, ZoneId};
use shadehub_domain::occupancy::OccupancyReading;
use shadehub_domain::schedule::{Schedule, ScheduleTarget};
use shadehub_domain::solar::{self, GeoLocation, SolarState};
use shadehub_domain::time::{ClockTime, DayPeriod, LocalTimeRule, Season, Timestamp};
use shadehub_domain::weather::{SafetyThresholds, WeatherState};
use shadehub_domain::zone::Zone;

use crate::actuator::{Actuator, ActuatorSettings, CycleWrites, Outbox};
use crate::favorites::Favorites;
use crate::ports::EnergyStrategy;
use crate::rule_engine::{RuleContext, RuleCycle, RuleEngine, DEFAULT_LUX_PER_DEGREE};
use crate::safety::{SafetyInterlock, SafetyReport};
use crate::scheduler::TriggerScheduler;

/// Summary of one full tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub schedule_writes: CycleWrites,
    pub rules: RuleCycle,
    pub safety: SafetyReport,
}

pub struct HomeState {
    pub actuator: Actuator,
    pub scheduler: TriggerScheduler,
    pub rules: RuleEngine,
    pub safety: SafetyInterlock,
    pub zones: BTreeMap<ZoneId, Zone>,
    pub favorites: Favorites,
    pub location: GeoLocation,
    pub local_time: LocalTimeRule,
    pub solar: SolarState,
    pub weather: WeatherState,
    pub occupancy: HashMap<RoomId, OccupancyReading>,
    pub lux_override: Option<f64>,
    pub season_override: Option<Season>,
}

impl HomeState {
    /// Create a builder for constructing a [`HomeState`].
    #[must_use]
    pub fn builder() -> HomeStateBuilder {
        HomeStateBuilder::default()
    }

    /// Recompute the ephemeris for `now`.
    pub fn refresh_solar(&mut self, now: Timestamp) -> &SolarState {
        self.solar = solar::compute(self.location, now, &self.local_time);
        &self.solar
    }

    /// The configured season, or the one derived from the local date and
    /// hemisphere.
    #[must_use]
    pub fn season(&self, now: Timestamp) -> Season {
        self.season_override.unwrap_or_else(|| {
            Season::for_date(
                self.local_time.to_local(now).date_naive(),
                self.location.latitude,
            )
        })
    }

    #[must_use]
    pub fn day_period(&self, now: Timestamp) -> DayPeriod {
        DayPeriod::of(ClockTime::of(&self.local_time.to_local(now)))
    }

    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown zone.
    pub fn zone(&self, id: &ZoneId) -> Result<&Zone, ShadeHubError> {
        self.zones.get(id).ok_or_else(|| {
            NotFoundError {
                entity: "Zone",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown device.
    pub fn device(&self, id: &DeviceId) -> Result<&Device, ShadeHubError> {
        self.actuator.device(id).ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Check that every device and zone a schedule names exists.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for the first unknown target.
    pub fn check_schedule_targets(&self, schedule: &Schedule) -> Result<(), ShadeHubError> {
        for action in &schedule.actions {
            match &action.target {
                ScheduleTarget::All => {}
                ScheduleTarget::Device(id) => {
                    self.device(id)?;
                }
                ScheduleTarget::Zone(id) => {
                    self.zone(id)?;
                }
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a validation error for an invalid schedule or
    /// [`ShadeHubError::NotFound`] when it targets an unknown device or zone.
    pub fn add_schedule(&mut self, schedule: Schedule) -> Result<ScheduleId, ShadeHubError> {
        self.check_schedule_targets(&schedule)?;
        self.scheduler.add(schedule)
    }

    /// # Errors
    ///
    /// Returns the rule's validation error.
    pub fn add_rule(&mut self, rule: AutomationRule) -> Result<RuleId, ShadeHubError> {
        self.rules.add(rule)
    }

    /// Schedule cycle. Re-asserts safety afterwards while a hazard is active.
    pub fn evaluate_schedules(&mut self, now: Timestamp, outbox: &mut Outbox) -> CycleWrites {
        self.refresh_solar(now);
        let local = self.local_time.to_local(now);
        let writes = self.scheduler.evaluate(
            now,
            &local,
            &self.solar,
            &self.zones,
            &mut self.actuator,
            outbox,
        );
        if self.safety.is_engaged() && !writes.is_empty() {
            self.enforce_safety(now, &writes, outbox);
        }
        writes
    }

    /// Rule cycle. Re-asserts safety afterwards while a hazard is active.
    pub fn evaluate_rules<E: EnergyStrategy>(
        &mut self,
        now: Timestamp,
        energy: &E,
        outbox: &mut Outbox,
    ) -> RuleCycle {
        self.refresh_solar(now);
        let season = self.season(now);
        let ctx = RuleContext {
            now,
            local_time: ClockTime::of(&self.local_time.to_local(now)),
            season,
            solar: &self.solar,
            weather: &self.weather,
            occupancy: &self.occupancy,
            lux: self.lux_override,
        };
        let cycle = self
            .rules
            .evaluate(&ctx, &mut self.actuator, &self.favorites, energy, outbox);
        if self.safety.is_engaged() && !cycle.writes.is_empty() {
            self.enforce_safety(now, &cycle.writes, outbox);
        }
        cycle
    }

    pub fn enforce_safety(
        &mut self,
        now: Timestamp,
        writes: &CycleWrites,
        outbox: &mut Outbox,
    ) -> SafetyReport {
        self.safety
            .enforce(&self.weather, &mut self.actuator, writes, now, outbox)
    }

    pub fn record_statistics(&mut self, now: Timestamp) {
        let date = self.local_time.to_local(now).date_naive();
        self.actuator.record_samples(date);
        tracing::debug!(%date, moves = self.actuator.log().len(), "statistics sampled");
    }

    /// Ephemeris, schedules, rules, then safety as the last writer, then
    /// statistics.
    pub fn full_tick<E: EnergyStrategy>(
        &mut self,
        now: Timestamp,
        energy: &E,
        outbox: &mut Outbox,
    ) -> TickReport {
        let schedule_writes = self.evaluate_schedules(now, outbox);
        let rules = self.evaluate_rules(now, energy, outbox);
        let mut writes = schedule_writes.clone();
        writes.extend(rules.writes.iter().map(|(k, v)| (k.clone(), v.clone())));
        let safety = self.enforce_safety(now, &writes, outbox);
        self.record_statistics(now);
        TickReport {
            schedule_writes,
            rules,
            safety,
        }
    }
}

/// Step-by-step builder for [`HomeState`].
#[derive(Debug, Default)]
pub struct HomeStateBuilder {
    location: Option<GeoLocation>,
    local_time: LocalTimeRule,
    actuator: ActuatorSettings,
    thresholds: SafetyThresholds,
    lux_per_degree: Option<f64>,
    season_override: Option<Season>,
    devices: Vec<Device>,
    zones: Vec<Zone>,
    schedules: Vec<Schedule>,
    rules: Vec<AutomationRule>,
    favorites: Vec<(DeviceId, DayPeriod, CoverTarget)>,
}

impl HomeStateBuilder {
    #[must_use]
    pub fn location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn local_time(mut self, rule: LocalTimeRule) -> Self {
        self.local_time = rule;
        self
    }

    #[must_use]
    pub fn actuator_settings(mut self, settings: ActuatorSettings) -> Self {
        self.actuator = settings;
        self
    }

    #[must_use]
    pub fn safety_thresholds(mut self, thresholds: SafetyThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn lux_per_degree(mut self, lux_per_degree: f64) -> Self {
        self.lux_per_degree = Some(lux_per_degree);
        self
    }

    #[must_use]
    pub fn season_override(mut self, season: Option<Season>) -> Self {
        self.season_override = season;
        self
    }

    #[must_use]
    pub fn device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    #[must_use]
    pub fn zone(mut self, zone: Zone) -> Self {
        self.zones.push(zone);
        self
    }

    #[must_use]
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedules.push(schedule);
        self
    }

    #[must_use]
    pub fn rule(mut self, rule: AutomationRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn favorite(
        mut self,
        device: DeviceId,
        period: DayPeriod,
        target: CoverTarget,
    ) -> Self {
        self.favorites.push((device, period, target));
        self
    }

    /// Build the state, computing the ephemeris for `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::Validation`] when the location is invalid, an
    /// id is duplicated, a zone names an unknown device, or a schedule or rule
    /// fails validation, and [`ShadeHubError::NotFound`] when a schedule or
    /// favorite targets an unknown device or zone.
    pub fn build(self, now: Timestamp) -> Result<HomeState, ShadeHubError> {
        let location = self.location.unwrap_or_default();
        location.validate()?;

        let mut actuator = Actuator::new(self.actuator);
        for device in self.devices {
            actuator.register(device)?;
        }

        let mut zones = BTreeMap::new();
        for zone in self.zones {
            zone.validate(|id| actuator.contains(id))?;
            if zones.contains_key(&zone.id) {
                return Err(ValidationError::DuplicateId(zone.id.to_string()).into());
            }
            zones.insert(zone.id.clone(), zone);
        }

        let mut favorites = Favorites::default();
        for (device, period, target) in self.favorites {
            let normalized = actuator
                .device(&device)
                .ok_or_else(|| NotFoundError {
                    entity: "Device",
                    id: device.to_string(),
                })?
                .normalize(target);
            favorites.remember(device, period, normalized);
        }

        let mut state = HomeState {
            actuator,
            scheduler: TriggerScheduler::default(),
            rules: RuleEngine::new(self.lux_per_degree.unwrap_or(DEFAULT_LUX_PER_DEGREE)),
            safety: SafetyInterlock::new(self.thresholds),
            zones,
            favorites,
            location,
            local_time: self.local_time,
            solar: solar::compute(location, now, &self.local_time),
            weather: WeatherState::default(),
            occupancy: HashMap::new(),
            lux_override: None,
            season_override: self.season_override,
        };
        for schedule in self.schedules {
            state.add_schedule(schedule)?;
        }
        for rule in self.rules {
            state.add_rule(rule)?;
        }
        Ok(state)
    }
}
