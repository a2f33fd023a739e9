//! Controller: the entry point adapters and periodic cycles call into.
//!
//! Owns the [`HomeState`] behind a mutex. Every operation mutates the state
//! synchronously, releases the lock, then publishes the collected events and
//! hands pending completions to the [`MotionTimer`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use shadehub_domain::automation::AutomationRule;
use shadehub_domain::device::{CoverTarget, Device};
use shadehub_domain::error::ShadeHubError;
use shadehub_domain::id::{DeviceId, RoomId, RuleId, ScheduleId, ZoneId};
use shadehub_domain::occupancy::OccupancyReading;
use shadehub_domain::schedule::Schedule;
use shadehub_domain::solar::{FacingExposure, SolarState};
use shadehub_domain::statistics::{
    ActuationReason, DeviceStatistics, MotionSource, PositionLogEntry,
};
use shadehub_domain::time::{now, Season, Timestamp};
use shadehub_domain::weather::{Hazard, WeatherReading, WeatherState};

use crate::actuator::{Actuation, CycleWrites, Outbox};
use crate::ports::{EnergyStrategy, EventPublisher, MotionTimer, PendingCompletion};
use crate::rule_engine::RuleCycle;
use crate::safety::SafetyReport;
use crate::state::{HomeState, TickReport};

/// Outcome of a single-device position command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionResult {
    pub device_id: DeviceId,
    pub position: u8,
    pub tilt: u8,
    pub actuation: Actuation,
}

/// Outcome of a zone position command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResult {
    pub zone_id: ZoneId,
    /// Devices that actually started moving.
    pub devices_affected: usize,
}

/// Ephemeris snapshot with the per-facing exposure summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarSnapshot {
    pub solar: SolarState,
    pub exposure: Vec<FacingExposure>,
    pub season: Season,
}

/// Current weather and the hazards it raises.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub weather: WeatherState,
    pub hazards: Vec<Hazard>,
}

pub struct Controller<P, E, T> {
    state: Mutex<HomeState>,
    publisher: P,
    energy: E,
    timer: T,
    clock: fn() -> Timestamp,
}

impl<P, E, T> Controller<P, E, T>
where
    P: EventPublisher,
    E: EnergyStrategy,
    T: MotionTimer,
{
    pub fn new(state: HomeState, publisher: P, energy: E, timer: T) -> Self {
        Self {
            state: Mutex::new(state),
            publisher,
            energy,
            timer,
            clock: now,
        }
    }

    /// Replace the wall clock read by commands and queries. Cycles always
    /// receive their instant from the caller.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> Timestamp) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> MutexGuard<'_, HomeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply<R>(&self, f: impl FnOnce(&mut HomeState, &mut Outbox) -> R) -> (R, Outbox) {
        let mut outbox = Outbox::default();
        let result = f(&mut self.lock(), &mut outbox);
        (result, outbox)
    }

    async fn flush(&self, outbox: Outbox) {
        for event in outbox.events {
            let event_type = event.event_type;
            if let Err(err) = self.publisher.publish(event).await {
                tracing::warn!(%event_type, error = %err, "failed to publish event");
            }
        }
        for completion in outbox.completions {
            self.timer.schedule(completion);
        }
    }

    /// Read the state without producing side effects.
    pub fn read<R>(&self, f: impl FnOnce(&HomeState) -> R) -> R {
        f(&self.lock())
    }

    // -- commands ----------------------------------------------------------

    /// Move one device. A missing `tilt` keeps the current one.
    ///
    /// The resulting position is remembered as the device's favorite for
    /// the current time of day.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::Validation`] for a position outside `0..=100`
    /// or a tilt outside `0..=90`, and [`ShadeHubError::NotFound`] for an
    /// unknown device. The device is left untouched in both cases.
    #[tracing::instrument(skip(self))]
    pub async fn set_position(
        &self,
        device_id: &DeviceId,
        position: i32,
        tilt: Option<i32>,
    ) -> Result<PositionResult, ShadeHubError> {
        let now = (self.clock)();
        let (result, outbox) = self.apply(|state, outbox| -> Result<_, ShadeHubError> {
            let current = state.device(device_id)?.current();
            let target = CoverTarget::new(position, tilt.unwrap_or(i32::from(current.tilt)))?;
            let actuation = state.actuator.set_device_position(
                device_id,
                target,
                &ActuationReason::manual(),
                now,
                outbox,
            )?;
            let reached = state.device(device_id)?.current();
            if matches!(actuation, Actuation::Moved { .. } | Actuation::Unchanged) {
                let period = state.day_period(now);
                state.favorites.remember(device_id.clone(), period, reached);
            }
            Ok(PositionResult {
                device_id: device_id.clone(),
                position: reached.position,
                tilt: reached.tilt,
                actuation,
            })
        });
        self.flush(outbox).await;
        result
    }

    /// Move every member of a zone. A missing `tilt` keeps each device's.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::Validation`] for an out-of-range position or
    /// tilt and [`ShadeHubError::NotFound`] for an unknown zone.
    #[tracing::instrument(skip(self))]
    pub async fn set_group_position(
        &self,
        zone_id: &ZoneId,
        position: i32,
        tilt: Option<i32>,
    ) -> Result<GroupResult, ShadeHubError> {
        let now = (self.clock)();
        let (result, outbox) = self.apply(|state, outbox| -> Result<_, ShadeHubError> {
            CoverTarget::new(position, tilt.unwrap_or(0))?;
            let members = state.zone(zone_id)?.devices.clone();
            let reason = ActuationReason::new(MotionSource::Group, zone_id.as_str());
            let mut devices_affected = 0;
            for device_id in members {
                let Some(current) = state.actuator.device(&device_id).map(Device::current) else {
                    tracing::warn!(zone_id = %zone_id, device_id = %device_id, "zone member missing");
                    continue;
                };
                let target = CoverTarget::new(position, tilt.unwrap_or(i32::from(current.tilt)))?;
                if state
                    .actuator
                    .set_device_position(&device_id, target, &reason, now, outbox)?
                    .moved()
                {
                    devices_affected += 1;
                }
            }
            Ok(GroupResult {
                zone_id: zone_id.clone(),
                devices_affected,
            })
        });
        self.flush(outbox).await;
        result
    }

    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown device.
    #[tracing::instrument(skip(self))]
    pub async fn calibrate(&self, device_id: &DeviceId) -> Result<Actuation, ShadeHubError> {
        let now = (self.clock)();
        let (result, outbox) =
            self.apply(|state, outbox| state.actuator.start_calibration(device_id, now, outbox));
        self.flush(outbox).await;
        result
    }

    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown device.
    #[tracing::instrument(skip(self))]
    pub fn set_device_online(
        &self,
        device_id: &DeviceId,
        online: bool,
    ) -> Result<Device, ShadeHubError> {
        let mut state = self.lock();
        state.actuator.set_online(device_id, online)?;
        state.device(device_id).cloned()
    }

    /// Apply a finished movement or calibration reported by the timer.
    pub async fn complete_motion(&self, completion: PendingCompletion) -> bool {
        let now = (self.clock)();
        let (applied, outbox) =
            self.apply(|state, outbox| state.actuator.complete(&completion, now, outbox));
        self.flush(outbox).await;
        applied
    }

    /// # Errors
    ///
    /// Returns a validation error for an invalid schedule or
    /// [`ShadeHubError::NotFound`] when it targets an unknown device or zone.
    #[tracing::instrument(skip(self, schedule), fields(schedule_name = %schedule.name))]
    pub fn add_schedule(&self, schedule: Schedule) -> Result<ScheduleId, ShadeHubError> {
        self.lock().add_schedule(schedule)
    }

    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown schedule.
    #[tracing::instrument(skip(self))]
    pub fn remove_schedule(&self, id: ScheduleId) -> Result<Schedule, ShadeHubError> {
        self.lock().scheduler.remove(id)
    }

    #[must_use]
    pub fn schedules(&self) -> Vec<Schedule> {
        self.read(|state| state.scheduler.list().to_vec())
    }

    /// # Errors
    ///
    /// Returns the rule's validation error.
    #[tracing::instrument(skip(self, rule), fields(rule_name = %rule.name))]
    pub fn add_rule(&self, rule: AutomationRule) -> Result<RuleId, ShadeHubError> {
        self.lock().add_rule(rule)
    }

    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown rule.
    #[tracing::instrument(skip(self))]
    pub fn remove_rule(&self, id: RuleId) -> Result<AutomationRule, ShadeHubError> {
        self.lock().rules.remove(id)
    }

    #[must_use]
    pub fn rules(&self) -> Vec<AutomationRule> {
        self.read(|state| state.rules.list().to_vec())
    }

    /// Store a weather push and run the safety interlock right away.
    #[tracing::instrument(skip(self))]
    pub async fn update_weather(&self, reading: WeatherReading) -> SafetyReport {
        let now = (self.clock)();
        let (report, outbox) = self.apply(|state, outbox| {
            state.weather.apply(reading, now);
            state.enforce_safety(now, &CycleWrites::new(), outbox)
        });
        self.flush(outbox).await;
        report
    }

    #[must_use]
    pub fn weather(&self) -> WeatherSnapshot {
        self.read(|state| WeatherSnapshot {
            weather: state.weather,
            hazards: state.safety.active().to_vec(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn update_occupancy(&self, reading: OccupancyReading) {
        self.lock().occupancy.insert(reading.room.clone(), reading);
    }

    /// Replace the light estimate with a measured lux value, or go back to
    /// the estimate with `None`.
    pub fn set_lux(&self, lux: Option<f64>) {
        self.lock().lux_override = lux.map(|l| l.max(0.0));
    }

    /// Pin the season, or derive it from the date again with `None`.
    pub fn set_season(&self, season: Option<Season>) {
        self.lock().season_override = season;
    }

    // -- queries -----------------------------------------------------------

    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        self.read(|state| state.actuator.devices().cloned().collect())
    }

    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown device.
    pub fn device(&self, id: &DeviceId) -> Result<Device, ShadeHubError> {
        self.read(|state| state.device(id).cloned())
    }

    /// Fresh ephemeris plus the exposure of each facing.
    #[must_use]
    pub fn solar_data(&self) -> SolarSnapshot {
        let now = (self.clock)();
        let mut state = self.lock();
        let solar = *state.refresh_solar(now);
        SolarSnapshot {
            exposure: solar.exposure_summary(),
            season: state.season(now),
            solar,
        }
    }

    #[must_use]
    pub fn statistics(&self, room: Option<&RoomId>) -> Vec<DeviceStatistics> {
        self.read(|state| state.actuator.statistics(room))
    }

    /// Most recent position log entries, newest first.
    #[must_use]
    pub fn recent_moves(&self, limit: usize) -> Vec<PositionLogEntry> {
        self.read(|state| state.actuator.log().recent(limit))
    }

    // -- cycles ------------------------------------------------------------

    pub fn refresh_ephemeris(&self, now: Timestamp) -> SolarState {
        let mut state = self.lock();
        let solar = *state.refresh_solar(now);
        tracing::debug!(
            elevation = solar.elevation,
            azimuth = solar.azimuth,
            regime = %solar.regime,
            "ephemeris refreshed"
        );
        solar
    }

    pub async fn evaluate_schedules(&self, now: Timestamp) -> CycleWrites {
        let (writes, outbox) = self.apply(|state, outbox| state.evaluate_schedules(now, outbox));
        self.flush(outbox).await;
        writes
    }

    pub async fn evaluate_rules(&self, now: Timestamp) -> RuleCycle {
        let (cycle, outbox) =
            self.apply(|state, outbox| state.evaluate_rules(now, &self.energy, outbox));
        self.flush(outbox).await;
        cycle
    }

    pub async fn run_safety_check(&self, now: Timestamp) -> SafetyReport {
        let (report, outbox) =
            self.apply(|state, outbox| state.enforce_safety(now, &CycleWrites::new(), outbox));
        self.flush(outbox).await;
        report
    }

    pub fn record_statistics(&self, now: Timestamp) {
        self.lock().record_statistics(now);
    }

    /// Every cycle once, in order, with safety last.
    pub async fn run_full_tick(&self, now: Timestamp) -> TickReport {
        let (report, outbox) =
            self.apply(|state, outbox| state.full_tick(now, &self.energy, outbox));
        self.flush(outbox).await;
        report
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use super::*;
    use crate::energy::SeasonalEnergyStrategy;
    use chrono::{TimeZone, Utc};
    use shadehub_domain::device::DeviceKind;
    use shadehub_domain::error::ValidationError;
    use shadehub_domain::event::{Event, EventType};
    use shadehub_domain::schedule::{ScheduleAction, ScheduleTarget, ScheduleTrigger};
    use shadehub_domain::solar::GeoLocation;
    use shadehub_domain::time::{ClockTime, DayPeriod, LocalTimeRule};
    use shadehub_domain::zone::Zone;

    struct SpyPublisher {
        events: Mutex<Vec<Event>>,
    }

    impl SpyPublisher {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        fn count(&self, event_type: EventType) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.event_type == event_type)
                .count()
        }
    }

    impl EventPublisher for SpyPublisher {
        fn publish(&self, event: Event) -> impl Future<Output = Result<(), ShadeHubError>> + Send {
            self.events.lock().unwrap().push(event);
            async { Ok(()) }
        }
    }

    struct ManualMotionTimer {
        pending: Mutex<Vec<PendingCompletion>>,
    }

    impl ManualMotionTimer {
        fn new() -> Self {
            Self {
                pending: Mutex::new(Vec::new()),
            }
        }

        fn drain(&self) -> Vec<PendingCompletion> {
            std::mem::take(&mut *self.pending.lock().unwrap())
        }
    }

    impl MotionTimer for ManualMotionTimer {
        fn schedule(&self, completion: PendingCompletion) {
            self.pending.lock().unwrap().push(completion);
        }
    }

    type TestController = Controller<SpyPublisher, SeasonalEnergyStrategy, ManualMotionTimer>;

    /// A Monday evening, UTC.
    fn fixed_now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 3, 19, 30, 0).unwrap()
    }

    fn controller() -> TestController {
        let state = HomeState::builder()
            .location(GeoLocation::new(48.85, 2.35).unwrap())
            .local_time(LocalTimeRule::UTC)
            .device(
                Device::builder()
                    .id("left")
                    .room("living")
                    .kind(DeviceKind::VenetianBlind)
                    .build()
                    .unwrap(),
            )
            .device(Device::builder().id("right").room("living").build().unwrap())
            .device(
                Device::builder()
                    .id("terrace")
                    .room("living")
                    .kind(DeviceKind::Awning)
                    .exterior(true)
                    .build()
                    .unwrap(),
            )
            .zone(
                Zone::new("living", "Living room")
                    .with_room("living")
                    .with_device("left")
                    .with_device("right"),
            )
            .build(fixed_now())
            .unwrap();
        Controller::new(
            state,
            SpyPublisher::new(),
            SeasonalEnergyStrategy,
            ManualMotionTimer::new(),
        )
        .with_clock(fixed_now)
    }

    fn id(s: &str) -> DeviceId {
        DeviceId::new(s)
    }

    fn cycles(controller: &TestController, device: &str) -> u64 {
        controller.device(&id(device)).unwrap().motor_cycle_count
    }

    #[tokio::test]
    async fn should_count_one_cycle_for_repeated_command() {
        let controller = controller();

        let first = controller.set_position(&id("left"), 40, Some(10)).await.unwrap();
        let second = controller.set_position(&id("left"), 40, Some(10)).await.unwrap();

        assert!(first.actuation.moved());
        assert_eq!(second.actuation, Actuation::Unchanged);
        assert_eq!(cycles(&controller, "left"), 1);
        assert_eq!(controller.publisher.count(EventType::PositionChanged), 1);
    }

    #[tokio::test]
    async fn should_reject_out_of_range_position_without_touching_device() {
        let controller = controller();

        let result = controller.set_position(&id("left"), -5, Some(200)).await;

        assert!(matches!(
            result,
            Err(ShadeHubError::Validation(ValidationError::PositionOutOfRange(-5)))
        ));
        let device = controller.device(&id("left")).unwrap();
        assert_eq!(device.position, 0);
        assert_eq!(device.tilt, 0);
        assert_eq!(device.motor_cycle_count, 0);
        assert!(controller.timer.drain().is_empty());
    }

    #[tokio::test]
    async fn should_keep_current_tilt_when_none_given() {
        let controller = controller();
        controller.set_position(&id("left"), 20, Some(30)).await.unwrap();
        let result = controller.set_position(&id("left"), 60, None).await.unwrap();
        assert_eq!(result.position, 60);
        assert_eq!(result.tilt, 30);
    }

    #[tokio::test]
    async fn should_debounce_repeated_group_command() {
        let controller = controller();
        let zone = ZoneId::new("living");

        let first = controller.set_group_position(&zone, 50, Some(0)).await.unwrap();
        let second = controller.set_group_position(&zone, 50, Some(0)).await.unwrap();

        assert_eq!(first.devices_affected, 2);
        assert_eq!(second.devices_affected, 0);
        assert_eq!(cycles(&controller, "left"), 1);
        assert_eq!(cycles(&controller, "right"), 1);
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_zone() {
        let controller = controller();
        let result = controller
            .set_group_position(&ZoneId::new("garage"), 50, None)
            .await;
        assert!(matches!(result, Err(ShadeHubError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_settle_motor_when_completion_arrives() {
        let controller = controller();
        controller.set_position(&id("right"), 100, None).await.unwrap();
        let pending = controller.timer.drain();
        assert_eq!(pending.len(), 1);

        assert!(controller.complete_motion(pending[0].clone()).await);
        let device = controller.device(&id("right")).unwrap();
        assert_eq!(device.motor_status, shadehub_domain::device::MotorStatus::Idle);
        assert_eq!(device.position, 100);
    }

    #[tokio::test]
    async fn should_calibrate_and_publish_completion() {
        let controller = controller();
        controller.set_position(&id("left"), 70, None).await.unwrap();
        controller.timer.drain();

        controller.calibrate(&id("left")).await.unwrap();
        let pending = controller.timer.drain();
        controller.complete_motion(pending[0].clone()).await;

        assert_eq!(controller.device(&id("left")).unwrap().position, 0);
        assert_eq!(controller.publisher.count(EventType::CalibrationStarted), 1);
        assert_eq!(controller.publisher.count(EventType::CalibrationCompleted), 1);
    }

    #[tokio::test]
    async fn should_leave_offline_device_untouched_when_calibration_finishes() {
        let controller = controller();
        controller.set_position(&id("left"), 70, Some(20)).await.unwrap();
        controller.timer.drain();
        controller.calibrate(&id("left")).await.unwrap();
        let pending = controller.timer.drain();

        controller.set_device_online(&id("left"), false).unwrap();
        assert!(!controller.complete_motion(pending[0].clone()).await);

        let device = controller.device(&id("left")).unwrap();
        assert_eq!(device.position, 70);
        assert_eq!(device.tilt, 20);
        assert_eq!(controller.publisher.count(EventType::CalibrationCompleted), 0);
    }

    #[tokio::test]
    async fn should_retract_immediately_on_weather_push() {
        let controller = controller();
        controller.set_position(&id("terrace"), 100, None).await.unwrap();

        let report = controller
            .update_weather(WeatherReading {
                wind_gust: 80.0,
                ..WeatherReading::default()
            })
            .await;

        assert_eq!(report.hazards, vec![Hazard::Storm]);
        assert_eq!(controller.device(&id("terrace")).unwrap().position, 0);
        assert_eq!(controller.publisher.count(EventType::WeatherAlertRetract), 1);
        assert_eq!(controller.weather().hazards, vec![Hazard::Storm]);
    }

    #[tokio::test]
    async fn should_end_full_tick_with_safety_as_last_writer() {
        let controller = controller();
        let eight = Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap();
        controller
            .add_schedule(
                Schedule::builder()
                    .name("open terrace")
                    .trigger(ScheduleTrigger::At {
                        time: ClockTime::from_hm(8, 0).unwrap(),
                    })
                    .action(ScheduleAction::new(
                        ScheduleTarget::Device(id("terrace")),
                        100,
                        0,
                    ))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        controller.lock().weather.apply(
            WeatherReading {
                wind_speed: 90.0,
                ..WeatherReading::default()
            },
            eight,
        );

        let report = controller.run_full_tick(eight).await;

        assert_eq!(report.schedule_writes.len(), 1);
        assert_eq!(controller.device(&id("terrace")).unwrap().position, 0);
        assert_eq!(controller.publisher.count(EventType::ScheduleApplied), 1);
    }

    #[tokio::test]
    async fn should_learn_favorite_from_manual_position() {
        let controller = controller();
        controller.set_position(&id("left"), 35, Some(15)).await.unwrap();
        let favorite =
            controller.read(|state| state.favorites.get(&id("left"), DayPeriod::Evening));
        assert_eq!(favorite, Some(CoverTarget::clamped(35, 15)));
        let morning =
            controller.read(|state| state.favorites.get(&id("left"), DayPeriod::Morning));
        assert_eq!(morning, None);
    }

    #[tokio::test]
    async fn should_filter_statistics_by_room() {
        let controller = controller();
        controller.set_position(&id("left"), 50, None).await.unwrap();
        controller.record_statistics(fixed_now());
        let stats = controller.statistics(Some(&RoomId::new("living")));
        assert_eq!(stats.len(), 3);
        assert!(controller.statistics(Some(&RoomId::new("attic"))).is_empty());
        assert_eq!(controller.recent_moves(10).len(), 1);
    }

    #[test]
    fn should_reject_schedule_for_unknown_device() {
        let controller = controller();
        let schedule = Schedule::builder()
            .name("ghost")
            .action(ScheduleAction::new(ScheduleTarget::Device(id("ghost")), 0, 0))
            .build()
            .unwrap();
        assert!(matches!(
            controller.add_schedule(schedule),
            Err(ShadeHubError::NotFound(_))
        ));
        assert!(controller.schedules().is_empty());
    }
}
