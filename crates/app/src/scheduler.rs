//! Trigger scheduler: fires clock and sun-relative schedules.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use shadehub_domain::error::{NotFoundError, ShadeHubError, ValidationError};
use shadehub_domain::event::{Event, EventType};
use shadehub_domain::id::{DeviceId, ScheduleId, ZoneId};
use shadehub_domain::schedule::{Readiness, Schedule, ScheduleTarget};
use shadehub_domain::solar::SolarState;
use shadehub_domain::statistics::{ActuationReason, MotionSource};
use shadehub_domain::time::Timestamp;
use shadehub_domain::zone::Zone;

use crate::actuator::{note_write, Actuator, CycleWrites, Outbox};

/// Schedules in insertion order.
#[derive(Debug, Default)]
pub struct TriggerScheduler {
    schedules: Vec<Schedule>,
}

impl TriggerScheduler {
    /// # Errors
    ///
    /// Returns the schedule's validation error, or
    /// [`ValidationError::DuplicateId`] when the id is already registered.
    pub fn add(&mut self, schedule: Schedule) -> Result<ScheduleId, ShadeHubError> {
        schedule.validate()?;
        if self.schedules.iter().any(|s| s.id == schedule.id) {
            return Err(ValidationError::DuplicateId(schedule.id.to_string()).into());
        }
        let id = schedule.id;
        tracing::info!(schedule_id = %id, name = %schedule.name, trigger = %schedule.trigger, "schedule added");
        self.schedules.push(schedule);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown id.
    pub fn remove(&mut self, id: ScheduleId) -> Result<Schedule, ShadeHubError> {
        let index = self
            .schedules
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| NotFoundError {
                entity: "Schedule",
                id: id.to_string(),
            })?;
        let removed = self.schedules.remove(index);
        tracing::info!(schedule_id = %id, name = %removed.name, "schedule removed");
        Ok(removed)
    }

    #[must_use]
    pub fn list(&self) -> &[Schedule] {
        &self.schedules
    }

    /// Fire every schedule due at `now`.
    ///
    /// Schedules run in insertion order; when two of them move the same device
    /// the later one wins.
    pub fn evaluate(
        &mut self,
        now: Timestamp,
        local_now: &DateTime<FixedOffset>,
        solar: &SolarState,
        zones: &BTreeMap<ZoneId, Zone>,
        actuator: &mut Actuator,
        outbox: &mut Outbox,
    ) -> CycleWrites {
        let mut writes = CycleWrites::new();
        for schedule in &mut self.schedules {
            match schedule.readiness(now, local_now, solar) {
                Readiness::Due => {}
                Readiness::NoSolarTime(regime) => {
                    tracing::debug!(
                        schedule_id = %schedule.id,
                        trigger = %schedule.trigger,
                        %regime,
                        "no sunrise or sunset today, schedule skipped"
                    );
                    continue;
                }
                Readiness::AlreadyFired => {
                    tracing::debug!(schedule_id = %schedule.id, "schedule already fired this minute");
                    continue;
                }
                Readiness::Disabled | Readiness::NotToday | Readiness::Waiting(_) => continue,
            }

            let reason = ActuationReason::new(MotionSource::Schedule, schedule.name.clone());
            let mut moved = Vec::new();
            for action in &schedule.actions {
                for device_id in resolve_target(&action.target, zones, actuator) {
                    match actuator.set_device_position(
                        &device_id,
                        action.cover_target(),
                        &reason,
                        now,
                        outbox,
                    ) {
                        Ok(result) if result.moved() => {
                            note_write(&mut writes, &device_id, &reason);
                            moved.push(device_id);
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::warn!(schedule_id = %schedule.id, device_id = %device_id, error = %err, "schedule action skipped");
                        }
                    }
                }
            }

            schedule.last_fired = Some(now);
            tracing::info!(
                schedule_id = %schedule.id,
                name = %schedule.name,
                trigger = %schedule.trigger,
                moved = moved.len(),
                "schedule fired"
            );
            outbox.event(Event::new(
                EventType::ScheduleApplied,
                None,
                serde_json::json!({
                    "schedule_id": schedule.id,
                    "name": schedule.name,
                    "trigger": schedule.trigger.to_string(),
                    "devices": moved,
                }),
                now,
            ));
        }
        writes
    }
}

/// Expand a schedule target into device ids. Unknown zones yield nothing.
pub(crate) fn resolve_target(
    target: &ScheduleTarget,
    zones: &BTreeMap<ZoneId, Zone>,
    actuator: &Actuator,
) -> Vec<DeviceId> {
    match target {
        ScheduleTarget::All => actuator.device_ids(),
        ScheduleTarget::Device(id) => vec![id.clone()],
        ScheduleTarget::Zone(id) => zones.get(id).map(|z| z.devices.clone()).unwrap_or_else(|| {
            tracing::warn!(zone_id = %id, "schedule targets unknown zone");
            Vec::new()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::ActuatorSettings;
    use chrono::{TimeZone, Utc};
    use shadehub_domain::device::Device;
    use shadehub_domain::schedule::{ScheduleAction, ScheduleTrigger};
    use shadehub_domain::solar::{compute, GeoLocation};
    use shadehub_domain::time::{ClockTime, LocalTimeRule};

    struct Fixture {
        scheduler: TriggerScheduler,
        actuator: Actuator,
        zones: BTreeMap<ZoneId, Zone>,
        location: GeoLocation,
    }

    impl Fixture {
        fn new(latitude: f64, longitude: f64) -> Self {
            let mut actuator = Actuator::new(ActuatorSettings::default());
            for id in ["a", "b"] {
                actuator
                    .register(Device::builder().id(id).room("living").build().unwrap())
                    .unwrap();
            }
            let zone = Zone::new("living", "Living").with_device("a").with_device("b");
            Self {
                scheduler: TriggerScheduler::default(),
                actuator,
                zones: BTreeMap::from([(zone.id.clone(), zone)]),
                location: GeoLocation::new(latitude, longitude).unwrap(),
            }
        }

        fn tick(&mut self, now: Timestamp) -> (CycleWrites, Outbox) {
            let local = LocalTimeRule::UTC.to_local(now);
            let solar = compute(self.location, now, &LocalTimeRule::UTC);
            let mut outbox = Outbox::default();
            let writes = self.scheduler.evaluate(
                now,
                &local,
                &solar,
                &self.zones,
                &mut self.actuator,
                &mut outbox,
            );
            (writes, outbox)
        }

        fn position(&self, id: &str) -> u8 {
            self.actuator.device(&DeviceId::new(id)).unwrap().position
        }
    }

    fn at_eight(target: ScheduleTarget, position: u8) -> Schedule {
        Schedule::builder()
            .name("morning")
            .trigger(ScheduleTrigger::At {
                time: ClockTime::from_hm(8, 0).unwrap(),
            })
            .action(ScheduleAction::new(target, position, 0))
            .build()
            .unwrap()
    }

    #[test]
    fn should_fire_once_within_the_same_minute() {
        let mut fixture = Fixture::new(48.85, 2.35);
        fixture
            .scheduler
            .add(at_eight(ScheduleTarget::All, 100))
            .unwrap();

        let first = Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 5).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 40).unwrap();
        let (_, outbox) = fixture.tick(first);
        let fired = outbox
            .events
            .iter()
            .filter(|e| e.event_type == EventType::ScheduleApplied)
            .count();
        assert_eq!(fired, 1);

        let (writes, outbox) = fixture.tick(second);
        assert!(writes.is_empty());
        assert!(outbox.events.is_empty());
        assert_eq!(fixture.scheduler.list()[0].last_fired, Some(first));
    }

    #[test]
    fn should_not_fire_outside_trigger_minute() {
        let mut fixture = Fixture::new(48.85, 2.35);
        fixture
            .scheduler
            .add(at_eight(ScheduleTarget::All, 100))
            .unwrap();
        let (writes, _) = fixture.tick(Utc.with_ymd_and_hms(2024, 6, 3, 8, 1, 0).unwrap());
        assert!(writes.is_empty());
        assert_eq!(fixture.position("a"), 0);
    }

    #[test]
    fn should_skip_days_outside_weekday_set() {
        let mut fixture = Fixture::new(48.85, 2.35);
        let mut schedule = at_eight(ScheduleTarget::All, 100);
        schedule.weekdays = shadehub_domain::time::WeekdaySet::WEEKEND;
        fixture.scheduler.add(schedule).unwrap();
        // 2024-06-03 is a Monday.
        let (writes, _) = fixture.tick(Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap());
        assert!(writes.is_empty());
    }

    #[test]
    fn should_fan_zone_target_out_to_members() {
        let mut fixture = Fixture::new(48.85, 2.35);
        fixture
            .scheduler
            .add(at_eight(ScheduleTarget::Zone(ZoneId::new("living")), 60))
            .unwrap();
        let (writes, _) = fixture.tick(Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap());
        assert_eq!(writes.len(), 2);
        assert_eq!(fixture.position("a"), 60);
        assert_eq!(fixture.position("b"), 60);
    }

    #[test]
    fn should_let_the_later_schedule_win_on_conflict() {
        let mut fixture = Fixture::new(48.85, 2.35);
        let a = DeviceId::new("a");
        let mut first = at_eight(ScheduleTarget::Device(a.clone()), 30);
        first.name = "first".into();
        let mut second = at_eight(ScheduleTarget::Device(a.clone()), 90);
        second.name = "second".into();
        fixture.scheduler.add(first).unwrap();
        fixture.scheduler.add(second).unwrap();

        let (writes, _) = fixture.tick(Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap());
        assert_eq!(fixture.position("a"), 90);
        assert_eq!(writes[&a].label, "second");
    }

    #[test]
    fn should_never_fire_sun_relative_schedule_during_polar_night() {
        let mut fixture = Fixture::new(70.0, 25.0);
        for trigger in [
            ScheduleTrigger::Sunrise { offset_minutes: 0 },
            ScheduleTrigger::Sunset { offset_minutes: 30 },
        ] {
            fixture
                .scheduler
                .add(
                    Schedule::builder()
                        .name(trigger.to_string())
                        .trigger(trigger)
                        .action(ScheduleAction::new(ScheduleTarget::All, 100, 0))
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }

        let start = Utc.with_ymd_and_hms(2024, 12, 21, 0, 0, 0).unwrap();
        for minute in 0..24 * 60 {
            let (writes, _) = fixture.tick(start + chrono::Duration::minutes(minute));
            assert!(writes.is_empty());
        }
        assert!(fixture.scheduler.list().iter().all(|s| s.last_fired.is_none()));
    }

    fn sun_schedule(trigger: ScheduleTrigger, position: u8) -> Schedule {
        Schedule::builder()
            .name(trigger.to_string())
            .trigger(trigger)
            .action(ScheduleAction::new(ScheduleTarget::All, position, 0))
            .build()
            .unwrap()
    }

    #[test]
    fn should_fire_sunset_schedule_at_midnight_during_midnight_sun() {
        let mut fixture = Fixture::new(70.0, 25.0);
        let day = Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let solar = compute(fixture.location, day, &LocalTimeRule::UTC);
        assert_eq!(solar.regime, shadehub_domain::solar::DaylightRegime::MidnightSun);
        assert_eq!(solar.sunset, Some(ClockTime::END_OF_DAY));
        fixture
            .scheduler
            .add(sun_schedule(ScheduleTrigger::Sunset { offset_minutes: 0 }, 40))
            .unwrap();

        let (writes, _) = fixture.tick(day + chrono::Duration::minutes(23 * 60 + 59));
        assert!(writes.is_empty());

        let (writes, outbox) = fixture.tick(day);
        assert_eq!(writes.len(), 2);
        assert_eq!(fixture.position("a"), 40);
        assert!(outbox
            .events
            .iter()
            .any(|e| e.event_type == EventType::ScheduleApplied));
    }

    #[test]
    fn should_resolve_sun_offsets_during_midnight_sun() {
        let mut fixture = Fixture::new(70.0, 25.0);
        fixture
            .scheduler
            .add(sun_schedule(ScheduleTrigger::Sunrise { offset_minutes: 15 }, 70))
            .unwrap();
        fixture
            .scheduler
            .add(sun_schedule(ScheduleTrigger::Sunset { offset_minutes: -60 }, 10))
            .unwrap();
        let day = Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();

        let mut fired = Vec::new();
        for minute in 0..24 * 60 {
            let (writes, _) = fixture.tick(day + chrono::Duration::minutes(minute));
            if !writes.is_empty() {
                fired.push((minute, fixture.position("a")));
            }
        }

        assert_eq!(fired, vec![(15, 70), (23 * 60, 10)]);
    }

    #[test]
    fn should_fire_at_sunrise_plus_offset() {
        let mut fixture = Fixture::new(48.85, 2.35);
        let day = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let solar = compute(fixture.location, day, &LocalTimeRule::UTC);
        let due = solar.sunrise.unwrap().offset_by(15);
        fixture
            .scheduler
            .add(
                Schedule::builder()
                    .name("after sunrise")
                    .trigger(ScheduleTrigger::Sunrise { offset_minutes: 15 })
                    .action(ScheduleAction::new(ScheduleTarget::All, 80, 0))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let at = day + chrono::Duration::minutes(i64::from(due.minute_of_day()));
        let (writes, _) = fixture.tick(at);
        assert_eq!(writes.len(), 2);
        assert_eq!(fixture.position("b"), 80);
    }

    #[test]
    fn should_reject_duplicate_and_unknown_ids() {
        let mut fixture = Fixture::new(48.85, 2.35);
        let schedule = at_eight(ScheduleTarget::All, 100);
        let id = fixture.scheduler.add(schedule.clone()).unwrap();
        assert!(matches!(
            fixture.scheduler.add(schedule),
            Err(ShadeHubError::Validation(ValidationError::DuplicateId(_)))
        ));
        fixture.scheduler.remove(id).unwrap();
        assert!(matches!(
            fixture.scheduler.remove(id),
            Err(ShadeHubError::NotFound(_))
        ));
    }
}
