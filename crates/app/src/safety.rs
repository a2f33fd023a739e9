//! Safety interlock: retracts and closes coverings threatened by weather.
//!
//! Runs after schedules and rules in a full tick so it is always the last
//! writer, and again on its own period and on every weather push.

use shadehub_domain::device::Device;
use shadehub_domain::event::{Event, EventType};
use shadehub_domain::id::DeviceId;
use shadehub_domain::statistics::{ActuationReason, MotionSource};
use shadehub_domain::time::Timestamp;
use shadehub_domain::weather::{Hazard, SafetyThresholds, WeatherState};

use crate::actuator::{Actuator, CycleWrites, Outbox};

/// What one safety pass found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyReport {
    pub hazards: Vec<Hazard>,
    /// Devices moved to their secured position by this pass.
    pub secured: Vec<DeviceId>,
}

#[derive(Debug, Default)]
pub struct SafetyInterlock {
    thresholds: SafetyThresholds,
    active: Vec<Hazard>,
}

impl SafetyInterlock {
    #[must_use]
    pub fn new(thresholds: SafetyThresholds) -> Self {
        Self {
            thresholds,
            active: Vec::new(),
        }
    }

    #[must_use]
    pub fn thresholds(&self) -> &SafetyThresholds {
        &self.thresholds
    }

    /// Whether any hazard was active at the last pass.
    #[must_use]
    pub fn is_engaged(&self) -> bool {
        !self.active.is_empty()
    }

    #[must_use]
    pub fn active(&self) -> &[Hazard] {
        &self.active
    }

    /// Secure every device affected by a current hazard.
    ///
    /// `writes` holds the moves schedules and rules made earlier in the same
    /// cycle; overriding one of them is logged.
    pub fn enforce(
        &mut self,
        weather: &WeatherState,
        actuator: &mut Actuator,
        writes: &CycleWrites,
        now: Timestamp,
        outbox: &mut Outbox,
    ) -> SafetyReport {
        let hazards = weather.hazards(&self.thresholds);

        for hazard in hazards.iter().filter(|h| !self.active.contains(*h)) {
            let devices: Vec<&DeviceId> = actuator
                .devices()
                .filter(|d| hazard.affects(d))
                .map(|d| &d.id)
                .collect();
            tracing::warn!(
                %hazard,
                severity = ?hazard.severity(),
                wind = weather.peak_wind(),
                rain = weather.rain_intensity,
                devices = devices.len(),
                "weather hazard detected"
            );
            outbox.event(Event::new(
                EventType::WeatherAlertRetract,
                None,
                serde_json::json!({
                    "hazard": hazard,
                    "severity": hazard.severity(),
                    "wind_speed": weather.wind_speed,
                    "wind_gust": weather.wind_gust,
                    "rain_intensity": weather.rain_intensity,
                    "temperature": weather.temperature,
                    "devices": devices,
                }),
                now,
            ));
        }
        if hazards.is_empty() && !self.active.is_empty() {
            tracing::info!(cleared = ?self.active, "weather hazards cleared");
            outbox.event(Event::new(
                EventType::WeatherAlertCleared,
                None,
                serde_json::json!({ "cleared": self.active }),
                now,
            ));
        }

        let plan: Vec<(DeviceId, Hazard)> = actuator
            .devices()
            .filter_map(|d| first_hazard(&hazards, d).map(|h| (d.id.clone(), h)))
            .collect();

        let mut secured = Vec::new();
        for (device_id, hazard) in plan {
            let reason = ActuationReason::new(MotionSource::Safety, hazard.name());
            match actuator.set_device_position(
                &device_id,
                hazard.secured_target(),
                &reason,
                now,
                outbox,
            ) {
                Ok(result) if result.moved() => {
                    if let Some(overridden) = writes.get(&device_id) {
                        tracing::info!(
                            device_id = %device_id,
                            %overridden,
                            %hazard,
                            "safety overrides same-cycle move"
                        );
                    }
                    secured.push(device_id);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(device_id = %device_id, error = %err, "safety action skipped");
                }
            }
        }

        self.active.clone_from(&hazards);
        SafetyReport { hazards, secured }
    }
}

fn first_hazard(hazards: &[Hazard], device: &Device) -> Option<Hazard> {
    hazards.iter().copied().find(|h| h.affects(device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::ActuatorSettings;
    use chrono::{TimeZone, Utc};
    use shadehub_domain::device::DeviceKind;
    use shadehub_domain::weather::WeatherReading;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap()
    }

    fn actuator() -> Actuator {
        let mut actuator = Actuator::new(ActuatorSettings::default());
        let devices = [
            Device::builder()
                .id("awning")
                .room("terrace")
                .kind(DeviceKind::Awning)
                .exterior(true)
                .position(100)
                .build(),
            Device::builder()
                .id("roof")
                .room("attic")
                .kind(DeviceKind::Skylight)
                .position(100)
                .build(),
            Device::builder()
                .id("curtain")
                .room("living")
                .kind(DeviceKind::Curtain)
                .position(100)
                .build(),
        ];
        for device in devices {
            actuator.register(device.unwrap()).unwrap();
        }
        actuator
    }

    fn weather(reading: WeatherReading) -> WeatherState {
        let mut state = WeatherState::default();
        state.apply(reading, now());
        state
    }

    fn position(actuator: &Actuator, id: &str) -> u8 {
        actuator.device(&DeviceId::new(id)).unwrap().position
    }

    #[test]
    fn should_retract_exterior_devices_in_high_wind() {
        let mut interlock = SafetyInterlock::default();
        let mut actuator = actuator();
        let mut outbox = Outbox::default();
        let report = interlock.enforce(
            &weather(WeatherReading {
                wind_speed: 55.0,
                ..WeatherReading::default()
            }),
            &mut actuator,
            &CycleWrites::new(),
            now(),
            &mut outbox,
        );

        assert_eq!(report.hazards, vec![Hazard::HighWind]);
        assert_eq!(report.secured, vec![DeviceId::new("awning")]);
        assert_eq!(position(&actuator, "awning"), 0);
        assert_eq!(position(&actuator, "roof"), 100);
        assert_eq!(position(&actuator, "curtain"), 100);
        assert!(interlock.is_engaged());
    }

    #[test]
    fn should_close_skylights_in_heavy_rain() {
        let mut interlock = SafetyInterlock::default();
        let mut actuator = actuator();
        interlock.enforce(
            &weather(WeatherReading {
                rain_intensity: 12.0,
                ..WeatherReading::default()
            }),
            &mut actuator,
            &CycleWrites::new(),
            now(),
            &mut Outbox::default(),
        );
        assert_eq!(position(&actuator, "awning"), 0);
        assert_eq!(position(&actuator, "roof"), 0);
        assert_eq!(position(&actuator, "curtain"), 100);
    }

    #[test]
    fn should_alert_once_per_hazard_onset_and_on_clear() {
        let mut interlock = SafetyInterlock::default();
        let mut actuator = actuator();
        let storm = weather(WeatherReading {
            wind_gust: 90.0,
            ..WeatherReading::default()
        });

        let mut first = Outbox::default();
        interlock.enforce(&storm, &mut actuator, &CycleWrites::new(), now(), &mut first);
        let alerts = |outbox: &Outbox, kind: EventType| {
            outbox.events.iter().filter(|e| e.event_type == kind).count()
        };
        assert_eq!(alerts(&first, EventType::WeatherAlertRetract), 1);

        let mut second = Outbox::default();
        interlock.enforce(&storm, &mut actuator, &CycleWrites::new(), now(), &mut second);
        assert_eq!(alerts(&second, EventType::WeatherAlertRetract), 0);

        let mut cleared = Outbox::default();
        interlock.enforce(
            &WeatherState::default(),
            &mut actuator,
            &CycleWrites::new(),
            now(),
            &mut cleared,
        );
        assert_eq!(alerts(&cleared, EventType::WeatherAlertCleared), 1);
        assert!(!interlock.is_engaged());
    }

    #[test]
    fn should_override_move_made_earlier_in_the_cycle() {
        let mut interlock = SafetyInterlock::default();
        let mut actuator = actuator();
        let mut outbox = Outbox::default();
        let awning = DeviceId::new("awning");
        let reason = ActuationReason::new(MotionSource::Schedule, "open terrace");
        actuator
            .set_device_position(
                &awning,
                shadehub_domain::device::CoverTarget::clamped(80, 0),
                &reason,
                now(),
                &mut outbox,
            )
            .unwrap();
        let writes = CycleWrites::from([(awning.clone(), reason)]);

        let report = interlock.enforce(
            &weather(WeatherReading {
                wind_speed: 80.0,
                ..WeatherReading::default()
            }),
            &mut actuator,
            &writes,
            now(),
            &mut outbox,
        );
        assert_eq!(report.hazards, vec![Hazard::Storm]);
        assert_eq!(position(&actuator, "awning"), 0);
    }

    #[test]
    fn should_close_exterior_devices_in_frost() {
        let mut interlock = SafetyInterlock::default();
        let mut actuator = actuator();
        let report = interlock.enforce(
            &weather(WeatherReading {
                temperature: Some(-3.0),
                ..WeatherReading::default()
            }),
            &mut actuator,
            &CycleWrites::new(),
            now(),
            &mut Outbox::default(),
        );
        assert_eq!(report.hazards, vec![Hazard::Frost]);
        assert_eq!(position(&actuator, "awning"), 0);
    }
}
