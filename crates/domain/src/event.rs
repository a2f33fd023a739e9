//! Event: an immutable record of something that happened.
//!
//! Events are produced when coverings move, schedules and rules fire, the
//! safety interlock engages, and when the motor needs attention.

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, EventId};
use crate::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PositionChanged,
    WeatherAlertRetract,
    WeatherAlertCleared,
    ScheduleApplied,
    RuleApplied,
    SolarApplied,
    CalibrationStarted,
    CalibrationCompleted,
    BatteryLow,
    MotorStuck,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::PositionChanged => "position_changed",
            Self::WeatherAlertRetract => "weather_alert_retract",
            Self::WeatherAlertCleared => "weather_alert_cleared",
            Self::ScheduleApplied => "schedule_applied",
            Self::RuleApplied => "rule_applied",
            Self::SolarApplied => "solar_applied",
            Self::CalibrationStarted => "calibration_started",
            Self::CalibrationCompleted => "calibration_completed",
            Self::BatteryLow => "battery_low",
            Self::MotorStuck => "motor_stuck",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub device_id: Option<DeviceId>,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event stamped at `timestamp`.
    #[must_use]
    pub fn new(
        event_type: EventType,
        device_id: Option<DeviceId>,
        data: serde_json::Value,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            device_id,
            data,
            timestamp,
        }
    }
}
