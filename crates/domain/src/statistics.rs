//! Motion log and per-device usage statistics.

use std::collections::VecDeque;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::device::{CoverTarget, Device};
use crate::id::{DeviceId, RoomId};
use crate::time::Timestamp;

/// How many sampled days are kept per device.
pub const RETAINED_DAYS: usize = 7;

/// Who asked for a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionSource {
    Manual,
    Group,
    Schedule,
    Rule,
    Safety,
    Calibration,
}

impl std::fmt::Display for MotionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Group => "group",
            Self::Schedule => "schedule",
            Self::Rule => "rule",
            Self::Safety => "safety",
            Self::Calibration => "calibration",
        })
    }
}

/// Source plus a free-form label (schedule name, rule name, hazard, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuationReason {
    pub source: MotionSource,
    pub label: String,
}

impl ActuationReason {
    #[must_use]
    pub fn new(source: MotionSource, label: impl Into<String>) -> Self {
        Self {
            source,
            label: label.into(),
        }
    }

    #[must_use]
    pub fn manual() -> Self {
        Self::new(MotionSource::Manual, "api")
    }
}

impl std::fmt::Display for ActuationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionLogEntry {
    pub device_id: DeviceId,
    pub from: CoverTarget,
    pub to: CoverTarget,
    pub reason: ActuationReason,
    pub timestamp: Timestamp,
}

/// Bounded log of actuations.
///
/// When a push exceeds the capacity, only the most recent 80% of the
/// capacity is kept, so sustained writes trim in batches instead of on every
/// entry.
#[derive(Debug, Clone)]
pub struct PositionLog {
    capacity: usize,
    entries: VecDeque<PositionLogEntry>,
}

impl PositionLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, entry: PositionLogEntry) {
        self.entries.push_back(entry);
        if self.entries.len() > self.capacity {
            let keep = (self.capacity * 4 / 5).max(1);
            let drop = self.entries.len() - keep;
            self.entries.drain(..drop);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PositionLogEntry> {
        self.entries.iter()
    }

    /// Up to `limit` entries, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<PositionLogEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }
}

/// Position samples aggregated for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPositionStats {
    pub date: NaiveDate,
    pub samples: u32,
    pub position_sum: u64,
}

impl DailyPositionStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.position_sum as f64 / f64::from(self.samples))
    }
}

/// Rolling daily position samples for one device.
#[derive(Debug, Clone, Default)]
pub struct PositionSamples {
    days: VecDeque<DailyPositionStats>,
}

impl PositionSamples {
    pub fn record(&mut self, date: NaiveDate, position: u8) {
        match self.days.back_mut() {
            Some(day) if day.date == date => {
                day.samples += 1;
                day.position_sum += u64::from(position);
            }
            _ => {
                self.days.push_back(DailyPositionStats {
                    date,
                    samples: 1,
                    position_sum: u64::from(position),
                });
                while self.days.len() > RETAINED_DAYS {
                    self.days.pop_front();
                }
            }
        }
    }

    /// Average position of the most recently sampled day.
    #[must_use]
    pub fn latest_average(&self) -> Option<f64> {
        self.days.back().and_then(DailyPositionStats::average)
    }

    #[must_use]
    pub fn days(&self) -> Vec<DailyPositionStats> {
        self.days.iter().copied().collect()
    }
}

/// Read model returned by the statistics query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatistics {
    pub device_id: DeviceId,
    pub name: String,
    pub room: RoomId,
    pub position: u8,
    pub tilt: u8,
    pub motor_cycle_count: u64,
    pub tilt_change_count: u64,
    pub battery_level: f64,
    pub average_daily_position: Option<f64>,
    pub daily: Vec<DailyPositionStats>,
    pub last_moved: Option<Timestamp>,
    pub last_calibrated: Option<Timestamp>,
}

impl DeviceStatistics {
    #[must_use]
    pub fn new(device: &Device, samples: Option<&PositionSamples>) -> Self {
        Self {
            device_id: device.id.clone(),
            name: device.name.clone(),
            room: device.room.clone(),
            position: device.position,
            tilt: device.tilt,
            motor_cycle_count: device.motor_cycle_count,
            tilt_change_count: device.tilt_change_count,
            battery_level: device.battery_level,
            average_daily_position: samples.and_then(PositionSamples::latest_average),
            daily: samples.map(PositionSamples::days).unwrap_or_default(),
            last_moved: device.last_moved,
            last_calibrated: device.last_calibrated,
        }
    }
}
