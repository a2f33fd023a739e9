//! Actuator: the single writer of covering position and tilt.
//!
//! Every movement goes through [`Actuator::set_device_position`]: it
//! debounces, updates counters and battery, appends to the position log and
//! queues the events and the completion the caller must flush afterwards.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::NaiveDate;
use shadehub_domain::device::{CoverTarget, Device, MotorStatus};
use shadehub_domain::error::{NotFoundError, ShadeHubError, ValidationError};
use shadehub_domain::event::{Event, EventType};
use shadehub_domain::id::{DeviceId, RoomId};
use shadehub_domain::statistics::{
    ActuationReason, DeviceStatistics, MotionSource, PositionLog, PositionLogEntry,
    PositionSamples,
};
use shadehub_domain::time::Timestamp;

use crate::ports::{CompletionKind, PendingCompletion};

/// Motor and bookkeeping parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorSettings {
    /// Time to travel from fully closed to fully open.
    pub full_travel: Duration,
    /// Time to rotate the slats; also the shortest possible movement.
    pub tilt_travel: Duration,
    pub calibration: Duration,
    /// Battery percentage consumed per actuation.
    pub battery_drain_per_move: f64,
    pub battery_low_threshold: f64,
    /// Cycle counts at which a `motor_stuck` maintenance alert is raised.
    pub motor_cycle_alerts: Vec<u64>,
    pub log_capacity: usize,
}

impl Default for ActuatorSettings {
    fn default() -> Self {
        Self {
            full_travel: Duration::from_secs(30),
            tilt_travel: Duration::from_secs(2),
            calibration: Duration::from_secs(60),
            battery_drain_per_move: 0.05,
            battery_low_threshold: 20.0,
            motor_cycle_alerts: vec![10_000, 25_000],
            log_capacity: 1_000,
        }
    }
}

/// Side effects produced while state is locked, flushed once it is released.
#[derive(Debug, Default)]
pub struct Outbox {
    pub events: Vec<Event>,
    pub completions: Vec<PendingCompletion>,
}

impl Outbox {
    pub fn event(&mut self, event: Event) {
        self.events.push(event);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.completions.is_empty()
    }
}

/// What a position command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    Moved { from: CoverTarget, to: CoverTarget },
    /// Already at the requested position and tilt.
    Unchanged,
    Offline,
    /// Calibration in progress.
    Busy,
    CalibrationStarted,
}

impl Actuation {
    #[must_use]
    pub fn moved(self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Devices moved during one evaluation cycle and why, in device order.
pub type CycleWrites = BTreeMap<DeviceId, ActuationReason>;

/// Record a move in `writes`, logging when it replaces an earlier write.
pub(crate) fn note_write(writes: &mut CycleWrites, device: &DeviceId, reason: &ActuationReason) {
    if let Some(previous) = writes.insert(device.clone(), reason.clone()) {
        tracing::info!(
            device_id = %device,
            %previous,
            winner = %reason,
            "device written twice in one cycle, last write wins"
        );
    }
}

pub struct Actuator {
    devices: BTreeMap<DeviceId, Device>,
    log: PositionLog,
    samples: HashMap<DeviceId, PositionSamples>,
    latest_seq: HashMap<DeviceId, u64>,
    next_seq: u64,
    settings: ActuatorSettings,
}

impl Actuator {
    #[must_use]
    pub fn new(settings: ActuatorSettings) -> Self {
        Self {
            devices: BTreeMap::new(),
            log: PositionLog::new(settings.log_capacity),
            samples: HashMap::new(),
            latest_seq: HashMap::new(),
            next_seq: 0,
            settings,
        }
    }

    /// Register a device from the inventory.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateId`] when the id is taken, or the
    /// device's own validation error.
    pub fn register(&mut self, device: Device) -> Result<(), ShadeHubError> {
        device.validate()?;
        if self.devices.contains_key(&device.id) {
            return Err(ValidationError::DuplicateId(device.id.to_string()).into());
        }
        self.devices.insert(device.id.clone(), device);
        Ok(())
    }

    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.contains_key(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    #[must_use]
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.keys().cloned().collect()
    }

    #[must_use]
    pub fn log(&self) -> &PositionLog {
        &self.log
    }

    fn get_mut(&mut self, id: &DeviceId) -> Result<&mut Device, ShadeHubError> {
        self.devices.get_mut(id).ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into()
        })
    }

    fn next_seq_for(&mut self, id: &DeviceId) -> u64 {
        self.next_seq += 1;
        self.latest_seq.insert(id.clone(), self.next_seq);
        self.next_seq
    }

    #[allow(clippy::cast_precision_loss)]
    fn travel_time(&self, from: CoverTarget, to: CoverTarget) -> Duration {
        let distance = f64::from(from.position.abs_diff(to.position)) / 100.0;
        self.settings
            .full_travel
            .mul_f64(distance)
            .max(self.settings.tilt_travel)
    }

    /// Move a device towards `target`.
    ///
    /// Offline devices, devices under calibration and devices already at the
    /// (normalized) target are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown device.
    pub fn set_device_position(
        &mut self,
        id: &DeviceId,
        target: CoverTarget,
        reason: &ActuationReason,
        now: Timestamp,
        outbox: &mut Outbox,
    ) -> Result<Actuation, ShadeHubError> {
        let drain = self.settings.battery_drain_per_move;
        let device = self.get_mut(id)?;
        if !device.is_online {
            tracing::debug!(device_id = %id, %reason, "device offline, skipping");
            return Ok(Actuation::Offline);
        }
        if device.motor_status == MotorStatus::Calibrating {
            tracing::debug!(device_id = %id, %reason, "device calibrating, skipping");
            return Ok(Actuation::Busy);
        }
        let from = device.current();
        let to = device.normalize(target);
        if from == to {
            return Ok(Actuation::Unchanged);
        }

        if from.position != to.position {
            device.motor_cycle_count += 1;
        }
        if from.tilt != to.tilt {
            device.tilt_change_count += 1;
        }
        device.position = to.position;
        device.tilt = to.tilt;
        device.motor_status = MotorStatus::Moving;
        device.last_moved = Some(now);

        let battery_before = device.battery_level;
        device.battery_level = (battery_before - drain).max(0.0);
        let battery_after = device.battery_level;
        let cycles = device.motor_cycle_count;
        let position_changed = from.position != to.position;

        if battery_before > self.settings.battery_low_threshold
            && battery_after <= self.settings.battery_low_threshold
        {
            tracing::warn!(device_id = %id, battery = battery_after, "battery low");
            outbox.event(Event::new(
                EventType::BatteryLow,
                Some(id.clone()),
                serde_json::json!({ "battery_level": battery_after }),
                now,
            ));
        }
        if position_changed && self.settings.motor_cycle_alerts.contains(&cycles) {
            tracing::warn!(device_id = %id, cycles, "motor cycle threshold reached");
            outbox.event(Event::new(
                EventType::MotorStuck,
                Some(id.clone()),
                serde_json::json!({ "motor_cycle_count": cycles }),
                now,
            ));
        }

        let after = self.travel_time(from, to);
        let seq = self.next_seq_for(id);
        outbox.completions.push(PendingCompletion {
            device_id: id.clone(),
            seq,
            kind: CompletionKind::Motion,
            after,
        });
        self.log.push(PositionLogEntry {
            device_id: id.clone(),
            from,
            to,
            reason: reason.clone(),
            timestamp: now,
        });
        outbox.event(Event::new(
            EventType::PositionChanged,
            Some(id.clone()),
            serde_json::json!({
                "from": { "position": from.position, "tilt": from.tilt },
                "to": { "position": to.position, "tilt": to.tilt },
                "source": reason.source,
                "reason": reason.label,
            }),
            now,
        ));
        tracing::debug!(
            device_id = %id,
            %reason,
            from = from.position,
            to = to.position,
            tilt = to.tilt,
            "device moving"
        );
        Ok(Actuation::Moved { from, to })
    }

    /// Start a calibration run. On completion position and tilt reset to 0.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown device.
    pub fn start_calibration(
        &mut self,
        id: &DeviceId,
        now: Timestamp,
        outbox: &mut Outbox,
    ) -> Result<Actuation, ShadeHubError> {
        let device = self.get_mut(id)?;
        if !device.is_online {
            return Ok(Actuation::Offline);
        }
        if device.motor_status == MotorStatus::Calibrating {
            return Ok(Actuation::Busy);
        }
        device.motor_status = MotorStatus::Calibrating;
        let after = self.settings.calibration;
        let seq = self.next_seq_for(id);
        outbox.completions.push(PendingCompletion {
            device_id: id.clone(),
            seq,
            kind: CompletionKind::Calibration,
            after,
        });
        outbox.event(Event::new(
            EventType::CalibrationStarted,
            Some(id.clone()),
            serde_json::json!({ "duration_secs": after.as_secs() }),
            now,
        ));
        tracing::info!(device_id = %id, "calibration started");
        Ok(Actuation::CalibrationStarted)
    }

    /// Apply a finished movement or calibration.
    ///
    /// Returns `false` when the completion was superseded by a newer command,
    /// the device is gone or it went offline while the motor was running.
    pub fn complete(
        &mut self,
        completion: &PendingCompletion,
        now: Timestamp,
        outbox: &mut Outbox,
    ) -> bool {
        if self.latest_seq.get(&completion.device_id) != Some(&completion.seq) {
            tracing::debug!(device_id = %completion.device_id, seq = completion.seq, "stale completion ignored");
            return false;
        }
        let Some(device) = self.devices.get_mut(&completion.device_id) else {
            return false;
        };
        if !device.is_online {
            tracing::debug!(device_id = %completion.device_id, seq = completion.seq, "device offline, completion dropped");
            return false;
        }
        match completion.kind {
            CompletionKind::Motion => {
                if device.motor_status == MotorStatus::Moving {
                    device.motor_status = MotorStatus::Idle;
                }
            }
            CompletionKind::Calibration => {
                let from = device.current();
                device.position = 0;
                device.tilt = 0;
                device.motor_status = MotorStatus::Idle;
                device.last_calibrated = Some(now);
                self.log.push(PositionLogEntry {
                    device_id: completion.device_id.clone(),
                    from,
                    to: CoverTarget::CLOSED,
                    reason: ActuationReason::new(MotionSource::Calibration, "reference run"),
                    timestamp: now,
                });
                outbox.event(Event::new(
                    EventType::CalibrationCompleted,
                    Some(completion.device_id.clone()),
                    serde_json::json!({ "position": 0, "tilt": 0 }),
                    now,
                ));
                tracing::info!(device_id = %completion.device_id, "calibration completed");
            }
        }
        true
    }

    /// Change a device's availability.
    ///
    /// Completions for an offline device are dropped, so a device coming back
    /// with a motion or calibration still pending is reported idle again.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown device.
    pub fn set_online(&mut self, id: &DeviceId, online: bool) -> Result<(), ShadeHubError> {
        let device = self.get_mut(id)?;
        if device.is_online == online {
            return Ok(());
        }
        tracing::info!(device_id = %id, online, "device availability changed");
        device.is_online = online;
        if online && device.motor_status != MotorStatus::Idle {
            tracing::debug!(device_id = %id, status = ?device.motor_status, "pending motion abandoned");
            device.motor_status = MotorStatus::Idle;
            self.latest_seq.remove(id);
        }
        Ok(())
    }

    /// Sample every device's current position into its daily aggregate.
    pub fn record_samples(&mut self, date: NaiveDate) {
        for device in self.devices.values() {
            self.samples
                .entry(device.id.clone())
                .or_default()
                .record(date, device.position);
        }
    }

    /// Per-device statistics, optionally restricted to one room.
    #[must_use]
    pub fn statistics(&self, room: Option<&RoomId>) -> Vec<DeviceStatistics> {
        self.devices
            .values()
            .filter(|d| room.is_none_or(|r| &d.room == r))
            .map(|d| DeviceStatistics::new(d, self.samples.get(&d.id)))
            .collect()
    }
}
