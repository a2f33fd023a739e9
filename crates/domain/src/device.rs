//! Device: one motorised window covering.
//!
//! Position and tilt fields are written only by the actuator in the `app`
//! crate; everything else here is inventory data loaded from configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ShadeHubError, ValidationError};
use crate::id::{DeviceId, RoomId};
use crate::time::Timestamp;

pub const MAX_POSITION: u8 = 100;
pub const MAX_TILT: u8 = 90;

/// Compass direction a window faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    #[serde(alias = "n")]
    North,
    #[serde(alias = "ne")]
    NorthEast,
    #[serde(alias = "e")]
    East,
    #[serde(alias = "se")]
    SouthEast,
    #[serde(alias = "s")]
    South,
    #[serde(alias = "sw")]
    SouthWest,
    #[serde(alias = "w")]
    West,
    #[serde(alias = "nw")]
    NorthWest,
}

impl Facing {
    pub const ALL: [Self; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// Azimuth of the window normal in degrees clockwise from north.
    #[must_use]
    pub fn azimuth(self) -> f64 {
        match self {
            Self::North => 0.0,
            Self::NorthEast => 45.0,
            Self::East => 90.0,
            Self::SouthEast => 135.0,
            Self::South => 180.0,
            Self::SouthWest => 225.0,
            Self::West => 270.0,
            Self::NorthWest => 315.0,
        }
    }
}

/// Type of covering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    RollerBlind,
    VenetianBlind,
    Shutter,
    Curtain,
    Awning,
    Skylight,
}

impl DeviceKind {
    /// Only louvered coverings have a meaningful tilt.
    #[must_use]
    pub fn supports_tilt(self) -> bool {
        matches!(self, Self::VenetianBlind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorStatus {
    #[default]
    Idle,
    Moving,
    Calibrating,
}

/// A requested covering position: `position` 0 (closed) to 100 (open),
/// `tilt` 0 to 90 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoverTarget {
    pub position: u8,
    pub tilt: u8,
}

impl CoverTarget {
    pub const CLOSED: Self = Self {
        position: 0,
        tilt: 0,
    };
    pub const OPEN: Self = Self {
        position: MAX_POSITION,
        tilt: 0,
    };

    /// Build a target from caller-supplied values, rejecting anything out of range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PositionOutOfRange`] or
    /// [`ValidationError::TiltOutOfRange`].
    pub fn new(position: i32, tilt: i32) -> Result<Self, ShadeHubError> {
        let position = u8::try_from(position)
            .ok()
            .filter(|p| *p <= MAX_POSITION)
            .ok_or(ValidationError::PositionOutOfRange(position))?;
        let tilt = u8::try_from(tilt)
            .ok()
            .filter(|t| *t <= MAX_TILT)
            .ok_or(ValidationError::TiltOutOfRange(tilt))?;
        Ok(Self { position, tilt })
    }

    /// Build a target, saturating values into range.
    #[must_use]
    pub fn clamped(position: u8, tilt: u8) -> Self {
        Self {
            position: position.min(MAX_POSITION),
            tilt: tilt.min(MAX_TILT),
        }
    }
}

/// A controllable covering and its live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub room: RoomId,
    pub kind: DeviceKind,
    pub facing: Option<Facing>,
    pub is_exterior: bool,
    pub is_street_facing: bool,
    pub position: u8,
    pub tilt: u8,
    pub motor_status: MotorStatus,
    pub motor_cycle_count: u64,
    pub tilt_change_count: u64,
    pub battery_level: f64,
    pub is_online: bool,
    pub last_moved: Option<Timestamp>,
    pub last_calibrated: Option<Timestamp>,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::Validation`] when:
    /// - `id` or `room` is empty ([`ValidationError::EmptyId`])
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `position` or `tilt` is out of range
    pub fn validate(&self) -> Result<(), ShadeHubError> {
        if self.id.is_empty() || self.room.is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        CoverTarget::new(i32::from(self.position), i32::from(self.tilt))?;
        Ok(())
    }

    #[must_use]
    pub fn current(&self) -> CoverTarget {
        CoverTarget {
            position: self.position,
            tilt: self.tilt,
        }
    }

    /// Adapt a target to what this covering can physically do.
    #[must_use]
    pub fn normalize(&self, target: CoverTarget) -> CoverTarget {
        let target = CoverTarget::clamped(target.position, target.tilt);
        if self.kind.supports_tilt() {
            target
        } else {
            CoverTarget { tilt: 0, ..target }
        }
    }

    #[must_use]
    pub fn is_skylight(&self) -> bool {
        self.kind == DeviceKind::Skylight
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    room: Option<RoomId>,
    kind: Option<DeviceKind>,
    facing: Option<Facing>,
    is_exterior: bool,
    is_street_facing: bool,
    position: u8,
    tilt: u8,
    battery_level: Option<f64>,
    is_online: Option<bool>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<DeviceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn room(mut self, room: impl Into<RoomId>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: DeviceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn facing(mut self, facing: Facing) -> Self {
        self.facing = Some(facing);
        self
    }

    #[must_use]
    pub fn exterior(mut self, is_exterior: bool) -> Self {
        self.is_exterior = is_exterior;
        self
    }

    #[must_use]
    pub fn street_facing(mut self, is_street_facing: bool) -> Self {
        self.is_street_facing = is_street_facing;
        self
    }

    #[must_use]
    pub fn position(mut self, position: u8) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn tilt(mut self, tilt: u8) -> Self {
        self.tilt = tilt;
        self
    }

    #[must_use]
    pub fn battery_level(mut self, level: f64) -> Self {
        self.battery_level = Some(level);
        self
    }

    #[must_use]
    pub fn online(mut self, is_online: bool) -> Self {
        self.is_online = Some(is_online);
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// The name defaults to the id and the kind to a roller blind.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::Validation`] if invariants fail.
    pub fn build(self) -> Result<Device, ShadeHubError> {
        let id = self.id.unwrap_or_else(|| DeviceId::new(""));
        let kind = self.kind.unwrap_or(DeviceKind::RollerBlind);
        let device = Device {
            name: self.name.unwrap_or_else(|| id.to_string()),
            id,
            room: self.room.unwrap_or_else(|| RoomId::new("")),
            kind,
            facing: self.facing,
            is_exterior: self.is_exterior,
            is_street_facing: self.is_street_facing,
            position: self.position,
            tilt: if kind.supports_tilt() { self.tilt } else { 0 },
            motor_status: MotorStatus::Idle,
            motor_cycle_count: 0,
            tilt_change_count: 0,
            battery_level: self.battery_level.unwrap_or(100.0).clamp(0.0, 100.0),
            is_online: self.is_online.unwrap_or(true),
            last_moved: None,
            last_calibrated: None,
        };
        device.validate()?;
        Ok(device)
    }
}
