//! Zone: a named group of devices that receive the same command.

use serde::{Deserialize, Serialize};

use crate::error::{ShadeHubError, ValidationError};
use crate::id::{DeviceId, RoomId, ZoneId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    #[serde(default)]
    pub room: Option<RoomId>,
    pub devices: Vec<DeviceId>,
}

impl Zone {
    #[must_use]
    pub fn new(id: impl Into<ZoneId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            room: None,
            devices: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_room(mut self, room: impl Into<RoomId>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: impl Into<DeviceId>) -> Self {
        let device = device.into();
        if !self.devices.contains(&device) {
            self.devices.push(device);
        }
        self
    }

    #[must_use]
    pub fn contains(&self, device: &DeviceId) -> bool {
        self.devices.contains(device)
    }

    /// Check domain invariants against the known device inventory.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::Validation`] when the id or name is empty,
    /// or when a member is not part of `known`.
    pub fn validate(&self, mut known: impl FnMut(&DeviceId) -> bool) -> Result<(), ShadeHubError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let Some(missing) = self.devices.iter().find(|d| !known(d)) {
            return Err(ValidationError::UnknownMember {
                zone: self.id.to_string(),
                device: missing.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
