//! Target selector: which devices a rule acts on.

use serde::{Deserialize, Serialize};

use crate::device::{Device, Facing};
use crate::id::RoomId;

/// Devices are selected by facing and/or room. When both lists are set a
/// device must match both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelector {
    #[serde(default)]
    pub facings: Vec<Facing>,
    #[serde(default)]
    pub rooms: Vec<RoomId>,
}

impl TargetSelector {
    #[must_use]
    pub fn facing(facing: Facing) -> Self {
        Self {
            facings: vec![facing],
            rooms: Vec::new(),
        }
    }

    #[must_use]
    pub fn room(room: impl Into<RoomId>) -> Self {
        Self {
            facings: Vec::new(),
            rooms: vec![room.into()],
        }
    }

    #[must_use]
    pub fn and_facing(mut self, facing: Facing) -> Self {
        self.facings.push(facing);
        self
    }

    #[must_use]
    pub fn and_room(mut self, room: impl Into<RoomId>) -> Self {
        self.rooms.push(room.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facings.is_empty() && self.rooms.is_empty()
    }

    #[must_use]
    pub fn matches(&self, device: &Device) -> bool {
        if self.is_empty() {
            return false;
        }
        let facing_ok = self.facings.is_empty()
            || device.facing.is_some_and(|f| self.facings.contains(&f));
        let room_ok = self.rooms.is_empty() || self.rooms.contains(&device.room);
        facing_ok && room_ok
    }
}
