//! Occupancy readings pushed per room.

use serde::{Deserialize, Serialize};

use crate::id::RoomId;
use crate::time::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyReading {
    pub room: RoomId,
    pub occupied: bool,
    pub timestamp: Timestamp,
}

impl OccupancyReading {
    #[must_use]
    pub fn new(room: impl Into<RoomId>, occupied: bool, timestamp: Timestamp) -> Self {
        Self {
            room: room.into(),
            occupied,
            timestamp,
        }
    }
}
