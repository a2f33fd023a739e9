//! Favorite positions per device and time of day.
//!
//! Seeded from configuration and updated whenever a user moves a single
//! device by hand. `restore_previous` rules read them back.

use std::collections::HashMap;

use shadehub_domain::device::CoverTarget;
use shadehub_domain::id::DeviceId;
use shadehub_domain::time::DayPeriod;

#[derive(Debug, Clone, Default)]
pub struct Favorites {
    entries: HashMap<(DeviceId, DayPeriod), CoverTarget>,
}

impl Favorites {
    pub fn remember(&mut self, device: DeviceId, period: DayPeriod, target: CoverTarget) {
        self.entries.insert((device, period), target);
    }

    #[must_use]
    pub fn get(&self, device: &DeviceId, period: DayPeriod) -> Option<CoverTarget> {
        self.entries.get(&(device.clone(), period)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
