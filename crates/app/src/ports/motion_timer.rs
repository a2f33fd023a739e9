//! Motion timer port: reports back when a simulated movement has finished.

use std::time::Duration;

use shadehub_domain::id::DeviceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Motion,
    Calibration,
}

/// A movement or calibration that will finish after `after`.
///
/// `seq` identifies the command; a completion whose `seq` is no longer the
/// latest for its device is stale and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCompletion {
    pub device_id: DeviceId,
    pub seq: u64,
    pub kind: CompletionKind,
    pub after: Duration,
}

/// Schedules completions. Fire-and-forget: there is no cancellation.
pub trait MotionTimer {
    fn schedule(&self, completion: PendingCompletion);
}

impl<T: MotionTimer + ?Sized> MotionTimer for std::sync::Arc<T> {
    fn schedule(&self, completion: PendingCompletion) {
        (**self).schedule(completion);
    }
}
