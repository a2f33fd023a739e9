//! Periodic cycles and the completion listener, as tokio tasks.
//!
//! Each cycle runs on its own interval. A tick only starts once the previous
//! tick of the same cycle has returned, so a cycle never overlaps itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::controller::Controller;
use crate::ports::{EnergyStrategy, EventPublisher, MotionTimer, PendingCompletion};

/// Period of each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleIntervals {
    pub ephemeris: Duration,
    pub schedules: Duration,
    pub rules: Duration,
    pub safety: Duration,
    pub statistics: Duration,
}

impl Default for CycleIntervals {
    fn default() -> Self {
        Self {
            ephemeris: Duration::from_secs(5 * 60),
            schedules: Duration::from_secs(60),
            rules: Duration::from_secs(2 * 60),
            safety: Duration::from_secs(10 * 60),
            statistics: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    Ephemeris,
    Schedules,
    Rules,
    Safety,
    Statistics,
}

fn interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Spawn the five periodic cycles. The first tick of each runs immediately.
pub fn spawn_cycles<P, E, T>(
    controller: Arc<Controller<P, E, T>>,
    intervals: CycleIntervals,
) -> Vec<JoinHandle<()>>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    [
        (Cycle::Ephemeris, intervals.ephemeris),
        (Cycle::Schedules, intervals.schedules),
        (Cycle::Rules, intervals.rules),
        (Cycle::Safety, intervals.safety),
        (Cycle::Statistics, intervals.statistics),
    ]
    .into_iter()
    .map(|(cycle, period)| {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            tracing::debug!(?cycle, ?period, "cycle started");
            let mut ticks = interval(period);
            loop {
                ticks.tick().await;
                let now = shadehub_domain::time::now();
                match cycle {
                    Cycle::Ephemeris => {
                        controller.refresh_ephemeris(now);
                    }
                    Cycle::Schedules => {
                        controller.evaluate_schedules(now).await;
                    }
                    Cycle::Rules => {
                        controller.evaluate_rules(now).await;
                    }
                    Cycle::Safety => {
                        controller.run_safety_check(now).await;
                    }
                    Cycle::Statistics => controller.record_statistics(now),
                }
            }
        })
    })
    .collect()
}

/// Feed completions from the motion timer back into the controller until
/// the channel closes.
pub fn spawn_completion_listener<P, E, T>(
    controller: Arc<Controller<P, E, T>>,
    mut completions: mpsc::UnboundedReceiver<PendingCompletion>,
) -> JoinHandle<()>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    tokio::spawn(async move {
        while let Some(completion) = completions.recv().await {
            controller.complete_motion(completion).await;
        }
        tracing::debug!("completion channel closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::SeasonalEnergyStrategy;
    use crate::event_bus::InProcessEventBus;
    use crate::motion_timer::TokioMotionTimer;
    use crate::state::HomeState;
    use shadehub_domain::device::{Device, MotorStatus};
    use shadehub_domain::id::DeviceId;
    use shadehub_domain::solar::GeoLocation;
    use shadehub_domain::time::LocalTimeRule;

    #[tokio::test(start_paused = true)]
    async fn should_return_device_to_idle_after_travel_time() {
        let state = HomeState::builder()
            .location(GeoLocation::new(48.85, 2.35).unwrap())
            .local_time(LocalTimeRule::UTC)
            .device(Device::builder().id("hall").room("hall").build().unwrap())
            .build(shadehub_domain::time::now())
            .unwrap();
        let (timer, completions) = TokioMotionTimer::channel();
        let controller = Arc::new(Controller::new(
            state,
            InProcessEventBus::new(16),
            SeasonalEnergyStrategy,
            timer,
        ));
        let listener = spawn_completion_listener(Arc::clone(&controller), completions);
        let hall = DeviceId::new("hall");

        controller.set_position(&hall, 100, None).await.unwrap();
        assert_eq!(controller.device(&hall).unwrap().motor_status, MotorStatus::Moving);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(controller.device(&hall).unwrap().motor_status, MotorStatus::Idle);
        listener.abort();
    }

    #[test]
    fn should_default_to_documented_periods() {
        let intervals = CycleIntervals::default();
        assert_eq!(intervals.schedules, Duration::from_secs(60));
        assert_eq!(intervals.rules, Duration::from_secs(120));
        assert_eq!(intervals.safety, Duration::from_secs(600));
    }
}
