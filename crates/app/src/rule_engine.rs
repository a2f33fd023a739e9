//! Automation rule engine: evaluates sensor conditions and applies covering
//! actions to the selected devices.
//!
//! Rules are checked in insertion order. A rule is skipped while disabled,
//! while cooling down, or outside its season. When its condition holds, the
//! action is resolved per target device and routed through the actuator.

use std::collections::HashMap;

use shadehub_domain::automation::{AutomationRule, RuleAction, RuleTrigger};
use shadehub_domain::device::{CoverTarget, Facing};
use shadehub_domain::error::{NotFoundError, ShadeHubError, ValidationError};
use shadehub_domain::event::{Event, EventType};
use shadehub_domain::id::{DeviceId, RoomId, RuleId};
use shadehub_domain::occupancy::OccupancyReading;
use shadehub_domain::solar::SolarState;
use shadehub_domain::statistics::{ActuationReason, MotionSource};
use shadehub_domain::time::{ClockTime, DayPeriod, Season, Timestamp};
use shadehub_domain::weather::WeatherState;

use crate::actuator::{note_write, Actuator, CycleWrites, Outbox};
use crate::favorites::Favorites;
use crate::ports::EnergyStrategy;

/// Lux per degree of solar elevation when no light sensor reading exists.
pub const DEFAULT_LUX_PER_DEGREE: f64 = 1_000.0;

/// Live inputs a rule cycle reads from.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub now: Timestamp,
    /// Local wall-clock time, used to pick the favorite's day period.
    pub local_time: ClockTime,
    pub season: Season,
    pub solar: &'a SolarState,
    pub weather: &'a WeatherState,
    pub occupancy: &'a HashMap<RoomId, OccupancyReading>,
    /// A measured light level that replaces the elevation estimate.
    pub lux: Option<f64>,
}

/// Result of one rule cycle.
#[derive(Debug, Default)]
pub struct RuleCycle {
    pub fired: Vec<RuleId>,
    pub writes: CycleWrites,
}

#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<AutomationRule>,
    lux_per_degree: f64,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LUX_PER_DEGREE)
    }
}

impl RuleEngine {
    #[must_use]
    pub fn new(lux_per_degree: f64) -> Self {
        Self {
            rules: Vec::new(),
            lux_per_degree,
        }
    }

    /// # Errors
    ///
    /// Returns the rule's validation error, or
    /// [`ValidationError::DuplicateId`] when the id is already registered.
    pub fn add(&mut self, rule: AutomationRule) -> Result<RuleId, ShadeHubError> {
        rule.validate()?;
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(ValidationError::DuplicateId(rule.id.to_string()).into());
        }
        let id = rule.id;
        tracing::info!(rule_id = %id, name = %rule.name, trigger = %rule.trigger, "rule added");
        self.rules.push(rule);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`ShadeHubError::NotFound`] for an unknown id.
    pub fn remove(&mut self, id: RuleId) -> Result<AutomationRule, ShadeHubError> {
        let index = self
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| NotFoundError {
                entity: "Rule",
                id: id.to_string(),
            })?;
        let removed = self.rules.remove(index);
        tracing::info!(rule_id = %id, name = %removed.name, "rule removed");
        Ok(removed)
    }

    #[must_use]
    pub fn list(&self) -> &[AutomationRule] {
        &self.rules
    }

    /// Light level estimate: the live reading when present, otherwise
    /// `max(0, elevation × lux_per_degree)`.
    #[must_use]
    pub fn light_level(&self, ctx: &RuleContext<'_>) -> f64 {
        ctx.lux
            .unwrap_or_else(|| (ctx.solar.elevation * self.lux_per_degree).max(0.0))
    }

    /// Evaluate every rule once.
    pub fn evaluate<E: EnergyStrategy>(
        &mut self,
        ctx: &RuleContext<'_>,
        actuator: &mut Actuator,
        favorites: &Favorites,
        energy: &E,
        outbox: &mut Outbox,
    ) -> RuleCycle {
        let light = self.light_level(ctx);
        let mut cycle = RuleCycle::default();

        for rule in &mut self.rules {
            if !rule.enabled {
                continue;
            }
            if rule.is_cooling_down(ctx.now) {
                tracing::debug!(rule_id = %rule.id, "rule cooling down");
                continue;
            }
            if !rule.in_season(ctx.season) {
                tracing::debug!(rule_id = %rule.id, season = %ctx.season, "rule out of season");
                continue;
            }
            let targets = matching_devices(rule, ctx, light, actuator);
            if targets.is_empty() {
                continue;
            }

            let reason = ActuationReason::new(MotionSource::Rule, rule.name.clone());
            let period = DayPeriod::of(ctx.local_time);
            let mut moved = Vec::new();
            for (device_id, current, facing) in targets {
                let target = match rule.action.fixed_target(current) {
                    Some(target) => target,
                    None if rule.action == RuleAction::ComputeEnergyPosition => {
                        energy.recommend(facing, ctx.season, ctx.solar.is_daylight)
                    }
                    None => {
                        let Some(favorite) = favorites.get(&device_id, period) else {
                            tracing::debug!(rule_id = %rule.id, device_id = %device_id, ?period, "no favorite to restore");
                            continue;
                        };
                        favorite
                    }
                };
                match actuator.set_device_position(&device_id, target, &reason, ctx.now, outbox) {
                    Ok(result) if result.moved() => {
                        note_write(&mut cycle.writes, &device_id, &reason);
                        moved.push(device_id);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(rule_id = %rule.id, device_id = %device_id, error = %err, "rule action skipped");
                    }
                }
            }

            rule.last_triggered = Some(ctx.now);
            tracing::info!(
                rule_id = %rule.id,
                name = %rule.name,
                trigger = %rule.trigger,
                action = %rule.action,
                moved = moved.len(),
                "rule fired"
            );
            if rule.action == RuleAction::ComputeEnergyPosition {
                outbox.event(Event::new(
                    EventType::SolarApplied,
                    None,
                    serde_json::json!({
                        "rule_id": rule.id,
                        "season": ctx.season,
                        "is_daylight": ctx.solar.is_daylight,
                        "devices": &moved,
                    }),
                    ctx.now,
                ));
            }
            outbox.event(Event::new(
                EventType::RuleApplied,
                None,
                serde_json::json!({
                    "rule_id": rule.id,
                    "name": rule.name,
                    "action": rule.action,
                    "devices": &moved,
                }),
                ctx.now,
            ));
            cycle.fired.push(rule.id);
        }
        cycle
    }
}

/// Devices the rule acts on right now, or nothing when its condition fails.
fn matching_devices(
    rule: &AutomationRule,
    ctx: &RuleContext<'_>,
    light: f64,
    actuator: &Actuator,
) -> Vec<(DeviceId, CoverTarget, Option<Facing>)> {
    let selected = actuator.devices().filter(|d| rule.target.matches(d));

    let reading = match rule.trigger {
        RuleTrigger::Temperature => ctx.weather.temperature,
        RuleTrigger::Humidity => ctx.weather.humidity,
        RuleTrigger::LightLevel => Some(light),
        RuleTrigger::Occupancy => {
            return selected
                .filter(|d| {
                    ctx.occupancy
                        .get(&d.room)
                        .is_some_and(|o| rule.comparison.holds_for_occupancy(o.occupied))
                })
                .map(|d| (d.id.clone(), d.current(), d.facing))
                .collect();
        }
    };
    let Some(value) = reading else {
        tracing::debug!(rule_id = %rule.id, trigger = %rule.trigger, "no reading for rule");
        return Vec::new();
    };
    if !rule.comparison.holds_for_value(value, rule.threshold) {
        return Vec::new();
    }
    selected
        .map(|d| (d.id.clone(), d.current(), d.facing))
        .collect()
}
