//! Automation rules: sensor condition → covering action.
//!
//! A rule watches one [`RuleTrigger`] reading, tests it with a
//! [`Comparison`] against a threshold and, when it holds, applies a
//! [`RuleAction`] to every device picked by its [`TargetSelector`]. A rule
//! that fired stays quiet for `cooldown_minutes` and can be restricted to one
//! [`Season`].

mod action;
mod condition;
mod target;
mod trigger;

pub use action::RuleAction;
pub use condition::Comparison;
pub use target::TargetSelector;
pub use trigger::RuleTrigger;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{ShadeHubError, ValidationError};
use crate::id::RuleId;
use crate::time::{Season, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: RuleId,
    pub name: String,
    pub enabled: bool,
    pub trigger: RuleTrigger,
    pub comparison: Comparison,
    /// Ignored by occupancy rules.
    pub threshold: f64,
    pub target: TargetSelector,
    pub action: RuleAction,
    pub cooldown_minutes: u32,
    pub season: Option<Season>,
    pub last_triggered: Option<Timestamp>,
}

impl AutomationRule {
    /// Create a builder for constructing an [`AutomationRule`].
    #[must_use]
    pub fn builder() -> AutomationRuleBuilder {
        AutomationRuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - the comparison does not fit the trigger ([`ValidationError::IncompatibleComparison`])
    /// - the threshold is NaN or infinite ([`ValidationError::NonFiniteThreshold`])
    /// - the target selects nothing ([`ValidationError::NoTarget`])
    /// - an occupancy rule has no rooms ([`ValidationError::OccupancyWithoutRoom`])
    pub fn validate(&self) -> Result<(), ShadeHubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if !self.trigger.accepts(self.comparison) {
            return Err(ValidationError::IncompatibleComparison {
                trigger: self.trigger.name(),
                comparison: self.comparison.name(),
            }
            .into());
        }
        if !self.threshold.is_finite() {
            return Err(ValidationError::NonFiniteThreshold.into());
        }
        if self.target.is_empty() {
            return Err(ValidationError::NoTarget.into());
        }
        if self.trigger == RuleTrigger::Occupancy && self.target.rooms.is_empty() {
            return Err(ValidationError::OccupancyWithoutRoom.into());
        }
        Ok(())
    }

    /// Whether the rule fired less than `cooldown_minutes` before `now`.
    #[must_use]
    pub fn is_cooling_down(&self, now: Timestamp) -> bool {
        let cooldown = Duration::minutes(i64::from(self.cooldown_minutes));
        self.last_triggered
            .is_some_and(|last| now.signed_duration_since(last) < cooldown)
    }

    /// Whether the season restriction, if any, is met.
    #[must_use]
    pub fn in_season(&self, current: Season) -> bool {
        self.season.is_none_or(|season| season == current)
    }
}

/// Step-by-step builder for [`AutomationRule`].
#[derive(Debug, Default)]
pub struct AutomationRuleBuilder {
    id: Option<RuleId>,
    name: Option<String>,
    enabled: Option<bool>,
    trigger: Option<RuleTrigger>,
    comparison: Option<Comparison>,
    threshold: f64,
    target: TargetSelector,
    action: Option<RuleAction>,
    cooldown_minutes: u32,
    season: Option<Season>,
    last_triggered: Option<Timestamp>,
}

impl AutomationRuleBuilder {
    #[must_use]
    pub fn id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set trigger, comparison and threshold in one go.
    #[must_use]
    pub fn when(mut self, trigger: RuleTrigger, comparison: Comparison, threshold: f64) -> Self {
        self.trigger = Some(trigger);
        self.comparison = Some(comparison);
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn target(mut self, target: TargetSelector) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn action(mut self, action: RuleAction) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn cooldown_minutes(mut self, minutes: u32) -> Self {
        self.cooldown_minutes = minutes;
        self
    }

    #[must_use]
    pub fn season(mut self, season: Season) -> Self {
        self.season = Some(season);
        self
    }

    #[must_use]
    pub fn last_triggered(mut self, ts: Timestamp) -> Self {
        self.last_triggered = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`AutomationRule`].
    ///
    /// Defaults: enabled, `temperature above 0`, action `close`, no cooldown.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::Validation`] if invariants fail.
    pub fn build(self) -> Result<AutomationRule, ShadeHubError> {
        let rule = AutomationRule {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            trigger: self.trigger.unwrap_or(RuleTrigger::Temperature),
            comparison: self.comparison.unwrap_or(Comparison::Above),
            threshold: self.threshold,
            target: self.target,
            action: self.action.unwrap_or(RuleAction::Close),
            cooldown_minutes: self.cooldown_minutes,
            season: self.season,
            last_triggered: self.last_triggered,
        };
        rule.validate()?;
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Facing;
    use chrono::{TimeZone, Utc};

    fn heat_rule() -> AutomationRule {
        AutomationRule::builder()
            .name("Close south on heat")
            .when(RuleTrigger::Temperature, Comparison::Above, 26.0)
            .target(TargetSelector::facing(Facing::South))
            .action(RuleAction::Close)
            .cooldown_minutes(30)
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_valid_rule_when_required_fields_provided() {
        let rule = heat_rule();
        assert!(rule.enabled);
        assert_eq!(rule.cooldown_minutes, 30);
        assert!(rule.last_triggered.is_none());
        assert!(rule.season.is_none());
    }

    #[test]
    fn should_return_validation_error_when_name_is_empty() {
        let result = AutomationRule::builder()
            .target(TargetSelector::facing(Facing::South))
            .build();
        assert!(matches!(
            result,
            Err(ShadeHubError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_reject_occupancy_comparison_on_temperature() {
        let result = AutomationRule::builder()
            .name("Nonsense")
            .when(RuleTrigger::Temperature, Comparison::Occupied, 0.0)
            .target(TargetSelector::room("living"))
            .build();
        assert!(matches!(
            result,
            Err(ShadeHubError::Validation(
                ValidationError::IncompatibleComparison { .. }
            ))
        ));
    }

    #[test]
    fn should_reject_rule_without_target() {
        let result = AutomationRule::builder().name("Nowhere").build();
        assert!(matches!(
            result,
            Err(ShadeHubError::Validation(ValidationError::NoTarget))
        ));
    }

    #[test]
    fn should_reject_occupancy_rule_without_rooms() {
        let result = AutomationRule::builder()
            .name("Empty rooms")
            .when(RuleTrigger::Occupancy, Comparison::Unoccupied, 0.0)
            .target(TargetSelector::facing(Facing::East))
            .build();
        assert!(matches!(
            result,
            Err(ShadeHubError::Validation(ValidationError::OccupancyWithoutRoom))
        ));
    }

    #[test]
    fn should_reject_non_finite_threshold() {
        let result = AutomationRule::builder()
            .name("NaN")
            .when(RuleTrigger::Humidity, Comparison::Above, f64::NAN)
            .target(TargetSelector::room("bath"))
            .build();
        assert!(matches!(
            result,
            Err(ShadeHubError::Validation(ValidationError::NonFiniteThreshold))
        ));
    }

    #[test]
    fn should_cool_down_for_configured_minutes() {
        let t0 = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let mut rule = heat_rule();
        assert!(!rule.is_cooling_down(t0));
        rule.last_triggered = Some(t0);
        assert!(rule.is_cooling_down(t0 + Duration::minutes(15)));
        assert!(rule.is_cooling_down(t0 + Duration::minutes(29)));
        assert!(!rule.is_cooling_down(t0 + Duration::minutes(30)));
        assert!(!rule.is_cooling_down(t0 + Duration::minutes(31)));
    }

    #[test]
    fn should_respect_season_restriction() {
        let mut rule = heat_rule();
        assert!(rule.in_season(Season::Winter));
        rule.season = Some(Season::Summer);
        assert!(rule.in_season(Season::Summer));
        assert!(!rule.in_season(Season::Winter));
    }

    #[test]
    fn should_roundtrip_rule_through_serde_json() {
        let rule = heat_rule();
        let json = serde_json::to_string(&rule).unwrap();
        let parsed: AutomationRule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rule);
    }
}
