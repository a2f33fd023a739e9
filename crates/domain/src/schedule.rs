//! Schedule: move coverings at a clock time or relative to sunrise/sunset.
//!
//! A schedule fires at most once per matching minute. Whether it is due is
//! decided by [`Schedule::readiness`]; applying the actions is the
//! scheduler's job.

use chrono::{DateTime, Datelike, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::device::CoverTarget;
use crate::error::{ShadeHubError, ValidationError};
use crate::id::{DeviceId, ScheduleId, ZoneId};
use crate::solar::{DaylightRegime, SolarState};
use crate::time::{ClockTime, Timestamp, WeekdaySet};

pub const MAX_OFFSET_MINUTES: i32 = 12 * 60;

/// When a schedule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleTrigger {
    /// A fixed local clock time.
    At { time: ClockTime },
    /// Sunrise shifted by a signed number of minutes.
    Sunrise {
        #[serde(default)]
        offset_minutes: i32,
    },
    /// Sunset shifted by a signed number of minutes.
    Sunset {
        #[serde(default)]
        offset_minutes: i32,
    },
}

impl ScheduleTrigger {
    /// Local clock time this trigger resolves to today, if any.
    ///
    /// Sun-relative triggers resolve to `None` when the ephemeris has no
    /// sunrise or sunset (polar night).
    #[must_use]
    pub fn resolve(&self, solar: &SolarState) -> Option<ClockTime> {
        match self {
            Self::At { time } => Some(*time),
            Self::Sunrise { offset_minutes } => {
                solar.sunrise.map(|t| t.offset_by(*offset_minutes))
            }
            Self::Sunset { offset_minutes } => solar.sunset.map(|t| t.offset_by(*offset_minutes)),
        }
    }

    #[must_use]
    pub fn is_solar(&self) -> bool {
        !matches!(self, Self::At { .. })
    }

    fn offset_minutes(&self) -> i32 {
        match self {
            Self::At { .. } => 0,
            Self::Sunrise { offset_minutes } | Self::Sunset { offset_minutes } => *offset_minutes,
        }
    }
}

impl std::fmt::Display for ScheduleTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::At { time } => write!(f, "at({time})"),
            Self::Sunrise { offset_minutes } => write!(f, "sunrise({offset_minutes:+})"),
            Self::Sunset { offset_minutes } => write!(f, "sunset({offset_minutes:+})"),
        }
    }
}

/// Which devices a schedule action addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleTarget {
    All,
    Device(DeviceId),
    Zone(ZoneId),
}

/// One step of a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAction {
    pub target: ScheduleTarget,
    pub position: u8,
    #[serde(default)]
    pub tilt: u8,
}

impl ScheduleAction {
    #[must_use]
    pub fn new(target: ScheduleTarget, position: u8, tilt: u8) -> Self {
        Self {
            target,
            position,
            tilt,
        }
    }

    #[must_use]
    pub fn cover_target(&self) -> CoverTarget {
        CoverTarget::clamped(self.position, self.tilt)
    }
}

/// Outcome of checking a schedule against the current minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Due,
    Disabled,
    NotToday,
    /// Sun-relative trigger on a day without sunrise or sunset.
    NoSolarTime(DaylightRegime),
    Waiting(ClockTime),
    AlreadyFired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    pub enabled: bool,
    pub weekdays: WeekdaySet,
    pub trigger: ScheduleTrigger,
    pub actions: Vec<ScheduleAction>,
    pub last_fired: Option<Timestamp>,
}

impl Schedule {
    /// Create a builder for constructing a [`Schedule`].
    #[must_use]
    pub fn builder() -> ScheduleBuilder {
        ScheduleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `actions` is empty ([`ValidationError::NoActions`])
    /// - `weekdays` is empty ([`ValidationError::NoWeekdays`])
    /// - the sun offset exceeds twelve hours ([`ValidationError::OffsetOutOfRange`])
    /// - an action position or tilt is out of range
    pub fn validate(&self) -> Result<(), ShadeHubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.actions.is_empty() {
            return Err(ValidationError::NoActions.into());
        }
        if self.weekdays.is_empty() {
            return Err(ValidationError::NoWeekdays.into());
        }
        let offset = self.trigger.offset_minutes();
        if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&offset) {
            return Err(ValidationError::OffsetOutOfRange(offset).into());
        }
        for action in &self.actions {
            CoverTarget::new(i32::from(action.position), i32::from(action.tilt))?;
        }
        Ok(())
    }

    /// Whether `last_fired` falls in the same UTC minute as `now`.
    #[must_use]
    pub fn fired_within_minute(&self, now: Timestamp) -> bool {
        self.last_fired
            .is_some_and(|last| last.timestamp().div_euclid(60) == now.timestamp().div_euclid(60))
    }

    /// Decide whether this schedule should fire at `now`.
    ///
    /// `local_now` is `now` expressed in local wall-clock time; weekday and
    /// minute matching use it.
    #[must_use]
    pub fn readiness(
        &self,
        now: Timestamp,
        local_now: &DateTime<FixedOffset>,
        solar: &SolarState,
    ) -> Readiness {
        if !self.enabled {
            return Readiness::Disabled;
        }
        if !self.weekdays.contains(local_now.weekday()) {
            return Readiness::NotToday;
        }
        let Some(trigger_time) = self.trigger.resolve(solar) else {
            return Readiness::NoSolarTime(solar.regime);
        };
        if ClockTime::of(local_now) != trigger_time.wrapped() {
            return Readiness::Waiting(trigger_time);
        }
        if self.fired_within_minute(now) {
            return Readiness::AlreadyFired;
        }
        Readiness::Due
    }
}

/// Step-by-step builder for [`Schedule`].
#[derive(Debug, Default)]
pub struct ScheduleBuilder {
    id: Option<ScheduleId>,
    name: Option<String>,
    enabled: Option<bool>,
    weekdays: Option<WeekdaySet>,
    trigger: Option<ScheduleTrigger>,
    actions: Vec<ScheduleAction>,
    last_fired: Option<Timestamp>,
}

impl ScheduleBuilder {
    #[must_use]
    pub fn id(mut self, id: ScheduleId) -> Self {
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

    #[must_use]
    pub fn weekdays(mut self, weekdays: WeekdaySet) -> Self {
        self.weekdays = Some(weekdays);
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: ScheduleTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn action(mut self, action: ScheduleAction) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn last_fired(mut self, ts: Timestamp) -> Self {
        self.last_fired = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a [`Schedule`].
    ///
    /// Defaults: enabled, every day, firing at midnight.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeHubError::Validation`] if invariants fail.
    pub fn build(self) -> Result<Schedule, ShadeHubError> {
        let schedule = Schedule {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            weekdays: self.weekdays.unwrap_or_default(),
            trigger: self.trigger.unwrap_or(ScheduleTrigger::At {
                time: ClockTime::MIDNIGHT,
            }),
            actions: self.actions,
            last_fired: self.last_fired,
        };
        schedule.validate()?;
        Ok(schedule)
    }
}
