//! Common error types used across the workspace.
//!
//! Each layer converts into [`ShadeHubError`] via `#[from]`; there is no
//! string-typed catch-all variant.

/// Top-level error returned by domain and application operations.
#[derive(Debug, thiserror::Error)]
pub enum ShadeHubError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

/// A domain invariant was violated by caller-supplied data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("identifier must not be empty")]
    EmptyId,

    #[error("position {0} is outside 0..=100")]
    PositionOutOfRange(i32),

    #[error("tilt {0} is outside 0..=90")]
    TiltOutOfRange(i32),

    #[error("latitude {0} is outside -90..=90")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside -180..=180")]
    LongitudeOutOfRange(f64),

    #[error("invalid clock time {0:?}, expected HH:MM")]
    InvalidClockTime(String),

    #[error("unknown weekday {0:?}")]
    UnknownWeekday(String),

    #[error("at least one action is required")]
    NoActions,

    #[error("weekday set must not be empty")]
    NoWeekdays,

    #[error("offset {0} minutes is outside -720..=720")]
    OffsetOutOfRange(i32),

    #[error("comparison {comparison} cannot be used with a {trigger} trigger")]
    IncompatibleComparison {
        trigger: &'static str,
        comparison: &'static str,
    },

    #[error("rule target must select at least one facing or room")]
    NoTarget,

    #[error("occupancy rules must target at least one room")]
    OccupancyWithoutRoom,

    #[error("threshold must be a finite number")]
    NonFiniteThreshold,

    #[error("{0} reading must be a finite, non-negative number")]
    InvalidReading(&'static str),

    #[error("duplicate identifier {0}")]
    DuplicateId(String),

    #[error("zone {zone} references unknown device {device}")]
    UnknownMember { zone: String, device: String },
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_shadehub_error() {
        let err: ShadeHubError = ValidationError::PositionOutOfRange(-5).into();
        assert!(matches!(
            err,
            ShadeHubError::Validation(ValidationError::PositionOutOfRange(-5))
        ));
    }

    #[test]
    fn should_render_not_found_message_with_entity_and_id() {
        let err: ShadeHubError = NotFoundError {
            entity: "Device",
            id: "living-south".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Device living-south not found");
    }

    #[test]
    fn should_render_incompatible_comparison_message() {
        let err = ValidationError::IncompatibleComparison {
            trigger: "temperature",
            comparison: "occupied",
        };
        assert_eq!(
            err.to_string(),
            "comparison occupied cannot be used with a temperature trigger"
        );
    }
}
