//! Time and calendar helpers.
//!
//! Everything that decides "is it now?" works on local wall-clock minutes.
//! The conversion from UTC uses [`LocalTimeRule`], a fixed standard offset
//! plus an optional calendar-based summer-time hour. It is an approximation,
//! not a timezone database lookup.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// UTC timestamp used for `last_fired`, `last_moved`, event times, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

const MINUTES_PER_DAY: i32 = 24 * 60;

/// A local wall-clock time at minute granularity.
///
/// `24:00` is allowed and represents the end of the day (used for the sunset
/// of a midnight-sun day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: Self = Self(0);
    pub const END_OF_DAY: Self = Self(1440);

    /// Build from hours and minutes.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidClockTime`] when the pair is not a
    /// valid wall-clock time.
    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, ValidationError> {
        if minute >= 60 || hour > 24 || (hour == 24 && minute != 0) {
            return Err(ValidationError::InvalidClockTime(format!(
                "{hour:02}:{minute:02}"
            )));
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Convert fractional hours into a clock time, rounded to the nearest
    /// minute and wrapped into a single day.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_hours_wrapping(hours: f64) -> Self {
        let minutes = (hours * 60.0).round() as i64;
        Self::wrap(minutes)
    }

    /// The minute-of-day of a local date-time, seconds ignored.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn of<Tz: chrono::TimeZone>(at: &DateTime<Tz>) -> Self {
        Self((at.hour() * 60 + at.minute()) as u16)
    }

    /// Shift by a signed number of minutes, wrapping around midnight.
    #[must_use]
    pub fn offset_by(self, minutes: i32) -> Self {
        Self::wrap(i64::from(self.0) + i64::from(minutes))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn wrap(minutes: i64) -> Self {
        Self(minutes.rem_euclid(i64::from(MINUTES_PER_DAY)) as u16)
    }

    /// `24:00` becomes `00:00`; every other time is unchanged.
    #[must_use]
    pub fn wrapped(self) -> Self {
        self.offset_by(0)
    }

    #[must_use]
    pub fn minute_of_day(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    #[must_use]
    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidClockTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if minute.len() != 2 {
            return Err(invalid());
        }
        let hour = hour.parse::<u16>().map_err(|_| invalid())?;
        let minute = minute.parse::<u16>().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// A set of days of the week, stored as a bitmask (Monday = bit 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct WeekdaySet(u8);

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl WeekdaySet {
    pub const ALL: Self = Self(0b111_1111);
    pub const WEEKDAYS: Self = Self(0b001_1111);
    pub const WEEKEND: Self = Self(0b110_0000);
    pub const EMPTY: Self = Self(0);

    #[must_use]
    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | (1 << day.num_days_from_monday()))
    }

    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        WEEK.into_iter().filter(move |day| self.contains(*day))
    }
}

impl Default for WeekdaySet {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl TryFrom<Vec<String>> for WeekdaySet {
    type Error = ValidationError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        let mut set = Self::EMPTY;
        for name in value {
            let lowered = name.trim().to_ascii_lowercase();
            set = match lowered.as_str() {
                "all" | "daily" => Self(set.0 | Self::ALL.0),
                "weekdays" => Self(set.0 | Self::WEEKDAYS.0),
                "weekend" => Self(set.0 | Self::WEEKEND.0),
                other => {
                    let day = Weekday::from_str(other)
                        .map_err(|_| ValidationError::UnknownWeekday(name.clone()))?;
                    set.with(day)
                }
            };
        }
        Ok(set)
    }
}

impl From<WeekdaySet> for Vec<String> {
    fn from(value: WeekdaySet) -> Self {
        value
            .iter()
            .map(|day| day.to_string().to_ascii_lowercase())
            .collect()
    }
}

/// Astronomical season, used to gate rules and to pick energy positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    #[serde(alias = "fall")]
    Autumn,
    Winter,
}

impl Season {
    /// Meteorological season of a calendar month in the northern hemisphere.
    #[must_use]
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    /// Season at a given date and latitude; flipped south of the equator.
    #[must_use]
    pub fn for_date(date: NaiveDate, latitude: f64) -> Self {
        let north = Self::from_month(date.month());
        if latitude >= 0.0 {
            return north;
        }
        match north {
            Self::Spring => Self::Autumn,
            Self::Summer => Self::Winter,
            Self::Autumn => Self::Spring,
            Self::Winter => Self::Summer,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        })
    }
}

/// Time-of-day bucket used to key favorite positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
}

impl DayPeriod {
    /// Morning before 12:00, afternoon before 18:00, evening otherwise.
    #[must_use]
    pub fn of(time: ClockTime) -> Self {
        match time.hour() {
            0..12 => Self::Morning,
            12..18 => Self::Afternoon,
            _ => Self::Evening,
        }
    }
}

/// Converts UTC instants to local wall-clock time.
///
/// Summer time, when observed, adds one hour between 01:00 UTC on the last
/// Sunday of March and 01:00 UTC on the last Sunday of October.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTimeRule {
    pub standard_offset_minutes: i32,
    pub observes_summer_time: bool,
}

impl LocalTimeRule {
    pub const UTC: Self = Self {
        standard_offset_minutes: 0,
        observes_summer_time: false,
    };

    #[must_use]
    pub fn new(standard_offset_minutes: i32, observes_summer_time: bool) -> Self {
        Self {
            standard_offset_minutes,
            observes_summer_time,
        }
    }

    #[must_use]
    pub fn is_summer_time(&self, at: Timestamp) -> bool {
        if !self.observes_summer_time {
            return false;
        }
        let year = at.year();
        match (
            last_sunday_one_am(year, 3),
            last_sunday_one_am(year, 10),
        ) {
            (Some(start), Some(end)) => at >= start && at < end,
            _ => false,
        }
    }

    /// Offset from UTC in effect at `at`.
    #[must_use]
    pub fn offset(&self, at: Timestamp) -> FixedOffset {
        let mut minutes = self.standard_offset_minutes;
        if self.is_summer_time(at) {
            minutes += 60;
        }
        FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    #[must_use]
    pub fn to_local(&self, at: Timestamp) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset(at))
    }
}

impl Default for LocalTimeRule {
    fn default() -> Self {
        Self::UTC
    }
}

fn last_sunday_one_am(year: i32, month: u32) -> Option<Timestamp> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last_day = first_of_next - Duration::days(1);
    let back = i64::from(last_day.weekday().num_days_from_sunday());
    let sunday = last_day - Duration::days(back);
    Some(sunday.and_hms_opt(1, 0, 0)?.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_parse_and_display_clock_time() {
        let time: ClockTime = "07:05".parse().unwrap();
        assert_eq!(time.minute_of_day(), 425);
        assert_eq!(time.to_string(), "07:05");
    }

    #[test]
    fn should_reject_malformed_clock_time() {
        assert!("7".parse::<ClockTime>().is_err());
        assert!("07:5".parse::<ClockTime>().is_err());
        assert!("25:00".parse::<ClockTime>().is_err());
        assert!("24:01".parse::<ClockTime>().is_err());
        assert!("aa:bb".parse::<ClockTime>().is_err());
    }

    #[test]
    fn should_accept_end_of_day() {
        assert_eq!("24:00".parse::<ClockTime>().unwrap(), ClockTime::END_OF_DAY);
    }

    #[test]
    fn should_wrap_offset_across_midnight() {
        let late: ClockTime = "23:30".parse().unwrap();
        assert_eq!(late.offset_by(45).to_string(), "00:15");
        let early: ClockTime = "00:10".parse().unwrap();
        assert_eq!(early.offset_by(-20).to_string(), "23:50");
    }

    #[test]
    fn should_round_fractional_hours_to_nearest_minute() {
        assert_eq!(ClockTime::from_hours_wrapping(6.508).to_string(), "06:30");
        assert_eq!(ClockTime::from_hours_wrapping(-0.5).to_string(), "23:30");
        assert_eq!(ClockTime::from_hours_wrapping(25.0).to_string(), "01:00");
    }

    #[test]
    fn should_parse_weekday_names_and_aliases() {
        let set =
            WeekdaySet::try_from(vec!["Mon".to_string(), "weekend".to_string()]).unwrap();
        assert!(set.contains(Weekday::Mon));
        assert!(set.contains(Weekday::Sat));
        assert!(set.contains(Weekday::Sun));
        assert!(!set.contains(Weekday::Tue));
    }

    #[test]
    fn should_reject_unknown_weekday() {
        let result = WeekdaySet::try_from(vec!["someday".to_string()]);
        assert!(matches!(result, Err(ValidationError::UnknownWeekday(_))));
    }

    #[test]
    fn should_serialize_weekdays_in_week_order() {
        let set: WeekdaySet = [Weekday::Fri, Weekday::Mon].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["mon","fri"]"#);
    }

    #[test]
    fn should_map_months_to_seasons_per_hemisphere() {
        let july = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(Season::for_date(july, 48.0), Season::Summer);
        assert_eq!(Season::for_date(july, -33.0), Season::Winter);
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(4), Season::Spring);
    }

    #[test]
    fn should_bucket_day_periods() {
        assert_eq!(DayPeriod::of("11:59".parse().unwrap()), DayPeriod::Morning);
        assert_eq!(DayPeriod::of("12:00".parse().unwrap()), DayPeriod::Afternoon);
        assert_eq!(DayPeriod::of("18:00".parse().unwrap()), DayPeriod::Evening);
    }

    #[test]
    fn should_apply_summer_time_between_march_and_october_switches() {
        let rule = LocalTimeRule::new(60, true);
        // 2024: last Sunday of March is the 31st, of October the 27th.
        let before = Utc.with_ymd_and_hms(2024, 3, 31, 0, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 31, 1, 0, 0).unwrap();
        let autumn = Utc.with_ymd_and_hms(2024, 10, 27, 1, 0, 0).unwrap();
        assert_eq!(rule.offset(before).local_minus_utc(), 3600);
        assert_eq!(rule.offset(after).local_minus_utc(), 7200);
        assert_eq!(rule.offset(autumn).local_minus_utc(), 3600);
    }

    #[test]
    fn should_ignore_summer_time_when_not_observed() {
        let rule = LocalTimeRule::new(-300, false);
        let july = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        assert_eq!(rule.offset(july).local_minus_utc(), -5 * 3600);
        assert_eq!(ClockTime::of(&rule.to_local(july)).to_string(), "07:00");
    }
}
