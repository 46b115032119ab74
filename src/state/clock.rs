//! Simulated clock overrides stored in the session state.
//!
//! The application under test reads `datetime` instead of the system clock,
//! which lets scenarios pin "today" to a fixed date or time. Overriding only
//! the date keeps any previously pinned time-of-day and vice versa.

use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

use super::{SessionState, StateError};

const DATETIME_LABEL: &str = "YYYY-MM-DD HH:MM:SS";
const DATE_LABEL: &str = "YYYY-MM-DD";
const TIME_LABEL: &str = "HH:MM:SS";

pub(crate) fn parse_datetime(value: &str) -> Result<PrimitiveDateTime, StateError> {
    PrimitiveDateTime::parse(
        value.trim(),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .map_err(|_| StateError::InvalidDatetime {
        expected: DATETIME_LABEL,
        value: value.to_owned(),
    })
}

pub(crate) fn format_datetime(value: PrimitiveDateTime) -> Result<String, StateError> {
    value
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .map_err(|_| StateError::InvalidDatetime {
            expected: DATETIME_LABEL,
            value: value.to_string(),
        })
}

/// Pin the simulated date to `date` (`YYYY-MM-DD`).
///
/// The time-of-day comes from the currently pinned `datetime` when present,
/// otherwise from `now`.
///
/// # Errors
///
/// Returns [`StateError::InvalidDatetime`] when `date` is malformed or the
/// stored `datetime` cannot be parsed.
///
/// # Examples
///
/// ```
/// use testsession::state::{SessionState, set_current_date};
/// use time::macros::datetime;
///
/// let mut state = SessionState::new();
/// set_current_date(&mut state, "2009-10-31", datetime!(2024-01-01 08:15:00))?;
/// assert_eq!(state.get("datetime").and_then(|v| v.as_str()), Some("2009-10-31 08:15:00"));
/// # Ok::<(), testsession::state::StateError>(())
/// ```
pub fn set_current_date(
    state: &mut SessionState,
    date: &str,
    now: PrimitiveDateTime,
) -> Result<PrimitiveDateTime, StateError> {
    let day = Date::parse(date.trim(), format_description!("[year]-[month]-[day]")).map_err(
        |_| StateError::InvalidDatetime {
            expected: DATE_LABEL,
            value: date.to_owned(),
        },
    )?;
    let time_of_day = state.datetime()?.map_or_else(|| now.time(), |pinned| pinned.time());
    let pinned = PrimitiveDateTime::new(day, time_of_day);
    state.set_datetime(pinned)?;
    Ok(pinned)
}

/// Pin the simulated time-of-day to `time` (`HH:MM:SS`).
///
/// The date comes from the currently pinned `datetime` when present,
/// otherwise from `now`.
///
/// # Errors
///
/// Returns [`StateError::InvalidDatetime`] when `time` is malformed or the
/// stored `datetime` cannot be parsed.
pub fn set_current_time(
    state: &mut SessionState,
    time: &str,
    now: PrimitiveDateTime,
) -> Result<PrimitiveDateTime, StateError> {
    let time_of_day = Time::parse(time.trim(), format_description!("[hour]:[minute]:[second]"))
        .map_err(|_| StateError::InvalidDatetime {
            expected: TIME_LABEL,
            value: time.to_owned(),
        })?;
    let day = state.datetime()?.map_or_else(|| now.date(), |pinned| pinned.date());
    let pinned = PrimitiveDateTime::new(day, time_of_day);
    state.set_datetime(pinned)?;
    Ok(pinned)
}
