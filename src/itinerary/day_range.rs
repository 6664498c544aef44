//! Expands a trip's date range into one slot per calendar day.

use serde::Serialize;
use time::Date;

use crate::Error;

/// The maximum number of calendar days a single trip may span.
pub const MAX_TRIP_DAYS: i64 = 90;

/// One calendar day of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DaySlot {
    /// The 1-based position of the day within the trip.
    pub day_number: u32,
    /// The calendar date of the day.
    pub date: Date,
}

/// The expanded day slots of a trip's date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRange {
    /// One slot per day, in chronological order.
    pub slots: Vec<DaySlot>,
    /// Whether the range was cut short at [MAX_TRIP_DAYS] days.
    pub truncated: bool,
}

/// Count the number of calendar days between `start_date` and `end_date`,
/// inclusive of both ends. A single-day trip has a length of one.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidDateRange] if the end date is before the start date,
/// - [Error::TripTooLong] if the range spans more than [MAX_TRIP_DAYS] days.
pub fn trip_length_days(start_date: Date, end_date: Date) -> Result<i64, Error> {
    if end_date < start_date {
        return Err(Error::InvalidDateRange {
            start: start_date,
            end: end_date,
        });
    }

    let length = (end_date - start_date).whole_days() + 1;

    if length > MAX_TRIP_DAYS {
        return Err(Error::TripTooLong(length));
    }

    Ok(length)
}

/// Expand an inclusive date range into one [DaySlot] per calendar day.
///
/// Trip creation rejects ranges longer than [MAX_TRIP_DAYS] days, but
/// ranges already in the database are expanded rather than rejected: the
/// slots are cut off at the maximum and the result is flagged as truncated.
///
/// # Errors
/// This function will return an [Error::InvalidDateRange] if the end date
/// is before the start date.
pub fn expand_trip_days(start_date: Date, end_date: Date) -> Result<DayRange, Error> {
    if end_date < start_date {
        return Err(Error::InvalidDateRange {
            start: start_date,
            end: end_date,
        });
    }

    let length = (end_date - start_date).whole_days() + 1;
    let truncated = length > MAX_TRIP_DAYS;

    if truncated {
        tracing::warn!(
            "date range {start_date} to {end_date} spans {length} days, \
             truncating to {MAX_TRIP_DAYS}"
        );
    }

    let day_count = length.min(MAX_TRIP_DAYS) as u32;
    let mut slots = Vec::with_capacity(day_count as usize);
    let mut date = start_date;

    for day_number in 1..=day_count {
        slots.push(DaySlot { day_number, date });

        date = match date.next_day() {
            Some(next_date) => next_date,
            None => break,
        };
    }

    Ok(DayRange { slots, truncated })
}
