//! Defines the day itinerary model and its database queries.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    database_id::{DayItineraryId, TripId},
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// One day of a trip that the user has added content to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayItinerary {
    /// The ID of the day itinerary.
    pub id: DayItineraryId,
    /// The ID of the trip the day belongs to.
    pub trip_id: TripId,
    /// The calendar date of the day.
    pub date: Date,
    /// Free-form notes for the day.
    pub notes: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the day itinerary table in the database.
///
/// The table has a uniqueness constraint on (trip_id, date) so that a trip
/// can never hold two itineraries for the same calendar date, no matter how
/// many concurrent requests try to create one.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_day_itinerary_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS day_itinerary (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trip_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                notes TEXT,
                UNIQUE(trip_id, date),
                FOREIGN KEY(trip_id) REFERENCES trip(id) ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_day_itinerary_trip ON day_itinerary(trip_id);",
        (),
    )?;

    Ok(())
}

/// Get the day itinerary for `date` in trip `trip_id`, creating an empty one
/// if the date has none yet.
///
/// Calling this any number of times for the same date returns the same row.
/// Two requests racing to create the same day both get the row that won the
/// insert, courtesy of the uniqueness constraint on (trip_id, date).
///
/// The caller is expected to have checked that the trip belongs to the
/// current user and that `date` falls within the trip's date range.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_or_create_day(
    trip_id: TripId,
    date: Date,
    connection: &Connection,
) -> Result<DayItinerary, Error> {
    let day = connection
        .prepare(
            "INSERT INTO day_itinerary (trip_id, date) VALUES (?1, ?2)
             ON CONFLICT(trip_id, date) DO UPDATE SET date = excluded.date
             RETURNING id, trip_id, date, notes",
        )?
        .query_one((trip_id, date), map_day_row)?;

    Ok(day)
}

/// Retrieve the day itinerary with `day_id`, checking that its trip belongs
/// to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the day does not exist or belongs to another
///   user's trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_day(
    day_id: DayItineraryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<DayItinerary, Error> {
    let day = connection
        .prepare(
            "SELECT day_itinerary.id, day_itinerary.trip_id, day_itinerary.date,
                    day_itinerary.notes
             FROM day_itinerary
             JOIN trip ON trip.id = day_itinerary.trip_id
             WHERE day_itinerary.id = :id AND trip.user_id = :user_id",
        )?
        .query_one(
            &[(":id", &day_id), (":user_id", &user_id.as_i64())],
            map_day_row,
        )?;

    Ok(day)
}

/// Replace the notes of the day itinerary with `day_id`, checking that its
/// trip belongs to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingDay] if the day does not exist or belongs to
///   another user's trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_day_notes(
    day_id: DayItineraryId,
    user_id: UserId,
    notes: Option<&str>,
    connection: &Connection,
) -> Result<DayItinerary, Error> {
    connection
        .prepare(
            "UPDATE day_itinerary SET notes = ?1
             WHERE id = ?2
               AND trip_id IN (SELECT id FROM trip WHERE user_id = ?3)
             RETURNING id, trip_id, date, notes",
        )?
        .query_one((notes, day_id, user_id.as_i64()), map_day_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingDay,
            error => error.into(),
        })
}

/// Get the ID of the trip that the day itinerary with `day_id` belongs to.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the day does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn resolve_trip_id(
    day_id: DayItineraryId,
    connection: &Connection,
) -> Result<TripId, Error> {
    connection
        .prepare("SELECT trip_id FROM day_itinerary WHERE id = :id")?
        .query_one(&[(":id", &day_id)], |row| row.get(0))
        .map_err(|error| error.into())
}

fn map_day_row(row: &Row) -> Result<DayItinerary, rusqlite::Error> {
    Ok(DayItinerary {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        date: row.get(2)?,
        notes: row.get(3)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
