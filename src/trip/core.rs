//! Defines the core data model and database queries for trips.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::TripId,
    itinerary::trip_length_days,
    money::{Cents, parse_amount},
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Where a trip is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    /// The trip has not started yet.
    #[default]
    Planning,
    /// The family is currently on the trip.
    Ongoing,
    /// The trip is over.
    Completed,
}

impl TripStatus {
    fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Planning => "planning",
            TripStatus::Ongoing => "ongoing",
            TripStatus::Completed => "completed",
        }
    }
}

impl Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "planning" => Ok(TripStatus::Planning),
            "ongoing" => Ok(TripStatus::Ongoing),
            "completed" => Ok(TripStatus::Completed),
            _ => Err(format!("unknown trip status {text:?}")),
        }
    }
}

/// A multi-day family trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    /// The ID of the trip.
    pub id: TripId,
    /// The ID of the user who owns the trip.
    pub user_id: UserId,
    /// The trip's display title, e.g. "Summer in Hokkaido".
    pub title: String,
    /// Where the trip goes, e.g. "Hokkaido, Japan".
    pub destination: String,
    /// An optional free-form description.
    pub description: Option<String>,
    /// The first day of the trip (inclusive).
    pub start_date: Date,
    /// The last day of the trip (inclusive).
    pub end_date: Date,
    /// An optional spending ceiling for the whole trip, in cents.
    pub budget: Option<Cents>,
    /// The URL of the trip's cover photo, set when a `trip_cover` photo is
    /// uploaded.
    pub cover_image_url: Option<String>,
    /// Where the trip is in its life cycle.
    pub status: TripStatus,
}

/// The data needed to create or update a trip.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTrip {
    /// The trip's display title.
    pub title: String,
    /// Where the trip goes.
    pub destination: String,
    /// An optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// The first day of the trip (inclusive).
    pub start_date: Date,
    /// The last day of the trip (inclusive).
    pub end_date: Date,
    /// An optional spending ceiling as a decimal string, e.g. "1500".
    #[serde(default)]
    pub budget: Option<String>,
    /// Where the trip is in its life cycle.
    #[serde(default)]
    pub status: TripStatus,
}

impl NewTrip {
    /// Check that the trip data can be stored and return the budget parsed
    /// into cents.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::EmptyField] if the title or destination is empty or
    ///   whitespace-only,
    /// - [Error::InvalidDateRange] if the end date is before the start date,
    /// - [Error::TripTooLong] if the trip spans more days than the
    ///   application supports,
    /// - [Error::InvalidAmount] if the budget is not a valid decimal amount.
    fn validate(&self) -> Result<Option<Cents>, Error> {
        if self.title.trim().is_empty() {
            return Err(Error::EmptyField("title"));
        }

        if self.destination.trim().is_empty() {
            return Err(Error::EmptyField("destination"));
        }

        trip_length_days(self.start_date, self.end_date)?;

        self.budget
            .as_deref()
            .map(parse_amount)
            .transpose()
    }
}

/// A trip along with the sum of its expenses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripWithTotal {
    /// The trip.
    #[serde(flatten)]
    pub trip: Trip,
    /// The sum of all expenses across the trip's day itineraries, in cents.
    pub total_expenses: Cents,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRIP_COLUMNS: &str =
    "id, user_id, title, destination, description, start_date, end_date, budget, \
     cover_image_url, status";

/// Create the trip table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_trip_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS trip (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                destination TEXT NOT NULL,
                description TEXT,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                budget INTEGER,
                cover_image_url TEXT,
                status TEXT NOT NULL DEFAULT 'planning',
                FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_trip_user ON trip(user_id);",
        (),
    )?;

    Ok(())
}

/// Create a new trip owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyField] if the title or destination is empty,
/// - [Error::InvalidDateRange] if the end date is before the start date,
/// - [Error::TripTooLong] if the trip spans more days than the application
///   supports,
/// - [Error::InvalidAmount] if the budget is not a valid decimal amount,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_trip(
    new_trip: &NewTrip,
    user_id: UserId,
    connection: &Connection,
) -> Result<Trip, Error> {
    let budget = new_trip.validate()?;

    let trip = connection
        .prepare(&format!(
            "INSERT INTO trip (user_id, title, destination, description, start_date, end_date,
                               budget, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {TRIP_COLUMNS}"
        ))?
        .query_one(
            (
                user_id.as_i64(),
                new_trip.title.trim(),
                new_trip.destination.trim(),
                &new_trip.description,
                new_trip.start_date,
                new_trip.end_date,
                budget,
                new_trip.status.as_str(),
            ),
            map_trip_row,
        )?;

    Ok(trip)
}

/// Retrieve the trip with `trip_id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the trip does not exist or belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_trip(trip_id: TripId, user_id: UserId, connection: &Connection) -> Result<Trip, Error> {
    let trip = connection
        .prepare(&format!(
            "SELECT {TRIP_COLUMNS} FROM trip WHERE id = :id AND user_id = :user_id"
        ))?
        .query_one(
            &[(":id", &trip_id), (":user_id", &user_id.as_i64())],
            map_trip_row,
        )?;

    Ok(trip)
}

/// List all trips owned by `user_id` along with their expense totals, most
/// recent first.
///
/// Expense totals are read from the `trip_totals` view when it exists.
/// Databases without the view get the same numbers computed from the base
/// tables.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_trips_with_totals(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<TripWithTotal>, Error> {
    let from_view = connection
        .prepare(
            "SELECT trip.id, trip.user_id, trip.title, trip.destination, trip.description,
                    trip.start_date, trip.end_date, trip.budget, trip.cover_image_url,
                    trip.status, COALESCE(totals.total_expenses, 0)
             FROM trip
             LEFT JOIN trip_totals totals ON totals.trip_id = trip.id
             WHERE trip.user_id = :user_id
             ORDER BY trip.start_date DESC, trip.id DESC",
        )
        .map_err(Error::from)
        .and_then(|mut statement| {
            statement
                .query_map(&[(":user_id", &user_id.as_i64())], map_trip_with_total_row)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(Error::from)
        });

    match from_view {
        Err(Error::SchemaMismatch(view)) => {
            tracing::warn!("aggregate view {view} is missing, computing totals from base tables");

            let trips = connection
                .prepare(&format!(
                    "SELECT {TRIP_COLUMNS} FROM trip WHERE user_id = :user_id
                     ORDER BY start_date DESC, id DESC"
                ))?
                .query_map(&[(":user_id", &user_id.as_i64())], map_trip_row)?
                .collect::<Result<Vec<_>, _>>()?;

            trips
                .into_iter()
                .map(|trip| {
                    let total_expenses = sum_trip_expenses(trip.id, connection)?;
                    Ok(TripWithTotal {
                        trip,
                        total_expenses,
                    })
                })
                .collect()
        }
        result => result,
    }
}

/// Retrieve the trip with `trip_id` owned by `user_id` along with its
/// expense total.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the trip does not exist or belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_trip_with_total(
    trip_id: TripId,
    user_id: UserId,
    connection: &Connection,
) -> Result<TripWithTotal, Error> {
    let trip = get_trip(trip_id, user_id, connection)?;
    let total_expenses = get_trip_total(trip_id, connection)?;

    Ok(TripWithTotal {
        trip,
        total_expenses,
    })
}

/// Get the sum of all expenses across a trip's day itineraries, in cents.
///
/// Reads the `trip_totals` view when it exists, otherwise computes the sum
/// from the base tables.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the trip does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_trip_total(trip_id: TripId, connection: &Connection) -> Result<Cents, Error> {
    let from_view = connection
        .prepare("SELECT total_expenses FROM trip_totals WHERE trip_id = :id")
        .map_err(Error::from)
        .and_then(|mut statement| {
            statement
                .query_one(&[(":id", &trip_id)], |row| row.get(0))
                .map_err(Error::from)
        });

    match from_view {
        Err(Error::SchemaMismatch(view)) => {
            tracing::warn!("aggregate view {view} is missing, computing totals from base tables");

            // Make sure a missing trip is still reported as not found.
            connection
                .prepare("SELECT id FROM trip WHERE id = :id")?
                .query_one(&[(":id", &trip_id)], |row| row.get::<_, i64>(0))?;

            sum_trip_expenses(trip_id, connection)
        }
        result => result,
    }
}

fn sum_trip_expenses(trip_id: TripId, connection: &Connection) -> Result<Cents, Error> {
    connection
        .prepare(
            "SELECT COALESCE(SUM(expense.amount), 0)
             FROM expense
             JOIN day_itinerary ON day_itinerary.id = expense.day_itinerary_id
             WHERE day_itinerary.trip_id = :id",
        )?
        .query_one(&[(":id", &trip_id)], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Update the trip with `trip_id` owned by `user_id`.
///
/// All fields except the cover image are replaced with the values in
/// `updated_trip`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyField], [Error::InvalidDateRange], [Error::TripTooLong] or
///   [Error::InvalidAmount] if the new data is invalid,
/// - [Error::UpdateMissingTrip] if the trip does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_trip(
    trip_id: TripId,
    user_id: UserId,
    updated_trip: &NewTrip,
    connection: &Connection,
) -> Result<Trip, Error> {
    let budget = updated_trip.validate()?;

    connection
        .prepare(&format!(
            "UPDATE trip
             SET title = ?1, destination = ?2, description = ?3, start_date = ?4,
                 end_date = ?5, budget = ?6, status = ?7
             WHERE id = ?8 AND user_id = ?9
             RETURNING {TRIP_COLUMNS}"
        ))?
        .query_one(
            (
                updated_trip.title.trim(),
                updated_trip.destination.trim(),
                &updated_trip.description,
                updated_trip.start_date,
                updated_trip.end_date,
                budget,
                updated_trip.status.as_str(),
                trip_id,
                user_id.as_i64(),
            ),
            map_trip_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingTrip,
            error => error.into(),
        })
}

/// Set the trip's cover image URL.
///
/// Called when a `trip_cover` photo is uploaded. Ownership is checked by the
/// caller.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn set_trip_cover(
    trip_id: TripId,
    cover_image_url: &str,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE trip SET cover_image_url = ?1 WHERE id = ?2",
        (cover_image_url, trip_id),
    )?;

    Ok(())
}

/// Delete the trip with `trip_id` owned by `user_id`.
///
/// The trip's day itineraries and their locations, photos and expenses are
/// deleted with it.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTrip] if the trip does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_trip(
    trip_id: TripId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM trip WHERE id = :id AND user_id = :user_id",
        &[(":id", &trip_id), (":user_id", &user_id.as_i64())],
    )?;

    if rows_affected == 0 {
        Err(Error::DeleteMissingTrip)
    } else {
        Ok(())
    }
}

fn map_trip_row(row: &Row) -> Result<Trip, rusqlite::Error> {
    let raw_status: String = row.get(9)?;
    let status = TripStatus::from_str(&raw_status).map_err(|message| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, message.into())
    })?;

    Ok(Trip {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        title: row.get(2)?,
        destination: row.get(3)?,
        description: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        budget: row.get(7)?,
        cover_image_url: row.get(8)?,
        status,
    })
}

fn map_trip_with_total_row(row: &Row) -> Result<TripWithTotal, rusqlite::Error> {
    Ok(TripWithTotal {
        trip: map_trip_row(row)?,
        total_expenses: row.get(10)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
