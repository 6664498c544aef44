//! Defines the location model and its database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, ToSql, params_from_iter};
use serde::{Deserialize, Serialize};
use time::Time;

use crate::{
    Error,
    database_id::{DayItineraryId, LocationId},
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// The kind of place a location is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationCategory {
    /// Somewhere to eat.
    Restaurant,
    /// A sight or landmark.
    Attraction,
    /// Overnight accommodation.
    Hotel,
    /// Something to do, e.g. a guided tour.
    Activity,
    /// Anything else.
    #[default]
    Other,
}

impl LocationCategory {
    fn as_str(&self) -> &'static str {
        match self {
            LocationCategory::Restaurant => "restaurant",
            LocationCategory::Attraction => "attraction",
            LocationCategory::Hotel => "hotel",
            LocationCategory::Activity => "activity",
            LocationCategory::Other => "other",
        }
    }
}

impl Display for LocationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LocationCategory {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "restaurant" => Ok(LocationCategory::Restaurant),
            "attraction" => Ok(LocationCategory::Attraction),
            "hotel" => Ok(LocationCategory::Hotel),
            "activity" => Ok(LocationCategory::Activity),
            "other" => Ok(LocationCategory::Other),
            _ => Err(format!("unknown location category {text:?}")),
        }
    }
}

/// A place to visit within a day itinerary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    /// The ID of the location.
    pub id: LocationId,
    /// The ID of the day itinerary the location belongs to.
    pub day_itinerary_id: DayItineraryId,
    /// The location's display name.
    pub name: String,
    /// The kind of place.
    pub category: LocationCategory,
    /// The street address, if known.
    pub address: Option<String>,
    /// The planned time of the visit, if any.
    pub visit_time: Option<Time>,
    /// Free-form notes, e.g. opening hours.
    pub notes: Option<String>,
    /// The URL of the location's photo, if one has been uploaded.
    pub photo_url: Option<String>,
    /// The location's position in the day's visit order, starting at zero.
    pub order_index: i64,
}

/// The data needed to create a location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewLocation {
    /// The ID of the day itinerary the location belongs to.
    pub day_itinerary_id: DayItineraryId,
    /// The location's display name.
    pub name: String,
    /// The kind of place.
    #[serde(default)]
    pub category: LocationCategory,
    /// The street address, if known.
    #[serde(default)]
    pub address: Option<String>,
    /// The planned time of the visit, if any.
    #[serde(default)]
    pub visit_time: Option<Time>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// The data needed to update a location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdatedLocation {
    /// The location's display name.
    pub name: String,
    /// The kind of place.
    #[serde(default)]
    pub category: LocationCategory,
    /// The street address, if known.
    #[serde(default)]
    pub address: Option<String>,
    /// The planned time of the visit, if any.
    #[serde(default)]
    pub visit_time: Option<Time>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const LOCATION_COLUMNS: &str =
    "id, day_itinerary_id, name, category, address, visit_time, notes, photo_url, order_index";

/// Create the location table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_location_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS location (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                day_itinerary_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'other',
                address TEXT,
                visit_time TEXT,
                notes TEXT,
                photo_url TEXT,
                order_index INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(day_itinerary_id) REFERENCES day_itinerary(id) ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_location_day ON location(day_itinerary_id, order_index);",
        (),
    )?;

    Ok(())
}

/// Create a new location at the end of its day's visit order.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyField] if the name is empty,
/// - [Error::NotFound] if the day itinerary does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_location(
    new_location: &NewLocation,
    connection: &Connection,
) -> Result<Location, Error> {
    if new_location.name.trim().is_empty() {
        return Err(Error::EmptyField("name"));
    }

    connection
        .prepare(&format!(
            "INSERT INTO location (day_itinerary_id, name, category, address, visit_time, notes, order_index)
             VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                (SELECT COALESCE(MAX(order_index) + 1, 0) FROM location
                 WHERE day_itinerary_id = ?1)
             )
             RETURNING {LOCATION_COLUMNS}"
        ))?
        .query_one(
            (
                new_location.day_itinerary_id,
                new_location.name.trim(),
                new_location.category.as_str(),
                &new_location.address,
                new_location.visit_time,
                &new_location.notes,
            ),
            map_location_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })
}

/// Retrieve the location with `location_id`, checking that its trip belongs
/// to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the location does not exist or belongs to another
///   user's trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_location(
    location_id: LocationId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Location, Error> {
    let location = connection
        .prepare(
            "SELECT location.id, location.day_itinerary_id, location.name, location.category,
                    location.address, location.visit_time, location.notes, location.photo_url,
                    location.order_index
             FROM location
             JOIN day_itinerary ON day_itinerary.id = location.day_itinerary_id
             JOIN trip ON trip.id = day_itinerary.trip_id
             WHERE location.id = :id AND trip.user_id = :user_id",
        )?
        .query_one(
            &[(":id", &location_id), (":user_id", &user_id.as_i64())],
            map_location_row,
        )?;

    Ok(location)
}

/// List the locations of every day in `day_ids`, in visit order within each
/// day.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_locations_for_days(
    day_ids: &[DayItineraryId],
    connection: &Connection,
) -> Result<Vec<Location>, Error> {
    if day_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = std::iter::repeat_n("?", day_ids.len())
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        "SELECT {LOCATION_COLUMNS}
         FROM location
         WHERE day_itinerary_id IN ({placeholders})
         ORDER BY day_itinerary_id, order_index ASC, id ASC"
    );

    let params: Vec<&dyn ToSql> = day_ids.iter().map(|id| id as &dyn ToSql).collect();

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params), map_location_row)?
        .map(|result| result.map_err(Error::from))
        .collect()
}

/// Update the location with `location_id`, checking that its trip belongs
/// to `user_id`.
///
/// The visit order and photo are left unchanged; use [reorder_locations]
/// and the photo upload endpoint for those.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyField] if the new name is empty,
/// - [Error::UpdateMissingLocation] if the location does not exist or
///   belongs to another user's trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_location(
    location_id: LocationId,
    user_id: UserId,
    updated_location: &UpdatedLocation,
    connection: &Connection,
) -> Result<Location, Error> {
    if updated_location.name.trim().is_empty() {
        return Err(Error::EmptyField("name"));
    }

    connection
        .prepare(&format!(
            "UPDATE location
             SET name = ?1, category = ?2, address = ?3, visit_time = ?4, notes = ?5
             WHERE id = ?6
               AND day_itinerary_id IN (
                 SELECT day_itinerary.id FROM day_itinerary
                 JOIN trip ON trip.id = day_itinerary.trip_id
                 WHERE trip.user_id = ?7
               )
             RETURNING {LOCATION_COLUMNS}"
        ))?
        .query_one(
            (
                updated_location.name.trim(),
                updated_location.category.as_str(),
                &updated_location.address,
                updated_location.visit_time,
                &updated_location.notes,
                location_id,
                user_id.as_i64(),
            ),
            map_location_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingLocation,
            error => error.into(),
        })
}

/// Record the URL of a location's photo.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn set_location_photo(
    location_id: LocationId,
    photo_url: &str,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE location SET photo_url = ?1 WHERE id = ?2",
        (photo_url, location_id),
    )?;

    Ok(())
}

/// Delete the location with `location_id`, checking that its trip belongs
/// to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingLocation] if the location does not exist or
///   belongs to another user's trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_location(
    location_id: LocationId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM location
         WHERE id = :id
           AND day_itinerary_id IN (
             SELECT day_itinerary.id FROM day_itinerary
             JOIN trip ON trip.id = day_itinerary.trip_id
             WHERE trip.user_id = :user_id
           )",
        &[(":id", &location_id), (":user_id", &user_id.as_i64())],
    )?;

    if rows_affected == 0 {
        Err(Error::DeleteMissingLocation)
    } else {
        Ok(())
    }
}

/// Rewrite the visit order of a day's locations to match `location_ids`.
///
/// Only locations that belong to the day (and to one of `user_id`'s trips)
/// are touched; IDs from other days are ignored. Returns the day's
/// locations in their new order.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn reorder_locations(
    day_id: DayItineraryId,
    user_id: UserId,
    location_ids: &[LocationId],
    connection: &Connection,
) -> Result<Vec<Location>, Error> {
    let mut statement = connection.prepare(
        "UPDATE location
         SET order_index = ?1
         WHERE id = ?2 AND day_itinerary_id = ?3
           AND day_itinerary_id IN (
             SELECT day_itinerary.id FROM day_itinerary
             JOIN trip ON trip.id = day_itinerary.trip_id
             WHERE trip.user_id = ?4
           )",
    )?;

    for (order_index, location_id) in location_ids.iter().enumerate() {
        statement.execute((order_index as i64, location_id, day_id, user_id.as_i64()))?;
    }

    list_locations_for_days(&[day_id], connection)
}

fn map_location_row(row: &Row) -> Result<Location, rusqlite::Error> {
    let raw_category: String = row.get(3)?;
    let category = LocationCategory::from_str(&raw_category).map_err(|message| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, message.into())
    })?;

    Ok(Location {
        id: row.get(0)?,
        day_itinerary_id: row.get(1)?,
        name: row.get(2)?,
        category,
        address: row.get(4)?,
        visit_time: row.get(5)?,
        notes: row.get(6)?,
        photo_url: row.get(7)?,
        order_index: row.get(8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
