//! Creates the application's SQLite schema.
//!
//! Table definitions live next to their models in the feature modules; this
//! module ties them together and adds the read-only aggregate views.

use rusqlite::Connection;

use crate::{expense, itinerary, location, photo, trip, user};

/// Initialize the database by adding the tables for the domain models, the
/// supporting indexes and the aggregate views.
///
/// This function is idempotent and safe to call on an existing database.
///
/// # Errors
/// Returns an error if a table or view cannot be created or if there is an
/// SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    user::create_user_table(connection)?;
    trip::create_trip_table(connection)?;
    itinerary::create_day_itinerary_table(connection)?;
    location::create_location_table(connection)?;
    photo::create_photo_table(connection)?;
    expense::create_expense_table(connection)?;

    create_aggregate_views(connection)?;

    Ok(())
}

/// Create the `day_totals` and `trip_totals` views.
///
/// The views precompute expense sums per day and per trip. Legacy
/// deployments may not have them, so all readers must tolerate
/// [crate::Error::SchemaMismatch] and recompute in memory.
pub fn create_aggregate_views(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE VIEW IF NOT EXISTS day_totals AS
         SELECT
            day_itinerary.id AS day_itinerary_id,
            day_itinerary.trip_id AS trip_id,
            day_itinerary.date AS date,
            COALESCE(SUM(expense.amount), 0) AS day_total
         FROM day_itinerary
         LEFT JOIN expense ON expense.day_itinerary_id = day_itinerary.id
         GROUP BY day_itinerary.id",
        (),
    )?;

    connection.execute(
        "CREATE VIEW IF NOT EXISTS trip_totals AS
         SELECT
            trip.id AS trip_id,
            COALESCE(SUM(expense.amount), 0) AS total_expenses
         FROM trip
         LEFT JOIN day_itinerary ON day_itinerary.trip_id = trip.id
         LEFT JOIN expense ON expense.day_itinerary_id = day_itinerary.id
         GROUP BY trip.id",
        (),
    )?;

    Ok(())
}

/// Drop the aggregate views, leaving the schema in the state of a legacy
/// deployment that never had them.
pub fn drop_aggregate_views(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute("DROP VIEW IF EXISTS day_totals", ())?;
    connection.execute("DROP VIEW IF EXISTS trip_totals", ())?;

    Ok(())
}
