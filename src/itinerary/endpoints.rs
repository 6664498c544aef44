//! The route handlers for trip days and day itineraries.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    database_id::{DayItineraryId, TripId},
    state::DatabaseState,
    trip::get_trip,
    user::UserId,
};

use super::{
    core::{DayItinerary, get_or_create_day, update_day_notes},
    loader::{DayDetail, TripDays, load_day, load_trip_days},
};

/// A route handler that returns every day of a trip with its content.
///
/// Days the user has not added anything to yet are included as empty slots,
/// so the client can render the full trip calendar from this one response.
pub async fn get_trip_days_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(trip_id): Path<TripId>,
) -> Result<Json<TripDays>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let trip = get_trip(trip_id, user_id, &connection)?;

    load_trip_days(&trip, &connection).map(Json)
}

/// The request body for creating a day itinerary.
#[derive(Debug, Deserialize)]
pub struct DayForm {
    /// The calendar date the day itinerary is for.
    pub date: Date,
}

/// A route handler that returns the day itinerary for a date, creating an
/// empty one if the date has none yet.
///
/// Repeating the request for the same date returns the same day itinerary.
pub async fn create_trip_day_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(trip_id): Path<TripId>,
    Json(form): Json<DayForm>,
) -> Result<Json<DayItinerary>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let trip = get_trip(trip_id, user_id, &connection)?;

    if form.date < trip.start_date || form.date > trip.end_date {
        return Err(Error::DateOutsideTrip(form.date));
    }

    get_or_create_day(trip.id, form.date, &connection).map(Json)
}

/// A route handler that returns a single day itinerary with its content.
pub async fn get_day_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(day_id): Path<DayItineraryId>,
) -> Result<Json<DayDetail>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    load_day(day_id, user_id, &connection).map(Json)
}

/// The request body for updating a day itinerary's notes.
#[derive(Debug, Deserialize)]
pub struct NotesForm {
    /// The new notes, or `null` to clear them.
    pub notes: Option<String>,
}

/// A route handler for replacing a day itinerary's notes.
pub async fn update_day_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(day_id): Path<DayItineraryId>,
    Json(form): Json<NotesForm>,
) -> Result<Json<DayItinerary>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    update_day_notes(day_id, user_id, form.notes.as_deref(), &connection).map(Json)
}
