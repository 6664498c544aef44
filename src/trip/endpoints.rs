//! The route handlers for creating, listing, updating and deleting trips.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    database_id::TripId,
    state::DatabaseState,
    user::UserId,
};

use super::{
    NewTrip, Trip, TripWithTotal, create_trip, delete_trip, get_trip_with_total,
    list_trips_with_totals, update_trip,
};

/// A route handler that lists the user's trips with their expense totals.
pub async fn get_trips_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<TripWithTotal>>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    list_trips_with_totals(user_id, &connection).map(Json)
}

/// A route handler for creating a new trip.
pub async fn create_trip_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Json(new_trip): Json<NewTrip>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let trip = create_trip(&new_trip, user_id, &connection)?;

    Ok((StatusCode::CREATED, Json(trip)).into_response())
}

/// A route handler that returns a single trip with its expense total.
pub async fn get_trip_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(trip_id): Path<TripId>,
) -> Result<Json<TripWithTotal>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    get_trip_with_total(trip_id, user_id, &connection).map(Json)
}

/// A route handler for updating a trip.
pub async fn update_trip_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(trip_id): Path<TripId>,
    Json(updated_trip): Json<NewTrip>,
) -> Result<Json<Trip>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    update_trip(trip_id, user_id, &updated_trip, &connection).map(Json)
}

/// A route handler for deleting a trip and everything in it.
pub async fn delete_trip_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(trip_id): Path<TripId>,
) -> Result<StatusCode, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    delete_trip(trip_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
