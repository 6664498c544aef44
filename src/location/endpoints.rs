//! The route handlers for creating, updating, reordering and deleting
//! locations.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    Error,
    database_id::{DayItineraryId, LocationId},
    itinerary::get_day,
    state::DatabaseState,
    user::UserId,
};

use super::{
    Location, NewLocation, UpdatedLocation, create_location, delete_location, reorder_locations,
    update_location,
};

/// A route handler for adding a location to a day itinerary.
///
/// The location is appended to the end of the day's visit order.
pub async fn create_location_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Json(new_location): Json<NewLocation>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    // Resolving the day also checks that it belongs to the current user.
    get_day(new_location.day_itinerary_id, user_id, &connection)?;

    let location = create_location(&new_location, &connection)?;

    Ok((StatusCode::CREATED, Json(location)).into_response())
}

/// A route handler for updating a location's details.
pub async fn update_location_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(location_id): Path<LocationId>,
    Json(updated_location): Json<UpdatedLocation>,
) -> Result<Json<Location>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    update_location(location_id, user_id, &updated_location, &connection).map(Json)
}

/// A route handler for deleting a location.
pub async fn delete_location_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(location_id): Path<LocationId>,
) -> Result<StatusCode, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    delete_location(location_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// The request body for reordering the locations of a day.
#[derive(Debug, Deserialize)]
pub struct ReorderForm {
    /// The ID of the day itinerary whose locations are being reordered.
    pub day_itinerary_id: DayItineraryId,
    /// The day's location IDs in their new visit order.
    pub location_ids: Vec<LocationId>,
}

/// A route handler for rewriting the visit order of a day's locations.
///
/// Returns the day's locations in their new order.
pub async fn reorder_locations_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Json(form): Json<ReorderForm>,
) -> Result<Json<Vec<Location>>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    get_day(form.day_itinerary_id, user_id, &connection)?;

    reorder_locations(form.day_itinerary_id, user_id, &form.location_ids, &connection).map(Json)
}
