//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/trips/{trip_id}', use
//! [format_endpoint].

/// The route for retrieving the current session's user.
pub const SESSION: &str = "/api/session";
/// The route for registering a user.
pub const USERS: &str = "/api/users";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";

/// The route to list and create trips.
pub const TRIPS: &str = "/api/trips";
/// The route to access a single trip.
pub const TRIP: &str = "/api/trips/{trip_id}";
/// The route to list a trip's day itineraries with their locations, photos
/// and expenses, and to lazily create a day itinerary for a date.
pub const TRIP_DAYS: &str = "/api/trips/{trip_id}/days";
/// The route for a trip's per-day expense totals (the budget tab).
pub const TRIP_EXPENSE_REPORT: &str = "/api/trips/{trip_id}/expense_report";
/// The route to access a single day itinerary.
pub const DAY: &str = "/api/days/{day_id}";

/// The route to create a location.
pub const LOCATIONS: &str = "/api/locations";
/// The route to reorder the locations within a day.
pub const REORDER_LOCATIONS: &str = "/api/locations/reorder";
/// The route to update or delete a location.
pub const LOCATION: &str = "/api/locations/{location_id}";

/// The route to create an expense.
pub const EXPENSES: &str = "/api/expenses";
/// The route to update or delete an expense.
pub const EXPENSE: &str = "/api/expenses/{expense_id}";

/// The route to list and upload a trip's photos.
pub const TRIP_PHOTOS: &str = "/api/trips/{trip_id}/photos";
/// The route to delete a photo.
pub const PHOTO: &str = "/api/photos/{photo_id}";
/// The route prefix from which uploaded photo files are served.
pub const MEDIA: &str = "/media";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/trips/{trip_id}', '{trip_id}' is
/// the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
