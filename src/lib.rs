//! FamTriply is a self-hosted web app for planning multi-day family trips.
//!
//! Trips are organised into day-by-day itineraries holding locations, photos
//! and expenses. This library provides a JSON REST API backed by SQLite,
//! along with cookie-based session authentication and a local media store
//! for uploaded photos.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use time::Date;
use tokio::signal;

mod auth;
mod database_id;
mod db;
mod endpoints;
mod expense;
mod itinerary;
mod location;
mod money;
mod photo;
mod routing;
mod state;
mod trip;
mod user;

pub use db::initialize as initialize_db;
pub use photo::MediaStore;
pub use routing::build_router;
pub use state::AppState;
pub use user::{User, UserId, get_user_by_id};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid email and password combination.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The specified email already belongs to a registered user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// A trip's end date is earlier than its start date.
    ///
    /// Trip dates are inclusive calendar dates, so a single-day trip has
    /// `start == end`. Anything earlier than the start is invalid.
    #[error("invalid date range: end date {end} is before start date {start}")]
    InvalidDateRange {
        /// The trip's start date.
        start: Date,
        /// The offending end date.
        end: Date,
    },

    /// A trip spans more calendar days than the application supports.
    #[error("trip duration of {0} days exceeds the maximum of 90 days")]
    TripTooLong(i64),

    /// A day itinerary date falls outside its trip's date range.
    #[error("date {0} is outside the trip's date range")]
    DateOutsideTrip(Date),

    /// A required text field was empty or whitespace-only.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A monetary amount could not be parsed or was negative.
    ///
    /// Expense amounts are non-negative decimal values with at most two
    /// fractional digits, e.g. "12.50".
    #[error("invalid monetary amount \"{0}\"")]
    InvalidAmount(String),

    /// The multipart form could not be parsed as a photo upload.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a photo file.
    #[error("the upload did not contain a photo file")]
    MissingFile,

    /// The uploaded file is not an image type the application accepts.
    #[error("\"{0}\" is not a supported image type")]
    NotAnImage(String),

    /// A file could not be written to or removed from the media store.
    ///
    /// The inner string is the I/O error message; it is meant for the server
    /// logs, not the client.
    #[error("media store error: {0}")]
    FileStorageError(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A table or view named in a query does not exist in the database.
    ///
    /// Deployments may lack the `day_totals` and `trip_totals` aggregate
    /// views. Readers of those views treat this error as recoverable and
    /// fall back to computing totals in memory. For any other relation this
    /// indicates a broken schema and should be propagated.
    #[error("relation \"{0}\" does not exist")]
    SchemaMismatch(String),

    /// Tried to update a trip that does not exist
    #[error("tried to update a trip that is not in the database")]
    UpdateMissingTrip,

    /// Tried to delete a trip that does not exist
    #[error("tried to delete a trip that is not in the database")]
    DeleteMissingTrip,

    /// Tried to update a day itinerary that does not exist
    #[error("tried to update a day itinerary that is not in the database")]
    UpdateMissingDay,

    /// Tried to update a location that does not exist
    #[error("tried to update a location that is not in the database")]
    UpdateMissingLocation,

    /// Tried to delete a location that does not exist
    #[error("tried to delete a location that is not in the database")]
    DeleteMissingLocation,

    /// Tried to update an expense that does not exist
    #[error("tried to update an expense that is not in the database")]
    UpdateMissingExpense,

    /// Tried to delete an expense that does not exist
    #[error("tried to delete an expense that is not in the database")]
    DeleteMissingExpense,

    /// Tried to delete a photo that does not exist
    #[error("tried to delete a photo that is not in the database")]
    DeleteMissingPhoto,

    /// The database connection mutex was poisoned by a panicking thread.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // SQLite reports a missing table or view with a plain SQLITE_ERROR
            // and a "no such table: <name>" message. This is the one place
            // where that condition is detected; everything downstream matches
            // on [Error::SchemaMismatch].
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_ERROR
                    && desc.starts_with("no such table: ") =>
            {
                Error::SchemaMismatch(desc.trim_start_matches("no such table: ").to_owned())
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body returned for error responses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = match &self {
            Error::InvalidCredentials | Error::CookieMissing => StatusCode::UNAUTHORIZED,
            Error::NotFound
            | Error::UpdateMissingTrip
            | Error::DeleteMissingTrip
            | Error::UpdateMissingDay
            | Error::UpdateMissingLocation
            | Error::DeleteMissingLocation
            | Error::UpdateMissingExpense
            | Error::DeleteMissingExpense
            | Error::DeleteMissingPhoto => StatusCode::NOT_FOUND,
            Error::DuplicateEmail => StatusCode::CONFLICT,
            Error::TooWeak(_)
            | Error::InvalidDateRange { .. }
            | Error::TripTooLong(_)
            | Error::DateOutsideTrip(_)
            | Error::EmptyField(_)
            | Error::InvalidAmount(_)
            | Error::MultipartError(_)
            | Error::MissingFile => StatusCode::BAD_REQUEST,
            Error::NotAnImage(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            // Any errors that are not handled above are not intended to be
            // shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "An unexpected error occurred, check the server logs for more \
                                details."
                            .to_owned(),
                    }),
                )
                    .into_response();
            }
        };

        (
            status_code,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn missing_relation_maps_to_schema_mismatch() {
        let connection = rusqlite::Connection::open_in_memory().unwrap();

        let result = connection.query_row("SELECT day_total FROM day_totals", [], |row| {
            row.get::<_, i64>(0)
        });

        let error: Error = result.unwrap_err().into();
        assert_eq!(error, Error::SchemaMismatch("day_totals".to_owned()));
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let connection = rusqlite::Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE foo (id INTEGER PRIMARY KEY)", ())
            .unwrap();

        let result = connection.query_row("SELECT id FROM foo", [], |row| row.get::<_, i64>(0));

        let error: Error = result.unwrap_err().into();
        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn schema_mismatch_is_not_shown_to_the_client() {
        let response = Error::SchemaMismatch("trip_totals".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
