//! The route handlers for uploading, listing and deleting photos.

use std::str::FromStr;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    Error,
    database_id::{DayItineraryId, LocationId, PhotoId, TripId},
    itinerary::get_day,
    location::{get_location, set_location_photo},
    state::PhotoState,
    trip::{get_trip, set_trip_cover},
    user::UserId,
};

use super::{
    NewPhoto, Photo, PhotoCategory,
    core::{create_photo, delete_photo, list_photos_for_trip},
};

/// Map an upload's content type to the file extension to store it under.
fn extension_for_content_type(content_type: &str) -> Result<&'static str, Error> {
    match content_type {
        "image/jpeg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "image/gif" => Ok("gif"),
        other => Err(Error::NotAnImage(other.to_owned())),
    }
}

/// The file part of a photo upload form.
struct UploadedFile {
    extension: &'static str,
    file_name: String,
    mime_type: String,
    data: Vec<u8>,
}

/// The parsed fields of a photo upload form.
#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    caption: Option<String>,
    category: PhotoCategory,
    day_itinerary_id: Option<DayItineraryId>,
    location_id: Option<LocationId>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, Error> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let mime_type = field.content_type().unwrap_or_default().to_owned();
                let extension = extension_for_content_type(&mime_type)?;
                let file_name = field
                    .file_name()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("photo.{extension}"));
                let data = field
                    .bytes()
                    .await
                    .map_err(|error| Error::MultipartError(error.to_string()))?;

                form.file = Some(UploadedFile {
                    extension,
                    file_name,
                    mime_type,
                    data: data.to_vec(),
                });
            }
            Some("caption") => {
                let text = field
                    .text()
                    .await
                    .map_err(|error| Error::MultipartError(error.to_string()))?;

                if !text.is_empty() {
                    form.caption = Some(text);
                }
            }
            Some("category") => {
                let text = field
                    .text()
                    .await
                    .map_err(|error| Error::MultipartError(error.to_string()))?;

                form.category = PhotoCategory::from_str(&text).map_err(Error::MultipartError)?;
            }
            Some("day_itinerary_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|error| Error::MultipartError(error.to_string()))?;

                let day_id = text.parse().map_err(|_| {
                    Error::MultipartError(format!("day_itinerary_id {text:?} is not an integer"))
                })?;
                form.day_itinerary_id = Some(day_id);
            }
            Some("location_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|error| Error::MultipartError(error.to_string()))?;

                let location_id = text.parse().map_err(|_| {
                    Error::MultipartError(format!("location_id {text:?} is not an integer"))
                })?;
                form.location_id = Some(location_id);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// A route handler for uploading a photo to a trip.
///
/// Accepts a multipart form with a `file` part plus optional `caption`,
/// `category`, `day_itinerary_id` and `location_id` text parts. The file is
/// written to the media store before its row is inserted, so a failed insert
/// can leave an orphaned file but never a row without a file.
///
/// Uploads with the `trip_cover` category become the trip's cover image, and
/// uploads attached to a location become that location's photo.
pub async fn upload_photo_endpoint(
    State(state): State<PhotoState>,
    Extension(user_id): Extension<UserId>,
    Path(trip_id): Path<TripId>,
    multipart: Multipart,
) -> Result<Response, Error> {
    // The multipart body has to be read before taking the database lock,
    // the lock guard cannot be held across an await point.
    let form = read_upload_form(multipart).await?;
    let file = form.file.ok_or(Error::MissingFile)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    get_trip(trip_id, user_id, &connection)?;

    if let Some(day_id) = form.day_itinerary_id {
        let day = get_day(day_id, user_id, &connection)?;

        if day.trip_id != trip_id {
            return Err(Error::NotFound);
        }
    }

    if let Some(location_id) = form.location_id {
        get_location(location_id, user_id, &connection)?;
    }

    let file_path = state
        .media_store
        .save(user_id.as_i64(), trip_id, file.extension, &file.data)?;

    let photo = create_photo(
        &NewPhoto {
            trip_id,
            day_itinerary_id: form.day_itinerary_id,
            location_id: form.location_id,
            category: form.category,
            file_path,
            file_name: file.file_name,
            file_size: file.data.len() as i64,
            mime_type: file.mime_type,
            caption: form.caption,
        },
        &connection,
    )?;

    if photo.category == PhotoCategory::TripCover {
        set_trip_cover(trip_id, &photo.url, &connection)?;
    }

    if let Some(location_id) = photo.location_id {
        set_location_photo(location_id, &photo.url, &connection)?;
    }

    tracing::info!("Uploaded photo {} to trip {trip_id}", photo.id);

    Ok((StatusCode::CREATED, Json(photo)).into_response())
}

/// The query parameters for listing a trip's photos.
#[derive(Debug, Deserialize)]
pub struct PhotoListQuery {
    /// Narrow the listing to photos attached to this day itinerary.
    pub day_itinerary_id: Option<DayItineraryId>,
}

/// A route handler that lists a trip's photos, newest first.
pub async fn list_trip_photos_endpoint(
    State(state): State<PhotoState>,
    Extension(user_id): Extension<UserId>,
    Path(trip_id): Path<TripId>,
    Query(query): Query<PhotoListQuery>,
) -> Result<Json<Vec<Photo>>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    get_trip(trip_id, user_id, &connection)?;

    list_photos_for_trip(trip_id, query.day_itinerary_id, &connection).map(Json)
}

/// A route handler for deleting a photo and its file.
pub async fn delete_photo_endpoint(
    State(state): State<PhotoState>,
    Extension(user_id): Extension<UserId>,
    Path(photo_id): Path<PhotoId>,
) -> Result<StatusCode, Error> {
    let photo = {
        let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

        delete_photo(photo_id, user_id, &connection)?
    };

    // The row is already gone, so a failed file removal only leaves an
    // orphaned file. Log it and report success.
    if let Err(error) = state.media_store.remove(&photo.file_path) {
        tracing::warn!("Could not remove file for deleted photo {photo_id}: {error}");
    }

    Ok(StatusCode::NO_CONTENT)
}
