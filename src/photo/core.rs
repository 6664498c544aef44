//! Defines the photo model and its database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, ToSql, params_from_iter};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{DayItineraryId, LocationId, PhotoId, TripId},
    endpoints,
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// What a photo is of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhotoCategory {
    /// The trip's cover image.
    TripCover,
    /// A photo of a visited location.
    Location,
    /// A souvenir or purchase.
    Souvenir,
    /// Anything else.
    #[default]
    General,
}

impl PhotoCategory {
    fn as_str(&self) -> &'static str {
        match self {
            PhotoCategory::TripCover => "trip_cover",
            PhotoCategory::Location => "location",
            PhotoCategory::Souvenir => "souvenir",
            PhotoCategory::General => "general",
        }
    }
}

impl Display for PhotoCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PhotoCategory {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "trip_cover" => Ok(PhotoCategory::TripCover),
            "location" => Ok(PhotoCategory::Location),
            "souvenir" => Ok(PhotoCategory::Souvenir),
            "general" => Ok(PhotoCategory::General),
            _ => Err(format!("unknown photo category {text:?}")),
        }
    }
}

/// An uploaded photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Photo {
    /// The ID of the photo.
    pub id: PhotoId,
    /// The ID of the trip the photo belongs to.
    pub trip_id: TripId,
    /// The day itinerary the photo is attached to, if any.
    pub day_itinerary_id: Option<DayItineraryId>,
    /// The location the photo is attached to, if any.
    pub location_id: Option<LocationId>,
    /// What the photo is of.
    pub category: PhotoCategory,
    /// The file's path relative to the media directory.
    #[serde(skip)]
    pub file_path: String,
    /// The URL the photo file is served from.
    pub url: String,
    /// The name the file was uploaded with.
    pub file_name: String,
    /// The file's size in bytes.
    pub file_size: i64,
    /// The file's MIME type, e.g. "image/jpeg".
    pub mime_type: String,
    /// An optional caption.
    pub caption: Option<String>,
    /// When the photo was uploaded.
    pub created_at: OffsetDateTime,
}

/// The data needed to record an uploaded photo.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    /// The ID of the trip the photo belongs to.
    pub trip_id: TripId,
    /// The day itinerary the photo is attached to, if any.
    pub day_itinerary_id: Option<DayItineraryId>,
    /// The location the photo is attached to, if any.
    pub location_id: Option<LocationId>,
    /// What the photo is of.
    pub category: PhotoCategory,
    /// The file's path relative to the media directory.
    pub file_path: String,
    /// The name the file was uploaded with.
    pub file_name: String,
    /// The file's size in bytes.
    pub file_size: i64,
    /// The file's MIME type.
    pub mime_type: String,
    /// An optional caption.
    pub caption: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const PHOTO_COLUMNS: &str =
    "id, trip_id, day_itinerary_id, location_id, category, file_path, file_name, file_size, \
     mime_type, caption, created_at";

/// Create the photo table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_photo_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS photo (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trip_id INTEGER NOT NULL,
                day_itinerary_id INTEGER,
                location_id INTEGER,
                category TEXT NOT NULL DEFAULT 'general',
                file_path TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                mime_type TEXT NOT NULL,
                caption TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY(trip_id) REFERENCES trip(id) ON DELETE CASCADE,
                FOREIGN KEY(day_itinerary_id) REFERENCES day_itinerary(id) ON DELETE CASCADE,
                FOREIGN KEY(location_id) REFERENCES location(id) ON DELETE SET NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_photo_trip ON photo(trip_id);",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_photo_day ON photo(day_itinerary_id);",
        (),
    )?;

    Ok(())
}

/// Record an uploaded photo.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the trip, day itinerary or location does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_photo(new_photo: &NewPhoto, connection: &Connection) -> Result<Photo, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO photo (trip_id, day_itinerary_id, location_id, category, file_path,
                                file_name, file_size, mime_type, caption, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING {PHOTO_COLUMNS}"
        ))?
        .query_one(
            (
                new_photo.trip_id,
                new_photo.day_itinerary_id,
                new_photo.location_id,
                new_photo.category.as_str(),
                &new_photo.file_path,
                &new_photo.file_name,
                new_photo.file_size,
                &new_photo.mime_type,
                &new_photo.caption,
                OffsetDateTime::now_utc(),
            ),
            map_photo_row,
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

/// List a trip's photos, newest first, optionally narrowed to one day
/// itinerary.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_photos_for_trip(
    trip_id: TripId,
    day_itinerary_id: Option<DayItineraryId>,
    connection: &Connection,
) -> Result<Vec<Photo>, Error> {
    match day_itinerary_id {
        Some(day_id) => connection
            .prepare(&format!(
                "SELECT {PHOTO_COLUMNS} FROM photo
                 WHERE trip_id = :trip_id AND day_itinerary_id = :day_id
                 ORDER BY created_at DESC, id DESC"
            ))?
            .query_map(&[(":trip_id", &trip_id), (":day_id", &day_id)], map_photo_row)?
            .map(|result| result.map_err(Error::from))
            .collect(),
        None => connection
            .prepare(&format!(
                "SELECT {PHOTO_COLUMNS} FROM photo
                 WHERE trip_id = :trip_id
                 ORDER BY created_at DESC, id DESC"
            ))?
            .query_map(&[(":trip_id", &trip_id)], map_photo_row)?
            .map(|result| result.map_err(Error::from))
            .collect(),
    }
}

/// List the photos attached to any day in `day_ids`, newest first within
/// each day.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_photos_for_days(
    day_ids: &[DayItineraryId],
    connection: &Connection,
) -> Result<Vec<Photo>, Error> {
    if day_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = std::iter::repeat_n("?", day_ids.len())
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        "SELECT {PHOTO_COLUMNS} FROM photo
         WHERE day_itinerary_id IN ({placeholders})
         ORDER BY day_itinerary_id, created_at DESC, id DESC"
    );

    let params: Vec<&dyn ToSql> = day_ids.iter().map(|id| id as &dyn ToSql).collect();

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params), map_photo_row)?
        .map(|result| result.map_err(Error::from))
        .collect()
}

/// Delete the photo with `photo_id`, checking that its trip belongs to
/// `user_id`. Returns the deleted photo so the caller can remove its file.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingPhoto] if the photo does not exist or belongs to
///   another user's trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_photo(
    photo_id: PhotoId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Photo, Error> {
    connection
        .prepare(&format!(
            "DELETE FROM photo
             WHERE id = ?1
               AND trip_id IN (SELECT id FROM trip WHERE user_id = ?2)
             RETURNING {PHOTO_COLUMNS}"
        ))?
        .query_one((photo_id, user_id.as_i64()), map_photo_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::DeleteMissingPhoto,
            error => error.into(),
        })
}

fn map_photo_row(row: &Row) -> Result<Photo, rusqlite::Error> {
    let raw_category: String = row.get(4)?;
    let category = PhotoCategory::from_str(&raw_category).map_err(|message| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, message.into())
    })?;
    let file_path: String = row.get(5)?;
    let url = format!("{}/{}", endpoints::MEDIA, file_path);

    Ok(Photo {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        day_itinerary_id: row.get(2)?,
        location_id: row.get(3)?,
        category,
        file_path,
        url,
        file_name: row.get(6)?,
        file_size: row.get(7)?,
        mime_type: row.get(8)?,
        caption: row.get(9)?,
        created_at: row.get(10)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod photo_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        database_id::TripId,
        db::initialize,
        itinerary::get_or_create_day,
        trip::{NewTrip, TripStatus, create_trip},
        user::{PasswordHash, UserId, create_user},
    };

    use super::{
        NewPhoto, PhotoCategory, create_photo, delete_photo, list_photos_for_days,
        list_photos_for_trip,
    };

    fn get_test_fixture() -> (Connection, UserId, TripId) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "mum@example.com",
            PasswordHash::new_unchecked("notarealhash"),
            &connection,
        )
        .unwrap();
        let trip = create_trip(
            &NewTrip {
                title: "Summer in Hokkaido".to_owned(),
                destination: "Hokkaido, Japan".to_owned(),
                description: None,
                start_date: date!(2024 - 07 - 01),
                end_date: date!(2024 - 07 - 05),
                budget: None,
                status: TripStatus::Planning,
            },
            user.id,
            &connection,
        )
        .unwrap();

        (connection, user.id, trip.id)
    }

    fn new_photo(trip_id: TripId, file_path: &str) -> NewPhoto {
        NewPhoto {
            trip_id,
            day_itinerary_id: None,
            location_id: None,
            category: PhotoCategory::General,
            file_path: file_path.to_owned(),
            file_name: "photo.jpg".to_owned(),
            file_size: 17,
            mime_type: "image/jpeg".to_owned(),
            caption: None,
        }
    }

    #[test]
    fn create_builds_media_url() {
        let (connection, _, trip_id) = get_test_fixture();

        let photo = create_photo(&new_photo(trip_id, "1/1/123-0.jpg"), &connection).unwrap();

        assert_eq!(photo.url, "/media/1/1/123-0.jpg");
        assert_eq!(photo.file_name, "photo.jpg");
        assert_eq!(photo.file_size, 17);
        assert_eq!(photo.mime_type, "image/jpeg");
        assert_eq!(photo.day_itinerary_id, None);
    }

    #[test]
    fn create_for_missing_trip_is_not_found() {
        let (connection, _, _) = get_test_fixture();

        let result = create_photo(&new_photo(999, "1/999/123-0.jpg"), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn list_filters_by_day() {
        let (connection, _, trip_id) = get_test_fixture();
        let day = get_or_create_day(trip_id, date!(2024 - 07 - 02), &connection).unwrap();
        create_photo(&new_photo(trip_id, "1/1/1-0.jpg"), &connection).unwrap();
        let day_photo = create_photo(
            &NewPhoto {
                day_itinerary_id: Some(day.id),
                category: PhotoCategory::Location,
                ..new_photo(trip_id, "1/1/2-0.jpg")
            },
            &connection,
        )
        .unwrap();

        let all = list_photos_for_trip(trip_id, None, &connection).unwrap();
        let for_day = list_photos_for_trip(trip_id, Some(day.id), &connection).unwrap();
        let by_day_set = list_photos_for_days(&[day.id], &connection).unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(for_day, vec![day_photo.clone()]);
        assert_eq!(by_day_set, vec![day_photo]);
    }

    #[test]
    fn delete_returns_photo_for_file_cleanup() {
        let (connection, user_id, trip_id) = get_test_fixture();
        let photo = create_photo(&new_photo(trip_id, "1/1/123-0.jpg"), &connection).unwrap();

        let deleted = delete_photo(photo.id, user_id, &connection).unwrap();

        assert_eq!(deleted.file_path, "1/1/123-0.jpg");
        assert_eq!(
            delete_photo(photo.id, user_id, &connection),
            Err(Error::DeleteMissingPhoto)
        );
    }

    #[test]
    fn delete_is_scoped_to_owner() {
        let (connection, _, trip_id) = get_test_fixture();
        let other_user = create_user(
            "dad@example.com",
            PasswordHash::new_unchecked("notarealhash"),
            &connection,
        )
        .unwrap();
        let photo = create_photo(&new_photo(trip_id, "1/1/123-0.jpg"), &connection).unwrap();

        let result = delete_photo(photo.id, other_user.id, &connection);

        assert_eq!(result, Err(Error::DeleteMissingPhoto));
    }
}
