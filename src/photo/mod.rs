//! Photos: uploaded trip memories, stored on the local filesystem.
//!
//! Photo files live under the media directory and are served as static
//! files; the database only stores their relative paths and metadata.

mod core;
mod endpoints;
mod storage;

pub use core::{
    NewPhoto, Photo, PhotoCategory, create_photo, create_photo_table, delete_photo,
    list_photos_for_days, list_photos_for_trip,
};
pub use endpoints::{delete_photo_endpoint, list_trip_photos_endpoint, upload_photo_endpoint};
pub use storage::MediaStore;
