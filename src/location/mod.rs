//! Locations: the places to visit within a day itinerary.

mod core;
mod endpoints;

pub use core::{
    Location, LocationCategory, NewLocation, UpdatedLocation, create_location,
    create_location_table, delete_location, get_location, list_locations_for_days,
    reorder_locations, set_location_photo, update_location,
};
pub use endpoints::{
    create_location_endpoint, delete_location_endpoint, reorder_locations_endpoint,
    update_location_endpoint,
};
