//! Trips are the top level model of the application.
//!
//! A trip belongs to a user and spans an inclusive range of calendar dates.
//! Each date can have a day itinerary holding locations, photos and expenses.

mod core;
mod endpoints;

pub use core::{
    NewTrip, Trip, TripStatus, TripWithTotal, create_trip, create_trip_table, delete_trip,
    get_trip, get_trip_total, get_trip_with_total, list_trips_with_totals, set_trip_cover,
    update_trip,
};
pub use endpoints::{
    create_trip_endpoint, delete_trip_endpoint, get_trip_endpoint, get_trips_endpoint,
    update_trip_endpoint,
};
