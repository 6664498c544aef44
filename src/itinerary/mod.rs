//! Day itineraries: one per calendar date of a trip.
//!
//! Day itineraries are created lazily. The trip's date range is expanded
//! into day slots up front, and a database row only appears for a date once
//! the user adds something to it. [day_range] handles the expansion,
//! [loader] assembles the slots with their locations, photos and expenses.

mod core;
mod day_range;
mod endpoints;
mod loader;

pub use core::{
    DayItinerary, create_day_itinerary_table, get_day, get_or_create_day, resolve_trip_id,
    update_day_notes,
};
pub use day_range::{DayRange, DaySlot, MAX_TRIP_DAYS, expand_trip_days, trip_length_days};
pub use endpoints::{
    create_trip_day_endpoint, get_day_endpoint, get_trip_days_endpoint, update_day_endpoint,
};
pub use loader::{DayDetail, TripDaySlot, TripDays, load_day, load_trip_days};
