//! Database ID type definitions.

/// The ID of a row in the trip table.
pub type TripId = i64;
/// The ID of a row in the day itinerary table.
pub type DayItineraryId = i64;
/// The ID of a row in the location table.
pub type LocationId = i64;
/// The ID of a row in the photo table.
pub type PhotoId = i64;
/// The ID of a row in the expense table.
pub type ExpenseId = i64;
