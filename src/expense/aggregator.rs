//! Recomputes day and trip totals after expense mutations.
//!
//! Expense amounts affect three places at once: the expense list of a day,
//! the day's total and the owning trip's total. Rather than have clients
//! patch their local copies, every mutation endpoint responds with all
//! three, re-read from the database after the write.

use rusqlite::Connection;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    database_id::{DayItineraryId, TripId},
    itinerary::resolve_trip_id,
    money::{Cents, format_cents},
    trip::{Trip, get_trip_total},
};

use super::core::{Expense, get_day_total, list_expenses_for_days};

/// The refreshed state of a day and its trip after an expense mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseMutationResult {
    /// The created or updated expense. `None` after a deletion.
    pub expense: Option<Expense>,
    /// The ID of the day itinerary the mutation touched.
    pub day_itinerary_id: DayItineraryId,
    /// The day's expenses after the mutation, newest first.
    pub day_expenses: Vec<Expense>,
    /// The day's total after the mutation, in cents.
    pub day_total: Cents,
    /// The ID of the trip the day belongs to.
    pub trip_id: TripId,
    /// The trip's total after the mutation, in cents.
    pub trip_total: Cents,
}

/// Re-read the affected day and trip after an expense mutation.
///
/// `expense` is the expense the mutation produced, or `None` for a
/// deletion.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the day itinerary no longer exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn summarize_after_mutation(
    day_id: DayItineraryId,
    expense: Option<Expense>,
    connection: &Connection,
) -> Result<ExpenseMutationResult, Error> {
    let day_expenses = list_expenses_for_days(&[day_id], connection)?;
    let day_total = get_day_total(day_id, connection)?;
    let trip_id = resolve_trip_id(day_id, connection)?;
    let trip_total = get_trip_total(trip_id, connection)?;

    Ok(ExpenseMutationResult {
        expense,
        day_itinerary_id: day_id,
        day_expenses,
        day_total,
        trip_id,
        trip_total,
    })
}

/// One row of a trip's expense report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayTotalEntry {
    /// The ID of the day itinerary.
    pub day_itinerary_id: DayItineraryId,
    /// The calendar date of the day.
    pub date: Date,
    /// The day's total, in cents.
    pub day_total: Cents,
    /// The day's total as a decimal string, e.g. "35.00".
    pub day_total_formatted: String,
}

/// Per-day spending for a whole trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseReport {
    /// The ID of the trip.
    pub trip_id: TripId,
    /// One entry per day itinerary that exists, in date order. Days the
    /// user never added anything to are omitted.
    pub days: Vec<DayTotalEntry>,
    /// The trip's total, in cents.
    pub total_expenses: Cents,
    /// The trip's total as a decimal string.
    pub total_expenses_formatted: String,
}

/// Build the per-day expense report for `trip`.
///
/// Totals are read from the `day_totals` view when it exists. Databases
/// without the view get the same numbers computed from the base tables.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn build_expense_report(trip: &Trip, connection: &Connection) -> Result<ExpenseReport, Error> {
    let from_view = connection
        .prepare(
            "SELECT day_itinerary_id, date, day_total FROM day_totals
             WHERE trip_id = :trip_id
             ORDER BY date ASC",
        )
        .map_err(Error::from)
        .and_then(|mut statement| {
            statement
                .query_map(&[(":trip_id", &trip.id)], map_day_total_row)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(Error::from)
        });

    let days = match from_view {
        Ok(days) => days,
        Err(Error::SchemaMismatch(view)) => {
            tracing::warn!("aggregate view {view} is missing, computing report from base tables");

            connection
                .prepare(
                    "SELECT day_itinerary.id, day_itinerary.date,
                            COALESCE(SUM(expense.amount), 0)
                     FROM day_itinerary
                     LEFT JOIN expense ON expense.day_itinerary_id = day_itinerary.id
                     WHERE day_itinerary.trip_id = :trip_id
                     GROUP BY day_itinerary.id
                     ORDER BY day_itinerary.date ASC",
                )?
                .query_map(&[(":trip_id", &trip.id)], map_day_total_row)?
                .collect::<Result<Vec<_>, _>>()?
        }
        Err(error) => return Err(error),
    };

    let total_expenses = days.iter().map(|entry| entry.day_total).sum();

    Ok(ExpenseReport {
        trip_id: trip.id,
        days,
        total_expenses,
        total_expenses_formatted: format_cents(total_expenses),
    })
}

fn map_day_total_row(row: &rusqlite::Row) -> Result<DayTotalEntry, rusqlite::Error> {
    let day_total: Cents = row.get(2)?;

    Ok(DayTotalEntry {
        day_itinerary_id: row.get(0)?,
        date: row.get(1)?,
        day_total,
        day_total_formatted: format_cents(day_total),
    })
}

// ============================================================================
// TESTS
// ============================================================================
