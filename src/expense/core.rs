//! Defines the expense model and its database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, ToSql, params_from_iter};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{DayItineraryId, ExpenseId, LocationId},
    money::{Cents, parse_amount},
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// What kind of spending an expense is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    /// Meals, snacks and drinks.
    Food,
    /// Trains, buses, taxis, fuel.
    Transport,
    /// Hotels and other places to sleep.
    Accommodation,
    /// Tickets, tours and entry fees.
    Activities,
    /// Souvenirs and other purchases.
    Shopping,
    /// Anything else.
    #[default]
    Other,
}

impl ExpenseCategory {
    fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Food => "food",
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Accommodation => "accommodation",
            ExpenseCategory::Activities => "activities",
            ExpenseCategory::Shopping => "shopping",
            ExpenseCategory::Other => "other",
        }
    }
}

impl Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "food" => Ok(ExpenseCategory::Food),
            "transport" => Ok(ExpenseCategory::Transport),
            "accommodation" => Ok(ExpenseCategory::Accommodation),
            "activities" => Ok(ExpenseCategory::Activities),
            "shopping" => Ok(ExpenseCategory::Shopping),
            "other" => Ok(ExpenseCategory::Other),
            _ => Err(format!("unknown expense category {text:?}")),
        }
    }
}

/// Money spent on a particular day of a trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseId,
    /// The ID of the day itinerary the expense belongs to.
    pub day_itinerary_id: DayItineraryId,
    /// The location the money was spent at, if any.
    pub location_id: Option<LocationId>,
    /// What the money was spent on, e.g. "Lunch at the fish market".
    pub description: String,
    /// The amount spent, in cents.
    pub amount: Cents,
    /// What kind of spending this is.
    pub category: ExpenseCategory,
    /// When the expense was recorded.
    pub created_at: OffsetDateTime,
}

/// The data needed to create an expense.
///
/// The amount arrives as a decimal string, e.g. "12.50", and is converted
/// to cents before it is stored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewExpense {
    /// The ID of the day itinerary the expense belongs to.
    pub day_itinerary_id: DayItineraryId,
    /// The location the money was spent at, if any.
    #[serde(default)]
    pub location_id: Option<LocationId>,
    /// What the money was spent on.
    pub description: String,
    /// The amount spent as a decimal string, e.g. "12.50".
    pub amount: String,
    /// What kind of spending this is.
    #[serde(default)]
    pub category: ExpenseCategory,
}

/// The data needed to update an expense.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdatedExpense {
    /// The location the money was spent at, if any.
    #[serde(default)]
    pub location_id: Option<LocationId>,
    /// What the money was spent on.
    pub description: String,
    /// The amount spent as a decimal string, e.g. "12.50".
    pub amount: String,
    /// What kind of spending this is.
    #[serde(default)]
    pub category: ExpenseCategory,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const EXPENSE_COLUMNS: &str =
    "id, day_itinerary_id, location_id, description, amount, category, created_at";

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                day_itinerary_id INTEGER NOT NULL,
                location_id INTEGER,
                description TEXT NOT NULL,
                amount INTEGER NOT NULL,
                category TEXT NOT NULL DEFAULT 'other',
                created_at TEXT NOT NULL,
                FOREIGN KEY(day_itinerary_id) REFERENCES day_itinerary(id) ON DELETE CASCADE,
                FOREIGN KEY(location_id) REFERENCES location(id) ON DELETE SET NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_day ON expense(day_itinerary_id);",
        (),
    )?;

    Ok(())
}

/// Create a new expense.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyField] if the description is empty,
/// - [Error::InvalidAmount] if the amount cannot be parsed as a
///   non-negative decimal,
/// - [Error::NotFound] if the day itinerary or location does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_expense(
    new_expense: &NewExpense,
    connection: &Connection,
) -> Result<Expense, Error> {
    if new_expense.description.trim().is_empty() {
        return Err(Error::EmptyField("description"));
    }

    let amount = parse_amount(&new_expense.amount)?;

    connection
        .prepare(&format!(
            "INSERT INTO expense (day_itinerary_id, location_id, description, amount, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {EXPENSE_COLUMNS}"
        ))?
        .query_one(
            (
                new_expense.day_itinerary_id,
                new_expense.location_id,
                new_expense.description.trim(),
                amount,
                new_expense.category.as_str(),
                OffsetDateTime::now_utc(),
            ),
            map_expense_row,
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

/// Retrieve the expense with `expense_id`, checking that its trip belongs
/// to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the expense does not exist or belongs to another
///   user's trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_expense(
    expense_id: ExpenseId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "SELECT expense.id, expense.day_itinerary_id, expense.location_id,
                    expense.description, expense.amount, expense.category, expense.created_at
             FROM expense
             JOIN day_itinerary ON day_itinerary.id = expense.day_itinerary_id
             JOIN trip ON trip.id = day_itinerary.trip_id
             WHERE expense.id = :id AND trip.user_id = :user_id",
        )?
        .query_one(
            &[(":id", &expense_id), (":user_id", &user_id.as_i64())],
            map_expense_row,
        )?;

    Ok(expense)
}

/// List the expenses of every day in `day_ids`, newest first within each
/// day.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_expenses_for_days(
    day_ids: &[DayItineraryId],
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    if day_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = std::iter::repeat_n("?", day_ids.len())
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        "SELECT {EXPENSE_COLUMNS}
         FROM expense
         WHERE day_itinerary_id IN ({placeholders})
         ORDER BY day_itinerary_id, created_at DESC, id DESC"
    );

    let params: Vec<&dyn ToSql> = day_ids.iter().map(|id| id as &dyn ToSql).collect();

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params), map_expense_row)?
        .map(|result| result.map_err(Error::from))
        .collect()
}

/// Update the expense with `expense_id`, checking that its trip belongs to
/// `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyField] if the new description is empty,
/// - [Error::InvalidAmount] if the new amount cannot be parsed,
/// - [Error::UpdateMissingExpense] if the expense does not exist or belongs
///   to another user's trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_expense(
    expense_id: ExpenseId,
    user_id: UserId,
    updated_expense: &UpdatedExpense,
    connection: &Connection,
) -> Result<Expense, Error> {
    if updated_expense.description.trim().is_empty() {
        return Err(Error::EmptyField("description"));
    }

    let amount = parse_amount(&updated_expense.amount)?;

    connection
        .prepare(&format!(
            "UPDATE expense
             SET location_id = ?1, description = ?2, amount = ?3, category = ?4
             WHERE id = ?5
               AND day_itinerary_id IN (
                 SELECT day_itinerary.id FROM day_itinerary
                 JOIN trip ON trip.id = day_itinerary.trip_id
                 WHERE trip.user_id = ?6
               )
             RETURNING {EXPENSE_COLUMNS}"
        ))?
        .query_one(
            (
                updated_expense.location_id,
                updated_expense.description.trim(),
                amount,
                updated_expense.category.as_str(),
                expense_id,
                user_id.as_i64(),
            ),
            map_expense_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingExpense,
            error => error.into(),
        })
}

/// Delete the expense with `expense_id`, checking that its trip belongs to
/// `user_id`. Returns the ID of the day itinerary the expense belonged to.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingExpense] if the expense does not exist or belongs
///   to another user's trip,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_expense(
    expense_id: ExpenseId,
    user_id: UserId,
    connection: &Connection,
) -> Result<DayItineraryId, Error> {
    connection
        .prepare(
            "DELETE FROM expense
             WHERE id = ?1
               AND day_itinerary_id IN (
                 SELECT day_itinerary.id FROM day_itinerary
                 JOIN trip ON trip.id = day_itinerary.trip_id
                 WHERE trip.user_id = ?2
               )
             RETURNING day_itinerary_id",
        )?
        .query_one((expense_id, user_id.as_i64()), |row| row.get(0))
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::DeleteMissingExpense,
            error => error.into(),
        })
}

/// Get the sum of a day's expenses, in cents.
///
/// Reads the `day_totals` view when it exists, otherwise sums the expense
/// table directly.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_day_total(day_id: DayItineraryId, connection: &Connection) -> Result<Cents, Error> {
    let from_view = connection
        .prepare("SELECT day_total FROM day_totals WHERE day_itinerary_id = :id")
        .map_err(Error::from)
        .and_then(|mut statement| {
            statement
                .query_one(&[(":id", &day_id)], |row| row.get(0))
                .map_err(Error::from)
        });

    match from_view {
        Err(Error::SchemaMismatch(view)) => {
            tracing::warn!("aggregate view {view} is missing, summing day total from expenses");

            connection
                .prepare(
                    "SELECT COALESCE(SUM(amount), 0) FROM expense
                     WHERE day_itinerary_id = :id",
                )?
                .query_one(&[(":id", &day_id)], |row| row.get(0))
                .map_err(|error| error.into())
        }
        result => result,
    }
}

fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let raw_category: String = row.get(5)?;
    let category = ExpenseCategory::from_str(&raw_category).map_err(|message| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, message.into())
    })?;

    Ok(Expense {
        id: row.get(0)?,
        day_itinerary_id: row.get(1)?,
        location_id: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        category,
        created_at: row.get(6)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
