//! The route handlers for expenses and the trip expense report.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    database_id::{ExpenseId, TripId},
    itinerary::get_day,
    state::DatabaseState,
    trip::get_trip,
    user::UserId,
};

use super::{
    ExpenseMutationResult, ExpenseReport, NewExpense, UpdatedExpense, build_expense_report,
    create_expense, delete_expense, summarize_after_mutation, update_expense,
};

/// A route handler for recording an expense against a day itinerary.
///
/// The response carries the refreshed day and trip totals alongside the new
/// expense.
pub async fn create_expense_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Json(new_expense): Json<NewExpense>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    // Resolving the day also checks that it belongs to the current user.
    get_day(new_expense.day_itinerary_id, user_id, &connection)?;

    let expense = create_expense(&new_expense, &connection)?;
    let summary = summarize_after_mutation(expense.day_itinerary_id, Some(expense), &connection)?;

    Ok((StatusCode::CREATED, Json(summary)).into_response())
}

/// A route handler for updating an expense.
pub async fn update_expense_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(expense_id): Path<ExpenseId>,
    Json(updated_expense): Json<UpdatedExpense>,
) -> Result<Json<ExpenseMutationResult>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let expense = update_expense(expense_id, user_id, &updated_expense, &connection)?;
    let summary = summarize_after_mutation(expense.day_itinerary_id, Some(expense), &connection)?;

    Ok(Json(summary))
}

/// A route handler for deleting an expense.
///
/// Responds with the refreshed day and trip totals so the client can update
/// its display without a second round trip.
pub async fn delete_expense_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(expense_id): Path<ExpenseId>,
) -> Result<Json<ExpenseMutationResult>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let day_id = delete_expense(expense_id, user_id, &connection)?;
    let summary = summarize_after_mutation(day_id, None, &connection)?;

    Ok(Json(summary))
}

/// A route handler that returns a trip's per-day spending report.
pub async fn get_expense_report_endpoint(
    State(state): State<DatabaseState>,
    Extension(user_id): Extension<UserId>,
    Path(trip_id): Path<TripId>,
) -> Result<Json<ExpenseReport>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let trip = get_trip(trip_id, user_id, &connection)?;

    build_expense_report(&trip, &connection).map(Json)
}

#[cfg(test)]
mod endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Router,
        routing::{get, post, put},
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;
    use time::macros::date;

    use crate::{
        db::initialize,
        endpoints::{self, format_endpoint},
        itinerary::get_or_create_day,
        state::DatabaseState,
        trip::{NewTrip, TripStatus, create_trip},
        user::{PasswordHash, create_user},
    };

    use super::{
        create_expense_endpoint, delete_expense_endpoint, get_expense_report_endpoint,
        update_expense_endpoint,
    };

    fn get_test_server() -> (TestServer, i64, i64) {
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
        let day = get_or_create_day(trip.id, date!(2024 - 07 - 02), &connection).unwrap();

        let state = DatabaseState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let app = Router::new()
            .route(endpoints::EXPENSES, post(create_expense_endpoint))
            .route(
                endpoints::EXPENSE,
                put(update_expense_endpoint).delete(delete_expense_endpoint),
            )
            .route(
                endpoints::TRIP_EXPENSE_REPORT,
                get(get_expense_report_endpoint),
            )
            .layer(Extension(user.id))
            .with_state(state);

        let server = TestServer::new(app).expect("Could not create test server.");

        (server, trip.id, day.id)
    }

    #[tokio::test]
    async fn create_returns_refreshed_totals() {
        let (server, _, day_id) = get_test_server();

        let first = server
            .post(endpoints::EXPENSES)
            .json(&json!({
                "day_itinerary_id": day_id,
                "description": "Breakfast",
                "amount": "20",
                "category": "food",
            }))
            .await;
        first.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = first.json();
        assert_eq!(body["day_total"], 2000);
        assert_eq!(body["trip_total"], 2000);

        let second: serde_json::Value = server
            .post(endpoints::EXPENSES)
            .json(&json!({
                "day_itinerary_id": day_id,
                "description": "Lunch",
                "amount": "15",
                "category": "food",
            }))
            .await
            .json();
        assert_eq!(second["day_total"], 3500);
        assert_eq!(second["trip_total"], 3500);
        assert_eq!(second["day_expenses"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_with_bad_amount_is_bad_request() {
        let (server, _, day_id) = get_test_server();

        let response = server
            .post(endpoints::EXPENSES)
            .json(&json!({
                "day_itinerary_id": day_id,
                "description": "Lunch",
                "amount": "12,50",
            }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn delete_returns_emptied_day() {
        let (server, _, day_id) = get_test_server();
        let created: serde_json::Value = server
            .post(endpoints::EXPENSES)
            .json(&json!({
                "day_itinerary_id": day_id,
                "description": "Lunch",
                "amount": "12.50",
            }))
            .await
            .json();
        let expense_id = created["expense"]["id"].as_i64().unwrap();

        let response = server
            .delete(&format_endpoint(endpoints::EXPENSE, expense_id))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["expense"], serde_json::Value::Null);
        assert_eq!(body["day_total"], 0);
        assert_eq!(body["trip_total"], 0);
        assert_eq!(body["day_expenses"], json!([]));
    }

    #[tokio::test]
    async fn update_changes_totals() {
        let (server, _, day_id) = get_test_server();
        let created: serde_json::Value = server
            .post(endpoints::EXPENSES)
            .json(&json!({
                "day_itinerary_id": day_id,
                "description": "Lunch",
                "amount": "12.50",
            }))
            .await
            .json();
        let expense_id = created["expense"]["id"].as_i64().unwrap();

        let response = server
            .put(&format_endpoint(endpoints::EXPENSE, expense_id))
            .json(&json!({"description": "Lunch", "amount": "20"}))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["day_total"], 2000);
        assert_eq!(body["trip_total"], 2000);
    }

    #[tokio::test]
    async fn report_lists_day_totals() {
        let (server, trip_id, day_id) = get_test_server();
        server
            .post(endpoints::EXPENSES)
            .json(&json!({
                "day_itinerary_id": day_id,
                "description": "Breakfast",
                "amount": "20",
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .get(&format_endpoint(endpoints::TRIP_EXPENSE_REPORT, trip_id))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total_expenses"], 2000);
        assert_eq!(body["total_expenses_formatted"], "20.00");
        assert_eq!(body["days"][0]["day_total"], 2000);
    }

    #[tokio::test]
    async fn delete_missing_expense_is_not_found() {
        let (server, _, _) = get_test_server();

        server
            .delete(&format_endpoint(endpoints::EXPENSE, 999))
            .await
            .assert_status_not_found();
    }
}
