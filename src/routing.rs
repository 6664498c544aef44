//! Assembles the application's routes into a router.

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    auth::{auth_guard, get_session, post_log_in, post_log_out, register_user},
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, get_expense_report_endpoint,
        update_expense_endpoint,
    },
    itinerary::{
        create_trip_day_endpoint, get_day_endpoint, get_trip_days_endpoint, update_day_endpoint,
    },
    location::{
        create_location_endpoint, delete_location_endpoint, reorder_locations_endpoint,
        update_location_endpoint,
    },
    photo::{delete_photo_endpoint, list_trip_photos_endpoint, upload_photo_endpoint},
    state::{AppState, AuthState},
    trip::{
        create_trip_endpoint, delete_trip_endpoint, get_trip_endpoint, get_trips_endpoint,
        update_trip_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Everything except registration, log-in and the media files sits behind
/// the auth middleware. Photo files are public by URL; the URLs contain
/// generated names and are only handed out to the trip's owner.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out));

    let protected_routes = Router::new()
        .route(endpoints::SESSION, get(get_session))
        .route(
            endpoints::TRIPS,
            get(get_trips_endpoint).post(create_trip_endpoint),
        )
        .route(
            endpoints::TRIP,
            get(get_trip_endpoint)
                .put(update_trip_endpoint)
                .delete(delete_trip_endpoint),
        )
        .route(
            endpoints::TRIP_DAYS,
            get(get_trip_days_endpoint).post(create_trip_day_endpoint),
        )
        .route(
            endpoints::TRIP_EXPENSE_REPORT,
            get(get_expense_report_endpoint),
        )
        .route(
            endpoints::DAY,
            get(get_day_endpoint).put(update_day_endpoint),
        )
        .route(endpoints::LOCATIONS, post(create_location_endpoint))
        .route(endpoints::REORDER_LOCATIONS, put(reorder_locations_endpoint))
        .route(
            endpoints::LOCATION,
            put(update_location_endpoint).delete(delete_location_endpoint),
        )
        .route(endpoints::EXPENSES, post(create_expense_endpoint))
        .route(
            endpoints::EXPENSE,
            put(update_expense_endpoint).delete(delete_expense_endpoint),
        )
        .route(
            endpoints::TRIP_PHOTOS,
            get(list_trip_photos_endpoint).post(upload_photo_endpoint),
        )
        .route(endpoints::PHOTO, delete(delete_photo_endpoint))
        .layer(middleware::from_fn_with_state(
            AuthState::from_ref(&state),
            auth_guard,
        ));

    protected_routes
        .merge(unprotected_routes)
        .nest_service(
            endpoints::MEDIA,
            ServeDir::new(state.media_store.root().to_path_buf()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod router_tests {
    use std::sync::{Arc, Mutex};

    use axum_extra::extract::cookie::Cookie;
    use axum_test::{
        TestServer,
        multipart::{MultipartForm, Part},
    };
    use rusqlite::Connection;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::{
        auth::cookie::{COOKIE_EXPIRY, COOKIE_USER_ID},
        db::initialize,
        endpoints::{self, format_endpoint},
        photo::MediaStore,
        state::AppState,
    };

    use super::build_router;

    fn get_test_server() -> (TestServer, TempDir) {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        initialize(&connection).expect("Could not initialize database.");

        let temp_dir = tempfile::tempdir().unwrap();
        let state = AppState::new(
            "42",
            Arc::new(Mutex::new(connection)),
            MediaStore::new(temp_dir.path()),
        );
        let server =
            TestServer::new(build_router(state)).expect("Could not create test server.");

        (server, temp_dir)
    }

    async fn register(server: &TestServer) -> (Cookie<'static>, Cookie<'static>) {
        let response = server
            .post(endpoints::USERS)
            .json(&json!({
                "email": "mum@example.com",
                "password": "averylongandsecurepassword",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        (
            response.cookie(COOKIE_USER_ID),
            response.cookie(COOKIE_EXPIRY),
        )
    }

    #[tokio::test]
    async fn protected_route_without_cookie_is_unauthorized() {
        let (server, _temp_dir) = get_test_server();

        server.get(endpoints::TRIPS).await.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn plan_a_trip_end_to_end() {
        let (server, _temp_dir) = get_test_server();
        let (user_cookie, expiry_cookie) = register(&server).await;

        let trip: serde_json::Value = server
            .post(endpoints::TRIPS)
            .add_cookie(user_cookie.clone())
            .add_cookie(expiry_cookie.clone())
            .json(&json!({
                "title": "Summer in Hokkaido",
                "destination": "Hokkaido, Japan",
                "start_date": "2024-07-01",
                "end_date": "2024-07-05",
            }))
            .await
            .json();
        let trip_id = trip["id"].as_i64().unwrap();

        let day: serde_json::Value = server
            .post(&format_endpoint(endpoints::TRIP_DAYS, trip_id))
            .add_cookie(user_cookie.clone())
            .add_cookie(expiry_cookie.clone())
            .json(&json!({"date": "2024-07-02"}))
            .await
            .json();
        let day_id = day["id"].as_i64().unwrap();

        server
            .post(endpoints::LOCATIONS)
            .add_cookie(user_cookie.clone())
            .add_cookie(expiry_cookie.clone())
            .json(&json!({
                "day_itinerary_id": day_id,
                "name": "Sapporo Beer Museum",
                "category": "attraction",
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let expense: serde_json::Value = server
            .post(endpoints::EXPENSES)
            .add_cookie(user_cookie.clone())
            .add_cookie(expiry_cookie.clone())
            .json(&json!({
                "day_itinerary_id": day_id,
                "description": "Museum tickets",
                "amount": "12.50",
                "category": "activities",
            }))
            .await
            .json();
        assert_eq!(expense["day_total"], 1250);
        assert_eq!(expense["trip_total"], 1250);

        let days: serde_json::Value = server
            .get(&format_endpoint(endpoints::TRIP_DAYS, trip_id))
            .add_cookie(user_cookie.clone())
            .add_cookie(expiry_cookie.clone())
            .await
            .json();
        assert_eq!(days["days"].as_array().unwrap().len(), 5);
        let second_day = &days["days"][1]["itinerary"];
        assert_eq!(second_day["day_total"], 1250);
        assert_eq!(second_day["locations"].as_array().unwrap().len(), 1);

        let report: serde_json::Value = server
            .get(&format_endpoint(endpoints::TRIP_EXPENSE_REPORT, trip_id))
            .add_cookie(user_cookie)
            .add_cookie(expiry_cookie)
            .await
            .json();
        assert_eq!(report["total_expenses"], 1250);
    }

    #[tokio::test]
    async fn uploaded_photo_is_served_from_media_route() {
        let (server, _temp_dir) = get_test_server();
        let (user_cookie, expiry_cookie) = register(&server).await;

        let trip: serde_json::Value = server
            .post(endpoints::TRIPS)
            .add_cookie(user_cookie.clone())
            .add_cookie(expiry_cookie.clone())
            .json(&json!({
                "title": "Summer in Hokkaido",
                "destination": "Hokkaido, Japan",
                "start_date": "2024-07-01",
                "end_date": "2024-07-05",
            }))
            .await
            .json();
        let trip_id = trip["id"].as_i64().unwrap();

        let photo: serde_json::Value = server
            .post(&format_endpoint(endpoints::TRIP_PHOTOS, trip_id))
            .add_cookie(user_cookie)
            .add_cookie(expiry_cookie)
            .multipart(MultipartForm::new().add_part(
                "file",
                Part::bytes(b"not really a jpeg".to_vec())
                    .file_name("photo.jpg")
                    .mime_type("image/jpeg"),
            ))
            .await
            .json();

        let response = server.get(photo["url"].as_str().unwrap()).await;

        response.assert_status_ok();
        assert_eq!(response.as_bytes().as_ref(), b"not really a jpeg");
    }

    #[tokio::test]
    async fn log_out_ends_the_session() {
        let (server, _temp_dir) = get_test_server();
        let (user_cookie, expiry_cookie) = register(&server).await;

        let response = server
            .post(endpoints::LOG_OUT)
            .add_cookie(user_cookie)
            .add_cookie(expiry_cookie)
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);

        let invalidated_user_cookie = response.cookie(COOKIE_USER_ID);
        server
            .get(endpoints::SESSION)
            .add_cookie(invalidated_user_cookie)
            .await
            .assert_status_unauthorized();
    }
}
