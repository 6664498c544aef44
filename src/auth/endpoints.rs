//! The endpoints for registering, logging in and out, and inspecting the
//! current session.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::cookie::{invalidate_auth_cookie, set_auth_cookie},
    state::AuthState,
    user::{PasswordHash, UserId, create_user, get_user_by_email, get_user_by_id},
};

/// The credentials for registering or logging in a user.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// The user's email address.
    pub email: String,
    /// The user's password in plain text.
    pub password: String,
}

/// The subset of the user model that is safe to send to the client.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    id: UserId,
    email: String,
}

/// A route handler for registering a new user.
///
/// The user is logged in immediately, so no separate log-in request is
/// needed after registering.
///
/// # Errors
///
/// This function can return a:
/// - [Error::EmptyField] if the email is empty or not an email address,
/// - [Error::TooWeak] if the password is too easy to guess,
/// - [Error::DuplicateEmail] if the email is already registered.
pub async fn register_user(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<Response, Error> {
    let email = credentials.email.trim();

    if email.is_empty() || !email.contains('@') {
        return Err(Error::EmptyField("email"));
    }

    let password_hash =
        PasswordHash::from_raw_password(&credentials.password, PasswordHash::DEFAULT_COST)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let user = create_user(email, password_hash, &connection)?;
    drop(connection);

    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;

    Ok((
        StatusCode::CREATED,
        jar,
        Json(SessionUser {
            id: user.id,
            email: user.email,
        }),
    )
        .into_response())
}

/// A route handler for logging in a user with an email and password.
///
/// # Errors
///
/// Returns an [Error::InvalidCredentials] if the email is not registered or
/// the password does not match. The two cases are deliberately not
/// distinguished in the response.
pub async fn post_log_in(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let user = get_user_by_email(credentials.email.trim(), &connection).map_err(|error| {
        match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        }
    })?;
    drop(connection);

    let password_is_correct = user
        .password_hash
        .verify(&credentials.password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !password_is_correct {
        return Err(Error::InvalidCredentials);
    }

    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;

    Ok((
        jar,
        Json(SessionUser {
            id: user.id,
            email: user.email,
        }),
    )
        .into_response())
}

/// A route handler for logging out the current user.
///
/// Always succeeds, even when no user is logged in.
pub async fn post_log_out(jar: PrivateCookieJar) -> Response {
    (invalidate_auth_cookie(jar), StatusCode::NO_CONTENT).into_response()
}

/// A route handler that returns the currently logged in user.
///
/// This endpoint sits behind the auth guard, so reaching the handler means
/// the session cookie was valid.
pub async fn get_session(
    State(state): State<AuthState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<SessionUser>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let user = get_user_by_id(user_id, &connection)?;

    Ok(Json(SessionUser {
        id: user.id,
        email: user.email,
    }))
}

#[cfg(test)]
mod endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router, middleware,
        routing::{get, post},
    };
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;
    use sha2::Digest;

    use crate::{
        auth::{auth_guard, cookie::DEFAULT_COOKIE_DURATION},
        db::initialize,
        endpoints,
        state::AuthState,
    };

    use super::{get_session, post_log_in, post_log_out, register_user};

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let hash = sha2::Sha512::digest("seekrit");
        let state = AuthState {
            cookie_key: Key::from(&hash),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let app = Router::new()
            .route(endpoints::SESSION, get(get_session))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .route(endpoints::USERS, post(register_user))
            .route(endpoints::LOG_IN, post(post_log_in))
            .route(endpoints::LOG_OUT, post(post_log_out))
            .with_state(state);

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn register_creates_user_and_logs_in() {
        let server = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .json(&json!({"email": "mum@example.com", "password": "averystrongpassword!"}))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["email"], "mum@example.com");

        let session = server
            .get(endpoints::SESSION)
            .add_cookies(response.cookies())
            .await;
        session.assert_status_ok();
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let server = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .json(&json!({"email": "mum@example.com", "password": "password1234"}))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let server = get_test_server();
        server
            .post(endpoints::USERS)
            .json(&json!({"email": "mum@example.com", "password": "averystrongpassword!"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post(endpoints::USERS)
            .json(&json!({"email": "mum@example.com", "password": "anotherstrongpassword!"}))
            .await;

        response.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn log_in_with_correct_credentials_sets_cookie() {
        let server = get_test_server();
        server
            .post(endpoints::USERS)
            .json(&json!({"email": "mum@example.com", "password": "averystrongpassword!"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({"email": "mum@example.com", "password": "averystrongpassword!"}))
            .await;

        response.assert_status_ok();

        let session = server
            .get(endpoints::SESSION)
            .add_cookies(response.cookies())
            .await;
        session.assert_status_ok();
        let body: serde_json::Value = session.json();
        assert_eq!(body["email"], "mum@example.com");
    }

    #[tokio::test]
    async fn log_in_with_wrong_password_returns_unauthorized() {
        let server = get_test_server();
        server
            .post(endpoints::USERS)
            .json(&json!({"email": "mum@example.com", "password": "averystrongpassword!"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({"email": "mum@example.com", "password": "thewrongpassword"}))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn log_in_with_unknown_email_returns_unauthorized() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({"email": "nobody@example.com", "password": "averystrongpassword!"}))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn log_out_invalidates_session() {
        let server = get_test_server();
        let register = server
            .post(endpoints::USERS)
            .json(&json!({"email": "mum@example.com", "password": "averystrongpassword!"}))
            .await;
        register.assert_status(axum::http::StatusCode::CREATED);

        let log_out = server
            .post(endpoints::LOG_OUT)
            .add_cookies(register.cookies())
            .await;
        log_out.assert_status(axum::http::StatusCode::NO_CONTENT);

        let session = server
            .get(endpoints::SESSION)
            .add_cookies(log_out.cookies())
            .await;
        session.assert_status_unauthorized();
    }
}
