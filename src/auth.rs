use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
struct Credentials {
    email: Option<String>,
    password: Option<String>,
}

impl Credentials {
    fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

/// Minimal view of a user returned after a successful login.
#[derive(Debug, Serialize)]
struct UserSummary {
    id: Value,
    name: Value,
}

#[derive(Serialize)]
struct LoginSuccess {
    success: bool,
    user: UserSummary,
}

#[derive(Serialize)]
struct LoginFailure {
    success: bool,
    error: String,
}

/// `POST /api/login`. Passwords are compared as stored, in plaintext.
pub async fn login(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    // `login` is not a collection, so other methods fall through to 404
    if method != Method::POST {
        return StatusCode::NOT_FOUND.into_response();
    }

    let user = match Credentials::from_body(&body) {
        Credentials {
            email: Some(email),
            password: Some(password),
        } => state.storage.find_user(&email, &password).await,
        _ => None,
    };

    match user {
        Some(user) => {
            let summary = UserSummary {
                id: user.get("id").cloned().unwrap_or(Value::Null),
                name: user.get("name").cloned().unwrap_or(Value::Null),
            };
            tracing::debug!(user = %summary.id, "Login succeeded");
            Json(LoginSuccess {
                success: true,
                user: summary,
            })
            .into_response()
        }
        None => {
            tracing::warn!("Invalid credentials presented");
            (
                StatusCode::UNAUTHORIZED,
                Json(LoginFailure {
                    success: false,
                    error: "Invalid credentials".to_string(),
                }),
            )
                .into_response()
        }
    }
}
