use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Which request an unexpected failure happened in; picks the public message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Signup,
    Login,
}

impl Operation {
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Signup => "Signup failed",
            Self::Login => "Login failed",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Missing credentials")]
    MissingCredentials,
    /// Request body exceeded the configured size limit.
    #[error("Payload too large")]
    PayloadTooLarge,
    #[error("Invalid username")]
    InvalidUsername,
    /// Provider refused to create the account; carries its message verbatim.
    #[error("{0}")]
    SignupRejected(String),
    /// Account was created but the follow-up sign-in produced no session.
    #[error("Signup succeeded, but login failed.")]
    PostSignupLoginFailed,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{}", .0.failure_message())]
    UnexpectedFailure(Operation),
}

impl GatewayError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredentials
            | Self::InvalidUsername
            | Self::SignupRejected(_)
            | Self::PostSignupLoginFailed => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UnexpectedFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    /// Every failure is `{"error": "..."}`; unexpected failures carry only the
    /// generic operation message, details stay in the logs.
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
