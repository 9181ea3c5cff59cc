use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use crate::maud_conveniences::error_alert;
use snafu::Snafu;
use std::{num::ParseIntError, path::PathBuf};

pub type BouncerResult<T> = Result<T, BouncerError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum BouncerError {
    #[snafu(display("Unable to retrieve env var `{}`", name))]
    BadEnvVar {
        source: dotenvy::Error,
        name: &'static str,
    },
    #[snafu(display("Unable to parse request timeout {:?}", original))]
    ParseTimeout {
        source: ParseIntError,
        original: String,
    },
    #[snafu(display("Unable to build HTTP client"))]
    BuildClient { source: reqwest::Error },
    #[snafu(display("Unable to reach the bouncer server at {}", endpoint))]
    Request {
        source: reqwest::Error,
        endpoint: String,
    },
    #[snafu(display("Unable to read the response from {}", endpoint))]
    DecodeResponse {
        source: reqwest::Error,
        endpoint: String,
    },
    #[snafu(display("Not logged in: {}", message))]
    NotLoggedIn { message: String },
    #[snafu(display("{} answered {}: {}", endpoint, status, body))]
    UnexpectedStatus {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[snafu(display("Invalid credentials"))]
    InvalidCredentials,
    #[snafu(display("Login succeeded but the server sent no session cookie"))]
    MissingSessionCookie,
    #[snafu(display("Unable to read session file {:?}", path))]
    ReadSessionFile {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Unable to write session file {:?}", path))]
    WriteSessionFile {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Unable to remove session file {:?}", path))]
    RemoveSessionFile {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Error with session JSON"))]
    SessionJson { source: serde_json::Error },
    #[snafu(display("Error with multipart form input"))]
    Multipart {
        source: axum::extract::multipart::MultipartError,
    },
    #[snafu(display("No file was attached in field `{}`", field))]
    MissingUpload { field: &'static str },
    #[snafu(display("The attached file is empty"))]
    EmptyUpload,
    #[snafu(display("Expected a CSV file, found {}", mime))]
    NotCsv { mime: &'static str },
    #[snafu(display("Graduation year {:?} must be blank or exactly 4 digits", original))]
    InvalidGraduationYear { original: String },
    #[snafu(display("A name is required"))]
    MissingName,
    #[snafu(display("A student ID and an encryption key are required"))]
    MissingDecryptInput,
}

impl BouncerError {
    /// Whether the backend has rejected our session, so the local one should go too.
    pub const fn is_session_rejection(&self) -> bool {
        matches!(self, Self::NotLoggedIn { .. })
    }

    #[allow(clippy::match_same_arms)]
    pub fn status_code(&self) -> StatusCode {
        const ISE: StatusCode = StatusCode::INTERNAL_SERVER_ERROR; //internal server error
        const BG: StatusCode = StatusCode::BAD_GATEWAY; //backend trouble
        const NA: StatusCode = StatusCode::UNAUTHORIZED; //not allowed
        const BI: StatusCode = StatusCode::BAD_REQUEST; //bad input

        match self {
            Self::BadEnvVar { .. } | Self::ParseTimeout { .. } | Self::BuildClient { .. } => ISE,
            Self::Request { .. } | Self::DecodeResponse { .. } => BG,
            Self::NotLoggedIn { .. } | Self::InvalidCredentials => NA,
            Self::UnexpectedStatus { status, .. } => {
                if status.is_client_error() {
                    *status
                } else {
                    BG
                }
            }
            Self::MissingSessionCookie => BG,
            Self::ReadSessionFile { .. }
            | Self::WriteSessionFile { .. }
            | Self::RemoveSessionFile { .. } => ISE,
            Self::SessionJson { .. } => ISE,
            Self::Multipart { source } => source.status(),
            Self::MissingUpload { .. } | Self::EmptyUpload | Self::NotCsv { .. } => BI,
            Self::InvalidGraduationYear { .. } | Self::MissingName => BI,
            Self::MissingDecryptInput => BI,
        }
    }
}

impl IntoResponse for BouncerError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        error!(?self, "Error!");
        (
            status_code,
            Html(error_alert(self.to_string()).into_string()),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_kind_of_failure() {
        assert_eq!(BouncerError::EmptyUpload.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(BouncerError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            BouncerError::UnexpectedStatus {
                endpoint: "/api/users".into(),
                status: StatusCode::NOT_FOUND,
                body: String::new(),
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BouncerError::UnexpectedStatus {
                endpoint: "/api/users".into(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: String::new(),
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn response_carries_the_alert() {
        let response = BouncerError::MissingName.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(axum::http::header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }
}
