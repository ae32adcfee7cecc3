//! Client for the remote users API.
//!
//! Builders turn domain input into [`HttpRequest`]s and decoders turn the
//! [`HttpResult`]s `crux_http` reports back into typed records or an
//! [`ApiError`]. Nothing here performs I/O.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::capabilities::{HttpRequest, HttpResult, MultipartForm, Reply, RequestError};
use crate::config::AppConfig;
use crate::image_processing::ImagePayload;
use crate::model::{UserId, UserRecord};
use crate::{AppError, ErrorKind, USERS_PATH};

pub const SERVER_ERROR_MESSAGE: &str =
    "Internal Server Error - server could not process the request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveOperation {
    Create,
    Update,
}

impl SaveOperation {
    pub const fn missing_image_message(self) -> &'static str {
        match self {
            SaveOperation::Create => "Image file is required",
            SaveOperation::Update => "Image file is required for update. Please provide an image.",
        }
    }

    /// Shown when a failure carries no usable message of its own.
    pub const fn fallback_message(self) -> &'static str {
        match self {
            SaveOperation::Create => "Failed to create user. Please try again.",
            SaveOperation::Update => "Failed to update user. Please try again.",
        }
    }
}

/// What a non-2xx response body said about the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiFailure {
    /// JSON body with a `message` (or `error`) field.
    Structured { message: String },
    /// Short non-JSON body.
    PlainText { body: String },
    /// Nothing usable in the body.
    Unknown { status: u16 },
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl ApiFailure {
    pub fn decode(status: u16, body: &[u8], text_limit: usize) -> Self {
        let text = String::from_utf8_lossy(body);

        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) {
            let structured = serde_json::from_value::<ErrorBody>(parsed)
                .ok()
                .and_then(|body| {
                    [body.message, body.error]
                        .into_iter()
                        .flatten()
                        .find_map(|value| match value {
                            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
                            _ => None,
                        })
                });
            return match structured {
                Some(message) => ApiFailure::Structured { message },
                None => ApiFailure::Unknown { status },
            };
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() && trimmed.chars().count() < text_limit {
            ApiFailure::PlainText {
                body: trimmed.to_string(),
            }
        } else {
            ApiFailure::Unknown { status }
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiFailure::Structured { message } => message.clone(),
            ApiFailure::PlainText { body } => body.clone(),
            ApiFailure::Unknown { status: 500 } => SERVER_ERROR_MESSAGE.to_string(),
            ApiFailure::Unknown { status } => format!("HTTP error! status: {status}"),
        }
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{}", .operation.missing_image_message())]
    MissingImage { operation: SaveOperation },

    #[error("could not build request: {0}")]
    Request(RequestError),

    #[error("{0}")]
    Transport(crux_http::Error),

    #[error("{failure}")]
    Status { status: u16, failure: ApiFailure },

    #[error("unexpected response body: {reason}")]
    Decode { reason: String },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingImage { .. } => ErrorKind::Precondition,
            ApiError::Request(_) => ErrorKind::Client,
            ApiError::Transport(_) => ErrorKind::Network,
            ApiError::Status { status, .. } if *status >= 500 => ErrorKind::Server,
            ApiError::Status { .. } => ErrorKind::Client,
            ApiError::Decode { .. } => ErrorKind::Deserialization,
        }
    }

    /// Message for a failed save, falling back when this error has none.
    pub fn save_message(&self, operation: SaveOperation) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            operation.fallback_message().to_string()
        } else {
            message
        }
    }

    pub fn to_app_error(&self, operation: SaveOperation) -> AppError {
        AppError::new(self.kind(), self.save_message(operation))
    }
}

/// The text fields sent on create and update. Values are already trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub bio: String,
    pub major: String,
    pub graduation_year: String,
}

impl UserFields {
    #[must_use]
    pub fn trimmed(self) -> Self {
        let trim = |s: String| s.trim().to_string();
        Self {
            first_name: trim(self.first_name),
            last_name: trim(self.last_name),
            email: trim(self.email),
            bio: trim(self.bio),
            major: trim(self.major),
            graduation_year: trim(self.graduation_year),
        }
    }

    fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("firstName", self.first_name.as_str()),
            ("lastName", self.last_name.as_str()),
            ("email", self.email.as_str()),
            ("bio", self.bio.as_str()),
            ("major", self.major.as_str()),
            ("graduationYear", self.graduation_year.as_str()),
        ]
    }
}

/// Everything a create or update upload carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitPayload {
    pub fields: UserFields,
    pub image: Option<ImagePayload>,
}

pub struct UsersApi {
    base_url: String,
    error_text_limit: usize,
}

impl UsersApi {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            error_text_limit: config.error_text_limit,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}{USERS_PATH}", self.base_url)
    }

    fn record_url(&self, id: UserId) -> String {
        format!("{}{USERS_PATH}/{id}", self.base_url)
    }

    pub fn list_users(&self) -> Result<HttpRequest, ApiError> {
        HttpRequest::get(self.collection_url()).map_err(ApiError::Request)
    }

    pub fn get_user(&self, id: UserId) -> Result<HttpRequest, ApiError> {
        HttpRequest::get(self.record_url(id)).map_err(ApiError::Request)
    }

    pub fn create_user(&self, payload: &SubmitPayload) -> Result<HttpRequest, ApiError> {
        let form = Self::multipart(payload, SaveOperation::Create)?;
        HttpRequest::post(self.collection_url())
            .and_then(|request| request.with_multipart(form))
            .map_err(ApiError::Request)
    }

    pub fn update_user(
        &self,
        id: UserId,
        payload: &SubmitPayload,
    ) -> Result<HttpRequest, ApiError> {
        let form = Self::multipart(payload, SaveOperation::Update)?;
        HttpRequest::put(self.record_url(id))
            .and_then(|request| request.with_multipart(form))
            .map_err(ApiError::Request)
    }

    pub fn delete_user(&self, id: UserId) -> Result<HttpRequest, ApiError> {
        HttpRequest::delete(self.record_url(id)).map_err(ApiError::Request)
    }

    // Fails before any request exists when the image is absent or empty.
    fn multipart(
        payload: &SubmitPayload,
        operation: SaveOperation,
    ) -> Result<MultipartForm, ApiError> {
        let image = payload
            .image
            .as_ref()
            .filter(|image| !image.is_empty())
            .ok_or(ApiError::MissingImage { operation })?;

        let form = payload
            .fields
            .pairs()
            .into_iter()
            .fold(MultipartForm::new(), |form, (name, value)| {
                form.text(name, value)
            });
        Ok(form.file("image", &image.file_name, &image.media_type, &image.bytes))
    }

    pub fn decode_users(&self, result: HttpResult) -> Result<Vec<UserRecord>, ApiError> {
        let response = self.check(result)?;
        decode_json(&response)
    }

    pub fn decode_user(&self, result: HttpResult) -> Result<UserRecord, ApiError> {
        let response = self.check(result)?;
        decode_json(&response)
    }

    /// Deletion only needs a 2xx; whatever body came back is ignored.
    pub fn decode_deleted(&self, result: HttpResult) -> Result<(), ApiError> {
        self.check(result).map(|reply| {
            debug!(status = reply.status, bytes = reply.body.len(), "delete acknowledged");
        })
    }

    fn check(&self, result: HttpResult) -> Result<Reply, ApiError> {
        let reply = Reply::from_result(result).map_err(|e| {
            error!(error = %e, "users api request failed");
            ApiError::Transport(e)
        })?;

        if reply.is_success() {
            return Ok(reply);
        }

        let status = reply.status;
        let failure = ApiFailure::decode(status, &reply.body, self.error_text_limit);
        warn!(status, failure = %failure, "users api returned an error status");
        Err(ApiError::Status { status, failure })
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(reply: &Reply) -> Result<T, ApiError> {
    serde_json::from_slice(&reply.body).map_err(|e| {
        error!(error = %e, status = reply.status, "malformed users api body");
        ApiError::Decode {
            reason: e.to_string(),
        }
    })
}
