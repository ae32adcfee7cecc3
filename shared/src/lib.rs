//! Wildcat Connect shared core.
//!
//! Platform-neutral application logic for the student directory: the user
//! API client, the profile form controller and the directory/profile view
//! controller. Shells render [`ViewModel`]s, forward [`Event`]s and execute the
//! effects described by [`Capabilities`].

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod api;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod directory;
pub mod event;
pub mod form;
pub mod image_processing;
pub mod model;
pub mod view;

use serde::{Deserialize, Serialize};

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::AppConfig;
pub use crux_core::App as CruxApp;
pub use event::Event;
pub use model::{Model, Route, UserId, UserRecord};
pub use view::ViewModel;

pub const DEFAULT_API_BASE_URL: &str = "https://disc-assignment-5-users-api-iyct.onrender.com";
pub const USERS_PATH: &str = "/api/users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Network,
    Server,
    Client,
    Deserialization,
    Precondition,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::Server => "SERVER_ERROR",
            Self::Client => "CLIENT_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Precondition => "PRECONDITION_FAILED",
        }
    }

    /// Whether resubmitting the same input can succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }
}

/// An operation failure in the shape the view layer renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)
    }
}

impl std::error::Error for AppError {}

impl From<&form::ValidationError> for AppError {
    fn from(e: &form::ValidationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

#[must_use]
pub fn get_current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
