use serde::{Deserialize, Serialize};

use crate::capabilities::{ConfirmOutcome, HttpResult};
use crate::config::AppConfig;
use crate::form::FormField;
use crate::image_processing::ImageSource;
use crate::model::{Route, UserId, ViewTicket};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // --- Shell lifecycle ---
    Configure(Box<AppConfig>),
    Navigate(Route),
    NavigatePath(String),
    RetryLoad,
    LogoutRequested,
    DismissNotice,

    // --- Directory and profile ---
    ConnectToggled { id: UserId },
    DeleteRequested { id: UserId },

    // --- Profile form ---
    FieldChanged { field: FormField, value: String },
    SubmitRequested,

    // --- Internal: capability responses ---
    #[serde(skip)]
    UsersLoaded {
        ticket: ViewTicket,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    UserLoaded {
        ticket: ViewTicket,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    DeleteConfirmation { id: UserId, outcome: ConfirmOutcome },
    #[serde(skip)]
    DeleteResponse { id: UserId, result: Box<HttpResult> },
    #[serde(skip)]
    ReplacementResponse { id: UserId, result: Box<HttpResult> },
    #[serde(skip)]
    ImageFetched {
        ticket: ViewTicket,
        source: ImageSource,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    SaveResponse {
        ticket: ViewTicket,
        result: Box<HttpResult>,
    },
}

impl Event {
    /// Stable name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Configure(_) => "configure",
            Event::Navigate(_) => "navigate",
            Event::NavigatePath(_) => "navigate_path",
            Event::RetryLoad => "retry_load",
            Event::LogoutRequested => "logout_requested",
            Event::DismissNotice => "dismiss_notice",
            Event::ConnectToggled { .. } => "connect_toggled",
            Event::DeleteRequested { .. } => "delete_requested",
            Event::FieldChanged { .. } => "field_changed",
            Event::SubmitRequested => "submit_requested",
            Event::UsersLoaded { .. } => "users_loaded",
            Event::UserLoaded { .. } => "user_loaded",
            Event::DeleteConfirmation { .. } => "delete_confirmation",
            Event::DeleteResponse { .. } => "delete_response",
            Event::ReplacementResponse { .. } => "replacement_response",
            Event::ImageFetched { .. } => "image_fetched",
            Event::SaveResponse { .. } => "save_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_events_deserialize() {
        let event: Event = serde_json::from_str(r#"{"NavigatePath":"/all-users"}"#).unwrap();
        assert_eq!(event, Event::NavigatePath("/all-users".into()));

        let event: Event =
            serde_json::from_str(r#"{"FieldChanged":{"field":"Email","value":"a@b.c"}}"#).unwrap();
        assert_eq!(event.name(), "field_changed");
    }

    #[test]
    fn internal_events_are_not_accepted_from_the_shell() {
        let raw = r#"{"DeleteConfirmation":{"id":1,"outcome":"Confirmed"}}"#;
        assert!(serde_json::from_str::<Event>(raw).is_err());
    }
}
