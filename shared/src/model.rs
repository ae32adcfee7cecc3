use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::config::AppConfig;
use crate::directory::{ConnectSet, DeleteFlow};
use crate::form::FormState;

/// Server-assigned numeric identifier of a user record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A user record as the API returns it.
///
/// Only `id` is required on the wire. Missing or `null` names and email read
/// as empty. `graduationYear` arrives as either a string or a number and is
/// normalised to text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub graduation_year: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The stored picture URL, if the record has a usable one.
    pub fn picture_url(&self) -> Option<&str> {
        non_blank(self.profile_picture.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(
        Option::<TextOrNumber>::deserialize(deserializer)?.map(|value| match value {
            TextOrNumber::Text(text) => text,
            TextOrNumber::Int(n) => n.to_string(),
            TextOrNumber::Float(n) => n.to_string(),
        }),
    )
}

/// Every screen the shell can show. Paths mirror the browser routes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    #[default]
    Home,
    AllUsers,
    CreateUser,
    UserDetail { id: UserId },
    EditUser { id: UserId },
    MyProfile,
    About,
    NotFound { path: String },
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let trimmed = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        let not_found = || Route::NotFound {
            path: path.to_string(),
        };

        match segments.as_slice() {
            [] => Route::Home,
            ["all-users"] => Route::AllUsers,
            ["my-profile"] => Route::MyProfile,
            ["about"] => Route::About,
            ["users", "new"] => Route::CreateUser,
            ["users", id] => id.parse().map_or_else(|_| not_found(), |id| Route::UserDetail { id }),
            ["users", id, "edit"] => id.parse().map_or_else(|_| not_found(), |id| Route::EditUser { id }),
            _ => not_found(),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::AllUsers => "/all-users".to_string(),
            Route::CreateUser => "/users/new".to_string(),
            Route::UserDetail { id } => format!("/users/{id}"),
            Route::EditUser { id } => format!("/users/{id}/edit"),
            Route::MyProfile => "/my-profile".to_string(),
            Route::About => "/about".to_string(),
            Route::NotFound { path } => path.clone(),
        }
    }
}

/// Fetch state of a view-owned snapshot. Exactly one variant holds at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadState<T> {
    #[default]
    Loading,
    Failed { message: String },
    Loaded(T),
}

impl<T> LoadState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// Identifies one mounting of a view. Results carrying an older ticket were
/// requested by a view that has since gone away and are dropped.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewTicket(pub u64);

impl ViewTicket {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Transient, app-wide messages the shell shows as alerts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    DeleteFailed,
    LogoutUnavailable,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::DeleteFailed => "Failed to delete user. Please try again.",
            Notice::LogoutUnavailable => "Logout functionality with authentication.",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::DeleteFailed)
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub config: AppConfig,
    pub route: Route,
    pub ticket: ViewTicket,

    // View-owned snapshots, reset whenever a route is mounted.
    pub directory: LoadState<Vec<UserRecord>>,
    pub profile: LoadState<UserRecord>,
    pub form: Option<FormState>,

    // Session-wide state.
    pub connections: ConnectSet,
    pub delete_flow: DeleteFlow,
    pub notice: Option<Notice>,
    pub last_replacement_stamp: u64,
}

impl Model {
    /// Looks a record up in whichever snapshot the current view holds.
    pub fn visible_record(&self, id: UserId) -> Option<&UserRecord> {
        match &self.route {
            Route::AllUsers => self
                .directory
                .loaded()
                .and_then(|users| users.iter().find(|u| u.id == id)),
            Route::UserDetail { id: shown } if *shown == id => self.profile.loaded(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_routes() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/all-users"), Route::AllUsers);
        assert_eq!(Route::parse("/users/new"), Route::CreateUser);
        assert_eq!(Route::parse("/users/12"), Route::UserDetail { id: UserId(12) });
        assert_eq!(Route::parse("/users/12/edit"), Route::EditUser { id: UserId(12) });
        assert_eq!(Route::parse("/my-profile/"), Route::MyProfile);
        assert_eq!(Route::parse("/about?ref=nav"), Route::About);
    }

    #[test]
    fn non_numeric_id_is_not_found() {
        assert_eq!(
            Route::parse("/users/abc"),
            Route::NotFound {
                path: "/users/abc".into()
            }
        );
        assert!(matches!(Route::parse("/nope"), Route::NotFound { .. }));
    }

    #[test]
    fn route_paths_reparse() {
        for route in [
            Route::Home,
            Route::AllUsers,
            Route::CreateUser,
            Route::UserDetail { id: UserId(4) },
            Route::EditUser { id: UserId(4) },
            Route::MyProfile,
            Route::About,
        ] {
            assert_eq!(Route::parse(&route.path()), route);
        }
    }

    #[test]
    fn record_accepts_numeric_graduation_year() {
        let record: UserRecord = serde_json::from_str(
            r#"{"id":3,"firstName":"Ada","lastName":"Lovelace","email":"ada@example.com","graduationYear":2027}"#,
        )
        .unwrap();
        assert_eq!(record.graduation_year.as_deref(), Some("2027"));
        assert_eq!(record.full_name(), "Ada Lovelace");
        assert_eq!(record.picture_url(), None);
    }

    #[test]
    fn record_accepts_text_year_and_nulls() {
        let record: UserRecord = serde_json::from_str(
            r#"{"id":3,"graduationYear":"2026","bio":null,"profilePicture":"  "}"#,
        )
        .unwrap();
        assert_eq!(record.graduation_year.as_deref(), Some("2026"));
        assert_eq!(record.bio, None);
        assert_eq!(record.picture_url(), None);
        assert_eq!(record.first_name, "");
    }

    #[test]
    fn record_reads_null_names_and_email_as_empty() {
        let record: UserRecord = serde_json::from_str(
            r#"{"id":2,"firstName":null,"lastName":"Turing","email":null}"#,
        )
        .unwrap();
        assert_eq!(record.first_name, "");
        assert_eq!(record.last_name, "Turing");
        assert_eq!(record.email, "");
        assert_eq!(record.full_name(), " Turing");
    }

    #[test]
    fn ticket_advances() {
        let ticket = ViewTicket::default();
        assert_ne!(ticket.next(), ticket);
    }
}
