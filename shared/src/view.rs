//! What the shell draws. Everything here is derived from [`Model`] and holds
//! display-ready strings.

use serde::{Deserialize, Serialize};

use crate::form::{FormMode, FormState};
use crate::model::{LoadState, Model, Route, UserId, UserRecord};

pub const LOADING_USERS: &str = "Loading users...";
pub const LOADING_USER: &str = "Loading user...";
pub const NO_USERS: &str = "No users found.";
pub const NO_BIO: &str = "No bio available";
pub const MISSING_DETAIL: &str = "N/A";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ViewModel {
    pub path: String,
    pub screen: Screen,
    pub notice: Option<NoticeView>,
    /// A delete confirmation is waiting on the user.
    pub confirming_delete: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NoticeView {
    pub message: String,
    pub is_error: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LinkView {
    pub label: String,
    pub path: String,
}

impl LinkView {
    fn to(label: &str, route: &Route) -> Self {
        Self {
            label: label.to_string(),
            path: route.path(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    Home { links: Vec<LinkView> },
    About { links: Vec<LinkView> },
    MyProfile { links: Vec<LinkView> },
    NotFound { path: String },
    Directory(DirectoryView),
    Profile(ProfileView),
    Form(FormView),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum DirectoryView {
    Loading { message: String },
    Error { message: String },
    Loaded {
        results_label: String,
        empty_message: Option<String>,
        cards: Vec<ProfileCard>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProfileCard {
    pub id: UserId,
    pub full_name: String,
    pub subtitle: String,
    pub bio: String,
    pub picture: Option<String>,
    pub detail_path: String,
    pub edit_path: String,
    pub connected: bool,
    pub connect_label: String,
    pub deleting: bool,
    pub delete_enabled: bool,
    pub delete_label: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ProfileView {
    Loading { message: String },
    Error { message: String },
    Loaded(ProfileDetail),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProfileDetail {
    pub id: UserId,
    pub full_name: String,
    pub subtitle: String,
    pub email: String,
    /// Omitted entirely when the record has none.
    pub bio: Option<String>,
    pub picture: Option<String>,
    pub edit_path: String,
    pub deleting: bool,
    pub delete_enabled: bool,
    pub delete_label: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldView {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub bio: String,
    pub major: String,
    pub graduation_year: String,
    pub image_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorView {
    pub message: String,
    pub code: String,
    pub is_retryable: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum FormView {
    Loading { message: String },
    Error { message: String },
    Ready {
        title: String,
        fields: FieldView,
        current_picture: Option<String>,
        error: Option<ErrorView>,
        saving: bool,
        submit_label: String,
        cancel_path: String,
    },
}

pub fn subtitle(record: &UserRecord) -> String {
    let major = non_empty_or(record.major.as_deref(), MISSING_DETAIL);
    let year = non_empty_or(record.graduation_year.as_deref(), MISSING_DETAIL);
    format!("{major} • {year}")
}

fn non_empty_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.filter(|v| !v.is_empty()).unwrap_or(fallback)
}

pub fn results_label(count: usize) -> String {
    if count == 1 {
        "Showing 1 result".to_string()
    } else {
        format!("Showing {count} results")
    }
}

pub fn view(model: &Model) -> ViewModel {
    let screen = match &model.route {
        Route::Home => Screen::Home {
            links: vec![
                LinkView::to("Browse Students", &Route::AllUsers),
                LinkView::to("Create Profile", &Route::CreateUser),
            ],
        },
        Route::About => Screen::About {
            links: vec![
                LinkView::to("Browse Students", &Route::AllUsers),
                LinkView::to("Create Profile", &Route::CreateUser),
            ],
        },
        Route::MyProfile => Screen::MyProfile {
            links: vec![
                LinkView::to("Browse All Users", &Route::AllUsers),
                LinkView::to("Create New User", &Route::CreateUser),
            ],
        },
        Route::NotFound { path } => Screen::NotFound { path: path.clone() },
        Route::AllUsers => Screen::Directory(directory_view(model)),
        Route::UserDetail { .. } => Screen::Profile(profile_view(model)),
        Route::CreateUser | Route::EditUser { .. } => Screen::Form(match &model.form {
            Some(form) => form_view(form),
            None => FormView::Loading {
                message: LOADING_USER.to_string(),
            },
        }),
    };

    ViewModel {
        path: model.route.path(),
        screen,
        notice: model.notice.as_ref().map(|notice| NoticeView {
            message: notice.message().to_string(),
            is_error: notice.is_error(),
        }),
        confirming_delete: model.delete_flow.is_confirming(),
    }
}

fn directory_view(model: &Model) -> DirectoryView {
    match &model.directory {
        LoadState::Loading => DirectoryView::Loading {
            message: LOADING_USERS.to_string(),
        },
        LoadState::Failed { message } => DirectoryView::Error {
            message: message.clone(),
        },
        LoadState::Loaded(users) => DirectoryView::Loaded {
            results_label: results_label(users.len()),
            empty_message: users.is_empty().then(|| NO_USERS.to_string()),
            cards: users.iter().map(|user| profile_card(model, user)).collect(),
        },
    }
}

fn profile_card(model: &Model, user: &UserRecord) -> ProfileCard {
    let connected = model.connections.contains(user.id);
    let deleting = model.delete_flow.busy_record() == Some(user.id);
    ProfileCard {
        id: user.id,
        full_name: user.full_name(),
        subtitle: subtitle(user),
        bio: non_empty_or(user.bio.as_deref(), NO_BIO).to_string(),
        picture: user.picture_url().map(str::to_string),
        detail_path: Route::UserDetail { id: user.id }.path(),
        edit_path: Route::EditUser { id: user.id }.path(),
        connected,
        connect_label: if connected { "Request Sent" } else { "Connect" }.to_string(),
        deleting,
        delete_enabled: model.delete_flow.target().is_none(),
        delete_label: if deleting { "Deleting..." } else { "Delete" }.to_string(),
    }
}

fn profile_view(model: &Model) -> ProfileView {
    match &model.profile {
        LoadState::Loading => ProfileView::Loading {
            message: LOADING_USER.to_string(),
        },
        LoadState::Failed { message } => ProfileView::Error {
            message: message.clone(),
        },
        LoadState::Loaded(user) => {
            let deleting = model.delete_flow.busy_record() == Some(user.id);
            ProfileView::Loaded(ProfileDetail {
                id: user.id,
                full_name: user.full_name(),
                subtitle: subtitle(user),
                email: user.email.clone(),
                bio: user.bio.clone().filter(|bio| !bio.is_empty()),
                picture: user.picture_url().map(str::to_string),
                edit_path: Route::EditUser { id: user.id }.path(),
                deleting,
                delete_enabled: model.delete_flow.target().is_none(),
                delete_label: if deleting { "Deleting..." } else { "Delete User" }.to_string(),
            })
        }
    }
}

fn form_view(form: &FormState) -> FormView {
    match &form.hydration {
        LoadState::Loading => {
            return FormView::Loading {
                message: LOADING_USER.to_string(),
            }
        }
        LoadState::Failed { message } => {
            return FormView::Error {
                message: message.clone(),
            }
        }
        LoadState::Loaded(()) => {}
    }

    let (title, idle, busy, cancel, current_picture) = match &form.mode {
        FormMode::Create => ("Create New User", "Create User", "Creating...", Route::Home, None),
        FormMode::Edit {
            id,
            existing_picture,
        } => (
            "Edit User",
            "Save Changes",
            "Saving...",
            Route::UserDetail { id: *id },
            existing_picture.clone(),
        ),
    };

    let draft = &form.draft;
    FormView::Ready {
        title: title.to_string(),
        fields: FieldView {
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            email: draft.email.clone(),
            bio: draft.bio.clone(),
            major: draft.major.clone(),
            graduation_year: draft.graduation_year.clone(),
            image_url: draft.image_url.clone(),
        },
        current_picture,
        error: form.error.as_ref().map(|e| ErrorView {
            message: e.message.clone(),
            code: e.code().to_string(),
            is_retryable: e.is_retryable(),
        }),
        saving: form.saving,
        submit_label: if form.saving { busy } else { idle }.to_string(),
        cancel_path: cancel.path(),
    }
}
