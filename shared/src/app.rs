use tracing::{debug, error, info, warn};

use crate::api::{ApiError, SaveOperation, UsersApi};
use crate::capabilities::{Capabilities, HttpRequest, HttpResult};
use crate::directory::{
    next_replacement_stamp, replacement_payload, DeleteOrigin, DeleteTarget,
};
use crate::event::Event;
use crate::form::{FormState, ResolveStep, SubmitBlocked};
use crate::image_processing::ImagePayload;
use crate::model::{LoadState, Model, Notice, Route, UserId, ViewTicket};
use crate::view::{self, ViewModel};
use crate::get_current_time_ms;

pub const LOAD_USERS_FAILED: &str = "Failed to load users. Please try again later.";
pub const LOAD_USER_FAILED: &str = "Failed to load user. Please try again later.";

#[derive(Default)]
pub struct App;

impl App {
    fn api(model: &Model) -> UsersApi {
        UsersApi::new(&model.config)
    }

    /// Replaces the current view with `route`, dropping every view-owned
    /// snapshot and starting the route's fetch.
    fn mount(route: Route, model: &mut Model, caps: &Capabilities) {
        model.ticket = model.ticket.next();
        model.route = route;
        model.directory = LoadState::Loading;
        model.profile = LoadState::Loading;
        model.form = None;

        let ticket = model.ticket;
        debug!(path = %model.route.path(), ticket = ticket.0, "mounting view");

        match model.route.clone() {
            Route::AllUsers => {
                let request = Self::api(model).list_users();
                Self::send_load(request, model, caps, move |result| Event::UsersLoaded {
                    ticket,
                    result: Box::new(result),
                });
            }
            Route::UserDetail { id } => {
                let request = Self::api(model).get_user(id);
                Self::send_load(request, model, caps, move |result| Event::UserLoaded {
                    ticket,
                    result: Box::new(result),
                });
            }
            Route::EditUser { id } => {
                model.form = Some(FormState::edit(id));
                let request = Self::api(model).get_user(id);
                Self::send_load(request, model, caps, move |result| Event::UserLoaded {
                    ticket,
                    result: Box::new(result),
                });
            }
            Route::CreateUser => model.form = Some(FormState::create()),
            Route::Home | Route::MyProfile | Route::About | Route::NotFound { .. } => {}
        }
    }

    fn send_load<F>(
        request: Result<HttpRequest, ApiError>,
        model: &mut Model,
        caps: &Capabilities,
        callback: F,
    ) where
        F: FnOnce(HttpResult) -> Event + Send + 'static,
    {
        match request {
            Ok(request) => request.send(&caps.http, callback),
            Err(e) => {
                error!(error = %e, "could not build load request");
                Self::load_failed(model);
            }
        }
    }

    fn load_failed(model: &mut Model) {
        match &model.route {
            Route::AllUsers => {
                model.directory = LoadState::Failed {
                    message: LOAD_USERS_FAILED.to_string(),
                }
            }
            Route::UserDetail { .. } => {
                model.profile = LoadState::Failed {
                    message: LOAD_USER_FAILED.to_string(),
                }
            }
            Route::EditUser { .. } => {
                if let Some(form) = model.form.as_mut() {
                    form.hydration_failed();
                }
            }
            _ => {}
        }
    }

    fn is_stale(model: &Model, ticket: ViewTicket, what: &'static str) -> bool {
        let stale = model.ticket != ticket;
        if stale {
            debug!(
                what,
                ticket = ticket.0,
                current = model.ticket.0,
                "dropping result for a view that is gone"
            );
        }
        stale
    }

    fn request_delete(id: UserId, model: &mut Model, caps: &Capabilities) {
        let origin = match model.route {
            Route::AllUsers => DeleteOrigin::Directory,
            Route::UserDetail { .. } => DeleteOrigin::Profile,
            _ => {
                warn!(user_id = %id, "delete requested outside the directory or profile");
                return;
            }
        };
        let Some(record) = model.visible_record(id) else {
            warn!(user_id = %id, "delete requested for a record that is not shown");
            return;
        };

        let target = DeleteTarget {
            id,
            display_name: record.full_name(),
            origin,
            ticket: model.ticket,
        };
        let message = target.confirm_message();
        if let Err(busy) = model.delete_flow.begin(target) {
            warn!(user_id = %id, error = %busy, "delete ignored");
            return;
        }

        caps.prompt.confirm(message, move |outcome| Event::DeleteConfirmation {
            id,
            outcome,
        });
    }

    fn delete_failed(id: UserId, model: &mut Model) {
        model.delete_flow.deleted(id, false);
        model.notice = Some(Notice::DeleteFailed);
    }

    fn create_replacement(target: &DeleteTarget, model: &mut Model, caps: &Capabilities) {
        let stamp = next_replacement_stamp(get_current_time_ms(), model.last_replacement_stamp);
        model.last_replacement_stamp = stamp;

        let payload = replacement_payload(stamp, &model.config.placeholder);
        let id = target.id;
        match Self::api(model).create_user(&payload) {
            Ok(request) => request.send(&caps.http, move |result| Event::ReplacementResponse {
                id,
                result: Box::new(result),
            }),
            Err(e) => {
                error!(user_id = %id, error = %e, "could not build replacement request");
                if let Some(target) = model.delete_flow.finish(id) {
                    Self::complete_delete(&target, model, caps);
                }
            }
        }
    }

    fn complete_delete(target: &DeleteTarget, model: &mut Model, caps: &Capabilities) {
        if model.ticket != target.ticket {
            debug!(user_id = %target.id, "delete finished after its view was left");
            return;
        }
        match target.origin {
            DeleteOrigin::Directory => Self::mount(Route::AllUsers, model, caps),
            DeleteOrigin::Profile => Self::mount(Route::Home, model, caps),
        }
    }

    fn advance_image(step: ResolveStep, model: &mut Model, caps: &Capabilities) {
        match step {
            ResolveStep::Fetch { source, request } => {
                let ticket = model.ticket;
                request.send(&caps.http, move |result| Event::ImageFetched {
                    ticket,
                    source,
                    result: Box::new(result),
                });
            }
            ResolveStep::Ready(image) => Self::send_save(image, model, caps),
        }
    }

    fn send_save(image: ImagePayload, model: &mut Model, caps: &Capabilities) {
        let api = Self::api(model);
        let Some(form) = model.form.as_mut() else {
            return;
        };
        let Some(submission) = form.submission(image) else {
            return;
        };
        debug!(
            operation = ?submission.operation,
            image = ?submission.payload.image,
            "sending save"
        );

        let request = match (submission.operation, submission.id) {
            (SaveOperation::Update, Some(id)) => api.update_user(id, &submission.payload),
            _ => api.create_user(&submission.payload),
        };
        match request {
            Ok(request) => {
                let ticket = model.ticket;
                request.send(&caps.http, move |result| Event::SaveResponse {
                    ticket,
                    result: Box::new(result),
                });
            }
            Err(e) => {
                warn!(error = %e, "save rejected before sending");
                form.save_failed(e.to_app_error(submission.operation));
            }
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), "update");

        match event {
            Event::Configure(config) => match config.validate() {
                Ok(()) => {
                    info!(api_base_url = %config.api_base_url, "configuration applied");
                    model.config = *config;
                }
                Err(e) => warn!(error = %e, "configuration rejected"),
            },

            Event::Navigate(route) => Self::mount(route, model, caps),

            Event::NavigatePath(path) => Self::mount(Route::parse(&path), model, caps),

            Event::RetryLoad => {
                let route = model.route.clone();
                Self::mount(route, model, caps);
            }

            Event::LogoutRequested => model.notice = Some(Notice::LogoutUnavailable),

            Event::DismissNotice => model.notice = None,

            Event::UsersLoaded { ticket, result } => {
                if Self::is_stale(model, ticket, "users") {
                    return;
                }
                model.directory = match Self::api(model).decode_users(*result) {
                    Ok(users) => {
                        debug!(count = users.len(), "users loaded");
                        LoadState::Loaded(users)
                    }
                    Err(e) => {
                        error!(error = %e, "failed to load users");
                        LoadState::Failed {
                            message: LOAD_USERS_FAILED.to_string(),
                        }
                    }
                };
            }

            Event::UserLoaded { ticket, result } => {
                if Self::is_stale(model, ticket, "user") {
                    return;
                }
                match Self::api(model).decode_user(*result) {
                    Ok(user) => match (&model.route, model.form.as_mut()) {
                        (Route::EditUser { .. }, Some(form)) => form.hydrate(&user),
                        _ => model.profile = LoadState::Loaded(user),
                    },
                    Err(e) => {
                        error!(error = %e, "failed to load user");
                        Self::load_failed(model);
                    }
                }
            }

            Event::ConnectToggled { id } => {
                let connected = model.connections.toggle(id);
                debug!(user_id = %id, connected, "connect toggled");
            }

            Event::DeleteRequested { id } => Self::request_delete(id, model, caps),

            Event::DeleteConfirmation { id, outcome } => {
                if model
                    .delete_flow
                    .confirmed(id, outcome.is_confirmed())
                    .is_none()
                {
                    debug!(user_id = %id, "delete not confirmed");
                    caps.render.render();
                    return;
                }
                match Self::api(model).delete_user(id) {
                    Ok(request) => request.send(&caps.http, move |result| Event::DeleteResponse {
                        id,
                        result: Box::new(result),
                    }),
                    Err(e) => {
                        error!(user_id = %id, error = %e, "could not build delete request");
                        Self::delete_failed(id, model);
                    }
                }
            }

            Event::DeleteResponse { id, result } => {
                match Self::api(model).decode_deleted(*result) {
                    Ok(()) => {
                        info!(user_id = %id, "user deleted");
                        if let Some(target) = model.delete_flow.deleted(id, true) {
                            Self::create_replacement(&target, model, caps);
                        }
                    }
                    Err(e) => {
                        error!(user_id = %id, error = %e, "failed to delete user");
                        Self::delete_failed(id, model);
                    }
                }
            }

            Event::ReplacementResponse { id, result } => {
                match Self::api(model).decode_user(*result) {
                    Ok(user) => info!(deleted = %id, replacement = %user.id, "replacement user created"),
                    Err(e) => error!(deleted = %id, error = %e, "failed to create replacement user"),
                }
                if let Some(target) = model.delete_flow.finish(id) {
                    Self::complete_delete(&target, model, caps);
                }
            }

            Event::FieldChanged { field, value } => {
                if let Some(form) = model.form.as_mut() {
                    form.update_field(field, value);
                }
            }

            Event::SubmitRequested => {
                let placeholder = model.config.placeholder.clone();
                let Some(form) = model.form.as_mut() else {
                    return;
                };
                match form.begin_submit(&placeholder) {
                    Ok(step) => Self::advance_image(step, model, caps),
                    Err(SubmitBlocked::Invalid(e)) => debug!(error = %e, "submit blocked by validation"),
                    Err(blocked) => debug!(?blocked, "submit ignored"),
                }
            }

            Event::ImageFetched {
                ticket,
                source,
                result,
            } => {
                if Self::is_stale(model, ticket, "image") {
                    return;
                }
                let step = model
                    .form
                    .as_mut()
                    .and_then(|form| form.image_fetched(source, *result));
                match step {
                    Some(step) => Self::advance_image(step, model, caps),
                    None => debug!(?source, "no image fetch was pending"),
                }
            }

            Event::SaveResponse { ticket, result } => {
                if Self::is_stale(model, ticket, "save") {
                    return;
                }
                let api = Self::api(model);
                let Some(form) = model.form.as_mut() else {
                    return;
                };
                let operation = form.operation();
                match api.decode_user(*result) {
                    Ok(user) => {
                        info!(user_id = %user.id, ?operation, "user saved");
                        form.save_succeeded();
                        Self::mount(Route::UserDetail { id: user.id }, model, caps);
                    }
                    Err(e) => {
                        error!(?operation, error = %e, "failed to save user");
                        form.save_failed(e.to_app_error(operation));
                    }
                }
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::view(model)
    }
}
