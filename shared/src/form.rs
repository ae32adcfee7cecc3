//! Create/edit profile form: draft state, validation and image resolution.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{SaveOperation, SubmitPayload, UserFields};
use crate::capabilities::{HttpMethod, HttpRequest, HttpResult, Reply, ValidatedUrl};
use crate::config::PlaceholderConfig;
use crate::image_processing::{placeholder_image, ImagePayload, ImageSource, PlaceholderLabel};
use crate::model::{non_blank, LoadState, UserId, UserRecord};
use crate::AppError;

pub const HYDRATION_FAILED_MESSAGE: &str = "Failed to load user. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormField {
    FirstName,
    LastName,
    Email,
    Bio,
    Major,
    GraduationYear,
    ImageUrl,
}

impl FormField {
    pub const REQUIRED: [FormField; 3] = [FormField::FirstName, FormField::LastName, FormField::Email];
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("First name, last name, and email are required.")]
    MissingRequired { missing: Vec<FormField> },
}

/// Raw field values as typed. Trimming happens on submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub bio: String,
    pub major: String,
    pub graduation_year: String,
    pub image_url: String,
}

impl DraftForm {
    /// Prefills from a fetched record. The image URL starts empty; the stored
    /// picture is kept separately as the edit fallback.
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            bio: record.bio.clone().unwrap_or_default(),
            major: record.major.clone().unwrap_or_default(),
            graduation_year: record.graduation_year.clone().unwrap_or_default(),
            image_url: String::new(),
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Email => &self.email,
            FormField::Bio => &self.bio,
            FormField::Major => &self.major,
            FormField::GraduationYear => &self.graduation_year,
            FormField::ImageUrl => &self.image_url,
        }
    }

    pub fn set(&mut self, field: FormField, value: String) {
        let slot = match field {
            FormField::FirstName => &mut self.first_name,
            FormField::LastName => &mut self.last_name,
            FormField::Email => &mut self.email,
            FormField::Bio => &mut self.bio,
            FormField::Major => &mut self.major,
            FormField::GraduationYear => &mut self.graduation_year,
            FormField::ImageUrl => &mut self.image_url,
        };
        *slot = value;
    }

    /// Required fields must be non-empty after trimming. Email format is left
    /// to the server.
    pub fn validate(&self) -> Result<UserFields, ValidationError> {
        let missing: Vec<FormField> = FormField::REQUIRED
            .into_iter()
            .filter(|field| self.get(*field).trim().is_empty())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequired { missing });
        }

        Ok(UserFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            bio: self.bio.clone(),
            major: self.major.clone(),
            graduation_year: self.graduation_year.clone(),
        }
        .trimmed())
    }

    pub fn entered_image_url(&self) -> Option<&str> {
        non_blank(Some(self.image_url.as_str())).map(str::trim)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit {
        id: UserId,
        existing_picture: Option<String>,
    },
}

impl FormMode {
    pub fn operation(&self) -> SaveOperation {
        match self {
            FormMode::Create => SaveOperation::Create,
            FormMode::Edit { .. } => SaveOperation::Update,
        }
    }
}

/// Next thing the image resolver needs done.
#[derive(Debug)]
pub enum ResolveStep {
    Fetch {
        source: ImageSource,
        request: HttpRequest,
    },
    Ready(ImagePayload),
}

/// Picks the upload image: the entered URL, then the stored picture, then a
/// generated placeholder. A candidate that cannot be fetched is skipped
/// without surfacing an error.
#[derive(Debug)]
pub struct ImageResolution {
    candidates: VecDeque<(ImageSource, String)>,
    awaiting: Option<(ImageSource, ValidatedUrl)>,
    placeholder: PlaceholderConfig,
}

impl ImageResolution {
    pub fn new(
        entered_url: Option<&str>,
        stored_picture: Option<&str>,
        placeholder: PlaceholderConfig,
    ) -> Self {
        let candidates = [
            (ImageSource::EnteredUrl, entered_url),
            (ImageSource::StoredPicture, stored_picture),
        ]
        .into_iter()
        .filter_map(|(source, url)| non_blank(url).map(|u| (source, u.trim().to_string())))
        .collect();

        Self {
            candidates,
            awaiting: None,
            placeholder,
        }
    }

    pub fn awaiting(&self) -> Option<ImageSource> {
        self.awaiting.as_ref().map(|(source, _)| *source)
    }

    /// Moves to the next candidate, falling through to the placeholder once
    /// every URL has been tried.
    pub fn advance(&mut self) -> ResolveStep {
        self.awaiting = None;
        while let Some((source, url)) = self.candidates.pop_front() {
            match ValidatedUrl::new(&url) {
                Ok(url) => {
                    debug!(?source, url = %url, "fetching upload image");
                    let request = HttpRequest::new(HttpMethod::Get, url.clone());
                    self.awaiting = Some((source, url));
                    return ResolveStep::Fetch { source, request };
                }
                Err(e) => warn!(?source, error = %e, "skipping unusable image url"),
            }
        }
        ResolveStep::Ready(placeholder_image(&self.placeholder, PlaceholderLabel::NO_IMAGE))
    }

    /// Consumes a fetch result. Returns `None` when `source` is not the fetch
    /// currently awaited.
    pub fn accept(&mut self, source: ImageSource, result: HttpResult) -> Option<ResolveStep> {
        let (awaited, url) = self.awaiting.take()?;
        if awaited != source {
            self.awaiting = Some((awaited, url));
            return None;
        }

        let file_stem = match source {
            ImageSource::StoredPicture => "existing-image",
            ImageSource::EnteredUrl | ImageSource::Placeholder => "image",
        };

        match Reply::from_result(result) {
            Ok(reply) if reply.is_success() => {
                let media_type = reply.image_type().map(str::to_string);
                let payload = ImagePayload::from_fetched(
                    url.as_url(),
                    reply.body,
                    media_type.as_deref(),
                    file_stem,
                    source,
                );
                if let Some(payload) = payload {
                    return Some(ResolveStep::Ready(payload));
                }
                warn!(?source, "image fetch returned an empty body");
            }
            Ok(reply) => warn!(?source, status = reply.status, "image fetch rejected"),
            Err(e) => warn!(?source, error = %e, "image fetch failed"),
        }
        Some(self.advance())
    }
}

/// Why a submit did not start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitBlocked {
    NotReady,
    AlreadySaving,
    Invalid(ValidationError),
}

/// A save ready to be turned into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub operation: SaveOperation,
    pub id: Option<UserId>,
    pub payload: SubmitPayload,
}

#[derive(Debug)]
pub struct FormState {
    pub mode: FormMode,
    pub hydration: LoadState<()>,
    pub draft: DraftForm,
    pub saving: bool,
    pub error: Option<AppError>,
    pending: Option<(UserFields, ImageResolution)>,
}

impl FormState {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            hydration: LoadState::Loaded(()),
            draft: DraftForm::default(),
            saving: false,
            error: None,
            pending: None,
        }
    }

    pub fn edit(id: UserId) -> Self {
        Self {
            mode: FormMode::Edit {
                id,
                existing_picture: None,
            },
            hydration: LoadState::Loading,
            ..Self::create()
        }
    }

    pub fn operation(&self) -> SaveOperation {
        self.mode.operation()
    }

    pub fn editing(&self) -> Option<UserId> {
        match self.mode {
            FormMode::Edit { id, .. } => Some(id),
            FormMode::Create => None,
        }
    }

    pub fn hydrate(&mut self, record: &UserRecord) {
        if let FormMode::Edit {
            existing_picture, ..
        } = &mut self.mode
        {
            *existing_picture = record.picture_url().map(str::to_string);
        }
        self.draft = DraftForm::from_record(record);
        self.hydration = LoadState::Loaded(());
    }

    pub fn hydration_failed(&mut self) {
        self.hydration = LoadState::Failed {
            message: HYDRATION_FAILED_MESSAGE.to_string(),
        };
    }

    pub fn update_field(&mut self, field: FormField, value: String) {
        self.draft.set(field, value);
        self.error = None;
    }

    pub fn is_resolving_image(&self) -> bool {
        self.pending.is_some()
    }

    /// Validates the draft and starts image resolution.
    pub fn begin_submit(
        &mut self,
        placeholder: &PlaceholderConfig,
    ) -> Result<ResolveStep, SubmitBlocked> {
        if self.hydration.loaded().is_none() {
            return Err(SubmitBlocked::NotReady);
        }
        if self.saving {
            return Err(SubmitBlocked::AlreadySaving);
        }

        self.error = None;
        let fields = self.draft.validate().map_err(|e| {
            self.error = Some(AppError::from(&e));
            SubmitBlocked::Invalid(e)
        })?;

        let stored_picture = match &self.mode {
            FormMode::Edit {
                existing_picture, ..
            } => existing_picture.as_deref(),
            FormMode::Create => None,
        };
        let mut resolution = ImageResolution::new(
            self.draft.entered_image_url(),
            stored_picture,
            placeholder.clone(),
        );
        let step = resolution.advance();

        self.saving = true;
        self.pending = Some((fields, resolution));
        Ok(step)
    }

    /// Feeds a fetch result to the running resolution. `None` means nothing
    /// was waiting on it.
    pub fn image_fetched(&mut self, source: ImageSource, result: HttpResult) -> Option<ResolveStep> {
        let (_, resolution) = self.pending.as_mut()?;
        resolution.accept(source, result)
    }

    /// Pairs the resolved image with the validated fields.
    pub fn submission(&mut self, image: ImagePayload) -> Option<Submission> {
        let (fields, _) = self.pending.take()?;
        Some(Submission {
            operation: self.operation(),
            id: self.editing(),
            payload: SubmitPayload {
                fields,
                image: Some(image),
            },
        })
    }

    /// Re-enables the form with the draft intact.
    pub fn save_failed(&mut self, error: AppError) {
        self.saving = false;
        self.pending = None;
        self.error = Some(error);
    }

    pub fn save_succeeded(&mut self) {
        self.saving = false;
        self.pending = None;
        self.error = None;
    }
}
