mod http;
mod prompt;

pub use self::http::{
    HttpMethod, HttpRequest, HttpResult, MultipartForm, Reply, RequestError, ValidatedUrl,
};
pub use self::prompt::{ConfirmOutcome, Prompt, PromptOperation};

// Crux's built-in capabilities cover transport and view updates as-is.
pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub prompt: Prompt<Event>,
    pub render: Render<Event>,
}
