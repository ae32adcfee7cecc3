//! Requests the core sends through `crux_http`, planned up front so they can
//! be validated and inspected before the shell sees them.

use thiserror::Error;
use tracing::debug;
use url::Url;

use crux_http::Http;

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_REQUEST_BODY_SIZE: usize = 50 * 1024 * 1024;

/// What `crux_http` hands back for every request this crate sends.
pub type HttpResult = crux_http::Result<crux_http::Response<Vec<u8>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    url: Url,
}

impl ValidatedUrl {
    pub fn new(url: impl AsRef<str>) -> Result<Self, RequestError> {
        let raw = url.as_ref();
        let invalid = |reason: String| RequestError::InvalidUrl {
            url: truncate_url(raw),
            reason,
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("URL cannot be empty".to_string()));
        }
        if raw.len() > MAX_URL_LENGTH {
            return Err(invalid(format!(
                "URL exceeds maximum length of {MAX_URL_LENGTH} bytes"
            )));
        }

        let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid(format!(
                "invalid scheme '{}', only 'http' and 'https' are allowed",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(invalid("URL must have a host".to_string()));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("credentials in URL are not allowed".to_string()));
        }

        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }
}

impl std::fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn truncate_url(url: &str) -> String {
    if url.chars().count() <= 100 {
        url.to_string()
    } else {
        format!("{}...", url.chars().take(100).collect::<String>())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    fn has_request_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

/// A request that could not be planned. Nothing reached the shell.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{method} requests cannot have a body")]
    BodyNotAllowed { method: &'static str },

    #[error("request body too large: {size} bytes exceeds maximum of {max} bytes")]
    BodyTooLarge { size: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestBody {
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    url: ValidatedUrl,
    body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: ValidatedUrl) -> Self {
        Self {
            method,
            url,
            body: None,
        }
    }

    pub fn get(url: impl AsRef<str>) -> Result<Self, RequestError> {
        Ok(Self::new(HttpMethod::Get, ValidatedUrl::new(url)?))
    }

    pub fn post(url: impl AsRef<str>) -> Result<Self, RequestError> {
        Ok(Self::new(HttpMethod::Post, ValidatedUrl::new(url)?))
    }

    pub fn put(url: impl AsRef<str>) -> Result<Self, RequestError> {
        Ok(Self::new(HttpMethod::Put, ValidatedUrl::new(url)?))
    }

    pub fn delete(url: impl AsRef<str>) -> Result<Self, RequestError> {
        Ok(Self::new(HttpMethod::Delete, ValidatedUrl::new(url)?))
    }

    pub fn with_multipart(mut self, form: MultipartForm) -> Result<Self, RequestError> {
        if !self.method.has_request_body() {
            return Err(RequestError::BodyNotAllowed {
                method: self.method.as_str(),
            });
        }

        let content_type = form.content_type();
        let bytes = form.finish();
        if bytes.len() > MAX_REQUEST_BODY_SIZE {
            return Err(RequestError::BodyTooLarge {
                size: bytes.len(),
                max: MAX_REQUEST_BODY_SIZE,
            });
        }

        self.body = Some(RequestBody {
            content_type,
            bytes,
        });
        Ok(self)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &ValidatedUrl {
        &self.url
    }

    pub fn content_type(&self) -> Option<&str> {
        self.body.as_ref().map(|body| body.content_type.as_str())
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_ref().map(|body| body.bytes.as_slice())
    }

    /// Hands the request to the shell and feeds the outcome back through
    /// `make_event`.
    pub fn send<Ev, F>(self, http: &Http<Ev>, make_event: F)
    where
        Ev: Send + 'static,
        F: FnOnce(HttpResult) -> Ev + Send + 'static,
    {
        debug!(method = self.method.as_str(), url = %self.url, "sending request");

        let url = self.url.as_str();
        let builder = match self.method {
            HttpMethod::Get => http.get(url),
            HttpMethod::Post => http.post(url),
            HttpMethod::Put => http.put(url),
            HttpMethod::Delete => http.delete(url),
        };
        let builder = match self.body {
            Some(body) => builder
                .header("Content-Type", body.content_type.as_str())
                .body(body.bytes),
            None => builder,
        };
        builder.send(make_event);
    }
}

/// Status, type and body of whatever the server answered, whether
/// `crux_http` surfaced it as a response or as an error status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Reply {
    /// Splits transport failures from answers. Only the former stay errors.
    pub fn from_result(result: HttpResult) -> Result<Self, crux_http::Error> {
        match result {
            Ok(mut response) => Ok(Self {
                status: response.status().into(),
                content_type: response
                    .content_type()
                    .map(|mime| mime.essence().to_ascii_lowercase()),
                body: response.take_body().unwrap_or_default(),
            }),
            Err(crux_http::Error::Http(e)) => Ok(Self {
                status: e.code.into(),
                content_type: None,
                body: e.body.unwrap_or_default(),
            }),
            Err(e) => Err(e),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The response's media type when it names an image.
    pub fn image_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .filter(|essence| essence.len() > "image/".len() && essence.starts_with("image/"))
    }
}

/// `multipart/form-data` body builder.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(format!("----wildcat-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quoted(name)
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, media_type: &str, bytes: &[u8]) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                escape_quoted(name),
                escape_quoted(file_name),
                media_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }

    fn open_part(&mut self) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ")
}
