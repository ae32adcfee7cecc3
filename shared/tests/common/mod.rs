#![allow(dead_code)]

use std::collections::VecDeque;

use crux_core::testing::{AppTester, Update};
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use wildcat_shared::capabilities::PromptOperation;
use wildcat_shared::{App, Effect, Event, Model};

pub type Tester = AppTester<App, Effect>;

/// Applies every event the update produced, and the events those produce,
/// returning all effects emitted along the way.
pub fn drive(app: &Tester, model: &mut Model, update: Update<Effect, Event>) -> Vec<Effect> {
    let mut effects = update.effects;
    let mut events: VecDeque<Event> = update.events.into();
    while let Some(event) = events.pop_front() {
        let next = app.update(event, model);
        effects.extend(next.effects);
        events.extend(next.events);
    }
    effects
}

pub fn send(app: &Tester, model: &mut Model, event: Event) -> Vec<Effect> {
    let update = app.update(event, model);
    drive(app, model, update)
}

pub fn http_requests(effects: Vec<Effect>) -> Vec<Request<HttpRequest>> {
    effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some(request),
            _ => None,
        })
        .collect()
}

pub fn single_http(effects: Vec<Effect>) -> Request<HttpRequest> {
    let mut requests = http_requests(effects);
    assert_eq!(requests.len(), 1, "expected exactly one http request");
    requests.remove(0)
}

pub fn single_prompt(effects: Vec<Effect>) -> Request<PromptOperation> {
    let mut prompts: Vec<_> = effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::Prompt(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(prompts.len(), 1, "expected exactly one prompt");
    prompts.remove(0)
}

pub fn respond(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<HttpRequest>,
    response: HttpResponse,
) -> Vec<Effect> {
    let update = app.resolve(request, HttpResult::Ok(response)).expect("request resolves");
    drive(app, model, update)
}

pub fn response(status: u16, body: impl Into<Vec<u8>>) -> HttpResponse {
    HttpResponse::status(status).body(body.into()).build()
}

pub fn response_with_type(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> HttpResponse {
    HttpResponse::status(status)
        .header("Content-Type", content_type)
        .body(body.into())
        .build()
}

pub fn method(request: &Request<HttpRequest>) -> &str {
    &request.operation.method
}

pub fn url(request: &Request<HttpRequest>) -> &str {
    &request.operation.url
}

pub fn header<'a>(request: &'a Request<HttpRequest>, name: &str) -> Option<&'a str> {
    request
        .operation
        .headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str())
}

pub fn user_json(id: u64, first: &str, last: &str) -> String {
    format!(
        r#"{{"id":{id},"firstName":"{first}","lastName":"{last}","email":"{first}@example.com","major":"History","graduationYear":2026}}"#
    )
}

pub fn users_json(users: &[(u64, &str, &str)]) -> String {
    let items: Vec<String> = users
        .iter()
        .map(|(id, first, last)| user_json(*id, first, last))
        .collect();
    format!("[{}]", items.join(","))
}

pub fn body_text(request: &Request<HttpRequest>) -> String {
    String::from_utf8_lossy(&request.operation.body).into_owned()
}
