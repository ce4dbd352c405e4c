//! Scripted transport for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use super::transport::{HttpResponse, MediaType, Transport, TransportError};

type Reply = Result<HttpResponse, TransportError>;

/// Replays canned responses keyed by URL.
///
/// One-shot replies queued with [`ScriptedTransport::queue`] are served first,
/// then the standing reply, then a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: RefCell<HashMap<String, VecDeque<Reply>>>,
    standing: RefCell<HashMap<String, Reply>>,
    requests: RefCell<Vec<String>>,
    posts: RefCell<Vec<(String, serde_json::Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `url` with `response`.
    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.standing.borrow_mut().insert(url.to_string(), Ok(response));
    }

    /// Always answer `url` with a 200 JSON body.
    pub fn json(&self, url: &str, body: serde_json::Value) {
        self.respond(url, HttpResponse::new(200, body.to_string()));
    }

    /// Always answer `url` with a 200 raw body.
    pub fn text(&self, url: &str, body: &str) {
        self.respond(url, HttpResponse::new(200, body));
    }

    /// Always fail `url` at the transport level.
    pub fn fail(&self, url: &str, message: &str) {
        self.standing.borrow_mut().insert(url.to_string(), Err(TransportError(message.to_string())));
    }

    /// Answer the next request for `url` with `reply`.
    pub fn queue(&self, url: &str, reply: Reply) {
        self.queued.borrow_mut().entry(url.to_string()).or_default().push_back(reply);
    }

    /// Number of GET requests made for `url`.
    pub fn count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }

    /// Every GET request made, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// Every POST made, in order.
    pub fn posts(&self) -> Vec<(String, serde_json::Value)> {
        self.posts.borrow().clone()
    }

    fn reply(&self, url: &str) -> Reply {
        if let Some(reply) = self.queued.borrow_mut().get_mut(url).and_then(VecDeque::pop_front) {
            return reply;
        }
        self.standing
            .borrow()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Ok(HttpResponse::new(404, r#"{"message": "Not Found"}"#)))
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, _media: MediaType) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(url.to_string());
        self.reply(url)
    }

    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.posts.borrow_mut().push((url.to_string(), body.clone()));
        self.reply(url)
    }
}
