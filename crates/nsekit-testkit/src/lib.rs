//! Scripted local HTTP server for integration tests.

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A canned HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl MockResponse {
    /// A 200 response with the given body.
    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A 200 response with a JSON body.
    #[must_use]
    pub fn json(body: impl Into<Vec<u8>>) -> Self {
        Self::ok(body).with_header("Content-Type", "application/json")
    }

    /// An empty response with the given status.
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Adds a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a `Set-Cookie` header.
    #[must_use]
    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        self.with_header("Set-Cookie", format!("{name}={value}; Path=/"))
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        let mut builder = axum::http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(Body::from(self.body)).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid scripted response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
    }
}

/// A request received by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Request method.
    pub method: String,
    /// Path without the query string.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Headers with lower-cased names.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Returns the first header with the given (case-insensitive) name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value of one query parameter.
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.as_deref()?.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == key).then_some(v)
        })
    }

    /// Returns the body as UTF-8 text.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Default)]
struct Route {
    queue: VecDeque<MockResponse>,
    last: Option<MockResponse>,
}

impl Route {
    fn next(&mut self) -> Option<MockResponse> {
        if let Some(response) = self.queue.pop_front() {
            self.last = Some(response.clone());
            return Some(response);
        }
        self.last.clone()
    }
}

#[derive(Debug, Default)]
struct Script {
    routes: HashMap<(Option<String>, String), Route>,
    log: Vec<RecordedRequest>,
}

impl Script {
    fn respond(&mut self, method: &str, path: &str) -> MockResponse {
        let exact = (Some(method.to_string()), path.to_string());
        let any = (None, path.to_string());
        self.routes
            .get_mut(&exact)
            .and_then(Route::next)
            .or_else(|| self.routes.get_mut(&any).and_then(Route::next))
            .unwrap_or_else(|| MockResponse::status(404))
    }
}

/// A local axum server answering from scripted routes.
///
/// Each route holds a queue of responses; once the queue is drained the last
/// response repeats. Unknown paths answer 404. The server stops when dropped.
#[derive(Debug)]
pub struct MockServer {
    addr: SocketAddr,
    script: Arc<Mutex<Script>>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Binds to an ephemeral local port and starts serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let script = Arc::new(Mutex::new(Script::default()));

        let app = Router::new()
            .fallback(record_and_respond)
            .with_state(Arc::clone(&script));
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::debug!(error = %e, "mock server stopped");
            }
        });

        Self {
            addr,
            script,
            handle,
        }
    }

    /// Returns the server's socket address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the absolute URL of a path on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Scripts the responses for a path, for any method.
    pub fn route(&self, path: &str, responses: impl IntoIterator<Item = MockResponse>) {
        self.script(None, path, responses);
    }

    /// Scripts the responses for a path and method; takes precedence over
    /// [`route`](Self::route).
    pub fn route_method(
        &self,
        method: &str,
        path: &str,
        responses: impl IntoIterator<Item = MockResponse>,
    ) {
        self.script(Some(method.to_ascii_uppercase()), path, responses);
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.script).log.clone()
    }

    /// Returns the requests received for a path.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        lock(&self.script)
            .log
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Returns the number of requests received for a path.
    #[must_use]
    pub fn hits(&self, path: &str) -> usize {
        lock(&self.script)
            .log
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    fn script(
        &self,
        method: Option<String>,
        path: &str,
        responses: impl IntoIterator<Item = MockResponse>,
    ) {
        let route = Route {
            queue: responses.into_iter().collect(),
            last: None,
        };
        lock(&self.script)
            .routes
            .insert((method, path.to_string()), route);
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn record_and_respond(
    State(shared): State<Arc<Mutex<Script>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> MockResponse {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_string(), value)
        })
        .collect();

    let mut script = lock(&shared);
    let response = script.respond(method.as_str(), uri.path());
    tracing::trace!(%method, path = uri.path(), status = response.status, "mock request");
    script.log.push(RecordedRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_owned),
        headers,
        body: body.to_vec(),
    });
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_repeats_last_response() {
        let mut route = Route {
            queue: VecDeque::from([MockResponse::status(500), MockResponse::ok("done")]),
            last: None,
        };
        assert_eq!(route.next().map(|r| r.status), Some(500));
        assert_eq!(route.next().map(|r| r.status), Some(200));
        assert_eq!(route.next().map(|r| r.status), Some(200));
    }

    #[test]
    fn test_query_param() {
        let request = RecordedRequest {
            method: "GET".into(),
            path: "/chart".into(),
            query: Some("symbol=RELIANCE&fromDate=0".into()),
            headers: vec![("cookie".into(), "nsit=a".into())],
            body: Vec::new(),
        };
        assert_eq!(request.query_param("fromDate"), Some("0"));
        assert_eq!(request.query_param("toDate"), None);
        assert_eq!(request.header("Cookie"), Some("nsit=a"));
    }

    #[tokio::test]
    async fn test_server_records_and_scripts() {
        let server = MockServer::start().await;
        server.route(
            "/warmup",
            [MockResponse::ok("hi").with_cookie("nsit", "a").with_cookie("nseappid", "b")],
        );
        server.route_method("POST", "/chart", [MockResponse::status(503), MockResponse::json("{}")]);

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let warmup = client
            .get(server.url("/warmup?x=1"))
            .header("X-Request-Id", "7")
            .send()
            .await
            .unwrap();
        assert_eq!(warmup.headers().get_all("set-cookie").iter().count(), 2);
        assert_eq!(warmup.text().await.unwrap(), "hi");

        let first = client.post(server.url("/chart")).body("{\"a\":1}").send().await.unwrap();
        assert_eq!(first.status().as_u16(), 503);
        let second = client.post(server.url("/chart")).send().await.unwrap();
        assert_eq!(second.status().as_u16(), 200);
        let missing = client.get(server.url("/chart")).send().await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        let warmups = server.requests_to("/warmup");
        assert_eq!(warmups[0].query_param("x"), Some("1"));
        assert_eq!(warmups[0].header("x-request-id"), Some("7"));

        let charts = server.requests_to("/chart");
        assert_eq!(charts.len(), 3);
        assert_eq!(charts[0].method, "POST");
        assert_eq!(charts[0].body_text(), r#"{"a":1}"#);
        assert_eq!(server.hits("/chart"), 3);
    }
}
