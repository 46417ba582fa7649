//! Request and response values exchanged with [`SessionFetcher`](crate::SessionFetcher).

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::Codec;
use crate::client::FetchError;

/// UTF-8 byte order mark, sent by some NSE JSON endpoints.
const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// GET; parameters go into the query string.
    #[default]
    Get,
    /// POST; parameters go into a JSON body.
    Post,
}

impl Method {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered request parameters.
///
/// Values keep their JSON type so a POST body sends `"fromDate": 0` as a
/// number, while the GET query string renders it as `fromDate=0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pairs: Vec<(String, Value)>,
}

impl Query {
    /// Creates an empty parameter list.
    #[must_use]
    pub const fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Adds a parameter, replacing any previous value under the same key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a parameter in place, replacing any previous value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Renders the parameters as query string pairs.
    ///
    /// Strings are sent without quotes; other values use their JSON text.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .map(|(k, v)| {
                let rendered = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect()
    }

    /// Renders the parameters as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.pairs.iter().cloned().collect::<Map<_, _>>())
    }
}

/// One logical request: URL, method, extra headers and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    url: String,
    method: Method,
    headers: BTreeMap<String, String>,
    query: Query,
}

impl Request {
    /// Creates a request with the given method.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            query: Query::new(),
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Sets the request parameters.
    #[must_use]
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Adds a header on top of the fetcher's defaults.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns the same request with a different method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Returns the target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Returns the extra headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the parameters.
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Parses the URL, rejecting empty or malformed targets.
    pub(crate) fn parsed_url(&self) -> Result<reqwest::Url, FetchError> {
        if self.url.trim().is_empty() {
            return Err(FetchError::InvalidRequest("URL must not be empty".into()));
        }
        reqwest::Url::parse(&self.url)
            .map_err(|e| FetchError::InvalidRequest(format!("invalid URL '{}': {e}", self.url)))
    }
}

/// A successful response with its body already decompressed.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: u16,
    url: String,
    content_type: Option<String>,
    codec: Codec,
    body: Bytes,
}

impl RawResponse {
    /// Creates a response value.
    #[must_use]
    pub const fn new(
        status: u16,
        url: String,
        content_type: Option<String>,
        codec: Codec,
        body: Bytes,
    ) -> Self {
        Self {
            status,
            url,
            content_type,
            codec,
            body,
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns the final URL after redirects.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the `Content-Type` header, if present.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the codec the body was decoded with.
    #[must_use]
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Returns the decoded body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the body without a leading UTF-8 byte order mark.
    #[must_use]
    pub fn body_without_bom(&self) -> &[u8] {
        self.body.strip_prefix(UTF8_BOM).unwrap_or(&self.body[..])
    }

    /// Returns the body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.body_without_bom()).into_owned()
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(self.body_without_bom())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_renders_both_ways() {
        let query = Query::new()
            .with("symbol", "RELIANCE")
            .with("fromDate", 0)
            .with("toDate", 1_705_312_800_i64);

        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("symbol".to_string(), "RELIANCE".to_string()),
                ("fromDate".to_string(), "0".to_string()),
                ("toDate".to_string(), "1705312800".to_string()),
            ]
        );
        assert_eq!(
            query.to_json(),
            json!({"symbol": "RELIANCE", "fromDate": 0, "toDate": 1_705_312_800_i64})
        );
    }

    #[test]
    fn test_query_insert_replaces() {
        let query = Query::new().with("symbol", "A").with("symbol", "B");
        assert_eq!(query.len(), 1);
        assert_eq!(query.get("symbol"), Some(&json!("B")));
    }

    #[test]
    fn test_request_url_validation() {
        assert!(matches!(
            Request::get("").parsed_url(),
            Err(FetchError::InvalidRequest(_))
        ));
        assert!(matches!(
            Request::get("not a url").parsed_url(),
            Err(FetchError::InvalidRequest(_))
        ));
        assert!(Request::get("https://www.nseindia.com/api/marketStatus").parsed_url().is_ok());
    }

    #[test]
    fn test_response_strips_bom() {
        let mut body = UTF8_BOM.to_vec();
        body.extend_from_slice(br#"{"data":[]}"#);
        let response = RawResponse::new(
            200,
            "http://localhost/".into(),
            None,
            Codec::Identity,
            Bytes::from(body),
        );

        let value: Value = response.json().unwrap();
        assert_eq!(value, json!({"data": []}));
        assert_eq!(response.text(), r#"{"data":[]}"#);
    }
}
