// ABOUTME: Description of a streaming HTTP request against the engine API.
// ABOUTME: Builds versioned URIs with encoded query strings and optional JSON bodies.

use bytes::Bytes;
use http_body_util::Full;
use hyper::Method;

use super::error::EngineError;

/// Method, path, query and body of a request that opens a stream.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
}

impl StreamRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present.
    pub fn query_opt(self, key: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Add a boolean parameter only when it is set.
    pub fn query_flag(self, key: &'static str, value: bool) -> Self {
        if value { self.query(key, true) } else { self }
    }

    pub fn json_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request target including the API version prefix, e.g. `/v1.41/containers/web/logs?follow=true`.
    pub fn uri(&self, api_version: &str) -> String {
        let mut uri = format!("/{}{}", api_version.trim_matches('/'), self.path);
        for (i, (key, value)) in self.query.iter().enumerate() {
            uri.push(if i == 0 { '?' } else { '&' });
            uri.push_str(key);
            uri.push('=');
            uri.push_str(&urlencoding::encode(value));
        }
        uri
    }

    pub(crate) fn into_hyper(
        self,
        api_version: &str,
    ) -> Result<hyper::Request<Full<Bytes>>, EngineError> {
        let uri = self.uri(api_version);
        let builder = hyper::Request::builder()
            .method(self.method)
            .uri(uri)
            .header(hyper::header::HOST, "localhost");
        let request = match self.body {
            Some(body) => builder
                .header(hyper::header::CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(body.to_string()))),
            None => builder.body(Full::new(Bytes::new())),
        };
        request.map_err(|e| EngineError::InvalidRequest(e.to_string()))
    }
}
