//! Request-side plumbing: context extraction, request ids, body parsing.
//!
//! # Responsibilities
//! - Generate a unique request ID for tracing
//! - Decode the path and parse query/body parameters into multimaps
//! - Enforce body size and content-type limits before routing sees anything

use std::collections::HashMap;

use axum::body::{to_bytes, Body};
use axum::extract::{FromRequest, Multipart};
use axum::http::header::AsHeaderName;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request};
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// UUID v4 request ids for the request-id layer.
#[derive(Clone, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Decoded parameter multimap (query string or form body).
pub type ParamMap = HashMap<String, Vec<String>>;

/// Everything the dispatcher and the routing collaborator need from one
/// request. Reconstructed fresh per connection and never retained.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Percent-decoded path.
    pub path: String,
    /// Raw query string, preserved for redirects.
    pub query_string: String,
    pub query: ParamMap,
    /// Parsed body parameters for mutating methods; empty otherwise.
    pub post: ParamMap,
    /// Host header as sent (may include a port).
    pub host: String,
    /// Host with the port stripped.
    pub hostname: String,
    /// Forwarded protocol, defaulting to plain http.
    pub protocol: String,
    pub if_none_match: Option<String>,
    pub cookie: Option<String>,
}

impl RequestContext {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let headers = request.headers();
        let raw_path = request.uri().path();
        let path = urlencoding::decode(raw_path)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| raw_path.to_string());
        let query_string = request.uri().query().unwrap_or("").to_string();
        let query = parse_form(query_string.as_bytes());

        let host = header_str(headers, header::HOST)
            .unwrap_or("localhost")
            .to_string();
        let hostname = host
            .rsplit_once(':')
            .map(|(name, _port)| name.to_string())
            .unwrap_or_else(|| host.clone());

        Self {
            method: request.method().clone(),
            path,
            query_string,
            query,
            post: ParamMap::new(),
            host,
            hostname,
            protocol: header_str(headers, "x-forwarded-proto")
                .unwrap_or("http")
                .to_string(),
            if_none_match: header_str(headers, header::IF_NONE_MATCH).map(str::to_string),
            cookie: header_str(headers, header::COOKIE).map(str::to_string),
        }
    }

    /// The URL this server appears at, e.g. `http://localhost:33411`.
    pub fn server_url(&self) -> String {
        format!("{}://{}", self.protocol, self.host)
    }

    /// A copy of this context with a different path, for the
    /// trailing-slash routing retry.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        let mut retry = self.clone();
        retry.path = path.into();
        retry
    }
}

fn header_str<K: AsHeaderName>(headers: &HeaderMap, name: K) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Parse url-encoded bytes into a parameter multimap.
pub fn parse_form(bytes: &[u8]) -> ParamMap {
    let mut params = ParamMap::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

/// Why a request body was rejected before routing.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body too large ({0} bytes)")]
    TooLarge(u64),
    #[error("unknown content type: {0}")]
    UnknownContentType(String),
    #[error("malformed request body: {0}")]
    Malformed(String),
}

const URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Parse the body of a mutating request into a parameter multimap.
///
/// Only url-encoded (size-capped) and multipart bodies are accepted; any
/// other content type fails the request before routing is attempted.
pub async fn parse_post_body(
    request: Request<Body>,
    limit: usize,
) -> Result<ParamMap, BodyError> {
    let media_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(URLENCODED)
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match media_type.as_str() {
        MULTIPART => {
            let mut multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| BodyError::Malformed(e.to_string()))?;
            let mut params = ParamMap::new();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| BodyError::Malformed(e.to_string()))?
            {
                let name = field.name().unwrap_or("").to_string();
                let value = field
                    .text()
                    .await
                    .map_err(|e| BodyError::Malformed(e.to_string()))?;
                params.entry(name).or_default().push(value);
            }
            Ok(params)
        }
        URLENCODED => {
            let declared = request
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(0);
            if declared > limit as u64 {
                return Err(BodyError::TooLarge(declared));
            }
            let bytes = to_bytes(request.into_body(), limit)
                .await
                .map_err(|e| BodyError::Malformed(e.to_string()))?;
            Ok(parse_form(&bytes))
        }
        other => Err(BodyError::UnknownContentType(other.to_string())),
    }
}
