//! Response assembly: standard headers, cookies, redirects, error pages.
//!
//! # Responsibilities
//! - Build full responses with Cache-Control, Content-Type and
//!   Content-Length set the same way everywhere
//! - Refresh the session cookie (and mark it uncacheable) on dynamic pages
//! - Produce the 302/304/401 special forms
//!
//! # Design Decisions
//! - `Cache-Control: private` is the default unless the cache negotiator
//!   or the static server decided otherwise
//! - text/* content types get a utf-8 charset unless one is present

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

use crate::routing::command::CommandResult;
use crate::session::Session;

/// Session cookies live for a day.
pub const SESSION_COOKIE_MAX_AGE: u64 = 24 * 3600;

/// A rendered response body with its MIME type.
pub struct RenderedPage {
    pub mimetype: String,
    pub body: Vec<u8>,
}

/// The rendering collaborator: turns a command result into a page.
pub trait Renderer: Send + Sync {
    fn render(&self, session: &Session, result: &CommandResult) -> RenderedPage;

    /// Page for requests rejected before routing (bad body, disabled
    /// endpoints).
    fn render_error(&self, detail: &str) -> RenderedPage {
        RenderedPage {
            mimetype: "text/html".to_string(),
            body: format!("<h1>Request failed</h1>\n<p>{}</p>\n", detail).into_bytes(),
        }
    }
}

/// Minimal renderer emitting the command result as JSON. The embedding
/// application normally supplies a template-driven implementation.
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, _session: &Session, result: &CommandResult) -> RenderedPage {
        RenderedPage {
            mimetype: "application/json".to_string(),
            body: serde_json::to_vec_pretty(&result.value).unwrap_or_default(),
        }
    }
}

/// The session cookie to (re)issue with a response.
#[derive(Clone)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

/// Append a utf-8 charset to bare text/* MIME types.
pub fn with_charset(mimetype: &str) -> String {
    if mimetype.starts_with("text/") && !mimetype.contains(';') {
        format!("{}; charset=utf-8", mimetype)
    } else {
        mimetype.to_string()
    }
}

/// Build a complete response with the standard header set.
pub fn full_response(
    status: StatusCode,
    mimetype: &str,
    cachectrl: Option<&str>,
    extra_headers: &[(String, String)],
    cookie: Option<&SessionCookie>,
    body: Vec<u8>,
) -> Response {
    let content_length = body.len();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(cachectrl.unwrap_or("private")) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Ok(value) = HeaderValue::from_str(&with_charset(mimetype)) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));

    for (name, value) in extra_headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }

    if status == StatusCode::UNAUTHORIZED {
        let hours = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
            / 3600;
        if let Ok(value) = HeaderValue::from_str(&format!("Basic realm=MP{}", hours)) {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }
    }

    if let Some(cookie) = cookie {
        let attrs = format!(
            "{}={}; Path=/; Max-Age={}",
            cookie.name, cookie.value, SESSION_COOKIE_MAX_AGE
        );
        if let Ok(value) = HeaderValue::from_str(&attrs) {
            headers.append(header::SET_COOKIE, value);
            headers.append(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache=\"set-cookie\""),
            );
        }
    }

    response
}

/// 302 with a clickable fallback body.
pub fn redirect(location: &str, cookie: Option<&SessionCookie>) -> Response {
    let body = format!(
        "<h1><a href=\"{0}\">Please look here!</a></h1>\n",
        location
    );
    let mut response = full_response(
        StatusCode::FOUND,
        "text/html",
        None,
        &[],
        cookie,
        body.into_bytes(),
    );
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// 304 with an empty body; the conditional request matched.
pub fn not_modified(cookie: Option<&SessionCookie>) -> Response {
    full_response(
        StatusCode::NOT_MODIFIED,
        "text/html",
        None,
        &[],
        cookie,
        Vec::new(),
    )
}

/// Plain-text response for error paths.
pub fn plain_text(status: StatusCode, message: &str, cookie: Option<&SessionCookie>) -> Response {
    full_response(
        status,
        "text/plain",
        None,
        &[],
        cookie,
        message.as_bytes().to_vec(),
    )
}

/// A command asked for no output at all; close without a page.
pub fn suppressed() -> Response {
    let mut response = Response::new(Body::empty());
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}
