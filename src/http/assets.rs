//! Static asset serving with traversal protection.
//!
//! # Responsibilities
//! - Resolve logical names against the active theme directory
//! - Reject parent-directory traversal before touching the filesystem
//! - Classify IO failures into 404/403/500
//! - Guess MIME types (built-in table first, sniffing fallback)
//!
//! # Design Decisions
//! - Static content is assumed effectively immutable for the life of the
//!   instance: long fixed max-age, no ETag
//! - The file handle is scoped so it is released on every exit path

use std::path::Path;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use tokio::io::AsyncReadExt;

use crate::http::response::with_charset;

/// Static assets rarely change within a running instance.
const STATIC_CACHECTRL: &str = "must-revalidate, max-age=36000";

/// Extensions we always recognize, regardless of what the sniffing
/// fallback thinks.
fn mime_override(ext: &str) -> Option<&'static str> {
    match ext {
        "c" | "cfg" | "conf" | "cpp" | "csv" | "h" | "hpp" | "log" | "md" | "me" | "py"
        | "rb" | "rc" | "txt" => Some("text/plain"),
        "pfa" | "pfb" | "gsf" | "pcf" => Some("application/x-font"),
        "css" => Some("text/css"),
        "eot" => Some("application/vnd.ms-fontobject"),
        "gif" => Some("image/gif"),
        "html" | "htm" => Some("text/html"),
        "ico" => Some("image/x-icon"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "js" => Some("text/javascript"),
        "json" => Some("application/json"),
        "otf" => Some("font/otf"),
        "png" => Some("image/png"),
        "rss" => Some("application/rss+xml"),
        "tif" | "tiff" => Some("image/tiff"),
        "ttf" => Some("font/ttf"),
        "svg" | "svgz" => Some("image/svg+xml"),
        "woff" => Some("application/font-woff"),
        _ => None,
    }
}

/// MIME type for a file path: override table, then sniffing, then opaque
/// binary.
pub fn guess_mimetype(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if let Some(mimetype) = mime_override(&ext) {
        return mimetype.to_string();
    }
    mime_guess::from_path(path)
        .first_raw()
        .map(str::to_string)
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Serve a theme file by logical name.
///
/// `suppress_body` (HEAD requests) skips reading the content but still
/// reports the real size.
pub async fn serve(theme_root: &Path, logical: &str, suppress_body: bool) -> Response {
    if logical.contains("..") {
        tracing::warn!(path = %logical, "Static path traversal rejected");
        return status_only(StatusCode::FORBIDDEN);
    }

    let fpath = theme_root.join(logical.trim_start_matches('/'));
    let mut file = match tokio::fs::File::open(&fpath).await {
        Ok(file) => file,
        Err(e) => {
            let status = match e.kind() {
                std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
                std::io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::debug!(path = %fpath.display(), error = %e, "Static asset open failed");
            return status_only(status);
        }
    };

    let size = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::debug!(path = %fpath.display(), error = %e, "Static asset stat failed");
            return status_only(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut content = Vec::new();
    if !suppress_body {
        if let Err(e) = file.read_to_end(&mut content).await {
            tracing::debug!(path = %fpath.display(), error = %e, "Static asset read failed");
            return status_only(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
    drop(file);

    let mimetype = guess_mimetype(&fpath);
    let mut response = Response::new(Body::from(content));
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(STATIC_CACHECTRL),
    );
    if let Ok(value) = HeaderValue::from_str(&with_charset(&mimetype)) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    response
}

fn status_only(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(STATIC_CACHECTRL),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_table_wins() {
        assert_eq!(guess_mimetype(Path::new("app.py")), "text/plain");
        assert_eq!(guess_mimetype(Path::new("style.CSS")), "text/css");
        assert_eq!(guess_mimetype(Path::new("font.woff")), "application/font-woff");
        assert_eq!(guess_mimetype(Path::new("favicon.ico")), "image/x-icon");
    }

    #[test]
    fn unknown_extension_is_opaque_binary() {
        assert_eq!(
            guess_mimetype(Path::new("blob.zzqq")),
            "application/octet-stream"
        );
        assert_eq!(
            guess_mimetype(Path::new("no-extension")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn traversal_never_reaches_the_filesystem() {
        // A root that does not exist: any filesystem access would 404/500,
        // but traversal must be refused with 403 first.
        let response = serve(Path::new("/nonexistent-theme"), "../etc/passwd", false).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = serve(Path::new("/nonexistent-theme"), "a/../../b", false).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = serve(dir.path(), "missing.css", false).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn file_is_served_with_long_ttl() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("style.css"), b"body {}").unwrap();

        let response = serve(dir.path(), "style.css", false).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            STATIC_CACHECTRL
        );
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/css; charset=utf-8"
        );
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "7");
        assert!(response.headers().get(header::ETAG).is_none());
    }

    #[tokio::test]
    async fn suppressed_body_keeps_the_real_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), b"{\"k\":1}").unwrap();

        let response = serve(dir.path(), "data.json", true).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "7");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }
}
