//! HTTP response building module
//!
//! Turns handler results and dispatch outcomes into hyper responses.

use crate::router::HandlerResponse;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde_json::Value;

/// Body sent for every request that did not reach a working handler
pub const NOT_FOUND_BODY: &str = r#"{"error":"Route not found"}"#;

/// Build 404 Not Found response
pub fn build_not_found_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from_static(NOT_FOUND_BODY.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from_static(NOT_FOUND_BODY.as_bytes())))
        })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::PAYLOAD_TOO_LARGE)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("413 Payload Too Large")))
        .unwrap_or_else(|e| {
            log_build_error("413", &e);
            Response::new(Full::new(Bytes::from("413 Payload Too Large")))
        })
}

/// Send a response exactly as the handler wrote it
pub fn build_handler_response(written: HandlerResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(written.status);
    if let Some(content_type) = &written.content_type {
        builder = builder.header("Content-Type", content_type);
    }
    for (name, value) in &written.headers {
        builder = builder.header(name, value);
    }

    builder
        .body(Full::new(Bytes::from(written.body)))
        .unwrap_or_else(|e| {
            log_build_error(&written.status.to_string(), &e);
            internal_error()
        })
}

/// Forward a handler's return value as the response body
///
/// Strings are sent with `default_content_type`, any other value as JSON.
/// A handler that returned nothing gets `204 No Content`.
pub fn build_returned_response(
    returned: Option<Value>,
    default_content_type: &str,
) -> Response<Full<Bytes>> {
    let (status, content_type, body) = match returned {
        None => (StatusCode::NO_CONTENT, None, Bytes::new()),
        Some(Value::String(text)) => (StatusCode::OK, Some(default_content_type), Bytes::from(text)),
        Some(value) => (
            StatusCode::OK,
            Some("application/json"),
            Bytes::from(value.to_string()),
        ),
    };

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header("Content-Type", content_type);
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        internal_error()
    })
}

fn internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = build_not_found_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["Content-Type"], "application/json");
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body, json!({ "error": "Route not found" }));
    }

    #[tokio::test]
    async fn test_returned_values() {
        let response = build_returned_response(Some(json!("hello")), "text/html; charset=utf-8");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["Content-Type"], "text/html; charset=utf-8");
        assert_eq!(body_string(response).await, "hello");

        let response = build_returned_response(Some(json!({ "id": 1 })), "text/html");
        assert_eq!(response.headers()["Content-Type"], "application/json");
        assert_eq!(body_string(response).await, r#"{"id":1}"#);

        let response = build_returned_response(None, "text/html");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get("Content-Type").is_none());
    }

    #[tokio::test]
    async fn test_handler_written_response() {
        let response = build_handler_response(HandlerResponse {
            status: 201,
            headers: vec![("Location".to_string(), "/users/7".to_string())],
            content_type: Some("application/json".to_string()),
            body: b"{}".to_vec(),
        });
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["Location"], "/users/7");
        assert_eq!(body_string(response).await, "{}");
    }
}
