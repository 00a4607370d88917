//! Request entry point
//!
//! Checks the request size, hands method and path to the dispatcher and
//! turns its outcome into a response. Every dispatch error becomes the same
//! 404; only the logs tell a missing route from a broken handler.

use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::router::{Dispatched, Dispatcher, HandlerOutput, RouteFs, RouteRequest};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, REFERER, SERVER, USER_AGENT};
use hyper::{Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let route_req = RouteRequest::new(req.method().as_str(), req.uri().path());

    let (mut response, route_file) =
        if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
            (resp, None)
        } else {
            respond(
                &state.dispatcher,
                &route_req,
                &state.config.http.default_content_type,
            )
            .await
        };

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if state.config.logging.access_log {
        let mut entry =
            AccessLogEntry::new(peer_addr.ip().to_string(), route_req.method, route_req.url_path);
        entry.http_version = version_label(req.version()).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default();
        entry.referer = header_string(&req, REFERER);
        entry.user_agent = header_string(&req, USER_AGENT);
        entry.route_file = route_file.map(|p| p.display().to_string());
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Dispatch a request and map the outcome to a response
///
/// Returns the handler file that produced the response, if any.
pub async fn respond<F: RouteFs>(
    dispatcher: &Dispatcher<F>,
    req: &RouteRequest,
    default_content_type: &str,
) -> (Response<Full<Bytes>>, Option<PathBuf>) {
    match dispatcher.dispatch(req).await {
        Ok(Dispatched { route, output }) => {
            let response = match output {
                HandlerOutput::Responded(written) => http::build_handler_response(written),
                HandlerOutput::Returned(value) => {
                    http::build_returned_response(value, default_content_type)
                }
            };
            (response, Some(route.file_path))
        }
        Err(err) => {
            if err.is_failure() {
                logger::log_dispatch_failure(&req.method, &req.url_path, &err);
            } else {
                logger::log_debug(&format!("[Route] {} {}: {err}", req.method, req.url_path));
            }
            (http::build_not_found_response(), None)
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(
    req: &Request<B>,
    max_body_size: u64,
) -> Option<Response<Full<Bytes>>> {
    let size_str = req.headers().get("content-length")?.to_str().ok()?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        Ok(_) => None,
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
    }
}

fn header_string<B>(req: &Request<B>, name: hyper::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::fs::MemoryFs;
    use crate::router::ReloadPolicy;
    use http_body_util::BodyExt;
    use hyper::StatusCode;
    use serde_json::{json, Value};

    const HTML: &str = "text/html; charset=utf-8";

    fn dispatcher(files: &[(&str, &str)]) -> Dispatcher<MemoryFs> {
        Dispatcher::with_parts(MemoryFs::with_files(files), "api", "toml", ReloadPolicy::Always)
    }

    async fn send(
        d: &Dispatcher<MemoryFs>,
        method: &str,
        path: &str,
    ) -> (StatusCode, Option<String>, String) {
        let (response, _) = respond(d, &RouteRequest::new(method, path), HTML).await;
        let status = response.status();
        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn assert_not_found(result: &(StatusCode, Option<String>, String)) {
        assert_eq!(result.0, StatusCode::NOT_FOUND);
        assert_eq!(result.1.as_deref(), Some("application/json"));
        let body: Value = serde_json::from_str(&result.2).unwrap();
        assert_eq!(body, json!({ "error": "Route not found" }));
    }

    #[tokio::test]
    async fn test_root_handler_return_value() {
        let d = dispatcher(&[("api/index.toml", "[handler]\nreturns = \"<h1>home</h1>\"\n")]);
        let (status, content_type, body) = send(&d, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(HTML));
        assert_eq!(body, "<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_index_method_export() {
        let d = dispatcher(&[(
            "api/users/index.toml",
            "[GET]\nreturns = [{ name = \"ada\" }]\n",
        )]);
        let (status, content_type, body) = send(&d, "GET", "/users").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, r#"[{"name":"ada"}]"#);
    }

    #[tokio::test]
    async fn test_dynamic_segment_param() {
        let d = dispatcher(&[(
            "api/users/[id].toml",
            "[GET]\njson = { id = \"{{params.id}}\" }\n",
        )]);
        let (status, _, body) = send(&d, "GET", "/users/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"id":"42"}"#);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let d = dispatcher(&[("api/index.toml", "[handler]\n")]);
        assert_not_found(&send(&d, "GET", "/unknown/path").await);
    }

    #[tokio::test]
    async fn test_failing_handler_is_not_found() {
        let d = dispatcher(&[
            ("api/throws.toml", "[GET]\nbody_file = \"missing.json\"\n"),
            ("api/broken.toml", "[GET]\nstatus = \"soon\"\n"),
            ("api/post_only.toml", "[POST]\nstatus = 201\n"),
        ]);
        assert_not_found(&send(&d, "GET", "/throws").await);
        assert_not_found(&send(&d, "GET", "/broken").await);
        assert_not_found(&send(&d, "GET", "/post_only").await);

        let (status, content_type, body) = send(&d, "POST", "/post_only").await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(content_type.is_none());
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_handler_without_return_value() {
        let d = dispatcher(&[("api/ping.toml", "[default]\n")]);
        let (status, _, body) = send(&d, "DELETE", "/ping").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_respond_reports_route_file() {
        let d = dispatcher(&[("api/a.toml", "[GET]\nreturns = 1\n")]);
        let (_, file) = respond(&d, &RouteRequest::new("GET", "/a"), HTML).await;
        assert_eq!(file, Some(PathBuf::from("api/a.toml")));

        let (_, file) = respond(&d, &RouteRequest::new("GET", "/b"), HTML).await;
        assert_eq!(file, None);
    }

    #[test]
    fn test_check_body_size() {
        let request = |length: &str| {
            Request::builder()
                .header("content-length", length)
                .body(())
                .unwrap()
        };

        let response = check_body_size(&request("101"), 100).unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        assert!(check_body_size(&request("100"), 100).is_none());
        assert!(check_body_size(&request("lots"), 100).is_none());
        assert!(check_body_size(&Request::new(()), 100).is_none());
    }

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(Version::HTTP_11), "1.1");
        assert_eq!(version_label(Version::HTTP_2), "2");
    }
}
