//! Per-request context: the one object handlers see.
//!
//! # Responsibilities
//! - Carry the request snapshot (method, path, query, headers, body)
//! - Drive the handler chain via the cursor (`next`) and the abort flag
//! - Funnel all response output through the request's response lane
//! - Reset completely between requests so pooling never leaks state
//!
//! # Data Flow
//! ```text
//! dispatcher: acquire → reset(parts, sink) → install chain → next()
//!     handler k: reads ctx, writes ctx, may call next() to wrap
//!     router (last element): match → set_params → splice matched chain
//! dispatcher: seal → release to pool
//! ```
//!
//! # Design Decisions
//! - The chain bound is re-read every step, so the router can splice the
//!   matched handlers onto the live chain and the same cursor discipline
//!   covers global middleware, group middleware and the terminal handler
//! - Write methods take `&self` and go through the lane mutex, so a handler
//!   can share `&Context` with scoped sub-tasks for fan-out
//! - Typed getters return `Result`/`Option` instead of zero values; the
//!   handler decides what a miss means

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use std::{io, str::FromStr};

use bytes::Bytes;
use http::header::HeaderMap;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::context::binding::{self, BindError};
use crate::context::cookie::{self, Cookie};
use crate::context::params::Params;
use crate::context::response::{NullSink, ResponseHandle, ResponseLane, ResponseSink};
use crate::context::store::Store;
use crate::handler::{Handler, HandlerChain};

/// The host-independent pieces of one request, ready for `Context::reset`.
pub struct RequestParts {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub remote_addr: Option<SocketAddr>,
    pub deadline: Option<Instant>,
    pub cancelled: Arc<AtomicBool>,
}

impl RequestParts {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: String::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }
}

/// Mutable per-request state threaded through the handler chain.
pub struct Context {
    method: Method,
    path: String,
    raw_query: String,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    request_id: String,
    start: Instant,

    params: Params,
    query: Vec<(String, String)>,
    form: OnceLock<Vec<(String, String)>>,

    lane: Arc<ResponseLane>,
    store: Store,
    errors: Vec<Box<dyn std::error::Error + Send + Sync>>,

    chain: Vec<Arc<dyn Handler>>,
    cursor: isize,
    aborted: bool,

    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// A blank context, not yet bound to any request. The pool calls this;
    /// everything meaningful happens in [`Context::reset`].
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            path: String::new(),
            raw_query: String::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            request_id: String::new(),
            start: Instant::now(),
            params: Params::new(),
            query: Vec::new(),
            form: OnceLock::new(),
            lane: Arc::new(ResponseLane::new(Box::new(NullSink))),
            store: Store::new(),
            errors: Vec::new(),
            chain: Vec::new(),
            cursor: -1,
            aborted: false,
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Bind this context to a fresh request, erasing every trace of the
    /// previous one.
    pub fn reset(&mut self, parts: RequestParts, sink: Box<dyn ResponseSink>) {
        self.method = parts.method;
        self.path = parts.path;
        self.query = binding::parse_pairs(parts.query.as_bytes());
        self.raw_query = parts.query;
        self.headers = parts.headers;
        self.body = parts.body;
        self.remote_addr = parts.remote_addr;
        self.request_id = Uuid::new_v4().to_string();
        self.start = Instant::now();

        self.params.clear();
        self.form = OnceLock::new();

        self.lane = Arc::new(ResponseLane::new(sink));
        self.store.clear();
        self.errors.clear();

        self.chain.clear();
        self.cursor = -1;
        self.aborted = false;

        self.cancelled = parts.cancelled;
        self.deadline = parts.deadline;
    }

    // ---- chain control ----

    /// Advance through the remaining handlers. Re-entrant: a middleware
    /// calls this once to run everything after itself, then finishes its
    /// own post-logic when the inner handlers return.
    pub fn next(&mut self) {
        self.cursor += 1;
        while (self.cursor as usize) < self.chain.len() {
            if self.aborted {
                return;
            }
            let handler = Arc::clone(&self.chain[self.cursor as usize]);
            handler.call(self);
            self.cursor += 1;
        }
    }

    /// Stop every handler that has not started yet. One-way for the rest of
    /// the request; handlers currently unwinding still run their post-logic.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub(crate) fn install_chain(&mut self, chain: &HandlerChain) {
        self.chain.clear();
        self.chain.reserve(chain.len() + 4);
        self.chain.extend(chain.iter().cloned());
    }

    /// Append matched handlers behind the router's own chain position. The
    /// router sits at the chain tail, so appending runs them next.
    pub fn splice_chain(&mut self, chain: &HandlerChain) {
        self.chain.extend(chain.iter().cloned());
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub(crate) fn seal_response(&self) {
        self.lane.seal();
    }

    pub(crate) fn response_sealed(&self) -> bool {
        self.lane.sealed()
    }

    // ---- request read surface ----

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> &str {
        &self.raw_query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The media type of the request body, without parameters.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header("user-agent")
    }

    pub fn is_json(&self) -> bool {
        self.content_type()
            .map(|ct| ct.eq_ignore_ascii_case("application/json"))
            .unwrap_or(false)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Best-effort client address: X-Forwarded-For, then X-Real-IP, then
    /// the peer address. IPv6 loopback folds to its IPv4 spelling.
    pub fn client_ip(&self) -> String {
        if let Some(forwarded) = self.header("x-forwarded-for") {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return normalize_ip(first);
                }
            }
        }
        if let Some(real) = self.header("x-real-ip") {
            let real = real.trim();
            if !real.is_empty() {
                return normalize_ip(real);
            }
        }
        self.remote_addr
            .map(|addr| normalize_ip(&addr.ip().to_string()))
            .unwrap_or_default()
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn set_request_id(&mut self, id: impl Into<String>) {
        self.request_id = id.into();
    }

    /// Time since this context was bound to the current request.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    // ---- params ----

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn param_as<T: FromStr>(&self, name: &str) -> Result<T, BindError> {
        self.params.get_as(name)
    }

    // ---- query ----

    /// First value for `key`, percent-decoded.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn query_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.query(key).unwrap_or(default)
    }

    /// Every value registered under `key`, in order.
    pub fn query_all(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn query_as<T: FromStr>(&self, key: &str) -> Result<T, BindError> {
        let value = self.query(key).ok_or_else(|| BindError::MissingQuery {
            name: key.to_string(),
        })?;
        value.parse().map_err(|_| BindError::InvalidQuery {
            name: key.to_string(),
            value: value.to_string(),
            target: std::any::type_name::<T>(),
        })
    }

    /// Deserialize the whole query string into `T`.
    pub fn bind_query<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        Ok(serde_urlencoded::from_str(&self.raw_query)?)
    }

    // ---- form & body binding ----

    fn form_pairs(&self) -> &[(String, String)] {
        self.form.get_or_init(|| {
            let urlencoded = self
                .content_type()
                .map(|ct| ct.eq_ignore_ascii_case("application/x-www-form-urlencoded"))
                .unwrap_or(false);
            if urlencoded {
                binding::parse_pairs(&self.body)
            } else {
                Vec::new()
            }
        })
    }

    /// First form field value for `key`. Only urlencoded bodies have form
    /// fields; anything else yields `None`.
    pub fn form(&self, key: &str) -> Option<&str> {
        self.form_pairs()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn bind_form<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        let urlencoded = self
            .content_type()
            .map(|ct| ct.eq_ignore_ascii_case("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        if !urlencoded {
            return Err(BindError::ContentType {
                expected: "application/x-www-form-urlencoded",
                actual: self.content_type().unwrap_or("").to_string(),
            });
        }
        Ok(serde_urlencoded::from_bytes(&self.body)?)
    }

    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn bind_xml<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        Ok(quick_xml::de::from_reader(self.body.as_ref())?)
    }

    // ---- cookies ----

    /// Decoded cookie value, if the request carried it.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.header("cookie")?;
        cookie::parse_header(header)
            .find(|(n, _)| *n == name)
            .map(|(_, v)| cookie::decode_value(v))
    }

    pub fn cookies(&self) -> Vec<(String, String)> {
        self.header("cookie")
            .map(|header| {
                cookie::parse_header(header)
                    .map(|(n, v)| (n.to_string(), cookie::decode_value(v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookie(name).is_some()
    }

    pub fn set_cookie(&self, cookie: &Cookie) {
        self.lane.append_header("set-cookie", &cookie.to_string());
    }

    // ---- store & errors ----

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Record an application error against this request without deciding
    /// its response.
    pub fn push_error(&mut self, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) {
        self.errors.push(err.into());
    }

    pub fn errors(&self) -> &[Box<dyn std::error::Error + Send + Sync>] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    // ---- cancellation ----

    /// True once the host gave up on this request (peer gone, timeout).
    /// Cooperative: handlers check it, nothing force-terminates them.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    // ---- response write surface ----

    pub fn set_status(&self, status: StatusCode) {
        self.lane.set_status(status);
    }

    pub fn status(&self) -> StatusCode {
        self.lane.status()
    }

    pub fn set_header(&self, name: &str, value: &str) {
        self.lane.set_header(name, value);
    }

    pub fn append_header(&self, name: &str, value: &str) {
        self.lane.append_header(name, value);
    }

    /// True once the status line and headers hit the sink.
    pub fn response_flushed(&self) -> bool {
        self.lane.flushed()
    }

    pub fn response_bytes(&self) -> u64 {
        self.lane.bytes_written()
    }

    /// A cloneable handle for handler-internal fan-out. After dispatch
    /// completes, writes through leftover handles are dropped and warned.
    pub fn response_handle(&self) -> ResponseHandle {
        ResponseHandle::new(Arc::clone(&self.lane))
    }

    /// Raw body write; flushes the buffered head on first use.
    pub fn write(&self, chunk: &[u8]) -> io::Result<usize> {
        self.lane.write(chunk)
    }

    pub fn write_str(&self, text: &str) -> io::Result<usize> {
        self.lane.write(text.as_bytes())
    }

    pub fn send_string(&self, status: StatusCode, text: &str) {
        self.lane.set_header("content-type", "text/plain");
        self.lane.set_status(status);
        if let Err(err) = self.lane.write(text.as_bytes()) {
            error!(error = %err, "Text response write failed");
        }
    }

    pub fn send_html(&self, status: StatusCode, html: &str) {
        self.lane.set_header("content-type", "text/html");
        self.lane.set_status(status);
        if let Err(err) = self.lane.write(html.as_bytes()) {
            error!(error = %err, "HTML response write failed");
        }
    }

    pub fn send_json<T: Serialize>(&self, status: StatusCode, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.lane.set_header("content-type", "application/json");
                self.lane.set_status(status);
                if let Err(err) = self.lane.write(&bytes) {
                    error!(error = %err, "JSON response write failed");
                }
            }
            Err(err) => {
                error!(error = %err, "JSON response encoding failed");
                self.send_string(StatusCode::INTERNAL_SERVER_ERROR, "response encoding failed");
            }
        }
    }

    pub fn send_xml<T: Serialize>(&self, status: StatusCode, value: &T) {
        match quick_xml::se::to_string(value) {
            Ok(xml) => {
                self.lane.set_header("content-type", "application/xml");
                self.lane.set_status(status);
                if let Err(err) = self.lane.write(xml.as_bytes()) {
                    error!(error = %err, "XML response write failed");
                }
            }
            Err(err) => {
                error!(error = %err, "XML response encoding failed");
                self.send_string(StatusCode::INTERNAL_SERVER_ERROR, "response encoding failed");
            }
        }
    }

    pub fn send_data(&self, status: StatusCode, content_type: &str, data: &[u8]) {
        self.lane.set_header("content-type", content_type);
        self.lane.set_status(status);
        if let Err(err) = self.lane.write(data) {
            error!(error = %err, "Raw response write failed");
        }
    }

    /// Serve a file from disk, content type guessed from the extension.
    /// Missing files answer the standard JSON 404 envelope.
    pub fn send_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(data) => {
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                self.send_data(StatusCode::OK, mime.as_ref(), &data);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.not_found("");
            }
            Err(err) => {
                error!(error = %err, path = %path.display(), "File response read failed");
                self.internal_server_error("file read failed");
            }
        }
    }

    pub fn redirect(&self, status: StatusCode, location: &str) {
        self.lane.set_header("location", location);
        self.send_string(status, &format!("Redirecting to {location}"));
    }

    /// `{"success":true,"data":…}` with a 200.
    pub fn send_success<T: Serialize>(&self, data: &T) {
        let payload = serde_json::json!({ "success": true, "data": data });
        self.send_json(StatusCode::OK, &payload);
    }

    /// `{"success":false,"message":…,"status":…}` without aborting.
    pub fn send_error(&self, status: StatusCode, message: &str) {
        let payload = serde_json::json!({
            "success": false,
            "message": message,
            "status": status.as_u16(),
        });
        self.send_json(status, &payload);
    }

    // ---- failure helpers: respond and abort in one step ----

    /// Emit `{"error":true,"message":…,"status":…}` and abort the chain.
    pub fn fail(&mut self, status: StatusCode, message: &str) {
        let payload = serde_json::json!({
            "error": true,
            "message": message,
            "status": status.as_u16(),
        });
        self.send_json(status, &payload);
        self.abort();
    }

    /// Record the error against the request, then fail with its message.
    pub fn fail_with_error(
        &mut self,
        status: StatusCode,
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) {
        let err = err.into();
        let message = err.to_string();
        self.errors.push(err);
        self.fail(status, &message);
    }

    pub fn not_found(&mut self, message: &str) {
        let message = default_message(message, "resource not found");
        self.fail(StatusCode::NOT_FOUND, message);
    }

    pub fn bad_request(&mut self, message: &str) {
        let message = default_message(message, "bad request");
        self.fail(StatusCode::BAD_REQUEST, message);
    }

    pub fn unauthorized(&mut self, message: &str) {
        let message = default_message(message, "unauthorized");
        self.fail(StatusCode::UNAUTHORIZED, message);
    }

    pub fn forbidden(&mut self, message: &str) {
        let message = default_message(message, "forbidden");
        self.fail(StatusCode::FORBIDDEN, message);
    }

    pub fn internal_server_error(&mut self, message: &str) {
        let message = default_message(message, "internal server error");
        self.fail(StatusCode::INTERNAL_SERVER_ERROR, message);
    }

    #[cfg(test)]
    pub(crate) fn for_testing() -> Self {
        use crate::context::response::BufferSink;
        let mut ctx = Self::new();
        ctx.reset(
            RequestParts::new(Method::GET, "/test"),
            Box::new(BufferSink::new()),
        );
        ctx
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

fn default_message<'a>(message: &'a str, fallback: &'a str) -> &'a str {
    if message.is_empty() {
        fallback
    } else {
        message
    }
}

fn normalize_ip(ip: &str) -> String {
    if ip == "::1" {
        "127.0.0.1".to_string()
    } else {
        ip.to_string()
    }
}
