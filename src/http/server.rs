//! Bundled HTTP server.
//!
//! # Responsibilities
//! - Accept connections and speak HTTP/1.1 and HTTP/2 via hyper
//! - Collect each request body under the configured cap
//! - Hand the request to the dispatcher on the blocking pool
//! - Convert the buffered response back into a hyper response
//! - Honor the shutdown signal and drain in-flight connections
//!
//! # Data Flow
//! ```text
//! TcpListener.accept
//!     → hyper (auto HTTP/1.1 / HTTP/2)
//!     → handle(): collect body (Limited) → RequestParts + BufferSink
//!     → spawn_blocking: dispatcher.dispatch
//!     → BufferedResponse → hyper Response
//! ```
//!
//! # Design Decisions
//! - Dispatch is synchronous by design, so it runs on the blocking pool
//!   and the connection task only waits on it
//! - Client disconnects and timeouts flip the context's cancellation flag;
//!   the dispatch itself is never force-killed
//! - The response is buffered whole; handlers that want streaming would
//!   need their own sink

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::context::{BufferSink, BufferedResponse, RequestParts};
use crate::engine::{App, Dispatcher};
use crate::lifecycle::ConnectionTracker;

pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    config: Arc<EngineConfig>,
}

impl Server {
    /// Bind the configured address and freeze the app for serving.
    pub async fn bind(app: App) -> std::io::Result<Self> {
        let config = Arc::new(app.config().clone());
        let listener = TcpListener::bind(&config.server.bind_address).await?;
        let local_addr = listener.local_addr()?;
        let route_count = app.route_count();
        let dispatcher = Arc::new(app.into_dispatcher());

        info!(
            address = %local_addr,
            routes = route_count,
            "HTTP server bound"
        );
        Ok(Self {
            listener,
            local_addr,
            dispatcher,
            config,
        })
    }

    /// The address actually bound, useful when the config asked for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept and serve until `shutdown` fires, then drain.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            warn!(error = %err, "Accept failed");
                            continue;
                        }
                    };
                    let dispatcher = Arc::clone(&self.dispatcher);
                    let config = Arc::clone(&self.config);
                    let guard = tracker.guard();
                    tokio::spawn(async move {
                        let _guard = guard;
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            handle(Arc::clone(&dispatcher), Arc::clone(&config), peer, req)
                        });
                        if let Err(err) = auto::Builder::new(TokioExecutor::new())
                            .serve_connection(io, service)
                            .await
                        {
                            debug!(peer = %peer, error = %err, "Connection closed with error");
                        }
                    });
                }
                _ = shutdown.recv() => {
                    info!("Stopping accept loop");
                    break;
                }
            }
        }

        drop(self.listener);
        tracker
            .drain(Duration::from_secs(self.config.server.shutdown_grace_secs))
            .await;
        info!("HTTP server stopped");
        Ok(())
    }
}

/// Serve one request: buffer it, dispatch it, buffer the answer back out.
async fn handle(
    dispatcher: Arc<Dispatcher>,
    config: Arc<EngineConfig>,
    peer: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, config.server.max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            let response = if err.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                warn!(
                    peer = %peer,
                    limit = config.server.max_body_bytes,
                    "Request body over limit"
                );
                plain_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
            } else {
                warn!(peer = %peer, error = %err, "Failed to read request body");
                plain_response(StatusCode::BAD_REQUEST, "failed to read request body")
            };
            return Ok(response);
        }
    };

    let timeout = Duration::from_secs(config.server.request_timeout_secs);
    let cancelled = Arc::new(AtomicBool::new(false));
    // Armed until dispatch completes: dropping this future (peer gone) or
    // timing out flips the flag handlers observe via is_cancelled().
    let guard = CancelGuard::new(Arc::clone(&cancelled));

    let request_parts = RequestParts {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().unwrap_or("").to_string(),
        headers: parts.headers,
        body,
        remote_addr: Some(peer),
        deadline: Some(Instant::now() + timeout),
        cancelled,
    };

    let sink = BufferSink::new();
    let task_sink = sink.clone();
    let dispatched =
        task::spawn_blocking(move || dispatcher.dispatch(request_parts, Box::new(task_sink)));

    match tokio::time::timeout(timeout, dispatched).await {
        Ok(Ok(())) => {
            guard.disarm();
            Ok(into_http_response(sink.take_parts()))
        }
        Ok(Err(err)) => {
            guard.disarm();
            error!(peer = %peer, error = %err, "Dispatch task failed");
            Ok(plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            ))
        }
        Err(_) => {
            // guard stays armed and drops here, flagging the still-running
            // dispatch as cancelled.
            warn!(
                peer = %peer,
                timeout_secs = config.server.request_timeout_secs,
                "Request timed out"
            );
            Ok(plain_response(
                StatusCode::GATEWAY_TIMEOUT,
                "request timed out",
            ))
        }
    }
}

fn into_http_response(parts: BufferedResponse) -> Response<Full<Bytes>> {
    let status = parts.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Full::new(Bytes::from(parts.body)));
    *response.status_mut() = status;
    *response.headers_mut() = parts.headers;
    response
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain"),
    );
    response
}

/// Sets the cancellation flag on drop unless dispatch finished first.
struct CancelGuard {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl CancelGuard {
    fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::Relaxed);
        }
    }
}
