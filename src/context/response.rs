//! The response lane: buffered head, write-once flush, serialized writes.
//!
//! # Responsibilities
//! - Buffer status and headers until the first body byte forces them out
//! - Serialize writes coming from a handler's internal fan-out
//! - Refuse (and warn about) writes arriving after dispatch sealed the lane
//!
//! # Data Flow
//! ```text
//! set_status / set_header → buffered in LaneState
//! first write → sink.write_head(status, headers) → sink.write_body(bytes)
//! later writes → sink.write_body(bytes)
//! seal → head flushed if nothing was written; lane stops accepting writes
//! ```
//!
//! # Design Decisions
//! - One mutex around the whole lane; contention only exists when a handler
//!   fans out, which is the rare path
//! - Status changes after the first flush are dropped (the wire already has
//!   a head); the flushed flag only ever goes true
//! - A panicking handler may poison the mutex mid-write; the lane recovers
//!   the inner state instead of wedging the connection task

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use tracing::{debug, warn};

/// Destination for response bytes. The host adapter supplies one per
/// request; tests swap in failing or counting variants.
pub trait ResponseSink: Send {
    /// Deliver the status line and headers. Called exactly once, before any
    /// body bytes.
    fn write_head(&mut self, status: StatusCode, headers: &HeaderMap) -> io::Result<()>;

    /// Deliver a chunk of body bytes.
    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()>;
}

/// Sink that discards everything; backs contexts that were constructed but
/// never bound to a request.
pub(crate) struct NullSink;

impl ResponseSink for NullSink {
    fn write_head(&mut self, _status: StatusCode, _headers: &HeaderMap) -> io::Result<()> {
        Ok(())
    }

    fn write_body(&mut self, _chunk: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// The response collected in memory.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Cloneable in-memory sink. The host keeps one clone and hands another to
/// the lane; after dispatch it takes the buffered parts back out.
#[derive(Clone, Default)]
pub struct BufferSink {
    inner: Arc<Mutex<BufferedResponse>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the buffered response, leaving the sink empty.
    pub fn take_parts(&self) -> BufferedResponse {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *inner)
    }
}

impl ResponseSink for BufferSink {
    fn write_head(&mut self, status: StatusCode, headers: &HeaderMap) -> io::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.status = Some(status);
        inner.headers = headers.clone();
        Ok(())
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.body.extend_from_slice(chunk);
        Ok(())
    }
}

struct LaneState {
    sink: Box<dyn ResponseSink>,
    status: StatusCode,
    headers: HeaderMap,
    flushed: bool,
    sealed: bool,
    bytes_written: u64,
}

/// Serialized write path for one request's response.
pub struct ResponseLane {
    state: Mutex<LaneState>,
}

impl ResponseLane {
    pub(crate) fn new(sink: Box<dyn ResponseSink>) -> Self {
        Self {
            state: Mutex::new(LaneState {
                sink,
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                flushed: false,
                sealed: false,
                bytes_written: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LaneState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Change the buffered status. A no-op once the head is on the wire.
    pub fn set_status(&self, status: StatusCode) {
        let mut state = self.lock();
        if state.flushed {
            debug!(
                ignored = status.as_u16(),
                sent = state.status.as_u16(),
                "Status change after first write ignored"
            );
            return;
        }
        state.status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.lock().status
    }

    /// Set (replacing) a buffered header. Ignored after the head flushed.
    pub fn set_header(&self, name: &str, value: &str) {
        self.header_entry(name, value, false);
    }

    /// Append a buffered header, keeping existing values (Set-Cookie).
    pub fn append_header(&self, name: &str, value: &str) {
        self.header_entry(name, value, true);
    }

    fn header_entry(&self, name: &str, value: &str, append: bool) {
        let mut state = self.lock();
        if state.flushed {
            debug!(header = name, "Header change after first write ignored");
            return;
        }
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            warn!(header = name, "Invalid response header name dropped");
            return;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            warn!(header = %name, "Invalid response header value dropped");
            return;
        };
        if append {
            state.headers.append(name, value);
        } else {
            state.headers.insert(name, value);
        }
    }

    pub fn header(&self, name: &str) -> Option<String> {
        let state = self.lock();
        state
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Write body bytes, flushing the buffered head first if this is the
    /// initial write. After sealing, the bytes are dropped with a warning.
    pub fn write(&self, chunk: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if state.sealed {
            warn!(
                dropped_bytes = chunk.len(),
                "Write after response completed; dropping"
            );
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "response already completed",
            ));
        }
        if !state.flushed {
            let status = state.status;
            let headers = state.headers.clone();
            state.sink.write_head(status, &headers)?;
            state.flushed = true;
        }
        state.sink.write_body(chunk)?;
        state.bytes_written += chunk.len() as u64;
        Ok(chunk.len())
    }

    /// Close the lane. Flushes the head when no body was ever written, so
    /// header-only responses still carry their status.
    pub(crate) fn seal(&self) {
        let mut state = self.lock();
        if state.sealed {
            return;
        }
        if !state.flushed {
            let status = state.status;
            let headers = state.headers.clone();
            if let Err(err) = state.sink.write_head(status, &headers) {
                warn!(error = %err, "Flushing response head at seal failed");
            }
            state.flushed = true;
        }
        state.sealed = true;
    }

    pub fn flushed(&self) -> bool {
        self.lock().flushed
    }

    pub fn sealed(&self) -> bool {
        self.lock().sealed
    }

    pub fn bytes_written(&self) -> u64 {
        self.lock().bytes_written
    }
}

/// Cloneable handle onto a request's response lane, for handler-internal
/// fan-out. A handle kept past the request's end can no longer write; the
/// lane logs and drops such attempts.
#[derive(Clone)]
pub struct ResponseHandle {
    lane: Arc<ResponseLane>,
}

impl ResponseHandle {
    pub(crate) fn new(lane: Arc<ResponseLane>) -> Self {
        Self { lane }
    }

    pub fn write(&self, chunk: &[u8]) -> io::Result<usize> {
        self.lane.write(chunk)
    }

    pub fn write_str(&self, text: &str) -> io::Result<usize> {
        self.lane.write(text.as_bytes())
    }

    pub fn set_header(&self, name: &str, value: &str) {
        self.lane.set_header(name, value)
    }

    pub fn completed(&self) -> bool {
        self.lane.sealed()
    }
}
