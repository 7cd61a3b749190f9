//! Result Model (C8): `Report` is the mutable record built during one test
//! body; `TestResult` is the immutable record the `TestRunner` emits once
//! the body returns.
//!
//! Grounded on the teacher's split between an in-flight, mutable
//! `dispatch`/`Conn` state and the immutable `Request`/`Response` pair it
//! eventually yields (`src/proto/h1/conn.rs`, `src/client/conn/http1.rs`):
//! same idea here, mutable `Report` while a test runs, immutable
//! `TestResult` once the `TestRunner` takes ownership (spec.md §3,
//! "Per-test mutable Report vs. value-typed results").

use std::collections::HashMap;

use serde::Serialize;

/// Whether the transport connection survived past the end of the last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connection {
    Alive,
    Closed,
}

impl Connection {
    pub fn is_alive(self) -> bool {
        matches!(self, Connection::Alive)
    }
}

/// The request side of one probe, kept purely for display/audit — the
/// framework never re-parses its own request bytes.
#[derive(Debug, Clone, Default)]
pub struct RequestRecord {
    pub raw: String,
}

/// The response side of one probe, populated by `parse::parse_response`.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub raw_headers: String,
    pub http_version: String,
    pub status_code: Option<u16>,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub payload: Vec<u8>,
    pub payload_size: usize,
    pub connection: Connection,
}

impl Default for ResponseRecord {
    fn default() -> Self {
        ResponseRecord {
            raw_headers: String::new(),
            http_version: String::new(),
            status_code: None,
            status_text: String::new(),
            headers: HashMap::new(),
            payload: Vec::new(),
            payload_size: 0,
            connection: Connection::Closed,
        }
    }
}

/// The mutable record a test body observes and annotates. One `Report` is
/// built per probe; a test body that chains probes decides for itself how
/// to merge fields across them (spec.md §3, "the framework imposes no
/// merge policy beyond providing fresh Report objects").
#[derive(Debug, Clone)]
pub struct Report {
    pub id: String,
    pub suite: String,
    pub description: String,
    pub request: RequestRecord,
    pub response: ResponseRecord,
    pub errors: Vec<String>,
    pub notes: Vec<String>,
}

impl Report {
    pub fn new(id: impl Into<String>, suite: impl Into<String>, description: impl Into<String>) -> Self {
        Report {
            id: id.into(),
            suite: suite.into(),
            description: description.into(),
            request: RequestRecord::default(),
            response: ResponseRecord::default(),
            errors: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consumes this report into the immutable result the `TestRunner`
    /// emits. Payload bytes are base64-encoded only when non-empty, per
    /// spec.md §6's service-surface field description.
    pub fn into_result(self) -> TestResult {
        let payload_b64 = if self.response.payload.is_empty() {
            None
        } else {
            use base64::Engine;
            Some(base64::engine::general_purpose::STANDARD.encode(&self.response.payload))
        };
        TestResult {
            id: self.id,
            suite: self.suite,
            description: self.description,
            passed: self.errors.is_empty(),
            errors: self.errors,
            notes: self.notes,
            request_raw: self.request.raw,
            response_raw_headers: self.response.raw_headers,
            response_payload: payload_b64,
            response_payload_size: self.response.payload_size,
            response_status_code: self.response.status_code,
            response_http_version: self.response.http_version,
            response_headers: self.response.headers,
            response_connection: self.response.connection,
        }
    }
}

/// The immutable per-test record the `TestRunner` yields, and the exact
/// shape streamed as JSON by an embedding service (spec.md §6, "Service
/// surface"). Field names below match spec.md's `res.*`/`req.*` dotted
/// names, flattened with prefixes since this is a single Rust struct
/// rather than a nested JSON object tree — flattening keeps the service
/// boundary a pure `serde_json::to_string` away without a hand-written
/// translation layer.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub id: String,
    pub suite: String,
    pub description: String,
    pub passed: bool,
    pub errors: Vec<String>,
    pub notes: Vec<String>,
    pub request_raw: String,
    pub response_raw_headers: String,
    pub response_payload: Option<String>,
    pub response_payload_size: usize,
    pub response_status_code: Option<u16>,
    pub response_http_version: String,
    pub response_headers: HashMap<String, String>,
    pub response_connection: Connection,
}

impl TestResult {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passed_iff_errors_empty() {
        let mut r = Report::new("test_1", "suite", "desc");
        assert!(r.passed());
        r.push_error("boom");
        assert!(!r.passed());
    }

    #[test]
    fn payload_size_matches_payload_len() {
        let mut r = Report::new("test_1", "suite", "desc");
        r.response.payload = b"hello".to_vec();
        r.response.payload_size = r.response.payload.len();
        let result = r.into_result();
        assert_eq!(result.response_payload_size, 5);
        use base64::Engine;
        let expected = base64::engine::general_purpose::STANDARD.encode(b"hello");
        assert_eq!(result.response_payload.unwrap(), expected);
    }

    #[test]
    fn empty_payload_serializes_to_none() {
        let r = Report::new("test_1", "suite", "desc");
        let result = r.into_result();
        assert!(result.response_payload.is_none());
    }
}
