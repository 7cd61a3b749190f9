//! Probe Driver (C4): orchestrates one probe — load fixture, open/reuse a
//! connection, send, receive, parse — and hands a structured `Report` back
//! to the test body. Never raises; failures become `Report` entries
//! (spec.md §4.4).
//!
//! Grounded on the teacher's `Conn`/dispatch split
//! (`src/proto/h1/conn.rs`): a driver object that owns the transport and
//! walks it through fixed stages, appending a trace note at each
//! transition the way the teacher's `Conn` emits `trace!` lines per state
//! change.

use std::collections::HashMap;

use crate::fixture::FixtureLoader;
use crate::parse::parse_response;
use crate::report::Report;
use crate::transport::{Transport, TransportConfig};

/// Per-probe parameters a test body supplies.
#[derive(Debug, Clone, Default)]
pub struct ProbeParams {
    pub params: HashMap<String, String>,
    /// If true and the probe succeeds, the transport connection survives
    /// for reuse by the next probe in the same test (spec.md §4.2,
    /// "Keep-alive policy").
    pub keep_alive: bool,
}

impl ProbeParams {
    pub fn new() -> Self {
        ProbeParams::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn keep_alive(mut self, keep: bool) -> Self {
        self.keep_alive = keep;
        self
    }
}

/// Drives one probe against `host`/`port`, reusing `conn` when present and
/// handed back `keep_alive`. On success, mutates `report` with the parsed
/// response; on any stage failure, appends the error and returns without
/// attempting the remaining stages.
#[derive(Clone)]
pub struct ProbeDriver {
    loader: FixtureLoader,
    host: String,
    port: u16,
    config: TransportConfig,
}

impl ProbeDriver {
    pub fn new(loader: FixtureLoader, host: impl Into<String>, port: u16, config: TransportConfig) -> Self {
        ProbeDriver {
            loader,
            host: host.into(),
            port,
            config,
        }
    }

    /// Runs one probe, returning the surviving connection (`Some`) if
    /// `params.keep_alive` was set and every stage succeeded, or `None`
    /// otherwise (closing it first).
    pub async fn probe(
        &self,
        fixture_name: &str,
        params: &ProbeParams,
        conn: Option<Transport>,
        report: &mut Report,
    ) -> Option<Transport> {
        let request_bytes = match self
            .loader
            .load(fixture_name, &self.host, self.port, &params.params)
        {
            Ok(bytes) => bytes,
            Err(e) => {
                report.push_error(e.to_string());
                return None;
            }
        };
        report.request.raw = String::from_utf8_lossy(&request_bytes).into_owned();

        let mut transport = match conn {
            Some(t) => {
                report.push_note("Reusing existing connection");
                t
            }
            None => {
                report.push_note(format!("Connecting to {}:{}", self.host, self.port));
                match Transport::open(&self.host, self.port, self.config).await {
                    Ok(t) => t,
                    Err(e) => {
                        report.push_error(e.to_string());
                        return None;
                    }
                }
            }
        };

        if let Err(e) = transport.send(&request_bytes).await {
            report.push_error(e.to_string());
            return None;
        }
        report.push_note("Request data sent");

        let (response_bytes, connection) = match transport.recv_all().await {
            Ok(pair) => pair,
            Err(e) => {
                report.push_error(e.to_string());
                return None;
            }
        };
        report.push_note("Response data read");

        parse_response(&response_bytes, report);
        report.response.connection = connection;
        report.push_note("Response parsed");

        if params.keep_alive && report.passed() {
            Some(transport)
        } else {
            drop(transport);
            None
        }
    }

    pub async fn sleep_lifetime_plus_one(&self, conn: &Transport) {
        conn.sleep_lifetime_plus_one().await;
    }
}
