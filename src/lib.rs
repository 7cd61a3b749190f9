//! `httpconform`: a black-box conformance tester for HTTP/1.1 origin
//! servers. It opens raw TCP connections, sends hand-crafted request bytes
//! loaded from fixture files, reads back raw response bytes under strict
//! tiered timeouts, parses the response without trusting the server, and
//! evaluates a declaratively composed battery of assertions.
//!
//! This crate is the engine only: byte-level fixture expansion
//! ([`fixture`]), the raw-socket transport ([`transport`]), the untrusting
//! response parser ([`parse`]), the assertion vocabulary ([`assert`]), and
//! the test registration/execution machinery ([`registry`], [`runner`]).
//! A CLI front-end and an HTTP control-plane service are expected to sit on
//! top of this library; see `src/bin/cli.rs` for the minimal CLI surface
//! this crate ships with.

pub mod assert;
pub mod error;
pub mod fixture;
pub mod parse;
pub mod probe;
pub mod registry;
pub mod report;
pub mod runner;
pub mod suites;
pub mod transport;

pub use error::{Error, Result};
pub use probe::{ProbeDriver, ProbeParams};
pub use registry::{Suite, TestCase, TestContext, TestRegistry};
pub use report::{Connection, Report, TestResult};
pub use runner::TestRunner;
pub use transport::{Transport, TransportConfig};
