//! Error and Result module.

use std::fmt;

/// Result type returned from methods that can produce an `httpconform` `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error that prevented a probe, a test, or a CLI invocation
/// from completing. None of these are fatal to the `TestRunner`: every
/// variant is recorded on a `Report` (or surfaced at the CLI/service
/// boundary for `Config`) rather than aborting a whole run.
pub struct Error {
    kind: Kind,
    cause: Option<String>,
}

#[derive(Debug)]
enum Kind {
    /// Invalid host:port, unknown test id, or unknown batch number.
    Config,
    /// Failed to open the TCP connection within the connect timeout.
    Connect,
    /// Failed to write the request bytes within the send timeout.
    Send,
    /// Failed to read a response: first-byte timeout elapsed with no data,
    /// or the underlying socket returned an I/O error mid-read.
    Read,
    /// The response body could not be delimited (no `Content-Length`, no
    /// `chunked`, or a malformed chunk) when the caller required framing.
    Framing,
    /// The response was syntactically malformed (bad status line, bad
    /// header line, missing separator, etc). The parser does not
    /// short-circuit on this; see `parse::Parser` for how multiple `Parse`
    /// defects become multiple `Report::errors` entries instead of a single
    /// early return.
    Parse,
    /// An assertion predicate failed; carries the human-readable message.
    Assertion,
}

impl Error {
    fn new(kind: Kind, cause: Option<String>) -> Error {
        Error { kind, cause }
    }

    pub fn config<C: Into<String>>(cause: C) -> Error {
        Error::new(Kind::Config, Some(cause.into()))
    }

    pub fn connect<C: Into<String>>(cause: C) -> Error {
        Error::new(Kind::Connect, Some(cause.into()))
    }

    pub fn send<C: Into<String>>(cause: C) -> Error {
        Error::new(Kind::Send, Some(cause.into()))
    }

    pub fn read<C: Into<String>>(cause: C) -> Error {
        Error::new(Kind::Read, Some(cause.into()))
    }

    pub fn framing<C: Into<String>>(cause: C) -> Error {
        Error::new(Kind::Framing, Some(cause.into()))
    }

    pub fn parse<C: Into<String>>(cause: C) -> Error {
        Error::new(Kind::Parse, Some(cause.into()))
    }

    /// Constructs an assertion-failure error. Public so embedders writing
    /// their own test bodies and custom assertions (spec.md §9, "Suites as
    /// a library surface") can report failures in the same shape this
    /// crate's own `assert` module uses.
    pub fn assertion<C: Into<String>>(cause: C) -> Error {
        Error::new(Kind::Assertion, Some(cause.into()))
    }

    /// True if this error originated in the assertion library (as opposed
    /// to transport or parse failures). `TestRunner` uses this to decide
    /// whether a test reached its body at all.
    pub fn is_assertion(&self) -> bool {
        matches!(self.kind, Kind::Assertion)
    }

    pub fn is_config(&self) -> bool {
        matches!(self.kind, Kind::Config)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            Kind::Config => "invalid configuration",
            Kind::Connect => "connect error",
            Kind::Send => "send error",
            Kind::Read => "read error",
            Kind::Framing => "framing error",
            Kind::Parse => "parse error",
            Kind::Assertion => "assertion failed",
        };
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", label, cause),
            None => write!(f, "{}", label),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("cause", &self.cause)
            .finish()
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::read(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Error {
        Error::read("timed out")
    }
}
