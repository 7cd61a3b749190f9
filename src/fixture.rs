//! Fixture Loader (C1): reads a named fixture file, substitutes `<TOKEN>`
//! placeholders, and canonicalizes it to wire-ready CRLF bytes.
//!
//! Grounded on the teacher's `HttpConnector` configuration objects for the
//! "plain struct + explicit constructor, no hidden global state" shape;
//! there is no direct teacher analogue for on-disk template expansion, so
//! the substitution/normalization algorithm below follows spec.md §4.1
//! directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Marker fixture authors place between pipelined requests, purely so the
/// raw fixture file is readable; it carries no other meaning and is removed
/// during normalization.
const PIPELINE_SENTINEL: &str = "<PIPELINE>";

/// Loads fixture files from a single suite directory and expands them.
#[derive(Clone, Debug)]
pub struct FixtureLoader {
    dir: PathBuf,
}

impl FixtureLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FixtureLoader { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads `name` from this loader's directory, substitutes tokens from
    /// `params` plus the built-in token set, and returns the exact bytes to
    /// send on the wire.
    pub fn load(
        &self,
        name: &str,
        host: &str,
        port: u16,
        params: &HashMap<String, String>,
    ) -> Result<Vec<u8>> {
        let path = self.dir.join(name);
        let raw = std::fs::read(&path)
            .map_err(|e| Error::config(format!("fixture {:?}: {}", path, e)))?;
        Ok(expand(&raw, host, port, params))
    }
}

/// Pure expansion step, split out from `FixtureLoader::load` so it can be
/// exercised without touching the filesystem (see `tests` below and
/// spec.md §8 property 1).
pub fn expand(raw: &[u8], host: &str, port: u16, params: &HashMap<String, String>) -> Vec<u8> {
    let mut tokens: HashMap<String, String> = HashMap::new();
    tokens.insert("HOST".to_string(), host.to_string());
    tokens.insert("PORT".to_string(), port.to_string());
    tokens.insert("HOSTPORT".to_string(), format!("{}:{}", host, port));
    tokens.insert("EPOCH".to_string(), epoch_seconds().to_string());
    tokens.insert("RANDOMINT".to_string(), random_int().to_string());
    tokens.insert("USERAGENT".to_string(), "httpconform/0.1".to_string());
    for (k, v) in params {
        tokens.insert(k.clone(), v.clone());
    }

    let mut text = String::from_utf8_lossy(raw).into_owned();
    for (token, value) in &tokens {
        let placeholder = format!("<{}>", token);
        text = text.replace(&placeholder, value);
    }

    let (header_block, body) = split_header_body(&text);
    let header_block = header_block.replace(PIPELINE_SENTINEL, "");

    let mut wire = Vec::new();
    for line in header_block.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        wire.extend_from_slice(line.as_bytes());
        wire.extend_from_slice(b"\r\n");
    }
    wire.extend_from_slice(b"\r\n");
    wire.extend_from_slice(body.as_bytes());
    wire
}

/// Splits at the first blank line (LF or CRLF form). If no blank line is
/// present the whole text is treated as headers with an empty body, which
/// lets authors write header-only fixtures without a trailing blank line.
fn split_header_body(text: &str) -> (&str, &str) {
    if let Some(idx) = text.find("\r\n\r\n") {
        return (&text[..idx], &text[idx + 4..]);
    }
    if let Some(idx) = text.find("\n\n") {
        return (&text[..idx], &text[idx + 2..]);
    }
    (text, "")
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A non-cryptographic, dependency-free PRNG seeded from the clock. Only
/// used to fill the `<RANDOMINT>` fixture token, where uniqueness across
/// probes matters far more than unpredictability.
fn random_int() -> u32 {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(1)
        .max(1);
    let mut x = seed;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_builtin_and_custom_tokens() {
        let raw = b"GET /<PATH> HTTP/1.1\nHost: <HOSTPORT>\nX-Trace: <TRACE>\n\n";
        let mut params = HashMap::new();
        params.insert("PATH".to_string(), "a".to_string());
        params.insert("TRACE".to_string(), "abc123".to_string());
        let out = expand(raw, "localhost", 8080, &params);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("GET /a HTTP/1.1\r\n"));
        assert!(text.contains("Host: localhost:8080\r\n"));
        assert!(text.contains("X-Trace: abc123\r\n"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn every_header_line_ends_crlf_and_trailing_separator_present() {
        let raw = b"GET / HTTP/1.1\nHost: <HOSTPORT>\n\nbody-bytes";
        let out = expand(raw, "h", 1, &HashMap::new());
        let text = String::from_utf8(out).unwrap();
        let (headers, body) = text.split_once("\r\n\r\n").unwrap();
        for line in headers.split("\r\n") {
            assert!(!line.contains('\n'));
        }
        assert_eq!(body, "body-bytes");
    }

    #[test]
    fn pipeline_sentinel_is_removed_but_requests_survive() {
        let raw = b"GET /one HTTP/1.1\nHost: <HOSTPORT>\n<PIPELINE>GET /two HTTP/1.1\nHost: <HOSTPORT>\n\n";
        let out = expand(raw, "h", 1, &HashMap::new());
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("PIPELINE"));
        assert!(text.contains("GET /one HTTP/1.1\r\n"));
        assert!(text.contains("GET /two HTTP/1.1\r\n"));
    }

    #[test]
    fn malformed_version_is_left_intact() {
        let raw = b"GET / HTTP/1.11\nHost: <HOSTPORT>\n\n";
        let out = expand(raw, "h", 1, &HashMap::new());
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("GET / HTTP/1.11\r\n"));
    }
}
