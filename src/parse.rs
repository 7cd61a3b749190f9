//! Response Parser (C3): turns a raw byte buffer into structured fields on
//! a `Report`, without ever trusting that the server produced well-formed
//! HTTP. Defects are recorded as `Report::errors` entries rather than
//! aborting, per spec.md §4.3 and §7 ("the Parser records multiple errors
//! per response where multiple defects exist — it does not short-circuit").
//!
//! The teacher parses with `httparse`, a strict RFC 7230 parser that
//! rejects malformed input outright (see `src/proto/h1/parse.rs`). That is
//! the wrong tool here: this tester's whole job is to observe *how* a
//! server's response is malformed, so the scanner below is hand-written and
//! permissive, in the same "parse byte-by-byte, track explicit state"
//! register as the teacher's `ChunkedState` state machine in
//! `src/proto/h1/decode.rs`, which this module's `chunked` submodule
//! mirrors directly for the decode side.

use std::collections::HashMap;

use crate::report::Report;

/// Parses `buf` into `report`, appending notes and error strings as
/// described by spec.md §4.3. Never fails: all defects are recorded on the
/// report itself.
pub fn parse_response(buf: &[u8], report: &mut Report) {
    if buf.is_empty() {
        report.push_error("Empty response");
        return;
    }

    let (header_block, payload, used_lf_only) = match split_header_body(buf) {
        Some(split) => split,
        None => {
            report.push_error("Missing empty line after headers");
            (buf, &buf[buf.len()..], false)
        }
    };

    if used_lf_only {
        report.push_error("Using LF as header separator instead of CRLF");
    }

    report.response.raw_headers = String::from_utf8_lossy(header_block).into_owned();
    report.response.payload = payload.to_vec();
    report.response.payload_size = payload.len();

    let normalized = normalize_header_text(&report.response.raw_headers);
    let mut lines = normalized.split('\n');

    let status_line = lines.next().unwrap_or("");
    match parse_status_line(status_line) {
        Some((version, code, reason)) => {
            report.response.http_version = version;
            report.response.status_code = Some(code);
            report.response.status_text = reason;
        }
        None => {
            report.push_error(format!("Malformed status line: {:?}", status_line));
        }
    }

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        match line.find(':') {
            None => {
                report.push_error(format!("Malformed header line: {:?}", line));
            }
            Some(idx) => {
                let raw_key = &line[..idx];
                let value = line[idx + 1..].trim().to_string();
                if raw_key != raw_key.trim() {
                    report.push_error(format!(
                        "Header name {:?} has spurious white-spaces",
                        raw_key
                    ));
                }
                let key = raw_key.trim().to_lowercase();
                headers.insert(key, value);
            }
        }
    }
    report.response.headers = headers;
}

/// Finds the first blank-line separator (`\r\n\r\n` preferred, `\n\n`
/// tolerated) and splits `buf` into `(header_block, payload, used_lf_only)`.
fn split_header_body(buf: &[u8]) -> Option<(&[u8], &[u8], bool)> {
    if let Some(idx) = find_subslice(buf, b"\r\n\r\n") {
        return Some((&buf[..idx], &buf[idx + 4..], false));
    }
    if let Some(idx) = find_subslice(buf, b"\n\n") {
        return Some((&buf[..idx], &buf[idx + 2..], true));
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Strips stray `\r` and joins obs-fold continuation lines (leading tab or
/// space) onto the previous line, per spec.md §4.3 step 4.
fn normalize_header_text(block: &str) -> String {
    let stripped: String = block.chars().filter(|&c| c != '\r').collect();
    let mut out: Vec<String> = Vec::new();
    for line in stripped.split('\n') {
        if (line.starts_with(' ') || line.starts_with('\t')) && !out.is_empty() {
            let last = out.last_mut().unwrap();
            last.push(' ');
            last.push_str(line.trim_start());
        } else {
            out.push(line.to_string());
        }
    }
    out.join("\n")
}

fn parse_status_line(line: &str) -> Option<(String, u16, String)> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next()?;
    let code_str = parts.next()?;
    let reason = parts.next().unwrap_or("");
    if version.is_empty() || !version.starts_with("HTTP/") {
        return None;
    }
    let code: u16 = code_str.parse().ok()?;
    if code_str.len() != 3 {
        return None;
    }
    Some((version.to_string(), code, reason.to_string()))
}

pub mod chunked {
    //! Chunked transfer-coding decode/encode, used on demand by assertion
    //! helpers that split a pipelined response (spec.md §4.3,
    //! "Payload framing for chunked decoding").
    //!
    //! State names and stepwise structure are adapted from the teacher's
    //! `ChunkedState` in `src/proto/h1/decode.rs`; that version streams
    //! from an async reader one `Poll` at a time, while this one decodes a
    //! buffer that is already fully in memory, which is all a conformance
    //! probe ever has (the whole response was already read by `Transport`).

    use crate::error::{Error, Result};

    /// Decodes a chunked-encoded body starting at the beginning of `buf`.
    /// Returns the decoded payload and the byte offset in `buf` just past
    /// the terminating `0\r\n\r\n`.
    pub fn decode(buf: &[u8]) -> Result<(Vec<u8>, usize)> {
        let mut pos = 0usize;
        let mut out = Vec::new();

        loop {
            let line_end = find_crlf(buf, pos)
                .ok_or_else(|| Error::framing("missing CRLF after chunk size"))?;
            let size_line = std::str::from_utf8(&buf[pos..line_end])
                .map_err(|_| Error::framing("chunk size line is not valid UTF-8"))?;
            let size_hex = size_line.split(';').next().unwrap_or("").trim();
            let size = u64::from_str_radix(size_hex, 16)
                .map_err(|_| Error::framing(format!("invalid chunk size {:?}", size_hex)))?;
            pos = line_end + 2;

            if size == 0 {
                // Trailer section, terminated by an empty line.
                loop {
                    let trailer_end = find_crlf(buf, pos)
                        .ok_or_else(|| Error::framing("missing terminating CRLF"))?;
                    if trailer_end == pos {
                        return Ok((out, trailer_end + 2));
                    }
                    pos = trailer_end + 2;
                }
            }

            let size = size as usize;
            if pos + size + 2 > buf.len() {
                return Err(Error::framing("chunk body runs past end of buffer"));
            }
            out.extend_from_slice(&buf[pos..pos + size]);
            if &buf[pos + size..pos + size + 2] != b"\r\n" {
                return Err(Error::framing("missing CRLF after chunk body"));
            }
            pos += size + 2;
        }
    }

    /// Encodes `data` as a single chunk followed by the terminating
    /// zero-size chunk. Used by the crate's own property tests (spec.md §8
    /// property 3) and available to fixtures/suites that need to build a
    /// chunked request body.
    pub fn encode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        if !data.is_empty() {
            out.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
            out.extend_from_slice(data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"0\r\n\r\n");
        out
    }

    fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
        buf[from..]
            .windows(2)
            .position(|w| w == b"\r\n")
            .map(|i| i + from)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn round_trips_arbitrary_bytes() {
            for body in [&b""[..], b"hello", &[0u8; 5000][..], b"a\r\nb"] {
                let encoded = encode(body);
                let (decoded, offset) = decode(&encoded).unwrap();
                assert_eq!(decoded, body);
                assert_eq!(offset, encoded.len());
            }
        }

        #[test]
        fn rejects_missing_terminator() {
            let bad = b"5\r\nhello".to_vec();
            assert!(decode(&bad).is_err());
        }

        #[test]
        fn rejects_bad_size_token() {
            let bad = b"zz\r\nhello\r\n0\r\n\r\n".to_vec();
            assert!(decode(&bad).is_err());
        }

        #[test]
        fn ignores_chunk_extensions() {
            let raw = b"5;ext=1\r\nhello\r\n0\r\n\r\n".to_vec();
            let (decoded, offset) = decode(&raw).unwrap();
            assert_eq!(decoded, b"hello");
            assert_eq!(offset, raw.len());
        }
    }
}
