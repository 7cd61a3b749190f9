//! Assertion Library (C5): a fixed vocabulary of predicates over a
//! `Report`. Each call either appends a note (pass) or returns an
//! `Error::Assertion` (fail); spec.md §4.5 and §7 specify that assertion
//! failures short-circuit the test body, so every function here returns
//! `crate::error::Result<()>` and test bodies use `?` to get that
//! short-circuit for free — the same "propagate with `?`, no manual
//! control flow" idiom the teacher uses throughout its `proto`/`client`
//! modules.

use crate::error::{Error, Result};
use crate::report::Report;

fn ok(report: &mut Report, note: impl Into<String>) -> Result<()> {
    report.push_note(note);
    Ok(())
}

fn fail<T>(message: impl Into<String>) -> Result<T> {
    Err(Error::assertion(message))
}

pub fn status_equals(report: &mut Report, expected: u16) -> Result<()> {
    match report.response.status_code {
        Some(code) if code == expected => ok(report, format!("status is {}", expected)),
        Some(code) => fail(format!("expected status {}, got {}", expected, code)),
        None => fail("no status code was parsed from the response"),
    }
}

pub fn version_equals(report: &mut Report, expected: &str) -> Result<()> {
    if report.response.http_version == expected {
        ok(report, format!("protocol version is {}", expected))
    } else {
        fail(format!(
            "expected protocol version {}, got {:?}",
            expected, report.response.http_version
        ))
    }
}

pub fn header_present(report: &mut Report, name: &str) -> Result<()> {
    let key = name.to_lowercase();
    if report.response.headers.contains_key(&key) {
        ok(report, format!("header {} is present", name))
    } else {
        fail(format!("expected header {} to be present", name))
    }
}

pub fn header_absent(report: &mut Report, name: &str) -> Result<()> {
    let key = name.to_lowercase();
    if report.response.headers.contains_key(&key) {
        fail(format!("expected header {} to be absent", name))
    } else {
        ok(report, format!("header {} is absent", name))
    }
}

fn header_value<'a>(report: &'a Report, name: &str) -> Result<&'a str> {
    report
        .response
        .headers
        .get(&name.to_lowercase())
        .map(|s| s.as_str())
        .ok_or_else(|| Error::assertion(format!("expected header {} to be present", name)))
}

pub fn header_equals(report: &mut Report, name: &str, expected: &str) -> Result<()> {
    let actual = header_value(report, name)?.to_string();
    if actual == expected {
        ok(report, format!("header {} equals {:?}", name, expected))
    } else {
        fail(format!(
            "expected header {} to equal {:?}, got {:?}",
            name, expected, actual
        ))
    }
}

pub fn header_contains(report: &mut Report, name: &str, needle: &str) -> Result<()> {
    let actual = header_value(report, name)?.to_string();
    if actual.contains(needle) {
        ok(report, format!("header {} contains {:?}", name, needle))
    } else {
        fail(format!(
            "expected header {} to contain {:?}, got {:?}",
            name, needle, actual
        ))
    }
}

pub fn header_does_not_contain(report: &mut Report, name: &str, needle: &str) -> Result<()> {
    let actual = header_value(report, name)?.to_string();
    if !actual.contains(needle) {
        ok(report, format!("header {} does not contain {:?}", name, needle))
    } else {
        fail(format!(
            "expected header {} to not contain {:?}, got {:?}",
            name, needle, actual
        ))
    }
}

pub fn header_begins_with(report: &mut Report, name: &str, prefix: &str) -> Result<()> {
    let actual = header_value(report, name)?.to_string();
    if actual.starts_with(prefix) {
        ok(report, format!("header {} begins with {:?}", name, prefix))
    } else {
        fail(format!(
            "expected header {} to begin with {:?}, got {:?}",
            name, prefix, actual
        ))
    }
}

pub fn header_ends_with(report: &mut Report, name: &str, suffix: &str) -> Result<()> {
    let actual = header_value(report, name)?.to_string();
    if actual.ends_with(suffix) {
        ok(report, format!("header {} ends with {:?}", name, suffix))
    } else {
        fail(format!(
            "expected header {} to end with {:?}, got {:?}",
            name, suffix, actual
        ))
    }
}

/// Shorthand for `header_begins_with(report, "content-type", prefix)`.
pub fn media_type_begins_with(report: &mut Report, prefix: &str) -> Result<()> {
    header_begins_with(report, "content-type", prefix)
}

/// `Date` matches the preferred RFC 7231 IMF-fixdate form exactly (the
/// teacher's own cached `Date` generator in `src/proto/h1/date.rs` formats
/// with `"%a, %d %b %Y %H:%M:%S GMT"` and records `DATE_VALUE_LENGTH = 29`;
/// this assertion validates that an origin server's `Date` header matches
/// that exact shape, rejecting the RFC 850 and asctime alternate forms that
/// `httpdate::parse_http_date` would otherwise accept).
pub fn date_is_imf_fixdate(report: &mut Report) -> Result<()> {
    const DATE_VALUE_LENGTH: usize = 29;
    let actual = header_value(report, "date")?.to_string();
    if actual.len() == DATE_VALUE_LENGTH && is_imf_fixdate_shape(&actual) && httpdate::parse_http_date(&actual).is_ok()
    {
        ok(report, "Date header matches IMF-fixdate")
    } else {
        fail(format!(
            "expected Date header in IMF-fixdate form, got {:?}",
            actual
        ))
    }
}

fn is_imf_fixdate_shape(s: &str) -> bool {
    const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let bytes = s.as_bytes();
    if bytes.len() != 29 {
        return false;
    }
    WEEKDAYS.iter().any(|w| s.starts_with(w))
        && &s[3..5] == ", "
        && bytes[7] == b' '
        && MONTHS.iter().any(|m| &s[8..11] == *m)
        && bytes[11] == b' '
        && bytes[16] == b' '
        && bytes[19] == b':'
        && bytes[22] == b':'
        && s.ends_with(" GMT")
        && s[5..7].bytes().all(|b| b.is_ascii_digit())
        && s[12..16].bytes().all(|b| b.is_ascii_digit())
        && s[17..19].bytes().all(|b| b.is_ascii_digit())
        && s[20..22].bytes().all(|b| b.is_ascii_digit())
        && s[23..25].bytes().all(|b| b.is_ascii_digit())
}

/// `ETag` is present and strongly quoted (the weak `W/"..."` form is
/// rejected). Returns the unquoted tag text so a test body can capture it
/// for a chained probe (spec.md §8 scenario f).
pub fn etag_is_strong_quoted(report: &mut Report) -> Result<String> {
    let actual = header_value(report, "etag")?.to_string();
    if actual.starts_with("W/") {
        return fail(format!("expected a strong ETag, got weak form {:?}", actual));
    }
    if actual.len() >= 2 && actual.starts_with('"') && actual.ends_with('"') {
        let tag = actual[1..actual.len() - 1].to_string();
        if tag.is_empty() {
            return fail("ETag is an empty quoted string");
        }
        report.push_note(format!("ETag is strongly quoted: {:?}", actual));
        Ok(tag)
    } else {
        fail(format!("expected a strongly-quoted ETag, got {:?}", actual))
    }
}

/// Redirect shorthand: status equals `expected_status` and `Location`
/// ends with `location_suffix`.
pub fn redirects_to(report: &mut Report, expected_status: u16, location_suffix: &str) -> Result<()> {
    status_equals(report, expected_status)?;
    header_ends_with(report, "location", location_suffix)
}

pub fn payload_empty(report: &mut Report) -> Result<()> {
    if report.response.payload.is_empty() {
        ok(report, "payload is empty")
    } else {
        fail(format!(
            "expected empty payload, got {} bytes",
            report.response.payload.len()
        ))
    }
}

pub fn payload_non_empty(report: &mut Report) -> Result<()> {
    if !report.response.payload.is_empty() {
        ok(report, "payload is non-empty")
    } else {
        fail("expected non-empty payload")
    }
}

pub fn payload_exact_size(report: &mut Report, size: usize) -> Result<()> {
    if report.response.payload.len() == size {
        ok(report, format!("payload is exactly {} bytes", size))
    } else {
        fail(format!(
            "expected payload of {} bytes, got {}",
            size,
            report.response.payload.len()
        ))
    }
}

pub fn payload_equals(report: &mut Report, expected: &[u8]) -> Result<()> {
    if report.response.payload == expected {
        ok(report, "payload equals expected bytes")
    } else {
        fail("payload does not equal expected bytes")
    }
}

pub fn payload_contains(report: &mut Report, needle: &[u8]) -> Result<()> {
    if contains_subslice(&report.response.payload, needle) {
        ok(report, format!("payload contains {:?}", String::from_utf8_lossy(needle)))
    } else {
        fail(format!(
            "expected payload to contain {:?}",
            String::from_utf8_lossy(needle)
        ))
    }
}

pub fn payload_does_not_contain(report: &mut Report, needle: &[u8]) -> Result<()> {
    if !contains_subslice(&report.response.payload, needle) {
        ok(report, format!(
            "payload does not contain {:?}",
            String::from_utf8_lossy(needle)
        ))
    } else {
        fail(format!(
            "expected payload to not contain {:?}",
            String::from_utf8_lossy(needle)
        ))
    }
}

pub fn payload_begins_with(report: &mut Report, prefix: &[u8]) -> Result<()> {
    if report.response.payload.starts_with(prefix) {
        ok(report, "payload begins with expected prefix")
    } else {
        fail("payload does not begin with expected prefix")
    }
}

pub fn payload_does_not_begin_with(report: &mut Report, prefix: &[u8]) -> Result<()> {
    if !report.response.payload.starts_with(prefix) {
        ok(report, "payload does not begin with given prefix")
    } else {
        fail("payload unexpectedly begins with given prefix")
    }
}

pub fn payload_ends_with(report: &mut Report, suffix: &[u8]) -> Result<()> {
    if report.response.payload.ends_with(suffix) {
        ok(report, "payload ends with expected suffix")
    } else {
        fail("payload does not end with expected suffix")
    }
}

pub fn connection_alive(report: &mut Report) -> Result<()> {
    if report.response.connection.is_alive() {
        ok(report, "connection remained open (server did not close after response)")
    } else {
        fail("expected connection to remain open, but the server closed it")
    }
}

pub fn connection_closed(report: &mut Report) -> Result<()> {
    if !report.response.connection.is_alive() {
        ok(report, "connection was closed by the server")
    } else {
        fail("expected the server to close the connection, but it remained open")
    }
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with_headers(status: u16, headers: &[(&str, &str)]) -> Report {
        let mut r = Report::new("test_1", "suite", "desc");
        r.response.status_code = Some(status);
        r.response.http_version = "HTTP/1.1".to_string();
        for (k, v) in headers {
            r.response.headers.insert(k.to_lowercase(), v.to_string());
        }
        r
    }

    #[test]
    fn status_equals_passes_and_fails() {
        let mut r = report_with_headers(200, &[]);
        assert!(status_equals(&mut r, 200).is_ok());
        assert!(status_equals(&mut r, 404).is_err());
    }

    #[test]
    fn etag_rejects_weak_form() {
        let mut r = report_with_headers(200, &[("ETag", "W/\"abc\"")]);
        assert!(etag_is_strong_quoted(&mut r).is_err());
    }

    #[test]
    fn etag_extracts_tag_text() {
        let mut r = report_with_headers(200, &[("ETag", "\"deadbeef\"")]);
        assert_eq!(etag_is_strong_quoted(&mut r).unwrap(), "deadbeef");
    }

    #[test]
    fn date_accepts_imf_fixdate_only() {
        let mut r = report_with_headers(200, &[("Date", "Sun, 06 Nov 1994 08:49:37 GMT")]);
        assert!(date_is_imf_fixdate(&mut r).is_ok());

        // RFC 850 form must be rejected even though httpdate can parse it.
        let mut r2 = report_with_headers(200, &[("Date", "Sunday, 06-Nov-94 08:49:37 GMT")]);
        assert!(date_is_imf_fixdate(&mut r2).is_err());
    }

    #[test]
    fn redirect_shorthand_checks_both_fields() {
        let mut r = report_with_headers(301, &[("Location", "https://example.com/new")]);
        assert!(redirects_to(&mut r, 301, "/new").is_ok());
        let mut r2 = report_with_headers(301, &[("Location", "https://example.com/other")]);
        assert!(redirects_to(&mut r2, 301, "/new").is_err());
    }

    #[test]
    fn payload_predicates() {
        let mut r = Report::new("t", "s", "d");
        r.response.payload = b"1966 Ford Fairlane".to_vec();
        assert!(payload_non_empty(&mut r).is_ok());
        assert!(payload_contains(&mut r, b"Fairlane").is_ok());
        assert!(payload_does_not_contain(&mut r, b"Mustang").is_ok());
        assert!(payload_begins_with(&mut r, b"1966").is_ok());
        assert!(payload_ends_with(&mut r, b"Fairlane").is_ok());
        assert!(payload_exact_size(&mut r, 19).is_ok());
    }

    #[test]
    fn connection_state_predicates() {
        use crate::report::Connection;
        let mut r = Report::new("t", "s", "d");
        r.response.connection = Connection::Alive;
        assert!(connection_alive(&mut r).is_ok());
        assert!(connection_closed(&mut r).is_err());
    }
}
