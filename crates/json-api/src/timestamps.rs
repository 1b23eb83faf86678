//! Wire formatting for instants.

use jiff::Timestamp;

/// RFC 3339 in UTC with second precision, e.g. `2026-01-02T03:04:05Z`.
pub(crate) fn utc(when: Timestamp) -> String {
    when.strftime("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub(crate) fn utc_opt(when: Option<Timestamp>) -> Option<String> {
    when.map(utc)
}

/// Parse an optional RFC 3339 input; blank means absent.
pub(crate) fn parse_opt(input: Option<&str>) -> Result<Option<Timestamp>, jiff::Error> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some),
    }
}
