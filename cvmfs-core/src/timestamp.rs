//! Parsing of replication marker timestamps.
//!
//! Marker files hold a single line written either by `date` on the stratum
//! (`Thu Jan  1 00:00:00 UTC 2020`) or in an ISO/RFC format. All results are
//! normalized to UTC.

use crate::error::{RepositoryError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::io::{BufRead, BufReader, Read};

/// The "never replicated" sentinel.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Read the first line of `reader` and parse it as a timestamp.
pub fn read_timestamp<R: Read>(reader: R) -> Result<DateTime<Utc>> {
    let mut line = String::new();
    BufReader::new(reader).read_line(&mut line)?;
    parse_timestamp(&line)
}

/// Parse a timestamp in any of the accepted formats.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let text = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    // `date` output; the zone name is dropped and the time taken as UTC
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() == 6 {
        let without_zone = [tokens[0], tokens[1], tokens[2], tokens[3], tokens[5]].join(" ");
        if let Ok(naive) = NaiveDateTime::parse_from_str(&without_zone, "%a %b %d %H:%M:%S %Y") {
            return Ok(naive.and_utc());
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(RepositoryError::InvalidTimestamp(text.to_string()))
}
