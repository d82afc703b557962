//! Dump date-time text to epoch seconds
//!
//! The dumps write `2008-07-31T21:42:52.667` style values with no zone. They
//! are read as naive wall-clock time in the *local* timezone of the loading
//! process, so the same file loaded under different `TZ` settings yields
//! different epochs. No UTC conversion is applied. Sub-second precision is
//! dropped.

use chrono::{LocalResult, NaiveDateTime, Offset, TimeZone};

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const MAX_FRACTION_DIGITS: usize = 6;

/// The text did not match `YYYY-MM-DDTHH:MM:SS.ffffff`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedTimestamp(pub String);

/// Parse dump date-time text as local time and return epoch seconds
pub fn normalize(text: &str) -> Result<i64, MalformedTimestamp> {
    normalize_in(&chrono::Local, text)
}

/// Same as [`normalize`] with an explicit zone standing in for "local"
pub fn normalize_in<Tz: TimeZone>(tz: &Tz, text: &str) -> Result<i64, MalformedTimestamp> {
    let naive = parse_naive(text).ok_or_else(|| MalformedTimestamp(text.to_string()))?;

    let epoch = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.timestamp(),
        // Repeated hour when clocks go back: first occurrence
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp(),
        // Skipped hour when clocks go forward: keep the offset in force before the gap
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(&naive).fix();
            naive.and_utc().timestamp() - i64::from(offset.local_minus_utc())
        },
    };

    Ok(epoch)
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    let (whole, fraction) = text.split_once('.')?;

    if fraction.is_empty()
        || fraction.len() > MAX_FRACTION_DIGITS
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    NaiveDateTime::parse_from_str(whole, DATE_TIME_FORMAT).ok()
}
