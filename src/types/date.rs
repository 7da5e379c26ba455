use std::fmt::Display;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// `dd/MM/yyyy`, the form shown to and typed by the user.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y";

const WIRE_PREFIX: &str = "/Date(";
const WIRE_SUFFIX: &str = ")/";

/// Publication date of a book. Only the calendar day is kept; on the wire it
/// is UTC midnight of that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublishedDate(pub NaiveDate);

impl PublishedDate {
    pub fn parse_display(input: &str) -> Result<Self, ParseError> {
        NaiveDate::parse_from_str(input.trim(), DISPLAY_FORMAT)
            .map(Self)
            .map_err(|_| ParseError::Date {
                value: input.to_string(),
            })
    }

    /// Parses whatever representation the service handed back.
    pub fn parse_remote(input: &str) -> Result<Self, ParseError> {
        let input = input.trim();
        let invalid = || ParseError::Date {
            value: input.to_string(),
        };
        if input.starts_with(WIRE_PREFIX) {
            let millis = parse_wire_millis(input).ok_or_else(invalid)?;
            let ts = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(invalid)?;
            return Ok(Self(ts.date_naive()));
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self(ts.with_timezone(&Utc).date_naive()));
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Self(ts.date()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Ok(Self(date));
        }
        if let Ok(display) = Self::parse_display(input) {
            return Ok(display);
        }
        dateparser::parse_with_timezone(input, &Utc)
            .map(|ts| Self(ts.date_naive()))
            .map_err(|_| invalid())
    }

    pub fn epoch_millis(&self) -> i64 {
        self.0
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp_millis())
            .unwrap_or_default()
    }

    /// `/Date(<epoch-ms>)/`
    pub fn to_wire(&self) -> String {
        format!("{WIRE_PREFIX}{}{WIRE_SUFFIX}", self.epoch_millis())
    }

    /// `dd/MM/yyyy`
    pub fn to_display(&self) -> String {
        self.0.format(DISPLAY_FORMAT).to_string()
    }

    /// OData v2 `datetime'...'` literal, used in filter expressions.
    pub fn to_filter_literal(&self) -> String {
        format!("datetime'{}'", self.0.format("%Y-%m-%dT00:00:00"))
    }
}

/// Milliseconds from `/Date(<ms>)/` or `/Date(<ms>+<offset>)/`. The offset is
/// informational only, the millisecond value is already UTC.
fn parse_wire_millis(input: &str) -> Option<i64> {
    let inner = input.strip_prefix(WIRE_PREFIX)?.strip_suffix(WIRE_SUFFIX)?;
    let end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i)
        .unwrap_or(inner.len());
    inner[..end].parse().ok()
}

/// Display form to wire form.
pub fn to_wire_date(display: &str) -> Result<String, ParseError> {
    Ok(PublishedDate::parse_display(display)?.to_wire())
}

/// Any representation the service returns to display form.
pub fn to_display_date(raw: &str) -> Result<String, ParseError> {
    Ok(PublishedDate::parse_remote(raw)?.to_display())
}

impl Display for PublishedDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display())
    }
}

impl Serialize for PublishedDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for PublishedDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        PublishedDate::parse_remote(&raw).map_err(serde::de::Error::custom)
    }
}
