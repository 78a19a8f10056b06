//! Search time windows and the time expressions that produce them.

use super::error::{Result, SearchError};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATIVE_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+)\s*([a-z]+)\s+ago$").expect("relative expression regex"));

const NAIVE_FORMATS: [&str; 4] =
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// A from/to search window.
///
/// Relative ranges are sent to the server as "the last N seconds" and the server
/// resolves "now" itself, so `to` is ignored for them. Absolute ranges are sent as
/// two timestamps; an unset `to` means "now" at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    relative: bool,
}

impl TimeRange {
    pub fn relative(from: DateTime<Utc>) -> Self {
        Self { from: Some(from), to: None, relative: true }
    }

    pub fn absolute(from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> Self {
        Self { from: Some(from), to, relative: false }
    }

    /// Build a range from two optional time expressions
    pub fn parse(from: Option<&str>, to: Option<&str>, relative: bool) -> Result<Self> {
        Self::parse_at(from, to, relative, Utc::now())
    }

    /// Same as [`TimeRange::parse`] with an explicit "now"
    pub fn parse_at(
        from: Option<&str>,
        to: Option<&str>,
        relative: bool,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let from = from.map(|expr| parse_time_expression(expr, now)).transpose()?;
        let to = to.map(|expr| parse_time_expression(expr, now)).transpose()?;

        if relative && from.is_none() {
            return Err(SearchError::MissingFrom);
        }

        Ok(Self { from, to, relative })
    }

    pub fn from(&self) -> Option<DateTime<Utc>> {
        self.from
    }

    pub fn to(&self) -> Option<DateTime<Utc>> {
        self.to
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// Width of the window in whole seconds, never less than one.
    ///
    /// Absolute ranges need a resolved `to`.
    pub fn duration_seconds(&self, now: DateTime<Utc>) -> Result<i64> {
        let from = self.from.ok_or(SearchError::MissingFrom)?;
        let end = if self.relative { now } else { self.to.ok_or(SearchError::UnresolvedRange)? };

        Ok((end - from).num_seconds().max(1))
    }
}

/// Parse an absolute timestamp or a relative expression such as `5 minutes ago`.
///
/// Timestamps without an offset are read as local time.
pub fn parse_time_expression(expression: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let expr = expression.trim();
    let invalid = || SearchError::InvalidTime(expression.to_string());

    match expr.to_ascii_lowercase().as_str() {
        "now" => return Ok(now),
        "today" => return local_midnight(now, 0).ok_or_else(invalid),
        "yesterday" => return local_midnight(now, 1).ok_or_else(invalid),
        _ => {},
    }

    if let Some(captures) = RELATIVE_EXPRESSION.captures(expr) {
        let amount: i64 = captures[1].parse().map_err(|_| invalid())?;
        let unit = unit_seconds(&captures[2]).ok_or_else(invalid)?;
        let offset = amount
            .checked_mul(unit)
            .and_then(Duration::try_seconds)
            .ok_or_else(invalid)?;
        return now.checked_sub_signed(offset).ok_or_else(invalid);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(expr) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(expr, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(expr, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(invalid)?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(invalid)
}

fn unit_seconds(unit: &str) -> Option<i64> {
    let seconds = match unit.to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86_400,
        "w" | "week" | "weeks" => 604_800,
        _ => return None,
    };
    Some(seconds)
}

fn local_midnight(now: DateTime<Utc>, days_back: u64) -> Option<DateTime<Utc>> {
    let date = now.with_timezone(&Local).date_naive().checked_sub_days(chrono::Days::new(days_back))?;
    Local
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
