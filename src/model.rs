//! Typed records decoded from Slack API responses.
//!
//! Everything that crosses the API boundary is decoded into one of these
//! types, so the fetch and aggregation code never touches raw JSON.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Days, NaiveDate, TimeZone};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::{AppError, Result};

const MICROS_PER_SECOND: u32 = 1_000_000;

/// A Slack message timestamp, kept exact as whole seconds plus microseconds.
///
/// Slack sends these as strings like `"1700000000.000100"`. They double as
/// message ids within a conversation, so the value must survive a round
/// trip into a `latest` parameter without float rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timestamp {
    seconds: i64,
    micros: u32,
}

impl Timestamp {
    pub fn new(seconds: i64, micros: u32) -> Self {
        Self {
            seconds: seconds + i64::from(micros / MICROS_PER_SECOND),
            micros: micros % MICROS_PER_SECOND,
        }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, micros: 0 }
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn micros(&self) -> u32 {
        self.micros
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };
        let seconds = whole.parse::<i64>().ok()?;
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        // keep microsecond precision, pad or truncate to 6 digits
        let padded: String = fraction.chars().chain("000000".chars()).take(6).collect();
        let micros = padded.parse::<u32>().ok()?;
        Some(Self { seconds, micros })
    }

    fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let seconds = value.floor();
        let micros = ((value - seconds) * f64::from(MICROS_PER_SECOND)).round() as u32;
        Some(Self::new(seconds as i64, micros))
    }

    pub fn to_datetime<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        DateTime::from_timestamp(self.seconds, self.micros * 1000).map(|dt| dt.with_timezone(tz))
    }

    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self::new(dt.timestamp(), dt.timestamp_subsec_micros())
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.seconds, self.micros).cmp(&(other.seconds, other.micros))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.seconds, self.micros)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(i64),
            Float(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Timestamp::parse(&s)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", s))),
            Raw::Integer(n) => Ok(Timestamp::from_seconds(n)),
            Raw::Float(n) => Timestamp::from_f64(n)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", n))),
        }
    }
}

/// Half-open interval `[since, till)` of message timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    since: Timestamp,
    till: Timestamp,
}

impl TimeWindow {
    pub fn new(since: Timestamp, till: Timestamp) -> Result<Self> {
        if since > till {
            return Err(AppError::InvalidWindow {
                since: since.to_string(),
                till: till.to_string(),
            });
        }
        Ok(Self { since, till })
    }

    pub fn since(&self) -> Timestamp {
        self.since
    }

    pub fn till(&self) -> Timestamp {
        self.till
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.since <= ts && ts < self.till
    }

    /// The seven days leading up to `now`.
    pub fn for_week<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Self> {
        let till = Timestamp::from_datetime(now);
        let since = Timestamp::new(till.seconds - 7 * 86_400, till.micros);
        Self::new(since, till)
    }

    /// From yesterday's midnight up to `now`.
    pub fn for_today<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Self> {
        let today = now.date_naive();
        let yesterday = today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| AppError::InvalidDate(today.to_string()))?;
        let since = start_of_day(yesterday, &now.timezone())?;
        Self::new(since, Timestamp::from_datetime(now))
    }

    /// The whole calendar day `date` in time zone `tz`.
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<Self> {
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::InvalidDate(date.to_string()))?;
        Self::new(start_of_day(date, tz)?, start_of_day(next, tz)?)
    }
}

fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<Timestamp> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::InvalidDate(date.to_string()))?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| Timestamp::from_datetime(&dt))
        .ok_or_else(|| AppError::InvalidDate(date.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// Conversation metadata as listed by `users.conversations`.
///
/// The four `is_*` flags are mutually exclusive on well-formed data; see
/// [`crate::classify`] for how they map onto a kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub is_channel: bool,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_im: bool,
    #[serde(default)]
    pub is_mpim: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_normalized: Option<String>,
    /// Counterpart of a direct message
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub ts: Timestamp,
    /// Absent for system and bot messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl ResponseMetadata {
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct UsersPage {
    pub members: Vec<User>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationsPage {
    pub channels: Vec<Conversation>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

/// One page of `conversations.history`, newest message first.
#[derive(Debug, Deserialize)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub has_more: bool,
}
