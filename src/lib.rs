use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, TimeZone};

pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod cli;
pub mod client;
pub mod commands;
pub mod error;
pub mod history;
pub mod mail;
pub mod model;
pub mod render;
pub mod settings;

#[cfg(test)]
mod testing;

pub use aggregate::{Histories, HistoryAggregator, Section, regroup};
pub use cache::ReferenceCache;
pub use classify::{ConversationKind, classify};
pub use cli::Cli;
pub use client::{PacedClient, RemoteHistoryClient, SlackHttpClient};
pub use error::{AppError, Result};
pub use history::{FetchLimits, HistoryFetcher, MAX_ITERATIONS};
pub use model::{Message, TimeWindow, Timestamp};

/// Read the bot token from `path`, ignoring surrounding whitespace
pub fn load_token(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| AppError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let token = content.trim();
    if token.is_empty() {
        return Err(AppError::MissingToken);
    }
    Ok(token.to_string())
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| AppError::InvalidDate(s.to_string()))
}

/// Reporting period named on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Date(NaiveDate),
    Today,
    Week,
}

impl Period {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "today" => Ok(Period::Today),
            "week" => Ok(Period::Week),
            _ => parse_date(s).map(Period::Date),
        }
    }

    /// Label used in section titles
    pub fn label(&self) -> String {
        match self {
            Period::Date(date) => date.format("%Y-%m-%d").to_string(),
            Period::Today => "today".to_string(),
            Period::Week => "week".to_string(),
        }
    }

    pub fn window<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<TimeWindow> {
        match self {
            Period::Date(date) => TimeWindow::for_date(*date, &now.timezone()),
            Period::Today => TimeWindow::for_today(now),
            Period::Week => TimeWindow::for_week(now),
        }
    }
}
