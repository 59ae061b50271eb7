//! Granularity: the bar resolution of a time series.
//!
//! Codes follow the broker convention: `M1, M5, M15, M30, H1, H2, H4, H8,
//! D, W, M` where the bare `M` is one calendar month. Variants are declared
//! finest first so `Ord` sorts from fine to coarse.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_YEAR: f64 = 365.0 * SECONDS_PER_DAY as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Granularity {
    M1,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H8,
    D,
    W,
    #[serde(rename = "M")]
    Month,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown granularity code '{0}' (expected one of M1, M5, M15, M30, H1, H2, H4, H8, D, W, M)")]
pub struct ParseGranularityError(pub String);

impl Granularity {
    pub const ALL: [Granularity; 11] = [
        Granularity::M1,
        Granularity::M5,
        Granularity::M15,
        Granularity::M30,
        Granularity::H1,
        Granularity::H2,
        Granularity::H4,
        Granularity::H8,
        Granularity::D,
        Granularity::W,
        Granularity::Month,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Granularity::M1 => "M1",
            Granularity::M5 => "M5",
            Granularity::M15 => "M15",
            Granularity::M30 => "M30",
            Granularity::H1 => "H1",
            Granularity::H2 => "H2",
            Granularity::H4 => "H4",
            Granularity::H8 => "H8",
            Granularity::D => "D",
            Granularity::W => "W",
            Granularity::Month => "M",
        }
    }

    /// Nominal bar length in seconds. A month counts as 30 days.
    pub fn seconds(self) -> i64 {
        match self {
            Granularity::M1 => 60,
            Granularity::M5 => 5 * 60,
            Granularity::M15 => 15 * 60,
            Granularity::M30 => 30 * 60,
            Granularity::H1 => 3_600,
            Granularity::H2 => 2 * 3_600,
            Granularity::H4 => 4 * 3_600,
            Granularity::H8 => 8 * 3_600,
            Granularity::D => SECONDS_PER_DAY,
            Granularity::W => 7 * SECONDS_PER_DAY,
            Granularity::Month => 30 * SECONDS_PER_DAY,
        }
    }

    /// Bars per 365-day year; the annualization factor for Sharpe.
    pub fn periods_per_year(self) -> f64 {
        SECONDS_PER_YEAR / self.seconds() as f64
    }

    /// Start of the bucket of this granularity containing `ts`.
    ///
    /// Intraday and daily buckets are aligned to the Unix epoch, weeks start
    /// on Monday and months on the first calendar day.
    pub fn bucket_start(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Granularity::W => {
                let date = ts.date_naive();
                let offset = i64::from(date.weekday().num_days_from_monday());
                midnight(date - chrono::Duration::days(offset))
            }
            Granularity::Month => {
                let date = ts.date_naive();
                NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                    .map(midnight)
                    .unwrap_or(ts)
            }
            _ => {
                let step = self.seconds();
                let secs = ts.timestamp().div_euclid(step) * step;
                DateTime::from_timestamp(secs, 0).unwrap_or(ts)
            }
        }
    }

    /// Close time of the bar stamped at `open`: when its last price is known.
    ///
    /// Months use calendar length; every other code adds its nominal length.
    pub fn bar_close(self, open: DateTime<Utc>) -> DateTime<Utc> {
        let nominal = open + chrono::Duration::seconds(self.seconds());
        match self {
            Granularity::Month => open.checked_add_months(Months::new(1)).unwrap_or(nominal),
            _ => nominal,
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .iter()
            .copied()
            .find(|g| g.code() == s.trim())
            .ok_or_else(|| ParseGranularityError(s.to_string()))
    }
}
