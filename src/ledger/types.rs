//! Domain types of the ad ledger.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::storage::{Row, StoreError, Value};

pub const UNSUPPORTED_ACTIVE_TO: &str =
    "unsupported active_to value (not any of <day>, <week>, <month>, <year>)";

/// How long a new advertisement stays active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationToken {
    Day,
    Week,
    Month,
    Year,
}

impl DurationToken {
    /// `date` moved forward by one unit of this token's calendar field.
    /// Month and year additions clamp to the last day of a shorter month.
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            DurationToken::Day => date.checked_add_days(Days::new(1)),
            DurationToken::Week => date.checked_add_days(Days::new(7)),
            DurationToken::Month => date.checked_add_months(Months::new(1)),
            DurationToken::Year => date.checked_add_months(Months::new(12)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationToken::Day => "day",
            DurationToken::Week => "week",
            DurationToken::Month => "month",
            DurationToken::Year => "year",
        }
    }
}

impl FromStr for DurationToken {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(DurationToken::Day),
            "week" => Ok(DurationToken::Week),
            "month" => Ok(DurationToken::Month),
            "year" => Ok(DurationToken::Year),
            _ => Err(LedgerError::InvalidArgument(UNSUPPORTED_ACTIVE_TO.to_string())),
        }
    }
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for Value {
            fn from(id: $name) -> Value {
                Value::Int(id.0)
            }
        }
    };
}

id_type!(
    /// Process-local advertisement id.
    AdId
);
id_type!(
    /// Key of one counter in the counter service.
    RateId
);

/// One advertisement row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdRecord {
    pub ad_id: AdId,
    pub advertiser: String,
    pub site: String,
    pub active_to: NaiveDate,
    pub rate_id: RateId,
}

impl AdRecord {
    pub fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            ad_id: AdId(row.get_int("id")?),
            advertiser: row.get_text("advertiser")?.to_string(),
            site: row.get_text("site")?.to_string(),
            active_to: row.get_date("active_to")?,
            rate_id: RateId(row.get_int("rate_id")?),
        })
    }

    /// One line of the bumps report.
    pub fn describe(&self, bumps: i64) -> String {
        format!(
            "ad_id={}, advertiser={}, site={}, active_to={}, rate_id={}, bumps={}",
            self.ad_id,
            self.advertiser,
            self.site,
            self.active_to.format("%Y-%m-%d"),
            self.rate_id,
            bumps
        )
    }
}
