//! Report periods.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use ledger::calendar;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ReportError;

/// The time window a report covers.
///
/// The same enumeration keys the cache, travels in request messages and
/// drives the builder's filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportPeriod {
    AllTime,
    Week,
    Month,
    Year,
}

impl ReportPeriod {
    /// Every period, in display order.
    pub const ALL: [ReportPeriod; 4] = [
        ReportPeriod::AllTime,
        ReportPeriod::Week,
        ReportPeriod::Month,
        ReportPeriod::Year,
    ];

    /// Wire token. All-time is the empty string.
    pub fn token(self) -> &'static str {
        match self {
            ReportPeriod::AllTime => "",
            ReportPeriod::Week => "week",
            ReportPeriod::Month => "month",
            ReportPeriod::Year => "year",
        }
    }

    /// Token used inside cache keys, where an empty segment would be easy
    /// to misread.
    pub fn key_token(self) -> &'static str {
        match self {
            ReportPeriod::AllTime => "all",
            other => other.token(),
        }
    }

    /// Earliest creation time included in the period, or `None` for
    /// all-time.
    pub fn start<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        match self {
            ReportPeriod::AllTime => None,
            ReportPeriod::Week => Some(calendar::beginning_of_week(now)),
            ReportPeriod::Month => Some(calendar::beginning_of_month(now)),
            ReportPeriod::Year => Some(calendar::beginning_of_year(now)),
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = ReportError;

    /// Parse a token. `"all"` is accepted as an alias for the empty token;
    /// anything else unknown is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(ReportPeriod::AllTime),
            "week" => Ok(ReportPeriod::Week),
            "month" => Ok(ReportPeriod::Month),
            "year" => Ok(ReportPeriod::Year),
            other => Err(ReportError::UnknownPeriod(other.to_string())),
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_token())
    }
}

impl Serialize for ReportPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

impl<'de> Deserialize<'de> for ReportPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        for period in ReportPeriod::ALL {
            assert_eq!(period.token().parse::<ReportPeriod>().unwrap(), period);
            assert_eq!(period.key_token().parse::<ReportPeriod>().unwrap(), period);
        }
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = "fortnight".parse::<ReportPeriod>().unwrap_err();
        assert!(matches!(err, ReportError::UnknownPeriod(ref t) if t == "fortnight"));
    }

    #[test]
    fn all_time_has_no_start() {
        assert_eq!(ReportPeriod::AllTime.start(&Utc::now()), None);
        assert!(ReportPeriod::Year.start(&Utc::now()).is_some());
    }

    #[test]
    fn serde_uses_wire_tokens() {
        let json = serde_json::to_string(&ReportPeriod::AllTime).unwrap();
        assert_eq!(json, "\"\"");
        let period: ReportPeriod = serde_json::from_str("\"month\"").unwrap();
        assert_eq!(period, ReportPeriod::Month);
        assert!(serde_json::from_str::<ReportPeriod>("\"decade\"").is_err());
    }
}
