// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.
//!
//! Timestamps are stored as second-precision RFC3339 strings with a `Z`
//! suffix. With a fixed width, string order matches chronological order, so
//! range filters behave the same in Firestore and in memory.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp into UTC.
pub fn parse_utc_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a calendar date as `YYYY-MM-DD` (calendar and recommendation keys).
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// The calendar day before `now`, as observed in time zone `tz`.
pub fn yesterday_in<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    (now.with_timezone(tz) - Duration::days(1)).date_naive()
}

/// Serde adapter for `DateTime<Utc>` fields stored as RFC3339 strings.
pub mod rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_utc_rfc3339(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_utc_rfc3339(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid RFC3339 timestamp: {raw}")))
    }
}

/// Serde adapter for optional `DateTime<Utc>` fields.
///
/// Use together with `#[serde(default)]` so missing fields decode as `None`.
pub mod rfc3339_opt {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_some(&super::format_utc_rfc3339(*v)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => super::parse_utc_rfc3339(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid RFC3339 timestamp: {raw}"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_is_fixed_width_and_ordered() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = early + Duration::milliseconds(1500);

        let a = format_utc_rfc3339(early);
        let b = format_utc_rfc3339(late);

        assert_eq!(a, "2024-01-01T00:00:00Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_parse_roundtrips_offsets_to_utc() {
        let parsed = parse_utc_rfc3339("2024-03-10T06:00:00-06:00").unwrap();
        assert_eq!(format_utc_rfc3339(parsed), "2024-03-10T12:00:00Z");
        assert!(parse_utc_rfc3339("not-a-date").is_none());
    }

    #[test]
    fn test_yesterday_respects_time_zone() {
        // 03:00 UTC on the 15th is still the evening of the 14th in Chicago.
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 3, 0, 0).unwrap();
        let chicago = chrono_tz::America::Chicago;

        assert_eq!(date_key(yesterday_in(now, &Utc)), "2024-05-14");
        assert_eq!(date_key(yesterday_in(now, &chicago)), "2024-05-13");
    }
}
