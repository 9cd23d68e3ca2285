//! Scheduling oracle wire types: serde shapes for the optimize request and
//! its response. Timestamps are event-local wall-clock times.
use crate::EventFormat;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub event_id: String,
    pub event_format: EventFormat,
    pub venue_availability: BTreeMap<String, VenueAvailability>,
    /// Team id → preferred venue ids. Teams without preferences are omitted.
    pub team_preferences: BTreeMap<String, Vec<String>>,
    pub time_constraints: TimeConstraints,
    pub matches: Vec<OracleMatch>,
    pub sports: BTreeMap<String, SportDuration>,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueAvailability {
    pub availability: Vec<TimeWindow>,
    pub supported_sports: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    #[serde(with = "wire_time")]
    pub start_time: NaiveDateTime,
    #[serde(with = "wire_time")]
    pub end_time: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeConstraints {
    #[serde(with = "wire_time")]
    pub earliest_start_time: NaiveDateTime,
    #[serde(with = "wire_time")]
    pub latest_end_time: NaiveDateTime,
    pub rest_minutes: u32,
}

impl Default for TimeConstraints {
    fn default() -> Self {
        Self {
            earliest_start_time: NaiveDateTime::MIN,
            latest_end_time: NaiveDateTime::MIN,
            rest_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleMatch {
    pub match_id: String,
    pub team_a_id: String,
    pub team_b_id: String,
    pub sport_type: String,
    pub round: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportDuration {
    pub default_duration_minutes: u32,
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleResponse {
    /// Empty signals infeasibility.
    #[serde(default)]
    pub optimized_matches: Vec<OptimizedMatch>,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedMatch {
    pub match_id: String,
    pub venue_id: String,
    #[serde(with = "wire_time")]
    pub start_time: NaiveDateTime,
    #[serde(with = "wire_time")]
    pub end_time: NaiveDateTime,
}

/// Writes naive ISO-8601; reads either naive ISO-8601 or RFC 3339. An offset,
/// when present, is dropped and its wall-clock time kept.
pub mod wire_time {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&dt.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
    }
}
