pub mod client;
pub mod oracle;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Venues open at 08:00 local time.
pub const OPENING_HOUR: u32 = 8;
/// Venues close at 18:00 local time; a match may end exactly at closing.
pub const CLOSING_HOUR: u32 = 18;

const TBD: &str = "TBD";
const WINNER_PREFIX: &str = "winner_";

// ---------------------------------------------------------------------------
// Document model: the shapes stored per event in the document store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    Approved,
    #[default]
    Pending,
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub status: TeamStatus,
    #[serde(default)]
    pub sport_type: String,
    #[serde(default)]
    pub preferred_venues: Vec<String>,
}

impl Team {
    pub fn is_approved(&self) -> bool {
        self.status == TeamStatus::Approved
    }
}

/// One side of a match. Stored as a plain string for compatibility with
/// existing documents: a team id, `"TBD"`, or `"winner_<matchId>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlotRef {
    Team(String),
    WinnerOf(String),
    #[default]
    Tbd,
}

impl SlotRef {
    pub fn team(id: impl Into<String>) -> Self {
        SlotRef::Team(id.into())
    }

    pub fn winner_of(match_id: impl Into<String>) -> Self {
        SlotRef::WinnerOf(match_id.into())
    }

    /// The team id once the slot has been resolved.
    pub fn team_id(&self) -> Option<&str> {
        match self {
            SlotRef::Team(id) => Some(id),
            SlotRef::WinnerOf(_) | SlotRef::Tbd => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, SlotRef::Team(_))
    }

    /// True when `id` survives a store round trip as `SlotRef::Team(id)`.
    pub fn is_storable_team_id(id: &str) -> bool {
        matches!(SlotRef::from(id.to_owned()), SlotRef::Team(stored) if stored == id)
    }
}

/// Only the exact `"TBD"`, `""` and `"winner_<matchId>"` forms are
/// placeholders; every other string is kept verbatim as a team id.
impl From<String> for SlotRef {
    fn from(raw: String) -> Self {
        if raw.is_empty() || raw == TBD {
            return SlotRef::Tbd;
        }
        match raw.strip_prefix(WINNER_PREFIX) {
            Some(match_id) if !match_id.is_empty() => SlotRef::WinnerOf(match_id.to_owned()),
            _ => SlotRef::Team(raw),
        }
    }
}

impl From<SlotRef> for String {
    fn from(slot: SlotRef) -> Self {
        slot.to_string()
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotRef::Team(id) => f.write_str(id),
            SlotRef::WinnerOf(match_id) => write!(f, "{WINNER_PREFIX}{match_id}"),
            SlotRef::Tbd => f.write_str(TBD),
        }
    }
}

/// Which half of a match a slot sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Unscheduled,
    Scheduled,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub round: u32,
    #[serde(rename = "teamAId")]
    pub team_a: SlotRef,
    #[serde(rename = "teamBId")]
    pub team_b: SlotRef,
    #[serde(default)]
    pub sport_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_a: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_b: Option<u32>,
}

impl Match {
    /// A fresh match shell with no venue or time.
    pub fn unscheduled(
        id: impl Into<String>,
        round: u32,
        team_a: SlotRef,
        team_b: SlotRef,
        sport_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            round,
            team_a,
            team_b,
            sport_type: sport_type.into(),
            ..Self::default()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    pub fn slot(&self, side: Side) -> &SlotRef {
        match side {
            Side::A => &self.team_a,
            Side::B => &self.team_b,
        }
    }

    pub fn slot_mut(&mut self, side: Side) -> &mut SlotRef {
        match side {
            Side::A => &mut self.team_a,
            Side::B => &mut self.team_b,
        }
    }

    /// `[start, end)` once both timestamps are assigned.
    pub fn interval(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.start_time.zip(self.end_time)
    }

    /// True when both matches are booked at the same venue with intersecting
    /// half-open intervals. Touching intervals do not overlap.
    pub fn overlaps(&self, other: &Match) -> bool {
        let same_venue = matches!(
            (&self.venue_id, &other.venue_id),
            (Some(a), Some(b)) if a == b
        );
        if !same_venue {
            return false;
        }
        match (self.interval(), other.interval()) {
            (Some((s1, e1)), Some((s2, e2))) => s1 < e2 && s2 < e1,
            _ => false,
        }
    }
}

/// Opening time on a given calendar day.
pub fn opening_time(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + chrono::Duration::hours(i64::from(OPENING_HOUR))
}

/// Closing time on a given calendar day.
pub fn closing_time(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + chrono::Duration::hours(i64::from(CLOSING_HOUR))
}

/// `[start, end)` sits inside a single day's operating window.
pub fn within_operating_hours(start: NaiveDateTime, end: NaiveDateTime) -> bool {
    start < end
        && (OPENING_HOUR..CLOSING_HOUR).contains(&start.hour())
        && end <= closing_time(start.date())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventFormat {
    #[default]
    RoundRobin,
    Knockout,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Scheduled,
    Ongoing,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSettings {
    /// Overrides the configured rest gap between a team's matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_minutes: Option<u32>,
}

/// An event owns its teams and matches; both are always written back
/// together as one document update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub format: EventFormat,
    pub sport_type: String,
    pub start_date: NaiveDate,
    pub duration_days: u32,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub settings: EventSettings,
}

impl Event {
    pub fn approved_teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.iter().filter(|t| t.is_approved())
    }

    pub fn find_match(&self, match_id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    pub fn round_matches(&self, round: u32) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(move |m| m.round == round)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub supported_sports: Vec<String>,
}

impl Venue {
    pub fn supports(&self, sport: &str) -> bool {
        self.supported_sports.iter().any(|s| s.eq_ignore_ascii_case(sport))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sport {
    pub name: String,
    pub default_duration_minutes: u32,
}

// ---------------------------------------------------------------------------
// Bracket: knockout topology only; winners live in the match list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub round_index: u32,
    pub round_name: String,
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub event_id: String,
    pub rounds: Vec<Round>,
}

impl Bracket {
    pub fn round(&self, round_index: u32) -> Option<&Round> {
        self.rounds.iter().find(|r| r.round_index == round_index)
    }

    /// Locate a match: its round and zero-based slot index within that round.
    pub fn position_of(&self, match_id: &str) -> Option<(&Round, usize)> {
        self.rounds.iter().find_map(|round| {
            round
                .matches
                .iter()
                .position(|id| id == match_id)
                .map(|idx| (round, idx))
        })
    }

    pub fn final_match_id(&self) -> Option<&str> {
        self.rounds
            .iter()
            .max_by_key(|r| r.round_index)
            .and_then(|r| r.matches.first())
            .map(String::as_str)
    }
}
