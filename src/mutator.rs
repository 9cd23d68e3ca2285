use crate::error::{ScheduleError, ScheduleResult};
use chrono::{Duration, NaiveDateTime};
use fixtures_api::oracle::OptimizedMatch;
use fixtures_api::{CLOSING_HOUR, Match, MatchStatus, OPENING_HOUR, within_operating_hours};
use log::warn;
use std::fmt;

/// Copy oracle placements onto the matching placeholders by id.
///
/// Unknown ids and completed matches are skipped. Re-applying the same result
/// leaves the list unchanged. Returns how many matches were placed.
pub fn apply_optimized(matches: &mut [Match], optimized: &[OptimizedMatch]) -> usize {
    let mut applied = 0;
    for placement in optimized {
        let Some(m) = matches.iter_mut().find(|m| m.id == placement.match_id) else {
            warn!("oracle placed unknown match {}", placement.match_id);
            continue;
        };
        if m.is_completed() {
            warn!("oracle tried to move completed match {}", m.id);
            continue;
        }
        m.venue_id = Some(placement.venue_id.clone());
        m.start_time = Some(placement.start_time);
        m.end_time = Some(placement.end_time);
        m.status = MatchStatus::Scheduled;
        applied += 1;
    }
    applied
}

/// Move one match to `venue_id` starting at `start`, lasting `duration_minutes`.
///
/// Rejected when the match is completed, when the slot leaves the
/// [08:00, 18:00) window of its day, or when it overlaps another booking at
/// the same venue in this match list. Nothing changes on rejection.
pub fn reschedule(
    matches: &mut [Match],
    match_id: &str,
    venue_id: &str,
    start: NaiveDateTime,
    duration_minutes: u32,
) -> ScheduleResult<()> {
    let idx = matches
        .iter()
        .position(|m| m.id == match_id)
        .ok_or_else(|| ScheduleError::configuration(format!("match {match_id} does not exist")))?;
    if matches[idx].is_completed() {
        return Err(ScheduleError::illegal(format!(
            "match {match_id} is completed and cannot be moved"
        )));
    }

    let end = start + Duration::minutes(i64::from(duration_minutes));
    if !within_operating_hours(start, end) {
        return Err(ScheduleError::conflict(format!(
            "{} to {} is outside operating hours ({OPENING_HOUR:02}:00-{CLOSING_HOUR:02}:00)",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%H:%M"),
        )));
    }

    let mut candidate = matches[idx].clone();
    candidate.venue_id = Some(venue_id.to_owned());
    candidate.start_time = Some(start);
    candidate.end_time = Some(end);
    candidate.status = MatchStatus::Scheduled;

    if let Some(other) = matches.iter().find(|m| m.id != match_id && m.overlaps(&candidate)) {
        return Err(ScheduleError::conflict(format!(
            "{venue_id} is already booked for match {} at that time",
            other.id
        )));
    }

    matches[idx] = candidate;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    OutsideHours { match_id: String },
    VenueOverlap { venue_id: String, first: String, second: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::OutsideHours { match_id } => {
                write!(f, "match {match_id} is outside operating hours")
            }
            Violation::VenueOverlap { venue_id, first, second } => {
                write!(f, "matches {first} and {second} overlap at {venue_id}")
            }
        }
    }
}

/// Every hour-window breach and same-venue overlap in a match list.
/// Matches without a venue or time are ignored.
pub fn audit(matches: &[Match]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let booked: Vec<&Match> = matches
        .iter()
        .filter(|m| m.venue_id.is_some() && m.interval().is_some())
        .collect();

    for (i, m) in booked.iter().enumerate() {
        if let Some((start, end)) = m.interval()
            && !within_operating_hours(start, end)
        {
            violations.push(Violation::OutsideHours { match_id: m.id.clone() });
        }
        for other in &booked[i + 1..] {
            if m.overlaps(other) {
                violations.push(Violation::VenueOverlap {
                    venue_id: m.venue_id.clone().unwrap_or_default(),
                    first: m.id.clone(),
                    second: other.id.clone(),
                });
            }
        }
    }
    violations
}
