use crate::error::{ScheduleError, ScheduleResult};
use chrono::{Days, NaiveDateTime};
use fixtures_api::oracle::{
    OracleMatch, OracleRequest, SportDuration, TimeConstraints, TimeWindow, VenueAvailability,
};
use fixtures_api::{Event, EventFormat, Match, SlotRef, Sport, Venue, closing_time, opening_time};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Everything the builder reads besides the event itself.
#[derive(Debug, Clone, Copy)]
pub struct RequestInputs<'a> {
    pub venues: &'a [Venue],
    pub sports: &'a [Sport],
    pub default_match_minutes: u32,
    pub rest_minutes: u32,
}

/// Approved team ids in roster order, checked for the event's format.
pub fn approved_roster(event: &Event) -> ScheduleResult<Vec<String>> {
    let roster: Vec<String> = event.approved_teams().map(|t| t.id.clone()).collect();
    if let Some(bad) = roster.iter().find(|id| !SlotRef::is_storable_team_id(id)) {
        return Err(ScheduleError::configuration(format!(
            "team id {bad:?} in {} reads back as a placeholder slot; rename the team",
            event.id
        )));
    }
    if roster.len() < 2 {
        return Err(ScheduleError::configuration(format!(
            "at least 2 approved teams are needed to build a schedule; {} has {}",
            event.id,
            roster.len()
        )));
    }
    if event.format == EventFormat::Knockout && !roster.len().is_power_of_two() {
        return Err(ScheduleError::configuration(format!(
            "knockout events need a power-of-two number of approved teams (2, 4, 8, …); {} has {}",
            event.id,
            roster.len()
        )));
    }
    Ok(roster)
}

/// Venues able to host the event's sport. Never empty.
pub fn qualifying_venues<'a>(event: &Event, venues: &'a [Venue]) -> ScheduleResult<Vec<&'a Venue>> {
    let qualifying: Vec<&Venue> = venues.iter().filter(|v| v.supports(&event.sport_type)).collect();
    if qualifying.is_empty() {
        return Err(ScheduleError::configuration(format!(
            "no venue supports {}",
            event.sport_type
        )));
    }
    Ok(qualifying)
}

/// Match length for a sport, falling back to `default_minutes`.
pub fn sport_duration(sports: &[Sport], sport_type: &str, default_minutes: u32) -> u32 {
    sports
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(sport_type))
        .map(|s| s.default_duration_minutes)
        .filter(|m| *m > 0)
        .unwrap_or(default_minutes)
}

/// Round 1 opens at 08:00 on the start date. Later rounds open at 08:00 on the
/// day after the previous round's last match ends, so every match of the
/// previous round must already have a time.
pub fn earliest_start(event: &Event, round: u32) -> ScheduleResult<NaiveDateTime> {
    if round <= 1 {
        return Ok(opening_time(event.start_date));
    }

    let previous = round - 1;
    let mut latest_end: Option<NaiveDateTime> = None;
    let mut count = 0;
    for m in event.round_matches(previous) {
        count += 1;
        let Some(end) = m.end_time else {
            return Err(ScheduleError::configuration(format!(
                "round {previous} is not fully scheduled yet (match {} has no time)",
                m.id
            )));
        };
        latest_end = Some(latest_end.map_or(end, |cur| cur.max(end)));
    }

    let latest_end = latest_end.ok_or_else(|| {
        ScheduleError::configuration(format!("{} has no matches in round {previous}", event.id))
    })?;
    let next_day = latest_end
        .date()
        .checked_add_days(Days::new(1))
        .ok_or_else(|| ScheduleError::configuration("schedule runs past the calendar"))?;
    debug!("round {round} of {} opens {next_day} after {count} matches", event.id);
    Ok(opening_time(next_day))
}

/// The full oracle envelope for `to_schedule`, which must belong to `round`.
pub fn build(
    event: &Event,
    round: u32,
    to_schedule: &[Match],
    inputs: RequestInputs<'_>,
) -> ScheduleResult<OracleRequest> {
    if event.duration_days == 0 {
        return Err(ScheduleError::configuration(format!(
            "{} has a duration of 0 days",
            event.id
        )));
    }
    let teams = if round <= 1 {
        approved_roster(event)?
    } else {
        event.approved_teams().map(|t| t.id.clone()).collect()
    };
    let venues = qualifying_venues(event, inputs.venues)?;

    let earliest = earliest_start(event, round)?;
    let first_day = earliest.date();
    let days = || (0..u64::from(event.duration_days)).filter_map(|d| first_day.checked_add_days(Days::new(d)));

    let venue_availability = venues
        .iter()
        .map(|venue| {
            let availability = days()
                .map(|day| TimeWindow { start_time: opening_time(day), end_time: closing_time(day) })
                .collect();
            let entry = VenueAvailability {
                availability,
                supported_sports: venue.supported_sports.clone(),
            };
            (venue.id.clone(), entry)
        })
        .collect();

    let latest_end = first_day
        .checked_add_days(Days::new(u64::from(event.duration_days)))
        .map(closing_time)
        .ok_or_else(|| ScheduleError::configuration("schedule runs past the calendar"))?;

    let mut sports: BTreeMap<String, SportDuration> = inputs
        .sports
        .iter()
        .map(|s| (s.name.clone(), SportDuration { default_duration_minutes: s.default_duration_minutes }))
        .collect();
    if !sports.keys().any(|name| name.eq_ignore_ascii_case(&event.sport_type)) {
        warn!(
            "no duration configured for {}; assuming {} minutes",
            event.sport_type, inputs.default_match_minutes
        );
        sports.insert(
            event.sport_type.clone(),
            SportDuration { default_duration_minutes: inputs.default_match_minutes },
        );
    }

    let team_preferences = event
        .approved_teams()
        .filter(|t| !t.preferred_venues.is_empty())
        .map(|t| (t.id.clone(), t.preferred_venues.clone()))
        .collect();

    let matches = to_schedule
        .iter()
        .map(|m| OracleMatch {
            match_id: m.id.clone(),
            team_a_id: m.team_a.to_string(),
            team_b_id: m.team_b.to_string(),
            sport_type: m.sport_type.clone(),
            round: m.round,
        })
        .collect();

    Ok(OracleRequest {
        event_id: event.id.clone(),
        event_format: event.format,
        venue_availability,
        team_preferences,
        time_constraints: TimeConstraints {
            earliest_start_time: earliest,
            latest_end_time: latest_end,
            rest_minutes: event.settings.rest_minutes.unwrap_or(inputs.rest_minutes),
        },
        matches,
        sports,
        teams,
    })
}
