use crate::error::{ScheduleError, ScheduleResult};
use crate::pairing;
use fixtures_api::{Bracket, Match, MatchStatus, Round, Side, SlotRef};
use log::debug;
use rand::Rng;

/// Where a bracket is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketState {
    Absent,
    Round1Generated,
    InProgress,
    Complete,
}

impl BracketState {
    /// Derived from the topology plus the winners recorded in the match list.
    pub fn of(bracket: Option<&Bracket>, matches: &[Match]) -> Self {
        let Some(bracket) = bracket.filter(|b| !b.rounds.is_empty()) else {
            return BracketState::Absent;
        };
        let completed = |id: &str| matches.iter().any(|m| m.id == id && m.is_completed());

        if bracket.final_match_id().is_some_and(completed) {
            return BracketState::Complete;
        }
        let any_decided = bracket
            .rounds
            .iter()
            .flat_map(|r| r.matches.iter())
            .any(|id| completed(id.as_str()));
        if any_decided {
            BracketState::InProgress
        } else {
            BracketState::Round1Generated
        }
    }
}

/// Display name for a round by how many teams enter it.
pub fn round_name(teams_in_round: usize) -> String {
    match teams_in_round {
        2 => "Final".to_owned(),
        4 => "Semifinals".to_owned(),
        8 => "Quarterfinals".to_owned(),
        n => format!("Round of {n}"),
    }
}

pub fn match_id(event_id: &str, round: u32, index: usize) -> String {
    format!("{event_id}_r{round}_m{index}")
}

/// A freshly built knockout tree: topology plus every round's match shells.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketPlan {
    pub bracket: Bracket,
    pub matches: Vec<Match>,
}

impl BracketPlan {
    pub fn round_matches(&self, round: u32) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(move |m| m.round == round)
    }
}

/// Build the whole knockout tree for a power-of-two roster.
///
/// Round 1 is drawn at random. Every later round is created now with
/// `winner_<matchId>` slots pointing back at the two feeder matches; nothing
/// in a later round has a venue or time yet.
pub fn plan_knockout<R: Rng + ?Sized>(
    event_id: &str,
    sport_type: &str,
    team_ids: &[String],
    rng: &mut R,
) -> ScheduleResult<BracketPlan> {
    let count = team_ids.len();
    if count < 2 || !count.is_power_of_two() {
        return Err(ScheduleError::configuration(format!(
            "knockout events need a power-of-two number of approved teams (2, 4, 8, …); found {count}"
        )));
    }

    let mut matches = Vec::with_capacity(count - 1);
    let mut rounds = Vec::new();

    let mut previous: Vec<String> = Vec::new();
    for (index, (a, b)) in pairing::knockout(team_ids, rng)?.into_iter().enumerate() {
        let id = match_id(event_id, 1, index);
        matches.push(Match::unscheduled(&id, 1, SlotRef::Team(a), SlotRef::Team(b), sport_type));
        previous.push(id);
    }
    rounds.push(Round {
        round_index: 1,
        round_name: round_name(count),
        matches: previous.clone(),
    });

    let mut round_index = 1;
    while previous.len() > 1 {
        round_index += 1;
        let feeders = previous;
        previous = feeders
            .chunks(2)
            .enumerate()
            .map(|(index, pair)| {
                let id = match_id(event_id, round_index, index);
                let team_a = SlotRef::winner_of(&pair[0]);
                let team_b = pair.get(1).map_or(SlotRef::Tbd, |id| SlotRef::winner_of(id));
                matches.push(Match::unscheduled(&id, round_index, team_a, team_b, sport_type));
                id
            })
            .collect();
        rounds.push(Round {
            round_index,
            round_name: round_name(previous.len() * 2),
            matches: previous.clone(),
        });
    }

    debug!("planned {} knockout rounds for {event_id} ({count} teams)", rounds.len());
    Ok(BracketPlan {
        bracket: Bracket { event_id: event_id.to_owned(), rounds },
        matches,
    })
}

/// Outcome of a successful winner declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advancement {
    pub match_id: String,
    pub winner_team_id: String,
    /// Next-round match and slot that received the winner, if any.
    pub advanced_to: Option<(String, Side)>,
    /// True when the declared match was the bracket's Final.
    pub bracket_complete: bool,
}

/// Record a winner and feed them forward.
///
/// The match at index `i` of round `k` feeds slot A (even `i`) or slot B
/// (odd `i`) of match `i / 2` in round `k + 1`. Pre-existing slots are
/// filled; no match is ever created. Rejected without any change when the
/// match is already completed, an opponent is still unresolved, or the
/// winner is not one of the two teams.
pub fn declare_winner(
    matches: &mut [Match],
    bracket: Option<&Bracket>,
    match_id: &str,
    winner_team_id: &str,
    scores: Option<(u32, u32)>,
) -> ScheduleResult<Advancement> {
    let idx = matches
        .iter()
        .position(|m| m.id == match_id)
        .ok_or_else(|| ScheduleError::illegal(format!("match {match_id} does not exist")))?;

    let current = &matches[idx];
    if current.is_completed() {
        return Err(ScheduleError::illegal(format!(
            "match {match_id} already has a winner"
        )));
    }
    let (Some(a), Some(b)) = (current.team_a.team_id(), current.team_b.team_id()) else {
        return Err(ScheduleError::illegal(format!(
            "match {match_id} is still waiting on an opponent ({} v {})",
            current.team_a, current.team_b
        )));
    };
    if winner_team_id != a && winner_team_id != b {
        return Err(ScheduleError::illegal(format!(
            "{winner_team_id} is not playing in match {match_id}"
        )));
    }

    let target = match bracket.and_then(|b| next_slot(b, match_id)) {
        Some((next_id, side)) => {
            let next_idx = matches.iter().position(|m| m.id == next_id).ok_or_else(|| {
                ScheduleError::configuration(format!(
                    "bracket references match {next_id} which is missing from the event"
                ))
            })?;
            if matches[next_idx].is_completed() {
                return Err(ScheduleError::illegal(format!(
                    "match {next_id} is already decided"
                )));
            }
            Some((next_idx, next_id, side))
        }
        None => None,
    };

    let current = &mut matches[idx];
    current.winner_team_id = Some(winner_team_id.to_owned());
    current.status = MatchStatus::Completed;
    if let Some((score_a, score_b)) = scores {
        current.score_a = Some(score_a);
        current.score_b = Some(score_b);
    }

    let advanced_to = target.map(|(next_idx, next_id, side)| {
        *matches[next_idx].slot_mut(side) = SlotRef::team(winner_team_id);
        debug!("{winner_team_id} advances from {match_id} to {next_id} ({side:?})");
        (next_id, side)
    });

    let bracket_complete = bracket.and_then(Bracket::final_match_id) == Some(match_id);
    Ok(Advancement {
        match_id: match_id.to_owned(),
        winner_team_id: winner_team_id.to_owned(),
        advanced_to,
        bracket_complete,
    })
}

/// The next-round match and slot fed by `match_id`, if it is not the Final.
pub fn next_slot(bracket: &Bracket, match_id: &str) -> Option<(String, Side)> {
    let (round, i) = bracket.position_of(match_id)?;
    let next = bracket.round(round.round_index + 1)?;
    let side = if i % 2 == 0 { Side::A } else { Side::B };
    next.matches.get(i / 2).map(|id| (id.clone(), side))
}
