use crate::bracket::BracketState;
use crate::scheduler::{ScheduleOutcome, WinnerOutcome};
use crate::standings::Standing;
use chrono::NaiveDateTime;
use fixtures_api::{Event, Match};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerRequest {
    GenerateSchedule {
        event_id: String,
        round: u32,
    },
    RescheduleMatch {
        event_id: String,
        match_id: String,
        venue_id: String,
        start: NaiveDateTime,
    },
    DeclareWinner {
        event_id: String,
        match_id: String,
        winner_team_id: String,
        scores: Option<(u32, u32)>,
    },
    LoadStandings {
        event_id: String,
    },
    LoadBracketState {
        event_id: String,
    },
    /// Forward every later write to this event as `EventUpdated`.
    Watch {
        event_id: String,
    },
}

#[derive(Debug, Clone)]
pub enum SchedulerResponse {
    ScheduleGenerated { outcome: ScheduleOutcome },
    MatchRescheduled { event_id: String, updated: Match },
    WinnerDeclared { event_id: String, outcome: WinnerOutcome },
    StandingsLoaded { event_id: String, standings: Vec<Standing> },
    BracketStateLoaded { event_id: String, state: BracketState },
    Watching { event_id: String },
    /// Full snapshot after a write to a watched event.
    EventUpdated { event: Event },
    Error { message: String },
}
