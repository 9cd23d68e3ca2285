use crate::bracket::{self, Advancement, BracketState};
use crate::error::{ScheduleError, ScheduleResult};
use crate::mutator::{self, Violation};
use crate::oracle::SchedulingOracle;
use crate::pairing;
use crate::request::{self, RequestInputs};
use crate::standings::{self, Standing};
use crate::state::settings::SchedulerSettings;
use crate::store::EventStore;
use chrono::NaiveDateTime;
use fixtures_api::client::OracleClient;
use fixtures_api::{Bracket, Event, EventFormat, EventStatus, Match, SlotRef};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Result of one successful schedule generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOutcome {
    pub event_id: String,
    pub round: u32,
    /// Matches that received a venue and time.
    pub scheduled: usize,
    pub reasoning: String,
    /// Problems found in the oracle's placements. Only non-empty when strict
    /// validation is off.
    pub violations: Vec<Violation>,
    /// Set when this call created the knockout bracket.
    pub bracket: Option<Bracket>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerOutcome {
    pub advancement: Advancement,
    pub event_status: EventStatus,
}

pub struct Scheduler<S, O> {
    store: S,
    oracle: O,
    settings: SchedulerSettings,
}

impl<S: EventStore> Scheduler<S, OracleClient> {
    /// Scheduler talking to the HTTP oracle described by `settings`. A
    /// configured log level becomes the global `log` max level.
    pub fn from_settings(store: S, settings: SchedulerSettings) -> Self {
        if let Some(level) = settings.log_level {
            log::set_max_level(level);
        }
        let oracle = settings.oracle_client();
        Self::new(store, oracle, settings)
    }
}

impl<S: EventStore, O: SchedulingOracle> Scheduler<S, O> {
    pub fn new(store: S, oracle: O, settings: SchedulerSettings) -> Self {
        Self { store, oracle, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub async fn generate_schedule(&self, event_id: &str, round: u32) -> ScheduleResult<ScheduleOutcome> {
        let mut rng = StdRng::from_os_rng();
        self.generate_schedule_with_rng(event_id, round, &mut rng).await
    }

    /// Generate and place one round.
    ///
    /// Round 1 builds the event's whole match set (and the bracket for
    /// knockout events). Later rounds place the existing shells of that
    /// round. Nothing is written unless the oracle returns placements.
    pub async fn generate_schedule_with_rng<R: Rng + Send + ?Sized>(
        &self,
        event_id: &str,
        round: u32,
        rng: &mut R,
    ) -> ScheduleResult<ScheduleOutcome> {
        if round == 0 {
            return Err(ScheduleError::configuration("rounds are numbered from 1"));
        }
        let mut event = self.store.read_event(event_id).await?;
        let venues = self.store.read_venues().await?;
        let sports = self.store.read_sports().await?;

        let new_bracket = if round == 1 {
            self.plan_round_one(&mut event, rng)?
        } else {
            self.check_later_round(&event, round).await?;
            None
        };

        let to_schedule: Vec<Match> = event
            .round_matches(round)
            .filter(|m| !m.is_completed())
            .cloned()
            .collect();
        if to_schedule.is_empty() {
            return Err(ScheduleError::configuration(format!(
                "round {round} of {event_id} has nothing left to schedule"
            )));
        }

        let inputs = RequestInputs {
            venues: &venues,
            sports: &sports,
            default_match_minutes: self.settings.default_match_minutes,
            rest_minutes: self.settings.rest_minutes,
        };
        let request = request::build(&event, round, &to_schedule, inputs)?;

        info!("asking oracle to place {} matches for {event_id} round {round}", to_schedule.len());
        let response = self.oracle.optimize(&request).await?;
        if response.optimized_matches.is_empty() {
            warn!("oracle found no placement for {event_id} round {round}");
            return Err(ScheduleError::Infeasible { reasoning: response.reasoning });
        }

        let mut matches = event.matches;
        let scheduled = mutator::apply_optimized(&mut matches, &response.optimized_matches);
        if scheduled == 0 {
            return Err(ScheduleError::Infeasible { reasoning: response.reasoning });
        }

        let violations = mutator::audit(&matches);
        for violation in &violations {
            warn!("{event_id}: {violation}");
        }
        if self.settings.strict_oracle_validation && !violations.is_empty() {
            let summary: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return Err(ScheduleError::conflict(format!(
                "oracle result rejected: {}",
                summary.join("; ")
            )));
        }

        if let Some(bracket) = &new_bracket {
            self.store.write_bracket(bracket.clone()).await?;
        }
        let status = match event.status {
            EventStatus::Upcoming => EventStatus::Scheduled,
            other => other,
        };
        self.store.write_matches(event_id, matches, status).await?;
        info!("scheduled {scheduled} matches for {event_id} round {round}");

        Ok(ScheduleOutcome {
            event_id: event_id.to_owned(),
            round,
            scheduled,
            reasoning: response.reasoning,
            violations,
            bracket: new_bracket,
        })
    }

    /// Replace the event's match list with a fresh plan for every round.
    fn plan_round_one<R: Rng + ?Sized>(&self, event: &mut Event, rng: &mut R) -> ScheduleResult<Option<Bracket>> {
        if let Some(done) = event.matches.iter().find(|m| m.is_completed()) {
            return Err(ScheduleError::illegal(format!(
                "{} already has results (match {}); round 1 can no longer be regenerated",
                event.id, done.id
            )));
        }
        let roster = request::approved_roster(event)?;

        match event.format {
            EventFormat::RoundRobin => {
                event.matches = pairing::round_robin(&roster)
                    .into_iter()
                    .flat_map(|round| {
                        let (event_id, sport) = (&event.id, &event.sport_type);
                        round.pairs.into_iter().enumerate().map(move |(index, (a, b))| {
                            let id = bracket::match_id(event_id, round.round, index);
                            Match::unscheduled(&id, round.round, SlotRef::Team(a), SlotRef::Team(b), sport)
                        })
                    })
                    .collect();
                debug!("planned {} round-robin matches for {}", event.matches.len(), event.id);
                Ok(None)
            }
            EventFormat::Knockout => {
                let plan = bracket::plan_knockout(&event.id, &event.sport_type, &roster, rng)?;
                event.matches = plan.matches;
                Ok(Some(plan.bracket))
            }
        }
    }

    async fn check_later_round(&self, event: &Event, round: u32) -> ScheduleResult<()> {
        if event.format != EventFormat::Knockout {
            return Ok(());
        }
        let bracket = self.store.read_bracket(&event.id).await?.ok_or_else(|| {
            ScheduleError::configuration(format!(
                "{} has no bracket yet; generate round 1 first",
                event.id
            ))
        })?;
        if bracket.round(round).is_none() {
            return Err(ScheduleError::configuration(format!(
                "the bracket for {} has no round {round}",
                event.id
            )));
        }
        Ok(())
    }

    /// Move one match to a new venue and start time. The end time follows from
    /// the sport's duration.
    pub async fn reschedule_match(
        &self,
        event_id: &str,
        match_id: &str,
        venue_id: &str,
        start: NaiveDateTime,
    ) -> ScheduleResult<Match> {
        let event = self.store.read_event(event_id).await?;
        let venues = self.store.read_venues().await?;
        let sports = self.store.read_sports().await?;

        let current = event
            .find_match(match_id)
            .ok_or_else(|| ScheduleError::configuration(format!("match {match_id} does not exist")))?;
        let venue = venues
            .iter()
            .find(|v| v.id == venue_id)
            .ok_or_else(|| ScheduleError::configuration(format!("venue {venue_id} does not exist")))?;
        if !venue.supports(&current.sport_type) {
            return Err(ScheduleError::configuration(format!(
                "{} does not host {}",
                venue.name, current.sport_type
            )));
        }
        let minutes = request::sport_duration(&sports, &current.sport_type, self.settings.default_match_minutes);

        let mut matches = event.matches;
        mutator::reschedule(&mut matches, match_id, venue_id, start, minutes)?;
        let status = match event.status {
            EventStatus::Upcoming => EventStatus::Scheduled,
            other => other,
        };
        let moved = matches
            .iter()
            .find(|m| m.id == match_id)
            .cloned()
            .ok_or_else(|| ScheduleError::configuration(format!("match {match_id} does not exist")))?;
        self.store.write_matches(event_id, matches, status).await?;
        info!("moved {match_id} to {venue_id} at {start}");
        Ok(moved)
    }

    /// Record a result and feed the winner into the next knockout round.
    pub async fn declare_winner(
        &self,
        event_id: &str,
        match_id: &str,
        winner_team_id: &str,
        scores: Option<(u32, u32)>,
    ) -> ScheduleResult<WinnerOutcome> {
        let event = self.store.read_event(event_id).await?;
        let bracket = match event.format {
            EventFormat::Knockout => Some(self.store.read_bracket(event_id).await?.ok_or_else(|| {
                ScheduleError::configuration(format!("{event_id} has no bracket"))
            })?),
            EventFormat::RoundRobin => None,
        };

        let mut matches = event.matches;
        let advancement = bracket::declare_winner(&mut matches, bracket.as_ref(), match_id, winner_team_id, scores)
            .inspect_err(|e| warn!("rejected result for {match_id}: {e}"))?;

        let finished = match event.format {
            EventFormat::Knockout => advancement.bracket_complete,
            EventFormat::RoundRobin => matches.iter().all(Match::is_completed),
        };
        let event_status = if finished { EventStatus::Completed } else { EventStatus::Ongoing };

        self.store.write_matches(event_id, matches, event_status).await?;
        info!("{winner_team_id} won {match_id}");
        Ok(WinnerOutcome { advancement, event_status })
    }

    pub async fn standings(&self, event_id: &str) -> ScheduleResult<Vec<Standing>> {
        let event = self.store.read_event(event_id).await?;
        if event.format != EventFormat::RoundRobin {
            return Err(ScheduleError::configuration(format!(
                "{event_id} is a knockout event; standings only apply to round-robin"
            )));
        }
        Ok(standings::compute(&event.teams, &event.matches))
    }

    pub async fn bracket_state(&self, event_id: &str) -> ScheduleResult<BracketState> {
        let event = self.store.read_event(event_id).await?;
        let bracket = self.store.read_bracket(event_id).await?;
        Ok(BracketState::of(bracket.as_ref(), &event.matches))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::{EventFeed, MemoryStore, StoreResult};
    use chrono::{Duration, NaiveDate};
    use fixtures_api::client::{ApiError, ApiResult};
    use fixtures_api::oracle::{OptimizedMatch, OracleRequest, OracleResponse};
    use fixtures_api::{MatchStatus, Side, Sport, Team, TeamStatus, Venue, closing_time, opening_time};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Barrier;

    #[derive(Debug, Default, Clone, Copy)]
    pub(crate) enum Mode {
        /// One venue, back to back from the earliest start.
        #[default]
        Sequential,
        /// Every match at the same venue and time.
        Stacked,
        Empty,
        /// Placements for match ids the request never mentioned.
        Strangers,
        Down,
    }

    #[derive(Debug, Default)]
    pub(crate) struct FakeOracle {
        pub mode: Mode,
        pub calls: Mutex<Vec<OracleRequest>>,
    }

    impl FakeOracle {
        pub fn new(mode: Mode) -> Self {
            Self { mode, ..Self::default() }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn place(request: &OracleRequest, stacked: bool) -> Vec<OptimizedMatch> {
            let venue = request.venue_availability.keys().next().cloned().unwrap_or_default();
            let mut start = request.time_constraints.earliest_start_time;
            request
                .matches
                .iter()
                .map(|m| {
                    let minutes = request.sports.get(&m.sport_type).map_or(60, |s| s.default_duration_minutes);
                    let mut end = start + Duration::minutes(i64::from(minutes));
                    if end > closing_time(start.date()) {
                        start = opening_time(start.date().succ_opt().unwrap());
                        end = start + Duration::minutes(i64::from(minutes));
                    }
                    let placed = OptimizedMatch {
                        match_id: m.match_id.clone(),
                        venue_id: venue.clone(),
                        start_time: start,
                        end_time: end,
                    };
                    if !stacked {
                        start = end;
                    }
                    placed
                })
                .collect()
        }
    }

    impl SchedulingOracle for FakeOracle {
        async fn optimize(&self, request: &OracleRequest) -> ApiResult<OracleResponse> {
            self.calls.lock().unwrap().push(request.clone());
            match self.mode {
                Mode::Sequential | Mode::Stacked => Ok(OracleResponse {
                    optimized_matches: Self::place(request, matches!(self.mode, Mode::Stacked)),
                    reasoning: "placed back to back".into(),
                }),
                Mode::Empty => Ok(OracleResponse {
                    optimized_matches: Vec::new(),
                    reasoning: "no venue free on 2025-03-01".into(),
                }),
                Mode::Strangers => Ok(OracleResponse {
                    optimized_matches: Self::place(request, false)
                        .into_iter()
                        .map(|m| OptimizedMatch { match_id: format!("other-{}", m.match_id), ..m })
                        .collect(),
                    reasoning: "placed elsewhere".into(),
                }),
                Mode::Down => Err(ApiError::Other("oracle unavailable".into())),
            }
        }
    }

    pub(crate) fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    pub(crate) fn event(id: &str, format: EventFormat, team_ids: &[&str]) -> Event {
        let mut teams: Vec<Team> = team_ids
            .iter()
            .map(|t| Team { id: (*t).into(), name: t.to_uppercase(), status: TeamStatus::Approved, ..Team::default() })
            .collect();
        teams.push(Team { id: "waitlisted".into(), status: TeamStatus::Pending, ..Team::default() });
        Event {
            id: id.into(),
            name: format!("{id} cup"),
            format,
            sport_type: "football".into(),
            start_date: day(1),
            duration_days: 3,
            teams,
            ..Event::default()
        }
    }

    pub(crate) async fn store_with(event: Event) -> MemoryStore {
        let venues = vec![
            Venue { id: "field-1".into(), name: "North Field".into(), supported_sports: vec!["football".into()] },
            Venue { id: "hall".into(), name: "Sports Hall".into(), supported_sports: vec!["badminton".into()] },
        ];
        let sports = vec![Sport { name: "football".into(), default_duration_minutes: 90 }];
        let store = MemoryStore::new(venues, sports);
        store.insert_event(event).await;
        store
    }

    /// Holds every `read_event` until two readers have their snapshot, once
    /// armed, so concurrent callers act on the same document.
    #[derive(Debug)]
    struct SharedSnapshot {
        inner: MemoryStore,
        armed: AtomicBool,
        gate: Barrier,
    }

    impl SharedSnapshot {
        fn new(inner: MemoryStore) -> Self {
            Self { inner, armed: AtomicBool::new(false), gate: Barrier::new(2) }
        }
    }

    impl EventStore for SharedSnapshot {
        async fn read_event(&self, event_id: &str) -> StoreResult<Event> {
            let event = self.inner.read_event(event_id).await?;
            if self.armed.load(Ordering::SeqCst) {
                self.gate.wait().await;
            }
            Ok(event)
        }

        async fn read_venues(&self) -> StoreResult<Vec<Venue>> {
            self.inner.read_venues().await
        }

        async fn read_sports(&self) -> StoreResult<Vec<Sport>> {
            self.inner.read_sports().await
        }

        async fn read_bracket(&self, event_id: &str) -> StoreResult<Option<Bracket>> {
            self.inner.read_bracket(event_id).await
        }

        async fn write_matches(&self, event_id: &str, matches: Vec<Match>, status: EventStatus) -> StoreResult<()> {
            self.inner.write_matches(event_id, matches, status).await
        }

        async fn write_bracket(&self, bracket: Bracket) -> StoreResult<()> {
            self.inner.write_bracket(bracket).await
        }

        fn subscribe(&self, event_id: &str) -> EventFeed {
            self.inner.subscribe(event_id)
        }
    }

    fn scheduler(store: MemoryStore, mode: Mode) -> Scheduler<MemoryStore, FakeOracle> {
        Scheduler::new(store, FakeOracle::new(mode), SchedulerSettings::default())
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    /// First seed whose round-1 draw keeps `x` and `y` apart.
    fn seed_separating(roster: &[String], x: &str, y: &str) -> u64 {
        (0..256)
            .find(|seed| {
                let pairs = pairing::knockout(roster, &mut StdRng::seed_from_u64(*seed)).unwrap();
                !pairs.iter().any(|(a, b)| (a == x && b == y) || (a == y && b == x))
            })
            .unwrap()
    }

    #[test]
    fn configured_log_level_becomes_the_max_level() {
        let settings = SchedulerSettings { log_level: Some(log::LevelFilter::Trace), ..SchedulerSettings::default() };
        let scheduler = Scheduler::from_settings(MemoryStore::default(), settings);
        assert_eq!(log::max_level(), log::LevelFilter::Trace);
        assert_eq!(scheduler.settings().log_level, Some(log::LevelFilter::Trace));
    }

    #[tokio::test]
    async fn round_robin_plans_every_round_and_places_round_one() {
        let store = store_with(event("league", EventFormat::RoundRobin, &["a", "b", "c", "d"])).await;
        let scheduler = scheduler(store, Mode::Sequential);

        let outcome = scheduler.generate_schedule("league", 1).await.unwrap();
        assert_eq!(outcome.scheduled, 2);
        assert!(outcome.violations.is_empty());
        assert_eq!(outcome.bracket, None);

        let stored = scheduler.store().read_event("league").await.unwrap();
        assert_eq!(stored.status, EventStatus::Scheduled);
        assert_eq!(stored.matches.len(), 6);
        assert!(stored.round_matches(1).all(|m| m.status == MatchStatus::Scheduled));
        assert!(stored.round_matches(2).all(|m| m.status == MatchStatus::Unscheduled));
        assert_eq!(stored.matches[0].start_time, Some(at(1, 8, 0)));
        assert_eq!(stored.matches[0].end_time, Some(at(1, 9, 30)));

        let request = scheduler.oracle.calls.lock().unwrap()[0].clone();
        assert_eq!(request.matches.len(), 2);
        assert_eq!(request.teams, vec!["a", "b", "c", "d"]);
        assert_eq!(scheduler.store().read_bracket("league").await.unwrap(), None);
    }

    #[tokio::test]
    async fn later_round_robin_round_starts_next_day() {
        let store = store_with(event("league", EventFormat::RoundRobin, &["a", "b", "c", "d"])).await;
        let scheduler = scheduler(store, Mode::Sequential);
        scheduler.generate_schedule("league", 1).await.unwrap();
        scheduler.generate_schedule("league", 2).await.unwrap();

        let stored = scheduler.store().read_event("league").await.unwrap();
        let first_of_round_two = stored.round_matches(2).next().unwrap();
        assert_eq!(first_of_round_two.start_time, Some(at(2, 8, 0)));

        let err = scheduler.generate_schedule("league", 4).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Configuration(_)));
    }

    #[tokio::test]
    async fn four_team_knockout_feeds_winners_into_final() {
        let store = store_with(event("cup", EventFormat::Knockout, &["A", "B", "C", "D"])).await;
        let scheduler = scheduler(store, Mode::Sequential);
        let roster: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let seed = seed_separating(&roster, "A", "C");

        let outcome = scheduler
            .generate_schedule_with_rng("cup", 1, &mut StdRng::seed_from_u64(seed))
            .await
            .unwrap();
        let bracket = outcome.bracket.unwrap();
        assert_eq!(bracket.rounds.len(), 2);
        assert_eq!(bracket.rounds[1].round_name, "Final");
        assert_eq!(scheduler.store().read_bracket("cup").await.unwrap().as_ref(), Some(&bracket));
        assert_eq!(scheduler.bracket_state("cup").await.unwrap(), BracketState::Round1Generated);

        let stored = scheduler.store().read_event("cup").await.unwrap();
        assert_eq!(stored.matches.len(), 3);
        let final_id = bracket.rounds[1].matches[0].clone();
        let fin = stored.find_match(&final_id).unwrap();
        assert_eq!(fin.team_a, SlotRef::winner_of(&bracket.rounds[0].matches[0]));
        assert_eq!(fin.team_b, SlotRef::winner_of(&bracket.rounds[0].matches[1]));

        // The Final cannot be decided while both slots are placeholders.
        let err = scheduler.declare_winner("cup", &final_id, "A", None).await.unwrap_err();
        assert!(matches!(err, ScheduleError::IllegalTransition(_)));

        let mut expected = Vec::new();
        for id in &bracket.rounds[0].matches {
            let m = stored.find_match(id).unwrap();
            let winner = [m.slot(Side::A), m.slot(Side::B)]
                .into_iter()
                .filter_map(SlotRef::team_id)
                .find(|t| *t == "A" || *t == "C")
                .unwrap()
                .to_owned();
            let outcome = scheduler.declare_winner("cup", id, &winner, Some((2, 1))).await.unwrap();
            assert_eq!(outcome.event_status, EventStatus::Ongoing);
            expected.push(winner);
        }

        let stored = scheduler.store().read_event("cup").await.unwrap();
        let fin = stored.find_match(&final_id).unwrap();
        assert_eq!(fin.team_a, SlotRef::team(expected[0].as_str()));
        assert_eq!(fin.team_b, SlotRef::team(expected[1].as_str()));
        assert_eq!(fin.status, MatchStatus::Unscheduled);
        let mut finalists = expected.clone();
        finalists.sort();
        assert_eq!(finalists, vec!["A", "C"]);
        assert_eq!(scheduler.bracket_state("cup").await.unwrap(), BracketState::InProgress);

        // Final goes on the day after the last semifinal.
        scheduler.generate_schedule("cup", 2).await.unwrap();
        let stored = scheduler.store().read_event("cup").await.unwrap();
        assert_eq!(stored.find_match(&final_id).unwrap().start_time, Some(at(2, 8, 0)));

        let outcome = scheduler.declare_winner("cup", &final_id, "C", None).await.unwrap();
        assert!(outcome.advancement.bracket_complete);
        assert_eq!(outcome.event_status, EventStatus::Completed);
        assert_eq!(scheduler.bracket_state("cup").await.unwrap(), BracketState::Complete);
    }

    #[tokio::test]
    async fn infeasible_result_writes_nothing() {
        let store = store_with(event("cup", EventFormat::Knockout, &["a", "b", "c", "d"])).await;
        let scheduler = scheduler(store, Mode::Empty);

        let err = scheduler.generate_schedule("cup", 1).await.unwrap_err();
        match err {
            ScheduleError::Infeasible { reasoning } => assert!(reasoning.contains("no venue free")),
            other => panic!("unexpected {other:?}"),
        }
        let stored = scheduler.store().read_event("cup").await.unwrap();
        assert!(stored.matches.is_empty());
        assert_eq!(stored.status, EventStatus::Upcoming);
        assert_eq!(scheduler.store().read_bracket("cup").await.unwrap(), None);
    }

    #[tokio::test]
    async fn placements_for_unknown_matches_are_infeasible() {
        let store = store_with(event("league", EventFormat::RoundRobin, &["a", "b", "c", "d"])).await;
        let scheduler = scheduler(store, Mode::Strangers);

        let err = scheduler.generate_schedule("league", 1).await.unwrap_err();
        match err {
            ScheduleError::Infeasible { reasoning } => assert_eq!(reasoning, "placed elsewhere"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(scheduler.oracle.call_count(), 1);
        let stored = scheduler.store().read_event("league").await.unwrap();
        assert!(stored.matches.is_empty());
        assert_eq!(stored.status, EventStatus::Upcoming);
    }

    #[tokio::test]
    async fn racing_results_keep_only_the_last_write() {
        let store = store_with(event("cup", EventFormat::Knockout, &["A", "B", "C", "D"])).await;
        let scheduler = Scheduler::new(
            SharedSnapshot::new(store),
            FakeOracle::new(Mode::Sequential),
            SchedulerSettings::default(),
        );
        let bracket = scheduler.generate_schedule("cup", 1).await.unwrap().bracket.unwrap();
        let stored = scheduler.store().read_event("cup").await.unwrap();
        let semis: Vec<(String, String)> = bracket.rounds[0]
            .matches
            .iter()
            .map(|id| (id.clone(), stored.find_match(id).unwrap().team_a.team_id().unwrap().to_owned()))
            .collect();

        // Both results are computed from the same snapshot of the event.
        scheduler.store().armed.store(true, Ordering::SeqCst);
        let (first, second) = tokio::join!(
            scheduler.declare_winner("cup", &semis[0].0, &semis[0].1, None),
            scheduler.declare_winner("cup", &semis[1].0, &semis[1].1, None),
        );
        first.unwrap();
        second.unwrap();
        scheduler.store().armed.store(false, Ordering::SeqCst);

        let stored = scheduler.store().read_event("cup").await.unwrap();
        let completed: Vec<&str> = semis
            .iter()
            .filter(|(id, _)| stored.find_match(id).unwrap().is_completed())
            .map(|(id, _)| id.as_str())
            .collect();
        assert_eq!(completed.len(), 1);

        let fin = stored.find_match(&bracket.rounds[1].matches[0]).unwrap();
        let propagated: Vec<&str> = [&fin.team_a, &fin.team_b].into_iter().filter_map(SlotRef::team_id).collect();
        assert_eq!(propagated.len(), 1);
        let kept = semis.iter().find(|(id, _)| id == completed[0]).unwrap();
        assert_eq!(propagated[0], kept.1);
        let lost = semis.iter().find(|(id, _)| id != completed[0]).unwrap();
        assert!([&fin.team_a, &fin.team_b].contains(&&SlotRef::winner_of(&lost.0)));
    }

    #[tokio::test]
    async fn oracle_transport_errors_propagate_unchanged() {
        let store = store_with(event("league", EventFormat::RoundRobin, &["a", "b"])).await;
        let scheduler = scheduler(store, Mode::Down);
        let err = scheduler.generate_schedule("league", 1).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Oracle(ApiError::Other(_))));
        assert!(scheduler.store().read_event("league").await.unwrap().matches.is_empty());
    }

    #[tokio::test]
    async fn configuration_errors_never_reach_the_oracle() {
        let store = store_with(event("solo", EventFormat::RoundRobin, &["a"])).await;
        store.insert_event(event("six", EventFormat::Knockout, &["a", "b", "c", "d", "e", "f"])).await;
        let mut badminton = event("shuttle", EventFormat::RoundRobin, &["a", "b"]);
        badminton.sport_type = "tennis".into();
        store.insert_event(badminton).await;
        let scheduler = scheduler(store, Mode::Sequential);

        for id in ["solo", "six", "shuttle"] {
            let err = scheduler.generate_schedule(id, 1).await.unwrap_err();
            assert!(matches!(err, ScheduleError::Configuration(_)), "{id}: {err}");
        }
        let err = scheduler.generate_schedule("six", 2).await.unwrap_err();
        assert!(err.to_string().contains("no bracket"));
        assert_eq!(scheduler.oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn strict_validation_rejects_overlapping_placements() {
        let store = store_with(event("league", EventFormat::RoundRobin, &["a", "b", "c", "d"])).await;
        let settings = SchedulerSettings { strict_oracle_validation: true, ..SchedulerSettings::default() };
        let strict = Scheduler::new(store, FakeOracle::new(Mode::Stacked), settings);

        let err = strict.generate_schedule("league", 1).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict(_)));
        assert!(strict.store().read_event("league").await.unwrap().matches.is_empty());

        let lenient = scheduler(store_with(event("league", EventFormat::RoundRobin, &["a", "b", "c", "d"])).await, Mode::Stacked);
        let outcome = lenient.generate_schedule("league", 1).await.unwrap();
        assert_eq!(outcome.violations.len(), 1);
    }

    #[tokio::test]
    async fn round_one_cannot_be_regenerated_after_results() {
        let store = store_with(event("league", EventFormat::RoundRobin, &["a", "b", "c", "d"])).await;
        let scheduler = scheduler(store, Mode::Sequential);
        scheduler.generate_schedule("league", 1).await.unwrap();
        scheduler.generate_schedule("league", 1).await.unwrap();
        assert_eq!(scheduler.store().read_event("league").await.unwrap().matches.len(), 6);

        let first = scheduler.store().read_event("league").await.unwrap().matches[0].clone();
        let winner = first.team_a.team_id().unwrap().to_owned();
        scheduler.declare_winner("league", &first.id, &winner, None).await.unwrap();

        let err = scheduler.generate_schedule("league", 1).await.unwrap_err();
        assert!(matches!(err, ScheduleError::IllegalTransition(_)));
    }

    #[tokio::test]
    async fn manual_reschedule_checks_venue_and_overlap() {
        let store = store_with(event("league", EventFormat::RoundRobin, &["a", "b", "c", "d"])).await;
        let scheduler = scheduler(store, Mode::Sequential);
        scheduler.generate_schedule("league", 1).await.unwrap();
        let stored = scheduler.store().read_event("league").await.unwrap();
        let (first, second) = (stored.matches[0].id.clone(), stored.matches[1].id.clone());

        let err = scheduler.reschedule_match("league", &second, "field-1", at(1, 9, 0)).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict(_)));
        let err = scheduler.reschedule_match("league", &second, "hall", at(1, 12, 0)).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Configuration(_)));
        let err = scheduler.reschedule_match("league", &second, "field-1", at(1, 17, 0)).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict(_)));

        let moved = scheduler.reschedule_match("league", &second, "field-1", at(2, 16, 30)).await.unwrap();
        assert_eq!(moved.end_time, Some(at(2, 18, 0)));
        let stored = scheduler.store().read_event("league").await.unwrap();
        assert_eq!(stored.find_match(&second).unwrap().start_time, Some(at(2, 16, 30)));
        assert_eq!(stored.find_match(&first).unwrap().start_time, Some(at(1, 8, 0)));
    }

    #[tokio::test]
    async fn round_robin_completes_when_every_match_is_decided() {
        let store = store_with(event("duel", EventFormat::RoundRobin, &["a", "b", "c"])).await;
        let scheduler = scheduler(store, Mode::Sequential);
        scheduler.generate_schedule("duel", 1).await.unwrap();

        let matches = scheduler.store().read_event("duel").await.unwrap().matches;
        assert_eq!(matches.len(), 3);
        let mut last = None;
        for m in &matches {
            let winner = m.team_a.team_id().unwrap().to_owned();
            last = Some(scheduler.declare_winner("duel", &m.id, &winner, Some((3, 1))).await.unwrap());
        }
        assert_eq!(last.unwrap().event_status, EventStatus::Completed);

        let table = scheduler.standings("duel").await.unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.iter().map(|s| s.played).sum::<u32>(), 6);
        assert_eq!(table.iter().map(|s| s.points).sum::<u32>(), 6);
        assert!(scheduler.standings("missing").await.is_err());
    }
}
