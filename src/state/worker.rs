use crate::error::ScheduleResult;
use crate::oracle::SchedulingOracle;
use crate::scheduler::Scheduler;
use crate::state::messages::{SchedulerRequest, SchedulerResponse};
use crate::store::EventStore;
use log::{debug, error, info};
use std::collections::HashSet;
use tokio::sync::mpsc;

/// Serves scheduler requests one at a time from a channel, so writes to an
/// event never interleave within one worker.
pub struct SchedulerWorker<S, O> {
    scheduler: Scheduler<S, O>,
    requests: mpsc::Receiver<SchedulerRequest>,
    responses: mpsc::Sender<SchedulerResponse>,
    /// Events with a live forwarder; one per event per worker.
    watched: HashSet<String>,
}

impl<S, O> SchedulerWorker<S, O>
where
    S: EventStore + 'static,
    O: SchedulingOracle + 'static,
{
    pub fn new(
        scheduler: Scheduler<S, O>,
        requests: mpsc::Receiver<SchedulerRequest>,
        responses: mpsc::Sender<SchedulerResponse>,
    ) -> Self {
        Self { scheduler, requests, responses, watched: HashSet::new() }
    }

    /// Runs until the request channel closes or nobody is listening.
    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            debug!("scheduler request: {request:?}");
            let response = self.handle(request).await.unwrap_or_else(|err| {
                error!("{err}");
                SchedulerResponse::Error { message: err.to_string() }
            });

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send scheduler response: {e}");
                break;
            }
        }
        info!("scheduler worker stopped");
    }

    async fn handle(&mut self, request: SchedulerRequest) -> ScheduleResult<SchedulerResponse> {
        match request {
            SchedulerRequest::GenerateSchedule { event_id, round } => {
                let outcome = self.scheduler.generate_schedule(&event_id, round).await?;
                Ok(SchedulerResponse::ScheduleGenerated { outcome })
            }
            SchedulerRequest::RescheduleMatch { event_id, match_id, venue_id, start } => {
                let updated = self
                    .scheduler
                    .reschedule_match(&event_id, &match_id, &venue_id, start)
                    .await?;
                Ok(SchedulerResponse::MatchRescheduled { event_id, updated })
            }
            SchedulerRequest::DeclareWinner { event_id, match_id, winner_team_id, scores } => {
                let outcome = self
                    .scheduler
                    .declare_winner(&event_id, &match_id, &winner_team_id, scores)
                    .await?;
                Ok(SchedulerResponse::WinnerDeclared { event_id, outcome })
            }
            SchedulerRequest::LoadStandings { event_id } => {
                let standings = self.scheduler.standings(&event_id).await?;
                Ok(SchedulerResponse::StandingsLoaded { event_id, standings })
            }
            SchedulerRequest::LoadBracketState { event_id } => {
                let state = self.scheduler.bracket_state(&event_id).await?;
                Ok(SchedulerResponse::BracketStateLoaded { event_id, state })
            }
            SchedulerRequest::Watch { event_id } => {
                self.watch(&event_id);
                Ok(SchedulerResponse::Watching { event_id })
            }
        }
    }

    fn watch(&mut self, event_id: &str) {
        if !self.watched.insert(event_id.to_owned()) {
            debug!("already watching {event_id}");
            return;
        }
        let mut feed = self.scheduler.store().subscribe(event_id);
        let responses = self.responses.clone();
        let event_id = event_id.to_owned();

        tokio::spawn(async move {
            while let Some(event) = feed.next().await {
                if responses.send(SchedulerResponse::EventUpdated { event }).await.is_err() {
                    break;
                }
            }
            debug!("stopped watching {event_id}");
        });
    }
}
