use fixtures_api::{Bracket, Event, EventStatus, Match, Sport, Venue};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tokio::sync::{Mutex, broadcast};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(String),
    Transport(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(what) => write!(f, "Not found: {what}"),
            StoreError::Transport(msg) => write!(f, "Store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// What the scheduler needs from the document store.
///
/// `write_matches` replaces the event's whole match list and status in a
/// single update. There is no version check: two writers racing on the same
/// event resolve as last-writer-wins.
pub trait EventStore: Send + Sync {
    fn read_event(&self, event_id: &str) -> impl Future<Output = StoreResult<Event>> + Send;

    fn read_venues(&self) -> impl Future<Output = StoreResult<Vec<Venue>>> + Send;

    fn read_sports(&self) -> impl Future<Output = StoreResult<Vec<Sport>>> + Send;

    fn read_bracket(&self, event_id: &str) -> impl Future<Output = StoreResult<Option<Bracket>>> + Send;

    fn write_matches(
        &self,
        event_id: &str,
        matches: Vec<Match>,
        status: EventStatus,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Create or replace the bracket document keyed by its event id.
    fn write_bracket(&self, bracket: Bracket) -> impl Future<Output = StoreResult<()>> + Send;

    /// Live updates for one event, starting after the call.
    fn subscribe(&self, event_id: &str) -> EventFeed;
}

/// Change feed for a single event.
#[derive(Debug)]
pub struct EventFeed {
    event_id: String,
    updates: broadcast::Receiver<Event>,
}

impl EventFeed {
    pub fn new(event_id: impl Into<String>, updates: broadcast::Receiver<Event>) -> Self {
        Self { event_id: event_id.into(), updates }
    }

    /// Next snapshot of the event. Returns None once the store is gone.
    /// Snapshots missed by a slow reader are skipped; the next one is always
    /// a full document.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.updates.recv().await {
                Ok(event) if event.id == self.event_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("event feed for {} skipped {skipped} updates", self.event_id);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[derive(Debug, Default)]
struct Documents {
    events: HashMap<String, Event>,
    brackets: HashMap<String, Bracket>,
    venues: Vec<Venue>,
    sports: Vec<Sport>,
}

/// In-process store for tests and embedders without a backing service.
#[derive(Debug)]
pub struct MemoryStore {
    docs: Mutex<Documents>,
    changes: broadcast::Sender<Event>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl MemoryStore {
    pub fn new(venues: Vec<Venue>, sports: Vec<Sport>) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            docs: Mutex::new(Documents { venues, sports, ..Documents::default() }),
            changes,
        }
    }

    pub async fn insert_event(&self, event: Event) {
        let mut docs = self.docs.lock().await;
        docs.events.insert(event.id.clone(), event.clone());
        drop(docs);
        let _ = self.changes.send(event);
    }
}

impl EventStore for MemoryStore {
    async fn read_event(&self, event_id: &str) -> StoreResult<Event> {
        self.docs
            .lock()
            .await
            .events
            .get(event_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))
    }

    async fn read_venues(&self) -> StoreResult<Vec<Venue>> {
        Ok(self.docs.lock().await.venues.clone())
    }

    async fn read_sports(&self) -> StoreResult<Vec<Sport>> {
        Ok(self.docs.lock().await.sports.clone())
    }

    async fn read_bracket(&self, event_id: &str) -> StoreResult<Option<Bracket>> {
        Ok(self.docs.lock().await.brackets.get(event_id).cloned())
    }

    async fn write_matches(
        &self,
        event_id: &str,
        matches: Vec<Match>,
        status: EventStatus,
    ) -> StoreResult<()> {
        let mut docs = self.docs.lock().await;
        let event = docs
            .events
            .get_mut(event_id)
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))?;
        event.matches = matches;
        event.status = status;
        let snapshot = event.clone();
        drop(docs);

        debug!("wrote {} matches for {event_id}", snapshot.matches.len());
        let _ = self.changes.send(snapshot);
        Ok(())
    }

    async fn write_bracket(&self, bracket: Bracket) -> StoreResult<()> {
        let mut docs = self.docs.lock().await;
        docs.brackets.insert(bracket.event_id.clone(), bracket);
        Ok(())
    }

    fn subscribe(&self, event_id: &str) -> EventFeed {
        EventFeed::new(event_id, self.changes.subscribe())
    }
}
