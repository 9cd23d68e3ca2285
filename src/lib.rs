//! Tournament scheduling and bracket progression for campus sports events.
//!
//! Rosters become round-robin or knockout match sets, an external oracle
//! places them on venues and times, and declared winners move through the
//! bracket. Documents live behind [`store::EventStore`]; the oracle sits
//! behind [`oracle::SchedulingOracle`].

pub mod bracket;
pub mod error;
pub mod mutator;
pub mod oracle;
pub mod pairing;
pub mod request;
pub mod scheduler;
pub mod standings;
pub mod state;
pub mod store;

pub use error::{ScheduleError, ScheduleResult};
pub use scheduler::{ScheduleOutcome, Scheduler, WinnerOutcome};
pub use state::settings::SchedulerSettings;
pub use store::{EventStore, MemoryStore};
