//! Domain core of jobtrace.
//!
//! Everything here is free of I/O: the event model, the status state
//! machine, the reconstruction engine that derives a [`JobSnapshot`] from a
//! job's events, the stuck-job predicate, and two small concurrency
//! helpers (a TTL cache and a fetch deduplicator) shared by the services.

pub mod cache;
pub mod dedup;
pub mod error;
pub mod event;
pub mod hashing;
pub mod metadata;
pub mod mirror;
pub mod reconstruct;
pub mod snapshot;
pub mod status;
pub mod stuck;
pub mod types;

pub use event::{EventData, JobEvent, NewJobEvent, Step};
pub use metadata::Metadata;
pub use mirror::{LiveMessage, LiveMessageType, PushResponse, RejectReason};
pub use reconstruct::reconstruct;
pub use snapshot::{JobSnapshot, JobType};
pub use status::JobStatus;
