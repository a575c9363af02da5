//! Data access for the event log and user registry.

pub mod job_event_repo;
pub mod user_repo;

pub use job_event_repo::JobEventRepo;
pub use user_repo::UserRepo;
