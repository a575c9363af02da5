//! Producer-side job tracking.
//!
//! [`JobTracker`] is the context object the job-running process holds: it
//! appends events to the log, reconstructs snapshots on demand and relays
//! them to the dashboard observer. The stuck-job sweep and the cached
//! identity lookups are built on top of it.

pub mod identity;
pub mod mirror_client;
pub mod stuck;
pub mod tracker;

pub use identity::IdentityResolver;
pub use mirror_client::{MirrorClient, MirrorError};
pub use stuck::{StuckJobDetector, StuckJobReport};
pub use tracker::JobTracker;
