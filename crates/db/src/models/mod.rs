//! Row types mapped from the SQLite tables.

pub mod job_event;
pub mod user;
