pub mod jobs;
pub mod mirror;
