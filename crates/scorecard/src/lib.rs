pub mod accounts;
pub mod api;
pub mod config;
pub mod error;
pub mod evaluations;
pub mod rubric;
pub mod scoring;
pub mod store;
pub mod telemetry;

pub use api::{scorecard_router, ScorecardState};
