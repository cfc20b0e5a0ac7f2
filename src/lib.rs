//! Booking priority engine for flight-training sessions.
//!
//! Scores active students by how urgently they need their next session,
//! ranks them for booking, and flags students who have waited too long.
//! The engine itself is pure; [`db`] and [`snapshots`] supply its input.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod priority;
pub mod ranking;
pub mod report;
pub mod snapshots;
pub mod telemetry;
pub mod warning;

pub use config::EngineConfig;
pub use error::PriorityError;
pub use models::{
    PriorityScore, PriorityWeights, ScoreComponents, StudentSnapshot, WaitConfig,
    WaitWarningLevel,
};
pub use priority::ScoreCalculator;
pub use ranking::{rank, RankedStudent, Ranking};
pub use warning::classify;
