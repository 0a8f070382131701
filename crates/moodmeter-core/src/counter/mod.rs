//! Animated usage counter (tokens and lines).

mod animator;
mod config;
mod pacing;
mod targets;

pub use animator::{CounterAnimator, CounterFloor, CounterSnapshot, Phase};
pub use config::CounterConfig;
pub use pacing::LinePacer;
pub use targets::CounterTargets;
