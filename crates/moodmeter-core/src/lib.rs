//! # Moodmeter Core Library
//!
//! Core logic for moodmeter, a personal workload and productivity dashboard.
//! Everything is available through the standalone `moodmeter` CLI, which is a
//! thin layer over this library.
//!
//! ## Architecture
//!
//! - **Load scoring**: task weights, the aggregate load and its mood
//!   classification, plus the segments of the stacked load bar
//! - **Flow meter**: completed flow tasks grant flow that decays linearly
//!   over a difficulty-dependent window
//! - **Usage counter**: a wall-clock animator that chases the metered token
//!   and line totals without ever counting backward. The caller drives it by
//!   invoking `tick()`
//! - **Storage**: a JSON document store (plain files or SQLite) and
//!   TOML-based configuration
//! - **Auth**: a single shared secret gating every mutation
//!
//! ## Key Components
//!
//! - [`MoodReport`]: load, mood and bar segments for a task list
//! - [`FlowReport`]: the current flow level
//! - [`CounterAnimator`]: the usage counter state machine
//! - [`Repository`]: typed record access over a [`DocumentStore`]
//! - [`EditBuffer`]: draft/commit editing of the task lists
//! - [`Config`]: application configuration management

pub mod auth;
pub mod counter;
pub mod draft;
pub mod error;
pub mod flow;
pub mod records;
pub mod repository;
pub mod storage;
pub mod usage;
pub mod weight;

pub use auth::{Access, Authorizer};
pub use counter::{CounterAnimator, CounterConfig, CounterFloor, CounterSnapshot, CounterTargets, Phase};
pub use draft::{EditBuffer, TaskPatch};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use flow::FlowReport;
pub use records::{Difficulty, FlowCompletion, FlowState, FlowTask, Level, TagEntry, Task, UsageTotals};
pub use repository::Repository;
pub use storage::{Backend, Config, DocumentStore, FileStore, SqliteStore};
pub use usage::{HttpUsageSource, UsageReading, UsageRefresher, UsageSource};
pub use weight::{Mood, MoodReport, Segment};
