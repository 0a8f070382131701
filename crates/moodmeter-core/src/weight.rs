//! Weighted load and mood scoring.
//!
//! Each task attribute level maps to a non-linear weight; a task's weight is
//! the sum over its three attributes and the load is the sum over all tasks.
//! Two independent scales classify the result:
//!
//! - the aggregate mood of the whole load (`< 15` calm, `< 35` busy, else
//!   stress), and
//! - the per-segment color of a single task's weight (`>= 6` stress, `>= 3`
//!   busy, else calm) used by the segmented bar.
//!
//! The scales are deliberately separate; a single maximum-severity task has
//! weight 9.0, which colors its own segment as stress while the aggregate
//! mood stays calm.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::records::{Level, Task};

/// Load at which the mood turns from calm to busy.
pub const BUSY_THRESHOLD: f64 = 15.0;
/// Load at which the mood turns from busy to stress.
pub const STRESS_THRESHOLD: f64 = 35.0;
/// Load that fills the gauge to 100%.
pub const VISUAL_MAX_LOAD: f64 = 50.0;
/// Busy loads above this gauge percentage are labelled "Very Busy".
pub const VERY_BUSY_PERCENT: f64 = 50.0;

/// Segment scale, independent of the aggregate thresholds.
pub const SEGMENT_STRESS_WEIGHT: f64 = 6.0;
pub const SEGMENT_BUSY_WEIGHT: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Calm,
    Busy,
    Stress,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Calm => "calm",
            Mood::Busy => "busy",
            Mood::Stress => "stress",
        }
    }
}

/// Weight contributed by one attribute level.
pub fn level_weight(level: Level) -> f64 {
    match level {
        Level::Low => 0.5,
        Level::Medium => 1.5,
        Level::High => 3.0,
    }
}

/// Weight of a task, in `[1.5, 9.0]`.
pub fn weight(task: &Task) -> f64 {
    level_weight(task.risk) + level_weight(task.urgency) + level_weight(task.importance)
}

/// Aggregate load of a task set; 0 for an empty set.
pub fn load(tasks: &[Task]) -> f64 {
    tasks.iter().map(weight).sum()
}

/// Mood for a given load. Each band includes its lower bound.
pub fn mood(load: f64) -> Mood {
    if load >= STRESS_THRESHOLD {
        Mood::Stress
    } else if load >= BUSY_THRESHOLD {
        Mood::Busy
    } else {
        Mood::Calm
    }
}

/// Load as a gauge percentage, capped at 100.
pub fn load_percent(load: f64) -> f64 {
    (load / VISUAL_MAX_LOAD * 100.0).clamp(0.0, 100.0)
}

/// Display label for a load: the mood name, with busy loads past the
/// halfway mark of the gauge refined to "Very Busy".
pub fn mood_label(load: f64) -> &'static str {
    match mood(load) {
        Mood::Calm => "Calm",
        Mood::Busy if load_percent(load) > VERY_BUSY_PERCENT => "Very Busy",
        Mood::Busy => "Busy",
        Mood::Stress => "Stress",
    }
}

/// Color class of a single segment, on the per-task scale.
pub fn segment_mood(task_weight: f64) -> Mood {
    if task_weight >= SEGMENT_STRESS_WEIGHT {
        Mood::Stress
    } else if task_weight >= SEGMENT_BUSY_WEIGHT {
        Mood::Busy
    } else {
        Mood::Calm
    }
}

/// One task's share of the gauge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub weight: f64,
    pub mood: Mood,
    /// Width of the segment as a share of the visual maximum.
    pub percent: f64,
}

impl Segment {
    fn from_task(task: &Task) -> Self {
        let w = weight(task);
        Self {
            id: task.id.clone(),
            label: task.label.clone(),
            weight: w,
            mood: segment_mood(w),
            percent: w / VISUAL_MAX_LOAD * 100.0,
        }
    }
}

fn by_weight(a: &Segment, b: &Segment) -> Ordering {
    a.weight
        .partial_cmp(&b.weight)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

/// Segments sorted ascending by weight, for the segmented bar.
pub fn bar_segments(tasks: &[Task]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = tasks.iter().map(Segment::from_task).collect();
    segments.sort_by(by_weight);
    segments
}

/// Segments sorted descending by weight, for the task list.
pub fn list_segments(tasks: &[Task]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = tasks.iter().map(Segment::from_task).collect();
    segments.sort_by(|a, b| by_weight(b, a));
    segments
}

/// Everything the presentation layer needs to draw the mood gauge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodReport {
    pub load: f64,
    pub load_percent: f64,
    pub mood: Mood,
    pub label: &'static str,
    pub segments: Vec<Segment>,
}

impl MoodReport {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = load(tasks);
        Self {
            load: total,
            load_percent: load_percent(total),
            mood: mood(total),
            label: mood_label(total),
            segments: bar_segments(tasks),
        }
    }
}
