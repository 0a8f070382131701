//! Edit buffers for the task and flow-task lists.
//!
//! Edits never touch the committed list. `begin_edit` snapshots it into a
//! draft, all mutations apply to the draft, and `commit_edit` is the only
//! way the draft reaches storage. A failed save leaves the draft in place
//! so the caller can retry or discard it.

use crate::error::{CoreError, Result};
use crate::records::{Difficulty, FlowTask, Level, Task};

/// Committed value plus an optional in-progress draft.
#[derive(Debug, Clone, Default)]
pub struct EditBuffer<T> {
    committed: T,
    draft: Option<T>,
}

impl<T: Clone> EditBuffer<T> {
    pub fn new(committed: T) -> Self {
        Self {
            committed,
            draft: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn committed(&self) -> &T {
        &self.committed
    }

    pub fn draft(&self) -> Option<&T> {
        self.draft.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    /// The draft while editing, the committed value otherwise.
    pub fn current(&self) -> &T {
        self.draft.as_ref().unwrap_or(&self.committed)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Snapshot the committed value into a fresh draft. An existing draft
    /// is kept.
    pub fn begin_edit(&mut self) -> &mut T {
        self.draft.get_or_insert_with(|| self.committed.clone())
    }

    /// The draft, starting one if necessary.
    pub fn draft_mut(&mut self) -> &mut T {
        self.begin_edit()
    }

    /// Persist the draft through `save` and make it the committed value.
    /// Without a draft this is a no-op that returns `false`.
    pub fn commit_edit<F>(&mut self, save: F) -> Result<bool>
    where
        F: FnOnce(&T) -> Result<()>,
    {
        let Some(draft) = self.draft.as_ref() else {
            return Ok(false);
        };
        save(draft)?;
        if let Some(draft) = self.draft.take() {
            self.committed = draft;
        }
        Ok(true)
    }

    pub fn discard_edit(&mut self) {
        self.draft = None;
    }

    /// Replace the committed value after an external reload. Any draft is
    /// kept.
    pub fn reset_committed(&mut self, committed: T) {
        self.committed = committed;
    }
}

/// Attribute changes for a task; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub label: Option<String>,
    pub tag: Option<String>,
    pub risk: Option<Level>,
    pub urgency: Option<Level>,
    pub importance: Option<Level>,
}

impl TaskPatch {
    pub fn apply(self, task: &mut Task) {
        if let Some(label) = self.label {
            task.label = Some(label);
        }
        if let Some(tag) = self.tag {
            task.tag = tag;
        }
        if let Some(risk) = self.risk {
            task.risk = risk;
        }
        if let Some(urgency) = self.urgency {
            task.urgency = urgency;
        }
        if let Some(importance) = self.importance {
            task.importance = importance;
        }
    }
}

impl EditBuffer<Vec<Task>> {
    /// Append a new task to the draft and return its id.
    pub fn add_task(&mut self, task: Task) -> String {
        let id = task.id.clone();
        self.draft_mut().push(task);
        id
    }

    fn task_index(&self, id: &str) -> Result<usize> {
        self.current()
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::not_found("Task", id))
    }

    /// Patch a task. An unknown id leaves the buffer untouched.
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<&Task> {
        let index = self.task_index(id)?;
        let task = &mut self.draft_mut()[index];
        patch.apply(task);
        Ok(task)
    }

    pub fn remove_task(&mut self, id: &str) -> Result<Task> {
        let index = self.task_index(id)?;
        Ok(self.draft_mut().remove(index))
    }
}

impl EditBuffer<Vec<FlowTask>> {
    pub fn add_flow_task(&mut self, label: impl Into<String>, difficulty: Difficulty) -> String {
        let task = FlowTask::new(label, difficulty);
        let id = task.id.clone();
        self.draft_mut().push(task);
        id
    }

    pub fn remove_flow_task(&mut self, id: &str) -> Result<FlowTask> {
        let index = self
            .current()
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::not_found("Flow task", id))?;
        Ok(self.draft_mut().remove(index))
    }
}
