//! Record access over a document store.
//!
//! `Repository` implements the collaborator contracts: public/private task
//! reads, whole-list replacement, tag catalog maintenance with referential
//! integrity, atomic flow-task completion and the cached usage totals.
//!
//! Every mutation requires an authorized [`Access`], validates the complete
//! new document first and only then writes, so nothing is applied partially.
//! Reads that fail transiently fall back to the last document successfully
//! read or written.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::Access;
use crate::counter::CounterFloor;
use crate::error::{CoreError, Result, ValidationError};
use crate::flow::{prune_completions, RETENTION_DAYS};
use crate::records::{FlowCompletion, FlowState, FlowTask, TagEntry, Task, UsageTotals, DEFAULT_TAG};
use crate::storage::{keys, read_typed, write_typed, DocumentStore};

#[derive(Debug, Default)]
struct LastKnownGood {
    tasks: Option<Vec<Task>>,
    tags: Option<Vec<TagEntry>>,
    flow: Option<FlowState>,
    usage: Option<UsageTotals>,
}

/// Typed, authorization-aware access to the stored records.
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    cache: Mutex<LastKnownGood>,
    retention: Duration,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(LastKnownGood::default()),
            retention: Duration::days(RETENTION_DAYS),
        }
    }

    /// Override the completion retention window.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn remember(&self, update: impl FnOnce(&mut LastKnownGood)) {
        if let Ok(mut cache) = self.cache.lock() {
            update(&mut *cache);
        }
    }

    /// Read a document, falling back to the cached copy on failure.
    fn read_or_cached<T: DeserializeOwned + Clone>(
        &self,
        key: &str,
        slot: fn(&mut LastKnownGood) -> &mut Option<T>,
    ) -> Result<Option<T>> {
        match read_typed::<T>(self.store.as_ref(), key) {
            Ok(value) => {
                if let Some(v) = &value {
                    let v = v.clone();
                    self.remember(|c| *slot(c) = Some(v));
                }
                Ok(value)
            }
            Err(err) => {
                let cached = self.cache.lock().ok().and_then(|mut c| slot(&mut *c).clone());
                match cached {
                    Some(v) => {
                        warn!(key, error = %err, "read failed, serving last known good copy");
                        Ok(Some(v))
                    }
                    None => Err(err.into()),
                }
            }
        }
    }

    fn write_and_remember<T: Serialize + Clone>(
        &self,
        key: &str,
        value: &T,
        slot: fn(&mut LastKnownGood) -> &mut Option<T>,
    ) -> Result<()> {
        write_typed(self.store.as_ref(), key, value)?;
        let v = value.clone();
        self.remember(|c| *slot(c) = Some(v));
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// All tasks; labels are stripped unless `access` is authorized.
    pub fn load_tasks(&self, access: Access) -> Result<Vec<Task>> {
        let tasks = self
            .read_or_cached(keys::TASKS, |c| &mut c.tasks)?
            .unwrap_or_default();
        Ok(if access.is_authorized() {
            tasks
        } else {
            tasks.iter().map(Task::public_view).collect()
        })
    }

    /// Replace the whole task list.
    pub fn save_tasks(&self, access: Access, tasks: &[Task]) -> Result<()> {
        access.require()?;
        let tags = self.load_tags()?;
        let known: HashSet<&str> = tags.iter().map(|t| t.value.as_str()).collect();
        let mut ids = HashSet::new();
        for task in tasks {
            if task.id.is_empty() {
                return Err(ValidationError::Empty("task.id").into());
            }
            if !ids.insert(task.id.as_str()) {
                return Err(ValidationError::DuplicateId(task.id.clone()).into());
            }
            if !known.contains(task.tag.as_str()) {
                return Err(ValidationError::UnknownTag {
                    task_id: task.id.clone(),
                    tag: task.tag.clone(),
                }
                .into());
            }
        }
        self.write_and_remember(keys::TASKS, &tasks.to_vec(), |c| &mut c.tasks)?;
        info!(count = tasks.len(), "tasks saved");
        Ok(())
    }

    // ── Tags ─────────────────────────────────────────────────────────

    /// The tag catalog. Until the first tag mutation is written, the catalog
    /// holds only the default `misc` tag.
    pub fn load_tags(&self) -> Result<Vec<TagEntry>> {
        let tags = self
            .read_or_cached(keys::TAGS, |c| &mut c.tags)?
            .unwrap_or_else(|| vec![TagEntry::new(DEFAULT_TAG, "Misc")]);
        Ok(tags)
    }

    pub fn add_tag(&self, access: Access, value: &str, label: &str) -> Result<TagEntry> {
        access.require()?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::Empty("tag.value").into());
        }
        let mut tags = self.load_tags()?;
        if tags.iter().any(|t| t.value == value) {
            return Err(CoreError::Conflict(format!("tag '{value}' already exists")));
        }
        let label = if label.trim().is_empty() { value } else { label.trim() };
        let entry = TagEntry::new(value, label);
        tags.push(entry.clone());
        self.write_and_remember(keys::TAGS, &tags, |c| &mut c.tags)?;
        info!(tag = value, "tag added");
        Ok(entry)
    }

    /// Remove a tag. Rejected while any task references it. The default tag
    /// is never removed, since new tasks are created with it.
    pub fn delete_tag(&self, access: Access, value: &str) -> Result<()> {
        access.require()?;
        let mut tags = self.load_tags()?;
        let Some(index) = tags.iter().position(|t| t.value == value) else {
            return Err(CoreError::not_found("Tag", value));
        };
        if value == DEFAULT_TAG {
            return Err(CoreError::Conflict(format!(
                "tag '{value}' is the default tag and cannot be deleted"
            )));
        }
        let in_use = self
            .load_tasks(Access::Authorized)?
            .iter()
            .filter(|t| t.tag == value)
            .count();
        if in_use > 0 {
            return Err(CoreError::Conflict(format!(
                "tag '{value}' is used by {in_use} task(s)"
            )));
        }
        tags.remove(index);
        self.write_and_remember(keys::TAGS, &tags, |c| &mut c.tags)?;
        info!(tag = value, "tag deleted");
        Ok(())
    }

    // ── Flow ─────────────────────────────────────────────────────────

    pub fn load_flow(&self) -> Result<FlowState> {
        Ok(self
            .read_or_cached(keys::FLOWKEEPER, |c| &mut c.flow)?
            .unwrap_or_default())
    }

    /// Replace the active flow task list, keeping the completion history.
    pub fn save_flow_tasks(&self, access: Access, tasks: &[FlowTask]) -> Result<()> {
        access.require()?;
        let mut ids = HashSet::new();
        for task in tasks {
            if task.id.is_empty() {
                return Err(ValidationError::Empty("flowTask.id").into());
            }
            if !ids.insert(task.id.as_str()) {
                return Err(ValidationError::DuplicateId(task.id.clone()).into());
            }
        }
        let mut state = self.load_flow()?;
        state.tasks = tasks.to_vec();
        self.write_and_remember(keys::FLOWKEEPER, &state, |c| &mut c.flow)?;
        info!(count = tasks.len(), "flow tasks saved");
        Ok(())
    }

    /// Remove the flow task and append its completion in one write.
    pub fn complete_flow_task(
        &self,
        access: Access,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<FlowCompletion> {
        access.require()?;
        let mut state = self.load_flow()?;
        let Some(index) = state.tasks.iter().position(|t| t.id == id) else {
            return Err(CoreError::not_found("Flow task", id));
        };
        let task = state.tasks.remove(index);
        let completion = FlowCompletion {
            difficulty: task.difficulty,
            completed_at: now,
        };
        state.completions.push(completion);
        prune_completions(&mut state.completions, now, self.retention);
        self.write_and_remember(keys::FLOWKEEPER, &state, |c| &mut c.flow)?;
        info!(id, difficulty = ?task.difficulty, "flow task completed");
        Ok(completion)
    }

    /// Drop completions past the retention window. Writes only if something
    /// was removed; safe to call concurrently.
    pub fn prune_flow(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut state = self.load_flow()?;
        let removed = prune_completions(&mut state.completions, now, self.retention);
        if removed > 0 {
            self.write_and_remember(keys::FLOWKEEPER, &state, |c| &mut c.flow)?;
            info!(removed, "expired flow completions pruned");
        }
        Ok(removed)
    }

    // ── Usage ────────────────────────────────────────────────────────

    /// Cheap cached read of the usage totals.
    pub fn poll_usage_totals(&self) -> Result<Option<UsageTotals>> {
        self.read_or_cached(keys::USAGE, |c| &mut c.usage)
    }

    /// Store fresh totals, never lowering either axis.
    pub fn record_usage_totals(&self, access: Access, totals: UsageTotals) -> Result<UsageTotals> {
        access.require()?;
        self.store_usage_totals(totals)
    }

    /// Internal write path for the refresh job; no credential involved.
    pub(crate) fn store_usage_totals(&self, totals: UsageTotals) -> Result<UsageTotals> {
        let merged = match self.poll_usage_totals()? {
            Some(previous) => previous.merge_max(totals),
            None => totals,
        };
        self.write_and_remember(keys::USAGE, &merged, |c| &mut c.usage)?;
        info!(tokens = merged.tokens, lines = merged.lines_of_code, "usage totals stored");
        Ok(merged)
    }

    // ── Counter floor ────────────────────────────────────────────────

    pub fn load_counter_floor(&self) -> Result<Option<CounterFloor>> {
        Ok(read_typed(self.store.as_ref(), keys::COUNTER_FLOOR)?)
    }

    pub fn save_counter_floor(&self, floor: CounterFloor) -> Result<()> {
        write_typed(self.store.as_ref(), keys::COUNTER_FLOOR, &floor)?;
        Ok(())
    }
}
