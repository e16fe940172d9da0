//! The task store: canonical, ordered task collection mirrored to a storage slot.
//!
//! Every mutating method writes the full snapshot through the store's
//! [`TaskStorage`] before returning, whether or not it changed anything.
//! A failed write is logged and remembered, but never fails the mutation:
//! the in-memory collection stays authoritative and the next write
//! overwrites whatever is on disk.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::TaskStorage;
use crate::error::{Error, Result};
use crate::fields::QuadrantType;
use crate::task::Task;

/// Shortest id fragment accepted by [`TaskStore::resolve_task_identifier`].
const MIN_ID_FRAGMENT: usize = 4;

/// Field edits applied by [`TaskStore::update_task`]. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub add_labels: Vec<String>,
    pub remove_labels: Vec<String>,
    pub clear_labels: bool,
}

/// Owns the task collection and its storage slot.
pub struct TaskStore<S: TaskStorage> {
    tasks: Vec<Task>,
    storage: S,
    last_save_error: Option<String>,
}

impl<S: TaskStorage> TaskStore<S> {
    /// Load the collection from `storage`, degrading to empty when the slot
    /// is absent, unreadable or malformed.
    pub fn open(storage: S) -> Self {
        let tasks = match storage.load() {
            Ok(Some(tasks)) => {
                debug!(count = tasks.len(), "Loaded tasks");
                tasks
            }
            Ok(None) => {
                info!("No stored tasks, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load stored tasks, starting empty");
                Vec::new()
            }
        };
        Self {
            tasks,
            storage,
            last_save_error: None,
        }
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Message of the most recent failed write, cleared by the next successful one.
    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    /// Get a task by id.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Tasks filed under `quadrant`, in insertion order. Recomputed on every call.
    pub fn list_by_quadrant(&self, quadrant: QuadrantType) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.quadrant == quadrant).collect()
    }

    /// Create a task in `quadrant`, due 24 hours from now.
    pub fn add_task(&mut self, name: &str, quadrant: QuadrantType) -> Result<Task> {
        self.add_task_at(name, quadrant, Utc::now())
    }

    /// Create a task as if the call happened at `now`.
    pub fn add_task_at(
        &mut self,
        name: &str,
        quadrant: QuadrantType,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        validate_name(name)?;

        let task = Task {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            description: String::new(),
            due_date: default_due_date(now),
            labels: Vec::new(),
            completed: false,
            quadrant,
            created_at: now.timestamp_millis(),
        };
        debug!(id = %task.id, quadrant = quadrant.as_str(), "Adding task");
        self.tasks.push(task.clone());
        self.persist();
        Ok(task)
    }

    /// Remove the task with `id`. Absent ids are a no-op.
    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        let removed = self.position(id).map(|idx| self.tasks.remove(idx));
        self.persist();
        removed
    }

    /// Flip the completion flag of the task with `id`. Absent ids are a no-op.
    pub fn toggle_task(&mut self, id: &str) -> Option<&Task> {
        let idx = self.position(id);
        if let Some(i) = idx {
            let task = &mut self.tasks[i];
            task.completed = !task.completed;
        }
        self.persist();
        idx.map(|i| &self.tasks[i])
    }

    /// Reassign the task with `id` to `target`. Moving to the current quadrant
    /// is a legal write. Absent ids are a no-op.
    pub fn move_task(&mut self, id: &str, target: QuadrantType) -> Option<&Task> {
        let idx = self.position(id);
        if let Some(i) = idx {
            self.tasks[i].quadrant = target;
        }
        self.persist();
        idx.map(|i| &self.tasks[i])
    }

    /// Apply field edits to the task with `id`.
    ///
    /// A replacement name goes through the same validation as
    /// [`add_task`](Self::add_task); on rejection nothing is changed or written.
    pub fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<Option<&Task>> {
        if let Some(name) = update.name.as_deref() {
            validate_name(name)?;
        }

        let idx = self.position(id);
        if let Some(i) = idx {
            let task = &mut self.tasks[i];
            if let Some(name) = update.name {
                task.name = name;
            }
            if let Some(description) = update.description {
                task.description = description;
            }
            if let Some(due) = update.due_date {
                task.due_date = due;
            }
            if update.clear_labels {
                task.labels.clear();
            }
            let removed = split_and_normalise_labels(&update.remove_labels);
            task.labels.retain(|l| !removed.contains(l));
            for label in split_and_normalise_labels(&update.add_labels) {
                if !task.labels.contains(&label) {
                    task.labels.push(label);
                }
            }
        }
        self.persist();
        Ok(idx.map(|i| &self.tasks[i]))
    }

    /// Resolve a task identifier (full id, unique id prefix or suffix, or
    /// exact name) to a task id.
    /// Returns an error if the identifier matches several tasks.
    pub fn resolve_task_identifier(&self, identifier: &str) -> std::result::Result<String, String> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err("Empty task identifier".to_string());
        }
        if let Some(task) = self.get(identifier) {
            return Ok(task.id.clone());
        }

        if identifier.len() >= MIN_ID_FRAGMENT {
            let fragment = identifier.to_lowercase();
            let by_id: Vec<&Task> = self
                .tasks
                .iter()
                .filter(|t| t.id.starts_with(&fragment) || t.id.ends_with(&fragment))
                .collect();
            match by_id.len() {
                0 => {}
                1 => return Ok(by_id[0].id.clone()),
                _ => return Err(ambiguity_message(identifier, &by_id)),
            }
        }

        let lowered = identifier.to_lowercase();
        let by_name: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.name.to_lowercase() == lowered)
            .collect();
        match by_name.len() {
            0 => Err(format!("No task found matching '{}'", identifier)),
            1 => Ok(by_name[0].id.clone()),
            _ => Err(ambiguity_message(identifier, &by_name)),
        }
    }

    fn persist(&mut self) {
        match self.storage.save(&self.tasks) {
            Ok(()) => {
                self.last_save_error = None;
            }
            Err(e) => {
                error!(error = %e, count = self.tasks.len(), "Failed to save tasks");
                self.last_save_error = Some(e.to_string());
            }
        }
    }
}

fn ambiguity_message(identifier: &str, matches: &[&Task]) -> String {
    let mut msg = format!("Multiple tasks match '{}':\n", identifier);
    for task in matches {
        msg.push_str(&format!(
            "  {}: {} ({})\n",
            short_id(&task.id),
            task.name,
            task.quadrant
        ));
    }
    msg.push_str("Please use a longer id instead.");
    msg
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("task name cannot be empty".to_string()));
    }
    Ok(())
}

/// Calendar date (UTC) of the instant 24 hours after `now`.
pub fn default_due_date(now: DateTime<Utc>) -> NaiveDate {
    (now + Duration::hours(24)).date_naive()
}

/// Trailing, random part of an id, used for display.
pub fn short_id(id: &str) -> &str {
    let start = id.len().saturating_sub(8);
    id.get(start..).unwrap_or(id)
}

/// Normalise a label by trimming, lowercasing, and replacing spaces with hyphens.
pub fn normalise_label(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "-")
}

/// Split comma-separated label strings and normalise each one, keeping the
/// first occurrence of duplicates.
pub fn split_and_normalise_labels(inputs: &[String]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            let label = normalise_label(part);
            if !label.is_empty() && !labels.contains(&label) {
                labels.push(label);
            }
        }
    }
    labels
}
