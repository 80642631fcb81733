// Task store: ordered collection persisted wholesale into a slot

use crate::expiry;
use crate::models::{Task, TaskDraft, TaskEdit, ValidationError, now_ms, validate_range};
use crate::slot::Slot;
use chrono::NaiveDate;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

/// Slot key the collection is stored under
pub const STORAGE_KEY: &str = "todos";

/// Outcome of a create/edit that may be refused by validation
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("{0:#}")]
    Storage(eyre::Report),
}

impl From<eyre::Report> for MutationError {
    fn from(report: eyre::Report) -> Self {
        MutationError::Storage(report)
    }
}

/// Ordered task collection backed by a durable slot
///
/// Every mutation rewrites the whole collection into the slot. Lookups by id
/// are linear; collections are small.
pub struct TaskStore<S: Slot> {
    slot: S,
    tasks: Vec<Task>,
}

impl<S: Slot> TaskStore<S> {
    /// Load the collection from `slot` and derive expiry against `today`
    ///
    /// An absent key opens empty. Malformed content is logged and also opens
    /// empty; it is replaced on the next mutation.
    pub fn open(slot: S, today: NaiveDate) -> Result<Self> {
        let raw = slot.read(STORAGE_KEY).context("Failed to read task storage")?;

        let mut tasks: Vec<Task> = match raw {
            None => Vec::new(),
            Some(json) if json.trim().is_empty() => Vec::new(),
            Some(json) => match serde_json::from_str(&json) {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(key = STORAGE_KEY, error = ?e, "Stored tasks are malformed, starting empty");
                    Vec::new()
                }
            },
        };

        let expired = expiry::refresh_expired(&mut tasks, today);
        info!(count = tasks.len(), expired, "Loaded tasks");

        Ok(Self { slot, tasks })
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    pub fn into_slot(self) -> S {
        self.slot
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a task; the caller guarantees the id is unique
    pub fn add(&mut self, task: Task) -> Result<()> {
        debug!(id = task.id, "add: appending task");
        self.extend(vec![task])
    }

    /// Append several tasks with a single write
    ///
    /// If the write fails the tasks are dropped again, so memory keeps
    /// matching storage.
    pub fn extend(&mut self, tasks: Vec<Task>) -> Result<()> {
        let before = self.tasks.len();
        self.tasks.extend(tasks);
        if let Err(e) = self.persist() {
            warn!(added = self.tasks.len() - before, "Write failed, dropping appended tasks");
            self.tasks.truncate(before);
            return Err(e);
        }
        Ok(())
    }

    /// Validate a draft, assign an id and append it
    pub fn create(&mut self, draft: TaskDraft, today: NaiveDate) -> Result<Task, MutationError> {
        draft.validate(today)?;
        let task = draft.into_task(self.next_id());
        self.add(task.clone())?;
        info!(id = task.id, "Task created");
        Ok(task)
    }

    /// Replace the task with `id` in place
    ///
    /// Unknown ids are a silent no-op; the collection is persisted either way.
    /// Returns whether a task was replaced.
    pub fn update(&mut self, id: i64, task: Task) -> Result<bool> {
        let replaced = match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(entry) => {
                *entry = task;
                true
            }
            None => {
                debug!(id, "update: no task with this id");
                false
            }
        };
        self.persist()?;
        Ok(replaced)
    }

    /// Change description, dates and category; flags are kept
    pub fn edit(&mut self, id: i64, edit: TaskEdit) -> Result<bool, MutationError> {
        edit.validate()?;
        let Some(current) = self.get(id) else {
            self.persist()?;
            return Ok(false);
        };
        let updated = edit.apply(current);
        Ok(self.update(id, updated)?)
    }

    /// Flip the completion flag
    pub fn toggle_completed(&mut self, id: i64) -> Result<bool> {
        let Some(current) = self.get(id) else {
            self.persist()?;
            return Ok(false);
        };
        let updated = Task {
            is_completed: !current.is_completed,
            ..current.clone()
        };
        self.update(id, updated)
    }

    /// Apply a calendar drag or resize; `end` is exclusive
    pub fn reschedule(&mut self, id: i64, start: NaiveDate, end: NaiveDate) -> Result<bool, MutationError> {
        // An exclusive end at the earliest date leaves no day to cover
        let Some(due) = end.pred_opt() else {
            return Err(ValidationError::DueBeforeStart { start, due: end }.into());
        };
        validate_range(start, due)?;
        let Some(current) = self.get(id) else {
            self.persist()?;
            return Ok(false);
        };
        let updated = Task {
            start_date: start,
            due_date: due,
            ..current.clone()
        };
        Ok(self.update(id, updated)?)
    }

    /// Remove the task with `id`
    ///
    /// Unknown ids are a silent no-op; the collection is persisted either way.
    pub fn delete(&mut self, id: i64) -> Result<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;
        if !removed {
            debug!(id, "delete: no task with this id");
        }
        self.persist()?;
        Ok(removed)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// Millisecond timestamp, bumped past the largest id already held
    pub fn next_id(&self) -> i64 {
        let now = now_ms();
        match self.tasks.iter().map(|t| t.id).max() {
            Some(max) if max >= now => max + 1,
            _ => now,
        }
    }

    fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.tasks).context("Failed to serialize tasks")?;
        self.slot.write(STORAGE_KEY, &json).context("Failed to write task storage")?;
        debug!(count = self.tasks.len(), "Persisted tasks");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::slot::testing::FailingSlot;
    use crate::slot::{FileSlot, MemorySlot};
    use chrono::Duration;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 6, 15)
    }

    fn task(id: i64, description: &str, due: NaiveDate) -> Task {
        Task {
            id,
            description: description.to_string(),
            start_date: due - Duration::days(1),
            due_date: due,
            category: Category::Work,
            is_completed: false,
            is_expired: false,
        }
    }

    fn stored(store: &TaskStore<MemorySlot>) -> Vec<Task> {
        serde_json::from_str(store.slot().get(STORAGE_KEY).unwrap()).unwrap()
    }

    #[test]
    fn test_open_empty_slot() {
        let store = TaskStore::open(MemorySlot::new(), today()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_open_malformed_storage_fails_soft() {
        let slot = MemorySlot::new().with(STORAGE_KEY, "{not json");
        let store = TaskStore::open(slot, today()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_open_derives_expiry() {
        let tasks = vec![
            task(1, "old", today() - Duration::days(1)),
            task(2, "current", today()),
        ];
        let slot = MemorySlot::new().with(STORAGE_KEY, &serde_json::to_string(&tasks).unwrap());

        let store = TaskStore::open(slot, today()).unwrap();

        assert!(store.get(1).unwrap().is_expired);
        assert!(!store.get(2).unwrap().is_expired);
    }

    #[test]
    fn test_add_then_delete() {
        let mut store = TaskStore::open(MemorySlot::new(), today()).unwrap();

        store.add(task(1, "first", today())).unwrap();
        store.add(task(2, "second", today())).unwrap();
        assert_eq!(stored(&store).len(), 2);

        assert!(store.delete(1).unwrap());

        assert!(!store.contains(1));
        let persisted = stored(&store);
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].id, 2);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let mut store = TaskStore::open(MemorySlot::new(), today()).unwrap();
        store.add(task(1, "first", today())).unwrap();

        assert!(!store.delete(99).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_in_place_and_idempotent() {
        let mut store = TaskStore::open(MemorySlot::new(), today()).unwrap();
        store.add(task(1, "first", today())).unwrap();
        store.add(task(2, "second", today())).unwrap();
        store.add(task(3, "third", today())).unwrap();

        let replacement = Task {
            description: "second, revised".to_string(),
            is_completed: true,
            ..task(2, "second", today())
        };

        assert!(store.update(2, replacement.clone()).unwrap());
        let once = stored(&store);
        assert!(store.update(2, replacement.clone()).unwrap());
        let twice = stored(&store);

        assert_eq!(once, twice);
        assert_eq!(store.tasks()[1], replacement);
        assert_eq!(store.tasks().iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let mut store = TaskStore::open(MemorySlot::new(), today()).unwrap();
        store.add(task(1, "first", today())).unwrap();

        assert!(!store.update(5, task(5, "ghost", today())).unwrap());
        assert_eq!(store.len(), 1);
        assert!(!store.contains(5));
    }

    #[test]
    fn test_create_validates_and_assigns_ids() {
        let mut store = TaskStore::open(MemorySlot::new(), today()).unwrap();

        let draft = TaskDraft {
            description: "  Plan trip ".to_string(),
            start_date: today(),
            due_date: today() + Duration::days(3),
            category: Category::Personal,
        };
        let first = store.create(draft.clone(), today()).unwrap();
        let second = store.create(draft.clone(), today()).unwrap();

        assert_eq!(first.description, "Plan trip");
        assert!(!first.is_completed);
        assert!(!first.is_expired);
        assert_ne!(first.id, second.id);

        let bad = TaskDraft {
            start_date: today() - Duration::days(1),
            ..draft
        };
        let err = store.create(bad, today()).unwrap_err();
        assert!(matches!(err, MutationError::Invalid(ValidationError::StartInPast { .. })));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_edit_keeps_flags() {
        let mut store = TaskStore::open(MemorySlot::new(), today()).unwrap();
        let mut original = task(1, "first", today());
        original.is_completed = true;
        store.add(original.clone()).unwrap();

        let mut edit = TaskEdit::from_task(&original);
        edit.description = "renamed".to_string();
        edit.category = Category::Urgent;
        assert!(store.edit(1, edit).unwrap());

        let edited = store.get(1).unwrap();
        assert_eq!(edited.description, "renamed");
        assert_eq!(edited.category, Category::Urgent);
        assert!(edited.is_completed);

        let mut inverted = TaskEdit::from_task(edited);
        inverted.due_date = inverted.start_date - Duration::days(1);
        assert!(matches!(
            store.edit(1, inverted),
            Err(MutationError::Invalid(ValidationError::DueBeforeStart { .. }))
        ));
    }

    #[test]
    fn test_toggle_completed() {
        let mut store = TaskStore::open(MemorySlot::new(), today()).unwrap();
        store.add(task(1, "first", today())).unwrap();

        assert!(store.toggle_completed(1).unwrap());
        assert!(store.get(1).unwrap().is_completed);
        assert!(store.toggle_completed(1).unwrap());
        assert!(!store.get(1).unwrap().is_completed);
        assert!(!store.toggle_completed(42).unwrap());
    }

    #[test]
    fn test_reschedule_uses_exclusive_end() {
        let mut store = TaskStore::open(MemorySlot::new(), today()).unwrap();
        store.add(task(1, "first", today())).unwrap();

        assert!(store.reschedule(1, date(2024, 7, 1), date(2024, 7, 4)).unwrap());
        let moved = store.get(1).unwrap();
        assert_eq!(moved.start_date, date(2024, 7, 1));
        assert_eq!(moved.due_date, date(2024, 7, 3));
        assert_eq!(moved.description, "first");

        // An empty range would put the due date before the start
        assert!(store.reschedule(1, date(2024, 7, 1), date(2024, 7, 1)).is_err());

        let err = store.reschedule(1, NaiveDate::MIN, NaiveDate::MIN).unwrap_err();
        assert!(matches!(err, MutationError::Invalid(ValidationError::DueBeforeStart { .. })));
        assert_eq!(store.get(1).unwrap().due_date, date(2024, 7, 3));
    }

    #[test]
    fn test_extend_writes_once() {
        let mut store = TaskStore::open(FailingSlot::new(1), today()).unwrap();

        store
            .extend(vec![task(1, "a", today()), task(2, "b", today()), task(3, "c", today())])
            .unwrap();

        assert_eq!(store.len(), 3);
        let stored: Vec<Task> = serde_json::from_str(store.slot().inner.get(STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[test]
    fn test_failed_write_drops_appended_tasks() {
        let mut store = TaskStore::open(FailingSlot::new(1), today()).unwrap();
        store.add(task(1, "kept", today())).unwrap();

        assert!(store.extend(vec![task(2, "b", today()), task(3, "c", today())]).is_err());
        assert!(store.add(task(4, "d", today())).is_err());

        assert_eq!(store.len(), 1);
        assert!(store.contains(1));
        let stored: Vec<Task> = serde_json::from_str(store.slot().inner.get(STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(stored, store.tasks());
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let temp = TempDir::new().unwrap();

        {
            let slot = FileSlot::open(temp.path()).unwrap();
            let mut store = TaskStore::open(slot, today()).unwrap();
            store.add(task(1, "first", today())).unwrap();
            store.add(task(2, "second", today() + Duration::days(1))).unwrap();
            store.delete(1).unwrap();
        }

        let slot = FileSlot::open(temp.path()).unwrap();
        let store = TaskStore::open(slot, today() + Duration::days(3)).unwrap();
        assert_eq!(store.len(), 1);
        let remaining = store.get(2).unwrap();
        assert_eq!(remaining.description, "second");
        assert!(remaining.is_expired);
    }
}
