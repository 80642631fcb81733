// Expiry derivation

use crate::models::Task;
use chrono::NaiveDate;

/// A task is expired once its due date is yesterday or earlier
pub fn is_expired(due_date: NaiveDate, today: NaiveDate) -> bool {
    due_date < today
}

/// Recompute `is_expired` across the collection.
///
/// Only called when a store is opened; the flag is a snapshot and does not
/// follow the clock during a session. Returns how many tasks are expired.
pub fn refresh_expired(tasks: &mut [Task], today: NaiveDate) -> usize {
    let mut expired = 0;
    for task in tasks.iter_mut() {
        task.is_expired = is_expired(task.due_date, today);
        if task.is_expired {
            expired += 1;
        }
    }
    expired
}
