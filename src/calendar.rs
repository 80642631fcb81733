// Calendar projection of tasks as all-day events

use crate::models::{Category, Task};
use chrono::{Datelike, NaiveDate};

/// All-day event spanning a task's date range
///
/// `end` is exclusive (the day after the due date), the usual convention for
/// all-day calendar events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: i64,
    pub title: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub category: Category,
    pub is_completed: bool,
    pub is_expired: bool,
}

impl CalendarEvent {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.description.clone(),
            start: task.start_date,
            // Saturates on the last representable date
            end: task.due_date.succ_opt().unwrap_or(NaiveDate::MAX),
            category: task.category,
            is_completed: task.is_completed,
            is_expired: task.is_expired,
        }
    }

    /// Inclusive last day, i.e. the task's due date
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(NaiveDate::MIN)
    }

    /// True if the event covers any day in `[from, until)`
    pub fn overlaps(&self, from: NaiveDate, until: NaiveDate) -> bool {
        self.start < until && self.end > from
    }
}

pub fn events(tasks: &[Task]) -> Vec<CalendarEvent> {
    tasks.iter().map(CalendarEvent::from_task).collect()
}

/// Events touching the given month, ordered by start date
///
/// Returns `None` for an invalid month.
pub fn events_in_month(tasks: &[Task], year: i32, month: u32) -> Option<Vec<CalendarEvent>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };

    let mut events: Vec<CalendarEvent> = tasks
        .iter()
        .map(CalendarEvent::from_task)
        .filter(|event| event.overlaps(first, next))
        .collect();
    events.sort_by_key(|event| event.start);
    Some(events)
}

/// Year and month containing `date`
pub fn month_of(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(id: i64, start: NaiveDate, due: NaiveDate) -> Task {
        Task {
            id,
            description: format!("task {}", id),
            start_date: start,
            due_date: due,
            category: Category::Work,
            is_completed: false,
            is_expired: false,
        }
    }

    #[test]
    fn test_event_end_is_exclusive() {
        let event = CalendarEvent::from_task(&task(1, date(2024, 3, 1), date(2024, 3, 3)));
        assert_eq!(event.start, date(2024, 3, 1));
        assert_eq!(event.end, date(2024, 3, 4));
        assert_eq!(event.last_day(), date(2024, 3, 3));
        assert_eq!(event.title, "task 1");
    }

    #[test]
    fn test_event_at_date_limits() {
        let event = CalendarEvent::from_task(&task(1, NaiveDate::MAX, NaiveDate::MAX));
        assert_eq!(event.end, NaiveDate::MAX);

        let event = CalendarEvent::from_task(&task(2, NaiveDate::MIN, NaiveDate::MIN));
        assert_eq!(event.end, NaiveDate::MIN.succ_opt().unwrap());
        assert_eq!(event.last_day(), NaiveDate::MIN);
    }

    #[test]
    fn test_events_in_month() {
        let tasks = vec![
            task(1, date(2024, 3, 20), date(2024, 4, 2)),
            task(2, date(2024, 4, 10), date(2024, 4, 10)),
            task(3, date(2024, 2, 1), date(2024, 3, 31)),
            task(4, date(2024, 4, 5), date(2024, 5, 1)),
            task(5, date(2024, 4, 1), date(2024, 4, 1)),
        ];

        let april = events_in_month(&tasks, 2024, 4).unwrap();
        let ids: Vec<i64> = april.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 5, 4, 2]);

        let december = events_in_month(&tasks, 2024, 12).unwrap();
        assert!(december.is_empty());

        assert!(events_in_month(&tasks, 2024, 13).is_none());
    }

    #[test]
    fn test_events_maps_every_task() {
        let tasks = vec![task(1, date(2024, 1, 1), date(2024, 1, 2)), task(2, date(2024, 1, 3), date(2024, 1, 3))];
        assert_eq!(events(&tasks).len(), 2);
        assert_eq!(month_of(date(2024, 1, 3)), (2024, 1));
    }
}
