// todolist - to-do list manager with durable local storage and Excel import/export

pub mod calendar;
pub mod config;
pub mod expiry;
pub mod filter;
pub mod models;
pub mod slot;
pub mod store;
pub mod transfer;

// Re-export main types for convenience
pub use config::Config;
pub use filter::{CategoryFilter, ListView, Page, PageError, PageSize, SortOrder};
pub use models::{Category, Task, TaskDraft, TaskEdit, ValidationError, now_ms};
pub use slot::{FileSlot, MemorySlot, Slot, SqliteSlot};
pub use store::{MutationError, STORAGE_KEY, TaskStore};
pub use transfer::{ImportError, ImportReport};
