// Filter, sort and paginate pipeline for the task list view

use crate::models::{Category, Task};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Category selector; exactly one mode is active at a time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(Category),
    Completed,
    Incomplete,
    Expired,
}

impl CategoryFilter {
    /// Selector values in the order they are offered
    pub const CHOICES: [CategoryFilter; 7] = [
        CategoryFilter::All,
        CategoryFilter::Category(Category::Work),
        CategoryFilter::Category(Category::Personal),
        CategoryFilter::Category(Category::Urgent),
        CategoryFilter::Completed,
        CategoryFilter::Incomplete,
        CategoryFilter::Expired,
    ];

    pub fn matches(self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(category) => task.category == category,
            CategoryFilter::Completed => task.is_completed,
            CategoryFilter::Incomplete => !task.is_completed,
            CategoryFilter::Expired => task.is_expired,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "All"),
            CategoryFilter::Category(category) => write!(f, "{}", category),
            CategoryFilter::Completed => write!(f, "Completed"),
            CategoryFilter::Incomplete => write!(f, "Incomplete"),
            CategoryFilter::Expired => write!(f, "Expired"),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(CategoryFilter::All),
            "work" => Ok(CategoryFilter::Category(Category::Work)),
            "personal" => Ok(CategoryFilter::Category(Category::Personal)),
            "urgent" => Ok(CategoryFilter::Category(Category::Urgent)),
            "completed" => Ok(CategoryFilter::Completed),
            "incomplete" => Ok(CategoryFilter::Incomplete),
            "expired" => Ok(CategoryFilter::Expired),
            _ => Err(format!(
                "unknown category filter '{}' (expected one of: All, Work, Personal, Urgent, Completed, Incomplete, Expired)",
                s
            )),
        }
    }
}

/// Due-date sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggle(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Allowed page sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum PageSize {
    #[default]
    Five,
    Ten,
    Fifteen,
    Twenty,
}

impl PageSize {
    pub fn get(self) -> usize {
        match self {
            PageSize::Five => 5,
            PageSize::Ten => 10,
            PageSize::Fifteen => 15,
            PageSize::Twenty => 20,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(PageSize::Five),
            10 => Ok(PageSize::Ten),
            15 => Ok(PageSize::Fifteen),
            20 => Ok(PageSize::Twenty),
            other => Err(format!("invalid page size {} (expected 5, 10, 15 or 20)", other)),
        }
    }
}

impl From<PageSize> for usize {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: usize = s.trim().parse().map_err(|_| format!("invalid page size '{}'", s))?;
        PageSize::try_from(value)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("page {page} is out of range (1..={page_count})")]
    OutOfRange { page: usize, page_count: usize },
}

/// One slice of the filtered, sorted list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a> {
    pub items: Vec<&'a Task>,
    /// 1-based
    pub page: usize,
    pub page_count: usize,
    /// Matches across all pages
    pub total: usize,
}

/// Case-insensitive substring match on the description
pub fn matches_query(task: &Task, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    task.description.to_lowercase().contains(&query.to_lowercase())
}

pub fn filter<'a>(tasks: &'a [Task], query: &str, selector: CategoryFilter) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| matches_query(task, query) && selector.matches(task))
        .collect()
}

/// Stable sort on due date; ties keep collection order in both directions
pub fn sort_by_due(tasks: &mut [&Task], order: SortOrder) {
    match order {
        SortOrder::Asc => tasks.sort_by(|a, b| a.due_date.cmp(&b.due_date)),
        SortOrder::Desc => tasks.sort_by(|a, b| b.due_date.cmp(&a.due_date)),
    }
}

pub fn page_count(total: usize, page_size: PageSize) -> usize {
    total.div_ceil(page_size.get())
}

/// Slice out page `page` (1-based)
///
/// Page 1 of an empty list is an empty page; any other page outside
/// `1..=page_count` is rejected.
pub fn paginate<'a>(items: Vec<&'a Task>, page_size: PageSize, page: usize) -> Result<Page<'a>, PageError> {
    let total = items.len();
    let page_count = page_count(total, page_size);
    if page == 0 || page > page_count.max(1) {
        return Err(PageError::OutOfRange { page, page_count });
    }

    let start = (page - 1) * page_size.get();
    let items = items.into_iter().skip(start).take(page_size.get()).collect();

    Ok(Page {
        items,
        page,
        page_count,
        total,
    })
}

/// State behind the task list: search text, selector, sort and paging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    search: String,
    selector: CategoryFilter,
    sort: SortOrder,
    page_size: PageSize,
    page: usize,
}

impl Default for ListView {
    fn default() -> Self {
        Self::new(PageSize::default(), SortOrder::default())
    }
}

impl ListView {
    pub fn new(page_size: PageSize, sort: SortOrder) -> Self {
        Self {
            search: String::new(),
            selector: CategoryFilter::All,
            sort,
            page_size,
            page: 1,
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn selector(&self) -> CategoryFilter {
        self.selector
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Search text changes keep the current page
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn set_selector(&mut self, selector: CategoryFilter) {
        self.selector = selector;
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.page = 1;
    }

    pub fn toggle_sort(&mut self) {
        self.sort = self.sort.toggle();
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    /// Move to `page` given `total` matching tasks; out-of-range moves are refused
    pub fn go_to(&mut self, page: usize, total: usize) -> Result<(), PageError> {
        let page_count = page_count(total, self.page_size);
        if page == 0 || page > page_count {
            debug!(page, page_count, "Refusing page change");
            return Err(PageError::OutOfRange { page, page_count });
        }
        self.page = page;
        Ok(())
    }

    pub fn next(&mut self, total: usize) -> Result<(), PageError> {
        self.go_to(self.page + 1, total)
    }

    pub fn prev(&mut self, total: usize) -> Result<(), PageError> {
        self.go_to(self.page.saturating_sub(1), total)
    }

    /// Number of tasks matching the current search and selector
    pub fn count_matching(&self, tasks: &[Task]) -> usize {
        tasks
            .iter()
            .filter(|task| matches_query(task, &self.search) && self.selector.matches(task))
            .count()
    }

    /// Filter, sort and slice `tasks`
    ///
    /// A stored page beyond the current page count is clamped to the last page.
    pub fn render<'a>(&self, tasks: &'a [Task]) -> Page<'a> {
        let mut matching = filter(tasks, &self.search, self.selector);
        sort_by_due(&mut matching, self.sort);

        let page = self.page.clamp(1, page_count(matching.len(), self.page_size).max(1));
        let total = matching.len();
        paginate(matching, self.page_size, page).unwrap_or(Page {
            items: Vec::new(),
            page,
            page_count: page_count(total, self.page_size),
            total,
        })
    }
}
