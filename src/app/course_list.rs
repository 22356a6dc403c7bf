use crate::models::Course;

use super::Route;
use super::pagination::Paginator;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CourseListState {
    Loading,
    Loaded(Vec<Course>),
    Failed(String),
}

/// Catalog screen state: the fetched courses plus a local page index.
#[derive(Debug, Clone)]
pub(crate) struct CourseListView {
    state: CourseListState,
    page: usize,
    paginator: Paginator,
}

impl CourseListView {
    pub(crate) fn new(page_size: usize) -> Self {
        Self {
            state: CourseListState::Loading,
            page: 1,
            paginator: Paginator::new(page_size),
        }
    }

    pub(crate) fn state(&self) -> &CourseListState {
        &self.state
    }

    /// Keeps the current page; a reload does not move the user back to
    /// page one.
    pub(crate) fn apply_loaded(&mut self, courses: Vec<Course>) {
        self.state = CourseListState::Loaded(courses);
    }

    pub(crate) fn apply_failed(&mut self, message: String) {
        self.state = CourseListState::Failed(message);
    }

    pub(crate) fn courses(&self) -> &[Course] {
        match &self.state {
            CourseListState::Loaded(courses) => courses,
            CourseListState::Loading | CourseListState::Failed(_) => &[],
        }
    }

    pub(crate) fn page(&self) -> usize {
        self.page
    }

    pub(crate) fn page_count(&self) -> usize {
        self.paginator.page_count(self.courses().len())
    }

    pub(crate) fn page_items(&self) -> &[Course] {
        self.paginator.page(self.courses(), self.page)
    }

    /// Moves to `page`, clamped to the pages that exist. Returns whether
    /// the page changed.
    pub(crate) fn set_page(&mut self, page: usize) -> bool {
        let last = self.page_count().max(1);
        let target = page.clamp(1, last);
        let changed = target != self.page;
        self.page = target;
        changed
    }

    pub(crate) fn next_page(&mut self) -> bool {
        self.set_page(self.page.saturating_add(1))
    }

    pub(crate) fn prev_page(&mut self) -> bool {
        self.set_page(self.page.saturating_sub(1))
    }

    /// Only the id travels with navigation; the detail screen refetches.
    pub(crate) fn route_for(&self, index_in_page: usize) -> Option<Route> {
        self.page_items()
            .get(index_in_page)
            .map(|course| Route::Course(course.id.clone()))
    }
}
