use std::ops::Range;

/// Fixed-size client-side pages, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Paginator {
    page_size: usize,
}

impl Paginator {
    pub(crate) fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub(crate) fn page_size(&self) -> usize {
        self.page_size
    }

    pub(crate) fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }

    /// `[(page-1)*size, min(page*size, total))`; empty when the page is out
    /// of range.
    pub(crate) fn page_range(&self, total: usize, page: usize) -> Range<usize> {
        if page == 0 {
            return 0..0;
        }
        let start = (page - 1).saturating_mul(self.page_size);
        if start >= total {
            return total..total;
        }
        let end = page.saturating_mul(self.page_size).min(total);
        start..end
    }

    pub(crate) fn page<'a, T>(&self, items: &'a [T], page: usize) -> &'a [T] {
        &items[self.page_range(items.len(), page)]
    }
}
