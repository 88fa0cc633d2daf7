use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 500;

/// 1-based page request. `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    /// A single page large enough to hold every row.
    pub fn unpaginated() -> Self {
        Self {
            page: 1,
            page_size: u64::MAX,
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Zero-based index, as expected by sea-orm paginators.
    pub fn page_index(&self) -> u64 {
        self.page.max(1) - 1
    }

    pub fn is_unpaginated(&self) -> bool {
        self.page_size == u64::MAX
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub num_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let page_size = if request.is_unpaginated() {
            total.max(1)
        } else {
            request.page_size()
        };
        Self {
            items,
            total,
            page: request.page_index() + 1,
            page_size,
            num_pages: total.div_ceil(page_size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            num_pages: self.num_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_counts() {
        let page = Page::new(vec![1, 2], 5, PageRequest::new(3, 2));
        assert_eq!(page.page, 3);
        assert_eq!(page.num_pages, 3);

        let empty: Page<i32> = Page::new(vec![], 0, PageRequest::default());
        assert_eq!(empty.num_pages, 0);
    }

    #[test]
    fn test_request_clamps() {
        assert_eq!(PageRequest::new(0, 0).page_index(), 0);
        assert_eq!(PageRequest::new(1, 0).page_size(), 1);
        assert_eq!(PageRequest::new(1, 10_000).page_size(), MAX_PAGE_SIZE);
    }
}
