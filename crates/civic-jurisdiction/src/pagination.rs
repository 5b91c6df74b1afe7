//! Page requests and paginated results for scoped listings.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// A requested page. Pages are 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Requested page number; 0 is treated as 1.
    pub page: usize,
    /// Requested page size; `None` uses the configured default.
    pub page_size: Option<usize>,
}

impl Page {
    #[must_use]
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size: Some(page_size),
        }
    }

    /// The first page at the default size.
    #[must_use]
    pub fn first() -> Self {
        Self::default()
    }

    /// Clamp to the configured bounds: page ≥ 1, 1 ≤ size ≤ max.
    #[must_use]
    pub fn clamp(self, config: &EngineConfig) -> Self {
        let size = self
            .page_size
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size);
        Self {
            page: self.page.max(1),
            page_size: Some(size),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// Total number of matching items across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl<T> Paginated<T> {
    /// Slice an already ordered result set according to `page`.
    #[must_use]
    pub fn from_sorted(items: Vec<T>, page: Page, config: &EngineConfig) -> Self {
        let page = page.clamp(config);
        let page_size = page.page_size.unwrap_or(config.default_page_size);
        let total = items.len();
        let total_pages = total.div_ceil(page_size);
        let start = (page.page - 1).saturating_mul(page_size);

        Self {
            items: items.into_iter().skip(start).take(page_size).collect(),
            total,
            page: page.page,
            page_size,
            total_pages,
        }
    }

    /// Transform the items while keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_to_config() {
        let config = EngineConfig::default();

        let page = Page::new(0, 1_000).clamp(&config);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, Some(config.max_page_size));

        let page = Page::first().clamp(&config);
        assert_eq!(page.page_size, Some(config.default_page_size));

        let page = Page::new(2, 0).clamp(&config);
        assert_eq!(page.page_size, Some(1));
    }

    #[test]
    fn test_slices_requested_page() {
        let config = EngineConfig::default();
        let items: Vec<u32> = (1..=25).collect();

        let second = Paginated::from_sorted(items.clone(), Page::new(2, 10), &config);
        assert_eq!(second.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(second.total, 25);
        assert_eq!(second.total_pages, 3);

        let third = Paginated::from_sorted(items.clone(), Page::new(3, 10), &config);
        assert_eq!(third.items, vec![21, 22, 23, 24, 25]);

        let beyond = Paginated::from_sorted(items, Page::new(9, 10), &config);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 25);
    }

    #[test]
    fn test_empty_listing() {
        let page = Paginated::<u32>::from_sorted(Vec::new(), Page::first(), &EngineConfig::default());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Paginated::from_sorted(vec![1, 2, 3], Page::new(1, 2), &EngineConfig::default())
            .map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
    }
}
