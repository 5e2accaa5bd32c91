use serde::{Deserialize, Serialize};

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    /// Number of items before this page. Saturates instead of overflowing,
    /// so an absurd page number simply lands past the end.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 20 }
    }
}

/// One page of results plus the total number of matching items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            content: Vec::new(),
            page: request.page,
            size: request.size,
            total_elements: 0,
        }
    }

    /// Slice a fully materialized, already ordered list.
    pub fn from_vec(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len() as u64;
        let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let content = items
            .into_iter()
            .skip(skip)
            .take(request.size as usize)
            .collect();
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements: total,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_slices_requested_page() {
        let page = Page::from_vec((0..25).collect::<Vec<_>>(), PageRequest::new(1, 10));
        assert_eq!(page.content, (10..20).collect::<Vec<_>>());
        assert_eq!(page.total_elements, 25);

        let last = Page::from_vec((0..25).collect::<Vec<_>>(), PageRequest::new(2, 10));
        assert_eq!(last.content.len(), 5);

        let past_end = Page::from_vec((0..25).collect::<Vec<_>>(), PageRequest::new(3, 10));
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_huge_page_number_lands_past_the_end() {
        let request = PageRequest::new(u64::MAX / 2, 20);
        assert_eq!(request.offset(), u64::MAX);

        let page = Page::from_vec((0..25).collect::<Vec<_>>(), request);
        assert!(page.is_empty());
        assert_eq!(page.total_elements, 25);
    }
}
