//! Page-number pagination
//!
//! Atlas listings are paged by `pageNum` (1-based) and `itemsPerPage`, and
//! report a `totalCount`. Traversal stops once `page_num * page_size`
//! covers the reported total; an empty page is not treated as the end.

use std::future::Future;

use oplogwatch_shared::Page;

/// Cursor over page numbers
#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: u32,
    next: Option<u32>,
}

impl Paginator {
    /// A page size of zero is clamped to one
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            next: Some(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Page number to fetch next, or `None` once the total is covered
    pub fn next_page(&self) -> Option<u32> {
        self.next
    }

    /// Record the total count reported by the page just fetched
    pub fn record_total(&mut self, total_count: u64) {
        if let Some(page) = self.next {
            let covered = u64::from(page) * u64::from(self.page_size);
            self.next = if covered >= total_count { None } else { Some(page + 1) };
        }
    }
}

/// Fetch every page and concatenate the results in page order.
///
/// `fetch` is called with `(page_num, page_size)`. The first error aborts
/// the walk and is returned as is.
pub async fn collect_all<T, E, F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut pager = Paginator::new(page_size);
    let mut items = Vec::new();

    while let Some(page_num) = pager.next_page() {
        let page = fetch(page_num, pager.page_size()).await?;
        pager.record_total(page.total_count);
        items.extend(page.results);
    }

    Ok(items)
}
