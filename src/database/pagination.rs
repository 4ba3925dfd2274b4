use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }

    pub fn page(&self) -> i64 {
        self.page.filter(|page| *page > 0).unwrap_or(1)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    /// `base_url` is the absolute URL of the listing without a query string.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, query: &PageQuery, base_url: &str) -> Self {
        let page = query.page();
        let limit = query.limit();

        let link = |page: i64| format!("{base_url}?page={page}&limit={limit}");
        let next = (page * limit < total_rows).then(|| link(page + 1));
        let previous = (page > 1).then(|| link(page - 1));

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(PageQuery::default().limit(), DEFAULT_PAGE_SIZE);
        let query = PageQuery {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(query.limit(), MAX_PAGE_SIZE);
        assert_eq!(query.page(), 1);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn links_point_to_neighbouring_pages() {
        let query = PageQuery {
            page: Some(2),
            limit: Some(3),
        };
        let page = PageContext::from_rows(vec![4, 5, 6], 10, &query, "http://host/recipes/");

        assert_eq!(query.offset(), 3);
        assert_eq!(page.count, 10);
        assert_eq!(
            page.next.as_deref(),
            Some("http://host/recipes/?page=3&limit=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://host/recipes/?page=1&limit=3")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let query = PageQuery {
            page: Some(4),
            limit: Some(3),
        };
        let page = PageContext::from_rows(vec![10], 10, &query, "/users/");
        assert!(page.next.is_none());
        assert!(page.previous.is_some());
    }
}
