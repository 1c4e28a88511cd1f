//! Page/limit query parameters for list endpoints.

use rocket::form::FromForm;
use serde::Serialize;
use ts_rs::TS;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;
/// Highest page whose offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// Raw `?page=&limit=` query string values.
#[derive(Debug, Default, FromForm)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Normalised page request: `1 <= page <= MAX_PAGE`, `1 <= limit <= MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn info(&self, total: i64) -> PageInfo {
        PageInfo {
            page: self.page,
            limit: self.limit,
            total,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl From<PageQuery> for Page {
    fn from(q: PageQuery) -> Self {
        Self {
            page: q.page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = Page::from(PageQuery { page: None, limit: None });
        assert_eq!(page, Page { page: 1, limit: 20 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let page = Page::from(PageQuery {
            page: Some(0),
            limit: Some(1000),
        });
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, MAX_LIMIT);

        let page = Page::from(PageQuery {
            page: Some(3),
            limit: Some(-5),
        });
        assert_eq!(page.limit, 1);
        assert_eq!(page.offset(), 2);
    }

    #[test]
    fn test_huge_page_keeps_offset_in_range() {
        let page = Page::from(PageQuery {
            page: Some(i64::MAX),
            limit: Some(MAX_LIMIT),
        });
        assert_eq!(page.page, MAX_PAGE);
        assert!(page.offset() > 0);

        let page = Page::from(PageQuery {
            page: Some(i64::MIN),
            limit: None,
        });
        assert_eq!(page.page, 1);
    }
}
