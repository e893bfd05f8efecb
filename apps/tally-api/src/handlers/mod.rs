//! HTTP handlers, one module per resource group.

use serde::Deserialize;

pub mod catalog;
pub mod customers;
pub mod health;
pub mod inventory;
pub mod sales;

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 200;

/// `?limit=&offset=` paging for list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert_eq!(Page::default().limit(), 50);
        let huge = Page {
            limit: Some(10_000),
            offset: Some(20),
        };
        assert_eq!(huge.limit(), 200);
        assert_eq!(huge.offset(), 20);
        assert_eq!(Page { limit: Some(0), offset: None }.limit(), 1);
    }
}
