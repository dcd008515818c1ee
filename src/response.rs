//! Success-side response envelope.
//!
//! Every successful endpoint answers `{"success": true, "data": ...}`
//! (deletes answer a bare `{"success": true}`), mirroring the error
//! envelope built in `error.rs`.

use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Page of results plus the numbers a client needs to render a pager.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

/// `?page=&pageSize=` query parameters shared by the list endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PageQuery {
    /// 1-based page number, defaulting to the first page.
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, default 10, capped at 100.
    pub fn page_size(&self) -> u64 {
        self.page_size.unwrap_or(10).clamp(1, 100)
    }
}

pub fn page<T>(items: Vec<T>, total: u64, page: u64, page_size: u64) -> Paginated<T> {
    Paginated {
        items,
        total,
        page,
        page_size,
        total_pages: total.div_ceil(page_size),
    }
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "data": data }))
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(json!({ "success": true, "data": data }))
}

pub fn no_content() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_its_inputs() {
        let q = PageQuery {
            page: None,
            page_size: None,
        };
        assert_eq!((q.page(), q.page_size()), (1, 10));

        let q = PageQuery {
            page: Some(0),
            page_size: Some(1000),
        };
        assert_eq!((q.page(), q.page_size()), (1, 100));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(page::<u8>(vec![], 0, 1, 10).total_pages, 0);
        assert_eq!(page::<u8>(vec![], 10, 1, 10).total_pages, 1);
        assert_eq!(page::<u8>(vec![], 11, 1, 10).total_pages, 2);
    }

    #[test]
    fn paginated_serializes_camel_case() {
        let page = Paginated {
            items: vec![1, 2, 3],
            total: 7,
            page: 1,
            page_size: 3,
            total_pages: 3,
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["items"], json!([1, 2, 3]));
        assert_eq!(value["pageSize"], json!(3));
        assert_eq!(value["totalPages"], json!(3));
    }
}
