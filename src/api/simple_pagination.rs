// src/api/simple_pagination.rs
//! Cursor pagination over async closures.

use super::responses::PaginatedResponse;
use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::AppError;

/// Everything collected across pages.
#[derive(Debug)]
pub struct PaginationResult<T> {
    pub items: Vec<T>,
    pub total_fetched: usize,
}

/// Fetches all pages, feeding each `next_cursor` back into `fetch_fn`.
pub async fn fetch_all_pages_simple<T, F, Fut>(
    mut fetch_fn: F,
    max_pages: Option<u32>,
) -> Result<PaginationResult<T>, AppError>
where
    F: FnMut(u32, Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<PaginatedResponse<T>, AppError>>,
{
    let mut all_items = Vec::new();
    let mut cursor = None;
    let mut pages_fetched = 0u32;

    loop {
        if let Some(max) = max_pages {
            if pages_fetched >= max {
                log::debug!("Reached maximum page limit: {}", max);
                break;
            }
        }

        let response = fetch_fn(NOTION_API_PAGE_SIZE as u32, cursor).await?;

        let has_more = response.has_more;
        cursor = response.next_cursor;
        all_items.extend(response.results);
        pages_fetched += 1;

        if !has_more || cursor.is_none() {
            break;
        }
    }

    log::debug!("Fetched {} item(s) over {} page(s)", all_items.len(), pages_fetched);
    Ok(PaginationResult {
        total_fetched: all_items.len(),
        items: all_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn page(results: Vec<u32>, next: Option<&str>) -> PaginatedResponse<u32> {
        PaginatedResponse {
            object: "list".to_string(),
            results,
            has_more: next.is_some(),
            next_cursor: next.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn follows_cursors_until_exhausted() {
        let seen = Mutex::new(Vec::new());
        let result = fetch_all_pages_simple(
            |size, cursor| {
                seen.lock().unwrap().push((size, cursor.clone()));
                async move {
                    Ok(match cursor.as_deref() {
                        None => page(vec![1, 2], Some("c1")),
                        Some("c1") => page(vec![3], Some("c2")),
                        _ => page(vec![4], None),
                    })
                }
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(result.items, vec![1, 2, 3, 4]);
        assert_eq!(result.total_fetched, 4);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (100, None),
                (100, Some("c1".to_string())),
                (100, Some("c2".to_string()))
            ]
        );
    }

    #[tokio::test]
    async fn max_pages_caps_the_walk() {
        let result = fetch_all_pages_simple(
            |_, _| async { Ok(page(vec![9], Some("again"))) },
            Some(1),
        )
        .await
        .unwrap();
        assert_eq!(result.items, vec![9]);
    }
}
