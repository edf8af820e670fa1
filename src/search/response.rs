use super::executor::SearchOutcome;
use super::filters::FilterSet;
use crate::errors::{AppError, Result};
use crate::models::{DataResponse, ListResponse, Pagination, Property};
use crate::store::PropertyStore;

/// `ceil(total / limit)`, zero when there is nothing to page through.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    total / limit + i64::from(total % limit != 0)
}

pub fn list_envelope<T>(rows: Vec<T>, total: i64, page: i64, limit: i64) -> ListResponse<T> {
    ListResponse {
        success: true,
        data: rows,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: total_pages(total, limit),
        },
    }
}

pub fn search_envelope(outcome: SearchOutcome, filters: &FilterSet) -> ListResponse<Property> {
    list_envelope(outcome.rows, outcome.total, filters.page, filters.limit)
}

/// Detail read. Every call counts one view, repeats included.
pub async fn detail<S>(store: &S, id: i32) -> Result<DataResponse<Property>>
where
    S: PropertyStore + ?Sized,
{
    let property = store
        .record_view(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Property {id} not found")))?;
    Ok(DataResponse::new(property))
}
