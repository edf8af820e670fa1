//! Property search: filter collection, predicate compilation, execution and
//! response shaping.

pub mod executor;
pub mod filters;
pub mod predicate;
pub mod response;

pub use executor::{execute, SearchOutcome};
pub use filters::{FilterSet, Paging, QueryParams, SortOrder};
pub use predicate::Predicate;
pub use response::{detail, list_envelope, total_pages};

use crate::errors::Result;
use crate::models::{ListResponse, Property};
use crate::store::PropertyStore;

pub async fn search<S>(store: &S, filters: &FilterSet) -> Result<ListResponse<Property>>
where
    S: PropertyStore + ?Sized,
{
    tracing::info!(
        "🔍 SEARCH REQUEST: page={}, limit={}, sort={}, category={:?}, status={:?}, city={:?}",
        filters.page,
        filters.limit,
        filters.sort,
        filters.category,
        filters.status,
        filters.city
    );

    let predicate = Predicate::compile(filters);
    let outcome = execute(store, &predicate, filters).await?;
    let response = response::search_envelope(outcome, filters);

    tracing::info!(
        "✅ SEARCH COMPLETE: returned {} items, total={}, page={}, total_pages={}",
        response.data.len(),
        response.pagination.total,
        response.pagination.page,
        response.pagination.total_pages
    );

    Ok(response)
}
