use std::cmp::Ordering;
use std::time::Instant;

use rust_decimal::Decimal;

use super::filters::{FilterSet, SortOrder};
use super::predicate::Predicate;
use crate::models::Property;
use crate::store::{PropertyStore, StoreResult};

/// Tie-break applied after every primary sort key.
const TIE_BREAK: &str = "created_at DESC, id DESC";

impl SortOrder {
    /// `ORDER BY` body for this sort, tie-break included.
    pub fn order_by(&self) -> String {
        let primary = match self {
            SortOrder::Recent => return TIE_BREAK.to_string(),
            SortOrder::PriceAsc => "COALESCE(sale_price, rent_price) ASC NULLS LAST",
            SortOrder::PriceDesc => "COALESCE(sale_price, rent_price) DESC NULLS LAST",
            SortOrder::AreaAsc => "COALESCE(total_area, built_area) ASC NULLS LAST",
            SortOrder::AreaDesc => "COALESCE(total_area, built_area) DESC NULLS LAST",
        };
        format!("{primary}, {TIE_BREAK}")
    }

    /// In-memory equivalent of [`SortOrder::order_by`].
    pub fn compare(&self, a: &Property, b: &Property) -> Ordering {
        let primary = match self {
            SortOrder::Recent => Ordering::Equal,
            SortOrder::PriceAsc => nulls_last(a.active_price(), b.active_price(), false),
            SortOrder::PriceDesc => nulls_last(a.active_price(), b.active_price(), true),
            SortOrder::AreaAsc => nulls_last(a.sort_area(), b.sort_area(), false),
            SortOrder::AreaDesc => nulls_last(a.sort_area(), b.sort_area(), true),
        };
        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }
}

fn nulls_last(a: Option<Decimal>, b: Option<Decimal>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One page of matches plus the total across all pages.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub rows: Vec<Property>,
    pub total: i64,
}

/// Runs the count and the page fetch for the same predicate.
///
/// The two reads are not wrapped in a transaction; a concurrent write may
/// land between them.
pub async fn execute<S>(store: &S, predicate: &Predicate, filters: &FilterSet) -> StoreResult<SearchOutcome>
where
    S: PropertyStore + ?Sized,
{
    let count_start = Instant::now();
    let total = store.count_properties(predicate).await?;
    tracing::info!("⏱️  COUNT QUERY: {}ms", count_start.elapsed().as_millis());

    // Nothing past the last page: skip the round-trip.
    let rows = if total == 0 || filters.offset() >= total {
        Vec::new()
    } else {
        let page_start = Instant::now();
        let rows = store
            .fetch_properties(predicate, filters.sort, filters.limit, filters.offset())
            .await?;
        tracing::info!(
            "⏱️  PAGE QUERY: {}ms (returned {} rows)",
            page_start.elapsed().as_millis(),
            rows.len()
        );
        rows
    };

    Ok(SearchOutcome { rows, total })
}
