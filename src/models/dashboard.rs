use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::property::{Category, Property, PropertyStatus};

/// Raw property figures as computed by the store for the dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMetrics {
    pub available: i64,
    pub sold_this_month: i64,
    pub sold_last_month: i64,
    pub revenue_this_month: Decimal,
    pub revenue_last_month: Decimal,
    pub total_views: i64,
    pub by_category: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub active_properties: i64,
    pub monthly_sales: i64,
    pub monthly_revenue: Decimal,
    pub new_leads: i64,
    pub total_views: i64,
    pub categories: Vec<CategoryCount>,
    pub changes: MetricChanges,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricChanges {
    pub sales: String,
    pub revenue: String,
}

impl DashboardMetrics {
    pub fn from_parts(metrics: PropertyMetrics, new_leads: i64) -> Self {
        let changes = MetricChanges {
            sales: percent_change(
                Decimal::from(metrics.sold_this_month),
                Decimal::from(metrics.sold_last_month),
            ),
            revenue: percent_change(metrics.revenue_this_month, metrics.revenue_last_month),
        };
        Self {
            active_properties: metrics.available,
            monthly_sales: metrics.sold_this_month,
            monthly_revenue: metrics.revenue_this_month,
            new_leads,
            total_views: metrics.total_views,
            categories: metrics.by_category,
            changes,
        }
    }
}

/// Month-over-month change rendered as a signed whole percentage, e.g. `+25%`.
pub fn percent_change(current: Decimal, previous: Decimal) -> String {
    if previous.is_zero() {
        return if current.is_zero() {
            "0%".to_string()
        } else {
            "+100%".to_string()
        };
    }
    let change = ((current - previous) / previous * Decimal::ONE_HUNDRED).round();
    if change.is_sign_negative() && !change.is_zero() {
        format!("{change}%")
    } else {
        format!("+{}%", change.abs())
    }
}

/// Entry of the "most viewed" dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProperty {
    pub id: i32,
    pub title: String,
    pub location: String,
    pub views: i32,
    pub price: Option<Decimal>,
    pub image: Option<String>,
}

impl From<Property> for TopProperty {
    fn from(property: Property) -> Self {
        let location = match &property.neighborhood {
            Some(neighborhood) if !neighborhood.is_empty() => {
                format!("{}, {}", neighborhood, property.city)
            }
            _ => property.city.clone(),
        };
        let price = property.active_price();
        let image = property
            .main_image
            .clone()
            .or_else(|| property.images.first().cloned());
        Self {
            id: property.id,
            title: property.title,
            location,
            views: property.views,
            price,
            image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Listing,
    Sale,
    Rental,
}

/// Entry of the "recent activity" dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub property_id: i32,
    pub title: String,
    pub price: Option<Decimal>,
    pub status: PropertyStatus,
    pub at: NaiveDateTime,
}

impl From<Property> for Activity {
    fn from(property: Property) -> Self {
        let kind = match property.status {
            PropertyStatus::Sold => ActivityKind::Sale,
            PropertyStatus::Rented => ActivityKind::Rental,
            PropertyStatus::Available | PropertyStatus::Reserved => ActivityKind::Listing,
        };
        Self {
            kind,
            property_id: property.id,
            price: property.active_price(),
            title: property.title,
            status: property.status,
            at: property.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedProperties {
    pub deleted: u64,
    pub remaining: i64,
}
