//! Filter collection: loosely typed query parameters in, a [`FilterSet`] out.
//!
//! Collection never fails. The defaulting rules are:
//!
//! * a repeated key keeps its last value; blank values count as absent
//! * numbers that do not parse, or are negative, are dropped
//! * an unknown `category` is dropped (no category filter)
//! * an unknown `status` falls back to the configured default; `all` disables it
//! * `city` falls back to the configured default city; `all` disables it
//! * an unknown `sort` falls back to [`SortOrder::Recent`]
//! * `page` below 1 becomes 1; `limit` below 1 becomes the default and is
//!   capped at the configured maximum

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::config::SearchConfig;
use crate::models::{Category, PropertyStatus};

/// Literal that switches off a defaulted filter.
const ALL: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Recent,
    PriceAsc,
    PriceDesc,
    AreaAsc,
    AreaDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Recent => "recent",
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
            SortOrder::AreaAsc => "area_asc",
            SortOrder::AreaDesc => "area_desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recent" => Ok(SortOrder::Recent),
            "price_asc" => Ok(SortOrder::PriceAsc),
            "price_desc" => Ok(SortOrder::PriceDesc),
            "area_asc" => Ok(SortOrder::AreaAsc),
            "area_desc" => Ok(SortOrder::AreaDesc),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized criteria for one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSet {
    pub category: Option<Category>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub suites: Option<i32>,
    pub parking_spaces: Option<i32>,
    pub property_type: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub status: Option<PropertyStatus>,
    pub featured: Option<bool>,
    pub sort: SortOrder,
    pub page: i64,
    pub limit: i64,
}

impl FilterSet {
    /// A filter set with no criteria at all, first page of `limit` rows.
    pub fn unfiltered(limit: i64) -> Self {
        Self {
            category: None,
            price_min: None,
            price_max: None,
            bedrooms: None,
            bathrooms: None,
            suites: None,
            parking_spaces: None,
            property_type: None,
            neighborhood: None,
            city: None,
            status: None,
            featured: None,
            sort: SortOrder::Recent,
            page: 1,
            limit: limit.max(1),
        }
    }

    /// Collects a filter set from a raw query string.
    pub fn from_query(query: &str, config: &SearchConfig) -> Self {
        collect(&QueryParams::parse(query), config)
    }

    pub fn offset(&self) -> i64 {
        Paging {
            page: self.page,
            limit: self.limit,
        }
        .offset()
    }
}

/// 1-based page window shared by every paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub limit: i64,
}

impl Paging {
    /// `page` below 1 becomes 1; a missing or non-positive `limit` becomes
    /// the default, and larger values are capped at the maximum.
    pub fn from_params(params: &QueryParams, config: &SearchConfig) -> Self {
        let page = params.parsed::<i64>("page").unwrap_or(1).max(1);
        let limit = match params.parsed::<i64>("limit") {
            Some(limit) if limit >= 1 => limit.min(config.max_limit),
            _ => config.default_limit,
        };
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Query string split into keys, keeping only the last value of each.
#[derive(Debug, Default)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        let mut values = HashMap::new();
        for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
            values.insert(k.into_owned(), v.into_owned());
        }
        Self { values }
    }

    /// Trimmed value, `None` when absent or blank.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.text(key).and_then(|v| v.parse().ok())
    }

    fn count(&self, key: &str) -> Option<i32> {
        self.parsed::<i32>(key).filter(|n| *n >= 0)
    }

    fn amount(&self, key: &str) -> Option<Decimal> {
        self.parsed::<Decimal>(key).filter(|n| !n.is_sign_negative())
    }

    fn flag(&self, key: &str) -> Option<bool> {
        match self.text(key)?.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

/// Builds a [`FilterSet`] from parsed parameters, applying the module's
/// defaulting rules.
pub fn collect(params: &QueryParams, config: &SearchConfig) -> FilterSet {
    let city = match params.text("city") {
        Some(city) if city.eq_ignore_ascii_case(ALL) => None,
        Some(city) => Some(city.to_string()),
        None => Some(config.default_city.clone()),
    };

    let status = match params.text("status") {
        Some(status) if status.eq_ignore_ascii_case(ALL) => None,
        Some(status) => Some(status.parse().unwrap_or(config.default_status)),
        None => Some(config.default_status),
    };

    let Paging { page, limit } = Paging::from_params(params, config);

    FilterSet {
        category: params.parsed("category"),
        price_min: params.amount("price_min"),
        price_max: params.amount("price_max"),
        bedrooms: params.count("bedrooms"),
        bathrooms: params.count("bathrooms"),
        suites: params.count("suites"),
        parking_spaces: params.count("parking_spaces"),
        property_type: params.text("property_type").map(str::to_string),
        neighborhood: params.text("neighborhood").map(str::to_string),
        city,
        status,
        featured: params.flag("featured"),
        sort: params.parsed("sort").unwrap_or_default(),
        page,
        limit,
    }
}
