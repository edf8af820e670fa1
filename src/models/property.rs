use std::borrow::Cow;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::common::{deserialize_some, text_enum};

text_enum! {
    /// Site section a listing is published under.
    pub enum Category {
        Lancamentos => "lancamentos",
        BeiraMar => "beira-mar",
        MaisProcurados => "mais-procurados",
        ProntoMorar => "pronto-morar",
    }
}

text_enum! {
    pub enum PropertyStatus {
        Available => "available",
        Sold => "sold",
        Rented => "rented",
        Reserved => "reserved",
    }
}

/// A real-estate listing as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Property {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub property_type: String,
    pub status: PropertyStatus,

    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,

    pub bedrooms: i32,
    pub bathrooms: i32,
    pub suites: i32,
    pub parking_spaces: i32,
    pub total_area: Option<Decimal>,
    pub built_area: Option<Decimal>,

    pub sale_price: Option<Decimal>,
    pub rent_price: Option<Decimal>,
    pub condo_fee: Option<Decimal>,
    pub iptu: Option<Decimal>,

    pub features: Vec<String>,
    pub nearby_places: Vec<String>,

    pub main_image: Option<String>,
    pub images: Vec<String>,
    pub video_url: Option<String>,
    pub virtual_tour_url: Option<String>,

    pub views: i32,
    pub is_featured: bool,
    pub created_by: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
}

impl Property {
    /// Price used for price filters and price sorting: sale price, else rent.
    pub fn active_price(&self) -> Option<Decimal> {
        self.sale_price.or(self.rent_price)
    }

    /// Area used for area sorting: total area, else built area.
    pub fn sort_area(&self) -> Option<Decimal> {
        self.total_area.or(self.built_area)
    }
}

fn price_required() -> ValidationError {
    ValidationError::new("price_required")
        .with_message(Cow::Borrowed("at least one of sale_price or rent_price is required"))
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("negative")
            .with_message(Cow::Borrowed("must not be negative")));
    }
    Ok(())
}

fn validate_draft_prices(draft: &PropertyDraft) -> Result<(), ValidationError> {
    if draft.sale_price.is_none() && draft.rent_price.is_none() {
        return Err(price_required());
    }
    Ok(())
}

/// Body of `POST /api/properties`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_draft_prices"))]
pub struct PropertyDraft {
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    #[validate(length(min = 1, max = 100, message = "property_type is required"))]
    pub property_type: String,
    #[serde(default)]
    pub status: Option<PropertyStatus>,

    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub zip_code: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub bedrooms: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub bathrooms: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub suites: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub parking_spaces: i32,
    #[validate(custom(function = "non_negative"))]
    pub total_area: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub built_area: Option<Decimal>,

    #[validate(custom(function = "non_negative"))]
    pub sale_price: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub rent_price: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub condo_fee: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub iptu: Option<Decimal>,

    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub nearby_places: Vec<String>,

    pub main_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub video_url: Option<String>,
    pub virtual_tour_url: Option<String>,

    #[serde(default)]
    pub is_featured: bool,
}

impl PropertyDraft {
    /// Applies creation defaults (status, city, state).
    pub fn into_new(self, default_city: &str) -> NewProperty {
        NewProperty {
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            property_type: self.property_type.trim().to_string(),
            status: self.status.unwrap_or(PropertyStatus::Available),
            address: self.address,
            neighborhood: self.neighborhood,
            city: self
                .city
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| default_city.to_string()),
            state: self
                .state
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "AL".to_string()),
            zip_code: self.zip_code,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            suites: self.suites,
            parking_spaces: self.parking_spaces,
            total_area: self.total_area,
            built_area: self.built_area,
            sale_price: self.sale_price,
            rent_price: self.rent_price,
            condo_fee: self.condo_fee,
            iptu: self.iptu,
            features: self.features,
            nearby_places: self.nearby_places,
            main_image: self.main_image,
            images: self.images,
            video_url: self.video_url,
            virtual_tour_url: self.virtual_tour_url,
            is_featured: self.is_featured,
        }
    }
}

/// A validated draft with defaults applied, ready to insert.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub property_type: String,
    pub status: PropertyStatus,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub suites: i32,
    pub parking_spaces: i32,
    pub total_area: Option<Decimal>,
    pub built_area: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub rent_price: Option<Decimal>,
    pub condo_fee: Option<Decimal>,
    pub iptu: Option<Decimal>,
    pub features: Vec<String>,
    pub nearby_places: Vec<String>,
    pub main_image: Option<String>,
    pub images: Vec<String>,
    pub video_url: Option<String>,
    pub virtual_tour_url: Option<String>,
    pub is_featured: bool,
}

fn validate_changes(changes: &PropertyChanges) -> Result<(), ValidationError> {
    if changes.is_empty() {
        return Err(ValidationError::new("empty")
            .with_message(Cow::Borrowed("no valid fields to update")));
    }
    if let Some(title) = &changes.title {
        if title.trim().is_empty() {
            return Err(ValidationError::new("title")
                .with_message(Cow::Borrowed("title must not be empty")));
        }
    }
    if let Some(property_type) = &changes.property_type {
        if property_type.trim().is_empty() {
            return Err(ValidationError::new("property_type")
                .with_message(Cow::Borrowed("property_type must not be empty")));
        }
    }
    let counts = [
        changes.bedrooms,
        changes.bathrooms,
        changes.suites,
        changes.parking_spaces,
    ];
    if counts.iter().flatten().any(|count| *count < 0) {
        return Err(ValidationError::new("negative")
            .with_message(Cow::Borrowed("room and parking counts must not be negative")));
    }
    let amounts = [
        changes.total_area,
        changes.built_area,
        changes.sale_price,
        changes.rent_price,
        changes.condo_fee,
        changes.iptu,
    ];
    for amount in amounts.iter().flatten().flatten() {
        non_negative(amount)?;
    }
    Ok(())
}

/// Body of `PUT /api/properties/:id`. Absent fields are left untouched;
/// nullable fields may be cleared with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_changes"))]
pub struct PropertyChanges {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub category: Option<Category>,
    pub property_type: Option<String>,
    pub status: Option<PropertyStatus>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub neighborhood: Option<Option<String>>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub zip_code: Option<Option<String>>,

    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub suites: Option<i32>,
    pub parking_spaces: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub total_area: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub built_area: Option<Option<Decimal>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub sale_price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub rent_price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub condo_fee: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub iptu: Option<Option<Decimal>>,

    pub features: Option<Vec<String>>,
    pub nearby_places: Option<Vec<String>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub main_image: Option<Option<String>>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub video_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub virtual_tour_url: Option<Option<String>>,

    pub is_featured: Option<bool>,
}

impl PropertyChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.property_type.is_none()
            && self.status.is_none()
            && self.address.is_none()
            && self.neighborhood.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip_code.is_none()
            && self.bedrooms.is_none()
            && self.bathrooms.is_none()
            && self.suites.is_none()
            && self.parking_spaces.is_none()
            && self.total_area.is_none()
            && self.built_area.is_none()
            && self.sale_price.is_none()
            && self.rent_price.is_none()
            && self.condo_fee.is_none()
            && self.iptu.is_none()
            && self.features.is_none()
            && self.nearby_places.is_none()
            && self.main_image.is_none()
            && self.images.is_none()
            && self.video_url.is_none()
            && self.virtual_tour_url.is_none()
            && self.is_featured.is_none()
    }

    /// Whether `existing` would still carry a sale or rent price after these
    /// changes are applied.
    pub fn keeps_a_price(&self, existing: &Property) -> bool {
        let sale = self.sale_price.unwrap_or(existing.sale_price);
        let rent = self.rent_price.unwrap_or(existing.rent_price);
        sale.is_some() || rent.is_some()
    }

    /// Applies the changes in place. `updated_at` is handled by the caller.
    pub fn apply_to(&self, property: &mut Property) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut property.title, &self.title);
        set(&mut property.description, &self.description);
        set(&mut property.category, &self.category);
        set(&mut property.property_type, &self.property_type);
        set(&mut property.status, &self.status);
        set(&mut property.address, &self.address);
        set(&mut property.neighborhood, &self.neighborhood);
        set(&mut property.city, &self.city);
        set(&mut property.state, &self.state);
        set(&mut property.zip_code, &self.zip_code);
        set(&mut property.bedrooms, &self.bedrooms);
        set(&mut property.bathrooms, &self.bathrooms);
        set(&mut property.suites, &self.suites);
        set(&mut property.parking_spaces, &self.parking_spaces);
        set(&mut property.total_area, &self.total_area);
        set(&mut property.built_area, &self.built_area);
        set(&mut property.sale_price, &self.sale_price);
        set(&mut property.rent_price, &self.rent_price);
        set(&mut property.condo_fee, &self.condo_fee);
        set(&mut property.iptu, &self.iptu);
        set(&mut property.features, &self.features);
        set(&mut property.nearby_places, &self.nearby_places);
        set(&mut property.main_image, &self.main_image);
        set(&mut property.images, &self.images);
        set(&mut property.video_url, &self.video_url);
        set(&mut property.virtual_tour_url, &self.virtual_tour_url);
        set(&mut property.is_featured, &self.is_featured);
    }
}

/// Returned by `POST /api/properties`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreatedProperty {
    pub id: i32,
}
