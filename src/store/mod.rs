//! Storage abstraction.
//!
//! Handlers and the search pipeline only talk to these traits. Two backends
//! implement them:
//!
//! - [`PgStore`]: PostgreSQL through sqlx, used in production
//! - [`MemoryStore`]: process-local, used without `DATABASE_URL` and by tests
//!
//! Both evaluate the same compiled [`Predicate`] and [`SortOrder`], so search
//! results do not depend on the backend.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{
    Appointment, AppointmentFilter, AppointmentRequest, AppointmentStatus, Lead,
    LeadStatus, MonthRange, NewLead, NewProperty, Property, PropertyChanges, PropertyMetrics,
    Role, User,
};
use crate::search::{Predicate, SortOrder};

/// Failure of the storage layer. Never retried here.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A lead or appointment referenced a property id that does not exist.
    #[error("Property {0} not found")]
    UnknownProperty(i32),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Number of properties satisfying `predicate`, ignoring paging.
    async fn count_properties(&self, predicate: &Predicate) -> StoreResult<i64>;

    /// One page of properties satisfying `predicate`, in `sort` order.
    async fn fetch_properties(
        &self,
        predicate: &Predicate,
        sort: SortOrder,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Property>>;

    /// Reads a property without touching its view counter.
    async fn find_property(&self, id: i32) -> StoreResult<Option<Property>>;

    /// Atomically increments `views` and returns the updated row.
    async fn record_view(&self, id: i32) -> StoreResult<Option<Property>>;

    async fn insert_property(
        &self,
        property: &NewProperty,
        created_by: Option<i32>,
    ) -> StoreResult<Property>;

    /// Applies the present fields of `changes` and refreshes `updated_at`.
    async fn update_property(
        &self,
        id: i32,
        changes: &PropertyChanges,
    ) -> StoreResult<Option<Property>>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete_property(&self, id: i32) -> StoreResult<bool>;

    /// Deletes every property, returning how many were removed.
    async fn delete_all_properties(&self) -> StoreResult<u64>;

    async fn property_metrics(
        &self,
        current: MonthRange,
        previous: MonthRange,
    ) -> StoreResult<PropertyMetrics>;

    async fn most_viewed(&self, limit: i64) -> StoreResult<Vec<Property>>;

    async fn recently_updated(&self, limit: i64) -> StoreResult<Vec<Property>>;
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn insert_lead(&self, lead: &NewLead) -> StoreResult<Lead>;

    async fn list_leads(
        &self,
        status: Option<LeadStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Lead>>;

    async fn count_leads(&self, status: Option<LeadStatus>) -> StoreResult<i64>;

    async fn update_lead_status(&self, id: i32, status: LeadStatus) -> StoreResult<Option<Lead>>;

    async fn count_leads_since(&self, since: NaiveDateTime) -> StoreResult<i64>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Matching appointments ordered by date, then time.
    async fn list_appointments(&self, filter: AppointmentFilter) -> StoreResult<Vec<Appointment>>;

    async fn find_appointment(&self, id: i32) -> StoreResult<Option<Appointment>>;

    async fn insert_appointment(&self, request: &AppointmentRequest) -> StoreResult<Appointment>;

    /// Replaces every field. A missing `status` keeps the current one.
    async fn update_appointment(
        &self,
        id: i32,
        request: &AppointmentRequest,
    ) -> StoreResult<Option<Appointment>>;

    async fn update_appointment_status(
        &self,
        id: i32,
        status: AppointmentStatus,
    ) -> StoreResult<Option<Appointment>>;

    async fn delete_appointment(&self, id: i32) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>>;

    /// Creates the user, or resets password and role when the name exists.
    async fn upsert_user(&self, username: &str, password_hash: &str, role: Role) -> StoreResult<User>;

    async fn touch_last_login(&self, id: i32) -> StoreResult<()>;
}

/// Everything the HTTP layer needs from storage.
pub trait Store: PropertyStore + LeadStore + AppointmentStore + UserStore {
    /// Short backend name reported by the health check.
    fn backend(&self) -> &'static str;
}

