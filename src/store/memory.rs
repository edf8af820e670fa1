use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;

use super::{
    AppointmentStore, LeadStore, PropertyStore, Store, StoreError, StoreResult, UserStore,
};
use crate::models::{
    Appointment, AppointmentFilter, AppointmentRequest, AppointmentStatus, Category,
    CategoryCount, Lead, LeadStatus, MonthRange, NewLead, NewProperty, Property, PropertyChanges,
    PropertyMetrics, PropertyStatus, Role, User,
};
use crate::search::{Predicate, SortOrder};

#[derive(Default)]
struct Tables {
    properties: BTreeMap<i32, Property>,
    leads: BTreeMap<i32, Lead>,
    appointments: BTreeMap<i32, Appointment>,
    users: BTreeMap<i32, User>,
    last_property_id: i32,
    last_lead_id: i32,
    last_appointment_id: i32,
    last_user_id: i32,
}

impl Tables {
    /// Mirrors the `REFERENCES properties (id)` constraint on leads and
    /// appointments.
    fn check_property(&self, property_id: Option<i32>) -> StoreResult<()> {
        match property_id {
            Some(id) if !self.properties.contains_key(&id) => Err(StoreError::UnknownProperty(id)),
            _ => Ok(()),
        }
    }
}

fn next_id(last: &mut i32) -> i32 {
    *last += 1;
    *last
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Process-local store.
///
/// Ids are never reused, matching `SERIAL` columns. View increments happen
/// under the write lock, so concurrent detail reads never lose a count.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed property as-is (timestamps, views and id
    /// included). Used to load fixtures.
    pub fn seed_property(&self, property: Property) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables.last_property_id = tables.last_property_id.max(property.id);
        tables.properties.insert(property.id, property);
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

fn page<T: Clone>(rows: Vec<&T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait]
impl PropertyStore for MemoryStore {
    async fn count_properties(&self, predicate: &Predicate) -> StoreResult<i64> {
        let tables = self.read()?;
        let count = tables
            .properties
            .values()
            .filter(|p| predicate.matches(p))
            .count();
        Ok(count as i64)
    }

    async fn fetch_properties(
        &self,
        predicate: &Predicate,
        sort: SortOrder,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Property>> {
        let tables = self.read()?;
        let mut rows: Vec<&Property> = tables
            .properties
            .values()
            .filter(|p| predicate.matches(p))
            .collect();
        rows.sort_by(|a, b| sort.compare(a, b));
        Ok(page(rows, limit, offset))
    }

    async fn find_property(&self, id: i32) -> StoreResult<Option<Property>> {
        Ok(self.read()?.properties.get(&id).cloned())
    }

    async fn record_view(&self, id: i32) -> StoreResult<Option<Property>> {
        let mut tables = self.write()?;
        Ok(tables.properties.get_mut(&id).map(|property| {
            property.views = property.views.saturating_add(1);
            property.clone()
        }))
    }

    async fn insert_property(
        &self,
        new: &NewProperty,
        created_by: Option<i32>,
    ) -> StoreResult<Property> {
        let mut tables = self.write()?;
        let id = next_id(&mut tables.last_property_id);
        let at = now();
        let property = Property {
            id,
            title: new.title.clone(),
            description: new.description.clone(),
            category: new.category,
            property_type: new.property_type.clone(),
            status: new.status,
            address: new.address.clone(),
            neighborhood: new.neighborhood.clone(),
            city: new.city.clone(),
            state: new.state.clone(),
            zip_code: new.zip_code.clone(),
            bedrooms: new.bedrooms,
            bathrooms: new.bathrooms,
            suites: new.suites,
            parking_spaces: new.parking_spaces,
            total_area: new.total_area,
            built_area: new.built_area,
            sale_price: new.sale_price,
            rent_price: new.rent_price,
            condo_fee: new.condo_fee,
            iptu: new.iptu,
            features: new.features.clone(),
            nearby_places: new.nearby_places.clone(),
            main_image: new.main_image.clone(),
            images: new.images.clone(),
            video_url: new.video_url.clone(),
            virtual_tour_url: new.virtual_tour_url.clone(),
            views: 0,
            is_featured: new.is_featured,
            created_by,
            created_at: at,
            updated_at: at,
            published_at: Some(at),
        };
        tables.properties.insert(id, property.clone());
        Ok(property)
    }

    async fn update_property(
        &self,
        id: i32,
        changes: &PropertyChanges,
    ) -> StoreResult<Option<Property>> {
        let mut tables = self.write()?;
        let Some(property) = tables.properties.get_mut(&id) else {
            return Ok(None);
        };
        if !changes.keeps_a_price(property) {
            return Err(StoreError::Backend(
                "update would leave the property without a price".to_string(),
            ));
        }
        changes.apply_to(property);
        property.updated_at = now().max(property.created_at);
        Ok(Some(property.clone()))
    }

    async fn delete_property(&self, id: i32) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let removed = tables.properties.remove(&id).is_some();
        if removed {
            for lead in tables.leads.values_mut() {
                if lead.property_id == Some(id) {
                    lead.property_id = None;
                }
            }
            for appointment in tables.appointments.values_mut() {
                if appointment.property_id == Some(id) {
                    appointment.property_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn delete_all_properties(&self) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let deleted = tables.properties.len() as u64;
        tables.properties.clear();
        for lead in tables.leads.values_mut() {
            lead.property_id = None;
        }
        for appointment in tables.appointments.values_mut() {
            appointment.property_id = None;
        }
        Ok(deleted)
    }

    async fn property_metrics(
        &self,
        current: MonthRange,
        previous: MonthRange,
    ) -> StoreResult<PropertyMetrics> {
        let tables = self.read()?;
        let mut metrics = PropertyMetrics::default();

        for property in tables.properties.values() {
            metrics.total_views += i64::from(property.views);
            match property.status {
                PropertyStatus::Available => metrics.available += 1,
                PropertyStatus::Sold => {
                    let revenue = property.sale_price.unwrap_or(Decimal::ZERO);
                    if current.contains_datetime(property.updated_at) {
                        metrics.sold_this_month += 1;
                        metrics.revenue_this_month += revenue;
                    } else if previous.contains_datetime(property.updated_at) {
                        metrics.sold_last_month += 1;
                        metrics.revenue_last_month += revenue;
                    }
                }
                PropertyStatus::Rented | PropertyStatus::Reserved => {}
            }
        }

        metrics.by_category = Category::ALL
            .iter()
            .map(|category| CategoryCount {
                category: *category,
                count: tables
                    .properties
                    .values()
                    .filter(|p| p.category == *category)
                    .count() as i64,
            })
            .collect();

        Ok(metrics)
    }

    async fn most_viewed(&self, limit: i64) -> StoreResult<Vec<Property>> {
        let tables = self.read()?;
        let mut rows: Vec<&Property> = tables.properties.values().collect();
        rows.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| b.id.cmp(&a.id)));
        Ok(page(rows, limit, 0))
    }

    async fn recently_updated(&self, limit: i64) -> StoreResult<Vec<Property>> {
        let tables = self.read()?;
        let mut rows: Vec<&Property> = tables.properties.values().collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page(rows, limit, 0))
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn insert_lead(&self, new: &NewLead) -> StoreResult<Lead> {
        let mut tables = self.write()?;
        tables.check_property(new.property_id)?;
        let id = next_id(&mut tables.last_lead_id);
        let lead = Lead {
            id,
            property_id: new.property_id,
            name: new.name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            message: new.message.clone(),
            source: new.source,
            status: LeadStatus::New,
            created_at: now(),
        };
        tables.leads.insert(id, lead.clone());
        Ok(lead)
    }

    async fn list_leads(
        &self,
        status: Option<LeadStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Lead>> {
        let tables = self.read()?;
        let mut rows: Vec<&Lead> = tables
            .leads
            .values()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page(rows, limit, offset))
    }

    async fn count_leads(&self, status: Option<LeadStatus>) -> StoreResult<i64> {
        let tables = self.read()?;
        let count = tables
            .leads
            .values()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .count();
        Ok(count as i64)
    }

    async fn update_lead_status(&self, id: i32, status: LeadStatus) -> StoreResult<Option<Lead>> {
        let mut tables = self.write()?;
        Ok(tables.leads.get_mut(&id).map(|lead| {
            lead.status = status;
            lead.clone()
        }))
    }

    async fn count_leads_since(&self, since: NaiveDateTime) -> StoreResult<i64> {
        let tables = self.read()?;
        Ok(tables.leads.values().filter(|l| l.created_at >= since).count() as i64)
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn list_appointments(&self, filter: AppointmentFilter) -> StoreResult<Vec<Appointment>> {
        let tables = self.read()?;
        let mut rows: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.appointment_date
                .cmp(&b.appointment_date)
                .then_with(|| a.appointment_time.cmp(&b.appointment_time))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    async fn find_appointment(&self, id: i32) -> StoreResult<Option<Appointment>> {
        Ok(self.read()?.appointments.get(&id).cloned())
    }

    async fn insert_appointment(&self, request: &AppointmentRequest) -> StoreResult<Appointment> {
        let mut tables = self.write()?;
        tables.check_property(request.property_id)?;
        let id = next_id(&mut tables.last_appointment_id);
        let at = now();
        let appointment = Appointment {
            id,
            title: request.title.clone(),
            client_name: request.client_name.clone(),
            client_phone: request.client_phone.clone(),
            client_email: request.client_email.clone(),
            property_id: request.property_id,
            appointment_date: request.appointment_date,
            appointment_time: request.appointment_time,
            location: request.location.clone(),
            kind: request.kind,
            status: request.status.unwrap_or(AppointmentStatus::Pending),
            notes: request.notes.clone(),
            created_at: at,
            updated_at: at,
        };
        tables.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(
        &self,
        id: i32,
        request: &AppointmentRequest,
    ) -> StoreResult<Option<Appointment>> {
        let mut tables = self.write()?;
        if !tables.appointments.contains_key(&id) {
            return Ok(None);
        }
        tables.check_property(request.property_id)?;
        Ok(tables.appointments.get_mut(&id).map(|a| {
            a.title = request.title.clone();
            a.client_name = request.client_name.clone();
            a.client_phone = request.client_phone.clone();
            a.client_email = request.client_email.clone();
            a.property_id = request.property_id;
            a.appointment_date = request.appointment_date;
            a.appointment_time = request.appointment_time;
            a.location = request.location.clone();
            a.kind = request.kind;
            a.status = request.status.unwrap_or(a.status);
            a.notes = request.notes.clone();
            a.updated_at = now().max(a.created_at);
            a.clone()
        }))
    }

    async fn update_appointment_status(
        &self,
        id: i32,
        status: AppointmentStatus,
    ) -> StoreResult<Option<Appointment>> {
        let mut tables = self.write()?;
        Ok(tables.appointments.get_mut(&id).map(|a| {
            a.status = status;
            a.updated_at = now().max(a.created_at);
            a.clone()
        }))
    }

    async fn delete_appointment(&self, id: i32) -> StoreResult<bool> {
        Ok(self.write()?.appointments.remove(&id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.read()?;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn upsert_user(&self, username: &str, password_hash: &str, role: Role) -> StoreResult<User> {
        let mut tables = self.write()?;
        if let Some(user) = tables.users.values_mut().find(|u| u.username == username) {
            user.password_hash = password_hash.to_string();
            user.role = role;
            return Ok(user.clone());
        }
        let id = next_id(&mut tables.last_user_id);
        let user = User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: now(),
            last_login: None,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn touch_last_login(&self, id: i32) -> StoreResult<()> {
        let mut tables = self.write()?;
        if let Some(user) = tables.users.get_mut(&id) {
            user.last_login = Some(now());
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }
}
