use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use super::{
    AppointmentStore, LeadStore, PropertyStore, Store, StoreError, StoreResult, UserStore,
};
use crate::models::{
    Appointment, AppointmentFilter, AppointmentRequest, AppointmentStatus, Category,
    CategoryCount, Lead, LeadStatus, MonthRange, NewLead, NewProperty, Property, PropertyChanges,
    PropertyMetrics, Role, User,
};
use crate::search::{Predicate, SortOrder};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a violated `REFERENCES properties (id)` to [`StoreError::UnknownProperty`].
fn property_reference(property_id: Option<i32>) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        if let (sqlx::Error::Database(db), Some(id)) = (&err, property_id) {
            if db.is_foreign_key_violation() {
                return StoreError::UnknownProperty(id);
            }
        }
        StoreError::Database(err)
    }
}

/// Pushes `, column = $n` for every present field of `changes`.
fn push_property_changes(builder: &mut QueryBuilder<'_, Postgres>, changes: &PropertyChanges) {
    macro_rules! set {
        ($field:ident) => {
            if let Some(value) = &changes.$field {
                builder.push(concat!(", ", stringify!($field), " = "));
                builder.push_bind(value.clone());
            }
        };
    }

    set!(title);
    set!(description);
    set!(category);
    set!(property_type);
    set!(status);
    set!(address);
    set!(neighborhood);
    set!(city);
    set!(state);
    set!(zip_code);
    set!(bedrooms);
    set!(bathrooms);
    set!(suites);
    set!(parking_spaces);
    set!(total_area);
    set!(built_area);
    set!(sale_price);
    set!(rent_price);
    set!(condo_fee);
    set!(iptu);
    set!(features);
    set!(nearby_places);
    set!(main_image);
    set!(images);
    set!(video_url);
    set!(virtual_tour_url);
    set!(is_featured);
}

#[async_trait]
impl PropertyStore for PgStore {
    async fn count_properties(&self, predicate: &Predicate) -> StoreResult<i64> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM properties");
        predicate.push_where(&mut builder);
        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn fetch_properties(
        &self,
        predicate: &Predicate,
        sort: SortOrder,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Property>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM properties");
        predicate.push_where(&mut builder);
        builder.push(" ORDER BY ");
        builder.push(sort.order_by());
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<Property>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_property(&self, id: i32) -> StoreResult<Option<Property>> {
        let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(property)
    }

    async fn record_view(&self, id: i32) -> StoreResult<Option<Property>> {
        let property = sqlx::query_as::<_, Property>(
            "UPDATE properties SET views = views + 1 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(property)
    }

    async fn insert_property(
        &self,
        new: &NewProperty,
        created_by: Option<i32>,
    ) -> StoreResult<Property> {
        let property = sqlx::query_as::<_, Property>(
            r#"
            INSERT INTO properties (
                title, description, category, property_type, status,
                address, neighborhood, city, state, zip_code,
                bedrooms, bathrooms, suites, parking_spaces, total_area, built_area,
                sale_price, rent_price, condo_fee, iptu,
                features, nearby_places, main_image, images, video_url, virtual_tour_url,
                is_featured, created_by, published_at
            )
            VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26,
                $27, $28, CURRENT_TIMESTAMP
            )
            RETURNING *
            "#,
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.category)
        .bind(&new.property_type)
        .bind(new.status)
        .bind(&new.address)
        .bind(&new.neighborhood)
        .bind(&new.city)
        .bind(&new.state)
        .bind(&new.zip_code)
        .bind(new.bedrooms)
        .bind(new.bathrooms)
        .bind(new.suites)
        .bind(new.parking_spaces)
        .bind(new.total_area)
        .bind(new.built_area)
        .bind(new.sale_price)
        .bind(new.rent_price)
        .bind(new.condo_fee)
        .bind(new.iptu)
        .bind(&new.features)
        .bind(&new.nearby_places)
        .bind(&new.main_image)
        .bind(&new.images)
        .bind(&new.video_url)
        .bind(&new.virtual_tour_url)
        .bind(new.is_featured)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(property)
    }

    async fn update_property(
        &self,
        id: i32,
        changes: &PropertyChanges,
    ) -> StoreResult<Option<Property>> {
        // GREATEST keeps updated_at from ever preceding created_at.
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "UPDATE properties SET updated_at = GREATEST(CURRENT_TIMESTAMP::TIMESTAMP, created_at)",
        );
        push_property_changes(&mut builder, changes);
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING *");

        let property = builder
            .build_query_as::<Property>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(property)
    }

    async fn delete_property(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_properties(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM properties")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn property_metrics(
        &self,
        current: MonthRange,
        previous: MonthRange,
    ) -> StoreResult<PropertyMetrics> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'available') AS available,
                COUNT(*) FILTER (
                    WHERE status = 'sold' AND updated_at >= $1 AND updated_at < $2
                ) AS sold_this_month,
                COUNT(*) FILTER (
                    WHERE status = 'sold' AND updated_at >= $3 AND updated_at < $4
                ) AS sold_last_month,
                COALESCE(SUM(sale_price) FILTER (
                    WHERE status = 'sold' AND updated_at >= $1 AND updated_at < $2
                ), 0) AS revenue_this_month,
                COALESCE(SUM(sale_price) FILTER (
                    WHERE status = 'sold' AND updated_at >= $3 AND updated_at < $4
                ), 0) AS revenue_last_month,
                COALESCE(SUM(views), 0)::BIGINT AS total_views
            FROM properties
            "#,
        )
        .bind(current.start_datetime())
        .bind(current.end_datetime())
        .bind(previous.start_datetime())
        .bind(previous.end_datetime())
        .fetch_one(&self.pool)
        .await?;

        let counts: Vec<(Category, i64)> =
            sqlx::query_as("SELECT category, COUNT(*) FROM properties GROUP BY category")
                .fetch_all(&self.pool)
                .await?;

        let by_category = Category::ALL
            .iter()
            .map(|category| CategoryCount {
                category: *category,
                count: counts
                    .iter()
                    .find(|(c, _)| c == category)
                    .map_or(0, |(_, n)| *n),
            })
            .collect();

        Ok(PropertyMetrics {
            available: row.try_get("available")?,
            sold_this_month: row.try_get("sold_this_month")?,
            sold_last_month: row.try_get("sold_last_month")?,
            revenue_this_month: row.try_get::<Decimal, _>("revenue_this_month")?,
            revenue_last_month: row.try_get::<Decimal, _>("revenue_last_month")?,
            total_views: row.try_get("total_views")?,
            by_category,
        })
    }

    async fn most_viewed(&self, limit: i64) -> StoreResult<Vec<Property>> {
        let rows = sqlx::query_as::<_, Property>(
            "SELECT * FROM properties ORDER BY views DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn recently_updated(&self, limit: i64) -> StoreResult<Vec<Property>> {
        let rows = sqlx::query_as::<_, Property>(
            "SELECT * FROM properties ORDER BY updated_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl LeadStore for PgStore {
    async fn insert_lead(&self, lead: &NewLead) -> StoreResult<Lead> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (property_id, name, email, phone, message, source)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(lead.property_id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.message)
        .bind(lead.source)
        .fetch_one(&self.pool)
        .await
        .map_err(property_reference(lead.property_id))?;
        Ok(lead)
    }

    async fn list_leads(
        &self,
        status: Option<LeadStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Lead>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM leads");
        if let Some(status) = status {
            builder.push(" WHERE status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder.build_query_as::<Lead>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn count_leads(&self, status: Option<LeadStatus>) -> StoreResult<i64> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM leads");
        if let Some(status) = status {
            builder.push(" WHERE status = ");
            builder.push_bind(status);
        }
        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn update_lead_status(&self, id: i32, status: LeadStatus) -> StoreResult<Option<Lead>> {
        let lead = sqlx::query_as::<_, Lead>(
            "UPDATE leads SET status = $1 WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }

    async fn count_leads_since(&self, since: NaiveDateTime) -> StoreResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn list_appointments(&self, filter: AppointmentFilter) -> StoreResult<Vec<Appointment>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM appointments WHERE TRUE");
        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        if let Some(month) = filter.month {
            builder.push(" AND appointment_date >= ");
            builder.push_bind(month.start);
            builder.push(" AND appointment_date < ");
            builder.push_bind(month.end);
        }
        builder.push(" ORDER BY appointment_date, appointment_time, id");

        let rows = builder
            .build_query_as::<Appointment>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_appointment(&self, id: i32) -> StoreResult<Option<Appointment>> {
        let appointment =
            sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(appointment)
    }

    async fn insert_appointment(&self, request: &AppointmentRequest) -> StoreResult<Appointment> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (
                title, client_name, client_phone, client_email, property_id,
                appointment_date, appointment_time, location, kind, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&request.title)
        .bind(&request.client_name)
        .bind(&request.client_phone)
        .bind(&request.client_email)
        .bind(request.property_id)
        .bind(request.appointment_date)
        .bind(request.appointment_time)
        .bind(&request.location)
        .bind(request.kind)
        .bind(request.status.unwrap_or(AppointmentStatus::Pending))
        .bind(&request.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(property_reference(request.property_id))?;
        Ok(appointment)
    }

    async fn update_appointment(
        &self,
        id: i32,
        request: &AppointmentRequest,
    ) -> StoreResult<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments SET
                title = $1, client_name = $2, client_phone = $3, client_email = $4,
                property_id = $5, appointment_date = $6, appointment_time = $7,
                location = $8, kind = $9, status = COALESCE($10, status), notes = $11,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $12
            RETURNING *
            "#,
        )
        .bind(&request.title)
        .bind(&request.client_name)
        .bind(&request.client_phone)
        .bind(&request.client_email)
        .bind(request.property_id)
        .bind(request.appointment_date)
        .bind(request.appointment_time)
        .bind(&request.location)
        .bind(request.kind)
        .bind(request.status)
        .bind(&request.notes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(property_reference(request.property_id))?;
        Ok(appointment)
    }

    async fn update_appointment_status(
        &self,
        id: i32,
        status: AppointmentStatus,
    ) -> StoreResult<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(
            "UPDATE appointments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(appointment)
    }

    async fn delete_appointment(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn upsert_user(&self, username: &str, password_hash: &str, role: Role) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO UPDATE
                SET password_hash = EXCLUDED.password_hash,
                    role = EXCLUDED.role
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn touch_last_login(&self, id: i32) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }
}
