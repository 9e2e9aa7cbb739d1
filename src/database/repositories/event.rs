//! Event repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::event::{Event, MerchVariant, CreateEventRequest, UpdateEventRequest};
use crate::utils::errors::CampusGateError;

const EVENT_COLUMNS: &str = "id, organizer_id, title, description, event_type, eligibility, registration_deadline, starts_at, ends_at, capacity, registration_fee, requires_approval, status, form_schema, total_registrations, total_revenue, total_attendance, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new draft event together with its merchandise variants
    pub async fn create(&self, organizer_id: i64, request: CreateEventRequest) -> Result<Event, CampusGateError> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (organizer_id, title, description, event_type, eligibility, registration_deadline, starts_at, ends_at, capacity, registration_fee, requires_approval, status, form_schema, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'draft', $12, $13, $13)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(organizer_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.event_type.as_str())
        .bind(request.eligibility.as_str())
        .bind(request.registration_deadline)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(request.capacity)
        .bind(request.effective_fee())
        .bind(request.requires_approval)
        .bind(&request.form_schema)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for variant in &request.variants {
            sqlx::query(
                r#"
                INSERT INTO event_variants (event_id, size, color, stock_quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#
            )
            .bind(event.id)
            .bind(&variant.size)
            .bind(&variant.color)
            .bind(variant.stock_quantity)
            .bind(variant.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, CampusGateError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// List merchandise variants of an event
    pub async fn find_variants(&self, event_id: i64) -> Result<Vec<MerchVariant>, CampusGateError> {
        let variants = sqlx::query_as::<_, MerchVariant>(
            "SELECT id, event_id, size, color, stock_quantity, unit_price FROM event_variants WHERE event_id = $1 ORDER BY id ASC"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }

    /// Find one variant of an event
    pub async fn find_variant(&self, event_id: i64, variant_id: i64) -> Result<Option<MerchVariant>, CampusGateError> {
        let variant = sqlx::query_as::<_, MerchVariant>(
            "SELECT id, event_id, size, color, stock_quantity, unit_price FROM event_variants WHERE event_id = $1 AND id = $2"
        )
        .bind(event_id)
        .bind(variant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(variant)
    }

    /// Update editable event fields
    pub async fn update_fields(&self, id: i64, request: UpdateEventRequest) -> Result<Event, CampusGateError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                registration_deadline = COALESCE($4, registration_deadline),
                capacity = COALESCE($5, capacity),
                form_schema = COALESCE($6, form_schema),
                updated_at = $7
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title)
        .bind(request.description)
        .bind(request.registration_deadline)
        .bind(request.capacity)
        .bind(request.form_schema)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Compare-and-set status transition. Returns false if the stored status
    /// no longer matches `from` (a concurrent transition won).
    pub async fn transition_status(&self, id: i64, from: &str, to: &str) -> Result<bool, CampusGateError> {
        let result = sqlx::query(
            "UPDATE events SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2"
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a draft event; registrations and variants cascade
    pub async fn delete(&self, id: i64) -> Result<(), CampusGateError> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Adjust the running attendance counter, clamped at zero
    pub async fn adjust_attendance(&self, event_id: i64, delta: i32) -> Result<(), CampusGateError> {
        sqlx::query(
            "UPDATE events SET total_attendance = GREATEST(total_attendance + $2, 0), updated_at = $3 WHERE id = $1"
        )
        .bind(event_id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count registrations occupying capacity (everything not rejected or cancelled)
    pub async fn count_active_registrations(&self, event_id: i64) -> Result<i64, CampusGateError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status NOT IN ('rejected', 'cancelled')"
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
