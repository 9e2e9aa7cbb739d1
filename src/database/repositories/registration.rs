//! Registration repository implementation
//!
//! All state-machine races are resolved here, at the data layer: gate flips
//! are compare-and-set updates, and finalization runs in one transaction
//! that locks the registration row and is guarded by `ticket_id IS NULL`.

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::registration::{Registration, ScanHistoryEntry, ApprovalGate, AttendanceRow, RegistrationPayload, ScanAction};
use crate::utils::errors::CampusGateError;

const REGISTRATION_COLUMNS: &str = "id, event_id, user_id, status, payment_approval, registration_approval, payment_proof_path, payment_rejection_reason, registration_rejection_reason, ticket_id, qr_encrypted, qr_iv, attendance_status, attendance_marked_at, attendance_marked_by, manual_override, override_reason, variant_id, quantity, form_answers, team_name, created_at, updated_at";

/// Outcome of the finalization transaction
#[derive(Debug)]
pub enum FinalizeOutcome {
    /// This call won the race and issued the ticket
    Finalized(Registration),
    /// A concurrent finalization already issued the ticket
    AlreadyFinalized(Registration),
}

#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a freshly submitted registration
    pub async fn create(
        &self,
        event_id: i64,
        user_id: i64,
        payment: ApprovalGate,
        registration: ApprovalGate,
        status: &str,
        payload: &RegistrationPayload,
        team_name: Option<String>,
    ) -> Result<Registration, CampusGateError> {
        let (variant_id, quantity, form_answers) = match payload {
            RegistrationPayload::Merchandise { variant_id, quantity } => {
                (Some(*variant_id), Some(*quantity), None)
            }
            RegistrationPayload::FormAnswers(answers) => (None, None, Some(answers.clone())),
        };

        let created = sqlx::query_as::<_, Registration>(&format!(
            r#"
            INSERT INTO registrations (event_id, user_id, status, payment_approval, registration_approval, attendance_status, manual_override, variant_id, quantity, form_answers, team_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'not_checked', false, $6, $7, $8, $9, $10, $10)
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(user_id)
        .bind(status)
        .bind(payment.as_str())
        .bind(registration.as_str())
        .bind(variant_id)
        .bind(quantity)
        .bind(form_answers)
        .bind(team_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Find registration by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Registration>, CampusGateError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Find a registration scoped to an event
    pub async fn find_in_event(&self, event_id: i64, id: i64) -> Result<Option<Registration>, CampusGateError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 AND id = $2"
        ))
        .bind(event_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Find a user's registration for an event (unique pair)
    pub async fn find_by_user_and_event(&self, user_id: i64, event_id: i64) -> Result<Option<Registration>, CampusGateError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 AND event_id = $2"
        ))
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Resolve a ticket ID to its registration within an event
    pub async fn find_by_ticket(&self, event_id: i64, ticket_id: &str) -> Result<Option<Registration>, CampusGateError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 AND ticket_id = $2"
        ))
        .bind(event_id)
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Attach a payment-proof path. Only legal while the payment gate is
    /// pending; returns false otherwise.
    pub async fn attach_payment_proof(&self, id: i64, path: &str) -> Result<bool, CampusGateError> {
        let result = sqlx::query(
            "UPDATE registrations SET payment_proof_path = $2, updated_at = $3 WHERE id = $1 AND payment_approval = 'pending'"
        )
        .bind(id)
        .bind(path)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Approve the payment gate. Compare-and-set from pending; the stored
    /// proof image reference is discarded on approval.
    pub async fn approve_payment_gate(&self, id: i64) -> Result<bool, CampusGateError> {
        let result = sqlx::query(
            "UPDATE registrations SET payment_approval = 'approved', payment_proof_path = NULL, updated_at = $2 WHERE id = $1 AND payment_approval = 'pending'"
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Reject the payment gate with a reason; the registration becomes
    /// rejected and the proof image reference is discarded.
    pub async fn reject_payment_gate(&self, id: i64, reason: &str) -> Result<bool, CampusGateError> {
        let result = sqlx::query(
            "UPDATE registrations SET payment_approval = 'rejected', payment_rejection_reason = $2, payment_proof_path = NULL, status = 'rejected', updated_at = $3 WHERE id = $1 AND payment_approval = 'pending'"
        )
        .bind(id)
        .bind(reason)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Approve the registration gate. Compare-and-set from pending.
    pub async fn approve_registration_gate(&self, id: i64) -> Result<bool, CampusGateError> {
        let result = sqlx::query(
            "UPDATE registrations SET registration_approval = 'approved', updated_at = $2 WHERE id = $1 AND registration_approval = 'pending'"
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Reject the registration gate with a reason
    pub async fn reject_registration_gate(&self, id: i64, reason: &str) -> Result<bool, CampusGateError> {
        let result = sqlx::query(
            "UPDATE registrations SET registration_approval = 'rejected', registration_rejection_reason = $2, status = 'rejected', updated_at = $3 WHERE id = $1 AND registration_approval = 'pending'"
        )
        .bind(id)
        .bind(reason)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Finalize a registration exactly once: issue the ticket, commit stock
    /// and revenue, and move the registration to `registered`.
    ///
    /// Runs in a single transaction with the registration row locked. The
    /// persisted "not yet finalized" marker is `ticket_id IS NULL`; a racer
    /// that finds the ticket already set observes `AlreadyFinalized` and
    /// mutates nothing. The stock decrement is conditional on sufficient
    /// stock, so two submissions racing for the last unit cannot both win.
    pub async fn finalize(
        &self,
        id: i64,
        ticket_id: &str,
        qr_encrypted: &str,
        qr_iv: &str,
    ) -> Result<FinalizeOutcome, CampusGateError> {
        let mut tx = self.pool.begin().await?;

        let registration = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CampusGateError::RegistrationNotFound { registration_id: id })?;

        if registration.ticket_id.is_some() {
            tx.rollback().await?;
            return Ok(FinalizeOutcome::AlreadyFinalized(registration));
        }

        if !registration.gates_cleared() {
            tx.rollback().await?;
            return Err(CampusGateError::NotApprovedForCheckIn(
                "finalization requires both approval gates to be cleared".to_string(),
            ));
        }

        // Revenue uses the price at commit time, not submission time.
        let revenue = match (registration.variant_id, registration.quantity) {
            (Some(variant_id), Some(quantity)) => {
                let variant: Option<(i32, i64)> = sqlx::query_as(
                    "SELECT stock_quantity, unit_price FROM event_variants WHERE id = $1 FOR UPDATE"
                )
                .bind(variant_id)
                .fetch_optional(&mut *tx)
                .await?;

                let (available, unit_price) = variant.ok_or(CampusGateError::VariantNotFound {
                    variant_id,
                    event_id: registration.event_id,
                })?;

                let decremented = sqlx::query(
                    "UPDATE event_variants SET stock_quantity = stock_quantity - $2 WHERE id = $1 AND stock_quantity >= $2"
                )
                .bind(variant_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;

                if decremented.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(CampusGateError::OutOfStock {
                        variant_id,
                        requested: quantity,
                        available,
                    });
                }

                unit_price * i64::from(quantity)
            }
            _ => {
                let fee: (i64,) = sqlx::query_as("SELECT registration_fee FROM events WHERE id = $1")
                    .bind(registration.event_id)
                    .fetch_one(&mut *tx)
                    .await?;
                fee.0
            }
        };

        sqlx::query(
            "UPDATE events SET total_registrations = total_registrations + 1, total_revenue = total_revenue + $2, updated_at = $3 WHERE id = $1"
        )
        .bind(registration.event_id)
        .bind(revenue)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let finalized = sqlx::query_as::<_, Registration>(&format!(
            r#"
            UPDATE registrations
            SET ticket_id = $2, qr_encrypted = $3, qr_iv = $4, status = 'registered', updated_at = $5
            WHERE id = $1 AND ticket_id IS NULL
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(ticket_id)
        .bind(qr_encrypted)
        .bind(qr_iv)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(FinalizeOutcome::Finalized(finalized))
    }

    /// Mark a registration present via a scan. Compare-and-set on the
    /// attendance status so a replayed scan affects nothing.
    pub async fn mark_present(&self, id: i64, actor_id: i64, at: DateTime<Utc>) -> Result<bool, CampusGateError> {
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET attendance_status = 'present', status = 'attended', attendance_marked_at = $2, attendance_marked_by = $3, updated_at = $2
            WHERE id = $1 AND attendance_status <> 'present'
            "#
        )
        .bind(id)
        .bind(at)
        .bind(actor_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Unconditionally overwrite the attendance status with an organizer
    /// override, recording the actor and reason.
    pub async fn override_attendance(
        &self,
        id: i64,
        target: &str,
        overall_status: &str,
        actor_id: i64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Registration, CampusGateError> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            r#"
            UPDATE registrations
            SET attendance_status = $2, status = $3, attendance_marked_at = $4, attendance_marked_by = $5, manual_override = true, override_reason = $6, updated_at = $4
            WHERE id = $1
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(target)
        .bind(overall_status)
        .bind(at)
        .bind(actor_id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Batch-mark every still-unchecked registration absent. Returns the
    /// number of rows touched; no per-row audit entries are written.
    pub async fn bulk_mark_absent(&self, event_id: i64, at: DateTime<Utc>) -> Result<u64, CampusGateError> {
        let result = sqlx::query(
            "UPDATE registrations SET attendance_status = 'absent', attendance_marked_at = $2, updated_at = $2 WHERE event_id = $1 AND attendance_status = 'not_checked'"
        )
        .bind(event_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Registrations awaiting payment approval for an event
    pub async fn pending_payments(&self, event_id: i64) -> Result<Vec<Registration>, CampusGateError> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 AND payment_approval = 'pending' ORDER BY created_at ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    /// Registrations awaiting registration approval for an event
    pub async fn pending_registrations(&self, event_id: i64) -> Result<Vec<Registration>, CampusGateError> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 AND registration_approval = 'pending' ORDER BY created_at ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    /// Attendance roster joined with participant identity, for the
    /// dashboard and CSV export. Registrations whose payment gate blocks
    /// them (pending or rejected) are excluded.
    pub async fn attendance_roster_rows(&self, event_id: i64) -> Result<Vec<AttendanceRow>, CampusGateError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT r.id AS registration_id, r.user_id, u.full_name, u.email, r.ticket_id, r.attendance_status, r.attendance_marked_at, r.manual_override
            FROM registrations r
            INNER JOIN users u ON u.id = r.user_id
            WHERE r.event_id = $1 AND r.payment_approval NOT IN ('pending', 'rejected')
            ORDER BY r.created_at ASC
            "#
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Append an audit entry to the scan history. Insert-only; there is no
    /// update or delete path for this table.
    pub async fn append_scan_history(
        &self,
        registration_id: i64,
        action: ScanAction,
        actor_id: i64,
        notes: Option<&str>,
    ) -> Result<ScanHistoryEntry, CampusGateError> {
        let entry = sqlx::query_as::<_, ScanHistoryEntry>(
            r#"
            INSERT INTO scan_history (registration_id, action, actor_id, notes, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, registration_id, action, actor_id, notes, created_at
            "#
        )
        .bind(registration_id)
        .bind(action.as_str())
        .bind(actor_id)
        .bind(notes)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Scan history for a registration, ordered by occurrence
    pub async fn scan_history(&self, registration_id: i64) -> Result<Vec<ScanHistoryEntry>, CampusGateError> {
        let entries = sqlx::query_as::<_, ScanHistoryEntry>(
            "SELECT id, registration_id, action, actor_id, notes, created_at FROM scan_history WHERE registration_id = $1 ORDER BY created_at ASC, id ASC"
        )
        .bind(registration_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
