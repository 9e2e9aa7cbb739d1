//! Registration lifecycle service
//!
//! Owns the registration state machine: submission, the two independent
//! approval gates (payment and registration approval), and finalization.
//! Finalization — ticket issuance, QR generation, inventory commit and the
//! confirmation notification — runs exactly once per registration, triggered
//! by whichever required gate clears last. The idempotency marker is the
//! persisted ticket ID; the race between the two approval paths is resolved
//! inside `RegistrationRepository::finalize`.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::{DatabaseService, FinalizeOutcome};
use crate::middleware::auth::Principal;
use crate::models::event::Event;
use crate::models::registration::{
    initial_gates, Registration, RegistrationOutcome, RegistrationPayload, RegistrationStatus,
    SubmitRegistrationRequest, AttendanceStatus,
};
use crate::models::user::User;
use crate::services::inventory::InventoryService;
use crate::services::notification::NotificationService;
use crate::services::storage::ProofStorageService;
use crate::services::ticket::{TicketIdentity, TicketService};
use crate::utils::errors::{CampusGateError, Result};
use crate::utils::logging;

/// Registration lifecycle service
#[derive(Clone)]
pub struct RegistrationService {
    db: DatabaseService,
    inventory: InventoryService,
    ticket: TicketService,
    notifications: NotificationService,
    storage: ProofStorageService,
}

impl RegistrationService {
    pub fn new(
        db: DatabaseService,
        inventory: InventoryService,
        ticket: TicketService,
        notifications: NotificationService,
        storage: ProofStorageService,
    ) -> Self {
        Self {
            db,
            inventory,
            ticket,
            notifications,
            storage,
        }
    }

    /// Submit a registration for an event.
    ///
    /// Validates the registration window, eligibility, capacity, duplicate
    /// submissions and (for merchandise) variant stock — the stock check is
    /// advisory, nothing is committed before approval. If no gate is
    /// required the registration finalizes immediately.
    pub async fn submit(
        &self,
        event_id: i64,
        user: &User,
        request: SubmitRegistrationRequest,
    ) -> Result<RegistrationOutcome> {
        let event = self.load_event(event_id).await?;
        event.check_accepting_registrations(Utc::now())?;

        if !event.eligibility().allows(user.is_campus_student) {
            return Err(CampusGateError::PermissionDenied(
                "This event is not open to your participant group".to_string(),
            ));
        }

        if self
            .db
            .registrations
            .find_by_user_and_event(user.id, event_id)
            .await?
            .is_some()
        {
            return Err(CampusGateError::DuplicateRegistration {
                user_id: user.id,
                event_id,
            });
        }

        if let Some(capacity) = event.capacity {
            let taken = self.db.events.count_active_registrations(event_id).await?;
            if taken >= i64::from(capacity) {
                return Err(CampusGateError::InvalidInput(
                    "Event capacity has been reached".to_string(),
                ));
            }
        }

        let payload = RegistrationPayload::from_request(&event, &request)?;

        let variant = match &payload {
            RegistrationPayload::Merchandise { variant_id, quantity } => {
                Some(self.inventory.reserve_check(event_id, *variant_id, *quantity).await?)
            }
            RegistrationPayload::FormAnswers(_) => None,
        };

        let (payment_gate, registration_gate) = initial_gates(&event, variant.as_ref());
        let status = RegistrationStatus::derive(payment_gate, registration_gate, AttendanceStatus::NotChecked);

        let registration = self
            .db
            .registrations
            .create(
                event_id,
                user.id,
                payment_gate,
                registration_gate,
                status.as_str(),
                &payload,
                request.team_name,
            )
            .await?;

        info!(
            registration_id = registration.id,
            event_id = event_id,
            user_id = user.id,
            status = status.as_str(),
            "Registration submitted"
        );

        let registration = if registration.awaiting_finalization() {
            self.finalize(&event, registration).await?
        } else {
            registration
        };

        Ok(RegistrationOutcome {
            registration_id: registration.id,
            status: registration.status(),
            ticket_id: registration.ticket_id.clone(),
            requires_payment_proof: registration.payment_gate().is_pending(),
            requires_approval: registration.registration_gate().is_pending(),
        })
    }

    /// Attach an uploaded payment-proof image to a pending payment
    pub async fn upload_payment_proof(
        &self,
        event_id: i64,
        principal: &Principal,
        bytes: &[u8],
    ) -> Result<String> {
        let registration = self
            .db
            .registrations
            .find_by_user_and_event(principal.user_id, event_id)
            .await?
            .ok_or(CampusGateError::NotRegistered {
                user_id: principal.user_id,
                event_id,
            })?;

        if !registration.payment_gate().is_pending() {
            return Err(CampusGateError::AlreadyProcessed(
                "payment is not awaiting proof".to_string(),
            ));
        }

        let path = self.storage.save(registration.id, bytes).await?;
        let attached = self
            .db
            .registrations
            .attach_payment_proof(registration.id, &path)
            .await?;

        if !attached {
            self.storage.discard(&path).await;
            return Err(CampusGateError::AlreadyProcessed(
                "payment was decided while the proof was uploading".to_string(),
            ));
        }

        info!(registration_id = registration.id, event_id = event_id, "Payment proof attached");
        Ok(path)
    }

    /// Approve a pending payment. Requires an attached proof. Finalizes the
    /// registration if the registration-approval gate is also clear.
    pub async fn approve_payment(
        &self,
        event_id: i64,
        registration_id: i64,
        principal: &Principal,
    ) -> Result<Registration> {
        let event = self.require_organizer(event_id, principal).await?;
        let registration = self.load_registration(event_id, registration_id).await?;

        if !registration.payment_gate().is_pending() {
            // An approval that failed between the gate flip and ticket
            // issuance (say, the variant sold out mid-finalization) leaves
            // the gates cleared with no ticket. Finalization is idempotent,
            // so a retried approval re-enters it rather than wedging the
            // registration behind an already-processed conflict.
            if registration.awaiting_finalization() {
                return self.finalize(&event, registration).await;
            }
            return Err(CampusGateError::AlreadyProcessed(format!(
                "payment approval is already {}",
                registration.payment_approval
            )));
        }
        let proof_path = registration.payment_proof_path.clone().ok_or_else(|| {
            CampusGateError::InvalidInput("No payment proof has been uploaded".to_string())
        })?;

        let flipped = self.db.registrations.approve_payment_gate(registration_id).await?;
        if !flipped {
            return Err(CampusGateError::AlreadyProcessed(
                "payment approval was decided concurrently".to_string(),
            ));
        }
        self.storage.discard(&proof_path).await;

        logging::log_registration_action(registration_id, event_id, "payment_approved", principal.user_id);

        let registration = self.reload(registration_id).await?;
        if registration.awaiting_finalization() {
            return self.finalize(&event, registration).await;
        }
        debug!(
            registration_id = registration_id,
            "Payment approved but registration approval still pending, finalization deferred"
        );
        Ok(registration)
    }

    /// Reject a pending payment; the registration becomes rejected and no
    /// inventory is ever committed for it.
    pub async fn reject_payment(
        &self,
        event_id: i64,
        registration_id: i64,
        principal: &Principal,
        reason: &str,
    ) -> Result<Registration> {
        let event = self.require_organizer(event_id, principal).await?;
        let registration = self.load_registration(event_id, registration_id).await?;
        let proof_path = registration.payment_proof_path.clone();

        let flipped = self
            .db
            .registrations
            .reject_payment_gate(registration_id, reason)
            .await?;
        if !flipped {
            return Err(CampusGateError::AlreadyProcessed(format!(
                "payment approval is already {}",
                registration.payment_approval
            )));
        }

        if let Some(path) = proof_path {
            self.storage.discard(&path).await;
        }

        info!(registration_id = registration_id, event_id = event_id, reason = reason, "Payment rejected");
        self.notifications.notify_rejection(&event, registration.user_id, reason);
        self.reload(registration_id).await
    }

    /// Approve the registration-approval gate; finalizes if the payment gate
    /// is also clear, otherwise defers to the payment decision.
    pub async fn approve_registration(
        &self,
        event_id: i64,
        registration_id: i64,
        principal: &Principal,
    ) -> Result<Registration> {
        let event = self.require_organizer(event_id, principal).await?;
        let registration = self.load_registration(event_id, registration_id).await?;

        if !registration.registration_gate().is_pending() {
            // Same recovery as approve_payment: gates cleared with no ticket
            // means an earlier finalization failed, so retry it.
            if registration.awaiting_finalization() {
                return self.finalize(&event, registration).await;
            }
            return Err(CampusGateError::AlreadyProcessed(format!(
                "registration approval is already {}",
                registration.registration_approval
            )));
        }

        let flipped = self
            .db
            .registrations
            .approve_registration_gate(registration_id)
            .await?;
        if !flipped {
            return Err(CampusGateError::AlreadyProcessed(
                "registration approval was decided concurrently".to_string(),
            ));
        }

        logging::log_registration_action(registration_id, event_id, "registration_approved", principal.user_id);

        let registration = self.reload(registration_id).await?;
        if registration.awaiting_finalization() {
            return self.finalize(&event, registration).await;
        }
        debug!(
            registration_id = registration_id,
            "Registration approved but payment still pending, finalization deferred"
        );
        Ok(registration)
    }

    /// Reject the registration-approval gate with a reason
    pub async fn reject_registration(
        &self,
        event_id: i64,
        registration_id: i64,
        principal: &Principal,
        reason: &str,
    ) -> Result<Registration> {
        let event = self.require_organizer(event_id, principal).await?;
        let registration = self.load_registration(event_id, registration_id).await?;

        let flipped = self
            .db
            .registrations
            .reject_registration_gate(registration_id, reason)
            .await?;
        if !flipped {
            return Err(CampusGateError::AlreadyProcessed(format!(
                "registration approval is already {}",
                registration.registration_approval
            )));
        }

        info!(registration_id = registration_id, event_id = event_id, reason = reason, "Registration rejected");
        self.notifications.notify_rejection(&event, registration.user_id, reason);
        self.reload(registration_id).await
    }

    /// Pending payment queue for organizers
    pub async fn pending_payments(&self, event_id: i64, principal: &Principal) -> Result<Vec<Registration>> {
        self.require_organizer(event_id, principal).await?;
        self.db.registrations.pending_payments(event_id).await
    }

    /// Pending registration-approval queue for organizers
    pub async fn pending_registrations(&self, event_id: i64, principal: &Principal) -> Result<Vec<Registration>> {
        self.require_organizer(event_id, principal).await?;
        self.db.registrations.pending_registrations(event_id).await
    }

    /// Re-render the stored QR for a ticket. Owner or organizer only;
    /// blocked while the payment gate is pending or rejected.
    pub async fn ticket_qr(
        &self,
        event_id: i64,
        registration_id: i64,
        principal: &Principal,
    ) -> Result<Vec<u8>> {
        let event = self.load_event(event_id).await?;
        let registration = self.load_registration(event_id, registration_id).await?;

        let is_owner = registration.user_id == principal.user_id;
        let is_organizer = principal.is_organizer_of(&event);
        if !is_owner && !is_organizer {
            return Err(CampusGateError::PermissionDenied(
                "Only the ticket owner or the organizer can view this ticket".to_string(),
            ));
        }

        if !registration.payment_gate().is_cleared() {
            return Err(CampusGateError::NotApprovedForCheckIn(
                "ticket is unavailable while payment is pending or rejected".to_string(),
            ));
        }

        let (encrypted, iv) = match (&registration.qr_encrypted, &registration.qr_iv) {
            (Some(encrypted), Some(iv)) => (encrypted.clone(), iv.clone()),
            _ => {
                return Err(CampusGateError::NotApprovedForCheckIn(
                    "no ticket has been issued".to_string(),
                ))
            }
        };

        Ok(self.ticket.render_stored(&encrypted, &iv)?)
    }

    /// Finalize a registration: issue the ticket, commit inventory and
    /// revenue, and confirm to the participant. Idempotent — a concurrent
    /// finalization is observed and left untouched.
    async fn finalize(&self, event: &Event, registration: Registration) -> Result<Registration> {
        let user = self
            .db
            .users
            .find_by_id(registration.user_id)
            .await?
            .ok_or(CampusGateError::UserNotFound { user_id: registration.user_id })?;

        let identity = TicketIdentity {
            ticket_id: Uuid::new_v4().to_string(),
            user_id: user.id,
            event_id: event.id,
            event_name: event.title.clone(),
            user_name: user.full_name.clone(),
            registration_date: registration.created_at,
        };
        let issued = self.ticket.issue(&identity)?;

        match self
            .db
            .registrations
            .finalize(registration.id, &identity.ticket_id, &issued.encrypted, &issued.iv)
            .await?
        {
            FinalizeOutcome::Finalized(finalized) => {
                info!(
                    registration_id = finalized.id,
                    event_id = event.id,
                    ticket_id = %identity.ticket_id,
                    "Registration finalized, ticket issued"
                );
                self.notifications
                    .notify_registration_confirmed(event, user.id, &identity.ticket_id);
                Ok(finalized)
            }
            FinalizeOutcome::AlreadyFinalized(existing) => {
                warn!(
                    registration_id = existing.id,
                    event_id = event.id,
                    "Finalization raced with a concurrent approval, keeping existing ticket"
                );
                Ok(existing)
            }
        }
    }

    async fn load_event(&self, event_id: i64) -> Result<Event> {
        self.db
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(CampusGateError::EventNotFound { event_id })
    }

    async fn load_registration(&self, event_id: i64, registration_id: i64) -> Result<Registration> {
        self.db
            .registrations
            .find_in_event(event_id, registration_id)
            .await?
            .ok_or(CampusGateError::RegistrationNotFound { registration_id })
    }

    async fn reload(&self, registration_id: i64) -> Result<Registration> {
        self.db
            .registrations
            .find_by_id(registration_id)
            .await?
            .ok_or(CampusGateError::RegistrationNotFound { registration_id })
    }

    async fn require_organizer(&self, event_id: i64, principal: &Principal) -> Result<Event> {
        let event = self.load_event(event_id).await?;
        if !principal.is_organizer_of(&event) {
            return Err(CampusGateError::PermissionDenied(
                "Only the event organizer can perform this action".to_string(),
            ));
        }
        Ok(event)
    }
}
