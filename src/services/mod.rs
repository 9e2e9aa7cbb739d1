//! Services module
//!
//! This module contains business logic services

pub mod attendance;
pub mod event;
pub mod inventory;
pub mod notification;
pub mod registration;
pub mod storage;
pub mod ticket;

// Re-export commonly used services
pub use attendance::{AttendanceService, AttendanceDashboard, ScanResult};
pub use event::{EventService, EventDetail};
pub use inventory::InventoryService;
pub use notification::{NotificationService, NotificationMessage};
pub use registration::RegistrationService;
pub use storage::ProofStorageService;
pub use ticket::{TicketService, TicketIdentity, TicketEnvelope, IssuedTicket};

use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub event_service: EventService,
    pub registration_service: RegistrationService,
    pub attendance_service: AttendanceService,
    pub inventory_service: InventoryService,
    pub ticket_service: TicketService,
    pub notification_service: NotificationService,
    pub storage_service: ProofStorageService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings, db: DatabaseService) -> Result<Self> {
        let ticket_service = TicketService::new(settings)?;
        let notification_service = NotificationService::new(settings);
        let storage_service = ProofStorageService::new(settings);
        let inventory_service = InventoryService::new(db.events.clone());

        let attendance_service = AttendanceService::new(
            db.clone(),
            inventory_service.clone(),
            ticket_service.clone(),
        );
        let registration_service = RegistrationService::new(
            db.clone(),
            inventory_service.clone(),
            ticket_service.clone(),
            notification_service.clone(),
            storage_service.clone(),
        );
        let event_service = EventService::new(
            db,
            notification_service.clone(),
            attendance_service.clone(),
        );

        Ok(Self {
            event_service,
            registration_service,
            attendance_service,
            inventory_service,
            ticket_service,
            notification_service,
            storage_service,
        })
    }
}
