//! Inventory ledger service
//!
//! Authoritative stock and aggregate counters for an event. Submission-time
//! stock checks are advisory and mutate nothing; the authoritative decrement
//! plus revenue credit happens exactly once inside the finalization
//! transaction (`RegistrationRepository::finalize`), so a losing racer for
//! the last unit surfaces an out-of-stock error instead of negative stock.

use tracing::debug;

use crate::database::repositories::EventRepository;
use crate::models::event::MerchVariant;
use crate::utils::errors::{CampusGateError, Result};

/// Inventory ledger over an event's variants and counters
#[derive(Clone)]
pub struct InventoryService {
    event_repository: EventRepository,
}

impl InventoryService {
    pub fn new(event_repository: EventRepository) -> Self {
        Self { event_repository }
    }

    /// Locate a variant and confirm the requested quantity is available.
    /// Read-only: no stock is held or reserved by this check.
    pub async fn reserve_check(&self, event_id: i64, variant_id: i64, quantity: i32) -> Result<MerchVariant> {
        let variant = self
            .event_repository
            .find_variant(event_id, variant_id)
            .await?
            .ok_or(CampusGateError::VariantNotFound { variant_id, event_id })?;

        check_stock(&variant, quantity)?;

        debug!(
            event_id = event_id,
            variant_id = variant_id,
            quantity = quantity,
            available = variant.stock_quantity,
            "Stock check passed"
        );
        Ok(variant)
    }

    /// Adjust the event's running attendance counter; the SQL clamps at zero
    pub async fn adjust_attendance(&self, event_id: i64, delta: i32) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        self.event_repository.adjust_attendance(event_id, delta).await
    }
}

/// Pure stock-sufficiency rule shared by the advisory check
pub fn check_stock(variant: &MerchVariant, quantity: i32) -> Result<()> {
    if variant.stock_quantity < quantity {
        return Err(CampusGateError::OutOfStock {
            variant_id: variant.id,
            requested: quantity,
            available: variant.stock_quantity,
        });
    }
    Ok(())
}

/// Signed attendance delta for a transition between attendance states:
/// +1 entering present, -1 leaving present, 0 otherwise.
pub fn attendance_delta(was_present: bool, now_present: bool) -> i32 {
    match (was_present, now_present) {
        (false, true) => 1,
        (true, false) => -1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(stock: i32) -> MerchVariant {
        MerchVariant {
            id: 1,
            event_id: 1,
            size: Some("L".to_string()),
            color: None,
            stock_quantity: stock,
            unit_price: 500,
        }
    }

    #[test]
    fn test_check_stock() {
        assert!(check_stock(&variant(5), 5).is_ok());
        assert!(check_stock(&variant(5), 1).is_ok());

        let err = check_stock(&variant(2), 3).unwrap_err();
        match err {
            CampusGateError::OutOfStock { requested, available, .. } => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_attendance_delta() {
        assert_eq!(attendance_delta(false, true), 1);
        assert_eq!(attendance_delta(true, false), -1);
        assert_eq!(attendance_delta(true, true), 0);
        assert_eq!(attendance_delta(false, false), 0);
    }
}
