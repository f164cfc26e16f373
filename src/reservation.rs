//! Purchase reservations.
//!
//! A reservation pairs a purchase ledger entry and a service-fee ledger
//! entry under one hold against the wallet's available balance, pending an
//! external fulfillment outcome. Transitions are driven only by the owning
//! wallet.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{ClientId, LedgerId, ReservationId, WalletId};
use crate::money::{Money, MoneyError};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReservationError {
    #[error("reservation is already {0:?}")]
    InvalidTransition(ReservationStatus),
}

/// Lifecycle of a reservation. Completed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservationStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

/// A two-entry hold awaiting settlement or release.
#[derive(Debug, Clone)]
pub struct PurchaseReservation {
    id: ReservationId,
    client_id: ClientId,
    wallet_id: WalletId,
    purchase_entry: LedgerId,
    service_fee_entry: LedgerId,
    purchase_amount: Money,
    service_fee_amount: Money,
    total_amount: Money,
    description: String,
    supplier_details: String,
    payment_method: String,
    status: ReservationStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    processed_by: Option<String>,
}

impl PurchaseReservation {
    /// Create a pending reservation. The total is derived from the two
    /// amounts, so `total == purchase + fee` holds by construction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_id: ClientId,
        wallet_id: WalletId,
        purchase_entry: LedgerId,
        service_fee_entry: LedgerId,
        purchase_amount: Money,
        service_fee_amount: Money,
        description: &str,
        supplier_details: &str,
        payment_method: &str,
    ) -> Result<Self, MoneyError> {
        let total_amount = purchase_amount.checked_add(service_fee_amount)?;
        Ok(PurchaseReservation {
            id: Uuid::new_v4(),
            client_id,
            wallet_id,
            purchase_entry,
            service_fee_entry,
            purchase_amount,
            service_fee_amount,
            total_amount,
            description: description.to_string(),
            supplier_details: supplier_details.to_string(),
            payment_method: payment_method.to_string(),
            status: ReservationStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            processed_by: None,
        })
    }

    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    pub fn purchase_entry(&self) -> LedgerId {
        self.purchase_entry
    }

    pub fn service_fee_entry(&self) -> LedgerId {
        self.service_fee_entry
    }

    pub fn purchase_amount(&self) -> Money {
        self.purchase_amount
    }

    pub fn service_fee_amount(&self) -> Money {
        self.service_fee_amount
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn supplier_details(&self) -> &str {
        &self.supplier_details
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn processed_by(&self) -> Option<&str> {
        self.processed_by.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReservationStatus::Pending
    }

    /// Settle the hold. Fails from any terminal state.
    pub fn complete(&mut self, processed_by: &str) -> Result<(), ReservationError> {
        if self.status != ReservationStatus::Pending {
            return Err(ReservationError::InvalidTransition(self.status));
        }
        self.status = ReservationStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.processed_by = Some(processed_by.to_string());
        Ok(())
    }

    /// Release the hold. Fails from any terminal state.
    pub fn cancel(&mut self, reason: &str, cancelled_by: &str) -> Result<(), ReservationError> {
        if self.status != ReservationStatus::Pending {
            return Err(ReservationError::InvalidTransition(self.status));
        }
        self.status = ReservationStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());
        self.cancellation_reason = Some(reason.to_string());
        self.processed_by = Some(cancelled_by.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use rust_decimal_macros::dec;

    fn reservation(purchase: Money, fee: Money) -> PurchaseReservation {
        PurchaseReservation::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            purchase,
            fee,
            "laptop",
            "ACME Supplies",
            "bank transfer",
        )
        .unwrap()
    }

    #[test]
    fn total_is_purchase_plus_fee() {
        let r = reservation(
            Money::new(dec!(600), Currency::USD),
            Money::new(dec!(50), Currency::USD),
        );
        assert_eq!(r.total_amount(), Money::new(dec!(650), Currency::USD));
        assert!(r.is_pending());
        assert_eq!(r.processed_by(), None);
    }

    #[test]
    fn mixed_currency_amounts_rejected() {
        let result = PurchaseReservation::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::new(dec!(600), Currency::USD),
            Money::new(dec!(50), Currency::EUR),
            "laptop",
            "ACME Supplies",
            "bank transfer",
        );
        assert!(result.is_err());
    }

    #[test]
    fn complete_stamps_actor_and_time() {
        let mut r = reservation(
            Money::new(dec!(100), Currency::USD),
            Money::new(dec!(5), Currency::USD),
        );
        r.complete("ops").unwrap();

        assert_eq!(r.status(), ReservationStatus::Completed);
        assert_eq!(r.processed_by(), Some("ops"));
        assert!(r.completed_at().is_some());
        assert!(r.cancelled_at().is_none());
    }

    #[test]
    fn cancel_stamps_reason() {
        let mut r = reservation(
            Money::new(dec!(100), Currency::USD),
            Money::new(dec!(5), Currency::USD),
        );
        r.cancel("supplier out of stock", "ops").unwrap();

        assert_eq!(r.status(), ReservationStatus::Cancelled);
        assert_eq!(r.cancellation_reason(), Some("supplier out of stock"));
        assert!(r.cancelled_at().is_some());
    }

    #[test]
    fn terminal_states_reject_transitions() {
        let mut completed = reservation(
            Money::new(dec!(100), Currency::USD),
            Money::new(dec!(0), Currency::USD),
        );
        completed.complete("ops").unwrap();
        assert_eq!(
            completed.complete("ops"),
            Err(ReservationError::InvalidTransition(
                ReservationStatus::Completed
            ))
        );
        assert_eq!(
            completed.cancel("too late", "ops"),
            Err(ReservationError::InvalidTransition(
                ReservationStatus::Completed
            ))
        );

        let mut cancelled = reservation(
            Money::new(dec!(100), Currency::USD),
            Money::new(dec!(0), Currency::USD),
        );
        cancelled.cancel("changed mind", "ops").unwrap();
        assert_eq!(
            cancelled.complete("ops"),
            Err(ReservationError::InvalidTransition(
                ReservationStatus::Cancelled
            ))
        );
    }
}
