//! Booking write operations shared by both services.
//!
//! `BookingService` applies the brand's night rules, then hands the write to
//! a `BookingBackend`: the local store on the hub, the channel manager on
//! the adapter. The source-of-truth guard only applies to backends that
//! mutate local state. The writer lock runs earlier, in the HTTP
//! middleware.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::config::BrandRule;
use crate::domain::{Booking, BookingStatus, Brand, NewBooking, UnitId};
use crate::guard::{GuardError, GuardOperation, SourceOfTruthGuard};
use crate::interfaces::{BookingStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("booking {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} is not linked to the channel manager")]
    NotLinked(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("channel manager error: {0}")]
    Upstream(String),
}

/// Where booking writes are executed.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn get(&self, booking_id: &str) -> Result<Option<Booking>, BackendError>;

    async fn create(&self, brand: &Brand, booking: &NewBooking) -> Result<Booking, BackendError>;

    async fn update_dates(
        &self,
        booking_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Booking, BackendError>;

    async fn update_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<Booking, BackendError>;

    async fn cancel(&self, booking_id: &str) -> Result<Booking, BackendError>;

    /// Whether writes change the platform's own booking state and so must
    /// pass the source-of-truth guard.
    fn mutates_local_state(&self) -> bool {
        true
    }
}

// ============================================================================
// Local backend
// ============================================================================

/// Bookings persisted in the platform's own store.
pub struct LocalBookingBackend {
    store: Arc<dyn BookingStore>,
}

impl LocalBookingBackend {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }
}

fn from_store(err: StoreError) -> BackendError {
    match err {
        StoreError::NotFound(id) => BackendError::NotFound(id),
        StoreError::Conflict(message) => BackendError::Conflict(message),
        other => BackendError::Store(other),
    }
}

/// Overlap checks happen inside the store, atomically with each write.
#[async_trait]
impl BookingBackend for LocalBookingBackend {
    async fn get(&self, booking_id: &str) -> Result<Option<Booking>, BackendError> {
        Ok(self.store.get(booking_id).await?)
    }

    async fn create(&self, brand: &Brand, booking: &NewBooking) -> Result<Booking, BackendError> {
        let created = Booking {
            booking_id: Uuid::new_v4().to_string(),
            brand: brand.clone(),
            unit_id: booking.unit_id.clone(),
            check_in: booking.check_in,
            check_out: booking.check_out,
            status: BookingStatus::Confirmed,
            guest_reference: booking.guest_reference.clone(),
        };
        self.store
            .insert(created.clone())
            .await
            .map_err(from_store)?;
        Ok(created)
    }

    async fn update_dates(
        &self,
        booking_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Booking, BackendError> {
        self.store
            .update_dates(booking_id, check_in, check_out)
            .await
            .map_err(from_store)
    }

    async fn update_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<Booking, BackendError> {
        self.store
            .update_status(booking_id, status)
            .await
            .map_err(from_store)
    }

    async fn cancel(&self, booking_id: &str) -> Result<Booking, BackendError> {
        self.update_status(booking_id, BookingStatus::Cancelled).await
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{nights} nights is outside {brand}'s range of {min}..={max}")]
    NightsOutOfRange {
        brand: Brand,
        nights: i64,
        min: u32,
        max: u32,
    },

    #[error("check-out {check_out} must be after check-in {check_in}")]
    InvalidDates {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub struct BookingService {
    backend: Arc<dyn BookingBackend>,
    guard: Arc<SourceOfTruthGuard>,
    rules: Vec<BrandRule>,
}

impl BookingService {
    pub fn new(
        backend: Arc<dyn BookingBackend>,
        guard: Arc<SourceOfTruthGuard>,
        rules: Vec<BrandRule>,
    ) -> Self {
        Self {
            backend,
            guard,
            rules,
        }
    }

    /// Brands without a configured rule accept any positive stay length.
    fn check_stay(
        &self,
        brand: &Brand,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<(), BookingError> {
        if check_out <= check_in {
            return Err(BookingError::InvalidDates {
                check_in,
                check_out,
            });
        }
        let nights = (check_out - check_in).num_days();
        match self.rules.iter().find(|r| &r.name == brand) {
            Some(rule) if !rule.accepts(nights) => Err(BookingError::NightsOutOfRange {
                brand: brand.clone(),
                nights,
                min: rule.min_nights,
                max: rule.max_nights,
            }),
            _ => Ok(()),
        }
    }

    async fn check_control(
        &self,
        unit_id: &UnitId,
        operation: GuardOperation,
    ) -> Result<(), BookingError> {
        if self.backend.mutates_local_state() {
            self.guard
                .assert_not_externally_controlled(unit_id, operation)
                .await?;
        }
        Ok(())
    }

    /// Existing booking of this brand. Another brand's booking is reported
    /// as missing.
    async fn existing(&self, brand: &Brand, booking_id: &str) -> Result<Booking, BookingError> {
        match self.backend.get(booking_id).await? {
            Some(booking) if &booking.brand == brand => Ok(booking),
            _ => Err(BackendError::NotFound(booking_id.to_string()).into()),
        }
    }

    pub async fn create(&self, brand: &Brand, request: NewBooking) -> Result<Booking, BookingError> {
        self.check_stay(brand, request.check_in, request.check_out)?;
        self.check_control(&request.unit_id, GuardOperation::CreateBooking).await?;

        let booking = self.backend.create(brand, &request).await?;
        info!(
            brand = %brand,
            booking_id = %booking.booking_id,
            unit_id = %booking.unit_id,
            nights = booking.nights(),
            "booking created"
        );
        Ok(booking)
    }

    pub async fn change_dates(
        &self,
        brand: &Brand,
        booking_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Booking, BookingError> {
        let existing = self.existing(brand, booking_id).await?;
        self.check_control(&existing.unit_id, GuardOperation::MutateBookingDates).await?;
        self.check_stay(brand, check_in, check_out)?;

        let booking = self
            .backend
            .update_dates(booking_id, check_in, check_out)
            .await?;
        info!(brand = %brand, booking_id, %check_in, %check_out, "booking dates changed");
        Ok(booking)
    }

    pub async fn change_status(
        &self,
        brand: &Brand,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let existing = self.existing(brand, booking_id).await?;
        self.check_control(&existing.unit_id, GuardOperation::MutateBookingStatus).await?;

        let booking = self.backend.update_status(booking_id, status).await?;
        info!(brand = %brand, booking_id, status = status.as_str(), "booking status changed");
        Ok(booking)
    }

    pub async fn cancel(&self, brand: &Brand, booking_id: &str) -> Result<Booking, BookingError> {
        let existing = self.existing(brand, booking_id).await?;
        self.check_control(&existing.unit_id, GuardOperation::CancelBooking).await?;

        let booking = self.backend.cancel(booking_id).await?;
        info!(brand = %brand, booking_id, "booking cancelled");
        Ok(booking)
    }
}
