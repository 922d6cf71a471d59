//! Parcel use-case service.
//!
//! # Responsibility
//! - Provide tracker entry points (register, advance, re-address, cancel).
//! - Delegate persistence to `ParcelStore` implementations.
//!
//! # Invariants
//! - Service APIs never bypass store validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::parcel::{ClientId, Parcel, ParcelNumber};
use crate::repo::parcel_repo::{ParcelStore, RepoResult, WriteOutcome};
use log::info;

/// Use-case service wrapper for parcel tracking.
pub struct ParcelService<S: ParcelStore> {
    store: S,
}

impl<S: ParcelStore> ParcelService<S> {
    /// Creates a service using the provided store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a new parcel for `client`.
    ///
    /// # Contract
    /// - Status is `registered`, `created_at` is the current UTC time.
    /// - Returns the stored parcel including its assigned number.
    pub fn register(&self, client: ClientId, address: impl Into<String>) -> RepoResult<Parcel> {
        let mut parcel = Parcel::new(client, address);
        parcel.number = self.store.add(&parcel)?;
        info!(
            "event=parcel_register module=service status=ok number={} client={}",
            parcel.number, client
        );
        Ok(parcel)
    }

    /// Lists all parcels owned by `client`.
    pub fn client_parcels(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        self.store.get_by_client(client)
    }

    /// Advances a parcel one step along `registered -> sent -> delivered`.
    ///
    /// # Contract
    /// - Terminal statuses (including unknown labels) are left unchanged and
    ///   reported as `PreconditionFailed`.
    /// - The write only applies if the status is still the one just read;
    ///   a concurrent change yields `PreconditionFailed`.
    /// - Returns `RepoError::NotFound` when the parcel does not exist.
    pub fn next_status(&self, number: ParcelNumber) -> RepoResult<WriteOutcome> {
        let parcel = self.store.get(number)?;
        let Some(next) = parcel.status.next() else {
            info!(
                "event=parcel_next_status module=service status=skipped number={} from={}",
                number, parcel.status
            );
            return Ok(WriteOutcome::PreconditionFailed);
        };

        let outcome = self.store.advance_status(number, &parcel.status, &next)?;
        info!(
            "event=parcel_next_status module=service status=ok number={} from={} to={}",
            number, parcel.status, next
        );
        Ok(outcome)
    }

    /// Changes the delivery address of a `registered` parcel.
    pub fn change_address(&self, number: ParcelNumber, address: &str) -> RepoResult<WriteOutcome> {
        self.store.set_address(number, address)
    }

    /// Cancels a `registered` parcel by deleting it.
    pub fn delete(&self, number: ParcelNumber) -> RepoResult<WriteOutcome> {
        self.store.delete(number)
    }
}
