//! Domain model for tracked shipments.
//!
//! # Responsibility
//! - Define canonical data structures used by the store and services.
//!
//! # Invariants
//! - Every persisted parcel is identified by a storage-assigned `ParcelNumber`.
//! - Deletion is a hard delete, allowed only for `registered` parcels.

pub mod parcel;
