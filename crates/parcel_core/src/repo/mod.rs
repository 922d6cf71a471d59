//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for parcels.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Parcel::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod parcel_repo;
