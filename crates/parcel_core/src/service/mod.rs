//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into tracker-level operations.
//! - Keep callers decoupled from storage details.

pub mod parcel_service;
