//! Parcel domain model.
//!
//! # Responsibility
//! - Define the shipment record persisted in the `parcel` table.
//! - Own the status vocabulary and record-level validation.
//!
//! # Invariants
//! - `number` is assigned by storage and never reused.
//! - `client` and `created_at` are fixed at creation.
//! - `address` may change only while status is `registered`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned parcel identifier.
pub type ParcelNumber = i64;

/// Identifier of the client owning a parcel.
pub type ClientId = i64;

/// Parcel lifecycle label.
///
/// The vocabulary is open: labels outside the known set are preserved as
/// `Other` so persisted rows always round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParcelStatus {
    /// Accepted for shipping. The only state allowing edits and deletion.
    Registered,
    /// Handed to the carrier.
    Sent,
    /// Handed to the recipient.
    Delivered,
    /// Any label not known to this crate.
    Other(String),
}

impl ParcelStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registered => "registered",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Other(label) => label.as_str(),
        }
    }

    /// Returns the status following this one, or `None` when terminal.
    ///
    /// Unknown labels are treated as terminal.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Registered => Some(Self::Sent),
            Self::Sent => Some(Self::Delivered),
            Self::Delivered | Self::Other(_) => None,
        }
    }

    /// Returns whether address changes and deletion are allowed.
    pub fn is_mutable(&self) -> bool {
        matches!(self, Self::Registered)
    }
}

impl From<&str> for ParcelStatus {
    fn from(value: &str) -> Self {
        match value {
            "registered" => Self::Registered,
            "sent" => Self::Sent,
            "delivered" => Self::Delivered,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ParcelStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "registered" | "sent" | "delivered" => Self::from(value.as_str()),
            _ => Self::Other(value),
        }
    }
}

impl From<ParcelStatus> for String {
    fn from(value: ParcelStatus) -> Self {
        match value {
            ParcelStatus::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for parcel records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelValidationError {
    /// `created_at` is not an RFC 3339 timestamp.
    InvalidCreatedAt(String),
}

impl Display for ParcelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCreatedAt(value) => {
                write!(f, "created_at `{value}` is not an RFC 3339 timestamp")
            }
        }
    }
}

impl Error for ParcelValidationError {}

/// Shipment record tracked by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Zero until the parcel has been persisted.
    pub number: ParcelNumber,
    pub client: ClientId,
    pub status: ParcelStatus,
    /// Delivery address.
    pub address: String,
    /// RFC 3339 creation timestamp, e.g. `2024-01-01T00:00:00Z`.
    pub created_at: String,
}

impl Parcel {
    /// Creates an unsaved `registered` parcel stamped with the current UTC time.
    pub fn new(client: ClientId, address: impl Into<String>) -> Self {
        Self {
            number: 0,
            client,
            status: ParcelStatus::Registered,
            address: address.into(),
            created_at: now_rfc3339(),
        }
    }

    /// Validates record-level invariants before persistence.
    ///
    /// Any status label is accepted, including an empty one.
    ///
    /// # Errors
    /// - `InvalidCreatedAt` when `created_at` does not parse as RFC 3339.
    pub fn validate(&self) -> Result<(), ParcelValidationError> {
        if DateTime::parse_from_rfc3339(&self.created_at).is_err() {
            return Err(ParcelValidationError::InvalidCreatedAt(
                self.created_at.clone(),
            ));
        }

        Ok(())
    }
}

/// Current UTC time in the textual form stored in `parcel.created_at`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
