//! External collaborator contracts.
//!
//! The controller only talks to the outside world through these traits.
//! Concrete implementations live outside the core (see the fixtures crate for
//! in-memory ones).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    Authorization, CardInfo, IdentityForm, InsuranceCard, Location, PatientRecord,
    VerificationResult,
};

/// Errors raised by external collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceError {
    #[error("Document scan failed: {0}")]
    ScanFailed(String),

    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Kind of document presented to the scanner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdCard,
    InsuranceCard,
}

/// Fields extracted from a scanned document, keyed by form field name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSet {
    pub document_type: DocumentType,
    pub fields: BTreeMap<String, String>,
}

impl FieldSet {
    pub fn new(document_type: DocumentType) -> Self {
        Self {
            document_type,
            fields: BTreeMap::new(),
        }
    }

    /// Add a field (builder style).
    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    fn text(&self, field: &str) -> String {
        self.get(field).unwrap_or_default().to_string()
    }

    /// Prefill a registration form. Missing fields stay blank.
    pub fn to_identity_form(&self) -> IdentityForm {
        IdentityForm {
            first_name: self.text("first_name"),
            last_name: self.text("last_name"),
            date_of_birth: self.text("date_of_birth"),
            address: self.text("address"),
            id_number: self.text("id_number"),
            city: self.get("city").map(str::to_string),
            state: self.get("state").map(str::to_string),
            zip_code: self.get("zip_code").map(str::to_string),
        }
    }

    /// Prefill an insurance card. Missing fields stay blank.
    pub fn to_insurance_card(&self) -> InsuranceCard {
        InsuranceCard {
            provider: self.text("provider"),
            member_id: self.text("member_id"),
            group_number: self.text("group_number"),
            policy_holder_name: self.get("policy_holder_name").map(str::to_string),
            relation_to_patient: self.get("relation_to_patient").map(str::to_string),
            plan_type: self.get("plan_type").map(str::to_string),
        }
    }
}

/// Confirmation returned once the record has been handed off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingConfirmation {
    pub confirmation_id: String,
    pub location_id: String,
    pub date: NaiveDate,
    pub time: String,
    pub estimated_wait_minutes: Option<u32>,
    /// Payload for the arrival QR code
    pub qr_code_data: Option<String>,
    /// Fingerprint of the record that was handed off
    pub record_fingerprint: String,
}

/// Extracts form fields from a photographed document.
#[async_trait]
pub trait DocumentScanService: Send + Sync {
    async fn scan(&self, document_type: DocumentType) -> ServiceResult<FieldSet>;
}

/// Checks an insurance card with the payer.
#[async_trait]
pub trait InsuranceVerificationService: Send + Sync {
    async fn verify(&self, card: &InsuranceCard) -> ServiceResult<VerificationResult>;
}

/// Pre-authorizes a payment card.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn authorize(&self, card: &CardInfo) -> ServiceResult<Authorization>;
}

/// Lists clinic locations and their bookable slots.
#[async_trait]
pub trait SchedulingService: Send + Sync {
    async fn list_locations(&self) -> ServiceResult<Vec<Location>>;
}

/// Receives the finished record. Called once per session, never retried by
/// the core.
#[async_trait]
pub trait CheckInService: Send + Sync {
    async fn finalize(&self, record: &PatientRecord) -> ServiceResult<BookingConfirmation>;
}

/// The full set of collaborators injected into a controller.
#[derive(Clone)]
pub struct Collaborators {
    pub scanner: Arc<dyn DocumentScanService>,
    pub verifier: Arc<dyn InsuranceVerificationService>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub scheduling: Arc<dyn SchedulingService>,
    pub check_in: Arc<dyn CheckInService>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_set_prefills_identity() {
        let fields = FieldSet::new(DocumentType::IdCard)
            .with("first_name", "Ima")
            .with("last_name", "Cardholder")
            .with("city", "Anytown");

        let form = fields.to_identity_form();
        assert_eq!(form.first_name, "Ima");
        assert_eq!(form.date_of_birth, "");
        assert_eq!(form.city.as_deref(), Some("Anytown"));
        assert_eq!(form.state, None);
    }

    #[test]
    fn test_field_set_prefills_insurance() {
        let fields = FieldSet::new(DocumentType::InsuranceCard)
            .with("provider", "HealthPlus Insurance")
            .with("member_id", "MEM987654321");

        let card = fields.to_insurance_card();
        assert_eq!(card.provider, "HealthPlus Insurance");
        assert_eq!(card.group_number, "");
    }

    #[test]
    fn test_service_error_messages() {
        let err = ServiceError::Declined("card expired".into());
        assert_eq!(err.to_string(), "Payment declined: card expired");
    }
}
