//! Patient record models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Appointment, ConsentForm, Insurance, PaymentSelection, SymptomReport};
use crate::workflow::Stage;

/// Identity captured at registration (typed after validation).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub id_number: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl Identity {
    /// Display name ("First Last").
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Identity fields as submitted from the registration form or a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdentityForm {
    pub first_name: String,
    pub last_name: String,
    /// ISO date, `YYYY-MM-DD`
    pub date_of_birth: String,
    pub address: String,
    pub id_number: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// The session-scoped aggregate accumulated across intake stages.
///
/// Each field group is `None` until its owning stage commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    /// Session UUID, regenerated on reset
    pub session_id: String,
    /// Creation timestamp
    pub created_at: String,
    pub identity: Option<Identity>,
    pub insurance: Option<Insurance>,
    pub payment_selection: Option<PaymentSelection>,
    pub symptom_report: Option<SymptomReport>,
    pub appointment: Option<Appointment>,
    pub consent_forms: Vec<ConsentForm>,
    /// Previously visited stages, most recent last
    pub stage_history: Vec<Stage>,
}

impl PatientRecord {
    /// Create an empty, anonymous draft record.
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            identity: None,
            insurance: None,
            payment_selection: None,
            symptom_report: None,
            appointment: None,
            consent_forms: Vec::new(),
            stage_history: Vec::new(),
        }
    }

    /// Check if no identity has been committed yet.
    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    /// Serialize to canonical JSON for fingerprinting.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        // Struct fields serialize in declaration order, so output is stable
        serde_json::to_string(self)
    }

    /// Hex SHA-256 of the canonical JSON.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let payload = self.to_canonical_json()?;
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

impl Default for PatientRecord {
    fn default() -> Self {
        Self::new()
    }
}
