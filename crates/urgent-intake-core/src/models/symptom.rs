//! Symptom models.

use serde::{Deserialize, Serialize};

/// Patient-reported severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// A single reported symptom.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Symptom {
    pub id: String,
    pub name: String,
    /// Unset until the patient rates it
    pub severity: Option<Severity>,
    pub duration: String,
    pub notes: String,
}

impl Symptom {
    /// Create a draft symptom with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Check if the symptom has a usable name.
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Committed symptom group of the patient record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SymptomReport {
    pub symptoms: Vec<Symptom>,
    pub chief_complaint: String,
}

impl SymptomReport {
    /// Symptoms that were recorded without a severity.
    pub fn unrated(&self) -> impl Iterator<Item = &Symptom> {
        self.symptoms.iter().filter(|s| s.severity.is_none())
    }
}
