//! Consent form gate for check-in.

use super::{FieldCheck, ValidationError};
use crate::models::ConsentForm;
use crate::workflow::Stage;

/// Read-only view over the required consent forms.
#[derive(Debug, Clone, Copy)]
pub struct ConsentFormGate<'a> {
    forms: &'a [ConsentForm],
}

impl<'a> ConsentFormGate<'a> {
    pub fn new(forms: &'a [ConsentForm]) -> Self {
        Self { forms }
    }

    pub fn total_count(&self) -> usize {
        self.forms.len()
    }

    pub fn completed_count(&self) -> usize {
        self.forms.iter().filter(|f| f.completed).count()
    }

    /// Progress for display. Not a gate: an empty set reports 100.
    pub fn completion_percentage(&self) -> f64 {
        if self.forms.is_empty() {
            return 100.0;
        }
        self.completed_count() as f64 / self.total_count() as f64 * 100.0
    }

    /// True iff every required form is completed.
    pub fn can_check_in(&self) -> bool {
        self.forms.iter().all(|f| f.completed)
    }

    /// Forms still awaiting completion.
    pub fn incomplete(&self) -> impl Iterator<Item = &'a ConsentForm> {
        self.forms.iter().filter(|f| !f.completed)
    }

    /// Fail with every incomplete form listed as a missing field.
    pub fn check(&self) -> Result<(), ValidationError> {
        let mut check = FieldCheck::new(Stage::CheckInConfirmation);
        for form in self.incomplete() {
            check.missing(&format!("consent_forms.{}", form.id));
        }
        check.finish()
    }
}
