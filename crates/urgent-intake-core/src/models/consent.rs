//! Consent form models.

use serde::{Deserialize, Serialize};

/// A consent form required before check-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsentForm {
    pub id: String,
    pub name: String,
    pub completed: bool,
    /// Full text shown to the patient
    pub content: Option<String>,
}

impl ConsentForm {
    /// Create an incomplete form.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            completed: false,
            content: None,
        }
    }

    /// Attach the form text.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}
