//! Stage guards and routers.
//!
//! Guards decide whether submitted data is sufficient to leave a stage;
//! routers decide which [`Trigger`](crate::workflow::Trigger) fires. None of
//! them touch the patient record.

mod consent;
mod fields;
mod insurance;
mod payment;
mod schedule;

pub use consent::*;
pub use fields::*;
pub use insurance::*;
pub use payment::*;
pub use schedule::*;

use serde::{Deserialize, Serialize};

use crate::workflow::Stage;

/// What is wrong with a single field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Problem {
    Missing,
    Malformed(String),
}

/// A single offending field of a submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub problem: Problem,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.problem {
            Problem::Missing => write!(f, "{} is required", self.field),
            Problem::Malformed(reason) => write!(f, "{}: {}", self.field, reason),
        }
    }
}

/// Submitted data for a stage is missing or malformed.
///
/// Lists every offending field, not just the first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub stage: Stage,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// An error reporting a single offending field.
    pub fn single(stage: Stage, field: impl Into<String>, problem: Problem) -> Self {
        Self {
            stage,
            issues: vec![FieldIssue {
                field: field.into(),
                problem,
            }],
        }
    }

    /// Names of the offending fields, in submission order.
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }

    /// Check if a field was reported missing.
    pub fn is_missing(&self, field: &str) -> bool {
        self.issues
            .iter()
            .any(|i| i.field == field && i.problem == Problem::Missing)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} submission: ", self.stage)?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Collects field issues for one submission.
#[derive(Debug)]
pub struct FieldCheck {
    stage: Stage,
    issues: Vec<FieldIssue>,
}

impl FieldCheck {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            issues: Vec::new(),
        }
    }

    /// Record `field` as missing when `value` is blank. Returns true if present.
    pub fn require(&mut self, field: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.missing(field);
            return false;
        }
        true
    }

    pub fn missing(&mut self, field: &str) {
        self.issues.push(FieldIssue {
            field: field.to_string(),
            problem: Problem::Missing,
        });
    }

    pub fn malformed(&mut self, field: &str, reason: impl Into<String>) {
        self.issues.push(FieldIssue {
            field: field.to_string(),
            problem: Problem::Malformed(reason.into()),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Finish the check, failing if any issue was recorded.
    pub fn finish(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                stage: self.stage,
                issues: self.issues,
            })
        }
    }
}
