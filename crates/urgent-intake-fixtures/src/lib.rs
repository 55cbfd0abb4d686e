//! Urgent Intake Fixtures
//!
//! In-memory collaborators and sample clinic content for exercising the
//! intake workflow without a payer, gateway or scheduler.
//!
//! # Usage
//!
//! ```ignore
//! let desk = MockDesk::new();
//! let mut wf = WorkflowController::new(intake_config(), desk.collaborators())?;
//! ```

pub mod collaborators;
pub mod content;

pub use collaborators::{
    MockDesk, MockDocumentScanner, MockInsuranceVerifier, MockPaymentProcessor,
    RecordingCheckIn, StaticScheduling, DECLINED_SUFFIX,
};
pub use content::{
    approved_card, declined_card, intake_config, sample_identity, sample_insurance_card,
    standard_consent_forms, standard_locations, verified_coverage,
};
