//! Urgent Intake Core Library
//!
//! Workflow controller for urgent-care patient intake, from a walk-in at the
//! front desk to a booked check-in slot.
//!
//! # Architecture
//!
//! ```text
//!   Caller (kiosk UI, phone flow, test harness)
//!          │  advance(stage, data) / resolve(completion) / retreat / reset
//!          ▼
//! ┌─────────────────────────────────────────────┐
//! │             WorkflowController               │
//! │  stage ── guards ── routers ── TRANSITIONS   │
//! │             │                                │
//! │      [PatientRecord: single writer]          │
//! └──────┬──────────────┬───────────────┬────────┘
//!        │              │               │
//!        ▼              ▼               ▼
//!   Scan / Verify   Authorize card   Locations / Finalize
//!   (PendingCall)   (PendingCall)    (PendingCall)
//! ```
//!
//! # Core Principle
//!
//! **A stage is never left with data that does not pass its guard.** A failed
//! submission changes nothing; a committed one is kept when moving back.
//!
//! # Modules
//!
//! - [`models`]: Patient record and its field groups
//! - [`guards`]: Stage validators and routers
//! - [`workflow`]: Stage graph, controller and outstanding calls
//! - [`assistant`]: Conversational symptom capture
//! - [`services`]: Collaborator traits
//! - [`config`]: Session tunables

pub mod assistant;
pub mod config;
pub mod guards;
pub mod models;
pub mod services;
pub mod workflow;

// Re-export commonly used types
pub use assistant::SymptomAssistant;
pub use config::{ConfigError, IntakeConfig};
pub use guards::{
    AppointmentForm, Clock, CoverageChoice, FixedClock, SystemClock, ValidationError,
};
pub use models::{
    Appointment, CardInfo, ConsentForm, IdentityForm, InsuranceCard, PatientRecord,
    PaymentMethod, SymptomReport, VerificationResult,
};
pub use services::{Collaborators, ServiceError};
pub use workflow::{
    Completion, PendingCall, Stage, StageData, Step, Trigger, WorkflowController, WorkflowError,
    WorkflowResult,
};
