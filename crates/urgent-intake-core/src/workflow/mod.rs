//! Intake workflow state machine.

mod controller;
mod pending;
mod stage;

pub use controller::*;
pub use pending::*;
pub use stage::*;

use thiserror::Error;
use uuid::Uuid;

use crate::guards::{AppointmentForm, ValidationError};
use crate::models::{CardInfo, IdentityForm, InsuranceCard, PaymentMethod, SymptomReport};
use crate::services::ServiceError;

/// Workflow errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: Stage, to: Stage },

    #[error("{operation} is still outstanding for {stage}")]
    PendingOperation { stage: Stage, operation: OperationKind },

    #[error("No previous stage to return to")]
    NoHistory,

    #[error("No coverage decision is waiting for a choice")]
    NoCoverageDecision,

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Unknown or stale operation: {0}")]
    UnknownOperation(Uuid),
}

impl WorkflowError {
    /// Whether the caller can correct the situation and try again.
    ///
    /// Everything else is a programmer error and should fail fast.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WorkflowError::Validation(_)
                | WorkflowError::PendingOperation { .. }
                | WorkflowError::Service(_)
        )
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Data submitted to leave a stage. Each variant belongs to exactly one stage.
#[derive(Debug, Clone)]
pub enum StageData {
    Start,
    Identity(IdentityForm),
    Insurance(InsuranceCard),
    Payment { method: Option<PaymentMethod> },
    Card(CardInfo),
    Symptoms(SymptomReport),
    Appointment(AppointmentForm),
    CheckIn,
}

impl StageData {
    /// The stage that accepts this submission.
    pub fn stage(&self) -> Stage {
        match self {
            StageData::Start => Stage::Home,
            StageData::Identity(_) => Stage::Registration,
            StageData::Insurance(_) => Stage::InsuranceVerification,
            StageData::Payment { .. } => Stage::PaymentOptions,
            StageData::Card(_) => Stage::CreditCardAuthorization,
            StageData::Symptoms(_) => Stage::SymptomIntake,
            StageData::Appointment(_) => Stage::LocationDateSelection,
            StageData::CheckIn => Stage::CheckInConfirmation,
        }
    }
}
