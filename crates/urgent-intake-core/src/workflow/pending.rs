//! Outstanding collaborator calls.

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::Stage;
use crate::models::{Authorization, VerificationResult};
use crate::services::{BookingConfirmation, FieldSet, ServiceError, ServiceResult};

/// Which collaborator call is outstanding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    DocumentScan,
    InsuranceVerification,
    PaymentAuthorization,
    CheckInFinalization,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationKind::DocumentScan => "document scan",
            OperationKind::InsuranceVerification => "insurance verification",
            OperationKind::PaymentAuthorization => "payment authorization",
            OperationKind::CheckInFinalization => "check-in finalization",
        };
        f.write_str(name)
    }
}

/// Raw result of a collaborator call.
#[derive(Debug, Clone)]
pub enum ServiceOutcome {
    Scan(ServiceResult<FieldSet>),
    Verification(ServiceResult<VerificationResult>),
    Authorization(ServiceResult<Authorization>),
    Finalization(ServiceResult<BookingConfirmation>),
}

impl ServiceOutcome {
    /// An outcome carrying `error` for the given operation.
    pub fn failed(operation: OperationKind, error: ServiceError) -> Self {
        match operation {
            OperationKind::DocumentScan => ServiceOutcome::Scan(Err(error)),
            OperationKind::InsuranceVerification => ServiceOutcome::Verification(Err(error)),
            OperationKind::PaymentAuthorization => ServiceOutcome::Authorization(Err(error)),
            OperationKind::CheckInFinalization => ServiceOutcome::Finalization(Err(error)),
        }
    }
}

/// A finished call, ready to be handed back to the controller.
#[derive(Debug, Clone)]
pub struct Completion {
    pub id: Uuid,
    pub stage: Stage,
    pub operation: OperationKind,
    pub outcome: ServiceOutcome,
}

/// Handle to a collaborator call running in the background.
#[derive(Debug)]
pub struct PendingCall {
    id: Uuid,
    stage: Stage,
    operation: OperationKind,
    handle: JoinHandle<ServiceOutcome>,
}

impl PendingCall {
    pub(crate) fn new(
        id: Uuid,
        stage: Stage,
        operation: OperationKind,
        handle: JoinHandle<ServiceOutcome>,
    ) -> Self {
        Self {
            id,
            stage,
            operation,
            handle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    /// Check if the call has finished without waiting.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the call and return its id.
    ///
    /// The controller keeps the operation outstanding until it is told, so
    /// prefer [`WorkflowController::cancel`](super::WorkflowController::cancel).
    pub fn cancel(self) -> Uuid {
        self.handle.abort();
        self.id
    }

    /// Wait for the call to finish.
    pub async fn wait(self) -> Completion {
        let outcome = match self.handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => ServiceOutcome::failed(
                self.operation,
                ServiceError::ProviderUnreachable(format!("{} task failed: {join_error}", self.operation)),
            ),
        };
        Completion {
            id: self.id,
            stage: self.stage,
            operation: self.operation,
            outcome,
        }
    }
}
