//! Insurance verification routing.

use serde::{Deserialize, Serialize};

use crate::models::{CoverageStatus, VerificationResult};
use crate::services::ServiceError;
use crate::workflow::Trigger;

/// Caller-selected resolution of a pending coverage decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoverageChoice {
    /// Stay on the stage and ask the payer again
    WaitRetry,
    /// Continue to payment options without insurance
    ProceedWithoutInsurance,
    /// Go back to registration to correct the card
    EditInsurance,
}

impl CoverageChoice {
    /// Every choice offered while coverage is pending.
    pub const ALL: [CoverageChoice; 3] = [
        CoverageChoice::WaitRetry,
        CoverageChoice::ProceedWithoutInsurance,
        CoverageChoice::EditInsurance,
    ];

    /// The trigger this choice fires, or `None` to stay on the stage.
    pub fn trigger(&self) -> Option<Trigger> {
        match self {
            CoverageChoice::WaitRetry => None,
            CoverageChoice::ProceedWithoutInsurance => Some(Trigger::ProceedWithoutInsurance),
            CoverageChoice::EditInsurance => Some(Trigger::EditInsurance),
        }
    }
}

/// Outcome of routing a verification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverageRoute {
    /// A single canonical successor
    Decided(Trigger),
    /// No canonical successor; the caller must pick one of these
    AwaitChoice(Vec<CoverageChoice>),
}

/// Routes an insurance verification result to the next stage.
pub struct InsuranceVerificationRouter;

impl InsuranceVerificationRouter {
    /// Decide the route for a verification result.
    pub fn route(result: &VerificationResult) -> CoverageRoute {
        match result.coverage_status {
            CoverageStatus::Verified => CoverageRoute::Decided(Trigger::CoverageVerified),
            CoverageStatus::Issues => CoverageRoute::Decided(Trigger::CoverageIssues),
            CoverageStatus::Pending => CoverageRoute::AwaitChoice(CoverageChoice::ALL.to_vec()),
        }
    }

    /// Convert a failed verification call into an issues result.
    ///
    /// Verification failures never abort the workflow; they reroute the
    /// patient to payment options.
    pub fn absorb_failure(error: &ServiceError) -> VerificationResult {
        let issue = match error {
            ServiceError::ProviderUnreachable(_) => {
                "We were unable to reach your insurance provider".to_string()
            }
            ServiceError::ScanFailed(_) | ServiceError::Declined(_) => {
                format!("Insurance could not be verified: {error}")
            }
        };
        VerificationResult::issues([issue])
    }
}
