//! Insurance models.

use serde::{Deserialize, Serialize};

/// Tri-state outcome of an insurance verification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    Verified,
    Pending,
    Issues,
}

/// Deductible breakdown reported by the payer (whole dollars).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deductible {
    pub individual: f64,
    pub family: f64,
    pub met: f64,
    pub remaining: f64,
}

/// Coverage details, only present for verified coverage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageDetails {
    pub in_network: bool,
    pub deductible: Deductible,
    pub copay: f64,
    /// Coinsurance share in percent (e.g. 20.0)
    pub coinsurance_percent: f64,
}

/// Estimated out-of-pocket cost of the visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimatedCosts {
    pub visit_fee: f64,
    pub additional_services: f64,
    pub total: f64,
}

/// Insurance card fields as submitted by the patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InsuranceCard {
    pub provider: String,
    pub member_id: String,
    pub group_number: String,
    pub policy_holder_name: Option<String>,
    /// Relationship of the policy holder to the patient ("self" when omitted)
    pub relation_to_patient: Option<String>,
    pub plan_type: Option<String>,
}

/// Result of `InsuranceVerificationService::verify`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationResult {
    pub coverage_status: CoverageStatus,
    pub coverage_details: Option<CoverageDetails>,
    pub estimated_costs: Option<EstimatedCosts>,
    pub issues: Vec<String>,
}

impl VerificationResult {
    /// A verified result carrying coverage details.
    pub fn verified(details: CoverageDetails) -> Self {
        Self {
            coverage_status: CoverageStatus::Verified,
            coverage_details: Some(details),
            estimated_costs: None,
            issues: Vec::new(),
        }
    }

    /// A result reporting coverage issues.
    pub fn issues<I, S>(issues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            coverage_status: CoverageStatus::Issues,
            coverage_details: None,
            estimated_costs: None,
            issues: issues.into_iter().map(Into::into).collect(),
        }
    }

    /// A result the payer has not decided yet.
    pub fn pending() -> Self {
        Self {
            coverage_status: CoverageStatus::Pending,
            coverage_details: None,
            estimated_costs: None,
            issues: Vec::new(),
        }
    }
}

/// Committed insurance group of the patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insurance {
    pub card: InsuranceCard,
    pub coverage_status: CoverageStatus,
    /// Present only when `coverage_status` is `Verified`
    pub coverage_details: Option<CoverageDetails>,
    pub estimated_costs: Option<EstimatedCosts>,
    /// Non-empty only when `coverage_status` is `Issues`
    pub issues: Vec<String>,
}

impl Insurance {
    /// Build the committed group from a card and its verification result.
    ///
    /// Details and issues are kept disjoint: a verified result drops any
    /// issues it carried, any other status drops the details.
    pub fn from_verification(card: InsuranceCard, result: VerificationResult) -> Self {
        let (coverage_details, estimated_costs, issues) = match result.coverage_status {
            CoverageStatus::Verified => (result.coverage_details, result.estimated_costs, Vec::new()),
            CoverageStatus::Issues => (None, None, result.issues),
            CoverageStatus::Pending => (None, None, Vec::new()),
        };
        Self {
            card,
            coverage_status: result.coverage_status,
            coverage_details,
            estimated_costs,
            issues,
        }
    }

    /// Check if the payer confirmed coverage.
    pub fn is_verified(&self) -> bool {
        self.coverage_status == CoverageStatus::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> CoverageDetails {
        CoverageDetails {
            in_network: true,
            deductible: Deductible {
                individual: 1500.0,
                family: 3000.0,
                met: 500.0,
                remaining: 1000.0,
            },
            copay: 25.0,
            coinsurance_percent: 20.0,
        }
    }

    #[test]
    fn test_verified_drops_issues() {
        let mut result = VerificationResult::verified(details());
        result.issues = vec!["stale".into()];

        let insurance = Insurance::from_verification(InsuranceCard::default(), result);
        assert!(insurance.is_verified());
        assert!(insurance.coverage_details.is_some());
        assert!(insurance.issues.is_empty());
    }

    #[test]
    fn test_issues_drop_details() {
        let mut result = VerificationResult::issues(["ID not found"]);
        result.coverage_details = Some(details());

        let insurance = Insurance::from_verification(InsuranceCard::default(), result);
        assert_eq!(insurance.coverage_status, CoverageStatus::Issues);
        assert!(insurance.coverage_details.is_none());
        assert_eq!(insurance.issues, vec!["ID not found".to_string()]);
    }

    #[test]
    fn test_coverage_status_serializes_lowercase() {
        let json = serde_json::to_string(&CoverageStatus::Verified).unwrap();
        assert_eq!(json, "\"verified\"");
    }
}
