//! Stage graph of the intake workflow.
//!
//! ```text
//! Home → Registration → InsuranceVerification ─┬─ verified ───────────────────────┐
//!             ▲                  │              └─ issues → PaymentOptions ─┬─────┤
//!             └── edit insurance ┘                            self-pay      │     ▼
//!                                          CreditCardAuthorization ◄────────┘  SymptomIntake
//!                                                     │ authorized ───────────────► │
//!                                                     ▼                             ▼
//!                                   CheckedIn ◄ CheckInConfirmation ◄ LocationDateSelection
//! ```
//!
//! Every edge lives in [`TRANSITIONS`]. Guards and routers only ever produce a
//! [`Trigger`]; the table decides where that trigger leads.

use serde::{Deserialize, Serialize};

/// One discrete step of the intake workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Home,
    Registration,
    InsuranceVerification,
    PaymentOptions,
    CreditCardAuthorization,
    SymptomIntake,
    LocationDateSelection,
    CheckInConfirmation,
    /// Terminal: the record has been handed off to check-in
    CheckedIn,
}

impl Stage {
    /// All stages in workflow order.
    pub const ALL: [Stage; 9] = [
        Stage::Home,
        Stage::Registration,
        Stage::InsuranceVerification,
        Stage::PaymentOptions,
        Stage::CreditCardAuthorization,
        Stage::SymptomIntake,
        Stage::LocationDateSelection,
        Stage::CheckInConfirmation,
        Stage::CheckedIn,
    ];

    /// Check if this is the terminal stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::CheckedIn)
    }

    /// Stages reachable from this one in a single transition.
    pub fn successors(&self) -> Vec<Stage> {
        let mut out: Vec<Stage> = Vec::new();
        for t in TRANSITIONS.iter().filter(|t| t.from == *self) {
            if !out.contains(&t.to) {
                out.push(t.to);
            }
        }
        out
    }

    /// Check if `to` is reachable from this stage in a single transition.
    pub fn is_adjacent(&self, to: Stage) -> bool {
        TRANSITIONS.iter().any(|t| t.from == *self && t.to == to)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Home => "home",
            Stage::Registration => "registration",
            Stage::InsuranceVerification => "insurance_verification",
            Stage::PaymentOptions => "payment_options",
            Stage::CreditCardAuthorization => "credit_card_authorization",
            Stage::SymptomIntake => "symptom_intake",
            Stage::LocationDateSelection => "location_date_selection",
            Stage::CheckInConfirmation => "check_in_confirmation",
            Stage::CheckedIn => "checked_in",
        };
        f.write_str(name)
    }
}

/// Decision produced by a stage guard or router.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Start,
    IdentityCommitted,
    CoverageVerified,
    CoverageIssues,
    ProceedWithoutInsurance,
    EditInsurance,
    CardRequired,
    NoCardRequired,
    CardAuthorized,
    CardDeclined,
    SymptomsCommitted,
    AppointmentCommitted,
    CheckInFinalized,
}

impl Trigger {
    /// Back edges return to a stage already visited in this session.
    pub fn is_backtrack(&self) -> bool {
        matches!(self, Trigger::EditInsurance | Trigger::CardDeclined)
    }
}

/// A single edge of the stage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Stage,
    pub trigger: Trigger,
    pub to: Stage,
}

const fn edge(from: Stage, trigger: Trigger, to: Stage) -> Transition {
    Transition { from, trigger, to }
}

/// The complete transition table.
pub const TRANSITIONS: &[Transition] = &[
    edge(Stage::Home, Trigger::Start, Stage::Registration),
    edge(Stage::Registration, Trigger::IdentityCommitted, Stage::InsuranceVerification),
    edge(Stage::InsuranceVerification, Trigger::CoverageVerified, Stage::SymptomIntake),
    edge(Stage::InsuranceVerification, Trigger::CoverageIssues, Stage::PaymentOptions),
    edge(Stage::InsuranceVerification, Trigger::ProceedWithoutInsurance, Stage::PaymentOptions),
    edge(Stage::InsuranceVerification, Trigger::EditInsurance, Stage::Registration),
    edge(Stage::PaymentOptions, Trigger::CardRequired, Stage::CreditCardAuthorization),
    edge(Stage::PaymentOptions, Trigger::NoCardRequired, Stage::SymptomIntake),
    edge(Stage::CreditCardAuthorization, Trigger::CardAuthorized, Stage::SymptomIntake),
    edge(Stage::CreditCardAuthorization, Trigger::CardDeclined, Stage::PaymentOptions),
    edge(Stage::SymptomIntake, Trigger::SymptomsCommitted, Stage::LocationDateSelection),
    edge(Stage::LocationDateSelection, Trigger::AppointmentCommitted, Stage::CheckInConfirmation),
    edge(Stage::CheckInConfirmation, Trigger::CheckInFinalized, Stage::CheckedIn),
];

/// Look up where `trigger` leads from `from`.
pub fn next_stage(from: Stage, trigger: Trigger) -> Option<Stage> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.trigger == trigger)
        .map(|t| t.to)
}
