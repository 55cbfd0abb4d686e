//! The workflow controller: sole owner and writer of the patient record.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    next_stage, Completion, OperationKind, PendingCall, ServiceOutcome, Stage, StageData, Trigger,
    WorkflowError, WorkflowResult,
};
use crate::assistant::SymptomAssistant;
use crate::config::{ConfigResult, IntakeConfig};
use crate::guards::{
    validate_card, validate_identity, validate_insurance_card, validate_symptom_report, Clock,
    ConsentFormGate, CoverageChoice, CoverageRoute, InsuranceVerificationRouter,
    LocationDateValidator, PaymentSelectionRouter, Problem, SystemClock, ValidationError,
};
use crate::models::{
    CardInfo, ConsentForm, Insurance, InsuranceCard, Location, PatientRecord, PaymentSelection,
    VerificationResult,
};
use crate::services::{BookingConfirmation, Collaborators, DocumentType, FieldSet, ServiceError};

/// Result of a successful controller operation.
#[derive(Debug)]
pub enum Step {
    /// The workflow moved to a new stage
    Moved { from: Stage, to: Stage },
    /// A collaborator call was issued; resolve its completion to continue
    Dispatched(PendingCall),
    /// Coverage is pending; the caller must pick one of these
    AwaitingChoice(Vec<CoverageChoice>),
    /// A scan finished; use the fields to prefill the registration form
    Prefill(FieldSet),
    /// The record was handed off and the workflow is finished
    CheckedIn(BookingConfirmation),
}

impl Step {
    /// The stage moved to, if this step was a move.
    pub fn moved_to(&self) -> Option<Stage> {
        match self {
            Step::Moved { to, .. } => Some(*to),
            _ => None,
        }
    }
}

/// Context the controller keeps for its single outstanding call.
#[derive(Debug, Clone)]
enum OperationContext {
    None,
    Verification(InsuranceCard),
    Authorization { last_four: String },
}

#[derive(Debug)]
struct Outstanding {
    id: Uuid,
    stage: Stage,
    operation: OperationKind,
    context: OperationContext,
    task: AbortHandle,
}

/// A pending coverage result waiting for the caller's choice.
#[derive(Debug, Clone)]
struct CoverageHold {
    card: InsuranceCard,
    result: VerificationResult,
}

/// Drives one intake session through the stage graph.
///
/// All record mutation goes through this type. At most one collaborator call
/// is outstanding at a time, and the stage that issued it refuses further
/// submissions until the call is resolved or cancelled.
///
/// Dispatching calls spawns tokio tasks, so the controller must be used from
/// within a tokio runtime.
pub struct WorkflowController {
    config: IntakeConfig,
    services: Collaborators,
    clock: Arc<dyn Clock>,
    stage: Stage,
    record: PatientRecord,
    assistant: SymptomAssistant,
    locations: Vec<Location>,
    outstanding: Option<Outstanding>,
    coverage_hold: Option<CoverageHold>,
}

impl WorkflowController {
    /// Start a new session at the home stage with an empty record.
    pub fn new(config: IntakeConfig, services: Collaborators) -> ConfigResult<Self> {
        config.validate()?;
        let record = PatientRecord::new();
        info!(session = %record.session_id, "intake session started");
        Ok(Self {
            config,
            services,
            clock: Arc::new(SystemClock),
            stage: Stage::Home,
            record,
            assistant: SymptomAssistant::new(),
            locations: Vec::new(),
            outstanding: None,
            coverage_hold: None,
        })
    }

    /// Replace the clock used for date checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Read-only view of the record.
    pub fn record(&self) -> &PatientRecord {
        &self.record
    }

    pub fn history(&self) -> &[Stage] {
        &self.record.stage_history
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn assistant(&self) -> &SymptomAssistant {
        &self.assistant
    }

    /// The symptom assistant, for conversation turns during symptom intake.
    pub fn assistant_mut(&mut self) -> &mut SymptomAssistant {
        &mut self.assistant
    }

    /// Cached scheduling catalog (empty until [`load_locations`](Self::load_locations)).
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn is_pending(&self) -> bool {
        self.outstanding.is_some()
    }

    /// The outstanding call, if any.
    pub fn outstanding_operation(&self) -> Option<(Uuid, OperationKind)> {
        self.outstanding.as_ref().map(|o| (o.id, o.operation))
    }

    /// Choices on offer while coverage is pending.
    pub fn coverage_choices(&self) -> Option<Vec<CoverageChoice>> {
        self.coverage_hold
            .as_ref()
            .map(|_| CoverageChoice::ALL.to_vec())
    }

    /// Consent forms installed for this session.
    pub fn forms(&self) -> &[ConsentForm] {
        &self.record.consent_forms
    }

    /// Consent progress for the current form set.
    pub fn consent_gate(&self) -> ConsentFormGate<'_> {
        ConsentFormGate::new(&self.record.consent_forms)
    }

    // =========================================================================
    // Stage commits
    // =========================================================================

    /// Commit `data` for `stage` and move on.
    ///
    /// `stage` must be the current stage and `data` must be the submission
    /// that stage accepts; anything else is an illegal transition. On a
    /// validation failure the record is left untouched.
    pub fn advance(&mut self, stage: Stage, data: StageData) -> WorkflowResult<Step> {
        if self.stage.is_terminal() || stage != self.stage || data.stage() != stage {
            let to = if stage != self.stage { stage } else { data.stage() };
            return Err(self.illegal(to));
        }
        self.ensure_idle()?;

        match data {
            StageData::Start => self.follow(Trigger::Start),
            StageData::Identity(form) => {
                let identity = validate_identity(form)?;
                self.record.identity = Some(identity);
                self.follow(Trigger::IdentityCommitted)
            }
            StageData::Insurance(card) => {
                let card = validate_insurance_card(card)?;
                self.coverage_hold = None;
                Ok(Step::Dispatched(self.dispatch_verification(card)))
            }
            StageData::Payment { method } => {
                let Some(method) = method else {
                    return Err(
                        ValidationError::single(Stage::PaymentOptions, "method", Problem::Missing)
                            .into(),
                    );
                };
                self.record.payment_selection = Some(PaymentSelection::new(method));
                self.follow(PaymentSelectionRouter::route(method))
            }
            StageData::Card(card) => {
                validate_card(&card)?;
                Ok(Step::Dispatched(self.dispatch_authorization(card)))
            }
            StageData::Symptoms(report) => {
                validate_symptom_report(&report, self.config.require_symptom_severity)?;
                self.record.symptom_report = Some(report);
                self.follow(Trigger::SymptomsCommitted)
            }
            StageData::Appointment(form) => {
                let validator = LocationDateValidator::new(&self.locations, self.clock.today());
                let appointment = validator.validate(&form)?;
                self.record.appointment = Some(appointment);
                self.follow(Trigger::AppointmentCommitted)
            }
            StageData::CheckIn => {
                self.consent_gate().check()?;
                Ok(Step::Dispatched(self.dispatch_finalization()))
            }
        }
    }

    /// Package the assistant's symptoms with a chief complaint and commit them.
    pub fn complete_assessment(&mut self, chief_complaint: &str) -> WorkflowResult<Step> {
        let report = self.assistant.complete_assessment(chief_complaint);
        self.advance(Stage::SymptomIntake, StageData::Symptoms(report))
    }

    /// Mark a consent form as completed or not.
    pub fn set_form_completed(&mut self, form_id: &str, completed: bool) -> WorkflowResult<()> {
        if self.stage != Stage::CheckInConfirmation {
            return Err(self.illegal(Stage::CheckInConfirmation));
        }
        self.ensure_idle()?;

        match self.record.consent_forms.iter_mut().find(|f| f.id == form_id) {
            Some(form) => {
                form.completed = completed;
                debug!(form = form_id, completed, "consent form updated");
                Ok(())
            }
            None => Err(ValidationError::single(
                Stage::CheckInConfirmation,
                format!("consent_forms.{form_id}"),
                Problem::Malformed("unknown form".into()),
            )
            .into()),
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Return to the previous stage. Committed data is kept for review.
    pub fn retreat(&mut self) -> WorkflowResult<Stage> {
        self.ensure_idle()?;
        let Some(previous) = self.record.stage_history.last().copied() else {
            return Err(WorkflowError::NoHistory);
        };
        if self.stage.is_terminal() {
            return Err(self.illegal(previous));
        }

        self.record.stage_history.pop();
        let from = self.stage;
        self.stage = previous;
        self.coverage_hold = None;
        info!(session = %self.record.session_id, %from, to = %previous, "retreated");
        Ok(previous)
    }

    /// Discard the record and history and start over at home.
    pub fn reset(&mut self) {
        let old_session = self.record.session_id.clone();
        if let Some(outstanding) = self.outstanding.take() {
            outstanding.task.abort();
            warn!(
                id = %outstanding.id,
                operation = %outstanding.operation,
                "aborted outstanding call on reset"
            );
        }
        self.record = PatientRecord::new();
        self.stage = Stage::Home;
        self.assistant = SymptomAssistant::new();
        self.coverage_hold = None;
        info!(old_session = %old_session, session = %self.record.session_id, "intake session reset");
    }

    // =========================================================================
    // Collaborator calls
    // =========================================================================

    /// Scan an identity or insurance document during registration.
    ///
    /// The resolution only prefills; nothing is committed.
    pub fn scan_document(&mut self, document_type: DocumentType) -> WorkflowResult<PendingCall> {
        if self.stage != Stage::Registration {
            return Err(self.illegal(Stage::Registration));
        }
        self.ensure_idle()?;

        let scanner = Arc::clone(&self.services.scanner);
        Ok(self.dispatch(OperationKind::DocumentScan, OperationContext::None, async move {
            ServiceOutcome::Scan(scanner.scan(document_type).await)
        }))
    }

    /// Fetch the scheduling catalog.
    ///
    /// An unreachable scheduler keeps a previously cached catalog; without one
    /// the error is returned.
    pub async fn load_locations(&mut self) -> WorkflowResult<&[Location]> {
        match self.services.scheduling.list_locations().await {
            Ok(locations) => {
                debug!(count = locations.len(), "scheduling catalog loaded");
                self.locations = locations;
            }
            Err(err) if !self.locations.is_empty() => {
                warn!(error = %err, cached = self.locations.len(), "using cached scheduling catalog");
            }
            Err(err) => return Err(err.into()),
        }
        Ok(&self.locations)
    }

    /// Apply a finished collaborator call.
    pub fn resolve(&mut self, completion: Completion) -> WorkflowResult<Step> {
        let outstanding = match self.outstanding.take() {
            Some(o) if o.id == completion.id => o,
            other => {
                self.outstanding = other;
                warn!(id = %completion.id, "ignoring stale completion");
                return Err(WorkflowError::UnknownOperation(completion.id));
            }
        };
        debug!(
            id = %outstanding.id,
            operation = %outstanding.operation,
            stage = %outstanding.stage,
            "resolving collaborator call"
        );

        match (completion.outcome, outstanding.context) {
            (ServiceOutcome::Scan(result), _) => match result {
                Ok(fields) => Ok(Step::Prefill(fields)),
                Err(err) => {
                    warn!(error = %err, "document scan failed");
                    Err(err.into())
                }
            },
            (ServiceOutcome::Verification(result), OperationContext::Verification(card)) => {
                let result = result.unwrap_or_else(|err| {
                    warn!(error = %err, "insurance verification failed, treating as coverage issues");
                    InsuranceVerificationRouter::absorb_failure(&err)
                });
                self.apply_verification(card, result)
            }
            (ServiceOutcome::Authorization(result), OperationContext::Authorization { last_four }) => {
                let trigger = PaymentSelectionRouter::route_authorization(&result)?;
                let Some(selection) = self.record.payment_selection.as_mut() else {
                    return Err(self.illegal(Stage::PaymentOptions));
                };
                match result {
                    Ok(auth) => {
                        selection.card_authorized = true;
                        selection.authorization_id = Some(auth.authorization_id);
                        selection.card_last_four = Some(last_four);
                    }
                    Err(err) => {
                        warn!(error = %err, "card declined, returning to payment options");
                        selection.card_authorized = false;
                        selection.authorization_id = None;
                        selection.card_last_four = None;
                    }
                }
                self.follow(trigger)
            }
            (ServiceOutcome::Finalization(result), _) => {
                let confirmation = result?;
                self.follow(Trigger::CheckInFinalized)?;
                info!(
                    session = %self.record.session_id,
                    confirmation = %confirmation.confirmation_id,
                    "record handed off to check-in"
                );
                Ok(Step::CheckedIn(confirmation))
            }
            (_, _) => {
                error!(
                    operation = %outstanding.operation,
                    "completion does not match outstanding call"
                );
                Err(WorkflowError::UnknownOperation(completion.id))
            }
        }
    }

    /// Abort an outstanding call and release its stage.
    pub fn cancel(&mut self, call: PendingCall) -> WorkflowResult<()> {
        let id = call.cancel();
        match &self.outstanding {
            Some(o) if o.id == id => {
                warn!(%id, operation = %o.operation, "collaborator call cancelled");
                self.outstanding = None;
                Ok(())
            }
            _ => Err(WorkflowError::UnknownOperation(id)),
        }
    }

    /// Abort the outstanding call after its handle was dropped.
    pub fn cancel_pending(&mut self) -> Option<Uuid> {
        let outstanding = self.outstanding.take()?;
        outstanding.task.abort();
        warn!(id = %outstanding.id, operation = %outstanding.operation, "outstanding call abandoned");
        Some(outstanding.id)
    }

    // =========================================================================
    // Pending coverage
    // =========================================================================

    /// Resolve a pending coverage decision.
    pub fn choose_coverage(&mut self, choice: CoverageChoice) -> WorkflowResult<Step> {
        if self.stage != Stage::InsuranceVerification {
            return Err(self.illegal(Stage::InsuranceVerification));
        }
        self.ensure_idle()?;
        let Some(hold) = self.coverage_hold.take() else {
            return Err(WorkflowError::NoCoverageDecision);
        };
        info!(session = %self.record.session_id, ?choice, "pending coverage resolved");

        match choice {
            CoverageChoice::WaitRetry => {
                Ok(Step::Dispatched(self.dispatch_verification(hold.card)))
            }
            CoverageChoice::ProceedWithoutInsurance => {
                self.record.insurance = Some(Insurance::from_verification(hold.card, hold.result));
                self.follow(Trigger::ProceedWithoutInsurance)
            }
            CoverageChoice::EditInsurance => self.follow(Trigger::EditInsurance),
        }
    }

    /// Wait for the caller's coverage choice, applying the configured default
    /// when the timeout elapses or the sender is dropped.
    pub async fn await_coverage_choice(
        &mut self,
        choice: oneshot::Receiver<CoverageChoice>,
    ) -> WorkflowResult<Step> {
        if self.coverage_hold.is_none() {
            return Err(WorkflowError::NoCoverageDecision);
        }
        let timeout = self.config.pending_coverage_timeout();
        let choice = match tokio::time::timeout(timeout, choice).await {
            Ok(Ok(choice)) => choice,
            Ok(Err(_)) => {
                warn!("coverage choice sender dropped, applying default");
                self.config.pending_coverage_default
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.pending_coverage_timeout_ms,
                    "coverage choice timed out, applying default"
                );
                self.config.pending_coverage_default
            }
        };
        self.choose_coverage(choice)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn illegal(&self, to: Stage) -> WorkflowError {
        error!(session = %self.record.session_id, from = %self.stage, %to, "illegal transition");
        WorkflowError::IllegalTransition {
            from: self.stage,
            to,
        }
    }

    fn ensure_idle(&self) -> WorkflowResult<()> {
        match &self.outstanding {
            Some(o) => Err(WorkflowError::PendingOperation {
                stage: o.stage,
                operation: o.operation,
            }),
            None => Ok(()),
        }
    }

    /// Fire `trigger` from the current stage according to the transition table.
    fn follow(&mut self, trigger: Trigger) -> WorkflowResult<Step> {
        let from = self.stage;
        let Some(to) = next_stage(from, trigger) else {
            return Err(self.illegal(from));
        };

        if trigger.is_backtrack() {
            // Rewind to the earlier visit so history stays a true back-stack
            let history = &mut self.record.stage_history;
            match history.iter().rposition(|s| *s == to) {
                Some(pos) => history.truncate(pos),
                None => push_history(history, from),
            }
        } else {
            push_history(&mut self.record.stage_history, from);
        }

        self.stage = to;
        self.on_enter(to);
        info!(session = %self.record.session_id, %from, %to, ?trigger, "stage transition");
        Ok(Step::Moved { from, to })
    }

    fn on_enter(&mut self, stage: Stage) {
        if stage == Stage::CheckInConfirmation && self.record.consent_forms.is_empty() {
            self.record.consent_forms = self.config.consent_forms.clone();
        }
    }

    fn apply_verification(
        &mut self,
        card: InsuranceCard,
        result: VerificationResult,
    ) -> WorkflowResult<Step> {
        match InsuranceVerificationRouter::route(&result) {
            CoverageRoute::Decided(trigger) => {
                if !result.issues.is_empty() {
                    warn!(issues = result.issues.len(), "coverage issues reported");
                }
                self.record.insurance = Some(Insurance::from_verification(card, result));
                self.follow(trigger)
            }
            CoverageRoute::AwaitChoice(choices) => {
                info!(session = %self.record.session_id, "coverage pending, awaiting choice");
                self.coverage_hold = Some(CoverageHold { card, result });
                Ok(Step::AwaitingChoice(choices))
            }
        }
    }

    fn dispatch<F>(
        &mut self,
        operation: OperationKind,
        context: OperationContext,
        task: F,
    ) -> PendingCall
    where
        F: Future<Output = ServiceOutcome> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let handle = tokio::spawn(task);
        self.outstanding = Some(Outstanding {
            id,
            stage: self.stage,
            operation,
            context,
            task: handle.abort_handle(),
        });
        debug!(%id, stage = %self.stage, %operation, "collaborator call dispatched");
        PendingCall::new(id, self.stage, operation, handle)
    }

    fn dispatch_verification(&mut self, card: InsuranceCard) -> PendingCall {
        let verifier = Arc::clone(&self.services.verifier);
        let attempts = self.config.verification_attempts;
        let backoff = self.config.retry_backoff();
        let task_card = card.clone();

        self.dispatch(
            OperationKind::InsuranceVerification,
            OperationContext::Verification(card),
            async move {
                let mut attempt = 1;
                loop {
                    match verifier.verify(&task_card).await {
                        Err(ServiceError::ProviderUnreachable(reason)) if attempt < attempts => {
                            warn!(attempt, attempts, %reason, "insurance provider unreachable, retrying");
                            tokio::time::sleep(backoff).await;
                            attempt += 1;
                        }
                        result => return ServiceOutcome::Verification(result),
                    }
                }
            },
        )
    }

    fn dispatch_authorization(&mut self, card: CardInfo) -> PendingCall {
        let payments = Arc::clone(&self.services.payments);
        let last_four = card.last_four();
        self.dispatch(
            OperationKind::PaymentAuthorization,
            OperationContext::Authorization { last_four },
            async move { ServiceOutcome::Authorization(payments.authorize(&card).await) },
        )
    }

    fn dispatch_finalization(&mut self) -> PendingCall {
        let check_in = Arc::clone(&self.services.check_in);
        let snapshot = self.record.clone();
        self.dispatch(
            OperationKind::CheckInFinalization,
            OperationContext::None,
            async move { ServiceOutcome::Finalization(check_in.finalize(&snapshot).await) },
        )
    }
}

impl Drop for WorkflowController {
    fn drop(&mut self) {
        if let Some(outstanding) = self.outstanding.take() {
            outstanding.task.abort();
        }
    }
}

fn push_history(history: &mut Vec<Stage>, stage: Stage) {
    if history.last() != Some(&stage) {
        history.push(stage);
    }
}
