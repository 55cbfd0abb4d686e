//! In-memory collaborators for tests and the walkthrough.
//!
//! Each mock counts its calls and can be scripted to fail, so tests can drive
//! the controller down every branch without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use urgent_intake_core::models::{
    Authorization, CardInfo, InsuranceCard, Location, PatientRecord, VerificationResult,
};
use urgent_intake_core::services::{
    BookingConfirmation, CheckInService, Collaborators, DocumentScanService, DocumentType,
    FieldSet, InsuranceVerificationService, PaymentProcessor, SchedulingService, ServiceError,
    ServiceResult,
};

use crate::content::{standard_locations, verified_coverage};

async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

// =========================================================================
// Document scanner
// =========================================================================

/// Scanner that always reads the sample patient's documents.
#[derive(Default)]
pub struct MockDocumentScanner {
    failure: Option<ServiceError>,
    latency: Duration,
    calls: AtomicUsize,
}

impl MockDocumentScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every scan with `error`.
    pub fn failing(error: ServiceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentScanService for MockDocumentScanner {
    async fn scan(&self, document_type: DocumentType) -> ServiceResult<FieldSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        simulate_latency(self.latency).await;
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let fields = match document_type {
            DocumentType::IdCard => FieldSet::new(document_type)
                .with("first_name", "Ima")
                .with("last_name", "Cardholder")
                .with("date_of_birth", "1985-06-15")
                .with("address", "123 Main Street")
                .with("city", "Anytown")
                .with("state", "CA")
                .with("zip_code", "90210")
                .with("id_number", "DL12345678"),
            DocumentType::InsuranceCard => FieldSet::new(document_type)
                .with("provider", "HealthPlus Insurance")
                .with("member_id", "MEM987654321")
                .with("group_number", "GRP123456")
                .with("policy_holder_name", "Ima Cardholder"),
        };
        Ok(fields)
    }
}

// =========================================================================
// Insurance verifier
// =========================================================================

/// Verifier that replays scripted outcomes, then repeats a fallback.
pub struct MockInsuranceVerifier {
    script: Mutex<VecDeque<ServiceResult<VerificationResult>>>,
    fallback: ServiceResult<VerificationResult>,
    latency: Duration,
    calls: AtomicUsize,
}

impl MockInsuranceVerifier {
    /// Always reports the standard verified coverage.
    pub fn verified() -> Self {
        Self::always(Ok(verified_coverage()))
    }

    /// Always reports the given outcome.
    pub fn always(outcome: ServiceResult<VerificationResult>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: outcome,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue an outcome to return before the fallback.
    pub fn then(self, outcome: ServiceResult<VerificationResult>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockInsuranceVerifier {
    fn default() -> Self {
        Self::verified()
    }
}

#[async_trait]
impl InsuranceVerificationService for MockInsuranceVerifier {
    async fn verify(&self, card: &InsuranceCard) -> ServiceResult<VerificationResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(call, provider = %card.provider, "mock verification");
        simulate_latency(self.latency).await;

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

// =========================================================================
// Payment processor
// =========================================================================

/// Card number suffix the mock processor declines.
pub const DECLINED_SUFFIX: &str = "0002";

/// Processor that declines cards ending in [`DECLINED_SUFFIX`].
#[derive(Default)]
pub struct MockPaymentProcessor {
    unreachable: AtomicBool,
    latency: Duration,
    calls: AtomicUsize,
}

impl MockPaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a gateway outage.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn authorize(&self, card: &CardInfo) -> ServiceResult<Authorization> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        simulate_latency(self.latency).await;

        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ServiceError::ProviderUnreachable("payment gateway timed out".into()));
        }
        if card.digits().ends_with(DECLINED_SUFFIX) {
            return Err(ServiceError::Declined("card declined by issuer".into()));
        }
        Ok(Authorization {
            authorization_id: format!("auth_{}", Uuid::new_v4().simple()),
        })
    }
}

// =========================================================================
// Scheduling
// =========================================================================

/// Scheduler serving a fixed catalog.
pub struct StaticScheduling {
    locations: Vec<Location>,
    unreachable: AtomicBool,
    calls: AtomicUsize,
}

impl StaticScheduling {
    pub fn new(locations: Vec<Location>) -> Self {
        Self {
            locations,
            unreachable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Toggle a scheduler outage.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StaticScheduling {
    fn default() -> Self {
        Self::new(standard_locations())
    }
}

#[async_trait]
impl SchedulingService for StaticScheduling {
    async fn list_locations(&self) -> ServiceResult<Vec<Location>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ServiceError::ProviderUnreachable("scheduler offline".into()));
        }
        Ok(self.locations.clone())
    }
}

// =========================================================================
// Check-in
// =========================================================================

/// Check-in desk that keeps every record it receives.
#[derive(Default)]
pub struct RecordingCheckIn {
    received: Mutex<Vec<PatientRecord>>,
    failure: Option<ServiceError>,
    failing_calls: usize,
    latency: Duration,
}

impl RecordingCheckIn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every finalization with `error`.
    pub fn failing(error: ServiceError) -> Self {
        Self::failing_first(error, usize::MAX)
    }

    /// Fail the first `calls` finalizations with `error`, then succeed.
    pub fn failing_first(error: ServiceError, calls: usize) -> Self {
        Self {
            failure: Some(error),
            failing_calls: calls,
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Records handed off so far, oldest first.
    pub fn received(&self) -> Vec<PatientRecord> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl CheckInService for RecordingCheckIn {
    async fn finalize(&self, record: &PatientRecord) -> ServiceResult<BookingConfirmation> {
        simulate_latency(self.latency).await;
        let call = {
            let mut received = self.received.lock().unwrap_or_else(PoisonError::into_inner);
            received.push(record.clone());
            received.len()
        };
        if let Some(error) = &self.failure {
            if call <= self.failing_calls {
                return Err(error.clone());
            }
        }

        let appointment = record
            .appointment
            .clone()
            .ok_or_else(|| ServiceError::Declined("record has no appointment".into()))?;
        let record_fingerprint = record
            .fingerprint()
            .map_err(|e| ServiceError::Declined(format!("record could not be encoded: {e}")))?;
        let confirmation_id = format!("UC-{}", &Uuid::new_v4().simple().to_string()[..8]);

        Ok(BookingConfirmation {
            qr_code_data: Some(format!("urgent-intake://check-in/{confirmation_id}")),
            confirmation_id,
            location_id: appointment.location_id,
            date: appointment.date,
            time: appointment.time,
            estimated_wait_minutes: Some(25),
            record_fingerprint,
        })
    }
}

// =========================================================================
// Desk
// =========================================================================

/// A full set of mocks, kept concrete so tests can inspect them.
#[derive(Clone)]
pub struct MockDesk {
    pub scanner: Arc<MockDocumentScanner>,
    pub verifier: Arc<MockInsuranceVerifier>,
    pub payments: Arc<MockPaymentProcessor>,
    pub scheduling: Arc<StaticScheduling>,
    pub check_in: Arc<RecordingCheckIn>,
}

impl MockDesk {
    /// Mocks that succeed everywhere with verified coverage.
    pub fn new() -> Self {
        Self {
            scanner: Arc::new(MockDocumentScanner::new()),
            verifier: Arc::new(MockInsuranceVerifier::verified()),
            payments: Arc::new(MockPaymentProcessor::new()),
            scheduling: Arc::new(StaticScheduling::default()),
            check_in: Arc::new(RecordingCheckIn::new()),
        }
    }

    pub fn with_scanner(mut self, scanner: MockDocumentScanner) -> Self {
        self.scanner = Arc::new(scanner);
        self
    }

    pub fn with_verifier(mut self, verifier: MockInsuranceVerifier) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    pub fn with_payments(mut self, payments: MockPaymentProcessor) -> Self {
        self.payments = Arc::new(payments);
        self
    }

    pub fn with_check_in(mut self, check_in: RecordingCheckIn) -> Self {
        self.check_in = Arc::new(check_in);
        self
    }

    /// Type-erased handles for the controller.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            scanner: self.scanner.clone(),
            verifier: self.verifier.clone(),
            payments: self.payments.clone(),
            scheduling: self.scheduling.clone(),
            check_in: self.check_in.clone(),
        }
    }
}

impl Default for MockDesk {
    fn default() -> Self {
        Self::new()
    }
}
