//! End-to-end intake sessions against the in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::oneshot;

use urgent_intake_core::guards::{AppointmentForm, CoverageChoice, FixedClock};
use urgent_intake_core::models::{CoverageStatus, PaymentMethod, Severity, Symptom, SymptomReport};
use urgent_intake_core::services::{DocumentType, ServiceError};
use urgent_intake_core::{
    IntakeConfig, Stage, StageData, Step, VerificationResult, WorkflowController, WorkflowError,
    WorkflowResult,
};
use urgent_intake_fixtures::{
    approved_card, declined_card, intake_config, sample_identity, sample_insurance_card,
    MockDesk, MockDocumentScanner, MockInsuranceVerifier, MockPaymentProcessor, RecordingCheckIn,
};

// 2026-10-19 is a Monday
fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn controller(desk: &MockDesk, config: IntakeConfig) -> WorkflowController {
    WorkflowController::new(config, desk.collaborators())
        .unwrap()
        .with_clock(Arc::new(FixedClock(today())))
}

fn issues_desk() -> MockDesk {
    MockDesk::new().with_verifier(MockInsuranceVerifier::always(Ok(
        VerificationResult::issues(["ID not found"]),
    )))
}

async fn settle(wf: &mut WorkflowController, step: WorkflowResult<Step>) -> WorkflowResult<Step> {
    match step? {
        Step::Dispatched(call) => {
            let completion = call.wait().await;
            wf.resolve(completion)
        }
        other => Ok(other),
    }
}

fn register(wf: &mut WorkflowController) {
    wf.advance(Stage::Home, StageData::Start).unwrap();
    wf.advance(Stage::Registration, StageData::Identity(sample_identity()))
        .unwrap();
}

async fn verify(wf: &mut WorkflowController) -> Step {
    let step = wf.advance(
        Stage::InsuranceVerification,
        StageData::Insurance(sample_insurance_card()),
    );
    settle(wf, step).await.unwrap()
}

fn report() -> SymptomReport {
    let mut symptom = Symptom::named("Sore throat");
    symptom.id = "sym-1".into();
    symptom.severity = Some(Severity::Moderate);
    SymptomReport {
        symptoms: vec![symptom],
        chief_complaint: "Sore throat".into(),
    }
}

fn appointment(location_id: &str, date: NaiveDate, time: &str) -> StageData {
    StageData::Appointment(AppointmentForm {
        location_id: location_id.into(),
        date: Some(date),
        time: time.into(),
    })
}

/// Drive a verified-coverage session up to check-in confirmation.
async fn at_confirmation(desk: &MockDesk) -> WorkflowController {
    let mut wf = controller(desk, intake_config());
    register(&mut wf);
    verify(&mut wf).await;
    wf.advance(Stage::SymptomIntake, StageData::Symptoms(report()))
        .unwrap();
    wf.load_locations().await.unwrap();
    wf.advance(
        Stage::LocationDateSelection,
        appointment("loc1", today().succ_opt().unwrap(), "2:30 PM"),
    )
    .unwrap();
    wf
}

#[tokio::test]
async fn test_full_pass_with_verified_coverage() {
    let desk = MockDesk::new();
    let mut wf = at_confirmation(&desk).await;
    assert_eq!(wf.stage(), Stage::CheckInConfirmation);
    assert!(wf.record().insurance.as_ref().unwrap().is_verified());

    for form in ["form1", "form2", "form3", "form4"] {
        wf.set_form_completed(form, true).unwrap();
    }
    let step = wf.advance(Stage::CheckInConfirmation, StageData::CheckIn);
    let confirmation = match settle(&mut wf, step).await.unwrap() {
        Step::CheckedIn(confirmation) => confirmation,
        other => panic!("expected check-in, got {other:?}"),
    };

    assert_eq!(wf.stage(), Stage::CheckedIn);
    assert_eq!(confirmation.location_id, "loc1");
    assert_eq!(confirmation.time, "2:30 PM");

    let received = desk.check_in.received();
    assert_eq!(received.len(), 1);
    assert_eq!(confirmation.record_fingerprint, received[0].fingerprint().unwrap());
    assert_eq!(
        wf.history(),
        &[
            Stage::Home,
            Stage::Registration,
            Stage::InsuranceVerification,
            Stage::SymptomIntake,
            Stage::LocationDateSelection,
            Stage::CheckInConfirmation,
        ]
    );

    // Nothing moves once checked in
    let err = wf
        .advance(Stage::CheckInConfirmation, StageData::CheckIn)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::IllegalTransition { .. }));
}

#[tokio::test]
async fn test_coverage_issues_route_to_payment_options() {
    let desk = issues_desk();
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);

    let step = verify(&mut wf).await;
    assert_eq!(step.moved_to(), Some(Stage::PaymentOptions));

    let insurance = wf.record().insurance.clone().unwrap();
    assert_eq!(insurance.coverage_status, CoverageStatus::Issues);
    assert_eq!(insurance.issues, vec!["ID not found".to_string()]);
    assert!(insurance.coverage_details.is_none());
}

#[tokio::test]
async fn test_payment_method_routing() {
    let cases = [
        (PaymentMethod::SelfPay, Stage::CreditCardAuthorization),
        (PaymentMethod::PaymentPlan, Stage::SymptomIntake),
        (PaymentMethod::CashDiscount, Stage::SymptomIntake),
    ];
    for (method, expected) in cases {
        let desk = issues_desk();
        let mut wf = controller(&desk, intake_config());
        register(&mut wf);
        verify(&mut wf).await;

        let step = wf
            .advance(
                Stage::PaymentOptions,
                StageData::Payment {
                    method: Some(method),
                },
            )
            .unwrap();
        assert_eq!(step.moved_to(), Some(expected), "{method:?}");
        assert_eq!(wf.record().payment_selection.as_ref().unwrap().method, method);
    }
}

#[tokio::test]
async fn test_decline_returns_to_payment_options() {
    let desk = issues_desk();
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);
    verify(&mut wf).await;

    let self_pay = || StageData::Payment {
        method: Some(PaymentMethod::SelfPay),
    };
    wf.advance(Stage::PaymentOptions, self_pay()).unwrap();
    let step = wf.advance(Stage::CreditCardAuthorization, StageData::Card(declined_card()));
    let step = settle(&mut wf, step).await.unwrap();

    assert_eq!(step.moved_to(), Some(Stage::PaymentOptions));
    assert!(!wf.record().payment_selection.as_ref().unwrap().card_authorized);
    assert_eq!(
        wf.history(),
        &[Stage::Home, Stage::Registration, Stage::InsuranceVerification]
    );

    // Second attempt with a good card
    wf.advance(Stage::PaymentOptions, self_pay()).unwrap();
    let step = wf.advance(Stage::CreditCardAuthorization, StageData::Card(approved_card()));
    settle(&mut wf, step).await.unwrap();

    assert_eq!(wf.stage(), Stage::SymptomIntake);
    let payment = wf.record().payment_selection.clone().unwrap();
    assert!(payment.card_authorized);
    assert_eq!(payment.card_last_four.as_deref(), Some("4242"));
    assert!(payment.authorization_id.unwrap().starts_with("auth_"));
    assert_eq!(desk.payments.calls(), 2);
}

#[tokio::test]
async fn test_gateway_outage_surfaces_as_service_error() {
    let desk = issues_desk();
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);
    verify(&mut wf).await;
    wf.advance(
        Stage::PaymentOptions,
        StageData::Payment {
            method: Some(PaymentMethod::SelfPay),
        },
    )
    .unwrap();

    desk.payments.set_unreachable(true);
    let step = wf.advance(Stage::CreditCardAuthorization, StageData::Card(approved_card()));
    let err = settle(&mut wf, step).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Service(ServiceError::ProviderUnreachable(_))
    ));
    assert!(err.is_recoverable());
    assert_eq!(wf.stage(), Stage::CreditCardAuthorization);
    assert!(!wf.is_pending());

    desk.payments.set_unreachable(false);
    let step = wf.advance(Stage::CreditCardAuthorization, StageData::Card(approved_card()));
    settle(&mut wf, step).await.unwrap();
    assert_eq!(wf.stage(), Stage::SymptomIntake);
}

#[tokio::test(start_paused = true)]
async fn test_verification_retries_unreachable_provider() {
    let unreachable = || Err(ServiceError::ProviderUnreachable("timeout".into()));
    let desk = MockDesk::new().with_verifier(
        MockInsuranceVerifier::verified()
            .then(unreachable())
            .then(unreachable()),
    );
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);

    let step = verify(&mut wf).await;
    assert_eq!(step.moved_to(), Some(Stage::SymptomIntake));
    assert_eq!(desk.verifier.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_are_absorbed_as_issues() {
    let desk = MockDesk::new().with_verifier(MockInsuranceVerifier::always(Err(
        ServiceError::ProviderUnreachable("timeout".into()),
    )));
    let config = IntakeConfig {
        verification_attempts: 2,
        ..intake_config()
    };
    let mut wf = controller(&desk, config);
    register(&mut wf);

    let step = verify(&mut wf).await;
    assert_eq!(step.moved_to(), Some(Stage::PaymentOptions));
    assert_eq!(desk.verifier.calls(), 2);

    let insurance = wf.record().insurance.clone().unwrap();
    assert_eq!(insurance.coverage_status, CoverageStatus::Issues);
    assert_eq!(insurance.issues.len(), 1);
}

#[tokio::test]
async fn test_pending_coverage_wait_retry() {
    let desk = MockDesk::new()
        .with_verifier(MockInsuranceVerifier::verified().then(Ok(VerificationResult::pending())));
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);

    match verify(&mut wf).await {
        Step::AwaitingChoice(choices) => assert_eq!(choices, CoverageChoice::ALL.to_vec()),
        other => panic!("expected a coverage choice, got {other:?}"),
    }
    assert!(wf.record().insurance.is_none());
    assert_eq!(wf.coverage_choices().map(|c| c.len()), Some(3));

    let step = wf.choose_coverage(CoverageChoice::WaitRetry);
    let step = settle(&mut wf, step).await.unwrap();
    assert_eq!(step.moved_to(), Some(Stage::SymptomIntake));
    assert_eq!(desk.verifier.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_pending_coverage_timeout_applies_default() {
    let desk = MockDesk::new().with_verifier(MockInsuranceVerifier::always(Ok(
        VerificationResult::pending(),
    )));
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);
    verify(&mut wf).await;

    let (_tx, rx) = oneshot::channel();
    let step = wf.await_coverage_choice(rx).await.unwrap();
    assert_eq!(step.moved_to(), Some(Stage::PaymentOptions));

    let insurance = wf.record().insurance.clone().unwrap();
    assert_eq!(insurance.coverage_status, CoverageStatus::Pending);
    assert!(insurance.issues.is_empty());
    assert!(insurance.coverage_details.is_none());
}

#[tokio::test]
async fn test_pending_coverage_edit_insurance() {
    let desk = MockDesk::new().with_verifier(MockInsuranceVerifier::always(Ok(
        VerificationResult::pending(),
    )));
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);
    verify(&mut wf).await;

    let (tx, rx) = oneshot::channel();
    tx.send(CoverageChoice::EditInsurance).unwrap();
    let step = wf.await_coverage_choice(rx).await.unwrap();
    assert_eq!(step.moved_to(), Some(Stage::Registration));
    assert_eq!(wf.history(), &[Stage::Home]);
    // Identity survives the detour
    assert!(!wf.record().is_anonymous());
}

#[tokio::test]
async fn test_consent_progress_gates_check_in() {
    let desk = MockDesk::new();
    let mut wf = at_confirmation(&desk).await;
    assert_eq!(wf.forms().len(), 4);

    wf.set_form_completed("form1", true).unwrap();
    let gate = wf.consent_gate();
    assert_eq!(gate.completion_percentage(), 25.0);
    assert!(!gate.can_check_in());

    let err = wf
        .advance(Stage::CheckInConfirmation, StageData::CheckIn)
        .unwrap_err();
    match err {
        WorkflowError::Validation(v) => assert_eq!(v.issues.len(), 3),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(desk.check_in.calls(), 0);

    for form in ["form2", "form3", "form4"] {
        wf.set_form_completed(form, true).unwrap();
    }
    assert_eq!(wf.consent_gate().completion_percentage(), 100.0);
    assert!(wf.consent_gate().can_check_in());

    assert!(matches!(
        wf.set_form_completed("form9", true),
        Err(WorkflowError::Validation(_))
    ));
}

#[tokio::test]
async fn test_schedule_rejections_commit_nothing() {
    let desk = MockDesk::new();
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);
    verify(&mut wf).await;
    wf.advance(Stage::SymptomIntake, StageData::Symptoms(report()))
        .unwrap();
    wf.load_locations().await.unwrap();

    let sunday = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
    let yesterday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let rejected = [
        appointment("loc1", sunday, "9:00 AM"),
        appointment("loc1", yesterday, "9:00 AM"),
        appointment("loc2", today(), "2:30 PM"),
    ];
    for data in rejected {
        let err = wf.advance(Stage::LocationDateSelection, data).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(wf.record().appointment.is_none());
    }

    wf.advance(Stage::LocationDateSelection, appointment("loc2", today(), "2:00 PM"))
        .unwrap();
    assert_eq!(wf.stage(), Stage::CheckInConfirmation);
}

#[tokio::test]
async fn test_retreat_and_recommit_is_idempotent() {
    let desk = MockDesk::new();
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);
    verify(&mut wf).await;
    wf.advance(Stage::SymptomIntake, StageData::Symptoms(report()))
        .unwrap();
    let direct = wf.record().fingerprint().unwrap();

    assert_eq!(wf.retreat().unwrap(), Stage::SymptomIntake);
    let committed = wf.record().symptom_report.clone().unwrap();
    wf.advance(Stage::SymptomIntake, StageData::Symptoms(committed))
        .unwrap();

    assert_eq!(wf.stage(), Stage::LocationDateSelection);
    assert_eq!(wf.record().fingerprint().unwrap(), direct);
}

#[tokio::test]
async fn test_scan_failure_leaves_registration_open() {
    let desk = MockDesk::new().with_scanner(MockDocumentScanner::failing(ServiceError::ScanFailed(
        "image too blurry".into(),
    )));
    let mut wf = controller(&desk, intake_config());
    wf.advance(Stage::Home, StageData::Start).unwrap();

    let call = wf.scan_document(DocumentType::IdCard).unwrap();
    let err = wf.resolve(call.wait().await).unwrap_err();
    assert!(matches!(err, WorkflowError::Service(ServiceError::ScanFailed(_))));
    assert_eq!(wf.stage(), Stage::Registration);
    assert!(!wf.is_pending());

    // Manual entry still works
    wf.advance(Stage::Registration, StageData::Identity(sample_identity()))
        .unwrap();
}

#[tokio::test]
async fn test_location_cache_survives_outage() {
    let desk = MockDesk::new();
    let mut wf = controller(&desk, intake_config());
    assert_eq!(wf.load_locations().await.unwrap().len(), 3);

    desk.scheduling.set_unreachable(true);
    assert_eq!(wf.load_locations().await.unwrap().len(), 3);
    assert_eq!(desk.scheduling.calls(), 2);

    let mut fresh = controller(&desk, intake_config());
    let err = fresh.load_locations().await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Service(ServiceError::ProviderUnreachable(_))
    ));
}

#[tokio::test]
async fn test_failed_hand_off_can_be_retried() {
    let desk = MockDesk::new().with_check_in(RecordingCheckIn::failing_first(
        ServiceError::ProviderUnreachable("EHR offline".into()),
        1,
    ));
    let mut wf = at_confirmation(&desk).await;
    for form in ["form1", "form2", "form3", "form4"] {
        wf.set_form_completed(form, true).unwrap();
    }

    let step = wf.advance(Stage::CheckInConfirmation, StageData::CheckIn);
    assert!(matches!(
        settle(&mut wf, step).await,
        Err(WorkflowError::Service(ServiceError::ProviderUnreachable(_)))
    ));
    assert_eq!(wf.stage(), Stage::CheckInConfirmation);
    assert!(!wf.is_pending());
    assert_eq!(desk.check_in.calls(), 1);

    let step = wf.advance(Stage::CheckInConfirmation, StageData::CheckIn);
    let Step::CheckedIn(confirmation) = settle(&mut wf, step).await.unwrap() else {
        panic!("retry did not check in");
    };
    assert_eq!(wf.stage(), Stage::CheckedIn);
    let received = desk.check_in.received();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0], received[1]);
    assert_eq!(confirmation.record_fingerprint, received[1].fingerprint().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_reset_aborts_outstanding_hand_off() {
    let desk = MockDesk::new()
        .with_check_in(RecordingCheckIn::new().with_latency(Duration::from_millis(50)));
    let mut wf = at_confirmation(&desk).await;
    for form in ["form1", "form2", "form3", "form4"] {
        wf.set_form_completed(form, true).unwrap();
    }

    let step = wf
        .advance(Stage::CheckInConfirmation, StageData::CheckIn)
        .unwrap();
    assert!(matches!(step, Step::Dispatched(_)));
    drop(step);
    wf.reset();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(wf.stage(), Stage::Home);
    assert!(!wf.is_pending());
    assert_eq!(desk.check_in.calls(), 0);
    assert!(desk.check_in.received().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_authorization_never_reaches_gateway() {
    let desk = issues_desk()
        .with_payments(MockPaymentProcessor::new().with_latency(Duration::from_millis(50)));
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);
    verify(&mut wf).await;
    wf.advance(
        Stage::PaymentOptions,
        StageData::Payment {
            method: Some(PaymentMethod::SelfPay),
        },
    )
    .unwrap();

    let step = wf
        .advance(Stage::CreditCardAuthorization, StageData::Card(approved_card()))
        .unwrap();
    let Step::Dispatched(call) = step else {
        panic!("expected the authorization to be dispatched");
    };
    let id = call.id();
    drop(call);
    assert_eq!(wf.outstanding_operation().map(|(pending, _)| pending), Some(id));
    assert_eq!(wf.cancel_pending(), Some(id));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(desk.payments.calls(), 0);
    assert_eq!(wf.stage(), Stage::CreditCardAuthorization);
    assert!(wf.record().payment_selection.as_ref().unwrap().authorization_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_controller_aborts_its_call() {
    let desk = MockDesk::new()
        .with_check_in(RecordingCheckIn::new().with_latency(Duration::from_millis(50)));
    let mut wf = at_confirmation(&desk).await;
    for form in ["form1", "form2", "form3", "form4"] {
        wf.set_form_completed(form, true).unwrap();
    }
    let step = wf
        .advance(Stage::CheckInConfirmation, StageData::CheckIn)
        .unwrap();
    drop(wf);
    drop(step);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(desk.check_in.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_call_releases_stage() {
    let desk = MockDesk::new().with_verifier(
        MockInsuranceVerifier::verified().with_latency(Duration::from_secs(5)),
    );
    let mut wf = controller(&desk, intake_config());
    register(&mut wf);

    let call = match wf
        .advance(
            Stage::InsuranceVerification,
            StageData::Insurance(sample_insurance_card()),
        )
        .unwrap()
    {
        Step::Dispatched(call) => call,
        other => panic!("expected dispatch, got {other:?}"),
    };
    assert_eq!(wf.cancel_pending(), Some(call.id()));
    assert!(!wf.is_pending());

    // The late completion is stale
    let completion = call.wait().await;
    assert!(matches!(
        wf.resolve(completion),
        Err(WorkflowError::UnknownOperation(_))
    ));

    let step = verify(&mut wf).await;
    assert_eq!(step.moved_to(), Some(Stage::SymptomIntake));
}

#[tokio::test]
async fn test_reset_starts_a_new_session() {
    let desk = MockDesk::new();
    let mut wf = at_confirmation(&desk).await;
    let session = wf.record().session_id.clone();

    wf.reset();
    assert_eq!(wf.stage(), Stage::Home);
    assert!(wf.history().is_empty());
    assert!(wf.record().insurance.is_none());
    assert!(wf.forms().is_empty());
    assert_ne!(wf.record().session_id, session);
    // The scheduling catalog is not session data
    assert_eq!(wf.locations().len(), 3);
    assert_eq!(wf.retreat(), Err(WorkflowError::NoHistory));
}

#[tokio::test]
async fn test_assistant_drives_symptom_commit() {
    let desk = MockDesk::new();
    let config = IntakeConfig {
        require_symptom_severity: true,
        ..intake_config()
    };
    let mut wf = controller(&desk, config);
    register(&mut wf);
    verify(&mut wf).await;

    let assistant = wf.assistant_mut();
    assistant.respond("headache");
    assert!(!assistant.add_symptom(Symptom::named("")));
    assistant.commit_draft();

    // Severity is required under this configuration
    let err = wf.complete_assessment("Headache").unwrap_err();
    match err {
        WorkflowError::Validation(v) => assert!(v.is_missing("symptoms[0].severity")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(wf.record().symptom_report.is_none());

    let mut rated = wf.assistant().symptoms()[0].clone();
    rated.severity = Some(Severity::Mild);
    let assistant = wf.assistant_mut();
    assistant.remove_symptom(&rated.id);
    assistant.add_symptom(rated);

    wf.complete_assessment("Headache").unwrap();
    assert_eq!(wf.stage(), Stage::LocationDateSelection);
    let committed = wf.record().symptom_report.clone().unwrap();
    assert_eq!(committed.symptoms.len(), 1);
    assert_eq!(committed.chief_complaint, "Headache");
}
