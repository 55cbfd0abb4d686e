//! Drive one complete intake session against the in-memory collaborators.
//!
//! # Environment Variables
//! - `INTAKE_CONFIG`: path to a JSON `IntakeConfig` (default: fixture config)
//! - `RUST_LOG`: log filter (default: "info")

use anyhow::{bail, Context};
use chrono::{Datelike, Days, Local, Weekday};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use urgent_intake_core::models::Severity;
use urgent_intake_core::services::DocumentType;
use urgent_intake_core::{
    AppointmentForm, IntakeConfig, PaymentMethod, Stage, StageData, Step, WorkflowController,
    WorkflowResult,
};
use urgent_intake_fixtures::{approved_card, intake_config, standard_consent_forms, MockDesk};

/// Wait for a dispatched call and feed its completion back.
async fn settle(wf: &mut WorkflowController, step: WorkflowResult<Step>) -> anyhow::Result<Step> {
    match step? {
        Step::Dispatched(call) => {
            tracing::info!(operation = %call.operation(), "waiting on collaborator");
            let completion = call.wait().await;
            Ok(wf.resolve(completion)?)
        }
        other => Ok(other),
    }
}

fn load_config() -> anyhow::Result<IntakeConfig> {
    match std::env::var("INTAKE_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config from {path}"))?;
            let config = IntakeConfig::from_json(&json)?;
            if config.consent_forms.is_empty() {
                Ok(config.with_consent_forms(standard_consent_forms()))
            } else {
                Ok(config)
            }
        }
        Err(_) => Ok(intake_config()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let desk = MockDesk::new();
    let mut wf = WorkflowController::new(load_config()?, desk.collaborators())?;

    wf.advance(Stage::Home, StageData::Start)?;

    // Registration, prefilled from the scanned documents
    let call = wf.scan_document(DocumentType::IdCard)?;
    let Step::Prefill(id_fields) = settle(&mut wf, Ok(Step::Dispatched(call))).await? else {
        bail!("expected a prefill from the ID scan");
    };
    let call = wf.scan_document(DocumentType::InsuranceCard)?;
    let Step::Prefill(card_fields) = settle(&mut wf, Ok(Step::Dispatched(call))).await? else {
        bail!("expected a prefill from the insurance card scan");
    };
    wf.advance(Stage::Registration, StageData::Identity(id_fields.to_identity_form()))?;

    let card = card_fields.to_insurance_card();
    let step = wf.advance(Stage::InsuranceVerification, StageData::Insurance(card));
    let step = settle(&mut wf, step).await?;
    if step.moved_to() == Some(Stage::PaymentOptions) {
        wf.advance(
            Stage::PaymentOptions,
            StageData::Payment {
                method: Some(PaymentMethod::SelfPay),
            },
        )?;
        let step = wf.advance(Stage::CreditCardAuthorization, StageData::Card(approved_card()));
        settle(&mut wf, step).await?;
    }

    // Symptoms through the assistant
    let assistant = wf.assistant_mut();
    assistant.respond("I have had a sore throat since yesterday");
    assistant.update_draft(|draft| {
        draft.severity = Some(Severity::Moderate);
        draft.duration = "1 day".into();
    });
    assistant.commit_draft();
    wf.complete_assessment("Sore throat")?;

    // Location and date: the next open day
    let locations = wf.load_locations().await?.to_vec();
    let location = locations.first().context("scheduler returned no locations")?;
    let mut date = Local::now().date_naive() + Days::new(1);
    if date.weekday() == Weekday::Sun {
        date = date + Days::new(1);
    }
    let time = location
        .available_times
        .first()
        .context("location has no open slots")?
        .clone();
    wf.advance(
        Stage::LocationDateSelection,
        StageData::Appointment(AppointmentForm {
            location_id: location.id.clone(),
            date: Some(date),
            time,
        }),
    )?;

    // Consent forms, then hand off
    let form_ids: Vec<String> = wf.forms().iter().map(|f| f.id.clone()).collect();
    for id in &form_ids {
        wf.set_form_completed(id, true)?;
        tracing::info!(
            percent = wf.consent_gate().completion_percentage(),
            "consent progress"
        );
    }
    let step = wf.advance(Stage::CheckInConfirmation, StageData::CheckIn);
    let Step::CheckedIn(confirmation) = settle(&mut wf, step).await? else {
        bail!("check-in did not complete");
    };

    println!("{}", serde_json::to_string_pretty(&confirmation)?);
    tracing::info!(history = ?wf.history(), "walkthrough finished");
    Ok(())
}
