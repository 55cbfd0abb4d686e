//! Sample clinic content: locations, consent forms and patient submissions.

use urgent_intake_core::models::{
    CardInfo, ConsentForm, CoverageDetails, Deductible, EstimatedCosts, IdentityForm,
    InsuranceCard, Location, VerificationResult,
};
use urgent_intake_core::IntakeConfig;

fn slots(times: &[&str]) -> Vec<String> {
    times.iter().map(|t| t.to_string()).collect()
}

/// The three clinics of the demo network.
pub fn standard_locations() -> Vec<Location> {
    let mut downtown = Location::new(
        "loc1",
        "Downtown Urgent Care",
        slots(&["9:00 AM", "10:30 AM", "11:45 AM", "1:15 PM", "2:30 PM", "4:00 PM"]),
    );
    downtown.address = Some("123 Main Street, Suite 100".into());
    downtown.phone = Some("(555) 123-4567".into());
    downtown.wait_time = Some("15-25 min".into());

    let mut westside = Location::new(
        "loc2",
        "Westside Medical Center",
        slots(&["9:30 AM", "11:00 AM", "12:15 PM", "2:00 PM", "3:45 PM", "5:15 PM"]),
    );
    westside.address = Some("456 Park Avenue".into());
    westside.phone = Some("(555) 987-6543".into());
    westside.wait_time = Some("5-10 min".into());

    let mut eastside = Location::new(
        "loc3",
        "Eastside Urgent Care",
        slots(&["8:45 AM", "10:15 AM", "12:30 PM", "1:45 PM", "3:15 PM", "4:45 PM"]),
    );
    eastside.address = Some("789 Oak Street, Building B".into());
    eastside.phone = Some("(555) 456-7890".into());
    eastside.wait_time = Some("30-40 min".into());

    vec![downtown, westside, eastside]
}

/// Forms every patient signs before check-in.
pub fn standard_consent_forms() -> Vec<ConsentForm> {
    vec![
        ConsentForm::new("form1", "General Consent for Treatment").with_content(
            "I hereby consent to evaluation, testing, and treatment as directed by my physician \
             or their designee at Urgent Care Clinic. I authorize the release of my medical \
             information to process healthcare claims. I understand that I am responsible for \
             charges not covered by insurance.",
        ),
        ConsentForm::new("form2", "HIPAA Privacy Acknowledgment").with_content(
            "I acknowledge that I have received a copy of the Urgent Care Clinic Notice of \
             Privacy Practices, which describes how my health information may be used and \
             disclosed and how I can access this information.",
        ),
        ConsentForm::new("form3", "Financial Responsibility").with_content(
            "I understand that I am financially responsible for all charges whether or not paid \
             by my insurance. Co-payments, deductibles, and non-covered services are due at the \
             time of service.",
        ),
        ConsentForm::new("form4", "Medical History Form").with_content(
            "Please provide accurate information about your medical history, including current \
             medications, allergies, past surgeries, and chronic conditions.",
        ),
    ]
}

/// Default configuration with the standard consent forms installed.
pub fn intake_config() -> IntakeConfig {
    IntakeConfig::default().with_consent_forms(standard_consent_forms())
}

/// Registration form of the sample patient.
pub fn sample_identity() -> IdentityForm {
    IdentityForm {
        first_name: "Ima".into(),
        last_name: "Cardholder".into(),
        date_of_birth: "1985-06-15".into(),
        address: "123 Main Street".into(),
        id_number: "DL12345678".into(),
        city: Some("Anytown".into()),
        state: Some("CA".into()),
        zip_code: Some("90210".into()),
    }
}

/// Insurance card of the sample patient.
pub fn sample_insurance_card() -> InsuranceCard {
    InsuranceCard {
        provider: "HealthPlus Insurance".into(),
        member_id: "MEM987654321".into(),
        group_number: "GRP123456".into(),
        policy_holder_name: Some("Ima Cardholder".into()),
        relation_to_patient: None,
        plan_type: Some("PPO".into()),
    }
}

/// In-network PPO coverage with a $25 copay.
pub fn verified_coverage() -> VerificationResult {
    let mut result = VerificationResult::verified(CoverageDetails {
        in_network: true,
        deductible: Deductible {
            individual: 1500.0,
            family: 3000.0,
            met: 500.0,
            remaining: 1000.0,
        },
        copay: 25.0,
        coinsurance_percent: 20.0,
    });
    result.estimated_costs = Some(EstimatedCosts {
        visit_fee: 25.0,
        additional_services: 0.0,
        total: 25.0,
    });
    result
}

/// A card the mock processor approves.
pub fn approved_card() -> CardInfo {
    CardInfo {
        cardholder_name: "Ima Cardholder".into(),
        card_number: "4242 4242 4242 4242".into(),
        expiry: "12/29".into(),
        cvv: "123".into(),
    }
}

/// A card the mock processor declines.
pub fn declined_card() -> CardInfo {
    CardInfo {
        card_number: "4000 0000 0000 0002".into(),
        ..approved_card()
    }
}
