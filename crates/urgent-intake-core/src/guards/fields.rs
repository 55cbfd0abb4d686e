//! Required-field sets for the form-driven stages.

use chrono::NaiveDate;

use super::{FieldCheck, Problem, ValidationError};
use crate::models::{CardInfo, Identity, IdentityForm, InsuranceCard, SymptomReport};
use crate::workflow::Stage;

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate registration fields into a typed identity.
pub fn validate_identity(form: IdentityForm) -> Result<Identity, ValidationError> {
    let mut check = FieldCheck::new(Stage::Registration);
    check.require("first_name", &form.first_name);
    check.require("last_name", &form.last_name);

    let date_of_birth = if check.require("date_of_birth", &form.date_of_birth) {
        match NaiveDate::parse_from_str(form.date_of_birth.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                check.malformed("date_of_birth", "expected YYYY-MM-DD");
                None
            }
        }
    } else {
        None
    };

    check.require("address", &form.address);
    check.require("id_number", &form.id_number);
    check.finish()?;

    // A clean check implies the birth date parsed
    let Some(date_of_birth) = date_of_birth else {
        return Err(ValidationError::single(
            Stage::Registration,
            "date_of_birth",
            Problem::Missing,
        ));
    };

    Ok(Identity {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        date_of_birth,
        address: form.address.trim().to_string(),
        id_number: form.id_number.trim().to_string(),
        city: optional(form.city),
        state: optional(form.state),
        zip_code: optional(form.zip_code),
    })
}

/// Validate the insurance card fields sent for verification.
pub fn validate_insurance_card(card: InsuranceCard) -> Result<InsuranceCard, ValidationError> {
    let mut check = FieldCheck::new(Stage::InsuranceVerification);
    check.require("provider", &card.provider);
    check.require("member_id", &card.member_id);
    check.require("group_number", &card.group_number);
    check.finish()?;

    Ok(InsuranceCard {
        provider: card.provider.trim().to_string(),
        member_id: card.member_id.trim().to_string(),
        group_number: card.group_number.trim().to_string(),
        policy_holder_name: optional(card.policy_holder_name),
        relation_to_patient: optional(card.relation_to_patient).or_else(|| Some("self".into())),
        plan_type: optional(card.plan_type),
    })
}

/// Validate card details before asking the processor to authorize them.
pub fn validate_card(card: &CardInfo) -> Result<(), ValidationError> {
    let mut check = FieldCheck::new(Stage::CreditCardAuthorization);
    check.require("cardholder_name", &card.cardholder_name);

    if check.require("card_number", &card.card_number) {
        let digits = card.digits();
        if !digits.chars().all(|c| c.is_ascii_digit()) || !(12..=19).contains(&digits.len()) {
            check.malformed("card_number", "expected 12 to 19 digits");
        }
    }

    if check.require("expiry", &card.expiry) && !is_valid_expiry(card.expiry.trim()) {
        check.malformed("expiry", "expected MM/YY");
    }

    if check.require("cvv", &card.cvv) {
        let cvv = card.cvv.trim();
        if !cvv.chars().all(|c| c.is_ascii_digit()) || !(3..=4).contains(&cvv.len()) {
            check.malformed("cvv", "expected 3 or 4 digits");
        }
    }

    check.finish()
}

fn is_valid_expiry(expiry: &str) -> bool {
    let Some((month, year)) = expiry.split_once('/') else {
        return false;
    };
    let month_ok = month.len() == 2 && matches!(month.parse::<u32>(), Ok(1..=12));
    let year_ok = year.len() == 2 && year.chars().all(|c| c.is_ascii_digit());
    month_ok && year_ok
}

/// Validate a symptom report before it is committed.
pub fn validate_symptom_report(
    report: &SymptomReport,
    require_severity: bool,
) -> Result<(), ValidationError> {
    let mut check = FieldCheck::new(Stage::SymptomIntake);
    check.require("chief_complaint", &report.chief_complaint);

    for (i, symptom) in report.symptoms.iter().enumerate() {
        if !symptom.has_name() {
            check.missing(&format!("symptoms[{i}].name"));
        }
        if require_severity && symptom.severity.is_none() {
            check.missing(&format!("symptoms[{i}].severity"));
        }
    }

    check.finish()
}
