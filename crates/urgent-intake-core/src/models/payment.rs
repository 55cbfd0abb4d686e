//! Payment models.

use serde::{Deserialize, Serialize};

/// Payment method chosen when insurance cannot cover the visit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    SelfPay,
    PaymentPlan,
    CashDiscount,
}

/// Display entry for the payment options screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentOption {
    pub method: PaymentMethod,
    pub name: String,
    pub description: String,
    pub estimated_cost: String,
}

impl PaymentMethod {
    /// Stable identifier ("self-pay", "payment-plan", "cash-discount").
    pub fn id(&self) -> &'static str {
        match self {
            PaymentMethod::SelfPay => "self-pay",
            PaymentMethod::PaymentPlan => "payment-plan",
            PaymentMethod::CashDiscount => "cash-discount",
        }
    }

    /// Parse a method from its identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim() {
            "self-pay" => Some(PaymentMethod::SelfPay),
            "payment-plan" => Some(PaymentMethod::PaymentPlan),
            "cash-discount" => Some(PaymentMethod::CashDiscount),
            _ => None,
        }
    }

    /// Whether this method needs a card on file before the visit.
    pub fn requires_card(&self) -> bool {
        matches!(self, PaymentMethod::SelfPay)
    }

    /// The options offered to the patient, in display order.
    pub fn catalog() -> Vec<PaymentOption> {
        vec![
            PaymentOption {
                method: PaymentMethod::SelfPay,
                name: "Self-Pay".into(),
                description: "Pay directly for services with credit card, debit card, or cash."
                    .into(),
                estimated_cost: "$150-$250".into(),
            },
            PaymentOption {
                method: PaymentMethod::PaymentPlan,
                name: "Payment Plan".into(),
                description: "Spread your payment over multiple installments.".into(),
                estimated_cost: "Available for bills over $100".into(),
            },
            PaymentOption {
                method: PaymentMethod::CashDiscount,
                name: "Cash Discount".into(),
                description: "Pay with cash at time of service for a 15% discount.".into(),
                estimated_cost: "$125-$210".into(),
            },
        ]
    }
}

/// Card details captured for pre-authorization. Never stored in the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardInfo {
    pub cardholder_name: String,
    pub card_number: String,
    /// Expiry as `MM/YY`
    pub expiry: String,
    pub cvv: String,
}

impl CardInfo {
    /// Card number with separators removed.
    pub fn digits(&self) -> String {
        self.card_number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect()
    }

    /// Last four digits, for display and the record.
    pub fn last_four(&self) -> String {
        let digits = self.digits();
        let start = digits.len().saturating_sub(4);
        digits[start..].to_string()
    }
}

/// Successful result of `PaymentProcessor::authorize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Authorization {
    pub authorization_id: String,
}

/// Committed payment group of the patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentSelection {
    pub method: PaymentMethod,
    pub card_authorized: bool,
    pub authorization_id: Option<String>,
    pub card_last_four: Option<String>,
}

impl PaymentSelection {
    /// A fresh selection without any card authorization.
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            card_authorized: false,
            authorization_id: None,
            card_last_four: None,
        }
    }
}
