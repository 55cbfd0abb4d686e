//! Payment selection routing.

use crate::models::{Authorization, PaymentMethod};
use crate::services::ServiceError;
use crate::workflow::Trigger;

/// Routes payment choices and authorization results.
pub struct PaymentSelectionRouter;

impl PaymentSelectionRouter {
    /// Self-pay needs a card on file; every other method goes to intake.
    pub fn route(method: PaymentMethod) -> Trigger {
        if method.requires_card() {
            Trigger::CardRequired
        } else {
            Trigger::NoCardRequired
        }
    }

    /// Route an authorization result.
    ///
    /// A decline sends the patient back to payment options. Errors without
    /// an alternate path are returned unchanged.
    pub fn route_authorization(
        result: &Result<Authorization, ServiceError>,
    ) -> Result<Trigger, ServiceError> {
        match result {
            Ok(_) => Ok(Trigger::CardAuthorized),
            Err(ServiceError::Declined(_)) => Ok(Trigger::CardDeclined),
            Err(other) => Err(other.clone()),
        }
    }
}
