//! Domain models for the intake workflow.

mod appointment;
mod consent;
mod insurance;
mod patient;
mod payment;
mod symptom;

pub use appointment::*;
pub use consent::*;
pub use insurance::*;
pub use patient::*;
pub use payment::*;
pub use symptom::*;
