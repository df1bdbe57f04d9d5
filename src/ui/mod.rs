// Operator-facing terminal output
//
// - confirm.rs: per-device confirmation prompt
// - status.rs: coloured status, warning and error lines

pub mod confirm;
pub mod status;

pub use confirm::{ConfirmationGate, Decision, PromptGate, CONFIRMATION_TOKEN};
