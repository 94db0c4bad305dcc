use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Outcome of a single notification attempt, recorded in `email_logs`.
/// `Simulated` means no mailer endpoint was configured and the send was skipped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EmailStatus {
    Sent,
    Failed,
    Simulated,
}

impl Display for EmailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
            EmailStatus::Simulated => "simulated",
        };
        write!(f, "{}", status)
    }
}
