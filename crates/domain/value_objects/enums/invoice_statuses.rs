use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InvoiceStatus {
    #[default]
    Unpaid,
    Paid,
    Cancelled,
    Overdue,
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Overdue => "overdue",
        };
        write!(f, "{}", status)
    }
}

impl InvoiceStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "paid" => InvoiceStatus::Paid,
            "cancelled" => InvoiceStatus::Cancelled,
            "overdue" => InvoiceStatus::Overdue,
            _ => InvoiceStatus::Unpaid,
        }
    }
}
