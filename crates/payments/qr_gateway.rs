use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default charge TTL when the gateway response does not carry one.
pub const DEFAULT_CHARGE_TTL_SECS: u64 = 900;

/// Currencies quoted in whole units only; their stored amount has no
/// fractional subunit and is displayed without decimals.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["JPY", "KRW", "VND", "CLP", "ISK", "IDR"];

/// Common contract over the QR payment backends. The "standard" backend is
/// poll-only; the "live" backend additionally hands back a push channel URL.
/// Callers stay backend-agnostic.
#[async_trait]
#[automock]
pub trait QrGateway: Send + Sync {
    async fn generate_charge(&self, request: GenerateChargeRequest) -> Result<Charge>;

    async fn check_status(&self, transaction_id: &str) -> Result<ChargeStatus>;
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateChargeRequest {
    pub amount_minor: i32,
    pub currency: String,
    #[serde(rename = "orderId")]
    pub order_id: Uuid,
    #[serde(rename = "invoiceId")]
    pub invoice_id: Uuid,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    /// Scannable payload the UI renders as a QR code.
    pub qr_code: String,
    pub transaction_id: String,
    /// Present only for the live backend.
    pub ws_url: Option<String>,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    Pending,
    Paid,
}

impl ChargeStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "paid" => ChargeStatus::Paid,
            _ => ChargeStatus::Pending,
        }
    }
}

/// Renders a stored minor-unit amount for display. Fractional currencies get
/// two decimals; zero-decimal currencies are shown as whole units. The stored
/// amount itself is never altered.
pub fn format_display_amount(amount_minor: i32, currency: &str) -> String {
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.to_ascii_uppercase().as_str()) {
        return amount_minor.to_string();
    }

    format!("{}.{:02}", amount_minor / 100, (amount_minor % 100).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_currency_shows_two_decimals() {
        assert_eq!(format_display_amount(1000, "USD"), "10.00");
        assert_eq!(format_display_amount(1999, "usd"), "19.99");
        assert_eq!(format_display_amount(5, "EUR"), "0.05");
    }

    #[test]
    fn zero_decimal_currency_shows_whole_units() {
        assert_eq!(format_display_amount(1500, "JPY"), "1500");
        assert_eq!(format_display_amount(120000, "VND"), "120000");
    }

    #[test]
    fn charge_status_parses_leniently() {
        assert_eq!(ChargeStatus::from_str("paid"), ChargeStatus::Paid);
        assert_eq!(ChargeStatus::from_str("pending"), ChargeStatus::Pending);
        assert_eq!(ChargeStatus::from_str("unknown"), ChargeStatus::Pending);
    }
}
