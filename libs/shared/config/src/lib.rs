use std::env;

use rust_decimal::Decimal;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// How far a payment may push paid_amount past the invoice total.
    /// Zero means strict rejection of any overpayment.
    pub overpayment_tolerance: Decimal,
    pub invoice_number_prefix: String,
    /// Advisory refresh interval surfaced to triage dashboard clients.
    pub triage_poll_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            overpayment_tolerance: env::var("OVERPAYMENT_TOLERANCE")
                .ok()
                .and_then(|raw| match raw.parse::<Decimal>() {
                    Ok(value) if value >= Decimal::ZERO => Some(value),
                    _ => {
                        warn!("OVERPAYMENT_TOLERANCE not a non-negative decimal, using 0");
                        None
                    }
                })
                .unwrap_or(Decimal::ZERO),
            invoice_number_prefix: env::var("INVOICE_NUMBER_PREFIX")
                .unwrap_or_else(|_| "INV".to_string()),
            triage_poll_seconds: env::var("TRIAGE_POLL_SECONDS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            overpayment_tolerance: Decimal::ZERO,
            invoice_number_prefix: "INV".to_string(),
            triage_poll_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_strict_about_overpayment() {
        let config = AppConfig::default();
        assert_eq!(config.overpayment_tolerance, Decimal::ZERO);
        assert_eq!(config.invoice_number_prefix, "INV");
        assert_eq!(config.triage_poll_seconds, 30);
    }
}
