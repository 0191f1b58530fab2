// SPDX-FileCopyrightText: 2026 Concierge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use concierge_core::{ClinicConfig, DepositIntent};
use tracing::warn;

/// Applies clinic rules to a raw deposit intent.
///
/// Payment-link clinics get their per-service amount. Structured-booking
/// clinics never collect before a slot has been selected.
pub fn reconcile(
    intent: Option<DepositIntent>,
    cfg: Option<&ClinicConfig>,
    service: &str,
    slot_selected: bool,
) -> Option<DepositIntent> {
    let mut intent = intent?;
    let Some(cfg) = cfg else {
        return Some(intent);
    };
    if cfg.uses_structured_booking() {
        if !slot_selected {
            warn!(org_id = %cfg.org_id, "deposit suppressed until a time slot is selected");
            return None;
        }
        return Some(intent);
    }
    if !service.is_empty() {
        let amount = cfg.deposit_amount_for_service(service);
        if amount > 0 {
            intent.amount_cents = amount;
        }
    }
    Some(intent)
}

#[cfg(test)]
mod tests {
    use concierge_core::BookingPlatform;

    use super::*;

    fn intent() -> DepositIntent {
        DepositIntent {
            amount_cents: 5000,
            description: "Appointment deposit".into(),
            success_url: String::new(),
            cancel_url: String::new(),
        }
    }

    #[test]
    fn service_override_for_payment_link_clinics() {
        let mut cfg = ClinicConfig::new("org-1", "Glow");
        cfg.service_deposit_amount_cents.insert("lip filler".into(), 10_000);
        let out = reconcile(Some(intent()), Some(&cfg), "Lip Filler", false).unwrap();
        assert_eq!(out.amount_cents, 10_000);

        let out = reconcile(Some(intent()), Some(&cfg), "Botox", false).unwrap();
        assert_eq!(out.amount_cents, 5000);
    }

    #[test]
    fn structured_booking_waits_for_slot() {
        let mut cfg = ClinicConfig::new("org-1", "Glow");
        cfg.booking_platform = BookingPlatform::Structured;
        assert!(reconcile(Some(intent()), Some(&cfg), "Botox", false).is_none());
        assert!(reconcile(Some(intent()), Some(&cfg), "Botox", true).is_some());
    }

    #[test]
    fn nothing_in_nothing_out() {
        let cfg = ClinicConfig::new("org-1", "Glow");
        assert!(reconcile(None, Some(&cfg), "Botox", true).is_none());
        assert_eq!(reconcile(Some(intent()), None, "", false), Some(intent()));
    }
}
