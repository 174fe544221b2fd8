//! # Commission Resolution
//!
//! Resolves the commission configuration applicable to one sale line via a
//! priority cascade.
//!
//! ## The Cascade
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │              resolve(professional, kind, item_id, catalog)             │
//! │                                                                        │
//! │  1. Professional's per-item override   (service or product map)       │
//! │         │ miss                                                         │
//! │         ▼                                                              │
//! │  2. Catalog entry's default commission                                 │
//! │         │ miss                                                         │
//! │         ▼                                                              │
//! │  3. Professional's default commission                                  │
//! │         │ miss                                                         │
//! │         ▼                                                              │
//! │  4. None → the line yields no commission row (silent skip)            │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cascade is one prioritized lookup, independently testable - never an
//! inlined chain of fallback operators scattered across report code.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Rate};
use crate::types::{ItemKind, Professional};

// =============================================================================
// Commission Config
// =============================================================================

/// How a commission is computed from a base amount.
///
/// Serialized with an explicit tag so override maps stored as JSON read
/// back unambiguously: `{"type": "percentage", "value": 1250}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CommissionConfig {
    /// Percentage of the commission base, in basis points (1250 = 12.5%).
    Percentage(u32),
    /// Flat amount in cents per line, regardless of the base.
    Fixed(i64),
}

impl CommissionConfig {
    /// Computes the commission amount for a given base.
    ///
    /// ## Example
    /// ```rust
    /// use atelier_core::commission::CommissionConfig;
    /// use atelier_core::money::Money;
    ///
    /// let base = Money::from_cents(10_000);
    /// assert_eq!(CommissionConfig::Percentage(1500).amount_for(base).cents(), 1500);
    /// assert_eq!(CommissionConfig::Fixed(700).amount_for(base).cents(), 700);
    /// ```
    pub fn amount_for(&self, base: Money) -> Money {
        match self {
            CommissionConfig::Percentage(bps) => base.apply_rate(Rate::from_bps(*bps)),
            CommissionConfig::Fixed(cents) => Money::from_cents(*cents),
        }
    }

    /// The rate in basis points, when the config is percentage-shaped.
    ///
    /// Fixed configs have no meaningful percentage; report rows carry
    /// `None` for them.
    pub fn bps(&self) -> Option<u32> {
        match self {
            CommissionConfig::Percentage(bps) => Some(*bps),
            CommissionConfig::Fixed(_) => None,
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves the commission config for a (professional, catalog item) pair.
///
/// First match wins: professional per-item override → catalog default →
/// professional default. Returns `None` when no level matches; the caller
/// skips the line without error (a resolution miss is a configuration
/// choice, not a data problem).
///
/// `catalog_default` is the matched catalog entry's own commission, already
/// looked up by the caller - `None` both when the entry has no default and
/// when the entry itself is unknown.
pub fn resolve(
    professional: &Professional,
    kind: ItemKind,
    item_id: &str,
    catalog_default: Option<CommissionConfig>,
) -> Option<CommissionConfig> {
    let override_map = match kind {
        ItemKind::Service => &professional.service_overrides,
        ItemKind::Product => &professional.product_overrides,
    };

    override_map
        .get(item_id)
        .copied()
        .or(catalog_default)
        .or(professional.default_commission)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn professional(
        default: Option<CommissionConfig>,
        service_overrides: &[(&str, CommissionConfig)],
    ) -> Professional {
        Professional {
            id: "pro-1".to_string(),
            name: "Alex".to_string(),
            is_active: true,
            default_commission: default,
            service_overrides: service_overrides
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            product_overrides: HashMap::new(),
        }
    }

    #[test]
    fn test_per_item_override_beats_all_defaults() {
        // 10% per-service override vs 5% catalog default vs 8% personal default
        let pro = professional(
            Some(CommissionConfig::Percentage(800)),
            &[("svc-1", CommissionConfig::Percentage(1000))],
        );

        let resolved = resolve(
            &pro,
            ItemKind::Service,
            "svc-1",
            Some(CommissionConfig::Percentage(500)),
        );
        assert_eq!(resolved, Some(CommissionConfig::Percentage(1000)));
    }

    #[test]
    fn test_catalog_default_beats_professional_default() {
        let pro = professional(Some(CommissionConfig::Percentage(800)), &[]);

        let resolved = resolve(
            &pro,
            ItemKind::Service,
            "svc-1",
            Some(CommissionConfig::Percentage(500)),
        );
        assert_eq!(resolved, Some(CommissionConfig::Percentage(500)));
    }

    #[test]
    fn test_professional_default_is_last_resort() {
        let pro = professional(Some(CommissionConfig::Fixed(300)), &[]);

        let resolved = resolve(&pro, ItemKind::Service, "svc-1", None);
        assert_eq!(resolved, Some(CommissionConfig::Fixed(300)));
    }

    #[test]
    fn test_full_miss_returns_none() {
        let pro = professional(None, &[]);
        assert_eq!(resolve(&pro, ItemKind::Service, "svc-1", None), None);
    }

    #[test]
    fn test_service_override_does_not_leak_to_products() {
        let pro = professional(None, &[("item-1", CommissionConfig::Percentage(1000))]);

        // Same id, different kind: the service map must not answer.
        assert_eq!(resolve(&pro, ItemKind::Product, "item-1", None), None);
    }

    #[test]
    fn test_amount_for() {
        let base = Money::from_cents(20_000);
        assert_eq!(
            CommissionConfig::Percentage(1250).amount_for(base).cents(),
            2500
        );
        assert_eq!(CommissionConfig::Fixed(999).amount_for(base).cents(), 999);
    }

    #[test]
    fn test_serde_tagged_repr() {
        let json = serde_json::to_string(&CommissionConfig::Percentage(1250)).unwrap();
        assert_eq!(json, r#"{"type":"percentage","value":1250}"#);

        let back: CommissionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CommissionConfig::Percentage(1250));
    }
}
