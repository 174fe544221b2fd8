//! # Commission Aggregator
//!
//! Turns commission-eligible sales into derived commission rows and reduces
//! them into per-professional and per-category summaries.
//!
//! ## Data Flow
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │   pre-filtered sales                                                   │
//! │        │                                                               │
//! │        ▼                                                               │
//! │   eligibility check (allocation) ── ineligible ──► no rows            │
//! │        │ eligible                                                      │
//! │        ▼                                                               │
//! │   per line: resolve cascade (commission) ── miss ──► unassigned       │
//! │        │ hit                                                           │
//! │        ▼                                                               │
//! │   CommissionRow { amount, rate } ──► summaries, category totals       │
//! │        +                                                               │
//! │   tip row for the top-subtotal professional of the sale               │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The aggregator is filter-agnostic: callers pre-filter the sale list by
//! date range, location or professional before invocation. Derived rows are
//! never persisted; identical inputs always reproduce identical rows.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;
use ts_rs::TS;

use crate::allocation::{commission_base, is_commission_eligible, EngineSettings};
use crate::commission::{resolve, CommissionConfig};
use crate::money::{Money, Rate};
use crate::types::{ItemKind, Product, Professional, Sale, Service};

// =============================================================================
// Catalog Index
// =============================================================================

/// Id-indexed view over the service and product slices.
///
/// Built once per report; lookups never allocate.
#[derive(Debug)]
pub struct Catalog<'a> {
    services: HashMap<&'a str, &'a Service>,
    products: HashMap<&'a str, &'a Product>,
}

impl<'a> Catalog<'a> {
    pub fn new(services: &'a [Service], products: &'a [Product]) -> Self {
        Catalog {
            services: services.iter().map(|s| (s.id.as_str(), s)).collect(),
            products: products.iter().map(|p| (p.id.as_str(), p)).collect(),
        }
    }

    /// Whether the catalog knows this entry.
    pub fn contains(&self, kind: ItemKind, item_id: &str) -> bool {
        match kind {
            ItemKind::Service => self.services.contains_key(item_id),
            ItemKind::Product => self.products.contains_key(item_id),
        }
    }

    /// The entry's own default commission, when it has one.
    pub fn default_commission(&self, kind: ItemKind, item_id: &str) -> Option<CommissionConfig> {
        match kind {
            ItemKind::Service => self.services.get(item_id).and_then(|s| s.default_commission),
            ItemKind::Product => self.products.get(item_id).and_then(|p| p.default_commission),
        }
    }

    /// Product lookup for cost-of-goods figures.
    pub fn product(&self, product_id: &str) -> Option<&'a Product> {
        self.products.get(product_id).copied()
    }
}

// =============================================================================
// Commission Row
// =============================================================================

/// Category a commission row belongs to. Mirrors [`ItemKind`] plus the
/// tip bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Service,
    Product,
    Tip,
}

impl From<ItemKind> for RowKind {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Service => RowKind::Service,
            ItemKind::Product => RowKind::Product,
        }
    }
}

/// One derived commission line. Ephemeral: recomputed on every query,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommissionRow {
    pub professional_id: String,
    pub client_id: Option<String>,
    pub item_name: String,
    pub kind: RowKind,
    /// The real collected line amount (subtotal − discount).
    pub sale_amount_cents: i64,
    pub commission_cents: i64,
    /// Rate in basis points for percentage configs; `None` for fixed.
    pub commission_bps: Option<u32>,
    pub discount_cents: i64,
}

/// Output of one aggregation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommissionReport {
    /// Rows in sale order, items before the sale's tip row.
    pub rows: Vec<CommissionRow>,
    /// Base amounts of lines that produced no row because no config
    /// resolved or no professional was assigned.
    pub unassigned_cents: i64,
}

// =============================================================================
// Per-professional and per-category reductions
// =============================================================================

/// Commission summary for one professional over the filtered period.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfessionalSummary {
    pub professional_id: String,
    pub name: String,
    pub total_sales_cents: i64,
    pub total_commission_cents: i64,
    pub detail: Vec<CommissionRow>,
}

/// Category totals for KPI cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryTotals {
    pub service_cents: i64,
    pub product_cents: i64,
    pub tip_cents: i64,
    pub unassigned_cents: i64,
}

// =============================================================================
// Aggregator
// =============================================================================

/// Builds commission rows and summaries from pre-filtered sales.
#[derive(Debug)]
pub struct CommissionAggregator<'a> {
    catalog: Catalog<'a>,
    staff: HashMap<&'a str, &'a Professional>,
    settings: EngineSettings,
}

impl<'a> CommissionAggregator<'a> {
    pub fn new(
        services: &'a [Service],
        products: &'a [Product],
        professionals: &'a [Professional],
        settings: EngineSettings,
    ) -> Self {
        CommissionAggregator {
            catalog: Catalog::new(services, products),
            staff: professionals.iter().map(|p| (p.id.as_str(), p)).collect(),
            settings,
        }
    }

    /// The catalog index, shared with the rollup engine for cost-of-goods
    /// lookups.
    pub fn catalog(&self) -> &Catalog<'a> {
        &self.catalog
    }

    /// Aggregates every sale in the slice.
    pub fn report(&self, sales: &[Sale]) -> CommissionReport {
        let mut report = CommissionReport::default();
        for sale in sales {
            self.collect_sale(sale, &mut report);
        }
        report
    }

    /// Rows for a single sale (empty when the sale is not
    /// commission-eligible).
    pub fn rows_for_sale(&self, sale: &Sale) -> Vec<CommissionRow> {
        let mut report = CommissionReport::default();
        self.collect_sale(sale, &mut report);
        report.rows
    }

    fn collect_sale(&self, sale: &Sale, report: &mut CommissionReport) {
        if !is_commission_eligible(sale) {
            return;
        }

        for item in &sale.items {
            let base = commission_base(item, &self.settings);

            let professional_id = match &item.professional_id {
                Some(id) => id.as_str(),
                None => {
                    report.unassigned_cents += base.cents();
                    continue;
                }
            };

            let professional = match self.staff.get(professional_id) {
                Some(p) => *p,
                None => {
                    warn!(
                        sale_id = %sale.id,
                        professional_id = %professional_id,
                        "sale line references unknown professional, skipping"
                    );
                    continue;
                }
            };

            if !self.catalog.contains(item.kind, &item.item_id) {
                warn!(
                    sale_id = %sale.id,
                    item_id = %item.item_id,
                    "sale line references unknown catalog entry, skipping"
                );
                continue;
            }

            let catalog_default = self.catalog.default_commission(item.kind, &item.item_id);
            let config = match resolve(professional, item.kind, &item.item_id, catalog_default) {
                Some(config) => config,
                None => {
                    // Resolution miss: a configuration choice, not an error.
                    report.unassigned_cents += base.cents();
                    continue;
                }
            };

            report.rows.push(CommissionRow {
                professional_id: professional.id.clone(),
                client_id: sale.client_id.clone(),
                item_name: item.name_snapshot.clone(),
                kind: item.kind.into(),
                sale_amount_cents: crate::allocation::real_sale_amount(item).cents(),
                commission_cents: config.amount_for(base).cents(),
                commission_bps: config.bps(),
                discount_cents: item.discount_cents,
            });
        }

        if sale.tip_cents > 0 {
            if let Some(row) = self.tip_row(sale) {
                report.rows.push(row);
            }
        }
    }

    /// Attributes the whole tip to the professional with the highest
    /// cumulative item subtotal in the sale.
    ///
    /// Tie-break: lowest professional id. The rule is explicit so that the
    /// same sale always produces the same row regardless of item order or
    /// map traversal.
    fn tip_row(&self, sale: &Sale) -> Option<CommissionRow> {
        let mut subtotals: BTreeMap<&str, i64> = BTreeMap::new();
        for item in &sale.items {
            if let Some(id) = &item.professional_id {
                *subtotals.entry(id.as_str()).or_insert(0) += item.subtotal_cents;
            }
        }

        // BTreeMap iterates in ascending id order, so `>` keeps the
        // lowest id on ties.
        let mut best: Option<(&str, i64)> = None;
        for (id, subtotal) in &subtotals {
            match best {
                Some((_, top)) if *subtotal <= top => {}
                _ => best = Some((*id, *subtotal)),
            }
        }
        let (professional_id, _) = best?;

        let professional = match self.staff.get(professional_id) {
            Some(p) => *p,
            None => {
                warn!(
                    sale_id = %sale.id,
                    professional_id = %professional_id,
                    "tip attribution target is unknown, dropping tip row"
                );
                return None;
            }
        };

        Some(CommissionRow {
            professional_id: professional.id.clone(),
            client_id: sale.client_id.clone(),
            item_name: "Tip".to_string(),
            kind: RowKind::Tip,
            sale_amount_cents: sale.tip_cents,
            commission_cents: sale.tip_cents,
            commission_bps: Some(Rate::full().bps()),
            discount_cents: 0,
        })
    }

    /// Reduces rows into per-professional summaries, sorted by
    /// professional id.
    pub fn professional_summaries(&self, rows: &[CommissionRow]) -> Vec<ProfessionalSummary> {
        let mut grouped: BTreeMap<&str, ProfessionalSummary> = BTreeMap::new();

        for row in rows {
            let entry = grouped
                .entry(row.professional_id.as_str())
                .or_insert_with(|| ProfessionalSummary {
                    professional_id: row.professional_id.clone(),
                    name: self
                        .staff
                        .get(row.professional_id.as_str())
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| row.professional_id.clone()),
                    total_sales_cents: 0,
                    total_commission_cents: 0,
                    detail: Vec::new(),
                });
            entry.total_sales_cents += row.sale_amount_cents;
            entry.total_commission_cents += row.commission_cents;
            entry.detail.push(row.clone());
        }

        grouped.into_values().collect()
    }
}

/// Reduces a report into the KPI category totals.
pub fn category_totals(report: &CommissionReport) -> CategoryTotals {
    let mut totals = CategoryTotals {
        unassigned_cents: report.unassigned_cents,
        ..CategoryTotals::default()
    };
    for row in &report.rows {
        match row.kind {
            RowKind::Service => totals.service_cents += row.commission_cents,
            RowKind::Product => totals.product_cents += row.commission_cents,
            RowKind::Tip => totals.tip_cents += row.commission_cents,
        }
    }
    totals
}

/// Sum of commission amounts over a row slice.
pub fn total_commission(rows: &[CommissionRow]) -> Money {
    Money::from_cents(rows.iter().map(|r| r.commission_cents).sum())
}

// =============================================================================
// Unit Tests
// =============================================================================
