//! # Monthly Rollup Engine
//!
//! Combines sales, cost-of-goods, manual expenses and tiered admin
//! commissions into monthly and annual profit-and-loss summaries.
//!
//! ## The Two P&Ls
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │  SERVICE P&L                        PRODUCT P&L                        │
//! │  ───────────                        ───────────                       │
//! │  + service income (ratio-scaled)    + product sales (ratio-scaled)    │
//! │  − operating expenses*              − reinvestment (cost of goods)    │
//! │                                     − professional product commission │
//! │  = service subtotal                 = product subtotal                │
//! │  − admin commissions (service map)  − admin commissions (product map) │
//! │  = net service profit               = net product profit              │
//! │                                                                       │
//! │  * operating expenses = manual ledger total − product commission.    │
//! │    The ledger already contains professional payouts; the product     │
//! │    share is moved to the product P&L. The cross-subtraction is       │
//! │    intentional and preserved exactly.                                │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every figure is a pure recomputation from source records: running the
//! engine twice on identical inputs yields identical output, and annual
//! totals reconcile exactly with the field-wise sum of the 12 months.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use chrono::Datelike;
use tracing::warn;
use ts_rs::TS;

use crate::aggregate::{CommissionAggregator, RowKind};
use crate::allocation::{real_sale_amount, EngineSettings, PaymentRatio};
use crate::commission::CommissionConfig;
use crate::money::Money;
use crate::types::{
    AdminUser, Expense, ItemKind, MonthlyAdjustment, Product, Professional, Sale, Service,
};
use crate::MONTHS_PER_YEAR;

// =============================================================================
// Rollup Figures
// =============================================================================

/// The P&L figures of one period (a month, or the annual total).
///
/// Admin commission maps use `BTreeMap` so that serialization and
/// iteration order are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RollupFigures {
    /// Ratio-scaled service revenue.
    pub service_income_cents: i64,
    /// Ratio-scaled product revenue.
    pub product_sales_cents: i64,
    /// Cost of goods: Σ purchase cost × quantity over product lines.
    pub reinvestment_cents: i64,
    /// Professional commissions on product lines only.
    pub product_commission_cents: i64,
    /// Manual ledger total minus the product commission (see module doc).
    pub operating_expenses_cents: i64,
    pub service_subtotal_cents: i64,
    pub product_subtotal_cents: i64,
    /// Admin commissions charged against the service subtotal, by admin id.
    pub admin_service_commissions: BTreeMap<String, i64>,
    /// Admin commissions charged against the product subtotal, by admin id.
    pub admin_product_commissions: BTreeMap<String, i64>,
    pub net_service_profit_cents: i64,
    pub net_product_profit_cents: i64,
    /// (net service + net product) / total revenue × 100; 0 when there is
    /// no revenue.
    pub yield_pct: f64,
}

impl RollupFigures {
    /// Combined net profit of both P&Ls.
    pub fn net_profit_cents(&self) -> i64 {
        self.net_service_profit_cents + self.net_product_profit_cents
    }

    /// Combined revenue of both P&Ls.
    pub fn total_revenue_cents(&self) -> i64 {
        self.service_income_cents + self.product_sales_cents
    }

    /// Field-wise accumulation; admin maps merge by admin id.
    ///
    /// Yield is NOT accumulated (percentages don't sum) - callers
    /// recompute it via [`RollupFigures::recompute_yield`].
    fn accumulate(&mut self, other: &RollupFigures) {
        self.service_income_cents += other.service_income_cents;
        self.product_sales_cents += other.product_sales_cents;
        self.reinvestment_cents += other.reinvestment_cents;
        self.product_commission_cents += other.product_commission_cents;
        self.operating_expenses_cents += other.operating_expenses_cents;
        self.service_subtotal_cents += other.service_subtotal_cents;
        self.product_subtotal_cents += other.product_subtotal_cents;
        for (admin, cents) in &other.admin_service_commissions {
            *self.admin_service_commissions.entry(admin.clone()).or_insert(0) += cents;
        }
        for (admin, cents) in &other.admin_product_commissions {
            *self.admin_product_commissions.entry(admin.clone()).or_insert(0) += cents;
        }
        self.net_service_profit_cents += other.net_service_profit_cents;
        self.net_product_profit_cents += other.net_product_profit_cents;
    }

    fn recompute_yield(&mut self) {
        let revenue = self.total_revenue_cents();
        self.yield_pct = if revenue > 0 {
            self.net_profit_cents() as f64 / revenue as f64 * 100.0
        } else {
            0.0
        };
    }
}

/// One month's bucket. `month` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyRollup {
    pub month: u32,
    pub figures: RollupFigures,
}

/// The full-year summary: 12 fixed month buckets plus the annual total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AnnualRollup {
    pub year: i32,
    /// Always exactly 12 entries, January through December, including
    /// empty months.
    pub months: Vec<MonthlyRollup>,
    /// Field-wise sum of the 12 buckets, admin maps merged by id, yield
    /// recomputed from the summed figures.
    pub total: RollupFigures,
}

// =============================================================================
// Engine
// =============================================================================

/// Builds [`AnnualRollup`]s from raw records.
///
/// Product-line commissions come from the same [`CommissionAggregator`]
/// that powers the commission reports - one computation, consumed by
/// several presentation adapters, so the figures cannot drift apart.
#[derive(Debug)]
pub struct MonthlyRollupEngine<'a> {
    aggregator: CommissionAggregator<'a>,
    /// Admins sorted by id for deterministic commission iteration.
    admins: Vec<&'a AdminUser>,
    adjustments: HashMap<(i32, u32), &'a MonthlyAdjustment>,
}

/// Which P&L an admin commission is charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfitPool {
    Service,
    Product,
}

impl<'a> MonthlyRollupEngine<'a> {
    pub fn new(
        services: &'a [Service],
        products: &'a [Product],
        professionals: &'a [Professional],
        admins: &'a [AdminUser],
        adjustments: &'a [MonthlyAdjustment],
        settings: EngineSettings,
    ) -> Self {
        let mut sorted_admins: Vec<&AdminUser> = admins.iter().collect();
        sorted_admins.sort_by(|a, b| a.id.cmp(&b.id));

        MonthlyRollupEngine {
            aggregator: CommissionAggregator::new(services, products, professionals, settings),
            admins: sorted_admins,
            adjustments: adjustments.iter().map(|a| ((a.year, a.month), a)).collect(),
        }
    }

    /// Computes the 12 month buckets and the annual total for `year`.
    ///
    /// Sales and expenses outside the year are ignored; callers may pass
    /// the full dataset or a pre-filtered slice, the result is the same.
    pub fn annual(&self, year: i32, sales: &[Sale], expenses: &[Expense]) -> AnnualRollup {
        let mut months: Vec<RollupFigures> =
            (0..MONTHS_PER_YEAR).map(|_| RollupFigures::default()).collect();

        for sale in sales {
            if sale.created_at.year() != year {
                continue;
            }
            let bucket = &mut months[(sale.created_at.month() - 1) as usize];
            self.ingest_sale(sale, bucket);
        }

        let mut expense_totals = [0i64; MONTHS_PER_YEAR];
        for expense in expenses {
            if expense.date.year() != year {
                continue;
            }
            expense_totals[(expense.date.month() - 1) as usize] += expense.amount_cents;
        }

        let mut rollups = Vec::with_capacity(MONTHS_PER_YEAR);
        let mut total = RollupFigures::default();
        for (index, mut figures) in months.into_iter().enumerate() {
            let month = index as u32 + 1;
            self.finish_month(year, month, expense_totals[index], &mut figures);
            total.accumulate(&figures);
            rollups.push(MonthlyRollup { month, figures });
        }
        total.recompute_yield();

        AnnualRollup {
            year,
            months: rollups,
            total,
        }
    }

    /// Adds one sale's revenue, cost-of-goods and product commissions to a
    /// month bucket.
    fn ingest_sale(&self, sale: &Sale, bucket: &mut RollupFigures) {
        let ratio = PaymentRatio::for_sale(sale);

        for item in &sale.items {
            let recognised = ratio.apply(real_sale_amount(item));
            match item.kind {
                ItemKind::Service => bucket.service_income_cents += recognised.cents(),
                ItemKind::Product => {
                    bucket.product_sales_cents += recognised.cents();
                    match self.aggregator.catalog().product(&item.item_id) {
                        Some(product) => {
                            bucket.reinvestment_cents +=
                                product.purchase_cost().multiply_quantity(item.quantity).cents();
                        }
                        None => {
                            warn!(
                                sale_id = %sale.id,
                                product_id = %item.item_id,
                                "product line references unknown product, skipping cost of goods"
                            );
                        }
                    }
                }
            }
        }

        // Product commissions only exist for commission-eligible sales;
        // rows_for_sale already applies the eligibility predicate.
        bucket.product_commission_cents += self
            .aggregator
            .rows_for_sale(sale)
            .iter()
            .filter(|row| row.kind == RowKind::Product)
            .map(|row| row.commission_cents)
            .sum::<i64>();
    }

    /// Derives the dependent figures of one month once ingestion is done.
    fn finish_month(&self, year: i32, month: u32, expense_cents: i64, figures: &mut RollupFigures) {
        figures.operating_expenses_cents = expense_cents - figures.product_commission_cents;
        figures.service_subtotal_cents =
            figures.service_income_cents - figures.operating_expenses_cents;
        figures.product_subtotal_cents = figures.product_sales_cents
            - figures.reinvestment_cents
            - figures.product_commission_cents;

        let adjustment = self.adjustments.get(&(year, month)).copied();
        for admin in &self.admins {
            if let Some(cents) = self.admin_commission(
                admin,
                adjustment,
                ProfitPool::Service,
                Money::from_cents(figures.service_subtotal_cents),
            ) {
                figures.admin_service_commissions.insert(admin.id.clone(), cents);
            }
            if let Some(cents) = self.admin_commission(
                admin,
                adjustment,
                ProfitPool::Product,
                Money::from_cents(figures.product_subtotal_cents),
            ) {
                figures.admin_product_commissions.insert(admin.id.clone(), cents);
            }
        }

        figures.net_service_profit_cents = figures.service_subtotal_cents
            - figures.admin_service_commissions.values().sum::<i64>();
        figures.net_product_profit_cents = figures.product_subtotal_cents
            - figures.admin_product_commissions.values().sum::<i64>();
        figures.recompute_yield();
    }

    /// One admin's commission against one profit subtotal, or `None` when
    /// the resolved amount is not positive (losses never charge admins).
    ///
    /// The monthly override map for the pool wins over the admin default;
    /// an absent key falls back - absence in one pool does not affect the
    /// other.
    fn admin_commission(
        &self,
        admin: &AdminUser,
        adjustment: Option<&MonthlyAdjustment>,
        pool: ProfitPool,
        subtotal: Money,
    ) -> Option<i64> {
        let override_config = adjustment.and_then(|adj| {
            let map = match pool {
                ProfitPool::Service => &adj.service_overrides,
                ProfitPool::Product => &adj.product_overrides,
            };
            map.get(&admin.id).copied()
        });

        let config = override_config.or(admin.commission)?;
        let amount = match config {
            CommissionConfig::Fixed(cents) => cents,
            CommissionConfig::Percentage(_) => config.amount_for(subtotal).cents(),
        };
        (amount > 0).then_some(amount)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, PaymentStatus, SaleItem};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap as StdHashMap;

    fn service(id: &str, commission: Option<CommissionConfig>) -> Service {
        Service {
            id: id.to_string(),
            name: id.to_string(),
            price_cents: 10_000,
            default_commission: commission,
            is_active: true,
        }
    }

    fn product(id: &str, cost: i64, commission: Option<CommissionConfig>) -> Product {
        Product {
            id: id.to_string(),
            name: id.to_string(),
            price_cents: 5_000,
            purchase_cost_cents: cost,
            default_commission: commission,
            current_stock: 50,
            is_active: true,
        }
    }

    fn professional(id: &str) -> Professional {
        Professional {
            id: id.to_string(),
            name: id.to_string(),
            is_active: true,
            default_commission: None,
            service_overrides: StdHashMap::new(),
            product_overrides: StdHashMap::new(),
        }
    }

    fn admin(id: &str, commission: Option<CommissionConfig>) -> AdminUser {
        AdminUser {
            id: id.to_string(),
            name: id.to_string(),
            role: crate::types::AdminRole::Owner,
            commission,
        }
    }

    fn line(item_id: &str, kind: ItemKind, subtotal: i64, qty: i64, pro: &str) -> SaleItem {
        SaleItem {
            item_id: item_id.to_string(),
            kind,
            name_snapshot: item_id.to_string(),
            quantity: qty,
            unit_price_cents: subtotal / qty.max(1),
            subtotal_cents: subtotal,
            discount_cents: 0,
            professional_id: Some(pro.to_string()),
        }
    }

    fn sale_in_month(month: u32, status: PaymentStatus, paid: Option<i64>, items: Vec<SaleItem>) -> Sale {
        let total = items.iter().map(|i| i.subtotal_cents - i.discount_cents).sum();
        Sale {
            id: format!("sale-{month}"),
            location_id: "loc-1".to_string(),
            client_id: None,
            reservation_id: None,
            payment_method: PaymentMethod::Card,
            payment_status: status,
            total_cents: total,
            amount_paid_cents: paid,
            tip_cents: 0,
            discount_cents: 0,
            items,
            created_at: Utc.with_ymd_and_hms(2026, month, 10, 12, 0, 0).unwrap(),
        }
    }

    fn expense_in_month(month: u32, cents: i64) -> Expense {
        Expense {
            id: format!("exp-{month}"),
            date: Utc.with_ymd_and_hms(2026, month, 5, 9, 0, 0).unwrap(),
            amount_cents: cents,
            concept: "rent".to_string(),
            recipient: "landlord".to_string(),
            location_id: "loc-1".to_string(),
        }
    }

    struct Fixture {
        services: Vec<Service>,
        products: Vec<Product>,
        professionals: Vec<Professional>,
        admins: Vec<AdminUser>,
        adjustments: Vec<MonthlyAdjustment>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                services: vec![service("svc-1", Some(CommissionConfig::Percentage(1000)))],
                products: vec![product("prd-1", 1_000, Some(CommissionConfig::Percentage(500)))],
                professionals: vec![professional("pro-a")],
                admins: vec![],
                adjustments: vec![],
            }
        }

        fn engine(&self) -> MonthlyRollupEngine<'_> {
            MonthlyRollupEngine::new(
                &self.services,
                &self.products,
                &self.professionals,
                &self.admins,
                &self.adjustments,
                EngineSettings::default(),
            )
        }
    }

    #[test]
    fn test_always_twelve_buckets() {
        let fixture = Fixture::new();
        let rollup = fixture.engine().annual(2026, &[], &[]);

        assert_eq!(rollup.months.len(), 12);
        assert_eq!(rollup.months[0].month, 1);
        assert_eq!(rollup.months[11].month, 12);
        assert_eq!(rollup.total, RollupFigures::default());
    }

    #[test]
    fn test_deposit_sale_recognises_ratio_scaled_revenue_only() {
        // Sale{total 200.00, paid 100.00, one service line, DepositPaid}:
        // no commission rows, 100.00 of service income.
        let fixture = Fixture::new();
        let sales = vec![sale_in_month(
            3,
            PaymentStatus::DepositPaid,
            Some(10_000),
            vec![line("svc-1", ItemKind::Service, 20_000, 1, "pro-a")],
        )];

        let rollup = fixture.engine().annual(2026, &sales, &[]);
        let march = &rollup.months[2].figures;

        assert_eq!(march.service_income_cents, 10_000);
        assert_eq!(march.product_commission_cents, 0);
    }

    #[test]
    fn test_product_lines_feed_reinvestment_and_commission() {
        let fixture = Fixture::new();
        let sales = vec![sale_in_month(
            5,
            PaymentStatus::Paid,
            None,
            vec![line("prd-1", ItemKind::Product, 6_000, 3, "pro-a")],
        )];

        let rollup = fixture.engine().annual(2026, &sales, &[]);
        let may = &rollup.months[4].figures;

        assert_eq!(may.product_sales_cents, 6_000);
        assert_eq!(may.reinvestment_cents, 3_000); // 1000 × 3
        assert_eq!(may.product_commission_cents, 300); // 5% of 6000
        assert_eq!(may.product_subtotal_cents, 6_000 - 3_000 - 300);
    }

    #[test]
    fn test_expense_cross_subtraction() {
        // Ledger total 500.00 includes the 3.00 product payout; the
        // service P&L must only carry 497.00.
        let fixture = Fixture::new();
        let sales = vec![sale_in_month(
            5,
            PaymentStatus::Paid,
            None,
            vec![
                line("svc-1", ItemKind::Service, 100_000, 1, "pro-a"),
                line("prd-1", ItemKind::Product, 6_000, 3, "pro-a"),
            ],
        )];
        let expenses = vec![expense_in_month(5, 50_000)];

        let rollup = fixture.engine().annual(2026, &sales, &expenses);
        let may = &rollup.months[4].figures;

        assert_eq!(may.product_commission_cents, 300);
        assert_eq!(may.operating_expenses_cents, 50_000 - 300);
        assert_eq!(may.service_subtotal_cents, 100_000 - (50_000 - 300));
    }

    #[test]
    fn test_admin_default_and_monthly_override() {
        let mut fixture = Fixture::new();
        fixture.admins = vec![admin("adm-1", Some(CommissionConfig::Percentage(2_000)))];
        fixture.adjustments = vec![MonthlyAdjustment {
            year: 2026,
            month: 6,
            service_overrides: [("adm-1".to_string(), CommissionConfig::Percentage(1_000))]
                .into_iter()
                .collect(),
            product_overrides: StdHashMap::new(),
        }];

        let sales = vec![
            sale_in_month(5, PaymentStatus::Paid, None, vec![line("svc-1", ItemKind::Service, 100_000, 1, "pro-a")]),
            sale_in_month(6, PaymentStatus::Paid, None, vec![line("svc-1", ItemKind::Service, 100_000, 1, "pro-a")]),
        ];

        let rollup = fixture.engine().annual(2026, &sales, &[]);

        // May: default 20% of the service subtotal.
        let may = &rollup.months[4].figures;
        assert_eq!(may.admin_service_commissions.get("adm-1"), Some(&20_000));
        assert_eq!(may.net_service_profit_cents, 80_000);

        // June: overridden to 10% on the service pool only; the product
        // map was untouched so the (empty) product pool still uses the
        // default - which yields nothing on a zero subtotal.
        let june = &rollup.months[5].figures;
        assert_eq!(june.admin_service_commissions.get("adm-1"), Some(&10_000));
        assert!(june.admin_product_commissions.is_empty());
    }

    #[test]
    fn test_fixed_admin_commission_only_when_positive() {
        let mut fixture = Fixture::new();
        fixture.admins = vec![
            admin("adm-1", Some(CommissionConfig::Fixed(5_000))),
            admin("adm-2", Some(CommissionConfig::Percentage(1_000))),
        ];

        // No sales: service subtotal is 0, so the percentage admin gets
        // nothing while the fixed admin is still owed their flat amount.
        let rollup = fixture.engine().annual(2026, &[], &[]);
        let january = &rollup.months[0].figures;

        assert_eq!(january.admin_service_commissions.get("adm-1"), Some(&5_000));
        assert_eq!(january.admin_service_commissions.get("adm-2"), None);
    }

    #[test]
    fn test_annual_reconciles_with_month_sum() {
        let mut fixture = Fixture::new();
        fixture.admins = vec![admin("adm-1", Some(CommissionConfig::Percentage(1_500)))];

        let sales = vec![
            sale_in_month(1, PaymentStatus::Paid, None, vec![line("svc-1", ItemKind::Service, 80_000, 1, "pro-a")]),
            sale_in_month(2, PaymentStatus::DepositPaid, Some(30_000), vec![line("svc-1", ItemKind::Service, 60_000, 1, "pro-a")]),
            sale_in_month(7, PaymentStatus::Paid, None, vec![line("prd-1", ItemKind::Product, 10_000, 5, "pro-a")]),
        ];
        let expenses = vec![expense_in_month(1, 20_000), expense_in_month(7, 5_000)];

        let rollup = fixture.engine().annual(2026, &sales, &expenses);

        let mut summed = RollupFigures::default();
        for month in &rollup.months {
            summed.accumulate(&month.figures);
        }
        summed.recompute_yield();

        assert_eq!(rollup.total, summed);
    }

    #[test]
    fn test_determinism() {
        let mut fixture = Fixture::new();
        fixture.admins = vec![admin("adm-2", None), admin("adm-1", Some(CommissionConfig::Percentage(500)))];

        let sales = vec![
            sale_in_month(4, PaymentStatus::Paid, None, vec![
                line("svc-1", ItemKind::Service, 45_000, 1, "pro-a"),
                line("prd-1", ItemKind::Product, 4_000, 2, "pro-a"),
            ]),
        ];
        let expenses = vec![expense_in_month(4, 12_000)];

        let engine = fixture.engine();
        let first = engine.annual(2026, &sales, &expenses);
        let second = engine.annual(2026, &sales, &expenses);

        assert_eq!(first, second);
    }

    #[test]
    fn test_yield_pct() {
        let fixture = Fixture::new();
        let sales = vec![sale_in_month(
            9,
            PaymentStatus::Paid,
            None,
            vec![line("svc-1", ItemKind::Service, 100_000, 1, "pro-a")],
        )];
        let expenses = vec![expense_in_month(9, 40_000)];

        let rollup = fixture.engine().annual(2026, &sales, &expenses);
        let september = &rollup.months[8].figures;

        // net 60_000 over revenue 100_000 → 60%
        assert!((september.yield_pct - 60.0).abs() < 1e-9);

        // Empty month: no revenue, yield 0 (never a division by zero).
        assert_eq!(rollup.months[0].figures.yield_pct, 0.0);
    }

    #[test]
    fn test_other_years_are_ignored() {
        let fixture = Fixture::new();
        let sales = vec![sale_in_month(3, PaymentStatus::Paid, None, vec![
            line("svc-1", ItemKind::Service, 10_000, 1, "pro-a"),
        ])];

        let rollup = fixture.engine().annual(2025, &sales, &[]);
        assert_eq!(rollup.total, RollupFigures::default());
    }
}
