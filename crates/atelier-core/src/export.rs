//! # Export Adapters
//!
//! Thin presentation adapters over the engines' output: fixed-column rows
//! for tabular display, spreadsheet export and dashboard CSV. The file
//! writing itself happens outside this workspace; these functions only
//! shape the data.
//!
//! Column orders are part of the external contract and must not change:
//! downstream spreadsheets import by position.

use crate::aggregate::ProfessionalSummary;
use crate::rollup::{AnnualRollup, RollupFigures};

/// Header for the per-professional commission table.
pub const PROFESSIONAL_SUMMARY_HEADER: [&str; 4] =
    ["Professional", "Period", "TotalSales", "TotalCommission"];

/// Header for the monthly rollup CSV.
pub const MONTHLY_ROLLUP_HEADER: [&str; 10] = [
    "Month",
    "ServiceIncome",
    "ProductSales",
    "Reinvestment",
    "ProductCommission",
    "OperatingExpenses",
    "ServiceProfit",
    "ProductProfit",
    "NetProfit",
    "Yield%",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Formats cents as a plain decimal string ("1234.56") for CSV cells.
///
/// No currency symbol and no thousands separators - spreadsheet importers
/// parse the raw number; display formatting is the UI's concern.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, (cents / 100).abs(), (cents % 100).abs())
}

// =============================================================================
// Professional Summary Rows
// =============================================================================

/// Rows for the per-professional commission table, one per summary, in
/// the summaries' (already sorted) order.
pub fn professional_summary_rows(
    summaries: &[ProfessionalSummary],
    period: &str,
) -> Vec<[String; 4]> {
    summaries
        .iter()
        .map(|summary| {
            [
                summary.name.clone(),
                period.to_string(),
                format_cents(summary.total_sales_cents),
                format_cents(summary.total_commission_cents),
            ]
        })
        .collect()
}

// =============================================================================
// Monthly Rollup Rows
// =============================================================================

fn figures_row(label: &str, figures: &RollupFigures) -> [String; 10] {
    [
        label.to_string(),
        format_cents(figures.service_income_cents),
        format_cents(figures.product_sales_cents),
        format_cents(figures.reinvestment_cents),
        format_cents(figures.product_commission_cents),
        format_cents(figures.operating_expenses_cents),
        format_cents(figures.net_service_profit_cents),
        format_cents(figures.net_product_profit_cents),
        format_cents(figures.net_profit_cents()),
        format!("{:.2}", figures.yield_pct),
    ]
}

/// Rows for the monthly dashboard/CSV: twelve month rows followed by the
/// annual `Total` row.
pub fn monthly_rollup_rows(rollup: &AnnualRollup) -> Vec<[String; 10]> {
    let mut rows: Vec<[String; 10]> = rollup
        .months
        .iter()
        .map(|month| figures_row(MONTH_NAMES[(month.month - 1) as usize], &month.figures))
        .collect();
    rows.push(figures_row("Total", &rollup.total));
    rows
}

/// Renders the rollup as CSV text, header included.
pub fn monthly_rollup_csv(rollup: &AnnualRollup) -> String {
    let mut out = String::new();
    out.push_str(&MONTHLY_ROLLUP_HEADER.join(","));
    out.push('\n');
    for row in monthly_rollup_rows(rollup) {
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollup::MonthlyRollup;

    fn figures(income: i64) -> RollupFigures {
        RollupFigures {
            service_income_cents: income,
            service_subtotal_cents: income,
            net_service_profit_cents: income,
            yield_pct: if income > 0 { 100.0 } else { 0.0 },
            ..RollupFigures::default()
        }
    }

    fn rollup() -> AnnualRollup {
        let months = (1..=12)
            .map(|month| MonthlyRollup {
                month,
                figures: figures(if month == 3 { 150_00 } else { 0 }),
            })
            .collect();
        AnnualRollup {
            year: 2026,
            months,
            total: figures(150_00),
        }
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(123_456), "1234.56");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-2_050), "-20.50");
        assert_eq!(format_cents(0), "0.00");
    }

    #[test]
    fn test_professional_rows_follow_column_order() {
        let summaries = vec![ProfessionalSummary {
            professional_id: "pro-a".to_string(),
            name: "Alex".to_string(),
            total_sales_cents: 120_000,
            total_commission_cents: 18_000,
            detail: vec![],
        }];

        let rows = professional_summary_rows(&summaries, "2026-03");
        assert_eq!(
            rows[0],
            [
                "Alex".to_string(),
                "2026-03".to_string(),
                "1200.00".to_string(),
                "180.00".to_string(),
            ]
        );
    }

    #[test]
    fn test_rollup_rows_have_thirteen_entries() {
        let rows = monthly_rollup_rows(&rollup());
        assert_eq!(rows.len(), 13);
        assert_eq!(rows[0][0], "January");
        assert_eq!(rows[2][1], "150.00");
        assert_eq!(rows[12][0], "Total");
    }

    #[test]
    fn test_csv_shape() {
        let csv = monthly_rollup_csv(&rollup());
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Month,ServiceIncome,ProductSales,Reinvestment,ProductCommission,\
             OperatingExpenses,ServiceProfit,ProductProfit,NetProfit,Yield%"
        );
        assert_eq!(lines.count(), 13);
    }
}
