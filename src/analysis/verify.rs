//! Breakdown verification.
//!
//! Company rows are assumed to add up to their group's total row. Nothing
//! else depends on that holding; this check reports where it does not.

use super::aggregator::sum_grand_total;
use super::classifier::ClassifiedTable;
use crate::models::{BreakdownMismatch, Category};

/// Default absolute tolerance when comparing sums.
pub const DEFAULT_TOLERANCE: f64 = 0.5;

/// Compare every total row against the sum of its company rows.
///
/// Groups without company rows are skipped. Each category column (`empty`
/// included) and `grand_total` is compared separately.
pub fn verify_breakdowns(table: &ClassifiedTable, tolerance: f64) -> Vec<BreakdownMismatch> {
    let mut mismatches = Vec::new();

    for group in table.groups() {
        let Some(total) = group.iter().find(|r| r.is_total()).map(|r| &r.record) else {
            continue;
        };
        let companies: Vec<_> = group
            .iter()
            .filter(|r| r.is_company())
            .map(|r| &r.record)
            .collect();
        if companies.is_empty() {
            continue;
        }

        let mut fields: Vec<(&str, f64, f64)> = Category::ALL
            .iter()
            .map(|&c| {
                let sum: f64 = companies.iter().map(|r| r.amount(c)).sum();
                (c.column(), total.amount(c), sum)
            })
            .collect();
        fields.push((
            "grand_total",
            total.grand_total,
            sum_grand_total(companies.iter().copied()),
        ));

        for (field, expected, actual) in fields {
            if (expected - actual).abs() > tolerance {
                mismatches.push(BreakdownMismatch {
                    country: total.country.clone(),
                    year: total.year,
                    field: field.to_string(),
                    expected,
                    actual,
                });
            }
        }
    }

    mismatches
}
