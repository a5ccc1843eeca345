//! Total/company row classification.
//!
//! Rows are grouped by `(country, year)` after a stable sort, so the
//! relative order within a group is the file order. Under the positional
//! rule the first row of each group is the total row; under the flag-column
//! rule the `row_kind` column decides.

use crate::data::Record;
use crate::error::{DashboardError, DashboardResult};
use crate::models::{AnomalyKind, GroupAnomaly, RowKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use tracing::{debug, warn};

/// Rule used to tell total rows from company rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationRule {
    /// First row of each group is the total.
    Positional,
    /// The `row_kind` column marks each row.
    FlagColumn,
}

impl fmt::Display for ClassificationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationRule::Positional => write!(f, "positional"),
            ClassificationRule::FlagColumn => write!(f, "flag-column"),
        }
    }
}

/// Configured rule choice, resolved against the loaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleSetting {
    /// Flag column when the table has one, positional otherwise.
    #[default]
    Auto,
    Positional,
    FlagColumn,
}

impl RuleSetting {
    /// Pick the concrete rule for a table.
    pub fn resolve(self, has_row_kind: bool) -> DashboardResult<ClassificationRule> {
        match self {
            RuleSetting::Auto if has_row_kind => Ok(ClassificationRule::FlagColumn),
            RuleSetting::Auto | RuleSetting::Positional => Ok(ClassificationRule::Positional),
            RuleSetting::FlagColumn if has_row_kind => Ok(ClassificationRule::FlagColumn),
            RuleSetting::FlagColumn => Err(DashboardError::Schema {
                missing: vec![crate::data::record::ROW_KIND_COLUMN.to_string()],
            }),
        }
    }
}

/// A record tagged with its role.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub record: Record,
    pub kind: RowKind,
}

impl ClassifiedRecord {
    pub fn is_total(&self) -> bool {
        self.kind == RowKind::Total
    }

    pub fn is_company(&self) -> bool {
        self.kind == RowKind::Company
    }
}

/// The immutable, classified source table.
///
/// Rows are sorted by `(country, year)` with file order kept inside groups.
#[derive(Debug, Clone)]
pub struct ClassifiedTable {
    rows: Vec<ClassifiedRecord>,
    groups: Vec<Range<usize>>,
    rule: ClassificationRule,
}

impl ClassifiedTable {
    /// Total rows only.
    pub fn totals(&self) -> impl Iterator<Item = &Record> + '_ {
        self.rows
            .iter()
            .filter(|r| r.is_total())
            .map(|r| &r.record)
    }

    /// Company rows only.
    pub fn companies(&self) -> impl Iterator<Item = &Record> + '_ {
        self.rows
            .iter()
            .filter(|r| r.is_company())
            .map(|r| &r.record)
    }

    /// Rows of each `(country, year)` group.
    pub fn groups(&self) -> impl Iterator<Item = &[ClassifiedRecord]> + '_ {
        self.groups.iter().map(move |range| &self.rows[range.clone()])
    }

    pub fn rule(&self) -> ClassificationRule {
        self.rule
    }

    /// Number of rows, both kinds.
    pub fn record_count(&self) -> usize {
        self.rows.len()
    }

    pub fn total_count(&self) -> usize {
        self.totals().count()
    }

    pub fn company_count(&self) -> usize {
        self.companies().count()
    }
}

/// Result of classifying a table.
#[derive(Debug, Clone)]
pub struct Classification {
    pub table: ClassifiedTable,
    /// Groups without a plausible total row.
    pub anomalies: Vec<GroupAnomaly>,
}

impl Classification {
    /// Fail when any group was flagged.
    pub fn ensure_plausible(&self) -> DashboardResult<()> {
        if self.anomalies.is_empty() {
            Ok(())
        } else {
            Err(DashboardError::ImplausibleGroups {
                count: self.anomalies.len(),
            })
        }
    }
}

/// Classify records into total and company rows.
pub fn classify(mut records: Vec<Record>, rule: ClassificationRule) -> Classification {
    // sort_by is stable: file order survives within a group
    records.sort_by(|a, b| {
        a.country
            .cmp(&b.country)
            .then_with(|| a.year.cmp(&b.year))
    });

    let groups = group_ranges(&records);
    let mut rows = Vec::with_capacity(records.len());
    let mut anomalies = Vec::new();

    let mut records = records.into_iter();
    for range in &groups {
        let group: Vec<Record> = records.by_ref().take(range.len()).collect();
        let kinds = match rule {
            ClassificationRule::Positional => positional_kinds(group.len()),
            ClassificationRule::FlagColumn => flagged_kinds(&group),
        };

        anomalies.extend(check_group(&group, &kinds, rule));

        rows.extend(
            group
                .into_iter()
                .zip(kinds)
                .map(|(record, kind)| ClassifiedRecord { record, kind }),
        );
    }

    for anomaly in &anomalies {
        warn!("Implausible group {}", anomaly);
    }
    debug!(
        "Classified {} rows into {} groups using {} rule",
        rows.len(),
        groups.len(),
        rule
    );

    Classification {
        table: ClassifiedTable { rows, groups, rule },
        anomalies,
    }
}

/// Contiguous index ranges of equal `(country, year)` in sorted records.
fn group_ranges(records: &[Record]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;

    for i in 1..=records.len() {
        if i == records.len() || records[i].group_key() != records[start].group_key() {
            ranges.push(start..i);
            start = i;
        }
    }

    ranges
}

fn positional_kinds(len: usize) -> Vec<RowKind> {
    (0..len)
        .map(|i| if i == 0 { RowKind::Total } else { RowKind::Company })
        .collect()
}

fn flagged_kinds(group: &[Record]) -> Vec<RowKind> {
    group
        .iter()
        .map(|r| r.row_kind.unwrap_or(RowKind::Company))
        .collect()
}

/// Flag a group whose total row is missing, duplicated or implausible.
fn check_group(group: &[Record], kinds: &[RowKind], rule: ClassificationRule) -> Vec<GroupAnomaly> {
    let Some(first) = group.first() else {
        return Vec::new();
    };
    let anomaly = |kind| GroupAnomaly {
        country: first.country.clone(),
        year: first.year,
        kind,
    };

    let totals: Vec<&Record> = group
        .iter()
        .zip(kinds)
        .filter(|(_, k)| **k == RowKind::Total)
        .map(|(r, _)| r)
        .collect();

    let mut found = Vec::new();

    match totals.len() {
        0 => {
            found.push(anomaly(AnomalyKind::MissingTotal));
            return found;
        }
        1 => {}
        count => found.push(anomaly(AnomalyKind::MultipleTotals { count })),
    }

    let total = totals[0];

    if rule == ClassificationRule::Positional
        && group.len() > 1
        && !total.has_placeholder_company()
    {
        found.push(anomaly(AnomalyKind::NamedTotalRow {
            parent_company: total.parent_company.clone().unwrap_or_default(),
        }));
    }

    for (record, kind) in group.iter().zip(kinds) {
        if *kind == RowKind::Company && record.grand_total > total.grand_total {
            found.push(anomaly(AnomalyKind::TotalBelowCompany {
                parent_company: record.parent_company.clone().unwrap_or_default(),
                total: total.grand_total,
                company_total: record.grand_total,
            }));
        }
    }

    found
}
