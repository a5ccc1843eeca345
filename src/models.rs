//! Data models for the cleanup dashboard.
//!
//! This module contains the query parameters and the data products the
//! aggregator hands to the report layer. None of them carry formatting
//! or styling; the report generator decides how they look.

use crate::report::format::format_number;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Material category counted during a cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Empty or unclassifiable items.
    Empty,
    Hdpe,
    Ldpe,
    /// Other plastics.
    O,
    Pet,
    Pp,
    Ps,
    Pvc,
}

impl Category {
    /// The seven plastic categories charted in compositions and trends.
    pub const PLASTICS: [Category; 7] = [
        Category::Hdpe,
        Category::Ldpe,
        Category::O,
        Category::Pet,
        Category::Pp,
        Category::Ps,
        Category::Pvc,
    ];

    /// Every counted category, `empty` included.
    pub const ALL: [Category; 8] = [
        Category::Empty,
        Category::Hdpe,
        Category::Ldpe,
        Category::O,
        Category::Pet,
        Category::Pp,
        Category::Ps,
        Category::Pvc,
    ];

    pub const RECYCLABLE: [Category; 4] =
        [Category::Hdpe, Category::Ldpe, Category::Pet, Category::Pp];

    pub const NON_RECYCLABLE: [Category; 3] = [Category::Ps, Category::Pvc, Category::O];

    /// Column name in the source table.
    pub fn column(&self) -> &'static str {
        match self {
            Category::Empty => "empty",
            Category::Hdpe => "hdpe",
            Category::Ldpe => "ldpe",
            Category::O => "o",
            Category::Pet => "pet",
            Category::Pp => "pp",
            Category::Ps => "ps",
            Category::Pvc => "pvc",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column().to_uppercase())
    }
}

/// Role of a row within its `(country, year)` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    /// Aggregate across all parent companies.
    Total,
    /// One parent company's contribution.
    Company,
}

/// Per-category sums over the seven plastic categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub hdpe: f64,
    pub ldpe: f64,
    pub o: f64,
    pub pet: f64,
    pub pp: f64,
    pub ps: f64,
    pub pvc: f64,
}

impl CategoryTotals {
    /// Returns the sum for one category; `Empty` is not tracked and reads as zero.
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Empty => 0.0,
            Category::Hdpe => self.hdpe,
            Category::Ldpe => self.ldpe,
            Category::O => self.o,
            Category::Pet => self.pet,
            Category::Pp => self.pp,
            Category::Ps => self.ps,
            Category::Pvc => self.pvc,
        }
    }

    /// Adds a record's plastic counts to the running sums.
    pub fn add_record(&mut self, record: &crate::data::Record) {
        self.hdpe += record.hdpe;
        self.ldpe += record.ldpe;
        self.o += record.o;
        self.pet += record.pet;
        self.pp += record.pp;
        self.ps += record.ps;
        self.pvc += record.pvc;
    }

    /// Iterates `(category, sum)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::PLASTICS.iter().map(move |&c| (c, self.get(c)))
    }

    pub fn total(&self) -> f64 {
        self.iter().map(|(_, v)| v).sum()
    }

    pub fn recyclable(&self) -> f64 {
        Category::RECYCLABLE.iter().map(|&c| self.get(c)).sum()
    }

    pub fn non_recyclable(&self) -> f64 {
        Category::NON_RECYCLABLE.iter().map(|&c| self.get(c)).sum()
    }
}

/// Parent-company filter for compositions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum CompanyFilter {
    /// No filter; sum over every company row.
    #[default]
    All,
    /// Only rows for this parent company.
    Named(String),
}

impl CompanyFilter {
    /// Sentinel text for the unfiltered selection.
    pub const ALL_LABEL: &'static str = "All";

    /// True when the record passes this filter.
    pub fn matches(&self, parent_company: Option<&str>) -> bool {
        match self {
            CompanyFilter::All => true,
            CompanyFilter::Named(name) => parent_company == Some(name.as_str()),
        }
    }
}

impl fmt::Display for CompanyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompanyFilter::All => write!(f, "{}", Self::ALL_LABEL),
            CompanyFilter::Named(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for CompanyFilter {
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::ALL_LABEL) {
            CompanyFilter::All
        } else {
            CompanyFilter::Named(trimmed.to_string())
        }
    }
}

impl From<String> for CompanyFilter {
    fn from(s: String) -> Self {
        CompanyFilter::from(s.as_str())
    }
}

impl From<CompanyFilter> for String {
    fn from(filter: CompanyFilter) -> Self {
        filter.to_string()
    }
}

impl FromStr for CompanyFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CompanyFilter::from(s))
    }
}

/// One user selection: the filter state the aggregator is queried with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub year: i32,
    pub country: String,
    pub company: CompanyFilter,
}

impl Selection {
    pub fn new(year: i32, country: impl Into<String>, company: CompanyFilter) -> Self {
        Self {
            year,
            country: country.into(),
            company,
        }
    }

    /// Checks every field against the values present in the data.
    ///
    /// A valid year and country that have no total row together are
    /// accepted; that combination reports absent data instead.
    pub fn validate(&self, options: &SelectorOptions) -> crate::error::DashboardResult<()> {
        use crate::error::DashboardError;

        if !options.years.contains(&self.year) {
            return Err(DashboardError::InvalidSelection(format!(
                "year {} not in data (available: {})",
                self.year,
                join_values(&options.years)
            )));
        }

        if !options.countries.iter().any(|c| c == &self.country) {
            return Err(DashboardError::InvalidSelection(format!(
                "country {:?} not in data (available: {})",
                self.country,
                join_values(&options.countries)
            )));
        }

        if let CompanyFilter::Named(ref name) = self.company {
            if !options.companies.iter().any(|c| c == name) {
                return Err(DashboardError::InvalidSelection(format!(
                    "parent company {:?} has no rows in {}",
                    name, self.year
                )));
            }
        }

        Ok(())
    }
}

fn join_values<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values a selection may take, as found in the classified table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectorOptions {
    /// Distinct years among total rows, ascending.
    pub years: Vec<i32>,
    /// Distinct countries among total rows, ascending.
    pub countries: Vec<String>,
    /// Distinct parent companies among company rows of the chosen year.
    pub companies: Vec<String>,
}

/// Headline figures for one country and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub country: String,
    pub year: i32,
    pub grand_total: f64,
    pub volunteers: u64,
    pub num_events: u64,
    pub grand_total_per_volunteer: f64,
}

/// KPI values rendered as display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpiDisplay {
    pub grand_total: String,
    pub volunteers: String,
    pub num_events: String,
    pub grand_total_per_volunteer: String,
}

impl Kpi {
    /// Formats counts with no decimals and the ratio with two, all grouped by thousands.
    pub fn display(&self) -> KpiDisplay {
        KpiDisplay {
            grand_total: format_number(self.grand_total, 0),
            volunteers: format_number(self.volunteers as f64, 0),
            num_events: format_number(self.num_events as f64, 0),
            grand_total_per_volunteer: format_number(self.grand_total_per_volunteer, 2),
        }
    }
}

/// Map entry: one country's total row for the selected year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryTotal {
    pub country: String,
    pub grand_total: f64,
    pub volunteers: u64,
    pub grand_total_per_volunteer: f64,
}

/// Plastic-type breakdown for one country and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub company: CompanyFilter,
    /// Number of company rows summed; zero means nothing to show.
    pub rows_matched: usize,
    pub totals: CategoryTotals,
}

impl Composition {
    pub fn is_empty(&self) -> bool {
        self.rows_matched == 0
    }
}

/// Recyclable against non-recyclable sums for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecyclingTrendPoint {
    pub year: i32,
    pub recyclable: f64,
    pub non_recyclable: f64,
}

/// Per-category sums for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryTrendPoint {
    pub year: i32,
    pub totals: CategoryTotals,
}

/// A parent company's summed plastic-per-volunteer ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRanking {
    pub parent_company: String,
    pub grand_total_per_volunteer: f64,
}

/// Why a group's total row looks wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyKind {
    /// The row taken as total names a real parent company.
    NamedTotalRow { parent_company: String },
    /// A company row's grand total exceeds the total row's.
    TotalBelowCompany {
        parent_company: String,
        total: f64,
        company_total: f64,
    },
    /// No row in the group is flagged as total.
    MissingTotal,
    /// More than one row in the group is flagged as total.
    MultipleTotals { count: usize },
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::NamedTotalRow { parent_company } => {
                write!(f, "total row names company {:?}", parent_company)
            }
            AnomalyKind::TotalBelowCompany {
                parent_company,
                total,
                company_total,
            } => write!(
                f,
                "{:?} reports {} but the group total is {}",
                parent_company, company_total, total
            ),
            AnomalyKind::MissingTotal => write!(f, "no row flagged as total"),
            AnomalyKind::MultipleTotals { count } => {
                write!(f, "{} rows flagged as total", count)
            }
        }
    }
}

/// A `(country, year)` group without a plausible total row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAnomaly {
    pub country: String,
    pub year: i32,
    #[serde(flatten)]
    pub kind: AnomalyKind,
}

impl fmt::Display for GroupAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.country, self.year, self.kind)
    }
}

/// A total-row field that disagrees with the sum of its company rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownMismatch {
    pub country: String,
    pub year: i32,
    pub field: String,
    /// Value on the total row.
    pub expected: f64,
    /// Sum over the company rows.
    pub actual: f64,
}

impl fmt::Display for BreakdownMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} total is {} but companies sum to {}",
            self.country, self.year, self.field, self.expected, self.actual
        )
    }
}

/// Metadata about the generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the loaded data file.
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub records: usize,
    pub total_rows: usize,
    pub company_rows: usize,
    /// Classification rule that tagged the rows.
    pub rule: String,
}

/// Every data product for one selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub metadata: ReportMetadata,
    pub selection: Selection,
    /// `None` when the selection has no total row.
    pub kpi: Option<Kpi>,
    pub map: Vec<CountryTotal>,
    pub composition: Composition,
    pub recycling_trend: Vec<RecyclingTrendPoint>,
    pub category_trend: Vec<CategoryTrendPoint>,
    pub top_companies: Vec<CompanyRanking>,
    pub anomalies: Vec<GroupAnomaly>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SelectorOptions {
        SelectorOptions {
            years: vec![2019, 2020],
            countries: vec!["Kenya".to_string(), "Peru".to_string()],
            companies: vec!["Nestle".to_string()],
        }
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Hdpe.to_string(), "HDPE");
        assert_eq!(Category::O.to_string(), "O");
        assert_eq!(Category::Pvc.column(), "pvc");
    }

    #[test]
    fn test_category_partition_covers_plastics() {
        let mut split: Vec<Category> = Category::RECYCLABLE
            .iter()
            .chain(Category::NON_RECYCLABLE.iter())
            .copied()
            .collect();
        split.sort();
        let mut plastics = Category::PLASTICS.to_vec();
        plastics.sort();
        assert_eq!(split, plastics);
    }

    #[test]
    fn test_category_totals_partitions() {
        let totals = CategoryTotals {
            hdpe: 1.0,
            ldpe: 2.0,
            o: 3.0,
            pet: 4.0,
            pp: 5.0,
            ps: 6.0,
            pvc: 7.0,
        };
        assert_eq!(totals.recyclable(), 12.0);
        assert_eq!(totals.non_recyclable(), 16.0);
        assert_eq!(totals.total(), 28.0);
        assert_eq!(totals.get(Category::Empty), 0.0);
    }

    #[test]
    fn test_company_filter_parsing() {
        assert_eq!(CompanyFilter::from("All"), CompanyFilter::All);
        assert_eq!(CompanyFilter::from("all"), CompanyFilter::All);
        assert_eq!(
            CompanyFilter::from(" Nestle "),
            CompanyFilter::Named("Nestle".to_string())
        );
        assert!(CompanyFilter::All.matches(None));
        assert!(!CompanyFilter::Named("X".to_string()).matches(None));
        assert_eq!(CompanyFilter::All.to_string(), "All");
    }

    #[test]
    fn test_selection_validation() {
        let opts = options();
        assert!(Selection::new(2020, "Kenya", CompanyFilter::All)
            .validate(&opts)
            .is_ok());
        assert!(Selection::new(2099, "Kenya", CompanyFilter::All)
            .validate(&opts)
            .is_err());
        assert!(Selection::new(2020, "Chad", CompanyFilter::All)
            .validate(&opts)
            .is_err());
        assert!(
            Selection::new(2020, "Peru", CompanyFilter::Named("Acme".to_string()))
                .validate(&opts)
                .is_err()
        );
    }

    #[test]
    fn test_kpi_display() {
        let kpi = Kpi {
            country: "A".to_string(),
            year: 2020,
            grand_total: 12345.0,
            volunteers: 1200,
            num_events: 3,
            grand_total_per_volunteer: 10.287,
        };
        let shown = kpi.display();
        assert_eq!(shown.grand_total, "12,345");
        assert_eq!(shown.volunteers, "1,200");
        assert_eq!(shown.num_events, "3");
        assert_eq!(shown.grand_total_per_volunteer, "10.29");
    }

    #[test]
    fn test_anomaly_serializes_with_kind_tag() {
        let anomaly = GroupAnomaly {
            country: "A".to_string(),
            year: 2020,
            kind: AnomalyKind::MissingTotal,
        };
        let json = serde_json::to_string(&anomaly).unwrap();
        assert!(json.contains("\"kind\":\"missing_total\""));
        assert!(anomaly.to_string().contains("no row flagged as total"));
    }
}
