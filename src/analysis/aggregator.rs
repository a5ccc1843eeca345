//! Dashboard aggregation queries.
//!
//! Each query is a pure read over the classified table. A selection that
//! matches nothing yields `None` or an empty result, never an error.

use super::classifier::{Classification, ClassifiedTable};
use crate::data::Record;
use crate::models::{
    CategoryTotals, CategoryTrendPoint, CompanyFilter, CompanyRanking, Composition, CountryTotal,
    Dashboard, Kpi, RecyclingTrendPoint, ReportMetadata, Selection, SelectorOptions,
};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Default size of the company ranking.
pub const DEFAULT_TOP_N: usize = 10;

/// Look up the headline figures for a country and year.
///
/// Returns `None` when no total row exists for the pair.
pub fn kpi(table: &ClassifiedTable, country: &str, year: i32) -> Option<Kpi> {
    table
        .totals()
        .find(|r| r.country == country && r.year == year)
        .map(|r| Kpi {
            country: r.country.clone(),
            year: r.year,
            grand_total: r.grand_total,
            volunteers: r.volunteers,
            num_events: r.num_events,
            grand_total_per_volunteer: r.grand_total_per_volunteer,
        })
}

/// Sum plastic categories over the company rows of a country and year.
pub fn composition(
    table: &ClassifiedTable,
    country: &str,
    year: i32,
    company: &CompanyFilter,
) -> Composition {
    let mut totals = CategoryTotals::default();
    let mut rows_matched = 0;

    for record in table
        .companies()
        .filter(|r| r.country == country && r.year == year)
        .filter(|r| company.matches(r.parent_company.as_deref()))
    {
        totals.add_record(record);
        rows_matched += 1;
    }

    Composition {
        company: company.clone(),
        rows_matched,
        totals,
    }
}

/// Company-row category sums for a country, keyed by year.
fn yearly_totals(table: &ClassifiedTable, country: &str) -> BTreeMap<i32, CategoryTotals> {
    let mut by_year: BTreeMap<i32, CategoryTotals> = BTreeMap::new();

    for record in table.companies().filter(|r| r.country == country) {
        by_year.entry(record.year).or_default().add_record(record);
    }

    by_year
}

/// Recyclable against non-recyclable totals per year for a country.
pub fn recycling_trend(table: &ClassifiedTable, country: &str) -> Vec<RecyclingTrendPoint> {
    yearly_totals(table, country)
        .into_iter()
        .map(|(year, totals)| RecyclingTrendPoint {
            year,
            recyclable: totals.recyclable(),
            non_recyclable: totals.non_recyclable(),
        })
        .collect()
}

/// Per-category totals per year for a country.
pub fn category_trend(table: &ClassifiedTable, country: &str) -> Vec<CategoryTrendPoint> {
    yearly_totals(table, country)
        .into_iter()
        .map(|(year, totals)| CategoryTrendPoint { year, totals })
        .collect()
}

/// Rank parent companies by summed plastic per volunteer in a year.
///
/// Sorted descending; equal sums are ordered by company name.
pub fn top_companies(table: &ClassifiedTable, year: i32, n: usize) -> Vec<CompanyRanking> {
    let mut sums: HashMap<&str, f64> = HashMap::new();

    for record in table.companies().filter(|r| r.year == year) {
        if let Some(ref name) = record.parent_company {
            *sums.entry(name.as_str()).or_default() += record.grand_total_per_volunteer;
        }
    }

    let mut ranking: Vec<CompanyRanking> = sums
        .into_iter()
        .map(|(name, sum)| CompanyRanking {
            parent_company: name.to_string(),
            grand_total_per_volunteer: sum,
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.grand_total_per_volunteer
            .total_cmp(&a.grand_total_per_volunteer)
            .then_with(|| a.parent_company.cmp(&b.parent_company))
    });
    ranking.truncate(n);

    ranking
}

/// Every country's total row for a year, ordered by country.
pub fn country_map(table: &ClassifiedTable, year: i32) -> Vec<CountryTotal> {
    let mut map: Vec<CountryTotal> = table
        .totals()
        .filter(|r| r.year == year)
        .map(|r| CountryTotal {
            country: r.country.clone(),
            grand_total: r.grand_total,
            volunteers: r.volunteers,
            grand_total_per_volunteer: r.grand_total_per_volunteer,
        })
        .collect();

    map.sort_by(|a, b| a.country.cmp(&b.country));
    map
}

/// Distinct values a selection may take.
///
/// Companies are those with company rows in `year`.
pub fn selector_options(table: &ClassifiedTable, year: i32) -> SelectorOptions {
    let years: BTreeSet<i32> = table.totals().map(|r| r.year).collect();
    let countries: BTreeSet<&str> = table.totals().map(|r| r.country.as_str()).collect();
    let companies: BTreeSet<&str> = table
        .companies()
        .filter(|r| r.year == year)
        .filter_map(|r| r.parent_company.as_deref())
        .collect();

    SelectorOptions {
        years: years.into_iter().collect(),
        countries: countries.into_iter().map(String::from).collect(),
        companies: companies.into_iter().map(String::from).collect(),
    }
}

/// Selection used when the caller gives no year or country: the earliest
/// year and the first country, with every company.
pub fn default_selection(table: &ClassifiedTable) -> Option<Selection> {
    let year = table.totals().map(|r| r.year).min()?;
    let country = table.totals().map(|r| r.country.as_str()).min()?;
    Some(Selection::new(year, country, CompanyFilter::All))
}

/// Evaluate every query for one selection.
pub fn build_dashboard(
    classification: &Classification,
    selection: &Selection,
    top_n: usize,
    source: &str,
) -> Dashboard {
    let table = &classification.table;
    let year = selection.year;
    let country = selection.country.as_str();

    let kpi = kpi(table, country, year);
    if kpi.is_none() {
        debug!("No total row for {} in {}", country, year);
    }

    let metadata = ReportMetadata {
        source: source.to_string(),
        generated_at: Utc::now(),
        records: table.record_count(),
        total_rows: table.total_count(),
        company_rows: table.company_count(),
        rule: table.rule().to_string(),
    };

    Dashboard {
        metadata,
        selection: selection.clone(),
        kpi,
        map: country_map(table, year),
        composition: composition(table, country, year, &selection.company),
        recycling_trend: recycling_trend(table, country),
        category_trend: category_trend(table, country),
        top_companies: top_companies(table, year, top_n),
        anomalies: classification.anomalies.clone(),
    }
}

/// Sum of `grand_total` over a set of records.
pub fn sum_grand_total<'a>(records: impl Iterator<Item = &'a Record>) -> f64 {
    records.map(|r| r.grand_total).sum()
}
