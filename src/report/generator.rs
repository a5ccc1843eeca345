//! Markdown and JSON report generation.
//!
//! This module renders a built [`Dashboard`] as a Markdown document or
//! pretty-printed JSON. Sections whose data is empty are left out.

use super::format::{escape_cell, format_number};
use crate::models::{
    CategoryTrendPoint, Category, CompanyRanking, Composition, CountryTotal, Dashboard, Kpi,
    RecyclingTrendPoint, ReportMetadata, Selection,
};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Worldwide Plastic Pollution Report\n\n");

    output.push_str(&generate_metadata_section(
        &dashboard.metadata,
        &dashboard.selection,
    ));
    output.push_str(&generate_kpi_section(
        dashboard.kpi.as_ref(),
        &dashboard.selection,
    ));
    output.push_str(&generate_map_section(&dashboard.map, dashboard.selection.year));
    output.push_str(&generate_composition_section(
        &dashboard.composition,
        &dashboard.selection,
    ));
    output.push_str(&generate_recycling_section(
        &dashboard.recycling_trend,
        &dashboard.selection.country,
    ));
    output.push_str(&generate_category_trend_section(
        &dashboard.category_trend,
        &dashboard.selection.country,
    ));
    output.push_str(&generate_top_companies_section(
        &dashboard.top_companies,
        dashboard.selection.year,
    ));
    output.push_str(&generate_anomalies_section(dashboard));

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, selection: &Selection) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Records:** {} ({} total rows, {} company rows)\n",
        metadata.records, metadata.total_rows, metadata.company_rows
    ));
    section.push_str(&format!("- **Classification:** {}\n", metadata.rule));
    section.push_str(&format!(
        "- **Selection:** {} / {} / {}\n",
        selection.country, selection.year, selection.company
    ));
    section.push('\n');

    section
}

/// Generate the key indicators section, or a no-data notice.
fn generate_kpi_section(kpi: Option<&Kpi>, selection: &Selection) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "## Key Indicators - {} ({})\n\n",
        selection.country, selection.year
    ));

    let Some(kpi) = kpi else {
        section.push_str(&format!(
            "> No total row for {} in {}\n\n",
            selection.country, selection.year
        ));
        return section;
    };

    let shown = kpi.display();
    section.push_str("| Total Plastic Collected | Volunteers | Events | Plastic per Volunteer |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        shown.grand_total, shown.volunteers, shown.num_events, shown.grand_total_per_volunteer
    ));

    section
}

/// Generate the per-country table behind the world map.
fn generate_map_section(map: &[CountryTotal], year: i32) -> String {
    if map.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str(&format!("## Plastic Collected per Volunteer - {}\n\n", year));
    section.push_str("| Country | Total Plastic | Volunteers | Plastic/Volunteer |\n");
    section.push_str("|:---|---:|---:|---:|\n");

    for entry in map {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            escape_cell(&entry.country),
            format_number(entry.grand_total, 0),
            format_number(entry.volunteers as f64, 0),
            format_number(entry.grand_total_per_volunteer, 2)
        ));
    }
    section.push('\n');

    section
}

/// Generate the plastic type composition section.
fn generate_composition_section(composition: &Composition, selection: &Selection) -> String {
    if composition.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    let scope = match composition.company {
        crate::models::CompanyFilter::All => "All Companies".to_string(),
        ref named => escape_cell(&named.to_string()),
    };
    section.push_str(&format!(
        "## Plastic Type Distribution - {} - {} ({})\n\n",
        scope, selection.country, selection.year
    ));
    section.push_str("| Plastic Type | Quantity |\n");
    section.push_str("|:---|---:|\n");

    for (category, amount) in composition.totals.iter() {
        section.push_str(&format!(
            "| {} | {} |\n",
            category,
            format_number(amount, 0)
        ));
    }
    section.push_str(&format!(
        "| **Total** | **{}** |\n",
        format_number(composition.totals.total(), 0)
    ));
    section.push('\n');

    section
}

/// Generate the recyclable vs non-recyclable trend section.
fn generate_recycling_section(trend: &[RecyclingTrendPoint], country: &str) -> String {
    if trend.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str(&format!(
        "## Recyclable vs Non-Recyclable - {} (by Year)\n\n",
        country
    ));
    section.push_str("| Year | Recyclable | Non-Recyclable |\n");
    section.push_str("|:---|---:|---:|\n");

    for point in trend {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            point.year,
            format_number(point.recyclable, 0),
            format_number(point.non_recyclable, 0)
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-category trend section.
fn generate_category_trend_section(trend: &[CategoryTrendPoint], country: &str) -> String {
    if trend.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str(&format!("## Plastic Type Trend - {}\n\n", country));

    section.push_str("| Year |");
    for category in Category::PLASTICS {
        section.push_str(&format!(" {} |", category));
    }
    section.push('\n');
    section.push_str("|:---|");
    section.push_str(&"---:|".repeat(Category::PLASTICS.len()));
    section.push('\n');

    for point in trend {
        section.push_str(&format!("| {} |", point.year));
        for (_, amount) in point.totals.iter() {
            section.push_str(&format!(" {} |", format_number(amount, 0)));
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

/// Generate the top parent companies section.
fn generate_top_companies_section(ranking: &[CompanyRanking], year: i32) -> String {
    if ranking.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str(&format!(
        "## Top {} Parent Companies by Plastic per Volunteer ({})\n\n",
        ranking.len(),
        year
    ));
    section.push_str("| # | Parent Company | Plastic per Volunteer |\n");
    section.push_str("|:---:|:---|---:|\n");

    for (i, entry) in ranking.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            i + 1,
            escape_cell(&entry.parent_company),
            format_number(entry.grand_total_per_volunteer, 2)
        ));
    }
    section.push('\n');

    section
}

/// Generate the data quality section listing implausible groups.
fn generate_anomalies_section(dashboard: &Dashboard) -> String {
    if dashboard.anomalies.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Data Quality\n\n");
    section.push_str(&format!(
        "{} group(s) lack a plausible total row:\n\n",
        dashboard.anomalies.len()
    ));
    for anomaly in &dashboard.anomalies {
        section.push_str(&format!("- {}\n", anomaly));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by Plastiscope*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AnomalyKind, CategoryTotals, CompanyFilter, GroupAnomaly, RecyclingTrendPoint,
    };
    use chrono::Utc;

    fn create_test_dashboard() -> Dashboard {
        let totals = CategoryTotals {
            hdpe: 1200.0,
            ldpe: 30.0,
            o: 5.0,
            pet: 400.0,
            pp: 10.0,
            ps: 2.0,
            pvc: 1.0,
        };

        Dashboard {
            metadata: ReportMetadata {
                source: "plastics.csv".to_string(),
                generated_at: Utc::now(),
                records: 12,
                total_rows: 4,
                company_rows: 8,
                rule: "positional".to_string(),
            },
            selection: Selection::new(2020, "Kenya", CompanyFilter::All),
            kpi: Some(Kpi {
                country: "Kenya".to_string(),
                year: 2020,
                grand_total: 1648.0,
                volunteers: 1200,
                num_events: 4,
                grand_total_per_volunteer: 1.373,
            }),
            map: vec![CountryTotal {
                country: "Kenya".to_string(),
                grand_total: 1648.0,
                volunteers: 1200,
                grand_total_per_volunteer: 1.373,
            }],
            composition: Composition {
                company: CompanyFilter::All,
                rows_matched: 2,
                totals,
            },
            recycling_trend: vec![RecyclingTrendPoint {
                year: 2020,
                recyclable: totals.recyclable(),
                non_recyclable: totals.non_recyclable(),
            }],
            category_trend: vec![CategoryTrendPoint { year: 2020, totals }],
            top_companies: vec![CompanyRanking {
                parent_company: "Unilever".to_string(),
                grand_total_per_volunteer: 0.75,
            }],
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let dashboard = create_test_dashboard();
        let markdown = generate_markdown_report(&dashboard);

        assert!(markdown.contains("# Worldwide Plastic Pollution Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Key Indicators - Kenya (2020)"));
        assert!(markdown.contains("| 1,648 | 1,200 | 4 | 1.37 |"));
        assert!(markdown.contains("## Plastic Type Distribution - All Companies - Kenya (2020)"));
        assert!(markdown.contains("| HDPE | 1,200 |"));
        assert!(markdown.contains("| **Total** | **1,648** |"));
        assert!(markdown.contains("| 2020 | 1,640 | 8 |"));
        assert!(markdown.contains("## Top 1 Parent Companies"));
        assert!(markdown.contains("| 1 | Unilever | 0.75 |"));
        assert!(!markdown.contains("## Data Quality"));
    }

    #[test]
    fn test_kpi_section_without_data() {
        let selection = Selection::new(2099, "C", CompanyFilter::All);
        let section = generate_kpi_section(None, &selection);
        assert!(section.contains("No total row for C in 2099"));
        assert!(!section.contains("Volunteers"));
    }

    #[test]
    fn test_empty_sections_omitted() {
        let mut dashboard = create_test_dashboard();
        dashboard.composition.rows_matched = 0;
        dashboard.recycling_trend.clear();
        dashboard.category_trend.clear();
        dashboard.top_companies.clear();

        let markdown = generate_markdown_report(&dashboard);
        assert!(!markdown.contains("Plastic Type Distribution"));
        assert!(!markdown.contains("Recyclable vs Non-Recyclable"));
        assert!(!markdown.contains("Plastic Type Trend"));
        assert!(!markdown.contains("Parent Companies"));
    }

    #[test]
    fn test_named_company_composition_title() {
        let dashboard = create_test_dashboard();
        let mut composition = dashboard.composition.clone();
        composition.company = CompanyFilter::Named("Unilever".to_string());
        let section = generate_composition_section(&composition, &dashboard.selection);
        assert!(section.contains("Unilever - Kenya (2020)"));
    }

    #[test]
    fn test_anomalies_section() {
        let mut dashboard = create_test_dashboard();
        dashboard.anomalies.push(GroupAnomaly {
            country: "Peru".to_string(),
            year: 2019,
            kind: AnomalyKind::MissingTotal,
        });
        let markdown = generate_markdown_report(&dashboard);
        assert!(markdown.contains("## Data Quality"));
        assert!(markdown.contains("- Peru 2019: no row flagged as total"));
    }

    #[test]
    fn test_pipes_in_names_escaped() {
        let mut dashboard = create_test_dashboard();
        dashboard.map[0].country = "Kenya | Uganda".to_string();
        dashboard.top_companies[0].parent_company = "Mars|Wrigley".to_string();

        let markdown = generate_markdown_report(&dashboard);
        assert!(markdown.contains("| Kenya \\| Uganda | 1,648 |"));
        assert!(markdown.contains("| 1 | Mars\\|Wrigley | 0.75 |"));
    }

    #[test]
    fn test_generate_json_report() {
        let dashboard = create_test_dashboard();
        let json = generate_json_report(&dashboard).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["selection"]["company"], "All");
        assert_eq!(value["kpi"]["grand_total"], 1648.0);
        assert_eq!(value["composition"]["totals"]["hdpe"], 1200.0);
        assert_eq!(value["top_companies"][0]["parent_company"], "Unilever");
    }

    #[test]
    fn test_json_absent_kpi_is_null() {
        let mut dashboard = create_test_dashboard();
        dashboard.kpi = None;
        let json = generate_json_report(&dashboard).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["kpi"].is_null());
    }
}
