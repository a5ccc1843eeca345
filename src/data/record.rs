//! One row of the cleanup table.
//!
//! Cell parsing is lenient in the ways dataframe exports need: blank amounts
//! read as zero, counts may be written as `12.0`, and placeholder company
//! names read as absent.

use crate::models::{Category, RowKind};
use serde::{Deserialize, Deserializer, Serialize};

/// Column names every source table must carry, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 15] = [
    "country",
    "year",
    "parent_company",
    "empty",
    "hdpe",
    "ldpe",
    "o",
    "pet",
    "pp",
    "ps",
    "pvc",
    "grand_total",
    "num_events",
    "volunteers",
    "grand_total_per_volunteer",
];

/// Optional column that marks rows as `total` or `company` explicitly.
pub const ROW_KIND_COLUMN: &str = "row_kind";

/// Parent-company labels that denote the aggregate row of a group.
const TOTAL_LABELS: [&str; 2] = ["grand total", "total"];

/// A single record from the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub country: String,
    #[serde(deserialize_with = "de_year")]
    pub year: i32,
    /// `None` when the cell is blank or a null marker.
    #[serde(deserialize_with = "de_company")]
    pub parent_company: Option<String>,
    #[serde(deserialize_with = "de_amount")]
    pub empty: f64,
    #[serde(deserialize_with = "de_amount")]
    pub hdpe: f64,
    #[serde(deserialize_with = "de_amount")]
    pub ldpe: f64,
    #[serde(deserialize_with = "de_amount")]
    pub o: f64,
    #[serde(deserialize_with = "de_amount")]
    pub pet: f64,
    #[serde(deserialize_with = "de_amount")]
    pub pp: f64,
    #[serde(deserialize_with = "de_amount")]
    pub ps: f64,
    #[serde(deserialize_with = "de_amount")]
    pub pvc: f64,
    #[serde(deserialize_with = "de_amount")]
    pub grand_total: f64,
    #[serde(deserialize_with = "de_count")]
    pub num_events: u64,
    #[serde(deserialize_with = "de_count")]
    pub volunteers: u64,
    #[serde(deserialize_with = "de_amount")]
    pub grand_total_per_volunteer: f64,
    /// Explicit row marker, only present when the table has a `row_kind` column.
    #[serde(default, deserialize_with = "de_row_kind", skip_serializing_if = "Option::is_none")]
    pub row_kind: Option<RowKind>,
}

impl Record {
    /// Returns the count recorded for a plastic category.
    pub fn amount(&self, category: Category) -> f64 {
        match category {
            Category::Empty => self.empty,
            Category::Hdpe => self.hdpe,
            Category::Ldpe => self.ldpe,
            Category::O => self.o,
            Category::Pet => self.pet,
            Category::Pp => self.pp,
            Category::Ps => self.ps,
            Category::Pvc => self.pvc,
        }
    }

    /// Returns the `(country, year)` group this record belongs to.
    pub fn group_key(&self) -> (&str, i32) {
        (&self.country, self.year)
    }

    /// True when the parent company is absent or an aggregate label.
    pub fn has_placeholder_company(&self) -> bool {
        match self.parent_company.as_deref() {
            None => true,
            Some(name) => {
                let lowered = name.trim().to_lowercase();
                TOTAL_LABELS.contains(&lowered.as_str())
            }
        }
    }
}

fn is_null_marker(value: &str) -> bool {
    value.is_empty() || matches!(value.to_lowercase().as_str(), "null" | "na" | "nan")
}

fn de_company<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if is_null_marker(trimmed) {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if is_null_marker(trimmed) {
        return Ok(0.0);
    }
    trimmed
        .parse::<f64>()
        .map_err(|e| serde::de::Error::custom(format!("invalid number {:?}: {}", trimmed, e)))
}

fn parse_integral(value: &str) -> Result<f64, String> {
    let parsed = value
        .parse::<f64>()
        .map_err(|e| format!("invalid integer {:?}: {}", value, e))?;
    if !parsed.is_finite() || parsed.fract() != 0.0 {
        return Err(format!("expected a whole number, got {:?}", value));
    }
    Ok(parsed)
}

fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if is_null_marker(trimmed) {
        return Ok(0);
    }
    let value = parse_integral(trimmed).map_err(serde::de::Error::custom)?;
    if value < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative count, got {:?}",
            trimmed
        )));
    }
    // u64::MAX rounds up to 2^64 as f64
    if value >= u64::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "count {:?} is out of range",
            trimmed
        )));
    }
    Ok(value as u64)
}

fn de_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    let value = parse_integral(trimmed).map_err(serde::de::Error::custom)?;
    if value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "year {:?} is out of range",
            trimmed
        )));
    }
    Ok(value as i32)
}

fn de_row_kind<'de, D>(deserializer: D) -> Result<Option<RowKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "total" => Ok(Some(RowKind::Total)),
        "company" => Ok(Some(RowKind::Company)),
        other => Err(serde::de::Error::custom(format!(
            "row_kind must be 'total' or 'company', got {:?}",
            other
        ))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a record with the given plastic counts; `grand_total` is their sum.
    pub(crate) fn record(
        country: &str,
        year: i32,
        company: Option<&str>,
        counts: [f64; 7],
        volunteers: u64,
        per_volunteer: f64,
    ) -> Record {
        let [hdpe, ldpe, o, pet, pp, ps, pvc] = counts;
        Record {
            country: country.to_string(),
            year,
            parent_company: company.map(String::from),
            empty: 0.0,
            hdpe,
            ldpe,
            o,
            pet,
            pp,
            ps,
            pvc,
            grand_total: counts.iter().sum(),
            num_events: 1,
            volunteers,
            grand_total_per_volunteer: per_volunteer,
            row_kind: None,
        }
    }

    fn parse_one(csv_text: &str) -> Result<Record, csv::Error> {
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        reader
            .deserialize::<Record>()
            .next()
            .expect("one record expected")
    }

    const HEADER: &str = "country,year,parent_company,empty,hdpe,ldpe,o,pet,pp,ps,pvc,grand_total,num_events,volunteers,grand_total_per_volunteer";

    #[test]
    fn test_parse_complete_row() {
        let text = format!("{}\nKenya,2020,Unilever,0,1,2,3,4,5,6,7,28,3.0,14,2.0\n", HEADER);
        let rec = parse_one(&text).unwrap();
        assert_eq!(rec.country, "Kenya");
        assert_eq!(rec.year, 2020);
        assert_eq!(rec.parent_company.as_deref(), Some("Unilever"));
        assert_eq!(rec.amount(Category::Pvc), 7.0);
        assert_eq!(rec.num_events, 3);
        assert_eq!(rec.volunteers, 14);
        assert_eq!(rec.row_kind, None);
    }

    #[test]
    fn test_blank_cells() {
        let text = format!("{}\nKenya,2020,,,1,,,,,,,1,,,\n", HEADER);
        let rec = parse_one(&text).unwrap();
        assert_eq!(rec.parent_company, None);
        assert_eq!(rec.empty, 0.0);
        assert_eq!(rec.hdpe, 1.0);
        assert_eq!(rec.volunteers, 0);
        assert!(rec.has_placeholder_company());
    }

    #[test]
    fn test_null_markers_and_total_labels() {
        let text = format!("{}\nKenya,2020,NaN,0,0,0,0,0,0,0,0,0,0,0,0\n", HEADER);
        assert_eq!(parse_one(&text).unwrap().parent_company, None);

        let text = format!("{}\nKenya,2020,Grand Total,0,0,0,0,0,0,0,0,0,0,0,0\n", HEADER);
        let rec = parse_one(&text).unwrap();
        assert_eq!(rec.parent_company.as_deref(), Some("Grand Total"));
        assert!(rec.has_placeholder_company());
    }

    #[test]
    fn test_fractional_count_rejected() {
        let text = format!("{}\nKenya,2020,X,0,0,0,0,0,0,0,0,0,1.5,0,0\n", HEADER);
        assert!(parse_one(&text).is_err());
    }

    #[test]
    fn test_out_of_range_year_and_count_rejected() {
        let text = format!("{}\nKenya,1e10,X,0,0,0,0,0,0,0,0,0,1,0,0\n", HEADER);
        assert!(parse_one(&text).is_err());

        let text = format!("{}\nKenya,2020,X,0,0,0,0,0,0,0,0,0,1e30,0,0\n", HEADER);
        assert!(parse_one(&text).is_err());

        let text = format!("{}\nKenya,2020,X,0,0,0,0,0,0,0,0,0,1,1e20,0\n", HEADER);
        assert!(parse_one(&text).is_err());

        let text = format!("{}\nKenya,2020,X,0,0,0,0,0,0,0,0,0,-0,4294967296,0\n", HEADER);
        let rec = parse_one(&text).unwrap();
        assert_eq!(rec.num_events, 0);
        assert_eq!(rec.volunteers, 4_294_967_296);
    }

    #[test]
    fn test_row_kind_column() {
        let text = format!(
            "{},row_kind\nKenya,2020,,0,0,0,0,0,0,0,0,0,0,0,0,TOTAL\n",
            HEADER
        );
        assert_eq!(parse_one(&text).unwrap().row_kind, Some(RowKind::Total));

        let text = format!(
            "{},row_kind\nKenya,2020,X,0,0,0,0,0,0,0,0,0,0,0,0,maybe\n",
            HEADER
        );
        assert!(parse_one(&text).is_err());
    }
}
