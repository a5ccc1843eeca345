//! CSV loading and schema validation.
//!
//! The table is read once at start-up. Headers are checked before any row
//! is parsed so a missing column is reported by name rather than as a
//! deserialization failure on the first record.

use super::record::{Record, REQUIRED_COLUMNS, ROW_KIND_COLUMN};
use crate::error::{DashboardError, DashboardResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Records read from a source table.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    /// Rows in file order.
    pub records: Vec<Record>,
    /// Whether the table carries the optional `row_kind` column.
    pub has_row_kind: bool,
}

/// Load and validate a CSV file.
pub fn load_csv(path: &Path) -> DashboardResult<LoadedTable> {
    info!("Loading data from {}", path.display());

    let file = File::open(path).map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let table = load_from_reader(file)?;
    info!(
        "Loaded {} records ({})",
        table.records.len(),
        if table.has_row_kind {
            "with row_kind column"
        } else {
            "no row_kind column"
        }
    );

    Ok(table)
}

/// Load and validate CSV data from any reader.
pub fn load_from_reader<R: Read>(reader: R) -> DashboardResult<LoadedTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let has_row_kind = check_headers(&headers)?;
    debug!("Columns: {:?}", headers.iter().collect::<Vec<_>>());

    let mut records = Vec::new();
    for row in csv_reader.deserialize::<Record>() {
        records.push(row?);
    }

    if records.is_empty() {
        return Err(DashboardError::EmptyTable);
    }

    Ok(LoadedTable {
        records,
        has_row_kind,
    })
}

/// Verify the required columns are present.
///
/// Returns whether the optional `row_kind` column exists. Missing columns
/// are reported together, in canonical order.
pub fn check_headers(headers: &csv::StringRecord) -> DashboardResult<bool> {
    let names: Vec<&str> = headers.iter().collect();
    let missing = missing_columns(&names);

    if !missing.is_empty() {
        return Err(DashboardError::Schema { missing });
    }

    Ok(headers.iter().any(|h| h == ROW_KIND_COLUMN))
}

/// Required columns absent from a header list.
pub fn missing_columns(headers: &[&str]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.contains(*required))
        .map(|c| c.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "country,year,parent_company,empty,hdpe,ldpe,o,pet,pp,ps,pvc,grand_total,num_events,volunteers,grand_total_per_volunteer";

    #[test]
    fn test_load_from_reader() {
        let text = format!(
            "{}\nA,2020,,0,10,10,10,20,20,10,20,100,2,10,10.0\nA,2020,X,0,5,5,5,10,10,5,10,50,1,5,10.0\n",
            HEADER
        );
        let table = load_from_reader(text.as_bytes()).unwrap();
        assert_eq!(table.records.len(), 2);
        assert!(!table.has_row_kind);
        assert_eq!(table.records[0].grand_total, 100.0);
    }

    #[test]
    fn test_missing_pvc_column() {
        let header = HEADER.replace(",pvc", "");
        let text = format!("{}\nA,2020,,0,1,1,1,1,1,1,6,1,1,6.0\n", header);
        match load_from_reader(text.as_bytes()) {
            Err(DashboardError::Schema { missing }) => assert_eq!(missing, vec!["pvc"]),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_columns_reported_in_canonical_order() {
        let headers = ["volunteers", "country", "hdpe"];
        let missing = missing_columns(&headers);
        assert_eq!(missing.len(), 12);
        assert_eq!(missing[0], "year");
        assert_eq!(missing.last().map(String::as_str), Some("grand_total_per_volunteer"));
    }

    #[test]
    fn test_column_order_and_extra_columns_ignored() {
        let text = "notes,pvc,ps,pp,pet,o,ldpe,hdpe,empty,grand_total_per_volunteer,volunteers,num_events,grand_total,parent_company,year,country\n\
                    hello,1,0,0,0,0,0,0,0,0.5,2,1,1,Acme,2019,B\n";
        let table = load_from_reader(text.as_bytes()).unwrap();
        let rec = &table.records[0];
        assert_eq!(rec.country, "B");
        assert_eq!(rec.pvc, 1.0);
        assert_eq!(rec.parent_company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_header_whitespace_trimmed() {
        let header = HEADER.replace(",", " , ");
        let text = format!("{}\nA,2020,,0,0,0,0,0,0,0,0,0,0,0,0\n", header);
        assert!(load_from_reader(text.as_bytes()).is_ok());
    }

    #[test]
    fn test_row_kind_detected() {
        let text = format!("{},row_kind\nA,2020,,0,0,0,0,0,0,0,0,0,0,0,0,total\n", HEADER);
        let table = load_from_reader(text.as_bytes()).unwrap();
        assert!(table.has_row_kind);
    }

    #[test]
    fn test_empty_table_rejected() {
        let text = format!("{}\n", HEADER);
        assert!(matches!(
            load_from_reader(text.as_bytes()),
            Err(DashboardError::EmptyTable)
        ));
    }

    #[test]
    fn test_malformed_number_is_error() {
        let text = format!("{}\nA,2020,,0,abc,0,0,0,0,0,0,0,0,0,0\n", HEADER);
        assert!(matches!(
            load_from_reader(text.as_bytes()),
            Err(DashboardError::Csv(_))
        ));
    }

    #[test]
    fn test_load_csv_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "A,2020,,0,1,1,1,1,1,1,1,7,1,7,1.0").unwrap();
        file.flush().unwrap();

        let table = load_csv(file.path()).unwrap();
        assert_eq!(table.records.len(), 1);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let err = load_csv(Path::new("/nonexistent/plastics.csv")).unwrap_err();
        assert!(matches!(err, DashboardError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/plastics.csv"));
    }

    #[test]
    fn test_fixture_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/plastics_sample.csv");
        let table = load_csv(&path).unwrap();
        assert!(table.records.len() > 10);
    }
}
