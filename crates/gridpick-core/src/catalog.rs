// Driver catalog loading.
//
// The driver list is a CSV whose first column holds the driver name. The
// first row is a header and is skipped; any other columns are ignored.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("driver list {path} contains no drivers")]
    Empty { path: String },
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Read driver names from CSV. Names are trimmed, blank rows dropped and
/// repeats collapsed, keeping first-seen order.
fn load_drivers_from_reader<R: Read>(rdr: R) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(rdr);

    let mut seen = HashSet::new();
    let mut drivers = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(name) = record.get(0).map(str::trim) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_string()) {
            drivers.push(name.to_string());
        }
    }
    Ok(drivers)
}

/// Load the driver list from a CSV file.
pub fn load_drivers(path: &Path) -> Result<Vec<String>, CatalogError> {
    let file = std::fs::File::open(path).map_err(|e| CatalogError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let drivers = load_drivers_from_reader(file).map_err(|e| CatalogError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    if drivers.is_empty() {
        return Err(CatalogError::Empty {
            path: path.display().to_string(),
        });
    }
    Ok(drivers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_header_and_reads_first_column() {
        let csv_data = "\
Driver,Car,Team
Kyle Larson,5,Hendrick
Denny Hamlin,11,Joe Gibbs
";
        let drivers = load_drivers_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(drivers, vec!["Kyle Larson", "Denny Hamlin"]);
    }

    #[test]
    fn trims_and_drops_blank_names() {
        let csv_data = "Driver\n  Chase Elliott  \n\n   \nRyan Blaney\n";
        let drivers = load_drivers_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(drivers, vec!["Chase Elliott", "Ryan Blaney"]);
    }

    #[test]
    fn collapses_repeats_in_first_seen_order() {
        let csv_data = "Driver\nB\nA\nB\n";
        let drivers = load_drivers_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(drivers, vec!["B", "A"]);
    }

    #[test]
    fn ragged_rows_are_accepted() {
        let csv_data = "Driver,Car\nKyle Busch\nTy Gibbs,54,extra\n";
        let drivers = load_drivers_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(drivers, vec!["Kyle Busch", "Ty Gibbs"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_drivers(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn header_only_file_is_empty_error() {
        let path = std::env::temp_dir().join(format!("gridpick_empty_{}.csv", std::process::id()));
        std::fs::write(&path, "Driver\n").unwrap();
        let err = load_drivers(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Empty { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn shipped_driver_list_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/drivers.csv");
        let drivers = load_drivers(&path).expect("data/drivers.csv should load");
        assert!(drivers.len() >= 30);
        assert!(drivers.iter().any(|d| d == "Kyle Larson"));
    }
}
