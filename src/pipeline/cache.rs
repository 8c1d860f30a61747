//! Flat-file persistence for the occurrence table.
//!
//! The cache is a CSV with header `state,fy_declared,incident_type,occurred`.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::WriterBuilder;
use tracing::debug;

use crate::pipeline::types::{OccurrenceRow, OccurrenceTable};

/// Writes the table to `path`, replacing any previous cache.
pub fn write_table(path: &Path, table: &OccurrenceTable) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for row in table.rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = table.rows().len(), "Occurrence cache written");
    Ok(())
}

/// Reads a previously written cache back into a table.
pub fn read_table(path: &Path) -> Result<OccurrenceTable> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: OccurrenceRow =
            result.with_context(|| format!("malformed cache row in {}", path.display()))?;
        if row.occurred > 1 {
            bail!(
                "occurred flag must be 0 or 1, got {} in {}",
                row.occurred,
                path.display()
            );
        }
        rows.push(row);
    }

    debug!(path = %path.display(), rows = rows.len(), "Occurrence cache read");
    Ok(OccurrenceTable::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::DeclarationRecord;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_table() -> OccurrenceTable {
        let records = vec![
            DeclarationRecord::new("FL", 2004, "Hurricane"),
            DeclarationRecord::new("FL", 2004, "Fire"),
            DeclarationRecord::new("FL", 2005, "Hurricane"),
            DeclarationRecord::new("GA", 2005, "Severe Storm"),
        ];
        OccurrenceTable::build(&records, 3)
    }

    #[test]
    fn test_write_then_read_preserves_table() {
        let path = temp_path("disaster_forecast_cache_roundtrip.csv");
        let _ = fs::remove_file(&path);

        let table = sample_table();
        write_table(&path, &table).unwrap();
        let reloaded = read_table(&path).unwrap();

        assert_eq!(reloaded, table);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_cache_header() {
        let path = temp_path("disaster_forecast_cache_header.csv");
        let _ = fs::remove_file(&path);

        write_table(&path, &sample_table()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();

        assert_eq!(lines.next(), Some("state,fy_declared,incident_type,occurred"));
        assert_eq!(lines.next(), Some("FL,2004,Hurricane,1"));
        // 3 pairs x 3 incidents
        assert_eq!(lines.count(), 8);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_rejects_non_binary_flag() {
        let path = temp_path("disaster_forecast_cache_bad.csv");
        fs::write(&path, "state,fy_declared,incident_type,occurred\nFL,2004,Fire,yes\n").unwrap();

        assert!(read_table(&path).is_err());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_rejects_flag_above_one() {
        let path = temp_path("disaster_forecast_cache_two.csv");
        fs::write(&path, "state,fy_declared,incident_type,occurred\nFL,2004,Fire,2\n").unwrap();

        assert!(read_table(&path).is_err());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_missing_file_fails() {
        assert!(read_table(Path::new("/no/such/dir/processed_data.csv")).is_err());
    }
}
