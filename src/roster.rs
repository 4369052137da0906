use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;

use crate::models::StudentRecord;

/// Columns every roster must carry; everything else is looked up lazily at
/// render time so a bad row fails on its own inside the dispatch loop.
const REQUIRED_COLUMNS: [&str; 2] = ["Name", "Email"];

pub fn read_roster(path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open roster {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header row of {}", path.display()))?
        .clone();

    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == required) {
            anyhow::bail!(
                "roster {} is missing the `{required}` column",
                path.display()
            );
        }
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.with_context(|| {
            format!("failed to read row {} of {}", index + 2, path.display())
        })?;

        let mut fields = BTreeMap::new();
        for (header, value) in headers.iter().zip(row.iter()) {
            fields.insert(header.to_string(), value.trim().to_string());
        }
        records.push(StudentRecord::new(fields));
    }

    Ok(records)
}
