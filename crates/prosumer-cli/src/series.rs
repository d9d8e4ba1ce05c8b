//! Hourly time series read from delimited text files.

use anyhow::{Context, Result};
use std::path::Path;

/// Reads every numeric field of every record, in file order.
///
/// Accepts one value per line (as written by `numpy.savetxt`) as well as
/// comma-separated rows. Blank fields and `#` comment lines are skipped.
pub fn read_series(path: &Path) -> Result<Vec<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening series file: {}", path.display()))?;

    let mut values = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("reading {} (record {})", path.display(), line + 1))?;
        for field in record.iter().filter(|f| !f.is_empty()) {
            let value: f64 = field.parse().with_context(|| {
                format!(
                    "parsing '{field}' in {} (record {})",
                    path.display(),
                    line + 1
                )
            })?;
            values.push(value);
        }
    }
    Ok(values)
}

/// Keeps the first `hours` values when a horizon is given.
pub fn truncate(mut values: Vec<f64>, hours: Option<usize>) -> Vec<f64> {
    if let Some(hours) = hours {
        values.truncate(hours);
    }
    values
}
