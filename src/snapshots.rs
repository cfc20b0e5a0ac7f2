use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::models::StudentSnapshot;

/// Parses `student_id,name,recency_days,slot_count,activity_count,completions`
/// rows. Values are range-checked later by the engine, not here.
pub fn read_snapshots<R: Read>(reader: R) -> anyhow::Result<Vec<StudentSnapshot>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut snapshots = Vec::new();

    for (index, result) in reader.deserialize::<StudentSnapshot>().enumerate() {
        // header is line 1
        let row = result.with_context(|| format!("invalid snapshot on line {}", index + 2))?;
        snapshots.push(row);
    }

    Ok(snapshots)
}

pub fn load_snapshots(path: &Path) -> anyhow::Result<Vec<StudentSnapshot>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open snapshot file {}", path.display()))?;
    let snapshots = read_snapshots(file)?;
    tracing::info!(count = snapshots.len(), path = %path.display(), "loaded snapshots");
    Ok(snapshots)
}
