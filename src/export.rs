use std::io::Write;

use serde::Serialize;

use crate::store::Standing;
use crate::util::format_clock;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    rank: usize,
    name: &'a str,
    total_seconds: u64,
    total: String,
}

/// Write a snapshot as CSV, one row per participant in snapshot order
pub fn write_csv<W: Write>(standings: &[Standing], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (idx, standing) in standings.iter().enumerate() {
        wtr.serialize(ExportRow {
            rank: idx + 1,
            name: &standing.name,
            total_seconds: standing.total,
            total: format_clock(standing.total),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
