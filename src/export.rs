use crate::coverage::CoverageMatrix;
use crate::error::KtResult;
use crate::patterns::PatternStats;
use std::io::Write;

/// One row per pattern, header taken from the field names.
pub fn write_pattern_csv<W: Write>(out: W, rows: &[PatternStats]) -> KtResult<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Flattened matrix: `from,to,count,avg_time,status`.
pub fn write_coverage_csv<W: Write>(out: W, matrix: &CoverageMatrix) -> KtResult<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["from", "to", "count", "avg_time", "status"])?;
    for cell in &matrix.cells {
        wtr.write_record([
            cell.from.to_string(),
            cell.to.to_string(),
            cell.count.to_string(),
            format!("{:.1}", cell.avg_time),
            cell.status.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
