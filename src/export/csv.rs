use csv::Writer;
use rust_decimal::Decimal;

use super::{hours_label, ExportError, ExportRow};

pub const CSV_HEADER: [&str; 6] = ["Date", "Clock In", "Clock Out", "Total Hours", "Project", "Description"];

/// Day rows, a blank separator and a total row
pub fn render_csv(rows: &[ExportRow], total_hours: Decimal) -> Result<Vec<u8>, ExportError> {
    let mut wtr = Writer::from_writer(Vec::new());

    wtr.write_record(CSV_HEADER)?;

    for row in rows {
        wtr.write_record(&[
            row.date.to_string(),
            row.clock_in_label(),
            row.clock_out_label(),
            hours_label(row.total_hours),
            row.project.clone(),
            row.description.clone(),
        ])?;
    }

    let total = hours_label(total_hours);
    wtr.write_record(["", "", "", "", "", ""])?;
    wtr.write_record(["Total Hours:", "", "", total.as_str(), "", ""])?;

    wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}
