use super::classifier::classify_record;
use super::domain::{ComplianceRecord, Vehicle, VehicleId};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::Write;

const REGISTER_HEADERS: [&str; 8] = [
    "Registration Number",
    "Make",
    "Model",
    "Year",
    "Compliance Type",
    "Expiry Date",
    "Status",
    "Last Renewed",
];

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write CSV register: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV register: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the fleet register as CSV, one row per record with a known vehicle.
///
/// Every cell is quoted. Returns the number of data rows written.
pub fn write_register_csv<W: Write>(
    writer: W,
    vehicles: &[Vehicle],
    records: &[ComplianceRecord],
    today: NaiveDate,
) -> Result<usize, ExportError> {
    let index: HashMap<&VehicleId, &Vehicle> = vehicles.iter().map(|v| (&v.id, v)).collect();
    let mut out = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);

    out.write_record(REGISTER_HEADERS)?;

    let mut rows = 0;
    for record in records {
        let Some(vehicle) = index.get(&record.vehicle_id) else {
            continue;
        };

        let status = classify_record(record, vehicle, today);
        let year = vehicle.year.to_string();
        let expiry = format_date(record.expiry_date);
        let renewed = format_date(record.last_renewed_on);

        out.write_record([
            vehicle.registration_number.as_str(),
            vehicle.make.as_str(),
            vehicle.model.as_str(),
            year.as_str(),
            record.document_type.label(),
            expiry.as_str(),
            status.label(),
            renewed.as_str(),
        ])?;
        rows += 1;
    }

    out.flush()?;
    Ok(rows)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|value| value.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
