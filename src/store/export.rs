//! Shareable exports of the dataset

use crate::error::ScanResult;
use crate::network::NetworkRecord;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column header of the shareable CSV export
pub const CSV_HEADER: [&str; 9] = [
    "SSID",
    "BSSID",
    "RSSI",
    "Frequency",
    "Capabilities",
    "Timestamp",
    "SecurityLevel",
    "Latitude",
    "Longitude",
];

/// Export formats offered by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// Pretty-printed JSON array of full records
pub fn write_json<W: Write>(writer: W, records: &[NetworkRecord]) -> ScanResult<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// `;`-delimited CSV with a header row
pub fn write_csv<W: Write>(writer: W, records: &[NetworkRecord]) -> ScanResult<()> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(b';')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    csv.write_record(CSV_HEADER)?;
    for r in records {
        csv.write_record([
            r.ssid.clone(),
            r.bssid.clone(),
            r.rssi.to_string(),
            r.frequency.to_string(),
            r.capabilities.clone(),
            r.timestamp_formatted.clone(),
            r.label.to_string(),
            r.latitude.to_string(),
            r.longitude.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write `records` to `path` in the requested format
pub fn export_to_file<P: AsRef<Path>>(path: P, records: &[NetworkRecord], format: ExportFormat) -> ScanResult<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    match format {
        ExportFormat::Json => write_json(file, records)?,
        ExportFormat::Csv => write_csv(file, records)?,
    }
    info!("Exported {} networks to {}", records.len(), path.as_ref().display());
    Ok(())
}
