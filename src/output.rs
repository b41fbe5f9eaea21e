//! CSV rows and the file sink that receives them.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::SinkError;
use crate::normalizer::{format_phone, join_list};
use crate::record::CarrierRecord;

const BASE_COLUMNS: [&str; 16] = [
    "Legal Name",
    "USDOT Number",
    "MC/MX/FF Numbers",
    "Entity Type",
    "Address",
    "Phone",
    "Power Units",
    "Drivers",
    "MCS-150 Form Date",
    "MCS-150 Mileage",
    "MCS-150 Mileage Year",
    "Out of Service Date",
    "Operating Status",
    "Operation Classification",
    "Carrier Operation",
    "Cargo Carried",
];
const EMAIL_COLUMN: &str = "Scraped Email";

/// Column set of one output file. Fixed for the lifetime of that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// 16 record columns plus the scraped email.
    WithScrapedEmail,
    /// The 16 record columns only; no scraping is done for this layout.
    RecordOnly,
}

impl OutputLayout {
    pub fn includes_email(self) -> bool {
        matches!(self, OutputLayout::WithScrapedEmail)
    }

    pub fn header(self) -> Vec<&'static str> {
        let mut columns = BASE_COLUMNS.to_vec();
        if self.includes_email() {
            columns.push(EMAIL_COLUMN);
        }
        columns
    }

    pub fn width(self) -> usize {
        BASE_COLUMNS.len() + usize::from(self.includes_email())
    }
}

/// A qualifying record flattened into output-ready strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub legal_name: String,
    pub usdot: String,
    pub mc_mx_ff_numbers: String,
    pub entity_type: String,
    pub address: String,
    pub phone: String,
    pub power_units: String,
    pub drivers: String,
    pub mcs_150_form_date: String,
    pub mcs_150_mileage: String,
    pub mcs_150_mileage_year: String,
    pub out_of_service_date: String,
    pub operating_status: String,
    pub operation_classification: String,
    pub carrier_operation: String,
    pub cargo_carried: String,
    pub scraped_email: String,
}

impl From<&CarrierRecord> for OutputRow {
    fn from(record: &CarrierRecord) -> Self {
        OutputRow {
            legal_name: record.legal_name.clone(),
            usdot: record.usdot.clone(),
            mc_mx_ff_numbers: record.mc_mx_ff_numbers.clone(),
            entity_type: record.entity_type.clone(),
            address: record.physical_address.clone(),
            phone: format_phone(&record.phone),
            power_units: record.power_units.to_string(),
            drivers: record.drivers.clone(),
            mcs_150_form_date: record.mcs_150_form_date.clone(),
            mcs_150_mileage: record.mcs_150_mileage.clone(),
            mcs_150_mileage_year: record.mcs_150_mileage_year.clone(),
            out_of_service_date: record.out_of_service_date.clone(),
            operating_status: record.operating_status.clone(),
            operation_classification: join_list(&record.operation_classification),
            carrier_operation: join_list(&record.carrier_operation),
            cargo_carried: join_list(&record.cargo_carried),
            scraped_email: record.email.clone(),
        }
    }
}

impl OutputRow {
    pub fn fields(&self, layout: OutputLayout) -> Vec<&str> {
        let mut fields = vec![
            self.legal_name.as_str(),
            self.usdot.as_str(),
            self.mc_mx_ff_numbers.as_str(),
            self.entity_type.as_str(),
            self.address.as_str(),
            self.phone.as_str(),
            self.power_units.as_str(),
            self.drivers.as_str(),
            self.mcs_150_form_date.as_str(),
            self.mcs_150_mileage.as_str(),
            self.mcs_150_mileage_year.as_str(),
            self.out_of_service_date.as_str(),
            self.operating_status.as_str(),
            self.operation_classification.as_str(),
            self.carrier_operation.as_str(),
            self.cargo_carried.as_str(),
        ];
        if layout.includes_email() {
            fields.push(self.scraped_email.as_str());
        }
        fields
    }
}

/// Receives rows as the pipeline produces them.
pub trait RowSink {
    fn layout(&self) -> OutputLayout;
    fn append(&mut self, row: &OutputRow) -> Result<(), SinkError>;
}

/// Writes the header once on creation, then one flushed line per row so a
/// killed process still leaves every finished row on disk. Never opens a
/// file that already exists.
pub struct CsvSink {
    path: PathBuf,
    layout: OutputLayout,
    writer: csv::Writer<File>,
    rows: usize,
}

impl CsvSink {
    pub fn create(path: &Path, layout: OutputLayout) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| SinkError::Io {
                operation: "create",
                path: path.to_path_buf(),
                source,
            })?;

        let mut sink = CsvSink {
            path: path.to_path_buf(),
            layout,
            writer: csv::WriterBuilder::new().from_writer(file),
            rows: 0,
        };
        sink.write_line(&layout.header())?;
        info!("Created {:?} with {} columns", path, layout.width());
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn write_line(&mut self, fields: &[&str]) -> Result<(), SinkError> {
        self.writer
            .write_record(fields)
            .map_err(|source| SinkError::Csv {
                path: self.path.clone(),
                source,
            })?;
        self.writer.flush().map_err(|source| SinkError::Io {
            operation: "flush",
            path: self.path.clone(),
            source,
        })
    }
}

impl RowSink for CsvSink {
    fn layout(&self) -> OutputLayout {
        self.layout
    }

    fn append(&mut self, row: &OutputRow) -> Result<(), SinkError> {
        self.write_line(&row.fields(self.layout))?;
        self.rows += 1;
        Ok(())
    }
}
