use anyhow::{Context, Result, bail};
use std::fs::File;
use std::path::Path;

/// Free-text address column geocoding queries are built from
pub const ADDRESS_COLUMN: &str = "Approx. Address";
/// Latitude column, stored as a decimal-degree string
pub const LAT_COLUMN: &str = "Lat";
/// Longitude column, stored as a decimal-degree string
pub const LON_COLUMN: &str = "Lon";

/// A CSV table held in memory: one header row plus string cells, with
/// column and row order preserved from the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RowSet {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a CSV file with a header row.
    pub fn read_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        let mut reader = csv::Reader::from_reader(file);

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(String::from)
            .collect();
        if headers.is_empty() {
            bail!("CSV has no header row.");
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context("Failed to read CSV record")?;
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Write the table back out with the original header and column
    /// order; only cell values may have changed.
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = csv::Writer::from_writer(file);

        writer
            .write_record(&self.headers)
            .context("Failed to write CSV header")?;
        for row in &self.rows {
            writer
                .write_record(row)
                .context("Failed to write CSV record")?;
        }
        writer.flush().context("Failed to flush CSV output")?;

        Ok(())
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Position of a named column in the header, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn value(&self, row: usize, column: usize) -> &str {
        &self.rows[row][column]
    }

    pub fn set_value(&mut self, row: usize, column: usize, value: String) {
        self.rows[row][column] = value;
    }
}
