pub mod ai;
pub mod error;
pub mod scraper;
pub mod table;

pub use error::{AiError, ScrapeError, TableError};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Column appended to the source header in the enriched table.
pub const IMAGE_URL_COLUMN: &str = "image_url";

/// One row of the source table. The first cell is the series id; every cell,
/// the id included, is kept verbatim in `fields` so it can be written back out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRecord {
    pub id: String,
    pub fields: Vec<String>,
}

impl SeriesRecord {
    /// Returns `None` for rows without an id.
    pub fn from_fields(fields: Vec<String>) -> Option<Self> {
        let id = fields.first()?.trim().to_string();
        if id.is_empty() {
            return None;
        }
        Some(Self { id, fields })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub record: SeriesRecord,
    pub image_url: String,
}

impl EnrichedRecord {
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

#[derive(Debug, Clone)]
pub struct SeriesTable {
    pub header: Vec<String>,
    pub records: Vec<SeriesRecord>,
}

/// Scraper output. `header` is the source header; the writer appends
/// [`IMAGE_URL_COLUMN`].
#[derive(Debug, Clone)]
pub struct EnrichedTable {
    pub header: Vec<String>,
    pub records: Vec<EnrichedRecord>,
}

/// Installs the fmt subscriber used by both binaries. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn record_id_is_trimmed_first_cell() {
        let record = SeriesRecord::from_fields(fields(&[" 4363 ", "Model Y"])).unwrap();
        assert_eq!(record.id, "4363");
        assert_eq!(record.fields[0], " 4363 ");
    }

    #[test]
    fn rows_without_id_are_rejected() {
        assert!(SeriesRecord::from_fields(fields(&["  ", "orphan"])).is_none());
        assert!(SeriesRecord::from_fields(Vec::new()).is_none());
    }
}
