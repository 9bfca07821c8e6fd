use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::{EnrichedTable, SeriesRecord, SeriesTable, TableError, IMAGE_URL_COLUMN};

const BOM: char = '\u{feff}';

pub const ID_COLUMN: &str = "id";
pub const NAME_COLUMN: &str = "outter_name";

/// The three columns of an enriched row the poster needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub image_url: String,
}

fn open(path: &Path) -> Result<File, TableError> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TableError::NotFound(path.to_path_buf()),
        _ => TableError::Io(e),
    })
}

fn strip_bom(header: &mut [String]) {
    if let Some(first) = header.first_mut() {
        if first.starts_with(BOM) {
            *first = first.trim_start_matches(BOM).to_string();
        }
    }
}

/// Reads the source table: a header row followed by rows keyed by their
/// first cell. Rows with an empty first cell are skipped.
pub fn read_series_table(path: &Path) -> Result<SeriesTable, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(open(path)?);
    let mut rows = reader.records();

    let mut header: Vec<String> = match rows.next() {
        Some(row) => row?.iter().map(String::from).collect(),
        None => return Err(TableError::Empty(path.to_path_buf())),
    };
    strip_bom(&mut header);
    if header.iter().all(|cell| cell.trim().is_empty()) {
        return Err(TableError::Empty(path.to_path_buf()));
    }

    let mut records = Vec::new();
    for row in rows {
        let fields = row?.iter().map(String::from).collect();
        if let Some(record) = SeriesRecord::from_fields(fields) {
            records.push(record);
        }
    }

    Ok(SeriesTable { header, records })
}

/// Rewrites `path` with the enriched rows, in the order given.
pub fn write_enriched_table(path: &Path, table: &EnrichedTable) -> Result<(), TableError> {
    let mut file = File::create(path)?;
    // Spreadsheet tools need the BOM to detect UTF-8.
    write!(file, "{BOM}")?;

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
    writer.write_record(
        table
            .header
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(IMAGE_URL_COLUMN)),
    )?;
    for enriched in &table.records {
        writer.write_record(
            enriched
                .record
                .fields
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(enriched.image_url.as_str())),
        )?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = table.records.len(), "wrote enriched table");
    Ok(())
}

/// Reads the enriched table by column name. Rows without an id are skipped;
/// rows missing a name or image URL are skipped with a warning. Fails if
/// `id`, `outter_name` or `image_url` is absent or no usable row remains.
pub fn read_candidates(path: &Path) -> Result<Vec<Candidate>, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(open(path)?);

    let mut header: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    strip_bom(&mut header);

    let column = |name: &'static str| {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or(TableError::MissingColumn(name))
    };
    let id_idx = column(ID_COLUMN)?;
    let name_idx = column(NAME_COLUMN)?;
    let url_idx = column(IMAGE_URL_COLUMN)?;

    let mut candidates = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cell = |idx: usize| row.get(idx).unwrap_or_default().trim().to_string();
        let id = cell(id_idx);
        if id.is_empty() {
            continue;
        }
        let (name, image_url) = (cell(name_idx), cell(url_idx));
        if name.is_empty() || image_url.is_empty() {
            warn!(%id, "row lacks a name or image url, skipping");
            continue;
        }
        candidates.push(Candidate {
            id,
            name,
            image_url,
        });
    }

    if candidates.is_empty() {
        return Err(TableError::Empty(path.to_path_buf()));
    }
    Ok(candidates)
}
