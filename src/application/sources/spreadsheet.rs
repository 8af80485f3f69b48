//! Excel workbook source
//!
//! The first sheet is scanned row by row; the first string cell in a row
//! holding an accepted address is that row's entry. The sink is a copy of the
//! sheet with a heading row on top and one extra column per metadata key,
//! headed `[sm] <key>`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::vec::IntoIter;

use calamine::{DataType, Reader, Xlsx};
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet, XlsxError};
use tracing::debug;

use crate::application::sources::{Entry, MetadataSource, input_error, output_error, sink_path};
use crate::domain::metadata::Metadata;
use crate::infrastructure::address_resolver::is_accepted_address;
use crate::infrastructure::errors::SourceError;

const HEADER_PREFIX: &str = "[sm] ";
const HEADER_FONT: &str = "Calibri";
const HEADER_COLOR: u32 = 0xBADDAD;
const METADATA_COLUMN_WIDTH: f64 = 42.0;

/// Cell contents carried over from the input sheet
#[derive(Debug, Clone, PartialEq)]
enum CellValue {
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl CellValue {
    fn from_data(data: &DataType) -> Option<Self> {
        match data {
            DataType::Empty => None,
            DataType::String(s) => Some(Self::Text(s.clone())),
            DataType::Int(i) => Some(
                i32::try_from(*i).map_or_else(|_| Self::Text(i.to_string()), |n| Self::Number(f64::from(n))),
            ),
            DataType::Float(f) | DataType::DateTime(f) | DataType::Duration(f) => {
                Some(Self::Number(*f))
            }
            DataType::Bool(b) => Some(Self::Boolean(*b)),
            DataType::DateTimeIso(s) | DataType::DurationIso(s) => Some(Self::Text(s.clone())),
            DataType::Error(e) => Some(Self::Text(e.to_string())),
        }
    }
}

pub struct SpreadsheetSource {
    sink_path: PathBuf,
    sheet_name: String,
    cells: BTreeMap<(u32, u16), CellValue>,
    entries: IntoIter<Entry>,
    key_columns: HashMap<String, u16>,
    next_column: u16,
}

fn invalid_sheet(reason: impl ToString) -> SourceError {
    let reason = reason.to_string();
    let mut chars = reason.chars();
    let details = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    };
    SourceError::InvalidSheet { details }
}

fn write_error(error: XlsxError) -> SourceError {
    match error {
        XlsxError::IoError(error) => output_error(error),
        other => SourceError::Io(io::Error::other(other.to_string())),
    }
}

impl SpreadsheetSource {
    /// Load the first sheet of `path` and reserve `<stem>_out.xlsx` beside it.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let bytes = fs::read(path).map_err(input_error)?;
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(invalid_sheet)?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| invalid_sheet("The workbook has no sheets"))?;
        let range = workbook
            .worksheet_range(&sheet_name)
            .ok_or_else(|| invalid_sheet(format!("Sheet «{sheet_name}» not found")))?
            .map_err(invalid_sheet)?;

        let sink_path = sink_path(path);
        fs::copy(path, &sink_path).map_err(output_error)?;

        let mut cells = BTreeMap::new();
        let mut entries = Vec::new();
        let mut next_column = 0;
        if let (Some((first_row, first_col)), Some((_, last_col))) = (range.start(), range.end()) {
            next_column = u16::try_from(last_col + 1)
                .map_err(|_| invalid_sheet("The sheet has too many columns"))?;
            for (row_offset, row) in range.rows().enumerate() {
                let row_index = u32::try_from(row_offset)
                    .ok()
                    .and_then(|offset| first_row.checked_add(offset))
                    .ok_or_else(|| invalid_sheet("The sheet has too many rows"))?;
                let mut found = false;
                for (col_offset, data) in row.iter().enumerate() {
                    let Some(value) = CellValue::from_data(data) else {
                        continue;
                    };
                    let col_index = u32::try_from(col_offset)
                        .ok()
                        .and_then(|offset| first_col.checked_add(offset))
                        .and_then(|col| u16::try_from(col).ok())
                        .ok_or_else(|| invalid_sheet("The sheet has too many columns"))?;
                    if let CellValue::Text(text) = &value {
                        if !found && is_accepted_address(text) {
                            entries.push(Entry::at_row(text.clone(), row_index));
                            found = true;
                        }
                    }
                    cells.insert((row_index, col_index), value);
                }
            }
        }
        debug!(
            "Sheet «{sheet_name}» has {} addresses, dumping metadata to «{}».",
            entries.len(),
            sink_path.display()
        );

        Ok(Self {
            sink_path,
            sheet_name,
            cells,
            entries: entries.into_iter(),
            key_columns: HashMap::new(),
            next_column,
        })
    }

    fn column_for(&mut self, key: &str) -> u16 {
        if let Some(column) = self.key_columns.get(key) {
            return *column;
        }
        let column = self.next_column;
        debug!("Metadata «{key}» goes in column {column}.");
        self.key_columns.insert(key.to_string(), column);
        self.next_column = self.next_column.saturating_add(1);
        column
    }

    fn build_worksheet(&self) -> Result<Worksheet, XlsxError> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&self.sheet_name)?;

        // Original cells move one row down, below the heading row.
        for ((row, col), value) in &self.cells {
            match value {
                CellValue::Text(text) => worksheet.write_string(row + 1, *col, text)?,
                CellValue::Number(number) => worksheet.write_number(row + 1, *col, *number)?,
                CellValue::Boolean(flag) => worksheet.write_boolean(row + 1, *col, *flag)?,
            };
        }

        let header_format = Format::new()
            .set_font_name(HEADER_FONT)
            .set_background_color(Color::RGB(HEADER_COLOR))
            .set_pattern(FormatPattern::Solid);
        for (key, column) in &self.key_columns {
            worksheet.write_string_with_format(0, *column, format!("{HEADER_PREFIX}{key}"), &header_format)?;
            worksheet.set_column_width(*column, METADATA_COLUMN_WIDTH)?;
        }
        Ok(worksheet)
    }
}

impl MetadataSource for SpreadsheetSource {
    fn next_entry(&mut self) -> Option<Entry> {
        self.entries.next()
    }

    fn store(&mut self, entry: &Entry, metadata: &Metadata) -> Result<(), SourceError> {
        let Some(row) = entry.row else {
            return Ok(());
        };
        for (key, value) in metadata.iter() {
            let column = self.column_for(key);
            self.cells
                .insert((row, column), CellValue::Text(value.to_string()));
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SourceError> {
        let worksheet = self.build_worksheet().map_err(write_error)?;
        let mut workbook = Workbook::new();
        workbook.push_worksheet(worksheet);
        workbook.save(&self.sink_path).map_err(write_error)?;
        Ok(())
    }
}
