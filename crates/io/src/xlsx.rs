// Excel-family export reading (xlsx, xls, xlsb, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use membersync_recon::error::ReconError;
use membersync_recon::model::SourceRow;
use membersync_recon::source::SourceRows;
use membersync_recon::value::{midnight, parse_datetime, CellValue};

/// Open `sheet` of the workbook at `path`. The first row of the used range
/// is the header row.
pub fn open_rows(path: &Path, sheet: &str) -> Result<SourceRows, ReconError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ReconError::file_access(path, format!("failed to open workbook: {e}")))?;

    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(ReconError::Source(format!(
            "worksheet '{sheet}' not found in {}",
            path.display()
        )));
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| ReconError::Source(format!("failed to read sheet '{sheet}': {e}")))?;
    log::debug!("sheet '{sheet}' has {:?} used cells", range.get_size());

    Ok(Box::new(SheetRows::new(range)))
}

/// Owned row cursor over a worksheet range.
struct SheetRows {
    range: Range<Data>,
    headers: Vec<String>,
    next_row: usize,
    height: usize,
    width: usize,
}

impl SheetRows {
    fn new(range: Range<Data>) -> Self {
        let (height, width) = range.get_size();
        let headers = (0..width)
            .map(|col| {
                range
                    .get((0, col))
                    .map(|cell| cell_value(cell).to_string())
                    .unwrap_or_default()
            })
            .collect();
        Self {
            range,
            headers,
            next_row: 1,
            height,
            width,
        }
    }
}

impl Iterator for SheetRows {
    type Item = Result<SourceRow, ReconError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row >= self.height {
            return None;
        }
        let row = self.next_row;
        self.next_row += 1;
        let values = (0..self.width)
            .map(|col| self.range.get((row, col)).map(cell_value).unwrap_or_default())
            .collect();
        Some(Ok(SourceRow::new(&self.headers, values)))
    }
}

/// Map a calamine cell onto the engine's value type.
pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::text(format!("#{e:?}")),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64())
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::text(s.clone())),
        Data::DurationIso(s) => CellValue::text(s.clone()),
    }
}

/// Convert a 1900-system serial date to a timestamp.
///
/// Serials below 60 predate Excel's phantom 1900-02-29 and use a base one
/// day later.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let base = if serial < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    midnight(base).checked_add_signed(Duration::days(days) + Duration::seconds(seconds))
}
