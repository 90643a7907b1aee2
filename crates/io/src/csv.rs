// CSV/TSV export reading

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use membersync_recon::error::ReconError;
use membersync_recon::model::SourceRow;
use membersync_recon::source::SourceRows;
use membersync_recon::value::{parse_datetime, CellValue};

/// Bytes read up front to pick the delimiter.
const SNIFF_BYTES: u64 = 64 * 1024;

/// Open a delimited export. The first record is the header row.
///
/// Records are read from the file one at a time; only the leading sample
/// used for delimiter detection is buffered.
pub fn open_rows(path: &Path) -> Result<SourceRows, ReconError> {
    let open = || File::open(path).map_err(|e| ReconError::file_access(path, e.to_string()));

    let mut sample = Vec::new();
    open()?
        .take(SNIFF_BYTES)
        .read_to_end(&mut sample)
        .map_err(|e| ReconError::file_access(path, e.to_string()))?;
    let delimiter = sniff_delimiter(&decode_text(&sample));

    rows_from_reader(open()?, delimiter)
}

fn rows_from_reader<R: Read + 'static>(reader: R, delimiter: u8) -> Result<SourceRows, ReconError> {
    let mut records = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader)
        .into_byte_records();

    let headers: Vec<String> = match records.next() {
        None => return Ok(Box::new(std::iter::empty())),
        Some(record) => record
            .map_err(|e| ReconError::Source(e.to_string()))?
            .iter()
            .map(|field| decode_text(field).into_owned())
            .collect(),
    };

    Ok(Box::new(records.map(move |record| {
        let record = record.map_err(|e| ReconError::Source(e.to_string()))?;
        let values = record
            .iter()
            .map(|field| cell_from_field(&decode_text(field)))
            .collect();
        Ok(SourceRow::new(&headers, values))
    })))
}

/// UTF-8 when valid, otherwise Windows-1252 (what Excel writes for CSV).
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0,
    }
}

/// Delimited text carries no types: blanks are empty and ISO dates become
/// date values. Everything else stays text for the normalizer to coerce.
fn cell_from_field(field: &str) -> CellValue {
    if field.trim().is_empty() {
        return CellValue::Empty;
    }
    match parse_datetime(field) {
        Some(dt) => CellValue::DateTime(dt),
        None => CellValue::text(field),
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Higher field count breaks ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn collect(rows: SourceRows) -> Vec<SourceRow> {
        rows.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "MID;First Name;Town\n100001;Ann;Ottawa\n100002;Bob;Hull\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "MID,First Name,Town\n100001,Ann,Ottawa\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "MID\tFirst Name\tTown\n100001\tAnn\tOttawa\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "MID;Address Line 1;Town\n100001;\"12 King St, Apt 4\";Ottawa\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_rows_are_keyed_by_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("members.csv");
        fs::write(
            &path,
            "MID,First Name,Date of Birth,Town\n100001, Ann ,1990-11-30,Ottawa\n100002,Bob\n",
        )
        .unwrap();

        let rows = collect(open_rows(&path).unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("MID"), &CellValue::text("100001"));
        assert_eq!(rows[0].get("First Name"), &CellValue::text(" Ann "));
        assert_eq!(rows[0].get("Date of Birth"), &CellValue::date(1990, 11, 30));
        // Short rows are padded to the header width
        assert_eq!(rows[1].len(), 4);
        assert_eq!(rows[1].get("Town"), &CellValue::text(""));
    }

    #[test]
    fn test_blank_fields_are_empty() {
        let rows = collect(rows_from_reader("MID,Email Address\n100001,\n".as_bytes(), b',').unwrap());
        assert_eq!(rows[0].get("Email Address"), &CellValue::Empty);
    }

    #[test]
    fn test_empty_file_has_no_rows() {
        let rows = collect(rows_from_reader(std::io::empty(), b',').unwrap());
        assert!(rows.is_empty());
    }

    #[test]
    fn test_windows_1252_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("members.csv");
        let mut bytes = b"MID,County\n100001,Qu".to_vec();
        bytes.push(0xE9); // é in Windows-1252
        bytes.extend_from_slice(b"bec\n");
        fs::write(&path, bytes).unwrap();

        let rows = collect(open_rows(&path).unwrap());
        assert_eq!(rows[0].get("County"), &CellValue::text("Québec"));
    }

    #[test]
    fn test_sniff_sample_is_bounded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("members.csv");
        let mut content = String::from("MID;First Name;Town\n");
        let mut id = 100001;
        while content.len() < 2 * SNIFF_BYTES as usize {
            content.push_str(&format!("{id};Ann;Ottawa\n"));
            id += 1;
        }
        fs::write(&path, &content).unwrap();

        let mut rows = open_rows(&path).unwrap();
        let first = rows.next().unwrap().unwrap();
        assert_eq!(first.get("Town"), &CellValue::text("Ottawa"));
        // Rows past the sniffed sample still stream through
        let last = rows.last().unwrap().unwrap();
        assert_eq!(last.get("MID"), &CellValue::text((id - 1).to_string()));
    }

    #[test]
    fn test_missing_file_is_file_access() {
        let dir = tempdir().unwrap();
        let err = open_rows(&dir.path().join("gone.csv")).err().unwrap();
        assert!(matches!(err, ReconError::FileAccess { .. }));
    }
}
