//! Raw spreadsheet rows → typed [`PaymentRecord`]s.
//!
//! Row-level problems never fail the load: an unparseable date becomes
//! `None`, an unparseable amount becomes 0, and the row is kept. Only a
//! document without a usable column structure is rejected.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ReconError;
use crate::model::{Dataset, PaymentRecord};
use crate::money::parse_amount;

/// Canonical column headers of the payment form, in positional order.
pub const CANONICAL_HEADERS: [&str; 4] = ["Nama Siswa", "Kelas", "Tanggal Bayar", "Jumlah Bayar"];

/// Google Forms prepends a submission timestamp column; it is never a payment field.
const TIMESTAMP_HEADER: &str = "Timestamp";

/// Date formats tried in order when none are configured. Slash dates are
/// month-first, matching how Google Sheets exports US-locale form responses.
pub fn default_date_formats() -> Vec<String> {
    [
        "%Y-%m-%d",
        "%Y-%m-%d %H:%M:%S",
        "%m/%d/%Y",
        "%m/%d/%Y %H:%M:%S",
        "%d-%m-%Y",
        "%Y/%m/%d",
    ]
    .iter()
    .map(|f| f.to_string())
    .collect()
}

/// One unparsed row: the four logical fields as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub student_name: String,
    pub class_name: String,
    pub date_text: String,
    pub amount_text: String,
}

impl RawRow {
    fn is_blank(&self) -> bool {
        self.student_name.trim().is_empty()
            && self.class_name.trim().is_empty()
            && self.date_text.trim().is_empty()
            && self.amount_text.trim().is_empty()
    }
}

/// How a delimited document is laid out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvLayout {
    /// Lines to discard before the header row.
    pub skip_rows: usize,
    /// Field delimiter; sniffed from the first lines when `None`.
    pub delimiter: Option<u8>,
}

/// Try each format as a date, then as a date-time truncated to its date.
pub fn parse_date(text: &str, formats: &[String]) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    formats.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(text, fmt)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(text, fmt).ok().map(|dt| dt.date()))
    })
}

/// Coerce raw rows into payment records, preserving input order.
pub fn normalize_rows(rows: Vec<RawRow>, date_formats: &[String]) -> Vec<PaymentRecord> {
    let mut bad_dates = 0usize;
    let mut bad_amounts = 0usize;

    let records: Vec<PaymentRecord> = rows
        .into_iter()
        .filter(|row| !row.is_blank())
        .map(|row| {
            let payment_date = parse_date(&row.date_text, date_formats);
            if payment_date.is_none() {
                bad_dates += 1;
            }
            let amount_minor = parse_amount(&row.amount_text).unwrap_or_else(|| {
                bad_amounts += 1;
                0
            });
            PaymentRecord {
                student_name: row.student_name.trim().to_string(),
                class_name: row.class_name.trim().to_string(),
                payment_date,
                amount_minor,
            }
        })
        .collect();

    if bad_dates > 0 || bad_amounts > 0 {
        log::debug!(
            "normalized {} rows: {} without a usable date, {} amounts coerced to 0",
            records.len(),
            bad_dates,
            bad_amounts,
        );
    }

    records
}

/// Parse a delimited document into raw rows.
///
/// Columns are found by their canonical header names when all four are
/// present; otherwise the first four columns (after dropping a `Timestamp`
/// column) are taken positionally.
pub fn load_csv_rows(csv_data: &str, layout: &CsvLayout) -> Result<Vec<RawRow>, ReconError> {
    let content = skip_lines(csv_data.trim_start_matches('\u{feff}'), layout.skip_rows);
    if content.trim().is_empty() {
        return Err(ReconError::SourceMalformed(format!(
            "no header row (after skipping {} line(s))",
            layout.skip_rows
        )));
    }

    let delimiter = layout.delimiter.unwrap_or_else(|| sniff_delimiter(content));
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::SourceMalformed(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let [name_idx, class_idx, date_idx, amount_idx] = resolve_columns(&headers)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            ReconError::SourceMalformed(format!("record {}: {e}", line + 1))
        })?;
        let field = |i: usize| record.get(i).unwrap_or("").to_string();
        let row = RawRow {
            student_name: field(name_idx),
            class_name: field(class_idx),
            date_text: field(date_idx),
            amount_text: field(amount_idx),
        };
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Load, normalize, and wrap a document in a [`Dataset`].
pub fn load_dataset(
    csv_data: &str,
    layout: &CsvLayout,
    date_formats: &[String],
) -> Result<Dataset, ReconError> {
    let rows = load_csv_rows(csv_data, layout)?;
    Ok(Dataset::new(normalize_rows(rows, date_formats)))
}

fn resolve_columns(headers: &[String]) -> Result<[usize; 4], ReconError> {
    let by_name = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    if let [Some(a), Some(b), Some(c), Some(d)] = CANONICAL_HEADERS.map(by_name) {
        return Ok([a, b, c, d]);
    }

    let positional: Vec<usize> = (0..headers.len())
        .filter(|&i| !headers[i].eq_ignore_ascii_case(TIMESTAMP_HEADER))
        .collect();
    match positional.as_slice() {
        [a, b, c, d, ..] => Ok([*a, *b, *c, *d]),
        _ => Err(ReconError::SourceMalformed(format!(
            "expected 4 columns ({}), found {}: [{}]",
            CANONICAL_HEADERS.join(", "),
            positional.len(),
            headers.join(", "),
        ))),
    }
}

fn skip_lines(content: &str, n: usize) -> &str {
    if n == 0 {
        return content;
    }
    match content.match_indices('\n').nth(n - 1) {
        Some((idx, _)) => &content[idx + 1..],
        None => "",
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

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

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn parse_date_formats() {
        let formats = default_date_formats();
        assert_eq!(parse_date("2024-03-09", &formats), ymd(2024, 3, 9));
        assert_eq!(parse_date("3/9/2024", &formats), ymd(2024, 3, 9));
        assert_eq!(parse_date("3/15/2024 10:15:00", &formats), ymd(2024, 3, 15));
        assert_eq!(parse_date("2024-03-09 07:30:00", &formats), ymd(2024, 3, 9));
        assert_eq!(parse_date("09-03-2024", &formats), ymd(2024, 3, 9));
        assert_eq!(parse_date("kemarin", &formats), None);
        assert_eq!(parse_date("", &formats), None);
        assert_eq!(parse_date("2024-02-30", &formats), None);
    }

    #[test]
    fn normalize_keeps_malformed_rows() {
        let rows = vec![
            RawRow {
                student_name: " Ani ".into(),
                class_name: "7A".into(),
                date_text: "2024-03-09".into(),
                amount_text: "Rp1.000.000".into(),
            },
            RawRow {
                student_name: "Budi".into(),
                class_name: "7B".into(),
                date_text: "not a date".into(),
                amount_text: "seribu".into(),
            },
        ];
        let records = normalize_rows(rows, &default_date_formats());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].student_name, "Ani");
        assert_eq!(records[0].amount_minor, 100_000_000);
        assert_eq!(records[1].payment_date, None);
        assert_eq!(records[1].amount_minor, 0);
    }

    #[test]
    fn load_csv_canonical_headers() {
        let csv = "\
Nama Siswa,Kelas,Tanggal Bayar,Jumlah Bayar
Ani,7A,2024-03-09,1000000
Budi,7B,2024-03-15,\"400,000\"
";
        let rows = load_csv_rows(csv, &CsvLayout::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].amount_text, "400,000");
    }

    #[test]
    fn load_csv_drops_timestamp_column() {
        let csv = "\
Timestamp,Nama,Kelas,Tanggal,Nominal
3/9/2024 10:00:00,Ani,7A,3/9/2024,1000000
";
        let rows = load_csv_rows(csv, &CsvLayout::default()).unwrap();
        assert_eq!(rows[0].student_name, "Ani");
        assert_eq!(rows[0].class_name, "7A");
        assert_eq!(rows[0].date_text, "3/9/2024");
        assert_eq!(rows[0].amount_text, "1000000");
    }

    #[test]
    fn load_csv_headers_by_name_in_any_order() {
        let csv = "\
Jumlah Bayar,Kelas,Nama Siswa,Tanggal Bayar
500000,8A,Citra,2024-03-01
";
        let rows = load_csv_rows(csv, &CsvLayout::default()).unwrap();
        assert_eq!(rows[0].student_name, "Citra");
        assert_eq!(rows[0].amount_text, "500000");
    }

    #[test]
    fn load_csv_skip_rows_and_sniffed_delimiter() {
        let csv = "\
REKAP SPP SEMESTER GENAP
dicetak 2024-04-01
Nama Siswa;Kelas;Tanggal Bayar;Jumlah Bayar
Ani;7A;2024-03-09;Rp1.000.000
";
        let layout = CsvLayout { skip_rows: 2, delimiter: None };
        let rows = load_csv_rows(csv, &layout).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount_text, "Rp1.000.000");
    }

    #[test]
    fn load_csv_skips_blank_rows() {
        let csv = "\
Nama Siswa,Kelas,Tanggal Bayar,Jumlah Bayar
Ani,7A,2024-03-09,1000000
,,,
Budi,7B,,
";
        let rows = load_csv_rows(csv, &CsvLayout::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].student_name, "Budi");
    }

    #[test]
    fn load_csv_rejects_too_few_columns() {
        let csv = "name,amount\nAni,1000\n";
        let err = load_csv_rows(csv, &CsvLayout::default()).unwrap_err();
        assert!(matches!(err, ReconError::SourceMalformed(_)));
        assert!(err.to_string().contains("expected 4 columns"));
    }

    #[test]
    fn load_csv_rejects_empty_document() {
        let err = load_csv_rows("", &CsvLayout::default()).unwrap_err();
        assert!(matches!(err, ReconError::SourceMalformed(_)));

        let layout = CsvLayout { skip_rows: 5, delimiter: None };
        let err = load_csv_rows("a,b,c,d\n", &layout).unwrap_err();
        assert!(err.to_string().contains("no header row"));
    }

    #[test]
    fn skip_lines_offsets() {
        assert_eq!(skip_lines("a\nb\nc", 0), "a\nb\nc");
        assert_eq!(skip_lines("a\nb\nc", 1), "b\nc");
        assert_eq!(skip_lines("a\nb\nc", 2), "c");
        assert_eq!(skip_lines("a\nb\nc", 3), "");
    }

    #[test]
    fn sniff_semicolon_and_tab() {
        assert_eq!(sniff_delimiter("a;b;c;d\n1;2;3;4\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc\td\n1\t2\t3\t4\n"), b'\t');
        assert_eq!(sniff_delimiter("a,b,c,d\n1,2,3,4\n"), b',');
    }
}
