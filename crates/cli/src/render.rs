//! Terminal rendering of reports and selector listings.

use std::io::Write;

use spp_recon::money::format_grouped;
use spp_recon::{Period, ReconciliationRow, Report};

use crate::util::{display_width, pad_left, pad_right};

const HEADERS: [&str; 7] = [
    "Nama Siswa",
    "Kelas",
    "Tanggal Bayar",
    "Jumlah Bayar",
    "Status",
    "Total Bayar Bulan Ini",
    "Kekurangan",
];

/// Columns rendered right-aligned (amounts).
const NUMERIC: [bool; 7] = [false, false, false, true, false, true, true];

/// Names longer than this are truncated with "..".
const MAX_NAME_WIDTH: usize = 32;

pub(crate) fn rupiah(minor: i64) -> String {
    format!("Rp {}", format_grouped(minor))
}

fn cells(row: &ReconciliationRow) -> [String; 7] {
    let (date, amount) = match row.last_payment {
        Some(last) => (last.date.format("%Y-%m-%d").to_string(), rupiah(last.amount_minor)),
        None => ("-".to_string(), "-".to_string()),
    };
    [
        row.student_name.clone(),
        row.class_name.clone(),
        date,
        amount,
        row.status.label().to_string(),
        rupiah(row.total_paid_minor),
        rupiah(row.shortfall_minor),
    ]
}

/// Title, aligned table, and summary footer.
pub(crate) fn write_table(out: &mut impl Write, report: &Report) -> std::io::Result<()> {
    let class = report.meta.class.as_deref().unwrap_or("Semua");
    writeln!(out, "{} (Kelas: {})", report.title(), class)?;
    writeln!(out)?;

    if report.rows.is_empty() {
        writeln!(out, "Tidak ada siswa untuk kelas ini.")?;
        return Ok(());
    }

    let rows: Vec<[String; 7]> = report.rows.iter().map(cells).collect();
    let mut widths: Vec<usize> = HEADERS.iter().map(|h| display_width(h)).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(display_width(cell));
        }
    }
    widths[0] = widths[0].min(MAX_NAME_WIDTH);

    let line = |cols: &[String]| -> String {
        cols.iter()
            .enumerate()
            .map(|(i, c)| {
                if NUMERIC[i] {
                    pad_left(c, widths[i])
                } else {
                    pad_right(c, widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    writeln!(out, "{}", line(&header))?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join("  "))?;
    for row in &rows {
        writeln!(out, "{}", line(row))?;
    }

    writeln!(out)?;
    write_summary(out, report)
}

pub(crate) fn write_summary(out: &mut impl Write, report: &Report) -> std::io::Result<()> {
    let s = &report.summary;
    writeln!(
        out,
        "{} siswa: {} lunas, {} belum lunas",
        s.students, s.paid, s.unpaid
    )?;
    writeln!(out, "Total terkumpul:  {}", rupiah(s.total_paid_minor))?;
    writeln!(out, "Total kekurangan: {}", rupiah(s.total_shortfall_minor))
}

/// One-line summary for stderr when the report itself goes to stdout or a file.
pub(crate) fn summary_line(report: &Report) -> String {
    let s = &report.summary;
    format!(
        "{}: {} student(s), {} paid, {} unpaid, collected {}, shortfall {}",
        report.title(),
        s.students,
        s.paid,
        s.unpaid,
        rupiah(s.total_paid_minor),
        rupiah(s.total_shortfall_minor),
    )
}

/// The selectors a user can pick from: months with payments and classes.
pub(crate) fn write_selectors(
    out: &mut impl Write,
    periods: &[Period],
    classes: &[String],
) -> std::io::Result<()> {
    writeln!(out, "Periode:")?;
    if periods.is_empty() {
        writeln!(out, "  (belum ada pembayaran bertanggal)")?;
    }
    for period in periods {
        writeln!(
            out,
            "  {}-{:02}  {}",
            period.year(),
            period.month(),
            period
        )?;
    }
    writeln!(out)?;
    writeln!(out, "Kelas:")?;
    writeln!(out, "  Semua")?;
    for class in classes {
        writeln!(out, "  {}", class)?;
    }
    Ok(())
}
