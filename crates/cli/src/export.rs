//! CSV export of a report: one row per student, Indonesian column names.
//!
//! `Tanggal Bayar` / `Jumlah Bayar` are the date and amount of the student's
//! latest payment in the period (empty when there is none). Amounts are
//! plain rupiah without grouping (`1000000`, `1500.50`) so spreadsheets read
//! them as numbers.

use std::io::Write;

use spp_recon::money::format_minor;
use spp_recon::Report;

pub(crate) const EXPORT_HEADER: [&str; 7] = [
    "Nama Siswa",
    "Kelas",
    "Tanggal Bayar",
    "Jumlah Bayar",
    "Status",
    "Total Bayar Bulan Ini",
    "Kekurangan",
];

pub(crate) fn write_csv(out: impl Write, report: &Report) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new().from_writer(out);
    wtr.write_record(EXPORT_HEADER)?;

    for row in &report.rows {
        let (date, amount) = match row.last_payment {
            Some(last) => (
                last.date.format("%Y-%m-%d").to_string(),
                format_minor(last.amount_minor),
            ),
            None => (String::new(), String::new()),
        };
        wtr.write_record([
            row.student_name.as_str(),
            row.class_name.as_str(),
            date.as_str(),
            amount.as_str(),
            row.status.label(),
            format_minor(row.total_paid_minor).as_str(),
            format_minor(row.shortfall_minor).as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use spp_recon::engine::run;
    use spp_recon::model::PaymentRecord;
    use spp_recon::{Dataset, Period, ReportQuery, ReportSettings};

    fn record(name: &str, class: &str, date: (i32, u32, u32), amount: i64) -> PaymentRecord {
        PaymentRecord {
            student_name: name.into(),
            class_name: class.into(),
            payment_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            amount_minor: amount,
        }
    }

    #[test]
    fn exports_one_row_per_student() {
        let dataset = Dataset::new(vec![
            record("Ani", "7A", (2024, 3, 9), 100_000_000),
            record("Budi", "7B", (2024, 3, 15), 40_000_000),
            record("Citra, S.", "7A", (2024, 2, 1), 100_000_000),
        ]);
        let query = ReportQuery {
            period: Period::new(2024, 3),
            ..ReportQuery::default()
        };
        let report = run(&dataset, &query, &ReportSettings::default());

        let mut buf = Vec::new();
        write_csv(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(
            text,
            "Nama Siswa,Kelas,Tanggal Bayar,Jumlah Bayar,Status,Total Bayar Bulan Ini,Kekurangan\n\
             Ani,7A,2024-03-09,1000000,Lunas,1000000,0\n\
             \"Citra, S.\",7A,,,Belum Lunas,0,1000000\n\
             Budi,7B,2024-03-15,400000,Belum Lunas,400000,600000\n"
        );
    }
}
