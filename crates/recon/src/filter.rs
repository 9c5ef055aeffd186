use std::collections::{BTreeSet, HashSet};

use chrono::Datelike;

use crate::model::{ClassFilter, PaymentRecord, Period, ReconciliationRow, StudentIdentity};

/// Deduplicated (name, class) pairs across all records, in first-seen order.
/// Records without a date or amount still contribute their student.
pub fn student_identities(records: &[PaymentRecord]) -> Vec<StudentIdentity> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert((r.student_name.as_str(), r.class_name.as_str())))
        .map(PaymentRecord::identity)
        .collect()
}

/// Records dated inside `period`. Undated records never match.
pub fn period_payments(records: &[PaymentRecord], period: Period) -> Vec<&PaymentRecord> {
    records
        .iter()
        .filter(|r| r.payment_date.is_some_and(|d| period.contains(d)))
        .collect()
}

/// The subset of `payments` made on or before day `cutoff_day` of their month.
pub fn on_time_payments<'a>(
    payments: &[&'a PaymentRecord],
    cutoff_day: u32,
) -> Vec<&'a PaymentRecord> {
    payments
        .iter()
        .copied()
        .filter(|r| r.payment_date.is_some_and(|d| d.day() <= cutoff_day))
        .collect()
}

/// Keep rows of the requested class; `ClassFilter::All` keeps everything.
pub fn filter_by_class(rows: Vec<ReconciliationRow>, class: &ClassFilter) -> Vec<ReconciliationRow> {
    rows.into_iter().filter(|r| class.matches(&r.class_name)).collect()
}

/// Sort by (class, name) ascending using byte-wise string order.
pub fn sort_rows(rows: &mut [ReconciliationRow]) {
    rows.sort_by(|a, b| {
        a.class_name
            .cmp(&b.class_name)
            .then_with(|| a.student_name.cmp(&b.student_name))
    });
}

/// Months that have at least one dated payment, ascending.
pub fn available_periods(records: &[PaymentRecord]) -> Vec<Period> {
    records
        .iter()
        .filter_map(|r| r.payment_date.map(Period::containing))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct class names, ascending.
pub fn available_classes(records: &[PaymentRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.class_name.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
