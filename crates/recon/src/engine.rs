use std::collections::{HashMap, HashSet};

use crate::filter::{filter_by_class, on_time_payments, period_payments, sort_rows};
use crate::model::{
    Dataset, GroupingKey, LastPayment, PaymentRecord, PaymentStatus, ReconciliationRow, Report,
    ReportMeta, ReportQuery, ReportSummary, StudentIdentity,
};

/// Default monthly fee: Rp 1.000.000, in minor units.
pub const DEFAULT_MONTHLY_FEE_MINOR: i64 = 100_000_000;

/// Payments on or before this day of the month count as on time.
pub const DEFAULT_ON_TIME_DAY: u32 = 10;

/// The knobs of a reconciliation run that are not part of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    pub monthly_fee_minor: i64,
    pub on_time_day: u32,
    pub grouping: GroupingKey,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            monthly_fee_minor: DEFAULT_MONTHLY_FEE_MINOR,
            on_time_day: DEFAULT_ON_TIME_DAY,
            grouping: GroupingKey::Student,
        }
    }
}

/// Run one query against a dataset: filter by period, reconcile every
/// student, then apply the class filter and sort.
pub fn run(dataset: &Dataset, query: &ReportQuery, settings: &ReportSettings) -> Report {
    let (in_period, on_time) = match query.period {
        Some(period) => {
            let in_period = period_payments(dataset.records(), period);
            let on_time = on_time_payments(&in_period, settings.on_time_day);
            (in_period, on_time)
        }
        None => (Vec::new(), Vec::new()),
    };

    let rows = reconcile(
        dataset.identities(),
        &on_time,
        &in_period,
        settings.monthly_fee_minor,
        settings.grouping,
    );
    let mut rows = filter_by_class(rows, &query.class);
    sort_rows(&mut rows);

    log::debug!(
        "reconciled {} student(s) for {:?}: {} payment(s) in period, {} on time",
        rows.len(),
        query.period,
        in_period.len(),
        on_time.len(),
    );

    Report {
        meta: ReportMeta {
            period: query.period,
            class: query.class.as_class().map(str::to_string),
            monthly_fee_minor: settings.monthly_fee_minor,
            on_time_day: settings.on_time_day,
            grouping: settings.grouping,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary: summarize(&rows),
        rows,
    }
}

/// One row per identity. Status comes from `on_time`, totals from
/// `in_period`; both are matched to identities by `grouping`.
pub fn reconcile(
    identities: &[StudentIdentity],
    on_time: &[&PaymentRecord],
    in_period: &[&PaymentRecord],
    monthly_fee_minor: i64,
    grouping: GroupingKey,
) -> Vec<ReconciliationRow> {
    let paid: HashSet<GroupKey<'_>> = on_time
        .iter()
        .map(|r| group_key(&r.student_name, &r.class_name, grouping))
        .collect();

    let mut totals: HashMap<GroupKey<'_>, (i64, Option<LastPayment>)> = HashMap::new();
    for r in in_period {
        let entry = totals
            .entry(group_key(&r.student_name, &r.class_name, grouping))
            .or_insert((0, None));
        entry.0 = entry.0.saturating_add(r.amount_minor);
        if let Some(date) = r.payment_date {
            // Latest date wins; on a tie the later row wins.
            if entry.1.map_or(true, |last| date >= last.date) {
                entry.1 = Some(LastPayment {
                    date,
                    amount_minor: r.amount_minor,
                });
            }
        }
    }

    identities
        .iter()
        .map(|id| {
            let key = group_key(&id.student_name, &id.class_name, grouping);
            let (total, last_payment) = totals.get(&key).copied().unwrap_or((0, None));
            let status = if paid.contains(&key) {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Unpaid
            };
            ReconciliationRow {
                student_name: id.student_name.clone(),
                class_name: id.class_name.clone(),
                status,
                total_paid_minor: total,
                shortfall_minor: monthly_fee_minor.saturating_sub(total).max(0),
                last_payment,
            }
        })
        .collect()
}

/// Aggregate counts and totals over the (already filtered) rows.
pub fn summarize(rows: &[ReconciliationRow]) -> ReportSummary {
    rows.iter().fold(ReportSummary::default(), |mut s, r| {
        s.students += 1;
        match r.status {
            PaymentStatus::Paid => s.paid += 1,
            PaymentStatus::Unpaid => s.unpaid += 1,
        }
        s.total_paid_minor = s.total_paid_minor.saturating_add(r.total_paid_minor);
        s.total_shortfall_minor = s.total_shortfall_minor.saturating_add(r.shortfall_minor);
        s
    })
}

type GroupKey<'a> = (&'a str, Option<&'a str>);

fn group_key<'a>(name: &'a str, class: &'a str, grouping: GroupingKey) -> GroupKey<'a> {
    match grouping {
        GroupingKey::Student => (name, Some(class)),
        GroupingKey::NameOnly => (name, None),
    }
}
