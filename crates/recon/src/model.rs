use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One normalized payment row. `payment_date` is `None` when the source text
/// matched no known format; the record is still kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub student_name: String,
    pub class_name: String,
    pub payment_date: Option<NaiveDate>,
    pub amount_minor: i64,
}

impl PaymentRecord {
    pub fn identity(&self) -> StudentIdentity {
        StudentIdentity {
            student_name: self.student_name.clone(),
            class_name: self.class_name.clone(),
        }
    }
}

/// A (name, class) pair observed somewhere in the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StudentIdentity {
    pub student_name: String,
    pub class_name: String,
}

/// The full normalized record set plus the students derived from it.
///
/// Built once per load and shared read-only (see [`crate::cache`]); there is
/// no way to mutate the records after construction.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<PaymentRecord>,
    identities: Vec<StudentIdentity>,
}

impl Dataset {
    pub fn new(records: Vec<PaymentRecord>) -> Self {
        let identities = crate::filter::student_identities(&records);
        Self { records, identities }
    }

    pub fn records(&self) -> &[PaymentRecord] {
        &self.records
    }

    /// Deduplicated students in first-seen order.
    pub fn identities(&self) -> &[StudentIdentity] {
        &self.identities
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records whose date could not be parsed.
    pub fn undated_count(&self) -> usize {
        self.records.iter().filter(|r| r.payment_date.is_none()).count()
    }
}

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

const MONTH_NAMES_ID: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni",
    "Juli", "Agustus", "September", "Oktober", "November", "Desember",
];

/// A calendar month. `month` is always in 1..=12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month a given date falls in.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Indonesian month name, as printed in report titles.
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES_ID[(self.month - 1) as usize]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Post-filter over report rows by class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassFilter {
    #[default]
    All,
    Only(String),
}

impl ClassFilter {
    /// `"all"` / `"semua"` (any case) and the empty string select every class.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("all")
            || trimmed.eq_ignore_ascii_case("semua")
        {
            Self::All
        } else {
            Self::Only(trimmed.to_string())
        }
    }

    pub fn matches(&self, class_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(class) => class == class_name,
        }
    }

    pub fn as_class(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Only(class) => Some(class),
        }
    }
}

impl fmt::Display for ClassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "Semua"),
            Self::Only(class) => write!(f, "{class}"),
        }
    }
}

/// What a payment is attributed to when computing status and totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingKey {
    /// (name, class): same-named students in different classes stay apart.
    #[default]
    Student,
    /// Name only: a payment by "Ani" in 7A also counts for "Ani" in 8B.
    NameOnly,
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::NameOnly => write!(f, "name_only"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    /// `None` means no payment matches: every student is reported unpaid.
    pub period: Option<Period>,
    pub class: ClassFilter,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

impl PaymentStatus {
    /// Label used in the rendered table and CSV export.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Paid => "Lunas",
            Self::Unpaid => "Belum Lunas",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paid => write!(f, "paid"),
            Self::Unpaid => write!(f, "unpaid"),
        }
    }
}

/// Most recent payment inside the queried period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LastPayment {
    pub date: NaiveDate,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationRow {
    pub student_name: String,
    pub class_name: String,
    pub status: PaymentStatus,
    pub total_paid_minor: i64,
    pub shortfall_minor: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment: Option<LastPayment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub students: usize,
    pub paid: usize,
    pub unpaid: usize,
    pub total_paid_minor: i64,
    pub total_shortfall_minor: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub period: Option<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub monthly_fee_minor: i64,
    pub on_time_day: u32,
    pub grouping: GroupingKey,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub summary: ReportSummary,
    pub rows: Vec<ReconciliationRow>,
}

impl Report {
    /// Title line, e.g. "Rekap Bulan Maret 2024".
    pub fn title(&self) -> String {
        match self.meta.period {
            Some(period) => format!("Rekap Bulan {period}"),
            None => "Rekap (periode tidak dipilih)".to_string(),
        }
    }
}
